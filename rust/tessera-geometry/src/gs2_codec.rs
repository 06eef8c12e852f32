// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Sizing, encoding and decoding of the GS2 serialized form.
//!
//! A GS2 record is a VARLENA-compatible buffer:
//!
//! ```text
//! [varsize:4][srid:3][gflags:1] [extflags:8?] [bbox:4*2*ndims_box?] [payload]
//! ```
//!
//! The payload grammar is recursive; every variant places its element count
//! at payload offset 4 so the emptiness probe can walk records without
//! deserializing them. Multi-byte values are native-endian.

use crate::bounding_box::BoundingBox;
use crate::error::TesseraGeometryError;
use crate::flags::GeomFlags;
use crate::geometry::{Geometry, GeometryKind};
use crate::gs2::pack_srid;
use crate::nurbs::NurbsCurve;
use crate::point_array::PointArray;
use crate::types::GeometryType;

/// Decoders refuse collections nested deeper than this
pub const MAX_NESTING_DEPTH: usize = 32;

/// Exact number of bytes [to_gs2] will produce for this geometry
///
/// Includes the header, the optional extended word, the bounding box that
/// encoding would store (whether already cached or about to be computed),
/// and the recursive payload.
pub fn serialized_size(geom: &Geometry) -> Result<usize, TesseraGeometryError> {
    let bbox = effective_bbox(geom)?;
    Ok(geom.flags().header_size(bbox.is_some()) + payload_size(geom))
}

/// Serialize a geometry into a freshly allocated GS2 record
///
/// A bounding box is computed and stored for any non-empty, non-point,
/// non-geodetic geometry that does not already carry one. The number of
/// bytes written is checked against [serialized_size]; a mismatch is a
/// sizer bug and fails the whole encode rather than returning a partial
/// buffer.
pub fn to_gs2(geom: &Geometry) -> Result<Vec<u8>, TesseraGeometryError> {
    let bbox = effective_bbox(geom)?;
    let flags = geom.flags();

    if let Some(bbox) = &bbox {
        if bbox.ndims_box() != flags.ndims_box() {
            return Err(TesseraGeometryError::Invalid(format!(
                "Bounding box is {}D but geometry flags require a {}D box",
                bbox.ndims_box(),
                flags.ndims_box()
            )));
        }
    }

    let expected = flags.header_size(bbox.is_some()) + payload_size(geom);
    let mut buf = Vec::with_capacity(expected);

    buf.extend_from_slice(&(expected as u32).to_ne_bytes());
    buf.extend_from_slice(&pack_srid(geom.srid()));
    buf.push(flags.gflags_byte(bbox.is_some()));

    if flags.uses_extended() {
        buf.extend_from_slice(&flags.extended_word().to_ne_bytes());
    }

    if let Some(bbox) = &bbox {
        bbox.write_to(&mut buf);
    }

    write_payload(geom, &mut buf)?;

    if buf.len() != expected {
        return Err(TesseraGeometryError::SizeMismatch {
            expected,
            written: buf.len(),
        });
    }

    log::trace!(
        "encoded {} as {} bytes",
        geom.geometry_type(),
        buf.len()
    );
    Ok(buf)
}

/// The box that encoding will store: the cached one, or a computed one
/// when the geometry warrants it
fn effective_bbox(geom: &Geometry) -> Result<Option<BoundingBox>, TesseraGeometryError> {
    if let Some(bbox) = geom.bbox() {
        return Ok(Some(*bbox));
    }
    if geom.needs_bbox() && !geom.is_empty() && !geom.flags().geodetic {
        return geom.compute_bbox();
    }
    Ok(None)
}

fn payload_size(geom: &Geometry) -> usize {
    match geom.kind() {
        GeometryKind::Point(pa)
        | GeometryKind::LineString(pa)
        | GeometryKind::CircularString(pa)
        | GeometryKind::Triangle(pa) => 8 + pa.npoints() as usize * pa.point_size(),
        GeometryKind::Polygon(rings) => {
            // Type + nrings + one count per ring, padded to keep the
            // coordinate doubles 8-byte aligned
            let mut size = 8 + 4 * rings.len();
            if rings.len() % 2 == 1 {
                size += 4;
            }
            for ring in rings {
                size += ring.npoints() as usize * ring.point_size();
            }
            size
        }
        GeometryKind::Collection(_, geoms) => {
            8 + geoms.iter().map(payload_size).sum::<usize>()
        }
        GeometryKind::NurbsCurve(curve) => {
            let mut size = 4 + 4 * 4;
            if let Some(weights) = curve.weights() {
                size += 8 * weights.len();
            }
            if let Some(knots) = curve.knots() {
                size += 8 * knots.len();
            }
            size + curve.points().npoints() as usize * curve.points().point_size()
        }
    }
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_ne_bytes());
}

fn check_zm(geom: &Geometry, pa: &PointArray) -> Result<(), TesseraGeometryError> {
    if !pa.flags().same_zm(&geom.flags()) {
        return Err(TesseraGeometryError::Invalid(format!(
            "Dimensions mismatch in {}",
            geom.geometry_type()
        )));
    }
    Ok(())
}

fn write_payload(geom: &Geometry, buf: &mut Vec<u8>) -> Result<(), TesseraGeometryError> {
    let gtype = geom.geometry_type();
    match geom.kind() {
        GeometryKind::Point(pa)
        | GeometryKind::LineString(pa)
        | GeometryKind::CircularString(pa)
        | GeometryKind::Triangle(pa) => {
            check_zm(geom, pa)?;
            write_u32(buf, gtype.gs2_id());
            write_u32(buf, pa.npoints());
            buf.extend_from_slice(pa.as_bytes());
        }
        GeometryKind::Polygon(rings) => {
            write_u32(buf, gtype.gs2_id());
            write_u32(buf, rings.len() as u32);
            for ring in rings {
                check_zm(geom, ring)?;
                write_u32(buf, ring.npoints());
            }
            if rings.len() % 2 == 1 {
                write_u32(buf, 0);
            }
            for ring in rings {
                buf.extend_from_slice(ring.as_bytes());
            }
        }
        GeometryKind::Collection(_, geoms) => {
            write_u32(buf, gtype.gs2_id());
            write_u32(buf, geoms.len() as u32);
            for child in geoms {
                if !child.flags().same_zm(&geom.flags()) {
                    return Err(TesseraGeometryError::Invalid(format!(
                        "Dimensions mismatch in {gtype}"
                    )));
                }
                write_payload(child, buf)?;
            }
        }
        GeometryKind::NurbsCurve(curve) => {
            check_zm(geom, curve.points())?;
            write_u32(buf, gtype.gs2_id());
            // The control point count sits at payload offset 4, like every
            // other variant's element count, so the emptiness probe can
            // read it without knowing it is looking at a curve
            write_u32(buf, curve.points().npoints());
            write_u32(buf, curve.degree());
            write_u32(buf, curve.weights().map_or(0, |w| w.len()) as u32);
            write_u32(buf, curve.knots().map_or(0, |k| k.len()) as u32);
            if let Some(weights) = curve.weights() {
                for weight in weights {
                    buf.extend_from_slice(&weight.to_ne_bytes());
                }
            }
            if let Some(knots) = curve.knots() {
                for knot in knots {
                    buf.extend_from_slice(&knot.to_ne_bytes());
                }
            }
            buf.extend_from_slice(curve.points().as_bytes());
        }
    }
    Ok(())
}

/// A bounds-checked reader over payload bytes
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TesseraGeometryError> {
        if self.remaining() < n {
            return Err(TesseraGeometryError::Invalid(format!(
                "Serialized geometry truncated at offset {}: need {} bytes, have {}",
                self.pos,
                n,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, TesseraGeometryError> {
        Ok(u32::from_ne_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_f64_vec(&mut self, count: usize) -> Result<Vec<f64>, TesseraGeometryError> {
        let bytes = self.take(count * 8)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|chunk| f64::from_ne_bytes(chunk.try_into().unwrap()))
            .collect())
    }

    fn peek_u32(&self) -> Result<u32, TesseraGeometryError> {
        if self.remaining() < 4 {
            return Err(TesseraGeometryError::Invalid(format!(
                "Serialized geometry truncated at offset {}: need 4 bytes, have {}",
                self.pos,
                self.remaining()
            )));
        }
        Ok(u32::from_ne_bytes(
            self.buf[self.pos..self.pos + 4].try_into().unwrap(),
        ))
    }
}

/// Reconstruct a geometry tree from a GS2 payload
///
/// Coordinate blocks reference the payload bytes rather than copying them,
/// so the returned tree shares the buffer's lifetime. The flags decoded
/// from the record header drive the whole tree; subgeometries do not
/// re-parse dimensionality. The SRID is applied to every node.
pub(crate) fn parse_payload<'a>(
    payload: &'a [u8],
    flags: GeomFlags,
    srid: Option<i32>,
) -> Result<Geometry<'a>, TesseraGeometryError> {
    let mut cursor = Cursor::new(payload);
    let geom = parse_geometry(&mut cursor, flags, srid, 0)?;
    if cursor.remaining() > 0 {
        log::debug!(
            "{} trailing bytes after {} payload",
            cursor.remaining(),
            geom.geometry_type()
        );
    }
    Ok(geom)
}

fn parse_geometry<'a>(
    cursor: &mut Cursor<'a>,
    flags: GeomFlags,
    srid: Option<i32>,
    depth: usize,
) -> Result<Geometry<'a>, TesseraGeometryError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(TesseraGeometryError::Invalid(format!(
            "Geometry nesting exceeds the maximum depth of {MAX_NESTING_DEPTH}"
        )));
    }

    let gtype = GeometryType::try_from_gs2_id(cursor.read_u32()?)?;

    let kind = match gtype {
        GeometryType::Point
        | GeometryType::LineString
        | GeometryType::CircularString
        | GeometryType::Triangle => {
            let npoints = cursor.read_u32()?;
            let points = read_point_array(cursor, flags, npoints)?;
            match gtype {
                GeometryType::Point => GeometryKind::Point(points),
                GeometryType::LineString => GeometryKind::LineString(points),
                GeometryType::CircularString => GeometryKind::CircularString(points),
                _ => GeometryKind::Triangle(points),
            }
        }
        GeometryType::Polygon => {
            let nrings = cursor.read_u32()? as usize;
            if nrings * 4 > cursor.remaining() {
                return Err(TesseraGeometryError::Invalid(format!(
                    "Polygon declares {nrings} rings but the buffer cannot hold them"
                )));
            }
            let mut counts = Vec::with_capacity(nrings);
            for _ in 0..nrings {
                counts.push(cursor.read_u32()?);
            }
            if nrings % 2 == 1 {
                cursor.read_u32()?; // alignment pad
            }
            let mut rings = Vec::with_capacity(nrings);
            for npoints in counts {
                rings.push(read_point_array(cursor, flags, npoints)?);
            }
            GeometryKind::Polygon(rings)
        }
        GeometryType::NurbsCurve => {
            let npoints = cursor.read_u32()?;
            let degree = cursor.read_u32()?;
            let nweights = cursor.read_u32()? as usize;
            let nknots = cursor.read_u32()? as usize;
            let weights = if nweights > 0 {
                Some(cursor.read_f64_vec(nweights)?)
            } else {
                None
            };
            let knots = if nknots > 0 {
                Some(cursor.read_f64_vec(nknots)?)
            } else {
                None
            };
            let points = read_point_array(cursor, flags, npoints)?;
            GeometryKind::NurbsCurve(NurbsCurve::from_raw_parts(degree, points, weights, knots))
        }
        collection_type => {
            let ngeoms = cursor.read_u32()? as usize;
            if ngeoms * 8 > cursor.remaining() {
                return Err(TesseraGeometryError::Invalid(format!(
                    "{collection_type} declares {ngeoms} subgeometries but the buffer cannot hold them"
                )));
            }
            let mut geoms = Vec::with_capacity(ngeoms);
            for _ in 0..ngeoms {
                let child_type = GeometryType::try_from_gs2_id(cursor.peek_u32()?)?;
                if !collection_type.allows_child(child_type) {
                    return Err(TesseraGeometryError::DisallowedChild {
                        parent: collection_type,
                        child: child_type,
                    });
                }
                geoms.push(parse_geometry(cursor, flags, srid, depth + 1)?);
            }
            GeometryKind::Collection(collection_type, geoms)
        }
    };

    Ok(Geometry::from_parts(srid, flags, None, kind))
}

fn read_point_array<'a>(
    cursor: &mut Cursor<'a>,
    flags: GeomFlags,
    npoints: u32,
) -> Result<PointArray<'a>, TesseraGeometryError> {
    let bytes = cursor.take(npoints as usize * flags.ndims() * 8)?;
    PointArray::from_bytes_ref(flags.has_z, flags.has_m, npoints, bytes)
}
