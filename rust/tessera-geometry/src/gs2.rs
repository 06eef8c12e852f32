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

//! Header-level access to GS2 records without deserializing them.
//!
//! [Gs2] wraps a serialized buffer and answers the questions that do not
//! require building the geometry tree: SRID, flags, type, emptiness, and
//! the bounding box (stored, peeked from trivial shapes, or computed as a
//! last resort).

use crate::bounding_box::BoundingBox;
use crate::error::TesseraGeometryError;
use crate::flags::{
    gflags_has_bbox, gflags_has_extended, gflags_version, GeomFlags, GFLAG_BBOX, GS2_VERSION,
};
use crate::geometry::Geometry;
use crate::gs2_codec::{self, MAX_NESTING_DEPTH};
use crate::point_array::Point4D;
use crate::types::GeometryType;

/// Largest SRID that survives the 21-bit header packing unchanged
pub const SRID_MAX: i32 = 999_999;
/// Top of the user-assignable SRID range; overflowing SRIDs wrap in above it
pub const SRID_USER_MAX: i32 = 998_999;

/// Clamp an SRID into the range the 3-byte header can represent
///
/// Non-positive SRIDs collapse to unknown; SRIDs beyond [SRID_MAX] wrap
/// into the reserved band just above [SRID_USER_MAX].
pub fn clamp_srid(srid: Option<i32>) -> Option<i32> {
    let srid = srid?;
    if srid <= 0 {
        log::warn!("SRID value {srid} converted to the unknown SRID");
        return None;
    }
    if srid > SRID_MAX {
        let clamped = SRID_USER_MAX + 1 + srid % (SRID_MAX - SRID_USER_MAX - 1);
        log::warn!("SRID value {srid} converted to {clamped}");
        return Some(clamped);
    }
    Some(srid)
}

/// Pack an SRID into the 3 header bytes (21 significant bits)
///
/// Unknown is stored as 0.
pub(crate) fn pack_srid(srid: Option<i32>) -> [u8; 3] {
    let srid = clamp_srid(srid).unwrap_or(0);
    [
        ((srid & 0x001F0000) >> 16) as u8,
        ((srid & 0x0000FF00) >> 8) as u8,
        (srid & 0x000000FF) as u8,
    ]
}

/// Recover an SRID from the 3 header bytes, mapping the on-disk 0 back to
/// unknown
pub(crate) fn unpack_srid(bytes: [u8; 3]) -> Option<i32> {
    let mut srid =
        ((bytes[0] as i32) << 16) | ((bytes[1] as i32) << 8) | (bytes[2] as i32);
    // Only 21 bits are stored; slide up and back to pull the sign down
    srid = (srid << 11) >> 11;
    if srid == 0 {
        None
    } else {
        Some(srid)
    }
}

/// Overwrite the SRID of a serialized record in place
pub fn set_srid(record: &mut [u8], srid: Option<i32>) -> Result<(), TesseraGeometryError> {
    if record.len() < 8 {
        return Err(TesseraGeometryError::Invalid(
            "Serialized record is smaller than its fixed header".to_string(),
        ));
    }
    record[4..7].copy_from_slice(&pack_srid(srid));
    Ok(())
}

fn read_u32_at(buf: &[u8], at: usize) -> Result<u32, TesseraGeometryError> {
    match buf.get(at..at + 4) {
        Some(bytes) => Ok(u32::from_ne_bytes(bytes.try_into().unwrap())),
        None => Err(TesseraGeometryError::Invalid(format!(
            "Serialized geometry truncated: no u32 at offset {at}"
        ))),
    }
}

fn read_f64_at(buf: &[u8], at: usize) -> Result<f64, TesseraGeometryError> {
    match buf.get(at..at + 8) {
        Some(bytes) => Ok(f64::from_ne_bytes(bytes.try_into().unwrap())),
        None => Err(TesseraGeometryError::Invalid(format!(
            "Serialized geometry truncated: no f64 at offset {at}"
        ))),
    }
}

/// A validated view over a serialized GS2 record
#[derive(Debug, Clone, Copy)]
pub struct Gs2<'a> {
    buf: &'a [u8],
}

impl<'a> Gs2<'a> {
    /// Wrap a serialized record, checking the fixed header
    pub fn try_new(buf: &'a [u8]) -> Result<Self, TesseraGeometryError> {
        if buf.len() < 8 {
            return Err(TesseraGeometryError::Invalid(format!(
                "Serialized record of {} bytes is smaller than its fixed header",
                buf.len()
            )));
        }

        let varsize = u32::from_ne_bytes(buf[0..4].try_into().unwrap()) as usize;
        if varsize != buf.len() {
            return Err(TesseraGeometryError::Invalid(format!(
                "Serialized record declares {} bytes but the buffer holds {}",
                varsize,
                buf.len()
            )));
        }

        let version = gflags_version(buf[7]);
        if version != GS2_VERSION {
            return Err(TesseraGeometryError::Invalid(format!(
                "Unsupported serialization version {version}"
            )));
        }

        let record = Self { buf };
        if record.header_size() > buf.len() {
            return Err(TesseraGeometryError::Invalid(
                "Serialized record is truncated inside its header".to_string(),
            ));
        }

        Ok(record)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    fn gflags(&self) -> u8 {
        self.buf[7]
    }

    pub fn has_bbox(&self) -> bool {
        gflags_has_bbox(self.gflags())
    }

    pub fn has_extended(&self) -> bool {
        gflags_has_extended(self.gflags())
    }

    /// The in-memory flags, resolving the extended word when present
    pub fn flags(&self) -> GeomFlags {
        let xflags = if self.has_extended() {
            Some(u64::from_ne_bytes(self.buf[8..16].try_into().unwrap()))
        } else {
            None
        };
        GeomFlags::from_serialized(self.gflags(), xflags)
    }

    pub fn srid(&self) -> Option<i32> {
        unpack_srid([self.buf[4], self.buf[5], self.buf[6]])
    }

    pub fn ndims(&self) -> usize {
        self.flags().ndims()
    }

    /// Bytes before the geometry payload: the fixed 8, the extended word,
    /// and the stored box
    ///
    /// Sized from the raw flags byte alone (box dimensionality never
    /// depends on the extended word), so this is safe to call while the
    /// record is still being validated.
    pub fn header_size(&self) -> usize {
        let mut size = 8;
        if self.has_extended() {
            size += 8;
        }
        if self.has_bbox() {
            size += GeomFlags::from_serialized(self.gflags(), None).box_serialized_size();
        }
        size
    }

    /// The recursive geometry payload
    pub fn payload(&self) -> Result<&'a [u8], TesseraGeometryError> {
        self.buf.get(self.header_size()..).ok_or_else(|| {
            TesseraGeometryError::Invalid(
                "Serialized record is truncated inside its header".to_string(),
            )
        })
    }

    /// The geometry type, read from the leading payload word
    pub fn geometry_type(&self) -> Result<GeometryType, TesseraGeometryError> {
        GeometryType::try_from_gs2_id(read_u32_at(self.payload()?, 0)?)
    }

    /// Whether the record holds no coordinates, without deserializing
    ///
    /// Walks the payload using the invariant that every variant stores its
    /// element count at payload offset 4. Only empty subtrees need their
    /// exact byte size to continue the walk, and an empty leaf is its
    /// 8-byte header, except for a NURBS curve which may still carry
    /// weight and knot arrays.
    pub fn is_empty(&self) -> Result<bool, TesseraGeometryError> {
        match probe_empty(self.payload()?, 0)? {
            Probe::Empty(_) => Ok(true),
            Probe::NonEmpty => Ok(false),
        }
    }

    /// Read the stored bounding box, if the record has one
    pub fn read_bbox(&self) -> Result<Option<BoundingBox>, TesseraGeometryError> {
        if !self.has_bbox() {
            return Ok(None);
        }
        let start = if self.has_extended() { 16 } else { 8 };
        let bbox = BoundingBox::from_serialized(&self.buf[start..], self.flags())?;
        Ok(Some(bbox))
    }

    /// Derive a bounding box from trivial payloads without deserializing
    ///
    /// Handles a non-empty Point, a two-point LineString, a MultiPoint of
    /// exactly one point, and a MultiLineString of exactly one two-point
    /// line. Returns `None` when the record already stores a box (reading
    /// it is cheaper), is geodetic (its box is Earth-centered and cannot
    /// be derived from raw coordinates here), or has any other shape.
    pub fn peek_bbox(&self) -> Result<Option<BoundingBox>, TesseraGeometryError> {
        let flags = self.flags();
        if flags.geodetic || self.has_bbox() {
            return Ok(None);
        }

        let payload = self.payload()?;
        let gtype = GeometryType::try_from_gs2_id(read_u32_at(payload, 0)?)?;
        let ndims = flags.ndims();

        let (first, second) = match gtype {
            GeometryType::Point => {
                let npoints = read_u32_at(payload, 4)?;
                if npoints == 0 {
                    return Ok(None);
                }
                (8, None)
            }
            GeometryType::LineString => {
                let npoints = read_u32_at(payload, 4)?;
                if npoints != 2 {
                    return Ok(None);
                }
                (8, Some(8 + ndims * 8))
            }
            GeometryType::MultiPoint => {
                let ngeoms = read_u32_at(payload, 4)?;
                if ngeoms != 1 {
                    return Ok(None);
                }
                // A MultiPoint can hold a single empty Point
                let npoints = read_u32_at(payload, 12)?;
                if npoints != 1 {
                    return Ok(None);
                }
                (16, None)
            }
            GeometryType::MultiLineString => {
                let ngeoms = read_u32_at(payload, 4)?;
                if ngeoms != 1 {
                    return Ok(None);
                }
                let npoints = read_u32_at(payload, 12)?;
                if npoints != 2 {
                    return Ok(None);
                }
                (16, Some(16 + ndims * 8))
            }
            _ => return Ok(None),
        };

        let mut bbox = BoundingBox::empty(flags);
        bbox.update_point(read_point_at(payload, first, flags)?);
        if let Some(second) = second {
            bbox.update_point(read_point_at(payload, second, flags)?);
        }
        bbox.float_round();
        Ok(Some(bbox))
    }

    /// The bounding box of the record, by the cheapest available means:
    /// read the stored box, peek a trivial payload, or decode and compute
    ///
    /// Returns `None` for empty geometries. A geodetic record without a
    /// stored box is an error, because its Earth-centered box cannot be
    /// computed from the Cartesian coordinates here.
    pub fn bbox(&self) -> Result<Option<BoundingBox>, TesseraGeometryError> {
        if let Some(bbox) = self.read_bbox()? {
            return Ok(Some(bbox));
        }
        if let Some(bbox) = self.peek_bbox()? {
            return Ok(Some(bbox));
        }

        log::debug!("no stored or peekable box; decoding to compute one");
        let geom = self.decode()?;
        match geom.compute_bbox()? {
            Some(mut bbox) => {
                bbox.float_round();
                Ok(Some(bbox))
            }
            None => Ok(None),
        }
    }

    /// Read the first coordinate of a Point record without deserializing
    ///
    /// Returns `None` for an empty point. Other geometry types are not
    /// supported by this fast path.
    pub fn peek_first_point(&self) -> Result<Option<Point4D>, TesseraGeometryError> {
        let payload = self.payload()?;
        if read_u32_at(payload, 4)? == 0 {
            return Ok(None);
        }

        let gtype = GeometryType::try_from_gs2_id(read_u32_at(payload, 0)?)?;
        if gtype != GeometryType::Point {
            return Err(TesseraGeometryError::Invalid(format!(
                "Cannot peek the first point of a {gtype}"
            )));
        }

        Ok(Some(read_point_at(payload, 8, self.flags())?))
    }

    /// Deserialize into a geometry tree that borrows this record's bytes
    ///
    /// The stored box is attached when present; otherwise one is computed
    /// for geometries that would normally carry one.
    pub fn decode(&self) -> Result<Geometry<'a>, TesseraGeometryError> {
        let flags = self.flags();
        let mut geom = gs2_codec::parse_payload(self.payload()?, flags, self.srid())?;

        if let Some(bbox) = self.read_bbox()? {
            geom.set_bbox(Some(bbox));
        } else if geom.needs_bbox() && !geom.is_empty() && !flags.geodetic {
            let bbox = geom.compute_bbox()?;
            geom.set_bbox(bbox);
        }

        Ok(geom)
    }

    /// Produce a copy of this record with `bbox` stored inline
    ///
    /// The box dimensionality must match the record's flags. An existing
    /// box is overwritten in place; otherwise the record grows to make
    /// room.
    pub fn with_bbox(&self, bbox: &BoundingBox) -> Result<Vec<u8>, TesseraGeometryError> {
        let flags = self.flags();
        if bbox.ndims_box() != flags.ndims_box() {
            return Err(TesseraGeometryError::Invalid(format!(
                "Bounding box is {}D but the record requires a {}D box",
                bbox.ndims_box(),
                flags.ndims_box()
            )));
        }

        let mut box_bytes = Vec::with_capacity(flags.box_serialized_size());
        bbox.write_to(&mut box_bytes);
        let box_start = if self.has_extended() { 16 } else { 8 };

        if self.has_bbox() {
            let mut out = self.buf.to_vec();
            out[box_start..box_start + box_bytes.len()].copy_from_slice(&box_bytes);
            return Ok(out);
        }

        let new_size = self.buf.len() + box_bytes.len();
        let mut out = Vec::with_capacity(new_size);
        out.extend_from_slice(&(new_size as u32).to_ne_bytes());
        out.extend_from_slice(&self.buf[4..7]);
        out.push(self.gflags() | GFLAG_BBOX);
        out.extend_from_slice(&self.buf[8..box_start]);
        out.extend_from_slice(&box_bytes);
        out.extend_from_slice(&self.buf[box_start..]);
        Ok(out)
    }

    /// Produce a copy of this record with no stored bounding box
    pub fn without_bbox(&self) -> Vec<u8> {
        if !self.has_bbox() {
            return self.buf.to_vec();
        }

        let box_start = if self.has_extended() { 16 } else { 8 };
        let box_size = self.flags().box_serialized_size();
        let new_size = self.buf.len() - box_size;

        let mut out = Vec::with_capacity(new_size);
        out.extend_from_slice(&(new_size as u32).to_ne_bytes());
        out.extend_from_slice(&self.buf[4..7]);
        out.push(self.gflags() & !GFLAG_BBOX);
        out.extend_from_slice(&self.buf[8..box_start]);
        out.extend_from_slice(&self.buf[box_start + box_size..]);
        out
    }
}

fn read_point_at(
    payload: &[u8],
    at: usize,
    flags: GeomFlags,
) -> Result<Point4D, TesseraGeometryError> {
    let mut at = at;
    let mut next = |present: bool| -> Result<f64, TesseraGeometryError> {
        if !present {
            return Ok(0.0);
        }
        let value = read_f64_at(payload, at)?;
        at += 8;
        Ok(value)
    };

    Ok(Point4D {
        x: next(true)?,
        y: next(true)?,
        z: next(flags.has_z)?,
        m: next(flags.has_m)?,
    })
}

enum Probe {
    /// The subtree is empty and occupied this many payload bytes
    Empty(usize),
    NonEmpty,
}

fn probe_empty(buf: &[u8], depth: usize) -> Result<Probe, TesseraGeometryError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(TesseraGeometryError::Invalid(format!(
            "Geometry nesting exceeds the maximum depth of {MAX_NESTING_DEPTH}"
        )));
    }

    let gtype = GeometryType::try_from_gs2_id(read_u32_at(buf, 0)?)?;
    let count = read_u32_at(buf, 4)?;

    if gtype.is_collection() {
        let mut consumed = 8;
        for _ in 0..count {
            if consumed > buf.len() {
                return Err(TesseraGeometryError::Invalid(
                    "Serialized geometry truncated inside a collection".to_string(),
                ));
            }
            match probe_empty(&buf[consumed..], depth + 1)? {
                Probe::Empty(size) => consumed += size,
                Probe::NonEmpty => return Ok(Probe::NonEmpty),
            }
        }
        return Ok(Probe::Empty(consumed));
    }

    if count != 0 {
        return Ok(Probe::NonEmpty);
    }

    // An empty leaf is its type and zero count, except a NURBS curve,
    // which may still carry weight and knot arrays behind its header
    if gtype == GeometryType::NurbsCurve {
        let nweights = read_u32_at(buf, 12)? as usize;
        let nknots = read_u32_at(buf, 16)? as usize;
        return Ok(Probe::Empty(20 + 8 * (nweights + nknots)));
    }

    Ok(Probe::Empty(8))
}
