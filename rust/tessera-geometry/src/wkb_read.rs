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

//! Well-Known Binary input.
//!
//! One reader covers all three dialects: dimensionality comes from either
//! the ISO additive offsets or the extended high-bit flags of each type
//! code, and an embedded SRID is announced by the extended SRID bit.
//! Subgeometries of collections inherit the SRID of their parent.

use crate::error::TesseraGeometryError;
use crate::flags::GeomFlags;
use crate::geometry::{Geometry, GeometryKind};
use crate::gs2_codec::MAX_NESTING_DEPTH;
use crate::nurbs::NurbsCurve;
use crate::point_array::PointArray;
use crate::types::{GeometryType, GeometryTypeAndDims};
use crate::wkb_write::{WKB_M_FLAG, WKB_SRID_FLAG, WKB_Z_FLAG};

/// Parse a WKB buffer into an owned geometry tree
pub fn from_wkb(buf: &[u8]) -> Result<Geometry<'static>, TesseraGeometryError> {
    let mut cursor = WkbCursor::new(buf);
    let geom = read_geometry(&mut cursor, None, 0)?;
    if cursor.remaining() > 0 {
        log::debug!(
            "{} trailing bytes after {}",
            cursor.remaining(),
            geom.geometry_type()
        );
    }
    Ok(geom)
}

/// Parse hex-encoded WKB, accepting either case of hex digits
pub fn from_hex_wkb(hex: &str) -> Result<Geometry<'static>, TesseraGeometryError> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(TesseraGeometryError::Invalid(format!(
            "Hex WKB has odd length {}",
            digits.len()
        )));
    }

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks_exact(2) {
        let hi = hex_nibble(pair[0])?;
        let lo = hex_nibble(pair[1])?;
        bytes.push((hi << 4) | lo);
    }

    from_wkb(&bytes)
}

fn hex_nibble(digit: u8) -> Result<u8, TesseraGeometryError> {
    (digit as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| {
            TesseraGeometryError::Invalid(format!(
                "Invalid hex character '{}' in WKB",
                digit as char
            ))
        })
}

/// Cursor over a WKB buffer tracking the byte order announced by the most
/// recent endian marker
struct WkbCursor<'a> {
    buf: &'a [u8],
    offset: usize,
    little: bool,
}

impl<'a> WkbCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            little: true,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TesseraGeometryError> {
        if self.remaining() < n {
            return Err(TesseraGeometryError::Invalid(format!(
                "Invalid WKB: buffer too small at offset {}: need {} bytes, have {}",
                self.offset,
                n,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn read_byte(&mut self) -> Result<u8, TesseraGeometryError> {
        Ok(self.take(1)?[0])
    }

    fn read_byte_order(&mut self) -> Result<(), TesseraGeometryError> {
        match self.read_byte()? {
            0 => self.little = false,
            1 => self.little = true,
            other => {
                return Err(TesseraGeometryError::Invalid(format!(
                    "Unexpected byte order: {other}"
                )))
            }
        }
        Ok(())
    }

    fn read_u32(&mut self) -> Result<u32, TesseraGeometryError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(if self.little {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn read_f64(&mut self) -> Result<f64, TesseraGeometryError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().unwrap();
        Ok(if self.little {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        })
    }
}

fn read_geometry(
    cursor: &mut WkbCursor,
    inherited_srid: Option<i32>,
    depth: usize,
) -> Result<Geometry<'static>, TesseraGeometryError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(TesseraGeometryError::Invalid(format!(
            "Geometry nesting exceeds the maximum depth of {MAX_NESTING_DEPTH}"
        )));
    }

    cursor.read_byte_order()?;
    let code = cursor.read_u32()?;

    let type_and_dims = GeometryTypeAndDims::try_from_wkb_id(code & 0x0FFF_FFFF)?;
    let gtype = type_and_dims.geometry_type();

    let mut flags = GeomFlags::from_dimensions(type_and_dims.dimensions());
    if code & WKB_Z_FLAG != 0 {
        flags.has_z = true;
    }
    if code & WKB_M_FLAG != 0 {
        flags.has_m = true;
    }

    let srid = if code & WKB_SRID_FLAG != 0 {
        let value = cursor.read_u32()? as i32;
        // 0 is the on-wire spelling of unknown
        (value != 0).then_some(value)
    } else {
        inherited_srid
    };

    let kind = match gtype {
        GeometryType::Point => {
            let coords = read_coords(cursor, 1, flags.ndims())?;
            // POINT EMPTY comes in as all-NaN ordinates
            if coords.iter().all(|c| c.is_nan()) {
                GeometryKind::Point(PointArray::empty(flags.has_z, flags.has_m))
            } else {
                GeometryKind::Point(point_array(flags, &coords)?)
            }
        }
        GeometryType::LineString | GeometryType::CircularString => {
            let npoints = cursor.read_u32()?;
            let coords = read_coords(cursor, npoints as usize, flags.ndims())?;
            let pa = point_array(flags, &coords)?;
            if gtype == GeometryType::LineString {
                GeometryKind::LineString(pa)
            } else {
                GeometryKind::CircularString(pa)
            }
        }
        GeometryType::Polygon => {
            let nrings = cursor.read_u32()? as usize;
            if nrings * 4 > cursor.remaining() {
                return Err(TesseraGeometryError::Invalid(format!(
                    "Invalid WKB: polygon declares {nrings} rings but the buffer cannot hold them"
                )));
            }
            let mut rings = Vec::with_capacity(nrings);
            for _ in 0..nrings {
                let npoints = cursor.read_u32()?;
                let coords = read_coords(cursor, npoints as usize, flags.ndims())?;
                rings.push(point_array(flags, &coords)?);
            }
            GeometryKind::Polygon(rings)
        }
        GeometryType::Triangle => {
            let nrings = cursor.read_u32()?;
            match nrings {
                0 => GeometryKind::Triangle(PointArray::empty(flags.has_z, flags.has_m)),
                1 => {
                    let npoints = cursor.read_u32()?;
                    let coords = read_coords(cursor, npoints as usize, flags.ndims())?;
                    GeometryKind::Triangle(point_array(flags, &coords)?)
                }
                other => {
                    return Err(TesseraGeometryError::Invalid(format!(
                        "Invalid WKB: triangle must have one ring, got {other}"
                    )))
                }
            }
        }
        GeometryType::NurbsCurve => read_nurbs(cursor, flags)?,
        collection_type => {
            let ngeoms = cursor.read_u32()? as usize;
            // The smallest possible subgeometry is an endian marker plus a
            // type code
            if ngeoms * 5 > cursor.remaining() {
                return Err(TesseraGeometryError::Invalid(format!(
                    "Invalid WKB: {collection_type} declares {ngeoms} subgeometries but the buffer cannot hold them"
                )));
            }
            let mut geoms = Vec::with_capacity(ngeoms);
            for _ in 0..ngeoms {
                let child = read_geometry(cursor, srid, depth + 1)?;
                if !collection_type.allows_child(child.geometry_type()) {
                    return Err(TesseraGeometryError::DisallowedChild {
                        parent: collection_type,
                        child: child.geometry_type(),
                    });
                }
                geoms.push(child);
            }
            GeometryKind::Collection(collection_type, geoms)
        }
    };

    Ok(Geometry::from_parts(srid, flags, None, kind))
}

/// ISO NURBS structure: `[degree][npoints]`, per-point
/// `[endian][coords][has_weight][weight?]`, then `[nknots][knots]`
///
/// The canonical empty form for non-extended dialects is a bare zero count
/// where the degree would sit; a degree of zero is invalid for any real
/// curve, so it unambiguously announces an empty one with nothing after
/// it.
fn read_nurbs(
    cursor: &mut WkbCursor,
    flags: GeomFlags,
) -> Result<GeometryKind<'static>, TesseraGeometryError> {
    let degree = cursor.read_u32()?;
    if degree == 0 {
        return Ok(GeometryKind::NurbsCurve(NurbsCurve::empty(
            flags.has_z,
            flags.has_m,
        )));
    }

    let npoints = cursor.read_u32()? as usize;
    let ndims = flags.ndims();
    // Per point: endian marker, coordinates, weight flag
    if npoints * (2 + ndims * 8) > cursor.remaining() {
        return Err(TesseraGeometryError::Invalid(format!(
            "Invalid WKB: NURBS declares {npoints} control points but the buffer cannot hold them"
        )));
    }

    let mut coords = Vec::with_capacity(npoints * ndims);
    let mut weights = Vec::with_capacity(npoints);
    let mut any_weight = false;

    for _ in 0..npoints {
        cursor.read_byte_order()?;
        for _ in 0..ndims {
            coords.push(cursor.read_f64()?);
        }
        if cursor.read_byte()? != 0 {
            any_weight = true;
            weights.push(cursor.read_f64()?);
        } else {
            // Omitted weights are the default 1.0
            weights.push(1.0);
        }
    }

    let nknots = cursor.read_u32()? as usize;
    let knots = if nknots > 0 {
        if nknots * 8 > cursor.remaining() {
            return Err(TesseraGeometryError::Invalid(format!(
                "Invalid WKB: NURBS declares {nknots} knots but the buffer cannot hold them"
            )));
        }
        let mut knots = Vec::with_capacity(nknots);
        for _ in 0..nknots {
            knots.push(cursor.read_f64()?);
        }
        Some(knots)
    } else {
        None
    };

    let points = point_array(flags, &coords)?;
    Ok(GeometryKind::NurbsCurve(NurbsCurve::from_raw_parts(
        degree,
        points,
        any_weight.then_some(weights),
        knots,
    )))
}

fn read_coords(
    cursor: &mut WkbCursor,
    npoints: usize,
    ndims: usize,
) -> Result<Vec<f64>, TesseraGeometryError> {
    if npoints * ndims * 8 > cursor.remaining() {
        return Err(TesseraGeometryError::Invalid(format!(
            "Invalid WKB: {npoints} coordinates do not fit the remaining buffer"
        )));
    }
    let mut coords = Vec::with_capacity(npoints * ndims);
    for _ in 0..npoints * ndims {
        coords.push(cursor.read_f64()?);
    }
    Ok(coords)
}

fn point_array(
    flags: GeomFlags,
    coords: &[f64],
) -> Result<PointArray<'static>, TesseraGeometryError> {
    PointArray::from_coords(flags.has_z, flags.has_m, coords)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nurbs::uniform_clamped_knots;
    use crate::point_array::Point4D;
    use crate::wkb_write::{to_wkb, ByteOrder, WkbDialect, WkbOptions};
    use rstest::rstest;

    fn xy_array(coords: &[f64]) -> PointArray<'static> {
        PointArray::from_coords(false, false, coords).unwrap()
    }

    fn opts(dialect: WkbDialect, order: ByteOrder) -> WkbOptions {
        WkbOptions::new(dialect).with_byte_order(order)
    }

    fn corpus() -> Vec<Geometry<'static>> {
        let point = Geometry::point(None, xy_array(&[1.0, 2.0])).unwrap();
        let point_zm = Geometry::point(
            None,
            PointArray::from_coords(true, true, &[1.0, 2.0, 3.0, 4.0]).unwrap(),
        )
        .unwrap();
        let line_z = Geometry::line_string(
            None,
            PointArray::from_coords(true, false, &[0.0, 0.0, 1.0, 2.0, 2.0, 3.0]).unwrap(),
        );
        let polygon = Geometry::polygon(
            None,
            vec![
                xy_array(&[0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0, 0.0, 0.0]),
                xy_array(&[1.0, 1.0, 2.0, 1.0, 1.0, 2.0, 1.0, 1.0]),
            ],
        )
        .unwrap();
        let triangle = Geometry::triangle(
            None,
            xy_array(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
        )
        .unwrap();
        let arc = Geometry::circular_string(None, xy_array(&[0.0, 0.0, 1.0, 1.0, 2.0, 0.0]));
        let compound = Geometry::collection(
            GeometryType::CompoundCurve,
            None,
            vec![
                Geometry::line_string(None, xy_array(&[0.0, 0.0, 1.0, 0.0])),
                Geometry::circular_string(None, xy_array(&[1.0, 0.0, 2.0, 1.0, 3.0, 0.0])),
            ],
        )
        .unwrap();
        let multipoint = Geometry::collection(
            GeometryType::MultiPoint,
            None,
            vec![
                Geometry::point(None, xy_array(&[0.0, 0.0])).unwrap(),
                Geometry::point(None, xy_array(&[1.0, 1.0])).unwrap(),
            ],
        )
        .unwrap();
        let tin = Geometry::collection(GeometryType::Tin, None, vec![triangle.clone()]).unwrap();
        let mixed = Geometry::collection(
            GeometryType::GeometryCollection,
            None,
            vec![point.clone(), polygon.clone()],
        )
        .unwrap();
        let rational_nurbs = Geometry::nurbs(
            None,
            NurbsCurve::try_new(
                2,
                xy_array(&[0.0, 0.0, 1.0, 1.0, 2.0, 0.0]),
                Some(vec![1.0, 2.0, 1.0]),
                Some(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]),
            )
            .unwrap(),
        );

        vec![
            point,
            point_zm,
            line_z,
            polygon,
            triangle,
            arc,
            compound,
            multipoint,
            tin,
            mixed,
            rational_nurbs,
        ]
    }

    #[rstest]
    fn roundtrip_iso_and_extended(
        #[values(WkbDialect::Iso, WkbDialect::Extended)] dialect: WkbDialect,
        #[values(ByteOrder::LittleEndian, ByteOrder::BigEndian)] order: ByteOrder,
    ) {
        for geom in corpus() {
            let wkb = to_wkb(&geom, &opts(dialect, order)).unwrap();
            let decoded = from_wkb(&wkb).unwrap();
            assert_eq!(decoded, geom, "{:?} {:?} {}", dialect, order, geom.geometry_type());
        }
    }

    #[rstest]
    fn roundtrip_sfsql_2d(
        #[values(ByteOrder::LittleEndian, ByteOrder::BigEndian)] order: ByteOrder,
    ) {
        // SFSQL carries no Z/M/SRID, so only the 2D subset round-trips
        // exactly
        for geom in corpus() {
            if geom.flags().has_z || geom.flags().has_m {
                continue;
            }
            let wkb = to_wkb(&geom, &opts(WkbDialect::Sfsql, order)).unwrap();
            let decoded = from_wkb(&wkb).unwrap();
            assert_eq!(decoded, geom, "{}", geom.geometry_type());
        }
    }

    #[test]
    fn sfsql_flattens_higher_dimensions() {
        let point_zm = Geometry::point(
            None,
            PointArray::from_coords(true, true, &[1.0, 2.0, 3.0, 4.0]).unwrap(),
        )
        .unwrap();
        let wkb = to_wkb(&point_zm, &opts(WkbDialect::Sfsql, ByteOrder::LittleEndian)).unwrap();
        let decoded = from_wkb(&wkb).unwrap();

        let expected = Geometry::point(None, xy_array(&[1.0, 2.0])).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn decode_known_hex_point() {
        let geom = from_hex_wkb("0101000000000000000000F03F0000000000000040").unwrap();
        assert_eq!(geom.geometry_type(), GeometryType::Point);
        assert_eq!(geom.srid(), None);
        match geom.kind() {
            GeometryKind::Point(pa) => {
                assert_eq!(pa.get(0).unwrap(), Point4D::xy(1.0, 2.0));
            }
            _ => panic!("expected Point"),
        }

        // Lowercase hex decodes too
        let lower = from_hex_wkb("0101000000000000000000f03f0000000000000040").unwrap();
        assert_eq!(lower, geom);
    }

    #[test]
    fn hex_decode_rejects_garbage() {
        assert!(from_hex_wkb("01010").is_err());
        assert!(from_hex_wkb("zz01000000").is_err());
    }

    #[test]
    fn extended_srid_is_inherited_by_children() {
        let multi = Geometry::collection(
            GeometryType::MultiLineString,
            Some(4326),
            vec![
                Geometry::line_string(None, xy_array(&[0.0, 0.0, 1.0, 1.0])),
                Geometry::line_string(None, xy_array(&[2.0, 2.0, 3.0, 3.0])),
            ],
        )
        .unwrap();

        let wkb = to_wkb(&multi, &opts(WkbDialect::Extended, ByteOrder::LittleEndian)).unwrap();
        let decoded = from_wkb(&wkb).unwrap();
        assert_eq!(decoded.srid(), Some(4326));
        match decoded.kind() {
            GeometryKind::Collection(_, geoms) => {
                assert_eq!(geoms.len(), 2);
                for child in geoms {
                    assert_eq!(child.srid(), Some(4326));
                }
            }
            _ => panic!("expected collection"),
        }
    }

    #[test]
    fn endianness_symmetry() {
        for geom in corpus() {
            let ndr = to_wkb(&geom, &opts(WkbDialect::Iso, ByteOrder::LittleEndian)).unwrap();
            let xdr = to_wkb(&geom, &opts(WkbDialect::Iso, ByteOrder::BigEndian)).unwrap();
            assert_eq!(from_wkb(&ndr).unwrap(), from_wkb(&xdr).unwrap());
        }
    }

    #[rstest]
    fn empty_geometries_roundtrip(
        #[values(WkbDialect::Sfsql, WkbDialect::Iso, WkbDialect::Extended)] dialect: WkbDialect,
    ) {
        for gtype in [
            GeometryType::Point,
            GeometryType::LineString,
            GeometryType::Polygon,
            GeometryType::Triangle,
            GeometryType::MultiPolygon,
            GeometryType::GeometryCollection,
            GeometryType::NurbsCurve,
        ] {
            let geom = Geometry::empty(gtype, None, false, false).unwrap();
            let wkb = to_wkb(&geom, &opts(dialect, ByteOrder::LittleEndian)).unwrap();
            let decoded = from_wkb(&wkb).unwrap();
            assert_eq!(decoded, geom, "{gtype} {dialect:?}");
            assert!(decoded.is_empty());
        }
    }

    #[test]
    fn empty_3d_point_keeps_dimensions_in_iso() {
        let geom = Geometry::empty(GeometryType::Point, None, true, false).unwrap();
        let wkb = to_wkb(&geom, &opts(WkbDialect::Iso, ByteOrder::LittleEndian)).unwrap();
        let decoded = from_wkb(&wkb).unwrap();
        assert!(decoded.is_empty());
        assert!(decoded.flags().has_z);
        assert_eq!(decoded, geom);
    }

    #[test]
    fn bare_nurbs_gains_synthesized_knots() {
        let curve = NurbsCurve::try_new(
            2,
            xy_array(&[0.0, 0.0, 1.0, 1.0, 2.0, 0.0]),
            None,
            None,
        )
        .unwrap();
        let geom = Geometry::nurbs(None, curve);

        let wkb = to_wkb(&geom, &opts(WkbDialect::Iso, ByteOrder::LittleEndian)).unwrap();
        let decoded = from_wkb(&wkb).unwrap();

        // Knots are never omitted on the wire, so the decoded curve holds
        // the synthesized clamped uniform vector explicitly
        let decoded_curve = decoded.as_nurbs().unwrap();
        assert!(!decoded_curve.is_rational());
        assert_eq!(
            decoded_curve.knots().unwrap(),
            uniform_clamped_knots(2, 3).unwrap().as_slice()
        );

        // The curve itself is unchanged: same degree, same control points
        assert_eq!(decoded_curve.degree(), 2);
        assert_eq!(decoded_curve.points(), geom.as_nurbs().unwrap().points());
    }

    #[test]
    fn nurbs_weights_reassemble_with_defaults() {
        let curve = NurbsCurve::try_new(
            1,
            xy_array(&[0.0, 0.0, 1.0, 1.0, 2.0, 0.0, 3.0, 1.0]),
            Some(vec![1.0, 3.0, 1.0, 0.5]),
            None,
        )
        .unwrap();
        let geom = Geometry::nurbs(None, curve);

        let wkb = to_wkb(&geom, &opts(WkbDialect::Iso, ByteOrder::BigEndian)).unwrap();
        let decoded = from_wkb(&wkb).unwrap();
        let decoded_curve = decoded.as_nurbs().unwrap();
        assert!(decoded_curve.is_rational());
        // Weights of 1.0 were omitted on the wire and filled back in
        assert_eq!(decoded_curve.weights().unwrap(), &[1.0, 3.0, 1.0, 0.5]);
    }

    #[test]
    fn nurbs_extended_with_srid_roundtrips() {
        let curve = NurbsCurve::try_new(
            2,
            xy_array(&[0.0, 0.0, 1.0, 1.0, 2.0, 0.0]),
            None,
            Some(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]),
        )
        .unwrap();
        let geom = Geometry::nurbs(Some(4326), curve);

        let wkb = to_wkb(&geom, &opts(WkbDialect::Extended, ByteOrder::LittleEndian)).unwrap();
        // Type code: NURBS base 18, ISO 2D (no offsets), SRID bit set
        let code = u32::from_le_bytes(wkb[1..5].try_into().unwrap());
        assert_eq!(code, 18 | WKB_SRID_FLAG);

        let decoded = from_wkb(&wkb).unwrap();
        assert_eq!(decoded, geom);
    }

    #[test]
    fn rejects_malformed_input() {
        // Bad endian marker
        let err = from_wkb(&[9, 1, 0, 0, 0]).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected byte order: 9");

        // Unknown type code
        let err = from_wkb(&[1, 99, 0, 0, 0]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown WKB geometry type identifier 99");

        // Truncated coordinates
        let mut buf = vec![0x01, 0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];
        buf.extend_from_slice(&1.0f64.to_le_bytes());
        let err = from_wkb(&buf).unwrap_err();
        assert!(err.to_string().contains("buffer"));

        // Empty input
        assert!(from_wkb(&[]).is_err());
    }

    #[test]
    fn rejects_disallowed_child() {
        // Hand-built MULTIPOINT containing a LINESTRING
        let mut buf = vec![0x01, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        buf.extend_from_slice(&[0x01, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
        buf.extend_from_slice(&1.0f64.to_le_bytes());
        buf.extend_from_slice(&2.0f64.to_le_bytes());

        let err = from_wkb(&buf).unwrap_err();
        assert_eq!(
            err.to_string(),
            "LineString is not a valid subgeometry for MultiPoint"
        );
    }

    #[test]
    fn rejects_excessive_nesting() {
        // GEOMETRYCOLLECTION nested past the depth limit
        let mut buf = Vec::new();
        for _ in 0..(MAX_NESTING_DEPTH + 2) {
            buf.extend_from_slice(&[0x01, 0x07, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
        }
        let err = from_wkb(&buf).unwrap_err();
        assert!(err.to_string().contains("nesting"));
    }

    #[test]
    fn mixed_endian_children_decode() {
        // A collection whose child uses the opposite byte order from the
        // parent; each geometry announces its own
        let mut buf = vec![0x01, 0x07, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        buf.push(0x00); // big-endian child
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&1.0f64.to_be_bytes());
        buf.extend_from_slice(&2.0f64.to_be_bytes());

        let decoded = from_wkb(&buf).unwrap();
        match decoded.kind() {
            GeometryKind::Collection(_, geoms) => match geoms[0].kind() {
                GeometryKind::Point(pa) => {
                    assert_eq!(pa.get(0).unwrap(), Point4D::xy(1.0, 2.0))
                }
                _ => panic!("expected Point"),
            },
            _ => panic!("expected collection"),
        }
    }
}
