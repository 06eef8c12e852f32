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

//! Well-Known Binary output in the SFSQL, ISO and extended dialects,
//! with optional hex encoding.
//!
//! The writer first computes the exact output size, then walks the tree
//! emitting `[endian][type][srid?][payload]` per geometry. Subgeometries of
//! collections never carry an SRID; they inherit the parent's.

use crate::error::TesseraGeometryError;
use crate::flags::GeomFlags;
use crate::geometry::{Geometry, GeometryKind};
use crate::nurbs::NurbsCurve;
use crate::point_array::PointArray;
use crate::types::{GeometryType, GeometryTypeAndDims};

/// High-bit flags of the extended-WKB type code
pub const WKB_Z_FLAG: u32 = 0x8000_0000;
pub const WKB_M_FLAG: u32 = 0x4000_0000;
pub const WKB_SRID_FLAG: u32 = 0x2000_0000;

/// The quiet-NaN bit pattern used for empty-Point ordinates
pub(crate) const WKB_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

/// Look-up table for the hex writer
pub(crate) const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

/// The three WKB dialects
///
/// SFSQL is two-dimensional: the writer silently discards Z and M
/// ordinates and never emits an SRID, even though the reader side will
/// accept higher-dimensional codes. ISO expresses dimensionality as
/// additive type-code offsets; the extended dialect uses high-bit flags
/// and can embed an SRID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WkbDialect {
    Sfsql,
    Iso,
    Extended,
}

/// NDR (little-endian) or XDR (big-endian) byte ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }
}

/// Options for [to_wkb]
///
/// Exactly one dialect; `byte_order` of `None` means the machine's native
/// order; `hex` doubles every output byte into two ASCII hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WkbOptions {
    pub dialect: WkbDialect,
    pub byte_order: Option<ByteOrder>,
    pub hex: bool,
}

impl WkbOptions {
    pub fn new(dialect: WkbDialect) -> Self {
        Self {
            dialect,
            byte_order: None,
            hex: false,
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = Some(byte_order);
        self
    }

    pub fn with_hex(mut self) -> Self {
        self.hex = true;
        self
    }
}

impl Default for WkbOptions {
    fn default() -> Self {
        Self::new(WkbDialect::Iso)
    }
}

/// Serialize a geometry to WKB
///
/// The output length is checked against the size pass; a disagreement is
/// a sizer bug and fails the encode rather than returning a partial
/// buffer.
pub fn to_wkb(geom: &Geometry, opts: &WkbOptions) -> Result<Vec<u8>, TesseraGeometryError> {
    let ctx = Ctx {
        dialect: opts.dialect,
        order: opts.byte_order.unwrap_or_else(ByteOrder::native),
        hex: opts.hex,
        no_srid: false,
        no_npoints: false,
    };

    let raw_size = geometry_size(geom, ctx);
    let expected = if ctx.hex { raw_size * 2 } else { raw_size };

    let mut buf = Vec::with_capacity(expected);
    write_geometry(geom, &mut buf, ctx);

    if buf.len() != expected {
        return Err(TesseraGeometryError::SizeMismatch {
            expected,
            written: buf.len(),
        });
    }

    log::trace!(
        "wrote {} as {} WKB bytes ({:?})",
        geom.geometry_type(),
        buf.len(),
        opts.dialect
    );
    Ok(buf)
}

/// Serialize a geometry to hex-encoded WKB
pub fn to_hex_wkb(geom: &Geometry, opts: &WkbOptions) -> Result<String, TesseraGeometryError> {
    let mut opts = *opts;
    opts.hex = true;
    let bytes = to_wkb(geom, &opts)?;
    String::from_utf8(bytes)
        .map_err(|e| TesseraGeometryError::External(Box::new(e)))
}

#[derive(Clone, Copy)]
struct Ctx {
    dialect: WkbDialect,
    order: ByteOrder,
    hex: bool,
    /// Set for subgeometries of collections, which inherit the parent SRID
    no_srid: bool,
    /// Set when emitting the single coordinate inside a Point envelope
    no_npoints: bool,
}

impl Ctx {
    fn child(mut self) -> Self {
        self.no_srid = true;
        self.no_npoints = false;
        self
    }
}

fn push_raw(buf: &mut Vec<u8>, bytes: &[u8], ctx: Ctx) {
    if ctx.hex {
        for byte in bytes {
            buf.push(HEX_CHARS[(byte >> 4) as usize]);
            buf.push(HEX_CHARS[(byte & 0x0F) as usize]);
        }
    } else {
        buf.extend_from_slice(bytes);
    }
}

fn write_endian(buf: &mut Vec<u8>, ctx: Ctx) {
    let byte = matches!(ctx.order, ByteOrder::LittleEndian) as u8;
    push_raw(buf, &[byte], ctx);
}

fn write_u32(buf: &mut Vec<u8>, value: u32, ctx: Ctx) {
    let bytes = match ctx.order {
        ByteOrder::LittleEndian => value.to_le_bytes(),
        ByteOrder::BigEndian => value.to_be_bytes(),
    };
    push_raw(buf, &bytes, ctx);
}

fn write_f64(buf: &mut Vec<u8>, value: f64, ctx: Ctx) {
    let bytes = match ctx.order {
        ByteOrder::LittleEndian => value.to_le_bytes(),
        ByteOrder::BigEndian => value.to_be_bytes(),
    };
    push_raw(buf, &bytes, ctx);
}

fn write_nan(buf: &mut Vec<u8>, ctx: Ctx) {
    write_f64(buf, f64::from_bits(WKB_NAN_BITS), ctx);
}

/// Whether this geometry's own SRID goes on the wire
fn needs_srid(geom: &Geometry, ctx: Ctx) -> bool {
    !ctx.no_srid && ctx.dialect == WkbDialect::Extended && geom.srid().is_some()
}

/// The dimensionality expressed in the output for this point array
///
/// SFSQL is always two-dimensional; the other dialects write every stored
/// ordinate.
fn out_dims(pa: &PointArray, ctx: Ctx) -> usize {
    match ctx.dialect {
        WkbDialect::Sfsql => 2,
        WkbDialect::Iso | WkbDialect::Extended => pa.ndims(),
    }
}

/// The WKB type code for this geometry under the dialect in `ctx`
///
/// A NURBS curve always encodes its dimensionality as ISO offsets, whatever
/// the dialect; when it embeds an SRID the extended SRID bit is set so the
/// stream remains self-describing.
fn type_code(geom: &Geometry, ctx: Ctx) -> u32 {
    let gtype = geom.geometry_type();
    let flags = geom.flags();

    if gtype == GeometryType::NurbsCurve {
        let mut code = iso_code(gtype, flags);
        if needs_srid(geom, ctx) {
            code |= WKB_SRID_FLAG;
        }
        return code;
    }

    match ctx.dialect {
        WkbDialect::Sfsql => gtype.wkb_id(),
        WkbDialect::Iso => iso_code(gtype, flags),
        WkbDialect::Extended => {
            let mut code = gtype.wkb_id();
            if flags.has_z {
                code |= WKB_Z_FLAG;
            }
            if flags.has_m {
                code |= WKB_M_FLAG;
            }
            if needs_srid(geom, ctx) {
                code |= WKB_SRID_FLAG;
            }
            code
        }
    }
}

fn iso_code(gtype: GeometryType, flags: GeomFlags) -> u32 {
    GeometryTypeAndDims::new(gtype, flags.dimensions()).wkb_id()
}

/// On-disk SRID value; unknown never reaches here because [needs_srid]
/// requires one to be present
fn srid_value(geom: &Geometry) -> u32 {
    geom.srid().unwrap_or(0) as u32
}

fn empty_size(geom: &Geometry, ctx: Ctx) -> usize {
    let mut size = 1 + 4;
    if needs_srid(geom, ctx) {
        size += 4;
    }
    match geom.kind() {
        // POINT EMPTY is a point of NaN ordinates, one per output dimension
        GeometryKind::Point(pa) => size + out_dims(pa, ctx) * 8,
        // Everything else flags emptiness with a zero element count
        _ => size + 4,
    }
}

fn write_empty(geom: &Geometry, buf: &mut Vec<u8>, ctx: Ctx) {
    write_endian(buf, ctx);
    write_u32(buf, type_code(geom, ctx), ctx);
    if needs_srid(geom, ctx) {
        write_u32(buf, srid_value(geom), ctx);
    }
    match geom.kind() {
        GeometryKind::Point(pa) => {
            for _ in 0..out_dims(pa, ctx) {
                write_nan(buf, ctx);
            }
        }
        _ => write_u32(buf, 0, ctx),
    }
}

fn ptarray_size(pa: &PointArray, ctx: Ctx) -> usize {
    let mut size = 0;
    if !ctx.no_npoints {
        size += 4;
    }
    size + pa.npoints() as usize * out_dims(pa, ctx) * 8
}

fn write_ptarray(pa: &PointArray, buf: &mut Vec<u8>, ctx: Ctx) {
    let dims = out_dims(pa, ctx);

    if !ctx.no_npoints {
        write_u32(buf, pa.npoints(), ctx);
    }

    // Bulk-copy the coordinates when the dimensionality matches, the
    // output is binary, and the requested byte order is the machine's
    if pa.npoints() > 0 && dims == pa.ndims() && ctx.order == ByteOrder::native() && !ctx.hex {
        buf.extend_from_slice(pa.as_bytes());
        return;
    }

    for i in 0..pa.npoints() as usize {
        for j in 0..dims {
            write_f64(buf, pa.ordinate(i, j), ctx);
        }
    }
}

fn nurbs_size(geom: &Geometry, curve: &NurbsCurve, ctx: Ctx) -> usize {
    let mut size = 1 + 4;
    if needs_srid(geom, ctx) {
        size += 4;
    }

    size += 4; // degree
    size += 4; // npoints

    let npoints = curve.points().npoints() as usize;
    let dims = curve.points().ndims();
    for i in 0..npoints {
        size += 1 + dims * 8 + 1;
        if nurbs_weight_on_wire(curve, i).is_some() {
            size += 8;
        }
    }

    size += 4; // nknots
    if let Some(knots) = curve.knots_for_wire() {
        size += 8 * knots.len();
    }

    size
}

/// The weight written for control point `i`, or `None` when it is the
/// default 1.0 and is omitted from the wire
fn nurbs_weight_on_wire(curve: &NurbsCurve, i: usize) -> Option<f64> {
    let weight = *curve.weights()?.get(i)?;
    (weight != 1.0).then_some(weight)
}

/// ISO 13249-3 NURBS structure: degree and control point count, then each
/// control point as `[endian][coords][has_weight][weight?]`, then the knot
/// vector. Knots are never omitted on the wire; a clamped uniform vector
/// is synthesized when the curve stores none.
fn write_nurbs(geom: &Geometry, curve: &NurbsCurve, buf: &mut Vec<u8>, ctx: Ctx) {
    write_endian(buf, ctx);
    write_u32(buf, type_code(geom, ctx), ctx);
    if needs_srid(geom, ctx) {
        write_u32(buf, srid_value(geom), ctx);
    }

    write_u32(buf, curve.degree(), ctx);

    let points = curve.points();
    write_u32(buf, points.npoints(), ctx);

    let dims = points.ndims();
    for i in 0..points.npoints() as usize {
        write_endian(buf, ctx);
        for j in 0..dims {
            write_f64(buf, points.ordinate(i, j), ctx);
        }
        match nurbs_weight_on_wire(curve, i) {
            Some(weight) => {
                push_raw(buf, &[1], ctx);
                write_f64(buf, weight, ctx);
            }
            None => push_raw(buf, &[0], ctx),
        }
    }

    match curve.knots_for_wire() {
        Some(knots) => {
            write_u32(buf, knots.len() as u32, ctx);
            for knot in &knots {
                write_f64(buf, *knot, ctx);
            }
        }
        // Too few control points to synthesize a vector
        None => write_u32(buf, 0, ctx),
    }
}

fn geometry_size(geom: &Geometry, ctx: Ctx) -> usize {
    // Short-circuit empties to the canonical empty form, except in the
    // extended dialect where only the variant writers special-case them
    if ctx.dialect != WkbDialect::Extended && geom.is_empty() {
        return empty_size(geom, ctx);
    }

    let extended_empty =
        ctx.dialect == WkbDialect::Extended && geom.is_empty();

    let mut size = 1 + 4;
    if needs_srid(geom, ctx) {
        size += 4;
    }

    match geom.kind() {
        GeometryKind::Point(pa) => {
            if extended_empty {
                return empty_size(geom, ctx);
            }
            size + ptarray_size(pa, Ctx { no_npoints: true, ..ctx })
        }
        GeometryKind::LineString(pa) | GeometryKind::CircularString(pa) => {
            if extended_empty {
                return empty_size(geom, ctx);
            }
            size + ptarray_size(pa, ctx)
        }
        GeometryKind::Triangle(pa) => {
            if extended_empty {
                return empty_size(geom, ctx);
            }
            // nrings word plus the single ring
            size + 4 + ptarray_size(pa, ctx)
        }
        GeometryKind::Polygon(rings) => {
            if extended_empty {
                return empty_size(geom, ctx);
            }
            size += 4;
            for ring in rings {
                size += ptarray_size(ring, ctx);
            }
            size
        }
        GeometryKind::Collection(_, geoms) => {
            size += 4;
            for child in geoms {
                size += geometry_size(child, ctx.child());
            }
            size
        }
        GeometryKind::NurbsCurve(curve) => nurbs_size(geom, curve, ctx),
    }
}

fn write_geometry(geom: &Geometry, buf: &mut Vec<u8>, ctx: Ctx) {
    if ctx.dialect != WkbDialect::Extended && geom.is_empty() {
        write_empty(geom, buf, ctx);
        return;
    }

    let extended_empty =
        ctx.dialect == WkbDialect::Extended && geom.is_empty();

    match geom.kind() {
        GeometryKind::Point(pa) => {
            if extended_empty {
                write_empty(geom, buf, ctx);
                return;
            }
            write_endian(buf, ctx);
            write_u32(buf, type_code(geom, ctx), ctx);
            if needs_srid(geom, ctx) {
                write_u32(buf, srid_value(geom), ctx);
            }
            write_ptarray(pa, buf, Ctx { no_npoints: true, ..ctx });
        }
        GeometryKind::LineString(pa) | GeometryKind::CircularString(pa) => {
            if extended_empty {
                write_empty(geom, buf, ctx);
                return;
            }
            write_endian(buf, ctx);
            write_u32(buf, type_code(geom, ctx), ctx);
            if needs_srid(geom, ctx) {
                write_u32(buf, srid_value(geom), ctx);
            }
            write_ptarray(pa, buf, ctx);
        }
        GeometryKind::Triangle(pa) => {
            if extended_empty {
                write_empty(geom, buf, ctx);
                return;
            }
            write_endian(buf, ctx);
            write_u32(buf, type_code(geom, ctx), ctx);
            if needs_srid(geom, ctx) {
                write_u32(buf, srid_value(geom), ctx);
            }
            // One ring; it's a triangle
            write_u32(buf, 1, ctx);
            write_ptarray(pa, buf, ctx);
        }
        GeometryKind::Polygon(rings) => {
            if extended_empty {
                write_empty(geom, buf, ctx);
                return;
            }
            write_endian(buf, ctx);
            write_u32(buf, type_code(geom, ctx), ctx);
            if needs_srid(geom, ctx) {
                write_u32(buf, srid_value(geom), ctx);
            }
            write_u32(buf, rings.len() as u32, ctx);
            for ring in rings {
                write_ptarray(ring, buf, ctx);
            }
        }
        GeometryKind::Collection(_, geoms) => {
            write_endian(buf, ctx);
            write_u32(buf, type_code(geom, ctx), ctx);
            if needs_srid(geom, ctx) {
                write_u32(buf, srid_value(geom), ctx);
            }
            write_u32(buf, geoms.len() as u32, ctx);
            // Subgeometries do not get SRIDs; they inherit from their
            // parents
            for child in geoms {
                write_geometry(child, buf, ctx.child());
            }
        }
        GeometryKind::NurbsCurve(curve) => write_nurbs(geom, curve, buf, ctx),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::point_array::PointArray;
    use crate::types::GeometryType;
    use std::str::FromStr;
    use wkb::writer::{write_geometry as ecosystem_write, WriteOptions};
    use wkb::Endianness;
    use wkt::Wkt;

    fn xy_array(coords: &[f64]) -> PointArray<'static> {
        PointArray::from_coords(false, false, coords).unwrap()
    }

    fn ecosystem_wkb(wkt_str: &str) -> Vec<u8> {
        let wkt: Wkt = Wkt::from_str(wkt_str).unwrap();
        let mut buf = vec![];
        ecosystem_write(
            &mut buf,
            &wkt,
            &WriteOptions {
                endianness: Endianness::LittleEndian,
            },
        )
        .unwrap();
        buf
    }

    fn ndr(dialect: WkbDialect) -> WkbOptions {
        WkbOptions::new(dialect).with_byte_order(ByteOrder::LittleEndian)
    }

    #[test]
    fn point_hex_sfsql_ndr() {
        let geom = Geometry::point(None, xy_array(&[1.0, 2.0])).unwrap();
        let hex = to_hex_wkb(&geom, &ndr(WkbDialect::Sfsql)).unwrap();
        assert_eq!(
            hex,
            "0101000000000000000000F03F0000000000000040"
        );
    }

    #[test]
    fn hex_is_involution_of_binary() {
        let geom = Geometry::line_string(Some(4326), xy_array(&[0.0, 0.0, 10.0, 5.0]));
        for dialect in [WkbDialect::Sfsql, WkbDialect::Iso, WkbDialect::Extended] {
            let binary = to_wkb(&geom, &ndr(dialect)).unwrap();
            let hex = to_hex_wkb(&geom, &ndr(dialect)).unwrap();
            assert_eq!(hex.len(), binary.len() * 2);

            let unhexed: Vec<u8> = (0..hex.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
                .collect();
            assert_eq!(unhexed, binary);
        }
    }

    // For 2D geometries the ISO form carries no dimension offsets, so
    // output must be byte-identical to the GeoRust writer fed the same
    // shape as WKT
    #[test]
    fn matches_ecosystem_writer() {
        let point = Geometry::point(None, xy_array(&[0.0, 1.0])).unwrap();
        let line = Geometry::line_string(None, xy_array(&[0.0, 1.0, 2.0, 3.0]));
        let empty_line = Geometry::empty(GeometryType::LineString, None, false, false).unwrap();
        let polygon = Geometry::polygon(
            None,
            vec![xy_array(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0])],
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
        let multiline = Geometry::collection(
            GeometryType::MultiLineString,
            None,
            vec![
                Geometry::line_string(None, xy_array(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0])),
                Geometry::line_string(None, xy_array(&[3.0, 3.0, 4.0, 4.0])),
            ],
        )
        .unwrap();
        let multipolygon = Geometry::collection(
            GeometryType::MultiPolygon,
            None,
            vec![
                Geometry::polygon(
                    None,
                    vec![xy_array(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0])],
                )
                .unwrap(),
                Geometry::polygon(
                    None,
                    vec![xy_array(&[2.0, 2.0, 3.0, 2.0, 2.0, 3.0, 2.0, 2.0])],
                )
                .unwrap(),
            ],
        )
        .unwrap();
        let empty_multipolygon =
            Geometry::empty(GeometryType::MultiPolygon, None, false, false).unwrap();
        let collection = Geometry::collection(
            GeometryType::GeometryCollection,
            None,
            vec![
                Geometry::point(None, xy_array(&[1.0, 2.0])).unwrap(),
                Geometry::line_string(None, xy_array(&[1.0, 2.0, 2.0, 2.0])),
            ],
        )
        .unwrap();
        let empty_collection =
            Geometry::empty(GeometryType::GeometryCollection, None, false, false).unwrap();

        let cases: Vec<(&str, &Geometry)> = vec![
            ("POINT (0 1)", &point),
            ("LINESTRING (0 1, 2 3)", &line),
            ("LINESTRING EMPTY", &empty_line),
            ("POLYGON ((0 0, 1 0, 0 1, 0 0))", &polygon),
            ("MULTIPOINT ((0 0), (1 1))", &multipoint),
            (
                "MULTILINESTRING ((0 0, 1 1, 2 2), (3 3, 4 4))",
                &multiline,
            ),
            (
                "MULTIPOLYGON (((0 0, 1 0, 0 1, 0 0)), ((2 2, 3 2, 2 3, 2 2)))",
                &multipolygon,
            ),
            ("MULTIPOLYGON EMPTY", &empty_multipolygon),
            (
                "GEOMETRYCOLLECTION (POINT (1 2), LINESTRING (1 2, 2 2))",
                &collection,
            ),
            ("GEOMETRYCOLLECTION EMPTY", &empty_collection),
        ];

        for (wkt_str, geom) in cases {
            let ours = to_wkb(geom, &ndr(WkbDialect::Iso)).unwrap();
            assert_eq!(ours, ecosystem_wkb(wkt_str), "{wkt_str}");
        }
    }

    #[test]
    fn empty_point_is_nan_nan() {
        let geom = Geometry::empty(GeometryType::Point, None, false, false).unwrap();

        let nan_le = f64::from_bits(WKB_NAN_BITS).to_le_bytes();
        let mut expected = vec![0x01, 0x01, 0x00, 0x00, 0x00];
        expected.extend_from_slice(&nan_le);
        expected.extend_from_slice(&nan_le);

        // All dialects spell POINT EMPTY with NaN ordinates
        for dialect in [WkbDialect::Sfsql, WkbDialect::Iso, WkbDialect::Extended] {
            assert_eq!(to_wkb(&geom, &ndr(dialect)).unwrap(), expected);
        }
    }

    #[test]
    fn empty_point_iso_3d_writes_three_nans() {
        let geom = Geometry::empty(GeometryType::Point, None, true, false).unwrap();
        let wkb = to_wkb(&geom, &ndr(WkbDialect::Iso)).unwrap();
        // endian + type 1001 + 3 NaN doubles
        assert_eq!(wkb.len(), 1 + 4 + 3 * 8);
        assert_eq!(&wkb[1..5], &1001u32.to_le_bytes());
    }

    #[test]
    fn xdr_point_bytes() {
        let geom = Geometry::point(None, xy_array(&[1.0, 2.0])).unwrap();
        let wkb = to_wkb(
            &geom,
            &WkbOptions::new(WkbDialect::Sfsql).with_byte_order(ByteOrder::BigEndian),
        )
        .unwrap();

        let mut expected = vec![0x00, 0x00, 0x00, 0x00, 0x01];
        expected.extend_from_slice(&1.0f64.to_be_bytes());
        expected.extend_from_slice(&2.0f64.to_be_bytes());
        assert_eq!(wkb, expected);
    }

    #[test]
    fn extended_type_code_carries_flags() {
        let points =
            PointArray::from_coords(true, true, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut geom = Geometry::point(Some(4326), points).unwrap();

        let wkb = to_wkb(&geom, &ndr(WkbDialect::Extended)).unwrap();
        let code = u32::from_le_bytes(wkb[1..5].try_into().unwrap());
        assert_eq!(code, 1 | WKB_Z_FLAG | WKB_M_FLAG | WKB_SRID_FLAG);
        let srid = u32::from_le_bytes(wkb[5..9].try_into().unwrap());
        assert_eq!(srid, 4326);

        // Without an SRID the flag bit stays clear
        geom.set_srid(None);
        let wkb = to_wkb(&geom, &ndr(WkbDialect::Extended)).unwrap();
        let code = u32::from_le_bytes(wkb[1..5].try_into().unwrap());
        assert_eq!(code, 1 | WKB_Z_FLAG | WKB_M_FLAG);
    }

    #[test]
    fn iso_type_code_adds_offsets() {
        let points = PointArray::from_coords(true, false, &[1.0, 2.0, 3.0]).unwrap();
        let geom = Geometry::point(Some(4326), points).unwrap();
        let wkb = to_wkb(&geom, &ndr(WkbDialect::Iso)).unwrap();
        let code = u32::from_le_bytes(wkb[1..5].try_into().unwrap());
        // ISO never carries the SRID
        assert_eq!(code, 1001);
        assert_eq!(wkb.len(), 1 + 4 + 3 * 8);
    }

    #[test]
    fn sfsql_discards_higher_dimensions() {
        let points =
            PointArray::from_coords(true, true, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let geom = Geometry::point(Some(4326), points).unwrap();
        let wkb = to_wkb(&geom, &ndr(WkbDialect::Sfsql)).unwrap();
        assert_eq!(wkb.len(), 1 + 4 + 2 * 8);
        assert_eq!(&wkb[1..5], &1u32.to_le_bytes());
    }

    #[test]
    fn collection_children_carry_no_srid() {
        let line1 = Geometry::line_string(None, xy_array(&[0.0, 0.0, 1.0, 1.0]));
        let line2 = Geometry::line_string(None, xy_array(&[2.0, 2.0, 3.0, 3.0]));
        let multi = Geometry::collection(
            GeometryType::MultiLineString,
            Some(4326),
            vec![line1, line2],
        )
        .unwrap();

        let wkb = to_wkb(&multi, &ndr(WkbDialect::Extended)).unwrap();

        // Outer header: endian + (5 | SRID flag) + srid
        let code = u32::from_le_bytes(wkb[1..5].try_into().unwrap());
        assert_eq!(code, 5 | WKB_SRID_FLAG);
        assert_eq!(u32::from_le_bytes(wkb[5..9].try_into().unwrap()), 4326);

        // First child starts after ngeoms: plain LineString code, no SRID
        // flag, coordinates immediately after its npoints
        let child_code = u32::from_le_bytes(wkb[14..18].try_into().unwrap());
        assert_eq!(child_code, 2);
    }

    #[test]
    fn nurbs_wire_structure() {
        let points = xy_array(&[0.0, 0.0, 1.0, 1.0, 2.0, 0.0]);
        let curve = NurbsCurve::try_new(2, points, Some(vec![1.0, 2.0, 1.0]), None).unwrap();
        let geom = Geometry::nurbs(None, curve);

        let wkb = to_wkb(&geom, &ndr(WkbDialect::Iso)).unwrap();

        let mut at = 0;
        let mut u32_at = |at: &mut usize| {
            let v = u32::from_le_bytes(wkb[*at..*at + 4].try_into().unwrap());
            *at += 4;
            v
        };

        assert_eq!(wkb[at], 0x01);
        at += 1;
        assert_eq!(u32_at(&mut at), 18); // NurbsCurve, 2D
        assert_eq!(u32_at(&mut at), 2); // degree
        assert_eq!(u32_at(&mut at), 3); // npoints

        // Control point 0: endian + 2 doubles + has_weight 0 (weight 1.0
        // is not emitted)
        assert_eq!(wkb[at], 0x01);
        at += 1 + 16;
        assert_eq!(wkb[at], 0);
        at += 1;

        // Control point 1: weight 2.0 present
        at += 1 + 16;
        assert_eq!(wkb[at], 1);
        at += 1;
        assert_eq!(
            f64::from_le_bytes(wkb[at..at + 8].try_into().unwrap()),
            2.0
        );
        at += 8;

        // Control point 2: default weight again
        at += 1 + 16;
        assert_eq!(wkb[at], 0);
        at += 1;

        // Knots were synthesized: clamped uniform, npoints+degree+1 = 6
        assert_eq!(u32_at(&mut at), 6);
        let knots: Vec<f64> = (0..6)
            .map(|i| f64::from_le_bytes(wkb[at + i * 8..at + i * 8 + 8].try_into().unwrap()))
            .collect();
        assert_eq!(knots, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        at += 48;
        assert_eq!(at, wkb.len());
    }

    #[test]
    fn nurbs_uses_iso_dims_in_every_dialect() {
        let points = PointArray::from_coords(true, false, &[0.0, 0.0, 5.0, 1.0, 1.0, 5.0]).unwrap();
        let curve = NurbsCurve::try_new(1, points, None, None).unwrap();
        let geom = Geometry::nurbs(None, curve);

        for dialect in [WkbDialect::Sfsql, WkbDialect::Iso, WkbDialect::Extended] {
            let wkb = to_wkb(&geom, &ndr(dialect)).unwrap();
            let code = u32::from_le_bytes(wkb[1..5].try_into().unwrap());
            assert_eq!(code, 1018, "{dialect:?}");
        }
    }

    #[test]
    fn empty_nonpoint_geometries_use_zero_count() {
        for (gtype, wkb_id) in [
            (GeometryType::LineString, 2u32),
            (GeometryType::Polygon, 3),
            (GeometryType::MultiPolygon, 6),
            (GeometryType::GeometryCollection, 7),
            (GeometryType::CircularString, 8),
        ] {
            let geom = Geometry::empty(gtype, None, false, false).unwrap();
            let wkb = to_wkb(&geom, &ndr(WkbDialect::Iso)).unwrap();
            let mut expected = vec![0x01];
            expected.extend_from_slice(&wkb_id.to_le_bytes());
            expected.extend_from_slice(&0u32.to_le_bytes());
            assert_eq!(wkb, expected, "{gtype}");
        }
    }

    #[test]
    fn native_and_swapped_output_have_equal_size() {
        let geom = Geometry::line_string(Some(4326), xy_array(&[0.0, 0.0, 10.0, 5.0]));
        let little = to_wkb(
            &geom,
            &WkbOptions::new(WkbDialect::Iso).with_byte_order(ByteOrder::LittleEndian),
        )
        .unwrap();
        let big = to_wkb(
            &geom,
            &WkbOptions::new(WkbDialect::Iso).with_byte_order(ByteOrder::BigEndian),
        )
        .unwrap();
        assert_eq!(little.len(), big.len());
        assert_ne!(little, big);

        // Default byte order is the machine's
        let native = to_wkb(&geom, &WkbOptions::new(WkbDialect::Iso)).unwrap();
        match ByteOrder::native() {
            ByteOrder::LittleEndian => assert_eq!(native, little),
            ByteOrder::BigEndian => assert_eq!(native, big),
        }
    }
}
