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
use std::{fmt::Display, str::FromStr};

use geo_traits::Dimensions;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::error::TesseraGeometryError;

/// Geometry types
///
/// An enumerator for the set of natively supported geometry types without
/// considering [Dimensions]. See [GeometryTypeAndDims] for a struct to
/// track both.
///
/// Each type carries two numeric identities: the type word used in the
/// serialized (GS2) payload grammar, and the base code used in WKB type
/// integers. The two diverge for PolyhedralSurface, Triangle and Tin, which
/// were assigned WKB codes after their serialized numbering was fixed.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Hash, Clone, Copy)]
pub enum GeometryType {
    /// Point geometry type
    Point,
    /// LineString geometry type
    LineString,
    /// Polygon geometry type
    Polygon,
    /// MultiPoint geometry type
    MultiPoint,
    /// MultiLineString geometry type
    MultiLineString,
    /// MultiPolygon geometry type
    MultiPolygon,
    /// GeometryCollection geometry type
    GeometryCollection,
    /// CircularString geometry type
    CircularString,
    /// CompoundCurve geometry type
    CompoundCurve,
    /// CurvePolygon geometry type
    CurvePolygon,
    /// MultiCurve geometry type
    MultiCurve,
    /// MultiSurface geometry type
    MultiSurface,
    /// PolyhedralSurface geometry type
    PolyhedralSurface,
    /// Triangle geometry type
    Triangle,
    /// TIN geometry type
    Tin,
    /// NURBS curve geometry type
    NurbsCurve,
}

impl GeometryType {
    /// Construct a geometry type from a GS2 payload type word
    pub fn try_from_gs2_id(gs2_id: u32) -> Result<Self, TesseraGeometryError> {
        match gs2_id {
            1 => Ok(Self::Point),
            2 => Ok(Self::LineString),
            3 => Ok(Self::Polygon),
            4 => Ok(Self::MultiPoint),
            5 => Ok(Self::MultiLineString),
            6 => Ok(Self::MultiPolygon),
            7 => Ok(Self::GeometryCollection),
            8 => Ok(Self::CircularString),
            9 => Ok(Self::CompoundCurve),
            10 => Ok(Self::CurvePolygon),
            11 => Ok(Self::MultiCurve),
            12 => Ok(Self::MultiSurface),
            13 => Ok(Self::PolyhedralSurface),
            14 => Ok(Self::Triangle),
            15 => Ok(Self::Tin),
            16 => Ok(Self::NurbsCurve),
            _ => Err(TesseraGeometryError::Invalid(format!(
                "Unknown geometry type identifier {gs2_id}"
            ))),
        }
    }

    /// The type word written at the start of a GS2 geometry payload
    pub fn gs2_id(&self) -> u32 {
        match self {
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
            Self::MultiPoint => 4,
            Self::MultiLineString => 5,
            Self::MultiPolygon => 6,
            Self::GeometryCollection => 7,
            Self::CircularString => 8,
            Self::CompoundCurve => 9,
            Self::CurvePolygon => 10,
            Self::MultiCurve => 11,
            Self::MultiSurface => 12,
            Self::PolyhedralSurface => 13,
            Self::Triangle => 14,
            Self::Tin => 15,
            Self::NurbsCurve => 16,
        }
    }

    /// Construct a geometry type from the base (dimension-free) component
    /// of a WKB type integer
    pub fn try_from_wkb_id(wkb_id: u32) -> Result<Self, TesseraGeometryError> {
        match wkb_id {
            1 => Ok(Self::Point),
            2 => Ok(Self::LineString),
            3 => Ok(Self::Polygon),
            4 => Ok(Self::MultiPoint),
            5 => Ok(Self::MultiLineString),
            6 => Ok(Self::MultiPolygon),
            7 => Ok(Self::GeometryCollection),
            8 => Ok(Self::CircularString),
            9 => Ok(Self::CompoundCurve),
            10 => Ok(Self::CurvePolygon),
            11 => Ok(Self::MultiCurve),
            12 => Ok(Self::MultiSurface),
            15 => Ok(Self::PolyhedralSurface),
            16 => Ok(Self::Tin),
            17 => Ok(Self::Triangle),
            18 => Ok(Self::NurbsCurve),
            _ => Err(TesseraGeometryError::Invalid(format!(
                "Unknown WKB geometry type identifier {wkb_id}"
            ))),
        }
    }

    /// WKB integer identifier
    ///
    /// The geometry type portion of the WKB identifier, before any dimension
    /// offset or flag bits are applied.
    pub fn wkb_id(&self) -> u32 {
        match self {
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
            Self::MultiPoint => 4,
            Self::MultiLineString => 5,
            Self::MultiPolygon => 6,
            Self::GeometryCollection => 7,
            Self::CircularString => 8,
            Self::CompoundCurve => 9,
            Self::CurvePolygon => 10,
            Self::MultiCurve => 11,
            Self::MultiSurface => 12,
            Self::PolyhedralSurface => 15,
            Self::Tin => 16,
            Self::Triangle => 17,
            Self::NurbsCurve => 18,
        }
    }

    /// Human-readable type name, also used by [Display] and [FromStr]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
            Self::CircularString => "CircularString",
            Self::CompoundCurve => "CompoundCurve",
            Self::CurvePolygon => "CurvePolygon",
            Self::MultiCurve => "MultiCurve",
            Self::MultiSurface => "MultiSurface",
            Self::PolyhedralSurface => "PolyhedralSurface",
            Self::Triangle => "Triangle",
            Self::Tin => "TIN",
            Self::NurbsCurve => "NurbsCurve",
        }
    }

    /// Whether this type holds subgeometries rather than coordinates
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Self::MultiPoint
                | Self::MultiLineString
                | Self::MultiPolygon
                | Self::GeometryCollection
                | Self::CompoundCurve
                | Self::CurvePolygon
                | Self::MultiCurve
                | Self::MultiSurface
                | Self::PolyhedralSurface
                | Self::Tin
        )
    }

    /// Whether a collection of this type admits `child` as a subgeometry
    ///
    /// Checked when decoding serialized collections so that corrupt or
    /// hand-built buffers cannot smuggle e.g. a Polygon into a MultiPoint.
    pub fn allows_child(&self, child: GeometryType) -> bool {
        use GeometryType::*;
        match self {
            MultiPoint => matches!(child, Point),
            MultiLineString => matches!(child, LineString),
            MultiPolygon => matches!(child, Polygon | Triangle),
            MultiCurve => matches!(child, LineString | CircularString | CompoundCurve),
            MultiSurface => matches!(child, Polygon | CurvePolygon),
            CurvePolygon => matches!(child, LineString | CircularString | CompoundCurve),
            CompoundCurve => matches!(child, LineString | CircularString),
            PolyhedralSurface => matches!(child, Polygon),
            Tin => matches!(child, Triangle),
            GeometryCollection => true,
            _ => false,
        }
    }
}

impl Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeometryType {
    type Err = TesseraGeometryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value_lower = value.to_ascii_lowercase();
        match value_lower.as_str() {
            "point" => Ok(Self::Point),
            "linestring" => Ok(Self::LineString),
            "polygon" => Ok(Self::Polygon),
            "multipoint" => Ok(Self::MultiPoint),
            "multilinestring" => Ok(Self::MultiLineString),
            "multipolygon" => Ok(Self::MultiPolygon),
            "geometrycollection" => Ok(Self::GeometryCollection),
            "circularstring" => Ok(Self::CircularString),
            "compoundcurve" => Ok(Self::CompoundCurve),
            "curvepolygon" => Ok(Self::CurvePolygon),
            "multicurve" => Ok(Self::MultiCurve),
            "multisurface" => Ok(Self::MultiSurface),
            "polyhedralsurface" => Ok(Self::PolyhedralSurface),
            "triangle" => Ok(Self::Triangle),
            "tin" => Ok(Self::Tin),
            "nurbscurve" => Ok(Self::NurbsCurve),
            _ => Err(TesseraGeometryError::Invalid(format!(
                "Invalid geometry type string: '{value}'"
            ))),
        }
    }
}

/// Geometry type and dimension
///
/// Combines a [GeometryType] with [Dimensions] to handle cases where these
/// concepts are represented together, most notably the ISO WKB type integer
/// where dimensionality is an additive offset (e.g., 1001 for Point Z).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, SerializeDisplay, DeserializeFromStr)]
pub struct GeometryTypeAndDims {
    geometry_type: GeometryType,
    dimensions: Dimensions,
}

impl GeometryTypeAndDims {
    /// Create from [GeometryType] and [Dimensions]
    pub fn new(geometry_type: GeometryType, dimensions: Dimensions) -> Self {
        Self {
            geometry_type,
            dimensions,
        }
    }

    /// The [GeometryType]
    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    /// The [Dimensions]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Create from an ISO WKB integer identifier (e.g., 1001 for Point Z)
    pub fn try_from_wkb_id(wkb_id: u32) -> Result<Self, TesseraGeometryError> {
        let dimensions = match wkb_id / 1000 {
            0 => Dimensions::Xy,
            1 => Dimensions::Xyz,
            2 => Dimensions::Xym,
            3 => Dimensions::Xyzm,
            _ => {
                return Err(TesseraGeometryError::Invalid(format!(
                    "Unknown dimensions in ISO WKB geometry type: {wkb_id}"
                )))
            }
        };

        let geometry_type = GeometryType::try_from_wkb_id(wkb_id % 1000)?;
        Ok(Self {
            geometry_type,
            dimensions,
        })
    }

    /// ISO WKB integer identifier (e.g., 1001 for Point Z)
    pub fn wkb_id(&self) -> u32 {
        let dimensions_id = match self.dimensions {
            Dimensions::Xy => 0,
            Dimensions::Xyz => 1000,
            Dimensions::Xym => 2000,
            Dimensions::Xyzm => 3000,
            Dimensions::Unknown(n) => match n {
                2 => 0,
                3 => 1000,
                4 => 3000,
                _ => {
                    // Avoid a panic unless in debug mode
                    debug_assert!(false, "Unknown dimensions in GeometryTypeAndDims");
                    0
                }
            },
        };

        dimensions_id + self.geometry_type.wkb_id()
    }
}

impl From<(GeometryType, Dimensions)> for GeometryTypeAndDims {
    fn from(value: (GeometryType, Dimensions)) -> Self {
        Self {
            geometry_type: value.0,
            dimensions: value.1,
        }
    }
}

impl Display for GeometryTypeAndDims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suffix = match self.dimensions {
            Dimensions::Xy => "",
            Dimensions::Xyz => " Z",
            Dimensions::Xym => " M",
            Dimensions::Xyzm => " ZM",
            Dimensions::Unknown(_) => " Unknown",
        };

        f.write_str(self.geometry_type.name())?;
        f.write_str(suffix)
    }
}

impl FromStr for GeometryTypeAndDims {
    type Err = TesseraGeometryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.split_ascii_whitespace();
        let geometry_type = match parts.next() {
            Some(maybe_geometry_type) => GeometryType::from_str(maybe_geometry_type)?,
            None => {
                return Err(TesseraGeometryError::Invalid(format!(
                    "Invalid geometry type string: '{value}'"
                )))
            }
        };

        let dimensions = match parts.next() {
            Some(maybe_dimensions) => match maybe_dimensions {
                "z" | "Z" => Dimensions::Xyz,
                "m" | "M" => Dimensions::Xym,
                "zm" | "ZM" => Dimensions::Xyzm,
                _ => {
                    return Err(TesseraGeometryError::Invalid(format!(
                        "invalid geometry type string: '{value}'"
                    )))
                }
            },
            None => Dimensions::Xy,
        };

        if parts.next().is_some() {
            return Err(TesseraGeometryError::Invalid(format!(
                "invalid geometry type string: '{value}'"
            )));
        }

        Ok(Self {
            geometry_type,
            dimensions,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use rstest::rstest;
    use Dimensions::*;
    use GeometryType::*;

    #[rstest]
    fn geometry_type_gs2_id_roundtrip(
        #[values(
            (Point, 1),
            (LineString, 2),
            (Polygon, 3),
            (MultiPoint, 4),
            (MultiLineString, 5),
            (MultiPolygon, 6),
            (GeometryCollection, 7),
            (CircularString, 8),
            (CompoundCurve, 9),
            (CurvePolygon, 10),
            (MultiCurve, 11),
            (MultiSurface, 12),
            (PolyhedralSurface, 13),
            (Triangle, 14),
            (Tin, 15),
            (NurbsCurve, 16)
        )]
        geometry_type_and_id: (GeometryType, u32),
    ) {
        let (geometry_type, gs2_id) = geometry_type_and_id;
        assert_eq!(geometry_type.gs2_id(), gs2_id);
        assert_eq!(
            GeometryType::try_from_gs2_id(gs2_id).unwrap(),
            geometry_type
        );
    }

    #[rstest]
    fn geometry_type_wkb_id_roundtrip(
        #[values(
            (Point, 1),
            (LineString, 2),
            (Polygon, 3),
            (MultiPoint, 4),
            (MultiLineString, 5),
            (MultiPolygon, 6),
            (GeometryCollection, 7),
            (CircularString, 8),
            (CompoundCurve, 9),
            (CurvePolygon, 10),
            (MultiCurve, 11),
            (MultiSurface, 12),
            (PolyhedralSurface, 15),
            (Tin, 16),
            (Triangle, 17),
            (NurbsCurve, 18)
        )]
        geometry_type_and_id: (GeometryType, u32),
    ) {
        let (geometry_type, wkb_id) = geometry_type_and_id;
        assert_eq!(geometry_type.wkb_id(), wkb_id);
        assert_eq!(
            GeometryType::try_from_wkb_id(wkb_id).unwrap(),
            geometry_type
        );
    }

    #[test]
    fn geometry_type_id_err() {
        let err = GeometryType::try_from_gs2_id(17).unwrap_err();
        assert_eq!(err.to_string(), "Unknown geometry type identifier 17");

        let err = GeometryType::try_from_wkb_id(13).unwrap_err();
        assert_eq!(err.to_string(), "Unknown WKB geometry type identifier 13");
    }

    #[test]
    fn geometry_type_str_roundtrip() {
        for geometry_type in [
            Point,
            LineString,
            Polygon,
            MultiPoint,
            MultiLineString,
            MultiPolygon,
            GeometryCollection,
            CircularString,
            CompoundCurve,
            CurvePolygon,
            MultiCurve,
            MultiSurface,
            PolyhedralSurface,
            Triangle,
            Tin,
            NurbsCurve,
        ] {
            assert_eq!(
                GeometryType::from_str(geometry_type.name()).unwrap(),
                geometry_type
            );
        }

        let err = GeometryType::from_str("gazornenplat").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid geometry type string: 'gazornenplat'"
        );
    }

    #[rstest]
    fn collection_allows_child(
        #[values(
            (MultiPoint, Point, true),
            (MultiPoint, LineString, false),
            (MultiLineString, LineString, true),
            (MultiLineString, CircularString, false),
            (MultiPolygon, Polygon, true),
            (MultiPolygon, Triangle, true),
            (MultiPolygon, CurvePolygon, false),
            (MultiCurve, LineString, true),
            (MultiCurve, CircularString, true),
            (MultiCurve, CompoundCurve, true),
            (MultiCurve, Polygon, false),
            (MultiSurface, Polygon, true),
            (MultiSurface, CurvePolygon, true),
            (MultiSurface, Triangle, false),
            (CurvePolygon, LineString, true),
            (CurvePolygon, CircularString, true),
            (CurvePolygon, CompoundCurve, true),
            (CompoundCurve, LineString, true),
            (CompoundCurve, CircularString, true),
            (CompoundCurve, CompoundCurve, false),
            (PolyhedralSurface, Polygon, true),
            (PolyhedralSurface, Triangle, false),
            (Tin, Triangle, true),
            (Tin, Polygon, false),
            (GeometryCollection, NurbsCurve, true),
            (GeometryCollection, GeometryCollection, true),
            (Point, Point, false)
        )]
        case: (GeometryType, GeometryType, bool),
    ) {
        let (parent, child, allowed) = case;
        assert_eq!(parent.allows_child(child), allowed);
    }

    #[test]
    fn is_collection() {
        assert!(MultiPoint.is_collection());
        assert!(CompoundCurve.is_collection());
        assert!(Tin.is_collection());
        assert!(!Point.is_collection());
        assert!(!CircularString.is_collection());
        assert!(!NurbsCurve.is_collection());
        assert!(!Triangle.is_collection());
    }

    #[rstest]
    fn geometry_type_dims_wkb_id_roundtrip(
        #[values((Point, 1), (LineString, 2), (NurbsCurve, 18))] geometry_type_and_id: (
            GeometryType,
            u32,
        ),
        #[values((Xy, 0), (Xyz, 1000), (Xym, 2000), (Xyzm, 3000))] dimensions_and_id: (
            Dimensions,
            u32,
        ),
    ) {
        let (geometry_type, geometry_type_id) = geometry_type_and_id;
        let (dimensions, dimensions_id) = dimensions_and_id;

        let value = GeometryTypeAndDims::new(geometry_type, dimensions);
        assert_eq!(value.wkb_id(), dimensions_id + geometry_type_id);
        assert_eq!(
            GeometryTypeAndDims::try_from_wkb_id(dimensions_id + geometry_type_id).unwrap(),
            value
        );
    }

    #[test]
    fn geometry_type_dims_str_roundtrip() {
        let value = GeometryTypeAndDims::new(Point, Xyz);
        assert_eq!(value.to_string(), "Point Z");
        assert_eq!(GeometryTypeAndDims::from_str("Point Z").unwrap(), value);

        let value = GeometryTypeAndDims::new(NurbsCurve, Xyzm);
        assert_eq!(value.to_string(), "NurbsCurve ZM");
        assert_eq!(
            GeometryTypeAndDims::from_str("NurbsCurve ZM").unwrap(),
            value
        );

        assert!(GeometryTypeAndDims::from_str("Point Q").is_err());
        assert!(GeometryTypeAndDims::from_str("Point Z M").is_err());
        assert!(GeometryTypeAndDims::from_str("").is_err());
    }

    #[test]
    fn geometry_type_dims_serde() {
        let value = GeometryTypeAndDims::new(LineString, Xym);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"LineString M\"");
        let roundtrip: GeometryTypeAndDims = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, value);
    }
}
