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
use crate::bounding_box::BoundingBox;
use crate::error::TesseraGeometryError;
use crate::flags::GeomFlags;
use crate::nurbs::NurbsCurve;
use crate::point_array::PointArray;
use crate::types::GeometryType;

/// The variant payload of a [Geometry]
///
/// Leaf variants hold coordinate blocks; `Collection` covers every
/// multi/compound/surface container and carries its concrete type alongside
/// its children.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryKind<'a> {
    /// Zero or one coordinate
    Point(PointArray<'a>),
    LineString(PointArray<'a>),
    CircularString(PointArray<'a>),
    /// Exactly one closed ring
    Triangle(PointArray<'a>),
    /// Ring 0 is the outer ring
    Polygon(Vec<PointArray<'a>>),
    Collection(GeometryType, Vec<Geometry<'a>>),
    NurbsCurve(NurbsCurve<'a>),
}

/// A geometry with SRID, dimensional flags and an optional cached box
///
/// Geometries decoded from a serialized buffer borrow their coordinate
/// blocks from it and share its lifetime; [clone_owned](Self::clone_owned)
/// produces an independent `'static` tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry<'a> {
    srid: Option<i32>,
    flags: GeomFlags,
    bbox: Option<BoundingBox>,
    kind: GeometryKind<'a>,
}

impl<'a> Geometry<'a> {
    /// Assemble a geometry from parts without validation
    ///
    /// Decoders use this; constructors below validate their inputs.
    pub(crate) fn from_parts(
        srid: Option<i32>,
        flags: GeomFlags,
        bbox: Option<BoundingBox>,
        kind: GeometryKind<'a>,
    ) -> Self {
        Self {
            srid,
            flags,
            bbox,
            kind,
        }
    }

    pub fn point(srid: Option<i32>, point: PointArray<'a>) -> Result<Self, TesseraGeometryError> {
        if point.npoints() > 1 {
            return Err(TesseraGeometryError::Invalid(format!(
                "Point holds at most one coordinate, got {}",
                point.npoints()
            )));
        }
        Ok(Self {
            srid,
            flags: point.flags(),
            bbox: None,
            kind: GeometryKind::Point(point),
        })
    }

    pub fn line_string(srid: Option<i32>, points: PointArray<'a>) -> Self {
        Self {
            srid,
            flags: points.flags(),
            bbox: None,
            kind: GeometryKind::LineString(points),
        }
    }

    pub fn circular_string(srid: Option<i32>, points: PointArray<'a>) -> Self {
        Self {
            srid,
            flags: points.flags(),
            bbox: None,
            kind: GeometryKind::CircularString(points),
        }
    }

    pub fn triangle(
        srid: Option<i32>,
        ring: PointArray<'a>,
    ) -> Result<Self, TesseraGeometryError> {
        if !ring.is_empty() {
            if ring.npoints() < 4 {
                return Err(TesseraGeometryError::Invalid(format!(
                    "Triangle ring requires at least 4 coordinates, got {}",
                    ring.npoints()
                )));
            }
            let first = ring.get(0).unwrap();
            let last = ring.get(ring.npoints() as usize - 1).unwrap();
            if first != last {
                return Err(TesseraGeometryError::Invalid(
                    "Triangle ring must be closed (first coordinate equal to last)".to_string(),
                ));
            }
        }
        Ok(Self {
            srid,
            flags: ring.flags(),
            bbox: None,
            kind: GeometryKind::Triangle(ring),
        })
    }

    pub fn polygon(
        srid: Option<i32>,
        rings: Vec<PointArray<'a>>,
    ) -> Result<Self, TesseraGeometryError> {
        let flags = rings.first().map(|r| r.flags()).unwrap_or_default();
        for (i, ring) in rings.iter().enumerate() {
            if !ring.flags().same_zm(&flags) {
                return Err(TesseraGeometryError::Invalid(format!(
                    "Ring {i} dimensions do not match the polygon's"
                )));
            }
        }
        Ok(Self {
            srid,
            flags,
            bbox: None,
            kind: GeometryKind::Polygon(rings),
        })
    }

    pub fn collection(
        collection_type: GeometryType,
        srid: Option<i32>,
        geoms: Vec<Geometry<'a>>,
    ) -> Result<Self, TesseraGeometryError> {
        if !collection_type.is_collection() {
            return Err(TesseraGeometryError::Invalid(format!(
                "{collection_type} is not a collection type"
            )));
        }
        for geom in &geoms {
            if !collection_type.allows_child(geom.geometry_type()) {
                return Err(TesseraGeometryError::DisallowedChild {
                    parent: collection_type,
                    child: geom.geometry_type(),
                });
            }
        }
        let flags = geoms.first().map(|g| g.flags).unwrap_or_default();
        Ok(Self {
            srid,
            flags,
            bbox: None,
            kind: GeometryKind::Collection(collection_type, geoms),
        })
    }

    pub fn nurbs(srid: Option<i32>, curve: NurbsCurve<'a>) -> Self {
        Self {
            srid,
            flags: curve.points().flags(),
            bbox: None,
            kind: GeometryKind::NurbsCurve(curve),
        }
    }

    /// An empty geometry of the given leaf or collection type
    pub fn empty(
        geometry_type: GeometryType,
        srid: Option<i32>,
        has_z: bool,
        has_m: bool,
    ) -> Result<Geometry<'static>, TesseraGeometryError> {
        let pa = || PointArray::empty(has_z, has_m);
        let kind = match geometry_type {
            GeometryType::Point => GeometryKind::Point(pa()),
            GeometryType::LineString => GeometryKind::LineString(pa()),
            GeometryType::CircularString => GeometryKind::CircularString(pa()),
            GeometryType::Triangle => GeometryKind::Triangle(pa()),
            GeometryType::Polygon => GeometryKind::Polygon(Vec::new()),
            GeometryType::NurbsCurve => GeometryKind::NurbsCurve(NurbsCurve::empty(has_z, has_m)),
            other if other.is_collection() => GeometryKind::Collection(other, Vec::new()),
            other => {
                return Err(TesseraGeometryError::Invalid(format!(
                    "Cannot construct an empty {other}"
                )))
            }
        };
        Ok(Geometry {
            srid,
            flags: GeomFlags::new(has_z, has_m),
            bbox: None,
            kind,
        })
    }

    pub fn srid(&self) -> Option<i32> {
        self.srid
    }

    pub fn set_srid(&mut self, srid: Option<i32>) {
        self.srid = srid;
    }

    pub fn flags(&self) -> GeomFlags {
        self.flags
    }

    /// Mark the geometry as geodetic; drops any cached Cartesian box
    pub fn set_geodetic(&mut self, geodetic: bool) {
        if self.flags.geodetic != geodetic {
            self.bbox = None;
        }
        self.flags.geodetic = geodetic;
    }

    pub fn set_solid(&mut self, solid: bool) {
        self.flags.solid = solid;
    }

    pub fn bbox(&self) -> Option<&BoundingBox> {
        self.bbox.as_ref()
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub(crate) fn set_bbox(&mut self, bbox: Option<BoundingBox>) {
        self.bbox = bbox;
    }

    pub fn kind(&self) -> &GeometryKind<'a> {
        &self.kind
    }

    pub fn geometry_type(&self) -> GeometryType {
        match &self.kind {
            GeometryKind::Point(_) => GeometryType::Point,
            GeometryKind::LineString(_) => GeometryType::LineString,
            GeometryKind::CircularString(_) => GeometryType::CircularString,
            GeometryKind::Triangle(_) => GeometryType::Triangle,
            GeometryKind::Polygon(_) => GeometryType::Polygon,
            GeometryKind::Collection(collection_type, _) => *collection_type,
            GeometryKind::NurbsCurve(_) => GeometryType::NurbsCurve,
        }
    }

    /// Downcast to the NURBS payload
    pub fn as_nurbs(&self) -> Option<&NurbsCurve<'a>> {
        match &self.kind {
            GeometryKind::NurbsCurve(curve) => Some(curve),
            _ => None,
        }
    }

    /// Whether the geometry contains no coordinates
    ///
    /// A collection is empty when it has no subgeometries or every
    /// subgeometry is itself empty.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            GeometryKind::Point(pa)
            | GeometryKind::LineString(pa)
            | GeometryKind::CircularString(pa)
            | GeometryKind::Triangle(pa) => pa.is_empty(),
            GeometryKind::Polygon(rings) => rings.iter().all(|r| r.is_empty()),
            GeometryKind::Collection(_, geoms) => geoms.iter().all(|g| g.is_empty()),
            GeometryKind::NurbsCurve(curve) => curve.points().is_empty(),
        }
    }

    /// Whether a serialized form of this geometry should carry a box
    pub fn needs_bbox(&self) -> bool {
        !matches!(self.kind, GeometryKind::Point(_))
    }

    /// Compute the Cartesian bounding box over the stored coordinates
    ///
    /// Returns `None` for empty geometries. Geodetic geometries are
    /// refused: their boxes live in Earth-centered coordinates and are
    /// produced by the geodetic engine, not here. The result is not
    /// float-rounded; serialization rounds on the way out.
    pub fn compute_bbox(&self) -> Result<Option<BoundingBox>, TesseraGeometryError> {
        if self.flags.geodetic {
            return Err(TesseraGeometryError::Invalid(
                "Cannot compute a Cartesian bounding box for a geodetic geometry".to_string(),
            ));
        }
        if self.is_empty() {
            return Ok(None);
        }
        let mut bbox = BoundingBox::empty(self.flags);
        self.update_bbox(&mut bbox);
        Ok(Some(bbox))
    }

    fn update_bbox(&self, bbox: &mut BoundingBox) {
        match &self.kind {
            GeometryKind::Point(pa)
            | GeometryKind::LineString(pa)
            | GeometryKind::CircularString(pa)
            | GeometryKind::Triangle(pa) => {
                for point in pa.iter() {
                    bbox.update_point(point);
                }
            }
            GeometryKind::Polygon(rings) => {
                for ring in rings {
                    for point in ring.iter() {
                        bbox.update_point(point);
                    }
                }
            }
            GeometryKind::Collection(_, geoms) => {
                for geom in geoms {
                    geom.update_bbox(bbox);
                }
            }
            // The curve lies inside the convex hull of its control points
            GeometryKind::NurbsCurve(curve) => {
                for point in curve.points().iter() {
                    bbox.update_point(point);
                }
            }
        }
    }

    /// Deep-copy into a tree that owns every buffer
    pub fn clone_owned(&self) -> Geometry<'static> {
        let kind = match &self.kind {
            GeometryKind::Point(pa) => GeometryKind::Point(pa.to_owned_array()),
            GeometryKind::LineString(pa) => GeometryKind::LineString(pa.to_owned_array()),
            GeometryKind::CircularString(pa) => GeometryKind::CircularString(pa.to_owned_array()),
            GeometryKind::Triangle(pa) => GeometryKind::Triangle(pa.to_owned_array()),
            GeometryKind::Polygon(rings) => {
                GeometryKind::Polygon(rings.iter().map(|r| r.to_owned_array()).collect())
            }
            GeometryKind::Collection(collection_type, geoms) => GeometryKind::Collection(
                *collection_type,
                geoms.iter().map(|g| g.clone_owned()).collect(),
            ),
            GeometryKind::NurbsCurve(curve) => GeometryKind::NurbsCurve(curve.clone_owned()),
        };
        Geometry {
            srid: self.srid,
            flags: self.flags,
            bbox: self.bbox,
            kind,
        }
    }
}
