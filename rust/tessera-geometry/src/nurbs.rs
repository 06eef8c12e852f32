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
use crate::error::TesseraGeometryError;
use crate::geometry::Geometry;
use crate::point_array::{Point4D, PointArray};
use crate::types::GeometryType;

pub const NURBS_MIN_DEGREE: u32 = 1;
pub const NURBS_MAX_DEGREE: u32 = 10;

/// Bounds on the sampling density of [nurbs_to_linestring]
pub const NURBS_MIN_SEGMENTS: u32 = 2;
pub const NURBS_MAX_SEGMENTS: u32 = 10_000;
pub const NURBS_DEFAULT_SEGMENTS: u32 = 32;

/// A Non-Uniform Rational B-Spline curve
///
/// Defined by a degree, a control point array, optional per-point weights
/// (absent means the curve is non-rational, all weights implicitly 1.0) and
/// an optional knot vector (absent means a clamped uniform vector is
/// synthesized on demand). Weights and knots are always owned; only the
/// control points may borrow from a serialized buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct NurbsCurve<'a> {
    degree: u32,
    points: PointArray<'a>,
    weights: Option<Vec<f64>>,
    knots: Option<Vec<f64>>,
}

impl<'a> NurbsCurve<'a> {
    /// Construct a curve, validating the degree and array lengths
    ///
    /// When weights are given there must be exactly one per control point;
    /// when knots are given there must be exactly
    /// `npoints + degree + 1`. Weight positivity and knot monotonicity are
    /// checked by [is_valid](Self::is_valid), not here, so that curves read
    /// from storage can be inspected before being rejected.
    pub fn try_new(
        degree: u32,
        points: PointArray<'a>,
        weights: Option<Vec<f64>>,
        knots: Option<Vec<f64>>,
    ) -> Result<Self, TesseraGeometryError> {
        if !(NURBS_MIN_DEGREE..=NURBS_MAX_DEGREE).contains(&degree) {
            return Err(TesseraGeometryError::Invalid(format!(
                "NURBS degree {degree} outside [{NURBS_MIN_DEGREE}, {NURBS_MAX_DEGREE}]"
            )));
        }

        let npoints = points.npoints();
        if let Some(weights) = &weights {
            if weights.len() != npoints as usize {
                return Err(TesseraGeometryError::Invalid(format!(
                    "NURBS weight count {} must equal control point count {}",
                    weights.len(),
                    npoints
                )));
            }
        }
        if let Some(knots) = &knots {
            let expected = npoints as usize + degree as usize + 1;
            if knots.len() != expected {
                return Err(TesseraGeometryError::Invalid(format!(
                    "NURBS knot count {} must equal npoints + degree + 1 ({})",
                    knots.len(),
                    expected
                )));
            }
        }

        Ok(Self {
            degree,
            points,
            weights,
            knots,
        })
    }

    /// An empty curve that keeps its dimensional flags
    pub fn empty(has_z: bool, has_m: bool) -> NurbsCurve<'static> {
        NurbsCurve {
            degree: NURBS_MIN_DEGREE,
            points: PointArray::empty(has_z, has_m),
            weights: None,
            knots: None,
        }
    }

    /// Assemble from decoded parts without validation
    pub(crate) fn from_raw_parts(
        degree: u32,
        points: PointArray<'a>,
        weights: Option<Vec<f64>>,
        knots: Option<Vec<f64>>,
    ) -> Self {
        Self {
            degree,
            points,
            weights,
            knots,
        }
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn points(&self) -> &PointArray<'a> {
        &self.points
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn knots(&self) -> Option<&[f64]> {
        self.knots.as_deref()
    }

    /// A rational curve carries explicit weights
    pub fn is_rational(&self) -> bool {
        self.weights.is_some()
    }

    pub fn clone_owned(&self) -> NurbsCurve<'static> {
        NurbsCurve {
            degree: self.degree,
            points: self.points.to_owned_array(),
            weights: self.weights.clone(),
            knots: self.knots.clone(),
        }
    }

    /// The knot vector to serialize: the stored one, or a clamped uniform
    /// vector synthesized from the degree and control point count
    ///
    /// Returns `None` when the curve has no stored knots and too few
    /// control points to synthesize any (`npoints < degree + 1`).
    pub fn knots_for_wire(&self) -> Option<Vec<f64>> {
        if let Some(knots) = &self.knots {
            return Some(knots.clone());
        }
        uniform_clamped_knots(self.degree, self.points.npoints())
    }

    /// Evaluate the curve position at parameter `u`
    ///
    /// Parameters outside [0, 1] are clamped to the endpoints, which a
    /// clamped knot vector pins to the first and last control points.
    /// Returns `None` for an empty curve, or when no knot vector can be
    /// obtained for an interior parameter.
    pub fn evaluate(&self, u: f64) -> Option<Point4D> {
        let npoints = self.points.npoints() as usize;
        if npoints == 0 {
            return None;
        }

        if u <= 0.0 {
            return self.points.get(0);
        }
        if u >= 1.0 {
            return self.points.get(npoints - 1);
        }

        let knots = self.knots_for_wire()?;

        let has_z = self.points.has_z();
        let has_m = self.points.has_m();
        let mut x = 0.0;
        let mut y = 0.0;
        let mut z = 0.0;
        let mut m = 0.0;
        let mut denom = 0.0;

        for (i, ctrl) in self.points.iter().enumerate() {
            let basis = basis_function(i, self.degree, u, &knots);
            // Missing entries read as the default weight; a stored curve
            // can declare fewer weights than points
            let weight = match &self.weights {
                Some(weights) => weights.get(i).copied().unwrap_or(1.0),
                None => 1.0,
            };
            let wn = weight * basis;

            x += wn * ctrl.x;
            y += wn * ctrl.y;
            if has_z {
                z += wn * ctrl.z;
            }
            if has_m {
                m += wn * ctrl.m;
            }
            denom += wn;
        }

        // Rational curves divide by the weighted basis sum; for the
        // non-rational case the clamped basis already sums to one
        if self.weights.is_some() && denom != 0.0 {
            x /= denom;
            y /= denom;
            if has_z {
                z /= denom;
            }
            if has_m {
                m /= denom;
            }
        }

        Some(Point4D { x, y, z, m })
    }

    /// Sample the curve at `segments + 1` uniform parameter values
    ///
    /// `segments` is clamped to [[NURBS_MIN_SEGMENTS], [NURBS_MAX_SEGMENTS]].
    /// The first and last samples are `evaluate(0.0)` and `evaluate(1.0)`.
    pub fn sample(&self, segments: u32) -> PointArray<'static> {
        let segments = segments.clamp(NURBS_MIN_SEGMENTS, NURBS_MAX_SEGMENTS);
        let mut points =
            PointArray::with_capacity(self.points.has_z(), self.points.has_m(), segments as usize + 1);
        if self.points.is_empty() {
            return points;
        }

        for j in 0..=segments {
            let u = j as f64 / segments as f64;
            if let Some(point) = self.evaluate(u) {
                points.push_point(point);
            }
        }

        points
    }

    /// Basic validity: degree in range, enough control points, positive
    /// weights, and a non-decreasing knot vector of the exact expected
    /// length when one is stored
    pub fn is_valid(&self) -> bool {
        if !(NURBS_MIN_DEGREE..=NURBS_MAX_DEGREE).contains(&self.degree) {
            return false;
        }
        let npoints = self.points.npoints();
        if npoints < self.degree + 1 {
            return false;
        }

        if let Some(weights) = &self.weights {
            if weights.len() != npoints as usize {
                return false;
            }
            if weights.iter().any(|w| *w <= 0.0) {
                return false;
            }
        }

        if let Some(knots) = &self.knots {
            let expected = npoints as usize + self.degree as usize + 1;
            if knots.len() != expected {
                return false;
            }
            if knots.windows(2).any(|pair| pair[1] < pair[0]) {
                return false;
            }
        }

        true
    }
}

/// Synthesize a clamped uniform knot vector
///
/// The first and last `degree + 1` knots are pinned to 0.0 and 1.0 so the
/// curve interpolates its end control points; the `npoints - degree - 1`
/// interior knots are spaced uniformly in (0, 1). Returns `None` when
/// `npoints < degree + 1`, in which case no valid vector exists.
pub fn uniform_clamped_knots(degree: u32, npoints: u32) -> Option<Vec<f64>> {
    if degree == 0 || npoints < degree + 1 {
        return None;
    }

    let nknots = (npoints + degree + 1) as usize;
    let clamp = (degree + 1) as usize;
    let mut knots = vec![0.0; nknots];

    for knot in knots.iter_mut().skip(nknots - clamp) {
        *knot = 1.0;
    }

    let interior = nknots - 2 * clamp;
    for i in 0..interior {
        knots[clamp + i] = (i + 1) as f64 / (interior + 1) as f64;
    }

    Some(knots)
}

/// Cox-de-Boor basis function N(i, p, u)
///
/// Base case: N(i, 0, u) is 1 on the half-open span [k\[i\], k\[i+1\]).
/// Each recursive term drops out when its denominator is zero, which is
/// how repeated (clamping) knots are handled.
fn basis_function(i: usize, p: u32, u: f64, knots: &[f64]) -> f64 {
    if i + p as usize + 1 >= knots.len() {
        return 0.0;
    }

    if p == 0 {
        return if knots[i] <= u && u < knots[i + 1] {
            1.0
        } else {
            0.0
        };
    }

    let mut value = 0.0;

    let denom1 = knots[i + p as usize] - knots[i];
    if denom1 != 0.0 {
        value += (u - knots[i]) / denom1 * basis_function(i, p - 1, u, knots);
    }

    let denom2 = knots[i + p as usize + 1] - knots[i + 1];
    if denom2 != 0.0 {
        value += (knots[i + p as usize + 1] - u) / denom2 * basis_function(i + 1, p - 1, u, knots);
    }

    value
}

/// Evaluate a NURBS curve geometry at parameter `u`, producing a Point
///
/// The result carries the curve's SRID and dimensions; an empty curve
/// evaluates to an empty Point with the same SRID and dimensions.
pub fn nurbs_evaluate(
    geom: &Geometry,
    u: f64,
) -> Result<Geometry<'static>, TesseraGeometryError> {
    let curve = expect_nurbs(geom)?;
    let flags = geom.flags();

    match curve.evaluate(u) {
        Some(point) => {
            let mut points = PointArray::with_capacity(flags.has_z, flags.has_m, 1);
            points.push_point(point);
            Geometry::point(geom.srid(), points)
        }
        None => Geometry::empty(GeometryType::Point, geom.srid(), flags.has_z, flags.has_m),
    }
}

/// Approximate a NURBS curve geometry with a LineString of `segments`
/// uniform spans
pub fn nurbs_to_linestring(
    geom: &Geometry,
    segments: u32,
) -> Result<Geometry<'static>, TesseraGeometryError> {
    let curve = expect_nurbs(geom)?;
    let flags = geom.flags();

    if curve.points().is_empty() {
        return Geometry::empty(
            GeometryType::LineString,
            geom.srid(),
            flags.has_z,
            flags.has_m,
        );
    }

    Ok(Geometry::line_string(geom.srid(), curve.sample(segments)))
}

fn expect_nurbs<'g, 'a>(
    geom: &'g Geometry<'a>,
) -> Result<&'g NurbsCurve<'a>, TesseraGeometryError> {
    geom.as_nurbs().ok_or(TesseraGeometryError::TypeMismatch {
        expected: GeometryType::NurbsCurve,
        actual: geom.geometry_type(),
    })
}
