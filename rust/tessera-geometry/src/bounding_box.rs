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
use serde::{Deserialize, Serialize};

use crate::error::TesseraGeometryError;
use crate::flags::GeomFlags;
use crate::interval::Interval;
use crate::point_array::Point4D;

/// Axis-aligned bounding box over the active dimensions of a geometry
///
/// x and y are always present; z and m are carried only when the geometry
/// has those dimensions. A geodetic box is Earth-centered 3D: x, y and z
/// are unit-sphere coordinates and m is never stored.
///
/// Serialized boxes hold 32-bit floats rounded outward (min to the next
/// lower float, max to the next higher) so that float precision loss can
/// never exclude a coordinate the box is supposed to contain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    x: Interval,
    y: Interval,
    z: Option<Interval>,
    m: Option<Interval>,
    geodetic: bool,
}

impl BoundingBox {
    /// Create a 2D BoundingBox
    pub fn xy(x: impl Into<Interval>, y: impl Into<Interval>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: None,
            m: None,
            geodetic: false,
        }
    }

    /// Create a BoundingBox from intervals by dimension
    pub fn xyzm(
        x: impl Into<Interval>,
        y: impl Into<Interval>,
        z: Option<Interval>,
        m: Option<Interval>,
    ) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z,
            m,
            geodetic: false,
        }
    }

    /// Create an Earth-centered geodetic BoundingBox
    pub fn geocentric(
        x: impl Into<Interval>,
        y: impl Into<Interval>,
        z: impl Into<Interval>,
    ) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: Some(z.into()),
            m: None,
            geodetic: true,
        }
    }

    /// The empty box matching the dimensions of `flags`
    pub fn empty(flags: GeomFlags) -> Self {
        if flags.geodetic {
            return Self::geocentric(Interval::empty(), Interval::empty(), Interval::empty());
        }
        Self::xyzm(
            Interval::empty(),
            Interval::empty(),
            flags.has_z.then(Interval::empty),
            flags.has_m.then(Interval::empty),
        )
    }

    pub fn x(&self) -> &Interval {
        &self.x
    }

    pub fn y(&self) -> &Interval {
        &self.y
    }

    pub fn z(&self) -> &Option<Interval> {
        &self.z
    }

    pub fn m(&self) -> &Option<Interval> {
        &self.m
    }

    pub fn is_geodetic(&self) -> bool {
        self.geodetic
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty()
    }

    /// Number of stored dimensions (always 3 for geodetic boxes)
    pub fn ndims_box(&self) -> usize {
        if self.geodetic {
            3
        } else {
            2 + self.z.is_some() as usize + self.m.is_some() as usize
        }
    }

    /// Number of bytes this box occupies in a serialized header
    pub fn serialized_size(&self) -> usize {
        2 * self.ndims_box() * std::mem::size_of::<f32>()
    }

    /// Widen the box to include `point`, respecting the stored dimensions
    pub fn update_point(&mut self, point: Point4D) {
        self.x.update_value(point.x);
        self.y.update_value(point.y);
        if let Some(z) = &mut self.z {
            z.update_value(point.z);
        }
        if let Some(m) = &mut self.m {
            m.update_value(point.m);
        }
    }

    /// Round every bound outward to the nearest-but-not-equal f32 value
    ///
    /// Applied once when a box is computed from double-precision
    /// coordinates, before it is stored or compared against a stored box.
    pub fn float_round(&mut self) {
        let round = |interval: &mut Interval| {
            *interval = Interval::new(
                next_float_down(interval.lo()) as f64,
                next_float_up(interval.hi()) as f64,
            );
        };
        round(&mut self.x);
        round(&mut self.y);
        if let Some(z) = &mut self.z {
            round(z);
        }
        if let Some(m) = &mut self.m {
            round(m);
        }
    }

    /// Write the box as f32 pairs in dimension order
    ///
    /// Bounds are rounded outward on the way out. The geodetic layout is
    /// x, y, z; the Cartesian layout is x, y, then z and m when present.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut put = |interval: &Interval| {
            out.extend_from_slice(&next_float_down(interval.lo()).to_ne_bytes());
            out.extend_from_slice(&next_float_up(interval.hi()).to_ne_bytes());
        };
        put(&self.x);
        put(&self.y);
        if let Some(z) = &self.z {
            put(z);
        }
        if !self.geodetic {
            if let Some(m) = &self.m {
                put(m);
            }
        }
    }

    /// Read a serialized box with the dimensions implied by `flags`
    pub fn from_serialized(bytes: &[u8], flags: GeomFlags) -> Result<Self, TesseraGeometryError> {
        let expected = flags.box_serialized_size();
        if bytes.len() < expected {
            return Err(TesseraGeometryError::Invalid(format!(
                "Bounding box requires {} bytes but buffer holds {}",
                expected,
                bytes.len()
            )));
        }

        let mut at = 0;
        let mut take = || {
            let value = f32::from_ne_bytes(bytes[at..at + 4].try_into().unwrap()) as f64;
            at += 4;
            value
        };
        let mut next_interval = || Interval::new(take(), take());

        let x = next_interval();
        let y = next_interval();
        if flags.geodetic {
            let z = next_interval();
            return Ok(Self::geocentric(x, y, z));
        }

        let z = flags.has_z.then(&mut next_interval);
        let m = flags.has_m.then(&mut next_interval);
        Ok(Self::xyzm(x, y, z, m))
    }

    /// Whether `point` is inside the box over the stored dimensions
    pub fn contains_point(&self, point: Point4D) -> bool {
        if !self.x.contains_value(point.x) || !self.y.contains_value(point.y) {
            return false;
        }
        if let Some(z) = &self.z {
            if !z.contains_value(point.z) {
                return false;
            }
        }
        if let Some(m) = &self.m {
            if !m.contains_value(point.m) {
                return false;
            }
        }
        true
    }
}

/// The largest f32 strictly less than `d`
///
/// Stepped with IEEE-754 bit arithmetic rather than a libm nextafter so the
/// strictly-outward contract holds on every platform: the result is never
/// equal to the input, even when the input is exactly representable.
pub fn next_float_down(d: f64) -> f32 {
    let f = d as f32;
    if (f as f64) < d {
        return f;
    }
    f32_step_down(f)
}

/// The smallest f32 strictly greater than `d`
pub fn next_float_up(d: f64) -> f32 {
    let f = d as f32;
    if (f as f64) > d {
        return f;
    }
    f32_step_up(f)
}

fn f32_step_up(f: f32) -> f32 {
    if f.is_nan() || f == f32::INFINITY {
        return f;
    }
    if f == 0.0 {
        // Smallest positive subnormal
        return f32::from_bits(1);
    }
    let bits = f.to_bits();
    if f > 0.0 {
        f32::from_bits(bits + 1)
    } else {
        f32::from_bits(bits - 1)
    }
}

fn f32_step_down(f: f32) -> f32 {
    -f32_step_up(-f)
}
