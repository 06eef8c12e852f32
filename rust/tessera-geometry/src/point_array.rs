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
use std::borrow::Cow;

use geo_traits::Dimensions;

use crate::error::TesseraGeometryError;
use crate::flags::GeomFlags;

/// A coordinate with all four possible ordinates
///
/// Ordinates absent from the source geometry read as 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point4D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub m: f64,
}

impl Point4D {
    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            m: 0.0,
        }
    }

    pub fn new(x: f64, y: f64, z: f64, m: f64) -> Self {
        Self { x, y, z, m }
    }

    /// The ordinate at position `j` in x, y, z, m order
    pub fn ordinate(&self, j: usize) -> f64 {
        match j {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => self.m,
        }
    }
}

/// A contiguous block of coordinates with known dimensionality
///
/// The coordinate storage is a flat run of native-endian f64 bytes, either
/// owned or borrowed from a serialized buffer. A borrowed array shares its
/// lifetime with the buffer it was decoded from; [into_owned](Self::into_owned)
/// breaks that dependency. Appending to a borrowed array detaches it first
/// (copy-on-write), so a decoded buffer is never written through.
#[derive(Debug, Clone, PartialEq)]
pub struct PointArray<'a> {
    data: Cow<'a, [u8]>,
    npoints: u32,
    has_z: bool,
    has_m: bool,
}

impl<'a> PointArray<'a> {
    /// An array of zero points with the given dimensionality
    pub fn empty(has_z: bool, has_m: bool) -> PointArray<'static> {
        PointArray {
            data: Cow::Owned(Vec::new()),
            npoints: 0,
            has_z,
            has_m,
        }
    }

    /// An empty owned array with room reserved for `npoints`
    pub fn with_capacity(has_z: bool, has_m: bool, npoints: usize) -> PointArray<'static> {
        let point_size = (2 + has_z as usize + has_m as usize) * 8;
        PointArray {
            data: Cow::Owned(Vec::with_capacity(npoints * point_size)),
            npoints: 0,
            has_z,
            has_m,
        }
    }

    /// Construct by value from a flat ordinate slice (x, y[, z][, m] per point)
    pub fn from_coords(
        has_z: bool,
        has_m: bool,
        coords: &[f64],
    ) -> Result<PointArray<'static>, TesseraGeometryError> {
        let ndims = 2 + has_z as usize + has_m as usize;
        if coords.len() % ndims != 0 {
            return Err(TesseraGeometryError::Invalid(format!(
                "Coordinate count {} is not a multiple of {} ordinates per point",
                coords.len(),
                ndims
            )));
        }

        let mut data = Vec::with_capacity(coords.len() * 8);
        for ordinate in coords {
            data.extend_from_slice(&ordinate.to_ne_bytes());
        }

        Ok(PointArray {
            data: Cow::Owned(data),
            npoints: (coords.len() / ndims) as u32,
            has_z,
            has_m,
        })
    }

    /// Construct by reference over serialized coordinate bytes
    ///
    /// The bytes must be native-endian f64 ordinates and exactly
    /// `npoints * point_size` long.
    pub fn from_bytes_ref(
        has_z: bool,
        has_m: bool,
        npoints: u32,
        bytes: &'a [u8],
    ) -> Result<Self, TesseraGeometryError> {
        let point_size = (2 + has_z as usize + has_m as usize) * 8;
        let expected = npoints as usize * point_size;
        if bytes.len() != expected {
            return Err(TesseraGeometryError::Invalid(format!(
                "Coordinate buffer is {} bytes but {} points require {}",
                bytes.len(),
                npoints,
                expected
            )));
        }

        Ok(PointArray {
            data: Cow::Borrowed(bytes),
            npoints,
            has_z,
            has_m,
        })
    }

    pub fn npoints(&self) -> u32 {
        self.npoints
    }

    pub fn is_empty(&self) -> bool {
        self.npoints == 0
    }

    pub fn has_z(&self) -> bool {
        self.has_z
    }

    pub fn has_m(&self) -> bool {
        self.has_m
    }

    pub fn ndims(&self) -> usize {
        2 + self.has_z as usize + self.has_m as usize
    }

    /// Bytes per coordinate
    pub fn point_size(&self) -> usize {
        self.ndims() * 8
    }

    pub fn dimensions(&self) -> Dimensions {
        self.flags().dimensions()
    }

    pub fn flags(&self) -> GeomFlags {
        GeomFlags::new(self.has_z, self.has_m)
    }

    /// The raw native-endian coordinate bytes, suitable for bulk copy into
    /// a same-dimensionality, same-byte-order output
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Read one ordinate without materializing the whole coordinate
    pub fn ordinate(&self, i: usize, j: usize) -> f64 {
        let at = (i * self.ndims() + j) * 8;
        f64::from_ne_bytes(self.data[at..at + 8].try_into().unwrap())
    }

    /// The coordinate at index `i`, with absent ordinates zeroed
    pub fn get(&self, i: usize) -> Option<Point4D> {
        if i >= self.npoints as usize {
            return None;
        }

        let mut j = 0;
        let mut next = || {
            let value = self.ordinate(i, j);
            j += 1;
            value
        };

        let x = next();
        let y = next();
        let z = if self.has_z { next() } else { 0.0 };
        let m = if self.has_m { next() } else { 0.0 };
        Some(Point4D { x, y, z, m })
    }

    /// Iterate over coordinates
    pub fn iter(&self) -> impl Iterator<Item = Point4D> + '_ {
        (0..self.npoints as usize).map(|i| self.get(i).unwrap())
    }

    /// Append a coordinate, writing only the ordinates this array carries
    pub fn push_point(&mut self, point: Point4D) {
        let data = self.data.to_mut();
        data.extend_from_slice(&point.x.to_ne_bytes());
        data.extend_from_slice(&point.y.to_ne_bytes());
        if self.has_z {
            data.extend_from_slice(&point.z.to_ne_bytes());
        }
        if self.has_m {
            data.extend_from_slice(&point.m.to_ne_bytes());
        }
        self.npoints += 1;
    }

    /// Copy the coordinate bytes, detaching from any source buffer
    pub fn into_owned(self) -> PointArray<'static> {
        PointArray {
            data: Cow::Owned(self.data.into_owned()),
            npoints: self.npoints,
            has_z: self.has_z,
            has_m: self.has_m,
        }
    }

    pub fn to_owned_array(&self) -> PointArray<'static> {
        self.clone().into_owned()
    }
}
