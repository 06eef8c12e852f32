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
use geo_traits::Dimensions;

/// Bit positions in the single serialized flags byte (gflags)
pub const GFLAG_Z: u8 = 0x01;
pub const GFLAG_M: u8 = 0x02;
pub const GFLAG_BBOX: u8 = 0x04;
pub const GFLAG_GEODETIC: u8 = 0x08;
pub const GFLAG_EXTENDED: u8 = 0x10;
/// Two version bits; the current layout is version 1
pub const GFLAG_VERSION_MASK: u8 = 0xC0;
pub const GS2_VERSION: u8 = 1;

/// Bits of the optional 64-bit extended flags word
pub const XFLAG_SOLID: u64 = 0x01;
/// Reserved for future use
pub const XFLAG_CHECKED_VALID: u64 = 0x02;
pub const XFLAG_IS_VALID: u64 = 0x04;
pub const XFLAG_HAS_HASH: u64 = 0x08;

/// In-memory geometry flags
///
/// Tracks the dimensionality and interpretation of a geometry's coordinates.
/// Presence of a cached bounding box is not part of this struct; in memory
/// that is the `Option` on the geometry, and on disk it is the [GFLAG_BBOX]
/// bit computed at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeomFlags {
    pub has_z: bool,
    pub has_m: bool,
    /// Coordinates are longitude/latitude on a sphere or ellipsoid; the
    /// serialized bounding box of a geodetic geometry is Earth-centered 3D
    pub geodetic: bool,
    /// A closed PolyhedralSurface/TIN encloses a volume
    pub solid: bool,
}

impl GeomFlags {
    pub fn new(has_z: bool, has_m: bool) -> Self {
        Self {
            has_z,
            has_m,
            geodetic: false,
            solid: false,
        }
    }

    pub fn xy() -> Self {
        Self::new(false, false)
    }

    /// Number of ordinates per coordinate (2, 3 or 4)
    pub fn ndims(&self) -> usize {
        2 + self.has_z as usize + self.has_m as usize
    }

    /// Number of dimensions in the serialized bounding box
    ///
    /// Geodetic boxes are always 3D regardless of the coordinate flags.
    pub fn ndims_box(&self) -> usize {
        if self.geodetic {
            3
        } else {
            self.ndims()
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        match (self.has_z, self.has_m) {
            (false, false) => Dimensions::Xy,
            (true, false) => Dimensions::Xyz,
            (false, true) => Dimensions::Xym,
            (true, true) => Dimensions::Xyzm,
        }
    }

    pub fn from_dimensions(dims: Dimensions) -> Self {
        match dims {
            Dimensions::Xy | Dimensions::Unknown(2) => Self::new(false, false),
            Dimensions::Xyz | Dimensions::Unknown(3) => Self::new(true, false),
            Dimensions::Xym => Self::new(false, true),
            Dimensions::Xyzm | Dimensions::Unknown(_) => Self::new(true, true),
        }
    }

    /// Whether serializing these flags requires the 64-bit extended word
    pub fn uses_extended(&self) -> bool {
        self.solid
    }

    /// Whether the Z/M components of two flag sets agree
    pub fn same_zm(&self, other: &GeomFlags) -> bool {
        self.has_z == other.has_z && self.has_m == other.has_m
    }

    /// The serialized flags byte, including the version bits
    pub fn gflags_byte(&self, has_bbox: bool) -> u8 {
        let mut gflags = GS2_VERSION << 6;
        if self.has_z {
            gflags |= GFLAG_Z;
        }
        if self.has_m {
            gflags |= GFLAG_M;
        }
        if has_bbox {
            gflags |= GFLAG_BBOX;
        }
        if self.geodetic {
            gflags |= GFLAG_GEODETIC;
        }
        if self.uses_extended() {
            gflags |= GFLAG_EXTENDED;
        }
        gflags
    }

    /// The extended flags word, when [uses_extended](Self::uses_extended)
    pub fn extended_word(&self) -> u64 {
        let mut xflags = 0;
        if self.solid {
            xflags |= XFLAG_SOLID;
        }
        xflags
    }

    /// Reconstruct in-memory flags from the serialized byte and the
    /// extended word (when present)
    pub fn from_serialized(gflags: u8, xflags: Option<u64>) -> Self {
        Self {
            has_z: gflags & GFLAG_Z != 0,
            has_m: gflags & GFLAG_M != 0,
            geodetic: gflags & GFLAG_GEODETIC != 0,
            solid: xflags.is_some_and(|x| x & XFLAG_SOLID != 0),
        }
    }

    /// Serialized size of a bounding box with these flags
    pub fn box_serialized_size(&self) -> usize {
        2 * self.ndims_box() * std::mem::size_of::<f32>()
    }

    /// Total serialized header size: the fixed 8 bytes (varsize + srid +
    /// gflags), the extended word when required, and the box when present
    pub fn header_size(&self, has_bbox: bool) -> usize {
        let mut size = 8;
        if self.uses_extended() {
            size += 8;
        }
        if has_bbox {
            size += self.box_serialized_size();
        }
        size
    }
}

/// Version bits of a serialized flags byte
pub fn gflags_version(gflags: u8) -> u8 {
    (gflags & GFLAG_VERSION_MASK) >> 6
}

pub fn gflags_has_bbox(gflags: u8) -> bool {
    gflags & GFLAG_BBOX != 0
}

pub fn gflags_has_extended(gflags: u8) -> bool {
    gflags & GFLAG_EXTENDED != 0
}
