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
use std::io;

use thiserror::Error;

use crate::types::GeometryType;

#[derive(Error, Debug)]
pub enum TesseraGeometryError {
    /// Invalid input: bad parameters, malformed buffers, dimension mismatches
    #[error("{0}")]
    Invalid(String),
    /// The writer produced a different number of bytes than the sizer
    /// predicted. This is a bug in the sizer, not a caller error.
    #[error("serialized size mismatch: sized {expected} bytes but wrote {written}")]
    SizeMismatch { expected: usize, written: usize },
    /// A serialized collection contained a child type the collection type
    /// does not admit
    #[error("{child} is not a valid subgeometry for {parent}")]
    DisallowedChild {
        parent: GeometryType,
        child: GeometryType,
    },
    /// An operation received a geometry of the wrong type
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: GeometryType,
        actual: GeometryType,
    },
    #[error("{0}")]
    IO(io::Error),
    #[error("{0}")]
    External(Box<dyn std::error::Error + Send + Sync>),
}

impl From<io::Error> for TesseraGeometryError {
    fn from(value: io::Error) -> Self {
        TesseraGeometryError::IO(value)
    }
}
