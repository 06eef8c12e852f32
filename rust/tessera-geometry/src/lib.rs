pub mod bounding_box;
pub mod error;
pub mod flags;
pub mod geometry;
pub mod gs2;
pub mod gs2_codec;
pub mod interval;
pub mod nurbs;
pub mod point_array;
pub mod types;
pub mod wkb_read;
pub mod wkb_write;
