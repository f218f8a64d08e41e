//! Geometry types shared by the layout and drawing code.

/// Integer device-pixel rectangle: `origin` is the top-left corner, y grows down.
pub type Rect = euclid::default::Rect<i32>;

/// Device-space point with sub-pixel precision.
pub type Point = euclid::default::Point2D<f32>;

pub use euclid::{point2, rect};
