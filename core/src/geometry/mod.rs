//! Geometry

mod axis;
mod box3;
mod point3;
mod rect2;
mod segment3;
mod vector3;

// Re-export.
pub use axis::*;
pub use box3::*;
pub use point3::*;
pub use rect2::*;
pub use segment3::*;
pub use vector3::*;

/// Tolerance used for conservative containment tests on collapsed boxes.
pub const CONTAINMENT_EPSILON: f64 = 1e-9;
