//! 3-D points

use super::{Axis, Vector3};
use std::ops::{Add, Index, IndexMut, Sub};

/// A point in 3-D space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    /// Create a new `Point3`.
    ///
    /// * `x` - X-coordinate.
    /// * `y` - Y-coordinate.
    /// * `z` - Z-coordinate.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The origin.
    pub fn origin() -> Self {
        Self::default()
    }

    /// Returns the squared distance to another point.
    ///
    /// * `other` - The other point.
    pub fn square_distance_to(&self, other: &Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Returns the distance to another point.
    ///
    /// * `other` - The other point.
    pub fn distance_to(&self, other: &Point3) -> f64 {
        self.square_distance_to(other).sqrt()
    }
}

impl Index<Axis> for Point3 {
    type Output = f64;

    fn index(&self, axis: Axis) -> &f64 {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

impl IndexMut<Axis> for Point3 {
    fn index_mut(&mut self, axis: Axis) -> &mut f64 {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }
}

impl Add<Vector3> for Point3 {
    type Output = Point3;

    fn add(self, v: Vector3) -> Point3 {
        Point3::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}

impl Sub<Vector3> for Point3 {
    type Output = Point3;

    fn sub(self, v: Vector3) -> Point3 {
        Point3::new(self.x - v.x, self.y - v.y, self.z - v.z)
    }
}

impl Sub for Point3 {
    type Output = Vector3;

    fn sub(self, other: Point3) -> Vector3 {
        Vector3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn distances() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let q = Point3::new(1.0, 2.0, 5.0);
        assert!(approx_eq!(f64, p.square_distance_to(&q), 4.0));
        assert!(approx_eq!(f64, p.distance_to(&q), 2.0));
    }

    #[test]
    fn point_vector_arithmetic() {
        let p = Point3::new(1.0, 1.0, 1.0);
        let v = Vector3::new(0.5, -1.0, 2.0);
        assert_eq!(p + v, Point3::new(1.5, 0.0, 3.0));
        assert_eq!((p + v) - v, p);
        assert_eq!(Point3::new(2.0, 0.0, 0.0) - p, Vector3::new(1.0, -1.0, -1.0));
    }

    #[test]
    fn axis_indexing() {
        let mut p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(p[Axis::X], 1.0);
        assert_eq!(p[Axis::Y], 2.0);
        assert_eq!(p[Axis::Z], 3.0);
        p[Axis::Y] = -2.0;
        assert_eq!(p.y, -2.0);
    }
}
