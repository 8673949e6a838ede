//! Line segments

use super::{Point3, Vector3};

/// A straight line segment between two points.
///
/// A segment may be open at either end: an eye ray is closed at the view
/// plane but open at its far end (it extends to infinity), while a shadow ray
/// is closed at both ends.
#[derive(Copy, Clone, Debug)]
pub struct Segment3 {
    pub p1: Point3,
    pub p2: Point3,
    closed_at_p1: bool,
    closed_at_p2: bool,
}

impl Segment3 {
    /// Create a segment closed at both ends.
    ///
    /// * `p1` - The first endpoint.
    /// * `p2` - The second endpoint.
    pub fn new(p1: Point3, p2: Point3) -> Self {
        Self {
            p1,
            p2,
            closed_at_p1: true,
            closed_at_p2: true,
        }
    }

    /// Create a segment closed at `p1` and open at `p2`.
    ///
    /// * `p1` - The first endpoint.
    /// * `p2` - The second endpoint.
    pub fn half_open(p1: Point3, p2: Point3) -> Self {
        Self {
            p1,
            p2,
            closed_at_p1: true,
            closed_at_p2: false,
        }
    }

    pub fn is_closed_at_p1(&self) -> bool {
        self.closed_at_p1
    }

    pub fn is_closed_at_p2(&self) -> bool {
        self.closed_at_p2
    }

    /// The direction from `p1` to `p2` (not normalized).
    pub fn direction(&self) -> Vector3 {
        self.p2 - self.p1
    }

    /// The direction from `p1` to `p2`, scaled to unit length.
    pub fn unit_direction(&self) -> Vector3 {
        self.direction().normalized()
    }

    /// The point at relative position `r`, where `r = 0` is `p1` and `r = 1`
    /// is `p2`.
    ///
    /// * `r` - The relative position.
    pub fn at(&self, r: f64) -> Point3 {
        self.p1 + self.direction() * r
    }

    /// Whether the relative position `r` along the carrier line belongs to
    /// this segment, honoring the open/closed ends.
    ///
    /// * `r` - The relative position.
    pub fn contains_relative_position(&self, r: f64) -> bool {
        if r < 0.0 {
            !self.closed_at_p1
        } else if r > 1.0 {
            !self.closed_at_p2
        } else {
            true
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_interpolates_between_endpoints() {
        let s = Segment3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, -2.0));
        assert_eq!(s.at(0.0), s.p1);
        assert_eq!(s.at(1.0), s.p2);
        assert_eq!(s.at(0.5), Point3::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn closed_segment_rejects_positions_outside_unit_range() {
        let s = Segment3::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        assert!(s.contains_relative_position(0.0));
        assert!(s.contains_relative_position(1.0));
        assert!(!s.contains_relative_position(-0.01));
        assert!(!s.contains_relative_position(1.01));
    }

    #[test]
    fn half_open_segment_extends_past_p2() {
        let s = Segment3::half_open(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        assert!(s.contains_relative_position(5.0));
        assert!(!s.contains_relative_position(-0.01));
    }
}
