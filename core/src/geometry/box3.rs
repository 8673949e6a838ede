//! Axis-aligned boxes

use super::{Axis, Face, Point3};

/// An axis-aligned box in 3-D space, bounded by `x1 <= x2`, `y1 <= y2` and
/// `z1 <= z2`. A box may be collapsed to a plane, line or point along any
/// axis (zero extent).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Box3 {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
    z1: f64,
    z2: f64,
}

impl Box3 {
    /// Create a new `Box3`.
    ///
    /// * `x1`, `x2` - X boundaries, `x1 <= x2`.
    /// * `y1`, `y2` - Y boundaries, `y1 <= y2`.
    /// * `z1`, `z2` - Z boundaries, `z1 <= z2`.
    pub fn new(x1: f64, x2: f64, y1: f64, y2: f64, z1: f64, z2: f64) -> Self {
        debug_assert!(x1 <= x2, "X boundaries out of order: {x1} > {x2}");
        debug_assert!(y1 <= y2, "Y boundaries out of order: {y1} > {y2}");
        debug_assert!(z1 <= z2, "Z boundaries out of order: {z1} > {z2}");
        Self {
            x1,
            x2,
            y1,
            y2,
            z1,
            z2,
        }
    }

    /// The canonical view volume box, `[-1, 1]` on every axis.
    pub fn canonical() -> Self {
        Self::new(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0)
    }

    /// Create a box spanning two corner points.
    ///
    /// * `p` - One corner.
    /// * `q` - The opposite corner.
    pub fn spanning(p: &Point3, q: &Point3) -> Self {
        Self::new(
            p.x.min(q.x),
            p.x.max(q.x),
            p.y.min(q.y),
            p.y.max(q.y),
            p.z.min(q.z),
            p.z.max(q.z),
        )
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn x2(&self) -> f64 {
        self.x2
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    pub fn y2(&self) -> f64 {
        self.y2
    }

    pub fn z1(&self) -> f64 {
        self.z1
    }

    pub fn z2(&self) -> f64 {
        self.z2
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn depth(&self) -> f64 {
        self.z2 - self.z1
    }

    /// The smaller boundary coordinate along an axis.
    pub fn low(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x1,
            Axis::Y => self.y1,
            Axis::Z => self.z1,
        }
    }

    /// The larger boundary coordinate along an axis.
    pub fn high(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x2,
            Axis::Y => self.y2,
            Axis::Z => self.z2,
        }
    }

    /// The extent along an axis.
    pub fn extent(&self, axis: Axis) -> f64 {
        self.high(axis) - self.low(axis)
    }

    /// The boundary coordinate of a face.
    pub fn face_coordinate(&self, face: Face) -> f64 {
        if face.is_low() {
            self.low(face.axis())
        } else {
            self.high(face.axis())
        }
    }

    pub fn center(&self) -> Point3 {
        Point3::new(
            (self.x1 + self.x2) / 2.0,
            (self.y1 + self.y2) / 2.0,
            (self.z1 + self.z2) / 2.0,
        )
    }

    pub fn volume(&self) -> f64 {
        self.width() * self.height() * self.depth()
    }

    /// Whether any extent is zero.
    pub fn is_collapsed(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0 || self.depth() == 0.0
    }

    /// Grow this box so it contains `other`.
    pub fn expand_to_contain(&mut self, other: &Box3) {
        self.x1 = self.x1.min(other.x1);
        self.x2 = self.x2.max(other.x2);
        self.y1 = self.y1.min(other.y1);
        self.y2 = self.y2.max(other.y2);
        self.z1 = self.z1.min(other.z1);
        self.z2 = self.z2.max(other.z2);
    }

    /// Returns the intersection with another box, or `None` when the boxes do
    /// not overlap.
    ///
    /// * `other` - The other box.
    pub fn intersection(&self, other: &Box3) -> Option<Box3> {
        if self.overlaps(other) {
            Some(Box3::new(
                self.x1.max(other.x1),
                self.x2.min(other.x2),
                self.y1.max(other.y1),
                self.y2.min(other.y2),
                self.z1.max(other.z1),
                self.z2.min(other.z2),
            ))
        } else {
            None
        }
    }

    /// Whether this box overlaps another box. Boxes that merely touch along a
    /// face do not overlap.
    ///
    /// * `other` - The other box.
    pub fn overlaps(&self, other: &Box3) -> bool {
        if other.x2 <= self.x1 || other.x1 >= self.x2 {
            return false;
        }
        if other.y2 <= self.y1 || other.y1 >= self.y2 {
            return false;
        }
        if other.z2 <= self.z1 || other.z1 >= self.z2 {
            return false;
        }
        true
    }

    /// Whether this box contains a point. The boundary is inclusive.
    ///
    /// * `point` - The point.
    pub fn contains(&self, point: &Point3) -> bool {
        if point.x < self.x1 || point.x > self.x2 {
            return false;
        }
        if point.y < self.y1 || point.y > self.y2 {
            return false;
        }
        if point.z < self.z1 || point.z > self.z2 {
            return false;
        }
        true
    }

    /// Conservative containment test: any axis with an extent smaller than
    /// `epsilon` is widened by `epsilon` on both sides before testing. Exact
    /// comparison against a collapsed axis would reject points that differ
    /// only by floating-point round-off.
    ///
    /// * `point`   - The point.
    /// * `epsilon` - The widening tolerance.
    pub fn contains_conservative(&self, point: &Point3, epsilon: f64) -> bool {
        for axis in Axis::ALL {
            let (lo, hi) = (self.low(axis), self.high(axis));
            let (lo, hi) = if hi - lo < epsilon {
                (lo - epsilon, hi + epsilon)
            } else {
                (lo, hi)
            };
            let c = point[axis];
            if c < lo || c > hi {
                return false;
            }
        }
        true
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::CONTAINMENT_EPSILON;
    use super::*;

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = Box3::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
        let b = Box3::new(1.0, 2.0, 0.0, 1.0, 0.0, 1.0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn overlapping_boxes_intersect() {
        let a = Box3::new(0.0, 2.0, 0.0, 2.0, 0.0, 2.0);
        let b = Box3::new(1.0, 3.0, -1.0, 1.0, 0.5, 1.5);
        assert!(a.overlaps(&b));
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Box3::new(1.0, 2.0, 0.0, 1.0, 0.5, 1.5));
    }

    #[test]
    fn containment_is_closed_on_the_boundary() {
        let b = Box3::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
        assert!(b.contains(&Point3::new(0.0, 0.5, 1.0)));
        assert!(!b.contains(&Point3::new(-0.1, 0.5, 0.5)));
    }

    #[test]
    fn collapsed_box_accepts_points_within_epsilon() {
        // A plane at z = 0.5.
        let b = Box3::new(0.0, 1.0, 0.0, 1.0, 0.5, 0.5);
        let p = Point3::new(0.5, 0.5, 0.5 + CONTAINMENT_EPSILON / 2.0);
        assert!(!b.contains(&p));
        assert!(b.contains_conservative(&p, CONTAINMENT_EPSILON));
        let far = Point3::new(0.5, 0.5, 0.6);
        assert!(!b.contains_conservative(&far, CONTAINMENT_EPSILON));
    }

    #[test]
    fn expand_to_contain_grows_in_place() {
        let mut b = Box3::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
        b.expand_to_contain(&Box3::new(-1.0, 0.5, 0.0, 2.0, 0.0, 1.0));
        assert_eq!(b, Box3::new(-1.0, 1.0, 0.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn spanning_orders_the_corners() {
        let b = Box3::spanning(&Point3::new(1.0, -1.0, 2.0), &Point3::new(0.0, 1.0, -2.0));
        assert_eq!(b, Box3::new(0.0, 1.0, -1.0, 1.0, -2.0, 2.0));
    }
}
