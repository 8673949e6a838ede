//! Shared indexing helpers

use lucent3d_core::camera::Camera;
use lucent3d_core::geometry::{Axis, Box3};
use lucent3d_core::object::ArcObject;
use lucent3d_core::scene::Scene;

/// The coordinate frame an index bins its objects in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum IndexedFrame {
    /// Camera coordinates; used by the 3-D spatial indices.
    Camera,

    /// Canonical view volume coordinates; used by the view-plane index, so an
    /// object's view-volume bounding box doubles as its projection onto the
    /// view plane.
    ViewVolume,
}

impl IndexedFrame {
    /// The bounding box of an object in this frame, or `None` for objects
    /// without known bounds.
    ///
    /// * `object` - The object.
    /// * `camera` - The camera.
    pub(crate) fn object_box(&self, object: &ArcObject, camera: &Camera) -> Option<Box3> {
        object.as_bounded().map(|bounded| match self {
            IndexedFrame::Camera => bounded.bounding_box_in_camera(camera),
            IndexedFrame::ViewVolume => bounded.bounding_box_in_view_volume(camera),
        })
    }
}

/// Overlap test used when assigning objects to bins. Unlike the strict test,
/// a box collapsed to zero extent along some axis (an axis-aligned plane) is
/// compared with closed bounds on that axis, so it lands in the bin(s) it
/// touches instead of in none. Candidate sets may only ever be supersets.
///
/// * `a` - The first box.
/// * `b` - The second box.
pub(crate) fn conservative_overlap(a: &Box3, b: &Box3) -> bool {
    for axis in Axis::ALL {
        let closed = a.extent(axis) == 0.0 || b.extent(axis) == 0.0;
        if closed {
            if a.high(axis) < b.low(axis) || a.low(axis) > b.high(axis) {
                return false;
            }
        } else if a.high(axis) <= b.low(axis) || a.low(axis) >= b.high(axis) {
            return false;
        }
    }
    true
}

/// The scene objects relevant to an index over `region`: all objects whose
/// bounding box overlaps it, plus every object without known bounds.
///
/// * `scene`  - The scene snapshot.
/// * `region` - The indexed region.
/// * `frame`  - The frame `region` is expressed in.
pub(crate) fn indexed_objects(scene: &Scene, region: &Box3, frame: IndexedFrame) -> Vec<ArcObject> {
    let camera = scene.camera();
    scene
        .objects()
        .iter()
        .filter(|object| match frame.object_box(object, camera) {
            Some(object_box) => conservative_overlap(&object_box, region),
            None => true,
        })
        .cloned()
        .collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_boxes_do_not_overlap_conservatively() {
        let a = Box3::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
        let b = Box3::new(2.0, 3.0, 0.0, 1.0, 0.0, 1.0);
        assert!(!conservative_overlap(&a, &b));
    }

    #[test]
    fn touching_full_boxes_do_not_overlap_conservatively() {
        let a = Box3::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
        let b = Box3::new(1.0, 2.0, 0.0, 1.0, 0.0, 1.0);
        assert!(!conservative_overlap(&a, &b));
    }

    #[test]
    fn collapsed_box_on_a_face_overlaps_conservatively() {
        let region = Box3::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
        // An axis-aligned plane sitting exactly on the region's z = 0 face.
        let plane = Box3::new(0.2, 0.8, 0.2, 0.8, 0.0, 0.0);
        assert!(conservative_overlap(&plane, &region));
        assert!(conservative_overlap(&region, &plane));
    }
}
