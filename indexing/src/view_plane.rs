//! View-plane index

use crate::adaptive::AdaptiveBinTreeIndex;
use crate::stats::BinStatistics;
use crate::SceneSpatialIndex;
use lucent3d_core::camera::Camera;
use lucent3d_core::geometry::Point3;
use lucent3d_core::object::ArcObject;
use lucent3d_core::scene::Scene;
use lucent3d_core::scratch::IndexScratch;
use ordered_float::OrderedFloat;
use std::fmt;

/// 2-D index of a scene's objects projected onto the view plane, used for
/// primary-visibility culling: "which objects could this screen sample hit".
///
/// The index is an [`AdaptiveBinTreeIndex`] over the canonical view volume
/// that only ever splits in the XY plane, leaving Z untouched, so an object's
/// view-volume bounding box doubles as its projection onto the grid.
/// Neighbor tracking is off since the index only ever point-locates. After
/// the tree is built every leaf's object list is sorted by increasing near
/// depth, enabling front-to-back consumption.
pub struct ViewPlaneIndex<'a> {
    tree: AdaptiveBinTreeIndex<'a>,
}

impl<'a> ViewPlaneIndex<'a> {
    /// Create a new, not yet built, `ViewPlaneIndex`.
    ///
    /// * `scene`             - The scene snapshot.
    /// * `maximum_leaf_bins` - Upper bound on the number of leaf bins.
    pub fn new(scene: &'a Scene, maximum_leaf_bins: usize) -> Self {
        Self {
            tree: AdaptiveBinTreeIndex::view_plane_variant(scene, maximum_leaf_bins),
        }
    }

    /// Build the index from the scene snapshot. Same contract as
    /// [`SceneSpatialIndex::build_index`].
    pub fn build_index(&mut self) {
        self.tree.build_index();
        self.sort_binned_objects_by_increasing_depth();
    }

    /// Release the index structures to free up memory.
    pub fn dispose(&mut self) {
        self.tree.dispose();
    }

    pub fn bin_statistics(&self) -> BinStatistics {
        self.tree.bin_statistics()
    }

    /// All scene objects that potentially project onto the given view-plane
    /// point, nearest (by bounding box) first.
    ///
    /// A single-slot last-visited-leaf cache in the scratch exploits the
    /// spatial coherence of successive screen samples: point location starts
    /// from the previous leaf instead of the root.
    ///
    /// * `point_on_view_plane` - A point on the view plane, camera frame.
    /// * `scratch`             - Index scratch of the current thread.
    pub fn view_plane_objects<'s>(
        &'s self,
        point_on_view_plane: &Point3,
        scratch: &mut IndexScratch,
    ) -> ViewPlaneObjects<'s> {
        let camera = self.tree.scene().camera();
        let point_in_view_volume = project_to_view_volume(point_on_view_plane, camera);
        let start = scratch
            .last_visited_leaf
            .filter(|&bin| (bin as usize) < self.tree.bin_count());
        let leaf = match start {
            Some(bin) => self.tree.find_leaf_bin_containing_from(
                bin,
                &point_in_view_volume,
                crate::adaptive::DEFAULT_AFFINITIES,
            ),
            None => self.tree.find_leaf_bin_containing(&point_in_view_volume),
        };
        scratch.last_visited_leaf = leaf;
        ViewPlaneObjects {
            objects: leaf.map_or(&[], |bin| self.tree.leaf_objects(bin)),
            camera,
            point_in_view_volume,
            cursor: 0,
        }
    }

    fn sort_binned_objects_by_increasing_depth(&mut self) {
        let camera = *self.tree.scene().camera();
        let leafs: Vec<u32> = self.tree.leaf_bins().collect();
        for leaf in leafs {
            self.tree
                .leaf_objects_mut(leaf)
                .sort_by_cached_key(|object| OrderedFloat(near_depth(object, &camera)));
        }
    }
}

impl fmt::Display for ViewPlaneIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.bin_statistics().fmt(f)
    }
}

/// The near depth of an object: the distance from the camera to the nearest
/// face of its camera-space bounding box. Objects without bounds sort first.
fn near_depth(object: &ArcObject, camera: &Camera) -> f64 {
    object
        .as_bounded()
        .map_or(f64::NEG_INFINITY, |bounded| {
            -bounded.bounding_box_in_camera(camera).z2()
        })
}

fn project_to_view_volume(point_on_view_plane: &Point3, camera: &Camera) -> Point3 {
    let vpr = camera.view_volume().view_plane_rect();
    Point3::new(
        (point_on_view_plane.x - vpr.x1()) / vpr.width() * 2.0 - 1.0,
        (point_on_view_plane.y - vpr.y1()) / vpr.height() * 2.0 - 1.0,
        // The view plane is the near plane of the canonical view volume.
        -1.0,
    )
}

/// Iterator over the candidate objects of one view-plane lookup, filtered to
/// those whose view-volume bounding box contains the sample point in XY.
pub struct ViewPlaneObjects<'s> {
    objects: &'s [ArcObject],
    camera: &'s Camera,
    point_in_view_volume: Point3,
    cursor: usize,
}

impl<'s> ViewPlaneObjects<'s> {
    fn accept(&self, object: &ArcObject) -> bool {
        match object.as_bounded() {
            Some(bounded) => {
                let bbox = bounded.bounding_box_in_view_volume(self.camera);
                let p = &self.point_in_view_volume;
                p.x >= bbox.x1() && p.x <= bbox.x2() && p.y >= bbox.y1() && p.y <= bbox.y2()
            }
            // No bounds to cull by.
            None => true,
        }
    }
}

impl<'s> Iterator for ViewPlaneObjects<'s> {
    type Item = &'s ArcObject;

    fn next(&mut self) -> Option<&'s ArcObject> {
        while self.cursor < self.objects.len() {
            let object = &self.objects[self.cursor];
            self.cursor += 1;
            if self.accept(object) {
                return Some(object);
            }
        }
        None
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
