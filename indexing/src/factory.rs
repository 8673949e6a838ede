//! Index factory

use crate::adaptive::AdaptiveBinTreeIndex;
use crate::stats::BinStatistics;
use crate::uniform::UniformGridIndex;
use crate::view_plane::ViewPlaneIndex;
use crate::SceneSpatialIndex;
use lucent3d_core::geometry::Segment3;
use lucent3d_core::index::SpatialIndexQuery;
use lucent3d_core::object::SurfacePoint;
use lucent3d_core::scene::Scene;
use lucent3d_core::scratch::IndexScratch;
use std::fmt;
use std::ops::ControlFlow;

/// Bin resolution per axis of the uniform candidate index.
pub const UNIFORM_GRID_BINS: usize = 50;

/// Leaf budget of the adaptive candidate index.
pub const ADAPTIVE_MAXIMUM_LEAF_BINS: usize = 125_000;

/// Leaf budget of the view-plane index.
pub const VIEW_PLANE_MAXIMUM_LEAF_BINS: usize = 250_000;

/// The 3-D spatial index selected for a render pass: one of the two
/// candidate tessellations.
pub enum SpatialIndex3<'a> {
    Uniform(UniformGridIndex<'a>),
    Adaptive(AdaptiveBinTreeIndex<'a>),
}

impl SceneSpatialIndex for SpatialIndex3<'_> {
    fn build_index(&mut self) {
        match self {
            SpatialIndex3::Uniform(index) => index.build_index(),
            SpatialIndex3::Adaptive(index) => index.build_index(),
        }
    }

    fn dispose(&mut self) {
        match self {
            SpatialIndex3::Uniform(index) => index.dispose(),
            SpatialIndex3::Adaptive(index) => index.dispose(),
        }
    }

    fn bin_statistics(&self) -> BinStatistics {
        match self {
            SpatialIndex3::Uniform(index) => index.bin_statistics(),
            SpatialIndex3::Adaptive(index) => index.bin_statistics(),
        }
    }
}

impl SpatialIndexQuery for SpatialIndex3<'_> {
    fn for_each_intersection(
        &self,
        ray: &Segment3,
        scratch: &mut IndexScratch,
        visit: &mut dyn FnMut(SurfacePoint) -> ControlFlow<()>,
    ) {
        match self {
            SpatialIndex3::Uniform(index) => index.for_each_intersection(ray, scratch, visit),
            SpatialIndex3::Adaptive(index) => index.for_each_intersection(ray, scratch, visit),
        }
    }
}

impl fmt::Display for SpatialIndex3<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpatialIndex3::Uniform(index) => index.fmt(f),
            SpatialIndex3::Adaptive(index) => index.fmt(f),
        }
    }
}

/// Whether the adaptive candidate is preferred over the uniform one: it wins
/// when either its maximum objects per bin or its average objects per unit
/// of space is strictly lower. The rule accepts the adaptive index when a
/// single metric improves, without weighting; in mixed cases this can pick a
/// structurally worse index, which is kept as-is since the better combined
/// score is ambiguous.
///
/// * `adaptive` - Statistics of the adaptive candidate.
/// * `uniform`  - Statistics of the uniform candidate.
pub fn prefers_adaptive_index(adaptive: &BinStatistics, uniform: &BinStatistics) -> bool {
    adaptive.maximum_objects_per_bin() < uniform.maximum_objects_per_bin()
        || adaptive.average_objects_per_unit_space() < uniform.average_objects_per_unit_space()
}

/// Build both 3-D candidate indices for a scene snapshot, compare their
/// statistics, dispose the rejected one and return the winner. Construction
/// is single-threaded by contract.
///
/// * `scene` - The scene snapshot.
pub fn create_spatial_index(scene: &Scene) -> SpatialIndex3<'_> {
    let mut uniform = UniformGridIndex::new(
        scene,
        UNIFORM_GRID_BINS,
        UNIFORM_GRID_BINS,
        UNIFORM_GRID_BINS,
    );
    uniform.build_index();
    let mut adaptive = AdaptiveBinTreeIndex::new(scene, ADAPTIVE_MAXIMUM_LEAF_BINS);
    adaptive.build_index();
    let uniform_stats = uniform.bin_statistics();
    let adaptive_stats = adaptive.bin_statistics();
    if prefers_adaptive_index(&adaptive_stats, &uniform_stats) {
        info!("Selected the adaptive bin-tree spatial index");
        debug!("{adaptive_stats}");
        uniform.dispose();
        SpatialIndex3::Adaptive(adaptive)
    } else {
        info!("Selected the uniform grid spatial index");
        debug!("{uniform_stats}");
        adaptive.dispose();
        SpatialIndex3::Uniform(uniform)
    }
}

/// Build the view-plane index for a scene snapshot. Construction is
/// single-threaded by contract.
///
/// * `scene` - The scene snapshot.
pub fn create_view_plane_index(scene: &Scene) -> ViewPlaneIndex<'_> {
    let mut index = ViewPlaneIndex::new(scene, VIEW_PLANE_MAXIMUM_LEAF_BINS);
    index.build_index();
    index
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::BinOccupancy;
    use crate::testutil::*;
    use lucent3d_core::geometry::Point3;
    use lucent3d_core::object::ObjectId;
    use lucent3d_core::scratch::ReusableObjectPack;

    fn stats_of(counts: &[usize]) -> BinStatistics {
        BinStatistics::new(
            "Test index",
            counts
                .iter()
                .map(|&object_count| BinOccupancy {
                    object_count,
                    volume: 1.0,
                })
                .collect(),
        )
    }

    #[test]
    fn adaptive_wins_on_strictly_lower_maximum_per_bin() {
        // Equal density, lower maximum: the first condition decides.
        let adaptive = stats_of(&[3, 3, 3, 3]);
        let uniform = stats_of(&[4, 4, 2, 2]);
        assert!(prefers_adaptive_index(&adaptive, &uniform));
    }

    #[test]
    fn adaptive_wins_on_strictly_lower_unit_space_density() {
        // Higher maximum but lower density: either improvement suffices.
        let adaptive = stats_of(&[5, 0, 0, 0]);
        let uniform = stats_of(&[4, 4, 4, 4]);
        assert!(prefers_adaptive_index(&adaptive, &uniform));
    }

    #[test]
    fn uniform_wins_when_at_least_as_good_on_both_metrics() {
        let adaptive = stats_of(&[4, 4, 4, 4]);
        let uniform = stats_of(&[4, 4, 2, 2]);
        assert!(!prefers_adaptive_index(&adaptive, &uniform));
        // Exact ties go to the uniform index.
        let tied = stats_of(&[4, 4, 2, 2]);
        assert!(!prefers_adaptive_index(&tied, &uniform));
    }

    #[test]
    fn factory_returns_a_built_queryable_index() {
        let target = sphere(Point3::new(0.0, 0.0, -8.0), 1.0);
        let mut objects = scattered_spheres(12);
        objects.push(target.clone());
        let scene = test_scene(objects);
        let index = create_spatial_index(&scene);
        let mut pack = ReusableObjectPack::new();
        let ray = Segment3::new(Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, -14.9));
        let mut found = false;
        index.for_each_intersection(&ray, &mut pack.index, &mut |sp| {
            found = found || sp.object_id() == Some(ObjectId::of(&target));
            ControlFlow::Continue(())
        });
        assert!(found);
    }

    #[test]
    fn index_choice_equivalence_for_final_intersection_sets() {
        // The same scene and ray yield the same final filtered intersection
        // set through either index; only the candidate sets differ.
        let scene = test_scene(seeded_shapes(7, 18));
        let mut uniform = UniformGridIndex::new(&scene, 16, 16, 16);
        uniform.build_index();
        let mut adaptive = AdaptiveBinTreeIndex::new(&scene, 256);
        adaptive.build_index();
        let mut pack = ReusableObjectPack::new();
        for (from, to) in [
            (Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, -15.0)),
            (Point3::new(-8.0, -8.0, -2.0), Point3::new(8.0, 8.0, -14.0)),
            (Point3::new(5.0, -5.0, -12.0), Point3::new(-5.0, 5.0, -3.0)),
        ] {
            let ray = Segment3::new(from, to);
            let via_uniform =
                collect_hit_ids(uniform.object_intersections(&ray, &mut pack.index));
            let via_adaptive =
                collect_hit_ids(adaptive.object_intersections(&ray, &mut pack.index));
            assert_eq!(via_uniform, via_adaptive);
            assert_eq!(via_uniform, brute_force_hits(&scene, &ray));
        }
    }

    #[test]
    fn view_plane_factory_builds_the_index() {
        let scene = test_scene(scattered_spheres(10));
        let index = create_view_plane_index(&scene);
        assert!(index.bin_statistics().bin_count() >= 1);
    }
}
