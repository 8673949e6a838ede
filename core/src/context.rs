//! Render pass context

use crate::index::SpatialIndexQuery;
use crate::metrics::RenderMetrics;
use crate::options::RenderOptions;
use crate::scene::Scene;

/// Everything a render pass threads through object intersection and shading
/// calls: the scene snapshot, the active options, the selected 3-D spatial
/// index and the pass metrics.
///
/// A context is constructed per render pass and passed down explicitly;
/// independent renders of independent scenes can therefore run in parallel.
#[derive(Copy, Clone)]
pub struct RenderContext<'a> {
    pub scene: &'a Scene,
    pub options: &'a RenderOptions,
    pub spatial_index: &'a dyn SpatialIndexQuery,
    pub metrics: &'a RenderMetrics,
}

impl<'a> RenderContext<'a> {
    /// Create a new `RenderContext`.
    ///
    /// * `scene`         - The scene snapshot being rendered.
    /// * `options`       - The render options.
    /// * `spatial_index` - The 3-D spatial index selected for this pass.
    /// * `metrics`       - The pass metrics.
    pub fn new(
        scene: &'a Scene,
        options: &'a RenderOptions,
        spatial_index: &'a dyn SpatialIndexQuery,
        metrics: &'a RenderMetrics,
    ) -> Self {
        Self {
            scene,
            options,
            spatial_index,
            metrics,
        }
    }
}
