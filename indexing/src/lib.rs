//! Scene spatial indices
//!
//! Build-once, query-many structures mapping regions of space to the objects
//! that may occupy them. A render pass builds its indices from the current
//! scene snapshot, queries them read-only from its worker threads, and drops
//! them before the scene is mutated; there is no incremental update path.

#[macro_use]
extern crate log;

use lucent3d_core::index::SpatialIndexQuery;

mod adaptive;
mod common;
mod factory;
mod stats;
mod uniform;
mod view_plane;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export.
pub use adaptive::*;
pub use factory::*;
pub use stats::*;
pub use uniform::*;
pub use view_plane::*;

/// A 3-D spatial index over a scene snapshot.
///
/// Contract: [`build_index`](SceneSpatialIndex::build_index) consumes the
/// scene snapshot exactly once and is not re-entrant; it must complete before
/// any query. Building twice, or querying before building, is a caller
/// contract violation and is not runtime-checked. After
/// [`dispose`](SceneSpatialIndex::dispose) the index is unusable.
pub trait SceneSpatialIndex: SpatialIndexQuery {
    /// Build the index from the scene snapshot.
    fn build_index(&mut self);

    /// Release the index structures to free up memory.
    fn dispose(&mut self);

    /// Per-index bin statistics, used by the factory to pick an index.
    fn bin_statistics(&self) -> BinStatistics;
}
