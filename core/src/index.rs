//! Spatial index query boundary

use crate::geometry::Segment3;
use crate::object::SurfacePoint;
use crate::scratch::IndexScratch;
use std::fmt;
use std::ops::ControlFlow;

/// The query side of a 3-D spatial index, as seen by the shading path.
///
/// The concrete index types live in the indexing crate; shading only needs to
/// cast shadow rays through whichever index a render pass selected, so the
/// render context carries this narrow object-safe view. Indices are read-only
/// once built and shared across worker threads without locking, hence the
/// `Sync` bound.
pub trait SpatialIndexQuery: Sync + fmt::Display {
    /// Drive `visit` over the surface points of objects whose geometry
    /// intersects the given line segment.
    ///
    /// The segment is closed at both ends and its first endpoint must lie
    /// inside the indexed region. Points are produced lazily, in no specified
    /// order; every true geometric intersection is eventually produced if the
    /// visitor keeps returning [`ControlFlow::Continue`], and the visitor may
    /// stop early (e.g. at the first fully opaque hit) by returning
    /// [`ControlFlow::Break`].
    ///
    /// * `ray`     - The line segment, in camera coordinates.
    /// * `scratch` - Index scratch of the current thread.
    /// * `visit`   - The visitor.
    fn for_each_intersection(
        &self,
        ray: &Segment3,
        scratch: &mut IndexScratch,
        visit: &mut dyn FnMut(SurfacePoint) -> ControlFlow<()>,
    );
}
