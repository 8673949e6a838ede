//! Shading boundary

use crate::color::Color;
use crate::context::RenderContext;
use crate::geometry::Point3;
use crate::object::PolygonalObject;
use crate::scratch::ReusableObjectPack;

/// A shading model resolves the final color of a surface point from the
/// scene's light sources.
///
/// Objects hold a shared handle to their shading model and invoke it from
/// within their eye-ray intersection; the flat shading implementation lives
/// in the render crate.
pub trait ShadingModel: Send + Sync {
    /// Returns the shaded color for a surface point.
    ///
    /// * `surface_color` - The intrinsic surface color at the point.
    /// * `position`      - The surface position, in camera coordinates.
    /// * `object`        - The object being shaded.
    /// * `ctx`           - The render pass context.
    /// * `scratch`       - Reusable objects of the current thread.
    fn shade(
        &self,
        surface_color: Color,
        position: &Point3,
        object: &dyn PolygonalObject,
        ctx: &RenderContext,
        scratch: &mut ReusableObjectPack,
    ) -> Color;
}
