//! Scene objects

use crate::camera::Camera;
use crate::color::Color;
use crate::context::RenderContext;
use crate::geometry::{Box3, Point3, Segment3, Vector3};
use crate::scene::Scene;
use crate::scratch::ReusableObjectPack;
use std::sync::Arc;

/// A shared handle to a scene object.
pub type ArcObject = Arc<dyn SceneObject>;

/// Identity of a scene object within one render pass, derived from its
/// allocation address. Valid only while the object is alive; the indices and
/// caches that use it never outlive the scene snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    /// The identity of a shared object handle.
    ///
    /// * `object` - The object handle.
    pub fn of(object: &ArcObject) -> Self {
        ObjectId(Arc::as_ptr(object) as *const () as usize)
    }
}

/// An object in 3-D space.
///
/// An object is multi-faceted: each optional behaviour is a separate
/// capability trait, reachable through a safe accessor returning `None` when
/// the object does not implement it. Implementations override the accessors
/// for the capabilities they support:
///
/// ```ignore
/// if let Some(bounded) = object.as_bounded() {
///     let bbox = bounded.bounding_box_in_camera(camera);
/// } else {
///     // The object has no known spatial bounds.
/// }
/// ```
pub trait SceneObject: Send + Sync {
    /// The identity of this object. Consistent with [`ObjectId::of`] on the
    /// `Arc` holding it.
    fn object_id(&self) -> ObjectId {
        ObjectId(self as *const Self as *const () as usize)
    }

    /// This object's bounded capability, if it has known spatial bounds.
    fn as_bounded(&self) -> Option<&dyn BoundedObject> {
        None
    }

    /// This object's raytracing capability, if it can be hit by rays.
    fn as_raytraceable(&self) -> Option<&dyn RaytraceableObject> {
        None
    }

    /// This object's polygonal capability, if it has a flat surface plane.
    fn as_polygonal(&self) -> Option<&dyn PolygonalObject> {
        None
    }
}

/// Capability of objects with a known axis-aligned bounding box.
pub trait BoundedObject: SceneObject {
    /// The bounding box in camera coordinates.
    ///
    /// * `camera` - The camera.
    fn bounding_box_in_camera(&self, camera: &Camera) -> Box3;

    /// The bounding box in canonical view volume coordinates.
    ///
    /// * `camera` - The camera.
    fn bounding_box_in_view_volume(&self, camera: &Camera) -> Box3;
}

/// Capability of objects that can be intersected by rays.
///
/// Implementations append every surface point where the ray actually meets
/// their geometry to `out`. The caller attributes appended points to this
/// object afterwards; implementations leave the `object` field of new points
/// unset.
pub trait RaytraceableObject: SceneObject {
    /// Intersect with a primary (eye) ray. The implementation may invoke its
    /// shading model on the resulting surface points, which is why the full
    /// render context and the thread's reusable objects are passed along.
    ///
    /// * `ray`     - The eye ray, in camera coordinates.
    /// * `ctx`     - The render pass context.
    /// * `out`     - Collects the resulting surface points.
    /// * `scratch` - Reusable objects of the current thread.
    fn intersect_with_eye_ray(
        &self,
        ray: &Segment3,
        ctx: &RenderContext,
        out: &mut Vec<SurfacePoint>,
        scratch: &mut ReusableObjectPack,
    );

    /// Intersect with a shadow (light) ray. No shading is applied.
    ///
    /// * `ray`   - The light ray, in camera coordinates.
    /// * `scene` - The scene.
    /// * `out`   - Collects the resulting surface points.
    fn intersect_with_light_ray(&self, ray: &Segment3, scene: &Scene, out: &mut Vec<SurfacePoint>);
}

/// Capability of objects whose surface lies in a single plane.
pub trait PolygonalObject: SceneObject {
    /// The unit normal of the surface plane, in camera coordinates.
    ///
    /// * `camera` - The camera.
    fn surface_normal_in_camera(&self, camera: &Camera) -> Vector3;
}

/// A point on an object's surface produced by a ray query, in camera
/// coordinates. Transient: lives for the duration of the query that produced
/// it unless copied into a per-pixel result list.
#[derive(Clone)]
pub struct SurfacePoint {
    /// The object the point lies on; `None` for points sourced from a
    /// backdrop buffer.
    pub object: Option<ArcObject>,

    /// Position in camera coordinates.
    pub position: Point3,

    /// Resolved surface color, possibly translucent.
    pub color: Color,
}

impl SurfacePoint {
    /// Create a new `SurfacePoint` not yet attributed to an object.
    ///
    /// * `position` - Position in camera coordinates.
    /// * `color`    - Resolved surface color.
    pub fn new(position: Point3, color: Color) -> Self {
        Self {
            object: None,
            position,
            color,
        }
    }

    /// The depth of this point: the distance from the camera measured along
    /// the negative Z axis.
    pub fn depth(&self) -> f64 {
        -self.position.z
    }

    /// The identity of the object this point lies on, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        self.object.as_ref().map(ObjectId::of)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Blob {
        #[allow(dead_code)]
        tag: u32,
    }

    impl SceneObject for Blob {}

    #[test]
    fn object_id_is_consistent_between_arc_and_reference() {
        let a: ArcObject = Arc::new(Blob { tag: 1 });
        let b: ArcObject = Arc::new(Blob { tag: 2 });
        assert_eq!(ObjectId::of(&a), a.object_id());
        assert_eq!(ObjectId::of(&b), b.object_id());
        assert_ne!(ObjectId::of(&a), ObjectId::of(&b));
    }

    #[test]
    fn capabilities_default_to_absent() {
        let blob = Blob { tag: 0 };
        assert!(blob.as_bounded().is_none());
        assert!(blob.as_raytraceable().is_none());
        assert!(blob.as_polygonal().is_none());
    }

    #[test]
    fn surface_point_depth_negates_z() {
        let sp = SurfacePoint::new(Point3::new(0.0, 0.0, -4.0), Color::BLACK);
        assert_eq!(sp.depth(), 4.0);
        assert!(sp.object_id().is_none());
    }
}
