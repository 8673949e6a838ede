//! Test scenes, shapes and targets
//!
//! Consumer-side objects implementing the capability traits, plus in-memory
//! render targets, used by the renderer and shading tests. Everything lives
//! in camera coordinates with the camera at the origin looking down the
//! negative Z axis.

use lucent3d_core::camera::{Camera, ViewVolume};
use lucent3d_core::color::Color;
use lucent3d_core::context::RenderContext;
use lucent3d_core::geometry::{Axis, Box3, Point3, Rect2, Segment3, Vector3};
use lucent3d_core::light::LightSource;
use lucent3d_core::object::{
    ArcObject, BoundedObject, PolygonalObject, RaytraceableObject, SceneObject, SurfacePoint,
};
use lucent3d_core::scene::Scene;
use lucent3d_core::scratch::ReusableObjectPack;
use lucent3d_core::shading::ShadingModel;
use lucent3d_core::target::RenderTarget;
use std::sync::{Arc, Mutex};

pub(crate) fn test_camera() -> Camera {
    let view_volume = ViewVolume::new(Rect2::new(-1.0, 1.0, -1.0, 1.0), -1.0);
    Camera::new(Point3::origin(), view_volume)
}

pub(crate) fn scene_with_lights(objects: Vec<ArcObject>, lights: Vec<LightSource>) -> Scene {
    Scene::new("test scene", test_camera(), objects, lights)
}

/// Coercion helper turning a concrete shared object into an [`ArcObject`].
pub(crate) trait IntoObject {
    fn into_object(self) -> ArcObject;
}

impl<T: SceneObject + 'static> IntoObject for Arc<T> {
    fn into_object(self) -> ArcObject {
        self
    }
}

/// An axis-aligned rectangle: flat, raytraceable, bounded and optionally
/// shaded. `axis` is the normal axis; `(u, v)` are the other two axes in
/// `Axis::ALL` order.
pub(crate) struct TestQuad {
    pub axis: Axis,
    pub coordinate: f64,
    pub u_range: (f64, f64),
    pub v_range: (f64, f64),
    pub color: Color,
    pub shading: Option<Arc<dyn ShadingModel>>,
}

impl TestQuad {
    fn uv_axes(&self) -> (Axis, Axis) {
        match self.axis {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }

    fn hit(&self, ray: &Segment3) -> Option<Point3> {
        let d = ray.direction();
        if d[self.axis] == 0.0 {
            return None;
        }
        let t = (self.coordinate - ray.p1[self.axis]) / d[self.axis];
        if !ray.contains_relative_position(t) {
            return None;
        }
        let point = ray.at(t);
        let (u, v) = self.uv_axes();
        if point[u] < self.u_range.0 || point[u] > self.u_range.1 {
            return None;
        }
        if point[v] < self.v_range.0 || point[v] > self.v_range.1 {
            return None;
        }
        Some(point)
    }
}

impl SceneObject for TestQuad {
    fn as_bounded(&self) -> Option<&dyn BoundedObject> {
        Some(self)
    }

    fn as_raytraceable(&self) -> Option<&dyn RaytraceableObject> {
        Some(self)
    }

    fn as_polygonal(&self) -> Option<&dyn PolygonalObject> {
        Some(self)
    }
}

impl BoundedObject for TestQuad {
    fn bounding_box_in_camera(&self, _camera: &Camera) -> Box3 {
        let (u, v) = self.uv_axes();
        let mut lo = Point3::origin();
        let mut hi = Point3::origin();
        lo[self.axis] = self.coordinate;
        hi[self.axis] = self.coordinate;
        lo[u] = self.u_range.0;
        hi[u] = self.u_range.1;
        lo[v] = self.v_range.0;
        hi[v] = self.v_range.1;
        Box3::spanning(&lo, &hi)
    }

    fn bounding_box_in_view_volume(&self, camera: &Camera) -> Box3 {
        view_volume_box(camera, &self.bounding_box_in_camera(camera))
    }
}

impl RaytraceableObject for TestQuad {
    fn intersect_with_eye_ray(
        &self,
        ray: &Segment3,
        ctx: &RenderContext,
        out: &mut Vec<SurfacePoint>,
        scratch: &mut ReusableObjectPack,
    ) {
        if let Some(point) = self.hit(ray) {
            let color = match &self.shading {
                Some(model) => model.shade(self.color, &point, self, ctx, scratch),
                None => self.color,
            };
            out.push(SurfacePoint::new(point, color));
        }
    }

    fn intersect_with_light_ray(
        &self,
        ray: &Segment3,
        _scene: &Scene,
        out: &mut Vec<SurfacePoint>,
    ) {
        if let Some(point) = self.hit(ray) {
            out.push(SurfacePoint::new(point, self.color));
        }
    }
}

impl PolygonalObject for TestQuad {
    fn surface_normal_in_camera(&self, _camera: &Camera) -> Vector3 {
        let mut normal = Vector3::default();
        match self.axis {
            Axis::X => normal.x = 1.0,
            Axis::Y => normal.y = 1.0,
            Axis::Z => normal.z = 1.0,
        }
        normal
    }
}

/// The six faces of an axis-aligned cube as independent quads, in the order
/// -X, +X, -Y, +Y, -Z, +Z.
pub(crate) fn unit_cube_faces(center: Point3, size: f64) -> Vec<Arc<TestQuad>> {
    let h = size / 2.0;
    let mut faces = Vec::with_capacity(6);
    for axis in Axis::ALL {
        for side in [-1.0, 1.0] {
            let (u, v) = match axis {
                Axis::X => (Axis::Y, Axis::Z),
                Axis::Y => (Axis::X, Axis::Z),
                Axis::Z => (Axis::X, Axis::Y),
            };
            faces.push(Arc::new(TestQuad {
                axis,
                coordinate: center[axis] + side * h,
                u_range: (center[u] - h, center[u] + h),
                v_range: (center[v] - h, center[v] + h),
                color: Color::new(0.9, 0.9, 0.9),
                shading: None,
            }));
        }
    }
    faces
}

/// Map a camera-space box to canonical view volume coordinates by projecting
/// its corners through the view plane, clamped to the volume.
pub(crate) fn view_volume_box(camera: &Camera, camera_box: &Box3) -> Box3 {
    let vpr = *camera.view_volume().view_plane_rect();
    let vpz = camera.view_volume().view_plane_z();
    let mut bbox: Option<Box3> = None;
    for &x in &[camera_box.x1(), camera_box.x2()] {
        for &y in &[camera_box.y1(), camera_box.y2()] {
            for &z in &[camera_box.z1(), camera_box.z2()] {
                let f = vpz / z.min(vpz);
                let corner = Point3::new(
                    (((x * f - vpr.x1()) / vpr.width()) * 2.0 - 1.0).clamp(-1.0, 1.0),
                    (((y * f - vpr.y1()) / vpr.height()) * 2.0 - 1.0).clamp(-1.0, 1.0),
                    (1.0 - 2.0 * f).clamp(-1.0, 1.0),
                );
                match bbox.as_mut() {
                    Some(b) => b.expand_to_contain(&Box3::spanning(&corner, &corner)),
                    None => bbox = Some(Box3::spanning(&corner, &corner)),
                }
            }
        }
    }
    bbox.unwrap()
}

/// An in-memory render target recording painted pixels.
pub(crate) struct BufferTarget {
    pixels: Mutex<Vec<Option<Color>>>,
    width: usize,
    height: usize,
}

impl BufferTarget {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: Mutex::new(vec![None; width * height]),
            width,
            height,
        }
    }

    pub(crate) fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        self.pixels.lock().unwrap()[y * self.width + x]
    }

    pub(crate) fn painted_pixel_count(&self) -> usize {
        self.pixels
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_some())
            .count()
    }
}

impl RenderTarget for BufferTarget {
    fn clear(&self) {
        let mut pixels = self.pixels.lock().unwrap();
        pixels.fill(None);
    }

    fn paint_pixel(&self, x: usize, y: usize, color: Color) {
        debug_assert!(x < self.width && y < self.height);
        self.pixels.lock().unwrap()[y * self.width + x] = Some(color);
    }
}
