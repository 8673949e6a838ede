//! Built-in demo scene
//!
//! A small camera-space scene exercising the whole pipeline: shaded quads
//! and cubes, a translucent sphere, several light sources, a darkness depth
//! function and depth-blur parameters. The shapes implement the consumer
//! side of the engine's object capability traits.

use lucent3d_core::camera::{Camera, ViewVolume};
use lucent3d_core::color::Color;
use lucent3d_core::context::RenderContext;
use lucent3d_core::depth::{DepthBlurParameters, LinearScalingDepthFunction, SigmoidDepthFunction};
use lucent3d_core::geometry::{Axis, Box3, Point3, Rect2, Segment3, Vector3};
use lucent3d_core::light::{AmbientLight, DirectionalLight, LightSource, PositionalLight};
use lucent3d_core::object::{
    ArcObject, BoundedObject, PolygonalObject, RaytraceableObject, SceneObject, SurfacePoint,
};
use lucent3d_core::options::RenderOptions;
use lucent3d_core::scene::Scene;
use lucent3d_core::scratch::ReusableObjectPack;
use lucent3d_core::shading::ShadingModel;
use lucent3d_render::FlatShadingModel;
use std::sync::Arc;

/// Build the demo scene for the given render options (the view plane aspect
/// ratio follows the output size).
pub fn build_demo_scene(options: &RenderOptions) -> Scene {
    let camera = demo_camera(options.aspect_ratio());
    let shading: Arc<dyn ShadingModel> = Arc::new(FlatShadingModel::new(1.0, 3.0));
    let soft_shading: Arc<dyn ShadingModel> = Arc::new(FlatShadingModel::new(0.9, 1.5));

    let mut objects: Vec<ArcObject> = Vec::new();
    // Floor.
    objects.push(Arc::new(Quad {
        axis: Axis::Y,
        coordinate: -2.0,
        u_range: (-14.0, 14.0),
        v_range: (-30.0, -2.0),
        color: Color::new(0.55, 0.5, 0.45),
        shading: Some(Arc::clone(&soft_shading)),
    }));
    // Back wall.
    objects.push(Arc::new(Quad {
        axis: Axis::Z,
        coordinate: -30.0,
        u_range: (-14.0, 14.0),
        v_range: (-2.0, 12.0),
        color: Color::new(0.35, 0.4, 0.5),
        shading: Some(Arc::clone(&soft_shading)),
    }));
    // Two cubes on the floor.
    objects.extend(cuboid(
        Point3::new(-3.0, -1.0, -12.0),
        2.0,
        Color::new(0.8, 0.3, 0.25),
        &shading,
    ));
    objects.extend(cuboid(
        Point3::new(3.5, -1.2, -9.0),
        1.6,
        Color::new(0.25, 0.65, 0.3),
        &shading,
    ));
    // A translucent sphere hovering in between.
    objects.push(Arc::new(Sphere {
        center: Point3::new(0.5, 0.5, -7.0),
        radius: 1.2,
        color: Color::with_alpha(0.4, 0.55, 0.9, 0.55),
    }));

    let lights = vec![
        LightSource::Ambient(AmbientLight::new(0.35)),
        LightSource::Positional(PositionalLight::new(Point3::new(5.0, 6.0, -4.0), 0.9)),
        LightSource::Directional(DirectionalLight::new(
            Vector3::new(-0.3, -1.0, -0.4),
            0.5,
        )),
    ];

    let darkness = LinearScalingDepthFunction::new(
        Box::new(SigmoidDepthFunction::create_filter(4.0, 30.0, 0.6, 1.5)),
        0.6,
    );
    Scene::new("demo scene", camera, objects, lights)
        .with_darkness_depth_function(Box::new(darkness))
        .with_depth_blur_parameters(DepthBlurParameters::new(0.4, 1.2))
}

fn demo_camera(aspect_ratio: f64) -> Camera {
    let half_height = 0.5;
    let half_width = half_height * aspect_ratio;
    let view_volume = ViewVolume::new(
        Rect2::new(-half_width, half_width, -half_height, half_height),
        -1.0,
    );
    Camera::new(Point3::origin(), view_volume)
}

/// The six faces of an axis-aligned cube, as independent shaded quads.
fn cuboid(
    center: Point3,
    size: f64,
    color: Color,
    shading: &Arc<dyn ShadingModel>,
) -> Vec<ArcObject> {
    let h = size / 2.0;
    let mut faces: Vec<ArcObject> = Vec::with_capacity(6);
    for axis in Axis::ALL {
        let (u, v) = other_axes(axis);
        for side in [-1.0, 1.0] {
            faces.push(Arc::new(Quad {
                axis,
                coordinate: center[axis] + side * h,
                u_range: (center[u] - h, center[u] + h),
                v_range: (center[v] - h, center[v] + h),
                color,
                shading: Some(Arc::clone(shading)),
            }));
        }
    }
    faces
}

fn other_axes(axis: Axis) -> (Axis, Axis) {
    match axis {
        Axis::X => (Axis::Y, Axis::Z),
        Axis::Y => (Axis::X, Axis::Z),
        Axis::Z => (Axis::X, Axis::Y),
    }
}

/// Map a camera-space box to canonical view volume coordinates by projecting
/// its corners through the view plane, clamped to the volume.
fn view_volume_box(camera: &Camera, camera_box: &Box3) -> Box3 {
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

/// An axis-aligned rectangle with a flat shading model. `axis` is the normal
/// axis; `(u, v)` are the other two axes in `Axis::ALL` order.
struct Quad {
    axis: Axis,
    coordinate: f64,
    u_range: (f64, f64),
    v_range: (f64, f64),
    color: Color,
    shading: Option<Arc<dyn ShadingModel>>,
}

impl Quad {
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
        let (u, v) = other_axes(self.axis);
        if point[u] < self.u_range.0 || point[u] > self.u_range.1 {
            return None;
        }
        if point[v] < self.v_range.0 || point[v] > self.v_range.1 {
            return None;
        }
        Some(point)
    }
}

impl SceneObject for Quad {
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

impl BoundedObject for Quad {
    fn bounding_box_in_camera(&self, _camera: &Camera) -> Box3 {
        let (u, v) = other_axes(self.axis);
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

impl RaytraceableObject for Quad {
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

impl PolygonalObject for Quad {
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

/// An unshaded, possibly translucent sphere.
struct Sphere {
    center: Point3,
    radius: f64,
    color: Color,
}

impl Sphere {
    fn intersect(&self, ray: &Segment3, out: &mut Vec<SurfacePoint>) {
        let d = ray.direction();
        let oc = ray.p1 - self.center;
        let a = d.dot(&d);
        if a == 0.0 {
            return;
        }
        let b = 2.0 * oc.dot(&d);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return;
        }
        let sqrt_d = discriminant.sqrt();
        for t in [(-b - sqrt_d) / (2.0 * a), (-b + sqrt_d) / (2.0 * a)] {
            if ray.contains_relative_position(t) {
                out.push(SurfacePoint::new(ray.at(t), self.color));
            }
        }
    }
}

impl SceneObject for Sphere {
    fn as_bounded(&self) -> Option<&dyn BoundedObject> {
        Some(self)
    }

    fn as_raytraceable(&self) -> Option<&dyn RaytraceableObject> {
        Some(self)
    }
}

impl BoundedObject for Sphere {
    fn bounding_box_in_camera(&self, _camera: &Camera) -> Box3 {
        let r = self.radius;
        Box3::new(
            self.center.x - r,
            self.center.x + r,
            self.center.y - r,
            self.center.y + r,
            self.center.z - r,
            self.center.z + r,
        )
    }

    fn bounding_box_in_view_volume(&self, camera: &Camera) -> Box3 {
        view_volume_box(camera, &self.bounding_box_in_camera(camera))
    }
}

impl RaytraceableObject for Sphere {
    fn intersect_with_eye_ray(
        &self,
        ray: &Segment3,
        _ctx: &RenderContext,
        out: &mut Vec<SurfacePoint>,
        _scratch: &mut ReusableObjectPack,
    ) {
        self.intersect(ray, out);
    }

    fn intersect_with_light_ray(
        &self,
        ray: &Segment3,
        _scene: &Scene,
        out: &mut Vec<SurfacePoint>,
    ) {
        self.intersect(ray, out);
    }
}
