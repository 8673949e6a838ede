//! Test scenes and shapes
//!
//! Small consumer-side objects implementing the capability traits, used by
//! the index tests. Everything lives in camera coordinates with the camera
//! at the origin looking down the negative Z axis.

use lucent3d_core::camera::{Camera, ViewVolume};
use lucent3d_core::color::Color;
use lucent3d_core::context::RenderContext;
use lucent3d_core::geometry::{Box3, Point3, Rect2, Segment3};
use lucent3d_core::object::{
    ArcObject, BoundedObject, ObjectId, RaytraceableObject, SceneObject, SurfacePoint,
};
use lucent3d_core::scene::Scene;
use lucent3d_core::scratch::ReusableObjectPack;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

pub(crate) fn test_camera() -> Camera {
    let view_volume = ViewVolume::new(Rect2::new(-1.0, 1.0, -1.0, 1.0), -1.0);
    Camera::new(Point3::origin(), view_volume)
}

pub(crate) fn test_scene(objects: Vec<ArcObject>) -> Scene {
    Scene::new("test scene", test_camera(), objects, Vec::new())
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
                let px = x * f;
                let py = y * f;
                let corner = Point3::new(
                    (((px - vpr.x1()) / vpr.width()) * 2.0 - 1.0).clamp(-1.0, 1.0),
                    (((py - vpr.y1()) / vpr.height()) * 2.0 - 1.0).clamp(-1.0, 1.0),
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

pub(crate) struct TestSphere {
    pub center: Point3,
    pub radius: f64,
    pub color: Color,
}

impl SceneObject for TestSphere {
    fn as_bounded(&self) -> Option<&dyn BoundedObject> {
        Some(self)
    }

    fn as_raytraceable(&self) -> Option<&dyn RaytraceableObject> {
        Some(self)
    }
}

impl BoundedObject for TestSphere {
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

impl RaytraceableObject for TestSphere {
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

impl TestSphere {
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

pub(crate) struct TestBox {
    pub bounds: Box3,
    pub color: Color,
}

impl SceneObject for TestBox {
    fn as_bounded(&self) -> Option<&dyn BoundedObject> {
        Some(self)
    }

    fn as_raytraceable(&self) -> Option<&dyn RaytraceableObject> {
        Some(self)
    }
}

impl BoundedObject for TestBox {
    fn bounding_box_in_camera(&self, _camera: &Camera) -> Box3 {
        self.bounds
    }

    fn bounding_box_in_view_volume(&self, camera: &Camera) -> Box3 {
        view_volume_box(camera, &self.bounds)
    }
}

impl RaytraceableObject for TestBox {
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

impl TestBox {
    fn intersect(&self, ray: &Segment3, out: &mut Vec<SurfacePoint>) {
        // Slab test along the segment's parametric range.
        let d = ray.direction();
        let mut t_enter = f64::NEG_INFINITY;
        let mut t_exit = f64::INFINITY;
        let slabs = [
            (ray.p1.x, d.x, self.bounds.x1(), self.bounds.x2()),
            (ray.p1.y, d.y, self.bounds.y1(), self.bounds.y2()),
            (ray.p1.z, d.z, self.bounds.z1(), self.bounds.z2()),
        ];
        for (origin, direction, lo, hi) in slabs {
            if direction == 0.0 {
                if origin < lo || origin > hi {
                    return;
                }
            } else {
                let t0 = (lo - origin) / direction;
                let t1 = (hi - origin) / direction;
                t_enter = t_enter.max(t0.min(t1));
                t_exit = t_exit.min(t0.max(t1));
            }
        }
        if t_enter > t_exit {
            return;
        }
        for t in [t_enter, t_exit] {
            if t.is_finite() && ray.contains_relative_position(t) {
                out.push(SurfacePoint::new(ray.at(t), self.color));
            }
        }
    }
}

pub(crate) fn sphere(center: Point3, radius: f64) -> ArcObject {
    Arc::new(TestSphere {
        center,
        radius,
        color: Color::new(0.8, 0.2, 0.2),
    })
}

pub(crate) fn boxed(bounds: Box3) -> ArcObject {
    Arc::new(TestBox {
        bounds,
        color: Color::new(0.2, 0.8, 0.2),
    })
}

/// Deterministic pseudo-random scatter of small spheres in front of the
/// camera.
pub(crate) fn scattered_spheres(count: usize) -> Vec<ArcObject> {
    seeded_shapes(1, count)
}

/// Deterministic mix of spheres and boxes derived from a seed. Two anchor
/// spheres pin the scene bounds so interior sample points stay inside the
/// indexed region.
pub(crate) fn seeded_shapes(seed: u64, count: usize) -> Vec<ArcObject> {
    let mut rng = Lcg::new(seed);
    let mut objects: Vec<ArcObject> = Vec::with_capacity(count + 2);
    objects.push(sphere(Point3::new(-9.0, -9.0, -16.0), 0.1));
    objects.push(sphere(Point3::new(9.0, 9.0, -0.5), 0.1));
    for i in 0..count {
        let x = rng.uniform(-8.0, 8.0);
        let y = rng.uniform(-8.0, 8.0);
        let z = rng.uniform(-15.0, -2.0);
        if i % 3 == 0 {
            let hw = rng.uniform(0.2, 1.5);
            objects.push(boxed(Box3::new(
                x - hw,
                x + hw,
                y - hw,
                y + hw,
                z - hw,
                z + hw,
            )));
        } else {
            objects.push(sphere(Point3::new(x, y, z), rng.uniform(0.2, 1.2)));
        }
    }
    objects
}

/// Strategy over points strictly inside the anchored test scene bounds.
pub(crate) fn interior_point_strategy() -> impl Strategy<Value = Point3> {
    (
        -8.9f64..8.9,
        -8.9f64..8.9,
        -15.9f64..-0.6,
    )
        .prop_map(|(x, y, z)| Point3::new(x, y, z))
}

/// The objects whose geometry actually intersects the segment, found by a
/// linear scan over all scene objects.
pub(crate) fn brute_force_hits(scene: &Scene, ray: &Segment3) -> HashSet<ObjectId> {
    let mut hits = HashSet::new();
    for object in scene.objects() {
        if let Some(raytraceable) = object.as_raytraceable() {
            let mut out = Vec::new();
            raytraceable.intersect_with_light_ray(ray, scene, &mut out);
            if !out.is_empty() {
                hits.insert(ObjectId::of(object));
            }
        }
    }
    hits
}

pub(crate) fn collect_hit_ids(
    intersections: impl Iterator<Item = SurfacePoint>,
) -> HashSet<ObjectId> {
    intersections.filter_map(|sp| sp.object_id()).collect()
}

/// A small linear congruential generator for deterministic test scenes.
pub(crate) struct Lcg {
    state: u64,
}

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    pub(crate) fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        lo + unit * (hi - lo)
    }
}
