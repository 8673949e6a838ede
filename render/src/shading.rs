//! Flat shading model

use lucent3d_core::color::Color;
use lucent3d_core::context::RenderContext;
use lucent3d_core::geometry::{Point3, Segment3};
use lucent3d_core::light::{LightId, LightSource};
use lucent3d_core::object::PolygonalObject;
use lucent3d_core::scratch::ReusableObjectPack;
use lucent3d_core::shading::ShadingModel;
use std::ops::ControlFlow;

/// Squared-distance threshold below which a shadow-ray hit is considered the
/// shaded surface point itself and ignored.
const APPROXIMATE_ZERO: f64 = 0.000001;

/// Compensation factor for the unrealistic over-lighting of a scene rendered
/// without shadows.
const SHADOWLESS_COMPENSATION: f64 = 0.7;

/// A shading model giving every surface point of a flat surface the same
/// lighting treatment: per light source, a brightness contribution from the
/// light's strength, a hard shadow test through the 3-D spatial index, and a
/// gloss term from the angle between the light ray and the surface normal.
pub struct FlatShadingModel {
    /// Reflection of light on the surface, from 0 (none) to 1 (maximum).
    light_reflection_factor: f64,

    /// Light gloss of the surface, strictly positive; higher values give a
    /// more glossy appearance.
    light_gloss_factor: f64,
}

impl FlatShadingModel {
    /// Create a new `FlatShadingModel`.
    ///
    /// * `light_reflection_factor` - Reflection of light on the surface,
    ///                               from 0 to 1.
    /// * `light_gloss_factor`      - Light gloss of the surface, strictly
    ///                               positive.
    pub fn new(light_reflection_factor: f64, light_gloss_factor: f64) -> Self {
        Self {
            light_reflection_factor,
            light_gloss_factor,
        }
    }

    pub fn light_reflection_factor(&self) -> f64 {
        self.light_reflection_factor
    }

    pub fn light_gloss_factor(&self) -> f64 {
        self.light_gloss_factor
    }

    /// The brightness factor for a surface point, in `[-1, 1]`, folding the
    /// contributions of all scene light sources into one multiplicative
    /// product.
    fn compute_brightness_factor(
        &self,
        position: &Point3,
        object: &dyn PolygonalObject,
        ctx: &RenderContext,
        scratch: &mut ReusableObjectPack,
    ) -> f64 {
        let mut product = 1.0;
        for (i, light) in ctx.scene.lights().iter().enumerate() {
            let light_factor = self.compute_light_source_brightness_factor(
                LightId(i),
                light,
                position,
                object,
                ctx,
                scratch,
            );
            product *= 1.0 - (light_factor + 1.0) / 2.0;
        }
        (1.0 - product) * 2.0 - 1.0
    }

    fn compute_light_source_brightness_factor(
        &self,
        light_id: LightId,
        light: &LightSource,
        position: &Point3,
        object: &dyn PolygonalObject,
        ctx: &RenderContext,
        scratch: &mut ReusableObjectPack,
    ) -> f64 {
        match ray_from_surface_position_to_light_source(position, light, ctx) {
            Some(ray) => {
                self.compute_light_ray_brightness_factor(&ray, light_id, light, object, ctx, scratch)
            }
            None => self.compute_ambient_light_brightness_factor(light),
        }
    }

    fn compute_ambient_light_brightness_factor(&self, light: &LightSource) -> f64 {
        light.brightness() * self.light_reflection_factor - 1.0
    }

    fn compute_light_ray_brightness_factor(
        &self,
        ray: &Segment3,
        light_id: LightId,
        light: &LightSource,
        object: &dyn PolygonalObject,
        ctx: &RenderContext,
        scratch: &mut ReusableObjectPack,
    ) -> f64 {
        let mut light_factor = -1.0;
        let mut brightness = light.brightness() * self.light_reflection_factor;
        if ctx.options.shadows_enabled {
            brightness *= self.light_ray_translucency(ray, light_id, object, ctx, scratch);
        } else {
            // Compensate the unrealistic over-lighting of a scene in the
            // absence of shadows.
            brightness *= SHADOWLESS_COMPENSATION;
        }
        if brightness > 0.0 {
            brightness *= self.compute_light_ray_gloss(ray, object, ctx);
            light_factor = brightness * 2.0 - 1.0;
        }
        light_factor
    }

    fn compute_light_ray_gloss(
        &self,
        ray: &Segment3,
        object: &dyn PolygonalObject,
        ctx: &RenderContext,
    ) -> f64 {
        let ray_unit = ray.unit_direction();
        let normal = object.surface_normal_in_camera(ctx.scene.camera());
        let alfa = (ray_unit.angle_between_unit_vectors(&normal) / std::f64::consts::PI * 2.0
            - 1.0)
            .abs();
        alfa.powf(self.light_gloss_factor)
    }

    /// The fraction of the light ray's light reaching the surface point:
    /// 0 when fully obscured, 1 when unobstructed.
    fn light_ray_translucency(
        &self,
        ray: &Segment3,
        light_id: LightId,
        object: &dyn PolygonalObject,
        ctx: &RenderContext,
        scratch: &mut ReusableObjectPack,
    ) -> f64 {
        if self.is_obscured_from_memory(ray, light_id, object, ctx, scratch) {
            // Exploits local invariance: nearby surface points of the same
            // object tend to be obscured by the same obscurer.
            0.0
        } else {
            self.compute_light_ray_translucency(ray, light_id, object, ctx, scratch)
        }
    }

    /// Fast path: re-test only the obscuring object the cache recorded for
    /// this (object, light) pair, skipping the full index query while it
    /// still blocks the ray.
    fn is_obscured_from_memory(
        &self,
        ray: &Segment3,
        light_id: LightId,
        object: &dyn PolygonalObject,
        ctx: &RenderContext,
        scratch: &mut ReusableObjectPack,
    ) -> bool {
        let shading = &mut scratch.shading;
        let Some(candidate) = shading
            .obscured_cache
            .obscuring_object(object.object_id(), light_id)
            .cloned()
        else {
            return false;
        };
        let Some(raytraceable) = candidate.as_raytraceable() else {
            return false;
        };
        shading.probe_hits.clear();
        raytraceable.intersect_with_light_ray(ray, ctx.scene, &mut shading.probe_hits);
        let obscured = shading
            .probe_hits
            .first()
            .is_some_and(|hit| hit.color.is_fully_opaque());
        if obscured {
            ctx.metrics.increment_obscured_cache_hits();
        }
        obscured
    }

    /// Full shadow test: accumulate the translucency product over all other
    /// objects intersecting the light ray, stopping at the first fully
    /// opaque hit, which is recorded in the obscured-objects cache.
    fn compute_light_ray_translucency(
        &self,
        ray: &Segment3,
        light_id: LightId,
        object: &dyn PolygonalObject,
        ctx: &RenderContext,
        scratch: &mut ReusableObjectPack,
    ) -> f64 {
        let shaded_id = object.object_id();
        let surface_position = ray.p1;
        ctx.metrics.increment_shadow_ray_traversals();
        let mut translucency = 1.0;
        let (index_scratch, shading_scratch) = scratch.split_mut();
        ctx.spatial_index
            .for_each_intersection(ray, index_scratch, &mut |intersection| {
                if intersection.object_id() != Some(shaded_id) {
                    let square_distance =
                        intersection.position.square_distance_to(&surface_position);
                    if square_distance >= APPROXIMATE_ZERO {
                        let transparency = intersection.color.transparency();
                        translucency *= transparency;
                        if transparency == 0.0 {
                            if let Some(obscuring) = intersection.object {
                                shading_scratch.obscured_cache.add_to_cache(
                                    shaded_id,
                                    light_id,
                                    obscuring,
                                );
                            }
                        }
                    }
                }
                if translucency > 0.0 {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            });
        translucency
    }
}

impl Default for FlatShadingModel {
    fn default() -> Self {
        Self::new(1.0, 3.0)
    }
}

impl ShadingModel for FlatShadingModel {
    fn shade(
        &self,
        surface_color: Color,
        position: &Point3,
        object: &dyn PolygonalObject,
        ctx: &RenderContext,
        scratch: &mut ReusableObjectPack,
    ) -> Color {
        let brightness = self.compute_brightness_factor(position, object, ctx, scratch);
        surface_color.adjust_brightness(brightness as f32)
    }
}

/// The shadow ray from a surface position towards a light source, or `None`
/// for lights without origin or direction (ambient).
///
/// Positional lights give the straight segment to the light's position;
/// directional lights a segment scaled far enough to guarantee exiting the
/// scene.
fn ray_from_surface_position_to_light_source(
    position: &Point3,
    light: &LightSource,
    ctx: &RenderContext,
) -> Option<Segment3> {
    match light {
        LightSource::Ambient(_) => None,
        LightSource::Positional(positional) => {
            Some(Segment3::new(*position, positional.position_in_camera))
        }
        LightSource::Directional(directional) => {
            let v = directional.scaled_direction_outside_of_scene(ctx.scene);
            Some(Segment3::new(*position, *position - v))
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
