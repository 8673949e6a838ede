//! Light sources

use crate::geometry::{Point3, Vector3};
use crate::scene::Scene;

/// Identity of a light source within a scene snapshot: its index in the
/// snapshot's light list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LightId(pub usize);

/// A light source in a scene snapshot, expressed in camera coordinates.
#[derive(Clone, Debug)]
pub enum LightSource {
    /// Directionless background light; never casts shadows.
    Ambient(AmbientLight),

    /// Light radiating from a single position.
    Positional(PositionalLight),

    /// Light radiating in a single direction from infinitely far away.
    Directional(DirectionalLight),
}

impl LightSource {
    /// The brightness of this light source, from 0 (dark) to 1 (maximum).
    pub fn brightness(&self) -> f64 {
        match self {
            LightSource::Ambient(light) => light.brightness,
            LightSource::Positional(light) => light.brightness,
            LightSource::Directional(light) => light.brightness,
        }
    }
}

/// An omnidirectional background light without origin or direction.
#[derive(Clone, Debug)]
pub struct AmbientLight {
    /// Brightness, from 0 to 1.
    pub brightness: f64,
}

impl AmbientLight {
    /// Create a new `AmbientLight`.
    ///
    /// * `brightness` - Brightness, from 0 to 1.
    pub fn new(brightness: f64) -> Self {
        Self { brightness }
    }
}

/// A light source originating from one position in space.
#[derive(Clone, Debug)]
pub struct PositionalLight {
    /// The light position, in camera coordinates.
    pub position_in_camera: Point3,

    /// Brightness, from 0 to 1.
    pub brightness: f64,
}

impl PositionalLight {
    /// Create a new `PositionalLight`.
    ///
    /// * `position_in_camera` - The light position, in camera coordinates.
    /// * `brightness`         - Brightness, from 0 to 1.
    pub fn new(position_in_camera: Point3, brightness: f64) -> Self {
        Self {
            position_in_camera,
            brightness,
        }
    }
}

/// A light source radiating out in one direction.
#[derive(Clone, Debug)]
pub struct DirectionalLight {
    /// The direction of radiation, in camera coordinates.
    pub direction: Vector3,

    /// Brightness, from 0 to 1.
    pub brightness: f64,
}

impl DirectionalLight {
    /// Create a new `DirectionalLight`.
    ///
    /// * `direction`  - The direction of radiation, in camera coordinates.
    /// * `brightness` - Brightness, from 0 to 1.
    pub fn new(direction: Vector3, brightness: f64) -> Self {
        Self {
            direction,
            brightness,
        }
    }

    /// The direction scaled so that, starting anywhere inside the scene,
    /// following it is guaranteed to exit the scene's bounds.
    ///
    /// * `scene` - The scene.
    pub fn scaled_direction_outside_of_scene(&self, scene: &Scene) -> Vector3 {
        self.direction.normalized() * scene.distance_outside_scene()
    }
}
