//! Camera

use crate::geometry::{Point3, Rect2};

/// The part of the camera's view volume the raytrace core needs: the view
/// plane rectangle and its Z position, both in camera coordinates. The
/// canonical view volume maps this rectangle onto `[-1, 1]²` with the view
/// plane as the near plane at `z = -1`.
#[derive(Copy, Clone, Debug)]
pub struct ViewVolume {
    view_plane_rect: Rect2,
    view_plane_z: f64,
}

impl ViewVolume {
    /// Create a new `ViewVolume`.
    ///
    /// * `view_plane_rect` - The XY bounds of the view plane.
    /// * `view_plane_z`    - The Z position of the view plane (negative, in
    ///                       front of the camera).
    pub fn new(view_plane_rect: Rect2, view_plane_z: f64) -> Self {
        debug_assert!(view_plane_z < 0.0);
        Self {
            view_plane_rect,
            view_plane_z,
        }
    }

    pub fn view_plane_rect(&self) -> &Rect2 {
        &self.view_plane_rect
    }

    pub fn view_plane_z(&self) -> f64 {
        self.view_plane_z
    }
}

/// A camera, reduced to its raytracing interface. The camera sits at the
/// origin of camera space looking along the negative Z axis; all scene
/// geometry handed to the core is expressed in this frame.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    position: Point3,
    view_volume: ViewVolume,
}

impl Camera {
    /// Create a new `Camera`.
    ///
    /// * `position`    - The camera position in world coordinates, kept for
    ///                   diagnostics.
    /// * `view_volume` - The view volume.
    pub fn new(position: Point3, view_volume: ViewVolume) -> Self {
        Self {
            position,
            view_volume,
        }
    }

    pub fn position(&self) -> &Point3 {
        &self.position
    }

    pub fn view_volume(&self) -> &ViewVolume {
        &self.view_volume
    }
}
