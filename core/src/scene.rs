//! Scene snapshot

use crate::buffer::ColorDepthBuffer;
use crate::camera::Camera;
use crate::depth::{DepthBlurParameters, DepthFunction};
use crate::geometry::Box3;
use crate::light::LightSource;
use crate::object::ArcObject;

/// An immutable-for-the-render-pass snapshot of a scene: objects, lights,
/// camera and optional backdrop, all expressed in camera coordinates.
///
/// The snapshot is read-only for the core. Spatial indices are built from the
/// snapshot at the start of each render pass and must be dropped before the
/// underlying scene is mutated; there is no incremental update path.
pub struct Scene {
    name: String,
    camera: Camera,
    objects: Vec<ArcObject>,
    lights: Vec<LightSource>,
    backdrop: Option<ColorDepthBuffer>,
    darkness_depth_function: Option<Box<dyn DepthFunction>>,
    depth_blur_parameters: Option<DepthBlurParameters>,
    bounding_box_in_camera: Box3,
    distance_outside_scene: f64,
}

impl Scene {
    /// Create a new `Scene` snapshot. The camera-space bounding box and the
    /// distance that guarantees exiting the scene are computed eagerly here;
    /// there is no invalidation machinery because a snapshot never changes.
    ///
    /// * `name`    - A descriptive name.
    /// * `camera`  - The camera.
    /// * `objects` - The individual (non-composite) objects of the scene.
    /// * `lights`  - The light sources.
    pub fn new(
        name: impl Into<String>,
        camera: Camera,
        objects: Vec<ArcObject>,
        lights: Vec<LightSource>,
    ) -> Self {
        let bounding_box_in_camera = derive_bounding_box(&objects, &camera);
        let distance_outside_scene = 2.0
            * bounding_box_in_camera
                .width()
                .max(bounding_box_in_camera.height())
                .max(bounding_box_in_camera.depth());
        Self {
            name: name.into(),
            camera,
            objects,
            lights,
            backdrop: None,
            darkness_depth_function: None,
            depth_blur_parameters: None,
            bounding_box_in_camera,
            distance_outside_scene,
        }
    }

    /// Attach a pre-rendered backdrop buffer.
    pub fn with_backdrop(mut self, backdrop: ColorDepthBuffer) -> Self {
        self.backdrop = Some(backdrop);
        self
    }

    /// Attach a darkness depth function used by depth-darkness rendering.
    pub fn with_darkness_depth_function(mut self, function: Box<dyn DepthFunction>) -> Self {
        self.darkness_depth_function = Some(function);
        self
    }

    /// Attach depth-blur parameters used by the depth-blur post-process.
    pub fn with_depth_blur_parameters(mut self, parameters: DepthBlurParameters) -> Self {
        self.depth_blur_parameters = Some(parameters);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn objects(&self) -> &[ArcObject] {
        &self.objects
    }

    pub fn lights(&self) -> &[LightSource] {
        &self.lights
    }

    pub fn backdrop(&self) -> Option<&ColorDepthBuffer> {
        self.backdrop.as_ref()
    }

    pub fn darkness_depth_function(&self) -> Option<&dyn DepthFunction> {
        self.darkness_depth_function.as_deref()
    }

    pub fn depth_blur_parameters(&self) -> Option<&DepthBlurParameters> {
        self.depth_blur_parameters.as_ref()
    }

    /// The bounding box of the scene geometry in camera coordinates. Falls
    /// back to the canonical box when no object is bounded.
    pub fn bounding_box_in_camera(&self) -> &Box3 {
        &self.bounding_box_in_camera
    }

    /// A distance guaranteed to reach outside the scene's bounds from any
    /// position inside them.
    pub fn distance_outside_scene(&self) -> f64 {
        self.distance_outside_scene
    }
}

fn derive_bounding_box(objects: &[ArcObject], camera: &Camera) -> Box3 {
    let mut bbox: Option<Box3> = None;
    for object in objects {
        if let Some(bounded) = object.as_bounded() {
            let object_box = bounded.bounding_box_in_camera(camera);
            match bbox.as_mut() {
                Some(b) => b.expand_to_contain(&object_box),
                None => bbox = Some(object_box),
            }
        }
    }
    bbox.unwrap_or_else(Box3::canonical)
}
