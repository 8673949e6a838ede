//! Raytrace renderer

use crate::depth_blur::{DepthBlurOperation, DepthBlurProgressTracker};
use lucent3d_core::buffer::ColorDepthBuffer;
use lucent3d_core::color::Color;
use lucent3d_core::context::RenderContext;
use lucent3d_core::convolution::ConvolutionMatrix;
use lucent3d_core::geometry::{Point3, Rect2, Segment3};
use lucent3d_core::metrics::RenderMetrics;
use lucent3d_core::object::SurfacePoint;
use lucent3d_core::options::RenderOptions;
use lucent3d_core::progress::ProgressTracker;
use lucent3d_core::scene::Scene;
use lucent3d_core::scratch::ReusableObjectPack;
use lucent3d_core::target::RenderTarget;
use lucent3d_indexing::{create_spatial_index, create_view_plane_index, ViewPlaneIndex};
use ordered_float::OrderedFloat;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

const STEP_LABEL_INITIALIZE: &str = "Initializing";
const STEP_LABEL_RAYTRACE: &str = "Raytracing";
const STEP_LABEL_DEPTH_BLUR_COMPUTE: &str = "Computing depth blur";
const STEP_LABEL_DEPTH_BLUR_RENDER: &str = "Rendering depth blur";

/// Falloff control of the matrix averaging a pixel's supersample block.
const PIXEL_AVERAGING_SCALE: f64 = 2.0;

/// The raytrace renderer.
///
/// A render pass moves through up to four steps: initialize (build the 3-D
/// and view-plane indices, strictly single-threaded), raster (parallel
/// per-scanline ray casting), and, when depth blur is enabled, a blur
/// compute and a blur output step. Registered progress observers are
/// notified per step. [`render`](RaytraceRenderer::render) blocks until the
/// full pipeline, including all worker threads, has completed; there is no
/// cancellation path.
pub struct RaytraceRenderer {
    progress_trackers: Vec<Box<dyn ProgressTracker>>,
}

impl RaytraceRenderer {
    pub fn new() -> Self {
        Self {
            progress_trackers: Vec::new(),
        }
    }

    /// Register a progress observer.
    ///
    /// * `tracker` - The observer.
    pub fn add_progress_tracker(&mut self, tracker: Box<dyn ProgressTracker>) {
        self.progress_trackers.push(tracker);
    }

    /// Render a scene snapshot into the given output targets. Blocks until
    /// the full pipeline has completed.
    ///
    /// * `scene`   - The scene snapshot.
    /// * `outputs` - The output targets; painted concurrently by the worker
    ///               threads, each worker covering whole scanlines.
    /// * `options` - The render options.
    pub fn render(&self, scene: &Scene, outputs: &[&dyn RenderTarget], options: &RenderOptions) {
        for output in outputs {
            output.clear();
        }
        for tracker in &self.progress_trackers {
            tracker.rendering_started();
        }
        self.render_impl(scene, outputs, options);
        for tracker in &self.progress_trackers {
            tracker.rendering_completed();
        }
    }

    fn render_impl(&self, scene: &Scene, outputs: &[&dyn RenderTarget], options: &RenderOptions) {
        let metrics = RenderMetrics::new();
        let state = RenderState::new(scene, options);

        // Initialization builds the indices in this single thread; once
        // built they are shared read-only with the workers.
        self.fire_progress(&state, 0.0, STEP_LABEL_INITIALIZE);
        let spatial_index = create_spatial_index(scene);
        self.fire_progress(&state, 0.5, STEP_LABEL_INITIALIZE);
        let view_plane_index = create_view_plane_index(scene);
        self.fire_progress(&state, 1.0, STEP_LABEL_INITIALIZE);
        info!(
            "Rendering '{}': {} objects, {} lights, {}x{} pixels",
            scene.name(),
            scene.objects().len(),
            scene.lights().len(),
            state.pixel_width(),
            state.pixel_height()
        );

        let ctx = RenderContext::new(scene, options, &spatial_index, &metrics);
        state.increment_step();
        self.render_raster(&state, ctx, &view_plane_index, outputs);

        if state.should_apply_depth_blur(scene) {
            self.apply_depth_blur(&state, scene, outputs);
        }
        info!("{metrics}");
    }

    fn render_raster(
        &self,
        state: &RenderState,
        ctx: RenderContext,
        view_plane_index: &ViewPlaneIndex,
        outputs: &[&dyn RenderTarget],
    ) {
        let threads = state.options.safe_number_of_render_threads();
        if threads == 1 {
            RenderRasterWorker::new(self, state, ctx, view_plane_index, outputs).run();
        } else {
            info!("Spawning {threads} raytrace worker threads");
            crossbeam::scope(|scope| {
                for i in 0..threads {
                    scope.spawn(move |_| {
                        debug!("Raytrace worker #{i} started");
                        RenderRasterWorker::new(self, state, ctx, view_plane_index, outputs).run();
                        debug!("Raytrace worker #{i} finished");
                    });
                }
            })
            .expect("raytrace worker panicked");
        }
    }

    fn apply_depth_blur(&self, state: &RenderState, scene: &Scene, outputs: &[&dyn RenderTarget]) {
        let Some(params) = scene.depth_blur_parameters() else {
            return;
        };
        // Blur by depth.
        state.increment_step();
        let mut params = params.clone();
        let samples = state.samples_per_pixel_x().max(state.samples_per_pixel_y());
        params.max_blur_pixel_radius *= samples as f64; // radius in samples
        let blurred = {
            let raster = state.raster.read().unwrap();
            let mut tracker = BlurProgress {
                renderer: self,
                state,
            };
            DepthBlurOperation::blur_image_by_depth(&raster, &params, Some(&mut tracker))
        };
        state.raster.write().unwrap().replace_colors(blurred);

        // Update the outputs from the blurred raster.
        state.increment_step();
        for output in outputs {
            output.clear();
        }
        let raster = state.raster.read().unwrap();
        let sppx = state.samples_per_pixel_x();
        let sppy = state.samples_per_pixel_y();
        for iy in 0..state.pixel_height() {
            for ix in 0..state.pixel_width() {
                let color = if state.samples_per_pixel() == 1 {
                    raster.color(ix, iy)
                } else {
                    raster.convolute_color(
                        (ix * sppx) as isize,
                        (iy * sppy) as isize,
                        &state.pixel_averaging_matrix,
                        None,
                    )
                };
                paint_pixel_at_outputs(ix, iy, color, outputs);
            }
            self.fire_progress(
                state,
                (iy + 1) as f64 / state.pixel_height() as f64,
                STEP_LABEL_DEPTH_BLUR_RENDER,
            );
        }
    }

    fn fire_progress(&self, state: &RenderState, step_progress: f64, step_label: &str) {
        let step_index = state.current_step.load(Ordering::Relaxed);
        for tracker in &self.progress_trackers {
            tracker.rendering_progress_update(
                state.total_steps,
                step_index,
                step_progress,
                step_label,
            );
        }
    }
}

impl Default for RaytraceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn paint_pixel_at_outputs(ix: usize, iy: usize, color: Color, outputs: &[&dyn RenderTarget]) {
    for output in outputs {
        output.paint_pixel(ix, iy, color);
    }
}

/// Shared state of one render pass.
struct RenderState<'a> {
    options: &'a RenderOptions,
    view_plane_bounds: Rect2,
    view_plane_z: f64,
    /// The (possibly supersampled) raster; workers merge one scanline's
    /// sample rows at a time under the write lock.
    raster: RwLock<ColorDepthBuffer>,
    pixel_averaging_matrix: ConvolutionMatrix,
    current_step: AtomicUsize,
    total_steps: usize,
    /// The only cross-thread mutable state during rastering: the next
    /// unclaimed scanline.
    next_line: AtomicUsize,
}

impl<'a> RenderState<'a> {
    fn new(scene: &Scene, options: &'a RenderOptions) -> Self {
        let view_volume = scene.camera().view_volume();
        let sppx = options.sampling_mode.samples_per_pixel_x();
        let sppy = options.sampling_mode.samples_per_pixel_y();
        let raster = ColorDepthBuffer::new(
            options.render_width * sppx,
            options.render_height * sppy,
            options.scene_background_color,
        );
        let total_steps = if options.depth_blur_enabled && scene.depth_blur_parameters().is_some() {
            4
        } else {
            2
        };
        Self {
            options,
            view_plane_bounds: *view_volume.view_plane_rect(),
            view_plane_z: view_volume.view_plane_z(),
            raster: RwLock::new(raster),
            pixel_averaging_matrix: ConvolutionMatrix::scaled_gaussian_blur(
                sppy,
                sppx,
                PIXEL_AVERAGING_SCALE,
            ),
            current_step: AtomicUsize::new(0),
            total_steps,
            next_line: AtomicUsize::new(0),
        }
    }

    fn pixel_width(&self) -> usize {
        self.options.render_width
    }

    fn pixel_height(&self) -> usize {
        self.options.render_height
    }

    fn samples_per_pixel_x(&self) -> usize {
        self.options.sampling_mode.samples_per_pixel_x()
    }

    fn samples_per_pixel_y(&self) -> usize {
        self.options.sampling_mode.samples_per_pixel_y()
    }

    fn samples_per_pixel(&self) -> usize {
        self.options.sampling_mode.samples_per_pixel()
    }

    fn should_apply_depth_blur(&self, scene: &Scene) -> bool {
        self.options.depth_blur_enabled && scene.depth_blur_parameters().is_some()
    }

    fn increment_step(&self) {
        self.current_step.fetch_add(1, Ordering::Relaxed);
    }

    /// Claim the next unrendered scanline, if any.
    fn next_render_line(&self) -> Option<usize> {
        let line = self.next_line.fetch_add(1, Ordering::Relaxed);
        (line < self.pixel_height()).then_some(line)
    }

    fn raster_render_progress(&self) -> f64 {
        let claimed = self.next_line.load(Ordering::Relaxed);
        (claimed as f64 / self.pixel_height() as f64).min(1.0)
    }
}

/// One raster worker: claims scanlines from the shared counter and renders
/// them sample by sample into a worker-local row block, merged into the
/// shared raster once per scanline. Owns its reusable object pack; nothing
/// in it is shared with other workers.
struct RenderRasterWorker<'w, 'a> {
    renderer: &'w RaytraceRenderer,
    state: &'w RenderState<'a>,
    ctx: RenderContext<'w>,
    view_plane_index: &'w ViewPlaneIndex<'w>,
    outputs: &'w [&'w dyn RenderTarget],
    pack: ReusableObjectPack,
    intersections: Vec<SurfacePoint>,
    colors: Vec<Color>,
    /// One scanline's sample rows.
    block: ColorDepthBuffer,
}

impl<'w, 'a> RenderRasterWorker<'w, 'a> {
    fn new(
        renderer: &'w RaytraceRenderer,
        state: &'w RenderState<'a>,
        ctx: RenderContext<'w>,
        view_plane_index: &'w ViewPlaneIndex<'w>,
        outputs: &'w [&'w dyn RenderTarget],
    ) -> Self {
        let block = ColorDepthBuffer::new(
            state.pixel_width() * state.samples_per_pixel_x(),
            state.samples_per_pixel_y(),
            state.options.scene_background_color,
        );
        Self {
            renderer,
            state,
            ctx,
            view_plane_index,
            outputs,
            pack: ReusableObjectPack::new(),
            intersections: Vec::new(),
            colors: Vec::new(),
            block,
        }
    }

    fn run(mut self) {
        while let Some(iy) = self.state.next_render_line() {
            self.render_line(iy);
            self.renderer.fire_progress(
                self.state,
                self.state.raster_render_progress(),
                STEP_LABEL_RAYTRACE,
            );
        }
    }

    fn render_line(&mut self, iy: usize) {
        let state = self.state;
        let pw = state.pixel_width();
        let ph = state.pixel_height();
        let bounds = state.view_plane_bounds;
        // Scanline 0 is the top of the image, which is the top of the view
        // plane rectangle.
        let py = bounds.y1() + (ph as f64 - iy as f64 - 0.5) / ph as f64 * bounds.height();
        self.block.fill(state.options.scene_background_color);
        for ix in 0..pw {
            let px = bounds.x1() + (ix as f64 + 0.5) / pw as f64 * bounds.width();
            if state.samples_per_pixel() == 1 {
                self.render_pixel_without_supersampling(ix, iy, px, py);
            } else {
                self.render_pixel_by_supersampling(ix, iy, px, py);
            }
        }
        state
            .raster
            .write()
            .unwrap()
            .blit_rows(&self.block, iy * state.samples_per_pixel_y());
    }

    fn render_pixel_without_supersampling(&mut self, ix: usize, iy: usize, px: f64, py: f64) {
        self.render_sample(ix, iy, px, py, ix, 0);
        let color = self.block.color(ix, 0);
        paint_pixel_at_outputs(ix, iy, color, self.outputs);
    }

    fn render_pixel_by_supersampling(&mut self, ix: usize, iy: usize, px: f64, py: f64) {
        let state = self.state;
        let sppx = state.samples_per_pixel_x();
        let sppy = state.samples_per_pixel_y();
        let pixel_view_width = state.view_plane_bounds.width() / state.pixel_width() as f64;
        let pixel_view_height = state.view_plane_bounds.height() / state.pixel_height() as f64;
        let sx0 = px - pixel_view_width / 2.0;
        let sy0 = py + pixel_view_height / 2.0;
        for si in 0..sppy {
            let sy = sy0 - (si as f64 + 0.5) / sppy as f64 * pixel_view_height;
            for sj in 0..sppx {
                let sx = sx0 + (sj as f64 + 0.5) / sppx as f64 * pixel_view_width;
                self.render_sample(ix, iy, sx, sy, ix * sppx + sj, si);
            }
        }
        let color = self.block.convolute_color(
            (ix * sppx) as isize,
            0,
            &state.pixel_averaging_matrix,
            None,
        );
        paint_pixel_at_outputs(ix, iy, color, self.outputs);
    }

    /// Cast one eye ray and resolve the sample at block position
    /// (`bx`, `by`).
    fn render_sample(&mut self, ix: usize, iy: usize, px: f64, py: f64, bx: usize, by: usize) {
        let ctx = self.ctx;
        let point_on_view_plane = Point3::new(px, py, self.state.view_plane_z);
        ctx.metrics.increment_eye_rays();
        // The camera sits at the origin: the eye ray passes through the
        // view-plane point and extends indefinitely behind it.
        let ray = Segment3::half_open(
            point_on_view_plane,
            Point3::new(px * 2.0, py * 2.0, self.state.view_plane_z * 2.0),
        );
        self.intersections.clear();
        ctx.metrics.increment_point_locations();
        let view_plane_index = self.view_plane_index;
        for object in
            view_plane_index.view_plane_objects(&point_on_view_plane, &mut self.pack.index)
        {
            ctx.metrics.increment_object_intersection_tests();
            if let Some(raytraceable) = object.as_raytraceable() {
                let before = self.intersections.len();
                raytraceable.intersect_with_eye_ray(
                    &ray,
                    &ctx,
                    &mut self.intersections,
                    &mut self.pack,
                );
                for sp in &mut self.intersections[before..] {
                    sp.object.get_or_insert_with(|| object.clone());
                }
            }
        }
        self.merge_backdrop(ix, iy, &point_on_view_plane);
        if !self.intersections.is_empty() {
            self.sort_intersections_by_depth();
            let nearest_depth = self.intersections[0].depth();
            let color = self.combined_color(nearest_depth);
            self.block.set_color_and_depth(bx, by, color, nearest_depth);
        }
    }

    /// Merge the backdrop's pre-rendered color and depth at this pixel, but
    /// only when it lies at or beyond the view plane.
    fn merge_backdrop(&mut self, ix: usize, iy: usize, point_on_view_plane: &Point3) {
        if !self.ctx.options.backdrop_enabled {
            return;
        }
        let Some(backdrop) = self.ctx.scene.backdrop() else {
            return;
        };
        if ix >= backdrop.width() || iy >= backdrop.height() {
            return;
        }
        let color = backdrop.color(ix, iy);
        let depth = backdrop.depth(ix, iy);
        let z = -depth;
        let zf = z / point_on_view_plane.z;
        if zf >= 1.0 {
            let x = point_on_view_plane.x * zf;
            let y = point_on_view_plane.y * zf;
            self.intersections
                .push(SurfacePoint::new(Point3::new(x, y, z), color));
        }
    }

    fn sort_intersections_by_depth(&mut self) {
        if self.intersections.len() > 1 {
            self.intersections
                .sort_by_key(|sp| OrderedFloat(sp.depth()));
        }
    }

    /// The sample color: a single hit keeps its color, multiple hits are
    /// combined front to back by transparency, and depth darkness is applied
    /// on top.
    fn combined_color(&mut self, nearest_depth: f64) -> Color {
        let color = if self.intersections.len() == 1 {
            self.intersections[0].color
        } else {
            self.colors.clear();
            self.colors.extend(self.intersections.iter().map(|sp| sp.color));
            Color::combine_by_transparency(&self.colors)
        };
        self.apply_darkness_by_depth(color, nearest_depth)
    }

    fn apply_darkness_by_depth(&self, color: Color, depth: f64) -> Color {
        if self.ctx.options.depth_darkness_enabled {
            if let Some(function) = self.ctx.scene.darkness_depth_function() {
                let darkness = function.eval(depth).clamp(0.0, 1.0);
                return color.adjust_brightness(-(darkness as f32));
            }
        }
        color
    }
}

/// Routes blur progress into the renderer's progress observers.
struct BlurProgress<'w, 'a> {
    renderer: &'w RaytraceRenderer,
    state: &'w RenderState<'a>,
}

impl DepthBlurProgressTracker for BlurProgress<'_, '_> {
    fn operation_update(&mut self, progress: f64) {
        self.renderer
            .fire_progress(self.state, progress, STEP_LABEL_DEPTH_BLUR_COMPUTE);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
