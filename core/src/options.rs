//! Render options

use crate::color::Color;

/// The number of samples taken per output pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SamplingMode {
    /// One sample per pixel.
    Direct,
    /// A 2×2 supersampled grid per pixel.
    Super,
    /// A 3×3 supersampled grid per pixel.
    Ultra,
}

impl SamplingMode {
    pub fn samples_per_pixel_x(&self) -> usize {
        match self {
            SamplingMode::Direct => 1,
            SamplingMode::Super => 2,
            SamplingMode::Ultra => 3,
        }
    }

    pub fn samples_per_pixel_y(&self) -> usize {
        match self {
            SamplingMode::Direct => 1,
            SamplingMode::Super => 2,
            SamplingMode::Ultra => 3,
        }
    }

    pub fn samples_per_pixel(&self) -> usize {
        self.samples_per_pixel_x() * self.samples_per_pixel_y()
    }
}

/// Options recognized by the raytrace renderer.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Output width in pixels.
    pub render_width: usize,

    /// Output height in pixels.
    pub render_height: usize,

    /// Samples per output pixel.
    pub sampling_mode: SamplingMode,

    /// Cast shadow rays. When disabled a flat compensation factor replaces
    /// the shadow test.
    pub shadows_enabled: bool,

    /// Merge the scene's backdrop buffer behind the geometry.
    pub backdrop_enabled: bool,

    /// Run the depth-blur post-process.
    pub depth_blur_enabled: bool,

    /// Darken pixels by depth using the scene's darkness depth function.
    pub depth_darkness_enabled: bool,

    /// Requested number of render worker threads; clamped to the available
    /// hardware parallelism at render time.
    pub number_of_render_threads: usize,

    /// Background color for pixels no object projects onto.
    pub scene_background_color: Color,
}

impl RenderOptions {
    /// The effective worker thread count: the requested count clamped to
    /// `[1, available hardware parallelism]`.
    pub fn safe_number_of_render_threads(&self) -> usize {
        let cores = num_cpus::get();
        if self.number_of_render_threads > cores {
            warn!(
                "Requested {} render threads, clamping to {} logical CPUs",
                self.number_of_render_threads, cores
            );
        }
        self.number_of_render_threads.clamp(1, cores)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.render_width as f64 / self.render_height as f64
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            render_width: 1280,
            render_height: 720,
            sampling_mode: SamplingMode::Direct,
            shadows_enabled: false,
            backdrop_enabled: false,
            depth_blur_enabled: false,
            depth_darkness_enabled: false,
            number_of_render_threads: 1,
            scene_background_color: Color::WHITE,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
