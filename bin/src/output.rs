//! Output targets and progress display

use image::{Rgba, RgbaImage};
use indicatif::{ProgressBar, ProgressStyle};
use lucent3d_core::color::Color;
use lucent3d_core::progress::ProgressTracker;
use lucent3d_core::target::RenderTarget;
use std::sync::Mutex;

/// A render target backed by an in-memory image, written out as PNG.
pub struct PngTarget {
    image: Mutex<RgbaImage>,
}

impl PngTarget {
    /// Create a new `PngTarget`.
    ///
    /// * `width`  - Image width in pixels.
    /// * `height` - Image height in pixels.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            image: Mutex::new(RgbaImage::new(width as u32, height as u32)),
        }
    }

    /// Write the image to a file; the format follows the file extension.
    ///
    /// * `path` - The output path.
    pub fn save(&self, path: &str) -> image::ImageResult<()> {
        self.image.lock().unwrap().save(path)
    }
}

impl RenderTarget for PngTarget {
    fn clear(&self) {
        let mut image = self.image.lock().unwrap();
        for pixel in image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn paint_pixel(&self, x: usize, y: usize, color: Color) {
        let mut image = self.image.lock().unwrap();
        if x < image.width() as usize && y < image.height() as usize {
            image.put_pixel(x as u32, y as u32, Rgba(color.to_rgba8()));
        }
    }
}

/// Renders rendering progress as a console progress bar.
pub struct ConsoleProgressBar {
    bar: ProgressBar,
}

/// Progress bar resolution per render pass.
const PROGRESS_UNITS: u64 = 1000;

impl ConsoleProgressBar {
    pub fn new() -> Self {
        let bar = ProgressBar::new(PROGRESS_UNITS);
        bar.set_style(
            ProgressStyle::with_template("[{bar:40}] {percent:>3}% {msg}")
                .expect("valid progress bar template")
                .progress_chars("=> "),
        );
        Self { bar }
    }
}

impl ProgressTracker for ConsoleProgressBar {
    fn rendering_started(&self) {
        self.bar.set_position(0);
    }

    fn rendering_progress_update(
        &self,
        total_steps: usize,
        step_index: usize,
        step_progress: f64,
        step_label: &str,
    ) {
        let overall = (step_index as f64 + step_progress) / total_steps as f64;
        self.bar
            .set_position((overall * PROGRESS_UNITS as f64) as u64);
        self.bar
            .set_message(format!("{step_label} ({}/{total_steps})", step_index + 1));
    }

    fn rendering_completed(&self) {
        self.bar.finish_with_message("Render complete");
    }
}

impl Default for ConsoleProgressBar {
    fn default() -> Self {
        Self::new()
    }
}
