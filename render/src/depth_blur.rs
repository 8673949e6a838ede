//! Depth blur post-process

use lucent3d_core::buffer::ColorDepthBuffer;
use lucent3d_core::color::Color;
use lucent3d_core::convolution::{ConvolutionMask, ConvolutionMatrix};
use lucent3d_core::depth::{DepthBlurParameters, DepthFunction, SigmoidDepthFunction};
use std::collections::HashMap;

/// Falloff control of the Gaussian matrices used for blurring.
const BLUR_MATRIX_SCALE: f64 = 4.0;

/// Observer of a depth-blur operation's progress.
pub trait DepthBlurProgressTracker {
    fn operation_started(&mut self) {}

    /// Fractional progress of the operation, in `[0, 1]`.
    ///
    /// * `progress` - The progress.
    fn operation_update(&mut self, progress: f64);

    fn operation_completed(&mut self) {}
}

/// Blurs an image according to its depth layer: the further a pixel, the
/// larger the Gaussian kernel it is convolved with, simulating camera focus
/// falloff. Pixels without resolved geometry (non-positive depth) are left
/// unmodified, and convolution neighbors whose depth differs too much from
/// the center pixel are masked out to keep edges between near and far
/// surfaces sharp.
pub struct DepthBlurOperation<'b> {
    buffer: &'b ColorDepthBuffer,
    blur_function: Box<dyn DepthFunction>,
    max_blur_radius: usize,
    max_depth_similarity: f64,
    // Blur matrices cached per radius.
    blur_matrices: HashMap<usize, ConvolutionMatrix>,
}

impl<'b> DepthBlurOperation<'b> {
    /// Blur an image buffer according to its depth layer and a set of blur
    /// parameters, returning the new color layer. The blur function is a
    /// sigmoid calibrated so blur is 0 at the buffer's minimum depth and 1
    /// at its maximum.
    ///
    /// * `buffer`  - The image buffer holding a depth layer.
    /// * `params`  - Parameters controlling the blur.
    /// * `tracker` - Progress observer, or `None`.
    pub fn blur_image_by_depth(
        buffer: &ColorDepthBuffer,
        params: &DepthBlurParameters,
        tracker: Option<&mut dyn DepthBlurProgressTracker>,
    ) -> Vec<Color> {
        let (Some(min_depth), Some(max_depth)) = (buffer.minimum_depth(), buffer.maximum_depth())
        else {
            // Nothing was resolved; there is no depth range to blur over.
            return unmodified_colors(buffer);
        };
        if max_depth <= min_depth {
            return unmodified_colors(buffer);
        }
        let blur_function = SigmoidDepthFunction::create_filter(
            min_depth,
            max_depth,
            params.relative_inflection_depth,
            params.smoothness,
        );
        let max_depth_similarity = params.max_relative_depth_similarity * (max_depth - min_depth);
        DepthBlurOperation {
            buffer,
            blur_function: Box::new(blur_function),
            max_blur_radius: params.max_blur_pixel_radius.round() as usize,
            max_depth_similarity,
            blur_matrices: HashMap::new(),
        }
        .apply(tracker)
    }

    /// The blur radius, in pixels, for a given depth.
    ///
    /// * `depth` - The depth.
    fn blur_radius(&self, depth: f64) -> usize {
        let blur = self.blur_function.eval(depth);
        (blur * self.max_blur_radius as f64).floor() as usize
    }

    fn apply(&mut self, mut tracker: Option<&mut dyn DepthBlurProgressTracker>) -> Vec<Color> {
        let width = self.buffer.width();
        let height = self.buffer.height();
        let mut colors = unmodified_colors(self.buffer);
        if let Some(t) = tracker.as_deref_mut() {
            t.operation_started();
        }
        for y in 0..height {
            for x in 0..width {
                let depth = self.buffer.depth(x, y);
                if depth > 0.0 {
                    let blur_radius = self.blur_radius(depth);
                    if blur_radius > 0 {
                        let matrix = self.blur_matrices.entry(blur_radius).or_insert_with(|| {
                            let dim = 1 + 2 * blur_radius;
                            ConvolutionMatrix::gaussian_blur(dim, BLUR_MATRIX_SCALE)
                        });
                        let mask = NeighboringDepthSelector {
                            buffer: self.buffer,
                            center_x: x as isize,
                            center_y: y as isize,
                            center_depth: depth,
                            blur_radius: blur_radius as isize,
                            max_depth_similarity: self.max_depth_similarity,
                        };
                        colors[y * width + x] = self.buffer.convolute_color(
                            x as isize - blur_radius as isize,
                            y as isize - blur_radius as isize,
                            matrix,
                            Some(&mask),
                        );
                    }
                }
            }
            if let Some(t) = tracker.as_deref_mut() {
                t.operation_update((y + 1) as f64 / height as f64);
            }
        }
        if let Some(t) = tracker {
            t.operation_completed();
        }
        colors
    }

}

fn unmodified_colors(buffer: &ColorDepthBuffer) -> Vec<Color> {
    let mut colors = Vec::with_capacity(buffer.width() * buffer.height());
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            colors.push(buffer.color(x, y));
        }
    }
    colors
}

/// Convolution mask admitting only neighbors on (approximately) the same
/// surface as the center pixel. Background neighbors are admitted: surfaces
/// blur into the ambient background.
struct NeighboringDepthSelector<'b> {
    buffer: &'b ColorDepthBuffer,
    center_x: isize,
    center_y: isize,
    center_depth: f64,
    blur_radius: isize,
    max_depth_similarity: f64,
}

impl ConvolutionMask for NeighboringDepthSelector<'_> {
    fn is_masked(&self, row: usize, col: usize) -> bool {
        let yi = self.center_y - self.blur_radius + row as isize;
        let xi = self.center_x - self.blur_radius + col as isize;
        if yi < 0
            || yi >= self.buffer.height() as isize
            || xi < 0
            || xi >= self.buffer.width() as isize
        {
            return false;
        }
        let di = self.buffer.depth(xi as usize, yi as usize);
        if di <= 0.0 {
            // Blur with the ambient background.
            false
        } else {
            (self.center_depth - di).abs() > self.max_depth_similarity
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with_depths(depths: &[(usize, usize, f64)]) -> ColorDepthBuffer {
        let mut buffer = ColorDepthBuffer::new(16, 16, Color::WHITE);
        for &(x, y, depth) in depths {
            buffer.set_color_and_depth(x, y, Color::new(0.2, 0.4, 0.6), depth);
        }
        buffer
    }

    fn operation_for(buffer: &ColorDepthBuffer) -> DepthBlurOperation<'_> {
        let params = DepthBlurParameters::new(0.3, 1.0);
        let blur_function = SigmoidDepthFunction::create_filter(
            buffer.minimum_depth().unwrap(),
            buffer.maximum_depth().unwrap(),
            params.relative_inflection_depth,
            params.smoothness,
        );
        DepthBlurOperation {
            buffer,
            blur_function: Box::new(blur_function),
            max_blur_radius: params.max_blur_pixel_radius.round() as usize,
            max_depth_similarity: params.max_relative_depth_similarity
                * (buffer.maximum_depth().unwrap() - buffer.minimum_depth().unwrap()),
            blur_matrices: HashMap::new(),
        }
    }

    #[test]
    fn blur_radius_grows_monotonically_with_depth() {
        let buffer = buffer_with_depths(&[(0, 0, 1.0), (1, 0, 40.0)]);
        let op = operation_for(&buffer);
        let mut previous = 0;
        for depth in [1.0, 5.0, 10.0, 20.0, 30.0, 40.0] {
            let radius = op.blur_radius(depth);
            assert!(radius >= previous, "radius must not shrink with depth");
            previous = radius;
        }
        assert!(previous > 0, "the farthest depth must blur");
        assert!(previous <= 5);
    }

    #[test]
    fn background_pixels_are_left_unmodified() {
        let buffer = buffer_with_depths(&[(4, 4, 2.0), (5, 4, 30.0)]);
        let params = DepthBlurParameters::new(0.3, 1.0);
        let colors = DepthBlurOperation::blur_image_by_depth(&buffer, &params, None);
        // A pixel with zero depth keeps its exact color.
        assert_eq!(colors[0], Color::WHITE);
        assert_eq!(colors[10 * 16 + 10], Color::WHITE);
    }

    #[test]
    fn far_pixels_bleed_into_their_surroundings() {
        // A far pixel in a white background field: after blurring it blends
        // with the background.
        let buffer = buffer_with_depths(&[(8, 8, 30.0), (0, 0, 1.0)]);
        let params = DepthBlurParameters::new(0.1, 1.0);
        let colors = DepthBlurOperation::blur_image_by_depth(&buffer, &params, None);
        let blurred = colors[8 * 16 + 8];
        let original = Color::new(0.2, 0.4, 0.6);
        assert_ne!(blurred.to_rgba8(), original.to_rgba8());
        assert!(blurred.r > original.r, "white bleeds in");
    }

    #[test]
    fn depth_dissimilar_neighbors_are_masked_out() {
        // A near pixel adjacent to a far pixel: the near one has radius 0
        // (no blur), and blurring the far one must not pull in the near
        // pixel's color.
        let mut buffer = ColorDepthBuffer::new(16, 16, Color::WHITE);
        for y in 0..16 {
            for x in 0..16 {
                buffer.set_color_and_depth(x, y, Color::new(0.5, 0.5, 0.5), 30.0);
            }
        }
        buffer.set_color_and_depth(8, 8, Color::new(1.0, 0.0, 0.0), 1.0);
        let params = DepthBlurParameters::new(0.1, 1.0);
        let colors = DepthBlurOperation::blur_image_by_depth(&buffer, &params, None);
        // The near red pixel itself: radius 0, untouched.
        assert_eq!(colors[8 * 16 + 8], Color::new(1.0, 0.0, 0.0));
        // A far neighbor: blurred among equals, the red neighbor masked out.
        let neighbor = colors[8 * 16 + 9];
        assert_eq!(neighbor.to_rgba8(), Color::new(0.5, 0.5, 0.5).to_rgba8());
        // Progress reporting covers the full operation.
        struct Track(Vec<f64>);
        impl DepthBlurProgressTracker for Track {
            fn operation_update(&mut self, progress: f64) {
                self.0.push(progress);
            }
        }
        let mut track = Track(Vec::new());
        DepthBlurOperation::blur_image_by_depth(&buffer, &params, Some(&mut track));
        assert_eq!(track.0.len(), 16);
        assert_eq!(track.0.last().copied(), Some(1.0));
    }
}
