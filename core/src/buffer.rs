//! Color + depth raster buffer

use crate::color::Color;
use crate::convolution::{ConvolutionMask, ConvolutionMatrix};

/// A raster of colors with an associated depth layer.
///
/// Depth is measured along the negative Z axis; a depth of zero (or less)
/// marks a pixel no geometry was resolved for (background).
#[derive(Clone)]
pub struct ColorDepthBuffer {
    width: usize,
    height: usize,
    colors: Vec<Color>,
    depths: Vec<f64>,
}

impl ColorDepthBuffer {
    /// Create a buffer filled with an ambient color and zero depth.
    ///
    /// * `width`   - Width in pixels.
    /// * `height`  - Height in pixels.
    /// * `ambient` - The fill color.
    pub fn new(width: usize, height: usize, ambient: Color) -> Self {
        Self {
            width,
            height,
            colors: vec![ambient; width * height],
            depths: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn offset(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    pub fn color(&self, x: usize, y: usize) -> Color {
        self.colors[self.offset(x, y)]
    }

    pub fn depth(&self, x: usize, y: usize) -> f64 {
        self.depths[self.offset(x, y)]
    }

    pub fn set_color(&mut self, x: usize, y: usize, color: Color) {
        let i = self.offset(x, y);
        self.colors[i] = color;
    }

    pub fn set_depth(&mut self, x: usize, y: usize, depth: f64) {
        let i = self.offset(x, y);
        self.depths[i] = depth;
    }

    pub fn set_color_and_depth(&mut self, x: usize, y: usize, color: Color, depth: f64) {
        let i = self.offset(x, y);
        self.colors[i] = color;
        self.depths[i] = depth;
    }

    /// The smallest positive depth in the buffer, or `None` when no pixel has
    /// resolved geometry.
    pub fn minimum_depth(&self) -> Option<f64> {
        self.depths
            .iter()
            .copied()
            .filter(|d| *d > 0.0)
            .fold(None, |acc, d| Some(acc.map_or(d, |m: f64| m.min(d))))
    }

    /// The largest positive depth in the buffer, or `None` when no pixel has
    /// resolved geometry.
    pub fn maximum_depth(&self) -> Option<f64> {
        self.depths
            .iter()
            .copied()
            .filter(|d| *d > 0.0)
            .fold(None, |acc, d| Some(acc.map_or(d, |m: f64| m.max(d))))
    }

    /// Convolve the colors under a kernel anchored with its top-left cell at
    /// (`x0`, `y0`), which may reach outside the buffer. Cells outside the
    /// buffer or excluded by `mask` do not contribute; the remaining weights
    /// are renormalized. Returns the anchor pixel's color when every cell is
    /// excluded.
    ///
    /// * `x0`, `y0` - Anchor of the kernel's top-left cell.
    /// * `matrix`   - The kernel.
    /// * `mask`     - Optional cell exclusion.
    pub fn convolute_color(
        &self,
        x0: isize,
        y0: isize,
        matrix: &ConvolutionMatrix,
        mask: Option<&dyn ConvolutionMask>,
    ) -> Color {
        let mut r = 0.0f64;
        let mut g = 0.0f64;
        let mut b = 0.0f64;
        let mut a = 0.0f64;
        let mut weight_sum = 0.0f64;
        for row in 0..matrix.rows() {
            let y = y0 + row as isize;
            if y < 0 || y >= self.height as isize {
                continue;
            }
            for col in 0..matrix.cols() {
                let x = x0 + col as isize;
                if x < 0 || x >= self.width as isize {
                    continue;
                }
                if mask.is_some_and(|m| m.is_masked(row, col)) {
                    continue;
                }
                let w = matrix.weight(row, col);
                let color = self.color(x as usize, y as usize);
                r += w * color.r as f64;
                g += w * color.g as f64;
                b += w * color.b as f64;
                a += w * color.a as f64;
                weight_sum += w;
            }
        }
        if weight_sum > 0.0 {
            Color::with_alpha(
                (r / weight_sum) as f32,
                (g / weight_sum) as f32,
                (b / weight_sum) as f32,
                (a / weight_sum) as f32,
            )
        } else {
            let x = x0.clamp(0, self.width as isize - 1) as usize;
            let y = y0.clamp(0, self.height as isize - 1) as usize;
            self.color(x, y)
        }
    }

    /// Reset every pixel to the given color and zero depth.
    ///
    /// * `ambient` - The fill color.
    pub fn fill(&mut self, ambient: Color) {
        self.colors.fill(ambient);
        self.depths.fill(0.0);
    }

    /// Copy all rows of `src` into this buffer starting at row `y0`. The
    /// source must have the same width and fit below `y0`.
    ///
    /// * `src` - The source buffer.
    /// * `y0`  - The destination start row.
    pub fn blit_rows(&mut self, src: &ColorDepthBuffer, y0: usize) {
        debug_assert_eq!(src.width, self.width);
        debug_assert!(y0 + src.height <= self.height);
        let start = y0 * self.width;
        let len = src.colors.len();
        self.colors[start..start + len].copy_from_slice(&src.colors);
        self.depths[start..start + len].copy_from_slice(&src.depths);
    }

    /// Replace the full color layer, keeping depths.
    ///
    /// * `colors` - The new colors, one per pixel.
    pub fn replace_colors(&mut self, colors: Vec<Color>) {
        debug_assert_eq!(colors.len(), self.colors.len());
        self.colors = colors;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn depth_range_ignores_background() {
        let mut buffer = ColorDepthBuffer::new(4, 4, Color::WHITE);
        assert!(buffer.minimum_depth().is_none());
        buffer.set_color_and_depth(0, 0, Color::BLACK, 3.0);
        buffer.set_color_and_depth(1, 0, Color::BLACK, 7.0);
        assert_eq!(buffer.minimum_depth(), Some(3.0));
        assert_eq!(buffer.maximum_depth(), Some(7.0));
    }

    #[test]
    fn convolution_of_uniform_region_is_identity() {
        let buffer = ColorDepthBuffer::new(8, 8, Color::new(0.25, 0.5, 0.75));
        let matrix = ConvolutionMatrix::gaussian_blur(3, 2.0);
        let color = buffer.convolute_color(2, 2, &matrix, None);
        assert_eq!(color.to_rgba8(), Color::new(0.25, 0.5, 0.75).to_rgba8());
    }

    #[test]
    fn convolution_clips_at_the_border() {
        let mut buffer = ColorDepthBuffer::new(2, 2, Color::BLACK);
        buffer.set_color(0, 0, Color::WHITE);
        let matrix = ConvolutionMatrix::gaussian_blur(3, 2.0);
        // Anchor reaching outside: only in-bounds pixels contribute.
        let color = buffer.convolute_color(-1, -1, &matrix, None);
        assert!(color.r > 0.0 && color.r < 1.0);
    }

    #[test]
    fn masked_cells_are_renormalized_away() {
        struct MaskAllButCenter;
        impl ConvolutionMask for MaskAllButCenter {
            fn is_masked(&self, row: usize, col: usize) -> bool {
                (row, col) != (1, 1)
            }
        }
        let mut buffer = ColorDepthBuffer::new(3, 3, Color::BLACK);
        buffer.set_color(1, 1, Color::new(0.5, 0.5, 0.5));
        let matrix = ConvolutionMatrix::gaussian_blur(3, 2.0);
        let color = buffer.convolute_color(0, 0, &matrix, Some(&MaskAllButCenter));
        assert!(approx_eq!(f32, color.r, 0.5, epsilon = 1e-6));
    }

    #[test]
    fn blit_rows_copies_colors_and_depths() {
        let mut dst = ColorDepthBuffer::new(2, 4, Color::BLACK);
        let mut src = ColorDepthBuffer::new(2, 2, Color::WHITE);
        src.set_color_and_depth(0, 0, Color::new(1.0, 0.0, 0.0), 2.5);
        dst.blit_rows(&src, 2);
        assert_eq!(dst.color(0, 2), Color::new(1.0, 0.0, 0.0));
        assert_eq!(dst.depth(0, 2), 2.5);
        assert_eq!(dst.color(0, 0), Color::BLACK);
    }
}
