//! Colors

/// An RGBA color with components in `[0, 1]`. The alpha channel encodes
/// opacity: `a = 1` is fully opaque, `a = 0` fully transparent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::with_alpha(0.0, 0.0, 0.0, 0.0);

    /// Create a fully opaque color.
    ///
    /// * `r`, `g`, `b` - Components in `[0, 1]`.
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color with an explicit alpha.
    ///
    /// * `r`, `g`, `b` - Components in `[0, 1]`.
    /// * `a`           - Opacity in `[0, 1]`.
    pub const fn with_alpha(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// The fraction of light passing through a surface of this color:
    /// 0 is opaque, 1 is fully transparent.
    pub fn transparency(&self) -> f64 {
        (1.0 - self.a) as f64
    }

    pub fn is_fully_opaque(&self) -> bool {
        self.a >= 1.0
    }

    /// Adjust brightness by `factor` in `[-1, 1]`: positive values move the
    /// color towards white, negative values towards black. Alpha is kept.
    ///
    /// * `factor` - The brightness adjustment.
    pub fn adjust_brightness(&self, factor: f32) -> Color {
        let f = factor.clamp(-1.0, 1.0);
        let adjust = |c: f32| {
            if f >= 0.0 {
                c + (1.0 - c) * f
            } else {
                c * (1.0 + f)
            }
        };
        Color::with_alpha(adjust(self.r), adjust(self.g), adjust(self.b), self.a)
    }

    /// Combine a front-to-back ordered run of colors by transparency, using
    /// standard front-to-back alpha accumulation.
    ///
    /// * `colors` - The colors, nearest first.
    pub fn combine_by_transparency(colors: &[Color]) -> Color {
        let mut r = 0.0f64;
        let mut g = 0.0f64;
        let mut b = 0.0f64;
        let mut a = 0.0f64;
        for color in colors {
            let w = (1.0 - a) * color.a as f64;
            r += w * color.r as f64;
            g += w * color.g as f64;
            b += w * color.b as f64;
            a += w;
            if a >= 1.0 {
                break;
            }
        }
        if a > 0.0 {
            Color::with_alpha(
                (r / a) as f32,
                (g / a) as f32,
                (b / a) as f32,
                a as f32,
            )
        } else {
            Color::TRANSPARENT
        }
    }

    /// Quantize to 8-bit RGBA.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
