//! Image textures for albedo lookups.
//!
//! Pixels are stored as linear RGB. Images loaded from disk are assumed to be
//! encoded with the same 2.2 display gamma the film writes out.

use crate::error::RenderResult;
use crate::film::DISPLAY_GAMMA;
use halo_math::{Color, Vec2};
use std::path::Path;

/// A texture with linear RGB pixel data.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Row-major pixels, top row first
    pub pixels: Vec<Color>,
}

impl Texture {
    /// Create a texture from raw pixel data.
    ///
    /// Missing pixels read back as black.
    pub fn new(width: u32, height: u32, pixels: Vec<Color>) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixels,
        }
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: Color) -> Self {
        Self::new(1, 1, vec![color])
    }

    /// Procedural checkerboard with `squares` cells along each side.
    pub fn checker(resolution: u32, squares: u32, even: Color, odd: Color) -> Self {
        let resolution = resolution.max(1);
        let cell = (resolution / squares.max(1)).max(1);
        let pixels = (0..resolution * resolution)
            .map(|i| {
                let (x, y) = (i % resolution, i / resolution);
                if (x / cell + y / cell) % 2 == 0 {
                    even
                } else {
                    odd
                }
            })
            .collect();
        Self::new(resolution, resolution, pixels)
    }

    /// Load an image from disk and convert it to linear RGB.
    pub fn load<P: AsRef<Path>>(path: P) -> RenderResult<Self> {
        let path = path.as_ref();
        let img = image::open(path)?.into_rgb32f();
        let (width, height) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| {
                Color::new(
                    p[0].max(0.0).powf(DISPLAY_GAMMA),
                    p[1].max(0.0).powf(DISPLAY_GAMMA),
                    p[2].max(0.0).powf(DISPLAY_GAMMA),
                )
            })
            .collect();

        log::debug!("Loaded texture {} ({}x{})", path.display(), width, height);
        Ok(Self::new(width, height, pixels))
    }

    /// Sample the texture at UV coordinates (bilinear filtering).
    ///
    /// UV coordinates wrap, with (0, 0) at the bottom-left.
    pub fn sample(&self, uv: Vec2) -> Color {
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);

        let x = u * (self.width as f32 - 1.0);
        let y = (1.0 - v) * (self.height as f32 - 1.0);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x.fract();
        let fy = y.fract();

        let top = self.get_pixel(x0, y0).lerp(self.get_pixel(x1, y0), fx);
        let bottom = self.get_pixel(x0, y1).lerp(self.get_pixel(x1, y1), fx);
        top.lerp(bottom, fy)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Color {
        let idx = (y * self.width + x) as usize;
        self.pixels.get(idx).copied().unwrap_or(Color::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_sample() {
        let tex = Texture::solid_color(Color::new(0.2, 0.4, 0.6));
        let c = tex.sample(Vec2::new(0.73, 0.12));
        assert!((c - Color::new(0.2, 0.4, 0.6)).length() < 1e-6);
    }

    #[test]
    fn test_checker_alternates() {
        let tex = Texture::checker(64, 2, Color::ONE, Color::ZERO);
        // Top-left cell is even, top-right is odd.
        assert_eq!(tex.get_pixel(0, 0), Color::ONE);
        assert_eq!(tex.get_pixel(63, 0), Color::ZERO);
        assert_eq!(tex.get_pixel(63, 63), Color::ONE);
    }

    #[test]
    fn test_sample_wraps_uv() {
        let tex = Texture::checker(8, 2, Color::ONE, Color::ZERO);
        let a = tex.sample(Vec2::new(0.1, 0.9));
        let b = tex.sample(Vec2::new(1.1, -0.1));
        assert!((a - b).length() < 1e-5);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(Texture::load("/definitely/not/here.png").is_err());
    }
}
