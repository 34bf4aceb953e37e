//! Linear RGB output buffer.

use crate::error::RenderResult;
use halo_math::Color;
use std::path::Path;

/// Display gamma applied by [`Film::to_rgb8`].
pub const DISPLAY_GAMMA: f32 = 2.2;

/// Clamp to [0, 1], gamma-correct and quantize one channel.
#[inline]
pub fn encode_channel(linear: f32) -> u8 {
    let x = if linear.is_nan() {
        0.0
    } else {
        linear.clamp(0.0, 1.0)
    };
    (x.powf(1.0 / DISPLAY_GAMMA) * 255.0 + 0.5) as u8
}

/// A 2-D grid of linear radiance values.
///
/// Row 0 is the bottom of the image, matching the camera's y-up screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct Film {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Film {
    /// Create a new film filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    /// Wrap pixels stored row by row from the bottom.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let i = self.index(x, y);
        self.pixels[i] = color;
    }

    /// Mean radiance over the whole film.
    pub fn average(&self) -> Color {
        if self.pixels.is_empty() {
            return Color::ZERO;
        }
        self.pixels.iter().copied().sum::<Color>() / self.pixels.len() as f32
    }

    /// Root-mean-square difference to another film of the same size, over all
    /// channels. `None` when the sizes differ.
    pub fn rms_difference(&self, other: &Film) -> Option<f32> {
        if self.width != other.width || self.height != other.height {
            return None;
        }
        if self.pixels.is_empty() {
            return Some(0.0);
        }
        let sum: f32 = self
            .pixels
            .iter()
            .zip(&other.pixels)
            .map(|(a, b)| (*a - *b).length_squared())
            .sum();
        Some((sum / (3 * self.pixels.len()) as f32).sqrt())
    }

    /// Tone-mapped 8-bit image with the top row first.
    pub fn to_rgb8(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width, self.height, |x, row| {
            let c = self.get(x, self.height - 1 - row);
            image::Rgb([encode_channel(c.x), encode_channel(c.y), encode_channel(c.z)])
        })
    }

    /// Write the tone-mapped image. The format follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> RenderResult<()> {
        self.to_rgb8().save(path.as_ref())?;
        log::info!(
            "Saved {}x{} image to {}",
            self.width,
            self.height,
            path.as_ref().display()
        );
        Ok(())
    }
}
