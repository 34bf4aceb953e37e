//! Bucket-based tile scheduling.
//!
//! Divides the image into tiles (buckets) that rayon renders in parallel.
//! Pixels inside a bucket are also shaded in parallel, so an image smaller
//! than one bucket still spreads over the thread pool. Pixel values must not
//! depend on which thread renders them, so shaders get pixel coordinates and
//! derive their own random streams.

use crate::error::RenderResult;
use halo_math::Color;
use rayon::prelude::*;

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy)]
pub struct Bucket {
    /// X coordinate of bucket's first pixel
    pub x: u32,
    /// Y coordinate of bucket's first pixel
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Index of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    /// Get the total number of pixels in this bucket.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Default bucket size in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 32;

/// Generate buckets for an image, sorted from the center outward.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = bucket_size.max(1);
    let mut buckets = Vec::new();
    let mut index = 0;

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = bucket_size.min(width - x);
            let bh = bucket_size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, index));
            index += 1;
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, width, height);
    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }
    buckets
}

/// Sort buckets by distance from image center.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let distance = |b: &Bucket| {
        let cx = b.x as f32 + b.width as f32 / 2.0;
        let cy = b.y as f32 + b.height as f32 / 2.0;
        (cx - center_x).powi(2) + (cy - center_y).powi(2)
    };
    buckets.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}

/// Shade every pixel of one bucket, row-major within the bucket.
pub fn render_bucket<F>(bucket: &Bucket, shade: &F) -> RenderResult<Vec<Color>>
where
    F: Fn(u32, u32) -> RenderResult<Color> + Sync,
{
    (0..bucket.pixel_count())
        .into_par_iter()
        .map(|i| shade(bucket.x + i % bucket.width, bucket.y + i / bucket.width))
        .collect()
}

/// Shade a whole image in parallel and return its pixels row-major.
///
/// The first error from any bucket aborts the render.
pub fn render_buckets<F>(
    width: u32,
    height: u32,
    bucket_size: u32,
    shade: F,
) -> RenderResult<Vec<Color>>
where
    F: Fn(u32, u32) -> RenderResult<Color> + Sync,
{
    let buckets = generate_buckets(width, height, bucket_size);
    let results = buckets
        .par_iter()
        .map(|bucket| render_bucket(bucket, &shade).map(|pixels| (*bucket, pixels)))
        .collect::<RenderResult<Vec<_>>>()?;

    let mut image = vec![Color::ZERO; width as usize * height as usize];
    for (bucket, pixels) in results {
        for (i, color) in pixels.into_iter().enumerate() {
            let x = bucket.x + i as u32 % bucket.width;
            let y = bucket.y + i as u32 / bucket.width;
            image[y as usize * width as usize + x as usize] = color;
        }
    }
    Ok(image)
}
