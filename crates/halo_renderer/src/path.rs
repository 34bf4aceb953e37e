//! Unidirectional path tracing.
//!
//! Each camera ray is followed by a recursive random walk:
//!
//! - a miss returns the scene background
//! - a hit adds the surface emission and, on diffuse and glossy surfaces,
//!   explicit light from every [`Light`](crate::Light)
//! - the walk continues along a direction sampled from the material
//!
//! After `rr_depth` bounces Russian roulette terminates paths with probability
//! `1 - p`, `p` being the largest channel of the surface reflectance capped at
//! one, and the survivors are divided by `p` so the estimate stays unbiased.
//!
//! The film holds unclamped radiance. Tone mapping happens only when the film
//! is encoded, see [`Film::to_rgb8`].

use crate::bucket::{render_buckets, DEFAULT_BUCKET_SIZE};
use crate::config::RenderConfig;
use crate::error::RenderResult;
use crate::film::Film;
use crate::material::MaterialKind;
use crate::sampling::{gen_f32, task_rng, tent};
use crate::scene::{Scene, RAY_EPSILON};
use halo_math::{max_component, Color, Ray, Vec2};
use rand::RngCore;
use std::time::Instant;

/// Path tracing integrator over a validated scene.
pub struct PathTracer<'a> {
    scene: &'a Scene,
    config: RenderConfig,
}

impl<'a> PathTracer<'a> {
    /// Validate the configuration and the scene.
    pub fn new(scene: &'a Scene, config: &RenderConfig) -> RenderResult<Self> {
        config.validate()?;
        scene.validate()?;
        Ok(Self {
            scene,
            config: *config,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render the full image in parallel.
    pub fn render(&self) -> RenderResult<Film> {
        let camera = &self.scene.camera;
        let (width, height) = (camera.width(), camera.height());
        log::info!(
            "Path tracing {}x{} at {} samples per pixel on {} threads",
            width,
            height,
            self.config.total_samples(),
            rayon::current_num_threads()
        );
        let start = Instant::now();

        let pixels = render_buckets(width, height, DEFAULT_BUCKET_SIZE, |x, y| {
            self.render_pixel(x, y)
        })?;

        log::info!("Path tracing finished in {:.2?}", start.elapsed());
        Ok(Film::from_pixels(width, height, pixels))
    }

    /// Estimate one pixel.
    ///
    /// The pixel is split into 2×2 subpixels. Each subpixel averages
    /// `samples_per_pixel` tent-filtered samples and the pixel is the mean of
    /// the four, left unclamped.
    pub fn render_pixel(&self, x: u32, y: u32) -> RenderResult<Color> {
        let camera = &self.scene.camera;
        let index = y as u64 * camera.width() as u64 + x as u64;
        let mut rng = task_rng(self.config.seed, 0, index);
        let samples = self.config.samples_per_pixel;

        let mut pixel = Color::ZERO;
        for sy in 0..2 {
            for sx in 0..2 {
                let mut sub = Color::ZERO;
                for _ in 0..samples {
                    let dx = tent(&mut rng);
                    let dy = tent(&mut rng);
                    let screen = Vec2::new(
                        x as f32 + (sx as f32 + 0.5 + dx) / 2.0,
                        y as f32 + (sy as f32 + 0.5 + dy) / 2.0,
                    );
                    let lens = if camera.has_depth_of_field() {
                        Vec2::new(tent(&mut rng), tent(&mut rng))
                    } else {
                        Vec2::ZERO
                    };
                    let ray = camera.generate_ray(screen, lens);
                    sub += self.radiance(&ray, &mut rng)?;
                }
                pixel += sub / samples as f32 * 0.25;
            }
        }
        Ok(pixel)
    }

    /// Unclamped radiance estimate along one camera ray.
    pub fn radiance(&self, ray: &Ray, rng: &mut dyn RngCore) -> RenderResult<Color> {
        self.trace(ray, 0, rng)
    }

    fn trace(&self, ray: &Ray, depth: u32, rng: &mut dyn RngCore) -> RenderResult<Color> {
        if depth >= self.config.max_depth {
            return Ok(Color::ZERO);
        }
        let Some(hit) = self.scene.intersect(ray, RAY_EPSILON) else {
            return Ok(self.scene.background);
        };
        let material = hit.material()?;
        let emitted = material.emitted();
        if material.kind == MaterialKind::Emission {
            return Ok(emitted);
        }

        let depth = depth + 1;
        let wo = -ray.direction();
        let n = hit.normal;
        let uv = hit.texcoord;

        let direct = if material.is_diffuse_like() {
            self.scene.direct_light(&hit, material, wo, rng)
        } else {
            Color::ZERO
        };

        // Russian roulette on the continuation only.
        let f = material.reflectance(uv);
        let p = max_component(f).min(1.0);
        if p <= 0.0 {
            return Ok(emitted + direct);
        }
        let roulette = depth > self.config.rr_depth;
        let survival = if roulette {
            if gen_f32(rng) >= p {
                return Ok(emitted + direct);
            }
            1.0 / p
        } else {
            1.0
        };

        let indirect = match material.kind {
            MaterialKind::Refraction { .. } => {
                let albedo = material.albedo(uv);
                let event = material.dielectric_event(ray.direction(), n, hit.front_face);
                let reflected = Ray::new(hit.p, event.reflected);
                match event.refracted {
                    None => albedo * self.trace(&reflected, depth, rng)?,
                    Some(dir) => {
                        let refracted = Ray::new(hit.p, dir);
                        let re = event.reflectance;
                        let tr = event.transmittance();
                        if roulette {
                            let pr = event.reflect_probability();
                            if gen_f32(rng) < pr {
                                albedo * self.trace(&reflected, depth, rng)? * (re / pr)
                            } else {
                                albedo * self.trace(&refracted, depth, rng)? * (tr / (1.0 - pr))
                            }
                        } else {
                            albedo
                                * (self.trace(&reflected, depth, rng)? * re
                                    + self.trace(&refracted, depth, rng)? * tr)
                        }
                    }
                }
            }
            _ => match material.scatter(wo, n, uv, rng) {
                Some(sample) if sample.weight != Color::ZERO => {
                    let next = Ray::new(hit.p, sample.wi);
                    sample.weight * self.trace(&next, depth, rng)?
                }
                _ => Color::ZERO,
            },
        };

        Ok(emitted + direct + indirect * survival)
    }
}

/// Render `scene` with the path tracer.
pub fn render(scene: &Scene, config: &RenderConfig) -> RenderResult<Film> {
    PathTracer::new(scene, config)?.render()
}
