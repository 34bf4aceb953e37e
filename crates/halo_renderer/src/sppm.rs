//! Stochastic progressive photon mapping.
//!
//! Every iteration runs three passes over shared, read-only scene data:
//!
//! 1. Eye pass: each pixel traces one camera path through specular and
//!    dielectric bounces to its first diffuse or glossy surface, adds direct
//!    light there, and leaves a visible point.
//! 2. Photon pass: photons leave the lights, bounce through the scene and are
//!    stored at diffuse or glossy surfaces after their first bounce. The
//!    stored photons are indexed by a k-d tree.
//! 3. Update pass: each visible point gathers the photons inside its radius,
//!    then the pixel's radius shrinks and its flux is rescaled to match.
//!
//! Pixel state (`radius`, `ld`, `tau`, `n`) persists across iterations; visible
//! points and photon maps live for one iteration only.
//!
//! Only [`Light`](crate::Light)s emit photons. Emissive surfaces are seen
//! directly by eye paths and add to `ld`, but they light nothing else, so a
//! scene lit only by emissive geometry is rejected.

use crate::config::SppmConfig;
use crate::error::{RenderError, RenderResult};
use crate::film::Film;
use crate::kdtree::{KdPoint, KdTree};
use crate::material::{Material, MaterialKind};
use crate::sampling::{gen_f32, task_rng, tent};
use crate::scene::{Scene, RAY_EPSILON};
use halo_math::{max_component, Color, Ray, Vec2, Vec3};
use rand::RngCore;
use rayon::prelude::*;
use std::f32::consts::PI;
use std::time::Instant;

/// Offset separating photon random streams from eye-path streams.
const PHOTON_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Light carried to a diffuse or glossy surface.
#[derive(Debug, Clone, Copy)]
pub struct Photon {
    pub position: Vec3,
    /// Direction the photon came from (pointing away from the surface).
    pub wi: Vec3,
    /// Power, before dividing by the total photon count.
    pub power: Color,
}

impl KdPoint for Photon {
    const DIMENSIONS: usize = 3;

    #[inline]
    fn get(&self, axis: usize) -> f32 {
        self.position[axis]
    }
}

/// Where a pixel's camera path landed this iteration.
#[derive(Debug, Clone, Copy)]
struct VisiblePoint<'a> {
    p: Vec3,
    normal: Vec3,
    wo: Vec3,
    texcoord: Vec2,
    material: &'a Material,
    /// Path throughput from the camera to `p`.
    beta: Color,
}

/// Persistent per-pixel estimator state.
#[derive(Debug, Clone)]
pub struct SppmPixel<'a> {
    /// Current photon gather radius
    pub radius: f32,
    /// Direct and emitted radiance summed over iterations
    pub ld: Color,
    /// Accumulated, radius-corrected photon flux
    pub tau: Color,
    /// Accumulated photon count (fractional after shrinking)
    pub n: f32,
    /// Photons gathered in the current iteration
    m: u32,
    /// Flux gathered in the current iteration
    phi: Color,
    vp: Option<VisiblePoint<'a>>,
    radius_seeded: bool,
}

impl<'a> SppmPixel<'a> {
    fn new(radius: f32) -> Self {
        Self {
            radius,
            ld: Color::ZERO,
            tau: Color::ZERO,
            n: 0.0,
            m: 0,
            phi: Color::ZERO,
            vp: None,
            radius_seeded: false,
        }
    }

    /// Apply one iteration's gathered photons.
    fn update(&mut self, alpha: f32) {
        let m = self.m as f32;
        if m > 0.0 || self.n > 0.0 {
            let n_new = self.n + alpha * m;
            let shrink = n_new / (self.n + m);
            self.radius *= shrink.sqrt();
            self.tau = (self.tau + self.phi) * shrink;
            self.n = n_new;
        }
        self.m = 0;
        self.phi = Color::ZERO;
        self.vp = None;
    }

    /// Whether the radius came from the k-nearest-photon seeding.
    pub fn radius_seeded(&self) -> bool {
        self.radius_seeded
    }

    /// Radiance estimate after `iterations` iterations of `photons_emitted`
    /// total photons.
    pub fn estimate(&self, photons_emitted: u64, iterations: u32) -> Color {
        let indirect = if photons_emitted > 0 && self.radius > 0.0 {
            self.tau / (PI * self.radius * self.radius * photons_emitted as f32)
        } else {
            Color::ZERO
        };
        indirect + self.ld / iterations.max(1) as f32
    }
}

/// Summary of one completed iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationStats {
    pub iteration: u32,
    pub photons_stored: usize,
    pub visible_points: usize,
    pub min_radius: f32,
    pub max_radius: f32,
}

/// Progressive photon mapping integrator.
pub struct Sppm<'a> {
    scene: &'a Scene,
    config: SppmConfig,
    pixels: Vec<SppmPixel<'a>>,
    iteration: u32,
}

impl<'a> Sppm<'a> {
    /// Validate the configuration and scene and set every pixel to the
    /// initial radius.
    pub fn new(scene: &'a Scene, config: &SppmConfig) -> RenderResult<Self> {
        config.validate()?;
        scene.validate()?;
        if scene.lights.is_empty() {
            return Err(RenderError::InvalidConfig(
                "photon mapping needs at least one light".to_string(),
            ));
        }
        if scene.has_emissive_surfaces() {
            log::warn!("SPPM: emissive surfaces are visible but do not emit photons");
        }

        let count = scene.camera.width() as usize * scene.camera.height() as usize;
        Ok(Self {
            scene,
            config: *config,
            pixels: vec![SppmPixel::new(config.initial_radius); count],
            iteration: 0,
        })
    }

    pub fn pixels(&self) -> &[SppmPixel<'a>] {
        &self.pixels
    }

    /// Iterations completed so far.
    pub fn iterations_done(&self) -> u32 {
        self.iteration
    }

    /// Photons emitted over all completed iterations.
    pub fn photons_emitted(&self) -> u64 {
        self.iteration as u64 * self.config.photons_per_iteration as u64
    }

    /// Run one eye pass, photon pass and update pass.
    pub fn iterate(&mut self) -> RenderResult<IterationStats> {
        let iteration = self.iteration;
        self.eye_pass(iteration)?;

        let photons = self.photon_pass(iteration)?;
        let photons_stored = photons.len();
        let map = KdTree::build(photons, 3);

        if iteration == 0 {
            if let Some(k) = self.config.knn_radius {
                self.seed_radii(&map, k as usize);
            }
        }

        let alpha = self.config.alpha;
        self.pixels.par_iter_mut().for_each(|pixel| {
            if let Some(vp) = pixel.vp {
                for photon in map.range_search(&vp.p, pixel.radius) {
                    let f = vp.material.eval(photon.wi, vp.wo, vp.normal, vp.texcoord);
                    pixel.phi += vp.beta * f * photon.power;
                    pixel.m += 1;
                }
            }
        });

        let visible_points = self.pixels.iter().filter(|p| p.vp.is_some()).count();
        self.pixels
            .par_iter_mut()
            .for_each(|pixel| pixel.update(alpha));
        self.iteration += 1;

        let (min_radius, max_radius) = self
            .pixels
            .iter()
            .fold((f32::INFINITY, 0.0f32), |(lo, hi), p| {
                (lo.min(p.radius), hi.max(p.radius))
            });
        let stats = IterationStats {
            iteration,
            photons_stored,
            visible_points,
            min_radius,
            max_radius,
        };
        log::info!(
            "SPPM iteration {}/{}: {} photons stored, {} visible points, radius {:.5}..{:.5}",
            iteration + 1,
            self.config.iterations,
            stats.photons_stored,
            stats.visible_points,
            stats.min_radius,
            stats.max_radius
        );
        Ok(stats)
    }

    /// Current estimate of the image.
    pub fn film(&self) -> Film {
        let emitted = self.photons_emitted();
        let pixels = self
            .pixels
            .iter()
            .map(|p| p.estimate(emitted, self.iteration))
            .collect();
        Film::from_pixels(self.scene.camera.width(), self.scene.camera.height(), pixels)
    }

    /// Run all configured iterations and return the final image.
    pub fn render(mut self) -> RenderResult<Film> {
        let camera = &self.scene.camera;
        log::info!(
            "SPPM {}x{}: {} iterations of {} photons on {} threads",
            camera.width(),
            camera.height(),
            self.config.iterations,
            self.config.photons_per_iteration,
            rayon::current_num_threads()
        );
        let start = Instant::now();
        for _ in 0..self.config.iterations {
            self.iterate()?;
        }
        log::info!("SPPM finished in {:.2?}", start.elapsed());
        Ok(self.film())
    }

    fn eye_pass(&mut self, iteration: u32) -> RenderResult<()> {
        let scene = self.scene;
        let config = self.config;
        let width = scene.camera.width();

        self.pixels
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(index, pixel)| {
                let x = index as u32 % width.max(1);
                let y = index as u32 / width.max(1);
                let mut rng = task_rng(config.seed, iteration as u64, index as u64);
                trace_eye(scene, &config, pixel, x, y, iteration, &mut rng)
            })
    }

    fn photon_pass(&self, iteration: u32) -> RenderResult<Vec<Photon>> {
        let scene = self.scene;
        let config = self.config;
        let batches = (0..config.photons_per_iteration)
            .into_par_iter()
            .map(|index| {
                let mut rng = task_rng(
                    config.seed.wrapping_add(PHOTON_STREAM),
                    iteration as u64,
                    index as u64,
                );
                trace_photon(scene, &config, &mut rng)
            })
            .collect::<RenderResult<Vec<_>>>()?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Replace the shared initial radius by the distance to the k-th nearest
    /// photon, for pixels that have a visible point.
    fn seed_radii(&mut self, map: &KdTree<Photon>, k: usize) {
        self.pixels.par_iter_mut().for_each(|pixel| {
            let Some(vp) = pixel.vp else {
                return;
            };
            let (found, distance) = map.k_nearest(&vp.p, k);
            if !found.is_empty() && distance > 0.0 {
                pixel.radius = distance;
                pixel.radius_seeded = true;
            }
        });
    }
}

/// Render `scene` with progressive photon mapping.
pub fn render(scene: &Scene, config: &SppmConfig) -> RenderResult<Film> {
    Sppm::new(scene, config)?.render()
}

/// Follow one camera path to its visible point.
fn trace_eye<'a>(
    scene: &'a Scene,
    config: &SppmConfig,
    pixel: &mut SppmPixel<'a>,
    x: u32,
    y: u32,
    iteration: u32,
    rng: &mut dyn RngCore,
) -> RenderResult<()> {
    let camera = &scene.camera;
    // Cycle through the 2×2 subpixel strata across iterations.
    let sx = (iteration % 2) as f32;
    let sy = ((iteration / 2) % 2) as f32;
    let screen = Vec2::new(
        x as f32 + (sx + 0.5 + tent(rng)) / 2.0,
        y as f32 + (sy + 0.5 + tent(rng)) / 2.0,
    );
    let lens = if camera.has_depth_of_field() {
        Vec2::new(tent(rng), tent(rng))
    } else {
        Vec2::ZERO
    };

    let mut ray = camera.generate_ray(screen, lens);
    let mut beta = Color::ONE;
    for _ in 0..config.max_depth {
        let Some(hit) = scene.intersect(&ray, RAY_EPSILON) else {
            pixel.ld += beta * scene.background;
            break;
        };
        let material = hit.material()?;
        let wo = -ray.direction();
        pixel.ld += beta * material.emitted();

        match material.kind {
            MaterialKind::Emission => break,
            MaterialKind::Diffuse { .. } | MaterialKind::Microfacet { .. } => {
                pixel.ld += beta * scene.direct_light(&hit, material, wo, rng);
                pixel.vp = Some(VisiblePoint {
                    p: hit.p,
                    normal: hit.normal,
                    wo,
                    texcoord: hit.texcoord,
                    material,
                    beta,
                });
                break;
            }
            MaterialKind::Specular { .. } => {
                let Some(sample) = material.scatter(wo, hit.normal, hit.texcoord, rng) else {
                    break;
                };
                beta *= sample.weight;
                ray = Ray::new(hit.p, sample.wi);
            }
            MaterialKind::Refraction { .. } => {
                let event = material.dielectric_event(ray.direction(), hit.normal, hit.front_face);
                let dir = match event.refracted {
                    Some(refracted) if gen_f32(rng) >= event.reflectance => refracted,
                    _ => event.reflected,
                };
                beta *= material.albedo(hit.texcoord);
                ray = Ray::new(hit.p, dir);
            }
        }

        if beta == Color::ZERO {
            break;
        }
    }
    Ok(())
}

/// Emit one photon from a uniformly chosen light and record where it lands.
fn trace_photon(
    scene: &Scene,
    config: &SppmConfig,
    rng: &mut dyn RngCore,
) -> RenderResult<Vec<Photon>> {
    let mut stored = Vec::new();
    let light_count = scene.lights.len();
    let choice = ((gen_f32(rng) * light_count as f32) as usize).min(light_count - 1);
    let emission = scene.lights[choice].emit_photon(rng);

    let mut ray = emission.ray;
    let mut power = emission.power * light_count as f32;
    for depth in 0..config.max_depth {
        let Some(hit) = scene.intersect(&ray, RAY_EPSILON) else {
            break;
        };
        let material = hit.material()?;
        let wi = -ray.direction();

        let (dir, weight) = match material.kind {
            MaterialKind::Emission => break,
            MaterialKind::Refraction { .. } => {
                let event = material.dielectric_event(ray.direction(), hit.normal, hit.front_face);
                let dir = match event.refracted {
                    Some(refracted) if gen_f32(rng) >= event.reflectance => refracted,
                    _ => event.reflected,
                };
                (dir, material.albedo(hit.texcoord))
            }
            _ => {
                // Direct light is already in `ld`, so first-bounce photons
                // are not stored.
                if material.is_diffuse_like() && depth > 0 {
                    stored.push(Photon {
                        position: hit.p,
                        wi,
                        power,
                    });
                }
                let Some(sample) = material.scatter(wi, hit.normal, hit.texcoord, rng) else {
                    break;
                };
                (sample.wi, sample.weight)
            }
        };

        // Russian roulette keeps photon power roughly constant.
        let p = max_component(weight).min(1.0);
        if p <= 0.0 || gen_f32(rng) >= p {
            break;
        }
        power *= weight / p;
        ray = Ray::new(hit.p, dir);
    }
    Ok(stored)
}
