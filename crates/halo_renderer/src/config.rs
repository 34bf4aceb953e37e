//! Integrator settings.
//!
//! Both structs are plain immutable values: build one with the `with_*`
//! methods (or deserialize it), call `validate`, and pass it by reference.

use crate::error::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};

/// Path tracer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per subpixel; each pixel is split into 2×2 strata
    pub samples_per_pixel: u32,
    /// Bounces before Russian roulette may terminate a path
    pub rr_depth: u32,
    /// Hard limit on path length
    pub max_depth: u32,
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 4,
            rr_depth: 5,
            max_depth: 64,
            seed: 0,
        }
    }
}

impl RenderConfig {
    pub fn with_samples(mut self, samples_per_pixel: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    pub fn with_depths(mut self, rr_depth: u32, max_depth: u32) -> Self {
        self.rr_depth = rr_depth;
        self.max_depth = max_depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Samples taken per pixel across all strata.
    pub fn total_samples(&self) -> u32 {
        4 * self.samples_per_pixel
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidConfig(
                "samples_per_pixel must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(RenderError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.rr_depth > self.max_depth {
            return Err(RenderError::InvalidConfig(format!(
                "rr_depth {} exceeds max_depth {}",
                self.rr_depth, self.max_depth
            )));
        }
        Ok(())
    }
}

/// Stochastic progressive photon mapping settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SppmConfig {
    pub iterations: u32,
    pub photons_per_iteration: u32,
    /// Gather radius every pixel starts from
    pub initial_radius: f32,
    /// Fraction of new photons kept per iteration, in (0, 1)
    pub alpha: f32,
    /// Bounce limit for eye paths and photon paths
    pub max_depth: u32,
    /// When set, seed each pixel's radius from the distance to its k-th
    /// nearest photon in the first iteration
    pub knn_radius: Option<u32>,
    pub seed: u64,
}

impl Default for SppmConfig {
    fn default() -> Self {
        Self {
            iterations: 16,
            photons_per_iteration: 100_000,
            initial_radius: 0.1,
            alpha: 0.7,
            max_depth: 20,
            knn_radius: None,
            seed: 0,
        }
    }
}

impl SppmConfig {
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_photons(mut self, photons_per_iteration: u32) -> Self {
        self.photons_per_iteration = photons_per_iteration;
        self
    }

    pub fn with_radius(mut self, initial_radius: f32) -> Self {
        self.initial_radius = initial_radius;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Seed radii from the k-th nearest photon instead of the shared constant.
    pub fn with_knn_radius(mut self, k: u32) -> Self {
        self.knn_radius = Some(k);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> RenderResult<()> {
        let invalid = |msg: String| Err(RenderError::InvalidConfig(msg));
        if self.iterations == 0 {
            return invalid("iterations must be at least 1".to_string());
        }
        if self.photons_per_iteration == 0 {
            return invalid("photons_per_iteration must be at least 1".to_string());
        }
        if !(self.initial_radius.is_finite() && self.initial_radius > 0.0) {
            return invalid(format!(
                "initial_radius {} must be positive",
                self.initial_radius
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return invalid(format!("alpha {} must lie in (0, 1)", self.alpha));
        }
        if self.max_depth == 0 {
            return invalid("max_depth must be at least 1".to_string());
        }
        if self.knn_radius == Some(0) {
            return invalid("knn_radius must be at least 1 when set".to_string());
        }
        Ok(())
    }
}
