//! Light sources.
//!
//! Lights are not scene geometry: the integrators reach them through explicit
//! shadow rays ([`Light::illumination`]) and photon emission
//! ([`Light::emit_photon`]).

use crate::error::{RenderError, RenderResult};
use crate::sampling::{
    cone_solid_angle, cosine_hemisphere, orthonormal_basis, uniform_cone, uniform_disk,
    uniform_sphere,
};
use halo_math::{Color, Ray, Vec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Default radius of the disk directional-light photons start from.
const DEFAULT_FOOTPRINT_RADIUS: f32 = 10.0;
/// Default distance of that disk from the origin, against the light direction.
const DEFAULT_FOOTPRINT_DISTANCE: f32 = 100.0;

/// Light arriving at a shaded point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Unit direction from the shaded point toward the light.
    pub direction: Vec3,
    /// Irradiance the sample delivers to a surface facing the light.
    pub color: Color,
    /// Distance to the light sample (infinite for directional lights).
    pub distance: f32,
}

/// A photon leaving a light.
#[derive(Debug, Clone, Copy)]
pub struct PhotonEmission {
    pub ray: Ray,
    /// Power carried, before dividing by the photon count.
    pub power: Color,
}

/// A light source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Light {
    /// Isotropic point light with radiant intensity `intensity`.
    Point { position: Vec3, intensity: Color },
    /// Point light restricted to a cone around `direction`.
    Spot {
        position: Vec3,
        direction: Vec3,
        intensity: Color,
        /// Cosine of the cone half-angle.
        cos_cutoff: f32,
        /// Attenuation toward the cone edge (0 disables it).
        falloff: f32,
    },
    /// Parallel light travelling along `direction`.
    Directional {
        direction: Vec3,
        irradiance: Color,
        /// Center of the disk photons are emitted from.
        footprint_center: Vec3,
        footprint_radius: f32,
    },
    /// One-sided emitting disk facing `normal`.
    Area {
        center: Vec3,
        normal: Vec3,
        radius: f32,
        radiance: Color,
    },
}

impl Light {
    pub fn point(position: Vec3, intensity: Color) -> Self {
        Light::Point {
            position,
            intensity,
        }
    }

    /// Spot light with a cone half-angle in degrees.
    pub fn spot(
        position: Vec3,
        direction: Vec3,
        intensity: Color,
        angle_degrees: f32,
        falloff: f32,
    ) -> Self {
        Light::Spot {
            position,
            direction: direction.normalize_or_zero(),
            intensity,
            cos_cutoff: angle_degrees.to_radians().cos(),
            falloff,
        }
    }

    /// Directional light. Photons start on a disk far up-light of the origin;
    /// use [`Light::with_footprint`] to fit it to the scene.
    pub fn directional(direction: Vec3, irradiance: Color) -> Self {
        let direction = direction.normalize_or_zero();
        Light::Directional {
            direction,
            irradiance,
            footprint_center: -direction * DEFAULT_FOOTPRINT_DISTANCE,
            footprint_radius: DEFAULT_FOOTPRINT_RADIUS,
        }
    }

    pub fn area(center: Vec3, normal: Vec3, radius: f32, radiance: Color) -> Self {
        Light::Area {
            center,
            normal: normal.normalize_or_zero(),
            radius,
            radiance,
        }
    }

    /// Builder method to place the photon disk of a directional light.
    /// No effect on other light types.
    pub fn with_footprint(mut self, center: Vec3, radius: f32) -> Self {
        if let Light::Directional {
            footprint_center,
            footprint_radius,
            ..
        } = &mut self
        {
            *footprint_center = center;
            *footprint_radius = radius;
        }
        self
    }

    /// Check that the light emits finite, non-negative energy from a
    /// well-defined shape.
    pub fn validate(&self) -> RenderResult<()> {
        let (color, direction, extent) = match *self {
            Light::Point { intensity, .. } => (intensity, Vec3::Y, 1.0),
            Light::Spot {
                intensity,
                direction,
                cos_cutoff,
                ..
            } => (intensity, direction, 1.0 - cos_cutoff),
            Light::Directional {
                irradiance,
                direction,
                footprint_radius,
                ..
            } => (irradiance, direction, footprint_radius),
            Light::Area {
                radiance,
                normal,
                radius,
                ..
            } => (radiance, normal, radius),
        };

        if !(color.is_finite() && color.min_element() >= 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "light color {:?} must be finite and non-negative",
                color
            )));
        }
        if direction == Vec3::ZERO {
            return Err(RenderError::InvalidConfig(
                "light direction must be non-zero".to_string(),
            ));
        }
        if !(extent > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "light extent {} must be positive",
                extent
            )));
        }
        Ok(())
    }

    /// Light arriving at `p`, for one explicit shadow ray.
    ///
    /// Area lights are sampled stochastically, so averaging several calls
    /// estimates the irradiance.
    pub fn illumination(&self, p: Vec3, rng: &mut dyn RngCore) -> LightSample {
        match *self {
            Light::Point {
                position,
                intensity,
            } => {
                let (direction, distance) = toward(p, position);
                LightSample {
                    direction,
                    color: intensity / (distance * distance).max(f32::MIN_POSITIVE),
                    distance,
                }
            }
            Light::Spot {
                position,
                direction: axis,
                intensity,
                cos_cutoff,
                falloff,
            } => {
                let (direction, distance) = toward(p, position);
                let cos_theta = axis.dot(-direction);
                let color = spot_intensity(intensity, cos_theta, cos_cutoff, falloff)
                    / (distance * distance).max(f32::MIN_POSITIVE);
                LightSample {
                    direction,
                    color,
                    distance,
                }
            }
            Light::Directional {
                direction,
                irradiance,
                ..
            } => LightSample {
                direction: -direction,
                color: irradiance,
                distance: f32::INFINITY,
            },
            Light::Area {
                center,
                normal,
                radius,
                radiance,
            } => {
                let q = center + disk_offset(normal, radius, rng);
                let (direction, distance) = toward(p, q);
                let cos_light = normal.dot(-direction);
                let color = if cos_light > 0.0 {
                    radiance * (PI * radius * radius * cos_light)
                        / (distance * distance).max(f32::MIN_POSITIVE)
                } else {
                    Color::ZERO
                };
                LightSample {
                    direction,
                    color,
                    distance,
                }
            }
        }
    }

    /// Emit one photon, distributed proportionally to the emitted power.
    pub fn emit_photon(&self, rng: &mut dyn RngCore) -> PhotonEmission {
        match *self {
            Light::Point {
                position,
                intensity,
            } => PhotonEmission {
                ray: Ray::new(position, uniform_sphere(rng)),
                power: intensity * (4.0 * PI),
            },
            Light::Spot {
                position,
                direction: axis,
                intensity,
                cos_cutoff,
                falloff,
            } => {
                let dir = uniform_cone(axis, cos_cutoff, rng);
                let power = spot_intensity(intensity, axis.dot(dir), cos_cutoff, falloff)
                    * cone_solid_angle(cos_cutoff);
                PhotonEmission {
                    ray: Ray::new(position, dir),
                    power,
                }
            }
            Light::Directional {
                direction,
                irradiance,
                footprint_center,
                footprint_radius,
            } => PhotonEmission {
                ray: Ray::new(
                    footprint_center + disk_offset(direction, footprint_radius, rng),
                    direction,
                ),
                power: irradiance * (PI * footprint_radius * footprint_radius),
            },
            Light::Area {
                center,
                normal,
                radius,
                radiance,
            } => PhotonEmission {
                ray: Ray::new(
                    center + disk_offset(normal, radius, rng),
                    cosine_hemisphere(normal, rng),
                ),
                power: radiance * (PI * PI * radius * radius),
            },
        }
    }
}

/// Unit direction and distance from `p` to `target`.
fn toward(p: Vec3, target: Vec3) -> (Vec3, f32) {
    let d = target - p;
    let distance = d.length();
    if distance > 0.0 {
        (d / distance, distance)
    } else {
        (Vec3::Y, 0.0)
    }
}

/// Uniform point on a disk of `radius` perpendicular to `normal`, relative to
/// the disk center.
fn disk_offset(normal: Vec3, radius: f32, rng: &mut dyn RngCore) -> Vec3 {
    let (u, v) = orthonormal_basis(normal);
    let s = uniform_disk(rng) * radius;
    u * s.x + v * s.y
}

/// Spot intensity at angle `acos(cos_theta)` from the axis.
fn spot_intensity(intensity: Color, cos_theta: f32, cos_cutoff: f32, falloff: f32) -> Color {
    if cos_theta < cos_cutoff {
        return Color::ZERO;
    }
    intensity * (cos_theta / (1.0 + falloff * (1.0 - cos_theta)))
}
