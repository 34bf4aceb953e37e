//! Beckmann microfacet terms and Fresnel helpers.
//!
//! All angles are measured against the shading normal `n`. `alpha` is the
//! Beckmann roughness (RMS slope).

use crate::sampling::{gen_f32, to_world};
use halo_math::Vec3;
use rand::RngCore;
use std::f32::consts::PI;

const MIN_ALPHA: f32 = 1e-4;

/// Mirror `v` about `n` (both pointing away from the surface).
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    2.0 * v.dot(n) * n - v
}

/// Reflectance at normal incidence for an interface with relative ior `ior`.
#[inline]
pub fn normal_reflectance(ior: f32) -> f32 {
    let r = (ior - 1.0) / (ior + 1.0);
    r * r
}

/// Schlick's approximation `R0 + (1 - R0)(1 - cos)^5`.
#[inline]
pub fn schlick(r0: f32, cos_theta: f32) -> f32 {
    let c = (1.0 - cos_theta).clamp(0.0, 1.0);
    let c2 = c * c;
    r0 + (1.0 - r0) * c2 * c2 * c
}

/// Beckmann normal distribution `D(h)`.
pub fn beckmann_d(cos_h: f32, alpha: f32) -> f32 {
    if cos_h <= 0.0 {
        return 0.0;
    }
    let a2 = alpha.max(MIN_ALPHA).powi(2);
    let cos2 = cos_h * cos_h;
    let tan2 = (1.0 - cos2).max(0.0) / cos2;
    let exponent = -tan2 / a2;
    if exponent < -80.0 {
        // negligible density; also avoids 0/0 once cos⁴ underflows
        return 0.0;
    }
    exponent.exp() / (PI * a2 * cos2 * cos2)
}

/// Smith G1 for Beckmann, rational approximation.
///
/// Zero when `w` and `h` disagree about which side of the surface they are on.
pub fn smith_g1(w: Vec3, h: Vec3, n: Vec3, alpha: f32) -> f32 {
    let cos_theta = w.dot(n);
    if w.dot(h) * cos_theta <= 0.0 {
        return 0.0;
    }
    let cos2 = cos_theta * cos_theta;
    let sin2 = (1.0 - cos2).max(0.0);
    if sin2 <= 0.0 {
        return 1.0;
    }
    let tan_theta = (sin2 / cos2).sqrt();
    let b = 1.0 / (alpha.max(MIN_ALPHA) * tan_theta);
    if b < 1.6 {
        (3.535 * b + 2.181 * b * b) / (1.0 + 2.276 * b + 2.577 * b * b)
    } else {
        1.0
    }
}

/// Sample a Beckmann half vector around `n`.
///
/// `tan²θh = -α² ln(1 - ξ1)`, `φh = 2πξ2`; the density over half vectors is
/// `D(h)·cosθh`.
pub fn sample_beckmann_half(n: Vec3, alpha: f32, rng: &mut dyn RngCore) -> Vec3 {
    let a = alpha.max(MIN_ALPHA);
    let xi1 = gen_f32(rng);
    let xi2 = gen_f32(rng);
    let theta = (-(a * a) * (1.0 - xi1).ln()).sqrt().atan();
    let phi = 2.0 * PI * xi2;
    let (sin_t, cos_t) = theta.sin_cos();
    let local = Vec3::new(sin_t * phi.cos(), sin_t * phi.sin(), cos_t);
    to_world(local, n).normalize()
}

/// Density of [`sample_beckmann_half`] converted to the reflected direction.
pub fn beckmann_reflect_pdf(wo: Vec3, h: Vec3, n: Vec3, alpha: f32) -> f32 {
    let cos_h = h.dot(n);
    let wo_h = wo.dot(h);
    if cos_h <= 0.0 || wo_h <= 0.0 {
        return 0.0;
    }
    beckmann_d(cos_h, alpha) * cos_h / (4.0 * wo_h)
}
