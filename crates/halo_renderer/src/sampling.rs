//! Random streams and the warping functions shared by the integrators.

use halo_math::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::f32::consts::PI;

/// Uniform f32 in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// SplitMix64 finalizer, used to decorrelate nearby task indices.
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic random stream for one parallel task.
///
/// Every pixel or photon gets its own generator derived from the render seed,
/// the iteration number and its index, so results do not depend on how rayon
/// schedules the work.
pub fn task_rng(seed: u64, iteration: u64, index: u64) -> StdRng {
    let key = mix64(seed ^ mix64(iteration ^ mix64(index)));
    StdRng::seed_from_u64(key)
}

/// Offset in [-1, 1) distributed with a tent (triangle) filter.
#[inline]
pub fn tent(rng: &mut dyn RngCore) -> f32 {
    let r = 2.0 * gen_f32(rng);
    if r < 1.0 {
        r.sqrt() - 1.0
    } else {
        1.0 - (2.0 - r).sqrt()
    }
}

/// Orthonormal tangent pair `(u, v)` completing `w` to a right-handed frame.
///
/// The helper axis is +Y unless `w` is close to it, in which case +X is used so
/// the cross product never degenerates.
#[inline]
pub fn orthonormal_basis(w: Vec3) -> (Vec3, Vec3) {
    let helper = if w.x.abs() > 0.1 { Vec3::Y } else { Vec3::X };
    let u = helper.cross(w).normalize();
    let v = w.cross(u);
    (u, v)
}

/// Express a local direction (z along `n`) in world space.
#[inline]
pub fn to_world(local: Vec3, n: Vec3) -> Vec3 {
    let (u, v) = orthonormal_basis(n);
    u * local.x + v * local.y + n * local.z
}

/// Cosine-weighted direction on the hemisphere around `n`.
pub fn cosine_hemisphere(n: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let phi = 2.0 * PI * gen_f32(rng);
    let r2 = gen_f32(rng);
    let r2s = r2.sqrt();
    let local = Vec3::new(phi.cos() * r2s, phi.sin() * r2s, (1.0 - r2).sqrt());
    to_world(local, n).normalize()
}

/// Uniform direction on the unit sphere.
pub fn uniform_sphere(rng: &mut dyn RngCore) -> Vec3 {
    let z = 1.0 - 2.0 * gen_f32(rng);
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * gen_f32(rng);
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform direction inside the cone of half-angle `acos(cos_max)` around `axis`.
pub fn uniform_cone(axis: Vec3, cos_max: f32, rng: &mut dyn RngCore) -> Vec3 {
    let cos_theta = 1.0 - gen_f32(rng) * (1.0 - cos_max);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * gen_f32(rng);
    let local = Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);
    to_world(local, axis).normalize()
}

/// Solid angle subtended by a cone of half-angle `acos(cos_max)`.
#[inline]
pub fn cone_solid_angle(cos_max: f32) -> f32 {
    2.0 * PI * (1.0 - cos_max)
}

/// Uniform point on the unit disk.
pub fn uniform_disk(rng: &mut dyn RngCore) -> Vec2 {
    let r = gen_f32(rng).sqrt();
    let theta = 2.0 * PI * gen_f32(rng);
    Vec2::new(r * theta.cos(), r * theta.sin())
}
