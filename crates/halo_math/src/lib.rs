//! Halo math - vector types, rays and bounding volumes shared by the renderer.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;

/// RGB color in linear space.
pub type Color = Vec3;

/// Largest component of a vector (used for throughput-driven roulette).
#[inline]
pub fn max_component(v: Vec3) -> f32 {
    v.x.max(v.y).max(v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a * b, Vec3::new(4.0, 10.0, 18.0));
    }

    #[test]
    fn test_max_component() {
        assert_eq!(max_component(Vec3::new(0.2, 0.9, 0.4)), 0.9);
        assert_eq!(max_component(Vec3::new(0.7, 0.1, 0.1)), 0.7);
        assert_eq!(max_component(Vec3::ZERO), 0.0);
    }
}
