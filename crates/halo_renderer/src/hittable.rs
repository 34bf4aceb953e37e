//! Hittable trait and the Hit accumulator for nearest-hit queries.

use crate::error::{RenderError, RenderResult};
use crate::Material;
use halo_math::{Ray, Vec2, Vec3};

/// Record of the closest intersection found so far.
///
/// `t` starts at +∞ and only ever decreases while a query walks the scene: a
/// candidate is accepted only if it lies in `[t_min, t)`.
#[derive(Clone, Debug)]
pub struct Hit<'a> {
    /// Ray parameter of the closest intersection
    pub t: f32,
    /// Point of intersection
    pub p: Vec3,
    /// Unit surface normal, always pointing against the ray
    pub normal: Vec3,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
    /// Texture coordinate
    pub texcoord: Vec2,
    /// Material at the intersection point
    pub material: Option<&'a Material>,
}

impl<'a> Default for Hit<'a> {
    fn default() -> Self {
        Self {
            t: f32::INFINITY,
            p: Vec3::ZERO,
            normal: Vec3::ZERO,
            front_face: false,
            texcoord: Vec2::ZERO,
            material: None,
        }
    }
}

impl<'a> Hit<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a candidate at `t` would improve on the current record.
    #[inline]
    pub fn accepts(&self, t: f32, t_min: f32) -> bool {
        t >= t_min && t < self.t
    }

    /// Store a closer intersection.
    ///
    /// The outward normal is flipped if needed so the stored normal faces the
    /// incoming ray; `front_face` remembers which side was hit.
    pub fn set(
        &mut self,
        ray: &Ray,
        t: f32,
        material: &'a Material,
        outward_normal: Vec3,
        texcoord: Vec2,
    ) {
        self.t = t;
        self.p = ray.at(t);
        self.front_face = ray.direction().dot(outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
        self.texcoord = texcoord;
        self.material = Some(material);
    }

    /// The material of the recorded hit.
    ///
    /// A hit without a material is a scene construction bug and aborts the
    /// render.
    pub fn material(&self) -> RenderResult<&'a Material> {
        self.material
            .ok_or(RenderError::UnsupportedMaterial { t: self.t })
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Intersect `ray`, updating `hit` if something closer than `hit.t` (and
    /// not closer than `t_min`) is found.
    ///
    /// Returns true only when `hit` was updated.
    fn intersect<'a>(&'a self, ray: &Ray, hit: &mut Hit<'a>, t_min: f32) -> bool;

    /// Call `visit` for every material this object can report in a hit.
    fn visit_materials(&self, visit: &mut dyn FnMut(&Material));
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo_math::Color;

    #[test]
    fn test_hit_default_is_empty() {
        let hit = Hit::new();
        assert!(hit.t.is_infinite());
        assert!(hit.material.is_none());
        assert!(matches!(
            hit.material(),
            Err(RenderError::UnsupportedMaterial { .. })
        ));
    }

    #[test]
    fn test_hit_accepts_half_open_range() {
        let mut hit = Hit::new();
        hit.t = 5.0;
        assert!(hit.accepts(1.0, 1.0));
        assert!(hit.accepts(4.99, 1.0));
        assert!(!hit.accepts(5.0, 1.0));
        assert!(!hit.accepts(0.5, 1.0));
    }

    #[test]
    fn test_set_orients_normal() {
        let mat = Material::diffuse(Color::ONE);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        let mut hit = Hit::new();
        hit.set(&ray, 4.0, &mat, -Vec3::Z, Vec2::ZERO);
        assert!(hit.front_face);
        assert_eq!(hit.normal, -Vec3::Z);
        assert_eq!(hit.p, Vec3::new(0.0, 0.0, -1.0));

        hit.set(&ray, 3.0, &mat, Vec3::Z, Vec2::ZERO);
        assert!(!hit.front_face);
        assert_eq!(hit.normal, -Vec3::Z);
    }
}
