//! Infinite plane primitive `n·x = d`.

use crate::hittable::{Hit, Hittable};
use crate::sampling::orthonormal_basis;
use crate::Material;
use halo_math::{Ray, Vec2, Vec3};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Plane {
    normal: Vec3,
    d: f32,
    material: Arc<Material>,
    /// World units per texture repeat
    texture_scale: f32,
}

impl Plane {
    /// Plane with unit `normal` at signed offset `d` from the origin.
    pub fn new(normal: Vec3, d: f32, material: Arc<Material>) -> Self {
        let len = normal.length();
        let (normal, d) = if len > 0.0 {
            (normal / len, d / len)
        } else {
            (Vec3::Y, d)
        };
        Self {
            normal,
            d,
            material,
            texture_scale: 1.0,
        }
    }

    /// Plane through `point` with the given normal.
    pub fn through(point: Vec3, normal: Vec3, material: Arc<Material>) -> Self {
        let n = normal.normalize_or_zero();
        Self::new(n, n.dot(point), material)
    }

    /// Builder method to set the texture repeat size.
    pub fn with_texture_scale(mut self, scale: f32) -> Self {
        self.texture_scale = scale.max(f32::EPSILON);
        self
    }
}

impl Hittable for Plane {
    fn intersect<'a>(&'a self, ray: &Ray, hit: &mut Hit<'a>, t_min: f32) -> bool {
        let denom = self.normal.dot(ray.direction());
        if denom.abs() < 1e-8 {
            return false;
        }
        let t = (self.d - self.normal.dot(ray.origin())) / denom;
        if !hit.accepts(t, t_min) {
            return false;
        }

        let p = ray.at(t);
        let (u, v) = orthonormal_basis(self.normal);
        let texcoord = Vec2::new(p.dot(u), p.dot(v)) / self.texture_scale;
        hit.set(ray, t, &self.material, self.normal, texcoord);
        true
    }

    fn visit_materials(&self, visit: &mut dyn FnMut(&Material)) {
        visit(&*self.material);
    }
}
