//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::hittable::{Hit, Hittable};
use crate::Material;
use halo_math::{Aabb, Ray, Vec2, Vec3};
use std::sync::Arc;

/// A triangle primitive.
#[derive(Clone, Debug)]
pub struct Triangle {
    vertices: [Vec3; 3],
    texcoords: [Vec2; 3],
    /// Pre-computed face normal (unit length)
    normal: Vec3,
    material: Arc<Material>,
}

impl Triangle {
    /// Create a new triangle from three vertices (counter-clockwise front face).
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: Arc<Material>) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self {
            vertices: [v0, v1, v2],
            texcoords: [Vec2::ZERO, Vec2::X, Vec2::Y],
            normal,
            material,
        }
    }

    /// Builder method to set per-vertex texture coordinates.
    pub fn with_texcoords(mut self, texcoords: [Vec2; 3]) -> Self {
        self.texcoords = texcoords;
        self
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.vertices
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::enclosing(self.vertices)
    }
}

impl Hittable for Triangle {
    /// Möller-Trumbore ray-triangle intersection algorithm.
    fn intersect<'a>(&'a self, ray: &Ray, hit: &mut Hit<'a>, t_min: f32) -> bool {
        let [v0, v1, v2] = self.vertices;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle (or the triangle is degenerate)
        if a.abs() < 1e-8 {
            return false;
        }

        let f = 1.0 / a;
        let s = ray.origin() - v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = f * edge2.dot(q);
        if !hit.accepts(t, t_min) {
            return false;
        }

        let [t0, t1, t2] = self.texcoords;
        let texcoord = t0 * (1.0 - u - v) + t1 * u + t2 * v;
        hit.set(ray, t, &self.material, self.normal, texcoord);
        true
    }

    fn visit_materials(&self, visit: &mut dyn FnMut(&Material)) {
        visit(&*self.material);
    }
}
