//! Sphere primitive for ray tracing.

use crate::hittable::{Hit, Hittable};
use crate::Material;
use halo_math::{Ray, Vec2, Vec3};
use std::f32::consts::PI;
use std::sync::Arc;

/// A sphere primitive.
#[derive(Clone, Debug)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: Arc<Material>,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Vec3, radius: f32, material: Arc<Material>) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
            material,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Get the UV coordinates for a point on the unit sphere.
    fn sphere_uv(p: Vec3) -> Vec2 {
        // theta: angle down from +Y, phi: angle around Y from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        Vec2::new(phi / (2.0 * PI), theta / PI)
    }
}

impl Hittable for Sphere {
    fn intersect<'a>(&'a self, ray: &Ray, hit: &mut Hit<'a>, t_min: f32) -> bool {
        // Direction is unit length, so the quadratic's `a` term is 1.
        let oc = self.center - ray.origin();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - c;
        if discriminant < 0.0 {
            return false;
        }
        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = h - sqrtd;
        if !hit.accepts(root, t_min) {
            root = h + sqrtd;
            if !hit.accepts(root, t_min) {
                return false;
            }
        }

        let outward_normal = (ray.at(root) - self.center) / self.radius;
        hit.set(
            ray,
            root,
            &self.material,
            outward_normal,
            Self::sphere_uv(outward_normal),
        );
        true
    }

    fn visit_materials(&self, visit: &mut dyn FnMut(&Material)) {
        visit(&*self.material);
    }
}
