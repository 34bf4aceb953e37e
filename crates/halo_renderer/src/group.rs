//! Scene aggregate: a flat list of heterogeneous primitives.

use crate::hittable::{Hit, Hittable};
use crate::Material;
use halo_math::Ray;

/// A list of hittable objects, intersected linearly.
///
/// Each primitive tightens `hit.t`, so later primitives only report hits that
/// are closer than everything tested before them.
#[derive(Default)]
pub struct Group {
    objects: Vec<Box<dyn Hittable>>,
}

impl Group {
    /// Create a new empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object to the group.
    pub fn add(&mut self, object: Box<dyn Hittable>) {
        self.objects.push(object);
    }

    /// Builder variant of [`Group::add`].
    pub fn with(mut self, object: impl Hittable + 'static) -> Self {
        self.objects.push(Box::new(object));
        self
    }

    /// Remove all objects.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Hittable for Group {
    fn intersect<'a>(&'a self, ray: &Ray, hit: &mut Hit<'a>, t_min: f32) -> bool {
        let mut hit_anything = false;
        for object in &self.objects {
            hit_anything |= object.intersect(ray, hit, t_min);
        }
        hit_anything
    }

    fn visit_materials(&self, visit: &mut dyn FnMut(&Material)) {
        for object in &self.objects {
            object.visit_materials(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sphere;
    use halo_math::{Color, Vec3};
    use std::sync::Arc;

    #[test]
    fn test_group_returns_nearest() {
        let near = Arc::new(Material::diffuse(Color::X));
        let far = Arc::new(Material::diffuse(Color::Y));
        // Far sphere added first so ordering cannot hide a bug.
        let group = Group::new()
            .with(Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0, far))
            .with(Sphere::new(Vec3::new(0.0, 0.0, -4.0), 1.0, near));

        let mut hit = Hit::new();
        assert!(group.intersect(&Ray::new(Vec3::ZERO, -Vec3::Z), &mut hit, 1e-4));
        assert!((hit.t - 3.0).abs() < 1e-4);
        assert_eq!(hit.material().unwrap().albedo(hit.texcoord), Color::X);
    }

    #[test]
    fn test_empty_group_misses() {
        let group = Group::new();
        assert!(group.is_empty());
        let mut hit = Hit::new();
        assert!(!group.intersect(&Ray::new(Vec3::ZERO, Vec3::X), &mut hit, 1e-4));
        assert!(hit.t.is_infinite());
    }

    #[test]
    fn test_visit_materials_reaches_all() {
        let mat = Arc::new(Material::diffuse(Color::ONE));
        let mut group = Group::new();
        group.add(Box::new(Sphere::new(Vec3::ZERO, 1.0, mat.clone())));
        group.add(Box::new(Sphere::new(Vec3::X * 3.0, 1.0, mat)));

        let mut count = 0;
        group.visit_materials(&mut |_| count += 1);
        assert_eq!(count, 2);
        assert_eq!(group.len(), 2);
    }
}
