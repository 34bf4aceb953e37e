//! Scene: geometry, lights and background, shared read-only by the
//! integrators.

use crate::error::RenderResult;
use crate::hittable::{Hit, Hittable};
use crate::light::{Light, LightSample};
use crate::{Camera, Group, Material};
use halo_math::{Color, Ray, Vec3};
use rand::RngCore;

/// Self-intersection offset for secondary rays.
pub const RAY_EPSILON: f32 = 1e-4;

/// Everything an integrator needs to know about the world.
pub struct Scene {
    pub camera: Camera,
    pub world: Group,
    pub lights: Vec<Light>,
    /// Radiance returned by rays that escape the scene.
    pub background: Color,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            world: Group::new(),
            lights: Vec::new(),
            background: Color::ZERO,
        }
    }

    /// Builder method to add geometry.
    pub fn with_object(mut self, object: impl Hittable + 'static) -> Self {
        self.world.add(Box::new(object));
        self
    }

    /// Builder method to add a light.
    pub fn with_light(mut self, light: Light) -> Self {
        self.lights.push(light);
        self
    }

    /// Set background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Check every material and light before any rendering starts.
    pub fn validate(&self) -> RenderResult<()> {
        let mut result = Ok(());
        self.world.visit_materials(&mut |material| {
            if result.is_ok() {
                result = material.validate();
            }
        });
        result?;

        for light in &self.lights {
            light.validate()?;
        }
        Ok(())
    }

    /// Whether any surface material emits light.
    pub fn has_emissive_surfaces(&self) -> bool {
        let mut found = false;
        self.world.visit_materials(&mut |material| {
            found |= material.emitted() != Color::ZERO;
        });
        found
    }

    /// Nearest hit along `ray`, ignoring anything closer than `t_min`.
    pub fn intersect(&self, ray: &Ray, t_min: f32) -> Option<Hit<'_>> {
        let mut hit = Hit::new();
        self.world.intersect(ray, &mut hit, t_min).then_some(hit)
    }

    /// Whether something lies strictly between `p` and a light sample.
    pub fn occluded(&self, p: Vec3, sample: &LightSample) -> bool {
        let ray = Ray::new(p, sample.direction);
        let mut hit = Hit::new();
        // Occluders at or beyond the light do not count.
        hit.t = sample.distance - RAY_EPSILON;
        self.world.intersect(&ray, &mut hit, RAY_EPSILON)
    }

    /// Reflected radiance due to light arriving straight from every light,
    /// one shadow ray each.
    pub fn direct_light(
        &self,
        hit: &Hit<'_>,
        material: &Material,
        wo: Vec3,
        rng: &mut dyn RngCore,
    ) -> Color {
        let mut total = Color::ZERO;
        for light in &self.lights {
            let sample = light.illumination(hit.p, rng);
            let cos = hit.normal.dot(sample.direction);
            if cos <= 0.0 || sample.color == Color::ZERO || self.occluded(hit.p, &sample) {
                continue;
            }
            let f = material.eval(sample.direction, wo, hit.normal, hit.texcoord);
            total += f * sample.color * cos;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sphere;
    use std::f32::consts::PI;
    use std::sync::Arc;

    fn scene() -> Scene {
        Scene::new(Camera::new())
            .with_object(Sphere::new(
                Vec3::new(0.0, 2.0, 0.0),
                0.5,
                Arc::new(Material::diffuse(Color::ONE)),
            ))
            .with_light(Light::point(Vec3::new(0.0, 4.0, 0.0), Color::ONE))
    }

    #[test]
    fn test_occlusion_strictly_between() {
        let scene = scene();
        let mut rng = crate::sampling::task_rng(0, 0, 0);
        let light = &scene.lights[0];

        let below = light.illumination(Vec3::ZERO, &mut rng);
        assert!(scene.occluded(Vec3::ZERO, &below));

        // Beside the sphere: clear path.
        let beside = light.illumination(Vec3::new(3.0, 0.0, 0.0), &mut rng);
        assert!(!scene.occluded(Vec3::new(3.0, 0.0, 0.0), &beside));

        // Light inside the blocker's shadow line but closer than it.
        let near = Light::point(Vec3::new(0.0, 1.0, 0.0), Color::ONE);
        let s = near.illumination(Vec3::ZERO, &mut rng);
        assert!(!scene.occluded(Vec3::ZERO, &s));
    }

    #[test]
    fn test_validate_reports_bad_material() {
        assert!(scene().validate().is_ok());
        let bad = scene().with_object(Sphere::new(
            Vec3::ZERO,
            1.0,
            Arc::new(Material::dielectric(Color::ONE, -1.0)),
        ));
        assert!(bad.validate().is_err());
        let bad_light = scene().with_light(Light::point(Vec3::ZERO, Color::splat(f32::NAN)));
        assert!(bad_light.validate().is_err());
    }

    #[test]
    fn test_has_emissive_surfaces() {
        assert!(!scene().has_emissive_surfaces());
        let glowing = scene().with_object(Sphere::new(
            Vec3::new(5.0, 0.0, 0.0),
            1.0,
            Arc::new(Material::diffuse(Color::splat(0.5)).with_emission(Color::splat(0.2))),
        ));
        assert!(glowing.has_emissive_surfaces());
    }

    #[test]
    fn test_intersect_miss_is_none() {
        let scene = scene();
        assert!(scene.intersect(&Ray::new(Vec3::ZERO, -Vec3::Y), 1e-4).is_none());
        let hit = scene.intersect(&Ray::new(Vec3::ZERO, Vec3::Y), 1e-4).unwrap();
        assert!((hit.t - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_direct_light_lambert() {
        let scene = Scene::new(Camera::new())
            .with_light(Light::point(Vec3::new(0.0, 2.0, 0.0), Color::splat(4.0)));
        let floor = Material::diffuse(Color::splat(0.5));
        let mut hit = Hit::new();
        hit.p = Vec3::ZERO;
        hit.normal = Vec3::Y;
        let mut rng = crate::sampling::task_rng(0, 0, 0);

        // f = 0.5/π, E = 4/2² = 1, cos = 1.
        let l = scene.direct_light(&hit, &floor, Vec3::Y, &mut rng);
        assert!((l.x - 0.5 / PI).abs() < 1e-6);

        // Facing away from the light receives nothing.
        hit.normal = -Vec3::Y;
        assert_eq!(scene.direct_light(&hit, &floor, -Vec3::Y, &mut rng), Color::ZERO);
    }
}
