//! Materials and BRDF sampling.
//!
//! A [`Material`] is a closed sum over the transport kinds the integrators know
//! how to handle, plus an emission term and an optional albedo texture.

use crate::error::{RenderError, RenderResult};
use crate::microfacet::{
    beckmann_d, beckmann_reflect_pdf, normal_reflectance, reflect, sample_beckmann_half, schlick,
    smith_g1,
};
use crate::sampling::{cosine_hemisphere, gen_f32};
use crate::texture::Texture;
use halo_math::{Color, Vec2, Vec3};
use rand::RngCore;
use std::f32::consts::FRAC_1_PI;
use std::sync::Arc;

/// Index of refraction used by [`Material::refraction`].
pub const DEFAULT_IOR: f32 = 1.5;

/// Transport behaviour of a surface.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Lambertian reflector.
    Diffuse { albedo: Color },
    /// Perfect mirror.
    Specular { albedo: Color },
    /// Smooth dielectric (glass) with Fresnel-weighted reflection and refraction.
    Refraction { albedo: Color, ior: f32 },
    /// Diffuse base plus a Beckmann glossy lobe.
    Microfacet {
        diffuse: Color,
        specular: Color,
        roughness: f32,
        ior: f32,
    },
    /// Pure emitter; terminates paths.
    Emission,
}

/// A surface material.
#[derive(Debug, Clone)]
pub struct Material {
    pub kind: MaterialKind,
    pub emission: Color,
    texture: Option<Arc<Texture>>,
}

/// Result of importance-sampling a non-delta lobe.
#[derive(Debug, Clone, Copy)]
pub struct ScatterSample {
    /// Incoming direction (pointing away from the surface).
    pub wi: Vec3,
    /// `f · cosθi / pdf`: the factor the path throughput is multiplied by.
    pub weight: Color,
}

/// Geometry of a ray crossing a smooth dielectric boundary.
#[derive(Debug, Clone, Copy)]
pub struct DielectricEvent {
    pub reflected: Vec3,
    /// `None` under total internal reflection.
    pub refracted: Option<Vec3>,
    /// Fresnel reflectance `Re` (1 under total internal reflection).
    pub reflectance: f32,
}

impl DielectricEvent {
    /// Fresnel transmittance `Tr = 1 - Re`.
    pub fn transmittance(&self) -> f32 {
        1.0 - self.reflectance
    }

    /// Probability of following the reflected branch when only one branch
    /// is traced.
    pub fn reflect_probability(&self) -> f32 {
        0.25 + 0.5 * self.reflectance
    }
}

impl Material {
    fn from_kind(kind: MaterialKind) -> Self {
        Self {
            kind,
            emission: Color::ZERO,
            texture: None,
        }
    }

    pub fn diffuse(albedo: Color) -> Self {
        Self::from_kind(MaterialKind::Diffuse { albedo })
    }

    pub fn specular(albedo: Color) -> Self {
        Self::from_kind(MaterialKind::Specular { albedo })
    }

    /// Glass with the default index of refraction.
    pub fn refraction(albedo: Color) -> Self {
        Self::dielectric(albedo, DEFAULT_IOR)
    }

    pub fn dielectric(albedo: Color, ior: f32) -> Self {
        Self::from_kind(MaterialKind::Refraction { albedo, ior })
    }

    /// Glossy material.
    ///
    /// - `roughness`: Beckmann slope, small values approach a mirror
    /// - `ior`: drives the Fresnel term of the glossy lobe
    pub fn microfacet(diffuse: Color, specular: Color, roughness: f32, ior: f32) -> Self {
        Self::from_kind(MaterialKind::Microfacet {
            diffuse,
            specular,
            roughness,
            ior,
        })
    }

    /// Pure emitter.
    pub fn emission(color: Color) -> Self {
        Self {
            kind: MaterialKind::Emission,
            emission: color,
            texture: None,
        }
    }

    /// Builder method to add emission to any material.
    pub fn with_emission(mut self, color: Color) -> Self {
        self.emission = color;
        self
    }

    /// Builder method to attach an albedo texture.
    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Short name of the transport kind, for logs and errors.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            MaterialKind::Diffuse { .. } => "diffuse",
            MaterialKind::Specular { .. } => "specular",
            MaterialKind::Refraction { .. } => "refraction",
            MaterialKind::Microfacet { .. } => "microfacet",
            MaterialKind::Emission => "emission",
        }
    }

    /// Whether albedo lookups go through a texture.
    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    /// Surfaces where SPPM stores photons and anchors visible points.
    pub fn is_diffuse_like(&self) -> bool {
        matches!(
            self.kind,
            MaterialKind::Diffuse { .. } | MaterialKind::Microfacet { .. }
        )
    }

    /// Emitted radiance.
    #[inline]
    pub fn emitted(&self) -> Color {
        self.emission
    }

    /// Base color at a texture coordinate. A texture replaces the constant albedo.
    pub fn albedo(&self, uv: Vec2) -> Color {
        if let Some(texture) = &self.texture {
            return texture.sample(uv);
        }
        match self.kind {
            MaterialKind::Diffuse { albedo }
            | MaterialKind::Specular { albedo }
            | MaterialKind::Refraction { albedo, .. } => albedo,
            MaterialKind::Microfacet { diffuse, .. } => diffuse,
            MaterialKind::Emission => Color::ZERO,
        }
    }

    /// Upper bound on the fraction of energy one bounce keeps; drives Russian
    /// roulette.
    pub fn reflectance(&self, uv: Vec2) -> Color {
        match self.kind {
            MaterialKind::Microfacet { specular, .. } => {
                (self.albedo(uv) + specular).min(Color::ONE)
            }
            _ => self.albedo(uv),
        }
    }

    /// Check that the parameters describe a transportable surface.
    pub fn validate(&self) -> RenderResult<()> {
        let kind = self.kind_name();
        let invalid = |reason: String| RenderError::InvalidMaterial { kind, reason };
        let check_color = |name: &str, c: Color| {
            if c.is_finite() && c.min_element() >= 0.0 {
                Ok(())
            } else {
                Err(invalid(format!("{} {:?} must be finite and non-negative", name, c)))
            }
        };

        check_color("emission", self.emission)?;
        match self.kind {
            MaterialKind::Diffuse { albedo } | MaterialKind::Specular { albedo } => {
                check_color("albedo", albedo)
            }
            MaterialKind::Refraction { albedo, ior } => {
                check_color("albedo", albedo)?;
                if !(ior.is_finite() && ior > 0.0) {
                    return Err(invalid(format!("ior {} must be positive", ior)));
                }
                Ok(())
            }
            MaterialKind::Microfacet {
                diffuse,
                specular,
                roughness,
                ior,
            } => {
                check_color("diffuse", diffuse)?;
                check_color("specular", specular)?;
                if !(roughness.is_finite() && roughness > 0.0) {
                    return Err(invalid(format!("roughness {} must be positive", roughness)));
                }
                if !(ior.is_finite() && ior > 0.0) {
                    return Err(invalid(format!("ior {} must be positive", ior)));
                }
                Ok(())
            }
            MaterialKind::Emission => Ok(()),
        }
    }

    /// Importance-sample an incoming direction for the outgoing direction `wo`
    /// at a surface with (front-facing) normal `n`.
    ///
    /// Delta lobes return their single direction. Returns `None` for emitters
    /// and for glossy samples that end up below the surface.
    pub fn sample(&self, wo: Vec3, n: Vec3, uv: Vec2, rng: &mut dyn RngCore) -> Option<Vec3> {
        self.scatter(wo, n, uv, rng).map(|s| s.wi)
    }

    /// BRDF value `f(wi, wo)`. Delta lobes evaluate to zero.
    pub fn eval(&self, wi: Vec3, wo: Vec3, n: Vec3, uv: Vec2) -> Color {
        let cos_i = wi.dot(n);
        let cos_o = wo.dot(n);
        if cos_i <= 0.0 || cos_o <= 0.0 {
            return Color::ZERO;
        }
        match self.kind {
            MaterialKind::Diffuse { .. } => self.albedo(uv) * FRAC_1_PI,
            MaterialKind::Microfacet {
                specular,
                roughness,
                ior,
                ..
            } => {
                let h = (wi + wo).normalize_or_zero();
                if h == Vec3::ZERO {
                    return self.albedo(uv) * FRAC_1_PI;
                }
                let d = beckmann_d(h.dot(n), roughness);
                let f = schlick(normal_reflectance(ior), wi.dot(h));
                let g = smith_g1(wi, h, n, roughness) * smith_g1(wo, h, n, roughness);
                self.albedo(uv) * FRAC_1_PI + specular * (d * f * g / (4.0 * cos_i * cos_o))
            }
            _ => Color::ZERO,
        }
    }

    /// Solid-angle density of [`Material::sample`] for non-delta lobes.
    pub fn pdf(&self, wi: Vec3, wo: Vec3, n: Vec3, uv: Vec2) -> f32 {
        let cos_i = wi.dot(n);
        if cos_i <= 0.0 {
            return 0.0;
        }
        match self.kind {
            MaterialKind::Diffuse { .. } => cos_i * FRAC_1_PI,
            MaterialKind::Microfacet {
                specular, roughness, ..
            } => {
                let p_diffuse = diffuse_lobe_probability(self.albedo(uv), specular);
                let h = (wi + wo).normalize_or_zero();
                let glossy = if h == Vec3::ZERO {
                    0.0
                } else {
                    beckmann_reflect_pdf(wo, h, n, roughness)
                };
                p_diffuse * cos_i * FRAC_1_PI + (1.0 - p_diffuse) * glossy
            }
            _ => 0.0,
        }
    }

    /// Sample a direction together with its throughput weight.
    ///
    /// Diffuse: cosine sampling, weight = albedo. Specular: mirror, weight =
    /// albedo. Microfacet: stochastic lobe choice, weight = `f·cos/pdf` of the
    /// lobe mixture. Refraction is handled by [`Material::dielectric_event`] because
    /// the integrators decide whether to split or pick a branch.
    pub fn scatter(
        &self,
        wo: Vec3,
        n: Vec3,
        uv: Vec2,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterSample> {
        match self.kind {
            MaterialKind::Diffuse { .. } => Some(ScatterSample {
                wi: cosine_hemisphere(n, rng),
                weight: self.albedo(uv),
            }),
            MaterialKind::Specular { .. } => Some(ScatterSample {
                wi: reflect(wo, n),
                weight: self.albedo(uv),
            }),
            MaterialKind::Microfacet {
                specular, roughness, ..
            } => {
                let diffuse = self.albedo(uv);
                if diffuse == Color::ZERO && specular == Color::ZERO {
                    return None;
                }
                let wi = if gen_f32(rng) < diffuse_lobe_probability(diffuse, specular) {
                    cosine_hemisphere(n, rng)
                } else {
                    reflect(wo, sample_beckmann_half(n, roughness, rng))
                };
                let cos_i = wi.dot(n);
                let pdf = self.pdf(wi, wo, n, uv);
                if cos_i <= 0.0 || pdf <= 0.0 {
                    return None;
                }
                Some(ScatterSample {
                    wi,
                    weight: self.eval(wi, wo, n, uv) * (cos_i / pdf),
                })
            }
            MaterialKind::Refraction { .. } | MaterialKind::Emission => None,
        }
    }

    /// Reflection/refraction geometry at a dielectric boundary.
    ///
    /// `d` is the incoming ray direction, `n` the normal oriented against it and
    /// `front_face` whether the ray enters the material. Materials without an
    /// ior are treated as glass.
    pub fn dielectric_event(&self, d: Vec3, n: Vec3, front_face: bool) -> DielectricEvent {
        let ior = match self.kind {
            MaterialKind::Refraction { ior, .. } | MaterialKind::Microfacet { ior, .. } => ior,
            _ => DEFAULT_IOR,
        };
        refract_event(d, n, front_face, ior)
    }
}

/// Probability of the diffuse lobe, proportional to the lobe magnitudes.
fn diffuse_lobe_probability(diffuse: Color, specular: Color) -> f32 {
    let kd = diffuse.length();
    let ks = specular.length();
    if kd + ks <= 0.0 {
        return 0.0;
    }
    kd / (kd + ks)
}

/// Snell refraction with a Schlick Fresnel term.
fn refract_event(d: Vec3, nl: Vec3, into: bool, ior: f32) -> DielectricEvent {
    let reflected = d - 2.0 * d.dot(nl) * nl;
    let eta = if into { 1.0 / ior } else { ior };
    let ddn = d.dot(nl);
    let cos2t = 1.0 - eta * eta * (1.0 - ddn * ddn);
    if cos2t < 0.0 {
        return DielectricEvent {
            reflected,
            refracted: None,
            reflectance: 1.0,
        };
    }

    let refracted = (d * eta - nl * (ddn * eta + cos2t.sqrt())).normalize();
    // Cosine on the outside (lower-index) side of the interface.
    let c = if into { -ddn } else { -refracted.dot(nl) };
    let reflectance = schlick(normal_reflectance(ior), c);

    DielectricEvent {
        reflected,
        refracted: Some(refracted),
        reflectance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::task_rng;
    use std::f32::consts::PI;

    const UV: Vec2 = Vec2::ZERO;

    #[test]
    fn test_diffuse_eval_and_weight() {
        let mat = Material::diffuse(Color::new(0.5, 0.25, 1.0));
        let n = Vec3::Y;
        let f = mat.eval(Vec3::Y, Vec3::new(0.0, 1.0, 1.0).normalize(), n, UV);
        assert!((f - Color::new(0.5, 0.25, 1.0) / PI).length() < 1e-6);

        let mut rng = task_rng(0, 0, 0);
        let s = mat.scatter(Vec3::Y, n, UV, &mut rng).unwrap();
        assert!(s.wi.dot(n) >= 0.0);
        assert_eq!(s.weight, Color::new(0.5, 0.25, 1.0));
    }

    #[test]
    fn test_specular_is_mirror() {
        let mat = Material::specular(Color::ONE);
        let wo = Vec3::new(1.0, 1.0, 0.0).normalize();
        let mut rng = task_rng(0, 0, 0);
        let wi = mat.sample(wo, Vec3::Y, UV, &mut rng).unwrap();
        assert!((wi - Vec3::new(-1.0, 1.0, 0.0).normalize()).length() < 1e-6);
        assert_eq!(mat.eval(wi, wo, Vec3::Y, UV), Color::ZERO);
    }

    #[test]
    fn test_dielectric_normal_incidence() {
        let mat = Material::refraction(Color::ONE);
        let ev = mat.dielectric_event(-Vec3::Y, Vec3::Y, true);
        assert!((ev.reflectance - 0.04).abs() < 1e-5);
        let t = ev.refracted.unwrap();
        assert!((t - (-Vec3::Y)).length() < 1e-5);
        assert!((ev.reflect_probability() - (0.25 + 0.5 * 0.04)).abs() < 1e-6);
        assert!((ev.transmittance() - 0.96).abs() < 1e-5);
    }

    #[test]
    fn test_dielectric_snell() {
        let mat = Material::refraction(Color::ONE);
        let d = Vec3::new(1.0, -1.0, 0.0).normalize();
        let ev = mat.dielectric_event(d, Vec3::Y, true);
        let t = ev.refracted.unwrap();
        let sin_i = d.cross(Vec3::Y).length();
        let sin_t = t.cross(Vec3::Y).length();
        assert!((sin_i - 1.5 * sin_t).abs() < 1e-4);
        assert!(ev.reflectance > 0.04 && ev.reflectance < 1.0);
    }

    #[test]
    fn test_total_internal_reflection() {
        let mat = Material::refraction(Color::ONE);
        // Leaving glass at a grazing angle: normal is flipped to face the ray.
        let d = Vec3::new(1.0, 0.2, 0.0).normalize();
        let ev = mat.dielectric_event(d, -Vec3::Y, false);
        assert!(ev.refracted.is_none());
        assert_eq!(ev.reflectance, 1.0);
        assert!((ev.reflected - Vec3::new(1.0, -0.2, 0.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn test_microfacet_sampling_matches_eval() {
        // ∫ f cos dω estimated two ways: uniform hemisphere vs importance sampling.
        let mat = Material::microfacet(Color::splat(0.4), Color::splat(0.5), 0.3, 1.5);
        let n = Vec3::Z;
        let wo = Vec3::new(0.4, 0.0, 1.0).normalize();
        let mut rng = task_rng(21, 0, 0);
        let count = 200_000;

        let mut uniform = 0.0;
        for _ in 0..count {
            let z = gen_f32(&mut rng);
            let r = (1.0 - z * z).max(0.0).sqrt();
            let phi = 2.0 * PI * gen_f32(&mut rng);
            let wi = Vec3::new(r * phi.cos(), r * phi.sin(), z);
            uniform += mat.eval(wi, wo, n, UV).x * z * 2.0 * PI;
        }
        uniform /= count as f32;

        let mut importance = 0.0;
        for _ in 0..count {
            if let Some(s) = mat.scatter(wo, n, UV, &mut rng) {
                assert!(s.weight.is_finite());
                importance += s.weight.x;
            }
        }
        importance /= count as f32;

        assert!(
            (uniform - importance).abs() < 0.03,
            "uniform {} vs importance {}",
            uniform,
            importance
        );
        assert!(importance < 1.0);
    }

    #[test]
    fn test_texture_overrides_albedo() {
        let tex = Arc::new(Texture::solid_color(Color::new(0.1, 0.2, 0.3)));
        let mat = Material::diffuse(Color::ONE).with_texture(tex);
        assert!(mat.has_texture());
        assert!((mat.albedo(UV) - Color::new(0.1, 0.2, 0.3)).length() < 1e-6);
        assert!(!Material::diffuse(Color::ONE).has_texture());
    }

    #[test]
    fn test_validate() {
        assert!(Material::diffuse(Color::splat(0.5)).validate().is_ok());
        assert!(Material::emission(Color::splat(10.0)).validate().is_ok());
        assert!(Material::diffuse(Color::new(-0.1, 0.0, 0.0)).validate().is_err());
        assert!(Material::dielectric(Color::ONE, 0.0).validate().is_err());
        assert!(Material::microfacet(Color::ONE, Color::ONE, 0.0, 1.5)
            .validate()
            .is_err());
        assert!(Material::diffuse(Color::ONE)
            .with_emission(Color::splat(f32::NAN))
            .validate()
            .is_err());
    }
}
