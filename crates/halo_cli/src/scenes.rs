//! Built-in demo scenes.

use anyhow::{Context, Result};
use clap::ValueEnum;
use halo_renderer::{Camera, Color, Light, Material, Mesh, Plane, Scene, Sphere, Texture, Vec3};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SceneName {
    /// Closed diffuse box with colored side walls and a ceiling light
    Cornell,
    /// White sphere on a floor under a point light
    Sphere,
    /// Glossy tessellated sphere in front of a mirror
    Mirror,
    /// Wavefront OBJ mesh on a floor, framed automatically
    Obj,
}

/// Everything a scene builder may read from the command line.
#[derive(Debug, Clone, Default)]
pub struct SceneOptions {
    pub width: u32,
    pub height: u32,
    /// Mesh for the `obj` scene
    pub obj: Option<PathBuf>,
    /// Image mapped onto the floor (and the OBJ mesh)
    pub texture: Option<PathBuf>,
}

pub fn build(name: SceneName, options: &SceneOptions) -> Result<Scene> {
    let texture = match &options.texture {
        Some(path) => Some(Arc::new(
            Texture::load(path)
                .with_context(|| format!("failed to load texture {}", path.display()))?,
        )),
        None => None,
    };
    let (width, height) = (options.width, options.height);

    Ok(match name {
        SceneName::Cornell => cornell(width, height, texture),
        SceneName::Sphere => sphere(width, height),
        SceneName::Mirror => mirror(width, height),
        SceneName::Obj => {
            let path = options
                .obj
                .as_ref()
                .context("the obj scene needs --obj <path>")?;
            let material = Arc::new(match texture {
                Some(texture) => Material::diffuse(Color::ONE).with_texture(texture),
                None => Material::diffuse(Color::splat(0.7)),
            });
            let mesh = Mesh::load_obj(path, material)
                .with_context(|| format!("failed to load mesh {}", path.display()))?;
            obj(width, height, mesh)
        }
    })
}

fn diffuse(color: Color) -> Arc<Material> {
    Arc::new(Material::diffuse(color))
}

/// Walls are infinite planes, so the camera sits inside the box.
fn cornell(width: u32, height: u32, floor_texture: Option<Arc<Texture>>) -> Scene {
    let camera = Camera::new()
        .with_resolution(width, height)
        .with_position(Vec3::new(0.0, 1.0, 3.4), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .with_fov(40.0);

    let white = diffuse(Color::splat(0.75));
    let red = diffuse(Color::new(0.75, 0.25, 0.25));
    let blue = diffuse(Color::new(0.25, 0.25, 0.75));
    let floor_texture = floor_texture.unwrap_or_else(|| {
        Arc::new(Texture::checker(64, 8, Color::splat(0.8), Color::splat(0.6)))
    });
    let floor = Arc::new(Material::diffuse(Color::ONE).with_texture(floor_texture));

    Scene::new(camera)
        .with_object(Plane::new(Vec3::X, -1.0, red))
        .with_object(Plane::new(-Vec3::X, -1.0, blue))
        .with_object(Plane::through(Vec3::ZERO, Vec3::Y, floor).with_texture_scale(2.0))
        .with_object(Plane::new(-Vec3::Y, -2.0, white.clone()))
        .with_object(Plane::new(Vec3::Z, -1.0, white.clone()))
        .with_object(Plane::new(-Vec3::Z, -3.5, white.clone()))
        .with_object(Sphere::new(
            Vec3::new(-0.45, 0.35, -0.3),
            0.35,
            Arc::new(Material::specular(Color::splat(0.95))),
        ))
        .with_object(Sphere::new(
            Vec3::new(0.45, 0.35, 0.3),
            0.35,
            Arc::new(Material::refraction(Color::splat(0.98))),
        ))
        .with_object(Mesh::cuboid(
            Vec3::new(0.2, 0.0, -0.8),
            Vec3::new(0.7, 0.9, -0.4),
            white,
        ))
        .with_light(Light::area(
            Vec3::new(0.0, 1.98, 0.0),
            -Vec3::Y,
            0.3,
            Color::splat(12.0),
        ))
}

fn sphere(width: u32, height: u32) -> Scene {
    let camera = Camera::new()
        .with_resolution(width, height)
        .with_position(Vec3::new(0.0, 1.5, 5.0), Vec3::new(0.0, 0.8, 0.0), Vec3::Y)
        .with_fov(35.0);

    Scene::new(camera)
        .with_object(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, diffuse(Color::ONE)))
        .with_object(Plane::through(Vec3::ZERO, Vec3::Y, diffuse(Color::splat(0.5))))
        .with_light(Light::point(Vec3::new(0.0, 5.0, 0.0), Color::splat(30.0)))
        .with_background(Color::new(0.05, 0.07, 0.1))
}

fn mirror(width: u32, height: u32) -> Scene {
    let camera = Camera::new()
        .with_resolution(width, height)
        .with_position(Vec3::new(2.5, 1.2, 4.0), Vec3::new(0.0, 0.8, -0.5), Vec3::Y)
        .with_fov(45.0);

    Scene::new(camera)
        .with_object(Plane::through(
            Vec3::new(0.0, 0.0, -1.5),
            Vec3::Z,
            Arc::new(Material::specular(Color::splat(0.9))),
        ))
        .with_object(Plane::through(Vec3::ZERO, Vec3::Y, diffuse(Color::splat(0.6))))
        .with_object(Mesh::uv_sphere(
            Vec3::new(0.0, 0.8, 0.0),
            0.8,
            48,
            96,
            Arc::new(Material::microfacet(
                Color::new(0.8, 0.3, 0.1),
                Color::splat(0.04),
                0.3,
                1.5,
            )),
        ))
        .with_light(Light::spot(
            Vec3::new(1.0, 4.0, 2.0),
            Vec3::new(-1.0, -4.0, -2.0),
            Color::splat(60.0),
            35.0,
            8.0,
        ))
        .with_background(Color::new(0.2, 0.25, 0.3))
}

/// Camera and light are placed relative to the mesh bounds; the floor sits
/// under the mesh.
fn obj(width: u32, height: u32, mesh: Mesh) -> Scene {
    let bbox = mesh.bounding_box();
    let (min, max) = (bbox.min(), bbox.max());
    let center = (min + max) * 0.5;
    let size = (max - min).length().max(1e-3);

    let camera = Camera::new()
        .with_resolution(width, height)
        .with_position(center + Vec3::new(0.4, 0.5, 1.6) * size, center, Vec3::Y)
        .with_fov(35.0);

    Scene::new(camera)
        .with_object(mesh)
        .with_object(Plane::through(
            Vec3::new(0.0, min.y, 0.0),
            Vec3::Y,
            diffuse(Color::splat(0.5)),
        ))
        .with_light(Light::point(
            center + Vec3::new(0.5, 1.5, 1.0) * size,
            Color::splat(25.0 * size * size),
        ))
        .with_background(Color::new(0.05, 0.07, 0.1))
}
