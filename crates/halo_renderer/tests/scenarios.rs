//! End-to-end renders of small scenes with known answers.

use halo_renderer::{
    path, sppm, Camera, Color, Film, Light, Material, Plane, RenderConfig, Scene, Sphere,
    SppmConfig, Vec2, Vec3,
};
use std::sync::Arc;

fn diffuse(color: Color) -> Arc<Material> {
    Arc::new(Material::diffuse(color))
}

/// Center ray of pixel `(x, y)`, first hit if any.
fn center_hit(scene: &Scene, x: f32, y: f32) -> Option<(Vec3, Vec3)> {
    let ray = scene.camera.generate_ray(Vec2::new(x, y), Vec2::ZERO);
    scene.intersect(&ray, 1e-4).map(|hit| (hit.p, hit.normal))
}

#[test]
fn test_point_lit_sphere() {
    let light = Vec3::new(0.0, 5.0, 0.0);
    let scene = Scene::new(
        Camera::new()
            .with_resolution(48, 48)
            .with_position(Vec3::new(0.0, 4.0, 4.0), Vec3::new(0.0, 0.2, 0.0), Vec3::Y)
            .with_fov(35.0),
    )
    .with_object(Sphere::new(Vec3::ZERO, 1.0, diffuse(Color::ONE)))
    .with_light(Light::point(light, Color::splat(20.0)));

    // Depth 1: direct light only.
    let config = RenderConfig::default().with_samples(4).with_depths(1, 1);
    let film = path::render(&scene, &config).unwrap();

    let mut brightest = (0, 0);
    for y in 0..film.height() {
        for x in 0..film.width() {
            if film.get(x, y).x > film.get(brightest.0, brightest.1).x {
                brightest = (x, y);
            }
        }
    }
    let (p, n) = center_hit(&scene, brightest.0 as f32 + 0.5, brightest.1 as f32 + 0.5)
        .expect("brightest pixel must see the sphere");
    let toward_light = (light - p).normalize();
    assert!(
        n.dot(toward_light) > 0.98,
        "brightest pixel {:?} has normal {:?}",
        brightest,
        n
    );

    // Pixels whose whole filter footprint misses the sphere, or lands on the
    // side facing away from the light, are background.
    let mut dark = 0;
    let mut empty = 0;
    for y in 0..film.height() {
        for x in 0..film.width() {
            let footprint: Vec<_> = (0..25)
                .map(|i| {
                    let sx = x as f32 - 0.5 + (i % 5) as f32 * 0.5;
                    let sy = y as f32 - 0.5 + (i / 5) as f32 * 0.5;
                    center_hit(&scene, sx, sy)
                })
                .collect();
            if footprint.iter().all(Option::is_none) {
                assert_eq!(film.get(x, y), scene.background);
                empty += 1;
            } else if footprint
                .iter()
                .all(|h| matches!(h, Some((p, n)) if n.dot((light - *p).normalize()) < -0.02))
            {
                assert_eq!(film.get(x, y), scene.background, "shadowed pixel ({}, {})", x, y);
                dark += 1;
            }
        }
    }
    assert!(dark > 10, "only {} shadowed pixels checked", dark);
    assert!(empty > 10);
}

#[test]
fn test_mirror_reflects_sphere() {
    // The mirror is the plane x = 0 and the camera sits just in front of it,
    // looking along it. Column c sees directly what column W-1-c sees in the
    // mirror.
    let eye = Vec3::new(1e-3, 0.0, 5.0);
    let emission = Color::new(0.9, 0.4, 0.1);
    let scene = Scene::new(
        Camera::new()
            .with_resolution(64, 32)
            .with_position(eye, Vec3::new(eye.x, 0.0, 0.0), Vec3::Y)
            .with_fov(40.0),
    )
    .with_object(Plane::new(
        Vec3::X,
        0.0,
        Arc::new(Material::specular(Color::ONE)),
    ))
    .with_object(Sphere::new(
        Vec3::new(1.2, 0.0, 0.0),
        0.6,
        Arc::new(Material::emission(emission)),
    ))
    .with_background(Color::new(0.1, 0.2, 0.3));

    let film = path::render(&scene, &RenderConfig::default().with_samples(4)).unwrap();
    let (w, h) = (film.width(), film.height());
    let exact = |x: u32, y: u32| (film.get(x, y) - emission).abs().max_element() < 1e-5;

    let mut interior = 0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w / 2 {
            let direct = film.get(w - 1 - x, y);
            let mirrored = film.get(x, y);
            sum_sq += (direct - mirrored).length_squared();

            let (dx, dy) = (w - 1 - x, y);
            if dx + 1 < w
                && dy > 0
                && dy + 1 < h
                && (dx - 1..=dx + 1).all(|i| (dy - 1..=dy + 1).all(|j| exact(i, j)))
            {
                assert!(
                    (mirrored - emission).abs().max_element() < 1e-4,
                    "mirrored pixel ({}, {}) is {:?}",
                    x,
                    y,
                    mirrored
                );
                interior += 1;
            }
        }
    }
    assert!(interior > 10, "only {} interior sphere pixels", interior);

    // Silhouette pixels differ only by filter noise.
    let rms = (sum_sq / (3 * (w / 2) * h) as f32).sqrt();
    assert!(rms < 0.05, "mirror rms {}", rms);
}

/// Closed box with a red wall at x = -1 and a blue wall at x = +1, seen from
/// just under the ceiling looking straight down at the white floor.
fn color_bleed_box() -> Scene {
    let white = diffuse(Color::splat(0.75));
    Scene::new(
        Camera::new()
            .with_resolution(16, 16)
            .with_position(Vec3::new(0.0, 1.9, 0.0), Vec3::ZERO, Vec3::Z)
            .with_fov(50.0),
    )
    .with_object(Plane::new(Vec3::X, -1.0, diffuse(Color::new(0.75, 0.25, 0.25))))
    .with_object(Plane::new(-Vec3::X, -1.0, diffuse(Color::new(0.25, 0.25, 0.75))))
    .with_object(Plane::new(Vec3::Y, 0.0, white.clone()))
    .with_object(Plane::new(-Vec3::Y, -2.0, white.clone()))
    .with_object(Plane::new(Vec3::Z, -1.0, white.clone()))
    .with_object(Plane::new(-Vec3::Z, -1.0, white))
    .with_light(Light::point(Vec3::new(0.0, 1.8, 0.0), Color::splat(3.0)))
}

/// Mean red-minus-blue over floor pixels on each side of the box.
fn bleed(scene: &Scene, film: &Film) -> (f32, f32) {
    let (mut left, mut right) = ((0.0, 0), (0.0, 0));
    for y in 0..film.height() {
        for x in 0..film.width() {
            let Some((p, _)) = center_hit(scene, x as f32 + 0.5, y as f32 + 0.5) else {
                continue;
            };
            let c = film.get(x, y);
            if p.x < -0.3 {
                left = (left.0 + c.x - c.z, left.1 + 1);
            } else if p.x > 0.3 {
                right = (right.0 + c.x - c.z, right.1 + 1);
            }
        }
    }
    assert!(left.1 > 0 && right.1 > 0);
    (left.0 / left.1 as f32, right.0 / right.1 as f32)
}

/// Average over `block`×`block` tiles.
fn downsample(film: &Film, block: u32) -> Film {
    let (width, height) = (film.width() / block, film.height() / block);
    let mut tiles = Film::new(width, height);
    for ty in 0..height {
        for tx in 0..width {
            let mut sum = Color::ZERO;
            for y in 0..block {
                for x in 0..block {
                    sum += film.get(tx * block + x, ty * block + y);
                }
            }
            tiles.set(tx, ty, sum / (block * block) as f32);
        }
    }
    tiles
}

#[test]
fn test_photon_mapping_matches_path_tracing() {
    let scene = color_bleed_box();

    let traced = path::render(
        &scene,
        &RenderConfig::default().with_samples(32).with_depths(3, 20).with_seed(4),
    )
    .unwrap();
    let mapped = sppm::render(
        &scene,
        &SppmConfig::default()
            .with_iterations(16)
            .with_photons(20_000)
            .with_radius(0.2)
            .with_seed(4),
    )
    .unwrap();

    // The white floor picks up red near the red wall and blue near the blue
    // wall only through indirect light.
    let (left, right) = bleed(&scene, &mapped);
    assert!(left > 0.0 && right < 0.0, "sppm bleed {} {}", left, right);
    assert!(left - right > 0.01, "sppm bleed {} {}", left, right);
    let (left, right) = bleed(&scene, &traced);
    assert!(left - right > 0.01, "path bleed {} {}", left, right);

    let rms = downsample(&traced, 4)
        .rms_difference(&downsample(&mapped, 4))
        .expect("same tile grid");
    assert!(rms < 0.06, "tile rms {}", rms);

    let (ma, mb) = (traced.average(), mapped.average());
    assert!(
        (ma - mb).abs().max_element() < 0.12 * ma.max_element(),
        "means {:?} {:?}",
        ma,
        mb
    );
}
