//! Perspective camera for primary ray generation.

use halo_math::{Ray, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A pinhole camera with optional thin-lens depth of field.
///
/// Screen coordinates are in pixels with the origin at the bottom-left corner
/// of the image and y pointing up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "CameraSettings", into = "CameraSettings")]
pub struct Camera {
    settings: CameraSettings,

    // Cached frame (recomputed by every builder)
    u: Vec3,
    v: Vec3,
    w: Vec3,
    half_width: f32,
    half_height: f32,
}

/// User-facing camera parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub look_from: Vec3,
    pub look_at: Vec3,
    pub vup: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Lens radius; 0 disables depth of field
    pub aperture: f32,
    /// Distance from the camera to the plane of perfect focus
    pub focus_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 45.0,
            aperture: 0.0,
            focus_distance: 1.0,
        }
    }
}

impl From<CameraSettings> for Camera {
    fn from(settings: CameraSettings) -> Self {
        let mut camera = Self {
            settings,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            half_width: 1.0,
            half_height: 1.0,
        };
        camera.update();
        camera
    }
}

impl From<Camera> for CameraSettings {
    fn from(camera: Camera) -> Self {
        camera.settings
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        CameraSettings::default().into()
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.settings.width = width;
        self.settings.height = height;
        self.update();
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.settings.look_from = look_from;
        self.settings.look_at = look_at;
        self.settings.vup = vup;
        self.update();
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.settings.vfov = vfov;
        self.update();
        self
    }

    /// Enable depth of field.
    pub fn with_depth_of_field(mut self, aperture: f32, focus_distance: f32) -> Self {
        self.settings.aperture = aperture.max(0.0);
        self.settings.focus_distance = focus_distance;
        self.update();
        self
    }

    fn update(&mut self) {
        let s = &self.settings;
        let forward = (s.look_at - s.look_from).normalize_or_zero();
        if forward == Vec3::ZERO || s.width == 0 || s.height == 0 {
            log::warn!(
                "Camera: degenerate setup (look_from == look_at or empty image {}x{})",
                s.width,
                s.height
            );
        }

        self.w = -forward;
        self.u = s.vup.cross(self.w).normalize_or_zero();
        self.v = self.w.cross(self.u);

        self.half_height = (s.vfov.to_radians() / 2.0).tan();
        self.half_width = self.half_height * (s.width as f32 / s.height.max(1) as f32);
    }

    pub fn width(&self) -> u32 {
        self.settings.width
    }

    pub fn height(&self) -> u32 {
        self.settings.height
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Whether rays originate from a finite lens.
    pub fn has_depth_of_field(&self) -> bool {
        self.settings.aperture > 0.0
    }

    /// Ray through `screen` (pixel coordinates).
    ///
    /// `lens` is a point in [-1, 1]² on the lens; it is ignored without depth
    /// of field. Depth-of-field rays all pass through the point the pinhole ray
    /// meets the focal plane.
    pub fn generate_ray(&self, screen: Vec2, lens: Vec2) -> Ray {
        let s = &self.settings;
        let ndc = Vec2::new(
            2.0 * screen.x / s.width.max(1) as f32 - 1.0,
            2.0 * screen.y / s.height.max(1) as f32 - 1.0,
        );
        // Forward component is 1, so the focal point is at `focus_distance`
        // along the view axis.
        let direction =
            -self.w + self.u * (ndc.x * self.half_width) + self.v * (ndc.y * self.half_height);

        if !self.has_depth_of_field() {
            return Ray::new(s.look_from, direction);
        }

        let focal_point = s.look_from + direction * s.focus_distance;
        let origin = s.look_from + (self.u * lens.x + self.v * lens.y) * s.aperture;
        Ray::new(origin, focal_point - origin)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new()
            .with_resolution(200, 100)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_fov(90.0)
    }

    #[test]
    fn test_center_ray_points_forward() {
        let ray = camera().generate_ray(Vec2::new(100.0, 50.0), Vec2::ZERO);
        assert_eq!(ray.origin(), Vec3::ZERO);
        assert!((ray.direction() - -Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_screen_orientation() {
        let cam = camera();
        // y up: the top edge looks up, the right edge looks right.
        let top = cam.generate_ray(Vec2::new(100.0, 100.0), Vec2::ZERO);
        assert!(top.direction().y > 0.0);
        let right = cam.generate_ray(Vec2::new(200.0, 50.0), Vec2::ZERO);
        assert!(right.direction().x > 0.0);

        // 90 degree vertical fov: the top edge is 45 degrees up.
        let angle = top.direction().dot(-Vec3::Z).acos().to_degrees();
        assert!((angle - 45.0).abs() < 1e-3);
    }

    #[test]
    fn test_depth_of_field_converges_at_focus() {
        let cam = camera().with_depth_of_field(0.2, 3.0);
        assert!(cam.has_depth_of_field());
        let screen = Vec2::new(130.0, 70.0);
        let pinhole = camera().generate_ray(screen, Vec2::ZERO);

        for lens in [Vec2::new(1.0, 0.0), Vec2::new(-0.5, 0.7), Vec2::new(0.3, -1.0)] {
            let ray = cam.generate_ray(screen, lens);
            assert!(ray.origin() != Vec3::ZERO);
            // Every lens ray crosses the focal plane z = -3 where the pinhole ray does.
            let t = (-3.0 - ray.origin().z) / ray.direction().z;
            let tp = -3.0 / pinhole.direction().z;
            assert!((ray.at(t) - pinhole.at(tp)).length() < 1e-4);
        }
    }

    #[test]
    fn test_settings_serde() {
        let cam = camera().with_depth_of_field(0.1, 2.0);
        let json = serde_json::to_string(&cam).unwrap();
        let back: Camera = serde_json::from_str(&json).unwrap();
        assert_eq!(back.settings(), cam.settings());
    }
}
