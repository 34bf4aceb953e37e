//! Halo renderer - CPU light transport.
//!
//! Two Monte Carlo integrators share one scene representation:
//!
//! - [`path`]: unidirectional path tracing with Russian roulette
//! - [`sppm`]: stochastic progressive photon mapping
//!
//! Geometry is intersected through the [`Hittable`] contract. Triangle meshes
//! sit behind a [`Bvh`], and photons are gathered from a [`KdTree`].

pub mod bucket;
pub mod bvh;
pub mod camera;
pub mod config;
pub mod error;
pub mod film;
pub mod group;
pub mod hittable;
pub mod kdtree;
pub mod light;
pub mod material;
pub mod mesh;
pub mod microfacet;
pub mod path;
pub mod plane;
pub mod sampling;
pub mod scene;
pub mod sphere;
pub mod sppm;
pub mod texture;
pub mod triangle;

pub use bvh::{Bvh, BvhStats, LEAF_THRESHOLD};
pub use camera::{Camera, CameraSettings};
pub use config::{RenderConfig, SppmConfig};
pub use error::{RenderError, RenderResult};
pub use film::Film;
pub use group::Group;
pub use hittable::{Hit, Hittable};
pub use kdtree::{KdPoint, KdTree};
pub use light::{Light, LightSample, PhotonEmission};
pub use material::{Material, MaterialKind};
pub use mesh::Mesh;
pub use path::PathTracer;
pub use plane::Plane;
pub use scene::Scene;
pub use sphere::Sphere;
pub use sppm::{Photon, Sppm};
pub use texture::Texture;
pub use triangle::Triangle;

/// Re-export the math types the public API is written in.
pub use halo_math::{Aabb, Color, Interval, Ray, Vec2, Vec3};
