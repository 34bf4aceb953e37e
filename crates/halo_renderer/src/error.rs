//! Error types for scene validation and rendering.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a render.
///
/// Only configuration problems are errors. Misses, empty photon queries and
/// degenerate geometry are ordinary outcomes and never surface here.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A primitive reported an intersection without a material attached.
    #[error("Unsupported material at hit (t = {t}): primitive has no material")]
    UnsupportedMaterial { t: f32 },

    /// A material whose parameters cannot be transported.
    #[error("Invalid material '{kind}': {reason}")]
    InvalidMaterial { kind: &'static str, reason: String },

    /// Integrator or camera settings that make rendering meaningless.
    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    /// Texture loading or image output failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// An OBJ file could not be read or parsed.
    #[error("OBJ load error: {0}")]
    Obj(#[from] tobj::LoadError),

    /// An OBJ file parsed but held no usable triangles.
    #[error("No triangles in '{}'", .0.display())]
    EmptyMesh(PathBuf),
}

pub type RenderResult<T> = Result<T, RenderError>;
