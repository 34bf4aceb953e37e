use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use halo_renderer::{path, sppm, RenderConfig, SppmConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

mod scenes;

use scenes::{SceneName, SceneOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Integrator {
    /// Unidirectional path tracing
    Path,
    /// Stochastic progressive photon mapping
    Sppm,
}

/// Render a built-in scene or an OBJ mesh to an image file.
#[derive(Parser, Debug)]
#[command(name = "halo", version)]
struct Args {
    /// Light transport algorithm
    #[arg(short = 'i', long, value_enum, default_value_t = Integrator::Path)]
    integrator: Integrator,

    /// Scene to render
    #[arg(long, value_enum, default_value_t = SceneName::Cornell)]
    scene: SceneName,

    /// Output image; the format follows the extension
    #[arg(short = 'o', long, default_value = "render.png")]
    output: PathBuf,

    /// Width of the rendered image
    #[arg(short = 'W', long, default_value_t = 320)]
    width: u32,

    /// Height of the rendered image
    #[arg(short = 'H', long, default_value_t = 240)]
    height: u32,

    /// Wavefront OBJ mesh rendered by `--scene obj`
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Image mapped onto the floor of the cornell scene and onto OBJ meshes
    #[arg(long)]
    texture: Option<PathBuf>,

    /// JSON file with `render` and/or `sppm` settings
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Samples per subpixel for the path tracer
    #[arg(short = 's', long)]
    samples: Option<u32>,

    /// SPPM iterations
    #[arg(long)]
    iterations: Option<u32>,

    /// SPPM photons per iteration
    #[arg(long)]
    photons: Option<u32>,

    /// Seed for every random stream
    #[arg(long)]
    seed: Option<u64>,
}

/// Settings file layout. Missing sections and fields take their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    render: RenderConfig,
    sppm: SppmConfig,
}

fn load_config(path: &Path) -> Result<ConfigFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ConfigFile::default(),
    };
    if let Some(samples) = args.samples {
        config.render.samples_per_pixel = samples;
    }
    if let Some(iterations) = args.iterations {
        config.sppm.iterations = iterations;
    }
    if let Some(photons) = args.photons {
        config.sppm.photons_per_iteration = photons;
    }
    if let Some(seed) = args.seed {
        config.render.seed = seed;
        config.sppm.seed = seed;
    }

    log::info!("Building {:?} scene at {}x{}", args.scene, args.width, args.height);
    let scene = scenes::build(
        args.scene,
        &SceneOptions {
            width: args.width,
            height: args.height,
            obj: args.obj.clone(),
            texture: args.texture.clone(),
        },
    )?;

    let start = Instant::now();
    let film = match args.integrator {
        Integrator::Path => path::render(&scene, &config.render),
        Integrator::Sppm => sppm::render(&scene, &config.sppm),
    }
    .context("render failed")?;
    log::info!("Rendered in {:.2?}", start.elapsed());

    film.save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    Ok(())
}
