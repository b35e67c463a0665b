mod app;
mod assets;
mod config;
mod controls;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use vertexshadow_engine::device::GpuInit;
use vertexshadow_engine::logging::{init_logging, LoggingConfig};
use vertexshadow_engine::window::{LogicalSize, Runtime, RuntimeConfig};

use crate::app::ViewerApp;
use crate::config::{SliderConfig, ViewerConfig};

/// Textured model with two analytic shadow techniques.
///
/// Drag with the left mouse button to rotate. Q/A, W/S and E/D move the
/// light along X, Y and Z. 1 selects total shadow, 2 diffuse shadow.
#[derive(Parser, Debug)]
#[command(name = "vertexshadow")]
#[command(version, about)]
struct Args {
    /// Mesh JSON with positions, normals, texCoords and triangles.
    #[arg(short, long, value_name = "FILE")]
    mesh: Option<PathBuf>,

    /// Texture image (local path or file:// URL).
    #[arg(short, long, value_name = "SOURCE")]
    texture: Option<String>,

    /// Log filter in env_logger syntax; overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,

    #[arg(long, default_value_t = 800.0)]
    width: f64,

    #[arg(long, default_value_t = 800.0)]
    height: f64,
}

impl Args {
    fn into_config(self) -> ViewerConfig {
        ViewerConfig {
            mesh: self.mesh,
            texture: self.texture,
            sliders: SliderConfig::default(),
            runtime: RuntimeConfig {
                initial_size: LogicalSize::new(self.width, self.height),
                ..RuntimeConfig::default()
            },
            logging: LoggingConfig {
                env_filter: self.log,
                ..LoggingConfig::default()
            },
        }
    }
}

fn main() -> Result<()> {
    let config = Args::parse().into_config();
    init_logging(config.logging.clone());

    let mesh = assets::load_mesh(config.mesh.as_deref())?;
    log::info!(
        "mesh ready: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.indices.len() / 3
    );

    let runtime = config.runtime.clone();
    Runtime::run(runtime, GpuInit::default(), ViewerApp::new(config, mesh))
}
