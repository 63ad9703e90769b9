// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line handling and the load/layout/dump pipeline.

use clap::Parser;
use scg_viewer_graph::layout::SettingsError;
use scg_viewer_graph::{
    ForceLayout, ForceSettings, GwfError, GwfLoader, Layout, ObjectView, Scene, SceneError,
    Vector2,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "scg_viewer", version, about = "Load a GWF diagram and dump its scene as JSON")]
pub struct Cli {
    /// GWF document to load
    #[arg(required_unless_present = "write_settings")]
    pub input: Option<PathBuf>,

    /// Run the force-directed layout before dumping
    #[arg(long)]
    pub layout: bool,

    /// Force layout settings (RON)
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Write the default layout settings to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with = "settings")]
    pub write_settings: Option<PathBuf>,

    /// Width of the view the layout centres on
    #[arg(long, default_value_t = 800.0)]
    pub width: f32,

    /// Height of the view the layout centres on
    #[arg(long, default_value_t = 600.0)]
    pub height: f32,

    /// Write the snapshot to PATH instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// What gets printed
#[derive(Debug, Serialize)]
pub struct Snapshot {
    /// View size the scene was laid out for
    pub view_size: Vector2,
    /// Every object in creation order
    pub objects: Vec<ObjectView>,
}

impl Snapshot {
    /// Capture the current state of a scene
    pub fn capture(scene: &Scene) -> Self {
        Self {
            view_size: scene.view_size(),
            objects: scene.views(),
        }
    }
}

/// Headless viewer
pub struct ViewerApp {
    cli: Cli,
}

impl ViewerApp {
    /// Create the viewer for parsed arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the pipeline
    pub fn run(&self) -> Result<(), AppError> {
        if let Some(path) = &self.cli.write_settings {
            ForceSettings::default().save(path)?;
            tracing::info!("Wrote default layout settings to {}", path.display());
            return Ok(());
        }

        let input = self.cli.input.as_ref().ok_or(AppError::NoInput)?;
        let data = std::fs::read_to_string(input)?;
        let scene = self.build_scene(&data)?;
        tracing::info!("Loaded {}", input.display());
        let json = serde_json::to_string_pretty(&Snapshot::capture(&scene))?;

        match &self.cli.output {
            Some(path) => std::fs::write(path, json)?,
            None => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{json}")?;
            }
        }
        Ok(())
    }

    /// Load a document and lay it out if requested
    pub fn build_scene(&self, data: &str) -> Result<Scene, AppError> {
        let mut scene = GwfLoader::new().load(data)?;
        scene.set_view_size(Vector2::new(self.cli.width, self.cli.height));
        tracing::info!(
            "Scene has {} nodes, {} links, {} edges",
            scene.nodes().count(),
            scene.links().count(),
            scene.edges().count()
        );

        if self.cli.layout {
            let settings = match &self.cli.settings {
                Some(path) => ForceSettings::load(path)?,
                None => ForceSettings::default(),
            };
            ForceLayout::new(settings).run(&mut scene)?;
            scene.update_all()?;
            tracing::info!("Layout finished");
        }

        let pending: Vec<_> = scene.pending_views().map(|o| o.id()).collect();
        for id in pending {
            scene.view_updated(id)?;
        }
        Ok(scene)
    }
}

/// Error from the viewer pipeline
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Nothing to load
    #[error("No input document given")]
    NoInput,

    /// Reading the input or writing the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be loaded
    #[error("Failed to load document: {0}")]
    Gwf(#[from] GwfError),

    /// Layout settings could not be read or written
    #[error("Layout settings: {0}")]
    Settings(#[from] SettingsError),

    /// Scene operation failed during layout
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Snapshot could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
