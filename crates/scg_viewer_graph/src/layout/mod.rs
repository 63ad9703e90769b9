// SPDX-License-Identifier: MIT OR Apache-2.0
//! Automatic placement of scene objects.
//!
//! A layout is driven by an outside scheduler: [`Layout::start`] prepares it
//! for a scene, [`Layout::tick`] advances it by one step and writes the
//! result back, and [`Layout::stop`] ends it early.

pub mod force;
pub mod simulation;

pub use force::ForceLayout;
pub use simulation::{Particle, Simulation, Spring};

use crate::scene::{Scene, SceneError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A layout algorithm operating on a scene
pub trait Layout {
    /// Prepare the layout for `scene`, restarting it if already running
    fn start(&mut self, scene: &mut Scene) -> Result<(), SceneError>;

    /// Advance one step. Returns `false` once the layout has settled or was
    /// stopped.
    fn tick(&mut self, scene: &mut Scene) -> Result<bool, SceneError>;

    /// Stop issuing further steps
    fn stop(&mut self);

    /// Run the layout until it settles
    fn run(&mut self, scene: &mut Scene) -> Result<(), SceneError> {
        self.start(scene)?;
        while self.tick(scene)? {}
        Ok(())
    }
}

/// Tuning of the force-directed layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceSettings {
    /// Rest length of a spring between two plain nodes
    pub base_distance: f32,
    /// Rest length removed for every spring end attached to an edge
    pub edge_joint_shortening: f32,
    /// Lower bound of the repulsion magnitude of a particle
    pub min_repulsion: f32,
    /// Initial simulation temperature
    pub alpha: f32,
    /// Temperature below which the simulation is considered settled
    pub alpha_min: f32,
    /// Fraction of the distance to `alpha_target` covered every step
    pub alpha_decay: f32,
    /// Temperature the simulation cools towards
    pub alpha_target: f32,
    /// Fraction of velocity lost every step
    pub velocity_decay: f32,
    /// Strength of the pull towards the view centre
    pub center_strength: f32,
    /// Distance below which repulsion stops growing
    pub distance_min: f32,
}

impl Default for ForceSettings {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            base_distance: 100.0,
            edge_joint_shortening: 20.0,
            min_repulsion: 100.0,
            alpha: 1.0,
            alpha_min,
            // Cools from 1 to alpha_min in 300 steps
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.4,
            center_strength: 1.0,
            distance_min: 1.0,
        }
    }
}

impl ForceSettings {
    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings = ron::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a RON file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Error while reading or writing layout settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON for the settings
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
}
