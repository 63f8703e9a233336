use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainError};
use crate::projection::Projection;

const DEFAULT_DIM: NonZeroUsize = match NonZeroUsize::new(500) {
    Some(n) => n,
    None => unreachable!(),
};

const DEFAULT_MAX_ITERATIONS: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Which descent rule drives the two-phase updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSpec {
    Plain,
    Adaptive { beta1: f32, beta2: f32, epsilon: f32 },
}

impl Default for RuleSpec {
    /// The low-momentum decay pair used for adversarial runs.
    fn default() -> Self {
        RuleSpec::Adaptive {
            beta1: 0.5,
            beta2: 0.9,
            epsilon: 1e-8,
        }
    }
}

/// Run configuration; every field has a default, so a config file only
/// needs the fields it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Problem dimension per player.
    pub dim: NonZeroUsize,
    /// Seed for problem generation (the starting point derives from it).
    pub seed: u64,
    pub rule: RuleSpec,
    /// Overrides the `1 / (2 L)` default when set.
    pub step_size: Option<f32>,
    pub max_iterations: NonZeroUsize,
    /// Stop once the fixed-point residual drops below this.
    pub tolerance: f32,
    pub project_x: Projection,
    pub project_y: Projection,
    /// EMA retention factor for the averaged iterates.
    pub ema_decay: f32,
    /// Write a checkpoint every this many iterations.
    pub checkpoint_every: Option<NonZeroUsize>,
    pub checkpoint_dir: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            seed: 1234,
            rule: RuleSpec::default(),
            step_size: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: 1e-6,
            project_x: Projection::None,
            project_y: Projection::None,
            ema_decay: 0.9999,
            checkpoint_every: None,
            checkpoint_dir: PathBuf::from("checkpoints"),
        }
    }
}

impl TrainConfig {
    /// Reads a JSON config file; missing fields fall back to defaults.
    ///
    /// # Errors
    /// I/O or parse failures from the underlying read.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Range checks beyond what the types enforce.
    ///
    /// # Errors
    /// [`TrainError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(TrainError::Config("tolerance must be positive and finite"));
        }
        if !(self.ema_decay > 0.0 && self.ema_decay < 1.0) {
            return Err(TrainError::Config("ema_decay must lie in (0, 1)"));
        }
        Ok(())
    }
}
