use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Counters and residual history for one run.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    iterations: u64,
    residuals: Vec<f32>,
    elapsed: Duration,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues counting from a resumed run's iteration total.
    pub fn starting_at(iterations: u64) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }

    #[inline]
    pub fn record_iteration(&mut self, residual: f32) {
        self.iterations += 1;
        self.residuals.push(residual);
    }

    #[inline]
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    #[inline]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn last_residual(&self) -> Option<f32> {
        self.residuals.last().copied()
    }

    /// Fixed-point residuals in iteration order (this session only; a
    /// resumed run starts a fresh history).
    pub fn residuals(&self) -> &[f32] {
        &self.residuals
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Flat record written at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub iterations: u64,
    pub converged: bool,
    /// Last fixed-point residual `‖z_k − u_k‖`.
    pub final_residual: f32,
    /// Distance of the last iterate to the known saddle point, per player.
    pub dist_x: f32,
    pub dist_y: f32,
    /// Same distances for the uniformly averaged iterates.
    pub avg_dist_x: f32,
    pub avg_dist_y: f32,
    pub elapsed_ms: u64,
}
