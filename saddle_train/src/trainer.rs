use std::fs;
use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use fbf_optim::{DescentRule, Fbf, FbfCheckpoint, ParamSet};
use matrix_game::{distance, BilinearGame};

use crate::averaging::ParamAverager;
use crate::config::TrainConfig;
use crate::error::{Result, TrainError};
use crate::metrics::{RunMetrics, RunReport};

/// Index of the minimizing player's variable in the tracked set.
pub const PARAM_X: usize = 0;
/// Index of the maximizing player's variable.
pub const PARAM_Y: usize = 1;

/// Everything needed to pick a run up where it stopped: iterate values,
/// optimizer state and the running averages. The problem itself is
/// regenerated from the config's seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainCheckpoint<S> {
    pub iteration: u64,
    pub values: Vec<Vec<f32>>,
    pub optimizer: FbfCheckpoint<S>,
    pub averager: ParamAverager,
}

/// Drives one two-phase optimizer over both players of a bilinear game
/// until the fixed-point residual falls below tolerance.
///
/// Per iteration: gradients at `z_k`, extrapolation, per-player
/// projection, gradients at the projected `u_k`, step, then averaging and
/// residual tracking. The maximizing player's gradient is fed negated, so
/// a single minimizing update drives both sides.
pub struct SaddleTrainer<R: DescentRule> {
    config: TrainConfig,
    game: BilinearGame,
    params: ParamSet,
    optimizer: Fbf<R>,
    averager: ParamAverager,
    metrics: RunMetrics,
}

impl<R: DescentRule> SaddleTrainer<R> {
    /// Builds a fresh session: generates the game from the config seed,
    /// places both players at a reproducible starting point, and sizes the
    /// step as `1 / (2 L)` unless the config pins one.
    ///
    /// # Errors
    /// [`TrainError::Config`] for out-of-range config values and
    /// [`TrainError::Optim`] for a rejected step size.
    pub fn with_rule(config: TrainConfig, rule: R) -> Result<Self> {
        config.validate()?;
        let game = BilinearGame::generate(config.seed, config.dim);
        let step_size = config
            .step_size
            .unwrap_or_else(|| 0.5 / game.lipschitz());

        let (x0, y0) = game.initial_point(config.seed.wrapping_add(1));
        let mut params = ParamSet::new();
        params.push(x0);
        params.push(y0);

        let optimizer = Fbf::new(rule, step_size, &params)?;
        let averager = ParamAverager::new(&params, config.ema_decay);
        Ok(Self {
            config,
            game,
            params,
            optimizer,
            averager,
            metrics: RunMetrics::new(),
        })
    }

    /// Rebuilds a session from a checkpoint taken between iterations or
    /// mid-iteration; either way the trajectory continues exactly.
    ///
    /// # Errors
    /// [`TrainError::Config`] when the checkpoint does not carry both
    /// players at the game's dimension, or when its running averages do
    /// not, plus anything [`Fbf::from_checkpoint`] rejects.
    pub fn resume(config: TrainConfig, rule: R, checkpoint: TrainCheckpoint<R::State>) -> Result<Self> {
        config.validate()?;
        let game = BilinearGame::generate(config.seed, config.dim);

        let TrainCheckpoint {
            iteration,
            values,
            optimizer,
            averager,
        } = checkpoint;
        if values.len() != 2 {
            return Err(TrainError::Config("checkpoint must carry both players"));
        }
        let mut params = ParamSet::new();
        for value in values {
            if value.len() != game.dim() {
                return Err(TrainError::Config("checkpoint dimension does not match the game"));
            }
            params.push(value);
        }
        if !averager.matches(&params) {
            return Err(TrainError::Config("checkpoint averages do not match the game"));
        }

        let optimizer = Fbf::from_checkpoint(rule, optimizer, &params)?;
        Ok(Self {
            config,
            game,
            params,
            optimizer,
            averager,
            metrics: RunMetrics::starting_at(iteration),
        })
    }

    /// Runs one full extrapolation/step pair and returns the fixed-point
    /// residual `‖z_k − u_k‖` (measured after projection).
    pub fn iterate(&mut self) -> Result<f32> {
        let x_k = self.params.value(PARAM_X).to_vec();
        let y_k = self.params.value(PARAM_Y).to_vec();

        self.optimizer.zero_grad(&mut self.params);
        self.fill_gradients();
        self.optimizer.extrapolation(&mut self.params)?;

        self.config.project_x.apply(self.params.value_mut(PARAM_X));
        self.config.project_y.apply(self.params.value_mut(PARAM_Y));

        let dx = distance(&x_k, self.params.value(PARAM_X));
        let dy = distance(&y_k, self.params.value(PARAM_Y));
        let residual = (dx * dx + dy * dy).sqrt();

        self.optimizer.zero_grad(&mut self.params);
        self.fill_gradients();
        self.optimizer.step(&mut self.params)?;

        self.averager.update(&self.params);
        self.metrics.record_iteration(residual);
        Ok(residual)
    }

    /// Iterates until the residual drops below tolerance or the iteration
    /// budget runs out, writing checkpoints at the configured cadence.
    pub fn run(&mut self) -> Result<RunReport>
    where
        R::State: Serialize,
    {
        let started = Instant::now();
        let mut converged = false;
        for k in 0..self.config.max_iterations.get() {
            let residual = self.iterate()?;
            if k % 500 == 0 {
                debug!("iteration {k}: residual {residual:.3e}");
            }
            if let Some(every) = self.config.checkpoint_every {
                if (k + 1) % every.get() == 0 {
                    self.write_checkpoint()?;
                }
            }
            if residual < self.config.tolerance {
                converged = true;
                break;
            }
        }
        self.metrics.set_elapsed(started.elapsed());

        let report = self.report(converged);
        info!(
            "finished after {} iterations: converged {}, residual {:.3e}",
            report.iterations, report.converged, report.final_residual
        );
        Ok(report)
    }

    /// Distances of the current and averaged iterates to the known saddle
    /// point, plus the run counters.
    pub fn report(&self, converged: bool) -> RunReport {
        let (x_star, y_star) = self.game.solution();
        RunReport {
            iterations: self.metrics.iterations(),
            converged,
            final_residual: self.metrics.last_residual().unwrap_or(f32::INFINITY),
            dist_x: distance(self.params.value(PARAM_X), &x_star),
            dist_y: distance(self.params.value(PARAM_Y), &y_star),
            avg_dist_x: distance(self.averager.uniform(PARAM_X), &x_star),
            avg_dist_y: distance(self.averager.uniform(PARAM_Y), &y_star),
            elapsed_ms: self.metrics.elapsed().as_millis() as u64,
        }
    }

    /// Snapshot for [`SaddleTrainer::resume`].
    pub fn checkpoint(&self) -> TrainCheckpoint<R::State> {
        TrainCheckpoint {
            iteration: self.metrics.iterations(),
            values: (0..self.params.len())
                .map(|i| self.params.value(i).to_vec())
                .collect(),
            optimizer: self.optimizer.to_checkpoint(),
            averager: self.averager.clone(),
        }
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn game(&self) -> &BilinearGame {
        &self.game
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Analytic gradients of the bilinear objective at the current point,
    /// with the maximizer's side negated for a minimizing update.
    fn fill_gradients(&mut self) {
        let gx = self.game.grad_x(self.params.value(PARAM_Y));
        let gy: Vec<f32> = self
            .game
            .grad_y(self.params.value(PARAM_X))
            .iter()
            .map(|g| -g)
            .collect();
        self.params.set_grad(PARAM_X, gx);
        self.params.set_grad(PARAM_Y, gy);
    }

    fn write_checkpoint(&self) -> Result<()>
    where
        R::State: Serialize,
    {
        fs::create_dir_all(&self.config.checkpoint_dir)?;
        let path = self
            .config
            .checkpoint_dir
            .join(format!("checkpoint-{}.json", self.metrics.iterations()));
        fs::write(&path, serde_json::to_vec(&self.checkpoint())?)?;
        debug!("checkpoint written to {}", path.display());
        Ok(())
    }
}
