use serde::{Deserialize, Serialize};

use crate::descent::DescentRule;
use crate::error::{OptimError, Result};
use crate::optimizer::{CacheEntry, Fbf, Phase};
use crate::params::ParamSet;

/// Serializable snapshot of an [`Fbf`] instance: phase, per-parameter rule
/// states and, when taken mid-iteration, the full update cache, so a
/// resumed optimizer continues bit-for-bit where the original stopped.
///
/// Rule hyperparameters travel in configuration, not here: restoring is
/// construct-then-load, and a checkpoint only fits an optimizer built with
/// the same kind of rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FbfCheckpoint<S> {
    pub step_size: f32,
    pub phase: Phase,
    pub lens: Vec<usize>,
    pub states: Vec<S>,
    pub cache: Vec<CacheEntry<S>>,
}

impl<R: DescentRule> Fbf<R> {
    /// Exports the optimizer's full persistent state.
    pub fn to_checkpoint(&self) -> FbfCheckpoint<R::State> {
        FbfCheckpoint {
            step_size: self.step_size,
            phase: self.phase,
            lens: self.lens.clone(),
            states: self.states.clone(),
            cache: self.cache.clone(),
        }
    }

    /// Rebuilds an optimizer from `checkpoint`, validated against the live
    /// `params` it will drive.
    ///
    /// # Errors
    /// [`OptimError::CheckpointMismatch`] when the recorded parameter
    /// count, any recorded length, or the cache does not line up with
    /// `params` and the recorded phase. Rule states and cached snapshots
    /// are vetted through [`DescentRule::validate_state`], covering
    /// buffers truncated in storage. [`OptimError::InvalidHyper`] for a
    /// corrupted step size.
    pub fn from_checkpoint(
        rule: R,
        checkpoint: FbfCheckpoint<R::State>,
        params: &ParamSet,
    ) -> Result<Self> {
        if !(checkpoint.step_size > 0.0 && checkpoint.step_size.is_finite()) {
            return Err(OptimError::InvalidHyper("step size must be positive and finite"));
        }
        if checkpoint.lens.len() != params.len() {
            return Err(OptimError::CheckpointMismatch {
                what: "parameter count",
                got: checkpoint.lens.len(),
                expected: params.len(),
            });
        }
        for (i, &len) in checkpoint.lens.iter().enumerate() {
            let have = params.value(i).len();
            if len != have {
                return Err(OptimError::CheckpointMismatch {
                    what: "parameter length",
                    got: len,
                    expected: have,
                });
            }
        }
        if checkpoint.states.len() != checkpoint.lens.len() {
            return Err(OptimError::CheckpointMismatch {
                what: "rule state count",
                got: checkpoint.states.len(),
                expected: checkpoint.lens.len(),
            });
        }
        for (i, state) in checkpoint.states.iter().enumerate() {
            rule.validate_state(state, checkpoint.lens[i])?;
        }
        let expected_cache = match checkpoint.phase {
            Phase::AwaitingExtrapolation => 0,
            Phase::AwaitingStep => checkpoint.lens.len(),
        };
        if checkpoint.cache.len() != expected_cache {
            return Err(OptimError::CheckpointMismatch {
                what: "cache entries",
                got: checkpoint.cache.len(),
                expected: expected_cache,
            });
        }
        for (i, entry) in checkpoint.cache.iter().enumerate() {
            if entry.delta().len() != checkpoint.lens[i] {
                return Err(OptimError::CheckpointMismatch {
                    what: "cached delta length",
                    got: entry.delta().len(),
                    expected: checkpoint.lens[i],
                });
            }
            rule.validate_state(entry.snapshot(), checkpoint.lens[i])?;
        }
        Ok(Self {
            rule,
            step_size: checkpoint.step_size,
            phase: checkpoint.phase,
            lens: checkpoint.lens,
            states: checkpoint.states,
            cache: checkpoint.cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descent::AdaptiveMoment;
    use crate::optimizer::FbfAdam;

    const STEP_SIZE: f32 = 0.05;

    fn run_iteration(optimizer: &mut FbfAdam, params: &mut ParamSet, g1: f32, g2: f32) {
        params.set_grad(0, vec![g1, g1]);
        optimizer.extrapolation(params).unwrap();
        params.set_grad(0, vec![g2, g2]);
        optimizer.step(params).unwrap();
    }

    fn setup() -> (ParamSet, FbfAdam) {
        let mut params = ParamSet::new();
        params.push(vec![1.0, -1.0]);
        let optimizer = FbfAdam::adaptive(AdaptiveMoment::default(), STEP_SIZE, &params).unwrap();
        (params, optimizer)
    }

    #[test]
    fn resume_between_iterations_reproduces_the_trajectory() {
        let (mut params, mut optimizer) = setup();
        run_iteration(&mut optimizer, &mut params, 2.0, 1.0);

        let checkpoint = optimizer.to_checkpoint();
        let mut resumed_params = params.clone();
        let mut resumed =
            FbfAdam::from_checkpoint(AdaptiveMoment::default(), checkpoint, &resumed_params)
                .unwrap();

        for (g1, g2) in [(0.5, -0.5), (1.5, 0.25)] {
            run_iteration(&mut optimizer, &mut params, g1, g2);
            run_iteration(&mut resumed, &mut resumed_params, g1, g2);
        }
        assert_eq!(params.value(0), resumed_params.value(0));
        assert_eq!(optimizer.rule_state(0), resumed.rule_state(0));
    }

    #[test]
    fn resume_mid_iteration_restores_the_cache_exactly() {
        let (mut params, mut optimizer) = setup();
        params.set_grad(0, vec![2.0, -3.0]);
        optimizer.extrapolation(&mut params).unwrap();

        let checkpoint = optimizer.to_checkpoint();
        assert_eq!(checkpoint.phase, Phase::AwaitingStep);

        let mut resumed_params = params.clone();
        let mut resumed =
            FbfAdam::from_checkpoint(AdaptiveMoment::default(), checkpoint, &resumed_params)
                .unwrap();
        assert_eq!(resumed.cached_delta(0), optimizer.cached_delta(0));

        params.set_grad(0, vec![1.0, 1.0]);
        resumed_params.set_grad(0, vec![1.0, 1.0]);
        optimizer.step(&mut params).unwrap();
        resumed.step(&mut resumed_params).unwrap();
        assert_eq!(params.value(0), resumed_params.value(0));
    }

    #[test]
    fn checkpoint_survives_json() {
        let (mut params, mut optimizer) = setup();
        params.set_grad(0, vec![0.3, 0.6]);
        optimizer.extrapolation(&mut params).unwrap();

        let checkpoint = optimizer.to_checkpoint();
        let text = serde_json::to_string(&checkpoint).unwrap();
        let parsed: FbfCheckpoint<crate::MomentState> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, checkpoint);
    }

    #[test]
    fn restore_rejects_a_mismatched_set() {
        let (params, optimizer) = setup();
        let checkpoint = optimizer.to_checkpoint();

        let mut smaller = ParamSet::new();
        smaller.push(vec![0.0]);
        let err = FbfAdam::from_checkpoint(AdaptiveMoment::default(), checkpoint.clone(), &smaller)
            .unwrap_err();
        assert_eq!(
            err,
            OptimError::CheckpointMismatch {
                what: "parameter length",
                got: 2,
                expected: 1
            }
        );

        let mut wrong_count = params.clone();
        wrong_count.push(vec![0.0]);
        let err = FbfAdam::from_checkpoint(AdaptiveMoment::default(), checkpoint, &wrong_count)
            .unwrap_err();
        assert_eq!(
            err,
            OptimError::CheckpointMismatch {
                what: "parameter count",
                got: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn restore_rejects_a_desynced_cache() {
        let (params, optimizer) = setup();
        let mut checkpoint = optimizer.to_checkpoint();
        // Claim mid-iteration without any cached entries.
        checkpoint.phase = Phase::AwaitingStep;

        let err = FbfAdam::from_checkpoint(AdaptiveMoment::default(), checkpoint, &params)
            .unwrap_err();
        assert_eq!(
            err,
            OptimError::CheckpointMismatch {
                what: "cache entries",
                got: 0,
                expected: 1
            }
        );
    }

    #[test]
    fn restore_rejects_a_rule_state_of_the_wrong_length() {
        let (mut params, mut optimizer) = setup();
        params.set_grad(0, vec![0.2, -0.1]);
        optimizer.extrapolation(&mut params).unwrap();
        let expected = OptimError::CheckpointMismatch {
            what: "rule state length",
            got: 1,
            expected: 2,
        };

        // Only deserialization can produce a moment state whose buffers
        // disagree with its parameter, so tamper with the stored form.
        let mut raw = serde_json::to_value(optimizer.to_checkpoint()).unwrap();
        raw["states"][0]["m"] = serde_json::json!([0.0]);
        let truncated: FbfCheckpoint<crate::MomentState> = serde_json::from_value(raw).unwrap();
        let err = FbfAdam::from_checkpoint(AdaptiveMoment::default(), truncated, &params)
            .unwrap_err();
        assert_eq!(err, expected);

        let mut raw = serde_json::to_value(optimizer.to_checkpoint()).unwrap();
        raw["cache"][0]["snapshot"]["v"] = serde_json::json!([0.0]);
        let truncated: FbfCheckpoint<crate::MomentState> = serde_json::from_value(raw).unwrap();
        let err = FbfAdam::from_checkpoint(AdaptiveMoment::default(), truncated, &params)
            .unwrap_err();
        assert_eq!(err, expected);
    }
}
