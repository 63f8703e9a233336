use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OptimError, Result};

/// A first-order descent rule: turns a gradient into the raw update that
/// ordinary descent would subtract from the parameter.
///
/// Rules own their per-parameter running statistics through
/// [`DescentRule::State`]. Snapshotting a state with `Clone` and later
/// putting the clone back must reproduce behavior exactly; the optimizer
/// relies on that to roll a state back after a speculative advance.
///
/// `compute_update` has no error conditions. `grad` and `delta` carry the
/// parameter's length; the optimizer validates shapes before any rule runs.
pub trait DescentRule {
    /// Per-parameter state (`()` for stateless rules).
    type State: Clone + fmt::Debug;

    /// Fresh state for a parameter of `len` elements.
    fn init_state(&self, len: usize) -> Self::State;

    /// Writes the `step_size`-scaled raw update for `grad` into `delta`,
    /// advancing `state` in place.
    fn compute_update(&self, grad: &[f32], state: &mut Self::State, step_size: f32, delta: &mut [f32]);

    /// Checks that `state` was initialized for a parameter of `len`
    /// elements. Restore paths call this to vet states read back from
    /// storage; the default accepts anything, for rules whose state has
    /// no per-element buffers.
    ///
    /// # Errors
    /// [`OptimError::CheckpointMismatch`] when a buffer length differs
    /// from `len`.
    fn validate_state(&self, _state: &Self::State, _len: usize) -> Result<()> {
        Ok(())
    }
}

/// Plain gradient descent: `delta = step_size * grad`, no state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainGradient;

impl DescentRule for PlainGradient {
    type State = ();

    fn init_state(&self, _len: usize) -> Self::State {}

    fn compute_update(&self, grad: &[f32], _state: &mut Self::State, step_size: f32, delta: &mut [f32]) {
        debug_assert_eq!(grad.len(), delta.len());
        for (d, g) in delta.iter_mut().zip(grad) {
            *d = step_size * g;
        }
    }
}

/// Adaptive-moment rule: exponential moving averages of the gradient and
/// its square, bias-corrected (Kingma-Ba).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveMoment {
    beta1: f32,
    beta2: f32,
    epsilon: f32,
}

impl AdaptiveMoment {
    /// # Errors
    /// [`OptimError::InvalidHyper`] when a decay rate falls outside (0, 1)
    /// or `epsilon` is not a positive finite number.
    pub fn new(beta1: f32, beta2: f32, epsilon: f32) -> Result<Self> {
        if !(beta1 > 0.0 && beta1 < 1.0) {
            return Err(OptimError::InvalidHyper("beta1 must lie in (0, 1)"));
        }
        if !(beta2 > 0.0 && beta2 < 1.0) {
            return Err(OptimError::InvalidHyper("beta2 must lie in (0, 1)"));
        }
        if !(epsilon > 0.0 && epsilon.is_finite()) {
            return Err(OptimError::InvalidHyper("epsilon must be positive and finite"));
        }
        Ok(Self {
            beta1,
            beta2,
            epsilon,
        })
    }

    #[inline]
    pub fn beta1(&self) -> f32 {
        self.beta1
    }

    #[inline]
    pub fn beta2(&self) -> f32 {
        self.beta2
    }

    #[inline]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }
}

impl Default for AdaptiveMoment {
    fn default() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Running moment estimates for one parameter, plus the advance counter
/// that drives bias correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentState {
    m: Vec<f32>,
    v: Vec<f32>,
    step: u64,
}

impl MomentState {
    fn zeros(len: usize) -> Self {
        Self {
            m: vec![0.0; len],
            v: vec![0.0; len],
            step: 0,
        }
    }

    /// How many times this state has been advanced.
    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn first_moment(&self) -> &[f32] {
        &self.m
    }

    pub fn second_moment(&self) -> &[f32] {
        &self.v
    }
}

impl DescentRule for AdaptiveMoment {
    type State = MomentState;

    fn init_state(&self, len: usize) -> MomentState {
        MomentState::zeros(len)
    }

    fn compute_update(&self, grad: &[f32], state: &mut MomentState, step_size: f32, delta: &mut [f32]) {
        debug_assert_eq!(grad.len(), state.m.len());
        debug_assert_eq!(grad.len(), delta.len());
        state.step += 1;
        let correction1 = 1.0 - self.beta1.powi(state.step as i32);
        let correction2 = 1.0 - self.beta2.powi(state.step as i32);
        for i in 0..grad.len() {
            let g = grad[i];
            state.m[i] = self.beta1 * state.m[i] + (1.0 - self.beta1) * g;
            state.v[i] = self.beta2 * state.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = state.m[i] / correction1;
            let v_hat = state.v[i] / correction2;
            delta[i] = step_size * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    fn validate_state(&self, state: &MomentState, len: usize) -> Result<()> {
        for got in [state.m.len(), state.v.len()] {
            if got != len {
                return Err(OptimError::CheckpointMismatch {
                    what: "rule state length",
                    got,
                    expected: len,
                });
            }
        }
        Ok(())
    }
}
