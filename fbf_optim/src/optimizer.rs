use serde::{Deserialize, Serialize};

use crate::descent::{AdaptiveMoment, DescentRule, PlainGradient};
use crate::error::{OptimError, Result};
use crate::params::ParamSet;

/// Which half of the forward-backward-forward iteration runs next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingExtrapolation,
    AwaitingStep,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::AwaitingExtrapolation => "awaiting extrapolation",
            Phase::AwaitingStep => "awaiting step",
        }
    }
}

/// What an extrapolation leaves behind for its matching step: the delta it
/// subtracted and the rule state from just before it ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<S> {
    pub(crate) delta: Vec<f32>,
    pub(crate) snapshot: S,
}

impl<S> CacheEntry<S> {
    pub fn delta(&self) -> &[f32] {
        &self.delta
    }

    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }
}

/// Two-phase forward-backward-forward driver over a [`ParamSet`].
///
/// One full iteration is a pair of calls with fresh gradients before each:
/// [`extrapolation`](Fbf::extrapolation) moves every parameter to the
/// speculative point `u_k = x_k - upd(grad(x_k))`, then
/// [`step`](Fbf::step) cancels the speculative move and applies the
/// corrected direction, landing on `x_{k+1} = u_k - upd(grad(u_k)) +
/// upd(grad(x_k))`. The rule state advanced during extrapolation is rolled
/// back at step time, so running statistics advance once per iteration.
///
/// The caller owns the parameters and may clamp or otherwise project their
/// values between the two calls; the optimizer never mutates values
/// outside them.
#[derive(Debug)]
pub struct Fbf<R: DescentRule> {
    pub(crate) rule: R,
    pub(crate) step_size: f32,
    pub(crate) phase: Phase,
    pub(crate) lens: Vec<usize>,
    pub(crate) states: Vec<R::State>,
    pub(crate) cache: Vec<CacheEntry<R::State>>,
}

/// FBF over plain gradient descent.
pub type FbfSgd = Fbf<PlainGradient>;

/// FBF over the adaptive-moment rule.
pub type FbfAdam = Fbf<AdaptiveMoment>;

impl<R: DescentRule> Fbf<R> {
    /// Builds an optimizer bound to `params`' current count and lengths.
    ///
    /// # Errors
    /// [`OptimError::InvalidHyper`] when `step_size` is not positive and
    /// finite.
    pub fn new(rule: R, step_size: f32, params: &ParamSet) -> Result<Self> {
        if !(step_size > 0.0 && step_size.is_finite()) {
            return Err(OptimError::InvalidHyper("step size must be positive and finite"));
        }
        let lens: Vec<usize> = params.iter().map(|p| p.len()).collect();
        let states = lens.iter().map(|&len| rule.init_state(len)).collect();
        Ok(Self {
            rule,
            step_size,
            phase: Phase::AwaitingExtrapolation,
            lens,
            states,
            cache: Vec::new(),
        })
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn step_size(&self) -> f32 {
        self.step_size
    }

    #[inline]
    pub fn num_params(&self) -> usize {
        self.lens.len()
    }

    /// The delta cached for `param`; `Some` only mid-iteration.
    pub fn cached_delta(&self, param: usize) -> Option<&[f32]> {
        self.cache.get(param).map(|entry| entry.delta.as_slice())
    }

    /// The descent rule's live state for `param`.
    pub fn rule_state(&self, param: usize) -> Option<&R::State> {
        self.states.get(param)
    }

    /// Speculative half of the iteration: subtracts one raw update from
    /// every parameter, caching each delta together with a snapshot of the
    /// rule state from just before the advance.
    ///
    /// On return the values hold the extrapolated point. Project them as
    /// needed, write fresh gradients there, then call [`step`](Fbf::step).
    ///
    /// # Errors
    /// [`OptimError::InvalidPhase`] unless an extrapolation is due;
    /// [`OptimError::ParamCountMismatch`], [`OptimError::MissingGradient`]
    /// or [`OptimError::ShapeMismatch`] from pre-mutation validation.
    /// Nothing is mutated on any failure.
    pub fn extrapolation(&mut self, params: &mut ParamSet) -> Result<()> {
        if self.phase != Phase::AwaitingExtrapolation {
            return Err(OptimError::InvalidPhase {
                op: "extrapolation",
                phase: self.phase,
            });
        }
        self.check_ready(params)?;

        self.cache.reserve(self.lens.len());
        for i in 0..self.lens.len() {
            let snapshot = self.states[i].clone();
            let mut delta = vec![0.0; self.lens[i]];
            let grad = params.grad(i).ok_or(OptimError::MissingGradient { param: i })?;
            self.rule
                .compute_update(grad, &mut self.states[i], self.step_size, &mut delta);
            for (v, d) in params.value_mut(i).iter_mut().zip(&delta) {
                *v -= *d;
            }
            self.cache.push(CacheEntry { delta, snapshot });
        }
        self.phase = Phase::AwaitingStep;
        Ok(())
    }

    /// Corrective half of the iteration: restores each rule state from its
    /// snapshot, advances it once with the gradient at the extrapolated
    /// point, and moves the parameter to `x_{k+1} = u_k - delta2 +
    /// cached_delta`, consuming the cache.
    ///
    /// # Errors
    /// [`OptimError::InvalidPhase`] unless a step is due;
    /// [`OptimError::ParamCountMismatch`], [`OptimError::MissingGradient`]
    /// or [`OptimError::ShapeMismatch`] from pre-mutation validation.
    /// Nothing is mutated on any failure.
    pub fn step(&mut self, params: &mut ParamSet) -> Result<()> {
        if self.phase != Phase::AwaitingStep {
            return Err(OptimError::InvalidPhase {
                op: "step",
                phase: self.phase,
            });
        }
        self.check_ready(params)?;

        let entries = std::mem::take(&mut self.cache);
        for (i, entry) in entries.into_iter().enumerate() {
            self.states[i] = entry.snapshot;
            let mut delta2 = vec![0.0; self.lens[i]];
            let grad = params.grad(i).ok_or(OptimError::MissingGradient { param: i })?;
            self.rule
                .compute_update(grad, &mut self.states[i], self.step_size, &mut delta2);
            for ((v, d2), d1) in params.value_mut(i).iter_mut().zip(&delta2).zip(&entry.delta) {
                *v += *d1 - *d2;
            }
        }
        self.phase = Phase::AwaitingExtrapolation;
        Ok(())
    }

    /// Zeroes every written gradient in `params`. Idempotent, valid in
    /// either phase; never touches values, rule state or the cache.
    pub fn zero_grad(&self, params: &mut ParamSet) {
        params.zero_grad();
    }

    /// Pre-mutation validation shared by both phase methods: the set's
    /// size must match the tracked count, and every parameter needs a
    /// gradient of its own length.
    fn check_ready(&self, params: &ParamSet) -> Result<()> {
        if params.len() != self.lens.len() {
            return Err(OptimError::ParamCountMismatch {
                got: params.len(),
                expected: self.lens.len(),
            });
        }
        for (i, &len) in self.lens.iter().enumerate() {
            let grad = params.grad(i).ok_or(OptimError::MissingGradient { param: i })?;
            if grad.len() != len {
                return Err(OptimError::ShapeMismatch {
                    param: i,
                    got: grad.len(),
                    expected: len,
                });
            }
        }
        Ok(())
    }
}

impl FbfSgd {
    /// FBF with the plain-gradient rule.
    pub fn plain(step_size: f32, params: &ParamSet) -> Result<Self> {
        Self::new(PlainGradient, step_size, params)
    }
}

impl FbfAdam {
    /// FBF with the adaptive-moment rule.
    pub fn adaptive(rule: AdaptiveMoment, step_size: f32, params: &ParamSet) -> Result<Self> {
        Self::new(rule, step_size, params)
    }
}
