use serde::{Deserialize, Serialize};

use fbf_optim::ParamSet;

/// Running uniform and exponential moving averages of a parameter
/// trajectory, fed once per completed iteration.
///
/// On bilinear problems the averaged iterates settle even when the raw
/// ones still rotate, so reports carry both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamAverager {
    avg: Vec<Vec<f32>>,
    ema: Vec<Vec<f32>>,
    decay: f32,
    updates: u64,
}

impl ParamAverager {
    /// Seeds both averages with the current values; the seed stays in the
    /// uniform mean as its first point. `decay` is the EMA retention
    /// factor.
    pub fn new(params: &ParamSet, decay: f32) -> Self {
        let snapshot: Vec<Vec<f32>> = (0..params.len()).map(|i| params.value(i).to_vec()).collect();
        Self {
            avg: snapshot.clone(),
            ema: snapshot,
            decay,
            updates: 0,
        }
    }

    /// Folds the current values into both averages.
    ///
    /// # Panics
    /// Panics if `params` no longer matches the set this averager was
    /// seeded with.
    pub fn update(&mut self, params: &ParamSet) {
        assert!(self.matches(params));
        self.updates += 1;
        // The seeded values count as point zero of the uniform mean.
        let count = (self.updates + 1) as f32;
        let decay = self.decay;
        for i in 0..self.avg.len() {
            let value = params.value(i);
            for (slot, v) in self.avg[i].iter_mut().zip(value) {
                *slot = *slot * (count - 1.0) / count + v / count;
            }
            for (slot, v) in self.ema[i].iter_mut().zip(value) {
                *slot = decay * *slot + (1.0 - decay) * v;
            }
        }
    }

    /// Whether `params` still has the shape this averager was seeded
    /// from: same parameter count, same per-parameter lengths.
    pub fn matches(&self, params: &ParamSet) -> bool {
        self.avg.len() == params.len()
            && self.ema.len() == params.len()
            && (0..params.len()).all(|i| {
                self.avg[i].len() == params.value(i).len()
                    && self.ema[i].len() == params.value(i).len()
            })
    }

    /// Uniform average of the seed and every update seen so far.
    pub fn uniform(&self, param: usize) -> &[f32] {
        &self.avg[param]
    }

    /// Exponential moving average.
    pub fn ema(&self, param: usize) -> &[f32] {
        &self.ema[param]
    }

    #[inline]
    pub fn updates(&self) -> u64 {
        self.updates
    }
}
