use serde::{Deserialize, Serialize};

/// Feasible-set projection a caller applies to a parameter between the
/// extrapolation and the next differentiation pass. One projection per
/// iteration; the corrective step runs unprojected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Leave the parameter unconstrained.
    None,
    /// Clamp every component into `[-bound, bound]`.
    Clamp { bound: f32 },
    /// Soft-threshold every component by `threshold`, the proximal map of
    /// `threshold * |x|_1`.
    ProxL1 { threshold: f32 },
}

impl Projection {
    pub fn apply(&self, values: &mut [f32]) {
        match *self {
            Projection::None => {}
            Projection::Clamp { bound } => {
                for v in values.iter_mut() {
                    *v = v.clamp(-bound, bound);
                }
            }
            Projection::ProxL1 { threshold } => {
                for v in values.iter_mut() {
                    *v = v.signum() * (v.abs() - threshold).max(0.0);
                }
            }
        }
    }
}
