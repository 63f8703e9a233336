//! Two-phase forward-backward-forward (FBF) optimization for saddle-point
//! problems.
//!
//! One iteration is a speculative extrapolation followed by a corrective
//! step, with fresh gradients before each half. The optimizer caches every
//! extrapolation delta together with a snapshot of the descent rule's
//! state, so the rule's running statistics advance exactly once per full
//! iteration.

mod checkpoint;
mod descent;
mod error;
mod optimizer;
mod params;

pub use checkpoint::FbfCheckpoint;
pub use descent::{AdaptiveMoment, DescentRule, MomentState, PlainGradient};
pub use error::{OptimError, Result};
pub use optimizer::{CacheEntry, Fbf, FbfAdam, FbfSgd, Phase};
pub use params::{ParamSet, Parameter};
