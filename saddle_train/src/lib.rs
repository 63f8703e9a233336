pub mod averaging;
pub mod config;
pub mod error;
pub mod metrics;
pub mod projection;
pub mod trainer;

pub use averaging::ParamAverager;
pub use config::{RuleSpec, TrainConfig};
pub use error::{Result, TrainError};
pub use metrics::{RunMetrics, RunReport};
pub use projection::Projection;
pub use trainer::{SaddleTrainer, TrainCheckpoint, PARAM_X, PARAM_Y};
