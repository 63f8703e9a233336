use std::{error::Error, fmt, io};

use fbf_optim::OptimError;

/// The training crate's result type.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Failures while configuring or running a training session.
#[derive(Debug)]
pub enum TrainError {
    Io(io::Error),
    Parse(serde_json::Error),
    Optim(OptimError),
    /// A run configuration value is outside its valid range.
    Config(&'static str),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::Io(e) => write!(f, "io error: {e}"),
            TrainError::Parse(e) => write!(f, "config parse error: {e}"),
            TrainError::Optim(e) => write!(f, "optimizer error: {e}"),
            TrainError::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl Error for TrainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainError::Io(e) => Some(e),
            TrainError::Parse(e) => Some(e),
            TrainError::Optim(e) => Some(e),
            TrainError::Config(_) => None,
        }
    }
}

impl From<io::Error> for TrainError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for TrainError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<OptimError> for TrainError {
    fn from(value: OptimError) -> Self {
        Self::Optim(value)
    }
}
