//! Caller-facing learner errors.

use thiserror::Error;

use crate::engine::EngineError;
use crate::memory::PoolError;

/// Errors surfaced by learner construction, persistence and teardown.
#[derive(Debug, Error)]
pub enum LearnerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Learner has been disposed")]
    Disposed,

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LearnerError {
    /// Returns true for errors raised before any state was touched.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::NotSupported(_))
    }

    /// Returns true if the native engine reported the failure.
    pub fn is_native_failure(&self) -> bool {
        matches!(self, Self::Engine(_))
    }
}
