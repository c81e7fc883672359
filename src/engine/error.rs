//! Native engine error types for GG-LEARNER.
//!
//! Engine failures are propagated to callers unchanged. The lifecycle layer
//! only performs the bookkeeping needed to avoid freeing a handle twice.

use thiserror::Error;

use super::RawModel;

/// Errors raised by a native engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Seeding from model {base:?} failed: {reason}")]
    SeedFailed { base: RawModel, reason: String },

    #[error("Finish failed for model {model:?}: {reason}")]
    FinishFailed { model: RawModel, reason: String },

    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Invalid model image: {0}")]
    InvalidImage(String),

    #[error("Unknown model handle: {0:?}")]
    UnknownHandle(RawModel),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Returns true if the failure happened while building a handle.
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            Self::InitializationFailed(_) | Self::SeedFailed { .. } | Self::InvalidImage(_)
        )
    }
}
