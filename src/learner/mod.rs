//! Learner lifecycle module for GG-LEARNER.
//!
//! Handles construction, shared-model reference counting, disposal,
//! persistence and reload of native model handles.

mod error;
mod lifecycle;
mod persistence;
mod settings;

pub use error::LearnerError;
pub use lifecycle::Learner;
pub use settings::{LearnerConfig, LearnerSettings, ModelArguments, ParallelOptions};
