//! Learner construction settings.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use serde::Serialize;

use super::{Learner, LearnerError};
use crate::config::EnvConfig;

/// Distributed coordination settings (all-reduce style training).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParallelOptions {
    pub span_server: String,
    pub unique_id: u64,
    pub total: usize,
    pub node: usize,
}

/// Everything needed to construct a [`Learner`].
///
/// The model stream is consumed at construction and closed afterwards.
#[derive(Default)]
pub struct LearnerSettings {
    pub arguments: String,
    /// Shared base model to seed from. Takes precedence over `model_stream`.
    pub model: Option<Arc<Learner>>,
    pub model_stream: Option<Box<dyn Read + Send>>,
    pub enable_thread_safe_example_pooling: bool,
    pub parallel_options: Option<ParallelOptions>,
}

impl LearnerSettings {
    pub fn new(arguments: impl Into<String>) -> Self {
        Self { arguments: arguments.into(), ..Self::default() }
    }

    /// Settings seeded from the `GG_LEARNER_*` environment.
    pub fn from_env(config: &EnvConfig) -> Self {
        Self {
            arguments: config.arguments.clone(),
            enable_thread_safe_example_pooling: config.thread_safe_pooling,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, base: Arc<Learner>) -> Self {
        self.model = Some(base);
        self
    }

    pub fn with_model_stream(mut self, stream: impl Read + Send + 'static) -> Self {
        self.model_stream = Some(Box::new(stream));
        self
    }

    /// Use a saved model file as the model stream, memory-mapped.
    pub fn with_model_file(self, path: impl AsRef<Path>) -> Result<Self, LearnerError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(LearnerError::InvalidArgument("model file must not be empty".into()));
        }
        let file = File::open(path)?;
        // SAFETY: File is opened read-only and saved models are not modified while loading
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(self.with_model_stream(Cursor::new(mmap)))
    }

    pub fn with_thread_safe_example_pooling(mut self, enabled: bool) -> Self {
        self.enable_thread_safe_example_pooling = enabled;
        self
    }

    pub fn with_parallel_options(mut self, options: ParallelOptions) -> Self {
        self.parallel_options = Some(options);
        self
    }
}

impl fmt::Debug for LearnerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearnerSettings")
            .field("arguments", &self.arguments)
            .field("model", &self.model.as_ref().map(|m| m.raw_model()))
            .field("model_stream", &self.model_stream.is_some())
            .field("enable_thread_safe_example_pooling", &self.enable_thread_safe_example_pooling)
            .field("parallel_options", &self.parallel_options)
            .finish()
    }
}

/// Settings retained by a learner after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LearnerConfig {
    pub arguments: String,
    pub enable_thread_safe_example_pooling: bool,
    pub parallel_options: Option<ParallelOptions>,
}

impl LearnerConfig {
    pub fn is_distributed(&self) -> bool {
        self.parallel_options.is_some()
    }
}

/// Effective arguments of a live model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelArguments {
    pub command_line: String,
    pub id: String,
    pub final_regressor: String,
}
