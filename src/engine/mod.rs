//! Native engine boundary for GG-LEARNER.
//!
//! The learning engine itself is opaque: this module only describes the
//! operations the lifecycle layer calls. Handles are plain ids owned by the
//! engine, the same way the runtime registry hands out `ModelHandle`s.

pub mod error;
mod in_memory;

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

pub use error::EngineError;
pub use in_memory::{EngineStats, InMemoryEngine, ModelImage, ModelOptions};

/// Opaque handle to one native model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawModel(u64);

impl RawModel {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Opaque handle to one native feature-vector buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawExample(u64);

impl RawExample {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Callback that releases one part of a native example buffer.
pub type ExampleDeallocator = Arc<dyn Fn(RawExample) + Send + Sync>;

/// Deallocation callbacks captured from a model before it is torn down.
#[derive(Clone)]
pub struct Deallocators {
    pub delete_prediction: ExampleDeallocator,
    pub delete_label: ExampleDeallocator,
}

impl fmt::Debug for Deallocators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deallocators").finish_non_exhaustive()
    }
}

/// Destination for a serialized model image.
pub enum SaveTarget<'a> {
    File(&'a Path),
    Stream(&'a mut dyn Write),
}

/// Operations provided by the native learning engine.
///
/// Every call is synchronous. Implementations must tolerate calls from
/// several threads; per-handle exclusivity is the caller's responsibility.
pub trait NativeEngine: Send + Sync {
    /// Build a model from argument text, optionally reading a saved image.
    fn initialize(&self, args: &str, image: Option<&mut dyn Read>) -> Result<RawModel, EngineError>;

    /// Build a model that shares the learned state of `base`.
    fn seed_model(&self, base: RawModel, args: &str) -> Result<RawModel, EngineError>;

    /// Release every native resource of `model`.
    fn finish(&self, model: RawModel) -> Result<(), EngineError>;

    fn release_parser_datastructures(&self, model: RawModel);

    fn save_predictor(&self, model: RawModel, target: SaveTarget<'_>) -> Result<(), EngineError>;

    /// Describe the first feature incompatibility between two models, if any.
    fn are_features_compatible(&self, a: RawModel, b: RawModel) -> Option<String>;

    fn deallocators(&self, model: RawModel) -> Result<Deallocators, EngineError>;

    fn alloc_example(&self, model: RawModel) -> Result<RawExample, EngineError>;

    /// Free a native example buffer using previously captured callbacks.
    fn dealloc_example(
        &self,
        delete_label: &ExampleDeallocator,
        example: RawExample,
        delete_prediction: &ExampleDeallocator,
    );

    fn id(&self, model: RawModel) -> Result<String, EngineError>;

    fn set_id(&self, model: RawModel, id: &str) -> Result<(), EngineError>;

    fn final_regressor_name(&self, model: RawModel) -> Result<String, EngineError>;

    /// Effective argument text the model was built with.
    fn command_line(&self, model: RawModel) -> Result<String, EngineError>;
}
