//! gg-learner
//!
//! Lifecycle management for handles owned by a native learning engine.
//!
//! A [`Learner`] wraps one opaque model handle together with the pool of
//! example buffers leased against it. Learners may seed from a shared base
//! model; the base keeps a reference count of its dependents and is finished
//! only after the last of them.
//!
//! # Guarantees
//!
//! - Teardown runs at most once per handle, whether triggered explicitly,
//!   by the last reference release, or by drop.
//! - A handle is cleared before the engine is asked to finish it, so a
//!   failing finish is never retried.
//! - Pooled examples are freed exactly once; chained examples are unlinked
//!   and never freed on their own.
//! - Dependents are finished before their base.

pub mod cli;
pub mod config;
pub mod engine;
pub mod ffi;
pub mod learner;
pub mod memory;
pub mod telemetry;

pub use engine::{EngineError, InMemoryEngine, NativeEngine, RawExample, RawModel};
pub use learner::{Learner, LearnerConfig, LearnerError, LearnerSettings, ModelArguments, ParallelOptions};
pub use memory::{Example, ExamplePool, PoolError, PoolMode, PooledExample};
