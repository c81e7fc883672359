//! Example memory management for GG-LEARNER.
//!
//! Provides pooled examples and derived-example chains.

mod example;
mod pool;

pub use example::Example;
pub use pool::{ExamplePool, PoolError, PoolMode, PooledExample};
