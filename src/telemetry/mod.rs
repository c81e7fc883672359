//! Telemetry module for GG-LEARNER.
//!
//! Provides structured logging, lifecycle spans, and metrics collection.

mod logging;
mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{record_example_lease, record_reload, record_save, record_teardown};
pub use spans::{LifecycleSpan, SpanExt};
