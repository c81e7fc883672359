//! Span utilities and extension traits for learner tracing.
//!
//! Provides standardized span creation and result recording.

use tracing::{info_span, Span};

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for creating standardized lifecycle spans.
pub struct LifecycleSpan;

impl LifecycleSpan {
    /// Create a span for one lifecycle operation.
    ///
    /// Fields included:
    /// - `operation`: e.g. `reload`, `save`, `teardown`
    /// - `model_id`: Native handle id (empty once torn down)
    /// - `status`: To be filled in by `SpanExt::record_result`
    /// - `error.message`: To be filled in on error
    pub fn new(operation: &str, model_id: &str) -> Span {
        info_span!(
            "learner_lifecycle",
            operation = %operation,
            model_id = %model_id,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    }
}
