//! Learner construction, reference counting and teardown.
//!
//! A learner owns one native model handle and the pool of examples leased
//! against it. Other learners may seed from it; each dependent holds one
//! reference and releases it after its own teardown, so dependents are
//! always finished before their base.

use std::io::Read;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::settings::{LearnerConfig, LearnerSettings, ModelArguments};
use super::LearnerError;
use crate::engine::{Deallocators, NativeEngine, RawModel};
use crate::memory::{ExamplePool, PoolMode, PooledExample};
use crate::telemetry;

const NO_STDIN_FLAG: &str = "--no_stdin";

pub(super) struct LearnerState {
    pub(super) model: Option<RawModel>,
    pub(super) examples: Option<ExamplePool>,
    pub(super) base: Option<Arc<Learner>>,
}

impl LearnerState {
    pub(super) fn live_model(&self) -> Result<RawModel, LearnerError> {
        self.model.ok_or(LearnerError::Disposed)
    }
}

/// Wrapper around one native model handle.
///
/// Dropping the last value runs the same teardown as [`Learner::dispose`].
/// Teardown is skipped while dependents still hold references.
pub struct Learner {
    pub(super) engine: Arc<dyn NativeEngine>,
    pub(super) config: LearnerConfig,
    instance_count: AtomicI64,
    pub(super) state: Mutex<LearnerState>,
}

impl Learner {
    /// Build a learner by seeding from a base model, reading a saved model
    /// stream, or initializing fresh from the arguments, in that order.
    ///
    /// On failure any partially built native state is abandoned.
    pub fn new(engine: Arc<dyn NativeEngine>, settings: LearnerSettings) -> Result<Self, LearnerError> {
        let LearnerSettings {
            arguments,
            model: base,
            model_stream,
            enable_thread_safe_example_pooling,
            parallel_options,
        } = settings;

        let built = match (&base, model_stream) {
            (Some(base), _) => {
                if !same_engine(&engine, &base.engine) {
                    return Err(LearnerError::InvalidArgument(
                        "base model belongs to a different engine".into(),
                    ));
                }
                base.seed_dependent(&arguments)
            }
            (None, Some(mut stream)) => {
                let args = with_no_stdin(&arguments);
                let reader: &mut dyn Read = &mut *stream;
                let built = engine.initialize(&args, Some(reader)).map_err(LearnerError::from);
                drop(stream);
                built
            }
            (None, None) => engine.initialize(&arguments, None).map_err(LearnerError::from),
        };

        let model = match built {
            Ok(model) => model,
            Err(e) => {
                tracing::error!(error = %e, "learner construction failed; partial native state abandoned");
                return Err(e);
            }
        };

        tracing::info!(
            model = model.id(),
            seeded = base.is_some(),
            thread_safe_pool = enable_thread_safe_example_pooling,
            "learner created"
        );

        Ok(Self {
            engine,
            config: LearnerConfig {
                arguments,
                enable_thread_safe_example_pooling,
                parallel_options,
            },
            instance_count: AtomicI64::new(0),
            state: Mutex::new(LearnerState {
                model: Some(model),
                examples: Some(ExamplePool::new(PoolMode::from_thread_safe(
                    enable_thread_safe_example_pooling,
                ))),
                base,
            }),
        })
    }

    /// Seed a dependent handle and take a reference while the base is locked,
    /// so a concurrent teardown cannot slip in between.
    fn seed_dependent(&self, arguments: &str) -> Result<RawModel, LearnerError> {
        let state = self.state.lock();
        let base = state.live_model()?;
        let model = self.engine.seed_model(base, arguments)?;
        self.increment_reference();
        Ok(model)
    }

    pub fn increment_reference(&self) {
        self.instance_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Release one reference; the call that brings the count to zero or
    /// below tears the learner down.
    pub fn decrement_reference(&self) -> Result<(), LearnerError> {
        let remaining = self.instance_count.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!(remaining, "learner reference released");
        if remaining <= 0 {
            return self.teardown();
        }
        Ok(())
    }

    pub fn reference_count(&self) -> i64 {
        self.instance_count.load(Ordering::SeqCst)
    }

    /// Explicit disposal. Idempotent; a no-op while references remain.
    pub fn dispose(&self) -> Result<(), LearnerError> {
        self.teardown()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().model.is_none()
    }

    /// Current native handle, or `None` once torn down.
    pub fn raw_model(&self) -> Option<RawModel> {
        self.state.lock().model
    }

    /// Engine this learner's handle belongs to.
    pub fn engine(&self) -> &Arc<dyn NativeEngine> {
        &self.engine
    }

    pub fn settings(&self) -> &LearnerConfig {
        &self.config
    }

    /// Lease an example, reusing a pooled one when available.
    pub fn get_or_create_example(&self) -> Result<PooledExample, LearnerError> {
        let state = self.state.lock();
        let model = state.live_model()?;
        let pool = state.examples.as_ref().ok_or(LearnerError::Disposed)?;

        if let Some(example) = pool.take()? {
            telemetry::record_example_lease(true);
            return Ok(example);
        }

        let raw = self.engine.alloc_example(model)?;
        telemetry::record_example_lease(false);
        Ok(pool.adopt(raw))
    }

    /// Number of examples currently waiting in the pool.
    pub fn pooled_examples(&self) -> usize {
        self.state.lock().examples.as_ref().map(ExamplePool::available).unwrap_or(0)
    }

    pub fn id(&self) -> Result<String, LearnerError> {
        let state = self.state.lock();
        Ok(self.engine.id(state.live_model()?)?)
    }

    pub fn set_id(&self, id: &str) -> Result<(), LearnerError> {
        let state = self.state.lock();
        Ok(self.engine.set_id(state.live_model()?, id)?)
    }

    pub fn arguments(&self) -> Result<ModelArguments, LearnerError> {
        let state = self.state.lock();
        let model = state.live_model()?;
        Ok(ModelArguments {
            command_line: self.engine.command_line(model)?,
            id: self.engine.id(model)?,
            final_regressor: self.engine.final_regressor_name(model)?,
        })
    }

    /// Describe the first feature incompatibility with `other`, if any.
    ///
    /// Both learners must belong to the same engine; handles are only
    /// meaningful to the engine that issued them.
    pub fn are_features_compatible(&self, other: &Learner) -> Result<Option<String>, LearnerError> {
        if !same_engine(&self.engine, &other.engine) {
            return Err(LearnerError::InvalidArgument(
                "learners belong to different engines".into(),
            ));
        }

        // Snapshot both handles without holding two locks at once.
        let theirs = other.state.lock().live_model()?;
        let ours = self.state.lock().live_model()?;
        Ok(self.engine.are_features_compatible(ours, theirs))
    }

    /// Release examples, the native handle and the base reference, once.
    ///
    /// The handle is cleared before `finish` runs so a failing finish can
    /// never be retried on the same handle.
    fn teardown(&self) -> Result<(), LearnerError> {
        let mut state = self.state.lock();

        let references = self.reference_count();
        if references > 0 {
            tracing::debug!(references, "teardown skipped; learner still referenced");
            return Ok(());
        }

        let Some(model) = state.model else {
            return Ok(());
        };

        let deallocators = match self.engine.deallocators(model) {
            Ok(deallocators) => Some(deallocators),
            Err(e) => {
                tracing::warn!(
                    model = model.id(),
                    error = %e,
                    "deallocators unavailable; pooled example buffers abandoned"
                );
                None
            }
        };
        let freed = match state.examples.take() {
            Some(pool) => self.drain_examples(&pool, deallocators.as_ref()),
            None => 0,
        };
        let base = state.base.take();

        self.engine.release_parser_datastructures(model);

        state.model = None;
        let finished = self.engine.finish(model);
        drop(state);

        telemetry::record_teardown(freed);
        tracing::info!(model = model.id(), examples_freed = freed, "learner torn down");

        let released = match base {
            Some(base) => base.decrement_reference(),
            None => Ok(()),
        };

        match (finished, released) {
            (Err(e), Err(base_err)) => {
                tracing::error!(error = %base_err, "base model release failed after finish failure");
                Err(e.into())
            }
            (Err(e), Ok(())) => Err(e.into()),
            (Ok(()), released) => released,
        }
    }

    fn drain_examples(&self, pool: &ExamplePool, deallocators: Option<&Deallocators>) -> usize {
        let mut freed = 0;
        for example in pool.drain() {
            if let (Some(raw), Some(deallocators)) = (example.raw(), deallocators) {
                self.engine.dealloc_example(
                    &deallocators.delete_label,
                    raw,
                    &deallocators.delete_prediction,
                );
                freed += 1;
            }

            // Chained nodes share the head's allocation: unlink, never free.
            example.unlink_chain();
            example.unlink();
        }
        freed
    }
}

impl Drop for Learner {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            tracing::error!(error = %e, "learner teardown failed during drop");
        }
    }
}

impl std::fmt::Debug for Learner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Learner")
            .field("model", &self.raw_model())
            .field("references", &self.reference_count())
            .field("config", &self.config)
            .finish()
    }
}

fn same_engine(a: &Arc<dyn NativeEngine>, b: &Arc<dyn NativeEngine>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn with_no_stdin(arguments: &str) -> String {
    if arguments.split_whitespace().any(|arg| arg == NO_STDIN_FLAG) {
        arguments.to_string()
    } else if arguments.trim().is_empty() {
        NO_STDIN_FLAG.to_string()
    } else {
        format!("{} {}", arguments, NO_STDIN_FLAG)
    }
}
