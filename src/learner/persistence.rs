//! Model persistence and in-place reload.
//!
//! Reload swaps the native handle behind a learner without changing the
//! learner itself: serialize, finish the old handle, rebuild from the image.

use std::io::{Cursor, Write};
use std::path::Path;

use super::{Learner, LearnerError};
use crate::engine::SaveTarget;
use crate::telemetry::{self, LifecycleSpan, SpanExt};

impl Learner {
    /// Save to the configured final regressor path. No-op when none is set.
    pub fn save_model(&self) -> Result<(), LearnerError> {
        let name = {
            let state = self.state.lock();
            self.engine.final_regressor_name(state.live_model()?)?
        };

        if name.is_empty() {
            return Ok(());
        }

        self.save_model_to(&name)
    }

    /// Save to `path`, creating the containing directory if needed.
    pub fn save_model_to(&self, path: impl AsRef<Path>) -> Result<(), LearnerError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(LearnerError::InvalidArgument("filename must not be empty".into()));
        }

        let state = self.state.lock();
        let model = state.live_model()?;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        self.engine.save_predictor(model, SaveTarget::File(path))?;
        telemetry::record_save();
        tracing::info!(model = model.id(), path = %path.display(), "model saved");
        Ok(())
    }

    /// Write the serialized model to `writer`.
    pub fn save_model_to_writer(&self, writer: &mut dyn Write) -> Result<(), LearnerError> {
        let state = self.state.lock();
        let model = state.live_model()?;
        self.engine.save_predictor(model, SaveTarget::Stream(writer))?;
        telemetry::record_save();
        Ok(())
    }

    /// Rebuild the native handle from its own serialized image plus new
    /// arguments (empty when `None`).
    ///
    /// Not available under distributed coordination: peers would fall out
    /// of sync.
    pub fn reload(&self, arguments: Option<&str>) -> Result<(), LearnerError> {
        if self.config.is_distributed() {
            return Err(LearnerError::NotSupported(
                "cannot reload model while distributed coordination is enabled".into(),
            ));
        }

        let model_id = self.raw_model().map(|m| m.id().to_string()).unwrap_or_default();
        let span = LifecycleSpan::new("reload", &model_id);
        let _enter = span.enter();

        let result = self.reload_inner(arguments.unwrap_or_default());
        span.record_result(&result);
        result
    }

    fn reload_inner(&self, arguments: &str) -> Result<(), LearnerError> {
        let mut state = self.state.lock();
        let old = state.live_model()?;

        let mut image = Vec::new();
        self.engine.save_predictor(old, SaveTarget::Stream(&mut image))?;

        self.engine.release_parser_datastructures(old);

        // Cleared first so a failing finish is never retried on this handle.
        state.model = None;
        self.engine.finish(old)?;

        let mut reader = Cursor::new(image);
        reader.set_position(0);
        let fresh = self.engine.initialize(arguments, Some(&mut reader))?;
        state.model = Some(fresh);

        telemetry::record_reload();
        tracing::info!(old = old.id(), new = fresh.id(), "model reloaded");
        Ok(())
    }
}
