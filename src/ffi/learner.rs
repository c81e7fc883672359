// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Learner lifecycle functions for FFI
//!
//! `gg_learner_free` is the finalizer path: it drops the caller's reference
//! and tears the learner down once nothing else holds it.
//! `gg_learner_dispose` is the explicit path.

use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;

use super::error::{clear_last_error, set_last_error, GgErrorCode};
use crate::engine::{InMemoryEngine, NativeEngine};
use crate::learner::{Learner, LearnerSettings};

/// Opaque engine reference handed to C callers
pub struct GgEngine {
    inner: Arc<dyn NativeEngine>,
}

impl GgEngine {
    /// Box an engine for C callers; release with `gg_engine_free`
    pub fn into_raw(engine: Arc<dyn NativeEngine>) -> *mut GgEngine {
        Box::into_raw(Box::new(GgEngine { inner: engine }))
    }
}

/// Opaque learner reference handed to C callers
pub struct GgLearner {
    inner: Arc<Learner>,
}

impl GgLearner {
    pub fn learner(&self) -> &Arc<Learner> {
        &self.inner
    }
}

unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, GgErrorCode> {
    if ptr.is_null() {
        set_last_error(format!("{} must not be null", what));
        return Err(GgErrorCode::InvalidArgument);
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| {
        set_last_error(format!("invalid UTF-8 in {}", what));
        GgErrorCode::InvalidArgument
    })
}

/// Callers check `out` for null first.
unsafe fn write_string(out: *mut *mut c_char, value: Option<String>) {
    *out = value
        .map(|v| CString::new(v.replace('\0', " ")).unwrap_or_default().into_raw())
        .unwrap_or(std::ptr::null_mut());
}

/// Create an in-process engine
#[no_mangle]
pub extern "C" fn gg_engine_in_memory_new() -> *mut GgEngine {
    GgEngine::into_raw(Arc::new(InMemoryEngine::new()))
}

/// Release an engine reference. Learners keep their own reference.
#[no_mangle]
pub unsafe extern "C" fn gg_engine_free(engine: *mut GgEngine) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Create a learner from argument text
#[no_mangle]
pub unsafe extern "C" fn gg_learner_new(
    engine: *const GgEngine,
    arguments: *const c_char,
    thread_safe_pooling: bool,
    out_learner: *mut *mut GgLearner,
) -> GgErrorCode {
    if engine.is_null() || out_learner.is_null() {
        set_last_error("null pointer argument");
        return GgErrorCode::NullPointer;
    }

    let arguments = match read_str(arguments, "arguments") {
        Ok(s) => s,
        Err(code) => return code,
    };

    let settings =
        LearnerSettings::new(arguments).with_thread_safe_example_pooling(thread_safe_pooling);
    match Learner::new(Arc::clone(&(*engine).inner), settings) {
        Ok(learner) => {
            *out_learner = Box::into_raw(Box::new(GgLearner { inner: Arc::new(learner) }));
            clear_last_error();
            GgErrorCode::Ok
        }
        Err(e) => {
            *out_learner = std::ptr::null_mut();
            e.into()
        }
    }
}

/// Create a learner seeded from `base`, sharing its learned state
#[no_mangle]
pub unsafe extern "C" fn gg_learner_seed(
    base: *const GgLearner,
    arguments: *const c_char,
    out_learner: *mut *mut GgLearner,
) -> GgErrorCode {
    if base.is_null() || out_learner.is_null() {
        set_last_error("null pointer argument");
        return GgErrorCode::NullPointer;
    }

    let arguments = match read_str(arguments, "arguments") {
        Ok(s) => s,
        Err(code) => return code,
    };

    let base = Arc::clone(&(*base).inner);
    let engine = Arc::clone(base.engine());
    let settings = LearnerSettings::new(arguments).with_model(base);
    match Learner::new(engine, settings) {
        Ok(learner) => {
            *out_learner = Box::into_raw(Box::new(GgLearner { inner: Arc::new(learner) }));
            clear_last_error();
            GgErrorCode::Ok
        }
        Err(e) => {
            *out_learner = std::ptr::null_mut();
            e.into()
        }
    }
}

/// Explicitly dispose a learner. The reference stays valid until freed.
#[no_mangle]
pub unsafe extern "C" fn gg_learner_dispose(learner: *const GgLearner) -> GgErrorCode {
    if learner.is_null() {
        set_last_error("null pointer argument");
        return GgErrorCode::NullPointer;
    }
    (*learner).inner.dispose().into()
}

/// Drop the caller's reference (finalizer path)
#[no_mangle]
pub unsafe extern "C" fn gg_learner_free(learner: *mut GgLearner) {
    if !learner.is_null() {
        drop(Box::from_raw(learner));
    }
}

/// Save to `path`; a null or empty path is an invalid argument
#[no_mangle]
pub unsafe extern "C" fn gg_learner_save_model(
    learner: *const GgLearner,
    path: *const c_char,
) -> GgErrorCode {
    if learner.is_null() {
        set_last_error("null pointer argument");
        return GgErrorCode::NullPointer;
    }

    let path = match read_str(path, "filename") {
        Ok(s) => s,
        Err(code) => return code,
    };

    (*learner).inner.save_model_to(path).into()
}

/// Save to the configured final regressor path, if any
#[no_mangle]
pub unsafe extern "C" fn gg_learner_save_default(learner: *const GgLearner) -> GgErrorCode {
    if learner.is_null() {
        set_last_error("null pointer argument");
        return GgErrorCode::NullPointer;
    }
    (*learner).inner.save_model().into()
}

/// Reload in place; `arguments` may be null
#[no_mangle]
pub unsafe extern "C" fn gg_learner_reload(
    learner: *const GgLearner,
    arguments: *const c_char,
) -> GgErrorCode {
    if learner.is_null() {
        set_last_error("null pointer argument");
        return GgErrorCode::NullPointer;
    }

    let arguments = if arguments.is_null() {
        None
    } else {
        match read_str(arguments, "arguments") {
            Ok(s) => Some(s),
            Err(code) => return code,
        }
    };

    (*learner).inner.reload(arguments).into()
}

/// Current model id; free the string with `gg_string_free`
#[no_mangle]
pub unsafe extern "C" fn gg_learner_id(
    learner: *const GgLearner,
    out_id: *mut *mut c_char,
) -> GgErrorCode {
    if learner.is_null() || out_id.is_null() {
        set_last_error("null pointer argument");
        return GgErrorCode::NullPointer;
    }

    match (*learner).inner.id() {
        Ok(id) => {
            write_string(out_id, Some(id));
            clear_last_error();
            GgErrorCode::Ok
        }
        Err(e) => {
            write_string(out_id, None);
            e.into()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn gg_learner_set_id(
    learner: *const GgLearner,
    id: *const c_char,
) -> GgErrorCode {
    if learner.is_null() {
        set_last_error("null pointer argument");
        return GgErrorCode::NullPointer;
    }

    let id = match read_str(id, "id") {
        Ok(s) => s,
        Err(code) => return code,
    };

    (*learner).inner.set_id(id).into()
}

/// Compare feature configuration; `out_diff` is null when compatible
#[no_mangle]
pub unsafe extern "C" fn gg_learner_features_compatible(
    learner: *const GgLearner,
    other: *const GgLearner,
    out_diff: *mut *mut c_char,
) -> GgErrorCode {
    if learner.is_null() || other.is_null() || out_diff.is_null() {
        set_last_error("null pointer argument");
        return GgErrorCode::NullPointer;
    }

    match (*learner).inner.are_features_compatible(&(*other).inner) {
        Ok(diff) => {
            write_string(out_diff, diff);
            clear_last_error();
            GgErrorCode::Ok
        }
        Err(e) => {
            write_string(out_diff, None);
            e.into()
        }
    }
}

/// Free a string returned by this library
#[no_mangle]
pub unsafe extern "C" fn gg_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
