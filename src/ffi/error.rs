// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error codes and last-error storage for the C ABI

use std::cell::RefCell;
use std::ffi::{c_char, CString};

use crate::learner::LearnerError;

/// Result code returned by every fallible FFI call
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GgErrorCode {
    Ok = 0,
    NullPointer = -1,
    InvalidArgument = -2,
    NotSupported = -3,
    Disposed = -4,
    EngineFailure = -5,
    PoolFailure = -6,
    Io = -7,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

pub(crate) fn set_last_error(message: impl Into<String>) {
    let message = message.into().replace('\0', " ");
    let cstr = CString::new(message).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(cstr));
}

pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Last error message on this thread, or null. Valid until the next call.
#[no_mangle]
pub extern "C" fn gg_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|msg| msg.as_ptr())
            .unwrap_or(std::ptr::null())
    })
}

impl From<LearnerError> for GgErrorCode {
    fn from(err: LearnerError) -> Self {
        set_last_error(err.to_string());
        match err {
            LearnerError::InvalidArgument(_) => GgErrorCode::InvalidArgument,
            LearnerError::NotSupported(_) => GgErrorCode::NotSupported,
            LearnerError::Disposed => GgErrorCode::Disposed,
            LearnerError::Engine(_) => GgErrorCode::EngineFailure,
            LearnerError::Pool(_) => GgErrorCode::PoolFailure,
            LearnerError::Io(_) => GgErrorCode::Io,
        }
    }
}

impl<T> From<Result<T, LearnerError>> for GgErrorCode {
    fn from(result: Result<T, LearnerError>) -> Self {
        match result {
            Ok(_) => {
                clear_last_error();
                GgErrorCode::Ok
            }
            Err(e) => e.into(),
        }
    }
}
