// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! C ABI for hosts that drive learners from outside Rust.
//!
//! Every fallible call returns a [`GgErrorCode`]; the message for the most
//! recent failure on the calling thread is available from `gg_last_error`.

mod error;
mod learner;

pub use error::{gg_last_error, GgErrorCode};
pub use learner::*;
