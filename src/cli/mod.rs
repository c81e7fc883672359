// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI module for gg-learner commands.
//!
//! Commands run against the in-process engine, so they need no running
//! service.
//!
//! ## Usage
//!
//! ```bash
//! gg-learner-cli config show             # Effective GG_LEARNER_* settings
//! gg-learner-cli model save out.model    # Create a learner and save it
//! gg-learner-cli model inspect out.model # Load a saved model, print its arguments
//! gg-learner-cli model compat "-b 18" "-b 20"
//! ```

pub mod config_cmd;
pub mod model_cmd;

/// Merge default argument text with command line overrides.
pub fn merge_arguments(defaults: &str, overrides: &[String]) -> String {
    let mut merged = defaults.trim().to_string();
    for arg in overrides {
        if !merged.is_empty() {
            merged.push(' ');
        }
        merged.push_str(arg);
    }
    merged
}
