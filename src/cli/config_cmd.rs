// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommands: show, defaults, validate.
//!
//! These commands read configuration directly from environment variables.

use crate::config::{self, EffectiveConfig, EnvConfig};

/// Print effective config as key-value pairs to stdout.
pub fn run_show(json: bool) -> i32 {
    let cfg = config::load().effective_config();
    if json {
        return print_json(&cfg);
    }
    print_config(&cfg);
    0
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    print_config(&EnvConfig::default().effective_config());
}

/// Check that the configured log filter and arguments are usable.
///
/// Returns 0 if valid, 1 if any warnings are found.
pub fn run_validate() -> i32 {
    let env = config::load();
    let mut warnings = 0;

    if tracing_subscriber::EnvFilter::try_new(&env.log_level).is_err() {
        eprintln!("WARNING: GG_LEARNER_LOG_LEVEL ({}) is not a valid filter", env.log_level);
        warnings += 1;
    }

    if let Err(e) = crate::engine::ModelOptions::parse(&env.arguments) {
        eprintln!("WARNING: GG_LEARNER_ARGS rejected: {}", e);
        warnings += 1;
    }

    if warnings == 0 {
        println!("Configuration is valid.");
        0
    } else {
        1
    }
}

fn print_json(cfg: &EffectiveConfig) -> i32 {
    match serde_json::to_string_pretty(cfg) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
            1
        }
    }
}

fn print_config(cfg: &EffectiveConfig) {
    println!("GG_LEARNER_ARGS={}", cfg.arguments);
    println!("GG_LEARNER_THREAD_SAFE_POOL={}", cfg.thread_safe_pooling);
    println!("GG_LEARNER_LOG_LEVEL={}", cfg.log_level);
    println!("GG_LEARNER_LOG_FORMAT={}", cfg.log_format);
}
