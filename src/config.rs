//! Runtime configuration loading from environment variables.
//!
//! All configuration values are loaded from `GG_LEARNER_*` environment
//! variables with sensible defaults. Invalid values fall back to defaults
//! without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `GG_LEARNER_ARGS` | (empty) | Default engine argument text |
//! | `GG_LEARNER_THREAD_SAFE_POOL` | false | Synchronize example pool access |
//! | `GG_LEARNER_LOG_LEVEL` | info | Log filter directive |
//! | `GG_LEARNER_LOG_FORMAT` | json | `json` or `pretty` |

use serde::Serialize;

use crate::telemetry::LogFormat;

/// All configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub arguments: String,
    pub thread_safe_pooling: bool,
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub arguments: String,
    pub thread_safe_pooling: bool,
    pub log_level: String,
    pub log_format: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            arguments: String::new(),
            thread_safe_pooling: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

/// Parse a boolean env var, returning `default` on missing or invalid.
fn parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Read a string env var, returning `default` on missing or blank.
fn parse_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let defaults = EnvConfig::default();
    let log_format = std::env::var("GG_LEARNER_LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or(defaults.log_format);

    EnvConfig {
        arguments: std::env::var("GG_LEARNER_ARGS").unwrap_or_default().trim().to_string(),
        thread_safe_pooling: parse_bool("GG_LEARNER_THREAD_SAFE_POOL", defaults.thread_safe_pooling),
        log_level: parse_string("GG_LEARNER_LOG_LEVEL", &defaults.log_level),
        log_format,
    }
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            arguments: self.arguments.clone(),
            thread_safe_pooling: self.thread_safe_pooling,
            log_level: self.log_level.clone(),
            log_format: match self.log_format {
                LogFormat::Json => "json".to_string(),
                LogFormat::Pretty => "pretty".to_string(),
            },
        }
    }
}
