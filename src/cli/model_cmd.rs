// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Model CLI subcommands: save, inspect, compat.
//!
//! Each command builds learners on a fresh in-process engine, reports the
//! result on stdout and disposes everything before returning.

use std::path::Path;
use std::sync::Arc;

use crate::config::EnvConfig;
use crate::engine::{InMemoryEngine, NativeEngine};
use crate::learner::{Learner, LearnerError, LearnerSettings};

/// Create a learner from `arguments` and save it to `path`.
///
/// Returns exit code: 0 on success, 1 on failure.
pub fn run_save(env: &EnvConfig, arguments: &str, path: &Path) -> i32 {
    let engine: Arc<dyn NativeEngine> = Arc::new(InMemoryEngine::new());
    let settings = LearnerSettings::from_env(env);
    let settings = LearnerSettings { arguments: arguments.to_string(), ..settings };

    let result = Learner::new(engine, settings).and_then(|learner| {
        learner.save_model_to(path)?;
        let id = learner.id()?;
        learner.dispose()?;
        Ok(id)
    });

    match result {
        Ok(id) => {
            println!("Saved model '{}' to {}", id, path.display());
            0
        }
        Err(e) => report("save", &e),
    }
}

/// Load a saved model and print its effective arguments as JSON.
pub fn run_inspect(path: &Path, arguments: &str) -> i32 {
    let engine: Arc<dyn NativeEngine> = Arc::new(InMemoryEngine::new());

    let result = LearnerSettings::new(arguments)
        .with_model_file(path)
        .and_then(|settings| Learner::new(engine, settings))
        .and_then(|learner| {
            let args = learner.arguments()?;
            learner.dispose()?;
            Ok(args)
        });

    match result {
        Ok(args) => match serde_json::to_string_pretty(&args) {
            Ok(text) => {
                println!("{}", text);
                0
            }
            Err(e) => {
                eprintln!("Failed to serialize arguments: {}", e);
                1
            }
        },
        Err(e) => report("inspect", &e),
    }
}

/// Compare the feature configuration of two argument sets.
///
/// Returns exit code: 0 when compatible, 2 when not, 1 on failure.
pub fn run_compat(first: &str, second: &str) -> i32 {
    let engine: Arc<dyn NativeEngine> = Arc::new(InMemoryEngine::new());

    let result = Learner::new(Arc::clone(&engine), LearnerSettings::new(first)).and_then(|a| {
        let b = Learner::new(engine, LearnerSettings::new(second))?;
        a.are_features_compatible(&b)
    });

    match result {
        Ok(None) => {
            println!("Compatible.");
            0
        }
        Ok(Some(diff)) => {
            println!("Incompatible: {}", diff);
            2
        }
        Err(e) => report("compat", &e),
    }
}

fn report(command: &str, err: &LearnerError) -> i32 {
    tracing::error!(command, error = %err, "model command failed");
    eprintln!("Error: {}", err);
    if err.is_configuration_error() {
        eprintln!("Check the argument text and paths passed to '{}'.", command);
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cli.model");

        assert_eq!(run_save(&EnvConfig::default(), "--id cli -b 16", &path), 0);
        assert!(path.exists());
        assert_eq!(run_inspect(&path, ""), 0);
    }

    #[test]
    fn test_save_rejects_bad_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.model");
        assert_eq!(run_save(&EnvConfig::default(), "-b 99", &path), 1);
        assert!(!path.exists());
    }

    #[test]
    fn test_inspect_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_inspect(&dir.path().join("missing.model"), ""), 1);
    }

    #[test]
    fn test_compat_exit_codes() {
        assert_eq!(run_compat("-b 18", "-b 18"), 0);
        assert_eq!(run_compat("-b 18", "-b 20"), 2);
        assert_eq!(run_compat("-b 0", "-b 18"), 1);
    }
}
