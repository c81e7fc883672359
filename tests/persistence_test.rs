//! Save and reload tests.

use std::io::Read;
use std::sync::Arc;

use gg_learner::engine::{EngineError, ModelImage};
use gg_learner::{InMemoryEngine, Learner, LearnerError, LearnerSettings, ParallelOptions};

fn learner(engine: &Arc<InMemoryEngine>, args: &str) -> Learner {
    Learner::new(engine.clone(), LearnerSettings::new(args)).unwrap()
}

#[test]
fn save_without_final_regressor_is_noop() {
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "--id quiet");

    learner.save_model().unwrap();
    assert_eq!(engine.stats().saves, 0);
}

#[test]
fn save_uses_final_regressor_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("final.model");
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, &format!("--id final -f {}", path.display()));

    learner.save_model().unwrap();
    assert!(path.exists());
    assert_eq!(engine.stats().saves, 1);
}

#[test]
fn save_to_empty_path_is_invalid() {
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "");

    let err = learner.save_model_to("").unwrap_err();
    assert!(matches!(err, LearnerError::InvalidArgument(_)));
    assert_eq!(engine.stats().saves, 0);
}

#[test]
fn save_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a").join("b").join("model.bin");
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "--id nested");

    learner.save_model_to(&path).unwrap();

    let mut bytes = Vec::new();
    std::fs::File::open(&path).unwrap().read_to_end(&mut bytes).unwrap();
    assert_eq!(ModelImage::decode(&bytes).unwrap().id, "nested");
}

#[test]
fn save_to_writer_produces_image() {
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "--id w -b 6 -q ab");

    let mut bytes = Vec::new();
    learner.save_model_to_writer(&mut bytes).unwrap();

    assert!(bytes.starts_with(b"GGLM1\n"));
    let image = ModelImage::decode(&bytes).unwrap();
    assert_eq!(image.id, "w");
    assert_eq!(image.bit_precision, 6);
    assert_eq!(image.interactions, vec!["ab"]);
}

#[test]
fn model_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("round.model");
    let engine = Arc::new(InMemoryEngine::new());

    learner(&engine, "--id round -b 9").save_model_to(&path).unwrap();

    let settings = LearnerSettings::new("").with_model_file(&path).unwrap();
    let loaded = Learner::new(engine.clone(), settings).unwrap();
    assert_eq!(loaded.id().unwrap(), "round");
    assert_eq!(engine.options(loaded.raw_model().unwrap()).unwrap().bit_precision, 9);
}

#[test]
fn reload_applies_new_arguments() {
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "--id before -b 11");
    let old = learner.raw_model().unwrap();

    learner.reload(Some("--id after")).unwrap();

    let fresh = learner.raw_model().unwrap();
    assert_ne!(old, fresh);
    assert!(!engine.contains(old));
    assert_eq!(learner.id().unwrap(), "after");
    assert_eq!(engine.options(fresh).unwrap().bit_precision, 11);

    let stats = engine.stats();
    assert_eq!(stats.finished, 1);
    assert_eq!(stats.initialized, 2);
    assert_eq!(stats.parser_releases, 1);
}

#[test]
fn reload_without_arguments_keeps_identity() {
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "--id same");

    learner.reload(None).unwrap();
    assert_eq!(learner.id().unwrap(), "same");
    assert_eq!(engine.live_models(), 1);
}

#[test]
fn reload_keeps_pooled_examples() {
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "");
    drop(learner.get_or_create_example().unwrap());

    learner.reload(None).unwrap();
    assert_eq!(learner.pooled_examples(), 1);

    learner.dispose().unwrap();
    assert_eq!(engine.stats().examples_freed, 1);
}

#[test]
fn reload_rejected_when_distributed() {
    let engine = Arc::new(InMemoryEngine::new());
    let settings = LearnerSettings::new("--id peer").with_parallel_options(ParallelOptions {
        span_server: "localhost".into(),
        unique_id: 7,
        total: 2,
        node: 0,
    });
    let learner = Learner::new(engine.clone(), settings).unwrap();
    let before = learner.raw_model();

    let err = learner.reload(None).unwrap_err();
    assert!(matches!(err, LearnerError::NotSupported(_)));
    assert_eq!(learner.raw_model(), before);
    assert_eq!(engine.stats().saves, 0);
}

#[test]
fn reload_save_failure_keeps_current_model() {
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "--id keep");
    let before = learner.raw_model();
    engine.fail_next_save();

    let err = learner.reload(None).unwrap_err();
    assert!(matches!(err, LearnerError::Engine(EngineError::SaveFailed(_))));
    assert_eq!(learner.raw_model(), before);
    assert_eq!(learner.id().unwrap(), "keep");
}

#[test]
fn reload_finish_failure_leaves_learner_disposed() {
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "");
    engine.fail_next_finish();

    assert!(learner.reload(None).is_err());
    assert!(learner.is_disposed());

    learner.dispose().unwrap();
    assert_eq!(engine.stats().finish_calls, 1);
}

#[test]
fn reload_after_dispose_reports_disposed() {
    let engine = Arc::new(InMemoryEngine::new());
    let learner = learner(&engine, "");
    learner.dispose().unwrap();

    assert!(matches!(learner.reload(None), Err(LearnerError::Disposed)));
    assert!(matches!(learner.save_model_to("x.model"), Err(LearnerError::Disposed)));
}
