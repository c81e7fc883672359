//! Learner construction and teardown tests.

use std::io::Cursor;
use std::sync::Arc;

use gg_learner::engine::EngineError;
use gg_learner::{InMemoryEngine, Learner, LearnerError, LearnerSettings, NativeEngine};

fn engine() -> Arc<InMemoryEngine> {
    Arc::new(InMemoryEngine::new())
}

fn learner(engine: &Arc<InMemoryEngine>, args: &str) -> Learner {
    Learner::new(engine.clone(), LearnerSettings::new(args)).unwrap()
}

#[test]
fn dispose_twice_finishes_once() {
    let engine = engine();
    let learner = learner(&engine, "--id once");

    learner.dispose().unwrap();
    learner.dispose().unwrap();
    drop(learner);

    let stats = engine.stats();
    assert_eq!(stats.finish_calls, 1);
    assert_eq!(stats.finished, 1);
    assert_eq!(stats.double_finishes, 0);
    assert_eq!(engine.live_models(), 0);
}

#[test]
fn drop_runs_teardown() {
    let engine = engine();
    {
        let _learner = learner(&engine, "");
        assert_eq!(engine.live_models(), 1);
    }
    assert_eq!(engine.live_models(), 0);
    assert_eq!(engine.stats().finished, 1);
}

#[test]
fn parser_structures_released_before_finish() {
    let engine = engine();
    let learner = learner(&engine, "");
    let raw = learner.raw_model().unwrap();
    assert!(engine.parser_live(raw));

    learner.dispose().unwrap();
    assert_eq!(engine.stats().parser_releases, 1);
}

#[test]
fn failed_finish_is_not_retried() {
    let engine = engine();
    let learner = learner(&engine, "");
    engine.fail_next_finish();

    let err = learner.dispose().unwrap_err();
    assert!(matches!(err, LearnerError::Engine(EngineError::FinishFailed { .. })));
    assert!(err.is_native_failure());
    assert!(learner.is_disposed());

    learner.dispose().unwrap();
    drop(learner);

    let stats = engine.stats();
    assert_eq!(stats.finish_calls, 1);
    assert_eq!(stats.double_finishes, 0);
    // The engine kept the handle when finish failed.
    assert_eq!(engine.live_models(), 1);
}

#[test]
fn missing_deallocators_do_not_block_teardown() {
    let engine = engine();
    let learner = learner(&engine, "");
    drop(learner.get_or_create_example().unwrap());
    engine.fail_next_deallocators();

    learner.dispose().unwrap();
    assert!(learner.is_disposed());
    learner.dispose().unwrap();
    drop(learner);

    let stats = engine.stats();
    assert_eq!(stats.finish_calls, 1);
    assert_eq!(stats.finished, 1);
    // Without callbacks the pooled buffer is abandoned, never freed.
    assert_eq!(stats.examples_freed, 0);
    assert_eq!(stats.double_frees, 0);
    assert_eq!(engine.live_examples(), 1);
    assert_eq!(engine.live_models(), 0);
}

#[test]
fn operations_after_dispose_report_disposed() {
    let engine = engine();
    let learner = learner(&engine, "--id gone");
    learner.dispose().unwrap();

    assert!(learner.raw_model().is_none());
    assert!(matches!(learner.id(), Err(LearnerError::Disposed)));
    assert!(matches!(learner.set_id("x"), Err(LearnerError::Disposed)));
    assert!(matches!(learner.arguments(), Err(LearnerError::Disposed)));
    assert!(matches!(learner.get_or_create_example(), Err(LearnerError::Disposed)));
}

#[test]
fn failed_initialize_abandons_partial_model() {
    let engine = engine();
    engine.fail_next_initialize();

    let result = Learner::new(engine.clone(), LearnerSettings::new("--id broken"));
    let err = result.unwrap_err();
    assert!(matches!(err, LearnerError::Engine(ref e) if e.is_construction_failure()));

    let stats = engine.stats();
    assert_eq!(stats.abandoned, 1);
    assert_eq!(stats.finish_calls, 0);
}

#[test]
fn failed_seed_leaves_base_count_unchanged() {
    let engine = engine();
    let base = Arc::new(learner(&engine, "--id base"));
    engine.fail_next_seed();

    let result = Learner::new(engine.clone(), LearnerSettings::new("").with_model(base.clone()));
    assert!(matches!(result, Err(LearnerError::Engine(EngineError::SeedFailed { .. }))));
    assert_eq!(base.reference_count(), 0);
    assert_eq!(engine.stats().abandoned, 1);

    base.dispose().unwrap();
    assert!(base.is_disposed());
}

#[test]
fn base_from_other_engine_rejected() {
    let first = engine();
    let second = engine();
    let base = Arc::new(learner(&first, ""));

    let result = Learner::new(second.clone(), LearnerSettings::new("").with_model(base.clone()));
    let err = result.unwrap_err();
    assert!(err.is_configuration_error());
    assert_eq!(base.reference_count(), 0);
    assert_eq!(second.live_models(), 0);
}

#[test]
fn stream_construction_disables_stdin() {
    let engine = engine();
    let source = learner(&engine, "--id streamed -b 14");
    let mut image = Vec::new();
    source.save_model_to_writer(&mut image).unwrap();

    let loaded = Learner::new(
        engine.clone(),
        LearnerSettings::new("-l 0.25").with_model_stream(Cursor::new(image)),
    )
    .unwrap();

    let raw = loaded.raw_model().unwrap();
    let options = engine.options(raw).unwrap();
    assert!(options.no_stdin);
    assert_eq!(options.id, "streamed");
    assert_eq!(options.bit_precision, 14);
    assert_eq!(loaded.arguments().unwrap().command_line, "-l 0.25 --no_stdin");
}

#[test]
fn corrupt_stream_fails_construction() {
    let engine = engine();
    let result = Learner::new(
        engine.clone(),
        LearnerSettings::new("").with_model_stream(Cursor::new(b"not a model".to_vec())),
    );
    assert!(matches!(result, Err(LearnerError::Engine(EngineError::InvalidImage(_)))));
    assert_eq!(engine.live_models(), 0);
}

#[test]
fn id_and_arguments_reflect_engine_state() {
    let engine = engine();
    let learner = learner(&engine, "--id first -f out.model");

    assert_eq!(learner.id().unwrap(), "first");
    learner.set_id("second").unwrap();
    let args = learner.arguments().unwrap();
    assert_eq!(args.id, "second");
    assert_eq!(args.final_regressor, "out.model");
    assert_eq!(args.command_line, "--id first -f out.model");
}

#[test]
fn settings_are_retained() {
    let engine = engine();
    let learner = Learner::new(
        engine.clone(),
        LearnerSettings::new("-b 12").with_thread_safe_example_pooling(true),
    )
    .unwrap();

    let config = learner.settings();
    assert_eq!(config.arguments, "-b 12");
    assert!(config.enable_thread_safe_example_pooling);
    assert!(!config.is_distributed());
    assert_eq!(learner.engine().id(learner.raw_model().unwrap()).unwrap(), "");
}
