use lineage::errors::ErrorKind;
use lineage::migration::{MigrationEvent, MigrationEventListener, MigrationState};
use lineage_int_test::test_util::{
    cleanup, create_store, create_test_context, fingerprint, read_records, run_test,
    RecordingTransformer,
};
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;

#[test]
fn test_migrate_v2_store_to_latest() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v2").metadata(), &["alice", "bob"])?;

            let transformer = RecordingTransformer::new(&ctx);
            let engine = ctx.engine_builder().transformer(transformer.clone()).build()?;

            let report = engine.migrate_to_latest(&store)?;
            assert_eq!(report.source().identifier(), "v2");
            assert_eq!(report.target().identifier(), "v4");
            assert_eq!(report.steps().len(), 2);
            assert!(report.finished_at() >= report.started_at());

            assert_eq!(transformer.calls(), 2);
            assert_eq!(transformer.steps(), vec!["v2 -> v3", "v3 -> v4"]);
            assert!(transformer.peak_files() <= 2);

            assert_eq!(read_records(&store)?, vec!["alice|v3|v4", "bob|v3|v4"]);
            let metadata = engine.inspector().read_metadata(&store)?;
            let version = engine.inspector().compatible_version(&metadata)?;
            assert_eq!(version, Some(report.target().clone()));
            assert_eq!(engine.state(), MigrationState::Done);

            // only the migrated store is left
            assert_eq!(ctx.files()?, vec![store.clone()]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_migrate_current_store_is_noop() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v4").metadata(), &["alice"])?;
            let content = fs::read(&store)?;
            let modified = fs::metadata(&store)?.modified()?;

            let transformer = RecordingTransformer::new(&ctx);
            let engine = ctx.engine_builder().transformer(transformer.clone()).build()?;

            let report = engine.migrate_to(&store, "v4")?;
            assert!(report.is_no_op());
            assert_eq!(engine.state(), MigrationState::NoOp);
            assert_eq!(transformer.calls(), 0);

            assert_eq!(fs::read(&store)?, content);
            assert_eq!(fs::metadata(&store)?.modified()?, modified);
            assert!(!ctx.scratch_dir().exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_migrate_to_intermediate_version() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v1").metadata(), &["alice"])?;

            let transformer = RecordingTransformer::new(&ctx);
            let engine = ctx.engine_builder().transformer(transformer.clone()).build()?;

            let report = engine.migrate_to(&store, "v3")?;
            assert_eq!(report.target().identifier(), "v3");
            assert_eq!(read_records(&store)?, vec!["alice|v2|v3"]);

            // a second call picks up where the first one ended
            let report = engine.migrate_to_latest(&store)?;
            assert_eq!(report.source().identifier(), "v3");
            assert_eq!(transformer.steps(), vec!["v1 -> v2", "v2 -> v3", "v3 -> v4"]);
            assert_eq!(read_records(&store)?, vec!["alice|v2|v3|v4"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_listeners_observe_every_transition() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v2").metadata(), &["alice"])?;

            let events: Arc<Mutex<Vec<MigrationEvent>>> = Arc::new(Mutex::new(Vec::new()));
            let sink = events.clone();
            let engine = ctx
                .engine_builder()
                .transformer(RecordingTransformer::new(&ctx))
                .add_listener(MigrationEventListener::new(move |event: &MigrationEvent| {
                    sink.lock().push(event.clone());
                    Ok(())
                }))
                .build()?;

            engine.migrate_to_latest(&store)?;

            let events = events.lock();
            let states: Vec<MigrationState> = events.iter().map(|e| e.state()).collect();
            assert_eq!(
                states,
                vec![
                    MigrationState::Idle,
                    MigrationState::Flushing,
                    MigrationState::Inspecting,
                    MigrationState::Planning,
                    MigrationState::Executing { step: 1, of: 2 },
                    MigrationState::Executing { step: 2, of: 2 },
                    MigrationState::Verifying,
                    MigrationState::Swapping,
                    MigrationState::Done,
                ]
            );
            assert!(events.iter().all(|e| e.store_path() == store.as_path()));
            assert!(events
                .windows(2)
                .all(|pair| pair[0].timestamp() <= pair[1].timestamp()));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unknown_target_identifier() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v1").metadata(), &[])?;
            let engine = ctx
                .engine_builder()
                .transformer(RecordingTransformer::new(&ctx))
                .build()?;

            let err = engine.migrate_to(&store, "v7").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unverified_steps_still_verify_the_result() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v3").metadata(), &["alice"])?;
            let before = fs::read(&store)?;

            // writes a v3 store where a v4 store is expected
            let engine = ctx
                .engine_builder()
                .verify_each_step(false)
                .transformer(
                    lineage::migration::StepTransformers::new().register("v3", "v4", |input, output| {
                        fs::copy(input, output)?;
                        Ok(())
                    }),
                )
                .build()?;

            let err = engine.migrate_to_latest(&store).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransformError);
            assert_eq!(engine.state(), MigrationState::FatalAborted);
            assert_eq!(fs::read(&store)?, before);
            assert_eq!(ctx.files()?, vec![store.clone()]);
            Ok(())
        },
        cleanup,
    )
}
