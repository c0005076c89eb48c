use lineage::errors::ErrorKind;
use lineage::migration::MigrationState;
use lineage::store::{JournaledStore, StoreMetadata};
use lineage_int_test::test_util::{
    cleanup, create_store, create_test_context, fingerprint, run_test, RecordingTransformer,
    VERSIONS,
};
use std::fs;

#[test]
fn test_failure_on_any_step_keeps_original() {
    for fail_at in ["v2", "v3", "v4"] {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.store_path();
                create_store(&store, fingerprint("v1").metadata(), &["alice", "bob"])?;
                let before = fs::read(&store)?;

                let transformer = RecordingTransformer::new(&ctx).failing_at(fail_at);
                let engine = ctx.engine_builder().transformer(transformer.clone()).build()?;

                let err = engine.migrate_to_latest(&store).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::TransformError);
                assert!(err
                    .cause()
                    .map(|cause| cause.message().contains(fail_at))
                    .unwrap_or(false));
                assert_eq!(engine.state(), MigrationState::FatalAborted);

                let failed_step = VERSIONS.iter().position(|v| *v == fail_at).unwrap_or(0);
                assert_eq!(transformer.calls(), failed_step);

                assert_eq!(fs::read(&store)?, before);
                let orphans = engine.scratch().artifacts(&store)?;
                assert!(orphans.len() <= 1, "orphaned temporaries: {:?}", orphans);
                assert_eq!(ctx.files()?.len(), 1 + orphans.len());
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_unknown_metadata_is_rejected_untouched() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, StoreMetadata::new("someone-else/v1"), &["alice"])?;
            let before = fs::read(&store)?;

            let transformer = RecordingTransformer::new(&ctx);
            let engine = ctx.engine_builder().transformer(transformer.clone()).build()?;

            let err = engine.migrate_to_latest(&store).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
            assert_eq!(transformer.calls(), 0);
            assert_eq!(fs::read(&store)?, before);
            assert!(!ctx.scratch_dir().exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_downgrade_is_rejected_untouched() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v3").metadata(), &["alice"])?;
            let before = fs::read(&store)?;

            let transformer = RecordingTransformer::new(&ctx);
            let engine = ctx.engine_builder().transformer(transformer.clone()).build()?;

            let err = engine.migrate_to(&store, "v1").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
            assert_eq!(transformer.calls(), 0);
            assert_eq!(fs::read(&store)?, before);
            assert!(!ctx.scratch_dir().exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_missing_and_corrupted_stores() {
    run_test(
        create_test_context,
        |ctx| {
            let engine = ctx
                .engine_builder()
                .transformer(RecordingTransformer::new(&ctx))
                .build()?;

            let err = engine.migrate_to_latest(&ctx.store_path()).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FileNotFound);
            assert!(err.kind().is_io());

            let store = ctx.store_path();
            fs::write(&store, b"not a store at all")?;
            let err = engine.migrate_to_latest(&store).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FileCorrupted);
            assert_eq!(fs::read(&store)?, b"not a store at all");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_purge_scratch_removes_leftovers_of_aborted_runs() {
    run_test(
        create_test_context,
        |ctx| {
            let engine = ctx
                .engine_builder()
                .transformer(RecordingTransformer::new(&ctx))
                .build()?;

            // what a process killed mid-step leaves behind
            let store = ctx.store_path();
            fs::create_dir_all(ctx.scratch_dir())?;
            let leftover = ctx.scratch_dir().join(format!(
                ".lineage-app.store.v1-v2.{}",
                uuid::Uuid::new_v4().simple()
            ));
            JournaledStore::create(&leftover, fingerprint("v2").metadata())?.close()?;
            // a store migrating next door shares the scratch directory
            let neighbour = ctx.scratch_dir().join(format!(
                ".lineage-other.store.v1-v2.{}",
                uuid::Uuid::new_v4().simple()
            ));
            JournaledStore::create(&neighbour, fingerprint("v2").metadata())?.close()?;
            let unrelated = ctx.scratch_dir().join("keep.me");
            fs::write(&unrelated, b"keep")?;

            assert_eq!(engine.purge_scratch(&store)?, 1);
            assert!(!leftover.exists());
            assert!(neighbour.exists());
            assert!(unrelated.exists());

            // the next run starts over from the untouched original
            create_store(&store, fingerprint("v1").metadata(), &["alice"])?;
            let report = engine.migrate_to_latest(&store)?;
            assert_eq!(report.steps().len(), 3);
            Ok(())
        },
        cleanup,
    )
}
