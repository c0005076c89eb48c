use lineage::store::{JournaledStore, OpenMode};
use lineage_int_test::test_util::{
    append_to_journal, cleanup, create_store, create_test_context, fingerprint, read_records,
    run_test, RecordingTransformer,
};

#[test]
fn test_journaled_writes_reach_the_first_step() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v2").metadata(), &["alice"])?;
            append_to_journal(&store, &["bob", "carol"])?;
            assert_eq!(JournaledStore::open(&store, OpenMode::ReadWrite)?.pending_count(), 2);

            let transformer = RecordingTransformer::new(&ctx);
            let engine = ctx.engine_builder().transformer(transformer.clone()).build()?;
            engine.migrate_to_latest(&store)?;

            assert_eq!(
                transformer.first_input(),
                Some(vec!["alice".to_string(), "bob".to_string(), "carol".to_string()])
            );
            assert_eq!(
                read_records(&store)?,
                vec!["alice|v3|v4", "bob|v3|v4", "carol|v3|v4"]
            );
            // the stale journal of the old store must not survive the swap
            assert_eq!(ctx.files()?, vec![store.clone()]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_noop_still_checkpoints_the_journal() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v4").metadata(), &["alice"])?;
            append_to_journal(&store, &["bob"])?;

            let transformer = RecordingTransformer::new(&ctx);
            let engine = ctx.engine_builder().transformer(transformer.clone()).build()?;
            let report = engine.migrate_to_latest(&store)?;

            assert!(report.is_no_op());
            assert_eq!(transformer.calls(), 0);
            let reopened = JournaledStore::open(&store, OpenMode::ReadWrite)?;
            assert_eq!(reopened.pending_count(), 0);
            assert_eq!(reopened.record_count(), 2);
            Ok(())
        },
        cleanup,
    )
}
