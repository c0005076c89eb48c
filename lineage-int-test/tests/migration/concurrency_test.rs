use lineage::errors::ErrorKind;
use lineage::migration::{MigrationState, StepTransformers};
use lineage::store::rewrite_records;
use lineage_int_test::test_util::{
    cleanup, create_store, create_test_context, fingerprint, read_records, run_test,
};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_second_call_while_running_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store_path();
            create_store(&store, fingerprint("v3").metadata(), &["alice"])?;

            let entered = Arc::new(Barrier::new(2));
            let release = Arc::new(Barrier::new(2));
            let (step_entered, step_release) = (entered.clone(), release.clone());
            let engine = ctx
                .engine_builder()
                .transformer(StepTransformers::new().register("v3", "v4", move |input, output| {
                    step_entered.wait();
                    step_release.wait();
                    rewrite_records(input, output, fingerprint("v4").metadata(), |record| {
                        Ok(Some(record.to_vec()))
                    })
                }))
                .build()?;

            let worker = {
                let engine = engine.clone();
                let store = store.clone();
                thread::spawn(move || engine.migrate_to_latest(&store))
            };

            entered.wait();
            assert_eq!(engine.state(), MigrationState::Executing { step: 1, of: 1 });

            let err = engine.migrate_to_latest(&store).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            let err = engine.purge_scratch(&store).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            release.wait();
            let report = worker.join().expect("migration thread panicked")?;
            assert_eq!(report.target().identifier(), "v4");
            assert_eq!(engine.state(), MigrationState::Done);
            assert_eq!(read_records(&store)?, vec!["alice"]);

            // the guard is released once the call returns
            assert!(engine.migrate_to_latest(&store)?.is_no_op());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_engines_on_different_stores_run_in_parallel() {
    run_test(
        create_test_context,
        |ctx| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let store = ctx.dir().join(format!("store-{}.store", i));
                    let scratch = ctx.dir().join(format!("scratch-{}", i));
                    let registry = ctx.registry();
                    thread::spawn(move || {
                        create_store(&store, fingerprint("v1").metadata(), &["x"])?;
                        let engine = lineage::MigrationEngine::builder()
                            .registry(registry)
                            .scratch_dir(scratch)
                            .transformer(
                                StepTransformers::new()
                                    .register("v1", "v2", |input, output| {
                                        rewrite_records(input, output, fingerprint("v2").metadata(), |r| {
                                            Ok(Some(r.to_vec()))
                                        })
                                    })
                                    .register("v2", "v3", |input, output| {
                                        rewrite_records(input, output, fingerprint("v3").metadata(), |r| {
                                            Ok(Some(r.to_vec()))
                                        })
                                    })
                                    .register("v3", "v4", |input, output| {
                                        rewrite_records(input, output, fingerprint("v4").metadata(), |r| {
                                            Ok(Some(r.to_vec()))
                                        })
                                    }),
                            )
                            .build()?;
                        engine.migrate_to_latest(&store)
                    })
                })
                .collect();

            for handle in handles {
                let report = handle.join().expect("migration thread panicked")?;
                assert_eq!(report.steps().len(), 3);
            }
            Ok(())
        },
        cleanup,
    )
}
