use lineage::errors::ErrorKind;
use lineage::migration::MigrationPlanner;
use lineage_int_test::test_util::{test_registry, VERSIONS};

#[test]
fn test_plan_walks_single_hops() {
    let registry = test_registry(&["v1", "v2", "v3"]).unwrap();
    let planner = MigrationPlanner::new(registry.clone());

    let plan = planner
        .plan(&registry.get("v1").unwrap(), &registry.get("v3").unwrap())
        .unwrap();
    let steps: Vec<String> = plan.iter().map(|step| step.to_string()).collect();
    assert_eq!(steps, vec!["v1 -> v2", "v2 -> v3"]);
}

#[test]
fn test_every_version_reaches_latest() {
    let registry = test_registry(&VERSIONS).unwrap();
    let planner = MigrationPlanner::new(registry.clone());
    let latest = registry.latest().unwrap();

    for version in registry.versions() {
        let plan = planner.plan(version, &latest).unwrap();
        assert_eq!(plan.len() as u32, latest.ordinal() - version.ordinal());
        if version == &latest {
            assert!(plan.is_empty());
            assert!(registry.successor(version).is_none());
        } else {
            assert!(registry.successor(version).is_some());
        }
    }
}

#[test]
fn test_downgrade_cannot_be_planned() {
    let registry = test_registry(&VERSIONS).unwrap();
    let planner = MigrationPlanner::new(registry.clone());

    let err = planner
        .plan(&registry.latest().unwrap(), &registry.root().unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
}
