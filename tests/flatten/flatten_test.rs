// tests/flatten/flatten_test.rs
#[path = "../common/nycflights.rs"]
mod nycflights;

use dm::flatten::{execute, FlattenMode, FlattenPlanner};
use dm::prelude::*;
use insta::assert_snapshot;
use nycflights::{keyed_model, provider};

#[test]
fn test_join_to_tbl_all_neighbours() {
    let p = provider();
    let joined = keyed_model().join_to_tbl(&p, "flights", &[], None).unwrap();
    assert_eq!(
        joined.columns(),
        [
            "id",
            "carrier",
            "tailnum",
            "origin",
            "dep_delay",
            "name",
            "manufacturer",
            "year",
            "name.airports",
        ]
    );
    assert_eq!(joined.len(), 6);
}

#[test]
fn test_join_to_tbl_semi() {
    let p = provider();
    let joined = keyed_model()
        .join_to_tbl(&p, "flights", &["planes"], Some(JoinKind::Semi))
        .unwrap();
    assert_eq!(joined.columns().len(), 5);
    assert_eq!(joined.len(), 5);
}

#[test]
fn test_join_to_tbl_from_parent_side() {
    let p = provider();
    let joined = keyed_model()
        .join_to_tbl(&p, "airlines", &["flights"], Some(JoinKind::Inner))
        .unwrap();
    // WN has no flights.
    assert_eq!(joined.len(), 6);
    assert_eq!(joined.columns()[..2], ["carrier", "name"]);
}

#[test]
fn test_squash_plan_is_deterministic() {
    let dm = keyed_model();
    let first = dm.plan_squash_to_tbl("planes", &[], None).unwrap();
    for _ in 0..5 {
        assert_eq!(dm.plan_squash_to_tbl("planes", &[], None).unwrap(), first);
    }
    assert_eq!(first.mode, FlattenMode::Squash);
    assert_snapshot!(first.to_string(), @r"
    planes
      left join flights on tailnum = tailnum
      left join airlines on carrier = carrier
      left join airports on origin = faa
        rename name -> name.airports
    ");
}

#[test]
fn test_squash_runs_through_provider() {
    let p = provider();
    let dm = keyed_model();
    let plan = FlattenPlanner::new(&dm)
        .squash("flights", &["planes", "airlines"], JoinKind::Inner)
        .unwrap();
    let joined = execute(&dm, &p, &plan).unwrap();
    assert_eq!(joined.columns(), plan.columns.as_slice());
    assert_eq!(joined.len(), 5);
}

#[test]
fn test_squash_rejects_cycles_until_removed() {
    let dm = keyed_model()
        .add_pk("flights", "id", false)
        .unwrap()
        .add_fk("airports", "faa", "flights")
        .unwrap();

    let err = dm
        .plan_squash_to_tbl("flights", &["airlines", "planes"], None)
        .unwrap_err();
    assert!(matches!(
        err,
        DmError::Graph(GraphError::NoCycles { ref start }) if start == "flights"
    ));

    let dm = dm.rm_fk("airports", None, "flights").unwrap();
    let plan = dm
        .plan_squash_to_tbl("flights", &["airlines", "planes"], None)
        .unwrap();
    assert_eq!(plan.tables(), vec!["airlines", "planes"]);
}

#[test]
fn test_default_join_kind_comes_from_settings() {
    let settings = Settings::from_toml_str("[flatten]\njoin = \"inner\"").unwrap();
    let dm = keyed_model().with_settings(settings);
    let plan = dm.plan_join_to_tbl("flights", &["planes"], None).unwrap();
    assert_eq!(plan.steps[0].kind, JoinKind::Inner);

    let joined = dm.join_to_tbl(&provider(), "flights", &["planes"], None).unwrap();
    assert_eq!(joined.len(), 5);
}

#[test]
fn test_nest_is_never_flattened() {
    let err = keyed_model()
        .plan_join_to_tbl("flights", &["planes"], Some(JoinKind::Nest))
        .unwrap_err();
    assert!(matches!(err, DmError::Graph(GraphError::NoFlattenWithNestJoin)));
}
