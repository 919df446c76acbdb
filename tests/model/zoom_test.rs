// tests/model/zoom_test.rs
#[path = "../common/nycflights.rs"]
mod nycflights;

use dm::keys::ColumnSelector;
use dm::prelude::*;
use nycflights::keyed_model;

#[test]
fn test_zoom_blocks_structural_changes() {
    let zoomed = keyed_model().zoom_to("flights").unwrap();

    for result in [
        zoomed.add_fk("flights", "origin", "airports").map(|_| ()),
        zoomed.rm_table("weather", false).map(|_| ()),
        zoomed.rm_pk("planes", true).map(|_| ()),
        zoomed.plan_squash_to_tbl("flights", &[], None).map(|_| ()),
    ] {
        assert!(matches!(
            result,
            Err(DmError::State(StateError::OnlyPossibleWithoutZoom { .. }))
        ));
    }
}

#[test]
fn test_zoom_needs_applied_filters() {
    let err = keyed_model()
        .filter("airlines", Predicate::eq("carrier", "UA"))
        .unwrap()
        .zoom_to("flights")
        .unwrap_err();
    assert!(matches!(
        err,
        DmError::State(StateError::OnlyPossibleWithoutFilters { .. })
    ));
}

#[test]
fn test_zoom_operations_need_zoom() {
    let dm = keyed_model();
    assert!(dm.zoomed_table().is_none());
    for result in [
        dm.update_zoomed().map(|_| ()),
        dm.insert_zoomed("x").map(|_| ()),
        dm.discard_zoomed().map(|_| ()),
        dm.rename_zoomed("a", "b").map(|_| ()),
    ] {
        assert!(matches!(
            result,
            Err(DmError::State(StateError::OnlyPossibleWithZoom { .. }))
        ));
    }
}

#[test]
fn test_select_by_prefix_and_update() {
    let dm = keyed_model()
        .zoom_to("flights")
        .unwrap()
        .select_zoomed(ColumnSelector::matches("^(id|carrier|dep_)").unwrap())
        .unwrap();
    assert_eq!(dm.zoomed_columns().unwrap(), vec!["id", "carrier", "dep_delay"]);

    let dm = dm.update_zoomed().unwrap();
    assert_eq!(dm.get_all_fks(), vec![ForeignKey::new("flights", ["carrier"], "airlines")]);
    assert!(dm.referencing_tables("planes").unwrap().is_empty());
    dm.validate().unwrap();
}

#[test]
fn test_renamed_pk_follows_to_children() {
    let dm = keyed_model()
        .zoom_to("airlines")
        .unwrap()
        .rename_zoomed("carrier", "code")
        .unwrap()
        .update_zoomed()
        .unwrap();
    assert_eq!(dm.get_pk("airlines").unwrap(), vec!["code"]);
    assert!(dm.has_fk("flights", "airlines").unwrap());

    let plan = dm.plan_join_to_tbl("flights", &["airlines"], None).unwrap();
    assert_eq!(plan.steps[0].on, vec![JoinColumns::new("carrier", "code")]);
}

#[test]
fn test_insert_zoomed_adds_table() {
    let dm = keyed_model()
        .zoom_to("flights")
        .unwrap()
        .select_zoomed(["id", "origin"])
        .unwrap()
        .insert_zoomed("flight_origins")
        .unwrap();
    assert!(!dm.is_zoomed());
    assert_eq!(dm.columns("flight_origins").unwrap(), ["id", "origin"]);
    assert_eq!(
        dm.get_fk("flight_origins", "airports").unwrap(),
        vec![vec!["origin".to_string()]]
    );
    assert_eq!(dm.referencing_tables("airports").unwrap(), vec!["flights", "flight_origins"]);
}

#[test]
fn test_zoom_state_tracks_origins() {
    let dm = keyed_model()
        .zoom_to("planes")
        .unwrap()
        .select_zoomed(["tailnum", "year"])
        .unwrap()
        .rename_zoomed("year", "built")
        .unwrap();

    let state = dm.zoom_state().unwrap();
    assert_eq!(state.table, "planes");
    assert_eq!(state.column_names(), vec!["tailnum", "built"]);
    assert_eq!(state.columns[1].origin, "year");
    assert!(keyed_model().zoom_state().is_none());
}
