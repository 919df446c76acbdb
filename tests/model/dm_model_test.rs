// tests/model/dm_model_test.rs
#[path = "../common/nycflights.rs"]
mod nycflights;

use dm::model::ConstraintKind;
use dm::prelude::*;
use nycflights::{keyed_model, model, provider};

#[test]
fn test_add_pk_then_get_pk() {
    let dm = model().add_pk("airlines", "carrier", false).unwrap();
    assert_eq!(dm.get_pk("airlines").unwrap(), vec!["carrier"]);
    assert!(dm.has_pk("airlines").unwrap());
    assert!(!model().has_pk("airlines").unwrap());
}

#[test]
fn test_rm_pk_undoes_add_pk() {
    let dm = model()
        .add_pk("planes", "tailnum", false)
        .unwrap()
        .rm_pk("planes", false)
        .unwrap();
    assert!(!dm.has_pk("planes").unwrap());
    assert!(dm.get_pk("planes").unwrap().is_empty());
}

#[test]
fn test_unknown_table() {
    let err = model().get_pk("boats").unwrap_err();
    assert!(matches!(
        err,
        DmError::State(StateError::TableNotInDm { ref tables }) if tables == &vec!["boats".to_string()]
    ));
    assert!(matches!(
        model().has_fk("flights", "boats"),
        Err(DmError::State(StateError::TableNotInDm { .. }))
    ));
}

#[test]
fn test_identical_add_fk_calls_make_two_edges() {
    let dm = model()
        .add_pk("airlines", "carrier", false)
        .unwrap()
        .add_fk("flights", "carrier", "airlines")
        .unwrap()
        .add_fk("flights", "carrier", "airlines")
        .unwrap();

    assert_eq!(
        dm.get_all_fks(),
        vec![
            ForeignKey::new("flights", ["carrier"], "airlines"),
            ForeignKey::new("flights", ["carrier"], "airlines"),
        ]
    );
    assert_eq!(dm.get_fk("flights", "airlines").unwrap().len(), 2);
}

#[test]
fn test_checked_keys_on_flights() {
    let p = provider();
    let dm = model()
        .add_pk_checked(&p, "airlines", "carrier", false)
        .unwrap()
        .add_fk_checked(&p, "flights", "carrier", "airlines")
        .unwrap();
    assert!(dm.has_fk("flights", "airlines").unwrap());

    let err = dm
        .add_pk_checked(&p, "planes", "manufacturer", false)
        .unwrap_err();
    match err {
        DmError::Key(KeyError::NotUniqueKey {
            table,
            columns,
            duplicates,
        }) => {
            assert_eq!(table, "planes");
            assert_eq!(columns, vec!["manufacturer"]);
            assert_eq!(duplicates, vec![vec![Value::from("BOEING")]]);
        }
        other => panic!("expected NotUniqueKey, got {other:?}"),
    }
}

#[test]
fn test_checked_fk_reports_missing_values() {
    let p = provider();
    let dm = model().add_pk("planes", "tailnum", false).unwrap();
    let err = dm
        .add_fk_checked(&p, "flights", "origin", "planes")
        .unwrap_err();
    match err {
        DmError::Reference(ReferenceError::NotSubsetOf { missing, .. }) => {
            assert_eq!(
                missing,
                vec![
                    vec![Value::from("EWR")],
                    vec![Value::from("JFK")],
                    vec![Value::from("LGA")],
                ]
            );
        }
        other => panic!("expected NotSubsetOf, got {other:?}"),
    }
}

#[test]
fn test_rm_pk_of_referenced_table() {
    let dm = keyed_model();

    let err = dm.rm_pk("airlines", false).unwrap_err();
    assert!(matches!(
        err,
        DmError::Reference(ReferenceError::FirstRemoveFks { ref table, ref referencing })
            if table == "airlines" && referencing == &vec!["flights".to_string()]
    ));

    let dm = dm.rm_pk("airlines", true).unwrap();
    assert!(!dm.has_pk("airlines").unwrap());
    assert!(!dm
        .get_all_fks()
        .iter()
        .any(|fk| fk.child == "flights" && fk.parent == "airlines"));
    assert_eq!(dm.get_all_fks().len(), 2);
}

#[test]
fn test_rm_table_of_referenced_table() {
    let dm = keyed_model();
    assert!(matches!(
        dm.rm_table("planes", false),
        Err(DmError::Reference(ReferenceError::FirstRemoveFks { .. }))
    ));
    let dm = dm.rm_table("planes", true).unwrap();
    assert!(!dm.has_table("planes"));
    assert!(!dm.referencing_tables("airlines").unwrap().is_empty());
    dm.validate().unwrap();
}

#[test]
fn test_referencing_tables() {
    let dm = keyed_model();
    assert!(dm.is_referenced("airports").unwrap());
    assert!(!dm.is_referenced("flights").unwrap());
    assert_eq!(dm.referencing_tables("planes").unwrap(), vec!["flights"]);
}

#[test]
fn test_get_all_pks_in_table_order() {
    let pks: Vec<(String, Vec<String>)> = keyed_model()
        .get_all_pks()
        .into_iter()
        .map(|pk| (pk.table, pk.columns))
        .collect();
    assert_eq!(
        pks,
        vec![
            ("airlines".to_string(), vec!["carrier".to_string()]),
            ("airports".to_string(), vec!["faa".to_string()]),
            ("planes".to_string(), vec!["tailnum".to_string()]),
        ]
    );
}

#[test]
fn test_pk_candidates_for_planes() {
    let report = model().enum_pk_candidates(&provider(), "planes").unwrap();
    let columns: Vec<(&str, bool)> = report
        .iter()
        .map(|c| (c.column.as_str(), c.candidate))
        .collect();
    assert_eq!(
        columns,
        vec![("tailnum", true), ("year", true), ("manufacturer", false)]
    );
    assert_eq!(report[2].why, "has duplicate values: (BOEING)");
}

#[test]
fn test_fk_candidates_for_flights() {
    let dm = keyed_model();
    let report = dm
        .enum_fk_candidates(&provider(), "flights", "airports")
        .unwrap();
    assert_eq!(report[0].column, "origin");
    assert!(report[0].candidate);
    assert!(report[1..].iter().all(|c| !c.candidate));

    let err = dm
        .enum_fk_candidates(&provider(), "flights", "weather")
        .unwrap_err();
    assert!(matches!(
        err,
        DmError::Reference(ReferenceError::RefTableHasNoPk { .. })
    ));
}

#[test]
fn test_examine_constraints_after_unchecked_keys() {
    let dm = keyed_model()
        .add_pk("weather", "origin", false)
        .unwrap()
        .add_pk("flights", "carrier", false)
        .unwrap();
    let reports = dm.examine_constraints(&provider()).unwrap();

    let invalid: Vec<(&str, ConstraintKind)> = reports
        .iter()
        .filter(|r| !r.is_valid)
        .map(|r| (r.table.as_str(), r.kind))
        .collect();
    assert_eq!(invalid, vec![("flights", ConstraintKind::PrimaryKey)]);
    assert_eq!(reports.len(), 5 + 3);
}

#[test]
fn test_cardinality_of_flights_to_planes() {
    let dm = keyed_model();
    let card = dm
        .examine_cardinality(&provider(), "flights", "planes")
        .unwrap();
    assert_eq!(card, Cardinality::Generic);
    assert!(dm
        .check_cardinality(&provider(), "flights", "planes", CardinalityBound::ZeroToMany)
        .is_ok());
}

#[test]
fn test_snapshot_for_sink() {
    struct Collect(Vec<String>);

    impl VisualizationSink for Collect {
        type Output = ();

        fn draw(&mut self, snapshot: &dm::model::GraphSnapshot) {
            for edge in &snapshot.edges {
                self.0.push(format!("{} -> {}", edge.child, edge.parent));
            }
        }
    }

    let mut sink = Collect(Vec::new());
    keyed_model()
        .set_colors("blue", &["flights"])
        .unwrap()
        .draw(&mut sink);
    assert_eq!(
        sink.0,
        vec!["flights -> airlines", "flights -> planes", "flights -> airports"]
    );
}

#[test]
fn test_json_round_trip_keeps_keys() {
    let dm = keyed_model();
    let back = DmModel::from_json(&dm.to_json().unwrap()).unwrap();
    assert_eq!(back.to_record(), dm.to_record());
    assert_eq!(back.table_names(), dm.table_names());
}

#[test]
fn test_from_json_rejects_unknown_key_column() {
    let json = r#"{"tables": [{"name": "t", "columns": ["a"], "primary_key": ["nope"]}]}"#;
    let err = DmModel::from_json(json).unwrap_err();
    assert!(matches!(
        err,
        DmError::State(StateError::ColumnsNotInTable { ref table, ref columns })
            if table == "t" && columns == &vec!["nope".to_string()]
    ));
}

#[test]
fn test_from_json_rejects_compound_key() {
    let json = r#"{
        "tables": [
            {"name": "u", "columns": ["x", "y"], "primary_key": ["x", "y"]},
            {"name": "c", "columns": ["p", "q"]}
        ],
        "foreign_keys": [{"child": "c", "child_columns": ["p", "q"], "parent": "u"}]
    }"#;
    let err = DmModel::from_json(json).unwrap_err();
    assert!(matches!(
        err,
        DmError::Key(KeyError::CompoundKeysNotSupported { ref table, .. }) if table == "u"
    ));
}

#[test]
fn test_from_json_rejects_empty_key() {
    let json = r#"{"tables": [{"name": "t", "columns": ["a"], "primary_key": []}]}"#;
    assert!(matches!(
        DmModel::from_json(json),
        Err(DmError::Key(KeyError::NotUniqueKey { .. }))
    ));
}

#[test]
fn test_new_rejects_carried_key_on_missing_column() {
    let mut table = TableDef::new("planes", ["tailnum"]);
    table.primary_key = Some(vec!["ghost".to_string()]);
    assert!(matches!(
        DmModel::new([table]),
        Err(DmError::State(StateError::ColumnsNotInTable { .. }))
    ));

    let mut table = TableDef::new("planes", ["tailnum"]);
    table.primary_key = Some(vec!["tailnum".to_string()]);
    let dm = DmModel::new([table]).unwrap();
    assert_eq!(dm.get_pk("planes").unwrap(), vec!["tailnum"]);
}
