// tests/provider/sqlite_provider_test.rs
#[path = "../common/nycflights.rs"]
mod nycflights;

use dm::prelude::*;
use nycflights::sqlite_provider;

fn sqlite_model(p: &SqliteProvider) -> DmModel {
    DmModel::from_provider(p, &[]).unwrap()
}

fn checked_model(p: &SqliteProvider) -> DmModel {
    sqlite_model(p)
        .add_pk_checked(p, "airlines", "carrier", false)
        .unwrap()
        .add_pk_checked(p, "airports", "faa", false)
        .unwrap()
        .add_pk_checked(p, "planes", "tailnum", false)
        .unwrap()
        .add_fk_checked(p, "flights", "carrier", "airlines")
        .unwrap()
        .add_fk_checked(p, "flights", "tailnum", "planes")
        .unwrap()
        .add_fk_checked(p, "flights", "origin", "airports")
        .unwrap()
}

#[test]
fn test_model_from_database() {
    let p = sqlite_provider();
    let dm = sqlite_model(&p);
    assert_eq!(
        dm.table_names(),
        vec!["airlines", "airports", "flights", "planes", "weather"]
    );
    assert_eq!(
        dm.columns("flights").unwrap(),
        ["id", "carrier", "tailnum", "origin", "dep_delay"]
    );
}

#[test]
fn test_checked_keys_run_in_sql() {
    let p = sqlite_provider();
    let dm = sqlite_model(&p);

    // N101 twice and one missing tail number.
    let err = dm.add_pk_checked(&p, "flights", "tailnum", false).unwrap_err();
    assert!(matches!(
        err,
        DmError::Key(KeyError::NotUniqueKey { ref duplicates, .. })
            if duplicates == &vec![vec![Value::Null], vec![Value::from("N101")]]
    ));

    let err = dm
        .add_pk("planes", "tailnum", false)
        .unwrap()
        .add_fk_checked(&p, "flights", "origin", "planes")
        .unwrap_err();
    assert!(matches!(
        err,
        DmError::Reference(ReferenceError::NotSubsetOf { ref parent, .. }) if parent == "planes"
    ));

    let dm = checked_model(&p);
    assert!(dm.examine_constraints(&p).unwrap().iter().all(|r| r.is_valid));
    assert_eq!(
        dm.examine_cardinality(&p, "flights", "airlines").unwrap(),
        Cardinality::Generic
    );
}

#[test]
fn test_filters_cascade_in_sql() {
    let p = sqlite_provider();
    let dm = checked_model(&p)
        .filter("airlines", Predicate::eq("carrier", "UA"))
        .unwrap();
    let (unfiltered, data) = dm.apply_filters(&p).unwrap();
    assert!(!unfiltered.has_filters());

    let counts = data.row_counts(&p).unwrap();
    assert_eq!(
        counts,
        vec![
            ("airlines".to_string(), 1),
            ("airports".to_string(), 1),
            ("flights".to_string(), 2),
            ("planes".to_string(), 2),
            ("weather".to_string(), 3),
        ]
    );
}

#[test]
fn test_squash_in_sql() {
    let p = sqlite_provider();
    let dm = checked_model(&p);
    let plan = dm
        .plan_squash_to_tbl("flights", &["planes", "airlines"], Some(JoinKind::Inner))
        .unwrap();
    let joined = dm
        .squash_to_tbl(&p, "flights", &["planes", "airlines"], Some(JoinKind::Inner))
        .unwrap();
    assert_eq!(joined.columns, plan.columns);
    assert_eq!(p.row_count(&joined).unwrap(), 5);
}

#[test]
fn test_join_renames_colliding_columns() {
    let p = sqlite_provider();
    let joined = checked_model(&p)
        .join_to_tbl(&p, "flights", &["airlines", "airports"], None)
        .unwrap();
    assert_eq!(joined.columns[5..], ["name", "name.airports"]);
    assert_eq!(p.row_count(&joined).unwrap(), 6);
    let names = p
        .distinct_values(&joined, &["name.airports".to_string()])
        .unwrap();
    assert_eq!(names.len(), 3);
}
