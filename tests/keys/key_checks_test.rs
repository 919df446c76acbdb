// tests/keys/key_checks_test.rs
#[path = "../common/nycflights.rs"]
mod nycflights;

use dm::keys::{check_key, examine_cardinality, is_subset, is_unique, TableColumns};
use dm::prelude::*;
use nycflights::provider;

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_check_key_agrees_with_is_unique() {
    let p = provider();
    let flights = p.table("flights").unwrap();
    for columns in [
        cols(&["id"]),
        cols(&["carrier"]),
        cols(&["tailnum"]),
        cols(&["carrier", "tailnum"]),
        cols(&["carrier", "origin"]),
        cols(&[]),
    ] {
        let unique = is_unique(&p, &flights, &columns, 5).unwrap().is_unique;
        let checked = check_key(&p, TableColumns::new("flights", &flights, &columns), 5).is_ok();
        assert_eq!(checked, unique && !columns.is_empty(), "columns {columns:?}");
    }
}

#[test]
fn test_missing_values_break_uniqueness() {
    let p = provider();
    let flights = p.table("flights").unwrap();
    let check = is_unique(&p, &flights, &cols(&["tailnum"]), 5).unwrap();
    assert!(!check.is_unique);
    assert!(check.duplicate_sample.contains(&vec![Value::Null]));
}

#[test]
fn test_sample_is_bounded_but_flag_is_not() {
    let p = provider();
    let flights = p.table("flights").unwrap();
    let check = is_unique(&p, &flights, &cols(&["origin"]), 1).unwrap();
    assert!(!check.is_unique);
    assert_eq!(check.duplicate_sample.len(), 1);

    let check = is_unique(&p, &flights, &cols(&["origin"]), 0).unwrap();
    assert!(!check.is_unique);
    assert!(check.duplicate_sample.is_empty());
}

#[test]
fn test_subset_ignores_missing_child_values() {
    let p = provider();
    let flights = p.table("flights").unwrap();
    let planes = p.table("planes").unwrap();
    let child = p.distinct_values(&flights, &cols(&["tailnum"])).unwrap();
    let parent = p.distinct_values(&planes, &cols(&["tailnum"])).unwrap();
    assert!(is_subset(&child, &parent, 5).is_subset);

    let check = is_subset(&parent, &child, 5);
    assert!(!check.is_subset);
    assert_eq!(check.missing_sample, vec![vec![Value::from("N104")]]);
}

#[test]
fn test_cardinality_classes() {
    let p = provider();
    let airlines = p.table("airlines").unwrap();
    let flights = p.table("flights").unwrap();
    let carrier = cols(&["carrier"]);
    let id = cols(&["id"]);

    // WN has no flights, the others several.
    let card = examine_cardinality(
        &p,
        TableColumns::new("airlines", &airlines, &carrier),
        TableColumns::new("flights", &flights, &carrier),
        5,
    )
    .unwrap();
    assert_eq!(card, Cardinality::Generic);

    // A table against itself is a bijection.
    let card = examine_cardinality(
        &p,
        TableColumns::new("flights", &flights, &id),
        TableColumns::new("flights", &flights, &id),
        5,
    )
    .unwrap();
    assert_eq!(card, Cardinality::Bijective);
    assert_eq!(card.to_string(), "bijective mapping (child: 1 -> parent: 1)");
}

#[test]
fn test_cardinality_needs_unique_parent() {
    let p = provider();
    let flights = p.table("flights").unwrap();
    let weather = p.table("weather").unwrap();
    let origin = cols(&["origin"]);
    let err = examine_cardinality(
        &p,
        TableColumns::new("flights", &flights, &origin),
        TableColumns::new("weather", &weather, &origin),
        5,
    )
    .unwrap_err();
    assert!(matches!(err, DmError::Key(KeyError::NotUniqueKey { .. })));
}

#[test]
fn test_column_selectors() {
    let available = cols(&["id", "carrier", "tailnum", "origin", "dep_delay"]);
    assert_eq!(
        ColumnSelector::starts_with("dep").resolve("flights", &available).unwrap(),
        vec!["dep_delay"]
    );
    assert_eq!(
        ColumnSelector::custom(|cs| cs.iter().filter(|c| c.len() == 6).cloned().collect())
            .resolve("flights", &available)
            .unwrap(),
        vec!["origin"]
    );
    assert!(matches!(
        ColumnSelector::from("dest").resolve("flights", &available),
        Err(StateError::ColumnsNotInTable { .. })
    ));
    assert_eq!(ColumnSelector::all().resolve("flights", &available).unwrap().len(), 5);
}
