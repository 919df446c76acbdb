// tests/filter/filter_propagation_test.rs
#[path = "../common/nycflights.rs"]
mod nycflights;

use dm::prelude::*;
use nycflights::{keyed_model, provider};

fn row_counts(dm: &DmModel, p: &InMemoryProvider) -> Vec<(String, usize)> {
    let (_, data) = dm.apply_filters(p).unwrap();
    data.row_counts(p).unwrap()
}

fn count(counts: &[(String, usize)], table: &str) -> usize {
    counts
        .iter()
        .find(|(t, _)| t == table)
        .map(|(_, n)| *n)
        .unwrap()
}

#[test]
fn test_filter_cascades_through_flights() {
    let p = provider();
    let dm = keyed_model()
        .filter("airlines", Predicate::eq("carrier", "UA"))
        .unwrap();
    let counts = row_counts(&dm, &p);

    assert_eq!(count(&counts, "airlines"), 1);
    assert_eq!(count(&counts, "flights"), 2);
    // UA flew N101 and N103 out of EWR.
    assert_eq!(count(&counts, "planes"), 2);
    assert_eq!(count(&counts, "airports"), 1);
    // Not connected: untouched.
    assert_eq!(count(&counts, "weather"), 3);
}

#[test]
fn test_additional_filters_never_grow_tables() {
    let p = provider();
    let base = keyed_model();
    let steps = [
        ("airports", Predicate::is_in("faa", ["EWR", "JFK"])),
        ("planes", Predicate::eq("manufacturer", "BOEING")),
        ("flights", Predicate::gt("dep_delay", 0_i64)),
    ];

    let mut dm = base.clone();
    let mut previous = base.nrow(&p).unwrap();
    for (table, predicate) in steps {
        dm = dm.filter(table, predicate).unwrap();
        let counts = row_counts(&dm, &p);
        for ((name, before), (_, after)) in previous.iter().zip(&counts) {
            assert!(after <= before, "{name} grew from {before} to {after}");
        }
        previous = counts;
    }
    // Only flight 1 (UA, N101, EWR) is left.
    assert_eq!(count(&previous, "flights"), 1);
}

#[test]
fn test_reads_need_applied_filters() {
    let p = provider();
    let dm = keyed_model()
        .filter("planes", Predicate::eq("manufacturer", "AIRBUS"))
        .unwrap();

    assert!(matches!(
        dm.nrow(&p),
        Err(DmError::State(StateError::OnlyPossibleWithoutFilters { .. }))
    ));
    assert!(matches!(
        dm.tables_data(&p),
        Err(DmError::State(StateError::OnlyPossibleWithoutFilters { .. }))
    ));
    assert!(matches!(
        dm.join_to_tbl(&p, "flights", &[], None),
        Err(DmError::State(StateError::OnlyPossibleWithoutFilters { .. }))
    ));

    let (applied, data) = dm.apply_filters(&p).unwrap();
    assert!(!applied.has_filters());
    assert_eq!(p.row_count(data.get("flights").unwrap()).unwrap(), 2);
}

#[test]
fn test_filter_reaches_tables_two_hops_away() {
    let p = provider();
    // weather -> airports -> flights -> airlines.
    let dm = keyed_model()
        .add_pk("weather", "origin", false)
        .unwrap()
        .add_fk("airports", "faa", "weather")
        .unwrap()
        .filter("weather", Predicate::eq("origin", "JFK"))
        .unwrap();
    let counts = row_counts(&dm, &p);
    assert_eq!(count(&counts, "weather"), 1);
    assert_eq!(count(&counts, "airports"), 1);
    assert_eq!(count(&counts, "flights"), 2);
    assert_eq!(count(&counts, "airlines"), 2);
}

#[test]
fn test_cycles_terminate() {
    let int = |v: i64| Value::Int(v);
    let p = InMemoryProvider::new()
        .with_table(
            "a",
            Frame::new(
                ["id", "b_id"],
                vec![
                    vec![int(1), int(10)],
                    vec![int(2), int(20)],
                    vec![int(3), int(30)],
                ],
            )
            .unwrap(),
        )
        .with_table(
            "b",
            Frame::new(
                ["id", "a_id"],
                vec![
                    vec![int(10), int(1)],
                    vec![int(20), int(3)],
                    vec![int(30), int(2)],
                ],
            )
            .unwrap(),
        );
    let dm = DmModel::from_provider(&p, &["a", "b"])
        .unwrap()
        .add_pk("a", "id", false)
        .unwrap()
        .add_pk("b", "id", false)
        .unwrap()
        .add_fk("a", "b_id", "b")
        .unwrap()
        .add_fk("b", "a_id", "a")
        .unwrap()
        .filter("a", Predicate::is_in("id", [1_i64, 2]))
        .unwrap();

    // a=2 points at b=20, which points back at a=3: both drop out.
    let counts = row_counts(&dm, &p);
    assert_eq!(counts, vec![("a".to_string(), 1), ("b".to_string(), 1)]);
}

#[test]
fn test_null_comparisons_drop_rows() {
    let p = provider();
    let dm = keyed_model()
        .filter("flights", Predicate::ne("tailnum", "N101"))
        .unwrap();
    let counts = row_counts(&dm, &p);
    // The flight without tailnum compares unknown and is dropped.
    assert_eq!(count(&counts, "flights"), 3);
}
