// tests/graph/constraint_graph_test.rs
#[path = "../common/nycflights.rs"]
mod nycflights;

use dm::graph::ConstraintGraph;
use dm::prelude::*;
use nycflights::keyed_model;

#[test]
fn test_graph_nodes_follow_model_tables() {
    let dm = keyed_model();
    let names: Vec<String> = dm.graph().table_names().into_iter().collect();
    let mut expected = dm.table_names();
    expected.sort();
    assert_eq!(names, expected);

    let dm = dm.select_tables(&["flights", "planes"]).unwrap();
    assert_eq!(dm.graph().table_count(), 2);
    assert_eq!(dm.get_all_fks(), vec![ForeignKey::new("flights", ["tailnum"], "planes")]);
}

#[test]
fn test_double_reference_is_a_cycle_for_traversal() {
    let mut g = ConstraintGraph::new();
    g.add_table("flights");
    g.add_table("airports");
    g.add_edge("flights", &["origin".to_string()], "airports").unwrap();
    assert!(!g.has_cycle_from("flights").unwrap());

    g.add_edge("flights", &["dest".to_string()], "airports").unwrap();
    assert!(g.has_cycle_from("flights").unwrap());
    assert_eq!(g.neighbors("flights").unwrap(), vec!["airports"]);
    assert_eq!(g.edges_between("airports", "flights").unwrap().len(), 2);
}

#[test]
fn test_remove_table_deletes_only_direct_incoming_edges() {
    let mut g = ConstraintGraph::new();
    for t in ["a", "b", "c"] {
        g.add_table(t);
    }
    // c -> b -> a
    g.add_edge("b", &["a_id".to_string()], "a").unwrap();
    g.add_edge("c", &["b_id".to_string()], "b").unwrap();

    let removed = g.remove_table("a", true).unwrap();
    assert_eq!(removed, vec![ForeignKey::new("b", ["a_id"], "a")]);
    assert_eq!(g.edges(), vec![ForeignKey::new("c", ["b_id"], "b")]);
}

#[test]
fn test_reachability_ignores_direction() {
    let dm = keyed_model();
    let reachable = dm.graph().reachable_from("planes").unwrap();
    assert_eq!(reachable, vec!["planes", "flights", "airlines", "airports"]);
    assert_eq!(dm.graph().reachable_from("weather").unwrap(), vec!["weather"]);
    assert_eq!(
        dm.graph().referenced_tables("flights").unwrap(),
        vec!["airlines", "planes", "airports"]
    );
}

#[test]
fn test_induced_subgraph_keeps_order() {
    let dm = keyed_model();
    let sub = dm
        .graph()
        .induced(&["flights".to_string(), "airports".to_string(), "airlines".to_string()])
        .unwrap();
    let parents: Vec<String> = sub.edges().into_iter().map(|fk| fk.parent).collect();
    assert_eq!(parents, vec!["airlines", "airports"]);
}
