//! Undirected traversals over the constraint graph.
//!
//! Foreign keys are directed, but for reachability, cycles and join trees
//! the direction does not matter: a table joins its parent as easily as its
//! child.

use std::collections::{HashSet, VecDeque};

use petgraph::stable_graph::{EdgeIndex, NodeIndex};

use super::{ConstraintGraph, ForeignKey};
use crate::error::DmResult;

/// A table in a breadth-first join tree, with the edge that first reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStep {
    pub table: String,
    /// `None` for the start table.
    pub via: Option<ForeignKey>,
}

impl TreeStep {
    /// The already-visited table this step attaches to.
    pub fn attached_to(&self) -> Option<&str> {
        self.via.as_ref().map(|fk| fk.other_end(&self.table))
    }
}

impl ConstraintGraph {
    fn other_node(&self, edge: EdgeIndex, node: NodeIndex) -> Option<NodeIndex> {
        let (a, b) = self.graph.edge_endpoints(edge)?;
        Some(if a == node { b } else { a })
    }

    /// Tables connected to `start` (including it), in breadth-first order.
    pub fn reachable_from(&self, start: &str) -> DmResult<Vec<String>> {
        Ok(self
            .bfs_tree(start, None)?
            .into_iter()
            .map(|step| step.table)
            .collect())
    }

    /// Breadth-first spanning tree from `start`.
    ///
    /// Edges are followed in insertion order, so the first edge discovered
    /// for a table is always the oldest one. With `within`, only those tables
    /// are entered (the start table always is).
    pub fn bfs_tree(&self, start: &str, within: Option<&[String]>) -> DmResult<Vec<TreeStep>> {
        let start_idx = self.node(start)?;
        let allowed = |idx: NodeIndex| {
            within.map_or(true, |tables| tables.iter().any(|t| *t == self.graph[idx]))
        };

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        let mut steps = vec![TreeStep {
            table: start.to_string(),
            via: None,
        }];

        visited.insert(start_idx);
        queue.push_back(start_idx);

        while let Some(current) = queue.pop_front() {
            for edge in self.incident_indices(current) {
                let Some(next) = self.other_node(edge, current) else {
                    continue;
                };
                if visited.contains(&next) || !allowed(next) {
                    continue;
                }
                visited.insert(next);
                queue.push_back(next);
                steps.push(TreeStep {
                    table: self.graph[next].clone(),
                    via: self.foreign_key(edge),
                });
            }
        }

        Ok(steps)
    }

    /// Is there a cycle in the undirected component containing `start`?
    ///
    /// Parallel foreign keys between two tables and self-references count as
    /// cycles: both make the join path between the tables ambiguous.
    pub fn has_cycle_from(&self, start: &str) -> DmResult<bool> {
        let start_idx = self.node(start)?;

        // (node, edge it was entered through)
        let mut stack: Vec<(NodeIndex, Option<EdgeIndex>)> = vec![(start_idx, None)];
        let mut visited: HashSet<NodeIndex> = HashSet::new();

        while let Some((node, entered_by)) = stack.pop() {
            // Reached twice through different edges.
            if !visited.insert(node) {
                return Ok(true);
            }
            for edge in self.incident_indices(node) {
                if Some(edge) == entered_by {
                    continue;
                }
                let Some(next) = self.other_node(edge, node) else {
                    continue;
                };
                if visited.contains(&next) {
                    return Ok(true);
                }
                stack.push((next, Some(edge)));
            }
        }

        Ok(false)
    }
}
