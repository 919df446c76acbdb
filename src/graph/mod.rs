//! ConstraintGraph - tables as nodes, foreign keys as edges.
//!
//! The graph is a multigraph: several foreign keys may connect the same pair
//! of tables, and cycles are allowed. Traversals that cannot cope with cycles
//! check for them themselves (see [`ConstraintGraph::has_cycle_from`]).
//!
//! Edges remember their insertion order, and every ordered result follows it,
//! so identical models always produce identical traversals.

mod traversal;

pub use traversal::TreeStep;

use std::collections::{BTreeSet, HashMap};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::{DmResult, ReferenceError, StateError};

/// A foreign key: `child_columns` of `child` reference the primary key of
/// `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    pub child: String,
    pub child_columns: Vec<String>,
    pub parent: String,
}

impl ForeignKey {
    pub fn new<S: Into<String>>(
        child: impl Into<String>,
        child_columns: impl IntoIterator<Item = S>,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            child: child.into(),
            child_columns: child_columns.into_iter().map(Into::into).collect(),
            parent: parent.into(),
        }
    }

    /// Does this edge touch `table` on either end?
    pub fn touches(&self, table: &str) -> bool {
        self.child == table || self.parent == table
    }

    /// The table on the other end from `table`.
    pub fn other_end(&self, table: &str) -> &str {
        if self.child == table {
            &self.parent
        } else {
            &self.child
        }
    }
}

/// Edge payload.
#[derive(Debug, Clone)]
struct EdgeData {
    child_columns: Vec<String>,
    seq: u64,
}

/// Directed multigraph of tables and foreign keys.
#[derive(Debug, Clone, Default)]
pub struct ConstraintGraph {
    graph: StableDiGraph<String, EdgeData>,
    node_indices: HashMap<String, NodeIndex>,
    next_seq: u64,
}

impl ConstraintGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.node_indices.len()
    }

    /// Number of foreign keys.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// Table names, sorted.
    pub fn table_names(&self) -> BTreeSet<String> {
        self.node_indices.keys().cloned().collect()
    }

    fn node(&self, name: &str) -> Result<NodeIndex, StateError> {
        self.node_indices
            .get(name)
            .copied()
            .ok_or_else(|| StateError::table_not_in_dm(name))
    }

    fn foreign_key(&self, edge: EdgeIndex) -> Option<ForeignKey> {
        let (child, parent) = self.graph.edge_endpoints(edge)?;
        Some(ForeignKey {
            child: self.graph[child].clone(),
            child_columns: self.graph[edge].child_columns.clone(),
            parent: self.graph[parent].clone(),
        })
    }

    /// Sort edge indices by insertion order and resolve them.
    fn ordered(&self, edges: Vec<EdgeIndex>) -> Vec<ForeignKey> {
        let mut edges = self.sorted(edges);
        edges.dedup();
        edges.into_iter().filter_map(|e| self.foreign_key(e)).collect()
    }

    fn incident_indices(&self, node: NodeIndex) -> Vec<EdgeIndex> {
        let mut edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .chain(self.graph.edges_directed(node, Direction::Incoming))
            .map(|e| e.id())
            .collect();
        edges.sort_by_key(|e| self.graph[*e].seq);
        edges.dedup();
        edges
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Add a table. Returns false if it already existed.
    pub fn add_table(&mut self, name: &str) -> bool {
        if self.has_table(name) {
            return false;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_indices.insert(name.to_string(), idx);
        true
    }

    /// Remove a table and its outgoing foreign keys.
    ///
    /// Fails with `FirstRemoveFks` while other tables reference it, unless
    /// `remove_referencing_fks` is set; then exactly the direct incoming
    /// foreign keys are deleted too. Returns every removed foreign key.
    pub fn remove_table(
        &mut self,
        name: &str,
        remove_referencing_fks: bool,
    ) -> DmResult<Vec<ForeignKey>> {
        let idx = self.node(name)?;
        let referencing = self.referencing_tables(name)?;
        if !referencing.is_empty() && !remove_referencing_fks {
            return Err(ReferenceError::FirstRemoveFks {
                table: name.to_string(),
                referencing,
            }
            .into());
        }

        let removed = self.ordered(self.incident_indices(idx));
        self.graph.remove_node(idx);
        self.node_indices.remove(name);
        Ok(removed)
    }

    pub fn rename_table(&mut self, old: &str, new: &str) -> DmResult<()> {
        let idx = self.node(old)?;
        if old == new {
            return Ok(());
        }
        if self.has_table(new) {
            return Err(StateError::DuplicateTableNames {
                names: vec![new.to_string()],
            }
            .into());
        }
        self.graph[idx] = new.to_string();
        self.node_indices.remove(old);
        self.node_indices.insert(new.to_string(), idx);
        Ok(())
    }

    /// Add a foreign key. Parallel edges are kept.
    pub fn add_edge(&mut self, child: &str, child_columns: &[String], parent: &str) -> DmResult<()> {
        let from = self.node(child)?;
        let to = self.node(parent)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.graph.add_edge(
            from,
            to,
            EdgeData {
                child_columns: child_columns.to_vec(),
                seq,
            },
        );
        Ok(())
    }

    /// Remove foreign keys from `child` to `parent`.
    ///
    /// With `columns = None` every edge of the pair goes (`FkNotTracked` if
    /// there is none); otherwise only edges on exactly these child columns
    /// (`IsNotForeignKey` if none match).
    pub fn remove_edges(
        &mut self,
        child: &str,
        parent: &str,
        columns: Option<&[String]>,
    ) -> DmResult<Vec<ForeignKey>> {
        let from = self.node(child)?;
        let to = self.node(parent)?;

        let candidates: Vec<EdgeIndex> = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .filter(|e| e.target() == to)
            .filter(|e| columns.map_or(true, |cols| e.weight().child_columns == cols))
            .map(|e| e.id())
            .collect();

        if candidates.is_empty() {
            return Err(match columns {
                None => ReferenceError::FkNotTracked {
                    child: child.to_string(),
                    parent: parent.to_string(),
                },
                Some(cols) => ReferenceError::IsNotForeignKey {
                    child: child.to_string(),
                    parent: parent.to_string(),
                    columns: cols.to_vec(),
                },
            }
            .into());
        }

        let removed = self.ordered(candidates.clone());
        for edge in candidates {
            self.graph.remove_edge(edge);
        }
        Ok(removed)
    }

    /// Keep only edges for which `keep` returns true. Returns the dropped ones.
    pub fn retain_edges(&mut self, mut keep: impl FnMut(&ForeignKey) -> bool) -> Vec<ForeignKey> {
        let all: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        let mut dropped = Vec::new();
        for edge in self.sorted(all) {
            let Some(fk) = self.foreign_key(edge) else {
                continue;
            };
            if !keep(&fk) {
                self.graph.remove_edge(edge);
                dropped.push(fk);
            }
        }
        dropped
    }

    /// Rewrite the child columns of every edge leaving `table`.
    pub fn map_child_columns(&mut self, table: &str, mut f: impl FnMut(&[String]) -> Vec<String>) {
        let Ok(idx) = self.node(table) else {
            return;
        };
        let edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for edge in edges {
            let data = &mut self.graph[edge];
            data.child_columns = f(&data.child_columns);
        }
    }

    fn sorted(&self, mut edges: Vec<EdgeIndex>) -> Vec<EdgeIndex> {
        edges.sort_by_key(|e| self.graph[*e].seq);
        edges
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All foreign keys in insertion order.
    pub fn edges(&self) -> Vec<ForeignKey> {
        self.ordered(self.graph.edge_indices().collect())
    }

    /// Foreign keys touching `table`, in insertion order.
    pub fn incident_edges(&self, table: &str) -> DmResult<Vec<ForeignKey>> {
        let idx = self.node(table)?;
        Ok(self.ordered(self.incident_indices(idx)))
    }

    /// Foreign keys of `table` as child, in insertion order.
    pub fn outgoing_edges(&self, table: &str) -> DmResult<Vec<ForeignKey>> {
        let idx = self.node(table)?;
        Ok(self.ordered(
            self.graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| e.id())
                .collect(),
        ))
    }

    /// Foreign keys from `child` to `parent`, in insertion order.
    pub fn edges_from_to(&self, child: &str, parent: &str) -> DmResult<Vec<ForeignKey>> {
        let from = self.node(child)?;
        let to = self.node(parent)?;
        Ok(self.ordered(
            self.graph
                .edges_directed(from, Direction::Outgoing)
                .filter(|e| e.target() == to)
                .map(|e| e.id())
                .collect(),
        ))
    }

    /// Foreign keys between `a` and `b` in either direction.
    pub fn edges_between(&self, a: &str, b: &str) -> DmResult<Vec<ForeignKey>> {
        Ok(self
            .incident_edges(a)?
            .into_iter()
            .filter(|fk| fk.other_end(a) == b)
            .collect())
    }

    /// Tables one edge away in either direction, in edge insertion order.
    /// A self-reference does not make a table its own neighbour.
    pub fn neighbors(&self, table: &str) -> DmResult<Vec<String>> {
        let mut out: Vec<String> = Vec::new();
        for fk in self.incident_edges(table)? {
            let other = fk.other_end(table);
            if other != table && !out.iter().any(|t| t == other) {
                out.push(other.to_string());
            }
        }
        Ok(out)
    }

    /// Is `table` referenced by a foreign key of another table?
    pub fn is_referenced(&self, table: &str) -> DmResult<bool> {
        Ok(!self.referencing_tables(table)?.is_empty())
    }

    /// Other tables with at least one foreign key into `table`.
    pub fn referencing_tables(&self, table: &str) -> DmResult<Vec<String>> {
        let mut out: Vec<String> = Vec::new();
        for fk in self.incident_edges(table)? {
            if fk.parent == table && fk.child != table && !out.contains(&fk.child) {
                out.push(fk.child);
            }
        }
        Ok(out)
    }

    /// Tables that `table` references.
    pub fn referenced_tables(&self, table: &str) -> DmResult<Vec<String>> {
        let mut out: Vec<String> = Vec::new();
        for fk in self.incident_edges(table)? {
            if fk.child == table && fk.parent != table && !out.contains(&fk.parent) {
                out.push(fk.parent);
            }
        }
        Ok(out)
    }

    /// Subgraph with only `tables` and the edges among them.
    pub fn induced(&self, tables: &[String]) -> DmResult<ConstraintGraph> {
        for table in tables {
            self.node(table)?;
        }
        let mut sub = ConstraintGraph::new();
        for table in tables {
            sub.add_table(table);
        }
        for fk in self.edges() {
            if sub.has_table(&fk.child) && sub.has_table(&fk.parent) {
                sub.add_edge(&fk.child, &fk.child_columns, &fk.parent)?;
            }
        }
        Ok(sub)
    }
}
