use super::plan::{FlattenMode, FlattenPlan, JoinStep, ResultColumns};
use crate::error::{DmResult, GraphError, StateError};
use crate::graph::ForeignKey;
use crate::model::DmModel;
use crate::provider::{JoinColumns, JoinKind};

/// Computes flatten plans for a model.
///
/// Planning only reads the model; it works on filtered models too; running
/// a plan does not.
pub struct FlattenPlanner<'a> {
    model: &'a DmModel,
}

impl<'a> FlattenPlanner<'a> {
    pub fn new(model: &'a DmModel) -> Self {
        Self { model }
    }

    /// Join each of `tables` directly to `start`; all neighbours of `start`
    /// when `tables` is empty.
    ///
    /// Where several foreign keys connect a pair, the oldest is used.
    pub fn neighbours(&self, start: &str, tables: &[&str], kind: JoinKind) -> DmResult<FlattenPlan> {
        self.model.ensure_not_zoomed("join_to_tbl")?;
        if kind == JoinKind::Nest {
            return Err(GraphError::NoFlattenWithNestJoin.into());
        }
        let graph = self.model.graph();
        let neighbours = graph.neighbors(start)?;
        let requested = self.requested(start, tables, neighbours.clone())?;

        if kind.is_filtering() && requested.len() != 1 {
            return Err(GraphError::SemiAntiJoinTwoTablesOnly {
                kind,
                start: start.to_string(),
                count: requested.len(),
            }
            .into());
        }

        let strangers: Vec<String> = requested
            .iter()
            .filter(|t| !neighbours.contains(t))
            .cloned()
            .collect();
        if !strangers.is_empty() {
            return Err(GraphError::TablesNotNeighbours {
                start: start.to_string(),
                tables: strangers,
            }
            .into());
        }

        let mut result = ResultColumns::start(start, self.model.columns(start)?);
        let mut steps = Vec::with_capacity(requested.len());
        for table in requested {
            let fk = graph
                .edges_between(start, &table)?
                .into_iter()
                .next()
                .ok_or_else(|| GraphError::TablesNotNeighbours {
                    start: start.to_string(),
                    tables: vec![table.clone()],
                })?;
            steps.push(self.step(&mut result, start, table, fk, kind)?);
        }

        Ok(FlattenPlan {
            start: start.to_string(),
            mode: FlattenMode::Neighbours,
            steps,
            columns: result.into_columns(),
        })
    }

    /// Join `tables` into one, breadth-first from `start` in foreign key
    /// insertion order; everything reachable when `tables` is empty.
    ///
    /// Only left, inner and full joins are allowed, and the component around
    /// `start` must be free of cycles: with two paths between tables there
    /// is no single way to join them.
    pub fn squash(&self, start: &str, tables: &[&str], kind: JoinKind) -> DmResult<FlattenPlan> {
        self.model.ensure_not_zoomed("squash_to_tbl")?;
        match kind {
            JoinKind::Nest => return Err(GraphError::NoFlattenWithNestJoin.into()),
            JoinKind::Left | JoinKind::Inner | JoinKind::Full => {}
            _ => return Err(GraphError::SquashLimited { kind }.into()),
        }

        let graph = self.model.graph();
        let reachable = graph.reachable_from(start)?;
        let requested = self.requested(
            start,
            tables,
            reachable.iter().filter(|t| *t != start).cloned().collect(),
        )?;

        if graph.has_cycle_from(start)? {
            return Err(GraphError::NoCycles {
                start: start.to_string(),
            }
            .into());
        }

        let mut within = vec![start.to_string()];
        within.extend(requested.iter().cloned());
        let tree = graph.bfs_tree(start, Some(&within))?;

        let unreachable: Vec<String> = requested
            .iter()
            .filter(|t| !tree.iter().any(|step| &step.table == *t))
            .cloned()
            .collect();
        if !unreachable.is_empty() {
            return Err(GraphError::TablesNotReachableFromStart {
                start: start.to_string(),
                tables: unreachable,
            }
            .into());
        }

        let mut result = ResultColumns::start(start, self.model.columns(start)?);
        let mut steps = Vec::with_capacity(tree.len().saturating_sub(1));
        for node in tree.into_iter().skip(1) {
            let attached_to = node.attached_to().map(str::to_string);
            let (Some(fk), Some(attached_to)) = (node.via, attached_to) else {
                continue;
            };
            steps.push(self.step(&mut result, &attached_to, node.table, fk, kind)?);
        }

        tracing::debug!(start, tables = steps.len(), "planned squash");
        Ok(FlattenPlan {
            start: start.to_string(),
            mode: FlattenMode::Squash,
            steps,
            columns: result.into_columns(),
        })
    }

    /// Requested tables without `start` and duplicates; `default` if none.
    fn requested(&self, start: &str, tables: &[&str], default: Vec<String>) -> DmResult<Vec<String>> {
        self.model.table(start)?;
        if tables.is_empty() {
            return Ok(default);
        }

        let unknown: Vec<String> = tables
            .iter()
            .filter(|t| !self.model.has_table(t))
            .map(|t| t.to_string())
            .collect();
        if !unknown.is_empty() {
            return Err(StateError::TableNotInDm { tables: unknown }.into());
        }

        let mut out: Vec<String> = Vec::new();
        for table in tables {
            if *table != start && !out.iter().any(|t| t == table) {
                out.push(table.to_string());
            }
        }
        Ok(out)
    }

    /// Join `table` to the part of the result that came from `attached_to`.
    fn step(
        &self,
        result: &mut ResultColumns,
        attached_to: &str,
        table: String,
        fk: ForeignKey,
        kind: JoinKind,
    ) -> DmResult<JoinStep> {
        let parent_key = self.model.referenced_key(&fk.parent)?;
        let mut on = Vec::with_capacity(parent_key.len());
        for (child_col, parent_col) in fk.child_columns.iter().zip(&parent_key) {
            let (left, right) = if fk.child == table {
                (parent_col, child_col)
            } else {
                (child_col, parent_col)
            };
            on.push(JoinColumns::new(result.locate(attached_to, left)?, right.clone()));
        }

        let renames = result.attach(&table, self.model.columns(&table)?, &on, kind);
        Ok(JoinStep {
            table,
            via: fk,
            on,
            renames,
            kind,
        })
    }
}
