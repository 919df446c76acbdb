//! Flatten plans as plain data.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{DmResult, StateError};
use crate::graph::ForeignKey;
use crate::provider::{JoinColumns, JoinKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlattenMode {
    /// Every table joins the start table directly.
    Neighbours,
    /// Tables join whatever part of the result they are connected to.
    Squash,
}

/// One join of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinStep {
    pub table: String,
    /// The foreign key the join follows.
    pub via: ForeignKey,
    /// Result column on the left, column of `table` on the right.
    pub on: Vec<JoinColumns>,
    /// Columns of `table` renamed before the join, `(old, new)`.
    pub renames: Vec<(String, String)>,
    pub kind: JoinKind,
}

/// An ordered sequence of joins starting from one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlattenPlan {
    pub start: String,
    pub mode: FlattenMode,
    pub steps: Vec<JoinStep>,
    /// Columns of the joined result.
    pub columns: Vec<String>,
}

impl FlattenPlan {
    /// Joined tables, in join order.
    pub fn tables(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.table.as_str()).collect()
    }
}

impl fmt::Display for FlattenPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)?;
        for step in &self.steps {
            let on = step
                .on
                .iter()
                .map(|j| format!("{} = {}", j.left, j.right))
                .collect::<Vec<_>>()
                .join(" AND ");
            write!(f, "\n  {} join {} on {}", step.kind, step.table, on)?;
            for (old, new) in &step.renames {
                write!(f, "\n    rename {} -> {}", old, new)?;
            }
        }
        Ok(())
    }
}

/// Where every source column ends up in the joined result.
pub(super) struct ResultColumns {
    columns: Vec<String>,
    located: HashMap<(String, String), String>,
}

impl ResultColumns {
    pub(super) fn start(table: &str, columns: &[String]) -> Self {
        Self {
            columns: columns.to_vec(),
            located: columns
                .iter()
                .map(|c| ((table.to_string(), c.clone()), c.clone()))
                .collect(),
        }
    }

    /// Name of `table.column` in the result.
    pub(super) fn locate(&self, table: &str, column: &str) -> DmResult<String> {
        self.located
            .get(&(table.to_string(), column.to_string()))
            .cloned()
            .ok_or_else(|| {
                StateError::ColumnsNotInTable {
                    table: table.to_string(),
                    columns: vec![column.to_string()],
                }
                .into()
            })
    }

    /// Record the columns `table` adds. Right-hand key columns merge into
    /// their left partners; other colliding names become `column.table`.
    /// Returns the renames to apply to `table` first.
    pub(super) fn attach(
        &mut self,
        table: &str,
        columns: &[String],
        on: &[JoinColumns],
        kind: JoinKind,
    ) -> Vec<(String, String)> {
        if kind.is_filtering() {
            return Vec::new();
        }
        let mut renames = Vec::new();
        for column in columns {
            let key = (table.to_string(), column.clone());
            if let Some(pair) = on.iter().find(|j| &j.right == column) {
                self.located.insert(key, pair.left.clone());
                continue;
            }
            let name = if self.columns.contains(column) {
                let renamed = format!("{column}.{table}");
                renames.push((column.clone(), renamed.clone()));
                renamed
            } else {
                column.clone()
            };
            self.columns.push(name.clone());
            self.located.insert(key, name);
        }
        renames
    }

    pub(super) fn into_columns(self) -> Vec<String> {
        self.columns
    }
}
