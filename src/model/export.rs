//! Colors, graph snapshots and the interchange record.

use serde::{Deserialize, Serialize};

use super::{DmModel, TableDef};
use crate::error::{DmResult, StateError};
use crate::graph::ForeignKey;

/// A table as drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTable {
    pub name: String,
    pub columns: Vec<String>,
    pub color: Option<String>,
    pub primary_key: Vec<String>,
}

/// Everything a renderer needs: tables and foreign keys, in model order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub tables: Vec<SnapshotTable>,
    pub edges: Vec<ForeignKey>,
}

/// Consumer of graph snapshots, e.g. a diagram renderer.
pub trait VisualizationSink {
    type Output;

    fn draw(&mut self, snapshot: &GraphSnapshot) -> Self::Output;
}

/// The model as plain data: enough to rebuild it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmRecord {
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

fn is_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !color.is_empty() && color.chars().all(|c| c.is_ascii_alphanumeric()),
    }
}

impl DmModel {
    /// Give `tables` a color: a name (`"darkgreen"`) or a hex code.
    pub fn set_colors(&self, color: &str, tables: &[&str]) -> DmResult<Self> {
        if !is_color(color) {
            return Err(StateError::InvalidColor {
                color: color.to_string(),
            }
            .into());
        }
        let unknown: Vec<String> = tables
            .iter()
            .filter(|t| !self.has_table(t))
            .map(|t| t.to_string())
            .collect();
        if !unknown.is_empty() {
            return Err(StateError::TableNotInDm { tables: unknown }.into());
        }

        let mut next = self.clone();
        for table in tables {
            next.table_mut(table)?.color = Some(color.to_string());
        }
        Ok(next)
    }

    /// `(table, color)` for every colored table.
    pub fn get_colors(&self) -> Vec<(String, String)> {
        self.tables
            .iter()
            .filter_map(|t| t.color.as_ref().map(|c| (t.name.clone(), c.clone())))
            .collect()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            tables: self
                .tables
                .iter()
                .map(|t| SnapshotTable {
                    name: t.name.clone(),
                    columns: t.columns.clone(),
                    color: t.color.clone(),
                    primary_key: t.primary_key.clone().unwrap_or_default(),
                })
                .collect(),
            edges: self.graph.edges(),
        }
    }

    /// Hand a snapshot to `sink`.
    pub fn draw<S: VisualizationSink>(&self, sink: &mut S) -> S::Output {
        sink.draw(&self.snapshot())
    }

    pub fn to_record(&self) -> DmRecord {
        DmRecord {
            tables: self.tables.clone(),
            foreign_keys: self.graph.edges(),
        }
    }

    /// Rebuild a model. Foreign keys go through `add_fk`, so a record with a
    /// foreign key into a table without primary key is rejected.
    pub fn from_record(record: DmRecord) -> DmResult<Self> {
        let mut dm = DmModel::new(record.tables)?;
        for fk in record.foreign_keys {
            dm = dm.add_fk(&fk.child, fk.child_columns, &fk.parent)?;
        }
        Ok(dm)
    }

    pub fn to_json(&self) -> DmResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_record())?)
    }

    pub fn from_json(json: &str) -> DmResult<Self> {
        Self::from_record(serde_json::from_str(json)?)
    }
}
