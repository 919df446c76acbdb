//! Zooming: column edits on one table, written back as a whole.
//!
//! While a model is zoomed, structural mutations are refused. Column
//! selections and renames are tracked against the columns the table had when
//! the zoom started, so that keys can follow them on the way back.
//!
//! Only the model's view of the table changes. Bringing the provider's data
//! in line (a view, a copied table) is up to the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{DmModel, TableDef};
use crate::error::{DmResult, StateError};
use crate::keys::ColumnSelector;

/// A column of the zoomed table and the original column it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomColumn {
    pub name: String,
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomState {
    pub table: String,
    pub columns: Vec<ZoomColumn>,
}

impl ZoomState {
    fn new(table: &str, columns: &[String]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns
                .iter()
                .map(|c| ZoomColumn {
                    name: c.clone(),
                    origin: c.clone(),
                })
                .collect(),
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Original column name -> current name, for surviving columns.
    fn lineage(&self) -> HashMap<&str, &str> {
        self.columns
            .iter()
            .map(|c| (c.origin.as_str(), c.name.as_str()))
            .collect()
    }

    /// Follow `columns` through the edits; `None` if any of them was dropped.
    fn follow(&self, columns: &[String]) -> Option<Vec<String>> {
        let lineage = self.lineage();
        columns
            .iter()
            .map(|c| lineage.get(c.as_str()).map(|n| n.to_string()))
            .collect()
    }
}

impl DmModel {
    pub fn is_zoomed(&self) -> bool {
        self.zoom.is_some()
    }

    pub fn zoomed_table(&self) -> Option<&str> {
        self.zoom.as_ref().map(|z| z.table.as_str())
    }

    pub fn zoom_state(&self) -> Option<&ZoomState> {
        self.zoom.as_ref()
    }

    fn zoom(&self, operation: &str) -> Result<&ZoomState, StateError> {
        self.zoom
            .as_ref()
            .ok_or_else(|| StateError::with_zoom(operation))
    }

    /// Start editing the columns of `table`.
    pub fn zoom_to(&self, table: &str) -> DmResult<Self> {
        self.ensure_not_zoomed("zoom_to")?;
        self.ensure_no_filters("zoom_to")?;
        let def = self.table(table)?;

        let mut next = self.clone();
        next.zoom = Some(ZoomState::new(table, &def.columns));
        Ok(next)
    }

    /// Current columns of the zoomed table.
    pub fn zoomed_columns(&self) -> DmResult<Vec<String>> {
        Ok(self.zoom("zoomed_columns")?.column_names())
    }

    /// Keep only the selected columns, in selection order.
    pub fn select_zoomed(&self, selector: impl Into<ColumnSelector>) -> DmResult<Self> {
        let zoom = self.zoom("select_zoomed")?;
        let chosen = selector
            .into()
            .resolve(&zoom.table, &zoom.column_names())?;

        let columns = chosen
            .iter()
            .filter_map(|name| zoom.columns.iter().find(|c| &c.name == name).cloned())
            .collect();

        let mut next = self.clone();
        next.zoom = Some(ZoomState {
            table: zoom.table.clone(),
            columns,
        });
        Ok(next)
    }

    pub fn rename_zoomed(&self, old: &str, new: &str) -> DmResult<Self> {
        let zoom = self.zoom("rename_zoomed")?;
        if !zoom.columns.iter().any(|c| c.name == old) {
            return Err(StateError::ColumnsNotInTable {
                table: zoom.table.clone(),
                columns: vec![old.to_string()],
            }
            .into());
        }
        if old != new && zoom.columns.iter().any(|c| c.name == new) {
            return Err(StateError::DuplicateColumnNames {
                table: zoom.table.clone(),
                names: vec![new.to_string()],
            }
            .into());
        }

        let mut state = zoom.clone();
        for column in state.columns.iter_mut().filter(|c| c.name == old) {
            column.name = new.to_string();
        }
        let mut next = self.clone();
        next.zoom = Some(state);
        Ok(next)
    }

    /// Write the edited columns back to the zoomed table.
    ///
    /// The primary key and outgoing foreign keys follow renames. A dropped
    /// primary key column takes the key and every foreign key into the table
    /// with it; a dropped foreign key column takes that foreign key.
    pub fn update_zoomed(&self) -> DmResult<Self> {
        let zoom = self.zoom("update_zoomed")?.clone();
        let table = zoom.table.as_str();
        let mut next = self.clone();
        next.zoom = None;

        let old_pk = self.table(table)?.primary_key.clone();
        let new_pk = old_pk.as_ref().and_then(|pk| zoom.follow(pk));
        if old_pk.is_some() && new_pk.is_none() {
            let dropped = next.graph.retain_edges(|fk| fk.parent != table);
            tracing::warn!(table, foreign_keys = dropped.len(), "primary key column dropped while zoomed");
        }

        let dropped = next
            .graph
            .retain_edges(|fk| fk.child != table || zoom.follow(&fk.child_columns).is_some());
        if !dropped.is_empty() {
            tracing::warn!(table, foreign_keys = dropped.len(), "foreign key columns dropped while zoomed");
        }
        next.graph.map_child_columns(table, |columns| {
            zoom.follow(columns).unwrap_or_else(|| columns.to_vec())
        });

        let def = next.table_mut(table)?;
        def.columns = zoom.column_names();
        def.primary_key = new_pk;
        Ok(next)
    }

    /// Add the edited columns as a new table, leaving the zoomed table as it
    /// was. The new table keeps the surviving primary key and outgoing
    /// foreign keys.
    pub fn insert_zoomed(&self, new_name: &str) -> DmResult<Self> {
        let zoom = self.zoom("insert_zoomed")?.clone();
        let source = self.table(&zoom.table)?;

        let mut def = TableDef::new(new_name, zoom.column_names());
        def.primary_key = source.primary_key.as_ref().and_then(|pk| zoom.follow(pk));

        let mut without_zoom = self.clone();
        without_zoom.zoom = None;
        let mut next = without_zoom.add_tables([def])?;

        for fk in self.graph.outgoing_edges(&zoom.table)? {
            if let Some(columns) = zoom.follow(&fk.child_columns) {
                next.graph.add_edge(new_name, &columns, &fk.parent)?;
            }
        }
        Ok(next)
    }

    /// Leave zoom without changing the model.
    pub fn discard_zoomed(&self) -> DmResult<Self> {
        self.zoom("discard_zoomed")?;
        let mut next = self.clone();
        next.zoom = None;
        Ok(next)
    }
}
