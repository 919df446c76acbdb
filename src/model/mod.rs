//! DmModel - tables, keys and relationships as one value.
//!
//! A model never changes in place. Every mutation checks its preconditions
//! against the current value and returns a new model, so older values stay
//! valid and can be shared freely. The data itself lives with a
//! [`TableProvider`]; operations that need rows take the provider as an
//! argument.
//!
//! ```text
//! DmModel
//!   ├── tables: [TableDef]        (name, columns, primary key, color)
//!   ├── graph: ConstraintGraph    (foreign keys)
//!   ├── filters: [TableFilter]    (at most one predicate per table)
//!   ├── zoom: Option<ZoomState>   (column edits on one table)
//!   └── settings: Settings
//! ```

mod export;
mod keys;
mod zoom;

pub use export::{DmRecord, GraphSnapshot, SnapshotTable, VisualizationSink};
pub use keys::{ConstraintKind, ConstraintReport, KeyCandidate, PrimaryKey};
pub use zoom::{ZoomColumn, ZoomState};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{DmResult, KeyError, StateError};
use crate::filter::FilterPropagator;
use crate::graph::ConstraintGraph;
use crate::provider::{Predicate, TableProvider};

/// A table as the model sees it. Rows stay with the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl TableDef {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            primary_key: None,
            color: None,
        }
    }
}

/// The active filter of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFilter {
    pub table: String,
    pub predicate: Predicate,
}

/// One provider relation per table, in model order.
#[derive(Debug, Clone)]
pub struct TablesData<R> {
    entries: Vec<(String, R)>,
}

impl<R> TablesData<R> {
    pub(crate) fn new(entries: Vec<(String, R)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, table: &str) -> Option<&R> {
        self.entries
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rel)| rel)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.entries.iter().map(|(name, rel)| (name.as_str(), rel))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row count of every relation.
    pub fn row_counts<P>(&self, provider: &P) -> DmResult<Vec<(String, usize)>>
    where
        P: TableProvider<Relation = R>,
    {
        self.entries
            .iter()
            .map(|(name, rel)| Ok((name.clone(), provider.row_count(rel)?)))
            .collect()
    }
}

/// The relational data model.
#[derive(Debug, Clone, Default)]
pub struct DmModel {
    tables: Vec<TableDef>,
    graph: ConstraintGraph,
    filters: Vec<TableFilter>,
    zoom: Option<ZoomState>,
    settings: Settings,
}

impl DmModel {
    /// Build a model from table definitions.
    ///
    /// Names must be non-empty and unique, and so must the columns of each
    /// table. Primary keys carried by the definitions are kept as they are.
    pub fn new(tables: impl IntoIterator<Item = TableDef>) -> DmResult<Self> {
        DmModel::default().add_tables(tables)
    }

    /// Build a model from tables of a provider; all of them if `names` is empty.
    pub fn from_provider<P: TableProvider>(provider: &P, names: &[&str]) -> DmResult<Self> {
        let names: Vec<String> = if names.is_empty() {
            provider.table_names()?
        } else {
            names.iter().map(|n| n.to_string()).collect()
        };
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let relation = provider.table(&name)?;
            let columns = provider.columns(&relation)?;
            tables.push(TableDef::new(name, columns));
        }
        Self::new(tables)
    }

    /// Replace the settings (sample size, default join kind).
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn sample_size(&self) -> usize {
        self.settings.checks.sample_size
    }

    /// The foreign-key graph.
    pub fn graph(&self) -> &ConstraintGraph {
        &self.graph
    }

    // =========================================================================
    // Guards
    // =========================================================================

    pub(crate) fn ensure_not_zoomed(&self, operation: &str) -> Result<(), StateError> {
        match self.zoom {
            Some(_) => Err(StateError::without_zoom(operation)),
            None => Ok(()),
        }
    }

    pub(crate) fn ensure_no_filters(&self, operation: &str) -> Result<(), StateError> {
        if self.filters.is_empty() {
            Ok(())
        } else {
            Err(StateError::without_filters(operation))
        }
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    /// Table names in model order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    pub fn table(&self, name: &str) -> DmResult<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| StateError::table_not_in_dm(name).into())
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> DmResult<&mut TableDef> {
        self.tables
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| StateError::table_not_in_dm(name).into())
    }

    pub fn columns(&self, table: &str) -> DmResult<&[String]> {
        Ok(&self.table(table)?.columns)
    }

    /// Add tables. Names must not clash with each other or with the model,
    /// and a carried primary key must be a single column of its table.
    pub fn add_tables(&self, tables: impl IntoIterator<Item = TableDef>) -> DmResult<Self> {
        self.ensure_not_zoomed("add_tables")?;
        let tables: Vec<TableDef> = tables.into_iter().collect();

        if tables.iter().any(|t| t.name.is_empty()) {
            return Err(StateError::UnnamedTables.into());
        }

        let mut seen: BTreeSet<&str> = self.tables.iter().map(|t| t.name.as_str()).collect();
        let mut duplicates: Vec<String> = Vec::new();
        for table in &tables {
            if !seen.insert(table.name.as_str()) && !duplicates.contains(&table.name) {
                duplicates.push(table.name.clone());
            }
        }
        if !duplicates.is_empty() {
            return Err(StateError::DuplicateTableNames { names: duplicates }.into());
        }

        for table in &tables {
            check_column_names(table)?;
            check_primary_key(table)?;
        }

        let mut next = self.clone();
        for table in tables {
            next.graph.add_table(&table.name);
            next.tables.push(table);
        }
        Ok(next)
    }

    /// Remove a table with its primary key, filter and outgoing foreign keys.
    ///
    /// Fails with `FirstRemoveFks` while other tables reference it, unless
    /// `rm_referencing_fks` is set.
    pub fn rm_table(&self, name: &str, rm_referencing_fks: bool) -> DmResult<Self> {
        self.ensure_not_zoomed("rm_table")?;
        self.table(name)?;

        let mut next = self.clone();
        let removed = next.graph.remove_table(name, rm_referencing_fks)?;
        next.tables.retain(|t| t.name != name);
        next.filters.retain(|f| f.table != name);

        if !removed.is_empty() {
            tracing::info!(table = name, foreign_keys = removed.len(), "removed table with its foreign keys");
        }
        Ok(next)
    }

    /// Keep only `names` (in that order) and the foreign keys among them.
    pub fn select_tables(&self, names: &[&str]) -> DmResult<Self> {
        self.ensure_not_zoomed("select_tables")?;
        let unknown: Vec<String> = names
            .iter()
            .filter(|n| !self.has_table(n))
            .map(|n| n.to_string())
            .collect();
        if !unknown.is_empty() {
            return Err(StateError::TableNotInDm { tables: unknown }.into());
        }

        let mut keep: Vec<String> = Vec::new();
        for name in names {
            if !keep.iter().any(|k| k.as_str() == *name) {
                keep.push(name.to_string());
            }
        }

        let mut next = self.clone();
        next.graph = self.graph.induced(&keep)?;
        next.tables = keep
            .iter()
            .filter_map(|name| self.tables.iter().find(|t| &t.name == name).cloned())
            .collect();
        next.filters.retain(|f| keep.contains(&f.table));

        let dropped = self.graph.edge_count() - next.graph.edge_count();
        if dropped > 0 {
            tracing::info!(foreign_keys = dropped, "dropped foreign keys to unselected tables");
        }
        Ok(next)
    }

    pub fn rename_table(&self, old: &str, new: &str) -> DmResult<Self> {
        self.ensure_not_zoomed("rename_table")?;
        self.table(old)?;
        if new.is_empty() {
            return Err(StateError::UnnamedTables.into());
        }
        if old == new {
            return Ok(self.clone());
        }
        if self.has_table(new) {
            return Err(StateError::DuplicateTableNames {
                names: vec![new.to_string()],
            }
            .into());
        }

        let mut next = self.clone();
        next.graph.rename_table(old, new)?;
        next.table_mut(old)?.name = new.to_string();
        for filter in next.filters.iter_mut().filter(|f| f.table == old) {
            filter.table = new.to_string();
        }
        Ok(next)
    }

    // =========================================================================
    // Filters
    // =========================================================================

    /// Set the filter of `table`, replacing any earlier one.
    ///
    /// Predicates on the same table are not combined; build the combination
    /// with [`Predicate::and`] before calling.
    pub fn filter(&self, table: &str, predicate: Predicate) -> DmResult<Self> {
        self.ensure_not_zoomed("filter")?;
        let def = self.table(table)?;
        let unknown: Vec<String> = predicate
            .columns()
            .into_iter()
            .filter(|c| !def.columns.contains(c))
            .collect();
        if !unknown.is_empty() {
            return Err(StateError::ColumnsNotInTable {
                table: table.to_string(),
                columns: unknown,
            }
            .into());
        }

        let mut next = self.clone();
        match next.filters.iter_mut().find(|f| f.table == table) {
            Some(existing) => existing.predicate = predicate,
            None => next.filters.push(TableFilter {
                table: table.to_string(),
                predicate,
            }),
        }
        Ok(next)
    }

    /// Drop the filter of `table`, if any.
    pub fn rm_filter(&self, table: &str) -> DmResult<Self> {
        self.table(table)?;
        let mut next = self.clone();
        next.filters.retain(|f| f.table != table);
        Ok(next)
    }

    /// Drop every filter.
    pub fn rm_filters(&self) -> Self {
        let mut next = self.clone();
        next.filters.clear();
        next
    }

    pub fn filters(&self) -> &[TableFilter] {
        &self.filters
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Propagate the filters through the foreign keys and materialise the
    /// result. Returns the same model without filters plus one relation per
    /// table.
    pub fn apply_filters<P: TableProvider>(
        &self,
        provider: &P,
    ) -> DmResult<(DmModel, TablesData<P::Relation>)> {
        self.ensure_not_zoomed("apply_filters")?;
        let data = FilterPropagator::new(self, provider).run()?;
        Ok((self.rm_filters(), data))
    }

    /// The unfiltered relation of every table.
    pub fn tables_data<P: TableProvider>(&self, provider: &P) -> DmResult<TablesData<P::Relation>> {
        self.ensure_no_filters("tables_data")?;
        let mut entries = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            entries.push((table.name.clone(), provider.table(&table.name)?));
        }
        Ok(TablesData::new(entries))
    }

    /// Row count of every table.
    pub fn nrow<P: TableProvider>(&self, provider: &P) -> DmResult<Vec<(String, usize)>> {
        self.ensure_no_filters("nrow")?;
        self.tables_data(provider)?.row_counts(provider)
    }
}

fn check_column_names(table: &TableDef) -> Result<(), StateError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    for column in &table.columns {
        if !seen.insert(column.as_str()) && !duplicates.contains(column) {
            duplicates.push(column.clone());
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(StateError::DuplicateColumnNames {
            table: table.name.clone(),
            names: duplicates,
        })
    }
}

/// A carried primary key must be one column of the table.
fn check_primary_key(table: &TableDef) -> DmResult<()> {
    let Some(key) = &table.primary_key else {
        return Ok(());
    };
    match key.len() {
        0 => {
            return Err(KeyError::NotUniqueKey {
                table: table.name.clone(),
                columns: Vec::new(),
                duplicates: Vec::new(),
            }
            .into())
        }
        1 => {}
        _ => {
            return Err(KeyError::CompoundKeysNotSupported {
                table: table.name.clone(),
                columns: key.clone(),
            }
            .into())
        }
    }
    let unknown: Vec<String> = key
        .iter()
        .filter(|c| !table.columns.contains(c))
        .cloned()
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(StateError::ColumnsNotInTable {
            table: table.name.clone(),
            columns: unknown,
        }
        .into())
    }
}
