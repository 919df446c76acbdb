//! Primary and foreign keys of a model.

use serde::{Deserialize, Serialize};

use super::DmModel;
use crate::error::{DmResult, KeyError, ReferenceError, StateError};
use crate::graph::ForeignKey;
use crate::keys::{
    check_cardinality, check_key, check_subset, examine_cardinality, is_subset, is_unique,
    Cardinality, CardinalityBound, ColumnSelector, TableColumns,
};
use crate::provider::value::format_keys;
use crate::provider::{Predicate, TableProvider};

/// Primary key of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub table: String,
    pub columns: Vec<String>,
}

/// One row of a candidate report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCandidate {
    pub column: String,
    pub candidate: bool,
    /// Why the column was rejected; empty for candidates.
    pub why: String,
}

impl KeyCandidate {
    fn accepted(column: &str) -> Self {
        Self {
            column: column.to_string(),
            candidate: true,
            why: String::new(),
        }
    }

    fn rejected(column: &str, why: String) -> Self {
        Self {
            column: column.to_string(),
            candidate: false,
            why,
        }
    }
}

/// Candidates first, then alphabetically.
fn sort_candidates(candidates: &mut [KeyCandidate]) {
    candidates.sort_by(|a, b| {
        b.candidate
            .cmp(&a.candidate)
            .then_with(|| a.column.cmp(&b.column))
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
}

/// Outcome of checking one key against the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub kind: ConstraintKind,
    pub table: String,
    pub columns: Vec<String>,
    /// Referenced table, for foreign keys.
    pub ref_table: Option<String>,
    pub is_valid: bool,
    /// Rendered failure, for invalid keys.
    pub problem: Option<String>,
}

impl DmModel {
    // =========================================================================
    // Primary keys
    // =========================================================================

    /// Set the primary key of `table` without looking at the data.
    ///
    /// Fails with `KeySetForceFalse` if a key exists and `force` is false.
    pub fn add_pk(
        &self,
        table: &str,
        columns: impl Into<ColumnSelector>,
        force: bool,
    ) -> DmResult<Self> {
        self.ensure_not_zoomed("add_pk")?;
        let key = self.pk_selection(table, &columns.into(), force)?;
        self.with_pk(table, key)
    }

    /// Set the primary key of `table` after checking that the column is
    /// unique and never missing.
    pub fn add_pk_checked<P: TableProvider>(
        &self,
        provider: &P,
        table: &str,
        columns: impl Into<ColumnSelector>,
        force: bool,
    ) -> DmResult<Self> {
        self.ensure_not_zoomed("add_pk")?;
        let key = self.pk_selection(table, &columns.into(), force)?;
        let relation = provider.table(table)?;
        check_key(
            provider,
            TableColumns::new(table, &relation, &key),
            self.sample_size(),
        )?;
        self.with_pk(table, key)
    }

    fn pk_selection(
        &self,
        table: &str,
        selector: &ColumnSelector,
        force: bool,
    ) -> DmResult<Vec<String>> {
        let def = self.table(table)?;
        let key = selector.resolve(table, &def.columns)?;
        match key.len() {
            0 => {
                return Err(KeyError::NotUniqueKey {
                    table: table.to_string(),
                    columns: key,
                    duplicates: Vec::new(),
                }
                .into())
            }
            1 => {}
            _ => {
                return Err(KeyError::CompoundKeysNotSupported {
                    table: table.to_string(),
                    columns: key,
                }
                .into())
            }
        }
        if let (Some(existing), false) = (&def.primary_key, force) {
            return Err(KeyError::KeySetForceFalse {
                table: table.to_string(),
                existing: existing.clone(),
            }
            .into());
        }
        Ok(key)
    }

    fn with_pk(&self, table: &str, key: Vec<String>) -> DmResult<Self> {
        let mut next = self.clone();
        let def = next.table_mut(table)?;
        if let Some(old) = def.primary_key.replace(key) {
            tracing::debug!(table, old = ?old, "replaced primary key");
        }
        Ok(next)
    }

    /// Remove the primary key of `table`.
    ///
    /// Foreign keys pointing at the table (including self-references) must be
    /// removed first, or together with `rm_referencing_fks`.
    pub fn rm_pk(&self, table: &str, rm_referencing_fks: bool) -> DmResult<Self> {
        self.ensure_not_zoomed("rm_pk")?;
        if self.table(table)?.primary_key.is_none() {
            tracing::debug!(table, "no primary key to remove");
            return Ok(self.clone());
        }

        let referencing = self.incoming_tables(table)?;
        if !referencing.is_empty() && !rm_referencing_fks {
            return Err(ReferenceError::FirstRemoveFks {
                table: table.to_string(),
                referencing,
            }
            .into());
        }

        let mut next = self.clone();
        for child in &referencing {
            let removed = next.graph.remove_edges(child, table, None)?;
            tracing::info!(child = %child, parent = table, foreign_keys = removed.len(), "removed referencing foreign keys");
        }
        next.table_mut(table)?.primary_key = None;
        Ok(next)
    }

    /// Tables with a foreign key into `table`, itself included when it
    /// references itself.
    fn incoming_tables(&self, table: &str) -> DmResult<Vec<String>> {
        let mut tables = self.graph.referencing_tables(table)?;
        if !self.graph.edges_from_to(table, table)?.is_empty() {
            tables.push(table.to_string());
        }
        Ok(tables)
    }

    pub fn has_pk(&self, table: &str) -> DmResult<bool> {
        Ok(self.table(table)?.primary_key.is_some())
    }

    /// Primary key columns of `table`; empty if it has none.
    pub fn get_pk(&self, table: &str) -> DmResult<Vec<String>> {
        Ok(self.table(table)?.primary_key.clone().unwrap_or_default())
    }

    /// Every primary key, in table order.
    pub fn get_all_pks(&self) -> Vec<PrimaryKey> {
        self.tables
            .iter()
            .filter_map(|t| {
                t.primary_key.as_ref().map(|columns| PrimaryKey {
                    table: t.name.clone(),
                    columns: columns.clone(),
                })
            })
            .collect()
    }

    // =========================================================================
    // Foreign keys
    // =========================================================================

    /// Add a foreign key from `columns` of `child` to the primary key of
    /// `parent`, without looking at the data.
    ///
    /// Identical calls add parallel foreign keys.
    pub fn add_fk(
        &self,
        child: &str,
        columns: impl Into<ColumnSelector>,
        parent: &str,
    ) -> DmResult<Self> {
        self.ensure_not_zoomed("add_fk")?;
        let (child_columns, _) = self.fk_selection(child, &columns.into(), parent)?;
        self.with_fk(child, &child_columns, parent)
    }

    /// Add a foreign key after checking that every present child value
    /// occurs in the parent key.
    pub fn add_fk_checked<P: TableProvider>(
        &self,
        provider: &P,
        child: &str,
        columns: impl Into<ColumnSelector>,
        parent: &str,
    ) -> DmResult<Self> {
        self.ensure_not_zoomed("add_fk")?;
        let (child_columns, parent_key) = self.fk_selection(child, &columns.into(), parent)?;
        let child_rel = provider.table(child)?;
        let parent_rel = provider.table(parent)?;
        check_subset(
            provider,
            TableColumns::new(child, &child_rel, &child_columns),
            TableColumns::new(parent, &parent_rel, &parent_key),
            self.sample_size(),
        )?;
        self.with_fk(child, &child_columns, parent)
    }

    /// Resolve the child columns and the parent key they reference.
    fn fk_selection(
        &self,
        child: &str,
        selector: &ColumnSelector,
        parent: &str,
    ) -> DmResult<(Vec<String>, Vec<String>)> {
        let child_def = self.table(child)?;
        let parent_key = self.referenced_key(parent)?;
        let child_columns = selector.resolve(child, &child_def.columns)?;
        if child_columns.len() != parent_key.len() {
            return Err(ReferenceError::FkColumnCountMismatch {
                child: child.to_string(),
                parent: parent.to_string(),
                expected: parent_key.len(),
                found: child_columns.len(),
            }
            .into());
        }
        Ok((child_columns, parent_key))
    }

    /// The primary key a foreign key into `parent` references.
    pub(crate) fn referenced_key(&self, parent: &str) -> DmResult<Vec<String>> {
        self.table(parent)?.primary_key.clone().ok_or_else(|| {
            ReferenceError::RefTableHasNoPk {
                table: parent.to_string(),
            }
            .into()
        })
    }

    fn with_fk(&self, child: &str, child_columns: &[String], parent: &str) -> DmResult<Self> {
        let mut next = self.clone();
        next.graph.add_edge(child, child_columns, parent)?;
        Ok(next)
    }

    /// Remove foreign keys from `child` to `parent`: all of them with
    /// `columns = None`, otherwise those on exactly the selected columns.
    pub fn rm_fk(
        &self,
        child: &str,
        columns: Option<ColumnSelector>,
        parent: &str,
    ) -> DmResult<Self> {
        self.ensure_not_zoomed("rm_fk")?;
        let child_def = self.table(child)?;
        self.table(parent)?;
        let columns = columns
            .map(|selector| selector.resolve(child, &child_def.columns))
            .transpose()?;

        let mut next = self.clone();
        next.graph.remove_edges(child, parent, columns.as_deref())?;
        Ok(next)
    }

    pub fn has_fk(&self, child: &str, parent: &str) -> DmResult<bool> {
        Ok(!self.graph.edges_from_to(child, parent)?.is_empty())
    }

    /// Child column sets of the foreign keys from `child` to `parent`.
    pub fn get_fk(&self, child: &str, parent: &str) -> DmResult<Vec<Vec<String>>> {
        Ok(self
            .graph
            .edges_from_to(child, parent)?
            .into_iter()
            .map(|fk| fk.child_columns)
            .collect())
    }

    /// Every foreign key, in insertion order.
    pub fn get_all_fks(&self) -> Vec<ForeignKey> {
        self.graph.edges()
    }

    pub fn is_referenced(&self, table: &str) -> DmResult<bool> {
        self.graph.is_referenced(table)
    }

    pub fn referencing_tables(&self, table: &str) -> DmResult<Vec<String>> {
        self.graph.referencing_tables(table)
    }

    // =========================================================================
    // Candidates
    // =========================================================================

    /// Which columns of `table` could serve as its primary key?
    pub fn enum_pk_candidates<P: TableProvider>(
        &self,
        provider: &P,
        table: &str,
    ) -> DmResult<Vec<KeyCandidate>> {
        let def = self.table(table)?;
        let relation = provider.table(table)?;
        let sample = self.sample_size();

        let mut out = Vec::with_capacity(def.columns.len());
        for column in &def.columns {
            let columns = [column.clone()];
            if is_unique(provider, &relation, &columns, sample)?.is_unique {
                out.push(KeyCandidate::accepted(column));
                continue;
            }

            let mut reasons = Vec::new();
            let present = provider.filter(&relation, &Predicate::not_null(column))?;
            let duplicates = provider.duplicates(&present, &columns, sample)?;
            if duplicates.has_violations {
                reasons.push(format!(
                    "has duplicate values: {}",
                    format_keys(&duplicates.sample)
                ));
            }
            if provider.row_count(&present)? < provider.row_count(&relation)? {
                reasons.push("has missing values".to_string());
            }
            out.push(KeyCandidate::rejected(column, reasons.join(", and ")));
        }

        sort_candidates(&mut out);
        Ok(out)
    }

    /// Which columns of `table` could reference the primary key of
    /// `ref_table`?
    pub fn enum_fk_candidates<P: TableProvider>(
        &self,
        provider: &P,
        table: &str,
        ref_table: &str,
    ) -> DmResult<Vec<KeyCandidate>> {
        let def = self.table(table)?;
        let parent_key = self.referenced_key(ref_table)?;
        let relation = provider.table(table)?;
        let parent_values = provider.distinct_values(&provider.table(ref_table)?, &parent_key)?;
        let sample = self.sample_size();

        let mut out = Vec::with_capacity(def.columns.len());
        for column in &def.columns {
            let child_values = provider.distinct_values(&relation, &[column.clone()])?;
            let check = is_subset(&child_values, &parent_values, sample);
            if check.is_subset {
                out.push(KeyCandidate::accepted(column));
            } else {
                out.push(KeyCandidate::rejected(
                    column,
                    format!(
                        "values of `{table}.{column}` not in `{ref_table}.{}`: {}",
                        parent_key.join(", "),
                        format_keys(&check.missing_sample)
                    ),
                ));
            }
        }

        sort_candidates(&mut out);
        Ok(out)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check every key against the data.
    ///
    /// Violations are reported, not raised; only provider failures are
    /// errors. Keys added without a check can be verified here once the data
    /// is in place.
    pub fn examine_constraints<P: TableProvider>(
        &self,
        provider: &P,
    ) -> DmResult<Vec<ConstraintReport>> {
        let sample = self.sample_size();
        let mut reports = Vec::new();

        for pk in self.get_all_pks() {
            let relation = provider.table(&pk.table)?;
            let outcome = check_key(
                provider,
                TableColumns::new(&pk.table, &relation, &pk.columns),
                sample,
            );
            reports.push(report(ConstraintKind::PrimaryKey, pk.table, pk.columns, None, outcome)?);
        }

        for fk in self.get_all_fks() {
            let parent_key = self.referenced_key(&fk.parent)?;
            let child_rel = provider.table(&fk.child)?;
            let parent_rel = provider.table(&fk.parent)?;
            let outcome = check_subset(
                provider,
                TableColumns::new(&fk.child, &child_rel, &fk.child_columns),
                TableColumns::new(&fk.parent, &parent_rel, &parent_key),
                sample,
            );
            reports.push(report(
                ConstraintKind::ForeignKey,
                fk.child,
                fk.child_columns,
                Some(fk.parent),
                outcome,
            )?);
        }

        let invalid = reports.iter().filter(|r| !r.is_valid).count();
        if invalid > 0 {
            tracing::warn!(invalid, total = reports.len(), "constraints violated by the data");
        }
        Ok(reports)
    }

    /// Check that the model is consistent in itself: every key column
    /// exists, the graph holds exactly the model's tables and every foreign
    /// key references a primary key of matching width.
    pub fn validate(&self) -> DmResult<()> {
        let graph_tables = self.graph.table_names();
        let model_tables: std::collections::BTreeSet<String> =
            self.tables.iter().map(|t| t.name.clone()).collect();
        if graph_tables != model_tables {
            let stray: Vec<String> = graph_tables
                .symmetric_difference(&model_tables)
                .cloned()
                .collect();
            return Err(StateError::TableNotInDm { tables: stray }.into());
        }

        for table in &self.tables {
            if let Some(pk) = &table.primary_key {
                require_columns(&table.name, &table.columns, pk)?;
            }
        }

        for fk in self.graph.edges() {
            let child = self.table(&fk.child)?;
            require_columns(&child.name, &child.columns, &fk.child_columns)?;
            let parent_key = self.referenced_key(&fk.parent)?;
            if parent_key.len() != fk.child_columns.len() {
                return Err(ReferenceError::FkColumnCountMismatch {
                    child: fk.child,
                    parent: fk.parent,
                    expected: parent_key.len(),
                    found: fk.child_columns.len(),
                }
                .into());
            }
        }
        Ok(())
    }

    // =========================================================================
    // Cardinality
    // =========================================================================

    /// Cardinality of the first foreign key from `child` to `parent`.
    pub fn examine_cardinality<P: TableProvider>(
        &self,
        provider: &P,
        child: &str,
        parent: &str,
    ) -> DmResult<Cardinality> {
        let (child_columns, parent_key) = self.first_fk(child, parent)?;
        let child_rel = provider.table(child)?;
        let parent_rel = provider.table(parent)?;
        examine_cardinality(
            provider,
            TableColumns::new(parent, &parent_rel, &parent_key),
            TableColumns::new(child, &child_rel, &child_columns),
            self.sample_size(),
        )
    }

    /// Fail with `CardinalityMismatch` unless the first foreign key from
    /// `child` to `parent` satisfies `expected`.
    pub fn check_cardinality<P: TableProvider>(
        &self,
        provider: &P,
        child: &str,
        parent: &str,
        expected: CardinalityBound,
    ) -> DmResult<Cardinality> {
        let (child_columns, parent_key) = self.first_fk(child, parent)?;
        let child_rel = provider.table(child)?;
        let parent_rel = provider.table(parent)?;
        check_cardinality(
            provider,
            TableColumns::new(parent, &parent_rel, &parent_key),
            TableColumns::new(child, &child_rel, &child_columns),
            expected,
            self.sample_size(),
        )
    }

    fn first_fk(&self, child: &str, parent: &str) -> DmResult<(Vec<String>, Vec<String>)> {
        let fk = self
            .graph
            .edges_from_to(child, parent)?
            .into_iter()
            .next()
            .ok_or_else(|| ReferenceError::FkNotTracked {
                child: child.to_string(),
                parent: parent.to_string(),
            })?;
        Ok((fk.child_columns, self.referenced_key(parent)?))
    }
}

fn require_columns(table: &str, available: &[String], wanted: &[String]) -> DmResult<()> {
    let missing: Vec<String> = wanted
        .iter()
        .filter(|c| !available.contains(c))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StateError::ColumnsNotInTable {
            table: table.to_string(),
            columns: missing,
        }
        .into())
    }
}

/// Turn a check outcome into a report; provider failures stay errors.
fn report(
    kind: ConstraintKind,
    table: String,
    columns: Vec<String>,
    ref_table: Option<String>,
    outcome: DmResult<()>,
) -> DmResult<ConstraintReport> {
    let problem = match outcome {
        Ok(()) => None,
        Err(crate::error::DmError::Provider(err)) => return Err(err.into()),
        Err(err) => Some(err.to_string()),
    };
    Ok(ConstraintReport {
        kind,
        table,
        columns,
        ref_table,
        is_valid: problem.is_none(),
        problem,
    })
}
