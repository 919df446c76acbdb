//! Uniqueness and subset checks.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{DmResult, KeyError, ReferenceError};
use crate::provider::{Predicate, ProviderResult, TableProvider, Value};

/// Result of a uniqueness check.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCheck {
    pub is_unique: bool,
    /// Bounded sample of violating combinations (duplicates or missing).
    pub duplicate_sample: Vec<Vec<Value>>,
}

/// Result of a subset check.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetCheck {
    pub is_subset: bool,
    /// Bounded sample of child values absent from the parent.
    pub missing_sample: Vec<Vec<Value>>,
}

/// Some columns of one relation, named for error messages.
#[derive(Debug)]
pub struct TableColumns<'a, R> {
    pub table: &'a str,
    pub relation: &'a R,
    pub columns: &'a [String],
}

impl<R> Clone for TableColumns<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for TableColumns<'_, R> {}

impl<'a, R> TableColumns<'a, R> {
    pub fn new(table: &'a str, relation: &'a R, columns: &'a [String]) -> Self {
        Self {
            table,
            relation,
            columns,
        }
    }
}

/// Combinations occurring more than once or containing a missing value, in
/// value order.
pub fn duplicate_values(rows: impl IntoIterator<Item = Vec<Value>>) -> Vec<Vec<Value>> {
    let mut counts: BTreeMap<Vec<Value>, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(key, n)| *n > 1 || key.iter().any(Value::is_null))
        .map(|(key, _)| key)
        .collect()
}

/// Child combinations without a missing value that do not occur in the parent.
pub fn missing_values<'a>(
    child: impl IntoIterator<Item = &'a Vec<Value>>,
    parent: &BTreeSet<Vec<Value>>,
) -> Vec<Vec<Value>> {
    child
        .into_iter()
        .filter(|key| !key.iter().any(Value::is_null))
        .filter(|key| !parent.contains(*key))
        .cloned()
        .collect()
}

/// Set containment of child values in parent values, ignoring missing child
/// values.
pub fn is_subset(
    child_values: &BTreeSet<Vec<Value>>,
    parent_values: &BTreeSet<Vec<Value>>,
    sample: usize,
) -> SubsetCheck {
    let missing = missing_values(child_values, parent_values);
    SubsetCheck {
        is_subset: missing.is_empty(),
        missing_sample: missing.into_iter().take(sample).collect(),
    }
}

/// Do `columns`, taken together, identify the rows of `relation`?
///
/// An empty column list is never unique.
pub fn is_unique<P: TableProvider>(
    provider: &P,
    relation: &P::Relation,
    columns: &[String],
    sample: usize,
) -> ProviderResult<KeyCheck> {
    if columns.is_empty() {
        return Ok(KeyCheck {
            is_unique: false,
            duplicate_sample: Vec::new(),
        });
    }
    let scan = provider.duplicates(relation, columns, sample)?;
    Ok(KeyCheck {
        is_unique: !scan.has_violations,
        duplicate_sample: scan.sample,
    })
}

/// Fail with `NotUniqueKey` unless the columns form a key.
pub fn check_key<P: TableProvider>(
    provider: &P,
    key: TableColumns<'_, P::Relation>,
    sample: usize,
) -> DmResult<()> {
    let check = is_unique(provider, key.relation, key.columns, sample)?;
    if check.is_unique {
        Ok(())
    } else {
        tracing::debug!(table = key.table, columns = ?key.columns, "key check failed");
        Err(KeyError::NotUniqueKey {
            table: key.table.to_string(),
            columns: key.columns.to_vec(),
            duplicates: check.duplicate_sample,
        }
        .into())
    }
}

/// Fail with `NotSubsetOf` unless every non-missing child value appears among
/// the parent values.
pub fn check_subset<P: TableProvider>(
    provider: &P,
    child: TableColumns<'_, P::Relation>,
    parent: TableColumns<'_, P::Relation>,
    sample: usize,
) -> DmResult<()> {
    let child_values = provider.distinct_values(child.relation, child.columns)?;
    let parent_values = provider.distinct_values(parent.relation, parent.columns)?;
    let check = is_subset(&child_values, &parent_values, sample);
    if check.is_subset {
        Ok(())
    } else {
        Err(ReferenceError::NotSubsetOf {
            child: child.table.to_string(),
            child_columns: child.columns.to_vec(),
            parent: parent.table.to_string(),
            parent_columns: parent.columns.to_vec(),
            missing: check.missing_sample,
        }
        .into())
    }
}

/// Predicate keeping rows where none of `columns` is missing.
pub(crate) fn all_present(columns: &[String]) -> Predicate {
    Predicate::All(columns.iter().map(Predicate::not_null).collect())
}
