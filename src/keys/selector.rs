//! Column selection against a live schema.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::StateError;

type SelectFn = dyn Fn(&[String]) -> Vec<String> + Send + Sync;

/// Chooses columns from the columns a table currently has.
///
/// Selectors are evaluated eagerly, once per call, against the column list at
/// that moment.
#[derive(Clone)]
pub enum ColumnSelector {
    /// Exactly these columns, in this order. Unknown names are an error.
    Names(Vec<String>),
    /// Columns starting with a prefix.
    Prefix(String),
    /// Columns matching a regular expression.
    Matches(Regex),
    /// Every column.
    All,
    /// Any function of the available columns.
    Custom(Arc<SelectFn>),
}

impl ColumnSelector {
    pub fn names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        ColumnSelector::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        ColumnSelector::Prefix(prefix.into())
    }

    pub fn matches(pattern: &str) -> Result<Self, regex::Error> {
        Ok(ColumnSelector::Matches(Regex::new(pattern)?))
    }

    pub fn all() -> Self {
        ColumnSelector::All
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> Vec<String> + Send + Sync + 'static,
    {
        ColumnSelector::Custom(Arc::new(f))
    }

    /// Resolve against the columns of `table`.
    ///
    /// The result may be empty; callers that need at least one column decide
    /// how to fail.
    pub fn resolve(&self, table: &str, available: &[String]) -> Result<Vec<String>, StateError> {
        let chosen: Vec<String> = match self {
            ColumnSelector::Names(names) => names.clone(),
            ColumnSelector::Prefix(prefix) => available
                .iter()
                .filter(|c| c.starts_with(prefix.as_str()))
                .cloned()
                .collect(),
            ColumnSelector::Matches(re) => available
                .iter()
                .filter(|c| re.is_match(c))
                .cloned()
                .collect(),
            ColumnSelector::All => available.to_vec(),
            ColumnSelector::Custom(f) => f(available),
        };

        let unknown: Vec<String> = chosen
            .iter()
            .filter(|c| !available.contains(c))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(StateError::ColumnsNotInTable {
                table: table.to_string(),
                columns: unknown,
            });
        }

        let mut seen = Vec::with_capacity(chosen.len());
        for column in chosen {
            if !seen.contains(&column) {
                seen.push(column);
            }
        }
        Ok(seen)
    }
}

impl fmt::Debug for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSelector::Names(names) => f.debug_tuple("Names").field(names).finish(),
            ColumnSelector::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            ColumnSelector::Matches(re) => f.debug_tuple("Matches").field(&re.as_str()).finish(),
            ColumnSelector::All => write!(f, "All"),
            ColumnSelector::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl From<&str> for ColumnSelector {
    fn from(name: &str) -> Self {
        ColumnSelector::Names(vec![name.to_string()])
    }
}

impl From<String> for ColumnSelector {
    fn from(name: String) -> Self {
        ColumnSelector::Names(vec![name])
    }
}

impl From<Vec<String>> for ColumnSelector {
    fn from(names: Vec<String>) -> Self {
        ColumnSelector::Names(names)
    }
}

impl From<Vec<&str>> for ColumnSelector {
    fn from(names: Vec<&str>) -> Self {
        ColumnSelector::names(names)
    }
}

impl<const N: usize> From<[&str; N]> for ColumnSelector {
    fn from(names: [&str; N]) -> Self {
        ColumnSelector::names(names)
    }
}
