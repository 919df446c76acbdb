//! Table providers: the storage side of a relational model.
//!
//! The model itself only knows table names, columns and keys. Rows live in a
//! [`TableProvider`], which reads columns, counts rows and executes filters and
//! joins on its own relation handles.
//!
//! ```text
//! ┌──────────────┐   plans / predicates   ┌────────────────────────────┐
//! │   DmModel    │ ─────────────────────▶ │       TableProvider        │
//! │ keys, graph  │ ◀───────────────────── │  InMemoryProvider (Frame)  │
//! └──────────────┘  values, row counts    │  SqliteProvider (SQL text) │
//!                                         └────────────────────────────┘
//! ```

mod memory;
mod predicate;
mod sqlite;
pub mod value;

pub use memory::{Frame, InMemoryProvider};
pub use predicate::{CompareOp, Predicate};
pub use sqlite::{SqlRelation, SqliteProvider};
pub use value::Value;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures reported by a table provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("table not found: `{0}`")]
    TableNotFound(String),

    #[error("column not found: `{0}`")]
    ColumnNotFound(String),

    #[error("table `{table}` already exists")]
    TableExists { table: String },

    #[error("column names must be unique: {}", .columns.join(", "))]
    DuplicateColumns { columns: Vec<String> },

    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("operation not supported by this provider: {0}")]
    Unsupported(String),

    /// Underlying storage or transport failure.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<rusqlite::Error> for ProviderError {
    fn from(err: rusqlite::Error) -> Self {
        ProviderError::Storage(Box::new(err))
    }
}

/// Kind of join between two relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Left,
    Inner,
    Full,
    Right,
    Semi,
    Anti,
    Nest,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Left => "left",
            JoinKind::Inner => "inner",
            JoinKind::Full => "full",
            JoinKind::Right => "right",
            JoinKind::Semi => "semi",
            JoinKind::Anti => "anti",
            JoinKind::Nest => "nest",
        }
    }

    /// Does the result keep only the left columns?
    pub fn is_filtering(&self) -> bool {
        matches!(self, JoinKind::Semi | JoinKind::Anti)
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An equality condition `left.column = right.column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinColumns {
    pub left: String,
    pub right: String,
}

impl JoinColumns {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Outcome of a duplicate scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateScan {
    /// At least one violating combination exists.
    pub has_violations: bool,
    /// Up to the requested number of violating combinations, in value order.
    pub sample: Vec<Vec<Value>>,
}

/// Capability for reading and combining tables.
///
/// Every call is synchronous and may fail; the model never retries. Relations
/// are provider-native handles: a materialised frame for the in-memory
/// provider, a SQL subquery for SQLite.
///
/// Join contract, shared by all implementations:
/// - left/inner/full/right results hold every left column followed by the
///   right columns that are not join keys; full and right joins fill the left
///   key columns from the right side where the left row is missing;
/// - semi and anti results hold exactly the left columns;
/// - the caller guarantees that non-key column names do not collide.
pub trait TableProvider {
    type Relation: Clone + fmt::Debug;

    /// Names of all stored tables.
    fn table_names(&self) -> ProviderResult<Vec<String>>;

    /// Handle to a stored table.
    fn table(&self, name: &str) -> ProviderResult<Self::Relation>;

    fn columns(&self, relation: &Self::Relation) -> ProviderResult<Vec<String>>;

    fn row_count(&self, relation: &Self::Relation) -> ProviderResult<usize>;

    /// Distinct combinations of the given columns, including missing values.
    fn distinct_values(
        &self,
        relation: &Self::Relation,
        columns: &[String],
    ) -> ProviderResult<BTreeSet<Vec<Value>>>;

    /// Combinations of `columns` that occur more than once or contain a
    /// missing value.
    fn duplicates(
        &self,
        relation: &Self::Relation,
        columns: &[String],
        limit: usize,
    ) -> ProviderResult<DuplicateScan>;

    fn filter(
        &self,
        relation: &Self::Relation,
        predicate: &Predicate,
    ) -> ProviderResult<Self::Relation>;

    /// Rows of `left` with at least one match in `right`.
    fn semi_join(
        &self,
        left: &Self::Relation,
        right: &Self::Relation,
        on: &[JoinColumns],
    ) -> ProviderResult<Self::Relation>;

    fn join(
        &self,
        left: &Self::Relation,
        right: &Self::Relation,
        on: &[JoinColumns],
        kind: JoinKind,
    ) -> ProviderResult<Self::Relation>;

    /// Rename columns; pairs are `(old, new)`.
    fn rename(
        &self,
        relation: &Self::Relation,
        renames: &[(String, String)],
    ) -> ProviderResult<Self::Relation>;
}

/// Fail with `ColumnNotFound` for the first column not in `available`.
pub(crate) fn require_columns(available: &[String], wanted: &[String]) -> ProviderResult<()> {
    match wanted.iter().find(|c| !available.contains(c)) {
        Some(missing) => Err(ProviderError::ColumnNotFound(missing.clone())),
        None => Ok(()),
    }
}
