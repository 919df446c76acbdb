//! Error taxonomy for the relational model.
//!
//! Every failure belongs to one category. Callers can match on the category
//! (`DmError::Key(..)`, `DmError::Reference(..)`, ...) and then on the
//! structured variant, or just print the message.

use thiserror::Error;

use crate::keys::Cardinality;
use crate::provider::value::format_keys;
use crate::provider::{JoinKind, ProviderError, Value};

/// Result type for model operations.
pub type DmResult<T> = Result<T, DmError>;

/// Top-level error, one variant per category.
#[derive(Debug, Error)]
pub enum DmError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("invalid model record: {0}")]
    Record(#[from] serde_json::Error),
}

/// Primary-key and uniqueness failures.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The columns do not identify rows uniquely (or are empty / missing).
    #[error(
        "({}) not a unique key of `{table}`{}",
        .columns.join(", "),
        sample_suffix(.duplicates)
    )]
    NotUniqueKey {
        table: String,
        columns: Vec<String>,
        duplicates: Vec<Vec<Value>>,
    },

    /// A primary key exists already and `force` was not set.
    #[error("table `{table}` already has a primary key ({}); use `force` to replace it", .existing.join(", "))]
    KeySetForceFalse { table: String, existing: Vec<String> },

    /// More than one column was selected for a key.
    #[error("compound keys are not supported: `{table}` ({})", .columns.join(", "))]
    CompoundKeysNotSupported { table: String, columns: Vec<String> },

    /// Examined cardinality did not satisfy the expectation.
    #[error("cardinality of `{child}` -> `{parent}` is {actual}, expected {expected}")]
    CardinalityMismatch {
        child: String,
        parent: String,
        expected: String,
        actual: Cardinality,
    },
}

/// Foreign-key and referential-integrity failures.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("ref table `{table}` needs a primary key first")]
    RefTableHasNoPk { table: String },

    /// Some child values have no match among the parent key values.
    #[error(
        "column ({}) of `{child}` not a subset of column ({}) of `{parent}`{}",
        .child_columns.join(", "),
        .parent_columns.join(", "),
        sample_suffix(.missing)
    )]
    NotSubsetOf {
        child: String,
        child_columns: Vec<String>,
        parent: String,
        parent_columns: Vec<String>,
        missing: Vec<Vec<Value>>,
    },

    #[error("({}) of `{child}` is not a foreign key referencing `{parent}`", .columns.join(", "))]
    IsNotForeignKey {
        child: String,
        parent: String,
        columns: Vec<String>,
    },

    /// The table is still referenced by foreign keys.
    #[error(
        "table `{table}` is referenced by {}; remove those foreign keys first or set `rm_referencing_fks`",
        quoted(.referencing)
    )]
    FirstRemoveFks {
        table: String,
        referencing: Vec<String>,
    },

    #[error("no foreign key tracked between `{child}` and `{parent}`")]
    FkNotTracked { child: String, parent: String },

    #[error("foreign key `{child}` -> `{parent}` needs {expected} column(s), got {found}")]
    FkColumnCountMismatch {
        child: String,
        parent: String,
        expected: usize,
        found: usize,
    },
}

/// Failures of graph traversals (flattening).
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("cycles in the relationship graph reachable from `{start}` are not supported")]
    NoCycles { start: String },

    #[error(
        "tables {} are not direct neighbours of `{start}`",
        quoted(.tables)
    )]
    TablesNotNeighbours { start: String, tables: Vec<String> },

    #[error(
        "tables {} are not reachable from `{start}`",
        quoted(.tables)
    )]
    TablesNotReachableFromStart { start: String, tables: Vec<String> },

    #[error("squashing supports only left, inner and full joins, not {kind}")]
    SquashLimited { kind: JoinKind },

    #[error("nest joins cannot be flattened into a single table")]
    NoFlattenWithNestJoin,

    #[error("{kind} joins need exactly one table next to `{start}`, got {count}")]
    SemiAntiJoinTwoTablesOnly {
        kind: JoinKind,
        start: String,
        count: usize,
    },
}

/// Operation not allowed in the current model state, or unknown names.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("`{operation}` is only possible on a model that is not zoomed")]
    OnlyPossibleWithoutZoom { operation: String },

    #[error("`{operation}` is only possible on a zoomed model")]
    OnlyPossibleWithZoom { operation: String },

    #[error("`{operation}` is only possible without active filters; apply them first")]
    OnlyPossibleWithoutFilters { operation: String },

    #[error("tables not in model: {}", quoted(.tables))]
    TableNotInDm { tables: Vec<String> },

    #[error("columns not in `{table}`: {}", quoted(.columns))]
    ColumnsNotInTable { table: String, columns: Vec<String> },

    #[error("table names must be unique: {}", quoted(.names))]
    DuplicateTableNames { names: Vec<String> },

    #[error("all tables need a name")]
    UnnamedTables,

    #[error("column names in `{table}` must be unique: {}", quoted(.names))]
    DuplicateColumnNames { table: String, names: Vec<String> },

    #[error("`{color}` is not a color name or hex code")]
    InvalidColor { color: String },
}

impl StateError {
    pub(crate) fn table_not_in_dm(table: &str) -> Self {
        StateError::TableNotInDm {
            tables: vec![table.to_string()],
        }
    }

    pub(crate) fn without_zoom(operation: &str) -> Self {
        StateError::OnlyPossibleWithoutZoom {
            operation: operation.to_string(),
        }
    }

    pub(crate) fn with_zoom(operation: &str) -> Self {
        StateError::OnlyPossibleWithZoom {
            operation: operation.to_string(),
        }
    }

    pub(crate) fn without_filters(operation: &str) -> Self {
        StateError::OnlyPossibleWithoutFilters {
            operation: operation.to_string(),
        }
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("`{}`", n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sample_suffix(values: &[Vec<Value>]) -> String {
    if values.is_empty() {
        String::new()
    } else {
        format!("; offending values: {}", format_keys(values))
    }
}
