//! Row predicates used as table filters.
//!
//! Predicates follow SQL three-valued logic: comparing against a missing value
//! yields "unknown", and a row passes a filter only when the predicate is
//! definitely true. Both providers evaluate them identically.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Lt => ordering == Less,
            CompareOp::Le => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Ge => ordering != Less,
        }
    }
}

/// A boolean condition over the columns of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
    IsNull(String),
    NotNull(String),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ge, value)
    }

    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::IsNull(column.into())
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Predicate::NotNull(column.into())
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::All(mut parts) => {
                parts.push(other);
                Predicate::All(parts)
            }
            first => Predicate::All(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Any(mut parts) => {
                parts.push(other);
                Predicate::Any(parts)
            }
            first => Predicate::Any(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// All column names the predicate refers to.
    pub fn columns(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::In { column, .. }
            | Predicate::IsNull(column)
            | Predicate::NotNull(column) => {
                out.insert(column.clone());
            }
            Predicate::All(parts) | Predicate::Any(parts) => {
                for p in parts {
                    p.collect_columns(out);
                }
            }
            Predicate::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Evaluate against one row. `None` means unknown.
    pub fn evaluate<'a, F>(&self, lookup: &F) -> Option<bool>
    where
        F: Fn(&str) -> &'a Value,
    {
        match self {
            Predicate::Compare { column, op, value } => {
                let cell = lookup(column);
                if cell.is_null() || value.is_null() {
                    None
                } else {
                    Some(op.holds(cell.cmp(value)))
                }
            }
            Predicate::In { column, values } => {
                if values.is_empty() {
                    return Some(false);
                }
                let cell = lookup(column);
                if cell.is_null() {
                    None
                } else if values.iter().any(|v| v == cell) {
                    Some(true)
                } else if values.iter().any(Value::is_null) {
                    None
                } else {
                    Some(false)
                }
            }
            Predicate::IsNull(column) => Some(lookup(column).is_null()),
            Predicate::NotNull(column) => Some(!lookup(column).is_null()),
            Predicate::All(parts) => {
                let mut unknown = false;
                for p in parts {
                    match p.evaluate(lookup) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }
            Predicate::Any(parts) => {
                let mut unknown = false;
                for p in parts {
                    match p.evaluate(lookup) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }
            Predicate::Not(inner) => inner.evaluate(lookup).map(|b| !b),
        }
    }

    /// Render as a SQL boolean expression.
    pub fn to_sql(&self) -> String {
        match self {
            Predicate::Compare { column, op, value } => {
                format!("{} {} {}", quote_ident(column), op.as_sql(), sql_literal(value))
            }
            Predicate::In { column, values } => format!(
                "{} IN ({})",
                quote_ident(column),
                values.iter().map(sql_literal).collect::<Vec<_>>().join(", ")
            ),
            Predicate::IsNull(column) => format!("{} IS NULL", quote_ident(column)),
            Predicate::NotNull(column) => format!("{} IS NOT NULL", quote_ident(column)),
            Predicate::All(parts) if parts.is_empty() => "1".to_string(),
            Predicate::Any(parts) if parts.is_empty() => "0".to_string(),
            Predicate::All(parts) => join_sql(parts, " AND "),
            Predicate::Any(parts) => join_sql(parts, " OR "),
            Predicate::Not(inner) => format!("NOT ({})", inner.to_sql()),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

fn join_sql(parts: &[Predicate], sep: &str) -> String {
    parts
        .iter()
        .map(|p| format!("({})", p.to_sql()))
        .collect::<Vec<_>>()
        .join(sep)
}

/// Quote an identifier for SQL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a value as a SQL literal.
pub(crate) fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(x) if x.is_finite() => format!("{:?}", x),
        Value::Float(_) => "NULL".to_string(),
        Value::Str(s) => format!("'{}'", s.replace('\'', "''")),
    }
}
