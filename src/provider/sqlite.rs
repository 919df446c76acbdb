//! SQLite-backed table provider.
//!
//! Relations are SQL subqueries: filters and joins only compose text, and the
//! database does the work when a count or value set is requested. Nothing is
//! cached, so every query reflects the current contents of the database.

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};

use super::predicate::quote_ident;
use crate::config::SqliteSettings;
use super::{
    require_columns, DuplicateScan, JoinColumns, JoinKind, Predicate, ProviderError,
    ProviderResult, TableProvider, Value,
};

/// A relation expressed as a SQL query with known output columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlRelation {
    pub sql: String,
    pub columns: Vec<String>,
}

fn quote_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Provider reading tables from a SQLite database.
pub struct SqliteProvider {
    conn: Connection,
}

impl SqliteProvider {
    pub fn open(path: impl AsRef<Path>) -> ProviderResult<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> ProviderResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Open the database named by the `[sqlite]` settings section.
    pub fn from_settings(settings: &SqliteSettings) -> ProviderResult<Self> {
        let path = settings
            .resolved_path()
            .map_err(|err| ProviderError::Storage(Box::new(err)))?;
        match path {
            Some(path) => Self::open(path),
            None => Self::open_in_memory(),
        }
    }

    /// The underlying connection, e.g. for loading data.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query_rows(&self, sql: &str, width: usize) -> ProviderResult<Vec<Vec<Value>>> {
        tracing::debug!(sql = %sql, "sqlite query");
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_row(row, width)?);
        }
        Ok(out)
    }

    fn violation_query(relation: &SqlRelation, columns: &[String]) -> String {
        let cols = quote_list(columns);
        let missing: String = columns
            .iter()
            .map(|c| format!(" OR {} IS NULL", quote_ident(c)))
            .collect();
        format!(
            "SELECT {cols} FROM ({}) GROUP BY {cols} HAVING COUNT(*) > 1{missing}",
            relation.sql
        )
    }
}

fn read_row(row: &Row<'_>, width: usize) -> ProviderResult<Vec<Value>> {
    (0..width)
        .map(|i| match row.get_ref(i)? {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(n) => Ok(Value::Int(n)),
            ValueRef::Real(x) => Ok(Value::Float(x)),
            ValueRef::Text(bytes) => Ok(Value::Str(String::from_utf8_lossy(bytes).into_owned())),
            ValueRef::Blob(_) => Err(ProviderError::Unsupported("blob values".to_string())),
        })
        .collect()
}

fn join_condition(on: &[JoinColumns]) -> String {
    if on.is_empty() {
        return "1".to_string();
    }
    on.iter()
        .map(|j| format!("l.{} = r.{}", quote_ident(&j.left), quote_ident(&j.right)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

impl TableProvider for SqliteProvider {
    type Relation = SqlRelation;

    fn table_names(&self) -> ProviderResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn table(&self, name: &str) -> ProviderResult<SqlRelation> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(ProviderError::TableNotFound(name.to_string()));
        }
        Ok(SqlRelation {
            sql: format!("SELECT {} FROM {}", quote_list(&columns), quote_ident(name)),
            columns,
        })
    }

    fn columns(&self, relation: &SqlRelation) -> ProviderResult<Vec<String>> {
        Ok(relation.columns.clone())
    }

    fn row_count(&self, relation: &SqlRelation) -> ProviderResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM ({})", relation.sql);
        tracing::debug!(sql = %sql, "sqlite count");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn distinct_values(
        &self,
        relation: &SqlRelation,
        columns: &[String],
    ) -> ProviderResult<BTreeSet<Vec<Value>>> {
        require_columns(&relation.columns, columns)?;
        let sql = format!(
            "SELECT DISTINCT {} FROM ({})",
            quote_list(columns),
            relation.sql
        );
        Ok(self.query_rows(&sql, columns.len())?.into_iter().collect())
    }

    fn duplicates(
        &self,
        relation: &SqlRelation,
        columns: &[String],
        limit: usize,
    ) -> ProviderResult<DuplicateScan> {
        require_columns(&relation.columns, columns)?;
        let violations = Self::violation_query(relation, columns);

        let exists_sql = format!("SELECT EXISTS ({violations})");
        let has_violations: bool = self.conn.query_row(&exists_sql, [], |row| row.get(0))?;

        let sample = if has_violations && limit > 0 {
            let sample_sql = format!(
                "{violations} ORDER BY {} LIMIT {limit}",
                quote_list(columns)
            );
            self.query_rows(&sample_sql, columns.len())?
        } else {
            Vec::new()
        };

        Ok(DuplicateScan {
            has_violations,
            sample,
        })
    }

    fn filter(&self, relation: &SqlRelation, predicate: &Predicate) -> ProviderResult<SqlRelation> {
        let wanted: Vec<String> = predicate.columns().into_iter().collect();
        require_columns(&relation.columns, &wanted)?;
        Ok(SqlRelation {
            sql: format!("SELECT * FROM ({}) WHERE {}", relation.sql, predicate.to_sql()),
            columns: relation.columns.clone(),
        })
    }

    fn semi_join(
        &self,
        left: &SqlRelation,
        right: &SqlRelation,
        on: &[JoinColumns],
    ) -> ProviderResult<SqlRelation> {
        self.join(left, right, on, JoinKind::Semi)
    }

    fn join(
        &self,
        left: &SqlRelation,
        right: &SqlRelation,
        on: &[JoinColumns],
        kind: JoinKind,
    ) -> ProviderResult<SqlRelation> {
        let left_keys: Vec<String> = on.iter().map(|j| j.left.clone()).collect();
        let right_keys: Vec<String> = on.iter().map(|j| j.right.clone()).collect();
        require_columns(&left.columns, &left_keys)?;
        require_columns(&right.columns, &right_keys)?;
        let condition = join_condition(on);

        if kind.is_filtering() {
            let negate = if kind == JoinKind::Anti { "NOT " } else { "" };
            return Ok(SqlRelation {
                sql: format!(
                    "SELECT l.* FROM ({}) AS l WHERE {negate}EXISTS (SELECT 1 FROM ({}) AS r WHERE {condition})",
                    left.sql, right.sql
                ),
                columns: left.columns.clone(),
            });
        }

        let operator = match kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
            _ => {
                return Err(ProviderError::Unsupported(format!("{kind} join in SQLite")));
            }
        };
        let coalesce_keys = matches!(kind, JoinKind::Right | JoinKind::Full);

        let mut select = Vec::new();
        let mut columns = Vec::new();
        for column in &left.columns {
            let expr = match on.iter().find(|j| &j.left == column) {
                Some(j) if coalesce_keys => format!(
                    "COALESCE(l.{}, r.{})",
                    quote_ident(column),
                    quote_ident(&j.right)
                ),
                _ => format!("l.{}", quote_ident(column)),
            };
            select.push(format!("{expr} AS {}", quote_ident(column)));
            columns.push(column.clone());
        }
        for column in right.columns.iter().filter(|c| !right_keys.contains(c)) {
            select.push(format!("r.{0} AS {0}", quote_ident(column)));
            columns.push(column.clone());
        }

        Ok(SqlRelation {
            sql: format!(
                "SELECT {} FROM ({}) AS l {operator} ({}) AS r ON {condition}",
                select.join(", "),
                left.sql,
                right.sql
            ),
            columns,
        })
    }

    fn rename(
        &self,
        relation: &SqlRelation,
        renames: &[(String, String)],
    ) -> ProviderResult<SqlRelation> {
        let old: Vec<String> = renames.iter().map(|(o, _)| o.clone()).collect();
        require_columns(&relation.columns, &old)?;

        let columns: Vec<String> = relation
            .columns
            .iter()
            .map(|c| {
                renames
                    .iter()
                    .find(|(o, _)| o == c)
                    .map(|(_, n)| n.clone())
                    .unwrap_or_else(|| c.clone())
            })
            .collect();
        let select = relation
            .columns
            .iter()
            .zip(&columns)
            .map(|(o, n)| format!("{} AS {}", quote_ident(o), quote_ident(n)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(SqlRelation {
            sql: format!("SELECT {select} FROM ({})", relation.sql),
            columns,
        })
    }
}
