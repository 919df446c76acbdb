//! In-memory table provider.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::{
    require_columns, DuplicateScan, JoinColumns, JoinKind, Predicate, ProviderError,
    ProviderResult, TableProvider, Value,
};
use crate::keys::checker::duplicate_values;

/// A materialised table: column names plus rows.
///
/// Rows are shared behind an `Arc`, so cloning a frame is cheap and relations
/// derived from a stored table never copy it unless they change it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Arc<Vec<Vec<Value>>>,
}

impl Frame {
    /// Build a frame, checking that column names are unique and that every
    /// row has one value per column.
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> ProviderResult<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        check_unique_columns(&columns)?;
        if let Some((row, values)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(ProviderError::RowWidth {
                row,
                expected: columns.len(),
                found: values.len(),
            });
        }
        Ok(Self {
            columns,
            rows: Arc::new(rows),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn position(&self, column: &str) -> ProviderResult<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| ProviderError::ColumnNotFound(column.to_string()))
    }

    fn positions(&self, columns: &[String]) -> ProviderResult<Vec<usize>> {
        columns.iter().map(|c| self.position(c)).collect()
    }

    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> ProviderResult<Vec<Value>> {
        let idx = self.position(name)?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    fn project(&self, positions: &[usize]) -> impl Iterator<Item = Vec<Value>> + '_ {
        let positions = positions.to_vec();
        self.rows
            .iter()
            .map(move |r| positions.iter().map(|&i| r[i].clone()).collect())
    }

    fn with_rows(&self, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: Arc::new(rows),
        }
    }
}

fn check_unique_columns(columns: &[String]) -> ProviderResult<()> {
    let mut seen = BTreeSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    for column in columns {
        if !seen.insert(column.as_str()) && !duplicates.contains(column) {
            duplicates.push(column.clone());
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::DuplicateColumns { columns: duplicates })
    }
}

/// Provider keeping every table as a [`Frame`] in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    tables: BTreeMap<String, Frame>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; replaces an existing table of the same name.
    pub fn with_table(mut self, name: impl Into<String>, frame: Frame) -> Self {
        self.tables.insert(name.into(), frame);
        self
    }

    /// Store a new table.
    pub fn insert(&mut self, name: impl Into<String>, frame: Frame) -> ProviderResult<()> {
        let name = name.into();
        if self.tables.contains_key(&name) {
            return Err(ProviderError::TableExists { table: name });
        }
        self.tables.insert(name, frame);
        Ok(())
    }
}

impl TableProvider for InMemoryProvider {
    type Relation = Frame;

    fn table_names(&self) -> ProviderResult<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn table(&self, name: &str) -> ProviderResult<Frame> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::TableNotFound(name.to_string()))
    }

    fn columns(&self, relation: &Frame) -> ProviderResult<Vec<String>> {
        Ok(relation.columns.clone())
    }

    fn row_count(&self, relation: &Frame) -> ProviderResult<usize> {
        Ok(relation.len())
    }

    fn distinct_values(
        &self,
        relation: &Frame,
        columns: &[String],
    ) -> ProviderResult<BTreeSet<Vec<Value>>> {
        let positions = relation.positions(columns)?;
        Ok(relation.project(&positions).collect())
    }

    fn duplicates(
        &self,
        relation: &Frame,
        columns: &[String],
        limit: usize,
    ) -> ProviderResult<DuplicateScan> {
        let positions = relation.positions(columns)?;
        let violations = duplicate_values(relation.project(&positions));
        Ok(DuplicateScan {
            has_violations: !violations.is_empty(),
            sample: violations.into_iter().take(limit).collect(),
        })
    }

    fn filter(&self, relation: &Frame, predicate: &Predicate) -> ProviderResult<Frame> {
        let wanted: Vec<String> = predicate.columns().into_iter().collect();
        require_columns(&relation.columns, &wanted)?;
        let index: HashMap<&str, usize> = relation
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let rows = relation
            .rows
            .iter()
            .filter(|row| predicate.evaluate(&|c: &str| &row[index[c]]) == Some(true))
            .cloned()
            .collect();
        Ok(relation.with_rows(rows))
    }

    fn semi_join(&self, left: &Frame, right: &Frame, on: &[JoinColumns]) -> ProviderResult<Frame> {
        self.join(left, right, on, JoinKind::Semi)
    }

    fn join(
        &self,
        left: &Frame,
        right: &Frame,
        on: &[JoinColumns],
        kind: JoinKind,
    ) -> ProviderResult<Frame> {
        if kind == JoinKind::Nest {
            return Err(ProviderError::Unsupported(
                "nest joins produce nested tables".to_string(),
            ));
        }

        let left_keys: Vec<usize> = on
            .iter()
            .map(|j| left.position(&j.left))
            .collect::<ProviderResult<_>>()?;
        let right_keys: Vec<usize> = on
            .iter()
            .map(|j| right.position(&j.right))
            .collect::<ProviderResult<_>>()?;

        // Missing key values never match.
        let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            let key: Vec<Value> = right_keys.iter().map(|&k| row[k].clone()).collect();
            if key.iter().any(Value::is_null) {
                continue;
            }
            index.entry(key).or_default().push(i);
        }

        if kind.is_filtering() {
            let keep_matched = kind == JoinKind::Semi;
            let rows = left
                .rows
                .iter()
                .filter(|row| matching_rows(&index, &left_keys, row).is_some() == keep_matched)
                .cloned()
                .collect();
            return Ok(left.with_rows(rows));
        }

        let right_rest: Vec<usize> = (0..right.columns.len())
            .filter(|i| !right_keys.contains(i))
            .collect();
        let mut columns = left.columns.clone();
        columns.extend(right_rest.iter().map(|&i| right.columns[i].clone()));

        let keep_left = matches!(kind, JoinKind::Left | JoinKind::Full);
        let keep_right = matches!(kind, JoinKind::Right | JoinKind::Full);

        let mut rows = Vec::new();
        let mut right_matched = vec![false; right.rows.len()];
        for row in left.rows.iter() {
            match matching_rows(&index, &left_keys, row) {
                Some(matches) => {
                    for &m in matches {
                        right_matched[m] = true;
                        let mut out = row.clone();
                        out.extend(right_rest.iter().map(|&i| right.rows[m][i].clone()));
                        rows.push(out);
                    }
                }
                None if keep_left => {
                    let mut out = row.clone();
                    out.extend(std::iter::repeat(Value::Null).take(right_rest.len()));
                    rows.push(out);
                }
                None => {}
            }
        }

        if keep_right {
            for (m, matched) in right_matched.iter().enumerate() {
                if *matched {
                    continue;
                }
                let mut out = vec![Value::Null; left.columns.len()];
                for (&l, &r) in left_keys.iter().zip(&right_keys) {
                    out[l] = right.rows[m][r].clone();
                }
                out.extend(right_rest.iter().map(|&i| right.rows[m][i].clone()));
                rows.push(out);
            }
        }

        Frame::new(columns, rows)
    }

    fn rename(&self, relation: &Frame, renames: &[(String, String)]) -> ProviderResult<Frame> {
        let mut columns = relation.columns.clone();
        for (old, new) in renames {
            let idx = relation.position(old)?;
            columns[idx] = new.clone();
        }
        check_unique_columns(&columns)?;
        Ok(Frame {
            columns,
            rows: Arc::clone(&relation.rows),
        })
    }
}

/// Right-hand row numbers matching the key of `row`.
fn matching_rows<'i>(
    index: &'i HashMap<Vec<Value>, Vec<usize>>,
    keys: &[usize],
    row: &[Value],
) -> Option<&'i Vec<usize>> {
    let key: Vec<Value> = keys.iter().map(|&k| row[k].clone()).collect();
    if key.iter().any(Value::is_null) {
        None
    } else {
        index.get(&key)
    }
}
