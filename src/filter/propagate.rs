use std::collections::{HashMap, VecDeque};

use crate::error::DmResult;
use crate::graph::ForeignKey;
use crate::model::{DmModel, TablesData};
use crate::provider::{JoinColumns, TableProvider};

/// Computes the filtered relation of every table of a model.
///
/// Filtered tables are reduced by their predicate first. Then a
/// breadth-first queue takes a shrunken table and semi-joins each neighbour
/// against it, one foreign key at a time in insertion order. A neighbour is
/// updated and queued only when its row count drops, so the loop ends even
/// on cyclic graphs: counts only ever decrease. Tables never reached keep all
/// rows.
pub struct FilterPropagator<'a, P: TableProvider> {
    model: &'a DmModel,
    provider: &'a P,
}

struct Reduced<R> {
    relation: R,
    rows: usize,
}

impl<'a, P: TableProvider> FilterPropagator<'a, P> {
    pub fn new(model: &'a DmModel, provider: &'a P) -> Self {
        Self { model, provider }
    }

    pub fn run(&self) -> DmResult<TablesData<P::Relation>> {
        let mut state: HashMap<String, Reduced<P::Relation>> = HashMap::new();
        for table in self.model.table_names() {
            let relation = self.provider.table(&table)?;
            let rows = self.provider.row_count(&relation)?;
            state.insert(table, Reduced { relation, rows });
        }

        let mut queue: VecDeque<String> = VecDeque::new();
        for filter in self.model.filters() {
            let Some(current) = state.get_mut(&filter.table) else {
                continue;
            };
            current.relation = self.provider.filter(&current.relation, &filter.predicate)?;
            current.rows = self.provider.row_count(&current.relation)?;
            tracing::debug!(table = %filter.table, rows = current.rows, "applied filter");
            queue.push_back(filter.table.clone());
        }

        while let Some(table) = queue.pop_front() {
            for fk in self.model.graph().incident_edges(&table)? {
                if fk.child == fk.parent {
                    continue;
                }
                let other = fk.other_end(&table).to_string();
                let on = self.join_columns(&fk, &other)?;

                let (Some(source), Some(target)) = (state.get(&table), state.get(&other)) else {
                    continue;
                };
                let relation = self
                    .provider
                    .semi_join(&target.relation, &source.relation, &on)?;
                let rows = self.provider.row_count(&relation)?;
                if rows >= target.rows {
                    continue;
                }

                tracing::debug!(from = %table, to = %other, rows, "propagated filter");
                state.insert(other.clone(), Reduced { relation, rows });
                if !queue.contains(&other) {
                    queue.push_back(other);
                }
            }
        }

        let entries = self
            .model
            .table_names()
            .into_iter()
            .filter_map(|name| state.remove(&name).map(|r| (name, r.relation)))
            .collect();
        Ok(TablesData::new(entries))
    }

    /// Join columns for semi-joining `target` against the other end of `fk`.
    fn join_columns(&self, fk: &ForeignKey, target: &str) -> DmResult<Vec<JoinColumns>> {
        let parent_key = self.model.referenced_key(&fk.parent)?;
        let pairs = fk.child_columns.iter().zip(parent_key.iter());
        Ok(if fk.child == target {
            pairs.map(|(c, p)| JoinColumns::new(c.clone(), p.clone())).collect()
        } else {
            pairs.map(|(c, p)| JoinColumns::new(p.clone(), c.clone())).collect()
        })
    }
}
