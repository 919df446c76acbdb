//! Flattening: joining connected tables into one.
//!
//! Two modes, both returning a [`FlattenPlan`] before anything runs:
//!
//! ```text
//! join_to_tbl (neighbours)        squash_to_tbl (squash)
//!
//!   airlines ─┐                     airlines ─┐
//!   planes ───┼─► flights           planes ───┼─► flights
//!   airports ─┘                     models ─► planes
//! ```
//!
//! In neighbours mode every table joins the start table directly; in squash
//! mode tables join breadth-first through whatever they are connected to.

mod plan;
mod planner;

pub use plan::{FlattenMode, FlattenPlan, JoinStep};
pub use planner::FlattenPlanner;

use crate::error::DmResult;
use crate::model::DmModel;
use crate::provider::{JoinKind, TableProvider};

/// Run `plan` through `provider`.
///
/// Right-hand tables are renamed as planned, then joined to the result so
/// far. Fails with `OnlyPossibleWithoutFilters` on a filtered model: apply
/// the filters first.
pub fn execute<P: TableProvider>(
    model: &DmModel,
    provider: &P,
    plan: &FlattenPlan,
) -> DmResult<P::Relation> {
    model.ensure_no_filters("flatten")?;
    let mut result = provider.table(&plan.start)?;
    for step in &plan.steps {
        let mut right = provider.table(&step.table)?;
        if !step.renames.is_empty() {
            right = provider.rename(&right, &step.renames)?;
        }
        result = provider.join(&result, &right, &step.on, step.kind)?;
        tracing::debug!(table = %step.table, kind = %step.kind, "joined");
    }
    Ok(result)
}

impl DmModel {
    fn join_kind(&self, kind: Option<JoinKind>) -> JoinKind {
        kind.unwrap_or(self.settings().flatten.join)
    }

    /// Plan joining `tables` (all neighbours if empty) directly to `start`.
    pub fn plan_join_to_tbl(
        &self,
        start: &str,
        tables: &[&str],
        kind: Option<JoinKind>,
    ) -> DmResult<FlattenPlan> {
        FlattenPlanner::new(self).neighbours(start, tables, self.join_kind(kind))
    }

    /// Join `tables` (all neighbours if empty) directly to `start`.
    pub fn join_to_tbl<P: TableProvider>(
        &self,
        provider: &P,
        start: &str,
        tables: &[&str],
        kind: Option<JoinKind>,
    ) -> DmResult<P::Relation> {
        let plan = self.plan_join_to_tbl(start, tables, kind)?;
        execute(self, provider, &plan)
    }

    /// Plan squashing `tables` (everything reachable if empty) into `start`.
    pub fn plan_squash_to_tbl(
        &self,
        start: &str,
        tables: &[&str],
        kind: Option<JoinKind>,
    ) -> DmResult<FlattenPlan> {
        FlattenPlanner::new(self).squash(start, tables, self.join_kind(kind))
    }

    /// Squash `tables` (everything reachable if empty) into `start`.
    pub fn squash_to_tbl<P: TableProvider>(
        &self,
        provider: &P,
        start: &str,
        tables: &[&str],
        kind: Option<JoinKind>,
    ) -> DmResult<P::Relation> {
        let plan = self.plan_squash_to_tbl(start, tables, kind)?;
        execute(self, provider, &plan)
    }
}
