//! Cardinality of a foreign-key relationship.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::checker::{all_present, check_key, check_subset, TableColumns};
use crate::error::{DmResult, KeyError};
use crate::provider::TableProvider;

/// How parent rows map onto child rows across a foreign key.
///
/// Every child value belongs to exactly one parent row; the variants differ in
/// how many child rows a parent row has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Each parent row has exactly one child row.
    Bijective,
    /// Each parent row has zero or one child row.
    Injective,
    /// Each parent row has at least one child row.
    Surjective,
    /// Each parent row has any number of child rows.
    Generic,
}

impl Cardinality {
    /// Classify from whether child values are unique and whether they cover
    /// every parent row.
    pub fn from_flags(child_unique: bool, covers_parent: bool) -> Self {
        match (child_unique, covers_parent) {
            (true, true) => Cardinality::Bijective,
            (true, false) => Cardinality::Injective,
            (false, true) => Cardinality::Surjective,
            (false, false) => Cardinality::Generic,
        }
    }

    pub fn satisfies(&self, bound: CardinalityBound) -> bool {
        match bound {
            CardinalityBound::ZeroToMany => true,
            CardinalityBound::OneToMany => {
                matches!(self, Cardinality::Surjective | Cardinality::Bijective)
            }
            CardinalityBound::ZeroToOne => {
                matches!(self, Cardinality::Injective | Cardinality::Bijective)
            }
            CardinalityBound::OneToOne => matches!(self, Cardinality::Bijective),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Bijective => write!(f, "bijective mapping (child: 1 -> parent: 1)"),
            Cardinality::Injective => write!(f, "injective mapping (child: 0 or 1 -> parent: 1)"),
            Cardinality::Surjective => write!(f, "surjective mapping (child: 1 to n -> parent: 1)"),
            Cardinality::Generic => write!(f, "generic mapping (child: 0 to n -> parent: 1)"),
        }
    }
}

/// Expected number of child rows per parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardinalityBound {
    #[serde(rename = "0_n")]
    ZeroToMany,
    #[serde(rename = "1_n")]
    OneToMany,
    #[serde(rename = "0_1")]
    ZeroToOne,
    #[serde(rename = "1_1")]
    OneToOne,
}

impl fmt::Display for CardinalityBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CardinalityBound::ZeroToMany => "0..n",
            CardinalityBound::OneToMany => "1..n",
            CardinalityBound::ZeroToOne => "0..1",
            CardinalityBound::OneToOne => "1..1",
        };
        write!(f, "{}", s)
    }
}

/// Determine the cardinality of `child` referencing `parent`.
///
/// Fails with `NotUniqueKey` if the parent columns are not a key and with
/// `NotSubsetOf` if some child value has no parent.
pub fn examine_cardinality<P: TableProvider>(
    provider: &P,
    parent: TableColumns<'_, P::Relation>,
    child: TableColumns<'_, P::Relation>,
    sample: usize,
) -> DmResult<Cardinality> {
    check_key(provider, parent, sample)?;
    check_subset(provider, child, parent, sample)?;

    let present = provider.filter(child.relation, &all_present(child.columns))?;
    let child_unique = !provider.duplicates(&present, child.columns, 0)?.has_violations;
    let child_distinct = provider.distinct_values(&present, child.columns)?.len();
    let parent_rows = provider.row_count(parent.relation)?;

    Ok(Cardinality::from_flags(child_unique, child_distinct == parent_rows))
}

/// Examine the cardinality and fail with `CardinalityMismatch` unless it
/// satisfies `expected`.
pub fn check_cardinality<P: TableProvider>(
    provider: &P,
    parent: TableColumns<'_, P::Relation>,
    child: TableColumns<'_, P::Relation>,
    expected: CardinalityBound,
    sample: usize,
) -> DmResult<Cardinality> {
    let actual = examine_cardinality(provider, parent, child, sample)?;
    if actual.satisfies(expected) {
        Ok(actual)
    } else {
        Err(KeyError::CardinalityMismatch {
            child: child.table.to_string(),
            parent: parent.table.to_string(),
            expected: expected.to_string(),
            actual,
        }
        .into())
    }
}
