//! Key checks: uniqueness, subset and cardinality over column value sets.
//!
//! The functions here are pure with respect to the model. They read values
//! through a [`TableProvider`](crate::provider::TableProvider) and report
//! violations with a bounded sample of offending values.

mod cardinality;
pub mod checker;
mod selector;

pub use cardinality::{check_cardinality, examine_cardinality, Cardinality, CardinalityBound};
pub use checker::{check_key, check_subset, is_subset, is_unique, KeyCheck, SubsetCheck, TableColumns};
pub use selector::ColumnSelector;
