//! # dm
//!
//! Relational data models: tables, primary keys and foreign keys, with
//! integrity checks, cascading filters and join plans.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        DmModel                          │
//! │   (tables, keys, filters, zoom, colors; immutable)      │
//! └─────────────────────────────────────────────────────────┘
//!        │                    │                    │
//!        ▼ [keys]             ▼ [filter]           ▼ [flatten]
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  KeyChecker  │   │ FilterPropagator │   │  FlattenPlanner  │
//! │ unique/subset│   │ semi-join to a   │   │ neighbours or    │
//! │ cardinality  │   │ fixed point      │   │ squash plans     │
//! └──────────────┘   └──────────────────┘   └──────────────────┘
//!        │                    │                    │
//!        │           ┌──────────────────┐          │
//!        │           │ ConstraintGraph  │◄─────────┤
//!        │           │ tables + FKs     │          │
//!        │           └──────────────────┘          │
//!        ▼                                         ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                     TableProvider                       │
//! │          (in-memory frames, SQLite subqueries)          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The model only holds metadata. Rows live with a [`provider::TableProvider`],
//! which every data-dependent operation takes as an argument.

pub mod config;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod graph;
pub mod keys;
pub mod model;
pub mod provider;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::error::{DmError, DmResult, GraphError, KeyError, ReferenceError, StateError};
    pub use crate::flatten::{FlattenPlan, JoinStep};
    pub use crate::graph::{ConstraintGraph, ForeignKey};
    pub use crate::keys::{Cardinality, CardinalityBound, ColumnSelector};
    pub use crate::model::{DmModel, TableDef, VisualizationSink};
    pub use crate::provider::{
        Frame, InMemoryProvider, JoinColumns, JoinKind, Predicate, SqliteProvider, TableProvider,
        Value,
    };
}

pub use error::{DmError, DmResult};
pub use model::DmModel;
