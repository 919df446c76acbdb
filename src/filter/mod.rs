//! Filter propagation.
//!
//! A filter on one table restricts every table connected to it: a flight
//! whose carrier was filtered away disappears, and so does a plane that no
//! remaining flight uses. Propagation semi-joins neighbours across foreign
//! keys until nothing shrinks any more.

mod propagate;

pub use propagate::FilterPropagator;
