//! Compilation of a [`PageRequest`](crate::PageRequest) into a backend-agnostic plan.
//!
//! The translator looks every field up in the entity's
//! [`EntitySchema`](crate::EntitySchema), coerces raw filter values to the
//! declared type, composes the clauses (AND, with optional OR-of-AND groups)
//! and appends the identity field as a final sort key so that offset
//! pagination sees a stable, total order.

pub mod predicate;
pub mod translator;

pub use predicate::{Comparison, CompiledQuery, Predicate, SortKey, TypedValue};
pub use translator::{QueryTranslator, coerce};
