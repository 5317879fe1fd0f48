//! Embedded query directives: a data-only TABLE/LIST language with
//! FROM, WHERE (AND only), SORT and LIMIT clauses, evaluated against a
//! corpus snapshot.

mod eval;
mod models;
mod parse;

pub use eval::{QueryEngine, QueryResult, QueryRow};
pub use models::{OutputMode, Predicate, QueryDirective, SortDirection, SortOrder};
