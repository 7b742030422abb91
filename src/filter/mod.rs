//! Row filtering for health snapshots.
//!
//! # Responsibilities
//! - Parse `field op value` predicates (config `[[filters]]`, CLI `--filter`)
//! - Evaluate AND-combined predicates over `HealthRow` copies
//! - Order rows by a typed field for display
//!
//! # Design Decisions
//! - Comparisons use typed metric values, never display strings
//! - Evaluation never fails: a row that cannot be compared is excluded
//! - Errors exist only at parse time
//! - Empty predicate set = every row matches

pub mod engine;
pub mod predicate;
pub mod sort;

pub use engine::{evaluate, matches};
pub use predicate::{FilterOperator, FilterPredicate};
pub use sort::sort;

use thiserror::Error;

/// Ordered list of predicates, AND semantics.
pub type FilterSet = Vec<FilterPredicate>;

/// Errors raised when parsing a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Malformed filter '{0}', expected 'field op value'")]
    Malformed(String),

    #[error("Unknown filter operator '{0}'")]
    UnknownOperator(String),
}

/// Parse a list of textual predicates, failing on the first bad one.
pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> Result<FilterSet, FilterError> {
    inputs.iter().map(|s| FilterPredicate::parse(s.as_ref())).collect()
}
