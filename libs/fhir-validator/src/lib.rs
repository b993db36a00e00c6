//! Schema-driven validation
//!
//! Checks a decoded [`Instance`] against its schema tables and accumulates
//! every problem found: cardinality, choice-group exclusivity, required code
//! bindings, and the same checks recursively through nested components.
//! Validation never fails on invalid input; violations are data, returned as
//! a [`ValidationOutcome`].
//!
//! Out-of-set codes under extensible or preferred bindings never block; they
//! land on the outcome's advisory list instead.
//!
//! [`Instance`]: argentum_schema::Instance

pub mod issue;
pub mod validator;

pub use issue::{IssueCode, IssueSeverity, ValidationIssue, ValidationOutcome};
pub use validator::Validator;
