//! Error types for the validation engine.

use thiserror::Error;

/// Errors raised while declaring validation rules.
///
/// Both variants indicate a programming error in the declaration, not a
/// runtime data condition, and are raised synchronously at declaration
/// time. Rule predicates themselves are never wrapped: a panicking
/// predicate unwinds to whoever triggered the field mutation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A value passed where a reactive field was required is not one.
    #[error("not a reactive field: {0}")]
    InvalidField(String),

    /// A named rule has no registered predicate.
    #[error("no validation rule named '{0}' is registered")]
    UnknownRule(String),
}
