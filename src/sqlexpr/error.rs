//! Expression validation errors
//!
//! Every failure raised while classifying or rendering an expression is an
//! [`ExpressionError`]. Callers building a query treat any of them as fatal for
//! that query; the variant only refines the message.

use super::kind::{ExpressionKind, KindFilter};
use itertools::Itertools;
use thiserror::Error;

/// Result alias used throughout the expression module
pub type Result<T, E = ExpressionError> = std::result::Result<T, E>;

/// Reasons an expression can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// The text before `(` is not already upper-case
    #[error("sql function must be uppercase: {name}")]
    NonUppercaseFunctionName { name: String },

    /// No concrete expression type exists for the classified text
    #[error("unable to parse sql expression: {text}")]
    UnresolvableExpression { text: String },

    /// The expression kind is on the deny-list
    #[error("illegal sql expression: {kind} is not permitted here")]
    ForbiddenKind { kind: ExpressionKind },

    /// The allow-list is non-empty and the kind is not on it
    #[error("illegal sql expression: {kind} is not one of [{}]", .allowed.iter().join(", "))]
    DisallowedKind {
        kind: ExpressionKind,
        allowed: Vec<KindFilter>,
    },

    /// Rendering referenced a field missing from the field map
    #[error("invalid field '{field}'")]
    UnknownField { field: String },

    /// A function was registered under a name that could never be classified
    #[error("invalid function name '{name}': must be non-empty and uppercase")]
    InvalidFunctionName { name: String },
}
