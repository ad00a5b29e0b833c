//! SQL select-expression classification
//!
//! Validates and re-renders the individual expressions of an entity query's
//! SELECT list: function calls, quoted strings, `NULL`, `*`, numbers and bare
//! field names. Nothing here executes SQL or parses full statements.

pub mod classifier;
pub mod error;
pub mod expression;
pub mod kind;
pub mod munge;
pub mod number;
pub mod registry;

pub use classifier::{parse, Classifier, ParseOptions, ALIAS_SEPARATOR};
pub use error::{ExpressionError, Result};
pub use expression::{Expression, FieldMap, Node};
pub use kind::{ExpressionKind, KindFilter};
pub use registry::{FunctionCategory, FunctionDef, FunctionRegistry};
