//! Function registry
//!
//! Maps an upper-case function name to its definition. The classifier looks a
//! name up here after recognising `NAME(...)`; a name with no entry cannot be
//! parsed. New functions are added by registering a [`FunctionDef`] before any
//! parsing starts. The registry is never mutated while it is shared, so
//! concurrent lookups need no locking.

use super::error::{ExpressionError, Result};
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::sync::OnceLock;
use tracing::debug;

/// How a function combines its input rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCategory {
    /// Collapses a group of rows into one value (requires GROUP BY handling)
    Aggregate,
    /// Computes one value per row
    Scalar,
}

impl Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionCategory::Aggregate => write!(f, "aggregate"),
            FunctionCategory::Scalar => write!(f, "scalar"),
        }
    }
}

/// A function the classifier may produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    name: String,
    category: FunctionCategory,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, category: FunctionCategory) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }

    pub fn aggregate(name: impl Into<String>) -> Self {
        Self::new(name, FunctionCategory::Aggregate)
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, FunctionCategory::Scalar)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> FunctionCategory {
        self.category
    }
}

/// Functions shipped with every registry built by [`FunctionRegistry::builtin`]
const BUILTIN_AGGREGATES: &[&str] = &["AVG", "COUNT", "GROUP_CONCAT", "MAX", "MIN", "SUM"];

/// Upper-case name → function definition lookup table
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the builtin aggregate functions
    pub fn builtin() -> Self {
        let functions = BUILTIN_AGGREGATES
            .iter()
            .map(|&name| (name.to_string(), FunctionDef::aggregate(name)))
            .collect();
        Self { functions }
    }

    /// The shared builtin registry, built on first use
    pub fn global() -> &'static FunctionRegistry {
        static GLOBAL: OnceLock<FunctionRegistry> = OnceLock::new();
        GLOBAL.get_or_init(FunctionRegistry::builtin)
    }

    /// Adds or replaces a function definition
    ///
    /// Names must already be upper-case: the classifier rejects any other
    /// spelling, so such an entry could never be reached.
    pub fn register(&mut self, def: FunctionDef) -> Result<()> {
        let name = def.name();
        if name.is_empty() || name != name.to_ascii_uppercase() || name.contains(['(', ')']) {
            return Err(ExpressionError::InvalidFunctionName {
                name: name.to_string(),
            });
        }

        debug!("Registering {} function {}", def.category(), name);
        self.functions.insert(name.to_string(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Iterates definitions in name order
    pub fn iter(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
