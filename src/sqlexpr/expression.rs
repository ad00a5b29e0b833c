//! Parsed SQL expressions
//!
//! An [`Expression`] is built once by the classifier for one textual select
//! item and never changes afterwards. It answers two questions for the query
//! builder that owns it: which fields it reads ([`Expression::fields`]) and
//! what SQL it becomes once logical field names are mapped to physical columns
//! ([`Expression::render`]).
//!
//! # Example
//! ```
//! use sqlexpr_rust::{parse, FieldMap, ParseOptions};
//!
//! let expr = parse("SUM(amount) AS total", &ParseOptions::default().with_alias())?;
//! let fields = FieldMap::from([("amount".to_string(), "a.total_amount".to_string())]);
//!
//! assert_eq!(expr.render(&fields)?, "SUM(a.total_amount)");
//! assert_eq!(expr.alias(), "total");
//! # Ok::<(), sqlexpr_rust::ExpressionError>(())
//! ```

use super::error::{ExpressionError, Result};
use super::kind::ExpressionKind;
use super::munge::munge;
use super::registry::{FunctionCategory, FunctionDef};
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt::{self, Display};

/// Logical field name → physical column expression
pub type FieldMap = HashMap<String, String>;

/// A registered function applied to at most one argument
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFunction {
    def: FunctionDef,
    /// Argument text between the outer parentheses, before classification
    arg_text: String,
    argument: Option<Box<Expression>>,
}

impl SqlFunction {
    pub(crate) fn new(def: FunctionDef, arg_text: String, argument: Option<Expression>) -> Self {
        Self {
            def,
            arg_text,
            argument: argument.map(Box::new),
        }
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn category(&self) -> FunctionCategory {
        self.def.category()
    }

    pub fn argument(&self) -> Option<&Expression> {
        self.argument.as_deref()
    }

    fn render(&self, field_map: &FieldMap) -> Result<String> {
        let argument = match &self.argument {
            Some(argument) => argument.render(field_map)?,
            None => String::new(),
        };
        Ok(format!("{}({})", self.name(), argument))
    }
}

/// A quoted literal; the quotes are part of the stored text
#[derive(Debug, Clone, PartialEq)]
pub struct SqlString {
    text: String,
}

impl SqlString {
    pub(crate) fn new(text: String) -> Self {
        Self { text }
    }

    pub fn quote(&self) -> char {
        self.text.chars().next().unwrap_or('\'')
    }

    /// The literal without its surrounding quotes
    pub fn value(&self) -> &str {
        let quote_len = self.quote().len_utf8();
        self.text
            .get(quote_len..self.text.len().saturating_sub(quote_len))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlNumber {
    text: String,
}

impl SqlNumber {
    pub(crate) fn new(text: String) -> Self {
        Self { text }
    }

    pub fn value(&self) -> Option<f64> {
        self.text.trim().parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlField {
    name: String,
}

impl SqlField {
    pub(crate) fn new(name: String) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, field_map: &FieldMap) -> Result<String> {
        field_map
            .get(&self.name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownField {
                field: self.name.clone(),
            })
    }
}

/// The concrete shape of an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Function(SqlFunction),
    String(SqlString),
    Null,
    Wildcard,
    Number(SqlNumber),
    Field(SqlField),
}

/// One classified SQL expression plus its optional output alias
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    node: Node,
    alias: Option<String>,
}

impl Expression {
    pub(crate) fn new(node: Node, alias: Option<String>) -> Self {
        Self { node, alias }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn kind(&self) -> ExpressionKind {
        match &self.node {
            Node::Function(function) => ExpressionKind::Function(function.name().to_string()),
            Node::String(_) => ExpressionKind::String,
            Node::Null => ExpressionKind::Null,
            Node::Wildcard => ExpressionKind::Wildcard,
            Node::Number(_) => ExpressionKind::Number,
            Node::Field(_) => ExpressionKind::Field,
        }
    }

    /// The text this expression was built from, alias excluded
    ///
    /// For a function this is the argument text inside the parentheses.
    pub fn raw_argument(&self) -> &str {
        match &self.node {
            Node::Function(function) => &function.arg_text,
            Node::String(string) => &string.text,
            Node::Null => "NULL",
            Node::Wildcard => "*",
            Node::Number(number) => &number.text,
            Node::Field(field) => &field.name,
        }
    }

    /// Field names this expression reads, in first-seen order without repeats
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields.into_iter().unique().collect()
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.node {
            Node::Field(field) => out.push(field.name()),
            Node::Function(function) => {
                if let Some(argument) = function.argument() {
                    argument.collect_fields(out);
                }
            }
            _ => {}
        }
    }

    /// Renders SQL, replacing each field name with its column from `field_map`
    ///
    /// The alias is not appended; the caller decides how to emit `AS`.
    pub fn render(&self, field_map: &FieldMap) -> Result<String> {
        match &self.node {
            Node::Function(function) => function.render(field_map),
            Node::Field(field) => field.render(field_map),
            _ => Ok(self.raw_argument().to_string()),
        }
    }

    /// The alias given after ` AS `, if one was parsed
    pub fn explicit_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The output column name: the explicit alias, else the first field, else the
    /// munged argument text. Never empty.
    pub fn alias(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        if let Some(field) = self.fields().first() {
            return field.to_string();
        }
        munge(self.raw_argument()).unwrap_or_else(|| self.kind_label())
    }

    fn kind_label(&self) -> String {
        match &self.node {
            Node::Function(function) => function.name().to_lowercase(),
            Node::String(_) => "string".to_string(),
            Node::Null => "null".to_string(),
            Node::Wildcard => "wildcard".to_string(),
            Node::Number(_) => "number".to_string(),
            Node::Field(_) => "field".to_string(),
        }
    }

    /// True for an aggregate function or any expression wrapping one
    pub fn is_aggregate(&self) -> bool {
        match &self.node {
            Node::Function(function) => {
                function.category() == FunctionCategory::Aggregate
                    || function.argument().map_or(false, Expression::is_aggregate)
            }
            _ => false,
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::Function(function) => match function.argument() {
                Some(argument) => write!(f, "{}({})", function.name(), argument),
                None => write!(f, "{}()", function.name()),
            },
            _ => write!(f, "{}", self.raw_argument()),
        }
    }
}
