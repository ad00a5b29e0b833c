//! Expression kinds and kind filters
//!
//! Every classified expression has exactly one [`ExpressionKind`]. Callers
//! restrict what a parse may produce with lists of [`KindFilter`]s, where the
//! generic `Function` filter matches any function kind.

use std::fmt::{self, Display};
use std::str::FromStr;

/// The classified form of an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    /// A registered function call such as SUM(amount)
    Function(String),
    /// A quoted literal, quotes included
    String,
    /// The NULL keyword
    Null,
    /// The wildcard selector *
    Wildcard,
    /// A numeric literal
    Number,
    /// A bare field reference
    Field,
}

impl ExpressionKind {
    pub fn is_function(&self) -> bool {
        matches!(self, ExpressionKind::Function(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            ExpressionKind::String
                | ExpressionKind::Null
                | ExpressionKind::Wildcard
                | ExpressionKind::Number
        )
    }
}

impl Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionKind::Function(name) => write!(f, "Function({})", name),
            ExpressionKind::String => write!(f, "String"),
            ExpressionKind::Null => write!(f, "Null"),
            ExpressionKind::Wildcard => write!(f, "Wildcard"),
            ExpressionKind::Number => write!(f, "Number"),
            ExpressionKind::Field => write!(f, "Field"),
        }
    }
}

/// One entry of an allow-list or deny-list
///
/// `Function` is the generic superkind: every function kind "is a" `Function`,
/// while `FunctionNamed` only matches one registered name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KindFilter {
    Function,
    FunctionNamed(String),
    String,
    Null,
    Wildcard,
    Number,
    Field,
}

impl KindFilter {
    /// Returns true when `kind` is, or is a specialisation of, this filter
    pub fn matches(&self, kind: &ExpressionKind) -> bool {
        match (self, kind) {
            (KindFilter::Function, ExpressionKind::Function(_)) => true,
            (KindFilter::FunctionNamed(want), ExpressionKind::Function(name)) => want == name,
            (KindFilter::String, ExpressionKind::String) => true,
            (KindFilter::Null, ExpressionKind::Null) => true,
            (KindFilter::Wildcard, ExpressionKind::Wildcard) => true,
            (KindFilter::Number, ExpressionKind::Number) => true,
            (KindFilter::Field, ExpressionKind::Field) => true,
            _ => false,
        }
    }
}

impl FromStr for KindFilter {
    type Err = String;

    /// Accepts tag names (`Wildcard`, `Function(SUM)`) as well as the class-style
    /// names older query definitions use (`SqlWild`, `SqlFunctionSUM`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "Function" | "SqlFunction" => return Ok(KindFilter::Function),
            "String" | "SqlString" => return Ok(KindFilter::String),
            "Null" | "SqlNull" => return Ok(KindFilter::Null),
            "Wildcard" | "SqlWild" | "*" => return Ok(KindFilter::Wildcard),
            "Number" | "SqlNumber" => return Ok(KindFilter::Number),
            "Field" | "SqlField" => return Ok(KindFilter::Field),
            _ => {}
        }

        let named = s
            .strip_prefix("Function(")
            .and_then(|rest| rest.strip_suffix(')'))
            .or_else(|| s.strip_prefix("SqlFunction"));

        match named {
            Some(name) if !name.is_empty() && name == name.to_ascii_uppercase() => {
                Ok(KindFilter::FunctionNamed(name.to_string()))
            }
            _ => Err(format!("Unknown expression kind: {}", s)),
        }
    }
}

impl Display for KindFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindFilter::Function => write!(f, "Function"),
            KindFilter::FunctionNamed(name) => write!(f, "Function({})", name),
            KindFilter::String => write!(f, "String"),
            KindFilter::Null => write!(f, "Null"),
            KindFilter::Wildcard => write!(f, "Wildcard"),
            KindFilter::Number => write!(f, "Number"),
            KindFilter::Field => write!(f, "Field"),
        }
    }
}
