//! SQL Expression Classifier
//!
//! Turns the text of one select item into an [`Expression`]. The text is
//! matched against a fixed set of shapes, first match wins:
//!
//! 1. `NAME(argument)`: a function; `NAME` must be upper-case and registered,
//!    `argument` is classified recursively
//! 2. `'text'` or `"text"`: a string literal, kept verbatim
//! 3. `NULL`
//! 4. `*`
//! 5. a numeric literal
//! 6. anything else is taken to be a field name
//!
//! When alias parsing is requested, everything after the last ` AS ` is the
//! alias. Once classified, the result is checked against the caller's deny-list
//! and then its allow-list.
//!
//! # Example
//! ```
//! use sqlexpr_rust::{parse, ExpressionKind, KindFilter, ParseOptions};
//!
//! let options = ParseOptions::default().must_be([KindFilter::Function]);
//! let expr = parse("COUNT(*)", &options)?;
//! assert_eq!(expr.kind(), ExpressionKind::Function("COUNT".to_string()));
//! # Ok::<(), sqlexpr_rust::ExpressionError>(())
//! ```

use super::error::{ExpressionError, Result};
use super::expression::{Expression, Node, SqlField, SqlFunction, SqlNumber, SqlString};
use super::kind::KindFilter;
use super::munge::munge;
use super::number::is_numeric;
use super::registry::FunctionRegistry;
use tracing::debug;

/// Separates an expression from its alias
pub const ALIAS_SEPARATOR: &str = " AS ";

const QUOTES: [char; 2] = ['"', '\''];

/// Deepest function nesting accepted, e.g. `MAX(SUM(x))` nests two levels
pub const MAX_NESTING: usize = 32;

/// Per-call parsing hints
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Split off a trailing ` AS alias`
    pub parse_alias: bool,
    /// When non-empty, the result must match one of these
    pub must_be: Vec<KindFilter>,
    /// The result must match none of these; checked before `must_be`
    pub must_not_be: Vec<KindFilter>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            parse_alias: false,
            must_be: Vec::new(),
            must_not_be: vec![KindFilter::Wildcard],
        }
    }
}

impl ParseOptions {
    /// No alias parsing and no kind restrictions at all, as used for function arguments
    pub fn unrestricted() -> Self {
        Self {
            parse_alias: false,
            must_be: Vec::new(),
            must_not_be: Vec::new(),
        }
    }

    pub fn with_alias(mut self) -> Self {
        self.parse_alias = true;
        self
    }

    pub fn must_be(mut self, kinds: impl IntoIterator<Item = KindFilter>) -> Self {
        self.must_be = kinds.into_iter().collect();
        self
    }

    pub fn must_not_be(mut self, kinds: impl IntoIterator<Item = KindFilter>) -> Self {
        self.must_not_be = kinds.into_iter().collect();
        self
    }

    /// Clears the deny-list, permitting `*`
    pub fn allow_any(mut self) -> Self {
        self.must_not_be.clear();
        self
    }
}

/// Classifies expression text against a function registry
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'r> {
    registry: &'r FunctionRegistry,
}

impl Default for Classifier<'static> {
    fn default() -> Self {
        Self::new(FunctionRegistry::global())
    }
}

impl<'r> Classifier<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r FunctionRegistry {
        self.registry
    }

    /// Parses `text` into an expression and validates its kind
    ///
    /// # Errors
    ///
    /// Returns an [`ExpressionError`] if:
    /// - a function name is not upper-case
    /// - a function name is not registered, the text is blank, or functions
    ///   nest deeper than [`MAX_NESTING`]
    /// - the kind is on `must_not_be`
    /// - `must_be` is non-empty and the kind is not on it
    pub fn parse(&self, text: &str, options: &ParseOptions) -> Result<Expression> {
        self.parse_nested(text, options, 0)
    }

    fn parse_nested(&self, text: &str, options: &ParseOptions, depth: usize) -> Result<Expression> {
        let (body, alias) = if options.parse_alias {
            split_alias(text)
        } else {
            (text, None)
        };

        let node = self.classify(body, text, depth)?;
        let expression = Expression::new(node, alias);
        let kind = expression.kind();
        debug!("Classified {:?} as {}", text, kind);

        if options.must_not_be.iter().any(|filter| filter.matches(&kind)) {
            return Err(ExpressionError::ForbiddenKind { kind });
        }

        if !options.must_be.is_empty()
            && !options.must_be.iter().any(|filter| filter.matches(&kind))
        {
            return Err(ExpressionError::DisallowedKind {
                kind,
                allowed: options.must_be.clone(),
            });
        }

        Ok(expression)
    }

    /// Picks the node shape for `body`; `source` is the full input for messages
    fn classify(&self, body: &str, source: &str, depth: usize) -> Result<Node> {
        if body.trim().is_empty() {
            return Err(ExpressionError::UnresolvableExpression {
                text: source.to_string(),
            });
        }

        // The opening parenthesis must have a name in front of it
        if let Some(open) = body.find('(').filter(|&open| open > 0) {
            if body.ends_with(')') {
                return self.classify_function(body, open, source, depth);
            }
        }

        if is_quoted(body) {
            return Ok(Node::String(SqlString::new(body.to_string())));
        }

        let node = match body {
            "NULL" => Node::Null,
            "*" => Node::Wildcard,
            _ if is_numeric(body) => Node::Number(SqlNumber::new(body.to_string())),
            _ => Node::Field(SqlField::new(body.to_string())),
        };
        Ok(node)
    }

    fn classify_function(
        &self,
        body: &str,
        open: usize,
        source: &str,
        depth: usize,
    ) -> Result<Node> {
        let name = &body[..open];
        if name != name.to_ascii_uppercase() {
            return Err(ExpressionError::NonUppercaseFunctionName {
                name: name.to_string(),
            });
        }

        let def = self
            .registry
            .get(name)
            .ok_or_else(|| ExpressionError::UnresolvableExpression {
                text: source.to_string(),
            })?;

        if depth >= MAX_NESTING {
            return Err(ExpressionError::UnresolvableExpression {
                text: source.to_string(),
            });
        }

        let arg_text = &body[open + 1..body.len() - 1];
        debug!("Function {} with argument {:?}", name, arg_text);

        let trimmed = arg_text.trim();
        let argument = if trimmed.is_empty() {
            None
        } else {
            Some(self.parse_nested(trimmed, &ParseOptions::unrestricted(), depth + 1)?)
        };

        Ok(Node::Function(SqlFunction::new(
            def.clone(),
            arg_text.to_string(),
            argument,
        )))
    }
}

/// Parses `text` with the process-wide builtin registry
pub fn parse(text: &str, options: &ParseOptions) -> Result<Expression> {
    Classifier::default().parse(text, options)
}

/// Splits at the last ` AS `, munging the alias
///
/// A separator at the very start does not count, and an alias that munges to
/// nothing is dropped.
fn split_alias(text: &str) -> (&str, Option<String>) {
    match text.rfind(ALIAS_SEPARATOR).filter(|&pos| pos > 0) {
        Some(pos) => (
            &text[..pos],
            munge(&text[pos + ALIAS_SEPARATOR.len()..]),
        ),
        None => (text, None),
    }
}

fn is_quoted(body: &str) -> bool {
    let mut chars = body.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => first == last && QUOTES.contains(&first),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlexpr::expression::FieldMap;
    use crate::sqlexpr::kind::ExpressionKind;
    use crate::sqlexpr::registry::FunctionDef;

    fn field_map(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_function_with_alias() -> Result<()> {
        let expr = parse("SUM(amount) AS total", &ParseOptions::default().with_alias())?;

        assert_eq!(expr.kind(), ExpressionKind::Function("SUM".to_string()));
        assert_eq!(expr.fields(), vec!["amount"]);
        assert_eq!(expr.alias(), "total");
        assert_eq!(
            expr.render(&field_map(&[("amount", "a.total_amount")]))?,
            "SUM(a.total_amount)"
        );
        Ok(())
    }

    #[test]
    fn test_lowercase_function_name_is_rejected() {
        for text in ["sum(amount)", "Sum(amount)", "count(*)"] {
            let err = parse(text, &ParseOptions::default());
            assert!(
                matches!(err, Err(ExpressionError::NonUppercaseFunctionName { .. })),
                "{} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_unregistered_function_is_unresolvable() {
        let err = parse("FOO(bar) AS baz", &ParseOptions::default().with_alias());
        assert_eq!(
            err,
            Err(ExpressionError::UnresolvableExpression {
                text: "FOO(bar) AS baz".to_string()
            })
        );
        assert_eq!(
            err.map_err(|e| e.to_string()),
            Err("unable to parse sql expression: FOO(bar) AS baz".to_string())
        );
    }

    #[test]
    fn test_string_literals_keep_quotes() -> Result<()> {
        for text in ["'x'", "\"hello world\"", "''"] {
            let expr = parse(text, &ParseOptions::default())?;
            assert_eq!(expr.kind(), ExpressionKind::String);
            assert_eq!(expr.render(&FieldMap::new())?, text);
            assert!(expr.fields().is_empty());
        }
        Ok(())
    }

    #[test]
    fn test_mismatched_quotes_are_a_field() -> Result<()> {
        let expr = parse("'x\"", &ParseOptions::default())?;
        assert_eq!(expr.kind(), ExpressionKind::Field);

        let lone = parse("'", &ParseOptions::default())?;
        assert_eq!(lone.kind(), ExpressionKind::Field);
        Ok(())
    }

    #[test]
    fn test_string_is_not_parsed_for_fields() -> Result<()> {
        let expr = parse("'SUM(amount)'", &ParseOptions::default())?;
        assert_eq!(expr.kind(), ExpressionKind::String);
        assert!(expr.fields().is_empty());
        Ok(())
    }

    #[test]
    fn test_null_and_wildcard() -> Result<()> {
        let null = parse("NULL", &ParseOptions::default())?;
        assert_eq!(null.kind(), ExpressionKind::Null);
        assert_eq!(null.render(&FieldMap::new())?, "NULL");

        // Only the exact upper-case keyword is NULL
        assert_eq!(
            parse("null", &ParseOptions::default())?.kind(),
            ExpressionKind::Field
        );

        let wild = parse("*", &ParseOptions::default().allow_any())?;
        assert_eq!(wild.kind(), ExpressionKind::Wildcard);
        assert_eq!(wild.render(&FieldMap::new())?, "*");
        Ok(())
    }

    #[test]
    fn test_wildcard_forbidden_by_default() {
        assert_eq!(
            parse("*", &ParseOptions::default()),
            Err(ExpressionError::ForbiddenKind {
                kind: ExpressionKind::Wildcard
            })
        );
    }

    #[test]
    fn test_deny_list_wins_over_allow_list() {
        let options = ParseOptions::default()
            .must_be([KindFilter::Wildcard])
            .must_not_be([KindFilter::Wildcard]);

        assert!(matches!(
            parse("*", &options),
            Err(ExpressionError::ForbiddenKind { .. })
        ));
    }

    #[test]
    fn test_numbers() -> Result<()> {
        for text in ["42", "-3.5", "1e3"] {
            let expr = parse(text, &ParseOptions::default())?;
            assert_eq!(expr.kind(), ExpressionKind::Number);
            assert_eq!(expr.render(&FieldMap::new())?, text);
        }
        Ok(())
    }

    #[test]
    fn test_field_fallback() -> Result<()> {
        let expr = parse("contact_id", &ParseOptions::default())?;

        assert_eq!(expr.kind(), ExpressionKind::Field);
        assert_eq!(expr.fields(), vec!["contact_id"]);
        assert_eq!(expr.alias(), "contact_id");
        assert_eq!(expr.render(&field_map(&[("contact_id", "c.id")]))?, "c.id");
        Ok(())
    }

    #[test]
    fn test_unmatched_shapes_fall_back_to_field() -> Result<()> {
        // A leading parenthesis has no function name
        let expr = parse("(amount)", &ParseOptions::default())?;
        assert_eq!(expr.kind(), ExpressionKind::Field);
        assert_eq!(expr.fields(), vec!["(amount)"]);

        let expr = parse("SUM(amount", &ParseOptions::default())?;
        assert_eq!(expr.kind(), ExpressionKind::Field);
        Ok(())
    }

    #[test]
    fn test_alias_resolution() -> Result<()> {
        assert_eq!(parse("amount", &ParseOptions::default())?.alias(), "amount");
        assert_eq!(parse("'x'", &ParseOptions::default())?.alias(), "_x_");
        assert_eq!(parse("42", &ParseOptions::default())?.alias(), "42");
        assert_eq!(parse("NULL", &ParseOptions::default())?.alias(), "NULL");
        assert_eq!(parse("COUNT(*)", &ParseOptions::default())?.alias(), "count");
        Ok(())
    }

    #[test]
    fn test_alias_is_munged_and_rightmost() -> Result<()> {
        let options = ParseOptions::default().with_alias();

        let expr = parse("amount AS total amount", &options)?;
        assert_eq!(expr.explicit_alias(), Some("total_amount"));

        let expr = parse("'a AS b' AS c", &options)?;
        assert_eq!(expr.kind(), ExpressionKind::String);
        assert_eq!(expr.alias(), "c");

        let expr = parse("amount AS *", &options)?;
        assert_eq!(expr.explicit_alias(), None);
        assert_eq!(expr.alias(), "amount");
        Ok(())
    }

    #[test]
    fn test_alias_ignored_unless_requested() -> Result<()> {
        let expr = parse("amount AS total", &ParseOptions::default())?;
        assert_eq!(expr.kind(), ExpressionKind::Field);
        assert_eq!(expr.fields(), vec!["amount AS total"]);
        assert_eq!(expr.explicit_alias(), None);
        Ok(())
    }

    #[test]
    fn test_allow_list() -> Result<()> {
        let options = ParseOptions::default().must_be([KindFilter::Function, KindFilter::Field]);

        assert!(parse("amount", &options).is_ok());
        assert!(parse("MAX(amount)", &options).is_ok());
        assert_eq!(
            parse("42", &options),
            Err(ExpressionError::DisallowedKind {
                kind: ExpressionKind::Number,
                allowed: vec![KindFilter::Function, KindFilter::Field],
            })
        );

        let only_sum = ParseOptions::default().must_be([KindFilter::FunctionNamed("SUM".into())]);
        assert!(parse("SUM(amount)", &only_sum).is_ok());
        assert!(matches!(
            parse("MAX(amount)", &only_sum),
            Err(ExpressionError::DisallowedKind { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_function_argument_may_be_wildcard() -> Result<()> {
        let expr = parse("COUNT(*)", &ParseOptions::default())?;
        assert!(expr.fields().is_empty());
        assert_eq!(expr.render(&FieldMap::new())?, "COUNT(*)");
        Ok(())
    }

    #[test]
    fn test_nested_functions() -> Result<()> {
        let expr = parse("MAX( SUM(amount) )", &ParseOptions::default())?;

        assert_eq!(expr.raw_argument(), " SUM(amount) ");
        assert_eq!(expr.to_string(), "MAX(SUM(amount))");
        assert_eq!(expr.fields(), vec!["amount"]);
        assert_eq!(
            expr.render(&field_map(&[("amount", "t.amt")]))?,
            "MAX(SUM(t.amt))"
        );
        Ok(())
    }

    #[test]
    fn test_nested_argument_errors_propagate() {
        assert!(matches!(
            parse("SUM(max(amount))", &ParseOptions::default()),
            Err(ExpressionError::NonUppercaseFunctionName { .. })
        ));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let text = format!("{}x{}", "SUM(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(
            parse(&text, &ParseOptions::default()),
            Err(ExpressionError::UnresolvableExpression { .. })
        ));
    }

    #[test]
    fn test_nesting_up_to_limit_is_accepted() -> Result<()> {
        let text = format!(
            "{}x{}",
            "MAX(".repeat(MAX_NESTING),
            ")".repeat(MAX_NESTING)
        );
        let expr = parse(&text, &ParseOptions::default())?;
        assert_eq!(expr.fields(), vec!["x"]);

        let deeper = format!("MAX({})", text);
        assert!(parse(&deeper, &ParseOptions::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_function_name_case_is_ascii_only() {
        assert_eq!(
            parse("ß(x)", &ParseOptions::default()),
            Err(ExpressionError::UnresolvableExpression {
                text: "ß(x)".to_string()
            })
        );
    }

    #[test]
    fn test_blank_text_is_unresolvable() {
        for text in ["", "   "] {
            assert!(matches!(
                parse(text, &ParseOptions::default()),
                Err(ExpressionError::UnresolvableExpression { .. })
            ));
        }
    }

    #[test]
    fn test_custom_registry() -> Result<()> {
        let mut registry = FunctionRegistry::new();
        registry.register(FunctionDef::scalar("NOW"))?;
        let classifier = Classifier::new(&registry);

        let expr = classifier.parse("NOW()", &ParseOptions::default())?;
        assert_eq!(expr.render(&FieldMap::new())?, "NOW()");
        assert!(!expr.is_aggregate());

        assert!(matches!(
            classifier.parse("SUM(amount)", &ParseOptions::default()),
            Err(ExpressionError::UnresolvableExpression { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_rendered_literals_reparse_to_same_kind() -> Result<()> {
        let options = ParseOptions::default().allow_any();
        for text in ["'x'", "\"y\"", "7.25", "NULL", "*"] {
            let expr = parse(text, &options)?;
            let reparsed = parse(&expr.render(&FieldMap::new())?, &options)?;
            assert_eq!(reparsed.kind(), expr.kind());
        }
        Ok(())
    }

    #[test]
    fn test_parse_is_thread_safe() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    parse(&format!("SUM(field_{})", i), &ParseOptions::default())
                        .map(|expr| expr.alias())
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let alias = handle.join().expect("worker panicked");
            assert_eq!(alias, Ok(format!("field_{}", i)));
        }
    }
}
