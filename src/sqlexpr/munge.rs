//! Identifier munging
//!
//! Turns arbitrary text into something usable as a column alias: runs of
//! anything outside `[A-Za-z0-9]` collapse to a single underscore and the result
//! is capped at [`MAX_IDENTIFIER_LEN`] characters, the MySQL identifier limit.

use regex::Regex;
use std::sync::OnceLock;

/// Longest identifier MySQL accepts
pub const MAX_IDENTIFIER_LEN: usize = 63;

const REPLACEMENT: &str = "_";

fn non_identifier_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[^a-zA-Z0-9]+").expect("static pattern is valid"))
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B')
}

/// Munges `text` into an identifier, or `None` when no identifier characters remain
pub fn munge(text: &str) -> Option<String> {
    let trimmed = text.trim_matches(is_blank);
    let replaced = non_identifier_runs().replace_all(trimmed, REPLACEMENT);

    if replaced.is_empty() || replaced == REPLACEMENT {
        return None;
    }

    // Only ASCII survives the replacement, so byte truncation is safe
    let mut name = replaced.into_owned();
    name.truncate(MAX_IDENTIFIER_LEN);
    Some(name)
}
