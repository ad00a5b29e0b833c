//! Numeric literal recognition
//!
//! A numeric literal is an optionally signed decimal with an optional exponent,
//! surrounded by optional whitespace:
//!
//! ```text
//! number   := ws* sign? mantissa exponent? ws*
//! mantissa := digits ("." digits?)? | "." digits
//! exponent := ("e" | "E") sign? digits
//! ```

use nom::{
    branch::alt,
    character::complete::{char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, opt, recognize},
    sequence::{delimited, pair, tuple},
    IResult,
};

fn sign(input: &str) -> IResult<&str, Option<char>> {
    opt(one_of("+-"))(input)
}

fn mantissa(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    ))(input)
}

fn exponent(input: &str) -> IResult<&str, &str> {
    recognize(tuple((one_of("eE"), sign, digit1)))(input)
}

fn numeric(input: &str) -> IResult<&str, &str> {
    delimited(
        multispace0,
        recognize(tuple((sign, mantissa, opt(exponent)))),
        multispace0,
    )(input)
}

/// Returns true when the whole of `text` is a numeric literal
pub fn is_numeric(text: &str) -> bool {
    all_consuming(numeric)(text).is_ok()
}
