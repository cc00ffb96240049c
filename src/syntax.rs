use std::fmt::Debug;

use nom::bytes::complete::take_while1;
use nom::error::{ErrorKind, ParseError as _};
use thiserror::Error;

pub type Input<'a> = &'a str;
pub type ParseError<'a> = nom::error::VerboseError<Input<'a>>;
pub type Parsed<'a, O> = nom::IResult<Input<'a>, O, ParseError<'a>>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Failed(String),

    #[error("Incomplete parse of {what}:\nParsed: {parsed}\nRest: {rest}")]
    Incomplete {
        what: &'static str,
        parsed: String,
        rest: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn spaces(input: Input) -> Parsed<Input> {
    nom::character::complete::multispace0(input)
}

// see https://github.com/rust-lang/rust-clippy/issues/2944
#[allow(clippy::needless_lifetimes)]
pub fn key<'a>(key: &'a str) -> impl Fn(Input<'a>) -> Parsed<Input> {
    nom::sequence::preceded(spaces, nom::bytes::complete::tag(key))
}

/// Next whitespace-delimited word.
pub fn word(input: Input) -> Parsed<Input> {
    nom::sequence::preceded(spaces, take_while1(|c: char| !c.is_whitespace()))(input)
}

pub fn fail<O>(input: Input, kind: ErrorKind) -> Parsed<O> {
    Err(nom::Err::Error(ParseError::from_error_kind(input, kind)))
}

fn err(e: nom::Err<ParseError>, what: &str, input: &str) -> Error {
    let error = match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => format!(
            "Failed to parse {}:\n{}",
            what,
            nom::error::convert_error(input, e)
        ),
        nom::Err::Incomplete(needed) => format!("Incomplete parse of {}: {:?}", what, needed),
    };

    Error::Failed(error)
}

fn incomplete<T: Debug>(value: T, what: &'static str, rest: Input) -> Error {
    Error::Incomplete {
        what,
        parsed: format!("{:?}", value),
        rest: rest.to_string(),
    }
}

/// Runs `parser` over the whole of `input`; trailing whitespace is allowed,
/// anything else left over is an error.
pub fn parse<'a, P, T: Debug>(what: &'static str, parser: P, input: Input<'a>) -> Result<T>
where
    P: Fn(Input<'a>) -> Parsed<'a, T>,
{
    let (rest, v) = parser(input).map_err(|e| err(e, what, input))?;

    if !rest.trim().is_empty() {
        return Err(incomplete(v, what, rest));
    }

    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_skip_leading_space() {
        let (rest, w) = word("  lit 5").unwrap();
        assert_eq!(w, "lit");
        assert_eq!(rest, " 5");
    }

    #[test]
    fn trailing_input_is_reported() {
        match parse("word", word, "one two") {
            Err(Error::Incomplete { rest, .. }) => assert_eq!(rest, " two"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
