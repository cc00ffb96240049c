use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{anychar, multispace1};
use nom::combinator::map;
use nom::error::{ErrorKind, ParseError as _};
use nom::multi::many0;

use crate::syntax::{self, Input, ParseError, Parsed};
use crate::types::{Int, Token, Value};

fn is_reserved(word: &str) -> bool {
    match word {
        "declare" | "put" | "get" | "stop" | "goto" | "if" | "then" | "end" | "do" => true,
        _ => false,
    }
}

fn integer(input: Input) -> Parsed<Token> {
    let (rest, digits) = take_while1(|c: char| c.is_ascii_digit())(input)?;
    match digits.parse::<Int>() {
        Ok(n) => Ok((rest, Token::with_value("$int", Value::Int(n)))),
        Err(_) => Err(nom::Err::Failure(ParseError::add_context(
            input,
            "integer literal out of range",
            ParseError::from_error_kind(input, ErrorKind::Digit),
        ))),
    }
}

fn word(input: Input) -> Parsed<Token> {
    let (rest, word) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;
    if word.bytes().all(|b| b.is_ascii_digit()) {
        return integer(input);
    }

    let token = if is_reserved(word) {
        Token::new(format!("${}", word))
    } else {
        Token::with_value("$id", Value::Text(word.to_string()))
    };
    Ok((rest, token))
}

fn lexeme(input: Input) -> Parsed<Option<Token>> {
    alt((
        map(multispace1, |_| None),
        map(word, Some),
        map(anychar, |c| {
            if c.is_ascii_punctuation() {
                Some(Token::new(c.to_string()))
            } else {
                None
            }
        }),
    ))(input)
}

fn tokens(input: Input) -> Parsed<Vec<Token>> {
    map(many0(lexeme), |lexemes| lexemes.into_iter().flatten().collect())(input)
}

/// Splits PL/H source into the token names the translation scheme expects.
pub fn scan(source: &str) -> syntax::Result<Vec<Token>> {
    syntax::parse("source", tokens, source)
}
