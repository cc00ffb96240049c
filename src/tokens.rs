use std::collections::VecDeque;
use std::path::Path;

use thiserror::Error;

use crate::grammar::{Grammar, END_OF_INPUT};
use crate::types::{Token, Value, Var};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Unknown token {0}")]
    UnknownSymbol(Var),

    #[error("Failed to read tokens: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplies tokens to the engine: every token in order, then a single
/// end-of-input token, then `None` for any further request.
pub trait TokenSource {
    fn next_token(&mut self) -> Option<Token>;
}

#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: VecDeque<Token>,
    finished: bool,
}

impl TokenStream {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        TokenStream {
            tokens: tokens.into_iter().collect(),
            finished: false,
        }
    }

    /// Stream of bare token names, handy for grammars without values.
    pub fn from_names(names: &str) -> Self {
        Self::new(names.split_whitespace().map(Token::new))
    }
}

impl TokenSource for TokenStream {
    fn next_token(&mut self) -> Option<Token> {
        if let Some(token) = self.tokens.pop_front() {
            return Some(token);
        }

        if self.finished {
            None
        } else {
            self.finished = true;
            Some(Token::new(END_OF_INPUT))
        }
    }
}

/// Reads the token file format: whitespace separated token names, each
/// optionally followed by a value that is not itself a vocabulary symbol.
pub fn parse(text: &str, grammar: &Grammar) -> Result<Vec<Token>, TokenError> {
    let mut words = text.split_whitespace().peekable();
    let mut tokens = Vec::new();

    while let Some(name) = words.next() {
        if !grammar.is_vocabulary(name) {
            return Err(TokenError::UnknownSymbol(name.to_string()));
        }

        let value = match words.peek() {
            Some(next) if !grammar.is_vocabulary(next) => {
                let value = Value::parse(next);
                words.next();
                Some(value)
            }
            _ => None,
        };

        tokens.push(Token {
            name: name.to_string(),
            value,
        });
    }

    Ok(tokens)
}

pub fn load(path: impl AsRef<Path>, grammar: &Grammar) -> Result<Vec<Token>, TokenError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text, grammar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_ends_with_end_of_input_then_nothing() {
        let mut stream = TokenStream::from_names("$id");

        assert_eq!(stream.next_token(), Some(Token::new("$id")));
        assert_eq!(stream.next_token(), Some(Token::new("#")));
        assert_eq!(stream.next_token(), None);
        assert_eq!(stream.next_token(), None);
    }

    #[test]
    fn values_follow_their_names() {
        let g = Grammar::plh().unwrap();
        let tokens = parse("$id\nx\n=\n\n$int\n5\n;\n$put $id total ;", &g).unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::with_value("$id", Value::Text("x".into())),
                Token::new("="),
                Token::with_value("$int", Value::Int(5)),
                Token::new(";"),
                Token::new("$put"),
                Token::with_value("$id", Value::Text("total".into())),
                Token::new(";"),
            ]
        );
    }

    #[test]
    fn unknown_names_are_rejected() {
        let g = Grammar::expressions().unwrap();
        assert!(matches!(
            parse("- $id", &g),
            Err(TokenError::UnknownSymbol(name)) if name == "-"
        ));
    }
}
