// start_symbol = goal
// terminals = [ $id, +, \,, # ]
// nonterminals = [ goal, e ]
// action_symbols = [ @add ]          (translation schemes only)
//
// rules:
// goal -> e + e @add     { $id }
// e    -> $id            { $id }
//
// Lines without '=' before the rules section and lines without '->' inside it
// are free text.

use nom::bytes::complete::{tag, take_until, take_while, take_while1};
use nom::character::complete::{char, space0};
use nom::combinator::rest;
use nom::error::ErrorKind;
use nom::sequence::{preceded, tuple};

use super::{Grammar, GrammarError, Result};
use crate::syntax::{fail, key, Input, Parsed};
use crate::types::Var;

const ESCAPE: char = '\\';

#[derive(Default)]
struct Headers {
    start: Option<Var>,
    terminals: Option<Vec<Var>>,
    nonterminals: Option<Vec<Var>>,
    action_symbols: Option<Vec<Var>>,
}

fn header(input: Input) -> Parsed<(Input, Input)> {
    let (input, (name, _, value)) = tuple((
        preceded(space0, take_while1(|c: char| c.is_alphanumeric() || c == '_')),
        key("="),
        rest,
    ))(input)?;

    Ok((input, (name, value.trim())))
}

fn push_item(items: &mut Vec<Var>, item: &mut String) {
    let trimmed = item.trim();
    if !trimmed.is_empty() {
        items.push(trimmed.to_string());
    }
    item.clear();
}

// comma separated items up to `close`; a backslash makes the next character
// part of the item, so `\,` is the symbol ','
fn items<'a>(close: char) -> impl Fn(Input<'a>) -> Parsed<'a, Vec<Var>> {
    move |input: Input<'a>| {
        let mut items = Vec::new();
        let mut item = String::new();
        let mut chars = input.char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some((_, escaped)) => item.push(escaped),
                    None => break,
                },
                ',' => push_item(&mut items, &mut item),
                c if c == close => {
                    push_item(&mut items, &mut item);
                    return Ok((&input[i + c.len_utf8()..], items));
                }
                c => item.push(c),
            }
        }

        fail(input, ErrorKind::Char)
    }
}

fn list(input: Input) -> Parsed<Vec<Var>> {
    preceded(preceded(space0, char('[')), items(']'))(input)
}

fn lookahead(input: Input) -> Parsed<Vec<Var>> {
    preceded(char('{'), items('}'))(input)
}

fn rule(input: Input) -> Parsed<(Input, Input, Input)> {
    let (input, (lhs, _, rhs)) =
        tuple((take_until("->"), tag("->"), take_while(|c: char| c != '{')))(input)?;

    Ok((input, (lhs, rhs, input)))
}

fn symbols(s: &str) -> Vec<Var> {
    s.split_whitespace().map(Var::from).collect()
}

impl Headers {
    fn set(&mut self, name: &str, value: &str, line: usize) -> Result<()> {
        let list_value = || {
            list(value)
                .map(|(_, items)| items)
                .map_err(|_| GrammarError::UnterminatedList {
                    line,
                    text: value.to_string(),
                })
        };

        match name {
            "start_symbol" => self.start = Some(value.to_string()),
            "terminals" => self.terminals = Some(list_value()?),
            "nonterminals" => self.nonterminals = Some(list_value()?),
            "action_symbols" => self.action_symbols = Some(list_value()?),
            _ => { /* not ours */ }
        }

        Ok(())
    }
}

pub fn grammar(text: &str) -> Result<Grammar> {
    let mut headers = Headers::default();
    let mut in_rules = false;
    let mut rules = Vec::new();
    let mut lookaheads = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.replace('\'', "");
        let line_no = index + 1;

        if line.trim().is_empty() {
            continue;
        }

        if !in_rules {
            if let Ok((_, (name, value))) = header(&line) {
                headers.set(name, value, line_no)?;
            } else if line.contains("rules") {
                in_rules = true;
            }
            continue;
        }

        if !line.contains("->") {
            continue;
        }

        let malformed = || GrammarError::MalformedRule {
            line: line_no,
            text: raw.to_string(),
        };

        let (_, (lhs, rhs, remainder)) = rule(&line).map_err(|_| malformed())?;
        let lhs = symbols(lhs);
        if lhs.len() != 1 {
            return Err(malformed());
        }

        if remainder.is_empty() {
            return Err(GrammarError::MissingLookahead { line: line_no });
        }
        let (_, set) = lookahead(remainder).map_err(|_| GrammarError::UnterminatedList {
            line: line_no,
            text: remainder.to_string(),
        })?;

        rules.push((lhs[0].clone(), symbols(rhs)));
        lookaheads.push(set);
    }

    let start = headers
        .start
        .filter(|s| !s.is_empty())
        .ok_or(GrammarError::MissingHeader("start_symbol"))?;
    let terminals = headers
        .terminals
        .ok_or(GrammarError::MissingHeader("terminals"))?;
    let nonterminals = headers
        .nonterminals
        .ok_or(GrammarError::MissingHeader("nonterminals"))?;
    if !in_rules {
        return Err(GrammarError::MissingHeader("rules"));
    }

    let actions = headers.action_symbols.unwrap_or_default();
    Grammar::scheme(start, terminals, nonterminals, actions, rules, lookaheads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolKind;

    const SMALL: &str = "
        A small grammar

        start_symbol = s
        terminals = [ a, \\,, 'b', # ]
        nonterminals = [s, tail]
        action_symbols = [@mark]

        rules:
        the rules follow
        s    -> a @mark tail   { a }
        tail -> , a tail       { \\, }
        tail ->                { # }
    ";

    #[test]
    fn parses_headers_and_rules() {
        let g = grammar(SMALL).unwrap();

        assert_eq!(g.start(), "s");
        assert_eq!(g.terminals(), &["a", ",", "b", "#"]);
        assert_eq!(g.nonterminals(), &["s", "tail"]);
        assert_eq!(g.kind("@mark"), Some(SymbolKind::Action));
        assert_eq!(g.rules().len(), 3);
        assert_eq!(g.rule(0).rhs, vec!["a", "@mark", "tail"]);
        assert_eq!(g.rule(1).lookahead, vec![","]);
        assert!(g.rule(2).rhs.is_empty());
    }

    #[test]
    fn escapes_any_number_of_separators() {
        let (rest, items) = items(']')("a, \\,, \\], b] tail").unwrap();
        assert_eq!(items, vec!["a", ",", "]", "b"]);
        assert_eq!(rest, " tail");
    }

    #[test]
    fn unterminated_list_fails() {
        let text = "start_symbol = s\nterminals = [a, b\nnonterminals = [s]\nrules:\n";
        assert!(matches!(
            grammar(text),
            Err(GrammarError::UnterminatedList { line: 2, .. })
        ));
    }

    #[test]
    fn unterminated_lookahead_fails() {
        let text = "start_symbol = s\nterminals = [a]\nnonterminals = [s]\nrules:\ns -> a { a\n";
        assert!(matches!(
            grammar(text),
            Err(GrammarError::UnterminatedList { line: 5, .. })
        ));
    }

    #[test]
    fn missing_headers_fail() {
        assert!(matches!(
            grammar("terminals = [a]\nnonterminals = [s]\nrules:\n"),
            Err(GrammarError::MissingHeader("start_symbol"))
        ));
        assert!(matches!(
            grammar("start_symbol = s\nterminals = [a]\nnonterminals = [s]\n"),
            Err(GrammarError::MissingHeader("rules"))
        ));
    }

    #[test]
    fn rule_without_lookahead_fails() {
        let text = "start_symbol = s\nterminals = [a]\nnonterminals = [s]\nrules:\ns -> a\n";
        assert!(matches!(
            grammar(text),
            Err(GrammarError::MissingLookahead { line: 5 })
        ));
    }
}
