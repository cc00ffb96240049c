use std::fmt;
use std::path::Path;

use fnv::FnvHashMap;
use thiserror::Error;

use crate::types::Var;

mod parse;

/// Terminal that the token source yields once its tokens run out.
pub const END_OF_INPUT: &str = "#";
/// Terminal that sits below everything on the parse stack.
pub const BOTTOM: &str = "%";

const EXPRESSIONS: &str = include_str!("../../grammars/expressions.g");
const PLH: &str = include_str!("../../grammars/plh.ts");

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Unterminated list on line {line}: {text}")]
    UnterminatedList { line: usize, text: String },

    #[error("Malformed rule on line {line}: {text}")]
    MalformedRule { line: usize, text: String },

    #[error("Rule on line {line} has no lookahead set")]
    MissingLookahead { line: usize },

    #[error("{rules} rules but {sets} lookahead sets")]
    LookaheadMismatch { rules: usize, sets: usize },

    #[error("Symbol {0} is declared more than once")]
    SymbolClash(Var),

    #[error("Start symbol {0} is not a nonterminal")]
    UnknownStart(Var),

    #[error("Undefined symbol {symbol} in rule {rule}")]
    UndefinedSymbol { symbol: Var, rule: usize },

    #[error("Failed to read grammar: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GrammarError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
    Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub lhs: Var,
    pub rhs: Vec<Var>,
    pub lookahead: Vec<Var>,
}

/// Context-free grammar with one explicit lookahead set per rule. With
/// action symbols it doubles as a translation scheme.
#[derive(Debug, Clone)]
pub struct Grammar {
    start: Var,
    terminals: Vec<Var>,
    nonterminals: Vec<Var>,
    action_symbols: Vec<Var>,
    rules: Vec<Rule>,
    kinds: FnvHashMap<Var, SymbolKind>,
}

impl Grammar {
    pub fn new(
        start: impl Into<Var>,
        terminals: Vec<Var>,
        nonterminals: Vec<Var>,
        rules: Vec<(Var, Vec<Var>)>,
        lookaheads: Vec<Vec<Var>>,
    ) -> Result<Self> {
        Self::scheme(start, terminals, nonterminals, Vec::new(), rules, lookaheads)
    }

    /// A grammar whose rules may also contain `action_symbols`.
    pub fn scheme(
        start: impl Into<Var>,
        terminals: Vec<Var>,
        nonterminals: Vec<Var>,
        action_symbols: Vec<Var>,
        rules: Vec<(Var, Vec<Var>)>,
        lookaheads: Vec<Vec<Var>>,
    ) -> Result<Self> {
        if rules.len() != lookaheads.len() {
            return Err(GrammarError::LookaheadMismatch {
                rules: rules.len(),
                sets: lookaheads.len(),
            });
        }

        let rules = rules
            .into_iter()
            .zip(lookaheads)
            .map(|((lhs, rhs), lookahead)| Rule {
                lhs,
                rhs,
                lookahead,
            })
            .collect();

        let mut grammar = Grammar {
            start: start.into(),
            terminals,
            nonterminals,
            action_symbols,
            rules,
            kinds: FnvHashMap::default(),
        };
        grammar.validate()?;
        Ok(grammar)
    }

    pub fn parse(text: &str) -> Result<Self> {
        parse::grammar(text)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// The classic `goal -> e` expression grammar over `$id * + ( )`.
    pub fn expressions() -> Result<Self> {
        Self::parse(EXPRESSIONS)
    }

    /// The bundled PL/H translation scheme.
    pub fn plh() -> Result<Self> {
        Self::parse(PLH)
    }

    fn validate(&mut self) -> Result<()> {
        let mut kinds = FnvHashMap::default();
        let declared = self
            .terminals
            .iter()
            .map(|s| (s, SymbolKind::Terminal))
            .chain(self.nonterminals.iter().map(|s| (s, SymbolKind::Nonterminal)))
            .chain(self.action_symbols.iter().map(|s| (s, SymbolKind::Action)));

        for (symbol, kind) in declared {
            if kinds.insert(symbol.clone(), kind).is_some() {
                return Err(GrammarError::SymbolClash(symbol.clone()));
            }
        }

        if kinds.get(&self.start) != Some(&SymbolKind::Nonterminal) {
            return Err(GrammarError::UnknownStart(self.start.clone()));
        }

        for (index, rule) in self.rules.iter().enumerate() {
            let undefined = |symbol: &Var| GrammarError::UndefinedSymbol {
                symbol: symbol.clone(),
                rule: index,
            };

            if kinds.get(&rule.lhs) != Some(&SymbolKind::Nonterminal) {
                return Err(undefined(&rule.lhs));
            }
            if let Some(symbol) = rule.rhs.iter().find(|s| !kinds.contains_key(*s)) {
                return Err(undefined(symbol));
            }
            if let Some(symbol) = rule
                .lookahead
                .iter()
                .find(|s| kinds.get(*s) != Some(&SymbolKind::Terminal))
            {
                return Err(undefined(symbol));
            }
        }

        self.kinds = kinds;
        Ok(())
    }

    /// Index of the first rule, in definition order, for `top` whose
    /// lookahead set contains `lookahead`. Overlapping sets are resolved by
    /// that order rather than reported.
    pub fn rule_for(&self, top: &str, lookahead: &str) -> Option<usize> {
        self.rules
            .iter()
            .position(|rule| rule.lhs == top && rule.lookahead.iter().any(|t| t == lookahead))
    }

    pub fn rule(&self, index: usize) -> &Rule {
        &self.rules[index]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn kind(&self, symbol: &str) -> Option<SymbolKind> {
        self.kinds.get(symbol).copied()
    }

    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.kind(symbol) == Some(SymbolKind::Terminal)
    }

    /// Terminals and nonterminals; action symbols never appear in input.
    pub fn is_vocabulary(&self, symbol: &str) -> bool {
        match self.kind(symbol) {
            Some(SymbolKind::Terminal) | Some(SymbolKind::Nonterminal) => true,
            _ => false,
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn terminals(&self) -> &[Var] {
        &self.terminals
    }

    pub fn nonterminals(&self) -> &[Var] {
        &self.nonterminals
    }

    pub fn action_symbols(&self) -> &[Var] {
        &self.action_symbols
    }
}

fn list(symbols: &[Var], open: char, close: char) -> String {
    format!("{} {} {}", open, symbols.join(", "), close)
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Start Symbol:   {}", self.start)?;
        writeln!(f, "Nonterminals:   {}", list(&self.nonterminals, '[', ']'))?;
        writeln!(f, "Terminals:      {}", list(&self.terminals, '[', ']'))?;
        if !self.action_symbols.is_empty() {
            writeln!(f, "Action Symbols: {}", list(&self.action_symbols, '[', ']'))?;
        }

        let lhs_width = self.rules.iter().map(|r| r.lhs.len()).max().unwrap_or(0);
        let rules: Vec<String> = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}) {:>w$} -> {}", i, r.lhs, r.rhs.join(" "), w = lhs_width))
            .collect();
        let width = rules.iter().map(String::len).max().unwrap_or(0) + 4;

        writeln!(f, "Rules:")?;
        for (rule, r) in rules.iter().zip(&self.rules) {
            writeln!(f, "{:<w$}{}", rule, list(&r.lookahead, '{', '}'), w = width)?;
        }

        Ok(())
    }
}
