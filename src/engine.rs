use std::convert::Infallible;
use std::io::Write;

use crate::grammar::{Grammar, SymbolKind, BOTTOM, END_OF_INPUT};
use crate::stack::Stack;
use crate::tokens::TokenSource;
use crate::types::{Token, Var};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Accepted,
    Rejected,
}

/// What a single cycle of the engine did.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Top nonterminal replaced by the right side of this rule.
    Expanded(usize),
    Matched(Token),
    Performed(Var),
    Accepted,
    Rejected,
}

/// Semantic routines run when an action symbol reaches the top of the
/// stack. `last` is the most recently matched token.
pub trait Actions {
    type Error;

    fn perform(&mut self, action: &str, last: Option<&Token>) -> Result<(), Self::Error>;
}

// plain acceptor: action symbols are discarded
impl Actions for () {
    type Error = Infallible;

    fn perform(&mut self, _: &str, _: Option<&Token>) -> Result<(), Infallible> {
        Ok(())
    }
}

pub struct Engine<'g, S, A> {
    grammar: &'g Grammar,
    tokens: S,
    actions: A,
    stack: Stack<Var>,
    current: Option<Token>,
    last: Option<Token>,
    state: State,
    trace: Option<Box<dyn Write + 'g>>,
}

impl<'g, S, A> Engine<'g, S, A>
where
    S: TokenSource,
    A: Actions,
{
    pub fn new(grammar: &'g Grammar, mut tokens: S, actions: A) -> Self {
        let mut stack = Stack::new();
        stack.multipush(vec![grammar.start().to_string(), BOTTOM.to_string()]);
        let current = tokens.next_token();

        Engine {
            grammar,
            tokens,
            actions,
            stack,
            current,
            last: None,
            state: State::Running,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: Box<dyn Write + 'g>) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Parse stack, top first.
    pub fn stack(&self) -> impl Iterator<Item = &Var> {
        self.stack.iter()
    }

    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn into_actions(self) -> A {
        self.actions
    }

    // "no token" after end-of-input counts as end-of-input
    fn lookahead(&self) -> &str {
        self.current
            .as_ref()
            .map_or(END_OF_INPUT, |token| token.name.as_str())
    }

    fn finish(&mut self, state: State) -> Step {
        self.state = state;
        match state {
            State::Accepted => {
                self.stack.clear();
                Step::Accepted
            }
            _ => Step::Rejected,
        }
    }

    /// Runs one cycle. Once the engine has stopped this keeps reporting the
    /// final state without touching the input.
    pub fn step(&mut self) -> Result<Step, A::Error> {
        match self.state {
            State::Accepted => return Ok(Step::Accepted),
            State::Rejected => return Ok(Step::Rejected),
            State::Running => {}
        }

        let top = match self.stack.top() {
            Some(top) => top.clone(),
            None => return Ok(self.finish(State::Rejected)),
        };

        let step = if top == BOTTOM {
            if self.lookahead() == END_OF_INPUT {
                self.finish(State::Accepted)
            } else {
                self.finish(State::Rejected)
            }
        } else {
            match self.grammar.kind(&top) {
                Some(SymbolKind::Nonterminal) => {
                    match self.grammar.rule_for(&top, self.lookahead()) {
                        Some(index) => {
                            self.stack.pop();
                            self.stack.multipush(self.grammar.rule(index).rhs.iter().cloned());
                            Step::Expanded(index)
                        }
                        None => self.finish(State::Rejected),
                    }
                }
                Some(SymbolKind::Terminal) if top == self.lookahead() => {
                    self.stack.pop();
                    let matched = self.current.take().unwrap_or_else(|| Token::new(END_OF_INPUT));
                    self.last = Some(matched.clone());
                    self.current = self.tokens.next_token();
                    Step::Matched(matched)
                }
                Some(SymbolKind::Action) => {
                    self.actions.perform(&top, self.last.as_ref())?;
                    self.stack.pop();
                    Step::Performed(top)
                }
                _ => self.finish(State::Rejected),
            }
        };

        self.trace_step(&step);
        Ok(step)
    }

    pub fn run(&mut self) -> Result<State, A::Error> {
        while self.state == State::Running {
            self.step()?;
        }

        Ok(self.state)
    }

    fn trace_step(&mut self, step: &Step) {
        let trace = match self.trace.as_mut() {
            Some(trace) => trace,
            None => return,
        };

        let line = match step {
            Step::Expanded(index) => {
                let rule = self.grammar.rule(*index);
                format!("rule {}:   {} -> {}", index, rule.lhs, rule.rhs.join(" "))
            }
            Step::Matched(token) => format!("matching: {}", token.name),
            Step::Performed(action) => format!("action: {}", action),
            Step::Accepted => "accept".to_string(),
            Step::Rejected => "reject".to_string(),
        };

        let stack: Vec<&str> = self.stack.iter().map(String::as_str).collect();
        let token = self
            .current
            .as_ref()
            .map_or_else(|| "-".to_string(), Token::to_string);

        // trace failures are ignored
        let _ = writeln!(trace, "{}", line);
        let _ = writeln!(trace, "stack:    {}", stack.join("  "));
        let _ = writeln!(trace, "token:    {}\n", token);
    }
}

/// Accepts or rejects `tokens` against `grammar` without any translation.
pub fn accepts<S: TokenSource>(grammar: &Grammar, tokens: S) -> bool {
    let mut engine = Engine::new(grammar, tokens, ());
    match engine.run() {
        Ok(state) => state == State::Accepted,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenStream;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn expressions() -> Grammar {
        Grammar::expressions().unwrap()
    }

    #[test]
    fn accepts_expression() {
        let g = expressions();
        assert!(accepts(&g, TokenStream::from_names("$id * $id + $id")));
        assert!(accepts(&g, TokenStream::from_names("( $id + $id ) * $id")));
    }

    #[test]
    fn rejects_dangling_operator() {
        let g = expressions();
        assert!(!accepts(&g, TokenStream::from_names("$id * $id +")));
        assert!(!accepts(&g, TokenStream::from_names("")));
        assert!(!accepts(&g, TokenStream::from_names("$id $id")));
    }

    #[test]
    fn steps_through_a_parse() {
        let g = expressions();
        let mut engine = Engine::new(&g, TokenStream::from_names("$id"), ());

        // goal -> e -> t mt -> f mf mt -> $id mf mt
        assert_eq!(engine.step().unwrap(), Step::Expanded(0));
        assert_eq!(engine.step().unwrap(), Step::Expanded(1));
        assert_eq!(engine.step().unwrap(), Step::Expanded(4));
        assert_eq!(engine.step().unwrap(), Step::Expanded(7));
        assert_eq!(engine.stack().next().map(String::as_str), Some("$id"));
        assert_eq!(engine.step().unwrap(), Step::Matched(Token::new("$id")));
        assert_eq!(engine.step().unwrap(), Step::Expanded(6));
        assert_eq!(engine.step().unwrap(), Step::Expanded(3));
        assert_eq!(engine.step().unwrap(), Step::Accepted);
        assert_eq!(engine.state(), State::Accepted);
        assert_eq!(engine.stack().count(), 0);
        assert_eq!(engine.step().unwrap(), Step::Accepted);
    }

    struct Recorder(Vec<(String, Option<Token>)>);

    impl Actions for Recorder {
        type Error = String;

        fn perform(&mut self, action: &str, last: Option<&Token>) -> Result<(), String> {
            if action == "@fail" {
                return Err("failed".into());
            }
            self.0.push((action.to_string(), last.cloned()));
            Ok(())
        }
    }

    fn scheme() -> Grammar {
        Grammar::parse(
            "start_symbol = s
             terminals = [a, b, #, %]
             nonterminals = [s]
             action_symbols = [@seen, @fail]
             rules:
             s -> a @seen b @seen   { a }
             s -> b @fail           { b }",
        )
        .unwrap()
    }

    #[test]
    fn actions_see_last_matched_token() {
        let g = scheme();
        let mut engine = Engine::new(&g, TokenStream::from_names("a b"), Recorder(Vec::new()));

        assert_eq!(engine.run(), Ok(State::Accepted));
        let seen = engine.into_actions().0;
        assert_eq!(
            seen,
            vec![
                ("@seen".to_string(), Some(Token::new("a"))),
                ("@seen".to_string(), Some(Token::new("b"))),
            ]
        );
    }

    #[test]
    fn action_errors_stop_the_run() {
        let g = scheme();
        let mut engine = Engine::new(&g, TokenStream::from_names("b"), Recorder(Vec::new()));
        assert_eq!(engine.run(), Err("failed".to_string()));
    }

    #[test]
    fn plain_parse_skips_actions() {
        let g = scheme();
        assert!(accepts(&g, TokenStream::from_names("a b")));
    }

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn traces_transitions() {
        let g = expressions();
        let sink = Shared::default();
        let mut engine =
            Engine::new(&g, TokenStream::from_names("$id +"), ()).with_trace(Box::new(sink.clone()));
        assert_eq!(engine.run(), Ok(State::Rejected));

        let trace = String::from_utf8(sink.0.borrow().clone()).unwrap();
        assert!(trace.starts_with("rule 0:   goal -> e\nstack:    e  %\ntoken:    $id\n"));
        assert!(trace.contains("matching: $id"));
        assert!(trace.contains("matching: +"));
        assert!(trace.trim_end().ends_with("reject\nstack:    t  mt  %\ntoken:    #"));
    }
}
