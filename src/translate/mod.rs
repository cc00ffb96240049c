mod symbols;

use std::io::Write;

use fnv::FnvHashMap;
use thiserror::Error;

use crate::engine::{Actions, Engine, State};
use crate::grammar::Grammar;
use crate::memory::MemoryError;
use crate::sm::{Cell, Opcode, Program};
use crate::stack::Stack;
use crate::tokens::TokenSource;
use crate::types::{Token, Value, Var};

pub use self::symbols::{Kind, Symbol, SymbolTable};

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("No routine for action symbol {0}")]
    UnknownAction(Var),

    #[error("Action {0} needs the value of the last token")]
    MissingValue(Var),

    #[error("Action {action} cannot use value {value}")]
    WrongType { action: Var, value: String },

    #[error("Action {0} found the action stack empty")]
    ActionStackUnderflow(Var),

    #[error("Action {action} popped unexpected {frame}")]
    UnexpectedFrame { action: Var, frame: String },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

type Result<T> = std::result::Result<T, TranslationError>;

/// Semantic routine bound to an action symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Emit(Opcode),
    LastValue,
    Address,
    Goto,
    Label,
    Push,
    Declare,
    BeginIf,
    EndIf,
}

const ACTION_TABLE: &[(&str, Action)] = &[
    ("@quit", Action::Emit(Opcode::Quit)),
    ("@lit", Action::Emit(Opcode::Lit)),
    ("@ldi", Action::Emit(Opcode::Ldi)),
    ("@sti", Action::Emit(Opcode::Sti)),
    ("@add", Action::Emit(Opcode::Add)),
    ("@mult", Action::Emit(Opcode::Mult)),
    ("@sub", Action::Emit(Opcode::Sub)),
    ("@div", Action::Emit(Opcode::Div)),
    ("@neg", Action::Emit(Opcode::Neg)),
    ("@out", Action::Emit(Opcode::Out)),
    ("@in", Action::Emit(Opcode::In)),
    ("@lt", Action::Emit(Opcode::Lt)),
    ("@gt", Action::Emit(Opcode::Gt)),
    ("@eq", Action::Emit(Opcode::Eq)),
    ("@le", Action::Emit(Opcode::Le)),
    ("@ge", Action::Emit(Opcode::Ge)),
    ("@ne", Action::Emit(Opcode::Ne)),
    ("@last_token_val", Action::LastValue),
    ("@address_last_token_val", Action::Address),
    ("@goto", Action::Goto),
    ("@label", Action::Label),
    ("@push", Action::Push),
    ("@declare", Action::Declare),
    ("@begin_if", Action::BeginIf),
    ("@end_if", Action::EndIf),
];

impl Action {
    pub fn lookup(name: &str) -> Option<Action> {
        ACTION_TABLE
            .iter()
            .find(|(symbol, _)| *symbol == name)
            .map(|(_, action)| *action)
    }
}

/// Action stack entry carrying state between the actions of one construct.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Value(Value),
    /// Code index of the branch target `@end_if` has to fill in.
    If { patch: usize },
}

/// Code generator driven by the engine through action symbols.
pub struct Translator {
    symbols: SymbolTable,
    program: Program,
    frames: Stack<Frame>,
    actions: FnvHashMap<Var, Action>,
}

impl Translator {
    /// Binds every action symbol of `scheme` to its routine.
    pub fn new(scheme: &Grammar) -> Result<Self> {
        let mut actions = FnvHashMap::default();
        for name in scheme.action_symbols() {
            let action = Action::lookup(name)
                .ok_or_else(|| TranslationError::UnknownAction(name.clone()))?;
            actions.insert(name.clone(), action);
        }

        Ok(Translator {
            symbols: SymbolTable::new(),
            program: Program::new(),
            frames: Stack::new(),
            actions,
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_parts(self) -> (Program, SymbolTable) {
        (self.program, self.symbols)
    }

    fn symbol(&mut self, name: &str, kind: Kind, size: usize) -> Result<Symbol> {
        let symbol = self
            .symbols
            .lookup_or_create(name, kind, size, self.program.data_mut())?;
        Ok(symbol)
    }

    fn pop_frame(&mut self, action: &str) -> Result<Frame> {
        self.frames
            .pop()
            .ok_or_else(|| TranslationError::ActionStackUnderflow(action.to_string()))
    }
}

fn value<'t>(action: &str, last: Option<&'t Token>) -> Result<&'t Value> {
    last.and_then(|token| token.value.as_ref())
        .ok_or_else(|| TranslationError::MissingValue(action.to_string()))
}

fn wrong_type(action: &str, value: &dyn std::fmt::Display) -> TranslationError {
    TranslationError::WrongType {
        action: action.to_string(),
        value: value.to_string(),
    }
}

fn name<'t>(action: &str, last: Option<&'t Token>) -> Result<&'t str> {
    let value = value(action, last)?;
    value.as_text().ok_or_else(|| wrong_type(action, value))
}

impl Actions for Translator {
    type Error = TranslationError;

    fn perform(&mut self, action: &str, last: Option<&Token>) -> Result<()> {
        let routine = self
            .actions
            .get(action)
            .copied()
            .ok_or_else(|| TranslationError::UnknownAction(action.to_string()))?;

        match routine {
            Action::Emit(op) => {
                self.program.emit(op);
            }
            Action::LastValue => {
                let value = value(action, last)?.clone();
                self.program.emit(value);
            }
            Action::Address => {
                let symbol = self.symbol(name(action, last)?, Kind::Scalar, 1)?;
                self.program.emit(Cell::Address(symbol.address));
            }
            Action::Goto => {
                // the label cell holds the target once @label has run
                let symbol = self.symbol(name(action, last)?, Kind::Label, 1)?;
                self.program.emit(Opcode::Lit);
                self.program.emit(Cell::Address(symbol.address));
                self.program.emit(Opcode::Ldi);
                self.program.emit(Opcode::Br);
            }
            Action::Label => {
                let target = self.program.next_index();
                let symbol = self.symbol(name(action, last)?, Kind::Label, 1)?;
                self.program
                    .data_mut()
                    .store(symbol.address, Cell::Address(target))?;
            }
            Action::Push => {
                let value = value(action, last)?.clone();
                self.frames.push(Frame::Value(value));
            }
            Action::Declare => {
                let size = match value(action, last)? {
                    Value::Int(n) if *n >= 0 => *n as usize,
                    value => return Err(wrong_type(action, value)),
                };

                let name = match self.pop_frame(action)? {
                    Frame::Value(Value::Text(name)) => name,
                    Frame::Value(value) => return Err(wrong_type(action, &value)),
                    frame => {
                        return Err(TranslationError::UnexpectedFrame {
                            action: action.to_string(),
                            frame: format!("{:?}", frame),
                        })
                    }
                };

                // x(5) declares x(0) .. x(5)
                self.symbol(&name, Kind::Array, size + 1)?;
            }
            Action::BeginIf => {
                self.program.emit(Opcode::Lit);
                let patch = self.program.emit(Cell::Uninitialized);
                self.frames.push(Frame::If { patch });
                self.program.emit(Opcode::Brf);
            }
            Action::EndIf => match self.pop_frame(action)? {
                Frame::If { patch } => {
                    let target = self.program.next_index();
                    self.program.patch(patch, Cell::Address(target));
                }
                frame => {
                    return Err(TranslationError::UnexpectedFrame {
                        action: action.to_string(),
                        frame: format!("{:?}", frame),
                    })
                }
            },
        }

        Ok(())
    }
}

/// Result of one translation pass. `program` and `symbols` are only
/// meaningful when `state` is `Accepted`.
#[derive(Debug)]
pub struct Translation {
    pub state: State,
    pub program: Program,
    pub symbols: SymbolTable,
}

pub fn translate<S: TokenSource>(scheme: &Grammar, tokens: S) -> Result<Translation> {
    translate_traced(scheme, tokens, None)
}

pub fn translate_traced<'g, S: TokenSource>(
    scheme: &'g Grammar,
    tokens: S,
    trace: Option<Box<dyn Write + 'g>>,
) -> Result<Translation> {
    let mut engine = Engine::new(scheme, tokens, Translator::new(scheme)?);
    if let Some(trace) = trace {
        engine = engine.with_trace(trace);
    }

    let state = engine.run()?;
    let (program, symbols) = engine.into_actions().into_parts();
    Ok(Translation {
        state,
        program,
        symbols,
    })
}
