use std::io::{self, Write};

use thiserror::Error;

use crate::io::{InputStream, OutputStream};
use crate::memory::{Memory, MemoryError};
use crate::ops::{self, LogicOp, Op};

use super::program::{Cell, Opcode, Program};

#[derive(Debug, Error)]
pub enum FaultKind {
    #[error("Unknown opcode {0}")]
    UnknownOpcode(Cell),

    #[error("Program counter out of range")]
    PcOutOfRange,

    #[error("Missing operand ({0})")]
    MissingOperand(Opcode),

    #[error("Empty stack ({0})")]
    StackUnderflow(Opcode),

    #[error("Invalid address {0}")]
    InvalidAddress(Cell),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Op(#[from] ops::Error),

    #[error("No input (in)")]
    EndOfInput,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Fatal runtime error, located at the instruction that raised it.
#[derive(Debug, Error)]
#[error("Fault at {pc}: {kind}")]
pub struct Fault {
    pub pc: usize,
    pub kind: FaultKind,
}

type Stack = Vec<Cell>;

// integers and addresses are interchangeable as locations
fn address(cell: &Cell) -> Result<usize, FaultKind> {
    match cell {
        Cell::Address(a) => Ok(*a),
        Cell::Int(n) if *n > 0 => Ok(*n as usize),
        cell => Err(FaultKind::InvalidAddress(cell.clone())),
    }
}

pub struct StackMachine<'a, I, O> {
    code: Vec<Cell>,
    initial: Memory,
    memory: Memory,
    input: &'a mut I,
    output: &'a mut O,
    stack: Stack,
    pc: usize,
    running: bool,
    trace: Option<Box<dyn Write + 'a>>,
}

impl<'a, I, O> StackMachine<'a, I, O>
where
    I: InputStream,
    O: OutputStream,
{
    pub fn new(program: Program, input: &'a mut I, output: &'a mut O) -> Self {
        let (code, memory) = program.into_parts();
        StackMachine {
            code,
            initial: memory.clone(),
            memory,
            input,
            output,
            stack: Stack::new(),
            pc: 1,
            running: true,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: Box<dyn Write + 'a>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Index of the next instruction to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Operand stack, bottom first.
    pub fn stack(&self) -> &[Cell] {
        &self.stack
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn into_memory(self) -> Memory {
        self.memory
    }

    /// Back to the loaded state: counter at 1, empty stack, initial memory.
    pub fn reset(&mut self) {
        self.memory = self.initial.clone();
        self.stack.clear();
        self.pc = 1;
        self.running = true;
    }

    fn pop(&mut self, op: Opcode) -> Result<Cell, FaultKind> {
        self.stack.pop().ok_or(FaultKind::StackUnderflow(op))
    }

    fn fetch(&self, index: usize) -> Option<&Cell> {
        index.checked_sub(1).and_then(|i| self.code.get(i))
    }

    fn decode(&self) -> Result<Opcode, FaultKind> {
        match self.fetch(self.pc) {
            Some(Cell::Opcode(op)) => Ok(*op),
            Some(cell) => Err(FaultKind::UnknownOpcode(cell.clone())),
            None => Err(FaultKind::PcOutOfRange),
        }
    }

    /// Executes `op`, returning the index of the instruction to run next.
    fn execute(&mut self, op: Opcode) -> Result<usize, FaultKind> {
        let mut next = self.pc + 1;
        let operand = if op.has_operand() {
            let operand = self
                .fetch(next)
                .cloned()
                .ok_or(FaultKind::MissingOperand(op))?;
            next += 1;
            operand
        } else {
            Cell::Uninitialized
        };

        match op {
            Opcode::Quit => self.running = false,
            Opcode::Lit => self.stack.push(operand),
            Opcode::Load => {
                let value = self.memory.load(address(&operand)?)?.clone();
                self.stack.push(value);
            }
            Opcode::Store => {
                let value = self.pop(op)?;
                self.memory.store(address(&operand)?, value)?;
            }
            Opcode::Ldi => {
                let at = self.pop(op)?;
                let value = self.memory.load(address(&at)?)?.clone();
                self.stack.push(value);
            }
            Opcode::Sti => {
                let value = self.pop(op)?;
                let at = self.pop(op)?;
                self.memory.store(address(&at)?, value)?;
            }
            Opcode::Add | Opcode::Sub | Opcode::Mult | Opcode::Div => {
                let arithmetic = match op {
                    Opcode::Add => Op::Add,
                    Opcode::Sub => Op::Sub,
                    Opcode::Mult => Op::Mul,
                    _ => Op::Div,
                };
                let rhs = self.pop(op)?;
                let lhs = self.pop(op)?;
                self.stack.push(arithmetic.apply(&lhs, &rhs)?);
            }
            Opcode::Neg => {
                let value = self.pop(op)?;
                self.stack.push(ops::negate(&value)?);
            }
            Opcode::Eq
            | Opcode::Lt
            | Opcode::Gt
            | Opcode::Ne
            | Opcode::Le
            | Opcode::Ge
            | Opcode::And
            | Opcode::Or => {
                let logic = match op {
                    Opcode::Eq => LogicOp::Eq,
                    Opcode::Lt => LogicOp::Less,
                    Opcode::Gt => LogicOp::Greater,
                    Opcode::Ne => LogicOp::NotEq,
                    Opcode::Le => LogicOp::LessOrEqual,
                    Opcode::Ge => LogicOp::GreaterOrEqual,
                    Opcode::And => LogicOp::And,
                    _ => LogicOp::Or,
                };
                let rhs = self.pop(op)?;
                let lhs = self.pop(op)?;
                self.stack.push(logic.apply(&lhs, &rhs)?.into());
            }
            Opcode::Not => {
                let value = self.pop(op)?;
                self.stack.push((!value.is_truthy()).into());
            }
            Opcode::Br => {
                let target = self.pop(op)?;
                next = address(&target)?;
            }
            Opcode::Brl => next = address(&operand)?,
            Opcode::Brf => {
                let target = self.pop(op)?;
                let condition = self.pop(op)?;
                if !condition.is_truthy() {
                    next = address(&target)?;
                }
            }
            Opcode::In => {
                let line = self.input.read()?.ok_or(FaultKind::EndOfInput)?;
                self.stack.push(Cell::parse_data(line.trim()));
            }
            Opcode::Out => {
                let value = self.pop(op)?;
                self.output.write(&value)?;
            }
            Opcode::Inc | Opcode::Dec => {
                let arithmetic = if op == Opcode::Inc { Op::Add } else { Op::Sub };
                let value = self.pop(op)?;
                self.stack.push(arithmetic.apply(&value, &operand)?);
            }
        }

        Ok(next)
    }

    /// Executes one instruction. Does nothing once the machine has stopped.
    pub fn step(&mut self) -> Result<(), Fault> {
        if !self.running {
            return Ok(());
        }

        self.trace_state();

        let pc = self.pc;
        match self.decode().and_then(|op| self.execute(op)) {
            Ok(next) => {
                self.pc = next;
                Ok(())
            }
            Err(kind) => {
                self.running = false;
                Err(Fault { pc, kind })
            }
        }
    }

    pub fn run(&mut self) -> Result<(), Fault> {
        while self.running {
            self.step()?;
        }

        Ok(())
    }

    fn trace_state(&mut self) {
        let trace = match self.trace.as_mut() {
            Some(trace) => trace,
            None => return,
        };

        let stack: Vec<String> = self.stack.iter().map(Cell::to_string).collect();
        let index = self.pc.wrapping_sub(1);
        let instruction = match self.code.get(index) {
            Some(Cell::Opcode(op)) if op.has_operand() => match self.code.get(index + 1) {
                Some(operand) => format!("{}  {}", op, operand),
                None => op.to_string(),
            },
            Some(cell) => cell.to_string(),
            None => "?".to_string(),
        };

        // trace failures are ignored
        let _ = writeln!(trace, "{:<8} {}", "stack", stack.join("\t"));
        let _ = writeln!(trace, "{:<8} {}", "data", self.memory);
        let _ = writeln!(trace, "{:<8} at  {}\n", instruction, self.pc);
    }
}
