use std::cmp::Ordering;

use thiserror::Error;

use crate::sm::Cell;
use crate::types::{Int, Real};

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("Attempt to divide by 0")]
    DivisionByZero,

    #[error("Cannot {op} {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: String,
        rhs: String,
    },
}

fn mismatch(op: &'static str, lhs: &Cell, rhs: &Cell) -> Error {
    Error::TypeMismatch {
        op,
        lhs: lhs.to_string(),
        rhs: rhs.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(Int),
    Real(Real),
}

impl Number {
    fn of(cell: &Cell) -> Option<Number> {
        match cell {
            Cell::Int(n) => Some(Number::Int(*n)),
            Cell::Address(a) => Some(Number::Int(*a as Int)),
            Cell::Real(x) => Some(Number::Real(*x)),
            _ => None,
        }
    }

    fn real(self) -> Real {
        match self {
            Number::Int(n) => n as Real,
            Number::Real(x) => x,
        }
    }
}

// floor division, the quotient rounds towards negative infinity
fn floor_div(lhs: Int, rhs: Int) -> Int {
    let q = lhs.wrapping_div(rhs);
    if lhs.wrapping_rem(rhs) != 0 && ((lhs < 0) != (rhs < 0)) {
        q - 1
    } else {
        q
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn name(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Sub => "subtract",
            Op::Mul => "multiply",
            Op::Div => "divide",
        }
    }

    pub fn apply(self, lhs: &Cell, rhs: &Cell) -> Result<Cell, Error> {
        if let (Op::Add, Cell::Text(l), Cell::Text(r)) = (self, lhs, rhs) {
            return Ok(Cell::Text(format!("{}{}", l, r)));
        }

        let (l, r) = match (Number::of(lhs), Number::of(rhs)) {
            (Some(l), Some(r)) => (l, r),
            _ => return Err(mismatch(self.name(), lhs, rhs)),
        };

        let cell = match (l, r) {
            (Number::Int(l), Number::Int(r)) => Cell::Int(match self {
                Op::Add => l.wrapping_add(r),
                Op::Sub => l.wrapping_sub(r),
                Op::Mul => l.wrapping_mul(r),
                Op::Div => {
                    if r == 0 {
                        return Err(Error::DivisionByZero);
                    }

                    floor_div(l, r)
                }
            }),
            (l, r) => {
                let (l, r) = (l.real(), r.real());
                Cell::Real(match self {
                    Op::Add => l + r,
                    Op::Sub => l - r,
                    Op::Mul => l * r,
                    Op::Div => {
                        if r == 0.0 {
                            return Err(Error::DivisionByZero);
                        }

                        l / r
                    }
                })
            }
        };

        Ok(cell)
    }
}

pub fn negate(value: &Cell) -> Result<Cell, Error> {
    match Number::of(value) {
        Some(Number::Int(n)) => Ok(Cell::Int(n.wrapping_neg())),
        Some(Number::Real(x)) => Ok(Cell::Real(-x)),
        None => Err(mismatch("negate", value, &Cell::Uninitialized)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicOp {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Eq,
    NotEq,
    And,
    Or,
}

fn equal(lhs: &Cell, rhs: &Cell) -> bool {
    match (Number::of(lhs), Number::of(rhs)) {
        (Some(Number::Int(l)), Some(Number::Int(r))) => l == r,
        (Some(l), Some(r)) => l.real() == r.real(),
        _ => lhs == rhs,
    }
}

fn compare(lhs: &Cell, rhs: &Cell) -> Result<Option<Ordering>, Error> {
    match (Number::of(lhs), Number::of(rhs)) {
        (Some(Number::Int(l)), Some(Number::Int(r))) => Ok(Some(l.cmp(&r))),
        (Some(l), Some(r)) => Ok(l.real().partial_cmp(&r.real())),
        _ => match (lhs, rhs) {
            (Cell::Text(l), Cell::Text(r)) => Ok(Some(l.cmp(r))),
            _ => Err(mismatch("compare", lhs, rhs)),
        },
    }
}

impl LogicOp {
    pub fn apply(self, lhs: &Cell, rhs: &Cell) -> Result<bool, Error> {
        let result = match self {
            LogicOp::Eq => equal(lhs, rhs),
            LogicOp::NotEq => !equal(lhs, rhs),
            LogicOp::And => lhs.is_truthy() && rhs.is_truthy(),
            LogicOp::Or => lhs.is_truthy() || rhs.is_truthy(),
            LogicOp::Less => compare(lhs, rhs)? == Some(Ordering::Less),
            LogicOp::LessOrEqual => match compare(lhs, rhs)? {
                Some(Ordering::Less) | Some(Ordering::Equal) => true,
                _ => false,
            },
            LogicOp::Greater => compare(lhs, rhs)? == Some(Ordering::Greater),
            LogicOp::GreaterOrEqual => match compare(lhs, rhs)? {
                Some(Ordering::Greater) | Some(Ordering::Equal) => true,
                _ => false,
            },
        };

        Ok(result)
    }
}
