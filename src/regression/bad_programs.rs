use super::translate;
use crate::grammar::Grammar;
use crate::interpreter::{compile, execute, CommandError};
use crate::memory::{MemoryError, DEFAULT_MEMORY_SIZE};
use crate::ops;
use crate::sm::{Cell, FaultKind};

fn rejected(source: &str) -> bool {
    let scheme = Grammar::plh().unwrap();
    matches!(compile(&scheme, source, None), Err(CommandError::Rejected))
}

fn fault(source: &str, stdin: &[&str]) -> FaultKind {
    let program = translate(source);
    let mut input = super::input(stdin);
    let mut output: Vec<String> = Vec::new();

    match execute(&program, DEFAULT_MEMORY_SIZE, &mut input, &mut output, None) {
        Err(CommandError::Runtime(fault)) => fault.kind,
        other => panic!("expected a fault, got {:?}", other),
    }
}

#[test]
fn syntax_errors_are_rejected() {
    assert!(rejected("x = 5"));
    assert!(rejected("declare a(5) x = 1;"));
    assert!(rejected("if x then put 1;"));
    assert!(rejected("end;"));
    assert!(rejected("put 1; declare a(1);"));
    assert!(rejected("x = 1 +;"));
}

#[test]
fn division_by_zero() {
    assert!(matches!(
        fault("x = 0; put 1 / x;", &[]),
        FaultKind::Op(ops::Error::DivisionByZero)
    ));
}

#[test]
fn goto_without_label() {
    assert!(matches!(
        fault("goto nowhere;", &[]),
        FaultKind::InvalidAddress(Cell::Uninitialized)
    ));
}

#[test]
fn input_runs_out() {
    assert!(matches!(fault("get x, y;", &["1"]), FaultKind::EndOfInput));
}

#[test]
fn text_arithmetic() {
    assert!(matches!(
        fault("get x; put x - 1;", &["abc"]),
        FaultKind::Op(ops::Error::TypeMismatch { .. })
    ));
}

#[test]
fn uninitialized_arithmetic() {
    assert!(matches!(
        fault("put y + 1;", &[]),
        FaultKind::Op(ops::Error::TypeMismatch { .. })
    ));
}

#[test]
fn negative_index_below_memory() {
    // x is at 1, so x(-1) is address 0
    assert!(matches!(
        fault("x = 1; put x(-1);", &[]),
        FaultKind::InvalidAddress(Cell::Int(0))
    ));
}

#[test]
fn index_past_memory() {
    assert!(matches!(
        fault("x = 1; put x(5);", &[]),
        FaultKind::Memory(MemoryError::OutOfRange(6))
    ));
}
