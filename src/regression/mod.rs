mod bad_programs;
mod programs;

use crate::grammar::Grammar;
use crate::interpreter::{compile, execute};
use crate::memory::{Memory, DEFAULT_MEMORY_SIZE};
use crate::sm::Program;

fn input(stdin: &[&str]) -> Vec<String> {
    stdin.iter().rev().map(|s| s.to_string()).collect()
}

pub fn translate(source: &str) -> Program {
    let scheme = Grammar::plh().unwrap();
    compile(&scheme, source.trim(), None).unwrap().program
}

pub fn run(source: &str, stdin: &[&str], stdout: &[&str], reads: usize) -> Memory {
    let program = translate(source);
    let mut inputs = input(stdin);
    let mut output: Vec<String> = Vec::new();

    let memory = execute(&program, DEFAULT_MEMORY_SIZE, &mut inputs, &mut output, None).unwrap();
    assert_eq!(stdin.len() - inputs.len(), reads);
    assert_eq!(output, stdout);
    memory
}
