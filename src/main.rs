mod config;
mod engine;
mod grammar;
mod interpreter;
mod io;
mod memory;
mod ops;
#[cfg(test)]
mod regression;
mod scanner;
mod sm;
mod stack;
mod syntax;
mod tokens;
mod translate;
mod tree;
mod types;

use std::error::Error;

use clap::Parser;

use crate::config::{Cli, Config};
use crate::interpreter::Interpreter;

fn run(config: Config) -> Result<(), Box<dyn Error>> {
    Interpreter::new(config)?.run()
}

fn main() -> Result<(), Box<dyn Error>> {
    if let Err(e) = run(Cli::parse().into()) {
        eprintln!("Failure: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
