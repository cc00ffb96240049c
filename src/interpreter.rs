use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufReader, Stdin, Stdout, Write};
use std::path::Path;

use rustyline::error::ReadlineError;
use rustyline::Editor;
use thiserror::Error;

use crate::config::{Config, Task};
use crate::engine::{Engine, State};
use crate::grammar::{Grammar, GrammarError};
use crate::io::{InputStream, Lines, OutputStream};
use crate::memory::Memory;
use crate::scanner;
use crate::sm::{Fault, LoadError, Program, StackMachine};
use crate::syntax;
use crate::tokens::{self, TokenError, TokenStream};
use crate::translate::{self, Translation, TranslationError};
use crate::tree;
use crate::types::Var;

#[derive(Debug)]
pub enum Command {
    ShowTokens(String),
    Parse(String),
    ShowTree { nonterminal: Var, source: String },
    ShowCode(String),
    ShowSymbols(String),
    ShowGrammar,
    Run(String),
}

impl Command {
    fn parse(line: &str) -> syntax::Result<Command> {
        syntax::parse("command", parse::input_line, line)
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Parse error: {0}")]
    Parse(#[from] syntax::Error),

    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    #[error("Token error: {0}")]
    Tokens(#[from] TokenError),

    #[error("Input rejected")]
    Rejected,

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] Fault),

    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

type Result<T> = std::result::Result<T, CommandError>;

/// Scans and translates PL/H `source`. A rejected program is an error here.
pub fn compile(
    scheme: &Grammar,
    source: &str,
    trace: Option<Box<dyn Write>>,
) -> Result<Translation> {
    let tokens = scanner::scan(source)?;
    let translation = translate::translate_traced(scheme, TokenStream::new(tokens), trace)?;

    match translation.state {
        State::Accepted => Ok(translation),
        _ => Err(CommandError::Rejected),
    }
}

/// Runs `program` with a data memory of `capacity` cells and returns the
/// memory it leaves behind.
pub fn execute<I, O>(
    program: &Program,
    capacity: usize,
    input: &mut I,
    output: &mut O,
    trace: Option<Box<dyn Write>>,
) -> Result<Memory>
where
    I: InputStream,
    O: OutputStream,
{
    let mut program = program.clone();
    program.data_mut().set_capacity(capacity);

    let mut machine = StackMachine::new(program, input, output);
    if let Some(trace) = trace {
        machine = machine.with_trace(trace);
    }

    machine.run()?;
    Ok(machine.into_memory())
}

pub struct Interpreter {
    config: Config,
    scheme: Grammar,
    input: Stdin,
    output: Stdout,
}

impl Interpreter {
    pub fn new(config: Config) -> Result<Self> {
        let scheme = config.load_scheme()?;
        config.reset_trace()?;

        Ok(Interpreter {
            config,
            scheme,
            input: io::stdin(),
            output: io::stdout(),
        })
    }

    fn compile(&self, source: &str) -> Result<Translation> {
        compile(&self.scheme, source, self.config.trace_sink()?)
    }

    fn execute_with<I: InputStream>(&mut self, program: &Program, input: &mut I) -> Result<Memory> {
        let trace = self.config.trace_sink()?;
        execute(program, self.config.memory, input, &mut self.output, trace)
    }

    fn execute_from(&mut self, program: &Program, input: Option<&Path>) -> Result<Memory> {
        match input {
            Some(path) => {
                let mut lines = Lines(BufReader::new(File::open(path)?));
                self.execute_with(program, &mut lines)
            }
            None => {
                let trace = self.config.trace_sink()?;
                execute(program, self.config.memory, &mut self.input, &mut self.output, trace)
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::ShowTokens(source) => {
                for token in scanner::scan(&source)? {
                    println!("{}", token);
                }
            }
            Command::Parse(source) => {
                let tokens = TokenStream::new(scanner::scan(&source)?);
                let mut engine = Engine::new(&self.scheme, tokens, ());
                if let Some(trace) = self.config.trace_sink()? {
                    engine = engine.with_trace(trace);
                }

                match engine.run() {
                    Ok(State::Accepted) => println!("accept"),
                    Ok(_) => println!("reject"),
                    Err(never) => match never {},
                }
            }
            Command::ShowTree {
                nonterminal,
                source,
            } => {
                let tokens = TokenStream::new(scanner::scan(&source)?);
                let tree = tree::build(&self.scheme, tokens).ok_or(CommandError::Rejected)?;
                for phrase in tree.phrases_for(&nonterminal, &self.scheme) {
                    println!("{}", phrase);
                }
            }
            Command::ShowCode(source) => println!("{}", self.compile(&source)?.program),
            Command::ShowSymbols(source) => print!("{}", self.compile(&source)?.symbols),
            Command::ShowGrammar => println!("{}", self.scheme),
            Command::Run(source) => {
                let translation = self.compile(&source)?;
                self.execute_from(&translation.program, None)?;
            }
        }

        Ok(())
    }

    fn run_task(&mut self, task: Task) -> Result<()> {
        match task {
            Task::Run { source, input } => {
                let translation = self.compile(&fs::read_to_string(source)?)?;
                self.execute_from(&translation.program, input.as_deref())?;
            }
            Task::Translate { source, code, data } => {
                let translation = self.compile(&fs::read_to_string(source)?)?;
                translation.program.save(&code, Some(data.as_path()))?;
                print!("{}", translation.symbols);
            }
            Task::Exec { code, data, input } => {
                let program = Program::load(&code, data.as_deref())?;
                let memory = self.execute_from(&program, input.as_deref())?;
                if let Some(path) = data {
                    Program::save_data(&memory, &path)?;
                }
            }
            Task::Parse {
                tokens,
                grammar,
                tree,
            } => {
                let grammar = match grammar {
                    Some(path) => Grammar::load(path)?,
                    None => self.scheme.clone(),
                };
                let tokens = TokenStream::new(tokens::load(tokens, &grammar)?);

                match tree {
                    Some(nonterminal) => {
                        let tree = tree::build(&grammar, tokens).ok_or(CommandError::Rejected)?;
                        for phrase in tree.phrases_for(&nonterminal, &grammar) {
                            println!("{}", phrase);
                        }
                    }
                    None => {
                        let mut engine = Engine::new(&grammar, tokens, ());
                        if let Some(trace) = self.config.trace_sink()? {
                            engine = engine.with_trace(trace);
                        }
                        match engine.run() {
                            Ok(State::Accepted) => println!("accept"),
                            Ok(_) => println!("reject"),
                            Err(never) => match never {},
                        }
                    }
                }
            }
        }

        Ok(())
    }

    pub fn run(&mut self) -> std::result::Result<(), Box<dyn Error>> {
        match self.config.task.take() {
            Some(task) => Ok(self.run_task(task)?),
            None => self.repl(),
        }
    }

    fn repl(&mut self) -> std::result::Result<(), Box<dyn Error>> {
        let history = self.config.history.clone();
        let mut rl = Editor::<()>::new();
        if rl.load_history(&history).is_err() {
            println!("No previous history.");
        }

        loop {
            let readline = rl.readline(">> ");
            match readline {
                Ok(line) if line.trim().is_empty() => {}
                Ok(line) => {
                    rl.add_history_entry(line.as_str());

                    let result = Command::parse(line.as_str())
                        .map_err(CommandError::from)
                        .and_then(|command| self.execute(command));

                    if let Err(e) = result {
                        println!("{}", e);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    println!("Error: {:?}", err);
                    break;
                }
            }
        }
        rl.save_history(&history)?;

        Ok(())
    }
}

mod parse {
    // Input ::= Tokens | Parse | Tree | Code | Symbols | Grammar | Run
    // Tokens ::= ':tokens' Source
    // Parse ::= ':parse' Source
    // Tree ::= ':tree' Nonterminal Source
    // Code ::= ':code' Source
    // Symbols ::= ':symbols' Source
    // Grammar ::= ':grammar'
    // Run ::= ':run' Source | Source

    use super::Command;
    use crate::syntax::{spaces, word, Input, Parsed};

    use nom::branch::alt;
    use nom::bytes::complete::tag;
    use nom::combinator::{map, rest};
    use nom::sequence::{pair, preceded};

    fn source(input: Input) -> Parsed<String> {
        map(rest, |s: Input| s.trim().to_string())(input)
    }

    pub fn input_line(input: Input) -> Parsed<Command> {
        preceded(
            spaces,
            alt((
                command(":tokens", map(source, Command::ShowTokens)),
                command(":parse", map(source, Command::Parse)),
                command(
                    ":tree",
                    map(pair(word, source), |(nonterminal, source)| {
                        Command::ShowTree {
                            nonterminal: nonterminal.to_string(),
                            source,
                        }
                    }),
                ),
                command(":code", map(source, Command::ShowCode)),
                command(":symbols", map(source, Command::ShowSymbols)),
                command(":grammar", map(spaces, |_| Command::ShowGrammar)),
                command(":run", map(source, Command::Run)),
                map(source, Command::Run),
            )),
        )(input)
    }

    fn command<'a, P>(prefix: &'a str, parser: P) -> impl Fn(Input<'a>) -> Parsed<Command>
    where
        P: Fn(Input<'a>) -> Parsed<Command>,
    {
        preceded(tag(prefix), parser)
    }

}
