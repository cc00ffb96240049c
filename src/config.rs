use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::grammar::{self, Grammar};
use crate::memory::DEFAULT_MEMORY_SIZE;

#[derive(Parser, Debug)]
#[command(
    name = "plh",
    version,
    about = "PL/H translator and stack machine",
    long_about = "Translates PL/H programs with an LL(1) translation scheme and runs the \
                  generated code on a stack machine. Without a subcommand an interactive \
                  session is started."
)]
pub struct Cli {
    /// Append engine and machine traces to FILE.
    #[arg(long, value_name = "FILE", global = true)]
    pub trace: Option<PathBuf>,

    /// History file of the interactive session.
    #[arg(long, value_name = "FILE", default_value = "history.txt", global = true)]
    pub history: PathBuf,

    /// Translation scheme to use instead of the bundled PL/H one.
    #[arg(long, value_name = "FILE", global = true)]
    pub scheme: Option<PathBuf>,

    /// Data memory capacity in cells.
    #[arg(long, value_name = "CELLS", default_value_t = DEFAULT_MEMORY_SIZE, global = true)]
    pub memory: usize,

    #[command(subcommand)]
    pub task: Option<Task>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Task {
    /// Translate a PL/H source file and execute it.
    Run {
        source: PathBuf,
        /// Read `get` input from FILE instead of the terminal.
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Translate a PL/H source file into code and data files.
    Translate {
        source: PathBuf,
        #[arg(long, value_name = "FILE", default_value = "codefile")]
        code: PathBuf,
        #[arg(long, value_name = "FILE", default_value = "datafile")]
        data: PathBuf,
    },
    /// Execute a code file, persisting memory in the data file if given.
    Exec {
        #[arg(default_value = "codefile")]
        code: PathBuf,
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Accept or reject a token file.
    Parse {
        tokens: PathBuf,
        /// Grammar to parse against; defaults to the translation scheme.
        #[arg(long, value_name = "FILE")]
        grammar: Option<PathBuf>,
        /// Print the phrases of this nonterminal instead of accept/reject.
        #[arg(long, value_name = "NONTERMINAL")]
        tree: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub trace: Option<PathBuf>,
    pub history: PathBuf,
    pub scheme: Option<PathBuf>,
    pub memory: usize,
    /// `None` means an interactive session.
    pub task: Option<Task>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            trace: cli.trace,
            history: cli.history,
            scheme: cli.scheme,
            memory: cli.memory,
            task: cli.task,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            trace: None,
            history: PathBuf::from("history.txt"),
            scheme: None,
            memory: DEFAULT_MEMORY_SIZE,
            task: None,
        }
    }
}

impl Config {
    pub fn load_scheme(&self) -> grammar::Result<Grammar> {
        match &self.scheme {
            Some(path) => Grammar::load(path),
            None => Grammar::plh(),
        }
    }

    /// Empties the trace file so a session starts with a fresh trace.
    pub fn reset_trace(&self) -> io::Result<()> {
        if let Some(path) = &self.trace {
            File::create(path)?;
        }
        Ok(())
    }

    pub fn trace_sink(&self) -> io::Result<Option<Box<dyn Write>>> {
        let path = match &self.trace {
            Some(path) => path,
            None => return Ok(None),
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Some(Box::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Config {
        Cli::try_parse_from(args).unwrap().into()
    }

    #[test]
    fn defaults_to_interactive_session() {
        assert_eq!(config(&["plh"]), Config::default());
    }

    #[test]
    fn global_options_follow_subcommands() {
        let config = config(&["plh", "run", "squares.plh", "--memory", "128", "--trace", "t.txt"]);

        assert_eq!(config.memory, 128);
        assert_eq!(config.trace, Some(PathBuf::from("t.txt")));
        assert_eq!(
            config.task,
            Some(Task::Run {
                source: PathBuf::from("squares.plh"),
                input: None
            })
        );
    }

    #[test]
    fn exec_defaults() {
        let config = config(&["plh", "exec"]);
        assert_eq!(
            config.task,
            Some(Task::Exec {
                code: PathBuf::from("codefile"),
                data: None,
                input: None
            })
        );
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Cli::try_parse_from(&["plh", "--memory", "lots"]).is_err());
        assert!(Cli::try_parse_from(&["plh", "translate"]).is_err());
    }
}
