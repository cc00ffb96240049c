use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::memory::Memory;
use crate::types::{Int, Real, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Quit,
    Lit,
    Load,
    Store,
    Ldi,
    Sti,
    Add,
    Sub,
    Mult,
    Div,
    Neg,
    Eq,
    Lt,
    Gt,
    Ne,
    Le,
    Ge,
    Br,
    Brl,
    Brf,
    In,
    Out,
    And,
    Or,
    Not,
    Inc,
    Dec,
}

const MNEMONICS: &[(Opcode, &str)] = &[
    (Opcode::Quit, "quit"),
    (Opcode::Lit, "lit"),
    (Opcode::Load, "load"),
    (Opcode::Store, "store"),
    (Opcode::Ldi, "ldi"),
    (Opcode::Sti, "sti"),
    (Opcode::Add, "add"),
    (Opcode::Sub, "sub"),
    (Opcode::Mult, "mult"),
    (Opcode::Div, "div"),
    (Opcode::Neg, "neg"),
    (Opcode::Eq, "eq"),
    (Opcode::Lt, "lt"),
    (Opcode::Gt, "gt"),
    (Opcode::Ne, "ne"),
    (Opcode::Le, "le"),
    (Opcode::Ge, "ge"),
    (Opcode::Br, "br"),
    (Opcode::Brl, "brl"),
    (Opcode::Brf, "brf"),
    (Opcode::In, "in"),
    (Opcode::Out, "out"),
    (Opcode::And, "and"),
    (Opcode::Or, "or"),
    (Opcode::Not, "not"),
    (Opcode::Inc, "inc"),
    (Opcode::Dec, "dec"),
];

impl Opcode {
    pub fn from_mnemonic(name: &str) -> Option<Opcode> {
        MNEMONICS
            .iter()
            .find(|(_, mnemonic)| *mnemonic == name)
            .map(|(op, _)| *op)
    }

    pub fn mnemonic(self) -> &'static str {
        MNEMONICS
            .iter()
            .find(|(op, _)| *op == self)
            .map_or("?", |(_, mnemonic)| mnemonic)
    }

    /// Instructions followed by an immediate operand in the next code slot.
    pub fn has_operand(self) -> bool {
        match self {
            Opcode::Lit | Opcode::Load | Opcode::Store | Opcode::Brl | Opcode::Inc | Opcode::Dec => {
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One slot of the code or data array.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Opcode(Opcode),
    Int(Int),
    Real(Real),
    Text(String),
    Address(usize),
    Uninitialized,
}

const UNINITIALIZED: &str = "None";

impl Cell {
    /// Reads a data cell: integer, else real, else text.
    pub fn parse_data(word: &str) -> Cell {
        if word == UNINITIALIZED {
            return Cell::Uninitialized;
        }

        Value::parse(word).into()
    }

    /// Reads a code cell; opcode mnemonics become opcodes.
    pub fn parse_code(word: &str) -> Cell {
        match Opcode::from_mnemonic(word) {
            Some(op) => Cell::Opcode(op),
            None => Self::parse_data(word),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Int(n) => *n != 0,
            Cell::Real(x) => *x != 0.0,
            Cell::Text(s) => !s.is_empty(),
            Cell::Address(_) | Cell::Opcode(_) => true,
            Cell::Uninitialized => false,
        }
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Int(n) => Cell::Int(n),
            Value::Real(x) => Cell::Real(x),
            Value::Text(s) => Cell::Text(s),
        }
    }
}

impl From<Opcode> for Cell {
    fn from(op: Opcode) -> Self {
        Cell::Opcode(op)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Int(Int::from(b))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Opcode(op) => write!(f, "{}", op),
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Real(x) => write!(f, "{:?}", x),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Address(a) => write!(f, "{}", a),
            Cell::Uninitialized => f.write_str(UNINITIALIZED),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Output of translation and input of the stack machine: a 1-indexed code
/// array plus the initial data memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    code: Vec<Cell>,
    data: Memory,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn from_parts(code: Vec<Cell>, data: Memory) -> Self {
        Program { code, data }
    }

    /// Appends a cell and returns its index.
    pub fn emit(&mut self, cell: impl Into<Cell>) -> usize {
        self.code.push(cell.into());
        self.code.len()
    }

    /// Index the next emitted cell will receive.
    pub fn next_index(&self) -> usize {
        self.code.len() + 1
    }

    pub fn code(&self) -> &[Cell] {
        &self.code
    }

    pub fn fetch(&self, index: usize) -> Option<&Cell> {
        index.checked_sub(1).and_then(|i| self.code.get(i))
    }

    pub fn patch(&mut self, index: usize, cell: Cell) -> Option<Cell> {
        let slot = index.checked_sub(1).and_then(move |i| self.code.get_mut(i))?;
        Some(std::mem::replace(slot, cell))
    }

    pub fn data(&self) -> &Memory {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Memory {
        &mut self.data
    }

    pub fn into_parts(self) -> (Vec<Cell>, Memory) {
        (self.code, self.data)
    }

    /// Parses a code file and an optional data file; one cell per line,
    /// only the first word of a line counts.
    pub fn parse(code: &str, data: Option<&str>) -> Self {
        let code = cells(code, Cell::parse_code);
        let data = Memory::from_cells(data.map_or_else(Vec::new, |d| cells(d, Cell::parse_data)));
        Program { code, data }
    }

    /// A data file that does not exist means there is no persisted memory.
    pub fn load(code: impl AsRef<Path>, data: Option<&Path>) -> Result<Self, LoadError> {
        let code = read(code.as_ref())?;
        let data = match data {
            Some(path) if path.exists() => Some(read(path)?),
            _ => None,
        };

        Ok(Self::parse(&code, data.as_deref()))
    }

    pub fn save(&self, code: impl AsRef<Path>, data: Option<&Path>) -> Result<(), LoadError> {
        write(code.as_ref(), &self.code)?;
        if let Some(path) = data {
            write(path, self.data.cells())?;
        }

        Ok(())
    }

    /// Writes just the memory image, as the machine leaves it after a run.
    pub fn save_data(memory: &Memory, path: &Path) -> Result<(), LoadError> {
        write(path, memory.cells())
    }
}

fn cells(text: &str, parse: fn(&str) -> Cell) -> Vec<Cell> {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(parse)
        .collect()
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn write(path: &Path, cells: &[Cell]) -> Result<(), LoadError> {
    let text: String = cells.iter().map(|c| format!("{}\n", c)).collect();
    std::fs::write(path, text).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut index = 1;
        while let Some(cell) = self.fetch(index) {
            match cell {
                Cell::Opcode(op) if op.has_operand() => match self.fetch(index + 1) {
                    Some(operand) => {
                        writeln!(f, "{:>4}  {} {}", index, op, operand)?;
                        index += 1;
                    }
                    None => writeln!(f, "{:>4}  {}", index, op)?,
                },
                cell => writeln!(f, "{:>4}  {}", index, cell)?,
            }
            index += 1;
        }

        write!(f, "data  {}", self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_round_trip() {
        for (op, name) in MNEMONICS {
            assert_eq!(Opcode::from_mnemonic(name), Some(*op));
            assert_eq!(op.mnemonic(), *name);
        }
        assert_eq!(Opcode::from_mnemonic("jmp"), None);
    }

    #[test]
    fn first_word_of_each_line_counts() {
        let program = Program::parse(
            "lit 1  address of x\nlit\n2.5\nsti\n\nquit trailing comment\nhello\n",
            Some("None\n-3\nword and more\n"),
        );

        assert_eq!(
            program.code(),
            &[
                Cell::Opcode(Opcode::Lit),
                Cell::Opcode(Opcode::Lit),
                Cell::Real(2.5),
                Cell::Opcode(Opcode::Sti),
                Cell::Opcode(Opcode::Quit),
                Cell::Text("hello".into()),
            ]
        );
        assert_eq!(
            program.data().cells(),
            &[Cell::Uninitialized, Cell::Int(-3), Cell::Text("word".into())]
        );
    }

    #[test]
    fn code_is_one_indexed() {
        let mut program = Program::new();

        assert_eq!(program.next_index(), 1);
        assert_eq!(program.emit(Opcode::Lit), 1);
        assert_eq!(program.emit(Cell::Uninitialized), 2);
        assert_eq!(program.fetch(0), None);
        assert_eq!(program.fetch(1), Some(&Cell::Opcode(Opcode::Lit)));
        assert_eq!(program.patch(2, Cell::Int(9)), Some(Cell::Uninitialized));
        assert_eq!(program.patch(3, Cell::Int(9)), None);
        assert_eq!(program.next_index(), 3);
    }

    #[test]
    fn missing_data_file_is_empty_memory() {
        let dir = std::env::temp_dir().join(format!("plh-program-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let code = dir.join("code");
        let data = dir.join("data");

        let mut program = Program::new();
        program.emit(Opcode::Quit);
        program.save(&code, None).unwrap();

        let loaded = Program::load(&code, Some(data.as_path())).unwrap();
        assert_eq!(loaded.code(), &[Cell::Opcode(Opcode::Quit)]);
        assert!(loaded.data().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
