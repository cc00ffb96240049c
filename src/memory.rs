use std::fmt;

use thiserror::Error;

use crate::sm::Cell;

#[derive(Debug, Error, PartialEq)]
pub enum MemoryError {
    #[error("Out of memory")]
    OutOfMemory,

    #[error("Address {0} is out of range")]
    OutOfRange(usize),
}

type Result<T> = std::result::Result<T, MemoryError>;

pub const DEFAULT_MEMORY_SIZE: usize = 65536;

/// Flat data memory addressed from 1. Address 0 is never valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    cells: Vec<Cell>,
    size: usize,
}

impl Memory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_SIZE)
    }

    pub fn with_capacity(size: usize) -> Self {
        Memory {
            cells: Vec::new(),
            size,
        }
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        let mut memory = Self::new();
        memory.size = memory.size.max(cells.len());
        memory.cells = cells;
        memory
    }

    pub fn set_capacity(&mut self, size: usize) {
        self.size = size.max(self.cells.len());
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Address the next allocation will start at.
    pub fn next_address(&self) -> usize {
        self.cells.len() + 1
    }

    fn index(&self, address: usize) -> Result<usize> {
        if address == 0 || address > self.cells.len() {
            return Err(MemoryError::OutOfRange(address));
        }

        Ok(address - 1)
    }

    pub fn load(&self, address: usize) -> Result<&Cell> {
        let index = self.index(address)?;
        Ok(&self.cells[index])
    }

    /// Stores past the end grow the memory with uninitialized cells.
    pub fn store(&mut self, address: usize, value: Cell) -> Result<()> {
        if address == 0 {
            return Err(MemoryError::OutOfRange(address));
        }
        if address > self.size {
            return Err(MemoryError::OutOfMemory);
        }
        if address > self.cells.len() {
            self.cells.resize(address, Cell::Uninitialized);
        }

        self.cells[address - 1] = value;
        Ok(())
    }

    /// Reserves `count` contiguous uninitialized cells, returning the first
    /// address.
    pub fn allocate(&mut self, count: usize) -> Result<usize> {
        let address = self.next_address();
        if self.cells.len() + count > self.size {
            return Err(MemoryError::OutOfMemory);
        }

        self.cells
            .extend(std::iter::repeat(Cell::Uninitialized).take(count));
        Ok(address)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self.cells.iter().map(Cell::to_string).collect();
        write!(f, "{}", cells.join("\t"))
    }
}
