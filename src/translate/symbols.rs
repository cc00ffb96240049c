use std::fmt;

use fnv::FnvHashMap;

use crate::memory::{Memory, MemoryError};
use crate::types::Var;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Scalar,
    Array,
    Label,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Scalar => "scalar",
            Kind::Array => "array",
            Kind::Label => "label",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub address: usize,
    pub kind: Kind,
    /// Number of data cells reserved at `address`.
    pub size: usize,
}

/// Identifier → storage map. Scalars, arrays and labels share one
/// namespace; the first reference to a name decides its entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    symbols: FnvHashMap<Var, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Returns the entry for `name`, allocating `size` contiguous cells in
    /// `memory` if it is new. An existing entry is returned untouched,
    /// whatever kind was asked for.
    pub fn lookup_or_create(
        &mut self,
        name: &str,
        kind: Kind,
        size: usize,
        memory: &mut Memory,
    ) -> Result<Symbol, MemoryError> {
        if let Some(symbol) = self.symbols.get(name) {
            return Ok(*symbol);
        }

        let address = memory.allocate(size)?;
        let symbol = Symbol {
            address,
            kind,
            size,
        };
        self.symbols.insert(name.to_string(), symbol);
        Ok(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Entries in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Symbol)> {
        let mut symbols: Vec<_> = self.symbols.iter().collect();
        symbols.sort_by_key(|(_, symbol)| symbol.address);
        symbols.into_iter()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.symbols.keys().map(String::len).max().unwrap_or(0);
        for (name, symbol) in self.iter() {
            writeln!(
                f,
                "{:>width$} = {} at {}, size {}",
                name,
                symbol.kind,
                symbol.address,
                symbol.size,
                width = width
            )?;
        }

        Ok(())
    }
}
