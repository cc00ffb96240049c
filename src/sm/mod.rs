mod machine;
mod program;

pub use self::machine::{Fault, FaultKind, StackMachine};
pub use self::program::{Cell, LoadError, Opcode, Program};
