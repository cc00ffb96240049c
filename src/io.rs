use std::io::{self, BufRead, Stdin, Stdout, Write};

use crate::sm::Cell;

/// Source of lines for the `in` instruction. `Ok(None)` means the input is
/// exhausted.
pub trait InputStream {
    fn read(&mut self) -> io::Result<Option<String>>;
}

pub trait OutputStream {
    fn write(&mut self, value: &Cell) -> io::Result<()>;
}

fn strip_newline(mut line: String) -> String {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}

// IO streams implementations
impl InputStream for Stdin {
    fn read(&mut self) -> io::Result<Option<String>> {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if self.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_newline(line)))
    }
}

impl OutputStream for Stdout {
    fn write(&mut self, value: &Cell) -> io::Result<()> {
        writeln!(self, "{}", value)
    }
}

// input is consumed from the back, like a stack
impl InputStream for Vec<String> {
    fn read(&mut self) -> io::Result<Option<String>> {
        Ok(self.pop())
    }
}

impl OutputStream for Vec<String> {
    fn write(&mut self, value: &Cell) -> io::Result<()> {
        self.push(value.to_string());
        Ok(())
    }
}

/// Line input over any buffered reader, e.g. a file given on the command line.
pub struct Lines<R>(pub R);

impl<R: BufRead> InputStream for Lines<R> {
    fn read(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.0.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_newline(line)))
    }
}

pub struct EmptyInput;
impl InputStream for EmptyInput {
    fn read(&mut self) -> io::Result<Option<String>> {
        Ok(None)
    }
}

pub struct IgnoreOutput;
impl OutputStream for IgnoreOutput {
    fn write(&mut self, _: &Cell) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_strip_line_breaks() {
        let mut input = Lines("12\r\nhello\n\nlast".as_bytes());

        assert_eq!(input.read().unwrap(), Some("12".to_string()));
        assert_eq!(input.read().unwrap(), Some("hello".to_string()));
        assert_eq!(input.read().unwrap(), Some(String::new()));
        assert_eq!(input.read().unwrap(), Some("last".to_string()));
        assert_eq!(input.read().unwrap(), None);
    }

    #[test]
    fn vectors_collect_rendered_cells() {
        let mut output: Vec<String> = Vec::new();
        output.write(&Cell::Real(1.0)).unwrap();
        output.write(&Cell::Uninitialized).unwrap();
        assert_eq!(output, vec!["1.0".to_string(), "None".to_string()]);
    }
}
