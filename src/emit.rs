//! Emission channel: where generated instruction text goes.
//!
//! Code is either written straight into the program body or captured into the
//! body of the function currently being defined. Both destinations implement
//! [`Emitter`]; the compilation context picks one per append based on its
//! [`EmissionMode`].

use crate::error::LimitError;
use crate::symbols::FunctionId;

/// Sink for one line of assembly text.
pub trait Emitter {
  fn append(&mut self, line: &str) -> Result<(), LimitError>;
}

/// Current destination of generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmissionMode {
  #[default]
  Direct,
  Buffered(FunctionId),
}

/// Executable body of `main`, unbounded.
#[derive(Debug, Default)]
pub struct ProgramText {
  text: String,
}

impl ProgramText {
  pub fn as_str(&self) -> &str {
    &self.text
  }
}

impl Emitter for ProgramText {
  fn append(&mut self, line: &str) -> Result<(), LimitError> {
    self.text.push_str(line);
    self.text.push('\n');
    Ok(())
  }
}

/// Append-only instruction text of a function, capacity-checked.
#[derive(Debug)]
pub struct CapturedBody {
  text: String,
  capacity: usize,
}

impl CapturedBody {
  pub fn new(capacity: usize) -> Self {
    Self {
      text: String::new(),
      capacity,
    }
  }

  pub fn as_str(&self) -> &str {
    &self.text
  }

  pub fn clear(&mut self) {
    self.text.clear();
  }
}

impl Emitter for CapturedBody {
  fn append(&mut self, line: &str) -> Result<(), LimitError> {
    if self.text.len() + line.len() + 1 > self.capacity {
      return Err(LimitError::new("function body size", self.capacity));
    }
    self.text.push_str(line);
    self.text.push('\n');
    Ok(())
  }
}
