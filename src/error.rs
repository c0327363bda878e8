//! Shared error utilities used across the compiler.
//!
//! Compile errors point at the offending character of the calc literal with a
//! caret. Capacity violations from the symbol tables and captured bodies are
//! raised as [`LimitError`] and anchored to the cursor by the parser.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// The literal was rejected at `column` (in characters, zero-based).
  #[snafu(display("'{literal}'\n{:>width$} {message}", "^", width = column + 2))]
  Rejected {
    literal: String,
    column: usize,
    message: String,
  },
}

impl CompileError {
  /// Reject `literal` at byte offset `loc`; offsets past the end point just
  /// after the last character.
  pub fn at(literal: &str, loc: usize, message: impl Into<String>) -> Self {
    let mut end = loc.min(literal.len());
    while !literal.is_char_boundary(end) {
      end -= 1;
    }
    Self::Rejected {
      literal: literal.to_string(),
      column: literal[..end].chars().count(),
      message: message.into(),
    }
  }

  /// The bare diagnostic, without the source line and caret.
  pub fn message(&self) -> &str {
    match self {
      Self::Rejected { message, .. } => message,
    }
  }

  pub fn column(&self) -> usize {
    match self {
      Self::Rejected { column, .. } => *column,
    }
  }
}

/// A fixed capacity of the compiler was exceeded.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("{what} exceeds the limit of {limit}"))]
pub struct LimitError {
  pub what: &'static str,
  pub limit: usize,
}

impl LimitError {
  pub fn new(what: &'static str, limit: usize) -> Self {
    Self { what, limit }
  }
}
