//! State of one compilation run.
//!
//! Symbol tables, the program body, and the emission mode live here instead of
//! in globals. A fresh context is created per run and handed to every parser
//! that contributes code to the program (builtin library first, user input
//! second).

use tracing::{debug, trace};

use crate::config::Limits;
use crate::emit::{EmissionMode, Emitter, ProgramText};
use crate::error::LimitError;
use crate::symbols::{FunctionId, FunctionTable, VariableTable};

#[derive(Debug)]
pub struct CompileContext {
  pub limits: Limits,
  pub variables: VariableTable,
  pub functions: FunctionTable,
  pub body: ProgramText,
  mode: EmissionMode,
}

impl CompileContext {
  pub fn new(limits: Limits) -> Self {
    Self {
      variables: VariableTable::new(&limits),
      functions: FunctionTable::new(&limits),
      body: ProgramText::default(),
      mode: EmissionMode::Direct,
      limits,
    }
  }

  pub fn mode(&self) -> EmissionMode {
    self.mode
  }

  /// The function whose body is being captured, if any.
  pub fn current_function(&self) -> Option<FunctionId> {
    match self.mode {
      EmissionMode::Direct => None,
      EmissionMode::Buffered(id) => Some(id),
    }
  }

  /// Destination selected by the current emission mode.
  pub fn channel(&mut self) -> &mut dyn Emitter {
    match self.mode {
      EmissionMode::Direct => &mut self.body as &mut dyn Emitter,
      EmissionMode::Buffered(id) => &mut self.functions.get_mut(id).body,
    }
  }

  pub fn emit(&mut self, line: &str) -> Result<(), LimitError> {
    self.channel().append(line)
  }

  /// Start capturing a (re)definition of `name`.
  pub fn open_function(&mut self, name: &str, arity: usize) -> Result<FunctionId, LimitError> {
    let id = self.functions.define(name, arity)?;
    debug!(name, arity, "defining function");
    self.mode = EmissionMode::Buffered(id);
    Ok(id)
  }

  /// Seal the open definition, if any, and return to direct emission.
  pub fn close_function(&mut self) {
    if let EmissionMode::Buffered(id) = self.mode {
      trace!(name = %self.functions.get(id).name, "sealed function body");
      self.mode = EmissionMode::Direct;
    }
  }

  pub fn register_variable(&mut self, name: &str) -> Result<(), LimitError> {
    if self.variables.register(name)? {
      debug!(name, "registered variable");
    }
    Ok(())
  }
}
