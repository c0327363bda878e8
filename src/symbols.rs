//! Symbol tables for variables and user functions.
//!
//! Both tables keep registration order, which is also the order storage cells
//! and function bodies appear in the final listing. Names are never removed.

use crate::config::Limits;
use crate::emit::CapturedBody;
use crate::error::LimitError;

/// Ordered set of variable names; each owns one zero-initialised cell.
#[derive(Debug)]
pub struct VariableTable {
  names: Vec<String>,
  limit: usize,
}

impl VariableTable {
  pub fn new(limits: &Limits) -> Self {
    Self {
      names: Vec::new(),
      limit: limits.max_variables,
    }
  }

  pub fn contains(&self, name: &str) -> bool {
    self.names.iter().any(|n| n == name)
  }

  /// Register `name` if it is new. Returns whether it was inserted.
  pub fn register(&mut self, name: &str) -> Result<bool, LimitError> {
    if self.contains(name) {
      return Ok(false);
    }
    if self.names.len() >= self.limit {
      return Err(LimitError::new("variable count", self.limit));
    }
    self.names.push(name.to_string());
    Ok(true)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

/// Stable index of a function table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionId(usize);

#[derive(Debug)]
pub struct Function {
  pub name: String,
  pub arity: usize,
  pub body: CapturedBody,
}

impl Function {
  /// Frame offset of argument `index` (1-based) relative to `%rbp`.
  ///
  /// Arguments are pushed left to right, so the last one sits right above
  /// the return address.
  pub fn arg_offset(&self, index: usize) -> usize {
    16 + 8 * (self.arity - index)
  }
}

#[derive(Debug)]
pub struct FunctionTable {
  entries: Vec<Function>,
  limit: usize,
  body_capacity: usize,
}

impl FunctionTable {
  pub fn new(limits: &Limits) -> Self {
    Self {
      entries: Vec::new(),
      limit: limits.max_functions,
      body_capacity: limits.max_body_bytes,
    }
  }

  pub fn lookup(&self, name: &str) -> Option<FunctionId> {
    self.entries.iter().position(|f| f.name == name).map(FunctionId)
  }

  /// Open `name` for (re)definition with an empty body.
  ///
  /// An existing slot is reused in place so the listing keeps the original
  /// registration order.
  pub fn define(&mut self, name: &str, arity: usize) -> Result<FunctionId, LimitError> {
    if let Some(id) = self.lookup(name) {
      let entry = &mut self.entries[id.0];
      entry.arity = arity;
      entry.body.clear();
      return Ok(id);
    }
    if self.entries.len() >= self.limit {
      return Err(LimitError::new("function count", self.limit));
    }
    self.entries.push(Function {
      name: name.to_string(),
      arity,
      body: CapturedBody::new(self.body_capacity),
    });
    Ok(FunctionId(self.entries.len() - 1))
  }

  pub fn get(&self, id: FunctionId) -> &Function {
    &self.entries[id.0]
  }

  pub fn get_mut(&mut self, id: FunctionId) -> &mut Function {
    &mut self.entries[id.0]
  }

  pub fn iter(&self) -> impl Iterator<Item = &Function> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
