//! Compilation options: output target and capacity bounds.

use crate::target::Target;

/// Capacity bounds of one compilation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
  /// Parentheses and call argument lists open at once.
  pub max_nesting: usize,
  pub max_name_len: usize,
  pub max_variables: usize,
  pub max_functions: usize,
  pub max_arity: usize,
  /// Bytes of instruction text captured per function body.
  pub max_body_bytes: usize,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_nesting: 128,
      max_name_len: 16,
      max_variables: 128,
      max_functions: 64,
      max_arity: 16,
      max_body_bytes: 64 * 1024,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
  pub target: Target,
  pub limits: Limits,
}

impl CompileOptions {
  pub fn with_target(mut self, target: Target) -> Self {
    self.target = target;
    self
  }

  pub fn with_limits(mut self, limits: Limits) -> Self {
    self.limits = limits;
    self
  }
}
