//! Crate root: wires together the compilation pipeline.
//!
//! A calc literal is compiled in a single pass. The pieces:
//! - `cursor` scans the input one byte at a time.
//! - `parser` parses and emits code in the same step, driving the symbol
//!   tables and the emission channel held by `context`.
//! - `builtins` compiles the standard function library before user input.
//! - `runtime` holds the fixed assembly: prologue, trap, arithmetic routines.
//! - `codegen` assembles everything into the final listing.
//! - `error` centralises diagnostics shared by the other modules.

pub mod builtins;
pub mod config;
pub mod context;
pub mod cursor;
pub mod emit;
pub mod error;
pub mod parser;
pub mod runtime;
pub mod symbols;
pub mod target;

mod codegen;

pub use config::{CompileOptions, Limits};
pub use error::{CompileError, CompileResult, LimitError};
pub use target::Target;

use context::CompileContext;
use parser::Parser;

/// Compile a calc literal into AT&T assembly for the host platform.
pub fn generate_assembly(expr: &str) -> CompileResult<String> {
  generate_assembly_with(expr, &CompileOptions::default())
}

/// Compile a calc literal with explicit target and limits.
///
/// Nothing is returned unless the whole input compiles.
pub fn generate_assembly_with(expr: &str, options: &CompileOptions) -> CompileResult<String> {
  let mut ctx = CompileContext::new(options.limits);
  builtins::preload(&mut ctx)?;
  Parser::new(expr, &mut ctx).parse_program()?;
  Ok(codegen::generate(&ctx, &options.target))
}
