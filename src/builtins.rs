//! Functions available to every program.
//!
//! `step` is the only primitive and is written directly in assembly. The rest
//! of the library is ordinary calc source derived from it with arithmetic
//! identities, compiled into the function table before user input.

use crate::context::CompileContext;
use crate::error::{CompileError, CompileResult, LimitError};
use crate::parser::Parser;
use crate::runtime::STEP_BODY;

pub const LIBRARY: &str = concat!(
  "!sgn[1]:@step(#1)-@step(S#1);",
  "!abs[1]:@sgn(#1)*#1;",
  "!gt[2]:@step(#1-#2);",
  "!ge[2]:@step(#1-#2+1);",
  "!eq[2]:1-@abs(@sgn(#1-#2));",
  "!ne[2]:@abs(@sgn(#1-#2));",
  "!if[3]:@abs(@sgn(#1))*(#2-#3)+#3;",
  "!min[2]:@if(@gt(#1,#2),#2,#1);",
  "!max[2]:@if(@gt(#1,#2),#1,#2);",
);

/// Register `step` and compile the library into `ctx`.
pub fn preload(ctx: &mut CompileContext) -> CompileResult<()> {
  let limit = |err: LimitError| CompileError::at("step", 0, err.to_string());
  ctx.open_function("step", 1).map_err(limit)?;
  for line in STEP_BODY {
    ctx.emit(line).map_err(limit)?;
  }
  ctx.close_function();
  Parser::new(LIBRARY, ctx).parse_program()
}
