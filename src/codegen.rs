//! Program assembly: glue the generated pieces into one listing.
//!
//! Layout of the output:
//! 1. prologue (sections, format strings, entry of `main`),
//! 2. the body of `main` as emitted in direct mode,
//! 3. the epilogue printing D and the shared trap path,
//! 4. the arithmetic runtime,
//! 5. every function body in registration order,
//! 6. variable storage.

use tracing::debug;

use crate::context::CompileContext;
use crate::runtime;
use crate::target::Target;

/// Emit the final listing for a fully parsed program.
pub fn generate(ctx: &CompileContext, target: &Target) -> String {
  let mut asm = runtime::prologue(target);
  asm.push_str(ctx.body.as_str());
  asm.push_str(&runtime::epilogue(target));
  asm.push_str(&runtime::routines());

  for func in ctx.functions.iter() {
    asm.push_str(&runtime::function_frame(&func.name, func.body.as_str()));
  }

  asm.push_str(&runtime::variable_storage(target, ctx.variables.iter()));
  if let Some(trailer) = target.trailer {
    asm.push_str(trailer);
    asm.push('\n');
  }

  debug!(
    functions = ctx.functions.len(),
    variables = ctx.variables.len(),
    bytes = asm.len(),
    "assembled program"
  );
  asm
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Limits;
  use crate::emit::Emitter;

  #[test]
  fn sections_appear_in_fixed_order() {
    let mut ctx = CompileContext::new(Limits::default());
    ctx.body.append("    # body").unwrap();
    ctx.open_function("f", 0).unwrap();
    ctx.emit("    # inside f").unwrap();
    ctx.close_function();
    ctx.register_variable("x").unwrap();

    let asm = generate(&ctx, &Target::linux());
    let position = |needle: &str| asm.find(needle).unwrap();
    assert!(position("main:") < position("    # body"));
    assert!(position("    # body") < position("L_overflow:"));
    assert!(position("L_overflow:") < position("div32:"));
    assert!(position("abs32:") < position("fn_f:"));
    assert!(position("    # inside f") < position("var_x:"));
    assert!(asm.ends_with("@progbits\n"));
  }
}
