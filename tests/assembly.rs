//! Structural checks on complete listings, independent of the host.

mod common;

use calcc::{CompileOptions, Limits, Target};
use common::{compile, compile_for, misaligned_calls, unbalanced_frames};

#[test]
fn listing_contains_runtime_library_functions_and_storage() {
  let asm = compile("3->x;x+1=");
  for label in ["main:", "L_overflow:", "div32:", "mul32:", "abs32:", "fn_step:", "fn_if:", "var_x:"] {
    assert_eq!(
      asm.lines().filter(|line| *line == label).count(),
      1,
      "{label} should be defined exactly once"
    );
  }
  assert!(asm.contains(".data\n    .balign 4\nvar_x:\n    .long 0\n"));
}

#[test]
fn macos_listing_uses_prefixed_symbols() {
  let asm = compile_for("1=", Target::macos());
  assert!(asm.contains(".globl _main\n_main:\n"));
  assert!(asm.contains("callq _printf"));
  assert!(asm.contains("callq _exit"));
  assert!(asm.contains(".section __TEXT,__cstring"));
  assert!(!asm.contains("GNU-stack"));
}

#[test]
fn builtin_library_calls_are_aligned() {
  assert_eq!(misaligned_calls(&compile("1=")), Vec::<String>::new());
}

#[test]
fn nested_calls_and_parentheses_are_aligned() {
  for expr in [
    "@max(3,@min(5,2))=",
    "(@abs(S2))=",
    "((@if(1,(2),@gt((3),4))))=",
    "!f[0]:(@abs(1));!g[2]:@f()+((#1));@g(1,(@g(2,3)))=",
    "@max(@min(1,2),(3+(4*@abs(S2))))=",
  ] {
    let asm = compile(expr);
    assert_eq!(misaligned_calls(&asm), Vec::<String>::new(), "{expr}");
  }
}

#[test]
fn stack_is_restored_before_every_leave() {
  for expr in [
    "(1+(2*@max(3,(4))))*@min(5,6)=",
    "!f[3]:#1+#2+#3;@f(1,@f(2,3,4),5)*(@f(6,7,8))=",
    "(1+(2=",
  ] {
    let asm = compile(expr);
    assert_eq!(unbalanced_frames(&asm), Vec::<String>::new(), "{expr}");
  }
}

#[test]
fn trailing_recall_discards_saved_results() {
  let asm = compile("5P((R");
  assert_eq!(unbalanced_frames(&asm), Vec::<String>::new());
}

#[test]
fn default_options_target_the_host() {
  let asm = calcc::generate_assembly("1=").unwrap();
  let expected = CompileOptions::default().target.main_symbol;
  assert!(asm.contains(&format!(".globl {expected}\n")));
}

#[test]
fn custom_limits_reach_the_parser() {
  let options = CompileOptions::default().with_limits(Limits {
    max_variables: 1,
    ..Limits::default()
  });
  let err = calcc::generate_assembly_with("1->a;2->b=", &options).unwrap_err();
  assert_eq!(err.message(), "variable count exceeds the limit of 1");
}
