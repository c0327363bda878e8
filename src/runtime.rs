//! Fixed assembly fragments: program prologue and epilogue, the overflow
//! trap, and the software arithmetic routines generated code calls into.
//!
//! Register model shared with the parser:
//! - `%eax` holds the operand just parsed (A).
//! - `%edx` holds the running result of the current level (D).
//! - `%r11d` is the calculator memory (M). No routine here touches `%r11`.
//!
//! Every arithmetic routine is a leaf with respect to libc, so only the
//! printing paths care about 16-byte stack alignment.

use crate::target::Target;

/// Label of the shared runtime error path.
pub const TRAP: &str = "L_overflow";
pub const ABS: &str = "abs32";
pub const MUL: &str = "mul32";
pub const DIVMOD: &str = "div32";

/// Data, text section header and the entry of `main` with A, D and M zeroed.
pub fn prologue(target: &Target) -> String {
  let mut asm = String::new();
  asm.push_str(".att_syntax prefix\n");
  asm.push_str(&format!(".extern {}\n", target.printf_symbol));
  asm.push_str(&format!(".extern {}\n", target.exit_symbol));
  asm.push_str(&format!("{}\n", target.cstring_section));
  asm.push_str("L_fmt:\n");
  asm.push_str("    .asciz \"%d\\n\"\n");
  asm.push_str("L_err:\n");
  asm.push_str("    .asciz \"E\\n\"\n");
  asm.push_str(".text\n");
  asm.push_str(&format!(".globl {}\n", target.main_symbol));
  asm.push_str(&format!("{}:\n", target.main_symbol));
  asm.push_str("    pushq %rbp\n");
  asm.push_str("    movq %rsp, %rbp\n");
  asm.push_str("    xorl %eax, %eax\n");
  asm.push_str("    xorl %edx, %edx\n");
  asm.push_str("    xorl %r11d, %r11d\n");
  asm
}

/// Print D and return 0 from `main`, followed by the trap path which prints
/// `E` and exits with status 1 from any stack depth.
pub fn epilogue(target: &Target) -> String {
  let mut asm = String::new();
  asm.push_str("    movl %edx, %esi\n");
  asm.push_str("    leaq L_fmt(%rip), %rdi\n");
  asm.push_str("    xorl %eax, %eax\n");
  asm.push_str(&format!("    callq {}\n", target.printf_symbol));
  asm.push_str("    xorl %eax, %eax\n");
  asm.push_str("    leave\n");
  asm.push_str("    ret\n");
  asm.push_str(&format!("{TRAP}:\n"));
  asm.push_str("    andq $-16, %rsp\n");
  asm.push_str("    leaq L_err(%rip), %rdi\n");
  asm.push_str("    xorl %eax, %eax\n");
  asm.push_str(&format!("    callq {}\n", target.printf_symbol));
  asm.push_str("    movl $1, %edi\n");
  asm.push_str(&format!("    callq {}\n", target.exit_symbol));
  asm
}

/// `abs32(edi) -> eax`, branch-free via `(x ^ m) - m` with `m = x >> 31`.
/// Clobbers `%ecx`. `abs32(INT_MIN)` is `0x80000000`, the correct magnitude
/// when read unsigned.
const ABS32: &str = "\
abs32:
    movl %edi, %eax
    movl %edi, %ecx
    sarl $31, %ecx
    xorl %ecx, %eax
    subl %ecx, %eax
    ret
";

/// `mul32(edi, esi) -> rax`, the full 64-bit signed product.
///
/// Shift-and-add over the magnitudes, then the sign of `edi ^ esi` is applied
/// to the 64-bit result. Callers compare `rax` against its sign-extended low
/// half to detect 32-bit overflow. Preserves `%rdx`, `%edi`, `%esi`.
const MUL32: &str = "\
mul32:
    pushq %rbp
    movq %rsp, %rbp
    callq abs32
    movl %eax, %r8d
    movl %edi, %r9d
    movl %esi, %edi
    callq abs32
    movl %r9d, %edi
    movl %eax, %r9d
    xorq %rax, %rax
    movl $32, %ecx
.L_mul32_loop:
    shrl $1, %r9d
    jnc .L_mul32_skip
    addq %r8, %rax
.L_mul32_skip:
    shlq $1, %r8
    decl %ecx
    jnz .L_mul32_loop
    movl %edi, %ecx
    xorl %esi, %ecx
    jns .L_mul32_end
    negq %rax
.L_mul32_end:
    leave
    ret
";

/// `div32(edi, esi) -> (eax quotient, edx remainder)`.
///
/// Restoring long division over the magnitudes. The quotient takes the sign
/// of `edi ^ esi`, the remainder the sign of the dividend. Division by zero
/// and `INT_MIN / -1` jump to the trap.
const DIV32: &str = "\
div32:
    pushq %rbp
    movq %rsp, %rbp
    testl %esi, %esi
    je L_overflow
    cmpl $-1, %esi
    jne .L_div32_start
    cmpl $0x80000000, %edi
    je L_overflow
.L_div32_start:
    callq abs32
    movl %eax, %r8d
    movl %edi, %r9d
    movl %esi, %edi
    callq abs32
    movl %r9d, %edi
    movl %eax, %r9d
    xorl %eax, %eax
    xorl %edx, %edx
    movl $32, %ecx
.L_div32_loop:
    shll $1, %eax
    shll $1, %r8d
    rcll $1, %edx
    cmpl %r9d, %edx
    jb .L_div32_skip
    incl %eax
    subl %r9d, %edx
.L_div32_skip:
    decl %ecx
    jnz .L_div32_loop
    testl %edi, %edi
    jns .L_div32_remainder
    negl %edx
.L_div32_remainder:
    movl %edi, %ecx
    xorl %esi, %ecx
    jns .L_div32_end
    negl %eax
.L_div32_end:
    leave
    ret
";

/// The arithmetic library, emitted once per program.
pub fn routines() -> String {
  [DIV32, MUL32, ABS32].concat()
}

/// Hand-written body of `step(x)`: D becomes 1 when `x > 0`.
pub const STEP_BODY: [&str; 5] = [
  "    movl 16(%rbp), %ecx",
  "    testl %ecx, %ecx",
  "    jle .L_step_done",
  "    movl $1, %edx",
  ".L_step_done:",
];

/// Callable label for a user function.
pub fn function_label(name: &str) -> String {
  format!("fn_{name}")
}

/// Storage label for a variable.
pub fn variable_label(name: &str) -> String {
  format!("var_{name}")
}

/// Wrap a captured body in the uniform function frame: save `%rbp`, zero A
/// and D, run the body, return D.
pub fn function_frame(name: &str, body: &str) -> String {
  let mut asm = String::new();
  asm.push_str(&format!("{}:\n", function_label(name)));
  asm.push_str("    pushq %rbp\n");
  asm.push_str("    movq %rsp, %rbp\n");
  asm.push_str("    xorl %eax, %eax\n");
  asm.push_str("    xorl %edx, %edx\n");
  asm.push_str(body);
  asm.push_str("    movl %edx, %eax\n");
  asm.push_str("    leave\n");
  asm.push_str("    ret\n");
  asm
}

/// Zero-initialised 32-bit storage cells, one per variable.
pub fn variable_storage<'a>(target: &Target, names: impl Iterator<Item = &'a str>) -> String {
  let mut asm = String::new();
  for name in names {
    if asm.is_empty() {
      asm.push_str(&format!("{}\n", target.data_section));
    }
    asm.push_str("    .balign 4\n");
    asm.push_str(&format!("{}:\n", variable_label(name)));
    asm.push_str("    .long 0\n");
  }
  asm
}
