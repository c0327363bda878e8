#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use calcc::{CompileOptions, Target};

static NEXT_ARTIFACT: AtomicUsize = AtomicUsize::new(0);

/// Compile for an explicit target so assertions on symbol names are stable.
pub fn compile_for(expr: &str, target: Target) -> String {
  let options = CompileOptions::default().with_target(target);
  match calcc::generate_assembly_with(expr, &options) {
    Ok(asm) => asm,
    Err(err) => panic!("{expr:?} failed to compile:\n{err}"),
  }
}

pub fn compile(expr: &str) -> String {
  compile_for(expr, Target::linux())
}

/// Output of running a compiled program.
#[derive(Debug, PartialEq, Eq)]
pub struct Run {
  pub stdout: String,
  pub status: i32,
}

/// Assemble `expr` with the system C compiler and run it.
///
/// Returns `None` when the host cannot execute the generated x86-64 code or
/// has no `cc`.
pub fn run(expr: &str) -> Option<Run> {
  if !cfg!(target_arch = "x86_64") || !(cfg!(target_os = "linux") || cfg!(target_os = "macos")) {
    return None;
  }
  let asm = compile_for(expr, Target::host());

  let id = NEXT_ARTIFACT.fetch_add(1, Ordering::Relaxed);
  let stem = format!("calcc-{}-{id}", std::process::id());
  let dir = std::env::temp_dir();
  let source: PathBuf = dir.join(format!("{stem}.s"));
  let binary: PathBuf = dir.join(stem);
  fs::write(&source, asm).expect("failed to write assembly");

  let Ok(build) = Command::new("cc").arg(&source).arg("-o").arg(&binary).output() else {
    let _ = fs::remove_file(&source);
    return None;
  };
  assert!(
    build.status.success(),
    "cc rejected the output for {expr:?}:\n{}",
    String::from_utf8_lossy(&build.stderr)
  );

  let out = Command::new(&binary).output().expect("failed to run compiled program");
  let _ = fs::remove_file(&source);
  let _ = fs::remove_file(&binary);
  Some(Run {
    stdout: String::from_utf8(out.stdout).expect("program output is not UTF-8"),
    status: out.status.code().unwrap_or(-1),
  })
}

/// Assert the program prints `value` and exits 0. Skips when unsupported.
pub fn assert_prints(expr: &str, value: i32) {
  if let Some(run) = run(expr) {
    assert_eq!(
      run,
      Run {
        stdout: format!("{value}\n"),
        status: 0
      },
      "running {expr:?}"
    );
  }
}

/// Assert the program hits the runtime trap. Skips when unsupported.
pub fn assert_traps(expr: &str) {
  if let Some(run) = run(expr) {
    assert_eq!(
      run,
      Run {
        stdout: "E\n".to_string(),
        status: 1
      },
      "running {expr:?}"
    );
  }
}

/// Call sites in `main` and in function bodies whose `%rsp` is not 16-byte
/// aligned, found by replaying every stack adjustment in the listing.
pub fn misaligned_calls(asm: &str) -> Vec<String> {
  let mut offset: Option<i64> = None;
  let mut misaligned = Vec::new();
  for line in asm.lines() {
    if !line.starts_with(' ') && line.ends_with(':') {
      let label = &line[..line.len() - 1];
      let entry = matches!(label, "main" | "_main") || label.starts_with("fn_");
      // The return address is already on the stack at every entry.
      offset = entry.then_some(8);
      continue;
    }
    let Some(depth) = offset.as_mut() else {
      continue;
    };
    let insn = line.trim();
    if insn.starts_with("pushq ") {
      *depth += 8;
    } else if insn.starts_with("popq ") {
      *depth -= 8;
    } else if let Some(bytes) = stack_adjustment(insn, "subq $") {
      *depth += bytes;
    } else if let Some(bytes) = stack_adjustment(insn, "addq $") {
      *depth -= bytes;
    } else if insn.starts_with("callq fn_") || insn.ends_with("printf") {
      if *depth % 16 != 0 {
        misaligned.push(format!("{insn} at offset {depth}"));
      }
    } else if insn == "leave" {
      offset = None;
    }
  }
  misaligned
}

/// Frames (`main` or `fn_*`) whose `%rsp` at `leave` differs from the value
/// right after entry, with the leftover byte count.
pub fn unbalanced_frames(asm: &str) -> Vec<String> {
  let mut frame: Option<(&str, i64)> = None;
  let mut unbalanced = Vec::new();
  for line in asm.lines() {
    if !line.starts_with(' ') && line.ends_with(':') {
      let label = &line[..line.len() - 1];
      let entry = matches!(label, "main" | "_main") || label.starts_with("fn_");
      frame = entry.then_some((label, 0));
      continue;
    }
    let Some((label, depth)) = frame.as_mut() else {
      continue;
    };
    let insn = line.trim();
    if insn.starts_with("pushq ") {
      *depth += 8;
    } else if insn.starts_with("popq ") {
      *depth -= 8;
    } else if let Some(bytes) = stack_adjustment(insn, "subq $") {
      *depth += bytes;
    } else if let Some(bytes) = stack_adjustment(insn, "addq $") {
      *depth -= bytes;
    } else if insn == "leave" {
      // `pushq %rbp` from the prologue is the only entry left.
      if *depth != 8 {
        unbalanced.push(format!("{label}: {} bytes left at leave", *depth - 8));
      }
      frame = None;
    }
  }
  unbalanced
}

fn stack_adjustment(insn: &str, prefix: &str) -> Option<i64> {
  insn
    .strip_prefix(prefix)?
    .strip_suffix(", %rsp")?
    .parse()
    .ok()
}
