//! Platform naming conventions for the emitted assembly.
//!
//! Symbol prefixes and section directives differ between ELF and Mach-O
//! toolchains; everything else in the output is identical.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
  pub main_symbol: &'static str,
  pub printf_symbol: &'static str,
  pub exit_symbol: &'static str,
  pub cstring_section: &'static str,
  pub data_section: &'static str,
  /// Trailing directive appended after everything else, if any.
  pub trailer: Option<&'static str>,
}

impl Target {
  pub fn linux() -> Self {
    Self {
      main_symbol: "main",
      printf_symbol: "printf",
      exit_symbol: "exit",
      cstring_section: ".section .rodata",
      data_section: ".data",
      trailer: Some(".section .note.GNU-stack,\"\",@progbits"),
    }
  }

  pub fn macos() -> Self {
    Self {
      main_symbol: "_main",
      printf_symbol: "_printf",
      exit_symbol: "_exit",
      cstring_section: ".section __TEXT,__cstring",
      data_section: ".section __DATA,__data",
      trailer: None,
    }
  }

  /// Conventions of the machine running the compiler.
  pub fn host() -> Self {
    if cfg!(target_os = "macos") {
      Self::macos()
    } else {
      Self::linux()
    }
  }
}

impl Default for Target {
  fn default() -> Self {
    Self::host()
  }
}
