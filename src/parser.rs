//! Single-pass parser and code generator for calc literals.
//!
//! There is no token stream and no AST: the parser looks at one character at
//! a time and immediately emits the instructions it implies. Flat-precedence
//! evaluation uses two registers, A (`%eax`, the operand just parsed) and D
//! (`%edx`, the result accumulated at the current nesting level), plus the
//! formula state below, which remembers the operator and sign that will be
//! applied when A is committed into D.
//!
//! Nesting (parentheses and call arguments) recurses with the depth and the
//! compile-time 16-byte alignment parity of `%rsp`, so every user call site can
//! be aligned with at most one padding adjustment.

use tracing::debug;

use crate::context::CompileContext;
use crate::cursor::{Cursor, digit_value, is_digit, is_ident_char, is_operator, is_sign_inversion};
use crate::error::{CompileError, CompileResult, LimitError};
use crate::runtime::{DIVMOD, MUL, TRAP, function_label, variable_label};

/// Arithmetic operators, in the order they appear in the calc literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
}

impl Op {
  fn from_byte(c: u8) -> Option<Self> {
    match c {
      b'+' => Some(Self::Add),
      b'-' => Some(Self::Sub),
      b'*' => Some(Self::Mul),
      b'/' => Some(Self::Div),
      b'%' => Some(Self::Mod),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
  Positive,
  Negative,
}

impl Sign {
  fn toggled(self) -> Self {
    match self {
      Self::Positive => Self::Negative,
      Self::Negative => Self::Positive,
    }
  }
}

/// Operator and sign pending for the term being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Formula {
  op: Op,
  sign: Sign,
}

impl Default for Formula {
  fn default() -> Self {
    Self {
      op: Op::Add,
      sign: Sign::Positive,
    }
  }
}

/// Why a nested expression stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
  Equals,
  Close,
  Comma,
  End,
  /// Input ended right after `R`; D already holds the final result.
  Recall,
}

pub struct Parser<'a> {
  cursor: Cursor<'a>,
  ctx: &'a mut CompileContext,
  /// Length of the main body when its A and D were last known to be zero.
  clean_main: usize,
}

impl<'a> Parser<'a> {
  pub fn new(source: &'a str, ctx: &'a mut CompileContext) -> Self {
    let clean_main = ctx.body.as_str().len();
    Self {
      cursor: Cursor::new(source),
      ctx,
      clean_main,
    }
  }

  /// Compile the whole input as top-level statements.
  ///
  /// Returns once the outermost `=` or the end of input is reached; an open
  /// function definition is sealed first.
  pub fn parse_program(mut self) -> CompileResult<()> {
    let stop = self.expression(0, true)?;
    let loc = self.cursor.pos().saturating_sub(1);
    match stop {
      Stop::Equals | Stop::End | Stop::Recall => {
        self.ctx.close_function();
        if !self.cursor.is_eof() {
          debug!(rest = &self.cursor.source()[self.cursor.pos()..], "ignoring input after '='");
        }
        Ok(())
      }
      Stop::Close => Err(self.error_at(loc, "unmatched ')'")),
      Stop::Comma => Err(self.error_at(loc, "',' outside of an argument list")),
    }
  }

  /// Parse one expression level until a terminator that belongs to the caller.
  fn expression(&mut self, depth: usize, aligned: bool) -> CompileResult<Stop> {
    let mut formula = Formula::default();

    while let Some(c) = self.cursor.peek() {
      let loc = self.cursor.pos();
      match c {
        b'0'..=b'9' => self.number()?,
        b'-' if self.cursor.peek_next() == Some(b'>') => {
          self.cursor.bump();
          self.cursor.bump();
          self.commit(formula)?;
          self.store(loc)?;
          self.reset(&mut formula)?;
        }
        c if is_operator(c) => {
          // Of a run of operators only the last one counts.
          while self.cursor.peek_next().is_some_and(is_operator) {
            self.cursor.bump();
          }
          self.commit(formula)?;
          self.reset(&mut formula)?;
          if let Some(op) = self.cursor.bump().and_then(Op::from_byte) {
            formula.op = op;
          }
          // Sign inversions right after an operator are discarded.
          self.cursor.skip_while(is_sign_inversion);
        }
        b' ' => {
          self.cursor.bump();
        }
        c if is_sign_inversion(c) => {
          self.cursor.bump();
          formula.sign = formula.sign.toggled();
        }
        b'=' => {
          self.commit(formula)?;
          // A nested `=` stays put so every enclosing level commits and stops.
          if depth == 0 {
            self.cursor.bump();
          }
          return Ok(Stop::Equals);
        }
        b';' => {
          if depth > 0 {
            return Err(self.error_at(loc, "';' inside parentheses"));
          }
          self.cursor.bump();
          self.commit(formula)?;
          if self.ctx.current_function().is_some() {
            self.ctx.close_function();
            formula = Formula::default();
          } else {
            self.emit("    xorl %edx, %edx")?;
            self.reset(&mut formula)?;
            self.clean_main = self.ctx.body.as_str().len();
          }
        }
        b'C' => {
          self.cursor.bump();
          self.emit("    xorl %edx, %edx")?;
          self.emit("    xorl %r11d, %r11d")?;
          self.reset(&mut formula)?;
        }
        b'R' => {
          self.cursor.bump();
          self.emit("    movl %r11d, %edx")?;
          if self.cursor.is_eof() {
            return Ok(Stop::Recall);
          }
          self.reset(&mut formula)?;
        }
        b'P' | b'M' => {
          self.cursor.bump();
          self.commit(formula)?;
          self.emit("    movl %r11d, %eax")?;
          self.emit(if c == b'P' {
            "    addl %edx, %eax"
          } else {
            "    subl %edx, %eax"
          })?;
          self.emit(&format!("    jo {TRAP}"))?;
          self.emit("    movl %eax, %r11d")?;
          self.emit("    xorl %edx, %edx")?;
          self.reset(&mut formula)?;
        }
        b'(' => {
          self.cursor.bump();
          if let Some(stop) = self.parenthesized(loc, depth, aligned)? {
            return Ok(stop);
          }
        }
        b')' => {
          self.cursor.bump();
          self.commit(formula)?;
          return Ok(Stop::Close);
        }
        b',' => {
          self.cursor.bump();
          self.commit(formula)?;
          return Ok(Stop::Comma);
        }
        b'#' => {
          self.cursor.bump();
          self.argument(loc)?;
        }
        b'@' => {
          self.cursor.bump();
          self.call(loc, depth, aligned)?;
        }
        b'!' => {
          self.cursor.bump();
          self.definition(loc, depth)?;
          formula = Formula::default();
        }
        c if is_ident_char(c) => self.variable(loc)?,
        _ => {
          let invalid = self.cursor.char_at(loc);
          return Err(self.error_at(loc, format!("invalid character: '{invalid}'")));
        }
      }
    }

    self.commit(formula)?;
    Ok(Stop::End)
  }

  /// Fold a literal into A digit by digit, trapping on overflow.
  fn number(&mut self) -> CompileResult<()> {
    let start = self.cursor.pos();
    let mut radix = 10;
    if self.cursor.eat(b'0') {
      match self.cursor.peek() {
        Some(b'x') => {
          self.cursor.bump();
          radix = 16;
        }
        Some(b'b') => {
          self.cursor.bump();
          radix = 2;
        }
        Some(c) if is_digit(c) => radix = 8,
        _ => return self.emit("    xorl %eax, %eax"),
      }
    }

    let mut digits = 0;
    while let Some(value) = self.cursor.peek().and_then(|c| digit_value(c, radix)) {
      self.emit("    movl %eax, %edi")?;
      self.emit(&format!("    movl ${radix}, %esi"))?;
      self.emit(&format!("    callq {MUL}"))?;
      self.check_product()?;
      self.emit(&format!("    addl ${value}, %eax"))?;
      self.emit(&format!("    jo {TRAP}"))?;
      self.cursor.bump();
      digits += 1;
    }

    let loc = self.cursor.pos();
    if let Some(c) = self.cursor.peek().filter(|&c| is_digit(c)) {
      return Err(self.error_at(
        loc,
        format!("invalid digit '{}' in base-{radix} literal", char::from(c)),
      ));
    }
    if digits == 0 {
      return Err(self.error_at(start, "missing digits after radix prefix"));
    }
    Ok(())
  }

  /// Apply the pending operator and sign: D = D op A.
  fn commit(&mut self, formula: Formula) -> CompileResult<()> {
    self.emit("    movl %eax, %esi")?;
    if formula.sign == Sign::Negative {
      self.emit("    negl %esi")?;
      self.emit(&format!("    jo {TRAP}"))?;
    }
    match formula.op {
      Op::Add => {
        self.emit("    addl %esi, %edx")?;
        self.emit(&format!("    jo {TRAP}"))?;
      }
      Op::Sub => {
        self.emit("    subl %esi, %edx")?;
        self.emit(&format!("    jo {TRAP}"))?;
      }
      Op::Mul => {
        self.emit("    movl %edx, %edi")?;
        self.emit(&format!("    callq {MUL}"))?;
        self.check_product()?;
        self.emit("    movl %eax, %edx")?;
      }
      Op::Div => {
        self.emit("    movl %edx, %edi")?;
        self.emit(&format!("    callq {DIVMOD}"))?;
        self.emit("    movl %eax, %edx")?;
      }
      Op::Mod => {
        // The remainder is already in %edx.
        self.emit("    movl %edx, %edi")?;
        self.emit(&format!("    callq {DIVMOD}"))?;
      }
    }
    Ok(())
  }

  /// Trap unless the 64-bit product in `%rax` fits in 32 bits.
  fn check_product(&mut self) -> CompileResult<()> {
    self.emit("    movslq %eax, %rcx")?;
    self.emit("    cmpq %rcx, %rax")?;
    self.emit(&format!("    jne {TRAP}"))
  }

  /// Start the next term: A = 0, operator +, sign positive.
  fn reset(&mut self, formula: &mut Formula) -> CompileResult<()> {
    *formula = Formula::default();
    self.emit("    xorl %eax, %eax")
  }

  /// `( expression )`: the inner result becomes A, the outer D is restored.
  ///
  /// `=` or the end of input also closes the group. A trailing `R` finishes
  /// the whole program, which is reported back so the caller stops too.
  fn parenthesized(
    &mut self,
    open: usize,
    depth: usize,
    aligned: bool,
  ) -> CompileResult<Option<Stop>> {
    self.enter(open, depth)?;
    self.emit("    pushq %rdx")?;
    self.emit("    xorl %edx, %edx")?;
    self.emit("    xorl %eax, %eax")?;
    match self.expression(depth + 1, !aligned)? {
      Stop::Close | Stop::Equals | Stop::End => {}
      Stop::Comma => {
        let loc = self.cursor.pos() - 1;
        return Err(self.error_at(loc, "',' outside of an argument list"));
      }
      Stop::Recall => {
        // Drop the saved D; the recalled memory is the result.
        self.emit("    addq $8, %rsp")?;
        return Ok(Some(Stop::Recall));
      }
    }
    self.emit("    movl %edx, %eax")?;
    self.emit("    popq %rdx")?;
    Ok(None)
  }

  /// `@name(arg, ...)`: evaluate arguments left to right onto the stack and
  /// call. The result becomes A.
  fn call(&mut self, at: usize, depth: usize, aligned: bool) -> CompileResult<()> {
    let name = self.identifier(at, "expected a function name after '@'")?;
    let Some(id) = self.ctx.functions.lookup(name) else {
      return Err(self.error_at(at, format!("undefined function: {name}")));
    };
    let arity = self.ctx.functions.get(id).arity;
    let open = self.cursor.pos();
    if !self.cursor.eat(b'(') {
      return Err(self.error_at(open, format!("expected '(' after @{name}")));
    }
    self.enter(open, depth)?;

    self.emit("    pushq %rdx")?;
    let mut aligned = !aligned;
    // After `arity` more pushes the stack has to be 16-byte aligned.
    let pad = aligned != (arity % 2 == 0);
    if pad {
      self.emit("    subq $8, %rsp")?;
      aligned = !aligned;
    }

    if arity == 0 && !self.cursor.eat(b')') {
      return Err(self.error_at(open, format!("@{name} takes no arguments")));
    }
    for index in 1..=arity {
      self.emit("    xorl %edx, %edx")?;
      self.emit("    xorl %eax, %eax")?;
      let stop = self.expression(depth + 1, aligned)?;
      let loc = self.cursor.pos().saturating_sub(1);
      match (stop, index == arity) {
        (Stop::Comma, false) | (Stop::Close, true) => {}
        (Stop::Comma, true) => {
          return Err(self.error_at(
            loc,
            format!("too many arguments to @{name}: expected {arity}"),
          ));
        }
        (Stop::Close, false) => {
          return Err(self.error_at(
            loc,
            format!("too few arguments to @{name}: expected {arity}, got {index}"),
          ));
        }
        (Stop::Equals | Stop::End | Stop::Recall, _) => {
          return Err(self.error_at(open, format!("unclosed argument list of @{name}")));
        }
      }
      self.emit("    pushq %rdx")?;
      aligned = !aligned;
    }
    debug_assert!(aligned, "misaligned call to @{name}");

    self.emit(&format!("    callq {}", function_label(name)))?;
    let release = 8 * (arity + usize::from(pad));
    if release > 0 {
      self.emit(&format!("    addq ${release}, %rsp"))?;
    }
    self.emit("    popq %rdx")
  }

  /// `#k`: load the k-th argument of the function being defined into A.
  fn argument(&mut self, at: usize) -> CompileResult<()> {
    let digits = self.cursor.take_while(is_digit);
    let Some(id) = self.ctx.current_function() else {
      return Err(self.error_at(at, "argument reference outside of a function body"));
    };
    let func = self.ctx.functions.get(id);
    let index = digits.parse::<usize>().ok().filter(|&k| k >= 1 && k <= func.arity);
    let Some(index) = index else {
      let message = format!(
        "invalid argument reference #{digits}: @{} takes {} argument(s)",
        func.name, func.arity
      );
      return Err(self.error_at(at, message));
    };
    let offset = func.arg_offset(index);
    self.emit(&format!("    movl {offset}(%rbp), %eax"))
  }

  /// `!name[arity]:` switches emission into the body of `name` until the
  /// statement ends.
  fn definition(&mut self, at: usize, depth: usize) -> CompileResult<()> {
    if depth > 0 {
      return Err(self.error_at(at, "function definitions must be at statement level"));
    }
    if self.ctx.current_function().is_some() {
      return Err(self.error_at(at, "nested function definitions are not supported"));
    }
    // The statement interrupted by the definition is abandoned.
    if self.ctx.body.as_str().len() != self.clean_main {
      self.emit("    xorl %edx, %edx")?;
      self.emit("    xorl %eax, %eax")?;
      self.clean_main = self.ctx.body.as_str().len();
    }
    let name = self.identifier(at, "malformed function header: expected a name after '!'")?;
    if !self.cursor.eat(b'[') {
      return Err(self.malformed_header(name));
    }
    let digits = self.cursor.take_while(is_digit);
    let Ok(arity) = digits.parse::<usize>() else {
      return Err(self.malformed_header(name));
    };
    if !self.cursor.eat(b']') || !self.cursor.eat(b':') {
      return Err(self.malformed_header(name));
    }
    let max_arity = self.ctx.limits.max_arity;
    if arity > max_arity {
      let err = LimitError::new("function arity", max_arity);
      return Err(self.error_at(at, err.to_string()));
    }
    self.ctx.open_function(name, arity).map_err(|err| self.limit(err))?;
    Ok(())
  }

  fn malformed_header(&self, name: &str) -> CompileError {
    let loc = self.cursor.pos();
    self.error_at(
      loc,
      format!("malformed function header for {name}: expected !{name}[arity]:"),
    )
  }

  /// A variable reference loads its cell into A.
  fn variable(&mut self, at: usize) -> CompileResult<()> {
    let name = self.identifier(at, "expected a variable name")?;
    if !self.ctx.variables.contains(name) {
      return Err(self.error_at(at, format!("undefined variable: {name}")));
    }
    self.emit(&format!("    movl {}(%rip), %eax", variable_label(name)))
  }

  /// `->name` stores D into the variable, registering it on first use.
  fn store(&mut self, at: usize) -> CompileResult<()> {
    let name = self.identifier(at, "expected a variable name after '->'")?;
    self.emit(&format!("    movl %edx, {}(%rip)", variable_label(name)))?;
    self.ctx.register_variable(name).map_err(|err| self.limit(err))
  }

  /// Read a non-empty, length-bounded identifier.
  fn identifier(&mut self, at: usize, missing: &str) -> CompileResult<&'a str> {
    let name = self.cursor.take_while(is_ident_char);
    if name.is_empty() {
      let loc = self.cursor.pos();
      return Err(self.error_at(loc, missing));
    }
    let max = self.ctx.limits.max_name_len;
    if name.len() > max {
      let err = LimitError::new("identifier length", max);
      return Err(self.error_at(at, format!("{err}: {name}")));
    }
    Ok(name)
  }

  /// Guard the recursion depth before opening a frame.
  fn enter(&self, open: usize, depth: usize) -> CompileResult<()> {
    let max = self.ctx.limits.max_nesting;
    if depth + 1 > max {
      let err = LimitError::new("nesting depth", max);
      return Err(self.error_at(open, err.to_string()));
    }
    Ok(())
  }

  fn emit(&mut self, line: &str) -> CompileResult<()> {
    self.ctx.emit(line).map_err(|err| self.limit(err))
  }

  fn limit(&self, err: LimitError) -> CompileError {
    self.error_at(self.cursor.pos(), err.to_string())
  }

  fn error_at(&self, loc: usize, message: impl Into<String>) -> CompileError {
    CompileError::at(self.cursor.source(), loc, message)
  }
}
