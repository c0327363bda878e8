//! Character-level scanning over the calc literal.
//!
//! The compiler never materialises tokens: the parser asks the cursor about
//! the byte under it, consumes it, and emits code on the spot. Only one byte
//! of lookahead is ever needed.

/// Monotonic position into the immutable input.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
  source: &'a str,
  pos: usize,
}

impl<'a> Cursor<'a> {
  pub fn new(source: &'a str) -> Self {
    Self { source, pos: 0 }
  }

  pub fn source(&self) -> &'a str {
    self.source
  }

  /// Byte offset of the next unread character.
  pub fn pos(&self) -> usize {
    self.pos
  }

  pub fn peek(&self) -> Option<u8> {
    self.source.as_bytes().get(self.pos).copied()
  }

  /// The byte after the current one.
  pub fn peek_next(&self) -> Option<u8> {
    self.source.as_bytes().get(self.pos + 1).copied()
  }

  pub fn is_eof(&self) -> bool {
    self.pos >= self.source.len()
  }

  /// Consume one byte and return it.
  pub fn bump(&mut self) -> Option<u8> {
    let c = self.peek()?;
    self.pos += 1;
    Some(c)
  }

  /// Consume the current byte if it equals `expected`.
  pub fn eat(&mut self, expected: u8) -> bool {
    if self.peek() == Some(expected) {
      self.pos += 1;
      return true;
    }
    false
  }

  pub fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
    while self.peek().is_some_and(&pred) {
      self.pos += 1;
    }
  }

  /// Consume a maximal run of bytes matching `pred` and return it.
  pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
    let start = self.pos;
    self.skip_while(pred);
    &self.source[start..self.pos]
  }

  /// The full character at `loc`, for diagnostics on non-ASCII input.
  pub fn char_at(&self, loc: usize) -> char {
    self.source[loc..].chars().next().unwrap_or('\0')
  }
}

pub fn is_digit(c: u8) -> bool {
  c.is_ascii_digit()
}

pub fn is_operator(c: u8) -> bool {
  matches!(c, b'+' | b'-' | b'*' | b'/' | b'%')
}

pub fn is_sign_inversion(c: u8) -> bool {
  c == b'S'
}

pub fn is_ident_char(c: u8) -> bool {
  c.is_ascii_lowercase() || c == b'_'
}

/// Value of `c` as a digit in `radix`, if it is one.
pub fn digit_value(c: u8, radix: u32) -> Option<u32> {
  let value = match c {
    b'0'..=b'9' => u32::from(c - b'0'),
    b'a'..=b'f' if radix == 16 => u32::from(c - b'a') + 10,
    _ => return None,
  };
  (value < radix).then_some(value)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookahead_does_not_consume() {
    let mut cursor = Cursor::new("->x");
    assert_eq!(cursor.peek(), Some(b'-'));
    assert_eq!(cursor.peek_next(), Some(b'>'));
    assert_eq!(cursor.pos(), 0);
    assert_eq!(cursor.bump(), Some(b'-'));
    assert!(cursor.eat(b'>'));
    assert!(!cursor.eat(b'>'));
    assert_eq!(cursor.take_while(is_ident_char), "x");
    assert!(cursor.is_eof());
    assert_eq!(cursor.bump(), None);
  }

  #[test]
  fn digits_respect_radix() {
    assert_eq!(digit_value(b'7', 8), Some(7));
    assert_eq!(digit_value(b'8', 8), None);
    assert_eq!(digit_value(b'1', 2), Some(1));
    assert_eq!(digit_value(b'2', 2), None);
    assert_eq!(digit_value(b'f', 16), Some(15));
    assert_eq!(digit_value(b'f', 10), None);
    assert_eq!(digit_value(b'g', 16), None);
  }

  #[test]
  fn classifies_calc_characters() {
    assert!("+-*/%".bytes().all(is_operator));
    assert!(!is_operator(b'='));
    assert!(is_sign_inversion(b'S'));
    assert!(is_ident_char(b'_') && is_ident_char(b'q'));
    assert!(!is_ident_char(b'C'));
  }

  #[test]
  fn reports_whole_multibyte_character() {
    let cursor = Cursor::new("1é");
    assert_eq!(cursor.char_at(1), 'é');
  }
}
