//! Lexical scanning over a single source text.
//!
//! The scanner is a byte cursor that both assembly passes share: the layout
//! pass walks the whole text once to place labels and record macro bodies,
//! then the cursor is rewound and the emit pass walks it again. Macro
//! expansion saves and restores whole [`Cursor`] values, so every piece of
//! position state lives in that one `Copy` struct.
//!
//! Line and column are tracked for diagnostics only. Token-beginning
//! operations latch a start line/column pair; the next diagnostic consumes
//! the latch so its position points at the start of the offending token
//! rather than wherever scanning stopped.

use crate::diagnostics::DiagnosticKind;

/// A saved scanner position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Byte offset into the source.
    pub pos: usize,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// Latched line of the pending token start; 0 when no latch is pending.
    pub start_line: u32,
    /// Latched column of the pending token start.
    pub start_column: u32,
}

impl Cursor {
    /// Cursor at the first byte of the source.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pos: 0,
            line: 1,
            column: 1,
            start_line: 0,
            start_column: 0,
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// A scanned hex number, one or two bytes wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannedNumber {
    /// A single byte.
    Byte(u8),
    /// A 16-bit value, emitted high byte first.
    Short(u16),
}

impl ScannedNumber {
    /// The numeric value regardless of width.
    #[must_use]
    pub const fn value(self) -> u16 {
        match self {
            Self::Byte(b) => b as u16,
            Self::Short(s) => s,
        }
    }
}

/// Cursor over one immutable source text.
#[derive(Debug)]
pub struct Scanner<'a> {
    src: &'a str,
    /// Live position; saved and restored wholesale during macro expansion.
    pub cur: Cursor,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner at the start of `src`.
    #[must_use]
    pub const fn new(src: &'a str) -> Self {
        Self {
            src,
            cur: Cursor::new(),
        }
    }

    /// Rewinds to the start of the source.
    pub fn rewind(&mut self) {
        self.cur = Cursor::new();
    }

    /// The byte under the cursor, or 0 at end-of-input.
    #[must_use]
    pub fn peek(&self) -> u8 {
        self.src.as_bytes().get(self.cur.pos).copied().unwrap_or(0)
    }

    /// Returns the byte under the cursor and moves forward one byte.
    ///
    /// At end-of-input no movement happens and 0 is returned. A consumed
    /// newline bumps the line counter and resets the column to 1.
    pub fn advance(&mut self) -> u8 {
        let Some(&byte) = self.src.as_bytes().get(self.cur.pos) else {
            return 0;
        };
        self.cur.pos += 1;
        if byte == b'\n' {
            self.cur.line += 1;
            self.cur.column = 1;
        } else {
            self.cur.column += 1;
        }
        byte
    }

    /// True when the cursor is past the last byte.
    ///
    /// In macro mode the body terminator `}` also counts as end-of-input, so
    /// a nested scan over a macro body stops where the body does.
    #[must_use]
    pub fn at_end(&self, macro_mode: bool) -> bool {
        self.cur.pos >= self.src.len() || (macro_mode && self.peek() == b'}')
    }

    /// Latches the current line/column as the pending token start.
    pub fn set_start(&mut self) {
        self.cur.start_line = self.cur.line;
        self.cur.start_column = self.cur.column;
    }

    /// Position to anchor the next diagnostic.
    ///
    /// Yields the latched token start when one is pending and clears the
    /// latch, so follow-on diagnostics fall back to the live position.
    pub fn take_anchor(&mut self) -> (u32, u32) {
        if self.cur.start_line == 0 {
            return (self.cur.line, self.cur.column);
        }
        let anchor = (self.cur.start_line, self.cur.start_column);
        self.cur.start_line = 0;
        self.cur.start_column = 0;
        anchor
    }

    /// Advances past any run of whitespace.
    pub fn skip_whitespace(&mut self) {
        while self.cur.pos < self.src.len() && self.peek().is_ascii_whitespace() {
            self.advance();
        }
    }

    /// Consumes characters up to and including the closing `)`.
    ///
    /// # Errors
    ///
    /// `UnterminatedComment` when end-of-input arrives first.
    pub fn skip_comment(&mut self) -> Result<(), DiagnosticKind> {
        loop {
            if self.cur.pos >= self.src.len() {
                return Err(DiagnosticKind::UnterminatedComment);
            }
            if self.advance() == b')' {
                return Ok(());
            }
        }
    }

    /// Scans the maximal run of non-whitespace bytes at the cursor.
    ///
    /// Returns `None` when the cursor sits on whitespace or end-of-input.
    pub fn scan_identifier(&mut self) -> Option<&'a str> {
        let start = self.cur.pos;
        while self.cur.pos < self.src.len() && !self.peek().is_ascii_whitespace() {
            self.advance();
        }
        if self.cur.pos == start {
            return None;
        }
        self.src.get(start..self.cur.pos)
    }

    /// Consumes a maximal run of lowercase hex digits and sizes the result.
    ///
    /// In literal mode the width follows the digit count: one or two digits
    /// make a byte, three or four make a short. Otherwise the width follows
    /// the value: below 0x100 a byte, below 0x10000 a short.
    ///
    /// # Errors
    ///
    /// `MissingNumber` when no digit follows; `NumberTooBig` when the run is
    /// too wide for its mode.
    pub fn scan_number(&mut self, literal: bool) -> Result<ScannedNumber, DiagnosticKind> {
        let mut value: u32 = 0;
        let mut digits: usize = 0;
        while let Some(digit) = hex_digit(self.peek()) {
            self.advance();
            value = value.saturating_mul(16).saturating_add(u32::from(digit));
            digits += 1;
        }
        classify_number(value, digits, literal)
    }
}

/// True when `byte` is a lowercase hex digit.
#[must_use]
pub const fn is_hex_digit(byte: u8) -> bool {
    hex_digit(byte).is_some()
}

/// True when `text` is a non-empty run of lowercase hex digits.
#[must_use]
pub fn is_hex_token(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| hex_digit(b).is_some())
}

/// Parses a complete hex token with the same sizing rules as
/// [`Scanner::scan_number`].
///
/// # Errors
///
/// `MissingNumber` for an empty or non-hex token; `NumberTooBig` when the
/// token is too wide for its mode.
pub fn parse_hex(text: &str, literal: bool) -> Result<ScannedNumber, DiagnosticKind> {
    let mut value: u32 = 0;
    let mut digits: usize = 0;
    for byte in text.bytes() {
        let Some(digit) = hex_digit(byte) else {
            return Err(DiagnosticKind::MissingNumber);
        };
        value = value.saturating_mul(16).saturating_add(u32::from(digit));
        digits += 1;
    }
    classify_number(value, digits, literal)
}

#[allow(clippy::cast_possible_truncation)]
fn classify_number(
    value: u32,
    digits: usize,
    literal: bool,
) -> Result<ScannedNumber, DiagnosticKind> {
    if digits == 0 {
        return Err(DiagnosticKind::MissingNumber);
    }
    if literal {
        return match digits {
            1 | 2 => Ok(ScannedNumber::Byte(value as u8)),
            3 | 4 => Ok(ScannedNumber::Short(value as u16)),
            _ => Err(DiagnosticKind::NumberTooBig),
        };
    }
    if value < 0x100 {
        Ok(ScannedNumber::Byte(value as u8))
    } else if value < 0x1_0000 {
        Ok(ScannedNumber::Short(value as u16))
    } else {
        Err(DiagnosticKind::NumberTooBig)
    }
}

const fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}
