//! Top-level assembler pipeline.
//!
//! This module implements the two-pass pipeline over a single source text:
//!
//! 1. **Layout pass**: walk every token, assign addresses to labels from the
//!    running memory position, and record macro bodies. Nothing is emitted.
//! 2. **Emit pass**: walk the same text again, emitting code and resolving
//!    every reference against the tables the layout pass built.
//!
//! The memory position starts at the ROM load address and is advanced by
//! every emitted byte and by padding runes. Padding repositions addressing
//! only; the code buffer stays contiguous and the ROM file starts at the
//! load address.
//!
//! Macro expansion re-enters the emit loop on the recorded body cursor. The
//! caller's cursor and the body start are pushed as two separate saves: the
//! body terminator consumes one, the expansion epilogue consumes the other.
//!
//! The main entry point is [`assemble`], which returns the ROM bytes plus
//! statistics and every diagnostic the run produced.

use crate::diagnostics::{Diagnostic, DiagnosticKind, Reporter, Severity};
use crate::opcode;
use crate::scanner::{is_hex_digit, is_hex_token, parse_hex, Cursor, ScannedNumber, Scanner};
use crate::symbols::{Macro, SymbolTable};

/// Address at which the target VM loads the ROM. Bytes cannot be placed
/// below it; the range underneath is the zeropage.
pub const ROM_BASE: u16 = 0x0100;

/// Statistics for the summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AssembleStats {
    /// Bytes in the code buffer.
    pub rom_bytes: usize,
    /// Labels declared by the layout pass.
    pub label_count: usize,
    /// Macros recorded by the layout pass.
    pub macro_count: usize,
}

/// Result of assembling one source text.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AssembleOutput {
    /// Assembled ROM bytes, offset 0 corresponding to [`ROM_BASE`].
    pub rom: Vec<u8>,
    /// Counters for the summary line.
    pub stats: AssembleStats,
    /// Every error and warning recorded, in report order.
    pub diagnostics: Vec<Diagnostic>,
}

impl AssembleOutput {
    /// True when any error was recorded; the driver must not write a ROM.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Assembles a source text into a ROM.
///
/// Both passes always run to completion; problems are accumulated as
/// diagnostics rather than aborting, so one run reports as much as it can.
/// Callers decide what to do with a result that [`AssembleOutput::has_errors`].
#[must_use]
pub fn assemble(source: &str) -> AssembleOutput {
    let mut assembler = Assembler::new(source);
    assembler.layout_pass();
    assembler.rewind();
    assembler.emit_pass();
    assembler.finish()
}

struct Assembler<'a> {
    scanner: Scanner<'a>,
    symbols: SymbolTable,
    reporter: Reporter,
    rom: Vec<u8>,
    mem: u16,
    saves: Vec<Cursor>,
    macro_mode: bool,
}

impl<'a> Assembler<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            scanner: Scanner::new(source),
            symbols: SymbolTable::new(),
            reporter: Reporter::new(),
            rom: Vec::new(),
            mem: ROM_BASE,
            saves: Vec::new(),
            macro_mode: false,
        }
    }

    fn rewind(&mut self) {
        self.scanner.rewind();
        self.symbols.reset_scope();
        self.mem = ROM_BASE;
        self.saves.clear();
        self.macro_mode = false;
    }

    fn finish(mut self) -> AssembleOutput {
        if self.rom.is_empty() {
            self.reporter.warning(
                self.scanner.cur.line,
                self.scanner.cur.column,
                DiagnosticKind::EmptyOutput,
            );
        }
        AssembleOutput {
            stats: AssembleStats {
                rom_bytes: self.rom.len(),
                label_count: self.symbols.label_count(),
                macro_count: self.symbols.macro_count(),
            },
            rom: self.rom,
            diagnostics: self.reporter.into_diagnostics(),
        }
    }

    fn report_error(&mut self, kind: DiagnosticKind) {
        let (line, column) = self.scanner.take_anchor();
        self.reporter.error(line, column, kind);
    }

    fn report_warning(&mut self, kind: DiagnosticKind) {
        let (line, column) = self.scanner.take_anchor();
        self.reporter.warning(line, column, kind);
    }

    // --- memory position -------------------------------------------------

    fn move_mem(&mut self, n: u16, absolute: bool) {
        self.mem = if absolute { n } else { self.mem.wrapping_add(n) };
    }

    fn advance_mem(&mut self, n: u16) {
        self.mem = self.mem.wrapping_add(n);
    }

    fn emit(&mut self, byte: u8) {
        if self.mem < ROM_BASE {
            self.report_error(DiagnosticKind::ZeropageWrite);
        }
        self.rom.push(byte);
        self.mem = self.mem.wrapping_add(1);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn emit_short(&mut self, value: u16) {
        self.emit((value >> 8) as u8);
        self.emit((value & 0xff) as u8);
    }

    // --- layout pass ------------------------------------------------------

    /// Walks the source once to place labels and record macro bodies.
    ///
    /// Token-level problems both passes can see (malformed numbers, missing
    /// references) are left for the emit pass to report, so each shows up
    /// once. This pass owns the structural errors it alone detects.
    fn layout_pass(&mut self) {
        loop {
            self.scanner.skip_whitespace();
            if self.scanner.at_end(false) {
                break;
            }
            self.scanner.set_start();
            match self.scanner.peek() {
                b'(' => {
                    self.scanner.advance();
                    if let Err(kind) = self.scanner.skip_comment() {
                        self.report_error(kind);
                    }
                }
                b'[' | b'{' => {
                    self.scanner.advance();
                }
                b']' | b'}' => {
                    self.scanner.advance();
                    self.report_error(DiagnosticKind::StrayBracket);
                }
                b'"' => {
                    self.scanner.advance();
                    let len = self.scanner.scan_identifier().map_or(0, str::len);
                    self.advance_mem(truncate_u16(len));
                }
                b'%' => self.layout_macro_def(),
                b'@' => self.layout_label(false),
                b'&' => self.layout_label(true),
                b'|' => self.layout_padding(true),
                b'$' => self.layout_padding(false),
                b'#' => {
                    self.scanner.advance();
                    match self.scanner.scan_number(true) {
                        Ok(ScannedNumber::Byte(_)) => self.advance_mem(2),
                        Ok(ScannedNumber::Short(_)) => self.advance_mem(3),
                        Err(_) => {}
                    }
                }
                b'.' => self.layout_reference(2),
                b';' => self.layout_reference(3),
                b'-' => self.layout_reference(1),
                b'=' => self.layout_reference(2),
                _ => {
                    let token_start = self.scanner.cur;
                    let Some(identifier) = self.scanner.scan_identifier() else {
                        self.scanner.advance();
                        continue;
                    };
                    if is_hex_token(identifier) {
                        match parse_hex(identifier, true) {
                            Ok(ScannedNumber::Byte(_)) => self.advance_mem(1),
                            Ok(ScannedNumber::Short(_)) => self.advance_mem(2),
                            Err(_) => {}
                        }
                    } else if opcode::encode(identifier).is_some() {
                        self.advance_mem(1);
                    } else if self.symbols.get_macro(identifier).is_none()
                        && identifier.as_bytes().first().copied().is_some_and(is_hex_digit)
                    {
                        // A leading hex run is still a raw number; the non-hex
                        // remainder is rescanned as its own token.
                        self.scanner.cur = token_start;
                        match self.scanner.scan_number(true) {
                            Ok(ScannedNumber::Byte(_)) => self.advance_mem(1),
                            Ok(ScannedNumber::Short(_)) => self.advance_mem(2),
                            Err(_) => {}
                        }
                    }
                    // Macro invocations and unknowns contribute nothing here.
                }
            }
        }
    }

    fn layout_macro_def(&mut self) {
        self.scanner.advance();
        let name = self
            .scanner
            .scan_identifier()
            .unwrap_or_default()
            .to_string();
        self.scanner.skip_whitespace();
        if self.scanner.peek() != b'{' {
            self.report_error(DiagnosticKind::ExpectedBrace);
            return;
        }
        self.scanner.advance();
        let body = self.scanner.cur;
        loop {
            if self.scanner.at_end(false) {
                self.report_error(DiagnosticKind::UnterminatedMacro);
                return;
            }
            if self.scanner.advance() == b'}' {
                break;
            }
        }
        if !name.is_empty() {
            self.symbols.add_macro(&name, body);
        }
    }

    fn layout_label(&mut self, is_sub: bool) {
        self.scanner.advance();
        let Some(name) = self.scanner.scan_identifier() else {
            return;
        };
        let address = self.mem;
        if let Err(kind) = self.symbols.add_label(name, is_sub, address) {
            self.report_error(kind);
        }
    }

    fn layout_padding(&mut self, absolute: bool) {
        self.scanner.advance();
        if let Ok(number) = self.scanner.scan_number(false) {
            self.move_mem(number.value(), absolute);
        }
    }

    fn layout_reference(&mut self, width: u16) {
        self.scanner.advance();
        self.scanner.scan_identifier();
        self.advance_mem(width);
    }

    // --- emit pass --------------------------------------------------------

    /// Walks the source again, emitting code against the layout tables.
    ///
    /// Re-entered recursively for each macro expansion; in macro mode the
    /// body terminator `}` restores the saved body cursor and returns.
    fn emit_pass(&mut self) {
        loop {
            self.scanner.skip_whitespace();
            if self.scanner.at_end(false) {
                break;
            }
            self.scanner.set_start();
            match self.scanner.peek() {
                b'(' => {
                    self.scanner.advance();
                    // Unterminated comments were reported by the layout pass.
                    let _ = self.scanner.skip_comment();
                }
                b'[' | b'{' => {
                    self.scanner.advance();
                }
                b']' | b'}' => {
                    let byte = self.scanner.advance();
                    if byte == b'}' && self.macro_mode {
                        if let Some(saved) = self.saves.pop() {
                            self.scanner.cur = saved;
                        }
                        return;
                    }
                }
                b'"' => {
                    self.scanner.advance();
                    match self.scanner.scan_identifier() {
                        Some(text) => {
                            for byte in text.bytes() {
                                self.emit(byte);
                            }
                        }
                        None => self.report_error(DiagnosticKind::EmptyString),
                    }
                }
                b'%' => self.skip_macro_def(),
                b'@' => self.skip_label(false),
                b'&' => self.skip_label(true),
                b'|' => self.emit_padding(true),
                b'$' => self.emit_padding(false),
                b'#' => {
                    self.scanner.advance();
                    match self.scanner.scan_number(true) {
                        Ok(ScannedNumber::Byte(byte)) => {
                            self.emit(opcode::LIT);
                            self.emit(byte);
                        }
                        Ok(ScannedNumber::Short(short)) => {
                            self.emit(opcode::LIT | opcode::FLAG_SHORT);
                            self.emit_short(short);
                        }
                        Err(kind) => self.report_error(kind),
                    }
                }
                b'.' => self.emit_reference(true, true),
                b';' => self.emit_reference(false, true),
                b'-' => self.emit_reference(true, false),
                b'=' => self.emit_reference(false, false),
                _ => {
                    let token_start = self.scanner.cur;
                    let Some(identifier) = self.scanner.scan_identifier() else {
                        self.scanner.advance();
                        continue;
                    };
                    if is_hex_token(identifier) {
                        match parse_hex(identifier, true) {
                            Ok(ScannedNumber::Byte(byte)) => self.emit(byte),
                            Ok(ScannedNumber::Short(short)) => self.emit_short(short),
                            Err(kind) => self.report_error(kind),
                        }
                    } else if let Some(code) = opcode::encode(identifier) {
                        self.emit(code);
                    } else if let Some(found) = self.symbols.get_macro(identifier) {
                        self.expand_macro(found);
                    } else if identifier.as_bytes().first().copied().is_some_and(is_hex_digit) {
                        // A leading hex run is still a raw number; the non-hex
                        // remainder is rescanned as its own token.
                        self.scanner.cur = token_start;
                        match self.scanner.scan_number(true) {
                            Ok(ScannedNumber::Byte(byte)) => self.emit(byte),
                            Ok(ScannedNumber::Short(short)) => self.emit_short(short),
                            Err(kind) => self.report_error(kind),
                        }
                    } else {
                        self.report_error(DiagnosticKind::UndefinedIdentifier(
                            identifier.to_string(),
                        ));
                    }
                }
            }
        }
    }

    /// Expands a macro at the invocation site.
    ///
    /// Two saves are pushed: the caller's cursor, then the body start. The
    /// nested emit loop consumes the second when it reaches the body's `}`;
    /// the first is restored here so scanning resumes after the invocation.
    fn expand_macro(&mut self, found: Macro) {
        self.saves.push(self.scanner.cur);
        self.scanner.cur = found.body;
        self.saves.push(self.scanner.cur);
        self.macro_mode = true;
        self.emit_pass();
        if let Some(saved) = self.saves.pop() {
            self.scanner.cur = saved;
        }
        self.macro_mode = !self.saves.is_empty();
    }

    fn skip_macro_def(&mut self) {
        self.scanner.advance();
        let name = self
            .scanner
            .scan_identifier()
            .unwrap_or_default()
            .to_string();
        if self.macro_mode {
            self.report_error(DiagnosticKind::MacroInMacro(name.clone()));
        }
        self.scanner.skip_whitespace();
        if self.scanner.peek() != b'{' {
            return;
        }
        self.scanner.advance();
        while !self.scanner.at_end(false) && self.scanner.advance() != b'}' {}
    }

    fn skip_label(&mut self, is_sub: bool) {
        self.scanner.advance();
        let Some(name) = self.scanner.scan_identifier() else {
            return;
        };
        if self.macro_mode {
            self.report_error(DiagnosticKind::LabelInMacro(name.to_string()));
            return;
        }
        if !is_sub {
            self.symbols.set_scope(name);
        }
    }

    fn emit_padding(&mut self, absolute: bool) {
        self.scanner.advance();
        match self.scanner.scan_number(false) {
            Ok(number) => self.move_mem(number.value(), absolute),
            Err(kind) => self.report_error(kind),
        }
    }

    /// Emits a label reference: one address byte for zeropage forms, two for
    /// absolute forms, preceded by a literal opcode unless the form is raw.
    #[allow(clippy::cast_possible_truncation)]
    fn emit_reference(&mut self, zeropage: bool, with_lit: bool) {
        self.scanner.advance();
        let Some(name) = self.scanner.scan_identifier() else {
            return;
        };
        let address = match self.symbols.get_label_addr(name) {
            Ok(address) => address,
            Err(kind) => {
                self.report_error(kind);
                0
            }
        };
        if zeropage {
            if address >= 0x100 {
                self.report_warning(DiagnosticKind::NotZeropage(name.to_string()));
            }
            if with_lit {
                self.emit(opcode::LIT);
            }
            self.emit((address & 0xff) as u8);
        } else {
            if address < 0x100 {
                self.report_warning(DiagnosticKind::FitsZeropage(name.to_string()));
            }
            if with_lit {
                self.emit(opcode::LIT | opcode::FLAG_SHORT);
            }
            self.emit_short(address);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn truncate_u16(len: usize) -> u16 {
    len as u16
}
