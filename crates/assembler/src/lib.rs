//! Two-pass assembler for a small stack-based virtual machine.
//!
//! One source text goes in, one contiguous binary ROM comes out. The ROM is
//! loaded by the target VM at address 0x0100; everything below that is the
//! zeropage and cannot be written. The text is scanned twice: the layout
//! pass places labels and records macro bodies, the emit pass produces the
//! bytes and resolves references.

/// Pass driver, memory-position model, and macro expansion.
pub mod assembler;
/// Diagnostic accumulation and rendering.
pub mod diagnostics;
/// Opcode mnemonics and mode-flag encoding.
pub mod opcode;
/// Lexical scanning over the source text.
pub mod scanner;
/// Label and macro symbol tables.
pub mod symbols;

pub use assembler::{assemble, AssembleOutput, AssembleStats, ROM_BASE};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
