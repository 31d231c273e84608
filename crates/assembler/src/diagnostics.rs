//! Diagnostic accumulation and rendering.
//!
//! Assembly never aborts on the first problem: every error and warning is
//! recorded inline and scanning continues, so one run surfaces as many
//! diagnostics as possible. The reporter latches a sticky error flag that the
//! driver consults before writing any output, and drops warnings once an
//! error has been recorded.
//!
//! # Rendering
//!
//! Diagnostics render one per line in the form:
//!
//! ```text
//! Error (12,3): Label 'loop' already exists.
//! Warning (4,9): Output rom is empty.
//! ```
//!
//! Newlines, tabs, and carriage returns inside a message are rendered as
//! `\n`, `\t`, and `\r`.

use std::fmt;

use thiserror::Error;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Severity {
    /// A defect that inhibits output writing.
    Error,
    /// A suspicious construct that does not inhibit output.
    Warning,
}

/// Closed taxonomy of diagnostic messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DiagnosticKind {
    /// A `(` comment ran to end-of-input without its `)`.
    #[error("Missing closing parenthesis")]
    UnterminatedComment,
    /// A macro body ran to end-of-input without its `}`.
    #[error("Missing closing bracket")]
    UnterminatedMacro,
    /// A `]` or `}` with no opening counterpart.
    #[error("Stray closing bracket")]
    StrayBracket,
    /// A macro definition name was not followed by `{`.
    #[error("Expected '{{'")]
    ExpectedBrace,
    /// A hex number too wide for its context.
    #[error("Number too big")]
    NumberTooBig,
    /// A rune that requires a hex number was not followed by one.
    #[error("Missing number")]
    MissingNumber,
    /// A label declaration reused an existing name.
    #[error("Label '{0}' already exists")]
    DuplicateLabel(String),
    /// A reference named a label that was never declared.
    #[error("Label '{0}' does not exist")]
    UndefinedLabel(String),
    /// A bare identifier matched no opcode and no macro.
    #[error("Undefined identifier '{0}'")]
    UndefinedIdentifier(String),
    /// A byte was emitted while the memory position was below 0x0100.
    #[error("can't write over zeropage")]
    ZeropageWrite,
    /// A `"` rune with no characters following it.
    #[error("Empty string")]
    EmptyString,
    /// A label declaration appeared inside an expanding macro body.
    #[error("Label '{0}' defined inside macro")]
    LabelInMacro(String),
    /// A macro definition appeared inside an expanding macro body.
    #[error("Macro '{0}' defined inside macro")]
    MacroInMacro(String),
    /// A zeropage reference resolved to an address above 0x00ff.
    #[error("Label '{0}' is outside zeropage")]
    NotZeropage(String),
    /// An absolute reference resolved to a zeropage address.
    #[error("Label '{0}' fits in zeropage")]
    FitsZeropage(String),
    /// Assembly finished with an empty code buffer.
    #[error("Output rom is empty")]
    EmptyOutput,
}

/// A recorded diagnostic with its source anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: Severity,
    /// 1-based line of the offending token.
    pub line: u32,
    /// 1-based column of the offending token.
    pub column: u32,
    /// The message taxonomy entry.
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        write!(
            f,
            "{label} ({},{}): {}.",
            self.line,
            self.column,
            escape_message(&self.kind.to_string())
        )
    }
}

fn escape_message(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
}

/// Accumulates diagnostics across both assembly passes.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    had_error: bool,
}

impl Reporter {
    /// Creates an empty reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
            had_error: false,
        }
    }

    /// Records an error and latches the sticky error flag.
    pub fn error(&mut self, line: u32, column: u32, kind: DiagnosticKind) {
        self.had_error = true;
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            line,
            column,
            kind,
        });
    }

    /// Records a warning. Dropped once any error has been recorded.
    pub fn warning(&mut self, line: u32, column: u32, kind: DiagnosticKind) {
        if self.had_error {
            return;
        }
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            line,
            column,
            kind,
        });
    }

    /// True once any error has been recorded.
    #[must_use]
    pub const fn had_error(&self) -> bool {
        self.had_error
    }

    /// Recorded diagnostics in report order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the reporter, yielding the recorded diagnostics.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, DiagnosticKind, Reporter, Severity};

    #[test]
    fn error_renders_with_position_and_period() {
        let diagnostic = Diagnostic {
            severity: Severity::Error,
            line: 12,
            column: 3,
            kind: DiagnosticKind::DuplicateLabel("loop".into()),
        };
        assert_eq!(
            diagnostic.to_string(),
            "Error (12,3): Label 'loop' already exists."
        );
    }

    #[test]
    fn warning_renders_with_warning_prefix() {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            line: 4,
            column: 9,
            kind: DiagnosticKind::EmptyOutput,
        };
        assert_eq!(diagnostic.to_string(), "Warning (4,9): Output rom is empty.");
    }

    #[test]
    fn control_characters_are_escaped() {
        let diagnostic = Diagnostic {
            severity: Severity::Error,
            line: 1,
            column: 1,
            kind: DiagnosticKind::UndefinedIdentifier("a\tb\r\n".into()),
        };
        assert_eq!(
            diagnostic.to_string(),
            "Error (1,1): Undefined identifier 'a\\tb\\r\\n'."
        );
    }

    #[test]
    fn expected_brace_message_renders_literal_brace() {
        assert_eq!(DiagnosticKind::ExpectedBrace.to_string(), "Expected '{'");
    }

    #[test]
    fn warnings_are_suppressed_after_an_error() {
        let mut reporter = Reporter::new();
        reporter.warning(1, 1, DiagnosticKind::EmptyOutput);
        reporter.error(2, 1, DiagnosticKind::MissingNumber);
        reporter.warning(3, 1, DiagnosticKind::NotZeropage("x".into()));

        let recorded = reporter.diagnostics();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].severity, Severity::Warning);
        assert_eq!(recorded[1].severity, Severity::Error);
        assert!(reporter.had_error());
    }

    #[test]
    fn warnings_alone_do_not_latch_the_error_flag() {
        let mut reporter = Reporter::new();
        reporter.warning(1, 1, DiagnosticKind::FitsZeropage("x".into()));
        assert!(!reporter.had_error());
        assert_eq!(reporter.into_diagnostics().len(), 1);
    }
}
