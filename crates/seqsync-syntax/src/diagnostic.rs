//! Recoverable problems found while lexing, parsing or checking a diagram.
//!
//! Diagnostics are data, never errors: a document with diagnostics still
//! produces a tree, and everything that parsed cleanly is kept.

use std::fmt;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

/// Which stage reported the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Bytes the lexer could not classify.
    Lex,
    /// Unmatched block keywords, missing operands, stray terminators.
    Parse,
    /// Structurally valid but suspicious content (e.g. deactivating a
    /// participant that is not active).
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn lex(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            kind: DiagnosticKind::Lex,
            message: message.into(),
            span,
        }
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            kind: DiagnosticKind::Parse,
            message: message.into(),
            span,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            kind: DiagnosticKind::Semantic,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}:{}: {}: {}",
            self.span.line, self.span.column, severity, self.message
        )
    }
}
