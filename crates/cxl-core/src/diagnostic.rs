//! Positioned diagnostics and the sink they are reported to
//!
//! The contract parser never prints. It reports every error (and the
//! occasional warning) to a caller-owned [`DiagnosticSink`], then returns
//! the error so the enclosing parser can decide whether to resynchronize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, SyntaxErrorKind};
use crate::parser::tokenizer::Span;

/// A single positioned diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: Option<SyntaxErrorKind>,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            kind: None,
            message: message.into(),
            span,
        }
    }
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        Self {
            severity: Severity::Error,
            kind: err.kind(),
            message: err.message().to_string(),
            span: err.span(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match self.kind {
            Some(kind) => write!(f, "{} [{}] at {}: {}", prefix, kind, self.span, self.message),
            None => write!(f, "{} at {}: {}", prefix, self.span, self.message),
        }
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Receiver of positioned diagnostics, owned by the calling thread
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);

    /// Report `err` and hand it back, for use in `map_err`/`Err(...)` chains
    fn fail(&mut self, err: Error) -> Error {
        self.report(Diagnostic::from(&err));
        err
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Sink that discards everything; for callers that only want the `Result`
#[derive(Debug, Default)]
pub struct IgnoreDiagnostics;

impl DiagnosticSink for IgnoreDiagnostics {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Count diagnostics of the given severity
pub fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}
