//! CXL Core: contract-expression parsing and lowering
//!
//! Parses the concise contract syntax (`in(cond)`, `out(r; cond)`,
//! `invariant(cond);`) and lowers it to the legacy block form
//! (`in { assert(cond); }`, `out(r) { assert(cond); }`,
//! `invariant { assert(cond); }`) that downstream compiler phases consume.
//!
//! # Architecture
//!
//! ```text
//! text → Tokenizer → Parser → IR (contract expressions + legacy blocks)
//!                                ↓
//!                             lower → legacy-form AST
//!                                ↓
//!                             printer → canonical text → SHA-256
//! ```
//!
//! # Guarantees
//!
//! - **Validation in the parser**: every shape error is a positioned
//!   diagnostic from [`parser`]; [`lower`] is total
//! - **Order preserving**: asserts appear in the order clauses were written
//! - **Deterministic**: same input always produces identical output
//! - **Re-entrant**: no process-wide state; the caller owns the token
//!   source and the diagnostic sink

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod lower;
pub mod parser;
pub mod printer;

pub use config::ParserConfig;
pub use diagnostic::{Diagnostic, DiagnosticSink, IgnoreDiagnostics, Severity};
pub use error::{Error, Result, SyntaxErrorKind};
pub use lower::{
    lower_contracts, lower_declarator, lower_invariant, lower_source_file, LoweredContracts,
};
pub use parser::ast::*;
pub use parser::Parser;
pub use printer::fingerprint;

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A lowered source file with its canonical text and fingerprint
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoweredSource {
    pub file: SourceFile,
    pub canonical: String,
    pub fingerprint: String,
}

/// Parse and lower source text with the default configuration, returning
/// canonical legacy-form text
///
/// # Errors
/// Returns `Error::Lex` or `Error::Syntax` with line:column.
pub fn lower_source(text: &str) -> Result<String> {
    lower_source_with(text, &ParserConfig::default(), &mut IgnoreDiagnostics)
        .map(|lowered| lowered.canonical)
}

/// Parse and lower source text, reporting diagnostics to `sink`
pub fn lower_source_with(
    text: &str,
    config: &ParserConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<LoweredSource> {
    let file = lower::lower_source_file(parser::parse_with(text, config, sink)?);
    let canonical = printer::print_source_file(&file);
    let fingerprint = printer::fingerprint(&canonical);
    Ok(LoweredSource {
        file,
        canonical,
        fingerprint,
    })
}

/// SHA-256 of the lowered canonical form; sources written in the new and
/// the legacy contract syntax share a fingerprint when they are equivalent
pub fn fingerprint_source(text: &str) -> Result<String> {
    lower_source(text).map(|canonical| printer::fingerprint(&canonical))
}
