//! Error types for CXL
//!
//! All fallible operations return `Result<T, Error>`.
//! Every error carries the span of the offending token; lowering itself
//! never fails, so everything here originates in the tokenizer or parser.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::tokenizer::Span;

/// CXL error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Character-level failure while tokenizing
    #[error("Lex error at {span}: {message}")]
    Lex { message: String, span: Span },

    /// Grammar violation while parsing a declaration or contract clause
    #[error("Syntax error [{kind}] at {span}: {message}")]
    Syntax {
        kind: SyntaxErrorKind,
        message: String,
        span: Span,
    },
}

impl Error {
    pub(crate) fn syntax(kind: SyntaxErrorKind, message: impl Into<String>, span: Span) -> Self {
        Error::Syntax {
            kind,
            message: message.into(),
            span,
        }
    }

    /// Source position the error is attached to
    pub fn span(&self) -> Span {
        match self {
            Error::Lex { span, .. } | Error::Syntax { span, .. } => *span,
        }
    }

    /// Syntax error category, `None` for lexical errors
    pub fn kind(&self) -> Option<SyntaxErrorKind> {
        match self {
            Error::Lex { .. } => None,
            Error::Syntax { kind, .. } => Some(*kind),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Lex { message, .. } | Error::Syntax { message, .. } => message,
        }
    }
}

/// Category of syntax error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxErrorKind {
    /// `out(ident)` with no `;` and no following block
    AmbiguousOutIdentifier,
    /// Zero, or more than two, expressions inside contract parentheses
    MalformedContractParameters,
    /// A legacy block precedes a contract expression on one declarator
    LegacyBeforeNewContract,
    /// Missing `;` after a body-less declarator or an expression invariant
    MissingTerminator,
    /// Two `out` clauses of one declarator bind different result names
    ConflictingOutParameter,
    /// Two legacy blocks of the same kind on one declarator
    DuplicateContractBlock,
    UnexpectedToken,
    NestingTooDeep,
}

impl std::fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            SyntaxErrorKind::AmbiguousOutIdentifier => "ambiguous-out-identifier",
            SyntaxErrorKind::MalformedContractParameters => "malformed-contract-parameters",
            SyntaxErrorKind::LegacyBeforeNewContract => "legacy-before-new-contract",
            SyntaxErrorKind::MissingTerminator => "missing-terminator",
            SyntaxErrorKind::ConflictingOutParameter => "conflicting-out-parameter",
            SyntaxErrorKind::DuplicateContractBlock => "duplicate-contract-block",
            SyntaxErrorKind::UnexpectedToken => "unexpected-token",
            SyntaxErrorKind::NestingTooDeep => "nesting-too-deep",
        };
        write!(f, "{}", name)
    }
}

/// Result type alias for CXL operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span {
            line: 3,
            column: 7,
            offset: 20,
        }
    }

    #[test]
    fn test_syntax_error_display() {
        let err = Error::syntax(
            SyntaxErrorKind::AmbiguousOutIdentifier,
            "bare identifier",
            span(),
        );
        assert_eq!(
            err.to_string(),
            "Syntax error [ambiguous-out-identifier] at 3:7: bare identifier"
        );
    }

    #[test]
    fn test_lex_error_has_no_kind() {
        let err = Error::Lex {
            message: "bad".into(),
            span: span(),
        };
        assert_eq!(err.kind(), None);
        assert_eq!(err.span(), span());
        assert_eq!(err.message(), "bad");
    }
}
