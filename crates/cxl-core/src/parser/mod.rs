//! CXL Parser: tokenizer, AST types, and recursive descent parser
//!
//! The [`Parser`] is a token cursor. An enclosing parser positions it at a
//! grammar production point (just after a parameter list, or just after an
//! `invariant` keyword) and calls the contract entry points as subroutines:
//!
//! ```text
//! tokens → Parser::parse_function_declarator → FunctionDeclarator (IR)
//!        → Parser::parse_invariant           → InvariantDeclaration (IR)
//! ```
//!
//! The text-level helpers in this module run the tokenizer first and insist
//! that the whole input is consumed.

pub mod ast;
pub mod contracts;
pub mod decl;
pub mod expr;
pub mod stmt;
pub mod tokenizer;

use crate::config::ParserConfig;
use crate::diagnostic::{DiagnosticSink, IgnoreDiagnostics};
use crate::error::{Error, Result, SyntaxErrorKind};
use ast::{ContractExpressionList, FunctionDeclarator, InvariantDeclaration, SourceFile};
use tokenizer::{Span, SpannedToken, Token, Tokenizer};

static EOF: SpannedToken = SpannedToken {
    token: Token::Eof,
    span: Span {
        line: 0,
        column: 0,
        offset: 0,
    },
};

/// Cursor over a token stream, with the parsing configuration
pub struct Parser<'t> {
    tokens: &'t [SpannedToken],
    position: usize,
    config: ParserConfig,
    depth: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [SpannedToken]) -> Self {
        Self::with_config(tokens, ParserConfig::default())
    }

    pub fn with_config(tokens: &'t [SpannedToken], config: ParserConfig) -> Self {
        Parser {
            tokens,
            position: 0,
            config,
            depth: 0,
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    // ── Cursor ─────────────────────────────────────────

    /// Reading past the end keeps yielding the final `Eof`
    fn get(&self, index: usize) -> &'t SpannedToken {
        self.tokens
            .get(index)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    pub fn peek(&self) -> &'t Token {
        &self.get(self.position).token
    }

    pub fn peek_at(&self, offset: usize) -> &'t Token {
        &self.get(self.position + offset).token
    }

    /// Span of the current token
    pub fn span(&self) -> Span {
        self.get(self.position).span
    }

    pub fn advance(&mut self) -> &'t SpannedToken {
        let token = self.get(self.position);
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    pub fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    pub fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, token: &Token, context: &str) -> Result<Span> {
        if self.check(token) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&format!("`{}` {}", token, context)))
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.check(&Token::Eof)
    }

    pub fn mark(&self) -> usize {
        self.position
    }

    pub fn reset(&mut self, mark: usize) {
        self.position = mark;
    }

    // ── Helpers for submodules ─────────────────────────

    pub(crate) fn unexpected(&self, expected: &str) -> Error {
        Error::syntax(
            SyntaxErrorKind::UnexpectedToken,
            format!("expected {}, found `{}`", expected, self.peek()),
            self.span(),
        )
    }

    /// Track recursion so pathological input fails instead of overflowing
    pub(crate) fn enter(&mut self) -> Result<()> {
        if self.depth >= self.config.max_nesting_depth {
            return Err(Error::syntax(
                SyntaxErrorKind::NestingTooDeep,
                format!(
                    "nesting exceeds the configured maximum of {}",
                    self.config.max_nesting_depth
                ),
                self.span(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Render tokens `[start, end)` back to text, for opaque passthrough
    pub(crate) fn render_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.tokens.len());
        let start = start.min(end);
        render_tokens(self.tokens[start..end].iter().map(|t| &t.token))
    }

    pub(crate) fn expect_end(&mut self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }
}

/// Join tokens with single spaces, omitting them where the host grammar
/// never writes one
pub fn render_tokens<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in tokens {
        if let Some(p) = prev {
            let tight_before = matches!(
                token,
                Token::RParen | Token::RBracket | Token::Semicolon | Token::Comma | Token::Dot
            ) || (matches!(token, Token::LParen | Token::LBracket)
                && matches!(
                    p,
                    Token::Identifier(_)
                        | Token::RParen
                        | Token::RBracket
                        | Token::In
                        | Token::Out
                        | Token::Invariant
                        | Token::Assert
                        | Token::This
                ));
            let tight_after = matches!(
                p,
                Token::LParen | Token::LBracket | Token::Dot | Token::Op("@") | Token::Op("!")
            );
            if !tight_before && !tight_after {
                out.push(' ');
            }
        }
        out.push_str(&token.to_string());
        prev = Some(token);
    }
    out
}

// ── Text-level entry points ───────────────────────────────

/// Tokenize host source text
pub fn tokenize(text: &str) -> Result<Vec<SpannedToken>> {
    Tokenizer::new(text).tokenize()
}

fn tokenize_reporting(text: &str, sink: &mut dyn DiagnosticSink) -> Result<Vec<SpannedToken>> {
    tokenize(text).map_err(|e| sink.fail(e))
}

/// Parse a whole source file with the default configuration
///
/// # Errors
/// Returns `Error::Lex` or `Error::Syntax` with line:column.
pub fn parse(text: &str) -> Result<SourceFile> {
    parse_with(text, &ParserConfig::default(), &mut IgnoreDiagnostics)
}

/// Parse a whole source file, reporting diagnostics to `sink`
pub fn parse_with(
    text: &str,
    config: &ParserConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<SourceFile> {
    let tokens = tokenize_reporting(text, sink)?;
    Parser::with_config(&tokens, config.clone()).parse_source_file(sink)
}

/// Parse text holding exactly one declarator tail: contract clauses,
/// legacy blocks, then a body or `;`
pub fn parse_declarator(
    text: &str,
    config: &ParserConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<FunctionDeclarator> {
    let tokens = tokenize_reporting(text, sink)?;
    let mut parser = Parser::with_config(&tokens, config.clone());
    let declarator = parser.parse_function_declarator(sink)?;
    parser.expect_end().map_err(|e| sink.fail(e))?;
    Ok(declarator)
}

/// Parse text holding only new-syntax contract clauses (`ContractExpressions`)
pub fn parse_contract_expressions(
    text: &str,
    config: &ParserConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<ContractExpressionList> {
    let tokens = tokenize_reporting(text, sink)?;
    let mut parser = Parser::with_config(&tokens, config.clone());
    let list = parser.parse_contract_expressions(sink)?;
    parser.expect_end().map_err(|e| sink.fail(e))?;
    Ok(list)
}

/// Parse text holding one invariant declaration, keyword included
pub fn parse_invariant(
    text: &str,
    config: &ParserConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<InvariantDeclaration> {
    let tokens = tokenize_reporting(text, sink)?;
    let mut parser = Parser::with_config(&tokens, config.clone());
    let keyword = parser
        .expect(&Token::Invariant, "to start an invariant")
        .map_err(|e| sink.fail(e))?;
    let invariant = parser.parse_invariant(keyword, sink)?;
    parser.expect_end().map_err(|e| sink.fail(e))?;
    Ok(invariant)
}
