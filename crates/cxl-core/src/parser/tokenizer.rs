//! CXL Tokenizer: converts host source text into a token stream
//!
//! Handles: contract keywords, identifiers, string/char literals,
//! integer/float literals (kept as source lexemes), delimiters and the
//! operator set of the host expression grammar.
//! Comments (`//`, `/* */`, nesting `/+ +/`) are discarded.
//!
//! Guarantees:
//! - Deterministic: same input always produces same token stream
//! - Every token carries its line:column for diagnostics

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Operators, longest first so that maximal munch is a linear scan.
const OPERATORS: &[&str] = &[
    ">>>=", "...", "^^=", "<<=", ">>=", ">>>", "^^", "==", "!=", "<=", ">=", "&&", "||", "<<",
    ">>", "++", "--", "+=", "-=", "*=", "/=", "%=", "~=", "&=", "|=", "^=", "=>", "..", "+", "-",
    "*", "/", "%", "~", "&", "|", "^", "!", "<", ">", "=", "@", "$", "#",
];

/// Token types for host source
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Contract keywords
    In,
    Out,
    Invariant,
    Do,
    Body,
    Assert,

    // Other keywords the contract grammar needs to see
    Is,
    This,
    Null,
    Return,
    Class,
    Struct,
    Interface,
    Union,

    // Literals
    StringLiteral(String),
    CharLiteral(char),
    IntegerLiteral(String),
    FloatLiteral(String),
    BooleanLiteral(bool),

    // Delimiters
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Semicolon, // ;
    Comma,     // ,
    Colon,     // :
    Dot,       // .
    Question,  // ?

    /// Any operator from the host expression grammar
    Op(&'static str),

    // Other
    Identifier(String),
    Eof,
}

impl Token {
    /// Keyword tokens for the aggregate declarations the driver understands
    pub fn is_aggregate_keyword(&self) -> bool {
        matches!(
            self,
            Token::Class | Token::Struct | Token::Interface | Token::Union
        )
    }

    /// Name of a token usable as an identifier; `body` is only a keyword
    /// where a function body can start
    pub fn identifier_name(&self) -> Option<&str> {
        match self {
            Token::Identifier(name) => Some(name),
            Token::Body => Some("body"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Token::In => write!(f, "in"),
            Token::Out => write!(f, "out"),
            Token::Invariant => write!(f, "invariant"),
            Token::Do => write!(f, "do"),
            Token::Body => write!(f, "body"),
            Token::Assert => write!(f, "assert"),
            Token::Is => write!(f, "is"),
            Token::This => write!(f, "this"),
            Token::Null => write!(f, "null"),
            Token::Return => write!(f, "return"),
            Token::Class => write!(f, "class"),
            Token::Struct => write!(f, "struct"),
            Token::Interface => write!(f, "interface"),
            Token::Union => write!(f, "union"),
            Token::StringLiteral(s) => write!(f, "\"{}\"", escape_string(s)),
            Token::CharLiteral(c) => write!(f, "'{}'", escape_char(*c)),
            Token::IntegerLiteral(s) | Token::FloatLiteral(s) => write!(f, "{}", s),
            Token::BooleanLiteral(b) => write!(f, "{}", b),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
            Token::Question => write!(f, "?"),
            Token::Op(op) => write!(f, "{}", op),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Re-escape a decoded string literal body
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            other => out.push_str(&escape_char(other)),
        }
    }
    out
}

fn escape_char(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\r' => "\\r".to_string(),
        '\0' => "\\0".to_string(),
        '\\' => "\\\\".to_string(),
        '\'' => "\\'".to_string(),
        other => other.to_string(),
    }
}

/// Position in source text for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token with source position
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenizer for host source text
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Tokenizer {
    /// Create a new tokenizer for the given input text
    pub fn new(text: &str) -> Self {
        Tokenizer {
            input: text.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input into a stream of spanned tokens
    pub fn tokenize(&mut self) -> crate::Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(SpannedToken {
                    token: Token::Eof,
                    span: self.current_span(),
                });
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        Ok(tokens)
    }

    // ── Character helpers ──────────────────────────────────

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        if let Some(c) = ch {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }

    fn lex_error(&self, message: String, span: Span) -> Error {
        Error::Lex { message, span }
    }

    // ── Whitespace & Comments ──────────────────────────────

    fn skip_whitespace_and_comments(&mut self) -> crate::Result<()> {
        loop {
            while let Some(ch) = self.peek() {
                if ch.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            match (self.peek(), self.peek_ahead(1)) {
                (Some('/'), Some('/')) => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => self.skip_block_comment()?,
                (Some('/'), Some('+')) => self.skip_nesting_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> crate::Result<()> {
        let span = self.current_span();
        self.advance();
        self.advance();
        loop {
            match self.advance() {
                None => {
                    return Err(self.lex_error(
                        format!("Unterminated block comment starting at {}", span),
                        span,
                    ))
                }
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn skip_nesting_comment(&mut self) -> crate::Result<()> {
        let span = self.current_span();
        self.advance();
        self.advance();
        let mut depth = 1usize;
        while depth > 0 {
            match self.advance() {
                None => {
                    return Err(self.lex_error(
                        format!("Unterminated nesting comment starting at {}", span),
                        span,
                    ))
                }
                Some('/') if self.peek() == Some('+') => {
                    self.advance();
                    depth += 1;
                }
                Some('+') if self.peek() == Some('/') => {
                    self.advance();
                    depth -= 1;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    // ── Main dispatch ──────────────────────────────────────

    fn next_token(&mut self) -> crate::Result<SpannedToken> {
        let span = self.current_span();
        let ch = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(SpannedToken {
                    token: Token::Eof,
                    span,
                })
            }
        };

        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ';' => Some(Token::Semicolon),
            ',' => Some(Token::Comma),
            ':' => Some(Token::Colon),
            '?' => Some(Token::Question),
            // `..` and `...` are operators, a lone dot is member access
            '.' if self.peek_ahead(1) != Some('.') => Some(Token::Dot),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(SpannedToken { token, span });
        }

        match ch {
            '"' => self.read_string(span),
            '\'' => self.read_char(span),
            c if c.is_ascii_digit() => self.read_number(span),
            c if c.is_alphabetic() || c == '_' => self.read_identifier_or_keyword(span),
            _ => self.read_operator(span),
        }
    }

    // ── String & char literals ─────────────────────────────

    fn read_escape(&mut self) -> crate::Result<char> {
        match self.advance() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some('\\') => Ok('\\'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some(c) => Err(self.lex_error(
                format!(
                    "Invalid escape sequence '\\{}' at {}",
                    c,
                    self.current_span()
                ),
                self.current_span(),
            )),
            None => Err(self.lex_error(
                format!("Unterminated escape sequence at {}", self.current_span()),
                self.current_span(),
            )),
        }
    }

    fn read_string(&mut self, span: Span) -> crate::Result<SpannedToken> {
        self.advance(); // consume opening "
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(self.lex_error(
                        format!("Unterminated string starting at {}", span),
                        span,
                    ));
                }
                Some('"') => break,
                Some('\\') => value.push(self.read_escape()?),
                Some(c) => value.push(c),
            }
        }

        Ok(SpannedToken {
            token: Token::StringLiteral(value),
            span,
        })
    }

    fn read_char(&mut self, span: Span) -> crate::Result<SpannedToken> {
        self.advance(); // consume opening '
        let value = match self.advance() {
            Some('\\') => self.read_escape()?,
            Some('\'') | None => {
                return Err(self.lex_error(
                    format!("Empty or unterminated character literal at {}", span),
                    span,
                ))
            }
            Some(c) => c,
        };
        if self.advance() != Some('\'') {
            return Err(self.lex_error(
                format!("Unterminated character literal at {}", span),
                span,
            ));
        }
        Ok(SpannedToken {
            token: Token::CharLiteral(value),
            span,
        })
    }

    // ── Numbers ────────────────────────────────────────────

    fn read_number(&mut self, span: Span) -> crate::Result<SpannedToken> {
        let start = self.position;
        let mut is_float = false;

        let radix_prefix = self.peek() == Some('0')
            && matches!(self.peek_ahead(1), Some('x' | 'X' | 'b' | 'B'));
        if radix_prefix {
            self.advance();
            self.advance();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_hexdigit() || ch == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
        } else {
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() || ch == '_' {
                    self.advance();
                } else if ch == '.'
                    && !is_float
                    && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit())
                {
                    // `1..2` is a range, only `1.5` is a float
                    is_float = true;
                    self.advance();
                } else if matches!(ch, 'e' | 'E')
                    && self
                        .peek_ahead(1)
                        .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
                {
                    is_float = true;
                    self.advance();
                    self.advance();
                } else {
                    break;
                }
            }
        }

        // Type suffixes: u, U, L, f, F
        while let Some(ch) = self.peek() {
            match ch {
                'u' | 'U' | 'L' => {
                    self.advance();
                }
                'f' | 'F' => {
                    is_float = true;
                    self.advance();
                }
                _ => break,
            }
        }

        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            let text: String = self.input[start..=self.position].iter().collect();
            return Err(self.lex_error(
                format!("Invalid number literal '{}' at {}", text, span),
                span,
            ));
        }

        let text: String = self.input[start..self.position].iter().collect();
        let token = if is_float {
            Token::FloatLiteral(text)
        } else {
            Token::IntegerLiteral(text)
        };
        Ok(SpannedToken { token, span })
    }

    // ── Identifiers & Keywords ─────────────────────────────

    fn read_identifier_or_keyword(&mut self, span: Span) -> crate::Result<SpannedToken> {
        let start = self.position;

        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();

        let token = match text.as_str() {
            "in" => Token::In,
            "out" => Token::Out,
            "invariant" => Token::Invariant,
            "do" => Token::Do,
            "body" => Token::Body,
            "assert" => Token::Assert,

            "is" => Token::Is,
            "this" => Token::This,
            "null" => Token::Null,
            "return" => Token::Return,
            "class" => Token::Class,
            "struct" => Token::Struct,
            "interface" => Token::Interface,
            "union" => Token::Union,

            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),

            _ => Token::Identifier(text),
        };

        Ok(SpannedToken { token, span })
    }

    // ── Operators ──────────────────────────────────────────

    fn read_operator(&mut self, span: Span) -> crate::Result<SpannedToken> {
        for op in OPERATORS {
            let matches = op
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_ahead(i) == Some(c));
            if matches {
                for _ in 0..op.chars().count() {
                    self.advance();
                }
                return Ok(SpannedToken {
                    token: Token::Op(op),
                    span,
                });
            }
        }

        let ch = self.peek().unwrap_or('\0');
        Err(self.lex_error(
            format!("Unexpected character '{}' at {}", ch, span),
            span,
        ))
    }
}
