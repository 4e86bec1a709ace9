//! Declaration driver
//!
//! A minimal enclosing parser: it finds function parameter lists and
//! aggregate bodies, hands the cursor to the contract parser at the right
//! production points, and keeps everything else as opaque token text.

use log::debug;

use super::ast::*;
use super::tokenizer::{Span, Token};
use super::Parser;
use crate::diagnostic::DiagnosticSink;
use crate::error::{Error, Result, SyntaxErrorKind};

impl<'t> Parser<'t> {
    /// `SourceFile := Declaration*`
    ///
    /// Errors are reported to `sink` and returned.
    pub fn parse_source_file(&mut self, sink: &mut dyn DiagnosticSink) -> Result<SourceFile> {
        self.source_file(sink).map_err(|e| sink.fail(e))
    }

    fn source_file(&mut self, sink: &mut dyn DiagnosticSink) -> Result<SourceFile> {
        let mut declarations = Vec::new();
        while !self.is_at_end() {
            if self.check(&Token::RBrace) {
                return Err(self.unexpected("a declaration"));
            }
            declarations.push(self.declaration(sink, false)?);
        }
        debug!("parsed source file: {} declaration(s)", declarations.len());
        Ok(SourceFile { declarations })
    }

    fn declaration(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        in_aggregate: bool,
    ) -> Result<Declaration> {
        match self.peek() {
            Token::Invariant if in_aggregate => {
                let keyword = self.advance().span;
                Ok(Declaration::Invariant(self.invariant_tail(keyword)?))
            }
            Token::Invariant => Err(Error::syntax(
                SyntaxErrorKind::UnexpectedToken,
                "`invariant` is only allowed inside an aggregate",
                self.span(),
            )),
            _ => match self.find_aggregate_keyword() {
                Some(offset) => match self.aggregate(offset, sink)? {
                    Some(aggregate) => Ok(Declaration::Aggregate(aggregate)),
                    None => self.function_or_opaque(sink),
                },
                None => self.function_or_opaque(sink),
            },
        }
    }

    // ── Aggregates ─────────────────────────────────────

    /// Offset from the cursor of an aggregate keyword preceded only by
    /// attributes (`final`, `@safe`, `extern(C)`, `align(4)`)
    fn find_aggregate_keyword(&self) -> Option<usize> {
        let mut offset = 0;
        loop {
            match self.peek_at(offset) {
                token if token.is_aggregate_keyword() => return Some(offset),
                Token::Op("@") => offset += 1,
                Token::Identifier(_) => {
                    offset += 1;
                    if self.peek_at(offset) == &Token::LParen {
                        offset = self.balanced_end(offset)?;
                    }
                }
                _ => return None,
            }
        }
    }

    /// Offset just past the `)` matching the `(` at `open`, if it is closed
    fn balanced_end(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut offset = open;
        loop {
            match self.peek_at(offset) {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(offset + 1);
                    }
                }
                Token::Eof => return None,
                _ => {}
            }
            offset += 1;
        }
    }

    /// `attributes kind Name [( params )] [if ( constraint )] [: bases] { Member* }`,
    /// or `None` with the cursor untouched when the tokens are not an
    /// aggregate definition. The keyword sits `keyword_offset` tokens ahead.
    fn aggregate(
        &mut self,
        keyword_offset: usize,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Option<AggregateDecl>> {
        let mark = self.mark();
        let span = self.span();
        let prefix = self.render_range(mark, mark + keyword_offset);
        self.reset(mark + keyword_offset);

        let kind = match self.advance().token {
            Token::Class => AggregateKind::Class,
            Token::Struct => AggregateKind::Struct,
            Token::Interface => AggregateKind::Interface,
            _ => AggregateKind::Union,
        };
        let name = match self.peek() {
            Token::Identifier(_) => self.expect_identifier("after aggregate keyword")?,
            _ => {
                self.reset(mark);
                return Ok(None);
            }
        };

        let parameters = if self.check(&Token::LParen) {
            Some(self.parenthesized_text()?)
        } else {
            None
        };
        let mut constraint = self.template_constraint()?;

        let mut bases = None;
        if self.eat(&Token::Colon) {
            let start = self.mark();
            while !matches!(
                self.peek(),
                Token::LBrace | Token::Semicolon | Token::RBrace | Token::Eof
            ) && !self.at_constraint()
            {
                self.advance();
            }
            bases = Some(self.render_range(start, self.mark()));
        }
        if constraint.is_none() {
            constraint = self.template_constraint()?;
        }
        if !self.eat(&Token::LBrace) {
            self.reset(mark);
            return Ok(None);
        }

        self.enter()?;
        let members = self.aggregate_members(sink);
        self.leave();
        let members = members?;

        debug!(
            "parsed {} {} with {} member(s)",
            kind,
            name.value,
            members.len()
        );
        Ok(Some(AggregateDecl {
            prefix,
            kind,
            name,
            parameters,
            constraint,
            bases,
            members,
            span,
        }))
    }

    fn aggregate_members(&mut self, sink: &mut dyn DiagnosticSink) -> Result<Vec<Declaration>> {
        let mut members = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    return Ok(members);
                }
                Token::Eof => return Err(self.unexpected("`}` to close aggregate")),
                _ => members.push(self.declaration(sink, true)?),
            }
        }
    }

    fn at_constraint(&self) -> bool {
        matches!(self.peek(), Token::Identifier(word) if word == "if")
            && self.peek_at(1) == &Token::LParen
    }

    /// `if ( ... )` after a template parameter list
    fn template_constraint(&mut self) -> Result<Option<String>> {
        if !self.at_constraint() {
            return Ok(None);
        }
        self.advance();
        self.parenthesized_text().map(Some)
    }

    /// Consume `( ... )` and return its contents as text
    fn parenthesized_text(&mut self) -> Result<String> {
        let open = self.expect(&Token::LParen, "to open parameter list")?;
        let start = self.mark();
        self.skip_parenthesized(open)?;
        Ok(self.render_range(start, self.mark() - 1))
    }

    // ── Functions ──────────────────────────────────────

    fn function_or_opaque(&mut self, sink: &mut dyn DiagnosticSink) -> Result<Declaration> {
        match self.find_function_name() {
            Some(offset) => Ok(Declaration::Function(self.function(offset, sink)?)),
            None => self.opaque_declaration(),
        }
    }

    /// Opaque text must not hide a contract clause the driver failed to
    /// attach to a declarator
    fn opaque_declaration(&mut self) -> Result<Declaration> {
        let start = self.mark();
        let (text, span) = self.parse_opaque()?;
        let end = self.mark().min(self.tokens.len());
        let captured = &self.tokens[start.min(end)..end];

        for (i, pair) in captured.windows(2).enumerate() {
            let after_parameters = i > 0 && captured[i - 1].token == Token::RParen;
            let stray = match (&pair[0].token, &pair[1].token) {
                (Token::Invariant, Token::LParen) => true,
                (Token::In | Token::Out, Token::LParen) => after_parameters,
                _ => false,
            };
            if stray {
                return Err(Error::syntax(
                    SyntaxErrorKind::UnexpectedToken,
                    format!(
                        "contract clause `{}(` is not attached to a function or aggregate",
                        pair[0].token
                    ),
                    pair[0].span,
                ));
            }
        }
        Ok(Declaration::Opaque { text, span })
    }

    /// Offset from the cursor of the first name followed by `(` outside
    /// any parentheses, before anything that ends a declaration header
    fn find_function_name(&self) -> Option<usize> {
        let mut depth = 0usize;
        let mut offset = 0;
        loop {
            match self.peek_at(offset) {
                Token::Semicolon | Token::LBrace | Token::RBrace | Token::Eof => return None,
                Token::Op("=") if depth == 0 => return None,
                Token::Identifier(_) | Token::This
                    if depth == 0 && self.peek_at(offset + 1) == &Token::LParen =>
                {
                    return Some(offset)
                }
                Token::LParen | Token::LBracket => depth += 1,
                Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            offset += 1;
        }
    }

    fn function(
        &mut self,
        name_offset: usize,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<FunctionDecl> {
        let start = self.mark();
        let prefix = self.render_range(start, start + name_offset);
        self.reset(start + name_offset);

        let name_token = self.advance();
        let name = Identifier::new(name_token.token.to_string(), name_token.span);

        let parameters = self.parenthesized_text()?;

        let attrs_start = self.mark();
        while !matches!(
            self.peek(),
            Token::In
                | Token::Out
                | Token::LBrace
                | Token::Do
                | Token::Body
                | Token::Semicolon
                | Token::RBrace
                | Token::Eof
        ) {
            if let Token::LParen = self.peek() {
                let open = self.advance().span;
                self.skip_parenthesized(open)?;
            } else {
                self.advance();
            }
        }
        let attributes = self.render_range(attrs_start, self.mark());

        let declarator = self.function_declarator(sink)?;
        debug!("parsed function {}", name.value);

        Ok(FunctionDecl {
            prefix,
            name,
            parameters,
            attributes,
            declarator,
        })
    }

    /// Skip to just past the `)` matching the already consumed `(` at `open`
    fn skip_parenthesized(&mut self, open: Span) -> Result<()> {
        let mut depth = 1usize;
        loop {
            match self.peek() {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                Token::Eof => {
                    return Err(self.unexpected(&format!("`)` to close `(` at {}", open)))
                }
                _ => {}
            }
            self.advance();
        }
    }
}
