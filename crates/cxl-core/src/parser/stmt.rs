//! Statements inside legacy contract blocks and function bodies
//!
//! Only the statements contracts care about are modelled (`assert`,
//! `return`, expression statements, nested blocks). Everything else is
//! captured verbatim so legacy blocks pass through lowering unchanged.

use super::ast::*;
use super::tokenizer::{Span, Token};
use super::Parser;
use crate::error::{Result, SyntaxErrorKind};

/// Words that continue a statement past a closing brace group
const CONTINUATIONS: &[&str] = &["else", "catch", "finally", "while"];

impl<'t> Parser<'t> {
    /// `{ Statement* }`
    pub fn parse_block(&mut self) -> Result<Block> {
        let span = self.expect(&Token::LBrace, "to open block")?;
        self.enter()?;
        let statements = self.block_statements();
        self.leave();
        Ok(Block {
            statements: statements?,
            span,
        })
    }

    fn block_statements(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    return Ok(statements);
                }
                Token::Eof => return Err(self.unexpected("`}` to close block")),
                _ => statements.push(self.parse_statement()?),
            }
        }
    }

    pub fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek() {
            Token::LBrace => Ok(Statement::Block(self.parse_block()?)),
            Token::Assert => Ok(Statement::Assert(self.parse_assert_statement()?)),
            Token::Return => {
                let span = self.advance().span;
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_assign_expr()?)
                };
                self.expect(&Token::Semicolon, "after return statement")?;
                Ok(Statement::Return { value, span })
            }
            _ => {
                let mark = self.mark();
                match self.parse_assign_expr() {
                    Ok(expr) => {
                        if self.eat(&Token::Semicolon) {
                            return Ok(Statement::Expression(expr));
                        }
                    }
                    Err(e) if e.kind() == Some(SyntaxErrorKind::NestingTooDeep) => return Err(e),
                    Err(_) => {}
                }
                self.reset(mark);
                let (text, span) = self.parse_opaque()?;
                Ok(Statement::Opaque { text, span })
            }
        }
    }

    /// `assert ( ContractParameters ) ;`
    fn parse_assert_statement(&mut self) -> Result<AssertStmt> {
        let span = self.advance().span;
        let open = self.expect(&Token::LParen, "after `assert`")?;
        let (condition, message) = self.parse_contract_parameters(open)?;
        self.expect(&Token::Semicolon, "after assert statement")?;
        Ok(AssertStmt {
            condition,
            message,
            span,
        })
    }

    /// Consume one statement or declaration this module does not model:
    /// up to a `;` outside parentheses, or through a brace group
    pub(crate) fn parse_opaque(&mut self) -> Result<(String, Span)> {
        let start = self.mark();
        let span = self.span();
        let mut depth = 0usize;

        loop {
            match self.peek() {
                Token::Eof => return Err(self.unexpected("`;` or `}` to end statement")),
                Token::LParen | Token::LBracket => {
                    depth += 1;
                    self.advance();
                }
                Token::RParen | Token::RBracket => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                Token::Semicolon if depth == 0 => {
                    self.advance();
                    break;
                }
                Token::LBrace => {
                    self.skip_brace_group()?;
                    if depth == 0 && !self.continues_statement() {
                        break;
                    }
                }
                // statement missing its `;` right before the enclosing `}`
                Token::RBrace if depth == 0 && self.mark() > start => break,
                _ => {
                    self.advance();
                }
            }
        }

        Ok((self.render_range(start, self.mark()), span))
    }

    fn skip_brace_group(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                Token::Eof => return Err(self.unexpected("`}` to close block")),
                _ => {}
            }
            self.advance();
        }
    }

    fn continues_statement(&self) -> bool {
        matches!(self.peek(), Token::Identifier(word) if CONTINUATIONS.contains(&word.as_str()))
    }
}
