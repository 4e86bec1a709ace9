//! Expression parser for the assign-expression subset used in contracts
//!
//! Precedence climbing over [`BinaryOp::precedence`]; unary and postfix
//! forms are handled by recursive descent. Every nested level goes through
//! `Parser::enter` so deep input fails with `NestingTooDeep`.

use super::ast::*;
use super::tokenizer::Token;
use super::Parser;
use crate::error::Result;

impl<'t> Parser<'t> {
    /// `AssignExpr`
    pub fn parse_assign_expr(&mut self) -> Result<Expression> {
        self.enter()?;
        let result = self.assign_expr();
        self.leave();
        result
    }

    fn assign_expr(&mut self) -> Result<Expression> {
        let target = self.parse_conditional()?;
        if let Token::Op(op) = self.peek() {
            if let Some(op) = AssignOp::from_op(op) {
                self.advance();
                let value = self.parse_assign_expr()?;
                let span = target.span();
                return Ok(Expression::Assign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                    span,
                });
            }
        }
        Ok(target)
    }

    fn parse_conditional(&mut self) -> Result<Expression> {
        let condition = self.parse_binary(1)?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }

        let then_branch = self.parse_assign_expr()?;
        self.expect(&Token::Colon, "in conditional expression")?;
        self.enter()?;
        let else_branch = self.parse_conditional();
        self.leave();
        let else_branch = else_branch?;

        let span = condition.span();
        Ok(Expression::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span,
        })
    }

    /// Binary operator at the cursor and how many tokens spell it
    fn peek_binary_op(&self) -> Option<(BinaryOp, usize)> {
        match self.peek() {
            Token::In => Some((BinaryOp::In, 1)),
            Token::Is => Some((BinaryOp::Is, 1)),
            Token::Op("!") => match self.peek_at(1) {
                Token::In => Some((BinaryOp::NotIn, 2)),
                Token::Is => Some((BinaryOp::NotIs, 2)),
                _ => None,
            },
            Token::Op(op) => BinaryOp::from_op(op).map(|b| (b, 1)),
            _ => None,
        }
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression> {
        let mut lhs = self.parse_unary()?;

        while let Some((op, width)) = self.peek_binary_op() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            for _ in 0..width {
                self.advance();
            }

            let next_min = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            self.enter()?;
            let rhs = self.parse_binary(next_min);
            self.leave();
            let rhs = rhs?;

            let span = lhs.span();
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if let Token::Op(op) = self.peek() {
            if let Some(op) = UnaryOp::from_op(op) {
                let span = self.advance().span;
                self.enter()?;
                let operand = self.parse_unary();
                self.leave();
                return Ok(Expression::Unary {
                    op,
                    operand: Box::new(operand?),
                    span,
                });
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;

        loop {
            let span = expr.span();
            expr = match self.peek() {
                Token::LParen => {
                    self.advance();
                    let arguments = self.parse_arguments(&Token::RParen)?;
                    Expression::Call {
                        callee: Box::new(expr),
                        arguments,
                        span,
                    }
                }
                Token::LBracket => {
                    self.advance();
                    self.parse_index_or_slice(expr)?
                }
                Token::Dot => {
                    self.advance();
                    let member = self.expect_identifier("after `.`")?;
                    Expression::Member {
                        base: Box::new(expr),
                        member,
                        span,
                    }
                }
                Token::Op("++") | Token::Op("--") => {
                    let op = if self.check(&Token::Op("++")) {
                        PostfixOp::Increment
                    } else {
                        PostfixOp::Decrement
                    };
                    self.advance();
                    Expression::Postfix {
                        op,
                        operand: Box::new(expr),
                        span,
                    }
                }
                _ => break,
            };
        }

        Ok(expr)
    }

    /// Called with the cursor just past `[`
    fn parse_index_or_slice(&mut self, base: Expression) -> Result<Expression> {
        let span = base.span();

        if self.eat(&Token::RBracket) {
            return Ok(Expression::Slice {
                base: Box::new(base),
                bounds: None,
                span,
            });
        }

        let first = self.parse_assign_expr()?;
        if self.eat(&Token::Op("..")) {
            let upper = self.parse_assign_expr()?;
            self.expect(&Token::RBracket, "to close slice")?;
            return Ok(Expression::Slice {
                base: Box::new(base),
                bounds: Some((Box::new(first), Box::new(upper))),
                span,
            });
        }

        let mut indices = vec![first];
        while self.eat(&Token::Comma) {
            if self.check(&Token::RBracket) {
                break;
            }
            indices.push(self.parse_assign_expr()?);
        }
        self.expect(&Token::RBracket, "to close index")?;
        Ok(Expression::Index {
            base: Box::new(base),
            indices,
            span,
        })
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed;
    /// called with the cursor just past the opening delimiter
    fn parse_arguments(&mut self, close: &Token) -> Result<Vec<Expression>> {
        let mut arguments = Vec::new();
        if self.eat(close) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_assign_expr()?);
            if self.eat(&Token::Comma) {
                if self.eat(close) {
                    break;
                }
                continue;
            }
            self.expect(close, "to close argument list")?;
            break;
        }
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let span = self.span();
        if let Some(name) = self.peek().identifier_name() {
            self.advance();
            return Ok(Expression::Identifier(Identifier::new(name.to_string(), span)));
        }
        let expr = match self.peek() {
            Token::IntegerLiteral(text) => Expression::Literal(Literal::Integer(text.clone()), span),
            Token::FloatLiteral(text) => Expression::Literal(Literal::Float(text.clone()), span),
            Token::StringLiteral(text) => Expression::Literal(Literal::String(text.clone()), span),
            Token::CharLiteral(c) => Expression::Literal(Literal::Char(*c), span),
            Token::BooleanLiteral(b) => Expression::Literal(Literal::Bool(*b), span),
            Token::Null => Expression::Literal(Literal::Null, span),
            Token::This => Expression::This(span),
            Token::Op("$") => Expression::Dollar(span),
            Token::LParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_assign_expr();
                self.leave();
                let inner = inner?;
                self.expect(&Token::RParen, "to close parenthesized expression")?;
                return Ok(Expression::Paren(Box::new(inner), span));
            }
            Token::LBracket => {
                self.advance();
                let elements = self.parse_arguments(&Token::RBracket)?;
                return Ok(Expression::Array(elements, span));
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(expr)
    }

    pub(crate) fn expect_identifier(&mut self, context: &str) -> Result<Identifier> {
        match self.peek().identifier_name() {
            Some(name) => {
                let span = self.advance().span;
                Ok(Identifier::new(name.to_string(), span))
            }
            None => Err(self.unexpected(&format!("an identifier {}", context))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxErrorKind;
    use crate::parser::tokenize;

    fn parse_expr(input: &str) -> Expression {
        let tokens = tokenize(input).unwrap();
        let mut parser = Parser::new(&tokens);
        let expr = parser.parse_assign_expr().unwrap();
        assert!(parser.is_at_end(), "trailing tokens in {:?}", input);
        expr
    }

    fn parse_expr_err(input: &str) -> crate::Error {
        let tokens = tokenize(input).unwrap();
        let mut parser = Parser::new(&tokens);
        parser.parse_assign_expr().unwrap_err()
    }

    fn is_ident(expr: &Expression, name: &str) -> bool {
        matches!(expr, Expression::Identifier(id) if id.value == name)
    }

    // ── Precedence ─────────────────────────────────────

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let expr = parse_expr("a + b * c");
        match expr {
            Expression::Binary { op: BinaryOp::Add, lhs, rhs, .. } => {
                assert!(is_ident(&lhs, "a"));
                assert!(matches!(*rhs, Expression::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_comparison_below_arithmetic() {
        let expr = parse_expr("a > b - 1");
        assert!(matches!(expr, Expression::Binary { op: BinaryOp::Gt, .. }));
    }

    #[test]
    fn test_logical_operators() {
        let expr = parse_expr("a && b || c");
        match expr {
            Expression::Binary { op: BinaryOp::OrOr, lhs, .. } => {
                assert!(matches!(*lhs, Expression::Binary { op: BinaryOp::AndAnd, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse_expr("a - b - c");
        match expr {
            Expression::Binary { op: BinaryOp::Sub, lhs, rhs, .. } => {
                assert!(matches!(*lhs, Expression::Binary { op: BinaryOp::Sub, .. }));
                assert!(is_ident(&rhs, "c"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_expr("a ^^ b ^^ c");
        match expr {
            Expression::Binary { op: BinaryOp::Pow, lhs, rhs, .. } => {
                assert!(is_ident(&lhs, "a"));
                assert!(matches!(*rhs, Expression::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_in_and_not_is() {
        assert!(matches!(
            parse_expr("k !in table"),
            Expression::Binary { op: BinaryOp::NotIn, .. }
        ));
        assert!(matches!(
            parse_expr("p !is null"),
            Expression::Binary { op: BinaryOp::NotIs, .. }
        ));
        assert!(matches!(
            parse_expr("k in table"),
            Expression::Binary { op: BinaryOp::In, .. }
        ));
    }

    // ── Assignment & conditional ───────────────────────

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expr("a = b += 1");
        match expr {
            Expression::Assign { op: AssignOp::Assign, value, .. } => {
                assert!(matches!(*value, Expression::Assign { op: AssignOp::Add, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_conditional_expression() {
        let expr = parse_expr("a ? b : c ? d : e");
        match expr {
            Expression::Conditional { else_branch, .. } => {
                assert!(matches!(*else_branch, Expression::Conditional { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    // ── Unary & postfix ────────────────────────────────

    #[test]
    fn test_unary_operators() {
        let expr = parse_expr("!*p");
        match expr {
            Expression::Unary { op: UnaryOp::Not, operand, .. } => {
                assert!(matches!(*operand, Expression::Unary { op: UnaryOp::Deref, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_member_index_chain() {
        let expr = parse_expr("obj.items[i].check(x, y,)");
        match expr {
            Expression::Call { callee, arguments, .. } => {
                assert_eq!(arguments.len(), 2);
                assert!(matches!(*callee, Expression::Member { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_body_is_an_identifier_in_expressions() {
        assert!(is_ident(&parse_expr("body"), "body"));
        match parse_expr("node.body.length") {
            Expression::Member { base, member, .. } => {
                assert_eq!(member.value, "length");
                assert!(matches!(*base, Expression::Member { ref member, .. } if member.value == "body"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_slices() {
        assert!(matches!(
            parse_expr("a[]"),
            Expression::Slice { bounds: None, .. }
        ));
        assert!(matches!(
            parse_expr("a[1 .. $]"),
            Expression::Slice { bounds: Some(_), .. }
        ));
    }

    #[test]
    fn test_postfix_increment() {
        assert!(matches!(
            parse_expr("i++"),
            Expression::Postfix { op: PostfixOp::Increment, .. }
        ));
    }

    // ── Primaries ──────────────────────────────────────

    #[test]
    fn test_literals() {
        assert!(matches!(
            parse_expr("0xFF"),
            Expression::Literal(Literal::Integer(ref s), _) if s == "0xFF"
        ));
        assert!(matches!(
            parse_expr("null"),
            Expression::Literal(Literal::Null, _)
        ));
        assert!(matches!(
            parse_expr(r#""msg""#),
            Expression::Literal(Literal::String(ref s), _) if s == "msg"
        ));
        assert!(matches!(parse_expr("this"), Expression::This(_)));
    }

    #[test]
    fn test_parentheses_are_kept() {
        assert!(matches!(parse_expr("(a)"), Expression::Paren(..)));
    }

    #[test]
    fn test_array_literal() {
        match parse_expr("[1, 2, 3]") {
            Expression::Array(elements, _) => assert_eq!(elements.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    // ── Errors ─────────────────────────────────────────

    #[test]
    fn test_missing_operand() {
        let err = parse_expr_err("a +");
        assert_eq!(err.kind(), Some(SyntaxErrorKind::UnexpectedToken));
        assert!(err.message().contains("expected an expression"));
    }

    #[test]
    fn test_unclosed_call() {
        let err = parse_expr_err("f(a b");
        assert!(err.message().contains("to close argument list"));
    }

    #[test]
    fn test_expression_spans_start_at_first_token() {
        let expr = parse_expr("  a > 0");
        assert_eq!(expr.span().column, 3);
    }
}
