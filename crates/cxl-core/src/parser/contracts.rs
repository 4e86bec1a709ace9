//! Contract Clause Parser
//!
//! Recognizes contract expressions after a parameter list and the three
//! forms of `invariant`, producing the contract IR:
//!
//! ```text
//! ContractParameters := AssignExpr [','] | AssignExpr ',' AssignExpr [',']
//! InExpression       := 'in' '(' ContractParameters ')'
//! OutExpression      := 'out' '(' ';' ContractParameters ')'
//!                     | 'out' '(' Identifier ';' ContractParameters ')'
//! Invariant          := 'invariant' '(' ')' Block
//!                     | 'invariant' Block
//!                     | 'invariant' '(' ContractParameters ')' ';'
//! ```
//!
//! Shape rules enforced here (lowering relies on them and never fails):
//! - `out(ident)` not followed by `{` is rejected, never guessed at
//! - contract expressions must precede every legacy block of the declarator
//! - all `out` clauses of one declarator agree on the result name
//! - a body-less declarator with contract expressions ends in `;`

use log::{debug, trace};

use super::ast::*;
use super::tokenizer::{Span, Token};
use super::Parser;
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::error::{Error, Result, SyntaxErrorKind};

/// What the tokens at the cursor start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Expression(ContractKind),
    Legacy(ContractKind),
    None,
}

impl<'t> Parser<'t> {
    // ── Entry points ───────────────────────────────────

    /// Parse everything between a parameter list and the end of the
    /// declaration: contract expressions, legacy blocks, then the body,
    /// `;`, or nothing.
    ///
    /// Errors are reported to `sink` and returned.
    pub fn parse_function_declarator(
        &mut self,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<FunctionDeclarator> {
        self.function_declarator(sink).map_err(|e| sink.fail(e))
    }

    /// Parse `ContractExpression+` and stop at the first token that does
    /// not start one.
    pub fn parse_contract_expressions(
        &mut self,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<ContractExpressionList> {
        self.contract_expressions().map_err(|e| sink.fail(e))
    }

    /// Parse an invariant with the cursor just past the `invariant` keyword
    pub fn parse_invariant(
        &mut self,
        keyword: Span,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<InvariantDeclaration> {
        self.invariant_tail(keyword).map_err(|e| sink.fail(e))
    }

    // ── Function contracts ─────────────────────────────

    pub(crate) fn function_declarator(
        &mut self,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<FunctionDeclarator> {
        let span = self.span();
        let mut contracts = ContractExpressionList::new();
        let mut legacy: Vec<LegacyContractBlock> = Vec::new();

        loop {
            match self.classify_clause()? {
                Clause::Expression(kind) => {
                    if let Some(first) = legacy.first() {
                        return Err(Error::syntax(
                            SyntaxErrorKind::LegacyBeforeNewContract,
                            format!(
                                "contract expression `{}(...)` follows the legacy `{}` block at {}; \
                                 contract expressions must come first",
                                kind,
                                first.kind(),
                                first.span()
                            ),
                            self.span(),
                        ));
                    }
                    contracts.push(self.contract_expression(kind)?);
                }
                Clause::Legacy(kind) => {
                    let block = self.legacy_block(kind)?;
                    if let Some(previous) = legacy.iter().find(|b| b.kind() == kind) {
                        return Err(Error::syntax(
                            SyntaxErrorKind::DuplicateContractBlock,
                            format!(
                                "second legacy `{}` block; the first is at {}",
                                kind,
                                previous.span()
                            ),
                            block.span(),
                        ));
                    }
                    legacy.push(block);
                }
                Clause::None => break,
            }
        }

        check_out_parameters(&contracts, &legacy)?;
        let body = self.function_body(!contracts.is_empty(), !legacy.is_empty(), sink)?;

        debug!(
            "parsed declarator at {}: {} contract expression(s), {} legacy block(s)",
            span,
            contracts.len(),
            legacy.len()
        );

        Ok(FunctionDeclarator {
            contracts,
            legacy,
            body,
            span,
        })
    }

    pub(crate) fn contract_expressions(&mut self) -> Result<ContractExpressionList> {
        let mut contracts = ContractExpressionList::new();
        while let Clause::Expression(kind) = self.classify_clause()? {
            contracts.push(self.contract_expression(kind)?);
        }
        if contracts.is_empty() {
            return Err(self.unexpected("a contract expression `in(...)` or `out(...)`"));
        }
        check_out_parameters(&contracts, &[])?;
        Ok(contracts)
    }

    /// Decide what starts at the cursor without consuming anything
    fn classify_clause(&self) -> Result<Clause> {
        match self.peek() {
            Token::In => match self.peek_at(1) {
                Token::LParen => Ok(Clause::Expression(ContractKind::In)),
                Token::LBrace => Ok(Clause::Legacy(ContractKind::In)),
                other => Err(Error::syntax(
                    SyntaxErrorKind::UnexpectedToken,
                    format!("expected `(` or `{{` after `in`, found `{}`", other),
                    self.span(),
                )),
            },
            Token::Out => self.classify_out(),
            _ => Ok(Clause::None),
        }
    }

    /// `out {`, `out() {` and `out(ident) {` are legacy blocks;
    /// `out(;` and `out(ident;` are contract expressions.
    fn classify_out(&self) -> Result<Clause> {
        let legacy = Ok(Clause::Legacy(ContractKind::Out));
        let expression = Ok(Clause::Expression(ContractKind::Out));

        match self.peek_at(1) {
            Token::LBrace => legacy,
            Token::LParen => match self.peek_at(2) {
                Token::Semicolon => expression,
                Token::Identifier(name) => match self.peek_at(3) {
                    Token::Semicolon => expression,
                    Token::RParen if self.peek_at(4) == &Token::LBrace => legacy,
                    Token::RParen => Err(Error::syntax(
                        SyntaxErrorKind::AmbiguousOutIdentifier,
                        format!(
                            "`out({0})` is ambiguous: write `out({0}) {{ ... }}` to bind the result, \
                             or `out(; {0})` / `out(r; {0})` to assert it",
                            name
                        ),
                        self.span(),
                    )),
                    _ => Err(missing_out_semicolon(self.span())),
                },
                Token::RParen if self.peek_at(3) == &Token::LBrace => legacy,
                Token::RParen => Err(Error::syntax(
                    SyntaxErrorKind::MalformedContractParameters,
                    "contract expression `out()` has no condition",
                    self.span(),
                )),
                _ => Err(missing_out_semicolon(self.span())),
            },
            other => Err(Error::syntax(
                SyntaxErrorKind::UnexpectedToken,
                format!("expected `(` or `{{` after `out`, found `{}`", other),
                self.span(),
            )),
        }
    }

    fn contract_expression(&mut self, kind: ContractKind) -> Result<ContractExpression> {
        let span = self.advance().span;
        let open = self.expect(&Token::LParen, &format!("after `{}`", kind))?;

        let clause = match kind {
            ContractKind::Out => {
                let parameter = match self.peek() {
                    Token::Identifier(_) => Some(self.expect_identifier("for the result")?),
                    _ => None,
                };
                self.expect(&Token::Semicolon, "in `out` contract expression")?;
                let (condition, message) = self.parse_contract_parameters(open)?;
                ContractExpression::Out {
                    parameter,
                    condition,
                    message,
                    span,
                }
            }
            _ => {
                let (condition, message) = self.parse_contract_parameters(open)?;
                ContractExpression::In {
                    condition,
                    message,
                    span,
                }
            }
        };

        trace!("contract expression `{}` at {}", kind, span);
        Ok(clause)
    }

    /// One or two assign-expressions with an optional trailing comma,
    /// consumed through the closing `)`; `open` is the `(` span
    pub(crate) fn parse_contract_parameters(
        &mut self,
        open: Span,
    ) -> Result<(Expression, Option<Expression>)> {
        if matches!(self.peek(), Token::RParen | Token::Comma) {
            return Err(Error::syntax(
                SyntaxErrorKind::MalformedContractParameters,
                format!("contract parameters opened at {} have no condition", open),
                self.span(),
            ));
        }

        let condition = self.parse_assign_expr()?;
        if self.eat(&Token::RParen) {
            return Ok((condition, None));
        }
        self.expect(&Token::Comma, "or `)` after contract condition")?;
        if self.eat(&Token::RParen) {
            return Ok((condition, None));
        }

        let message = self.parse_assign_expr()?;
        if self.eat(&Token::RParen) {
            return Ok((condition, Some(message)));
        }
        self.expect(&Token::Comma, "or `)` after contract message")?;
        if self.eat(&Token::RParen) {
            return Ok((condition, Some(message)));
        }
        Err(Error::syntax(
            SyntaxErrorKind::MalformedContractParameters,
            format!(
                "contract parameters opened at {} take at most two expressions \
                 (condition, message)",
                open
            ),
            self.span(),
        ))
    }

    // ── Legacy blocks & body ───────────────────────────

    fn legacy_block(&mut self, kind: ContractKind) -> Result<LegacyContractBlock> {
        let span = self.advance().span;
        match kind {
            ContractKind::Out => {
                let mut parameter = None;
                if self.eat(&Token::LParen) {
                    if let Token::Identifier(_) = self.peek() {
                        parameter = Some(self.expect_identifier("for the result")?);
                    }
                    self.expect(&Token::RParen, "after `out` result name")?;
                }
                let body = self.parse_block()?;
                Ok(LegacyContractBlock::Out {
                    parameter,
                    body,
                    span,
                })
            }
            ContractKind::In => Ok(LegacyContractBlock::In {
                body: self.parse_block()?,
                span,
            }),
            ContractKind::Invariant => Ok(LegacyContractBlock::Invariant {
                body: self.parse_block()?,
                span,
            }),
        }
    }

    fn function_body(
        &mut self,
        has_expressions: bool,
        has_legacy: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<FunctionBody> {
        match self.peek() {
            Token::LBrace if has_legacy => Err(self.unexpected(
                "`do` before a function body that follows legacy contract blocks",
            )),
            Token::LBrace => Ok(FunctionBody::Block(self.parse_block()?)),
            Token::Do => {
                self.advance();
                Ok(FunctionBody::Block(self.parse_block()?))
            }
            Token::Body => {
                if !self.config().accept_body_keyword {
                    return Err(self.unexpected("`do` (the `body` keyword is disabled)"));
                }
                let span = self.advance().span;
                sink.report(Diagnostic::warning("`body` is deprecated, use `do`", span));
                Ok(FunctionBody::Block(self.parse_block()?))
            }
            Token::Semicolon => Ok(FunctionBody::Terminated(self.advance().span)),
            _ if has_legacy && !has_expressions => Ok(FunctionBody::Omitted),
            _ => {
                let message = if has_expressions {
                    "declaration with contract expressions and no body must end with `;`"
                } else {
                    "declaration without a body must end with `;`"
                };
                Err(Error::syntax(
                    SyntaxErrorKind::MissingTerminator,
                    format!("{}, found `{}`", message, self.peek()),
                    self.span(),
                ))
            }
        }
    }

    // ── Invariants ─────────────────────────────────────

    pub(crate) fn invariant_tail(&mut self, keyword: Span) -> Result<InvariantDeclaration> {
        let form = match self.peek() {
            Token::LBrace => InvariantForm::Legacy(self.parse_block()?),
            Token::LParen
                if self.peek_at(1) == &Token::RParen && self.peek_at(2) == &Token::LBrace =>
            {
                self.advance();
                self.advance();
                InvariantForm::Legacy(self.parse_block()?)
            }
            Token::LParen => {
                let open = self.advance().span;
                let (condition, message) = self.parse_contract_parameters(open)?;
                if !self.eat(&Token::Semicolon) {
                    return Err(Error::syntax(
                        SyntaxErrorKind::MissingTerminator,
                        format!(
                            "invariant contract expression must end with `;`, found `{}`",
                            self.peek()
                        ),
                        self.span(),
                    ));
                }
                InvariantForm::Expression { condition, message }
            }
            _ => return Err(self.unexpected("`(` or `{` after `invariant`")),
        };

        debug!("parsed invariant at {}", keyword);
        Ok(InvariantDeclaration {
            form,
            span: keyword,
        })
    }
}

fn missing_out_semicolon(span: Span) -> Error {
    Error::syntax(
        SyntaxErrorKind::MalformedContractParameters,
        "`out` contract expression needs `;` before its condition, \
         as in `out(; cond)` or `out(r; cond)`",
        span,
    )
}

/// Every result name bound by the `out` clauses of one declarator, new
/// syntax or legacy, must be the same
fn check_out_parameters(
    contracts: &[ContractExpression],
    legacy: &[LegacyContractBlock],
) -> Result<()> {
    let named = contracts
        .iter()
        .filter_map(|c| match c {
            ContractExpression::Out { parameter, .. } => parameter.as_ref(),
            ContractExpression::In { .. } => None,
        })
        .chain(legacy.iter().filter_map(LegacyContractBlock::parameter));

    let mut first: Option<&Identifier> = None;
    for name in named {
        match first {
            None => first = Some(name),
            Some(bound) if bound.value != name.value => {
                return Err(Error::syntax(
                    SyntaxErrorKind::ConflictingOutParameter,
                    format!(
                        "`out` binds the result as `{}` here but as `{}` at {}",
                        name.value, bound.value, bound.span
                    ),
                    name.span,
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::diagnostic::{IgnoreDiagnostics, Severity};
    use crate::parser::{parse_contract_expressions, parse_declarator, parse_invariant};

    fn declarator(input: &str) -> FunctionDeclarator {
        parse_declarator(input, &ParserConfig::default(), &mut IgnoreDiagnostics)
            .unwrap_or_else(|e| panic!("{} failed: {}", input, e))
    }

    fn declarator_err(input: &str) -> SyntaxErrorKind {
        parse_declarator(input, &ParserConfig::default(), &mut IgnoreDiagnostics)
            .unwrap_err()
            .kind()
            .unwrap_or_else(|| panic!("{} did not fail with a syntax error", input))
    }

    fn expressions(input: &str) -> ContractExpressionList {
        parse_contract_expressions(input, &ParserConfig::default(), &mut IgnoreDiagnostics)
            .unwrap()
    }

    fn invariant(input: &str) -> InvariantDeclaration {
        parse_invariant(input, &ParserConfig::default(), &mut IgnoreDiagnostics).unwrap()
    }

    fn invariant_err(input: &str) -> SyntaxErrorKind {
        parse_invariant(input, &ParserConfig::default(), &mut IgnoreDiagnostics)
            .unwrap_err()
            .kind()
            .unwrap()
    }

    // ── Contract expressions ───────────────────────────

    #[test]
    fn test_in_expression() {
        let list = expressions("in(a > 0)");
        assert_eq!(list.len(), 1);
        match &list[0] {
            ContractExpression::In { message, .. } => assert!(message.is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_in_expression_with_message_and_trailing_comma() {
        let list = expressions(r#"in(a > 0, "a must be positive",)"#);
        match &list[0] {
            ContractExpression::In {
                message: Some(Expression::Literal(Literal::String(s), _)),
                ..
            } => assert_eq!(s, "a must be positive"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_out_expression_forms() {
        let list = expressions("out(; result != 0) out(r; r > 0, \"positive\")");
        assert_eq!(list.len(), 2);
        match &list[0] {
            ContractExpression::Out { parameter, .. } => assert!(parameter.is_none()),
            other => panic!("unexpected {:?}", other),
        }
        match &list[1] {
            ContractExpression::Out {
                parameter: Some(name),
                message: Some(_),
                ..
            } => assert_eq!(name.value, "r"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_encounter_order_is_preserved() {
        let list = expressions("in(a) out(; b) in(c) out(; d)");
        let kinds: Vec<_> = list.iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ContractKind::In,
                ContractKind::Out,
                ContractKind::In,
                ContractKind::Out
            ]
        );
    }

    #[test]
    fn test_bare_identifier_out_is_ambiguous() {
        for input in ["out(i)", "out(result);", "in(a) out(i) do { }"] {
            assert_eq!(
                declarator_err(input),
                SyntaxErrorKind::AmbiguousOutIdentifier,
                "{}",
                input
            );
        }
    }

    #[test]
    fn test_out_without_semicolon_is_malformed() {
        assert_eq!(
            declarator_err("out(r > 0);"),
            SyntaxErrorKind::MalformedContractParameters
        );
        assert_eq!(
            declarator_err("out();"),
            SyntaxErrorKind::MalformedContractParameters
        );
    }

    #[test]
    fn test_parameter_count() {
        assert_eq!(
            declarator_err("in();"),
            SyntaxErrorKind::MalformedContractParameters
        );
        assert_eq!(
            declarator_err("out(; );"),
            SyntaxErrorKind::MalformedContractParameters
        );
        assert_eq!(
            declarator_err("in(a, b, c);"),
            SyntaxErrorKind::MalformedContractParameters
        );
        assert_eq!(
            declarator_err("in(,);"),
            SyntaxErrorKind::MalformedContractParameters
        );
    }

    #[test]
    fn test_conflicting_out_names() {
        assert_eq!(
            declarator_err("out(r; r > 0) out(x; x < 10);"),
            SyntaxErrorKind::ConflictingOutParameter
        );
        assert_eq!(
            declarator_err("out(r; r > 0) out(x) { assert(x); }"),
            SyntaxErrorKind::ConflictingOutParameter
        );
    }

    #[test]
    fn test_absent_out_name_agrees_with_any() {
        let decl = declarator("out(; result > 0) out(r; r < 10);");
        assert_eq!(decl.contracts.len(), 2);
    }

    // ── Declarator shape ───────────────────────────────

    #[test]
    fn test_body_less_declarator_needs_terminator() {
        assert_eq!(declarator_err("in(a > 0)"), SyntaxErrorKind::MissingTerminator);
        let decl = declarator("in(a > 0);");
        assert!(matches!(decl.body, FunctionBody::Terminated(_)));
    }

    #[test]
    fn test_legacy_only_declarator_may_omit_terminator() {
        let decl = declarator("in { assert(a); } out(r) { assert(r); }");
        assert_eq!(decl.legacy.len(), 2);
        assert_eq!(decl.body, FunctionBody::Omitted);
    }

    #[test]
    fn test_plain_body_after_contract_expressions() {
        let decl = declarator("in(a > 0) { return a; }");
        assert!(matches!(decl.body, FunctionBody::Block(_)));
        let decl = declarator("in(a > 0) do { return a; }");
        assert!(matches!(decl.body, FunctionBody::Block(_)));
    }

    #[test]
    fn test_legacy_blocks_need_do_before_body() {
        assert_eq!(
            declarator_err("in { assert(a); } { return a; }"),
            SyntaxErrorKind::UnexpectedToken
        );
        let decl = declarator("in { assert(a); } do { return a; }");
        assert!(matches!(decl.body, FunctionBody::Block(_)));
    }

    #[test]
    fn test_new_syntax_before_legacy_is_accepted() {
        let decl = declarator("in(a > 0) in { assert(b >= 0); } do { return a; }");
        assert_eq!(decl.contracts.len(), 1);
        assert_eq!(decl.legacy.len(), 1);
    }

    #[test]
    fn test_new_syntax_after_legacy_is_rejected() {
        assert_eq!(
            declarator_err("in { assert(b >= 0); } in(a > 0) do { return a; }"),
            SyntaxErrorKind::LegacyBeforeNewContract
        );
        assert_eq!(
            declarator_err("out(r) { assert(r); } out(r; r > 0);"),
            SyntaxErrorKind::LegacyBeforeNewContract
        );
    }

    #[test]
    fn test_duplicate_legacy_block() {
        assert_eq!(
            declarator_err("in { } in { } do { }"),
            SyntaxErrorKind::DuplicateContractBlock
        );
    }

    #[test]
    fn test_legacy_out_forms() {
        let decl = declarator("out { assert(x); } do { }");
        assert!(decl.legacy[0].parameter().is_none());
        let decl = declarator("out() { assert(x); } do { }");
        assert!(decl.legacy[0].parameter().is_none());
        let decl = declarator("out(result) { assert(result); } do { }");
        assert_eq!(decl.legacy[0].parameter().unwrap().value, "result");
    }

    #[test]
    fn test_body_keyword_warns() {
        let mut diagnostics = Vec::new();
        let decl = parse_declarator(
            "in { assert(a); } body { }",
            &ParserConfig::default(),
            &mut diagnostics,
        )
        .unwrap();
        assert!(matches!(decl.body, FunctionBody::Block(_)));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_body_keyword_can_be_disabled() {
        let config = ParserConfig {
            accept_body_keyword: false,
            ..ParserConfig::default()
        };
        let err = parse_declarator("in { assert(a); } body { }", &config, &mut IgnoreDiagnostics)
            .unwrap_err();
        assert_eq!(err.kind(), Some(SyntaxErrorKind::UnexpectedToken));
    }

    #[test]
    fn test_body_names_a_value_inside_contracts() {
        let decl = declarator("in(body.length > 0) out(; body !is null) do { return body; }");
        assert_eq!(decl.contracts.len(), 2);
        assert!(matches!(decl.body, FunctionBody::Block(_)));
    }

    #[test]
    fn test_errors_reach_the_sink_once() {
        let mut diagnostics = Vec::new();
        let result = parse_declarator("out(i);", &ParserConfig::default(), &mut diagnostics);
        assert!(result.is_err());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].kind,
            Some(SyntaxErrorKind::AmbiguousOutIdentifier)
        );
    }

    #[test]
    fn test_error_position_points_at_clause() {
        let err = parse_declarator(
            "in(a)\n  out(i);",
            &ParserConfig::default(),
            &mut IgnoreDiagnostics,
        )
        .unwrap_err();
        assert_eq!(err.span().line, 2);
        assert_eq!(err.span().column, 3);
    }

    // ── Invariants ─────────────────────────────────────

    #[test]
    fn test_invariant_expression_form() {
        let inv = invariant(r#"invariant(data != 0, "cannot be 0");"#);
        match inv.form {
            InvariantForm::Expression { message, .. } => assert!(message.is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invariant_legacy_forms() {
        assert!(matches!(
            invariant("invariant { assert(x); }").form,
            InvariantForm::Legacy(_)
        ));
        assert!(matches!(
            invariant("invariant() { assert(x); }").form,
            InvariantForm::Legacy(_)
        ));
    }

    #[test]
    fn test_invariant_errors() {
        assert_eq!(
            invariant_err("invariant(x)"),
            SyntaxErrorKind::MissingTerminator
        );
        assert_eq!(
            invariant_err("invariant();"),
            SyntaxErrorKind::MalformedContractParameters
        );
        assert_eq!(
            invariant_err("invariant x;"),
            SyntaxErrorKind::UnexpectedToken
        );
    }
}
