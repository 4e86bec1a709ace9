//! Contract lowering: rewrites contract expressions into legacy blocks
//!
//! The output is indistinguishable from hand-written `in { assert(...); }`,
//! `out(r) { assert(...); }` and `invariant { assert(...); }` blocks, so no
//! later phase needs to know the expression syntax existed.
//!
//! # Guarantees
//!
//! - **Total**: every IR the parser accepts lowers; there is no error path
//! - **Order preserving**: asserts appear in clause order, synthesized
//!   asserts ahead of hand-written statements of the same kind
//! - **One block per kind**: N `in(...)` clauses become one `in` block
//!   holding N asserts
//! - **Deterministic**: same IR always lowers to the same fragment

use log::{debug, trace};

use crate::parser::ast::*;
use crate::parser::tokenizer::Span;

/// Legacy-form contract blocks of one declarator, at most one per kind,
/// ordered `in`, `out`, `invariant`
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct LoweredContracts {
    pub blocks: Vec<LegacyContractBlock>,
}

impl LoweredContracts {
    pub fn block(&self, kind: ContractKind) -> Option<&LegacyContractBlock> {
        self.blocks.iter().find(|b| b.kind() == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Statements and result name gathered for one contract kind
#[derive(Default)]
struct Merge {
    statements: Vec<Statement>,
    parameter: Option<Identifier>,
    span: Option<Span>,
    body_span: Option<Span>,
}

impl Merge {
    fn assert(&mut self, condition: Expression, message: Option<Expression>, span: Span) {
        trace!("synthesized assert at {}", span);
        self.span.get_or_insert(span);
        self.body_span.get_or_insert(span);
        self.statements.push(Statement::Assert(AssertStmt {
            condition,
            message,
            span,
        }));
    }

    fn legacy(&mut self, block: Block, span: Span) {
        self.span.get_or_insert(span);
        self.body_span.get_or_insert(block.span);
        self.statements.extend(block.statements);
    }

    fn name(&mut self, parameter: Option<Identifier>) {
        if self.parameter.is_none() {
            self.parameter = parameter;
        }
    }

    fn finish(self, kind: ContractKind) -> Option<LegacyContractBlock> {
        let span = self.span?;
        let body = Block {
            statements: self.statements,
            span: self.body_span.unwrap_or(span),
        };
        Some(match kind {
            ContractKind::In => LegacyContractBlock::In { body, span },
            ContractKind::Out => LegacyContractBlock::Out {
                parameter: self.parameter,
                body,
                span,
            },
            ContractKind::Invariant => LegacyContractBlock::Invariant { body, span },
        })
    }
}

// ── Public API ─────────────────────────────────────────────

/// Lower the contract expressions of one declarator, merging them ahead of
/// the legacy blocks already written for the same kind
pub fn lower_contracts(
    contracts: ContractExpressionList,
    legacy: Vec<LegacyContractBlock>,
) -> LoweredContracts {
    let expression_count = contracts.len();
    let legacy_count = legacy.len();

    let mut ins = Merge::default();
    let mut outs = Merge::default();
    let mut invariants = Merge::default();

    for clause in contracts {
        match clause {
            ContractExpression::In {
                condition,
                message,
                span,
            } => ins.assert(condition, message, span),
            ContractExpression::Out {
                parameter,
                condition,
                message,
                span,
            } => {
                outs.name(parameter);
                outs.assert(condition, message, span);
            }
        }
    }

    for block in legacy {
        match block {
            LegacyContractBlock::In { body, span } => ins.legacy(body, span),
            LegacyContractBlock::Out {
                parameter,
                body,
                span,
            } => {
                outs.name(parameter);
                outs.legacy(body, span);
            }
            LegacyContractBlock::Invariant { body, span } => invariants.legacy(body, span),
        }
    }

    let blocks: Vec<_> = [
        ins.finish(ContractKind::In),
        outs.finish(ContractKind::Out),
        invariants.finish(ContractKind::Invariant),
    ]
    .into_iter()
    .flatten()
    .collect();

    debug!(
        "lowered {} contract expression(s) and {} legacy block(s) into {} block(s)",
        expression_count,
        legacy_count,
        blocks.len()
    );
    LoweredContracts { blocks }
}

/// Lower a declarator: its contract expressions move into its legacy blocks
pub fn lower_declarator(declarator: FunctionDeclarator) -> FunctionDeclarator {
    let FunctionDeclarator {
        contracts,
        legacy,
        body,
        span,
    } = declarator;
    FunctionDeclarator {
        contracts: ContractExpressionList::new(),
        legacy: lower_contracts(contracts, legacy).blocks,
        body,
        span,
    }
}

/// Lower an invariant to its `invariant { ... }` block
pub fn lower_invariant(invariant: InvariantDeclaration) -> LegacyContractBlock {
    let span = invariant.span;
    LegacyContractBlock::Invariant {
        body: invariant_body(invariant),
        span,
    }
}

/// Lower an invariant, keeping it a declaration so it can be spliced back
/// into its aggregate
pub fn lower_invariant_declaration(invariant: InvariantDeclaration) -> InvariantDeclaration {
    let span = invariant.span;
    InvariantDeclaration {
        form: InvariantForm::Legacy(invariant_body(invariant)),
        span,
    }
}

fn invariant_body(invariant: InvariantDeclaration) -> Block {
    let span = invariant.span;
    match invariant.form {
        InvariantForm::Expression { condition, message } => {
            trace!("synthesized invariant assert at {}", span);
            Block {
                statements: vec![Statement::Assert(AssertStmt {
                    condition,
                    message,
                    span,
                })],
                span,
            }
        }
        InvariantForm::Legacy(block) => block,
    }
}

/// Lower every declarator and invariant in a file; everything else is
/// returned untouched
pub fn lower_source_file(file: SourceFile) -> SourceFile {
    SourceFile {
        declarations: file.declarations.into_iter().map(lower_declaration).collect(),
    }
}

fn lower_declaration(declaration: Declaration) -> Declaration {
    match declaration {
        Declaration::Function(function) => Declaration::Function(FunctionDecl {
            declarator: lower_declarator(function.declarator),
            ..function
        }),
        Declaration::Aggregate(aggregate) => Declaration::Aggregate(AggregateDecl {
            members: aggregate
                .members
                .into_iter()
                .map(lower_declaration)
                .collect(),
            ..aggregate
        }),
        Declaration::Invariant(invariant) => {
            Declaration::Invariant(lower_invariant_declaration(invariant))
        }
        opaque @ Declaration::Opaque { .. } => opaque,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::diagnostic::IgnoreDiagnostics;
    use crate::parser::{parse, parse_contract_expressions, parse_declarator, parse_invariant};

    fn expressions(input: &str) -> ContractExpressionList {
        parse_contract_expressions(input, &ParserConfig::default(), &mut IgnoreDiagnostics)
            .unwrap()
    }

    fn declarator(input: &str) -> FunctionDeclarator {
        parse_declarator(input, &ParserConfig::default(), &mut IgnoreDiagnostics).unwrap()
    }

    fn asserts(block: &LegacyContractBlock) -> Vec<&AssertStmt> {
        block.body().asserts().collect()
    }

    fn name_of(expr: &Expression) -> &str {
        match expr {
            Expression::Identifier(id) => &id.value,
            other => panic!("expected identifier, got {:?}", other),
        }
    }

    // ── Partitioning ───────────────────────────────────

    #[test]
    fn test_in_clauses_become_one_block() {
        let lowered = lower_contracts(expressions("in(a) in(b) in(c)"), Vec::new());
        assert_eq!(lowered.blocks.len(), 1);
        let block = lowered.block(ContractKind::In).unwrap();
        let names: Vec<_> = asserts(block).iter().map(|a| name_of(&a.condition)).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_interleaved_clauses_partition_by_kind() {
        let lowered = lower_contracts(expressions("out(; x) in(a) out(; y) in(b)"), Vec::new());
        let kinds: Vec<_> = lowered.blocks.iter().map(|b| b.kind()).collect();
        assert_eq!(kinds, vec![ContractKind::In, ContractKind::Out]);

        let ins = asserts(lowered.block(ContractKind::In).unwrap());
        assert_eq!(name_of(&ins[0].condition), "a");
        assert_eq!(name_of(&ins[1].condition), "b");
        let outs = asserts(lowered.block(ContractKind::Out).unwrap());
        assert_eq!(name_of(&outs[0].condition), "x");
        assert_eq!(name_of(&outs[1].condition), "y");
    }

    #[test]
    fn test_messages_are_carried() {
        let lowered = lower_contracts(expressions(r#"in(a, "first") in(b)"#), Vec::new());
        let ins = asserts(lowered.block(ContractKind::In).unwrap());
        assert!(ins[0].message.is_some());
        assert!(ins[1].message.is_none());
    }

    #[test]
    fn test_out_name_comes_from_first_named_clause() {
        let lowered = lower_contracts(expressions("out(; true) out(r; r > 0)"), Vec::new());
        let out = lowered.block(ContractKind::Out).unwrap();
        assert_eq!(out.parameter().unwrap().value, "r");
    }

    #[test]
    fn test_empty_list_lowers_to_nothing() {
        assert!(lower_contracts(Vec::new(), Vec::new()).is_empty());
    }

    // ── Merging with legacy blocks ─────────────────────

    #[test]
    fn test_synthesized_asserts_precede_legacy_statements() {
        let decl = declarator("in(a > 0) in { assert(b >= 0); } do { }");
        let lowered = lower_declarator(decl);
        assert!(lowered.contracts.is_empty());
        assert_eq!(lowered.legacy.len(), 1);
        let ins = asserts(&lowered.legacy[0]);
        assert_eq!(ins.len(), 2);
        assert!(matches!(ins[0].condition, Expression::Binary { .. }));
        assert!(matches!(&ins[1].condition, Expression::Binary { lhs, .. } if name_of(lhs) == "b"));
    }

    #[test]
    fn test_out_name_from_legacy_block() {
        let decl = declarator("out(; true) out(r) { assert(r); } do { }");
        let lowered = lower_declarator(decl);
        assert_eq!(lowered.legacy[0].parameter().unwrap().value, "r");
        assert_eq!(lowered.legacy[0].body().statements.len(), 2);
    }

    #[test]
    fn test_legacy_only_passes_through() {
        let decl = declarator("in { int x = 1; assert(x); } out(r) { } do { return 1; }");
        let lowered = lower_declarator(decl.clone());
        assert_eq!(lowered.legacy, decl.legacy);
        assert_eq!(lowered.body, decl.body);
    }

    #[test]
    fn test_body_is_untouched() {
        let decl = declarator("in(a) { return a; }");
        let body = decl.body.clone();
        assert_eq!(lower_declarator(decl).body, body);
    }

    // ── Invariants ─────────────────────────────────────

    #[test]
    fn test_invariant_expression_becomes_one_assert() {
        let inv = parse_invariant(
            r#"invariant(data != 0, "cannot be 0");"#,
            &ParserConfig::default(),
            &mut IgnoreDiagnostics,
        )
        .unwrap();
        let block = lower_invariant(inv);
        assert_eq!(block.kind(), ContractKind::Invariant);
        let list = asserts(&block);
        assert_eq!(list.len(), 1);
        assert!(list[0].message.is_some());
    }

    #[test]
    fn test_legacy_invariant_passes_through() {
        let inv = parse_invariant(
            "invariant { assert(a); assert(b); }",
            &ParserConfig::default(),
            &mut IgnoreDiagnostics,
        )
        .unwrap();
        let original = match &inv.form {
            InvariantForm::Legacy(block) => block.clone(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(lower_invariant(inv).body(), &original);
    }

    // ── Source files ───────────────────────────────────

    #[test]
    fn test_lower_source_file_reaches_members() {
        let file = parse(
            "class C { invariant(x > 0); int f() in(a) out(r; r) { return a; } } int g;",
        )
        .unwrap();
        let lowered = lower_source_file(file);
        match &lowered.declarations[0] {
            Declaration::Aggregate(c) => {
                assert!(matches!(
                    &c.members[0],
                    Declaration::Invariant(InvariantDeclaration {
                        form: InvariantForm::Legacy(_),
                        ..
                    })
                ));
                match &c.members[1] {
                    Declaration::Function(f) => {
                        assert!(f.declarator.contracts.is_empty());
                        assert_eq!(f.declarator.legacy.len(), 2);
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(lowered.declarations[1], Declaration::Opaque { .. }));
    }

    #[test]
    fn test_lowering_is_deterministic() {
        let input = r#"in(a > 0, "a") out(r; r < a) in(b) out(; r != 0)"#;
        let first = lower_contracts(expressions(input), Vec::new());
        for _ in 0..100 {
            assert_eq!(lower_contracts(expressions(input), Vec::new()), first);
        }
    }
}
