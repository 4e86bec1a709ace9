//! Canonical printer: serializes contract fragments and source files to
//! legacy-form text
//!
//! # Layout
//!
//! - Blocks print on one line: `{ stmt stmt }`, or `{ }` when empty
//! - Contract blocks print in the order they are held (`in`, `out`,
//!   `invariant` after lowering), separated by one space
//! - A body that follows contract blocks is introduced by `do`
//! - A source file prints one declaration per line, aggregate members
//!   indented by four spaces per level
//!
//! Printing the result of `lower(parse(print(x)))` reproduces the same text,
//! which is what makes [`fingerprint`] usable for equivalence checks.

use sha2::{Digest, Sha256};

use crate::parser::ast::*;
use crate::parser::tokenizer::{escape_string, Token};

const INDENT: &str = "    ";

// ── Public API ─────────────────────────────────────────────

pub fn print_expression(expr: &Expression) -> String {
    let mut out = String::new();
    write_expression(&mut out, expr);
    out
}

pub fn print_statement(stmt: &Statement) -> String {
    let mut out = String::new();
    write_statement(&mut out, stmt);
    out
}

pub fn print_block(block: &Block) -> String {
    let mut out = String::new();
    write_block(&mut out, block);
    out
}

/// `in(c)`, `out(r; c, m)` or `out(; c)`
pub fn print_contract_expression(clause: &ContractExpression) -> String {
    let mut out = String::new();
    match clause {
        ContractExpression::In {
            condition, message, ..
        } => {
            out.push_str("in(");
            write_parameters(&mut out, condition, message.as_ref());
        }
        ContractExpression::Out {
            parameter,
            condition,
            message,
            ..
        } => {
            out.push_str("out(");
            if let Some(name) = parameter {
                out.push_str(&name.value);
            }
            out.push_str("; ");
            write_parameters(&mut out, condition, message.as_ref());
        }
    }
    out.push(')');
    out
}

/// `in { ... }`, `out(r) { ... }`, `out { ... }` or `invariant { ... }`
pub fn print_legacy_block(block: &LegacyContractBlock) -> String {
    let mut out = block.kind().to_string();
    if let Some(name) = block.parameter() {
        out.push('(');
        out.push_str(&name.value);
        out.push(')');
    }
    out.push(' ');
    write_block(&mut out, block.body());
    out
}

/// Contract blocks separated by single spaces
pub fn print_contract_blocks(blocks: &[LegacyContractBlock]) -> String {
    blocks
        .iter()
        .map(print_legacy_block)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Contract clauses, legacy blocks, then the body (or `;`)
pub fn print_declarator(declarator: &FunctionDeclarator) -> String {
    let mut parts: Vec<String> = declarator
        .contracts
        .iter()
        .map(print_contract_expression)
        .collect();
    parts.extend(declarator.legacy.iter().map(print_legacy_block));

    let mut out = parts.join(" ");
    match &declarator.body {
        FunctionBody::Block(body) => {
            if !out.is_empty() {
                out.push(' ');
            }
            if !declarator.legacy.is_empty() {
                out.push_str("do ");
            }
            write_block(&mut out, body);
        }
        FunctionBody::Terminated(_) => out.push(';'),
        FunctionBody::Omitted => {}
    }
    out
}

pub fn print_invariant(invariant: &InvariantDeclaration) -> String {
    match &invariant.form {
        InvariantForm::Expression { condition, message } => {
            let mut out = String::from("invariant(");
            write_parameters(&mut out, condition, message.as_ref());
            out.push_str(");");
            out
        }
        InvariantForm::Legacy(block) => format!("invariant {}", print_block(block)),
    }
}

pub fn print_declaration(declaration: &Declaration) -> String {
    let mut out = String::new();
    write_declaration(&mut out, declaration, 0);
    out
}

/// One declaration per line, newline-terminated
pub fn print_source_file(file: &SourceFile) -> String {
    let mut out = String::new();
    for declaration in &file.declarations {
        write_declaration(&mut out, declaration, 0);
        out.push('\n');
    }
    out
}

/// Lowercase hex SHA-256 of canonical text
pub fn fingerprint(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ── Expressions ────────────────────────────────────────────

fn write_expression(out: &mut String, expr: &Expression) {
    match expr {
        Expression::Identifier(id) => out.push_str(&id.value),
        Expression::Literal(literal, _) => write_literal(out, literal),
        Expression::This(_) => out.push_str("this"),
        Expression::Dollar(_) => out.push('$'),
        Expression::Paren(inner, _) => {
            out.push('(');
            write_expression(out, inner);
            out.push(')');
        }
        Expression::Array(elements, _) => {
            out.push('[');
            write_list(out, elements);
            out.push(']');
        }
        Expression::Unary { op, operand, .. } => {
            let op = op.as_str();
            let operand = print_expression(operand);
            out.push_str(op);
            // `- -a` must not become `--a`
            if let (Some(last), Some(first)) = (op.chars().last(), operand.chars().next()) {
                if last == first && matches!(last, '+' | '-' | '&') {
                    out.push(' ');
                }
            }
            out.push_str(&operand);
        }
        Expression::Postfix { op, operand, .. } => {
            write_expression(out, operand);
            out.push_str(op.as_str());
        }
        Expression::Binary { op, lhs, rhs, .. } => {
            write_expression(out, lhs);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            write_expression(out, rhs);
        }
        Expression::Assign {
            op, target, value, ..
        } => {
            write_expression(out, target);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            write_expression(out, value);
        }
        Expression::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            write_expression(out, condition);
            out.push_str(" ? ");
            write_expression(out, then_branch);
            out.push_str(" : ");
            write_expression(out, else_branch);
        }
        Expression::Call {
            callee, arguments, ..
        } => {
            write_expression(out, callee);
            out.push('(');
            write_list(out, arguments);
            out.push(')');
        }
        Expression::Index { base, indices, .. } => {
            write_expression(out, base);
            out.push('[');
            write_list(out, indices);
            out.push(']');
        }
        Expression::Slice { base, bounds, .. } => {
            write_expression(out, base);
            out.push('[');
            if let Some((lower, upper)) = bounds {
                write_expression(out, lower);
                out.push_str(" .. ");
                write_expression(out, upper);
            }
            out.push(']');
        }
        Expression::Member { base, member, .. } => {
            write_expression(out, base);
            out.push('.');
            out.push_str(&member.value);
        }
    }
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::Integer(lexeme) | Literal::Float(lexeme) => out.push_str(lexeme),
        Literal::String(s) => {
            out.push('"');
            out.push_str(&escape_string(s));
            out.push('"');
        }
        Literal::Char(c) => out.push_str(&Token::CharLiteral(*c).to_string()),
        Literal::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Literal::Null => out.push_str("null"),
    }
}

fn write_list(out: &mut String, items: &[Expression]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expression(out, item);
    }
}

fn write_parameters(out: &mut String, condition: &Expression, message: Option<&Expression>) {
    write_expression(out, condition);
    if let Some(message) = message {
        out.push_str(", ");
        write_expression(out, message);
    }
}

// ── Statements ─────────────────────────────────────────────

fn write_statement(out: &mut String, stmt: &Statement) {
    match stmt {
        Statement::Assert(assert) => {
            out.push_str("assert(");
            write_parameters(out, &assert.condition, assert.message.as_ref());
            out.push_str(");");
        }
        Statement::Return { value, .. } => {
            out.push_str("return");
            if let Some(value) = value {
                out.push(' ');
                write_expression(out, value);
            }
            out.push(';');
        }
        Statement::Expression(expr) => {
            write_expression(out, expr);
            out.push(';');
        }
        Statement::Block(block) => write_block(out, block),
        Statement::Opaque { text, .. } => out.push_str(text),
    }
}

fn write_block(out: &mut String, block: &Block) {
    out.push('{');
    for stmt in &block.statements {
        out.push(' ');
        write_statement(out, stmt);
    }
    out.push_str(" }");
}

// ── Declarations ───────────────────────────────────────────

fn write_declaration(out: &mut String, declaration: &Declaration, depth: usize) {
    match declaration {
        Declaration::Function(function) => {
            if !function.prefix.is_empty() {
                out.push_str(&function.prefix);
                out.push(' ');
            }
            out.push_str(&function.name.value);
            out.push('(');
            out.push_str(&function.parameters);
            out.push(')');
            if !function.attributes.is_empty() {
                out.push(' ');
                out.push_str(&function.attributes);
            }
            let tail = print_declarator(&function.declarator);
            if !tail.is_empty() && !tail.starts_with(';') {
                out.push(' ');
            }
            out.push_str(&tail);
        }
        Declaration::Aggregate(aggregate) => {
            if !aggregate.prefix.is_empty() {
                out.push_str(&aggregate.prefix);
                out.push(' ');
            }
            out.push_str(&aggregate.kind.to_string());
            out.push(' ');
            out.push_str(&aggregate.name.value);
            if let Some(parameters) = &aggregate.parameters {
                out.push('(');
                out.push_str(parameters);
                out.push(')');
            }
            if let Some(bases) = &aggregate.bases {
                out.push_str(" : ");
                out.push_str(bases);
            }
            if let Some(constraint) = &aggregate.constraint {
                out.push_str(" if(");
                out.push_str(constraint);
                out.push(')');
            }
            if aggregate.members.is_empty() {
                out.push_str(" { }");
                return;
            }
            out.push_str(" {\n");
            for member in &aggregate.members {
                out.push_str(&INDENT.repeat(depth + 1));
                write_declaration(out, member, depth + 1);
                out.push('\n');
            }
            out.push_str(&INDENT.repeat(depth));
            out.push('}');
        }
        Declaration::Invariant(invariant) => out.push_str(&print_invariant(invariant)),
        Declaration::Opaque { text, .. } => out.push_str(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::diagnostic::IgnoreDiagnostics;
    use crate::lower::{lower_contracts, lower_invariant, lower_source_file};
    use crate::parser::{parse, parse_contract_expressions, parse_invariant};

    fn lowered_clauses(input: &str) -> String {
        let list =
            parse_contract_expressions(input, &ParserConfig::default(), &mut IgnoreDiagnostics)
                .unwrap();
        print_contract_blocks(&lower_contracts(list, Vec::new()).blocks)
    }

    fn lowered_file(input: &str) -> String {
        print_source_file(&lower_source_file(parse(input).unwrap()))
    }

    // ── Contract fragments ─────────────────────────────

    #[test]
    fn test_print_lowered_in_and_out() {
        assert_eq!(
            lowered_clauses(r#"in(a > 0) out(r; r > 0, "must be positive")"#),
            r#"in { assert(a > 0); } out(r) { assert(r > 0, "must be positive"); }"#
        );
    }

    #[test]
    fn test_print_unnamed_out() {
        assert_eq!(
            lowered_clauses("out(; result != null)"),
            "out { assert(result != null); }"
        );
    }

    #[test]
    fn test_print_lowered_invariant() {
        let inv = parse_invariant(
            r#"invariant(data != 0, "cannot be 0");"#,
            &ParserConfig::default(),
            &mut IgnoreDiagnostics,
        )
        .unwrap();
        assert_eq!(
            print_legacy_block(&lower_invariant(inv)),
            r#"invariant { assert(data != 0, "cannot be 0"); }"#
        );
    }

    #[test]
    fn test_print_contract_expressions_unlowered() {
        let list = parse_contract_expressions(
            r#"in(a,) out(; b, "m") out(r; r)"#,
            &ParserConfig::default(),
            &mut IgnoreDiagnostics,
        )
        .unwrap();
        let printed: Vec<_> = list.iter().map(print_contract_expression).collect();
        assert_eq!(printed, vec!["in(a)", r#"out(; b, "m")"#, "out(r; r)"]);
    }

    // ── Expressions ────────────────────────────────────

    #[test]
    fn test_print_expressions_keep_grouping() {
        let cases = [
            "(a + b) * c",
            "a + b * c",
            "x ? y : z",
            "f(a, b)[i].len",
            "s[1 .. $]",
            "arr[]",
            "a !in b",
            "!(a is null)",
            "- -x",
            "i++",
            "[1, 2, 3]",
            "'\\n'",
            "0x1F_u",
        ];
        for case in cases {
            let input = format!("in({})", case);
            let list = parse_contract_expressions(
                &input,
                &ParserConfig::default(),
                &mut IgnoreDiagnostics,
            )
            .unwrap();
            match &list[0] {
                ContractExpression::In { condition, .. } => {
                    assert_eq!(print_expression(condition), case)
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_print_string_escapes() {
        assert_eq!(
            lowered_clauses(r#"in(s != "a\"b\n")"#),
            r#"in { assert(s != "a\"b\n"); }"#
        );
    }

    // ── Source files ───────────────────────────────────

    #[test]
    fn test_print_function_body_after_contracts_uses_do() {
        assert_eq!(
            lowered_file("int f(int a) in(a > 0) { return a; }"),
            "int f(int a) in { assert(a > 0); } do { return a; }\n"
        );
    }

    #[test]
    fn test_print_function_without_contracts() {
        assert_eq!(
            lowered_file("void g() { x = 1; }\nint h();"),
            "void g() { x = 1; }\nint h();\n"
        );
    }

    #[test]
    fn test_print_aggregate() {
        let input = "class A : B { int x; invariant(x > 0); int get() const out(r; r > 0); struct C { } }";
        assert_eq!(
            lowered_file(input),
            "class A : B {\n    int x;\n    invariant { assert(x > 0); }\n    \
             int get() const out(r) { assert(r > 0); };\n    struct C { }\n}\n"
        );
    }

    #[test]
    fn test_print_prefixed_template_aggregate() {
        let input = "final class Stack(T) : Base if (n > 0) { \
                     invariant(n >= 0); void push(T v) in(v !is null) { } }";
        let once = lowered_file(input);
        assert_eq!(
            once,
            "final class Stack(T) : Base if(n > 0) {\n    invariant { assert(n >= 0); }\n    \
             void push(T v) in { assert(v !is null); } do { }\n}\n"
        );
        assert_eq!(lowered_file(&once), once);
    }

    #[test]
    fn test_printing_is_idempotent() {
        let input = r#"
            import std.stdio;
            class Stack : Container {
                int[] items;
                invariant(items.length <= 100, "too many");
                void push(int x) in(x >= 0) out(; items.length > 0) { items ~= x; }
                int pop() in(items.length > 0) out(r; r >= 0) in { assert(true); } do {
                    auto r = items[$ - 1];
                    items = items[0 .. $ - 1];
                    return r;
                }
            }
        "#;
        let once = lowered_file(input);
        let twice = lowered_file(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_new_and_legacy_forms_share_fingerprint() {
        let new_form = lowered_file("int f(int a) in(a > 0) out(r; r < 10) { return a; }");
        let legacy_form = lowered_file(
            "int f(int a) in { assert(a > 0); } out(r) { assert(r < 10); } do { return a; }",
        );
        assert_eq!(new_form, legacy_form);
        assert_eq!(fingerprint(&new_form), fingerprint(&legacy_form));
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let hash = fingerprint("");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(fingerprint("in { }"), fingerprint("out { }"));
    }
}
