//! CXL AST Types: contract IR, legacy contract blocks, and the host
//! expression/declaration subset they are embedded in.
//!
//! All AST types are immutable after construction and derive:
//! Debug, Clone, PartialEq, Serialize, Deserialize
//!
//! Ownership is strictly tree-shaped: a declarator owns its contract list,
//! a contract expression owns its sub-expressions.

use serde::{Deserialize, Serialize};

use super::tokenizer::Span;

/// A value paired with the span it was parsed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpannedValue<T> {
    pub value: T,
    pub span: Span,
}

impl<T> SpannedValue<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

pub type Identifier = SpannedValue<String>;

// ── Expressions ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    /// Source lexeme, e.g. `0xFF` or `10UL`
    Integer(String),
    Float(String),
    /// Decoded string contents
    String(String),
    Char(char),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    Complement,
    Deref,
    AddressOf,
    PreIncrement,
    PreDecrement,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Complement => "~",
            UnaryOp::Deref => "*",
            UnaryOp::AddressOf => "&",
            UnaryOp::PreIncrement => "++",
            UnaryOp::PreDecrement => "--",
        }
    }

    pub fn from_op(op: &str) -> Option<Self> {
        Some(match op {
            "!" => UnaryOp::Not,
            "-" => UnaryOp::Negate,
            "+" => UnaryOp::Plus,
            "~" => UnaryOp::Complement,
            "*" => UnaryOp::Deref,
            "&" => UnaryOp::AddressOf,
            "++" => UnaryOp::PreIncrement,
            "--" => UnaryOp::PreDecrement,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

impl PostfixOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PostfixOp::Increment => "++",
            PostfixOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    OrOr,
    AndAnd,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    NotIs,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::OrOr => "||",
            BinaryOp::AndAnd => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "!in",
            BinaryOp::Is => "is",
            BinaryOp::NotIs => "!is",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "~",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^^",
        }
    }

    /// Binding power; higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::OrOr => 1,
            BinaryOp::AndAnd => 2,
            BinaryOp::BitOr => 3,
            BinaryOp::BitXor => 4,
            BinaryOp::BitAnd => 5,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::In
            | BinaryOp::NotIn
            | BinaryOp::Is
            | BinaryOp::NotIs => 6,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 7,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Concat => 8,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 9,
            BinaryOp::Pow => 10,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, BinaryOp::Pow)
    }

    /// Operators spelled with a single operator token
    pub fn from_op(op: &str) -> Option<Self> {
        Some(match op {
            "||" => BinaryOp::OrOr,
            "&&" => BinaryOp::AndAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "&" => BinaryOp::BitAnd,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            ">>>" => BinaryOp::UShr,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "~" => BinaryOp::Concat,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "^^" => BinaryOp::Pow,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Pow,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::Concat => "~=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::UShr => ">>>=",
            AssignOp::Pow => "^^=",
        }
    }

    pub fn from_op(op: &str) -> Option<Self> {
        Some(match op {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "%=" => AssignOp::Rem,
            "~=" => AssignOp::Concat,
            "&=" => AssignOp::BitAnd,
            "|=" => AssignOp::BitOr,
            "^=" => AssignOp::BitXor,
            "<<=" => AssignOp::Shl,
            ">>=" => AssignOp::Shr,
            ">>>=" => AssignOp::UShr,
            "^^=" => AssignOp::Pow,
            _ => return None,
        })
    }
}

/// Expression tree for the assign-expression subset used in contracts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    Identifier(Identifier),
    Literal(Literal, Span),
    This(Span),
    /// `$`, the length of the enclosing indexed array
    Dollar(Span),
    /// Source parentheses, kept so printing reproduces grouping
    Paren(Box<Expression>, Span),
    Array(Vec<Expression>, Span),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
        span: Span,
    },
    Postfix {
        op: PostfixOp,
        operand: Box<Expression>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        span: Span,
    },
    Assign {
        op: AssignOp,
        target: Box<Expression>,
        value: Box<Expression>,
        span: Span,
    },
    Conditional {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
        span: Span,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        span: Span,
    },
    Index {
        base: Box<Expression>,
        indices: Vec<Expression>,
        span: Span,
    },
    /// `a[]` or `a[lo .. hi]`
    Slice {
        base: Box<Expression>,
        bounds: Option<(Box<Expression>, Box<Expression>)>,
        span: Span,
    },
    Member {
        base: Box<Expression>,
        member: Identifier,
        span: Span,
    },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Identifier(id) => id.span,
            Expression::Literal(_, span)
            | Expression::This(span)
            | Expression::Dollar(span)
            | Expression::Paren(_, span)
            | Expression::Array(_, span) => *span,
            Expression::Unary { span, .. }
            | Expression::Postfix { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Assign { span, .. }
            | Expression::Conditional { span, .. }
            | Expression::Call { span, .. }
            | Expression::Index { span, .. }
            | Expression::Slice { span, .. }
            | Expression::Member { span, .. } => *span,
        }
    }
}

// ── Statements ────────────────────────────────────────────

/// `assert(condition[, message]);`, the unit contract clauses lower to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertStmt {
    pub condition: Expression,
    pub message: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    Assert(AssertStmt),
    Return {
        value: Option<Expression>,
        span: Span,
    },
    Expression(Expression),
    Block(Block),
    /// Host statement this module does not model, kept as rendered tokens
    Opaque { text: String, span: Span },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Block {
    /// Assert statements at the top level of the block, in order
    pub fn asserts(&self) -> impl Iterator<Item = &AssertStmt> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Assert(a) => Some(a),
            _ => None,
        })
    }
}

// ── Contracts ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    In,
    Out,
    Invariant,
}

impl std::fmt::Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ContractKind::In => write!(f, "in"),
            ContractKind::Out => write!(f, "out"),
            ContractKind::Invariant => write!(f, "invariant"),
        }
    }
}

/// New-syntax contract clause: `in(...)` or `out(...; ...)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractExpression {
    In {
        condition: Expression,
        message: Option<Expression>,
        span: Span,
    },
    Out {
        parameter: Option<Identifier>,
        condition: Expression,
        message: Option<Expression>,
        span: Span,
    },
}

impl ContractExpression {
    pub fn kind(&self) -> ContractKind {
        match self {
            ContractExpression::In { .. } => ContractKind::In,
            ContractExpression::Out { .. } => ContractKind::Out,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ContractExpression::In { span, .. } | ContractExpression::Out { span, .. } => *span,
        }
    }
}

/// Contract clauses of one declarator, in encounter order
pub type ContractExpressionList = Vec<ContractExpression>;

/// Brace-delimited contract block, hand-written or produced by lowering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyContractBlock {
    In {
        body: Block,
        span: Span,
    },
    Out {
        parameter: Option<Identifier>,
        body: Block,
        span: Span,
    },
    Invariant {
        body: Block,
        span: Span,
    },
}

impl LegacyContractBlock {
    pub fn kind(&self) -> ContractKind {
        match self {
            LegacyContractBlock::In { .. } => ContractKind::In,
            LegacyContractBlock::Out { .. } => ContractKind::Out,
            LegacyContractBlock::Invariant { .. } => ContractKind::Invariant,
        }
    }

    pub fn body(&self) -> &Block {
        match self {
            LegacyContractBlock::In { body, .. }
            | LegacyContractBlock::Out { body, .. }
            | LegacyContractBlock::Invariant { body, .. } => body,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            LegacyContractBlock::In { span, .. }
            | LegacyContractBlock::Out { span, .. }
            | LegacyContractBlock::Invariant { span, .. } => *span,
        }
    }

    pub fn parameter(&self) -> Option<&Identifier> {
        match self {
            LegacyContractBlock::Out { parameter, .. } => parameter.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionBody {
    Block(Block),
    /// Body-less declaration closed by `;`
    Terminated(Span),
    /// Body-less declaration ending right after its legacy contract blocks
    Omitted,
}

/// Contract part of a function declaration: new-syntax clauses, then
/// legacy blocks, then the body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDeclarator {
    pub contracts: ContractExpressionList,
    pub legacy: Vec<LegacyContractBlock>,
    pub body: FunctionBody,
    pub span: Span,
}

impl FunctionDeclarator {
    pub fn legacy_block(&self, kind: ContractKind) -> Option<&LegacyContractBlock> {
        self.legacy.iter().find(|b| b.kind() == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantForm {
    /// `invariant(condition[, message]);`
    Expression {
        condition: Expression,
        message: Option<Expression>,
    },
    /// `invariant { ... }` or `invariant() { ... }`
    Legacy(Block),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantDeclaration {
    pub form: InvariantForm,
    pub span: Span,
}

// ── Declarations (driver) ─────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateKind {
    Class,
    Struct,
    Interface,
    Union,
}

impl std::fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AggregateKind::Class => write!(f, "class"),
            AggregateKind::Struct => write!(f, "struct"),
            AggregateKind::Interface => write!(f, "interface"),
            AggregateKind::Union => write!(f, "union"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Return type, storage classes, and anything else before the name
    pub prefix: String,
    pub name: Identifier,
    /// Parameter list contents without the parentheses
    pub parameters: String,
    /// Function attributes between the parameter list and the contracts
    pub attributes: String,
    pub declarator: FunctionDeclarator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDecl {
    /// Attributes and storage classes before the keyword (`final`, `@safe`)
    pub prefix: String,
    pub kind: AggregateKind,
    pub name: Identifier,
    /// Template parameter list contents without the parentheses
    pub parameters: Option<String>,
    /// Template constraint contents, from `if ( ... )`
    pub constraint: Option<String>,
    /// Base class list after `:`
    pub bases: Option<String>,
    pub members: Vec<Declaration>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Declaration {
    Function(FunctionDecl),
    Aggregate(AggregateDecl),
    Invariant(InvariantDeclaration),
    /// Anything else, kept as rendered tokens
    Opaque { text: String, span: Span },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceFile {
    pub declarations: Vec<Declaration>,
}
