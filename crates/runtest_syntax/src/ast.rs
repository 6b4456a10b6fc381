//! Abstract syntax tree for the accepted Python subset.
//!
//! Statements and expressions carry byte-offset [`Span`]s; line numbers are recovered on demand
//! through [`crate::diagnostics::LineIndex`]. Function and class definitions are reference counted
//! so the runtime can share their bodies with the callable values it builds from them.

use std::fmt;
use std::rc::Rc;

use runtest_core::lang::operators::{self, OperatorId};

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Move both ends forward by `offset` bytes.
    pub fn shifted(self, offset: usize) -> Span {
        Span {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// A node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

pub type Ident = String;

/// An indented suite of statements.
pub type Block = Vec<Spanned<Stmt>>;

/// A parsed module (or interactive example).
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Block,
    /// Leading string literal of the module, if any.
    pub doc: Option<Docstring>,
}

/// A docstring together with the span of its string literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Docstring {
    pub text: String,
    pub span: Span,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Spanned<Expr>),
    /// `a = b = value`; every target receives the same value.
    Assign(AssignStmt),
    AugAssign(AugAssignStmt),
    FunctionDef(Rc<FunctionDef>),
    ClassDef(Rc<ClassDef>),
    Return(Option<Spanned<Expr>>),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Break,
    Continue,
    Pass,
    Raise(RaiseStmt),
    Assert(AssertStmt),
    Import(Vec<ImportAlias>),
    ImportFrom(ImportFromStmt),
    Try(TryStmt),
    With(WithStmt),
    Global(Vec<Ident>),
    Nonlocal(Vec<Ident>),
    Delete(Vec<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub targets: Vec<Spanned<Expr>>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AugAssignStmt {
    pub target: Spanned<Expr>,
    pub op: BinaryOp,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub test: Spanned<Expr>,
    pub body: Block,
    /// `elif` chains are nested `If` statements here.
    pub orelse: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub test: Spanned<Expr>,
    pub body: Block,
    pub orelse: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub target: Spanned<Expr>,
    pub iter: Spanned<Expr>,
    pub body: Block,
    pub orelse: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaiseStmt {
    pub exc: Option<Spanned<Expr>>,
    pub cause: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssertStmt {
    pub test: Spanned<Expr>,
    pub msg: Option<Spanned<Expr>>,
}

/// `import a.b.c as d`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportAlias {
    pub path: Vec<Ident>,
    pub alias: Option<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportFromStmt {
    /// Number of leading dots (`from ..pkg import x` has level 2).
    pub level: usize,
    pub module: Vec<Ident>,
    pub names: ImportNames,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportNames {
    Star,
    List(Vec<(Ident, Option<Ident>)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub body: Block,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Block,
    pub finalbody: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptHandler {
    pub kind: Option<Spanned<Expr>>,
    pub name: Option<Ident>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithStmt {
    pub items: Vec<WithItem>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithItem {
    pub context: Spanned<Expr>,
    pub target: Option<Spanned<Expr>>,
}

// ============================================================================
// Definitions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub decorators: Vec<Spanned<Expr>>,
    pub doc: Option<Docstring>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: Ident,
    pub bases: Vec<Spanned<Expr>>,
    pub body: Block,
    pub decorators: Vec<Spanned<Expr>>,
    pub doc: Option<Docstring>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub kind: ParamKind,
    pub default: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Positional-or-keyword.
    Normal,
    /// `*args`
    VarArgs,
    /// Declared after `*` or `*args`.
    KeywordOnly,
    /// `**kwargs`
    VarKeywords,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub body: Spanned<Expr>,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(Ident),
    Int(i64),
    Float(f64),
    Str(String),
    FString(Vec<FStringPart>),
    Bool(bool),
    None,
    Ellipsis,
    List(Vec<Spanned<Expr>>),
    Tuple(Vec<Spanned<Expr>>),
    Set(Vec<Spanned<Expr>>),
    Dict(Vec<DictEntry>),
    Comprehension(Box<Comprehension>),
    Attribute(Box<Spanned<Expr>>, Ident),
    Subscript(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Slice(Box<SliceExpr>),
    Call(Box<Spanned<Expr>>, Vec<CallArg>),
    Unary(UnaryOp, Box<Spanned<Expr>>),
    Binary(Box<Spanned<Expr>>, BinaryOp, Box<Spanned<Expr>>),
    /// `a < b <= c`: the left operand followed by each (operator, operand) link.
    Compare(Box<Spanned<Expr>>, Vec<(CompareOp, Spanned<Expr>)>),
    BoolOp(BoolOp, Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Conditional {
        test: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
        orelse: Box<Spanned<Expr>>,
    },
    Lambda(Rc<Lambda>),
    /// `*xs` inside a list/tuple display or an assignment target.
    Starred(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    Expr {
        expr: Box<Spanned<Expr>>,
        conversion: Option<char>,
        spec: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DictEntry {
    Pair(Spanned<Expr>, Spanned<Expr>),
    /// `**other`
    Spread(Spanned<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliceExpr {
    pub lower: Option<Spanned<Expr>>,
    pub upper: Option<Spanned<Expr>>,
    pub step: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComprehensionKind {
    List,
    Set,
    Generator,
    /// Dict comprehensions carry the value expression; the key is the element.
    Dict(Spanned<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub kind: ComprehensionKind,
    pub element: Spanned<Expr>,
    pub clauses: Vec<ComprehensionClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComprehensionClause {
    pub target: Spanned<Expr>,
    pub iter: Spanned<Expr>,
    pub conditions: Vec<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Positional(Spanned<Expr>),
    Keyword(Ident, Spanned<Expr>),
    Star(Spanned<Expr>),
    DoubleStar(Spanned<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

impl BinaryOp {
    /// Map a registry operator to a binary operator.
    pub fn from_operator(id: OperatorId) -> Option<Self> {
        Some(match id {
            OperatorId::Plus => BinaryOp::Add,
            OperatorId::Minus => BinaryOp::Sub,
            OperatorId::Star => BinaryOp::Mul,
            OperatorId::Slash => BinaryOp::Div,
            OperatorId::SlashSlash => BinaryOp::FloorDiv,
            OperatorId::Percent => BinaryOp::Mod,
            OperatorId::StarStar => BinaryOp::Pow,
            OperatorId::Amp => BinaryOp::BitAnd,
            OperatorId::Pipe => BinaryOp::BitOr,
            OperatorId::Caret => BinaryOp::BitXor,
            OperatorId::LShift => BinaryOp::LShift,
            OperatorId::RShift => BinaryOp::RShift,
            _ => return None,
        })
    }

    pub fn operator_id(self) -> OperatorId {
        match self {
            BinaryOp::Add => OperatorId::Plus,
            BinaryOp::Sub => OperatorId::Minus,
            BinaryOp::Mul => OperatorId::Star,
            BinaryOp::Div => OperatorId::Slash,
            BinaryOp::FloorDiv => OperatorId::SlashSlash,
            BinaryOp::Mod => OperatorId::Percent,
            BinaryOp::Pow => OperatorId::StarStar,
            BinaryOp::BitAnd => OperatorId::Amp,
            BinaryOp::BitOr => OperatorId::Pipe,
            BinaryOp::BitXor => OperatorId::Caret,
            BinaryOp::LShift => OperatorId::LShift,
            BinaryOp::RShift => OperatorId::RShift,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(operators::as_str(self.operator_id()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
    Is,
    IsNot,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Return the docstring of a suite: a leading statement that is a bare string literal.
pub fn docstring_of(body: &[Spanned<Stmt>]) -> Option<Docstring> {
    let first = body.first()?;
    match &first.node {
        Stmt::Expr(Spanned {
            node: Expr::Str(text),
            span,
        }) => Some(Docstring {
            text: text.clone(),
            span: *span,
        }),
        _ => None,
    }
}
