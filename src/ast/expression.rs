//! Expression nodes.
//!
//! Each struct carries its starting line and the stage annotation
//! `info: T`. `Name`, `Index`, `Field`, and `Deref` double as lvalues;
//! the checker decides in which positions that matters.

use crate::date::Date;

use super::types::TypeExpr;

#[derive(Debug, Clone)]
pub enum Expression<T> {
    Literal(Literal<T>),
    Name(Name<T>),
    Binary(Binary<T>),
    Unary(Unary<T>),
    Call(Call<T>),
    Index(Index<T>),
    Field(Field<T>),
    New(New<T>),
    EofCheck(EofCheck<T>),
    Null(Null<T>),
    Deref(Deref<T>),
    SuperCall(SuperCall<T>),
}

impl<T> Expression<T> {
    pub fn line(&self) -> usize {
        match self {
            Expression::Literal(n) => n.line,
            Expression::Name(n) => n.line,
            Expression::Binary(n) => n.line,
            Expression::Unary(n) => n.line,
            Expression::Call(n) => n.line,
            Expression::Index(n) => n.line,
            Expression::Field(n) => n.line,
            Expression::New(n) => n.line,
            Expression::EofCheck(n) => n.line,
            Expression::Null(n) => n.line,
            Expression::Deref(n) => n.line,
            Expression::SuperCall(n) => n.line,
        }
    }

    /// The annotation attached by the current pipeline stage.
    pub fn info(&self) -> &T {
        match self {
            Expression::Literal(n) => &n.info,
            Expression::Name(n) => &n.info,
            Expression::Binary(n) => &n.info,
            Expression::Unary(n) => &n.info,
            Expression::Call(n) => &n.info,
            Expression::Index(n) => &n.info,
            Expression::Field(n) => &n.info,
            Expression::New(n) => &n.info,
            Expression::EofCheck(n) => &n.info,
            Expression::Null(n) => &n.info,
            Expression::Deref(n) => &n.info,
            Expression::SuperCall(n) => &n.info,
        }
    }

    /// True for the node shapes that can designate a storage place.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self,
            Expression::Name(_) | Expression::Index(_) | Expression::Field(_) | Expression::Deref(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Integer(i32),
    Real(f64),
    Boolean(bool),
    Char(char),
    Str(String),
    Date(Date),
}

#[derive(Debug, Clone)]
pub struct Literal<T> {
    pub value: LiteralValue,
    pub line: usize,
    pub info: T,
}

#[derive(Debug, Clone)]
pub struct Name<T> {
    pub name: String,
    pub line: usize,
    pub info: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Concat,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Union,
    Intersect,
    Diff,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "DIV",
            BinaryOp::Mod => "MOD",
            BinaryOp::Concat => "&",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "IN",
            BinaryOp::Union => "UNION",
            BinaryOp::Intersect => "INTERSECT",
            BinaryOp::Diff => "DIFF",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binary<T> {
    pub op: BinaryOp,
    pub lhs: Box<Expression<T>>,
    pub rhs: Box<Expression<T>>,
    pub line: usize,
    pub info: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    /// `@e` — address of an lvalue.
    AddressOf,
}

#[derive(Debug, Clone)]
pub struct Unary<T> {
    pub op: UnaryOp,
    pub operand: Box<Expression<T>>,
    pub line: usize,
    pub info: T,
}

/// A call in expression position: a user function, a built-in, or a
/// method reached through `obj.Name(…)`.
#[derive(Debug, Clone)]
pub struct Call<T> {
    pub callee: Box<Expression<T>>,
    pub args: Vec<Expression<T>>,
    pub line: usize,
    pub info: T,
}

#[derive(Debug, Clone)]
pub struct Index<T> {
    pub base: Box<Expression<T>>,
    pub indices: Vec<Expression<T>>,
    pub line: usize,
    pub info: T,
}

#[derive(Debug, Clone)]
pub struct Field<T> {
    pub base: Box<Expression<T>>,
    pub field: String,
    pub line: usize,
    pub info: T,
}

/// `NEW` — class instantiation when `args` is present, pointer-target
/// allocation otherwise.
#[derive(Debug, Clone)]
pub struct New<T> {
    pub target: TypeExpr<T>,
    pub args: Option<Vec<Expression<T>>>,
    pub line: usize,
    pub info: T,
}

#[derive(Debug, Clone)]
pub struct EofCheck<T> {
    pub handle: Box<Expression<T>>,
    pub line: usize,
    pub info: T,
}

#[derive(Debug, Clone)]
pub struct Null<T> {
    pub line: usize,
    pub info: T,
}

/// `^p` — pointer dereference; a valid lvalue.
#[derive(Debug, Clone)]
pub struct Deref<T> {
    pub target: Box<Expression<T>>,
    pub line: usize,
    pub info: T,
}

/// `SUPER.Method(args)` in expression position.
#[derive(Debug, Clone)]
pub struct SuperCall<T> {
    pub method: String,
    pub args: Vec<Expression<T>>,
    pub line: usize,
    pub info: T,
}
