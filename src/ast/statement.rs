//! Statement nodes.

use super::expression::Expression;
use super::Block;

#[derive(Debug, Clone)]
pub enum Statement<T> {
    Assign(AssignStmt<T>),
    If(IfStmt<T>),
    Case(CaseStmt<T>),
    For(ForStmt<T>),
    While(WhileStmt<T>),
    Repeat(RepeatStmt<T>),
    Call(CallStmt<T>),
    Return(ReturnStmt<T>),
    Input(InputStmt<T>),
    Output(OutputStmt<T>),
    Super(SuperStmt<T>),
    OpenFile(OpenFileStmt<T>),
    CloseFile(CloseFileStmt<T>),
    ReadFile(ReadFileStmt<T>),
    WriteFile(WriteFileStmt<T>),
    Seek(SeekStmt<T>),
    GetRecord(GetRecordStmt<T>),
    PutRecord(PutRecordStmt<T>),
}

impl<T> Statement<T> {
    pub fn line(&self) -> usize {
        match self {
            Statement::Assign(s) => s.line,
            Statement::If(s) => s.line,
            Statement::Case(s) => s.line,
            Statement::For(s) => s.line,
            Statement::While(s) => s.line,
            Statement::Repeat(s) => s.line,
            Statement::Call(s) => s.line,
            Statement::Return(s) => s.line,
            Statement::Input(s) => s.line,
            Statement::Output(s) => s.line,
            Statement::Super(s) => s.line,
            Statement::OpenFile(s) => s.line,
            Statement::CloseFile(s) => s.line,
            Statement::ReadFile(s) => s.line,
            Statement::WriteFile(s) => s.line,
            Statement::Seek(s) => s.line,
            Statement::GetRecord(s) => s.line,
            Statement::PutRecord(s) => s.line,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssignStmt<T> {
    pub target: Expression<T>,
    pub value: Expression<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct IfStmt<T> {
    pub condition: Expression<T>,
    pub then_block: Block<T>,
    pub else_block: Option<Block<T>>,
    pub line: usize,
}

/// One `CASE OF` arm. Labels fold to constants at check time.
#[derive(Debug, Clone)]
pub enum CaseLabels<T> {
    /// `v1, v2, … :`
    Values(Vec<Expression<T>>),
    /// `lo TO hi :`
    Range(Expression<T>, Expression<T>),
}

#[derive(Debug, Clone)]
pub struct CaseArm<T> {
    pub labels: CaseLabels<T>,
    pub body: Block<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct CaseStmt<T> {
    pub scrutinee: Expression<T>,
    pub arms: Vec<CaseArm<T>>,
    pub otherwise: Option<Block<T>>,
    pub line: usize,
}

/// `FOR counter <- start TO end [STEP step] … NEXT name`.
///
/// The parser records the `NEXT` identifier verbatim; matching it
/// against the counter is the checker's job.
#[derive(Debug, Clone)]
pub struct ForStmt<T> {
    pub counter: String,
    pub start: Expression<T>,
    pub end: Expression<T>,
    pub step: Option<Expression<T>>,
    pub body: Block<T>,
    pub next_name: String,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct WhileStmt<T> {
    pub condition: Expression<T>,
    pub body: Block<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct RepeatStmt<T> {
    pub body: Block<T>,
    pub condition: Expression<T>,
    pub line: usize,
}

/// What a `CALL` statement invokes. The parser classifies multi-part
/// references here so the checker and interpreter never re-derive them.
#[derive(Debug, Clone)]
pub enum CallTarget<T> {
    /// `CALL Proc(…)`
    Name(String),
    /// `CALL Obj.Method(…)` — `object` is an arbitrary postfix chain.
    Method {
        object: Expression<T>,
        method: String,
    },
    /// `CALL SUPER.Method(…)`
    SuperMethod(String),
}

#[derive(Debug, Clone)]
pub struct CallStmt<T> {
    pub target: CallTarget<T>,
    pub args: Vec<Expression<T>>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt<T> {
    pub value: Option<Expression<T>>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct InputStmt<T> {
    pub target: Expression<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct OutputStmt<T> {
    pub values: Vec<Expression<T>>,
    pub line: usize,
}

/// `SUPER(args)` — base-constructor chaining inside a constructor.
#[derive(Debug, Clone)]
pub struct SuperStmt<T> {
    pub args: Vec<Expression<T>>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct OpenFileStmt<T> {
    pub handle: Expression<T>,
    pub path: Expression<T>,
    pub mode: Expression<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct CloseFileStmt<T> {
    pub handle: Expression<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ReadFileStmt<T> {
    pub handle: Expression<T>,
    pub target: Expression<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct WriteFileStmt<T> {
    pub handle: Expression<T>,
    pub value: Expression<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct SeekStmt<T> {
    pub handle: Expression<T>,
    pub position: Expression<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct GetRecordStmt<T> {
    pub handle: Expression<T>,
    pub target: Expression<T>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct PutRecordStmt<T> {
    pub handle: Expression<T>,
    pub value: Expression<T>,
    pub line: usize,
}
