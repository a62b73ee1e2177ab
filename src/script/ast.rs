//! Syntax tree for script source

use std::rc::Rc;

/// Statement list shared between a parsed chunk and the functions it defines
pub type Block = Rc<[Stmt]>;

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `function name(params) body end` - binds a global
    Function { name: String, params: Vec<String>, body: Block },
    Local { name: String, value: Option<Expr> },
    Assign { name: String, value: Expr },
    Return(Option<Expr>),
    If { cond: Expr, then_block: Block, else_block: Option<Block> },
    Call(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(Rc<str>),
    Name(String),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Len,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
