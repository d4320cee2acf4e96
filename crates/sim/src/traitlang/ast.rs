// SPDX-License-Identifier: MIT

//! AST for the trait script language. Intentionally small: the grammar the
//! parser accepts is a strict subset of Python, so the tree is too.

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub imports: Vec<Import>,
    pub classes: Vec<ClassDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<String>,
    pub methods: Vec<FunctionDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub is_async: bool,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { target: String, value: Expr },
    AugAssign { target: String, op: AugOp, value: Expr },
    ExprStmt(Expr),
    If { cond: Expr, then_body: Vec<Stmt>, elifs: Vec<(Expr, Vec<Stmt>)>, else_body: Vec<Stmt> },
    ForRange { var: String, count: Expr, body: Vec<Stmt> },
    Try { body: Vec<Stmt>, except_body: Vec<Stmt> },
    Return(Option<Expr>),
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugOp {
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(i64),
    FloatLit(f64),
    StrLit(String),
    BoolLit(bool),
    NoneLit,
    Name(String),
    /// `base.attr`, `base.attr.attr2`, ...
    Attribute { base: Box<Expr>, attr: String },
    Call { func: Box<Expr>, args: Vec<Expr> },
    Await(Box<Expr>),
    UnaryNeg(Box<Expr>),
    UnaryNot(Box<Expr>),
    BinOp { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    BoolOp { op: BoolOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Compare { op: CmpOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
}
