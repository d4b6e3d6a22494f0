//! Syntax tree produced by the parser and walked by the resolver and the
//! interpreter.
//!
//! Every node carries a [`NodeId`] handed out by a [`NodeIds`] counter. The
//! resolver keys its binding-distance table by that id, so two textually
//! identical expressions at different places never collide. Ids are never
//! reused for the lifetime of the counter, which lets a REPL keep one
//! counter (and one resolver table) across many input lines.

use std::rc::Rc;

use crate::token::{Literal, Token};

/// Stable identity of an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Monotonic [`NodeId`] generator.
#[derive(Debug, Default)]
pub struct NodeIds {
    next: usize,
}

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub line: usize,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// `name = value`
    Assignment { name: Token, value: Box<Expr> },

    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// Closing `)`, kept for error locations.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Getter { object: Box<Expr>, name: Token },

    /// `object.name = value`
    Setter {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    Grouping(Box<Expr>),

    Literal(Literal),

    /// Short-circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    This(Token),

    Unary { operator: Token, right: Box<Expr> },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    Variable(Token),

    /// Anonymous `fun (params) { body }`.
    Function(Rc<FunctionDecl>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionType {
    Function,
    Method,
    Lambda,
}

/// Parameters and body shared by named functions, methods and lambdas.
///
/// Held behind an `Rc` so every runtime closure built from the same
/// declaration shares one copy of the body.
#[derive(Debug)]
pub struct FunctionDecl {
    /// `None` for lambdas.
    pub name: Option<Token>,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
    pub kind: FunctionType,
}

impl FunctionDecl {
    pub fn is_initializer(&self) -> bool {
        self.kind == FunctionType::Method
            && self.name.as_ref().is_some_and(|name| name.lexeme == "init")
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub line: usize,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Vec<Stmt>),

    Expression(Expr),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `fun name(params) { body }`
    Function(Rc<FunctionDecl>),

    While { condition: Expr, body: Box<Stmt> },

    Break(Token),

    Print(Expr),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Return { keyword: Token, value: Option<Expr> },

    Class {
        name: Token,
        /// Always an [`ExprKind::Variable`] when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
        static_methods: Vec<Rc<FunctionDecl>>,
    },
}
