//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (a stack of `HashMap<String, Binding>`); the global
//!    scope is never pushed, so unresolved names fall through to a dynamic
//!    global lookup at run time.
//! 2. Report static errors (redeclaration, read in own initializer, invalid
//!    `return` / `this`, self‑inheritance) and warn about locals never read.
//! 3. Tell the interpreter, for *each* local variable occurrence, how many
//!    frames separate the use from the declaration.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, ExprKind, FunctionDecl, NodeId, Stmt, StmtKind};
use crate::error::ResolveError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use log::{debug, info};

/// Kind of the innermost function body being resolved. Validates `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
    Lambda,
}

/// Kind of the innermost class body being resolved. Validates `this`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
}

/// Per-binding state. Only ever moves forward.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum BindingState {
    Declared,
    Defined,
    Read,
}

#[derive(Debug)]
struct Binding {
    line: usize,
    state: BindingState,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances by calling back into the interpreter.
pub struct Resolver<'i> {
    interpreter: &'i mut Interpreter,
    scopes: Vec<HashMap<String, Binding>>,
    current_function: FunctionKind,
    current_class: ClassKind,
    errors: Vec<ResolveError>,
}

impl<'i> Resolver<'i> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'i mut Interpreter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements and return every error and warning.
    pub fn resolve(mut self, statements: &[Stmt]) -> Vec<ResolveError> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);

        info!("Resolve pass finished with {} finding(s)", self.errors.len());

        self.errors
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            StmtKind::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            StmtKind::Function(decl) => {
                // The name is visible inside its own body, so recursion works.
                if let Some(name) = &decl.name {
                    debug!("Resolving function '{}'", name.lexeme);

                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(decl, FunctionKind::Function);
            }

            StmtKind::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => self.resolve_class(name, superclass.as_ref(), methods, static_methods),

            StmtKind::Expression(expr) | StmtKind::Print(expr) => self.resolve_expr(expr),

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch.as_deref() {
                    self.resolve_stmt(else_branch);
                }
            }

            StmtKind::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            StmtKind::Break(_) => {}

            StmtKind::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    self.error(ResolveError::ReturnOutsideFunction { line: keyword.line });
                }

                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.error(ResolveError::ReturnValueFromInitializer { line: keyword.line });
                    }
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        static_methods: &[Rc<FunctionDecl>],
    ) {
        debug!("Resolving class '{}'", name.lexeme);

        let enclosing_class = std::mem::replace(&mut self.current_class, ClassKind::Class);

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let ExprKind::Variable(super_name) = &superclass.kind {
                if super_name.lexeme == name.lexeme {
                    self.error(ResolveError::ClassInheritsFromItself {
                        line: super_name.line,
                        name: super_name.lexeme.clone(),
                    });
                }
            }

            self.resolve_expr(superclass);
        }

        // Static methods are not bound to an instance: no `this` in scope.
        let class_kind = std::mem::replace(&mut self.current_class, ClassKind::None);
        for method in static_methods {
            self.resolve_function(method, FunctionKind::Method);
        }
        self.current_class = class_kind;

        self.begin_scope();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                "this".to_string(),
                Binding {
                    line: name.line,
                    state: BindingState::Read,
                },
            );
        }

        for method in methods {
            let kind = if method.is_initializer() {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };

            self.resolve_function(method, kind);
        }

        self.end_scope();

        self.current_class = enclosing_class;
    }

    /// Parameters and body share one scope, matching the single frame the
    /// interpreter builds per call.
    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionKind) {
        let enclosing_function = std::mem::replace(&mut self.current_function, kind);

        self.begin_scope();

        for param in &decl.params {
            self.declare(param);
            self.mark(param, BindingState::Read); // parameters are never reported unused
        }

        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Variable(name) => {
                let uninitialized = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.lexeme))
                    .is_some_and(|binding| binding.state == BindingState::Declared);

                if uninitialized {
                    self.error(ResolveError::VariableAccessDuringOwnInitialization {
                        line: name.line,
                        name: name.lexeme.clone(),
                    });
                }

                self.resolve_local(expr.id, &name.lexeme);
            }

            ExprKind::Assignment { name, value } => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, &name.lexeme);
            }

            ExprKind::This(keyword) => {
                if self.current_class == ClassKind::None {
                    self.error(ResolveError::ThisOutsideClass { line: keyword.line });
                    return;
                }

                self.resolve_local(expr.id, "this");
            }

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            ExprKind::Getter { object, .. } => self.resolve_expr(object),

            ExprKind::Setter { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            ExprKind::Grouping(inner) | ExprKind::Unary { right: inner, .. } => {
                self.resolve_expr(inner)
            }

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            ExprKind::Function(decl) => self.resolve_function(decl, FunctionKind::Lambda),

            ExprKind::Literal(_) => {}
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        let mut unused: Vec<(String, Binding)> = scope
            .into_iter()
            .filter(|(_, binding)| binding.state != BindingState::Read)
            .collect();

        unused.sort_by(|(a_name, a), (b_name, b)| (a.line, a_name).cmp(&(b.line, b_name)));

        for (name, binding) in unused {
            self.error(ResolveError::UnusedLocal {
                line: binding.line,
                name,
            });
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return; // globals are not tracked
        };

        if scope.contains_key(&name.lexeme) {
            let error = ResolveError::VariableRedeclaration {
                line: name.line,
                name: name.lexeme.clone(),
            };
            self.error(error);
            return;
        }

        scope.insert(
            name.lexeme.clone(),
            Binding {
                line: name.line,
                state: BindingState::Declared,
            },
        );
    }

    fn define(&mut self, name: &Token) {
        self.mark(name, BindingState::Defined);
    }

    /// Advance a binding in the innermost scope, never moving it backwards.
    fn mark(&mut self, name: &Token, state: BindingState) {
        if let Some(binding) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(&name.lexeme))
        {
            binding.state = binding.state.max(state);
        }
    }

    /// Innermost scope first; the first hit is recorded and marked read.
    fn resolve_local(&mut self, id: NodeId, name: &str) {
        for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(binding) = scope.get_mut(name) {
                binding.state = BindingState::Read;

                debug!("Resolved '{}' at depth {}", name, depth);

                self.interpreter.resolve(id, depth);
                return;
            }
        }

        debug!("'{}' left for global lookup", name);
    }

    fn error(&mut self, error: ResolveError) {
        debug!("Resolve finding: {}", error);

        self.errors.push(error);
    }
}
