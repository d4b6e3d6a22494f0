use crate::ast::{Expr, ExprKind, FunctionDecl, Stmt, StmtKind};
use crate::token::{Literal, Token};

/// Converts syntax trees to the Crafting‑Interpreters prefix form, e.g.
/// `(* (- 123.0) (group 45.67))`. Debug output only.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match &expr.kind {
            // ── literals ────────────────────────────────────────────────
            ExprKind::Literal(literal) => match literal {
                Literal::Str(s) => s.clone(),
                other => other.to_string(),
            },

            // ── grouping ────────────────────────────────────────────────
            ExprKind::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            ExprKind::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            }
            | ExprKind::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "(?: {} {} {})",
                Self::print(condition),
                Self::print(then_branch),
                Self::print(else_branch)
            ),

            // ── names ───────────────────────────────────────────────────
            ExprKind::Variable(name) => name.lexeme.clone(),

            ExprKind::This(_) => "this".into(),

            ExprKind::Assignment { name, value } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            ExprKind::Getter { object, name } => {
                format!("(. {} {})", Self::print(object), name.lexeme)
            }

            ExprKind::Setter {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            // ── calls and functions ─────────────────────────────────────
            ExprKind::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            ExprKind::Function(decl) => Self::function("fun", decl),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match &stmt.kind {
            StmtKind::Expression(expr) => format!("(; {})", Self::print(expr)),

            StmtKind::Print(expr) => format!("(print {})", Self::print(expr)),

            StmtKind::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            StmtKind::Block(statements) => Self::block(statements),

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            StmtKind::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            StmtKind::Break(_) => "(break)".into(),

            StmtKind::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            StmtKind::Function(decl) => Self::function("fun", decl),

            StmtKind::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => {
                let mut s = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    s.push_str(&format!(" < {}", Self::print(superclass)));
                }
                for method in static_methods {
                    s.push(' ');
                    s.push_str(&Self::function("static", method));
                }
                for method in methods {
                    s.push(' ');
                    s.push_str(&Self::function("method", method));
                }
                s.push(')');
                s
            }
        }
    }

    fn block(statements: &[Stmt]) -> String {
        let mut s = String::from("(block");
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }

    fn function(tag: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p: &Token| p.lexeme.as_str()).collect();

        let head = match &decl.name {
            Some(name) => format!("({} {} ({})", tag, name.lexeme, params.join(" ")),
            None => format!("({} ({})", tag, params.join(" ")),
        };

        format!("{} {})", head, Self::block(&decl.body))
    }
}
