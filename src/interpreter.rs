//! Tree-walking evaluator.
//!
//! The interpreter owns the global frame, a pointer to the *current* frame,
//! and the binding-distance table filled in by the resolver. Resolved
//! references jump straight to their frame; everything else is looked up
//! dynamically in the globals.

use std::collections::HashMap;
use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprKind, FunctionDecl, NodeId, Stmt, StmtKind};
use crate::class::LoxClass;
use crate::environment::{self, Environment, Shared};
use crate::error::{Interrupt, RuntimeError};
use crate::function::Function;
use crate::token::{Literal, Token, TokenType};
use crate::value::{self, Value};

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, Interrupt>;

/// Nested Lox calls allowed before a call fails with a stack overflow.
pub const MAX_CALL_DEPTH: usize = 256;

pub struct Interpreter {
    globals: Shared<Environment>,
    environment: Shared<Environment>,
    locals: HashMap<NodeId, usize>,
    call_depth: usize,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates a new Interpreter printing to `out`, with natives such as
    /// `clock` defined in the global frame.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Environment::new().shared();

        debug!("Defining native function 'clock'");

        globals
            .borrow_mut()
            .define("clock", Some(Value::Native(Rc::new(value::clock()))));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            call_depth: 0,
            out,
        }
    }

    /// Record that the expression `id` refers to a binding `depth` frames out.
    pub fn resolve(&mut self, id: NodeId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Runs a program, stopping at the first runtime error. A `Break` or
    /// `Return` reaching this level is handed back as is; [`crate::Lox::run`]
    /// treats it as an internal fault.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Runs `statements` with `env` as the current frame. The previous frame
    /// is restored however the block exits.
    pub fn execute_block(&mut self, statements: &[Stmt], env: Shared<Environment>) -> IResult<()> {
        let mut scope = ScopeGuard::new(self, env);

        for stmt in statements {
            scope.execute(stmt)?;
        }

        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        match &stmt.kind {
            StmtKind::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment)).shared();
                self.execute_block(statements, env)
            }

            StmtKind::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }

            StmtKind::Function(decl) => {
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                let name = function.name().unwrap_or_default().to_string();

                debug!("Defining function '{}'", name);

                self.environment
                    .borrow_mut()
                    .define(&name, Some(Value::Function(Rc::new(function))));

                Ok(())
            }

            StmtKind::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body) {
                        Ok(()) => {}
                        Err(Interrupt::Break { .. }) => break,
                        Err(e) => return Err(e),
                    }
                }

                Ok(())
            }

            StmtKind::Break(keyword) => Err(Interrupt::Break { line: keyword.line }),

            StmtKind::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value).map_err(|source| RuntimeError::Output {
                    line: stmt.line,
                    source,
                })?;

                Ok(())
            }

            StmtKind::Var { name, initializer } => {
                let value: Option<Value> = match initializer {
                    Some(expr) => Some(self.evaluate(expr)?),
                    None => None,
                };

                debug!("Defining variable '{}'", name.lexeme);

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            StmtKind::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Interrupt::Return(value))
            }

            StmtKind::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => {
                debug!("Defining class '{}'", name.lexeme);

                let superclass: Option<Rc<LoxClass>> = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Class(class) => Some(class),
                        _ => return Err(RuntimeError::SuperclassMustBeClass { line: expr.line }.into()),
                    },
                    None => None,
                };

                // Defined first so methods can refer to the class by name.
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Some(Value::Nil));

                let class = LoxClass::new(
                    name.lexeme.clone(),
                    superclass,
                    compile_methods(methods, &self.environment, true),
                    compile_methods(static_methods, &self.environment, false),
                );

                self.environment.borrow_mut().assign(
                    &name.lexeme,
                    Value::Class(Rc::new(class)),
                    name.line,
                )?;

                Ok(())
            }
        }
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(literal_value(literal)),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Variable(name) => self.look_up_variable(expr.id, &name.lexeme, name.line),

            ExprKind::This(keyword) => self.look_up_variable(expr.id, "this", keyword.line),

            ExprKind::Assignment { name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(&expr.id) {
                    Some(&depth) => {
                        environment::assign_at(&self.environment, depth, &name.lexeme, value.clone())?
                    }
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone(), name.line)?,
                }

                Ok(value)
            }

            ExprKind::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(numeric_operand(operator).into()),
                    },
                    _ => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;

                Ok(binary(operator, left, right)?)
            }

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?.is_truthy();

                match operator.token_type {
                    TokenType::OR if left => return Ok(Value::Bool(true)),
                    TokenType::AND if !left => return Ok(Value::Bool(false)),
                    _ => {}
                }

                Ok(Value::Bool(self.evaluate(right)?.is_truthy()))
            }

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let callable = callee
                    .as_callable()
                    .ok_or(RuntimeError::UncallableCallee { line: paren.line })?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                if values.len() != callable.arity() {
                    return Err(RuntimeError::MismatchingArity {
                        line: paren.line,
                        expected: callable.arity(),
                        found: values.len(),
                    }
                    .into());
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    debug!("Call depth limit of {} reached", MAX_CALL_DEPTH);
                    return Err(RuntimeError::StackOverflow { line: paren.line }.into());
                }

                self.call_depth += 1;
                let result = callable.call(self, values);
                self.call_depth -= 1;

                result
            }

            ExprKind::Getter { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Ok(instance.get(name)?),
                Value::Class(class) => Ok(class.get(name)?),
                _ => Err(RuntimeError::PropertyGetterUsedOnNonInstance { line: name.line }.into()),
            },

            ExprKind::Setter {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(
                        RuntimeError::PropertySetterUsedOnNonInstance { line: name.line }.into(),
                    );
                };

                let value = self.evaluate(value)?;
                instance.set(name, value.clone());

                Ok(value)
            }

            ExprKind::Function(decl) => Ok(Value::Function(Rc::new(Function::new(
                Rc::clone(decl),
                Rc::clone(&self.environment),
                false,
            )))),
        }
    }

    fn look_up_variable(&self, id: NodeId, name: &str, line: usize) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&depth) => environment::get_at(&self.environment, depth, name, line),
            None => Ok(self.globals.borrow().get(name, line)?),
        }
    }
}

/// Swaps in a new current frame and puts the old one back on drop, so an
/// early `?` return cannot leave the interpreter inside a dead scope.
struct ScopeGuard<'i> {
    interpreter: &'i mut Interpreter,
    previous: Option<Shared<Environment>>,
}

impl<'i> ScopeGuard<'i> {
    fn new(interpreter: &'i mut Interpreter, env: Shared<Environment>) -> Self {
        let previous = std::mem::replace(&mut interpreter.environment, env);

        Self {
            interpreter,
            previous: Some(previous),
        }
    }
}

impl Deref for ScopeGuard<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        self.interpreter
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Interpreter {
        self.interpreter
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.interpreter.environment = previous;
        }
    }
}

/// One runtime function per method declaration, all closing over the frame
/// the class was declared in.
fn compile_methods(
    decls: &[Rc<FunctionDecl>],
    closure: &Shared<Environment>,
    with_initializer: bool,
) -> HashMap<String, Rc<Function>> {
    decls
        .iter()
        .map(|decl| {
            let is_initializer = with_initializer && decl.is_initializer();
            let function = Function::new(Rc::clone(decl), Rc::clone(closure), is_initializer);
            let name = function.name().unwrap_or_default().to_string();

            (name, Rc::new(function))
        })
        .collect()
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Number(n) => Value::Number(*n),
        Literal::Str(s) | Literal::Identifier(s) => Value::String(s.clone()),
        Literal::Keyword(k) => match k.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "nil" => Value::Nil,
            other => Value::String(other.to_string()),
        },
    }
}

fn numeric_operand(operator: &Token) -> RuntimeError {
    debug!("Non-numeric operand for '{}'", operator.lexeme);

    RuntimeError::ExpectedNumericOperand {
        line: operator.line,
        operator: operator.lexeme.clone(),
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match operator.token_type {
        TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
        TokenType::PLUS => {
            return Ok(match (left, right) {
                (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                (Value::String(a), Value::String(b)) => Value::String(a + &b),
                (a, b) => Value::String(format!("{}{}", a, b)),
            })
        }
        _ => {}
    }

    let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
        return Err(numeric_operand(operator));
    };
    let (a, b) = (*a, *b);

    Ok(match operator.token_type {
        TokenType::MINUS => Value::Number(a - b),
        TokenType::STAR => Value::Number(a * b),
        TokenType::SLASH if b == 0.0 => {
            return Err(RuntimeError::DivisionByZero {
                line: operator.line,
            })
        }
        TokenType::SLASH => Value::Number(a / b),
        TokenType::GREATER => Value::Bool(a > b),
        TokenType::GREATER_EQUAL => Value::Bool(a >= b),
        TokenType::LESS => Value::Bool(a < b),
        TokenType::LESS_EQUAL => Value::Bool(a <= b),
        _ => unreachable!("parser builds binary nodes from binary operators only"),
    })
}
