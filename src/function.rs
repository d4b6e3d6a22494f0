use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::{self, Environment, Shared};
use crate::error::Interrupt;
use crate::interpreter::Interpreter;
use crate::value::{Callable, Value};

/// A user function: a declaration paired with the frame it was declared in.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Shared<Environment>,
    pub is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Shared<Environment>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.declaration.name.as_ref().map(|token| token.lexeme.as_str())
    }

    fn line(&self) -> usize {
        self.declaration.name.as_ref().map_or(0, |token| token.line)
    }

    /// A copy of this method whose closure also defines `this`.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> Function {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", Some(Value::Instance(instance)));

        Function {
            declaration: Rc::clone(&self.declaration),
            closure: env.shared(),
            is_initializer: self.is_initializer,
        }
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        debug!("Calling {}", self);

        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            env.define(&param.lexeme, Some(argument));
        }

        let returned = match interpreter.execute_block(&self.declaration.body, env.shared()) {
            Ok(()) => Value::Nil,
            Err(Interrupt::Return(value)) => value,
            Err(e) => return Err(e),
        };

        // `init` hands back the instance whatever its body returned.
        if self.is_initializer {
            return environment::get_at(&self.closure, 0, "this", self.line());
        }

        Ok(returned)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "<fn {}>", name),
            None => f.write_str("<fn>"),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
