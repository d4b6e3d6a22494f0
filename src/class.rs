use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::{Interrupt, RuntimeError};
use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{Callable, Value};

pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<Function>>,
    static_methods: HashMap<String, Rc<Function>>,
}

impl LoxClass {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<Function>>,
        static_methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Self {
            name: name.into(),
            superclass,
            methods,
            static_methods,
        }
    }

    /// Instance method lookup, own table first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self.superclass.as_ref()?.find_method(name),
        }
    }

    pub fn find_static_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.static_methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self.superclass.as_ref()?.find_static_method(name),
        }
    }

    /// `ClassName.name`: only static methods are visible on a class value.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        self.find_static_method(&name.lexeme)
            .map(Value::Function)
            .ok_or_else(|| RuntimeError::UndefinedProperty {
                line: name.line,
                name: name.lexeme.clone(),
            })
    }
}

impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.find_method("init")
            .map_or(0, |initializer| initializer.arity())
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        debug!("Instantiating class '{}'", self.name);

        let instance = Rc::new(LoxInstance::new(Rc::clone(self)));

        if let Some(initializer) = self.find_method("init") {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Fields shadow methods, methods shadow static methods, and each class
    /// is searched completely before its superclass.
    pub fn get(self: &Rc<Self>, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        let mut class = Some(&self.class);

        while let Some(current) = class {
            if let Some(method) = current.methods.get(&name.lexeme) {
                return Ok(Value::Function(Rc::new(method.bind(Rc::clone(self)))));
            }

            if let Some(method) = current.static_methods.get(&name.lexeme) {
                return Ok(Value::Function(Rc::clone(method)));
            }

            class = current.superclass.as_ref();
        }

        Err(RuntimeError::UndefinedProperty {
            line: name.line,
            name: name.lexeme.clone(),
        })
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> instance", self.class.name)
    }
}
