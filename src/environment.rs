//! Chained scope frames.
//!
//! A frame maps names to *slots*. A slot holding `None` was declared with
//! `var x;` and never given a value, which is different from the name being
//! absent. Frames are shared (`Rc<RefCell<_>>`) by every closure created while
//! they were current, and only ever point at their parent.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{InternalError, Interrupt, RuntimeError};
use crate::value::Value;

pub type Shared<T> = Rc<RefCell<T>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Option<Value>>,
    enclosing: Option<Shared<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Shared<Environment>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a frame for sharing.
    pub fn shared(self) -> Shared<Environment> {
        Rc::new(RefCell::new(self))
    }

    /// Insert or overwrite a slot in this frame.
    pub fn define(&mut self, name: &str, value: Option<Value>) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup, walking outward until the name is found.
    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        match self.values.get(name) {
            Some(Some(value)) => Ok(value.clone()),

            Some(None) => Err(RuntimeError::UndefinedVariable {
                line,
                name: name.to_string(),
            }),

            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name, line),
                None => Err(RuntimeError::UndeclaredVariable {
                    line,
                    name: name.to_string(),
                }),
            },
        }
    }

    /// Dynamic assignment, walking outward until the name is found.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = Some(value);
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value, line),
            None => Err(RuntimeError::UndeclaredVariable {
                line,
                name: name.to_string(),
            }),
        }
    }
}

/// The frame exactly `distance` hops outward from `env`.
pub fn ancestor(env: &Shared<Environment>, distance: usize) -> Option<Shared<Environment>> {
    let mut current = Rc::clone(env);

    for _ in 0..distance {
        let next = current.borrow().enclosing.clone()?;
        current = next;
    }

    Some(current)
}

/// Read a resolved local. Only the frame at `distance` is consulted.
pub fn get_at(
    env: &Shared<Environment>,
    distance: usize,
    name: &str,
    line: usize,
) -> Result<Value, Interrupt> {
    let not_found = || InternalError::LocalVariableNotFoundAtExpectedDepth {
        name: name.to_string(),
        depth: distance,
    };

    let slot: Option<Option<Value>> = ancestor(env, distance)
        .ok_or_else(not_found)?
        .borrow()
        .values
        .get(name)
        .cloned();

    match slot {
        Some(Some(value)) => Ok(value),
        Some(None) => Err(RuntimeError::UndefinedVariable {
            line,
            name: name.to_string(),
        }
        .into()),
        None => Err(not_found().into()),
    }
}

/// Write a resolved local. Only the frame at `distance` is consulted.
pub fn assign_at(
    env: &Shared<Environment>,
    distance: usize,
    name: &str,
    value: Value,
) -> Result<(), InternalError> {
    let not_found = || InternalError::LocalVariableNotFoundAtExpectedDepth {
        name: name.to_string(),
        depth: distance,
    };

    let frame = ancestor(env, distance).ok_or_else(not_found)?;
    let mut frame = frame.borrow_mut();

    let slot = frame.values.get_mut(name).ok_or_else(not_found)?;
    *slot = Some(value);

    Ok(())
}
