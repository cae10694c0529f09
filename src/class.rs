// ABOUTME: Class values and the instances they construct

use crate::error::RuntimeError;
use crate::function::Function;
use crate::interpreter::{Interpreter, Unwind};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Method name the constructor protocol looks for.
pub const INITIALIZER: &str = "__init__";

/// A class value. Calling one allocates an instance and, when present, runs
/// its `__init__` bound to the new instance.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    /// Walk the inheritance chain, nearest class first.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        match &self.superclass {
            Some(superclass) => superclass.find_method(name),
            None => None,
        }
    }

    pub fn arity(&self) -> usize {
        match self.find_method(INITIALIZER) {
            Some(initializer) => initializer.arity(),
            None => 0,
        }
    }

    pub fn call(
        self: &Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
    ) -> Result<Value, Unwind> {
        let instance = Rc::new(Instance::new(Rc::clone(self)));
        if let Some(initializer) = self.find_method(INITIALIZER) {
            initializer.bind(Rc::clone(&instance)).call(interpreter, args)?;
        }
        Ok(Value::Instance(instance))
    }
}

/// An object: its class plus a mutable field table. Instances are aliased by
/// `Rc` identity; fields are shared across every alias.
#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Fields shadow methods; a method hit comes back bound to this instance.
    pub fn get(self: &Rc<Self>, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = self.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(self)))));
        }

        Err(RuntimeError::new(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}
