// ABOUTME: User-defined functions, lambdas, and method binding

use crate::ast::{FuncDecl, LambdaDecl};
use crate::class::Instance;
use crate::env::Environment;
use crate::interpreter::{Interpreter, Unwind};
use crate::token::Token;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// What a function value executes: a named `func` declaration or a lambda.
#[derive(Debug, Clone)]
pub enum Declaration {
    Func(Rc<FuncDecl>),
    Lambda(Rc<LambdaDecl>),
}

/// A closure: a declaration paired with the environment it was created in.
/// Binding a method produces a fresh `Function` whose closure holds `this`;
/// the original is never mutated.
#[derive(Debug)]
pub struct Function {
    declaration: Declaration,
    closure: Rc<Environment>,
    is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FuncDecl>, closure: Rc<Environment>, is_initializer: bool) -> Self {
        Self {
            declaration: Declaration::Func(declaration),
            closure,
            is_initializer,
        }
    }

    pub fn from_lambda(declaration: Rc<LambdaDecl>, closure: Rc<Environment>) -> Self {
        Self {
            declaration: Declaration::Lambda(declaration),
            closure,
            is_initializer: false,
        }
    }

    pub fn params(&self) -> &[Token] {
        match &self.declaration {
            Declaration::Func(decl) => &decl.params,
            Declaration::Lambda(decl) => &decl.params,
        }
    }

    pub fn arity(&self) -> usize {
        self.params().len()
    }

    /// Run the body in a fresh environment chained to the closure. `Return`
    /// unwinds stop here; initializers always yield `this`.
    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Unwind> {
        let environment = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, arg) in self.params().iter().zip(args) {
            environment.define(param.lexeme.clone(), arg);
        }

        let result = match &self.declaration {
            Declaration::Func(decl) => interpreter.execute_block(&decl.body, environment),
            Declaration::Lambda(decl) => {
                interpreter.execute_block(std::slice::from_ref(&decl.body), environment)
            }
        };

        match result {
            Ok(()) => {
                if self.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(Value::None)
                }
            }
            Err(Unwind::Return(value)) => {
                if self.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(value)
                }
            }
            Err(other) => Err(other),
        }
    }

    /// New function sharing this declaration, closed over an environment
    /// that defines `this`.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        let environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(instance));
        Function {
            declaration: self.declaration.clone(),
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }

    fn bound_this(&self) -> Value {
        self.closure.get_at(0, "this").unwrap_or(Value::None)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declaration {
            Declaration::Func(decl) => write!(f, "function '{}'", decl.name.lexeme),
            Declaration::Lambda(_) => write!(f, "<lambda>"),
        }
    }
}
