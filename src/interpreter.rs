// ABOUTME: Tree-walking evaluator executing resolved statements

use crate::ast::{Expr, ExprId, FuncDecl, LiteralValue, Stmt};
use crate::builtins::register_builtins;
use crate::class::{Class, INITIALIZER};
use crate::env::Environment;
use crate::error::{Reporter, RuntimeError};
use crate::function::Function;
use crate::token::{Token, TokenKind};
use crate::value::Value;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

/// Non-local control transfer. `Return`, `Break` and `Continue` are plain
/// signals with exactly one consumer each (`Function::call` and the `while`
/// loop); `Error` is the runtime failure carrier that rides the same channel
/// up to `interpret`.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Break(u32),
    Continue,
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

pub struct Interpreter {
    pub globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }

    /// Route `print` somewhere else; tests capture program output this way.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        let globals = Environment::new();
        register_builtins(&globals);
        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Called by the resolver for each variable-referencing expression.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Top of the pipeline: run statements in order, stopping at the first
    /// runtime error. Loop and return signals never reach this far.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut Reporter) {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                Err(Unwind::Error(error)) => {
                    reporter.runtime_error(&error);
                    return;
                }
                Err(signal) => {
                    debug_assert!(false, "unconsumed control signal: {:?}", signal);
                    return;
                }
            }
        }
    }

    // ===== statements =====

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Unwind> {
        match stmt {
            Stmt::Block { stmts } => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(stmts, environment)
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
            Stmt::Expression { value } => {
                self.evaluate(value)?;
                Ok(())
            }
            Stmt::Func(decl) => {
                let function =
                    Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .define(decl.name.lexeme.clone(), Value::Function(Rc::new(function)));
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(cond)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::LoopInterrupt { keyword, count } => {
                if keyword.kind == TokenKind::Break {
                    Err(Unwind::Break(*count))
                } else {
                    Err(Unwind::Continue)
                }
            }
            Stmt::Print { value } => {
                let value = self.evaluate(value)?;
                let _ = writeln!(self.out, "{}", value);
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::None,
                };
                Err(Unwind::Return(value))
            }
            Stmt::Var { name, init } => {
                let value = match init {
                    Some(init) => self.evaluate(init)?,
                    None => Value::None,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::While {
                cond,
                body,
                for_transformed,
            } => self.execute_while(cond, body, *for_transformed),
        }
    }

    /// Runs statements in the given environment and restores the previous
    /// one on every exit path, unwinds included.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<Environment>,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(());
        for statement in statements {
            result = self.execute(statement);
            if result.is_err() {
                break;
            }
        }

        self.environment = previous;
        result
    }

    /// The only consumer of `Break` and `Continue`. A multi-level break is
    /// decremented and rethrown so each enclosing loop peels one level off.
    fn execute_while(&mut self, cond: &Expr, body: &Stmt, for_transformed: bool) -> Result<(), Unwind> {
        while self.evaluate(cond)?.is_truthy() {
            match self.execute(body) {
                Ok(()) => {}
                Err(Unwind::Break(n)) => {
                    if n > 1 {
                        return Err(Unwind::Break(n - 1));
                    }
                    break;
                }
                Err(Unwind::Continue) => {
                    if for_transformed {
                        self.run_for_increment(body)?;
                    }
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// A `continue` in a desugared `for` skipped the increment at the tail
    /// of the body block; run it before re-testing the condition.
    fn run_for_increment(&mut self, body: &Stmt) -> Result<(), Unwind> {
        if let Stmt::Block { stmts } = body {
            if let Some(increment) = stmts.last() {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                return self.execute_block(std::slice::from_ref(increment), environment);
            }
        }
        Ok(())
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FuncDecl>],
    ) -> Result<(), Unwind> {
        let superclass_value = match superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        let token = match expr {
                            Expr::Variable { name, .. } => name,
                            _ => name,
                        };
                        return Err(
                            RuntimeError::new(token, "Superclass must be a class.").into()
                        );
                    }
                }
            }
            None => None,
        };

        self.environment.define(name.lexeme.clone(), Value::None);

        let enclosing = if let Some(superclass) = &superclass_value {
            let environment = Environment::with_enclosing(Rc::clone(&self.environment));
            environment.define("super", Value::Class(Rc::clone(superclass)));
            Some(std::mem::replace(&mut self.environment, environment))
        } else {
            None
        };

        let mut method_map = HashMap::new();
        for decl in methods {
            let is_initializer = decl.name.lexeme == INITIALIZER;
            let function = Function::new(
                Rc::clone(decl),
                Rc::clone(&self.environment),
                is_initializer,
            );
            method_map.insert(decl.name.lexeme.clone(), Rc::new(function));
        }

        let class = Rc::new(Class::new(
            name.lexeme.clone(),
            superclass_value,
            method_map,
        ));

        if let Some(enclosing) = enclosing {
            self.environment = enclosing;
        }

        self.environment.assign(&name.lexeme, Value::Class(class));
        Ok(())
    }

    // ===== expressions =====

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Assign { id, name, op, value } => self.evaluate_assign(*id, name, op, value),
            Expr::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(apply_binary(op, op.kind, left, right)?)
            }
            Expr::Call { callee, paren, args } => self.evaluate_call(callee, paren, args),
            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Ok(instance.get(name)?),
                _ => Err(RuntimeError::new(name, "Only instances have properties.").into()),
            },
            Expr::Grouping { inner } => self.evaluate(inner),
            Expr::Lambda(decl) => {
                let function = Function::from_lambda(Rc::clone(decl), Rc::clone(&self.environment));
                Ok(Value::Function(Rc::new(function)))
            }
            Expr::List { bracket, .. } => {
                Err(RuntimeError::new(bracket, "List expressions are not supported yet.").into())
            }
            Expr::Literal { value } => Ok(match value {
                LiteralValue::None => Value::None,
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Int(n) => Value::Int(*n),
                LiteralValue::Float(n) => Value::Float(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
            }),
            Expr::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                if op.kind == TokenKind::BarBar {
                    if left.is_truthy() {
                        return Ok(left);
                    }
                } else if !left.is_truthy() {
                    return Ok(left);
                }
                self.evaluate(right)
            }
            Expr::Postfix { id, op, name } => {
                let old = self.look_up_variable(*id, name)?;
                let new = step_value(op, &old)?;
                self.assign_variable(*id, name, new)?;
                Ok(old)
            }
            Expr::Prefix { id, op, name } => {
                let old = self.look_up_variable(*id, name)?;
                let new = step_value(op, &old)?;
                self.assign_variable(*id, name, new.clone())?;
                Ok(new)
            }
            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(name, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::new(name, "Only instances have fields.").into()),
            },
            Expr::Super { id, keyword, method } => self.evaluate_super(*id, keyword, method),
            Expr::Ternary {
                one, two, three, ..
            } => {
                if self.evaluate(one)?.is_truthy() {
                    self.evaluate(two)
                } else {
                    self.evaluate(three)
                }
            }
            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),
            Expr::Unary { op, inner } => {
                let value = self.evaluate(inner)?;
                Ok(apply_unary(op, value)?)
            }
            Expr::Variable { id, name } => self.look_up_variable(*id, name),
        }
    }

    fn evaluate_assign(
        &mut self,
        id: ExprId,
        name: &Token,
        op: &Token,
        value: &Expr,
    ) -> Result<Value, Unwind> {
        let value = if op.kind == TokenKind::Equal {
            self.evaluate(value)?
        } else {
            // Compound form: read, apply the underlying binary operator,
            // write back. Same type rules as the plain operator.
            let current = self.look_up_variable(id, name)?;
            let operand = self.evaluate(value)?;
            let base = match op.kind {
                TokenKind::PlusEqual => TokenKind::Plus,
                TokenKind::MinusEqual => TokenKind::Minus,
                TokenKind::StarEqual => TokenKind::Star,
                TokenKind::SlashEqual => TokenKind::Slash,
                TokenKind::PercentEqual => TokenKind::Percent,
                TokenKind::CaretEqual => TokenKind::Caret,
                TokenKind::AmpersandEqual => TokenKind::Ampersand,
                TokenKind::BarEqual => TokenKind::Bar,
                TokenKind::GreaterGreaterEqual => TokenKind::GreaterGreater,
                TokenKind::LessLessEqual => TokenKind::LessLess,
                other => other,
            };
            apply_binary(op, base, current, operand)?
        };

        self.assign_variable(id, name, value.clone())?;
        Ok(value)
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        args: &[Expr],
    ) -> Result<Value, Unwind> {
        let callee = self.evaluate(callee)?;

        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            arguments.push(self.evaluate(arg)?);
        }

        let arity = match &callee {
            Value::NativeFn(native) => native.arity,
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            _ => {
                return Err(
                    RuntimeError::new(paren, "Can only call functions and classes.").into()
                );
            }
        };

        if arguments.len() != arity {
            let message = format!(
                "Expected {} arguments but got {}.",
                arity,
                arguments.len()
            );
            return Err(RuntimeError::new(paren, message).into());
        }

        match callee {
            Value::NativeFn(native) => Ok((native.func)(&arguments)),
            Value::Function(function) => function.call(self, arguments),
            Value::Class(class) => class.call(self, arguments),
            _ => unreachable!("arity check already rejected non-callables"),
        }
    }

    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token,
        method: &Token,
    ) -> Result<Value, Unwind> {
        let distance = match self.locals.get(&id) {
            Some(distance) => *distance,
            None => {
                return Err(RuntimeError::new(keyword, "Undefined variable 'super'.").into());
            }
        };

        let superclass = match self.environment.get_at(distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(RuntimeError::new(keyword, "Undefined variable 'super'.").into()),
        };

        let instance = match distance
            .checked_sub(1)
            .and_then(|d| self.environment.get_at(d, "this"))
        {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(RuntimeError::new(keyword, "Undefined variable 'this'.").into()),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(RuntimeError::new(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )
            .into()),
        }
    }

    /// Resolved references read at their recorded depth; everything else is
    /// a global.
    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value, Unwind> {
        let value = match self.locals.get(&id) {
            Some(distance) => self.environment.get_at(*distance, &name.lexeme),
            None => self.globals.get(&name.lexeme),
        };

        value.ok_or_else(|| {
            RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme)).into()
        })
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> Result<(), Unwind> {
        let assigned = match self.locals.get(&id) {
            Some(distance) => self.environment.assign_at(*distance, &name.lexeme, value),
            None => self.globals.assign(&name.lexeme, value),
        };

        if assigned {
            Ok(())
        } else {
            Err(RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme)).into())
        }
    }
}

// ===== operator semantics =====

fn check_numbers(op: &Token, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(RuntimeError::new(op, "Operand must be a number.")),
    }
}

fn check_integers(op: &Token, left: &Value, right: &Value) -> Result<(i64, i64), RuntimeError> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok((*l, *r)),
        _ => Err(RuntimeError::new(op, "Operand must be an integer.")),
    }
}

fn both_ints(left: &Value, right: &Value) -> Option<(i64, i64)> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some((*l, *r)),
        _ => None,
    }
}

/// Binary operator table shared by `Binary` expressions and compound
/// assignment. `base` is the underlying operator kind; `op` is the source
/// token used for error reporting.
fn apply_binary(op: &Token, base: TokenKind, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match base {
        TokenKind::Comma => Ok(right),

        TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
        TokenKind::BangEqual => Ok(Value::Bool(left != right)),

        TokenKind::Caret => {
            let (l, r) = check_integers(op, &left, &right)?;
            Ok(Value::Int(l ^ r))
        }
        TokenKind::Bar => {
            let (l, r) = check_integers(op, &left, &right)?;
            Ok(Value::Int(l | r))
        }
        TokenKind::Ampersand => {
            let (l, r) = check_integers(op, &left, &right)?;
            Ok(Value::Int(l & r))
        }
        TokenKind::GreaterGreater => {
            let (l, r) = check_integers(op, &left, &right)?;
            if r < 0 {
                return Err(RuntimeError::new(op, "Shift amount must be non-negative."));
            }
            Ok(Value::Int(l >> r.min(63)))
        }
        TokenKind::LessLess => {
            let (l, r) = check_integers(op, &left, &right)?;
            if r < 0 {
                return Err(RuntimeError::new(op, "Shift amount must be non-negative."));
            }
            Ok(Value::Int(if r >= 64 { 0 } else { l.wrapping_shl(r as u32) }))
        }

        TokenKind::Percent => {
            if let Some((l, r)) = both_ints(&left, &right) {
                if r == 0 {
                    return Err(RuntimeError::new(op, "Cannot divide by zero."));
                }
                return Ok(Value::Int(l.wrapping_rem(r)));
            }
            let (l, r) = check_numbers(op, &left, &right)?;
            if r == 0.0 {
                return Err(RuntimeError::new(op, "Cannot divide by zero."));
            }
            Ok(Value::Float(l % r))
        }
        TokenKind::Slash => {
            let (l, r) = check_numbers(op, &left, &right)?;
            if r == 0.0 {
                return Err(RuntimeError::new(op, "Cannot divide by zero."));
            }
            Ok(Value::Float(l / r))
        }
        TokenKind::Star => {
            if let Some((l, r)) = both_ints(&left, &right) {
                return Ok(Value::Int(l.wrapping_mul(r)));
            }
            let (l, r) = check_numbers(op, &left, &right)?;
            Ok(Value::Float(l * r))
        }
        TokenKind::StarStar => {
            if let Some((l, r)) = both_ints(&left, &right) {
                if (0..=u32::MAX as i64).contains(&r) {
                    if let Some(result) = l.checked_pow(r as u32) {
                        return Ok(Value::Int(result));
                    }
                }
            }
            let (l, r) = check_numbers(op, &left, &right)?;
            Ok(Value::Float(l.powf(r)))
        }
        TokenKind::Minus => {
            if let Some((l, r)) = both_ints(&left, &right) {
                return Ok(Value::Int(l.wrapping_sub(r)));
            }
            let (l, r) = check_numbers(op, &left, &right)?;
            Ok(Value::Float(l - r))
        }
        TokenKind::Plus => {
            if let Some((l, r)) = both_ints(&left, &right) {
                return Ok(Value::Int(l.wrapping_add(r)));
            }
            if left.is_numeric() && right.is_numeric() {
                let (l, r) = check_numbers(op, &left, &right)?;
                return Ok(Value::Float(l + r));
            }
            if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                return Ok(Value::Str(format!("{}{}", left, right)));
            }
            Err(RuntimeError::new(
                op,
                "Operands must be two numbers or include a string.",
            ))
        }

        TokenKind::Less => {
            let (l, r) = check_numbers(op, &left, &right)?;
            Ok(Value::Bool(l < r))
        }
        TokenKind::LessEqual => {
            let (l, r) = check_numbers(op, &left, &right)?;
            Ok(Value::Bool(l <= r))
        }
        TokenKind::Greater => {
            let (l, r) = check_numbers(op, &left, &right)?;
            Ok(Value::Bool(l > r))
        }
        TokenKind::GreaterEqual => {
            let (l, r) = check_numbers(op, &left, &right)?;
            Ok(Value::Bool(l >= r))
        }

        _ => Err(RuntimeError::new(op, "Unknown binary operator.")),
    }
}

fn apply_unary(op: &Token, value: Value) -> Result<Value, RuntimeError> {
    match op.kind {
        // Numeric sign operators coerce to float, matching `+x`'s role as an
        // explicit float conversion.
        TokenKind::Minus => match value.as_f64() {
            Some(n) => Ok(Value::Float(-n)),
            None => Err(RuntimeError::new(op, "Operand must be a number.")),
        },
        TokenKind::Plus => match value.as_f64() {
            Some(n) => Ok(Value::Float(n)),
            None => Err(RuntimeError::new(op, "Operand must be a number.")),
        },
        TokenKind::Tilde => match value {
            Value::Int(n) => Ok(Value::Int(!n)),
            _ => Err(RuntimeError::new(op, "Operand must be an integer.")),
        },
        TokenKind::Bang => Ok(Value::Bool(!value.is_truthy())),
        _ => Err(RuntimeError::new(op, "Unknown unary operator.")),
    }
}

/// One step of `++`/`--`/`~~` against a variable's current value. Keeps the
/// numeric flavor of the operand.
fn step_value(op: &Token, value: &Value) -> Result<Value, RuntimeError> {
    match op.kind {
        TokenKind::PlusPlus => match value {
            Value::Int(n) => Ok(Value::Int(n.wrapping_add(1))),
            Value::Float(n) => Ok(Value::Float(n + 1.0)),
            _ => Err(RuntimeError::new(op, "Operand must be a number.")),
        },
        TokenKind::MinusMinus => match value {
            Value::Int(n) => Ok(Value::Int(n.wrapping_sub(1))),
            Value::Float(n) => Ok(Value::Float(n - 1.0)),
            _ => Err(RuntimeError::new(op, "Operand must be a number.")),
        },
        TokenKind::TildeTilde => match value {
            Value::Int(n) => Ok(Value::Int(!n)),
            _ => Err(RuntimeError::new(op, "Operand must be an integer.")),
        },
        _ => Err(RuntimeError::new(op, "Unknown step operator.")),
    }
}
