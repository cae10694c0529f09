// ABOUTME: Static scope analysis binding variable references to scope depths

use crate::ast::{Expr, ExprId, FuncDecl, Stmt};
use crate::class::INITIALIZER;
use crate::error::Reporter;
use crate::interpreter::Interpreter;
use crate::token::Token;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
    Lambda,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// Pre-execution pass over the freshly parsed statements. Walks every scope
/// the evaluator will create and records, per variable-referencing
/// expression, how many environments out the binding lives. Diagnostics go
/// to the reporter; analysis keeps going so one bad reference does not hide
/// the next.
pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    reporter: &'a mut Reporter,
    /// false = declared but not yet initialized, true = usable.
    scopes: Vec<HashMap<String, bool>>,
    loop_depth: usize,
    current_function: FunctionKind,
    current_class: ClassKind,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter, reporter: &'a mut Reporter) -> Self {
        Self {
            interpreter,
            reporter,
            scopes: Vec::new(),
            loop_depth: 0,
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block { stmts } => {
                self.begin_scope();
                self.resolve(stmts);
                self.end_scope();
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
            Stmt::Expression { value } => self.resolve_expr(value),
            Stmt::Func(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(&decl.params, &decl.body, FunctionKind::Function);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::LoopInterrupt { keyword, .. } => {
                if self.loop_depth == 0 {
                    self.reporter
                        .error_at(keyword, "Can't exit from a loop in top-level code.");
                }
            }
            Stmt::Print { value } => self.resolve_expr(value),
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    self.reporter
                        .error_at(keyword, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.reporter
                            .error_at(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Var { name, init } => {
                self.declare(name);
                if let Some(init) = init {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::While { cond, body, .. } => {
                self.resolve_expr(cond);
                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Rc<FuncDecl>]) {
        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable {
                name: super_name, ..
            } = superclass
            {
                if super_name.lexeme == name.lexeme {
                    self.reporter
                        .error_at(super_name, "A class can't inherit from itself.");
                }
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_expr(superclass);

            // Methods of a subclass see `super` one scope outside `this`.
            self.begin_scope();
            self.scope_insert("super");
        }

        self.begin_scope();
        self.scope_insert("this");

        for method in methods {
            let kind = if method.name.lexeme == INITIALIZER {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(&method.params, &method.body, kind);
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { id, name, value, .. } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Grouping { inner } => self.resolve_expr(inner),
            Expr::Lambda(decl) => {
                self.resolve_function(
                    &decl.params,
                    std::slice::from_ref(&decl.body),
                    FunctionKind::Lambda,
                );
            }
            Expr::List { .. } => {}
            Expr::Literal { .. } => {}
            Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Postfix { id, name, .. } => self.resolve_local(*id, name),
            Expr::Prefix { id, name, .. } => self.resolve_local(*id, name),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassKind::None => self
                        .reporter
                        .error_at(keyword, "Can't use 'super' outside of a class."),
                    ClassKind::Class => self
                        .reporter
                        .error_at(keyword, "Can't use 'super' in a class with no superclass."),
                    ClassKind::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Ternary {
                one, two, three, ..
            } => {
                self.resolve_expr(one);
                self.resolve_expr(two);
                self.resolve_expr(three);
            }
            Expr::This { id, keyword } => {
                if self.current_class == ClassKind::None {
                    self.reporter
                        .error_at(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Unary { inner, .. } => self.resolve_expr(inner),
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.reporter
                            .error_at(name, "Can't read local variable in its own initializer.");
                    }
                }
                self.resolve_local(*id, name);
            }
        }
    }

    /// Functions open a fresh scope and reset the loop depth: a `break`
    /// inside a function body cannot cross the call boundary into a loop
    /// outside it.
    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], kind: FunctionKind) {
        let enclosing_function = self.current_function;
        let enclosing_loop_depth = self.loop_depth;
        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(body);
        self.end_scope();

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loop_depth;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn scope_insert(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn declare(&mut self, name: &Token) {
        let already_present = match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.lexeme.clone(), false).is_some(),
            None => return,
        };
        if already_present {
            self.reporter
                .error_at(name, "Already a variable with this name in this scope.");
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Innermost scope naming `name` wins; global references stay
    /// unrecorded and fall through to the global environment at runtime.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, distance);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;
    use crate::parser::Parser;

    fn resolve_source(source: &str) -> (Interpreter, bool) {
        let mut reporter = Reporter::new();
        let mut next_id = 0;
        let tokens = Scanner::new(source, &mut reporter).scan_tokens();
        let statements = Parser::new(tokens, &mut reporter, &mut next_id).parse();
        assert!(!reporter.had_error, "parse error in {:?}", source);

        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter, &mut reporter).resolve(&statements);
        (interpreter, reporter.had_error)
    }

    fn resolve_err(source: &str) -> bool {
        resolve_source(source).1
    }

    #[test]
    fn test_self_initializer_is_error() {
        assert!(resolve_err("{ var x = 1; { var x = x; } }"));
    }

    #[test]
    fn test_global_self_initializer_is_allowed() {
        assert!(!resolve_err("var x = 1; var y = y;"));
    }

    #[test]
    fn test_redeclaration_in_scope_is_error() {
        assert!(resolve_err("{ var a = 1; var a = 2; }"));
    }

    #[test]
    fn test_global_redeclaration_is_allowed() {
        assert!(!resolve_err("var a = 1; var a = 2;"));
    }

    #[test]
    fn test_top_level_return_is_error() {
        assert!(resolve_err("return 1;"));
    }

    #[test]
    fn test_return_value_from_initializer_is_error() {
        assert!(resolve_err(
            "class A { func __init__() { return 1; } }"
        ));
    }

    #[test]
    fn test_bare_return_from_initializer_is_allowed() {
        assert!(!resolve_err("class A { func __init__() { return; } }"));
    }

    #[test]
    fn test_break_outside_loop_is_error() {
        assert!(resolve_err("break;"));
        assert!(resolve_err("continue;"));
    }

    #[test]
    fn test_break_inside_function_inside_loop_is_error() {
        assert!(resolve_err(
            "while (true) { func f() { break; } f(); }"
        ));
    }

    #[test]
    fn test_this_outside_class_is_error() {
        assert!(resolve_err("print this;"));
        assert!(resolve_err("func f() { return this; }"));
    }

    #[test]
    fn test_super_outside_class_is_error() {
        assert!(resolve_err("print super.m;"));
    }

    #[test]
    fn test_super_without_superclass_is_error() {
        assert!(resolve_err("class A { func m() { super.m(); } }"));
    }

    #[test]
    fn test_super_in_subclass_is_allowed() {
        assert!(!resolve_err(
            "class A { func m() { print 1; } } \
             class B(A) { func m() { super.m(); } }"
        ));
    }

    #[test]
    fn test_self_inheritance_is_error() {
        assert!(resolve_err("class A(A) {}"));
    }

    #[test]
    fn test_lambda_gets_function_context() {
        assert!(!resolve_err("var f = lambda(x) { return x; };"));
    }
}
