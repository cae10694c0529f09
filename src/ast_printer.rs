// ABOUTME: Parenthesized debug rendering of the syntax tree

use crate::ast::{Expr, LiteralValue, Stmt};

/// Render a whole program, one statement per line.
pub fn print_program(statements: &[Stmt]) -> String {
    statements
        .iter()
        .map(print_stmt)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Block { stmts } => {
            let inner: Vec<String> = stmts.iter().map(print_stmt).collect();
            format!("(block {})", inner.join(" "))
        }
        Stmt::Class {
            name,
            superclass,
            methods,
        } => {
            let mut out = format!("(class {}", name.lexeme);
            if let Some(superclass) = superclass {
                out.push_str(&format!(" ({})", print_expr(superclass)));
            }
            for method in methods {
                out.push(' ');
                out.push_str(&print_stmt(&Stmt::Func(method.clone())));
            }
            out.push(')');
            out
        }
        Stmt::Expression { value } => format!("(expr {})", print_expr(value)),
        Stmt::Func(decl) => {
            let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
            let body: Vec<String> = decl.body.iter().map(print_stmt).collect();
            format!(
                "(func {} ({}) {})",
                decl.name.lexeme,
                params.join(" "),
                body.join(" ")
            )
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => match else_branch {
            Some(else_branch) => format!(
                "(if {} {} {})",
                print_expr(cond),
                print_stmt(then_branch),
                print_stmt(else_branch)
            ),
            None => format!("(if {} {})", print_expr(cond), print_stmt(then_branch)),
        },
        Stmt::LoopInterrupt { keyword, count } => {
            if keyword.lexeme == "break" {
                format!("(break {})", count)
            } else {
                "(continue)".to_string()
            }
        }
        Stmt::Print { value } => format!("(print {})", print_expr(value)),
        Stmt::Return { value, .. } => match value {
            Some(value) => format!("(return {})", print_expr(value)),
            None => "(return)".to_string(),
        },
        Stmt::Var { name, init } => match init {
            Some(init) => format!("(var {} = {})", name.lexeme, print_expr(init)),
            None => format!("(var {})", name.lexeme),
        },
        Stmt::While { cond, body, .. } => {
            format!("(while {} {})", print_expr(cond), print_stmt(body))
        }
    }
}

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Assign { name, op, value, .. } => {
            format!("({} {} {})", name.lexeme, op.lexeme, print_expr(value))
        }
        Expr::Binary { left, op, right } => {
            format!("({} {} {})", print_expr(left), op.lexeme, print_expr(right))
        }
        Expr::Call { callee, args, .. } => {
            let mut out = format!("(call {}", print_expr(callee));
            for arg in args {
                out.push(' ');
                out.push_str(&print_expr(arg));
            }
            out.push(')');
            out
        }
        Expr::Get { object, name } => format!("(get {} {})", print_expr(object), name.lexeme),
        Expr::Grouping { inner } => format!("({})", print_expr(inner)),
        Expr::Lambda(decl) => {
            let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
            format!("(lambda ({}) {})", params.join(" "), print_stmt(&decl.body))
        }
        Expr::List { items, .. } => {
            let inner: Vec<String> = items.iter().map(print_expr).collect();
            format!("(list {})", inner.join(" "))
        }
        Expr::Literal { value } => match value {
            LiteralValue::None => "none".to_string(),
            LiteralValue::Bool(true) => "true".to_string(),
            LiteralValue::Bool(false) => "false".to_string(),
            LiteralValue::Int(n) => n.to_string(),
            LiteralValue::Float(n) => n.to_string(),
            LiteralValue::Str(s) => format!("\"{}\"", s),
        },
        Expr::Logical { left, op, right } => {
            format!("({} {} {})", print_expr(left), op.lexeme, print_expr(right))
        }
        Expr::Postfix { op, name, .. } => format!("({} {})", name.lexeme, op.lexeme),
        Expr::Prefix { op, name, .. } => format!("({} {})", op.lexeme, name.lexeme),
        Expr::Set {
            object,
            name,
            value,
        } => format!(
            "(set {} {} {})",
            print_expr(object),
            name.lexeme,
            print_expr(value)
        ),
        Expr::Super { method, .. } => format!("(super.{})", method.lexeme),
        Expr::Ternary {
            one,
            op1,
            two,
            op2,
            three,
        } => format!(
            "({} {} {} {} {})",
            print_expr(one),
            op1.lexeme,
            print_expr(two),
            op2.lexeme,
            print_expr(three)
        ),
        Expr::This { .. } => "this".to_string(),
        Expr::Unary { op, inner } => format!("({} {})", op.lexeme, print_expr(inner)),
        Expr::Variable { name, .. } => name.lexeme.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenKind};

    fn token(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, None, 1)
    }

    #[test]
    fn test_binary_with_unary_and_grouping() {
        let expr = Expr::Binary {
            left: Box::new(Expr::Unary {
                op: token(TokenKind::Minus, "-"),
                inner: Box::new(Expr::Literal {
                    value: LiteralValue::Int(123),
                }),
            }),
            op: token(TokenKind::Star, "*"),
            right: Box::new(Expr::Grouping {
                inner: Box::new(Expr::Literal {
                    value: LiteralValue::Float(45.67),
                }),
            }),
        };
        assert_eq!(print_expr(&expr), "((- 123) * (45.67))");
    }

    #[test]
    fn test_ternary_rendering() {
        let expr = Expr::Ternary {
            one: Box::new(Expr::Literal {
                value: LiteralValue::Bool(true),
            }),
            op1: token(TokenKind::Question, "?"),
            two: Box::new(Expr::Literal {
                value: LiteralValue::Int(1),
            }),
            op2: token(TokenKind::Colon, ":"),
            three: Box::new(Expr::Literal {
                value: LiteralValue::Int(2),
            }),
        };
        assert_eq!(print_expr(&expr), "(true ? 1 : 2)");
    }
}
