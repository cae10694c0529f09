// ABOUTME: End-to-end tests running Tarnish source through the full pipeline

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use tarnish::ast::ExprId;
use tarnish::error::Reporter;
use tarnish::interpreter::Interpreter;
use tarnish::lexer::Scanner;
use tarnish::parser::Parser;
use tarnish::resolver::Resolver;

/// Cloneable sink so the test keeps a handle on what the program printed.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run a program, returning (stdout, had_error, had_runtime_error).
fn run_program(source: &str) -> (String, bool, bool) {
    let buffer = SharedBuffer::default();
    let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
    let mut reporter = Reporter::new();
    let mut next_id: ExprId = 0;

    let tokens = Scanner::new(source, &mut reporter).scan_tokens();
    let statements = Parser::new(tokens, &mut reporter, &mut next_id).parse();
    if !reporter.had_error {
        Resolver::new(&mut interpreter, &mut reporter).resolve(&statements);
    }
    if !reporter.had_error {
        interpreter.interpret(&statements, &mut reporter);
    }

    let output = String::from_utf8(buffer.0.borrow().clone()).expect("program output is utf-8");
    (output, reporter.had_error, reporter.had_runtime_error)
}

fn run_ok(source: &str) -> String {
    let (output, had_error, had_runtime_error) = run_program(source);
    assert!(!had_error, "unexpected static error in {:?}", source);
    assert!(!had_runtime_error, "unexpected runtime error in {:?}", source);
    output
}

fn run_runtime_err(source: &str) -> String {
    let (output, had_error, had_runtime_error) = run_program(source);
    assert!(!had_error, "unexpected static error in {:?}", source);
    assert!(had_runtime_error, "expected a runtime error in {:?}", source);
    output
}

// ===== arithmetic and operators =====

#[test]
fn test_precedence_end_to_end() {
    assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
    assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
}

#[test]
fn test_string_concatenation_coerces() {
    assert_eq!(run_ok("var a = \"hi\"; print a + \" \" + 42;"), "hi 42\n");
    assert_eq!(run_ok("print 1 + \"x\";"), "1x\n");
    assert_eq!(run_ok("print \"v=\" + true;"), "v=true\n");
    assert_eq!(run_ok("print \"n=\" + none;"), "n=none\n");
}

#[test]
fn test_division_is_true_division() {
    assert_eq!(run_ok("print 7 / 2;"), "3.5\n");
    // Whole results print without the decimal part.
    assert_eq!(run_ok("print 6 / 2;"), "3\n");
}

#[test]
fn test_divide_by_zero_is_runtime_error() {
    run_runtime_err("print 1 / 0;");
    run_runtime_err("print 1.5 / 0.0;");
    run_runtime_err("print 5 % 0;");
}

#[test]
fn test_bitwise_operators() {
    assert_eq!(run_ok("print 6 & 3;"), "2\n");
    assert_eq!(run_ok("print 6 | 3;"), "7\n");
    assert_eq!(run_ok("print 6 ^ 3;"), "5\n");
    assert_eq!(run_ok("print 1 << 3;"), "8\n");
    assert_eq!(run_ok("print 8 >> 2;"), "2\n");
    assert_eq!(run_ok("print ~0;"), "-1\n");
}

#[test]
fn test_bitwise_requires_integers() {
    run_runtime_err("print 1.5 & 2;");
    run_runtime_err("print 1 << 2.0;");
    run_runtime_err("print ~1.5;");
}

#[test]
fn test_exponentiation() {
    assert_eq!(run_ok("print 2 ** 10;"), "1024\n");
    // Right-associative.
    assert_eq!(run_ok("print 2 ** 3 ** 2;"), "512\n");
    // Negative exponents drop to float.
    assert_eq!(run_ok("print 2 ** -1;"), "0.5\n");
}

#[test]
fn test_unary_operators() {
    assert_eq!(run_ok("print -5;"), "-5\n");
    assert_eq!(run_ok("print +3;"), "3\n");
    assert_eq!(run_ok("print !true;"), "false\n");
    assert_eq!(run_ok("print !0;"), "true\n");
    run_runtime_err("print -\"x\";");
}

#[test]
fn test_arithmetic_requires_numbers() {
    run_runtime_err("print true + 1;");
    run_runtime_err("print none * 2;");
    run_runtime_err("print \"a\" < \"b\";");
}

#[test]
fn test_equality_semantics() {
    assert_eq!(run_ok("print 1 == 1.0;"), "true\n");
    assert_eq!(run_ok("print true == 1;"), "false\n");
    assert_eq!(run_ok("print none == none;"), "true\n");
    assert_eq!(run_ok("print none == false;"), "false\n");
    assert_eq!(run_ok("print \"a\" == \"a\";"), "true\n");
    assert_eq!(run_ok("print 1 != 2;"), "true\n");
}

#[test]
fn test_logical_operators_return_operands() {
    assert_eq!(run_ok("print 0 || 5;"), "5\n");
    assert_eq!(run_ok("print 2 || 5;"), "2\n");
    assert_eq!(run_ok("print 1 && 2;"), "2\n");
    assert_eq!(run_ok("print none && 1;"), "none\n");
    assert_eq!(run_ok("print \"\" || \"x\";"), "x\n");
}

#[test]
fn test_logical_short_circuit_skips_side_effects() {
    assert_eq!(
        run_ok("var n = 0; func bump() { n = 1; return true; } false && bump(); print n;"),
        "0\n"
    );
    assert_eq!(
        run_ok("var n = 0; func bump() { n = 1; return true; } true || bump(); print n;"),
        "0\n"
    );
}

#[test]
fn test_ternary_evaluates_lazily() {
    assert_eq!(run_ok("print 1 ? \"a\" : \"b\";"), "a\n");
    assert_eq!(run_ok("print \"\" ? \"a\" : \"b\";"), "b\n");
    // The untaken branch must not run.
    assert_eq!(
        run_ok("var n = 0; func bump() { n = n + 1; return n; } true ? 1 : bump(); print n;"),
        "0\n"
    );
}

#[test]
fn test_compound_assignment() {
    assert_eq!(run_ok("var x = 5; x += 3; print x;"), "8\n");
    assert_eq!(run_ok("var x = 5; x -= 3; print x;"), "2\n");
    assert_eq!(run_ok("var x = 5; x *= 3; print x;"), "15\n");
    assert_eq!(run_ok("var x = 9; x /= 2; print x;"), "4.5\n");
    assert_eq!(run_ok("var x = 9; x %= 4; print x;"), "1\n");
    assert_eq!(run_ok("var x = 6; x ^= 3; print x;"), "5\n");
    assert_eq!(run_ok("var x = 6; x &= 3; print x;"), "2\n");
    assert_eq!(run_ok("var x = 6; x |= 3; print x;"), "7\n");
    assert_eq!(run_ok("var x = 1; x <<= 4; print x;"), "16\n");
    assert_eq!(run_ok("var x = 16; x >>= 2; print x;"), "4\n");
    assert_eq!(run_ok("var s = \"a\"; s += \"b\"; print s;"), "ab\n");
}

#[test]
fn test_compound_assignment_keeps_type_rules() {
    run_runtime_err("var x = 1.5; x &= 2;");
    run_runtime_err("var x = true; x += 1;");
}

#[test]
fn test_assignment_is_an_expression() {
    assert_eq!(run_ok("var a = 1; var b = 2; a = b = 7; print a + b;"), "14\n");
}

#[test]
fn test_prefix_and_postfix_semantics() {
    assert_eq!(
        run_ok("var i = 1; print i++; print i; print ++i; print --i; print i--; print i;"),
        "1\n2\n3\n2\n2\n1\n"
    );
    assert_eq!(run_ok("var b = 0; print ~~b; print b;"), "-1\n-1\n");
    assert_eq!(run_ok("var f = 1.5; print ++f;"), "2.5\n");
}

#[test]
fn test_prefix_requires_numeric_variable() {
    run_runtime_err("var s = \"x\"; s++;");
    run_runtime_err("var f = 1.5; ~~f;");
}

// ===== variables, scopes, closures =====

#[test]
fn test_block_scoping_and_shadowing() {
    assert_eq!(
        run_ok("var a = 1; { var a = 2; print a; } print a;"),
        "2\n1\n"
    );
}

#[test]
fn test_static_scope_resolution() {
    // The function keeps seeing the binding live at declaration time, even
    // after a shadowing declaration appears later in the block.
    assert_eq!(
        run_ok(
            "var a = \"global\"; \
             { func show() { print a; } show(); var a = \"block\"; show(); }"
        ),
        "global\nglobal\n"
    );
}

#[test]
fn test_closure_captures_creation_environment() {
    assert_eq!(
        run_ok(
            "func make(x) { func inner() { return x; } return inner; } \
             print make(5)();"
        ),
        "5\n"
    );
}

#[test]
fn test_closure_shares_mutable_state() {
    assert_eq!(
        run_ok(
            "func counter() { var n = 0; return lambda() { n = n + 1; return n; }; } \
             var c = counter(); print c(); print c(); print c();"
        ),
        "1\n2\n3\n"
    );
}

#[test]
fn test_lambda_is_a_value() {
    assert_eq!(run_ok("var twice = lambda(x) { return x * 2; }; print twice(21);"), "42\n");
    assert_eq!(run_ok("print lambda(x) { return x; };"), "<lambda>\n");
}

#[test]
fn test_undefined_variable_is_runtime_error() {
    run_runtime_err("print ghost;");
    run_runtime_err("ghost = 1;");
}

#[test]
fn test_runtime_error_stops_execution() {
    let output = run_runtime_err("print 1; print ghost; print 2;");
    assert_eq!(output, "1\n");
}

// ===== control flow =====

#[test]
fn test_if_else() {
    assert_eq!(run_ok("if (1 < 2) print \"yes\"; else print \"no\";"), "yes\n");
    assert_eq!(run_ok("if (\"\") print \"yes\"; else print \"no\";"), "no\n");
}

#[test]
fn test_for_loop_accumulates() {
    assert_eq!(
        run_ok("var n = 0; for (var i = 0; i < 3; i = i + 1) { n = n + i; } print n;"),
        "3\n"
    );
}

#[test]
fn test_while_with_break() {
    assert_eq!(
        run_ok("var i = 0; while (true) { if (i == 2) break; i = i + 1; } print i;"),
        "2\n"
    );
}

#[test]
fn test_break_depth_terminates_exactly_k_loops() {
    assert_eq!(
        run_ok(
            "var hits = 0; \
             for (var i = 0; i < 3; i = i + 1) { \
               for (var j = 0; j < 3; j = j + 1) { \
                 if (j == 1) break 2; \
                 hits = hits + 1; \
               } \
             } \
             print hits;"
        ),
        "1\n"
    );

    assert_eq!(
        run_ok(
            "var log = \"\"; \
             for (var i = 0; i < 2; i = i + 1) { \
               for (var j = 0; j < 2; j = j + 1) { \
                 if (j == 1) break; \
                 log = log + str(i) + str(j); \
               } \
             } \
             print log;"
        ),
        "0010\n"
    );
}

#[test]
fn test_continue_in_while() {
    assert_eq!(
        run_ok(
            "var i = 0; var log = \"\"; \
             while (i < 4) { i = i + 1; if (i == 2) continue; log = log + str(i); } \
             print log;"
        ),
        "134\n"
    );
}

#[test]
fn test_continue_in_for_still_increments() {
    assert_eq!(
        run_ok(
            "var log = \"\"; \
             for (var i = 0; i < 5; i = i + 1) { \
               if (i == 2) continue; \
               log = log + str(i); \
             } \
             print log;"
        ),
        "0134\n"
    );
}

#[test]
fn test_nested_for_continue_only_affects_inner() {
    assert_eq!(
        run_ok(
            "var log = \"\"; \
             for (var i = 0; i < 2; i = i + 1) { \
               for (var j = 0; j < 3; j = j + 1) { \
                 if (j == 1) continue; \
                 log = log + str(i) + str(j); \
               } \
             } \
             print log;"
        ),
        "00021012\n"
    );
}

// ===== functions =====

#[test]
fn test_function_returns_none_by_default() {
    assert_eq!(run_ok("func f() { } print f();"), "none\n");
    assert_eq!(run_ok("func f() { return; } print f();"), "none\n");
}

#[test]
fn test_recursion() {
    assert_eq!(
        run_ok("func fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
        "55\n"
    );
}

#[test]
fn test_arity_mismatch_is_runtime_error() {
    run_runtime_err("func f(a) { return a; } f();");
    run_runtime_err("func f(a) { return a; } f(1, 2);");
}

#[test]
fn test_calling_a_non_callable_is_runtime_error() {
    run_runtime_err("var x = 5; x();");
    run_runtime_err("\"hi\"();");
}

#[test]
fn test_function_display() {
    assert_eq!(run_ok("func f() { } print f;"), "function 'f'\n");
}

#[test]
fn test_arguments_evaluate_left_to_right() {
    assert_eq!(
        run_ok(
            "var log = \"\"; \
             func note(tag) { log = log + tag; return tag; } \
             func three(a, b, c) { return log; } \
             print three(note(\"a\"), note(\"b\"), note(\"c\"));"
        ),
        "abc\n"
    );
}

// ===== builtins =====

#[test]
fn test_str_builtin() {
    assert_eq!(run_ok("print str(42) + \"!\";"), "42!\n");
    assert_eq!(run_ok("print str(true);"), "true\n");
    assert_eq!(run_ok("print str(none);"), "none\n");
    assert_eq!(run_ok("print str(2.5);"), "2.5\n");
}

#[test]
fn test_time_builtin_returns_number() {
    assert_eq!(run_ok("print time() > 0;"), "true\n");
    run_runtime_err("time(1);");
}

// ===== classes =====

#[test]
fn test_class_construction_and_fields() {
    assert_eq!(
        run_ok(
            "class Point { func __init__(x, y) { this.x = x; this.y = y; } } \
             var p = Point(3, 4); print p.x + p.y;"
        ),
        "7\n"
    );
}

#[test]
fn test_class_without_initializer_has_arity_zero() {
    assert_eq!(run_ok("class Bag { } var b = Bag(); b.item = 9; print b.item;"), "9\n");
    run_runtime_err("class Bag { } Bag(1);");
}

#[test]
fn test_initializer_always_returns_instance() {
    assert_eq!(
        run_ok(
            "class C { func __init__() { this.v = 1; return; } } \
             print C().v;"
        ),
        "1\n"
    );
}

#[test]
fn test_methods_bind_this() {
    assert_eq!(
        run_ok(
            "class Greeter { \
               func __init__(name) { this.name = name; } \
               func greet() { return \"hi \" + this.name; } \
             } \
             print Greeter(\"ada\").greet();"
        ),
        "hi ada\n"
    );
}

#[test]
fn test_detached_method_keeps_receiver() {
    assert_eq!(
        run_ok(
            "class Cell { \
               func __init__(v) { this.v = v; } \
               func read() { return this.v; } \
             } \
             var cell = Cell(8); var f = cell.read; print f();"
        ),
        "8\n"
    );
}

#[test]
fn test_fields_shadow_methods() {
    assert_eq!(
        run_ok(
            "class A { func tag() { return \"method\"; } } \
             var a = A(); a.tag = lambda() { return \"field\"; }; print a.tag();"
        ),
        "field\n"
    );
}

#[test]
fn test_inheritance_and_super() {
    assert_eq!(
        run_ok(
            "class A { func greet() { print \"hi\"; } } \
             class B(A) { func greet() { super.greet(); print \"yo\"; } } \
             B().greet();"
        ),
        "hi\nyo\n"
    );
}

#[test]
fn test_inherited_method_lookup_walks_chain() {
    assert_eq!(
        run_ok(
            "class A { func name() { return \"a\"; } } \
             class B(A) { } \
             class C(B) { } \
             print C().name();"
        ),
        "a\n"
    );
}

#[test]
fn test_super_skips_own_class() {
    assert_eq!(
        run_ok(
            "class A { func m() { return \"A\"; } } \
             class B(A) { func m() { return \"B\"; } } \
             class C(B) { func m() { return super.m(); } } \
             print C().m();"
        ),
        "B\n"
    );
}

#[test]
fn test_undefined_property_is_runtime_error() {
    run_runtime_err("class A { } A().missing;");
    run_runtime_err(
        "class A { func m() { return 1; } } \
         class B(A) { func m() { return super.missing(); } } \
         B().m();",
    );
}

#[test]
fn test_property_access_on_non_instance_is_runtime_error() {
    run_runtime_err("var x = 5; x.field;");
    run_runtime_err("var x = 5; x.field = 1;");
}

#[test]
fn test_superclass_must_be_a_class() {
    run_runtime_err("var NotAClass = 5; class B(NotAClass) { }");
}

#[test]
fn test_set_returns_the_value() {
    assert_eq!(
        run_ok("class A { } var a = A(); print a.x = 3; print a.x;"),
        "3\n3\n"
    );
}

#[test]
fn test_display_forms() {
    assert_eq!(run_ok("class A { } print A;"), "class <A>\n");
    assert_eq!(run_ok("class A { } print A();"), "A instance\n");
}

#[test]
fn test_instances_alias() {
    assert_eq!(
        run_ok(
            "class Box { } var a = Box(); var b = a; b.v = 5; print a.v; print a == b;"
        ),
        "5\ntrue\n"
    );
}
