mod ast;
mod ast_printer;
mod builtins;
mod class;
mod env;
mod error;
mod function;
mod highlighter;
mod interpreter;
mod lexer;
mod parser;
mod resolver;
mod token;
mod value;

use ast::ExprId;
use clap::Parser as ClapParser;
use error::Reporter;
use highlighter::TarnishHelper;
use interpreter::Interpreter;
use lexer::Scanner;
use parser::Parser;
use resolver::Resolver;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::path::PathBuf;
use std::process::ExitCode;

const HISTORY_FILE: &str = ".tarnish_history";

/// Tarnish interpreter
#[derive(ClapParser, Debug)]
#[command(name = "tarnish")]
#[command(version)]
#[command(about = "A tree-walking interpreter for the Tarnish scripting language")]
struct CliArgs {
    /// Script file to execute (optional - if not provided, starts REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Dump the token stream before parsing
    #[arg(long = "tokens")]
    show_tokens: bool,

    /// Dump the parsed syntax tree before execution
    #[arg(long = "ast")]
    show_ast: bool,
}

#[derive(Debug, Clone, Copy)]
struct RunOptions {
    show_tokens: bool,
    show_ast: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let options = RunOptions {
        show_tokens: args.show_tokens,
        show_ast: args.show_ast,
    };

    match args.script {
        Some(path) => run_file(&path, options),
        None => run_prompt(options),
    }
}

/// End-to-end pipeline for one chunk of source. Static errors stop the run
/// before execution; the flags tell the caller what went wrong.
fn run(
    source: &str,
    interpreter: &mut Interpreter,
    reporter: &mut Reporter,
    next_id: &mut ExprId,
    options: RunOptions,
) {
    let tokens = Scanner::new(source, reporter).scan_tokens();
    if options.show_tokens {
        for token in &tokens {
            println!("{}", token);
        }
    }

    let statements = Parser::new(tokens, reporter, next_id).parse();
    if reporter.had_error {
        return;
    }

    if options.show_ast {
        println!("{}", ast_printer::print_program(&statements));
    }

    Resolver::new(interpreter, reporter).resolve(&statements);
    if reporter.had_error {
        return;
    }

    interpreter.interpret(&statements, reporter);
}

fn run_file(path: &PathBuf, options: RunOptions) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Cannot read script file {}: {}", path.display(), error);
            return ExitCode::from(1);
        }
    };

    let mut interpreter = Interpreter::new();
    let mut reporter = Reporter::new();
    let mut next_id: ExprId = 0;
    run(&source, &mut interpreter, &mut reporter, &mut next_id, options);

    if reporter.had_error {
        return ExitCode::from(65);
    }
    if reporter.had_runtime_error {
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run_prompt(options: RunOptions) -> ExitCode {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<TarnishHelper, DefaultHistory> = match Editor::with_config(config) {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("Failed to initialize REPL: {}", error);
            return ExitCode::from(1);
        }
    };
    rl.set_helper(Some(TarnishHelper::new()));
    let _ = rl.load_history(HISTORY_FILE);

    println!("Tarnish {}", env!("CARGO_PKG_VERSION"));
    println!("Use Ctrl-D to exit.");

    let mut interpreter = Interpreter::new();
    let mut reporter = Reporter::new();
    let mut next_id: ExprId = 0;

    loop {
        match rl.readline(">>> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                run(&line, &mut interpreter, &mut reporter, &mut next_id, options);
                reporter.reset();
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(error) => {
                eprintln!("Error: {}", error);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    ExitCode::SUCCESS
}
