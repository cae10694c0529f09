// ABOUTME: Error types and the diagnostic reporter shared by every pipeline stage

use crate::token::{Token, TokenKind};
use thiserror::Error;

/// Raised while evaluating; carries the token whose line is reported.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        Self {
            token: token.clone(),
            message: message.into(),
        }
    }
}

/// Panic-mode marker thrown by the parser. The diagnostic is printed through
/// the reporter at raise time, so the marker itself carries nothing.
#[derive(Debug, Error, Clone, Copy)]
#[error("parse error")]
pub struct ParseError;

/// Diagnostic sink. The lexer, parser and resolver report here and keep
/// going; the interpreter reports runtime errors at the statement boundary.
/// File mode inspects the flags to pick an exit code, the REPL clears them
/// after every line.
#[derive(Debug, Default)]
pub struct Reporter {
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a static error at a bare line number (lexer use).
    pub fn error(&mut self, line: usize, message: &str) {
        self.report(&format!("{}", line), message);
    }

    /// Report a static error at a token (parser and resolver use).
    pub fn error_at(&mut self, token: &Token, message: &str) {
        if token.kind == TokenKind::Eof {
            self.report(&format!("{} at end", token.line), message);
        } else {
            self.report(&format!("{} at '{}'", token.line, token.lexeme), message);
        }
    }

    pub fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("[line {}] - {}", error.token.line, error.message);
        self.had_runtime_error = true;
    }

    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    fn report(&mut self, location: &str, message: &str) {
        eprintln!("[line {}] - Error: {}", location, message);
        self.had_error = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_sets_flag() {
        let mut reporter = Reporter::new();
        assert!(!reporter.had_error);
        reporter.error(1, "Unexpected character: $.");
        assert!(reporter.had_error);
        assert!(!reporter.had_runtime_error);
    }

    #[test]
    fn test_runtime_error_sets_flag() {
        let mut reporter = Reporter::new();
        let token = Token::new(TokenKind::Plus, "+", None, 7);
        reporter.runtime_error(&RuntimeError::new(&token, "Operand must be a number."));
        assert!(reporter.had_runtime_error);
        assert!(!reporter.had_error);
    }

    #[test]
    fn test_reset_clears_both_flags() {
        let mut reporter = Reporter::new();
        reporter.error(1, "boom");
        let token = Token::new(TokenKind::Eof, "", None, 1);
        reporter.runtime_error(&RuntimeError::new(&token, "boom"));
        reporter.reset();
        assert!(!reporter.had_error);
        assert!(!reporter.had_runtime_error);
    }
}
