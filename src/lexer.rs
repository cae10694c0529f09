// ABOUTME: Lexer turning Tarnish source text into a token stream

use crate::error::Reporter;
use crate::token::{Literal, Token, TokenKind};

/// Single-pass scanner. Never fails: bad input is reported through the
/// diagnostic sink and scanning continues, so the parser always receives an
/// `Eof`-terminated stream.
pub struct Scanner<'a> {
    source: Vec<char>,
    reporter: &'a mut Reporter,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alphanumeric(c: char) -> bool {
    is_digit(c) || is_alpha(c)
}

fn keyword(lexeme: &str) -> Option<TokenKind> {
    match lexeme {
        "break" => Some(TokenKind::Break),
        "class" => Some(TokenKind::Class),
        "continue" => Some(TokenKind::Continue),
        "else" => Some(TokenKind::Else),
        "enum" => Some(TokenKind::Enum),
        "false" => Some(TokenKind::False),
        "for" => Some(TokenKind::For),
        "func" => Some(TokenKind::Func),
        "if" => Some(TokenKind::If),
        "interface" => Some(TokenKind::Interface),
        "lambda" => Some(TokenKind::Lambda),
        "none" => Some(TokenKind::None),
        "print" => Some(TokenKind::Print),
        "private" => Some(TokenKind::Private),
        "protected" => Some(TokenKind::Protected),
        "public" => Some(TokenKind::Public),
        "return" => Some(TokenKind::Return),
        "super" => Some(TokenKind::Super),
        "this" => Some(TokenKind::This),
        "true" => Some(TokenKind::True),
        "var" => Some(TokenKind::Var),
        "while" => Some(TokenKind::While),
        _ => None,
    }
}

impl<'a> Scanner<'a> {
    pub fn new(source: &str, reporter: &'a mut Reporter) -> Self {
        Self {
            source: source.chars().collect(),
            reporter,
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens
            .push(Token::new(TokenKind::Eof, "", None, self.line));
        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source.get(self.current + 1).copied().unwrap_or('\0')
    }

    /// True when the upcoming characters spell `expected`, without consuming.
    fn next_is(&self, expected: &str) -> bool {
        expected
            .chars()
            .enumerate()
            .all(|(i, c)| self.source.get(self.current + i).copied() == Some(c))
    }

    /// Longest-match helper: consume `expected` if it is next.
    fn match_str(&mut self, expected: &str) -> bool {
        if !self.next_is(expected) {
            return false;
        }
        self.current += expected.chars().count();
        true
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_literal_token(kind, None);
    }

    fn add_literal_token(&mut self, kind: TokenKind, literal: Option<Literal>) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, literal, self.line));
    }

    fn block_comment(&mut self) {
        let mut nesting = 1;
        while nesting > 0 {
            if self.is_at_end() {
                self.reporter.error(self.line, "Unterminated block comment.");
                return;
            }
            if self.match_str("/*") {
                nesting += 1;
                continue;
            }
            if self.match_str("*/") {
                nesting -= 1;
                continue;
            }
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
    }

    fn identifier(&mut self) {
        while is_alphanumeric(self.peek()) {
            self.advance();
        }

        let lexeme = self.lexeme();
        self.add_token(keyword(&lexeme).unwrap_or(TokenKind::Identifier));
    }

    /// Numbers are `Int` unless the lexeme carries a decimal point. A leading
    /// dot (`.5`) is allowed but a second dot never is, so `.5.3` lexes as
    /// two floats.
    fn number(&mut self, leading_dot: bool) {
        while is_digit(self.peek()) {
            self.advance();
        }

        if !leading_dot && self.peek() == '.' && is_digit(self.peek_next()) {
            self.advance();
            while is_digit(self.peek()) {
                self.advance();
            }
        }

        let lexeme = self.lexeme();
        let literal = if lexeme.contains('.') {
            lexeme.parse::<f64>().ok().map(Literal::Float)
        } else {
            // A literal too large for i64 quietly widens to a float.
            lexeme
                .parse::<i64>()
                .map(Literal::Int)
                .or_else(|_| lexeme.parse::<f64>().map(Literal::Float))
                .ok()
        };

        match literal {
            Some(literal) => self.add_literal_token(TokenKind::Number, Some(literal)),
            None => {
                let message = format!("Invalid number literal '{}'.", lexeme);
                self.reporter.error(self.line, &message);
            }
        }
    }

    fn string(&mut self) {
        if self.match_str("\"\"") {
            // Triple-quoted: runs until a balanced """, newlines included.
            while !self.next_is("\"\"\"") && !self.is_at_end() {
                if self.peek() == '\n' {
                    self.line += 1;
                }
                self.advance();
            }

            if self.is_at_end() {
                self.reporter.error(self.line, "Unterminated string.");
                return;
            }

            self.current += 3;
            let literal: String = self.source[self.start + 3..self.current - 3].iter().collect();
            self.add_literal_token(TokenKind::String, Some(Literal::Str(literal)));
            return;
        }

        while self.peek() != '"' && !(self.is_at_end() || self.peek() == '\n') {
            self.advance();
        }

        if self.is_at_end() || self.peek() == '\n' {
            self.reporter.error(self.line, "Unterminated string.");
            return;
        }

        self.advance();
        let literal: String = self.source[self.start + 1..self.current - 1].iter().collect();
        self.add_literal_token(TokenKind::String, Some(Literal::Str(literal)));
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            '[' => self.add_token(TokenKind::LeftBracket),
            ']' => self.add_token(TokenKind::RightBracket),
            ',' => self.add_token(TokenKind::Comma),
            '@' => self.add_token(TokenKind::AtSign),
            ':' => self.add_token(TokenKind::Colon),
            ';' => self.add_token(TokenKind::Semicolon),
            '?' => self.add_token(TokenKind::Question),

            '=' => {
                let kind = if self.match_str("=") {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            '!' => {
                let kind = if self.match_str("=") {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            '~' => {
                let kind = if self.match_str("~") {
                    TokenKind::TildeTilde
                } else {
                    TokenKind::Tilde
                };
                self.add_token(kind);
            }
            '^' => {
                let kind = if self.match_str("=") {
                    TokenKind::CaretEqual
                } else {
                    TokenKind::Caret
                };
                self.add_token(kind);
            }
            '%' => {
                let kind = if self.match_str("=") {
                    TokenKind::PercentEqual
                } else {
                    TokenKind::Percent
                };
                self.add_token(kind);
            }

            '/' => {
                if self.match_str("/") {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_str("*") {
                    self.block_comment();
                } else if self.match_str("=") {
                    self.add_token(TokenKind::SlashEqual);
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }

            '*' => {
                if self.match_str("*") {
                    self.add_token(TokenKind::StarStar);
                } else if self.match_str("=") {
                    self.add_token(TokenKind::StarEqual);
                } else {
                    self.add_token(TokenKind::Star);
                }
            }

            '+' => {
                if self.match_str("+") {
                    self.add_token(TokenKind::PlusPlus);
                } else if self.match_str("=") {
                    self.add_token(TokenKind::PlusEqual);
                } else {
                    self.add_token(TokenKind::Plus);
                }
            }

            '|' => {
                if self.match_str("|") {
                    self.add_token(TokenKind::BarBar);
                } else if self.match_str("=") {
                    self.add_token(TokenKind::BarEqual);
                } else {
                    self.add_token(TokenKind::Bar);
                }
            }

            '&' => {
                if self.match_str("&") {
                    self.add_token(TokenKind::AmpersandAmpersand);
                } else if self.match_str("=") {
                    self.add_token(TokenKind::AmpersandEqual);
                } else {
                    self.add_token(TokenKind::Ampersand);
                }
            }

            '-' => {
                if self.match_str("-") {
                    self.add_token(TokenKind::MinusMinus);
                } else if self.match_str(">") {
                    self.add_token(TokenKind::Arrow);
                } else if self.match_str("=") {
                    self.add_token(TokenKind::MinusEqual);
                } else {
                    self.add_token(TokenKind::Minus);
                }
            }

            '<' => {
                if self.match_str("<=") {
                    self.add_token(TokenKind::LessLessEqual);
                } else if self.match_str("<") {
                    self.add_token(TokenKind::LessLess);
                } else if self.match_str("=") {
                    self.add_token(TokenKind::LessEqual);
                } else {
                    self.add_token(TokenKind::Less);
                }
            }

            '>' => {
                if self.match_str(">=") {
                    self.add_token(TokenKind::GreaterGreaterEqual);
                } else if self.match_str(">") {
                    self.add_token(TokenKind::GreaterGreater);
                } else if self.match_str("=") {
                    self.add_token(TokenKind::GreaterEqual);
                } else {
                    self.add_token(TokenKind::Greater);
                }
            }

            '"' => self.string(),

            '.' => {
                if is_digit(self.peek()) {
                    self.number(true);
                } else {
                    self.add_token(TokenKind::Dot);
                }
            }

            '\n' => self.line += 1,

            c if c.is_whitespace() => {}

            c if is_alpha(c) => self.identifier(),
            c if is_digit(c) => self.number(false),

            c => {
                let message = format!("Unexpected character: {}.", c);
                self.reporter.error(self.line, &message);
            }
        }
    }
}
