// ABOUTME: Syntax highlighter for the REPL with color support
// Implements rustyline's Highlighter trait to provide ANSI color codes
// for Tarnish syntax elements while preserving display width

use rustyline::completion::Completer;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Helper;
use std::borrow::Cow;
use std::collections::HashSet;

// ANSI color codes (3-bit/4-bit colors for maximum terminal compatibility)
const COLOR_RESET: &str = "\x1b[0m";
const COLOR_BRACES: &str = "\x1b[1;34m"; // Bold blue
const COLOR_KEYWORD: &str = "\x1b[1;35m"; // Bold magenta
const COLOR_BUILTIN: &str = "\x1b[36m"; // Cyan
const COLOR_NUMBER: &str = "\x1b[33m"; // Yellow
const COLOR_STRING: &str = "\x1b[32m"; // Green
const COLOR_COMMENT: &str = "\x1b[90m"; // Bright black (gray)

/// Main REPL helper: keyword-aware color highlighting for Tarnish input.
pub struct TarnishHelper;

impl TarnishHelper {
    pub fn new() -> Self {
        TarnishHelper
    }
}

impl Default for TarnishHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl Helper for TarnishHelper {}

impl Completer for TarnishHelper {
    type Candidate = String;
}

impl Hinter for TarnishHelper {
    type Hint = String;
}

impl Validator for TarnishHelper {}

impl Highlighter for TarnishHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let keywords = get_keywords();
        let builtins = get_builtins();

        let highlighted = highlight_line(line, &keywords, &builtins);

        if highlighted == line {
            Cow::Borrowed(line)
        } else {
            Cow::Owned(highlighted)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn highlight_line(
    line: &str,
    keywords: &HashSet<&'static str>,
    builtins: &HashSet<&'static str>,
) -> String {
    let mut result = String::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            // Line comments run to the end; block comments are left to the
            // lexer since a single REPL line rarely holds one.
            '/' if i + 1 < chars.len() && chars[i + 1] == '/' => {
                result.push_str(COLOR_COMMENT);
                while i < chars.len() {
                    result.push(chars[i]);
                    i += 1;
                }
                result.push_str(COLOR_RESET);
            }

            '"' => {
                result.push_str(COLOR_STRING);
                result.push('"');
                i += 1;
                while i < chars.len() {
                    if chars[i] == '"' {
                        result.push('"');
                        i += 1;
                        break;
                    }
                    result.push(chars[i]);
                    i += 1;
                }
                result.push_str(COLOR_RESET);
            }

            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let number: String = chars[start..i].iter().collect();
                result.push_str(COLOR_NUMBER);
                result.push_str(&number);
                result.push_str(COLOR_RESET);
            }

            '(' | ')' | '{' | '}' | '[' | ']' => {
                result.push_str(COLOR_BRACES);
                result.push(chars[i]);
                i += 1;
                result.push_str(COLOR_RESET);
            }

            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                if keywords.contains(word.as_str()) {
                    result.push_str(COLOR_KEYWORD);
                    result.push_str(&word);
                    result.push_str(COLOR_RESET);
                } else if builtins.contains(word.as_str()) {
                    result.push_str(COLOR_BUILTIN);
                    result.push_str(&word);
                    result.push_str(COLOR_RESET);
                } else {
                    result.push_str(&word);
                }
            }

            c => {
                result.push(c);
                i += 1;
            }
        }
    }

    result
}

fn get_keywords() -> HashSet<&'static str> {
    [
        "break",
        "class",
        "continue",
        "else",
        "enum",
        "false",
        "for",
        "func",
        "if",
        "interface",
        "lambda",
        "none",
        "print",
        "private",
        "protected",
        "public",
        "return",
        "super",
        "this",
        "true",
        "var",
        "while",
    ]
    .iter()
    .copied()
    .collect()
}

fn get_builtins() -> HashSet<&'static str> {
    ["time", "str"].iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_highlighting() {
        let highlighted = highlight_line("var x = 1;", &get_keywords(), &get_builtins());
        assert!(highlighted.contains(COLOR_KEYWORD));
        assert!(highlighted.contains(COLOR_NUMBER));
    }

    #[test]
    fn test_string_highlighting() {
        let highlighted = highlight_line("print \"hello\";", &get_keywords(), &get_builtins());
        assert!(highlighted.contains(COLOR_STRING));
    }

    #[test]
    fn test_comment_highlighting() {
        let highlighted = highlight_line("// a comment", &get_keywords(), &get_builtins());
        assert!(highlighted.contains(COLOR_COMMENT));
    }

    #[test]
    fn test_builtin_highlighting() {
        let highlighted = highlight_line("print str(time());", &get_keywords(), &get_builtins());
        assert!(highlighted.contains(COLOR_BUILTIN));
        assert!(highlighted.contains(COLOR_BRACES));
    }

    #[test]
    fn test_plain_identifier_untouched() {
        let highlighted = highlight_line("counter", &get_keywords(), &get_builtins());
        assert_eq!(highlighted, "counter");
    }

    #[test]
    fn test_keyword_prefix_is_not_keyword() {
        let highlighted = highlight_line("classy", &get_keywords(), &get_builtins());
        assert_eq!(highlighted, "classy");
    }
}
