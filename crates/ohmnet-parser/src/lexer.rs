//! Netlist lexer.

use crate::error::{Error, Result};

/// Token types for ohmnet netlists.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Element, node or unit name (R1, W2, vdd, V, etc.)
    Name(String),
    /// Numeric value with optional suffix (1k, 4.7, -5, 1e3), also used for
    /// numeric node names
    Value(String),
    /// Dot command without the dot, upper-cased (TERMINALS, SOURCE, etc.)
    Command(String),
    /// Raw rest of a `.title` line
    Text(String),
    /// End of line
    Eol,
    /// End of file
    Eof,
}

/// A token with its source location.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Lexer for ohmnet netlists.
///
/// `*` at the start of a line comments out the whole line, `;` comments out
/// the rest of a line, and `+` at the start of a line continues the
/// previous one.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    at_line_start: bool,
    raw_rest: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            at_line_start: true,
            raw_rest: false,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<SpannedToken> {
        self.skip_whitespace();

        let line = self.line;
        let column = self.column;
        let spanned = |token| SpannedToken {
            token,
            line,
            column,
        };

        if std::mem::take(&mut self.raw_rest)
            && self.peek_char().is_some_and(|c| c != '\n')
        {
            let mut text = String::new();
            while let Some(c) = self.peek_char().filter(|&c| c != '\n') {
                text.push(c);
                self.advance();
            }
            return Ok(spanned(Token::Text(text.trim_end().to_string())));
        }

        match self.peek_char() {
            None => Ok(spanned(Token::Eof)),
            Some('\n') => {
                self.advance();
                self.line += 1;
                self.column = 1;
                self.at_line_start = true;
                self.skip_whitespace();
                if self.peek_char() == Some('+') {
                    self.advance();
                    self.at_line_start = false;
                    return self.next_token();
                }
                Ok(spanned(Token::Eol))
            }
            Some('*') if self.at_line_start => {
                self.skip_to_eol();
                self.next_token()
            }
            Some(';') => {
                self.skip_to_eol();
                self.next_token()
            }
            Some('.') => {
                self.advance();
                self.at_line_start = false;
                let cmd = self.read_identifier();
                if cmd.is_empty() {
                    return Err(Error::ParseError {
                        line,
                        message: "expected command name after '.'".to_string(),
                    });
                }
                let cmd = cmd.to_uppercase();
                self.raw_rest = cmd == "TITLE";
                Ok(spanned(Token::Command(cmd)))
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                self.at_line_start = false;
                Ok(spanned(Token::Name(self.read_identifier())))
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => {
                self.at_line_start = false;
                Ok(spanned(Token::Value(self.read_value())))
            }
            Some(c) => Err(Error::ParseError {
                line,
                message: format!("unexpected character: '{}'", c),
            }),
        }
    }

    /// Tokenize the entire input.
    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.token == Token::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.column += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\r') = self.peek_char() {
            self.advance();
        }
    }

    fn skip_to_eol(&mut self) {
        while self.peek_char().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    /// Read a number with its exponent and suffix, e.g. `-2.2e-3` or `1MEG`.
    /// Validation is left to [`parse_value`](ohmnet_core::units::parse_value).
    fn read_value(&mut self) -> String {
        let mut value = String::new();
        while let Some(c) = self.peek_char() {
            let sign_allowed = value.is_empty() || value.ends_with(['e', 'E']);
            if c.is_ascii_alphanumeric() || c == '.' || (sign_allowed && (c == '-' || c == '+')) {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }
        value
    }
}
