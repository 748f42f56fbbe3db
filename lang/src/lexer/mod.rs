pub mod token;

use std::sync::Arc;

pub use token::{Keyword, Position, Source, Span, Token, TokenKind};
use tracing::debug;

use crate::error::Diagnostic;


#[cfg(test)]
mod property_tests;

pub type LexResult = Result<Vec<Token>, Diagnostic>;

/// Splits `text` into tokens, always ending with an EOF token.
///
/// The first diagnostic aborts lexing; no partial token list is returned.
pub fn tokenize(filename: &str, text: &str) -> LexResult {
    tokenize_source(Source::new(filename, text))
}

pub fn tokenize_source(source: Arc<Source>) -> LexResult {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.lex_all()?;
    debug!(file = %lexer.pos.filename(), tokens = tokens.len(), "tokenized");
    Ok(tokens)
}

struct Lexer {
    input: Vec<char>,
    pos: Position,
}

impl Lexer {
    fn new(source: Arc<Source>) -> Self {
        Self {
            input: source.text.chars().collect(),
            pos: Position::start_of(source),
        }
    }

    fn lex_all(&mut self) -> LexResult {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                _ => tokens.push(self.next_token(ch)?),
            }
        }

        tokens.push(Token::new(TokenKind::Eof, Span::point(self.pos.clone())));
        Ok(tokens)
    }

    fn next_token(&mut self, ch: char) -> Result<Token, Diagnostic> {
        let start = self.pos.clone();

        let kind = match ch {
            ';' | '\n' => {
                self.advance();
                // The separator's span stays on the line it ends.
                let span = Span::new(start.clone(), start.next_column());
                return Ok(Token::new(TokenKind::Newline, span));
            }
            '0'..='9' => self.lex_number()?,
            c if c.is_alphabetic() => self.lex_identifier_or_keyword(),
            '"' => self.lex_string()?,
            '+' => {
                self.advance();
                TokenKind::Plus
            }
            '-' => {
                self.advance();
                if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                self.advance();
                TokenKind::Mul
            }
            '/' => {
                self.advance();
                TokenKind::Div
            }
            '^' => {
                self.advance();
                TokenKind::Pow
            }
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            '[' => {
                self.advance();
                TokenKind::LSquare
            }
            ']' => {
                self.advance();
                TokenKind::RSquare
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '!' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Ne
                } else {
                    // Cover the unexpected follow-up character too, if there is one.
                    self.advance();
                    return Err(Diagnostic::expected_character(
                        "'=' (after '!')",
                        Span::new(start, self.pos.clone()),
                    ));
                }
            }
            '=' => self.with_optional_eq(TokenKind::Eq, TokenKind::Ee),
            '<' => self.with_optional_eq(TokenKind::Lt, TokenKind::Lte),
            '>' => self.with_optional_eq(TokenKind::Gt, TokenKind::Gte),
            _ => {
                self.advance();
                return Err(Diagnostic::illegal_character(
                    format!("'{}'", ch),
                    Span::new(start, self.pos.clone()),
                ));
            }
        };

        Ok(Token::new(kind, Span::new(start, self.pos.clone())))
    }

    /// `single` alone, or `double` when directly followed by `=`.
    fn with_optional_eq(&mut self, single: TokenKind, double: TokenKind) -> TokenKind {
        self.advance();
        if self.peek() == Some('=') {
            self.advance();
            double
        } else {
            single
        }
    }

    fn lex_identifier_or_keyword(&mut self) -> TokenKind {
        let mut word = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_alphabetic() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match Keyword::from_word(&word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(word),
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind, Diagnostic> {
        let start = self.pos.clone();
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Ok(TokenKind::String(value)),
                '\\' => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => break,
                },
                _ => value.push(ch),
            }
        }

        Err(Diagnostic::expected_character(
            "'\"' (to close string literal)",
            Span::new(start, self.pos.clone()),
        ))
    }

    /// A run of digits with at most one `.`; a second `.` ends the number.
    fn lex_number(&mut self) -> Result<TokenKind, Diagnostic> {
        let start = self.pos.clone();
        let mut text = String::new();
        let mut has_decimal_point = false;

        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => {
                    text.push(ch);
                    self.advance();
                }
                '.' if !has_decimal_point => {
                    has_decimal_point = true;
                    text.push(ch);
                    self.advance();
                }
                _ => break,
            }
        }

        let span = || Span::new(start.clone(), self.pos.clone());

        if has_decimal_point {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| Diagnostic::invalid_number(format!("'{}'", text), span()))
        } else {
            text.parse::<i64>().map(TokenKind::Int).map_err(|_| {
                Diagnostic::invalid_number(format!("'{}' does not fit in an integer", text), span())
            })
        }
    }

    /// Skips the comment text and the newline ending it, if any.
    fn skip_comment(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos.index).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos.advance(ch);
        Some(ch)
    }
}
