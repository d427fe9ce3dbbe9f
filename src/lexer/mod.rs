//! Hand-written scanner for Prescribe source text.
//!
//! The source is ASCII except for a single permitted Unicode character,
//! the assignment arrow `←` (U+2190), which lexes the same as `<-`.
//! Keywords are matched case-insensitively and normalized to uppercase;
//! `TRUE`/`FALSE` become boolean tokens. Every token records the line
//! and column it starts on.

mod token;

pub use token::{Keyword, Loc, Token, TokenKind};

use crate::error::{Diagnostic, Fallible};

const MAX_IDENT_LEN: usize = 64;

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scan the entire buffer into a token vector ending with `Eof`.
    pub fn tokenize(mut self) -> Fallible<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Fallible<Token> {
        self.skip_whitespace_and_comments();

        let loc = Loc::new(self.line, self.column);
        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Ok(Token::new(TokenKind::Eof, loc)),
        };

        if ch.is_ascii_alphabetic() {
            return self.scan_word(loc);
        }
        if ch.is_ascii_digit() {
            return self.scan_number(loc);
        }
        match ch {
            '"' => self.scan_string(loc),
            '\'' => self.scan_char(loc),
            _ => self.scan_operator(loc),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn scan_word(&mut self, loc: Loc) -> Fallible<Token> {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if word.len() > MAX_IDENT_LEN {
            return Err(Diagnostic::syntax(
                loc.line,
                format!("Identifier exceeds {MAX_IDENT_LEN} characters."),
            ));
        }
        let kind = if word.eq_ignore_ascii_case("TRUE") {
            TokenKind::Boolean(true)
        } else if word.eq_ignore_ascii_case("FALSE") {
            TokenKind::Boolean(false)
        } else {
            match Keyword::lookup(&word) {
                Some(kw) => TokenKind::Keyword(kw),
                None => TokenKind::Ident(word),
            }
        };
        Ok(Token::new(kind, loc))
    }

    fn scan_number(&mut self, loc: Loc) -> Fallible<Token> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // A '.' or exponent only extends the literal when the lookahead
        // confirms a real; otherwise the dot/letter belongs to the next
        // token.
        let mut is_real = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_real = true;
            digits.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut offset = 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                offset = 2;
            }
            if self.peek_at(offset).is_some_and(|c| c.is_ascii_digit()) {
                is_real = true;
                digits.push('e');
                self.advance();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    digits.push(self.peek().unwrap());
                    self.advance();
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_real {
            let value: f64 = digits
                .parse()
                .map_err(|_| Diagnostic::syntax(loc.line, "Malformed real literal."))?;
            if !value.is_finite() {
                return Err(Diagnostic::syntax(loc.line, "Real literal out of range."));
            }
            Ok(Token::new(TokenKind::Real(value), loc))
        } else {
            let value: i32 = digits
                .parse()
                .map_err(|_| Diagnostic::syntax(loc.line, "Integer literal out of range."))?;
            Ok(Token::new(TokenKind::Integer(value), loc))
        }
    }

    /// Shared escape processing for string and char literals.
    fn scan_escape(&mut self, line: usize) -> Fallible<char> {
        self.advance(); // the backslash
        let c = self
            .advance()
            .ok_or_else(|| Diagnostic::syntax(line, "Unterminated escape sequence."))?;
        match c {
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            '\\' => Ok('\\'),
            '"' => Ok('"'),
            '\'' => Ok('\''),
            'x' => {
                let hi = self.advance();
                let lo = self.advance();
                match (hi.and_then(|c| c.to_digit(16)), lo.and_then(|c| c.to_digit(16))) {
                    (Some(hi), Some(lo)) => {
                        let code = hi * 16 + lo;
                        char::from_u32(code)
                            .ok_or_else(|| Diagnostic::syntax(line, "Invalid escape sequence."))
                    }
                    _ => Err(Diagnostic::syntax(line, "Invalid \\x escape sequence.")),
                }
            }
            other => Err(Diagnostic::syntax(
                line,
                format!("Invalid escape sequence '\\{other}'."),
            )),
        }
    }

    fn scan_string(&mut self, loc: Loc) -> Fallible<Token> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(Diagnostic::syntax(loc.line, "Unterminated string literal."));
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::new(TokenKind::Str(value), loc));
                }
                Some('\\') => value.push(self.scan_escape(loc.line)?),
                Some(c) if c.is_ascii() => {
                    value.push(c);
                    self.advance();
                }
                Some(c) => {
                    return Err(Diagnostic::syntax(
                        loc.line,
                        format!("Non-ASCII character '{c}' in string literal."),
                    ));
                }
            }
        }
    }

    fn scan_char(&mut self, loc: Loc) -> Fallible<Token> {
        self.advance(); // opening quote
        let value = match self.peek() {
            None | Some('\n') => {
                return Err(Diagnostic::syntax(loc.line, "Unterminated character literal."));
            }
            Some('\\') => self.scan_escape(loc.line)?,
            Some(c) if c.is_ascii() && c != '\'' => {
                self.advance();
                c
            }
            Some(_) => {
                return Err(Diagnostic::syntax(loc.line, "Malformed character literal."));
            }
        };
        if self.peek() != Some('\'') {
            return Err(Diagnostic::syntax(
                loc.line,
                "Character literal must contain exactly one character.",
            ));
        }
        self.advance(); // closing quote
        Ok(Token::new(TokenKind::Char(value), loc))
    }

    fn scan_operator(&mut self, loc: Loc) -> Fallible<Token> {
        let c = self.advance().expect("caller checked non-empty");
        let kind = match c {
            '\u{2190}' => TokenKind::Assign,
            '<' => match self.peek() {
                Some('-') => {
                    self.advance();
                    TokenKind::Assign
                }
                Some('=') => {
                    self.advance();
                    TokenKind::LessEqual
                }
                Some('>') => {
                    self.advance();
                    TokenKind::NotEqual
                }
                _ => TokenKind::Less,
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '=' => TokenKind::Equal,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '&' => TokenKind::Ampersand,
            '^' => TokenKind::Caret,
            '@' => TokenKind::At,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            other => {
                return Err(Diagnostic::syntax(
                    loc.line,
                    format!("Unexpected character '{other}'."),
                ));
            }
        };
        Ok(Token::new(kind, loc))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("program Program PROGRAM"),
            vec![
                TokenKind::Keyword(Keyword::Program),
                TokenKind::Keyword(Keyword::Program),
                TokenKind::Keyword(Keyword::Program),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unicode_arrow_is_assignment() {
        assert_eq!(kinds("x \u{2190} 1"), kinds("x <- 1"));
    }

    #[test]
    fn numbers_split_on_lookahead() {
        assert_eq!(
            kinds("1.5 2 1E3 7e-2"),
            vec![
                TokenKind::Real(1.5),
                TokenKind::Integer(2),
                TokenKind::Real(1000.0),
                TokenKind::Real(0.07),
                TokenKind::Eof,
            ]
        );
        // a dot not followed by a digit stays a delimiter
        assert_eq!(
            kinds("R.N"),
            vec![
                TokenKind::Ident("R".into()),
                TokenKind::Dot,
                TokenKind::Ident("N".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_lines() {
        let tokens = Lexer::new("a\nb // comment\nc").tokenize().unwrap();
        assert_eq!(tokens[0].loc.line, 1);
        assert_eq!(tokens[1].loc.line, 2);
        assert_eq!(tokens[2].loc.line, 3);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\n\x41\"""#),
            vec![TokenKind::Str("a\nA\"".into()), TokenKind::Eof]
        );
        assert!(Lexer::new(r#""\q""#).tokenize().is_err());
        assert!(Lexer::new("\"caf\u{e9}\"").tokenize().is_err());
    }

    #[test]
    fn char_literals() {
        assert_eq!(
            kinds(r"'a' '\t'"),
            vec![TokenKind::Char('a'), TokenKind::Char('\t'), TokenKind::Eof]
        );
        assert!(Lexer::new("'ab'").tokenize().is_err());
    }

    #[test]
    fn identifier_length_cap() {
        let long = "x".repeat(65);
        let err = Lexer::new(&long).tokenize().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Syntax);
        assert!(Lexer::new(&"x".repeat(64)).tokenize().is_ok());
    }

    #[test]
    fn longest_match_operators() {
        assert_eq!(
            kinds("<= <> <- < ="),
            vec![
                TokenKind::LessEqual,
                TokenKind::NotEqual,
                TokenKind::Assign,
                TokenKind::Less,
                TokenKind::Equal,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn boolean_literals() {
        assert_eq!(
            kinds("TRUE false"),
            vec![TokenKind::Boolean(true), TokenKind::Boolean(false), TokenKind::Eof]
        );
    }

    #[test]
    fn integer_literal_overflow() {
        assert!(Lexer::new("2147483648").tokenize().is_err());
        assert_eq!(kinds("2147483647"), vec![TokenKind::Integer(i32::MAX), TokenKind::Eof]);
    }

    #[test]
    fn rejects_stray_characters() {
        assert!(Lexer::new("#").tokenize().is_err());
        assert!(Lexer::new("\u{4f60}").tokenize().is_err());
    }
}
