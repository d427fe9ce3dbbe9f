//! Recursive descent parser.
//!
//! Grammar rules are split by category, mirroring the AST layout:
//!
//! - [`declaration`] — `DECLARE`, `CONSTANT`, `TYPE`, `DEFINE`,
//!   routines, classes
//! - [`statement`] — control flow, assignment, I/O, file statements
//! - [`expression`] — precedence climbing over the operator levels
//!
//! The parser owns the token vector and a cursor. A handful of rules
//! (case-arm detection) save and restore the cursor to disambiguate;
//! everything else is single-token lookahead. Any unexpected token is a
//! `SyntaxError` carrying the token's line.

mod declaration;
mod expression;
mod statement;

use crate::ast::{Block, Program};
use crate::error::{Diagnostic, Fallible};
use crate::lexer::{Keyword, Lexer, Token, TokenKind};

/// Lex and parse a full `PROGRAM … ENDPROGRAM` unit.
pub fn parse_source(source: &str) -> Fallible<Program<()>> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn parse_program(&mut self) -> Fallible<Program<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Program)?;
        let name = self.expect_ident("program name")?;
        let block = self.parse_block(&[Keyword::EndProgram])?;
        self.expect_keyword(Keyword::EndProgram)?;
        if self.peek() != &TokenKind::Eof {
            return Err(self.unexpected("end of input"));
        }
        Ok(Program { name, block, line })
    }

    /// Parse declarations followed by statements, stopping (without
    /// consuming) at any of the given terminator keywords.
    pub(crate) fn parse_block(&mut self, terminators: &[Keyword]) -> Fallible<Block<()>> {
        let mut block = Block::empty();
        loop {
            if self.at_terminator(terminators) {
                return Ok(block);
            }
            if self.at_declaration() {
                block.declarations.push(self.parse_declaration()?);
            } else {
                break;
            }
        }
        loop {
            if self.at_terminator(terminators) {
                return Ok(block);
            }
            if self.at_declaration() {
                return Err(Diagnostic::syntax(
                    self.line(),
                    "Declarations must precede statements in a block.",
                ));
            }
            block.statements.push(self.parse_statement()?);
        }
    }

    fn at_terminator(&self, terminators: &[Keyword]) -> bool {
        match self.peek() {
            TokenKind::Keyword(kw) => terminators.contains(kw),
            TokenKind::Eof => true,
            _ => false,
        }
    }

    pub(crate) fn at_declaration(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Keyword(
                Keyword::Declare
                    | Keyword::Constant
                    | Keyword::Type
                    | Keyword::Define
                    | Keyword::Procedure
                    | Keyword::Function
                    | Keyword::Class
            )
        )
    }

    // === token navigation ===

    pub(crate) fn peek(&self) -> &TokenKind {
        &self.tokens[self.index.min(self.tokens.len() - 1)].kind
    }

    pub(crate) fn peek_at(&self, offset: usize) -> &TokenKind {
        let i = (self.index + offset).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    pub(crate) fn line(&self) -> usize {
        self.tokens[self.index.min(self.tokens.len() - 1)].loc.line
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.tokens[self.index.min(self.tokens.len() - 1)].clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    pub(crate) fn position(&self) -> usize {
        self.index
    }

    pub(crate) fn restore(&mut self, position: usize) {
        self.index = position;
    }

    pub(crate) fn check_keyword(&self, kw: Keyword) -> bool {
        self.peek() == &TokenKind::Keyword(kw)
    }

    /// Consume the keyword if present.
    pub(crate) fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, kw: Keyword) -> Fallible<Token> {
        if self.check_keyword(kw) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", kw.as_str())))
        }
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Fallible<Token> {
        if self.peek() == &kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    pub(crate) fn expect_ident(&mut self, what: &str) -> Fallible<String> {
        match self.peek() {
            TokenKind::Ident(_) => {
                let token = self.advance();
                match token.kind {
                    TokenKind::Ident(name) => Ok(name),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.unexpected(what)),
        }
    }

    pub(crate) fn unexpected(&self, expected: &str) -> Diagnostic {
        Diagnostic::syntax(
            self.line(),
            format!("Expected {expected}, found {}.", self.peek().describe()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_program() {
        let program = parse_source("PROGRAM P ENDPROGRAM").unwrap();
        assert_eq!(program.name, "P");
        assert!(program.block.declarations.is_empty());
        assert!(program.block.statements.is_empty());
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(parse_source("PROGRAM P ENDPROGRAM extra").is_err());
    }

    #[test]
    fn declarations_must_precede_statements() {
        let err = parse_source(
            "PROGRAM P\n OUTPUT 1\n DECLARE x : INTEGER\nENDPROGRAM",
        )
        .unwrap_err();
        assert!(err.message.contains("precede"));
        assert_eq!(err.line, 3);
    }
}
