//! Expression parsing: precedence climbing over the fixed operator
//! levels, lowest first:
//!
//! ```text
//! OR  →  AND  →  comparisons/IN  →  UNION INTERSECT DIFF  →  &
//!     →  + -  →  * / DIV MOD  →  unary + - NOT @ ^  →  postfix
//! ```
//!
//! Every level is left-associative and there is no short-circuiting;
//! evaluation order is fixed later by the interpreter, the parser only
//! shapes the tree.

use crate::ast::{
    Binary, BinaryOp, Call, Deref, EofCheck, Expression, Field, Index, Literal, LiteralValue,
    Name, New, Null, SuperCall, TypeExpr, Unary, UnaryOp,
};
use crate::date::Date;
use crate::error::Fallible;
use crate::lexer::{Keyword, TokenKind};

use super::Parser;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Fallible<Expression<()>> {
        self.parse_or()
    }

    /// True when the current token can begin an expression; used where
    /// an expression is optional (`RETURN`).
    pub(crate) fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Integer(_)
                | TokenKind::Real(_)
                | TokenKind::Str(_)
                | TokenKind::Char(_)
                | TokenKind::Boolean(_)
                | TokenKind::Ident(_)
                | TokenKind::LParen
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Caret
                | TokenKind::At
                | TokenKind::Keyword(
                    Keyword::Not | Keyword::New | Keyword::Null | Keyword::Eof | Keyword::Date
                        | Keyword::Super
                )
        )
    }

    fn parse_or(&mut self) -> Fallible<Expression<()>> {
        let mut lhs = self.parse_and()?;
        while self.check_keyword(Keyword::Or) {
            let line = self.line();
            self.advance();
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Fallible<Expression<()>> {
        let mut lhs = self.parse_comparison()?;
        while self.check_keyword(Keyword::And) {
            let line = self.line();
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = binary(BinaryOp::And, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Fallible<Expression<()>> {
        let mut lhs = self.parse_set_op()?;
        loop {
            let op = match self.peek() {
                TokenKind::Equal => BinaryOp::Eq,
                TokenKind::NotEqual => BinaryOp::Ne,
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::Le,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                TokenKind::Keyword(Keyword::In) => BinaryOp::In,
                _ => return Ok(lhs),
            };
            let line = self.line();
            self.advance();
            let rhs = self.parse_set_op()?;
            lhs = binary(op, lhs, rhs, line);
        }
    }

    fn parse_set_op(&mut self) -> Fallible<Expression<()>> {
        let mut lhs = self.parse_concat()?;
        loop {
            let op = match self.peek() {
                TokenKind::Keyword(Keyword::Union) => BinaryOp::Union,
                TokenKind::Keyword(Keyword::Intersect) => BinaryOp::Intersect,
                TokenKind::Keyword(Keyword::Diff) => BinaryOp::Diff,
                _ => return Ok(lhs),
            };
            let line = self.line();
            self.advance();
            let rhs = self.parse_concat()?;
            lhs = binary(op, lhs, rhs, line);
        }
    }

    fn parse_concat(&mut self) -> Fallible<Expression<()>> {
        let mut lhs = self.parse_additive()?;
        while self.peek() == &TokenKind::Ampersand {
            let line = self.line();
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binary(BinaryOp::Concat, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Fallible<Expression<()>> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            let line = self.line();
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs, line);
        }
    }

    fn parse_multiplicative(&mut self) -> Fallible<Expression<()>> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Keyword(Keyword::Div) => BinaryOp::IntDiv,
                TokenKind::Keyword(Keyword::Mod) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            let line = self.line();
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs, line);
        }
    }

    fn parse_unary(&mut self) -> Fallible<Expression<()>> {
        let line = self.line();
        let op = match self.peek() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Keyword(Keyword::Not) => Some(UnaryOp::Not),
            TokenKind::At => Some(UnaryOp::AddressOf),
            TokenKind::Caret => None, // dereference, a distinct node
            _ => return self.parse_postfix(),
        };
        match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary(Unary {
                    op,
                    operand: Box::new(operand),
                    line,
                    info: (),
                }))
            }
            None => {
                self.advance();
                let target = self.parse_unary()?;
                Ok(Expression::Deref(Deref {
                    target: Box::new(target),
                    line,
                    info: (),
                }))
            }
        }
    }

    /// Postfix chain over a primary: indexing, field access, calls.
    pub(crate) fn parse_postfix(&mut self) -> Fallible<Expression<()>> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                TokenKind::LBracket => {
                    let line = self.line();
                    self.advance();
                    let mut indices = vec![self.parse_expression()?];
                    while self.eat(&TokenKind::Comma) {
                        indices.push(self.parse_expression()?);
                    }
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = Expression::Index(Index {
                        base: Box::new(expr),
                        indices,
                        line,
                        info: (),
                    });
                }
                TokenKind::Dot => {
                    let line = self.line();
                    self.advance();
                    let field = self.expect_ident("field or method name")?;
                    expr = Expression::Field(Field {
                        base: Box::new(expr),
                        field,
                        line,
                        info: (),
                    });
                }
                TokenKind::LParen => {
                    // Only names and fields are callable; `(1)(2)` is
                    // left for the checker to reject via shape.
                    if !matches!(expr, Expression::Name(_) | Expression::Field(_)) {
                        return Ok(expr);
                    }
                    let line = self.line();
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expression::Call(Call {
                        callee: Box::new(expr),
                        args,
                        line,
                        info: (),
                    });
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Arguments up to and including the closing parenthesis.
    pub(crate) fn parse_args(&mut self) -> Fallible<Vec<Expression<()>>> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        args.push(self.parse_expression()?);
        while self.eat(&TokenKind::Comma) {
            args.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(args)
    }

    pub(crate) fn parse_optional_args(&mut self) -> Fallible<Vec<Expression<()>>> {
        if self.eat(&TokenKind::LParen) {
            self.parse_args()
        } else {
            Ok(Vec::new())
        }
    }

    pub(crate) fn parse_primary(&mut self) -> Fallible<Expression<()>> {
        let line = self.line();
        match self.peek().clone() {
            TokenKind::Integer(v) => {
                self.advance();
                Ok(literal(LiteralValue::Integer(v), line))
            }
            TokenKind::Real(v) => {
                self.advance();
                Ok(literal(LiteralValue::Real(v), line))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(literal(LiteralValue::Str(s), line))
            }
            TokenKind::Char(c) => {
                self.advance();
                Ok(literal(LiteralValue::Char(c), line))
            }
            TokenKind::Boolean(b) => {
                self.advance();
                Ok(literal(LiteralValue::Boolean(b), line))
            }
            TokenKind::Keyword(Keyword::Date) => {
                // `DATE "…"` is a literal; `DATE(expr)` is the built-in
                // conversion, handled by the postfix call machinery.
                if self.peek_at(1) == &TokenKind::LParen {
                    self.advance();
                    return Ok(Expression::Name(Name {
                        name: "DATE".to_string(),
                        line,
                        info: (),
                    }));
                }
                self.advance();
                let token = self.advance();
                match token.kind {
                    TokenKind::Str(text) => {
                        let date = Date::parse(&text, line)?;
                        Ok(literal(LiteralValue::Date(date), line))
                    }
                    _ => Err(self.unexpected("a date string")),
                }
            }
            // Type keywords double as conversion built-ins when called.
            TokenKind::Keyword(
                kw @ (Keyword::Real | Keyword::String | Keyword::Char | Keyword::Boolean),
            ) if self.peek_at(1) == &TokenKind::LParen => {
                self.advance();
                Ok(Expression::Name(Name {
                    name: kw.as_str().to_string(),
                    line,
                    info: (),
                }))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expression::Null(Null { line, info: () }))
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                let target = self.parse_type()?;
                let args = if matches!(target, TypeExpr::Named(_)) && self.eat(&TokenKind::LParen)
                {
                    Some(self.parse_args()?)
                } else {
                    None
                };
                Ok(Expression::New(New {
                    target,
                    args,
                    line,
                    info: (),
                }))
            }
            TokenKind::Keyword(Keyword::Eof) => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let handle = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expression::EofCheck(EofCheck {
                    handle: Box::new(handle),
                    line,
                    info: (),
                }))
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance();
                self.expect(TokenKind::Dot, "'.'")?;
                let method = self.expect_ident("method name")?;
                self.expect(TokenKind::LParen, "'('")?;
                let args = self.parse_args()?;
                Ok(Expression::SuperCall(SuperCall {
                    method,
                    args,
                    line,
                    info: (),
                }))
            }
            TokenKind::Ident(_) => {
                let name = self.expect_ident("a name")?;
                Ok(Expression::Name(Name {
                    name,
                    line,
                    info: (),
                }))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

fn literal(value: LiteralValue, line: usize) -> Expression<()> {
    Expression::Literal(Literal {
        value,
        line,
        info: (),
    })
}

fn binary(
    op: BinaryOp,
    lhs: Expression<()>,
    rhs: Expression<()>,
    line: usize,
) -> Expression<()> {
    Expression::Binary(Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        line,
        info: (),
    })
}

#[cfg(test)]
mod tests {
    use super::super::Parser;
    use crate::ast::{BinaryOp, Expression, LiteralValue, UnaryOp};
    use crate::lexer::Lexer;

    fn expr(source: &str) -> Expression<()> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        parser.parse_expression().unwrap()
    }

    #[test]
    fn precedence_mul_over_add() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match expr("1 + 2 * 3") {
            Expression::Binary(b) => {
                assert_eq!(b.op, BinaryOp::Add);
                assert!(matches!(*b.rhs, Expression::Binary(ref m) if m.op == BinaryOp::Mul));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn left_associative_subtraction() {
        // 10 - 4 - 3 parses as (10 - 4) - 3
        match expr("10 - 4 - 3") {
            Expression::Binary(b) => {
                assert_eq!(b.op, BinaryOp::Sub);
                assert!(matches!(*b.lhs, Expression::Binary(ref l) if l.op == BinaryOp::Sub));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn concat_binds_tighter_than_comparison() {
        match expr("\"a\" & \"b\" = \"ab\"") {
            Expression::Binary(b) => {
                assert_eq!(b.op, BinaryOp::Eq);
                assert!(matches!(*b.lhs, Expression::Binary(ref c) if c.op == BinaryOp::Concat));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn unary_minus_is_not_part_of_literal() {
        match expr("-7") {
            Expression::Unary(u) => {
                assert_eq!(u.op, UnaryOp::Minus);
                assert!(matches!(
                    *u.operand,
                    Expression::Literal(ref l) if l.value == LiteralValue::Integer(7)
                ));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn caret_builds_deref_nodes() {
        assert!(matches!(expr("^p"), Expression::Deref(_)));
        // ^p^ is not a form; but ^^p nests
        match expr("^^p") {
            Expression::Deref(d) => assert!(matches!(*d.target, Expression::Deref(_))),
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn postfix_chains() {
        match expr("Grid[1, 2].Owner.Speak()") {
            Expression::Call(c) => {
                assert!(matches!(*c.callee, Expression::Field(_)));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn date_literal() {
        match expr("DATE \"2024-02-29\"") {
            Expression::Literal(l) => assert!(matches!(l.value, LiteralValue::Date(_))),
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn in_operator_at_comparison_level() {
        match expr("Summer IN Warm UNION Cold") {
            Expression::Binary(b) => {
                assert_eq!(b.op, BinaryOp::In);
                assert!(matches!(*b.rhs, Expression::Binary(ref s) if s.op == BinaryOp::Union));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }
}
