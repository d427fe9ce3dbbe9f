//! Statement parsing.

use crate::ast::{
    AssignStmt, CallStmt, CallTarget, CaseArm, CaseLabels, CaseStmt, CloseFileStmt, Expression,
    ForStmt, GetRecordStmt, IfStmt, InputStmt, OpenFileStmt, OutputStmt, PutRecordStmt,
    ReadFileStmt, RepeatStmt, ReturnStmt, SeekStmt, Statement, SuperStmt, WhileStmt,
    WriteFileStmt,
};
use crate::error::{Diagnostic, Fallible};
use crate::lexer::{Keyword, TokenKind};

use super::Parser;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Fallible<Statement<()>> {
        match self.peek() {
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::Case) => self.parse_case(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Repeat) => self.parse_repeat(),
            TokenKind::Keyword(Keyword::Call) => self.parse_call(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Input) => self.parse_input(),
            TokenKind::Keyword(Keyword::Output) => self.parse_output(),
            TokenKind::Keyword(Keyword::Super) => self.parse_super(),
            TokenKind::Keyword(Keyword::OpenFile) => self.parse_open_file(),
            TokenKind::Keyword(Keyword::CloseFile) => self.parse_close_file(),
            TokenKind::Keyword(Keyword::ReadFile) => self.parse_read_file(),
            TokenKind::Keyword(Keyword::WriteFile) => self.parse_write_file(),
            TokenKind::Keyword(Keyword::Seek) => self.parse_seek(),
            TokenKind::Keyword(Keyword::GetRecord) => self.parse_get_record(),
            TokenKind::Keyword(Keyword::PutRecord) => self.parse_put_record(),
            _ => self.parse_assignment(),
        }
    }

    /// `lvalue <- expr`
    fn parse_assignment(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        let target = self.parse_postfix()?;
        if !target.is_lvalue() {
            return Err(Diagnostic::syntax(line, "Expected a statement."));
        }
        self.expect(TokenKind::Assign, "'<-'")?;
        let value = self.parse_expression()?;
        Ok(Statement::Assign(AssignStmt {
            target,
            value,
            line,
        }))
    }

    fn parse_if(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::If)?;
        let condition = self.parse_expression()?;
        self.expect_keyword(Keyword::Then)?;
        let then_block = self.parse_block(&[Keyword::Else, Keyword::EndIf])?;
        let else_block = if self.eat_keyword(Keyword::Else) {
            Some(self.parse_block(&[Keyword::EndIf])?)
        } else {
            None
        };
        self.expect_keyword(Keyword::EndIf)?;
        Ok(Statement::If(IfStmt {
            condition,
            then_block,
            else_block,
            line,
        }))
    }

    /// `CASE OF expr arms [OTHERWISE block] ENDCASE`
    ///
    /// An arm starts wherever `label {"," label} ":"` or
    /// `label TO label ":"` parses; the cursor is saved and restored to
    /// probe for that shape between statements.
    fn parse_case(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Case)?;
        self.expect_keyword(Keyword::Of)?;
        let scrutinee = self.parse_expression()?;

        let mut arms: Vec<CaseArm<()>> = Vec::new();
        loop {
            if self.check_keyword(Keyword::EndCase) || self.check_keyword(Keyword::Otherwise) {
                break;
            }
            let arm_line = self.line();
            let labels = match self.try_parse_case_labels()? {
                Some(labels) => labels,
                None => {
                    // Not a label: this statement belongs to the arm
                    // being built.
                    match arms.last_mut() {
                        Some(arm) => {
                            let stmt = self.parse_statement()?;
                            arm.body.statements.push(stmt);
                            continue;
                        }
                        None => return Err(self.unexpected("a case label")),
                    }
                }
            };
            arms.push(CaseArm {
                labels,
                body: crate::ast::Block::empty(),
                line: arm_line,
            });
        }

        let otherwise = if self.eat_keyword(Keyword::Otherwise) {
            Some(self.parse_block(&[Keyword::EndCase])?)
        } else {
            None
        };
        self.expect_keyword(Keyword::EndCase)?;
        Ok(Statement::Case(CaseStmt {
            scrutinee,
            arms,
            otherwise,
            line,
        }))
    }

    /// Probe for `label {"," label} ":"` / `label TO label ":"`; on
    /// failure the cursor is restored and `None` returned.
    fn try_parse_case_labels(&mut self) -> Fallible<Option<CaseLabels<()>>> {
        let saved = self.position();
        let first = match self.parse_case_label() {
            Ok(expr) => expr,
            Err(_) => {
                self.restore(saved);
                return Ok(None);
            }
        };
        if self.eat_keyword(Keyword::To) {
            let high = match self.parse_case_label() {
                Ok(expr) => expr,
                Err(_) => {
                    self.restore(saved);
                    return Ok(None);
                }
            };
            if self.eat(&TokenKind::Colon) {
                return Ok(Some(CaseLabels::Range(first, high)));
            }
            self.restore(saved);
            return Ok(None);
        }
        let mut values = vec![first];
        while self.eat(&TokenKind::Comma) {
            match self.parse_case_label() {
                Ok(expr) => values.push(expr),
                Err(_) => {
                    self.restore(saved);
                    return Ok(None);
                }
            }
        }
        if self.eat(&TokenKind::Colon) {
            Ok(Some(CaseLabels::Values(values)))
        } else {
            self.restore(saved);
            Ok(None)
        }
    }

    /// A case label: an optionally signed literal, a date literal, or a
    /// name that must fold to a constant.
    fn parse_case_label(&mut self) -> Fallible<Expression<()>> {
        match self.peek() {
            TokenKind::Minus | TokenKind::Plus => {
                let op_token = self.advance();
                let operand = self.parse_case_label()?;
                let op = if op_token.kind == TokenKind::Minus {
                    crate::ast::UnaryOp::Minus
                } else {
                    crate::ast::UnaryOp::Plus
                };
                Ok(Expression::Unary(crate::ast::Unary {
                    op,
                    operand: Box::new(operand),
                    line: op_token.loc.line,
                    info: (),
                }))
            }
            TokenKind::Integer(_)
            | TokenKind::Char(_)
            | TokenKind::Keyword(Keyword::Date)
            | TokenKind::Ident(_) => self.parse_primary(),
            _ => Err(self.unexpected("a case label")),
        }
    }

    fn parse_for(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::For)?;
        let counter = self.expect_ident("loop counter")?;
        self.expect(TokenKind::Assign, "'<-'")?;
        let start = self.parse_expression()?;
        self.expect_keyword(Keyword::To)?;
        let end = self.parse_expression()?;
        let step = if self.eat_keyword(Keyword::Step) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let body = self.parse_block(&[Keyword::Next])?;
        self.expect_keyword(Keyword::Next)?;
        let next_name = self.expect_ident("loop counter after NEXT")?;
        Ok(Statement::For(ForStmt {
            counter,
            start,
            end,
            step,
            body,
            next_name,
            line,
        }))
    }

    fn parse_while(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::While)?;
        let condition = self.parse_expression()?;
        let body = self.parse_block(&[Keyword::EndWhile])?;
        self.expect_keyword(Keyword::EndWhile)?;
        Ok(Statement::While(WhileStmt {
            condition,
            body,
            line,
        }))
    }

    fn parse_repeat(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Repeat)?;
        let body = self.parse_block(&[Keyword::Until])?;
        self.expect_keyword(Keyword::Until)?;
        let condition = self.parse_expression()?;
        Ok(Statement::Repeat(RepeatStmt {
            body,
            condition,
            line,
        }))
    }

    /// `CALL target [(args)]` — the target is parsed as a postfix chain
    /// and then classified.
    fn parse_call(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Call)?;

        if self.check_keyword(Keyword::Super) {
            self.advance();
            self.expect(TokenKind::Dot, "'.'")?;
            let method = self.expect_ident("method name")?;
            let args = self.parse_optional_args()?;
            return Ok(Statement::Call(CallStmt {
                target: CallTarget::SuperMethod(method),
                args,
                line,
            }));
        }

        let callee = self.parse_postfix()?;
        let (target, args) = match callee {
            Expression::Call(call) => match *call.callee {
                Expression::Name(name) => (CallTarget::Name(name.name), call.args),
                Expression::Field(field) => (
                    CallTarget::Method {
                        object: *field.base,
                        method: field.field,
                    },
                    call.args,
                ),
                _ => return Err(Diagnostic::syntax(line, "Invalid CALL target.")),
            },
            Expression::Name(name) => (CallTarget::Name(name.name), Vec::new()),
            Expression::Field(field) => (
                CallTarget::Method {
                    object: *field.base,
                    method: field.field,
                },
                Vec::new(),
            ),
            _ => return Err(Diagnostic::syntax(line, "Invalid CALL target.")),
        };
        Ok(Statement::Call(CallStmt { target, args, line }))
    }

    fn parse_return(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Return)?;
        // A value expression follows unless the next token closes the
        // surrounding block.
        let value = if self.starts_expression() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Statement::Return(ReturnStmt { value, line }))
    }

    fn parse_input(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Input)?;
        let target = self.parse_postfix()?;
        Ok(Statement::Input(InputStmt { target, line }))
    }

    fn parse_output(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Output)?;
        let mut values = vec![self.parse_expression()?];
        while self.eat(&TokenKind::Comma) {
            values.push(self.parse_expression()?);
        }
        Ok(Statement::Output(OutputStmt { values, line }))
    }

    /// `SUPER(args)` — constructor chaining.
    fn parse_super(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Super)?;
        self.expect(TokenKind::LParen, "'('")?;
        let args = self.parse_args()?;
        Ok(Statement::Super(SuperStmt { args, line }))
    }

    fn parse_open_file(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::OpenFile)?;
        self.expect(TokenKind::LParen, "'('")?;
        let handle = self.parse_expression()?;
        self.expect(TokenKind::Comma, "','")?;
        let path = self.parse_expression()?;
        self.expect(TokenKind::Comma, "','")?;
        let mode = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Statement::OpenFile(OpenFileStmt {
            handle,
            path,
            mode,
            line,
        }))
    }

    fn parse_close_file(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::CloseFile)?;
        self.expect(TokenKind::LParen, "'('")?;
        let handle = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Statement::CloseFile(CloseFileStmt { handle, line }))
    }

    fn parse_read_file(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::ReadFile)?;
        self.expect(TokenKind::LParen, "'('")?;
        let handle = self.parse_expression()?;
        self.expect(TokenKind::Comma, "','")?;
        let target = self.parse_postfix()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Statement::ReadFile(ReadFileStmt {
            handle,
            target,
            line,
        }))
    }

    fn parse_write_file(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::WriteFile)?;
        self.expect(TokenKind::LParen, "'('")?;
        let handle = self.parse_expression()?;
        self.expect(TokenKind::Comma, "','")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Statement::WriteFile(WriteFileStmt {
            handle,
            value,
            line,
        }))
    }

    fn parse_seek(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Seek)?;
        self.expect(TokenKind::LParen, "'('")?;
        let handle = self.parse_expression()?;
        self.expect(TokenKind::Comma, "','")?;
        let position = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Statement::Seek(SeekStmt {
            handle,
            position,
            line,
        }))
    }

    fn parse_get_record(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::GetRecord)?;
        self.expect(TokenKind::LParen, "'('")?;
        let handle = self.parse_expression()?;
        self.expect(TokenKind::Comma, "','")?;
        let target = self.parse_postfix()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Statement::GetRecord(GetRecordStmt {
            handle,
            target,
            line,
        }))
    }

    fn parse_put_record(&mut self) -> Fallible<Statement<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::PutRecord)?;
        self.expect(TokenKind::LParen, "'('")?;
        let handle = self.parse_expression()?;
        self.expect(TokenKind::Comma, "','")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Statement::PutRecord(PutRecordStmt {
            handle,
            value,
            line,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_source;
    use crate::ast::{CallTarget, CaseLabels, Statement};

    fn statements(body: &str) -> Vec<Statement<()>> {
        parse_source(&format!("PROGRAM P\n{body}\nENDPROGRAM"))
            .unwrap()
            .block
            .statements
    }

    #[test]
    fn parses_if_else() {
        let stmts = statements("IF TRUE THEN\n OUTPUT 1\nELSE\n OUTPUT 2\nENDIF");
        match &stmts[0] {
            Statement::If(s) => {
                assert_eq!(s.then_block.statements.len(), 1);
                assert!(s.else_block.is_some());
            }
            other => panic!("expected IF, got {other:?}"),
        }
    }

    #[test]
    fn parses_case_arms() {
        let stmts = statements(
            "DECLARE x : INTEGER\n\
             CASE OF x\n\
               1 : OUTPUT \"one\"\n\
               2, 3 : OUTPUT \"few\"\n\
               4 TO 9 : OUTPUT \"many\"\n\
               OTHERWISE OUTPUT \"lots\"\n\
             ENDCASE",
        );
        match &stmts[0] {
            Statement::Case(s) => {
                assert_eq!(s.arms.len(), 3);
                assert!(matches!(&s.arms[0].labels, CaseLabels::Values(v) if v.len() == 1));
                assert!(matches!(&s.arms[1].labels, CaseLabels::Values(v) if v.len() == 2));
                assert!(matches!(&s.arms[2].labels, CaseLabels::Range(_, _)));
                assert!(s.otherwise.is_some());
            }
            other => panic!("expected CASE, got {other:?}"),
        }
    }

    #[test]
    fn case_arm_bodies_take_following_statements() {
        let stmts = statements(
            "DECLARE x : INTEGER\n\
             CASE OF x\n\
               1 : OUTPUT 1\n\
                   OUTPUT 2\n\
               2 : OUTPUT 3\n\
             ENDCASE",
        );
        match &stmts[0] {
            Statement::Case(s) => {
                assert_eq!(s.arms[0].body.statements.len(), 2);
                assert_eq!(s.arms[1].body.statements.len(), 1);
            }
            other => panic!("expected CASE, got {other:?}"),
        }
    }

    #[test]
    fn parses_for_with_step() {
        let stmts = statements("FOR i <- 10 TO 1 STEP -2\n OUTPUT i\nNEXT i");
        match &stmts[0] {
            Statement::For(s) => {
                assert_eq!(s.counter, "i");
                assert_eq!(s.next_name, "i");
                assert!(s.step.is_some());
            }
            other => panic!("expected FOR, got {other:?}"),
        }
    }

    #[test]
    fn classifies_call_targets() {
        let stmts = statements(
            "DECLARE a : INTEGER\n\
             CALL P\n\
             CALL Q(1, 2)\n\
             CALL Obj.Method(3)",
        );
        assert!(matches!(
            &stmts[0],
            Statement::Call(c) if matches!(&c.target, CallTarget::Name(n) if n == "P")
        ));
        assert!(matches!(
            &stmts[1],
            Statement::Call(c)
                if matches!(&c.target, CallTarget::Name(n) if n == "Q") && c.args.len() == 2
        ));
        assert!(matches!(
            &stmts[2],
            Statement::Call(c) if matches!(&c.target, CallTarget::Method { method, .. } if method == "Method")
        ));
    }

    #[test]
    fn parses_file_statements() {
        let stmts = statements(
            "DECLARE f : TEXTFILE\n\
             DECLARE s : STRING\n\
             OPENFILE(f, \"data.txt\", \"READ\")\n\
             READFILE(f, s)\n\
             WRITEFILE(f, s)\n\
             CLOSEFILE(f)",
        );
        assert!(matches!(stmts[0], Statement::OpenFile(_)));
        assert!(matches!(stmts[1], Statement::ReadFile(_)));
        assert!(matches!(stmts[2], Statement::WriteFile(_)));
        assert!(matches!(stmts[3], Statement::CloseFile(_)));
    }

    #[test]
    fn missing_next_is_rejected() {
        assert!(parse_source("PROGRAM P\nFOR i <- 1 TO 3\nOUTPUT i\nENDPROGRAM").is_err());
    }
}
