//! Declaration parsing: variables, constants, types, set definitions,
//! routines, and classes.

use crate::ast::{
    Access, ClassDecl, ClassMember, ConstDecl, Declaration, MemberKind, Param, ParamMode,
    RecordField, Routine, SetDecl, TypeDecl, TypeDef, TypeExpr, VarDecl,
};
use crate::error::{Diagnostic, Fallible};
use crate::lexer::{Keyword, TokenKind};

use super::Parser;

impl Parser {
    pub(crate) fn parse_declaration(&mut self) -> Fallible<Declaration<()>> {
        match self.peek() {
            TokenKind::Keyword(Keyword::Declare) => Ok(Declaration::Var(self.parse_var_decl()?)),
            TokenKind::Keyword(Keyword::Constant) => self.parse_const_decl(),
            TokenKind::Keyword(Keyword::Type) => self.parse_type_decl(),
            TokenKind::Keyword(Keyword::Define) => self.parse_set_decl(),
            TokenKind::Keyword(Keyword::Procedure) => {
                Ok(Declaration::Proc(self.parse_procedure()?))
            }
            TokenKind::Keyword(Keyword::Function) => Ok(Declaration::Func(self.parse_function()?)),
            TokenKind::Keyword(Keyword::Class) => self.parse_class_decl(),
            _ => Err(self.unexpected("a declaration")),
        }
    }

    /// `DECLARE a, b : TYPE`
    fn parse_var_decl(&mut self) -> Fallible<VarDecl<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Declare)?;
        let mut names = vec![self.expect_ident("variable name")?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_ident("variable name")?);
        }
        self.expect(TokenKind::Colon, "':'")?;
        let ty = self.parse_type()?;
        Ok(VarDecl { names, ty, line })
    }

    /// `CONSTANT Name = expr`
    fn parse_const_decl(&mut self) -> Fallible<Declaration<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Constant)?;
        let name = self.expect_ident("constant name")?;
        self.expect(TokenKind::Equal, "'='")?;
        let value = self.parse_expression()?;
        Ok(Declaration::Const(ConstDecl { name, value, line }))
    }

    /// `TYPE Name = (A, B) | RECORD … ENDRECORD | type`
    fn parse_type_decl(&mut self) -> Fallible<Declaration<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Type)?;
        let name = self.expect_ident("type name")?;
        self.expect(TokenKind::Equal, "'='")?;

        let def = if self.eat(&TokenKind::LParen) {
            let mut members = vec![self.expect_ident("enum member")?];
            while self.eat(&TokenKind::Comma) {
                members.push(self.expect_ident("enum member")?);
            }
            self.expect(TokenKind::RParen, "')'")?;
            TypeDef::Enum(members)
        } else if self.eat_keyword(Keyword::Record) {
            let mut fields = Vec::new();
            while !self.check_keyword(Keyword::EndRecord) {
                let field_line = self.line();
                let field_name = self.expect_ident("record field name")?;
                self.expect(TokenKind::Colon, "':'")?;
                let ty = self.parse_type()?;
                fields.push(RecordField {
                    name: field_name,
                    ty,
                    line: field_line,
                });
            }
            self.expect_keyword(Keyword::EndRecord)?;
            if fields.is_empty() {
                return Err(Diagnostic::syntax(line, "Record type has no fields."));
            }
            TypeDef::Record(fields)
        } else {
            TypeDef::Alias(self.parse_type()?)
        };
        Ok(Declaration::Type(TypeDecl { name, def, line }))
    }

    /// `DEFINE name (members) : settype`
    fn parse_set_decl(&mut self) -> Fallible<Declaration<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Define)?;
        let name = self.expect_ident("set variable name")?;
        self.expect(TokenKind::LParen, "'('")?;
        let mut members = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            members.push(self.expect_ident("enum member")?);
            while self.eat(&TokenKind::Comma) {
                members.push(self.expect_ident("enum member")?);
            }
            self.expect(TokenKind::RParen, "')'")?;
        }
        self.expect(TokenKind::Colon, "':'")?;
        let type_name = self.expect_ident("set type name")?;
        Ok(Declaration::Set(SetDecl {
            name,
            members,
            type_name,
            line,
        }))
    }

    fn parse_params(&mut self) -> Fallible<Vec<Param<()>>> {
        let mut params = Vec::new();
        if !self.eat(&TokenKind::LParen) {
            return Ok(params);
        }
        if self.eat(&TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let line = self.line();
            let mode = if self.eat_keyword(Keyword::ByRef) {
                ParamMode::ByReference
            } else {
                self.eat_keyword(Keyword::ByVal);
                ParamMode::ByValue
            };
            let name = self.expect_ident("parameter name")?;
            self.expect(TokenKind::Colon, "':'")?;
            let ty = self.parse_type()?;
            params.push(Param {
                name,
                mode,
                ty,
                line,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(params)
    }

    pub(crate) fn parse_procedure(&mut self) -> Fallible<Routine<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Procedure)?;
        let name = self.expect_ident("procedure name")?;
        let params = self.parse_params()?;
        let body = self.parse_block(&[Keyword::EndProcedure])?;
        self.expect_keyword(Keyword::EndProcedure)?;
        Ok(Routine {
            name,
            params,
            returns: None,
            body,
            line,
        })
    }

    pub(crate) fn parse_function(&mut self) -> Fallible<Routine<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Function)?;
        let name = self.expect_ident("function name")?;
        let params = self.parse_params()?;
        self.expect_keyword(Keyword::Returns)?;
        let returns = self.parse_type()?;
        let body = self.parse_block(&[Keyword::EndFunction])?;
        self.expect_keyword(Keyword::EndFunction)?;
        Ok(Routine {
            name,
            params,
            returns: Some(returns),
            body,
            line,
        })
    }

    /// `CLASS Name [EXTENDS Base] members ENDCLASS`
    ///
    /// A bare `PUBLIC`/`PRIVATE` keyword starts an access section that
    /// covers the members up to the next marker.
    fn parse_class_decl(&mut self) -> Fallible<Declaration<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Class)?;
        let name = self.expect_ident("class name")?;
        let base = if self.eat_keyword(Keyword::Extends) {
            Some(self.expect_ident("base class name")?)
        } else {
            None
        };

        let mut access = Access::Public;
        let mut members = Vec::new();
        loop {
            if self.eat_keyword(Keyword::Public) {
                access = Access::Public;
                continue;
            }
            if self.eat_keyword(Keyword::Private) {
                access = Access::Private;
                continue;
            }
            let kind = match self.peek() {
                TokenKind::Keyword(Keyword::EndClass) => break,
                TokenKind::Keyword(Keyword::Declare) => MemberKind::Field(self.parse_var_decl()?),
                TokenKind::Keyword(Keyword::Procedure) => {
                    MemberKind::Procedure(self.parse_procedure()?)
                }
                TokenKind::Keyword(Keyword::Function) => {
                    MemberKind::Function(self.parse_function()?)
                }
                TokenKind::Keyword(Keyword::Constructor) => {
                    MemberKind::Constructor(self.parse_constructor()?)
                }
                _ => return Err(self.unexpected("a class member or 'ENDCLASS'")),
            };
            members.push(ClassMember { access, kind });
        }
        self.expect_keyword(Keyword::EndClass)?;
        Ok(Declaration::Class(ClassDecl {
            name,
            base,
            members,
            line,
        }))
    }

    fn parse_constructor(&mut self) -> Fallible<Routine<()>> {
        let line = self.line();
        self.expect_keyword(Keyword::Constructor)?;
        let params = self.parse_params()?;
        let body = self.parse_block(&[Keyword::EndConstructor])?;
        self.expect_keyword(Keyword::EndConstructor)?;
        Ok(Routine {
            name: "NEW".to_string(),
            params,
            returns: None,
            body,
            line,
        })
    }

    /// Type references as they appear after `:` in declarations.
    pub(crate) fn parse_type(&mut self) -> Fallible<TypeExpr<()>> {
        match self.peek().clone() {
            TokenKind::Keyword(Keyword::Integer) => {
                self.advance();
                Ok(TypeExpr::Integer)
            }
            TokenKind::Keyword(Keyword::Real) => {
                self.advance();
                Ok(TypeExpr::Real)
            }
            TokenKind::Keyword(Keyword::Boolean) => {
                self.advance();
                Ok(TypeExpr::Boolean)
            }
            TokenKind::Keyword(Keyword::Char) => {
                self.advance();
                Ok(TypeExpr::Char)
            }
            TokenKind::Keyword(Keyword::String) => {
                self.advance();
                Ok(TypeExpr::String)
            }
            TokenKind::Keyword(Keyword::Date) => {
                self.advance();
                Ok(TypeExpr::Date)
            }
            TokenKind::Keyword(Keyword::TextFile) => {
                self.advance();
                Ok(TypeExpr::TextFile)
            }
            TokenKind::Keyword(Keyword::RandomFile) => {
                self.advance();
                self.expect_keyword(Keyword::Of)?;
                let name = self.expect_ident("record type name")?;
                Ok(TypeExpr::RandomFile(name))
            }
            TokenKind::Keyword(Keyword::Set) => {
                self.advance();
                self.expect_keyword(Keyword::Of)?;
                let name = self.expect_ident("enum type name")?;
                Ok(TypeExpr::SetOf(name))
            }
            TokenKind::Keyword(Keyword::Pointer) => {
                self.advance();
                self.expect_keyword(Keyword::To)?;
                let target = self.parse_type()?;
                Ok(TypeExpr::Pointer(Box::new(target)))
            }
            TokenKind::Keyword(Keyword::Array) => {
                self.advance();
                self.expect(TokenKind::LBracket, "'['")?;
                let mut bounds = Vec::new();
                loop {
                    let low = self.parse_expression()?;
                    self.expect(TokenKind::Colon, "':'")?;
                    let high = self.parse_expression()?;
                    bounds.push((low, high));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "']'")?;
                self.expect_keyword(Keyword::Of)?;
                let elem = self.parse_type()?;
                Ok(TypeExpr::Array {
                    bounds,
                    elem: Box::new(elem),
                })
            }
            TokenKind::Ident(_) => {
                let name = self.expect_ident("type name")?;
                Ok(TypeExpr::Named(name))
            }
            _ => Err(self.unexpected("a type")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_source;
    use crate::ast::{Declaration, MemberKind, TypeDef, TypeExpr};

    #[test]
    fn parses_variable_declarations() {
        let program = parse_source(
            "PROGRAM P\n DECLARE x, y : INTEGER\n DECLARE a : ARRAY[1:10] OF REAL\nENDPROGRAM",
        )
        .unwrap();
        assert_eq!(program.block.declarations.len(), 2);
        match &program.block.declarations[0] {
            Declaration::Var(v) => assert_eq!(v.names, vec!["x", "y"]),
            other => panic!("expected var decl, got {other:?}"),
        }
    }

    #[test]
    fn parses_type_declarations() {
        let program = parse_source(
            "PROGRAM P\n\
             TYPE Direction = (North, East, South, West)\n\
             TYPE Rec = RECORD N : INTEGER D : DATE ENDRECORD\n\
             TYPE Handle = POINTER TO Rec\n\
             TYPE Flags = SET OF Direction\n\
             ENDPROGRAM",
        )
        .unwrap();
        let decls = &program.block.declarations;
        assert!(matches!(
            &decls[0],
            Declaration::Type(t) if matches!(&t.def, TypeDef::Enum(m) if m.len() == 4)
        ));
        assert!(matches!(
            &decls[1],
            Declaration::Type(t) if matches!(&t.def, TypeDef::Record(f) if f.len() == 2)
        ));
        assert!(matches!(
            &decls[2],
            Declaration::Type(t) if matches!(&t.def, TypeDef::Alias(TypeExpr::Pointer(_)))
        ));
    }

    #[test]
    fn parses_class_with_sections() {
        let program = parse_source(
            "PROGRAM P\n\
             CLASS Animal\n\
               PRIVATE\n\
                 DECLARE Name : STRING\n\
               PUBLIC\n\
                 CONSTRUCTOR(BYVAL n : STRING)\n\
                   Name <- n\n\
                 ENDCONSTRUCTOR\n\
                 FUNCTION Speak RETURNS STRING\n\
                   RETURN \"...\"\n\
                 ENDFUNCTION\n\
             ENDCLASS\n\
             ENDPROGRAM",
        )
        .unwrap();
        match &program.block.declarations[0] {
            Declaration::Class(c) => {
                assert_eq!(c.name, "Animal");
                assert!(c.base.is_none());
                assert_eq!(c.members.len(), 3);
                assert!(matches!(c.members[0].kind, MemberKind::Field(_)));
                assert!(matches!(c.members[1].kind, MemberKind::Constructor(_)));
                assert!(matches!(c.members[2].kind, MemberKind::Function(_)));
                assert_eq!(c.members[0].access, crate::ast::Access::Private);
                assert_eq!(c.members[1].access, crate::ast::Access::Public);
            }
            other => panic!("expected class decl, got {other:?}"),
        }
    }

    #[test]
    fn parses_define_set() {
        let program = parse_source(
            "PROGRAM P\n\
             TYPE Season = (Spring, Summer, Autumn, Winter)\n\
             TYPE Seasons = SET OF Season\n\
             DEFINE Warm (Summer) : Seasons\n\
             DEFINE None () : Seasons\n\
             ENDPROGRAM",
        )
        .unwrap();
        match &program.block.declarations[2] {
            Declaration::Set(s) => {
                assert_eq!(s.members, vec!["Summer"]);
                assert_eq!(s.type_name, "Seasons");
            }
            other => panic!("expected set decl, got {other:?}"),
        }
    }
}
