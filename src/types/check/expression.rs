//! Expression checking: every rule annotates the rebuilt node with the
//! semantic type it assigned.

use crate::ast::{
    Access, Binary, BinaryOp, Call, Deref, EofCheck, Expression, Field, Index, Literal,
    LiteralValue, Name, New, Null, ParamMode, SuperCall, TypeExpr, Unary, UnaryOp,
};
use crate::error::{Diagnostic, Fallible};

use super::super::symbols::{Signature, Symbol, TypeInfo};
use super::super::ty::Type;
use super::Checker;

/// How a bare name resolved in value position.
pub(crate) enum Resolved {
    Var { ty: Type, locked: bool },
    Const { ty: Type },
    /// Field of the enclosing class, reached without a receiver.
    SelfField { ty: Type },
}

impl Resolved {
    fn ty(&self) -> &Type {
        match self {
            Resolved::Var { ty, .. } | Resolved::Const { ty } | Resolved::SelfField { ty } => ty,
        }
    }
}

/// What a call target resolved to.
enum Callable {
    Proc(Signature),
    Func(Signature),
    /// Method of a class: owning class name, signature, is-function.
    Method(String, Signature, bool),
    Builtin,
}

impl Checker {
    pub(crate) fn check_expression(&mut self, expr: &Expression<()>) -> Fallible<Expression<Type>> {
        match expr {
            Expression::Literal(lit) => {
                let ty = match &lit.value {
                    LiteralValue::Integer(_) => Type::Integer,
                    LiteralValue::Real(_) => Type::Real,
                    LiteralValue::Boolean(_) => Type::Boolean,
                    LiteralValue::Char(_) => Type::Char,
                    LiteralValue::Str(_) => Type::String,
                    LiteralValue::Date(_) => Type::Date,
                };
                Ok(Expression::Literal(Literal {
                    value: lit.value.clone(),
                    line: lit.line,
                    info: ty,
                }))
            }
            Expression::Name(name) => {
                let resolved = self.resolve_value_name(&name.name, name.line)?;
                Ok(Expression::Name(Name {
                    name: name.name.clone(),
                    line: name.line,
                    info: resolved.ty().clone(),
                }))
            }
            Expression::Binary(binary) => self.check_binary(binary),
            Expression::Unary(unary) => self.check_unary(unary),
            Expression::Call(call) => self.check_call_expression(call),
            Expression::Index(index) => self.check_index(index),
            Expression::Field(field) => self.check_field(field),
            Expression::New(new) => self.check_new(new),
            Expression::EofCheck(eof) => {
                let handle = self.check_expression(&eof.handle)?;
                match handle.info() {
                    Type::TextFile | Type::RandomFile(_) => {}
                    other => {
                        return Err(Diagnostic::type_error(
                            eof.line,
                            format!("EOF requires a file handle, found {other}."),
                        ));
                    }
                }
                Ok(Expression::EofCheck(EofCheck {
                    handle: Box::new(handle),
                    line: eof.line,
                    info: Type::Boolean,
                }))
            }
            Expression::Null(null) => Ok(Expression::Null(Null {
                line: null.line,
                info: Type::Null,
            })),
            Expression::Deref(deref) => {
                let target = self.check_expression(&deref.target)?;
                let inner = match target.info() {
                    Type::Pointer(inner) => (**inner).clone(),
                    other => {
                        return Err(Diagnostic::type_error(
                            deref.line,
                            format!("'^' requires a pointer, found {other}."),
                        ));
                    }
                };
                Ok(Expression::Deref(Deref {
                    target: Box::new(target),
                    line: deref.line,
                    info: inner,
                }))
            }
            Expression::SuperCall(call) => self.check_super_call(call, true),
        }
    }

    /// Resolve a bare name in value position: locals and parameters
    /// first, then the enclosing class's fields, then globals.
    pub(crate) fn resolve_value_name(&self, name: &str, line: usize) -> Fallible<Resolved> {
        if let Some(symbol) = self.scopes_lookup_above(name) {
            return classify(symbol, name, line);
        }
        if let Some(class) = self.current_class() {
            if let Some((owner, field)) = self.classes().find_field(class, name) {
                if field.access == Access::Private && owner.name != class {
                    return Err(Diagnostic::access(
                        line,
                        format!("Field '{name}' is private to class '{}'.", owner.name),
                    ));
                }
                return Ok(Resolved::SelfField {
                    ty: field.ty.clone(),
                });
            }
        }
        if let Some(symbol) = self.scopes_lookup_global(name) {
            return classify(symbol, name, line);
        }
        Err(Diagnostic::name(
            line,
            format!("Undeclared identifier '{name}'."),
        ))
    }

    fn check_binary(&mut self, binary: &Binary<()>) -> Fallible<Expression<Type>> {
        let lhs = self.check_expression(&binary.lhs)?;
        let rhs = self.check_expression(&binary.rhs)?;
        let line = binary.line;
        let (lt, rt) = (lhs.info().clone(), rhs.info().clone());
        let op = binary.op;

        let mismatch = |detail: &str| {
            Err(Diagnostic::type_error(
                line,
                format!(
                    "Operator '{}' requires {detail}, found {lt} and {rt}.",
                    op.symbol()
                ),
            ))
        };

        let result = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => match (&lt, &rt) {
                (Type::Integer, Type::Integer) => Type::Integer,
                (Type::Real, Type::Real) => Type::Real,
                _ => return mismatch("matching INTEGER or REAL operands"),
            },
            BinaryOp::Div => match (&lt, &rt) {
                (Type::Integer, Type::Integer) | (Type::Real, Type::Real) => Type::Real,
                _ => return mismatch("matching INTEGER or REAL operands"),
            },
            BinaryOp::IntDiv | BinaryOp::Mod => match (&lt, &rt) {
                (Type::Integer, Type::Integer) => Type::Integer,
                _ => return mismatch("INTEGER operands"),
            },
            BinaryOp::Concat => {
                let textual = |t: &Type| matches!(t, Type::String | Type::Char);
                if textual(&lt) && textual(&rt) {
                    Type::String
                } else {
                    return mismatch("STRING or CHAR operands");
                }
            }
            BinaryOp::And | BinaryOp::Or => match (&lt, &rt) {
                (Type::Boolean, Type::Boolean) => Type::Boolean,
                _ => return mismatch("BOOLEAN operands"),
            },
            BinaryOp::Eq | BinaryOp::Ne => {
                if lt == rt && lt.is_equatable() {
                    Type::Boolean
                } else {
                    return mismatch("matching comparable operands");
                }
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if lt == rt && lt.is_ordered() {
                    Type::Boolean
                } else {
                    return mismatch("matching ordered operands");
                }
            }
            BinaryOp::In => match (&lt, &rt) {
                (Type::Enum(member), Type::Set(base)) if member == base => Type::Boolean,
                _ => return mismatch("an enum member and a set over its enumeration"),
            },
            BinaryOp::Union | BinaryOp::Intersect | BinaryOp::Diff => match (&lt, &rt) {
                (Type::Set(a), Type::Set(b)) if a == b => Type::Set(a.clone()),
                _ => return mismatch("two sets over the same enumeration"),
            },
        };
        Ok(Expression::Binary(Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            line,
            info: result,
        }))
    }

    fn check_unary(&mut self, unary: &Unary<()>) -> Fallible<Expression<Type>> {
        let line = unary.line;
        match unary.op {
            UnaryOp::AddressOf => {
                if !unary.operand.is_lvalue() {
                    return Err(Diagnostic::type_error(
                        line,
                        "'@' requires a variable, array element, field, or dereference.",
                    ));
                }
                let operand = self.check_place(&unary.operand)?;
                let ty = Type::Pointer(Box::new(operand.info().clone()));
                Ok(Expression::Unary(Unary {
                    op: UnaryOp::AddressOf,
                    operand: Box::new(operand),
                    line,
                    info: ty,
                }))
            }
            op => {
                let operand = self.check_expression(&unary.operand)?;
                let ty = match (op, operand.info()) {
                    (UnaryOp::Plus | UnaryOp::Minus, Type::Integer) => Type::Integer,
                    (UnaryOp::Plus | UnaryOp::Minus, Type::Real) => Type::Real,
                    (UnaryOp::Not, Type::Boolean) => Type::Boolean,
                    (_, other) => {
                        return Err(Diagnostic::type_error(
                            line,
                            format!("Invalid operand {other} for unary operator."),
                        ));
                    }
                };
                Ok(Expression::Unary(Unary {
                    op,
                    operand: Box::new(operand),
                    line,
                    info: ty,
                }))
            }
        }
    }

    fn check_index(&mut self, index: &Index<()>) -> Fallible<Expression<Type>> {
        let base = self.check_expression(&index.base)?;
        let elem = match base.info() {
            Type::Array { bounds, elem } => {
                if bounds.len() != index.indices.len() {
                    return Err(Diagnostic::type_error(
                        index.line,
                        format!(
                            "Array has {} dimension(s), {} index(es) given.",
                            bounds.len(),
                            index.indices.len()
                        ),
                    ));
                }
                (**elem).clone()
            }
            other => {
                return Err(Diagnostic::type_error(
                    index.line,
                    format!("Cannot index into {other}."),
                ));
            }
        };
        let mut indices = Vec::with_capacity(index.indices.len());
        for idx in &index.indices {
            let typed = self.check_expression(idx)?;
            if typed.info() != &Type::Integer {
                return Err(Diagnostic::type_error(
                    idx.line(),
                    format!("Array index must be INTEGER, found {}.", typed.info()),
                ));
            }
            indices.push(typed);
        }
        Ok(Expression::Index(Index {
            base: Box::new(base),
            indices,
            line: index.line,
            info: elem,
        }))
    }

    fn check_field(&mut self, field: &Field<()>) -> Fallible<Expression<Type>> {
        let base = self.check_expression(&field.base)?;
        let ty = self.member_field_type(base.info(), &field.field, field.line)?;
        Ok(Expression::Field(Field {
            base: Box::new(base),
            field: field.field.clone(),
            line: field.line,
            info: ty,
        }))
    }

    /// Type of `base.field`, with access control for class fields.
    pub(crate) fn member_field_type(
        &self,
        base: &Type,
        field: &str,
        line: usize,
    ) -> Fallible<Type> {
        match base {
            Type::Record(name) => {
                let fields = self
                    .record_fields(name)
                    .ok_or_else(|| Diagnostic::name(line, format!("Unknown record '{name}'.")))?;
                fields
                    .iter()
                    .find(|(f, _)| f == field)
                    .map(|(_, t)| t.clone())
                    .ok_or_else(|| {
                        Diagnostic::name(
                            line,
                            format!("Record '{name}' has no field '{field}'."),
                        )
                    })
            }
            Type::Class(name) => {
                let (owner, info) = self.classes().find_field(name, field).ok_or_else(|| {
                    Diagnostic::name(line, format!("Class '{name}' has no field '{field}'."))
                })?;
                if !self.access_allowed(info.access, &owner.name) {
                    return Err(Diagnostic::access(
                        line,
                        format!("Field '{field}' is private to class '{}'.", owner.name),
                    ));
                }
                Ok(info.ty.clone())
            }
            other => Err(Diagnostic::type_error(
                line,
                format!("{other} has no fields."),
            )),
        }
    }

    fn check_new(&mut self, new: &New<()>) -> Fallible<Expression<Type>> {
        let line = new.line;
        if let TypeExpr::Named(name) = &new.target {
            if matches!(self.lookup(name), Some(Symbol::Class)) {
                let args = new.args.clone().unwrap_or_default();
                let constructor = self
                    .classes()
                    .get(name)
                    .and_then(|info| info.constructor.clone());
                let typed_args = match constructor {
                    Some(signature) => {
                        self.check_args(&signature, &args, line, &format!("constructor of '{name}'"))?
                    }
                    None => {
                        if !args.is_empty() {
                            return Err(Diagnostic::type_error(
                                line,
                                format!("Class '{name}' has no constructor."),
                            ));
                        }
                        Vec::new()
                    }
                };
                return Ok(Expression::New(New {
                    target: TypeExpr::Named(name.clone()),
                    args: Some(typed_args),
                    line,
                    info: Type::Class(name.clone()),
                }));
            }
        }
        if new.args.is_some() {
            return Err(Diagnostic::type_error(
                line,
                "NEW with arguments requires a class.",
            ));
        }
        let (ty, texpr) = self.resolve_type(&new.target, line)?;
        if matches!(ty, Type::TextFile | Type::RandomFile(_)) {
            return Err(Diagnostic::type_error(
                line,
                "File handles cannot be heap-allocated.",
            ));
        }
        Ok(Expression::New(New {
            target: texpr,
            args: None,
            line,
            info: Type::Pointer(Box::new(ty)),
        }))
    }

    // === calls ===

    fn resolve_callable(&self, name: &str) -> Option<Callable> {
        if let Some(symbol) = self.scopes_lookup_above(name) {
            return match symbol {
                Symbol::Proc(sig) => Some(Callable::Proc(sig.clone())),
                Symbol::Func(sig) => Some(Callable::Func(sig.clone())),
                _ => None,
            };
        }
        if let Some(class) = self.current_class() {
            if let Some((owner, method)) = self.classes().find_method(class, name) {
                if self.access_allowed(method.access, &owner.name) {
                    return Some(Callable::Method(
                        owner.name.clone(),
                        method.signature.clone(),
                        method.is_function,
                    ));
                }
            }
        }
        if let Some(symbol) = self.scopes_lookup_global(name) {
            return match symbol {
                Symbol::Proc(sig) => Some(Callable::Proc(sig.clone())),
                Symbol::Func(sig) => Some(Callable::Func(sig.clone())),
                _ => None,
            };
        }
        if builtin_exists(name) {
            return Some(Callable::Builtin);
        }
        None
    }

    fn check_call_expression(&mut self, call: &Call<()>) -> Fallible<Expression<Type>> {
        let line = call.line;
        match &*call.callee {
            Expression::Name(name) => {
                match self.resolve_callable(&name.name) {
                    Some(Callable::Func(signature)) => {
                        let args = self.check_args(&signature, &call.args, line, &name.name)?;
                        let returns = signature.returns.clone().expect("functions return");
                        Ok(build_call(name, args, line, returns))
                    }
                    Some(Callable::Method(_, signature, is_function)) => {
                        if !is_function {
                            return Err(Diagnostic::type_error(
                                line,
                                format!("Procedure '{}' cannot be used in an expression.", name.name),
                            ));
                        }
                        let args = self.check_args(&signature, &call.args, line, &name.name)?;
                        let returns = signature.returns.clone().expect("functions return");
                        Ok(build_call(name, args, line, returns))
                    }
                    Some(Callable::Proc(_)) => Err(Diagnostic::type_error(
                        line,
                        format!("Procedure '{}' cannot be used in an expression.", name.name),
                    )),
                    Some(Callable::Builtin) => self.check_builtin_call(name, &call.args, line),
                    None => Err(Diagnostic::name(
                        line,
                        format!("Undeclared function '{}'.", name.name),
                    )),
                }
            }
            Expression::Field(field) => {
                let base = self.check_expression(&field.base)?;
                let class = match base.info() {
                    Type::Class(name) => name.clone(),
                    other => {
                        return Err(Diagnostic::type_error(
                            line,
                            format!("{other} has no methods."),
                        ));
                    }
                };
                let (owner, method) = self
                    .classes()
                    .find_method(&class, &field.field)
                    .map(|(o, m)| (o.name.clone(), m.clone()))
                    .ok_or_else(|| {
                        Diagnostic::name(
                            line,
                            format!("Class '{class}' has no method '{}'.", field.field),
                        )
                    })?;
                if !self.access_allowed(method.access, &owner) {
                    return Err(Diagnostic::access(
                        line,
                        format!("Method '{}' is private to class '{owner}'.", field.field),
                    ));
                }
                if !method.is_function {
                    return Err(Diagnostic::type_error(
                        line,
                        format!("Procedure '{}' cannot be used in an expression.", field.field),
                    ));
                }
                let args = self.check_args(&method.signature, &call.args, line, &field.field)?;
                let returns = method.signature.returns.clone().expect("functions return");
                Ok(Expression::Call(Call {
                    callee: Box::new(Expression::Field(Field {
                        base: Box::new(base),
                        field: field.field.clone(),
                        line: field.line,
                        info: returns.clone(),
                    })),
                    args,
                    line,
                    info: returns,
                }))
            }
            _ => Err(Diagnostic::type_error(line, "Expression is not callable.")),
        }
    }

    pub(crate) fn check_super_call(
        &mut self,
        call: &SuperCall<()>,
        as_function: bool,
    ) -> Fallible<Expression<Type>> {
        let line = call.line;
        let class = self
            .current_class()
            .ok_or_else(|| Diagnostic::syntax(line, "SUPER is only valid inside a class."))?
            .to_string();
        let base = self
            .classes()
            .get(&class)
            .and_then(|info| info.base.clone())
            .ok_or_else(|| {
                Diagnostic::type_error(line, format!("Class '{class}' has no base class."))
            })?;
        let (owner, method) = self
            .classes()
            .find_method(&base, &call.method)
            .map(|(o, m)| (o.name.clone(), m.clone()))
            .ok_or_else(|| {
                Diagnostic::name(
                    line,
                    format!("Class '{base}' has no method '{}'.", call.method),
                )
            })?;
        if !self.access_allowed(method.access, &owner) {
            return Err(Diagnostic::access(
                line,
                format!("Method '{}' is private to class '{owner}'.", call.method),
            ));
        }
        if method.is_function != as_function {
            let detail = if as_function {
                format!("Procedure '{}' cannot be used in an expression.", call.method)
            } else {
                format!("CALL cannot invoke function '{}'.", call.method)
            };
            return Err(Diagnostic::type_error(line, detail));
        }
        let args = self.check_args(&method.signature, &call.args, line, &call.method)?;
        let info = method
            .signature
            .returns
            .clone()
            .unwrap_or(Type::Null);
        Ok(Expression::SuperCall(SuperCall {
            method: call.method.clone(),
            args,
            line,
            info,
        }))
    }

    /// Arity, per-argument types, and by-reference lvalue discipline.
    pub(crate) fn check_args(
        &mut self,
        signature: &Signature,
        args: &[Expression<()>],
        line: usize,
        what: &str,
    ) -> Fallible<Vec<Expression<Type>>> {
        if signature.params.len() != args.len() {
            return Err(Diagnostic::type_error(
                line,
                format!(
                    "'{what}' expects {} argument(s), {} given.",
                    signature.params.len(),
                    args.len()
                ),
            ));
        }
        let mut typed = Vec::with_capacity(args.len());
        for (arg, (param_name, mode, param_ty)) in args.iter().zip(&signature.params) {
            match mode {
                ParamMode::ByValue => {
                    let value = self.check_expression(arg)?;
                    if !self.is_assignable(param_ty, value.info()) {
                        return Err(Diagnostic::type_error(
                            arg.line(),
                            format!(
                                "Argument for '{param_name}' must be {param_ty}, found {}.",
                                value.info()
                            ),
                        ));
                    }
                    typed.push(value);
                }
                ParamMode::ByReference => {
                    if !arg.is_lvalue() {
                        return Err(Diagnostic::type_error(
                            arg.line(),
                            format!("Argument for BYREF parameter '{param_name}' must be a variable."),
                        ));
                    }
                    let place = self.check_writable_place(arg)?;
                    if place.info() != param_ty {
                        return Err(Diagnostic::type_error(
                            arg.line(),
                            format!(
                                "BYREF argument for '{param_name}' must be exactly {param_ty}, found {}.",
                                place.info()
                            ),
                        ));
                    }
                    typed.push(place);
                }
            }
        }
        Ok(typed)
    }

    // === built-ins ===

    fn check_builtin_call(
        &mut self,
        name: &Name<()>,
        args: &[Expression<()>],
        line: usize,
    ) -> Fallible<Expression<Type>> {
        let builtin = name.name.as_str();

        // ENUMVALUE names an enum type in its first argument; that slot
        // never checks as a value expression.
        if builtin == "ENUMVALUE" {
            if args.len() != 2 {
                return Err(arity(line, builtin, 2, args.len()));
            }
            let enum_name = match &args[0] {
                Expression::Name(n) => n.clone(),
                other => {
                    return Err(Diagnostic::type_error(
                        other.line(),
                        "ENUMVALUE requires an enumeration type name.",
                    ));
                }
            };
            if !matches!(
                self.lookup(&enum_name.name),
                Some(Symbol::Type(TypeInfo::Enum(_)))
            ) {
                return Err(Diagnostic::type_error(
                    enum_name.line,
                    format!("'{}' is not an enumeration type.", enum_name.name),
                ));
            }
            let ordinal = self.check_expression(&args[1])?;
            if ordinal.info() != &Type::Integer {
                return Err(Diagnostic::type_error(
                    args[1].line(),
                    format!("ENUMVALUE ordinal must be INTEGER, found {}.", ordinal.info()),
                ));
            }
            let result = Type::Enum(enum_name.name.clone());
            let typed_name = Expression::Name(Name {
                name: enum_name.name.clone(),
                line: enum_name.line,
                info: result.clone(),
            });
            return Ok(build_call(name, vec![typed_name, ordinal], line, result));
        }

        let typed: Vec<Expression<Type>> = args
            .iter()
            .map(|a| self.check_expression(a))
            .collect::<Fallible<_>>()?;
        let tys: Vec<&Type> = typed.iter().map(|a| a.info()).collect();

        let expect = |n: usize| -> Fallible<()> {
            if args.len() != n {
                Err(arity(line, builtin, n, args.len()))
            } else {
                Ok(())
            }
        };
        let want = |slot: usize, ty: Type| -> Fallible<()> {
            if tys[slot] != &ty {
                Err(Diagnostic::type_error(
                    typed[slot].line(),
                    format!("{builtin} argument {} must be {ty}, found {}.", slot + 1, tys[slot]),
                ))
            } else {
                Ok(())
            }
        };

        let result = match builtin {
            "LENGTH" => {
                expect(1)?;
                want(0, Type::String)?;
                Type::Integer
            }
            "RIGHT" => {
                expect(2)?;
                want(0, Type::String)?;
                want(1, Type::Integer)?;
                Type::String
            }
            "MID" => {
                expect(3)?;
                want(0, Type::String)?;
                want(1, Type::Integer)?;
                want(2, Type::Integer)?;
                Type::String
            }
            "LCASE" | "UCASE" => {
                expect(1)?;
                want(0, Type::String)?;
                Type::String
            }
            "INT" => {
                expect(1)?;
                want(0, Type::Real)?;
                Type::Integer
            }
            "REAL" => {
                expect(1)?;
                want(0, Type::Integer)?;
                Type::Real
            }
            "STRING" => {
                expect(1)?;
                if !tys[0].is_outputtable() {
                    return Err(Diagnostic::type_error(
                        line,
                        format!("STRING cannot convert {}.", tys[0]),
                    ));
                }
                Type::String
            }
            "CHAR" => {
                expect(1)?;
                want(0, Type::Integer)?;
                Type::Char
            }
            "BOOLEAN" => {
                expect(1)?;
                want(0, Type::String)?;
                Type::Boolean
            }
            "DATE" => {
                expect(1)?;
                want(0, Type::String)?;
                Type::Date
            }
            "ORD" => {
                expect(1)?;
                match tys[0] {
                    Type::Enum(_) => Type::Integer,
                    other => {
                        return Err(Diagnostic::type_error(
                            line,
                            format!("ORD requires an enum value, found {other}."),
                        ));
                    }
                }
            }
            "SIZE" => {
                expect(1)?;
                match tys[0] {
                    Type::Set(_) => Type::Integer,
                    other => {
                        return Err(Diagnostic::type_error(
                            line,
                            format!("SIZE requires a set, found {other}."),
                        ));
                    }
                }
            }
            "RAND" => {
                expect(0)?;
                Type::Real
            }
            _ => unreachable!("resolve_callable admitted '{builtin}'"),
        };
        Ok(build_call(name, typed, line, result))
    }

    // === places (lvalues) ===

    /// Check an expression that must designate a place, without write
    /// enforcement (used by `@`).
    pub(crate) fn check_place(&mut self, expr: &Expression<()>) -> Fallible<Expression<Type>> {
        validate_place_shape(expr)?;
        match expr {
            Expression::Name(n) => match self.resolve_value_name(&n.name, n.line)? {
                Resolved::Const { .. } => Err(Diagnostic::type_error(
                    n.line,
                    format!("'{}' is a constant, not a variable.", n.name),
                )),
                resolved => Ok(Expression::Name(Name {
                    name: n.name.clone(),
                    line: n.line,
                    info: resolved.ty().clone(),
                })),
            },
            _ => self.check_expression(expr),
        }
    }

    /// Check an assignment/INPUT/BYREF target: a place whose head is
    /// neither a constant nor a locked loop counter.
    pub(crate) fn check_writable_place(
        &mut self,
        expr: &Expression<()>,
    ) -> Fallible<Expression<Type>> {
        if let Expression::Name(n) = expr {
            match self.resolve_value_name(&n.name, n.line)? {
                Resolved::Const { .. } => {
                    return Err(Diagnostic::access(
                        n.line,
                        format!("Cannot assign to constant '{}'.", n.name),
                    ));
                }
                Resolved::Var { locked: true, .. } => {
                    return Err(Diagnostic::access(
                        n.line,
                        format!("Cannot assign to loop counter '{}'.", n.name),
                    ));
                }
                _ => {}
            }
        }
        self.check_place(expr)
    }

    // scope helpers kept private to the check module

    fn scopes_lookup_above(&self, name: &str) -> Option<&Symbol> {
        self.scopes_ref().lookup_above(name, self.floor())
    }

    fn scopes_lookup_global(&self, name: &str) -> Option<&Symbol> {
        if self.floor() > 0 {
            self.scopes_ref().lookup_global(name)
        } else {
            None
        }
    }
}

/// Places are chains of index/field steps over a named variable or a
/// dereference; anything else (a call result, a literal) is transient.
fn validate_place_shape<T>(expr: &Expression<T>) -> Fallible<()> {
    match expr {
        Expression::Name(_) | Expression::Deref(_) => Ok(()),
        Expression::Index(index) => validate_place_shape(&index.base),
        Expression::Field(field) => validate_place_shape(&field.base),
        other => Err(Diagnostic::type_error(
            other.line(),
            "Expected a variable, array element, field, or dereference.",
        )),
    }
}

fn classify(symbol: &Symbol, name: &str, line: usize) -> Fallible<Resolved> {
    match symbol {
        Symbol::Var { ty, locked } => Ok(Resolved::Var {
            ty: ty.clone(),
            locked: *locked,
        }),
        Symbol::Const { value } => Ok(Resolved::Const { ty: value.ty() }),
        other => Err(Diagnostic::type_error(
            line,
            format!("'{name}' is {}; it cannot be used as a value.", other.describe()),
        )),
    }
}

fn build_call(
    name: &Name<()>,
    args: Vec<Expression<Type>>,
    line: usize,
    result: Type,
) -> Expression<Type> {
    Expression::Call(Call {
        callee: Box::new(Expression::Name(Name {
            name: name.name.clone(),
            line: name.line,
            info: result.clone(),
        })),
        args,
        line,
        info: result,
    })
}

fn arity(line: usize, builtin: &str, want: usize, got: usize) -> Diagnostic {
    Diagnostic::type_error(
        line,
        format!("{builtin} expects {want} argument(s), {got} given."),
    )
}

pub(crate) fn builtin_exists(name: &str) -> bool {
    matches!(
        name,
        "LENGTH"
            | "RIGHT"
            | "MID"
            | "LCASE"
            | "UCASE"
            | "INT"
            | "REAL"
            | "STRING"
            | "CHAR"
            | "BOOLEAN"
            | "DATE"
            | "ORD"
            | "ENUMVALUE"
            | "SIZE"
            | "RAND"
    )
}
