//! The type checker.
//!
//! Checking is two-phase per block. [`Checker::pre_declare`] registers
//! type, class, procedure, and function names (so bodies may refer to
//! each other regardless of textual order), resolves type definitions,
//! defines enum members as constants, and records class metadata. The
//! visit phase then walks declarations and statements in order,
//! rebuilding the tree with every expression annotated:
//! `Program<()>` in, `Program<Type>` out.
//!
//! Scope discipline: routine bodies see their own frames, their class's
//! members (for methods), and the global frame — never the locals of
//! enclosing routines. [`ScopeStack::lookup_from`] encodes exactly
//! that, keyed by the `floor` recorded when the body is entered.

mod expression;
mod statement;

use std::collections::{HashMap, HashSet};

use crate::ast::{
    Access, Block, ClassDecl, ClassMember, ConstDecl, Declaration, Expression, MemberKind, Param,
    Program, RecordField, Routine, SetDecl, TypeDecl, TypeDef, TypeExpr, VarDecl,
};
use crate::error::{Diagnostic, Fallible};

use super::consteval::{self, ConstValue};
use super::symbols::{
    ClassInfo, ClassTable, FieldInfo, MethodInfo, ScopeStack, Signature, Symbol, TypeInfo,
};
use super::ty::Type;

/// Check a parsed program, returning it annotated with semantic types.
pub fn check_program(program: &Program<()>) -> Fallible<Program<Type>> {
    let mut checker = Checker::new();
    let block = checker.check_block_in_place(&program.block)?;
    Ok(Program {
        name: program.name.clone(),
        block,
        line: program.line,
    })
}

pub(crate) struct Checker {
    scopes: ScopeStack,
    classes: ClassTable,
    /// Class whose member body is being checked; drives access control.
    current_class: Option<String>,
    /// Scope floor for name lookups inside the current routine body.
    routine_floor: usize,
    /// `None` at program level, `Some(None)` in procedures and
    /// constructors, `Some(Some(ty))` in functions.
    routine_returns: Option<Option<Type>>,
    in_constructor: bool,
    /// Type declarations of the block currently pre-declaring, for
    /// on-demand resolution of forward references.
    pending_types: HashMap<String, TypeDecl<()>>,
    resolving: Vec<String>,
}

impl Checker {
    fn new() -> Self {
        Self {
            scopes: ScopeStack::new(),
            classes: ClassTable::default(),
            current_class: None,
            routine_floor: 0,
            routine_returns: None,
            in_constructor: false,
            pending_types: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    // === scope plumbing ===

    pub(crate) fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.lookup_from(name, self.routine_floor)
    }

    pub(crate) fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub(crate) fn current_class(&self) -> Option<&str> {
        self.current_class.as_deref()
    }

    /// Equality, plus `NULL` into pointer/class slots, plus derived
    /// class references into base-class slots.
    pub(crate) fn is_assignable(&self, target: &Type, value: &Type) -> bool {
        if target == value {
            return true;
        }
        match (target, value) {
            (Type::Pointer(_) | Type::Class(_), Type::Null) => true,
            (Type::Class(base), Type::Class(derived)) => self.classes.descends_from(derived, base),
            _ => false,
        }
    }

    /// Is a private member of `owner` accessible here?
    pub(crate) fn access_allowed(&self, access: Access, owner: &str) -> bool {
        access == Access::Public || self.current_class.as_deref() == Some(owner)
    }

    // === blocks ===

    /// Check a block in a fresh child scope.
    pub(crate) fn check_block(&mut self, block: &Block<()>) -> Fallible<Block<Type>> {
        self.scopes.enter();
        let result = self.check_block_in_place(block);
        self.scopes.leave();
        result
    }

    /// Check a block in the current scope frame (used for the program
    /// body so its names land in the global frame).
    fn check_block_in_place(&mut self, block: &Block<()>) -> Fallible<Block<Type>> {
        self.pre_declare(&block.declarations)?;
        let mut declarations = Vec::with_capacity(block.declarations.len());
        for decl in &block.declarations {
            declarations.push(self.check_declaration(decl)?);
        }
        let mut statements = Vec::with_capacity(block.statements.len());
        for stmt in &block.statements {
            statements.push(self.check_statement(stmt)?);
        }
        Ok(Block {
            declarations,
            statements,
        })
    }

    // === pre-declaration ===

    fn pre_declare(&mut self, declarations: &[Declaration<()>]) -> Fallible<()> {
        let saved_pending = std::mem::take(&mut self.pending_types);
        let result = self.pre_declare_inner(declarations);
        self.pending_types = saved_pending;
        result
    }

    fn pre_declare_inner(&mut self, declarations: &[Declaration<()>]) -> Fallible<()> {
        // Class names first: type resolution may point at them.
        for decl in declarations {
            if let Declaration::Class(class) = decl {
                self.scopes.define(&class.name, Symbol::Class, class.line)?;
            }
        }

        for decl in declarations {
            if let Declaration::Type(ty) = decl {
                if self.pending_types.contains_key(&ty.name) {
                    return Err(Diagnostic::syntax(
                        ty.line,
                        format!("'{}' is already declared in this scope.", ty.name),
                    ));
                }
                self.pending_types.insert(ty.name.clone(), ty.clone());
            }
        }
        // Enums first (they bind member constants), then constant
        // declarations (array bounds may reference them), then the
        // remaining type definitions.
        let mut enum_names = Vec::new();
        let mut other_names = Vec::new();
        for decl in declarations {
            if let Declaration::Type(t) = decl {
                if matches!(t.def, TypeDef::Enum(_)) {
                    enum_names.push(t.name.clone());
                } else {
                    other_names.push(t.name.clone());
                }
            }
        }
        for name in enum_names {
            self.ensure_type_defined(&name)?;
        }
        for decl in declarations {
            if let Declaration::Const(constant) = decl {
                let value = self.fold_constant(&constant.value)?;
                self.scopes
                    .define(&constant.name, Symbol::Const { value }, constant.line)?;
            }
        }
        for name in other_names {
            self.ensure_type_defined(&name)?;
        }

        for decl in declarations {
            if let Declaration::Class(class) = decl {
                let info = self.resolve_class_info(class)?;
                self.classes.insert(info);
            }
        }
        self.check_inheritance_cycles(declarations)?;

        for decl in declarations {
            match decl {
                Declaration::Proc(routine) => {
                    let signature = self.resolve_signature(routine)?;
                    self.scopes
                        .define(&routine.name, Symbol::Proc(signature), routine.line)?;
                }
                Declaration::Func(routine) => {
                    let signature = self.resolve_signature(routine)?;
                    self.scopes
                        .define(&routine.name, Symbol::Func(signature), routine.line)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolve and define a pending local type (no-op otherwise).
    fn ensure_type_defined(&mut self, name: &str) -> Fallible<()> {
        let Some(decl) = self.pending_types.get(name).cloned() else {
            return Ok(());
        };
        if self.lookup_in_current_frame(name) {
            return Ok(());
        }
        if self.resolving.iter().any(|n| n == name) {
            return Err(Diagnostic::syntax(
                decl.line,
                format!("Type '{name}' is defined in terms of itself."),
            ));
        }
        self.resolving.push(name.to_string());
        let result = self.define_type_decl(&decl);
        self.resolving.pop();
        result
    }

    fn lookup_in_current_frame(&self, name: &str) -> bool {
        // A pending name that already resolved to a type symbol was
        // defined by a recursive visit; any other symbol kind falls
        // through so `define` reports the collision.
        matches!(
            self.scopes.lookup_above(name, self.scopes.depth() - 1),
            Some(Symbol::Type(_))
        )
    }

    fn define_type_decl(&mut self, decl: &TypeDecl<()>) -> Fallible<()> {
        match &decl.def {
            TypeDef::Enum(members) => {
                let mut seen = HashSet::new();
                for member in members {
                    if !seen.insert(member.clone()) {
                        return Err(Diagnostic::syntax(
                            decl.line,
                            format!("Duplicate enum member '{member}'."),
                        ));
                    }
                }
                self.scopes.define(
                    &decl.name,
                    Symbol::Type(TypeInfo::Enum(members.clone())),
                    decl.line,
                )?;
                for (ordinal, member) in members.iter().enumerate() {
                    self.scopes.define(
                        member,
                        Symbol::Const {
                            value: ConstValue::Enum(decl.name.clone(), ordinal as i32),
                        },
                        decl.line,
                    )?;
                }
                Ok(())
            }
            TypeDef::Record(fields) => {
                // Placeholder first so pointer fields may refer back to
                // the record being defined.
                self.scopes.define(
                    &decl.name,
                    Symbol::Type(TypeInfo::Record(Vec::new())),
                    decl.line,
                )?;
                let mut resolved = Vec::with_capacity(fields.len());
                let mut seen = HashSet::new();
                for field in fields {
                    if !seen.insert(field.name.clone()) {
                        return Err(Diagnostic::syntax(
                            field.line,
                            format!("Duplicate record field '{}'.", field.name),
                        ));
                    }
                    let (ty, _) = self.resolve_type(&field.ty, field.line)?;
                    resolved.push((field.name.clone(), ty));
                }
                self.scopes.update_current(
                    &decl.name,
                    Symbol::Type(TypeInfo::Record(resolved)),
                );
                Ok(())
            }
            TypeDef::Alias(texpr) => {
                let (ty, _) = self.resolve_type(texpr, decl.line)?;
                self.scopes
                    .define(&decl.name, Symbol::Type(TypeInfo::Alias(ty)), decl.line)
            }
        }
    }

    fn check_inheritance_cycles(&self, declarations: &[Declaration<()>]) -> Fallible<()> {
        for decl in declarations {
            if let Declaration::Class(class) = decl {
                let mut seen = HashSet::new();
                let mut current = Some(class.name.clone());
                while let Some(name) = current {
                    if !seen.insert(name.clone()) {
                        return Err(Diagnostic::syntax(
                            class.line,
                            format!("Inheritance cycle through class '{name}'."),
                        ));
                    }
                    current = self
                        .classes
                        .get(&name)
                        .and_then(|info| info.base.clone());
                }
            }
        }
        Ok(())
    }

    fn resolve_class_info(&mut self, class: &ClassDecl<()>) -> Fallible<ClassInfo> {
        if let Some(base) = &class.base {
            match self.lookup(base) {
                Some(Symbol::Class) => {}
                Some(other) => {
                    return Err(Diagnostic::type_error(
                        class.line,
                        format!("Base '{base}' is {}, not a class.", other.describe()),
                    ));
                }
                None => {
                    return Err(Diagnostic::name(
                        class.line,
                        format!("Unknown base class '{base}'."),
                    ));
                }
            }
        }

        let mut fields = Vec::new();
        let mut methods: Vec<MethodInfo> = Vec::new();
        let mut constructor = None;
        for member in &class.members {
            match &member.kind {
                MemberKind::Field(var) => {
                    for name in &var.names {
                        if fields.iter().any(|f: &FieldInfo| &f.name == name) {
                            return Err(Diagnostic::syntax(
                                var.line,
                                format!("Duplicate field '{name}' in class '{}'.", class.name),
                            ));
                        }
                        let (ty, _) = self.resolve_type(&var.ty, var.line)?;
                        fields.push(FieldInfo {
                            name: name.clone(),
                            ty,
                            access: member.access,
                            line: var.line,
                        });
                    }
                }
                MemberKind::Procedure(routine) | MemberKind::Function(routine) => {
                    if methods.iter().any(|m| m.name == routine.name) {
                        return Err(Diagnostic::syntax(
                            routine.line,
                            format!(
                                "Duplicate method '{}' in class '{}'.",
                                routine.name, class.name
                            ),
                        ));
                    }
                    let signature = self.resolve_signature(routine)?;
                    methods.push(MethodInfo {
                        name: routine.name.clone(),
                        access: member.access,
                        is_function: matches!(member.kind, MemberKind::Function(_)),
                        signature,
                    });
                }
                MemberKind::Constructor(routine) => {
                    if constructor.is_some() {
                        return Err(Diagnostic::syntax(
                            routine.line,
                            format!("Class '{}' has more than one constructor.", class.name),
                        ));
                    }
                    constructor = Some(self.resolve_signature(routine)?);
                }
            }
        }
        Ok(ClassInfo {
            name: class.name.clone(),
            base: class.base.clone(),
            fields,
            methods,
            constructor,
            line: class.line,
        })
    }

    fn resolve_signature(&mut self, routine: &Routine<()>) -> Fallible<Signature> {
        let mut params = Vec::with_capacity(routine.params.len());
        for param in &routine.params {
            let (ty, _) = self.resolve_type(&param.ty, param.line)?;
            params.push((param.name.clone(), param.mode, ty));
        }
        let returns = match &routine.returns {
            Some(texpr) => Some(self.resolve_type(texpr, routine.line)?.0),
            None => None,
        };
        Ok(Signature {
            params,
            returns,
            line: routine.line,
        })
    }

    // === type resolution ===

    /// Resolve a syntactic type to its semantic type, returning the
    /// annotated type expression alongside.
    pub(crate) fn resolve_type(
        &mut self,
        texpr: &TypeExpr<()>,
        line: usize,
    ) -> Fallible<(Type, TypeExpr<Type>)> {
        match texpr {
            TypeExpr::Integer => Ok((Type::Integer, TypeExpr::Integer)),
            TypeExpr::Real => Ok((Type::Real, TypeExpr::Real)),
            TypeExpr::Boolean => Ok((Type::Boolean, TypeExpr::Boolean)),
            TypeExpr::Char => Ok((Type::Char, TypeExpr::Char)),
            TypeExpr::String => Ok((Type::String, TypeExpr::String)),
            TypeExpr::Date => Ok((Type::Date, TypeExpr::Date)),
            TypeExpr::TextFile => Ok((Type::TextFile, TypeExpr::TextFile)),
            TypeExpr::Array { bounds, elem } => {
                let mut resolved_bounds = Vec::with_capacity(bounds.len());
                let mut typed_bounds = Vec::with_capacity(bounds.len());
                for (low, high) in bounds {
                    let low_value = self.fold_integer(low)?;
                    let high_value = self.fold_integer(high)?;
                    if low_value > high_value {
                        return Err(Diagnostic::range(
                            low.line(),
                            format!("Array bounds {low_value}:{high_value} are inverted."),
                        ));
                    }
                    resolved_bounds.push((low_value, high_value));
                    typed_bounds.push((self.check_expression(low)?, self.check_expression(high)?));
                }
                let (elem_ty, elem_texpr) = self.resolve_type(elem, line)?;
                if matches!(elem_ty, Type::TextFile | Type::RandomFile(_)) {
                    return Err(Diagnostic::type_error(
                        line,
                        "Array elements cannot be file handles.",
                    ));
                }
                Ok((
                    Type::Array {
                        bounds: resolved_bounds,
                        elem: Box::new(elem_ty),
                    },
                    TypeExpr::Array {
                        bounds: typed_bounds,
                        elem: Box::new(elem_texpr),
                    },
                ))
            }
            TypeExpr::SetOf(name) => {
                self.ensure_type_defined(name)?;
                match self.lookup(name) {
                    Some(Symbol::Type(TypeInfo::Enum(_))) => {
                        Ok((Type::Set(name.clone()), TypeExpr::SetOf(name.clone())))
                    }
                    Some(_) => Err(Diagnostic::type_error(
                        line,
                        format!("'{name}' is not an enumeration type."),
                    )),
                    None => Err(Diagnostic::name(line, format!("Unknown type '{name}'."))),
                }
            }
            TypeExpr::Pointer(target) => {
                let (target_ty, target_texpr) = self.resolve_pointer_target(target, line)?;
                Ok((
                    Type::Pointer(Box::new(target_ty)),
                    TypeExpr::Pointer(Box::new(target_texpr)),
                ))
            }
            TypeExpr::RandomFile(name) => {
                self.ensure_type_defined(name)?;
                match self.lookup(name) {
                    Some(Symbol::Type(TypeInfo::Record(_))) => {
                        let record = Type::Record(name.clone());
                        self.require_fixed_size(&record, line)?;
                        Ok((
                            Type::RandomFile(name.clone()),
                            TypeExpr::RandomFile(name.clone()),
                        ))
                    }
                    Some(_) => Err(Diagnostic::type_error(
                        line,
                        format!("'{name}' is not a record type."),
                    )),
                    None => Err(Diagnostic::name(line, format!("Unknown type '{name}'."))),
                }
            }
            TypeExpr::Named(name) => {
                self.ensure_type_defined(name)?;
                let ty = self.resolve_named(name, line)?;
                Ok((ty, TypeExpr::Named(name.clone())))
            }
        }
    }

    /// Pointer targets may name a record or enum that is still being
    /// resolved; the nominal reference is enough to break the cycle.
    fn resolve_pointer_target(
        &mut self,
        target: &TypeExpr<()>,
        line: usize,
    ) -> Fallible<(Type, TypeExpr<Type>)> {
        if let TypeExpr::Named(name) = target {
            if self.resolving.iter().any(|n| n == name) {
                let pending = self.pending_types.get(name).expect("name is being resolved");
                let ty = match &pending.def {
                    TypeDef::Record(_) => Type::Record(name.clone()),
                    TypeDef::Enum(_) => Type::Enum(name.clone()),
                    TypeDef::Alias(_) => {
                        return Err(Diagnostic::syntax(
                            line,
                            format!("Type '{name}' is defined in terms of itself."),
                        ));
                    }
                };
                return Ok((ty, TypeExpr::Named(name.clone())));
            }
        }
        self.resolve_type(target, line)
    }

    fn resolve_named(&mut self, name: &str, line: usize) -> Fallible<Type> {
        match self.lookup(name) {
            Some(Symbol::Type(TypeInfo::Alias(ty))) => Ok(ty.clone()),
            Some(Symbol::Type(TypeInfo::Enum(_))) => Ok(Type::Enum(name.to_string())),
            Some(Symbol::Type(TypeInfo::Record(_))) => Ok(Type::Record(name.to_string())),
            Some(Symbol::Class) => Ok(Type::Class(name.to_string())),
            Some(other) => Err(Diagnostic::type_error(
                line,
                format!("'{name}' is {}, not a type.", other.describe()),
            )),
            None => Err(Diagnostic::name(line, format!("Unknown type '{name}'."))),
        }
    }

    pub(crate) fn record_fields(&self, name: &str) -> Option<&[(String, Type)]> {
        match self.scopes.lookup_from(name, self.routine_floor) {
            Some(Symbol::Type(TypeInfo::Record(fields))) => Some(fields),
            _ => None,
        }
    }

    pub(crate) fn enum_members(&self, name: &str) -> Option<&[String]> {
        match self.scopes.lookup_from(name, self.routine_floor) {
            Some(Symbol::Type(TypeInfo::Enum(members))) => Some(members),
            _ => None,
        }
    }

    /// Random-file records must be fixed-size: no String, Set, Pointer,
    /// Class, or file anywhere in the layout.
    fn require_fixed_size(&self, ty: &Type, line: usize) -> Fallible<()> {
        match ty {
            Type::Integer | Type::Real | Type::Boolean | Type::Char | Type::Date | Type::Enum(_) => {
                Ok(())
            }
            Type::Array { elem, .. } => self.require_fixed_size(elem, line),
            Type::Record(name) => {
                let fields: Vec<Type> = self
                    .record_fields(name)
                    .map(|fs| fs.iter().map(|(_, t)| t.clone()).collect())
                    .unwrap_or_default();
                for field_ty in &fields {
                    self.require_fixed_size(field_ty, line)?;
                }
                Ok(())
            }
            other => Err(Diagnostic::type_error(
                line,
                format!("{other} has no fixed binary size; it cannot appear in a random-file record."),
            )),
        }
    }

    pub(crate) fn fold_constant(&mut self, expr: &Expression<()>) -> Fallible<ConstValue> {
        let scopes = &self.scopes;
        let floor = self.routine_floor;
        consteval::eval(expr, &|name| match scopes.lookup_from(name, floor) {
            Some(Symbol::Const { value }) => Some(value.clone()),
            _ => None,
        })
    }

    fn fold_integer(&mut self, expr: &Expression<()>) -> Fallible<i32> {
        match self.fold_constant(expr)? {
            ConstValue::Integer(v) => Ok(v),
            other => Err(Diagnostic::type_error(
                expr.line(),
                format!("Expected a constant INTEGER, found {}.", other.ty()),
            )),
        }
    }

    // === declarations (visit phase) ===

    fn check_declaration(&mut self, decl: &Declaration<()>) -> Fallible<Declaration<Type>> {
        match decl {
            Declaration::Var(var) => {
                let (ty, texpr) = self.resolve_type(&var.ty, var.line)?;
                for name in &var.names {
                    self.scopes.define(
                        name,
                        Symbol::Var {
                            ty: ty.clone(),
                            locked: false,
                        },
                        var.line,
                    )?;
                }
                Ok(Declaration::Var(VarDecl {
                    names: var.names.clone(),
                    ty: texpr,
                    line: var.line,
                }))
            }
            Declaration::Const(constant) => {
                // Folded and bound during pre-declaration; only the
                // annotated expression is built here.
                let typed_value = self.check_expression(&constant.value)?;
                Ok(Declaration::Const(ConstDecl {
                    name: constant.name.clone(),
                    value: typed_value,
                    line: constant.line,
                }))
            }
            Declaration::Type(decl) => {
                // Defined during pre-declaration; re-resolve the payload
                // for the annotated tree.
                let def = match &decl.def {
                    TypeDef::Enum(members) => TypeDef::Enum(members.clone()),
                    TypeDef::Record(fields) => {
                        let mut typed = Vec::with_capacity(fields.len());
                        for field in fields {
                            let (_, texpr) = self.resolve_type(&field.ty, field.line)?;
                            typed.push(RecordField {
                                name: field.name.clone(),
                                ty: texpr,
                                line: field.line,
                            });
                        }
                        TypeDef::Record(typed)
                    }
                    TypeDef::Alias(texpr) => {
                        let (_, typed) = self.resolve_type(texpr, decl.line)?;
                        TypeDef::Alias(typed)
                    }
                };
                Ok(Declaration::Type(TypeDecl {
                    name: decl.name.clone(),
                    def,
                    line: decl.line,
                }))
            }
            Declaration::Set(set) => {
                let base = match self.lookup(&set.type_name) {
                    Some(Symbol::Type(TypeInfo::Alias(Type::Set(base)))) => base.clone(),
                    Some(_) => {
                        return Err(Diagnostic::type_error(
                            set.line,
                            format!("'{}' is not a set type.", set.type_name),
                        ));
                    }
                    None => {
                        return Err(Diagnostic::name(
                            set.line,
                            format!("Unknown type '{}'.", set.type_name),
                        ));
                    }
                };
                let members = self
                    .enum_members(&base)
                    .map(|m| m.to_vec())
                    .unwrap_or_default();
                for member in &set.members {
                    if !members.iter().any(|m| m == member) {
                        return Err(Diagnostic::name(
                            set.line,
                            format!("'{member}' is not a member of enumeration '{base}'."),
                        ));
                    }
                }
                self.scopes.define(
                    &set.name,
                    Symbol::Var {
                        ty: Type::Set(base),
                        locked: false,
                    },
                    set.line,
                )?;
                Ok(Declaration::Set(SetDecl {
                    name: set.name.clone(),
                    members: set.members.clone(),
                    type_name: set.type_name.clone(),
                    line: set.line,
                }))
            }
            Declaration::Proc(routine) => {
                let signature = match self.lookup(&routine.name) {
                    Some(Symbol::Proc(sig)) => sig.clone(),
                    _ => unreachable!("procedure was pre-declared"),
                };
                let typed = self.check_routine_body(routine, &signature, None, false)?;
                Ok(Declaration::Proc(typed))
            }
            Declaration::Func(routine) => {
                let signature = match self.lookup(&routine.name) {
                    Some(Symbol::Func(sig)) => sig.clone(),
                    _ => unreachable!("function was pre-declared"),
                };
                let typed = self.check_routine_body(routine, &signature, None, false)?;
                Ok(Declaration::Func(typed))
            }
            Declaration::Class(class) => self.check_class_bodies(class),
        }
    }

    fn check_class_bodies(&mut self, class: &ClassDecl<()>) -> Fallible<Declaration<Type>> {
        let mut members = Vec::with_capacity(class.members.len());
        for member in &class.members {
            let kind = match &member.kind {
                MemberKind::Field(var) => {
                    let (_, texpr) = self.resolve_type(&var.ty, var.line)?;
                    MemberKind::Field(VarDecl {
                        names: var.names.clone(),
                        ty: texpr,
                        line: var.line,
                    })
                }
                MemberKind::Procedure(routine) => {
                    let info = self
                        .classes
                        .find_method(&class.name, &routine.name)
                        .expect("method was registered");
                    let signature = info.1.signature.clone();
                    MemberKind::Procedure(self.check_routine_body(
                        routine,
                        &signature,
                        Some(class.name.clone()),
                        false,
                    )?)
                }
                MemberKind::Function(routine) => {
                    let info = self
                        .classes
                        .find_method(&class.name, &routine.name)
                        .expect("method was registered");
                    let signature = info.1.signature.clone();
                    MemberKind::Function(self.check_routine_body(
                        routine,
                        &signature,
                        Some(class.name.clone()),
                        false,
                    )?)
                }
                MemberKind::Constructor(routine) => {
                    let signature = self
                        .classes
                        .get(&class.name)
                        .and_then(|info| info.constructor.clone())
                        .expect("constructor was registered");
                    MemberKind::Constructor(self.check_routine_body(
                        routine,
                        &signature,
                        Some(class.name.clone()),
                        true,
                    )?)
                }
            };
            members.push(ClassMember {
                access: member.access,
                kind,
            });
        }
        Ok(Declaration::Class(ClassDecl {
            name: class.name.clone(),
            base: class.base.clone(),
            members,
            line: class.line,
        }))
    }

    fn check_routine_body(
        &mut self,
        routine: &Routine<()>,
        signature: &Signature,
        owner: Option<String>,
        is_constructor: bool,
    ) -> Fallible<Routine<Type>> {
        let saved_class = self.current_class.clone();
        let saved_floor = self.routine_floor;
        let saved_returns = self.routine_returns.clone();
        let saved_ctor = self.in_constructor;

        self.scopes.enter();
        self.routine_floor = self.scopes.depth() - 1;
        self.current_class = owner;
        self.routine_returns = Some(signature.returns.clone());
        self.in_constructor = is_constructor;

        let result = (|| {
            let mut params = Vec::with_capacity(routine.params.len());
            for param in &routine.params {
                let (ty, texpr) = self.resolve_type(&param.ty, param.line)?;
                self.scopes.define(
                    &param.name,
                    Symbol::Var { ty, locked: false },
                    param.line,
                )?;
                params.push(Param {
                    name: param.name.clone(),
                    mode: param.mode,
                    ty: texpr,
                    line: param.line,
                });
            }
            let body = self.check_block(&routine.body)?;
            let returns = match &routine.returns {
                Some(texpr) => Some(self.resolve_type(texpr, routine.line)?.1),
                None => None,
            };
            Ok(Routine {
                name: routine.name.clone(),
                params,
                returns,
                body,
                line: routine.line,
            })
        })();

        self.scopes.leave();
        self.current_class = saved_class;
        self.routine_floor = saved_floor;
        self.routine_returns = saved_returns;
        self.in_constructor = saved_ctor;
        result
    }

    pub(crate) fn floor(&self) -> usize {
        self.routine_floor
    }

    pub(crate) fn scopes_ref(&self) -> &ScopeStack {
        &self.scopes
    }

    pub(crate) fn routine_returns(&self) -> Option<&Option<Type>> {
        self.routine_returns.as_ref()
    }

    pub(crate) fn in_constructor(&self) -> bool {
        self.in_constructor
    }

    pub(crate) fn lock_counter(&mut self, name: &str, locked: bool) {
        if let Some(Symbol::Var { locked: flag, .. }) =
            self.scopes.lookup_mut_from(name, self.routine_floor)
        {
            *flag = locked;
        }
    }

    pub(crate) fn enter_scope(&mut self) {
        self.scopes.enter();
    }

    pub(crate) fn leave_scope(&mut self) {
        self.scopes.leave();
    }

    pub(crate) fn define_var(&mut self, name: &str, ty: Type, locked: bool, line: usize) -> Fallible<()> {
        self.scopes.define(name, Symbol::Var { ty, locked }, line)
    }
}
