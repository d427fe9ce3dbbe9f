//! Tree-walking interpreter.
//!
//! Executes a checked program deterministically, left-to-right, with no
//! short-circuiting. Behavior at runtime is driven by value tags;
//! declared types are resolved through scoped registries that mirror
//! the checker's two-phase pre-declaration, so the checker and the
//! interpreter agree on every name.
//!
//! Module layout:
//!
//! - [`value`] — runtime values
//! - [`place`] — cells, lvalue places, heap
//! - [`scope`] — scope stack, call frames, runtime registries
//! - [`eval`] — expression evaluation
//! - [`exec`] — statements, calls, dispatch
//! - [`builtins`] — the standard library
//! - [`files`] — file handles and the record codec

mod builtins;
mod eval;
mod exec;
mod files;
mod place;
mod scope;
mod value;

pub use value::Value;

use std::collections::{HashMap, VecDeque};

use crate::ast::{Declaration, Program, Routine, TypeDecl, TypeDef, TypeExpr};
use crate::date::Date;
use crate::error::{Diagnostic, Fallible};
use crate::types::symbols::TypeInfo;
use crate::types::Type;

use files::{size_of_value, RandomFile, TextFile};
use place::{new_cell, Heap, Place};
use scope::{Binding, FrameInfo, RoutineKind, RoutineRef, RtClass, RtField, RtMethod, Scope};
use value::{ArrayValue, EnumValue, RecordValue, SetValue};

/// Outcome of one program run: everything written to standard output,
/// and the diagnostic that stopped execution, if any. Output buffered
/// before a failure is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub output: String,
    pub error: Option<Diagnostic>,
}

/// Execute a checked program against the given stdin text.
pub fn run_program<T>(program: &Program<T>, stdin: &str) -> RunOutcome {
    let mut interpreter = Interpreter::new(stdin);
    let error = interpreter.run(program).err();
    RunOutcome {
        output: interpreter.output,
        error,
    }
}

pub(crate) struct Interpreter<'a, T> {
    scopes: Vec<Scope<'a, T>>,
    frames: Vec<FrameInfo>,
    classes: HashMap<String, RtClass<'a, T>>,
    heap: Heap,
    output: String,
    input: VecDeque<String>,
    rand_state: i64,
}

impl<'a, T> Interpreter<'a, T> {
    fn new(stdin: &str) -> Self {
        Interpreter {
            scopes: vec![Scope::default()],
            frames: Vec::new(),
            classes: HashMap::new(),
            heap: Heap::default(),
            output: String::new(),
            input: stdin.split_whitespace().map(str::to_string).collect(),
            rand_state: 1,
        }
    }

    fn run(&mut self, program: &'a Program<T>) -> Fallible<()> {
        // The program block runs in the global frame itself.
        self.predeclare(&program.block.declarations)?;
        for decl in &program.block.declarations {
            self.exec_declaration(decl)?;
        }
        for stmt in &program.block.statements {
            if self.exec_statement(stmt)?.is_return() {
                break;
            }
        }
        Ok(())
    }

    // === name lookup (mirrors the checker's discipline) ===

    pub(crate) fn floor(&self) -> usize {
        self.frames.last().map(|f| f.floor).unwrap_or(0)
    }

    pub(crate) fn frame(&self) -> Option<&FrameInfo> {
        self.frames.last()
    }

    pub(crate) fn lookup_binding(&self, name: &str) -> Option<Binding> {
        let floor = self.floor();
        for scope in self.scopes[floor..].iter().rev() {
            if let Some(binding) = scope.vars.get(name) {
                return Some(binding.clone());
            }
        }
        if let Some(frame) = self.frames.last() {
            if let Some(object_id) = frame.self_object {
                if let Ok(object) = self.heap.object(Some(object_id), 0) {
                    if let Some(cell) = object.field_cell(name) {
                        return Some(Binding {
                            place: Place::direct(cell),
                            locked: false,
                        });
                    }
                }
            }
        }
        if floor > 0 {
            if let Some(binding) = self.scopes[0].vars.get(name) {
                return Some(binding.clone());
            }
        }
        None
    }

    fn lookup_binding_locked_flag(&mut self, name: &str) -> Option<&mut Binding> {
        let floor = self.floor();
        let len = self.scopes.len();
        let mut index = None;
        for i in (floor..len).rev() {
            if self.scopes[i].vars.contains_key(name) {
                index = Some(i);
                break;
            }
        }
        if index.is_none() && floor > 0 && self.scopes[0].vars.contains_key(name) {
            index = Some(0);
        }
        index.and_then(move |i| self.scopes[i].vars.get_mut(name))
    }

    pub(crate) fn set_locked(&mut self, name: &str, locked: bool) {
        if let Some(binding) = self.lookup_binding_locked_flag(name) {
            binding.locked = locked;
        }
    }

    /// Routine visible from the current frame, mirroring the checker's
    /// order: the frame's own scopes first, then (for methods) the
    /// class chain — handled by callers — then the global frame.
    pub(crate) fn lookup_routine_local(&self, name: &str) -> Option<RoutineRef<'a, T>> {
        let floor = self.floor();
        for scope in self.scopes[floor..].iter().rev() {
            if let Some(routine) = scope.routines.get(name) {
                return Some(routine.clone());
            }
        }
        None
    }

    pub(crate) fn lookup_routine_global(&self, name: &str) -> Option<RoutineRef<'a, T>> {
        if self.floor() > 0 {
            return self.scopes[0].routines.get(name).cloned();
        }
        None
    }

    /// Resolve a bare routine name the way the checker did: locals,
    /// then the enclosing class's methods, then globals. A method hit
    /// returns `None` so the caller dispatches on the object instead.
    pub(crate) fn lookup_routine(&self, name: &str) -> Option<RoutineRef<'a, T>> {
        if let Some(routine) = self.lookup_routine_local(name) {
            return Some(routine);
        }
        if let Some(class) = self.frames.last().and_then(|f| f.class.as_deref()) {
            if self.find_method(class, name).is_some() {
                return None;
            }
        }
        self.lookup_routine_global(name)
    }

    pub(crate) fn lookup_type(&self, name: &str) -> Option<&TypeInfo> {
        let floor = self.floor();
        for scope in self.scopes[floor..].iter().rev() {
            if let Some(info) = scope.types.get(name) {
                return Some(info);
            }
        }
        if floor > 0 {
            if let Some(info) = self.scopes[0].types.get(name) {
                return Some(info);
            }
        }
        None
    }

    pub(crate) fn enum_members(&self, name: &str) -> Option<&[String]> {
        match self.lookup_type(name) {
            Some(TypeInfo::Enum(members)) => Some(members),
            _ => None,
        }
    }

    pub(crate) fn record_fields(&self, name: &str) -> Option<&[(String, Type)]> {
        match self.lookup_type(name) {
            Some(TypeInfo::Record(fields)) => Some(fields),
            _ => None,
        }
    }

    pub(crate) fn class(&self, name: &str) -> &RtClass<'a, T> {
        self.classes
            .get(name)
            .expect("checked program: class is registered")
    }

    /// Find a method by runtime class, walking the base chain.
    pub(crate) fn find_method(&self, class: &str, method: &str) -> Option<(&str, &RtMethod<'a, T>)> {
        let mut current = self.classes.get(class);
        while let Some(rt) = current {
            if let Some(found) = rt.methods.iter().find(|m| m.name == method) {
                return Some((rt.name.as_str(), found));
            }
            current = rt.base.as_deref().and_then(|b| self.classes.get(b));
        }
        None
    }

    pub(crate) fn define_binding(&mut self, name: &str, place: Place, locked: bool) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .vars
            .insert(name.to_string(), Binding { place, locked });
    }

    pub(crate) fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    pub(crate) fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub(crate) fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    pub(crate) fn heap(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub(crate) fn heap_ref(&self) -> &Heap {
        &self.heap
    }

    pub(crate) fn push_frame(&mut self, frame: FrameInfo) {
        self.frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub(crate) fn write_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub(crate) fn next_input_token(&mut self, line: usize) -> Fallible<String> {
        self.input
            .pop_front()
            .ok_or_else(|| Diagnostic::runtime(line, "Input exhausted."))
    }

    pub(crate) fn next_rand(&mut self) -> f64 {
        self.rand_state = (1_103_515_245 * self.rand_state + 12_345) % (1 << 31);
        self.rand_state as f64 / (1u64 << 31) as f64
    }

    // === pre-declaration (mirrors the checker) ===

    pub(crate) fn predeclare(&mut self, declarations: &'a [Declaration<T>]) -> Fallible<()> {
        // Enums first: no dependencies, and they bind member constants.
        for decl in declarations {
            if let Declaration::Type(ty) = decl {
                if let TypeDef::Enum(members) = &ty.def {
                    self.register_enum(ty, members);
                }
            }
        }

        // Constants next: array bounds in the remaining type
        // definitions may reference them.
        for decl in declarations {
            if let Declaration::Const(constant) = decl {
                let value = self.eval_expression(&constant.value)?;
                self.define_binding(&constant.name, Place::direct(new_cell(value)), true);
            }
        }

        // Records and aliases resolve on demand so forward references
        // (including pointer fields into later records) work.
        let mut pending: HashMap<String, &'a TypeDecl<T>> = HashMap::new();
        for decl in declarations {
            if let Declaration::Type(ty) = decl {
                if !matches!(ty.def, TypeDef::Enum(_)) {
                    pending.insert(ty.name.clone(), ty);
                }
            }
        }
        let names: Vec<String> = pending.keys().cloned().collect();
        for name in names {
            self.ensure_rt_type(&name, &pending)?;
        }

        for decl in declarations {
            if let Declaration::Class(class) = decl {
                let mut fields = Vec::new();
                let mut methods = Vec::new();
                let mut constructor = None;
                for member in &class.members {
                    match &member.kind {
                        crate::ast::MemberKind::Field(var) => {
                            let ty = self.resolve_type_rt(&var.ty, &pending, var.line)?;
                            for name in &var.names {
                                fields.push(RtField {
                                    name: name.clone(),
                                    ty: ty.clone(),
                                    access: member.access,
                                });
                            }
                        }
                        crate::ast::MemberKind::Procedure(routine) => methods.push(RtMethod {
                            name: routine.name.clone(),
                            routine,
                            is_function: false,
                            access: member.access,
                        }),
                        crate::ast::MemberKind::Function(routine) => methods.push(RtMethod {
                            name: routine.name.clone(),
                            routine,
                            is_function: true,
                            access: member.access,
                        }),
                        crate::ast::MemberKind::Constructor(routine) => {
                            constructor = Some(routine);
                        }
                    }
                }
                self.classes.insert(
                    class.name.clone(),
                    RtClass {
                        name: class.name.clone(),
                        base: class.base.clone(),
                        fields,
                        methods,
                        constructor,
                    },
                );
            }
        }

        for decl in declarations {
            match decl {
                Declaration::Proc(routine) => self.register_routine(routine, RoutineKind::Procedure),
                Declaration::Func(routine) => self.register_routine(routine, RoutineKind::Function),
                _ => {}
            }
        }
        Ok(())
    }

    fn register_enum(&mut self, decl: &TypeDecl<T>, members: &[String]) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .types
            .insert(decl.name.clone(), TypeInfo::Enum(members.to_vec()));
        for (ordinal, member) in members.iter().enumerate() {
            let value = Value::Enum(EnumValue {
                enum_name: decl.name.clone(),
                ordinal: ordinal as i32,
            });
            self.define_binding(member, Place::direct(new_cell(value)), true);
        }
    }

    fn register_routine(&mut self, routine: &'a Routine<T>, kind: RoutineKind) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .routines
            .insert(routine.name.clone(), RoutineRef { routine, kind });
    }

    fn ensure_rt_type(
        &mut self,
        name: &str,
        pending: &HashMap<String, &'a TypeDecl<T>>,
    ) -> Fallible<()> {
        if self
            .scopes
            .last()
            .expect("scope stack is never empty")
            .types
            .contains_key(name)
        {
            return Ok(());
        }
        let Some(decl) = pending.get(name).copied() else {
            return Ok(());
        };
        match &decl.def {
            TypeDef::Enum(_) => Ok(()),
            TypeDef::Record(fields) => {
                let mut resolved = Vec::with_capacity(fields.len());
                for field in fields {
                    let ty = self.resolve_type_rt(&field.ty, pending, field.line)?;
                    resolved.push((field.name.clone(), ty));
                }
                self.scopes
                    .last_mut()
                    .expect("scope stack is never empty")
                    .types
                    .insert(decl.name.clone(), TypeInfo::Record(resolved));
                Ok(())
            }
            TypeDef::Alias(texpr) => {
                let ty = self.resolve_type_rt(texpr, pending, decl.line)?;
                self.scopes
                    .last_mut()
                    .expect("scope stack is never empty")
                    .types
                    .insert(decl.name.clone(), TypeInfo::Alias(ty));
                Ok(())
            }
        }
    }

    /// Resolve a syntactic type against the runtime registries. Array
    /// bounds are constant expressions; they are evaluated here.
    pub(crate) fn resolve_type_rt(
        &mut self,
        texpr: &'a TypeExpr<T>,
        pending: &HashMap<String, &'a TypeDecl<T>>,
        line: usize,
    ) -> Fallible<Type> {
        match texpr {
            TypeExpr::Integer => Ok(Type::Integer),
            TypeExpr::Real => Ok(Type::Real),
            TypeExpr::Boolean => Ok(Type::Boolean),
            TypeExpr::Char => Ok(Type::Char),
            TypeExpr::String => Ok(Type::String),
            TypeExpr::Date => Ok(Type::Date),
            TypeExpr::TextFile => Ok(Type::TextFile),
            TypeExpr::SetOf(name) => Ok(Type::Set(name.clone())),
            TypeExpr::RandomFile(name) => Ok(Type::RandomFile(name.clone())),
            TypeExpr::Array { bounds, elem } => {
                let mut resolved = Vec::with_capacity(bounds.len());
                for (low, high) in bounds {
                    let low = self.eval_integer(low)?;
                    let high = self.eval_integer(high)?;
                    resolved.push((low, high));
                }
                let elem = self.resolve_type_rt(elem, pending, line)?;
                Ok(Type::Array {
                    bounds: resolved,
                    elem: Box::new(elem),
                })
            }
            TypeExpr::Pointer(target) => {
                // A pointer may name a record still being resolved; the
                // nominal reference suffices.
                if let TypeExpr::Named(name) = &**target {
                    if let Some(decl) = pending.get(name) {
                        match &decl.def {
                            TypeDef::Record(_) => {
                                return Ok(Type::Pointer(Box::new(Type::Record(name.clone()))));
                            }
                            TypeDef::Enum(_) => {
                                return Ok(Type::Pointer(Box::new(Type::Enum(name.clone()))));
                            }
                            TypeDef::Alias(_) => {}
                        }
                    }
                }
                let target = self.resolve_type_rt(target, pending, line)?;
                Ok(Type::Pointer(Box::new(target)))
            }
            TypeExpr::Named(name) => {
                self.ensure_rt_type(name, pending)?;
                if self.classes.contains_key(name) {
                    return Ok(Type::Class(name.clone()));
                }
                match self.lookup_type(name) {
                    Some(TypeInfo::Alias(ty)) => Ok(ty.clone()),
                    Some(TypeInfo::Enum(_)) => Ok(Type::Enum(name.clone())),
                    Some(TypeInfo::Record(_)) => Ok(Type::Record(name.clone())),
                    None => unreachable!("checked program: type '{name}' resolves"),
                }
            }
        }
    }

    // === defaults ===

    /// Default value for a declared type: zero/empty scalars, members
    /// recursively defaulted, first enum member, null references,
    /// closed file handles.
    pub(crate) fn default_value(&self, ty: &Type) -> Value {
        match ty {
            Type::Integer => Value::Integer(0),
            Type::Real => Value::Real(0.0),
            Type::Boolean => Value::Boolean(false),
            Type::Char => Value::Char('\0'),
            Type::String => Value::Str(String::new()),
            Type::Date => Value::Date(Date::default()),
            Type::Array { bounds, elem } => {
                let count = bounds
                    .iter()
                    .map(|&(low, high)| (high - low + 1) as usize)
                    .product();
                let elem = self.default_value(elem);
                Value::Array(ArrayValue {
                    bounds: bounds.clone(),
                    elems: vec![elem; count],
                })
            }
            Type::Record(name) => {
                let fields = self
                    .record_fields(name)
                    .expect("checked program: record is registered")
                    .to_vec();
                Value::Record(RecordValue {
                    name: name.clone(),
                    fields: fields
                        .into_iter()
                        .map(|(field, ty)| (field, self.default_value(&ty)))
                        .collect(),
                })
            }
            Type::Enum(name) => Value::Enum(EnumValue {
                enum_name: name.clone(),
                ordinal: 0,
            }),
            Type::Set(name) => Value::Set(SetValue {
                base: name.clone(),
                members: Default::default(),
            }),
            Type::Pointer(_) => Value::Pointer(None),
            Type::Class(_) => Value::Object(None),
            Type::TextFile => Value::TextFile(std::rc::Rc::new(std::cell::RefCell::new(
                TextFile::closed(),
            ))),
            Type::RandomFile(record) => {
                let template = self.default_value(&Type::Record(record.clone()));
                let size = size_of_value(&template);
                Value::RandomFile(std::rc::Rc::new(std::cell::RefCell::new(
                    RandomFile::closed(size),
                )))
            }
            Type::Null => unreachable!("NULL is not a declarable type"),
        }
    }

    // === conversions shared by OUTPUT, STRING, WRITEFILE ===

    pub(crate) fn value_to_text(&self, value: &Value, line: usize) -> Fallible<String> {
        match value {
            Value::Integer(v) => Ok(v.to_string()),
            Value::Real(v) => Ok(crate::num::format_real(*v)),
            Value::Boolean(v) => Ok(if *v { "TRUE" } else { "FALSE" }.to_string()),
            Value::Char(v) => Ok(v.to_string()),
            Value::Str(v) => Ok(v.clone()),
            Value::Date(v) => Ok(v.to_string()),
            Value::Enum(v) => {
                let members = self
                    .enum_members(&v.enum_name)
                    .expect("checked program: enum is registered");
                Ok(members[v.ordinal as usize].clone())
            }
            other => Err(Diagnostic::type_error(
                line,
                format!("Cannot convert {} to text.", other.kind_name()),
            )),
        }
    }

    /// Parse one whitespace-delimited token into the shape of
    /// `template` — the shared contract of `INPUT` and `READFILE`.
    pub(crate) fn parse_input_token(
        &self,
        template: &Value,
        token: &str,
        line: usize,
    ) -> Fallible<Value> {
        match template {
            Value::Integer(_) => {
                let valid = {
                    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
                    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
                };
                if !valid {
                    return Err(Diagnostic::runtime(
                        line,
                        format!("Invalid INTEGER input '{token}'."),
                    ));
                }
                match token.parse::<i64>() {
                    Ok(v) if v >= i32::MIN as i64 && v <= i32::MAX as i64 => {
                        Ok(Value::Integer(v as i32))
                    }
                    _ => Err(Diagnostic::range(
                        line,
                        format!("INTEGER input '{token}' out of range."),
                    )),
                }
            }
            Value::Real(_) => {
                if !valid_real_token(token) {
                    return Err(Diagnostic::runtime(
                        line,
                        format!("Invalid REAL input '{token}'."),
                    ));
                }
                let parsed: f64 = token
                    .parse()
                    .map_err(|_| Diagnostic::runtime(line, format!("Invalid REAL input '{token}'.")))?;
                crate::num::check_real(parsed, line).map(Value::Real)
            }
            Value::Boolean(_) => {
                if token.eq_ignore_ascii_case("TRUE") {
                    Ok(Value::Boolean(true))
                } else if token.eq_ignore_ascii_case("FALSE") {
                    Ok(Value::Boolean(false))
                } else {
                    Err(Diagnostic::runtime(
                        line,
                        format!("Invalid BOOLEAN input '{token}'."),
                    ))
                }
            }
            Value::Char(_) => {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(Diagnostic::runtime(
                        line,
                        format!("Invalid CHAR input '{token}'."),
                    )),
                }
            }
            Value::Str(_) => Ok(Value::Str(token.to_string())),
            Value::Date(_) => Date::parse(token, line).map(Value::Date),
            Value::Enum(e) => {
                let members = self
                    .enum_members(&e.enum_name)
                    .expect("checked program: enum is registered");
                match members.iter().position(|m| m == token) {
                    Some(ordinal) => Ok(Value::Enum(EnumValue {
                        enum_name: e.enum_name.clone(),
                        ordinal: ordinal as i32,
                    })),
                    None => Err(Diagnostic::runtime(
                        line,
                        format!("'{token}' is not a member of '{}'.", e.enum_name),
                    )),
                }
            }
            other => unreachable!("checked program: {} is not inputtable", other.kind_name()),
        }
    }
}

/// `[+-]? digits [ '.' digits ] [ (e|E) [+-]? digits ]`, nothing else.
fn valid_real_token(token: &str) -> bool {
    let rest = token.strip_prefix(['+', '-']).unwrap_or(token);
    let (mantissa, exponent) = match rest.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (rest, None),
    };
    let mantissa_ok = match mantissa.split_once('.') {
        Some((whole, frac)) => {
            !whole.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && !frac.is_empty()
                && frac.bytes().all(|b| b.is_ascii_digit())
        }
        None => !mantissa.is_empty() && mantissa.bytes().all(|b| b.is_ascii_digit()),
    };
    let exponent_ok = match exponent {
        Some(e) => {
            let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        }
        None => true,
    };
    mantissa_ok && exponent_ok
}
