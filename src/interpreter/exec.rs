//! Statement execution, routine calls, and method dispatch.

use std::collections::HashMap;

use crate::ast::{
    Block, CallTarget, CaseLabels, Declaration, Expression, ForStmt, ParamMode, Routine,
    Statement, TypeExpr,
};
use crate::error::{Diagnostic, Fallible};
use crate::types::symbols::TypeInfo;
use crate::types::Type;

use super::eval::compare_values;
use super::files::{decode_value, encode_value};
use super::place::{new_cell, Cell, ObjectData, Place};
use super::scope::{FrameInfo, RoutineKind, RoutineRef};
use super::value::{SetValue, Value};
use super::Interpreter;

/// How a statement finished: fall through, or unwind to the enclosing
/// call because of `RETURN`.
pub(crate) enum Flow {
    Normal,
    Return(Option<Value>),
}

impl Flow {
    pub(crate) fn is_return(&self) -> bool {
        matches!(self, Flow::Return(_))
    }
}

/// An argument prepared for binding: a copied value or an aliased place.
enum ArgSlot {
    Value(Value),
    Alias(Place),
}

impl<'a, T> Interpreter<'a, T> {
    pub(crate) fn exec_declaration(&mut self, decl: &'a Declaration<T>) -> Fallible<()> {
        match decl {
            Declaration::Var(var) => {
                let pending = HashMap::new();
                let ty = self.resolve_type_rt(&var.ty, &pending, var.line)?;
                for name in &var.names {
                    let value = self.default_value(&ty);
                    self.define_binding(name, Place::direct(new_cell(value)), false);
                }
                Ok(())
            }
            // Constants and enum members are bound during
            // pre-declaration; routines, types, and classes are
            // registered there too.
            Declaration::Const(_)
            | Declaration::Type(_)
            | Declaration::Proc(_)
            | Declaration::Func(_)
            | Declaration::Class(_) => Ok(()),
            Declaration::Set(set) => {
                let base = match self.lookup_type(&set.type_name) {
                    Some(TypeInfo::Alias(Type::Set(base))) => base.clone(),
                    _ => unreachable!("checked program: DEFINE names a set type"),
                };
                let members = self
                    .enum_members(&base)
                    .expect("checked program: set base enum is registered");
                let ordinals = set
                    .members
                    .iter()
                    .map(|m| {
                        members
                            .iter()
                            .position(|candidate| candidate == m)
                            .expect("checked program: DEFINE member exists") as i32
                    })
                    .collect();
                let value = Value::Set(SetValue {
                    base,
                    members: ordinals,
                });
                self.define_binding(&set.name, Place::direct(new_cell(value)), false);
                Ok(())
            }
        }
    }

    pub(crate) fn exec_block(&mut self, block: &'a Block<T>) -> Fallible<Flow> {
        self.enter_scope();
        let result = self.exec_block_inner(block);
        self.leave_scope();
        result
    }

    fn exec_block_inner(&mut self, block: &'a Block<T>) -> Fallible<Flow> {
        self.predeclare(&block.declarations)?;
        for decl in &block.declarations {
            self.exec_declaration(decl)?;
        }
        for stmt in &block.statements {
            let flow = self.exec_statement(stmt)?;
            if flow.is_return() {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    pub(crate) fn exec_statement(&mut self, stmt: &'a Statement<T>) -> Fallible<Flow> {
        match stmt {
            Statement::Assign(assign) => {
                self.refuse_locked_target(&assign.target)?;
                let place = self.eval_place(&assign.target)?;
                let value = self.eval_expression(&assign.value)?;
                let value = adapt_null(&place, value);
                place.set(value);
                Ok(Flow::Normal)
            }
            Statement::If(s) => {
                if self.eval_boolean(&s.condition)? {
                    self.exec_block(&s.then_block)
                } else if let Some(else_block) = &s.else_block {
                    self.exec_block(else_block)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::Case(s) => {
                let subject = self.eval_expression(&s.scrutinee)?;
                for arm in &s.arms {
                    let matched = match &arm.labels {
                        CaseLabels::Values(values) => {
                            let mut hit = false;
                            for value in values {
                                let label = self.eval_expression(value)?;
                                if compare_values(&subject, &label) == std::cmp::Ordering::Equal {
                                    hit = true;
                                    break;
                                }
                            }
                            hit
                        }
                        CaseLabels::Range(low, high) => {
                            let low = self.eval_expression(low)?;
                            let high = self.eval_expression(high)?;
                            compare_values(&low, &subject) != std::cmp::Ordering::Greater
                                && compare_values(&subject, &high) != std::cmp::Ordering::Greater
                        }
                    };
                    if matched {
                        return self.exec_block(&arm.body);
                    }
                }
                match &s.otherwise {
                    Some(block) => self.exec_block(block),
                    None => Ok(Flow::Normal),
                }
            }
            Statement::For(s) => self.exec_for(s),
            Statement::While(s) => {
                while self.eval_boolean(&s.condition)? {
                    let flow = self.exec_block(&s.body)?;
                    if flow.is_return() {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Repeat(s) => loop {
                let flow = self.exec_block(&s.body)?;
                if flow.is_return() {
                    return Ok(flow);
                }
                if self.eval_boolean(&s.condition)? {
                    return Ok(Flow::Normal);
                }
            },
            Statement::Call(s) => {
                match &s.target {
                    CallTarget::Name(name) => {
                        if let Some(routine) = self.lookup_routine(name) {
                            self.call_named_routine(&routine, &s.args, s.line)?;
                        } else {
                            self.call_self_method(name, &s.args, s.line)?;
                        }
                    }
                    CallTarget::Method { object, method } => {
                        let object = self.eval_expression(object)?;
                        self.call_method_on(object, method, &s.args, s.line)?;
                    }
                    CallTarget::SuperMethod(method) => {
                        self.call_super_method(method, &s.args, s.line)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return(s) => {
                let value = match &s.value {
                    Some(expr) => Some(self.eval_expression(expr)?),
                    None => None,
                };
                Ok(Flow::Return(value))
            }
            Statement::Input(s) => {
                self.refuse_locked_target(&s.target)?;
                let place = self.eval_place(&s.target)?;
                let token = self.next_input_token(s.line)?;
                let template = place.get();
                let value = self.parse_input_token(&template, &token, s.line)?;
                place.set(value);
                Ok(Flow::Normal)
            }
            Statement::Output(s) => {
                let mut text = String::new();
                for value in &s.values {
                    let evaluated = self.eval_expression(value)?;
                    text.push_str(&self.value_to_text(&evaluated, s.line)?);
                }
                text.push('\n');
                self.write_output(&text);
                Ok(Flow::Normal)
            }
            Statement::Super(s) => {
                let frame = self
                    .frame()
                    .cloned()
                    .expect("checked program: SUPER inside a constructor");
                let class = frame.class.expect("constructors have a class");
                let base = self
                    .class(&class)
                    .base
                    .clone()
                    .expect("checked program: SUPER requires a base class");
                let constructor = self.class(&base).constructor;
                if let Some(ctor) = constructor {
                    self.call_routine(
                        ctor,
                        &s.args,
                        FrameInfo {
                            floor: 0,
                            class: Some(base),
                            self_object: frame.self_object,
                            in_constructor: true,
                        },
                        s.line,
                        false,
                    )?;
                }
                Ok(Flow::Normal)
            }
            Statement::OpenFile(s) => {
                let handle = self.eval_expression(&s.handle)?;
                let path = self.eval_text(&s.path)?;
                let mode = self.eval_text(&s.mode)?;
                match handle {
                    Value::TextFile(handle) => handle.borrow_mut().open(&path, &mode, s.line)?,
                    Value::RandomFile(handle) => handle.borrow_mut().open(&path, &mode, s.line)?,
                    other => unreachable!("checked program: OPENFILE on {}", other.kind_name()),
                }
                Ok(Flow::Normal)
            }
            Statement::CloseFile(s) => {
                let handle = self.eval_expression(&s.handle)?;
                match handle {
                    Value::TextFile(handle) => handle.borrow_mut().close(s.line)?,
                    Value::RandomFile(handle) => handle.borrow_mut().close(s.line)?,
                    other => unreachable!("checked program: CLOSEFILE on {}", other.kind_name()),
                }
                Ok(Flow::Normal)
            }
            Statement::ReadFile(s) => {
                let handle = self.eval_expression(&s.handle)?;
                let place = self.eval_place(&s.target)?;
                let text = match handle {
                    Value::TextFile(handle) => handle.borrow_mut().read_line(s.line)?,
                    other => unreachable!("checked program: READFILE on {}", other.kind_name()),
                };
                let template = place.get();
                let value = self.parse_input_token(&template, text.trim(), s.line)?;
                place.set(value);
                Ok(Flow::Normal)
            }
            Statement::WriteFile(s) => {
                let handle = self.eval_expression(&s.handle)?;
                let value = self.eval_expression(&s.value)?;
                let text = self.value_to_text(&value, s.line)?;
                match handle {
                    Value::TextFile(handle) => handle.borrow_mut().write_line(text, s.line)?,
                    other => unreachable!("checked program: WRITEFILE on {}", other.kind_name()),
                }
                Ok(Flow::Normal)
            }
            Statement::Seek(s) => {
                let handle = self.eval_expression(&s.handle)?;
                let position = self.eval_integer(&s.position)?;
                match handle {
                    Value::RandomFile(handle) => handle.borrow_mut().seek(position, s.line)?,
                    other => unreachable!("checked program: SEEK on {}", other.kind_name()),
                }
                Ok(Flow::Normal)
            }
            Statement::GetRecord(s) => {
                let handle = self.eval_expression(&s.handle)?;
                let place = self.eval_place(&s.target)?;
                let template = place.get();
                let bytes = match handle {
                    Value::RandomFile(handle) => handle.borrow().read_record(s.line)?.to_vec(),
                    other => unreachable!("checked program: GETRECORD on {}", other.kind_name()),
                };
                let mut offset = 0;
                let decoded = decode_value(
                    &template,
                    &bytes,
                    &mut offset,
                    &|name| self.enum_members(name).map(<[String]>::len),
                    s.line,
                )?;
                place.set(decoded);
                Ok(Flow::Normal)
            }
            Statement::PutRecord(s) => {
                let handle = self.eval_expression(&s.handle)?;
                let value = self.eval_expression(&s.value)?;
                let mut bytes = Vec::new();
                encode_value(&value, &mut bytes);
                match handle {
                    Value::RandomFile(handle) => {
                        handle.borrow_mut().write_record(&bytes, s.line)?
                    }
                    other => unreachable!("checked program: PUTRECORD on {}", other.kind_name()),
                }
                Ok(Flow::Normal)
            }
        }
    }

    /// Loop counters stay locked while their loop runs; the checker
    /// refuses such writes statically and the runtime refuses them
    /// again on paths the checker never saw.
    fn refuse_locked_target(&self, target: &'a Expression<T>) -> Fallible<()> {
        if let Expression::Name(name) = target {
            if let Some(binding) = self.lookup_binding(&name.name) {
                if binding.locked {
                    return Err(Diagnostic::access(
                        name.line,
                        format!("Cannot assign to loop counter '{}'.", name.name),
                    ));
                }
            }
        }
        Ok(())
    }

    fn eval_text(&mut self, expr: &'a Expression<T>) -> Fallible<String> {
        match self.eval_expression(expr)? {
            Value::Str(s) => Ok(s),
            other => unreachable!("checked program: expected STRING, got {}", other.kind_name()),
        }
    }

    fn exec_for(&mut self, s: &'a ForStmt<T>) -> Fallible<Flow> {
        let start = self.eval_integer(&s.start)?;
        let end = self.eval_integer(&s.end)?;
        let step = match &s.step {
            Some(step) => self.eval_integer(step)?,
            None => 1,
        };
        if step == 0 {
            return Err(Diagnostic::runtime(s.line, "FOR step must not be zero."));
        }

        // Use the existing counter variable, or implicitly declare one
        // for the loop's extent.
        let implicit = self.lookup_binding(&s.counter).is_none();
        if implicit {
            self.enter_scope();
            self.define_binding(
                &s.counter,
                Place::direct(new_cell(Value::Integer(start))),
                true,
            );
        }
        let counter = self
            .lookup_binding(&s.counter)
            .expect("counter was just bound")
            .place;
        counter.set(Value::Integer(start));
        self.set_locked(&s.counter, true);

        let result = (|| {
            let mut current = start;
            loop {
                let past = if step > 0 { current > end } else { current < end };
                if past {
                    return Ok(Flow::Normal);
                }
                let flow = self.exec_block(&s.body)?;
                if flow.is_return() {
                    return Ok(flow);
                }
                // A counter that cannot advance has covered the range.
                current = match current.checked_add(step) {
                    Some(next) => next,
                    None => return Ok(Flow::Normal),
                };
                counter.set(Value::Integer(current));
            }
        })();

        self.set_locked(&s.counter, false);
        if implicit {
            self.leave_scope();
        }
        result
    }

    // === calls ===

    /// Call a procedure or function found by name in scope.
    pub(crate) fn call_named_routine(
        &mut self,
        routine: &RoutineRef<'a, T>,
        args: &'a [Expression<T>],
        line: usize,
    ) -> Fallible<Option<Value>> {
        let frame = FrameInfo {
            floor: 0,
            class: None,
            self_object: None,
            in_constructor: false,
        };
        self.call_routine(
            routine.routine,
            args,
            frame,
            line,
            routine.kind == RoutineKind::Function,
        )
    }

    /// Call a method by bare name from inside another method of the
    /// same object: dispatch starts at the object's runtime class.
    pub(crate) fn call_self_method(
        &mut self,
        method: &str,
        args: &'a [Expression<T>],
        line: usize,
    ) -> Fallible<Option<Value>> {
        let frame = self
            .frame()
            .cloned()
            .expect("checked program: bare method call inside a method");
        let object_id = frame.self_object.expect("methods execute on an object");
        self.dispatch(Some(object_id), method, args, line)
    }

    /// Call `object.method(args)` with dynamic dispatch.
    pub(crate) fn call_method_on(
        &mut self,
        object: Value,
        method: &str,
        args: &'a [Expression<T>],
        line: usize,
    ) -> Fallible<Option<Value>> {
        match object {
            Value::Object(Some(id)) => self.dispatch(Some(id), method, args, line),
            Value::Object(None) => Err(Diagnostic::runtime(line, "Null class reference.")),
            other => unreachable!("checked program: method call on {}", other.kind_name()),
        }
    }

    /// `SUPER.method(args)`: start the lookup at the immediate base of
    /// the class whose method body is executing.
    pub(crate) fn call_super_method(
        &mut self,
        method: &str,
        args: &'a [Expression<T>],
        line: usize,
    ) -> Fallible<Option<Value>> {
        let frame = self.frame().cloned().expect("checked program: SUPER inside a method");
        let class = frame.class.expect("methods have a class");
        let base = self
            .class(&class)
            .base
            .clone()
            .expect("checked program: SUPER requires a base class");
        let object_id = frame.self_object.expect("methods execute on an object");
        self.dispatch_from(&base, Some(object_id), method, args, line)
    }

    fn dispatch(
        &mut self,
        object_id: Option<usize>,
        method: &str,
        args: &'a [Expression<T>],
        line: usize,
    ) -> Fallible<Option<Value>> {
        let runtime_class = self.heap_ref().object(object_id, line)?.class.clone();
        self.dispatch_from(&runtime_class, object_id, method, args, line)
    }

    fn dispatch_from(
        &mut self,
        start_class: &str,
        object_id: Option<usize>,
        method: &str,
        args: &'a [Expression<T>],
        line: usize,
    ) -> Fallible<Option<Value>> {
        let (owner, found) = self
            .find_method(start_class, method)
            .map(|(owner, m)| (owner.to_string(), (m.routine, m.is_function, m.access)))
            .ok_or_else(|| {
                Diagnostic::name(line, format!("Class '{start_class}' has no method '{method}'."))
            })?;
        let (routine, is_function, access) = found;

        // Dynamic dispatch can land on members the static checker never
        // saw; private members stay private to their owner.
        if access == crate::ast::Access::Private
            && self.frame().and_then(|f| f.class.as_deref()) != Some(owner.as_str())
        {
            return Err(Diagnostic::access(
                line,
                format!("Method '{method}' is private to class '{owner}'."),
            ));
        }

        let frame = FrameInfo {
            floor: 0,
            class: Some(owner),
            self_object: object_id,
            in_constructor: false,
        };
        self.call_routine(routine, args, frame, line, is_function)
    }

    /// Instantiate a class: default-initialize fields base-first, then
    /// run the class's own constructor if it has one.
    pub(crate) fn construct_object(
        &mut self,
        class: &str,
        args: &'a [Expression<T>],
        line: usize,
    ) -> Fallible<Value> {
        let mut chain = Vec::new();
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            current = self.class(&name).base.clone();
            chain.push(name);
        }

        // Root base first, so derived defaults overwrite nothing.
        let mut fields: Vec<(String, Cell)> = Vec::new();
        for name in chain.iter().rev() {
            let field_types: Vec<(String, Type)> = self
                .class(name)
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.ty.clone()))
                .collect();
            for (field, ty) in field_types {
                let value = self.default_value(&ty);
                if let Some(existing) = fields.iter_mut().find(|(f, _)| *f == field) {
                    existing.1 = new_cell(value);
                } else {
                    fields.push((field, new_cell(value)));
                }
            }
        }

        let id = self.heap().alloc_object(ObjectData {
            class: class.to_string(),
            fields,
        });

        if let Some(ctor) = self.class(class).constructor {
            let frame = FrameInfo {
                floor: 0,
                class: Some(class.to_string()),
                self_object: Some(id),
                in_constructor: true,
            };
            self.call_routine(ctor, args, frame, line, false)?;
        }
        Ok(Value::Object(Some(id)))
    }

    /// The shared call path: evaluate arguments left-to-right in the
    /// caller's scope, then push the callee frame and run the body.
    fn call_routine(
        &mut self,
        routine: &'a Routine<T>,
        args: &'a [Expression<T>],
        mut frame: FrameInfo,
        line: usize,
        is_function: bool,
    ) -> Fallible<Option<Value>> {
        debug_assert_eq!(routine.params.len(), args.len());
        let mut slots = Vec::with_capacity(args.len());
        for (param, arg) in routine.params.iter().zip(args) {
            match param.mode {
                ParamMode::ByValue => {
                    let value = self.eval_expression(arg)?;
                    let value = self.adapt_null_for_param(&param.ty, value, param.line)?;
                    slots.push(ArgSlot::Value(value));
                }
                ParamMode::ByReference => {
                    let place = self.eval_place(arg)?;
                    slots.push(ArgSlot::Alias(place));
                }
            }
        }

        self.enter_scope();
        frame.floor = self.scope_depth() - 1;
        self.push_frame(frame);

        for (param, slot) in routine.params.iter().zip(slots) {
            let place = match slot {
                ArgSlot::Value(value) => Place::direct(new_cell(value)),
                ArgSlot::Alias(place) => place,
            };
            self.define_binding(&param.name, place, false);
        }

        let flow = self.exec_block(&routine.body);

        self.pop_frame();
        self.leave_scope();

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal if is_function => Err(Diagnostic::runtime(
                line,
                format!("Function '{}' ended without RETURN.", routine.name),
            )),
            Flow::Normal => Ok(None),
        }
    }

    /// `NULL` flows in as a pointer; a class-typed sink stores a null
    /// object reference instead.
    fn adapt_null_for_param(
        &mut self,
        ty: &'a TypeExpr<T>,
        value: Value,
        line: usize,
    ) -> Fallible<Value> {
        if matches!(value, Value::Pointer(None)) {
            let pending = HashMap::new();
            if let Type::Class(_) = self.resolve_type_rt(ty, &pending, line)? {
                return Ok(Value::Object(None));
            }
        }
        Ok(value)
    }
}

/// Adapt a null pointer literal to the null of the place's slot.
fn adapt_null(place: &Place, value: Value) -> Value {
    if matches!(value, Value::Pointer(None)) {
        let is_object_slot = place.update(|current| matches!(current, Value::Object(_)));
        if is_object_slot {
            return Value::Object(None);
        }
    }
    value
}
