//! Expression evaluation.
//!
//! Strictly left-to-right, and `AND`/`OR` always evaluate both sides.
//! Reads through lvalue-shaped expressions resolve a [`Place`] so
//! element access never copies whole containers; transient values
//! (call results) fall back to plain evaluation.

use std::cmp::Ordering;

use crate::ast::{
    Binary, BinaryOp, Call, Expression, Index, LiteralValue, New, TypeExpr, Unary, UnaryOp,
};
use crate::error::{Diagnostic, Fallible};
use crate::num;

use super::place::{Place, Step};
use super::value::{SetValue, Value};
use super::Interpreter;

impl<'a, T> Interpreter<'a, T> {
    pub(crate) fn eval_expression(&mut self, expr: &'a Expression<T>) -> Fallible<Value> {
        match expr {
            Expression::Literal(lit) => Ok(match &lit.value {
                LiteralValue::Integer(v) => Value::Integer(*v),
                LiteralValue::Real(v) => Value::Real(*v),
                LiteralValue::Boolean(v) => Value::Boolean(*v),
                LiteralValue::Char(v) => Value::Char(*v),
                LiteralValue::Str(v) => Value::Str(v.clone()),
                LiteralValue::Date(v) => Value::Date(*v),
            }),
            Expression::Name(name) => match self.lookup_binding(&name.name) {
                Some(binding) => Ok(binding.place.get()),
                None => Err(Diagnostic::name(
                    name.line,
                    format!("Undeclared identifier '{}'.", name.name),
                )),
            },
            Expression::Binary(binary) => self.eval_binary(binary),
            Expression::Unary(unary) => self.eval_unary(unary),
            Expression::Call(call) => self.eval_call(call),
            Expression::Index(index) => match self.try_eval_place(expr)? {
                Some(place) => Ok(place.get()),
                None => self.eval_index_by_value(index),
            },
            Expression::Field(field) => {
                if let Some(place) = self.try_eval_place(expr)? {
                    return Ok(place.get());
                }
                let base = self.eval_expression(&field.base)?;
                match base {
                    Value::Record(record) => Ok(record
                        .field(&field.field)
                        .expect("checked program: record field exists")
                        .clone()),
                    Value::Object(id) => {
                        let cell = self
                            .heap_ref()
                            .object(id, field.line)?
                            .field_cell(&field.field)
                            .expect("checked program: object field exists");
                        let value = cell.borrow().clone();
                        Ok(value)
                    }
                    other => unreachable!("checked program: {} has no fields", other.kind_name()),
                }
            }
            Expression::New(new) => self.eval_new(new),
            Expression::EofCheck(eof) => {
                let handle = self.eval_expression(&eof.handle)?;
                match handle {
                    Value::TextFile(handle) => Ok(Value::Boolean(handle.borrow().eof())),
                    Value::RandomFile(handle) => Ok(Value::Boolean(handle.borrow().eof())),
                    other => unreachable!("checked program: EOF on {}", other.kind_name()),
                }
            }
            Expression::Null(_) => Ok(Value::Pointer(None)),
            Expression::Deref(_) => {
                let place = self
                    .try_eval_place(expr)?
                    .expect("dereference is always placeable");
                Ok(place.get())
            }
            Expression::SuperCall(call) => {
                let result = self.call_super_method(&call.method, &call.args, call.line)?;
                Ok(result.expect("checked program: SUPER call in expression returns"))
            }
        }
    }

    pub(crate) fn eval_integer(&mut self, expr: &'a Expression<T>) -> Fallible<i32> {
        match self.eval_expression(expr)? {
            Value::Integer(v) => Ok(v),
            other => unreachable!("checked program: expected INTEGER, got {}", other.kind_name()),
        }
    }

    pub(crate) fn eval_boolean(&mut self, expr: &'a Expression<T>) -> Fallible<bool> {
        match self.eval_expression(expr)? {
            Value::Boolean(v) => Ok(v),
            other => unreachable!("checked program: expected BOOLEAN, got {}", other.kind_name()),
        }
    }

    // === places ===

    /// Resolve an lvalue-shaped expression to its place. `Ok(None)`
    /// means the expression is transient (not place-shaped).
    pub(crate) fn try_eval_place(&mut self, expr: &'a Expression<T>) -> Fallible<Option<Place>> {
        match expr {
            Expression::Name(name) => match self.lookup_binding(&name.name) {
                Some(binding) => Ok(Some(binding.place)),
                None => Err(Diagnostic::name(
                    name.line,
                    format!("Undeclared identifier '{}'.", name.name),
                )),
            },
            Expression::Deref(deref) => {
                let target = self.eval_expression(&deref.target)?;
                match target {
                    Value::Pointer(address) => {
                        Ok(Some(self.heap_ref().target(address, deref.line)?))
                    }
                    other => unreachable!("checked program: '^' on {}", other.kind_name()),
                }
            }
            Expression::Index(index) => {
                let Some(base) = self.try_eval_place(&index.base)? else {
                    return Ok(None);
                };
                let mut indices = Vec::with_capacity(index.indices.len());
                for idx in &index.indices {
                    indices.push(self.eval_integer(idx)?);
                }
                let flat = base.update(|value| match value {
                    Value::Array(array) => array.flat_index(&indices),
                    other => unreachable!("checked program: indexing {}", other.kind_name()),
                });
                match flat {
                    Some(flat) => Ok(Some(base.child(Step::Index(flat)))),
                    None => Err(Diagnostic::range(index.line, "Array index out of range.")),
                }
            }
            Expression::Field(field) => {
                let base_place = self.try_eval_place(&field.base)?;
                let object_id = match &base_place {
                    Some(place) => place.update(|value| match value {
                        Value::Object(id) => Some(*id),
                        _ => None,
                    }),
                    None => match self.eval_expression(&field.base)? {
                        Value::Object(id) => Some(id),
                        _ => return Ok(None),
                    },
                };
                match (object_id, base_place) {
                    (Some(id), _) => {
                        let cell = self
                            .heap_ref()
                            .object(id, field.line)?
                            .field_cell(&field.field)
                            .expect("checked program: object field exists");
                        Ok(Some(Place::direct(cell)))
                    }
                    (None, Some(place)) => {
                        Ok(Some(place.child(Step::Field(field.field.clone()))))
                    }
                    (None, None) => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn eval_place(&mut self, expr: &'a Expression<T>) -> Fallible<Place> {
        Ok(self
            .try_eval_place(expr)?
            .expect("checked program: expression designates a place"))
    }

    fn eval_index_by_value(&mut self, index: &'a Index<T>) -> Fallible<Value> {
        let base = self.eval_expression(&index.base)?;
        let mut indices = Vec::with_capacity(index.indices.len());
        for idx in &index.indices {
            indices.push(self.eval_integer(idx)?);
        }
        match base {
            Value::Array(array) => match array.flat_index(&indices) {
                Some(flat) => Ok(array.elems[flat].clone()),
                None => Err(Diagnostic::range(index.line, "Array index out of range.")),
            },
            other => unreachable!("checked program: indexing {}", other.kind_name()),
        }
    }

    // === operators ===

    fn eval_unary(&mut self, unary: &'a Unary<T>) -> Fallible<Value> {
        if unary.op == UnaryOp::AddressOf {
            let place = self.eval_place(&unary.operand)?;
            let address = self.heap().address_of(place);
            return Ok(Value::Pointer(Some(address)));
        }
        let operand = self.eval_expression(&unary.operand)?;
        let line = unary.line;
        match (unary.op, operand) {
            (UnaryOp::Plus, v @ (Value::Integer(_) | Value::Real(_))) => Ok(v),
            (UnaryOp::Minus, Value::Integer(v)) => Ok(Value::Integer(num::int_neg(v, line)?)),
            (UnaryOp::Minus, Value::Real(v)) => Ok(Value::Real(-v)),
            (UnaryOp::Not, Value::Boolean(v)) => Ok(Value::Boolean(!v)),
            (op, v) => unreachable!("checked program: unary {op:?} on {}", v.kind_name()),
        }
    }

    fn eval_binary(&mut self, binary: &'a Binary<T>) -> Fallible<Value> {
        // Both operands always evaluate; AND/OR do not short-circuit.
        let lhs = self.eval_expression(&binary.lhs)?;
        let rhs = self.eval_expression(&binary.rhs)?;
        apply_binary(binary.op, lhs, rhs, binary.line)
    }

    fn eval_new(&mut self, new: &'a New<T>) -> Fallible<Value> {
        match &new.args {
            Some(args) => {
                let class = match &new.target {
                    TypeExpr::Named(name) => name.clone(),
                    _ => unreachable!("checked program: class NEW names a class"),
                };
                self.construct_object(&class, args, new.line)
            }
            None => {
                let pending = std::collections::HashMap::new();
                let ty = self.resolve_type_rt(&new.target, &pending, new.line)?;
                let value = self.default_value(&ty);
                let address = self.heap().alloc_target(value);
                Ok(Value::Pointer(Some(address)))
            }
        }
    }

    fn eval_call(&mut self, call: &'a Call<T>) -> Fallible<Value> {
        match &*call.callee {
            Expression::Name(name) => {
                if let Some(routine) = self.lookup_routine(&name.name) {
                    let result = self.call_named_routine(&routine, &call.args, call.line)?;
                    return Ok(result.expect("checked program: function returns a value"));
                }
                if let Some(class) = self.frame().and_then(|f| f.class.clone()) {
                    if self.find_method(&class, &name.name).is_some() {
                        let result = self.call_self_method(&name.name, &call.args, call.line)?;
                        return Ok(result.expect("checked program: function returns a value"));
                    }
                }
                self.call_builtin(&name.name, &call.args, call.line)
            }
            Expression::Field(field) => {
                let object = self.eval_expression(&field.base)?;
                let result =
                    self.call_method_on(object, &field.field, &call.args, call.line)?;
                Ok(result.expect("checked program: function returns a value"))
            }
            other => unreachable!("checked program: callee shape {:?}", other.line()),
        }
    }
}

pub(crate) fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value, line: usize) -> Fallible<Value> {
    use BinaryOp::*;
    use Value::*;
    match (op, lhs, rhs) {
        (Add, Integer(a), Integer(b)) => Ok(Integer(num::int_add(a, b, line)?)),
        (Sub, Integer(a), Integer(b)) => Ok(Integer(num::int_sub(a, b, line)?)),
        (Mul, Integer(a), Integer(b)) => Ok(Integer(num::int_mul(a, b, line)?)),
        (IntDiv, Integer(a), Integer(b)) => Ok(Integer(num::int_div(a, b, line)?)),
        (Mod, Integer(a), Integer(b)) => Ok(Integer(num::int_mod(a, b, line)?)),
        (Div, Integer(a), Integer(b)) => Ok(Real(num::real_div(a as f64, b as f64, line)?)),
        (Add, Real(a), Real(b)) => Ok(Real(num::real_add(a, b, line)?)),
        (Sub, Real(a), Real(b)) => Ok(Real(num::real_sub(a, b, line)?)),
        (Mul, Real(a), Real(b)) => Ok(Real(num::real_mul(a, b, line)?)),
        (Div, Real(a), Real(b)) => Ok(Real(num::real_div(a, b, line)?)),
        (Concat, a, b) => {
            let mut text = match a {
                Str(s) => s,
                Char(c) => c.to_string(),
                other => unreachable!("checked program: '&' on {}", other.kind_name()),
            };
            match b {
                Str(s) => text.push_str(&s),
                Char(c) => text.push(c),
                other => unreachable!("checked program: '&' on {}", other.kind_name()),
            }
            Ok(Str(text))
        }
        (And, Boolean(a), Boolean(b)) => Ok(Boolean(a && b)),
        (Or, Boolean(a), Boolean(b)) => Ok(Boolean(a || b)),
        (Eq, a, b) => Ok(Boolean(compare_values(&a, &b) == Ordering::Equal)),
        (Ne, a, b) => Ok(Boolean(compare_values(&a, &b) != Ordering::Equal)),
        (Lt, a, b) => Ok(Boolean(compare_values(&a, &b) == Ordering::Less)),
        (Le, a, b) => Ok(Boolean(compare_values(&a, &b) != Ordering::Greater)),
        (Gt, a, b) => Ok(Boolean(compare_values(&a, &b) == Ordering::Greater)),
        (Ge, a, b) => Ok(Boolean(compare_values(&a, &b) != Ordering::Less)),
        (In, Enum(member), Set(set)) => Ok(Boolean(set.members.contains(&member.ordinal))),
        (Union, Set(a), Set(b)) => Ok(Set(SetValue {
            base: a.base,
            members: a.members.union(&b.members).copied().collect(),
        })),
        (Intersect, Set(a), Set(b)) => Ok(Set(SetValue {
            base: a.base,
            members: a.members.intersection(&b.members).copied().collect(),
        })),
        (Diff, Set(a), Set(b)) => Ok(Set(SetValue {
            base: a.base,
            members: a.members.difference(&b.members).copied().collect(),
        })),
        (op, a, b) => unreachable!(
            "checked program: '{}' on {} and {}",
            op.symbol(),
            a.kind_name(),
            b.kind_name()
        ),
    }
}

/// Total order over comparable runtime values. The checker guarantees
/// both sides share a comparable type.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        (Value::Real(a), Value::Real(b)) => {
            a.partial_cmp(b).expect("reals are never NaN at rest")
        }
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        (Value::Char(a), Value::Char(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Date(a), Value::Date(b)) => a.cmp(b),
        (Value::Enum(a), Value::Enum(b)) => a.ordinal.cmp(&b.ordinal),
        (a, b) => unreachable!(
            "checked program: comparing {} with {}",
            a.kind_name(),
            b.kind_name()
        ),
    }
}
