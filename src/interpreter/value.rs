//! Runtime values.
//!
//! Composite values (arrays, records, sets) own their storage, so a
//! `clone` is the deep copy assignment semantics require. Pointers and
//! class references hold heap ids and copy by reference. File handles
//! share their session through `Rc<RefCell<…>>` so every alias of the
//! cell observes the same cursor and buffers.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::date::Date;

use super::files::{RandomFile, TextFile};

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i32),
    Real(f64),
    Boolean(bool),
    Char(char),
    Str(String),
    Date(Date),
    Array(ArrayValue),
    Record(RecordValue),
    Set(SetValue),
    Enum(EnumValue),
    /// Heap address of a pointer target, or null.
    Pointer(Option<usize>),
    /// Heap object id of a class instance, or null.
    Object(Option<usize>),
    TextFile(Rc<RefCell<TextFile>>),
    RandomFile(Rc<RefCell<RandomFile>>),
}

/// Row-major storage with inclusive per-dimension bounds.
#[derive(Debug, Clone)]
pub struct ArrayValue {
    pub bounds: Vec<(i32, i32)>,
    pub elems: Vec<Value>,
}

impl ArrayValue {
    /// Flatten an index list, checking every dimension.
    pub fn flat_index(&self, indices: &[i32]) -> Option<usize> {
        debug_assert_eq!(indices.len(), self.bounds.len());
        let mut flat = 0usize;
        for (&index, &(low, high)) in indices.iter().zip(&self.bounds) {
            if index < low || index > high {
                return None;
            }
            let width = (high - low + 1) as usize;
            flat = flat * width + (index - low) as usize;
        }
        Some(flat)
    }
}

#[derive(Debug, Clone)]
pub struct RecordValue {
    pub name: String,
    pub fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(f, _)| f == name).map(|(_, v)| v)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(f, _)| f == name)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone)]
pub struct SetValue {
    /// Name of the base enumeration.
    pub base: String,
    /// Member ordinals, kept sorted for deterministic iteration.
    pub members: BTreeSet<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub enum_name: String,
    pub ordinal: i32,
}

impl Value {
    /// Short description for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Boolean(_) => "BOOLEAN",
            Value::Char(_) => "CHAR",
            Value::Str(_) => "STRING",
            Value::Date(_) => "DATE",
            Value::Array(_) => "an array",
            Value::Record(_) => "a record",
            Value::Set(_) => "a set",
            Value::Enum(_) => "an enum value",
            Value::Pointer(_) => "a pointer",
            Value::Object(_) => "a class reference",
            Value::TextFile(_) => "a text file",
            Value::RandomFile(_) => "a random file",
        }
    }
}
