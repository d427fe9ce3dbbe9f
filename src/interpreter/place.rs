//! Cells, places, and the heap.
//!
//! A [`Cell`] is one storage slot. A [`Place`] designates somewhere a
//! value can be read or written: a cell plus a chain of index/field
//! steps into the composite stored there. Two places over the same cell
//! and path alias the same storage — that identity is what by-reference
//! parameters and `@` rely on.
//!
//! The [`Heap`] owns pointer targets (`NEW <Type>` allocations and
//! memoized `@` addresses) and class objects. Everything lives until
//! the program terminates; there is no reclamation mid-run.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Diagnostic, Fallible};

use super::value::Value;

pub type Cell = Rc<RefCell<Value>>;

pub fn new_cell(value: Value) -> Cell {
    Rc::new(RefCell::new(value))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Flattened row-major offset into an array.
    Index(usize),
    Field(String),
}

#[derive(Debug, Clone)]
pub struct Place {
    pub cell: Cell,
    pub path: Vec<Step>,
}

impl Place {
    pub fn direct(cell: Cell) -> Self {
        Place {
            cell,
            path: Vec::new(),
        }
    }

    pub fn child(&self, step: Step) -> Self {
        let mut path = self.path.clone();
        path.push(step);
        Place {
            cell: Rc::clone(&self.cell),
            path,
        }
    }

    /// Same storage: same cell, same path.
    pub fn aliases(&self, other: &Place) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell) && self.path == other.path
    }

    pub fn get(&self) -> Value {
        let root = self.cell.borrow();
        let mut current: &Value = &root;
        for step in &self.path {
            current = apply_step(current, step);
        }
        current.clone()
    }

    pub fn set(&self, value: Value) {
        let mut root = self.cell.borrow_mut();
        let mut current: &mut Value = &mut root;
        for step in &self.path {
            current = apply_step_mut(current, step);
        }
        *current = value;
    }

    /// Mutate the value at this place through a closure, avoiding the
    /// get-clone/set round trip for in-place updates.
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut root = self.cell.borrow_mut();
        let mut current: &mut Value = &mut root;
        for step in &self.path {
            current = apply_step_mut(current, step);
        }
        f(current)
    }
}

fn apply_step<'v>(value: &'v Value, step: &Step) -> &'v Value {
    match (value, step) {
        (Value::Array(array), Step::Index(i)) => &array.elems[*i],
        (Value::Record(record), Step::Field(name)) => record
            .field(name)
            .expect("checked program: record field exists"),
        _ => unreachable!("checked program: place path matches value shape"),
    }
}

fn apply_step_mut<'v>(value: &'v mut Value, step: &Step) -> &'v mut Value {
    match (value, step) {
        (Value::Array(array), Step::Index(i)) => &mut array.elems[*i],
        (Value::Record(record), Step::Field(name)) => record
            .field_mut(name)
            .expect("checked program: record field exists"),
        _ => unreachable!("checked program: place path matches value shape"),
    }
}

/// A class instance: runtime class name plus one cell per field,
/// flattened base-first at construction time.
#[derive(Debug)]
pub struct ObjectData {
    pub class: String,
    pub fields: Vec<(String, Cell)>,
}

impl ObjectData {
    pub fn field_cell(&self, name: &str) -> Option<Cell> {
        self.fields
            .iter()
            .find(|(f, _)| f == name)
            .map(|(_, c)| Rc::clone(c))
    }
}

#[derive(Debug, Default)]
pub struct Heap {
    targets: Vec<Place>,
    objects: Vec<ObjectData>,
}

impl Heap {
    /// Allocate a fresh pointer target.
    pub fn alloc_target(&mut self, value: Value) -> usize {
        self.targets.push(Place::direct(new_cell(value)));
        self.targets.len() - 1
    }

    /// Address of an existing place; repeated `@` over the same place
    /// returns the same address.
    pub fn address_of(&mut self, place: Place) -> usize {
        if let Some(found) = self.targets.iter().position(|t| t.aliases(&place)) {
            return found;
        }
        self.targets.push(place);
        self.targets.len() - 1
    }

    pub fn target(&self, address: Option<usize>, line: usize) -> Fallible<Place> {
        match address {
            Some(address) => Ok(self.targets[address].clone()),
            None => Err(Diagnostic::runtime(line, "Null dereference.")),
        }
    }

    pub fn alloc_object(&mut self, object: ObjectData) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn object(&self, id: Option<usize>, line: usize) -> Fallible<&ObjectData> {
        match id {
            Some(id) => Ok(&self.objects[id]),
            None => Err(Diagnostic::runtime(line, "Null class reference.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::value::{ArrayValue, RecordValue};
    use super::*;

    fn sample_array() -> Value {
        Value::Array(ArrayValue {
            bounds: vec![(1, 3)],
            elems: vec![Value::Integer(10), Value::Integer(20), Value::Integer(30)],
        })
    }

    #[test]
    fn place_reads_and_writes_through_paths() {
        let cell = new_cell(sample_array());
        let place = Place::direct(Rc::clone(&cell)).child(Step::Index(1));
        assert!(matches!(place.get(), Value::Integer(20)));
        place.set(Value::Integer(99));
        match &*cell.borrow() {
            Value::Array(array) => assert!(matches!(array.elems[1], Value::Integer(99))),
            other => panic!("unexpected {other:?}"),
        };
    }

    #[test]
    fn nested_record_paths() {
        let record = Value::Record(RecordValue {
            name: "R".into(),
            fields: vec![("Inner".into(), sample_array())],
        });
        let cell = new_cell(record);
        let place = Place::direct(cell)
            .child(Step::Field("Inner".into()))
            .child(Step::Index(2));
        place.set(Value::Integer(7));
        assert!(matches!(place.get(), Value::Integer(7)));
    }

    #[test]
    fn address_of_memoizes() {
        let mut heap = Heap::default();
        let cell = new_cell(Value::Integer(1));
        let place = Place::direct(Rc::clone(&cell));
        let a = heap.address_of(place.clone());
        let b = heap.address_of(place);
        assert_eq!(a, b);
        let other = heap.address_of(Place::direct(new_cell(Value::Integer(1))));
        assert_ne!(a, other);
    }

    #[test]
    fn null_dereference_is_runtime_error() {
        let heap = Heap::default();
        let err = heap.target(None, 3).unwrap_err();
        assert_eq!(err.to_string(), "RuntimeError at line 3: Null dereference.");
    }
}
