//! Runtime scopes and registries.
//!
//! The interpreter mirrors the checker's scope discipline: a stack of
//! lexical scopes, call-frame floors that hide enclosing locals while
//! keeping the global frame visible, and per-scope registries for
//! routines and named types. Class metadata is global (class names are
//! unique program-wide).

use std::collections::HashMap;

use crate::ast::{Access, Routine};
use crate::types::symbols::TypeInfo;
use crate::types::Type;

use super::place::Place;

/// A variable (or constant) slot. `locked` marks active loop counters.
#[derive(Debug, Clone)]
pub struct Binding {
    pub place: Place,
    pub locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Procedure,
    Function,
}

pub struct RoutineRef<'a, T> {
    pub routine: &'a Routine<T>,
    pub kind: RoutineKind,
}

impl<T> Clone for RoutineRef<'_, T> {
    fn clone(&self) -> Self {
        RoutineRef {
            routine: self.routine,
            kind: self.kind,
        }
    }
}

pub struct RtField {
    pub name: String,
    pub ty: Type,
    pub access: Access,
}

pub struct RtMethod<'a, T> {
    pub name: String,
    pub routine: &'a Routine<T>,
    pub is_function: bool,
    pub access: Access,
}

/// Runtime class metadata: own members only; lookups walk the chain.
pub struct RtClass<'a, T> {
    pub name: String,
    pub base: Option<String>,
    pub fields: Vec<RtField>,
    pub methods: Vec<RtMethod<'a, T>>,
    pub constructor: Option<&'a Routine<T>>,
}

/// One lexical scope frame.
pub struct Scope<'a, T> {
    pub vars: HashMap<String, Binding>,
    pub routines: HashMap<String, RoutineRef<'a, T>>,
    pub types: HashMap<String, TypeInfo>,
}

impl<T> Default for Scope<'_, T> {
    fn default() -> Self {
        Scope {
            vars: HashMap::new(),
            routines: HashMap::new(),
            types: HashMap::new(),
        }
    }
}

/// Book-keeping for one call: where its scopes start and which class
/// context (if any) its body executes in.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub floor: usize,
    pub class: Option<String>,
    pub self_object: Option<usize>,
    pub in_constructor: bool,
}
