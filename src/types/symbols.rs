//! Symbol table, nested scopes, and class metadata.
//!
//! Each block pushes a scope frame; a name resolves to at most one
//! symbol in the innermost frame that defines it. Classes get a
//! [`ClassInfo`] collecting ordered fields, methods, the (at most one)
//! constructor, and the base name — method and field lookup walk the
//! base chain through the table that owns them.

use std::collections::HashMap;

use crate::ast::{Access, ParamMode};
use crate::error::{Diagnostic, Fallible};

use super::consteval::ConstValue;
use super::ty::Type;

/// A routine's checked signature.
#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<(String, ParamMode, Type)>,
    pub returns: Option<Type>,
    pub line: usize,
}

/// Definition payload of a named type.
#[derive(Debug, Clone)]
pub enum TypeInfo {
    Alias(Type),
    Enum(Vec<String>),
    Record(Vec<(String, Type)>),
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Var { ty: Type, locked: bool },
    Const { value: ConstValue },
    Type(TypeInfo),
    Proc(Signature),
    Func(Signature),
    Class,
}

impl Symbol {
    pub fn describe(&self) -> &'static str {
        match self {
            Symbol::Var { .. } => "a variable",
            Symbol::Const { .. } => "a constant",
            Symbol::Type(_) => "a type",
            Symbol::Proc(_) => "a procedure",
            Symbol::Func(_) => "a function",
            Symbol::Class => "a class",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Type,
    pub access: Access,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub access: Access,
    pub signature: Signature,
    pub is_function: bool,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub base: Option<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub constructor: Option<Signature>,
    pub line: usize,
}

/// Class table with base-chain search helpers.
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: HashMap<String, ClassInfo>,
}

impl ClassTable {
    pub fn insert(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// Find a field walking the base chain; returns the owning class
    /// and the field.
    pub fn find_field<'a>(&'a self, class: &str, field: &str) -> Option<(&'a ClassInfo, &'a FieldInfo)> {
        let mut current = self.classes.get(class);
        while let Some(info) = current {
            if let Some(found) = info.fields.iter().find(|f| f.name == field) {
                return Some((info, found));
            }
            current = info.base.as_deref().and_then(|b| self.classes.get(b));
        }
        None
    }

    /// Find a method walking the base chain; derived definitions win.
    pub fn find_method<'a>(&'a self, class: &str, method: &str) -> Option<(&'a ClassInfo, &'a MethodInfo)> {
        let mut current = self.classes.get(class);
        while let Some(info) = current {
            if let Some(found) = info.methods.iter().find(|m| m.name == method) {
                return Some((info, found));
            }
            current = info.base.as_deref().and_then(|b| self.classes.get(b));
        }
        None
    }

    /// True when `derived` equals `base` or descends from it.
    pub fn descends_from(&self, derived: &str, base: &str) -> bool {
        let mut current = Some(derived);
        while let Some(name) = current {
            if name == base {
                return true;
            }
            current = self
                .classes
                .get(name)
                .and_then(|info| info.base.as_deref());
        }
        false
    }
}

/// A stack of lexical scope frames.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, Symbol>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn enter(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn leave(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Define a name in the innermost frame; redefinition within the
    /// same frame is an error.
    pub fn define(&mut self, name: &str, symbol: Symbol, line: usize) -> Fallible<()> {
        let frame = self.frames.last_mut().expect("scope stack is never empty");
        if frame.contains_key(name) {
            return Err(Diagnostic::syntax(
                line,
                format!("'{name}' is already declared in this scope."),
            ));
        }
        frame.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Resolve a name searching frames within `[floor, len)` from the
    /// innermost outward, then the global frame. Routine bodies pass
    /// their entry depth as `floor` so enclosing locals stay invisible
    /// while globals remain reachable.
    pub fn lookup_from(&self, name: &str, floor: usize) -> Option<&Symbol> {
        for frame in self.frames[floor.min(self.frames.len())..].iter().rev() {
            if let Some(symbol) = frame.get(name) {
                return Some(symbol);
            }
        }
        if floor > 0 {
            return self.frames[0].get(name);
        }
        None
    }

    /// Resolve searching only frames `[floor, len)` — no global
    /// fallback. Used where class members must shadow globals.
    pub fn lookup_above(&self, name: &str, floor: usize) -> Option<&Symbol> {
        for frame in self.frames[floor.min(self.frames.len())..].iter().rev() {
            if let Some(symbol) = frame.get(name) {
                return Some(symbol);
            }
        }
        None
    }

    pub fn lookup_global(&self, name: &str) -> Option<&Symbol> {
        self.frames[0].get(name)
    }

    /// True when the innermost frame itself defines `name`.
    pub fn contains_current(&self, name: &str) -> bool {
        self.frames
            .last()
            .expect("scope stack is never empty")
            .contains_key(name)
    }

    /// Replace a symbol in the innermost frame (record placeholders).
    pub fn update_current(&mut self, name: &str, symbol: Symbol) {
        self.frames
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name.to_string(), symbol);
    }

    pub fn lookup_mut_from(&mut self, name: &str, floor: usize) -> Option<&mut Symbol> {
        let len = self.frames.len();
        let mut index = None;
        for i in (floor.min(len)..len).rev() {
            if self.frames[i].contains_key(name) {
                index = Some(i);
                break;
            }
        }
        if index.is_none() && floor > 0 && self.frames[0].contains_key(name) {
            index = Some(0);
        }
        index.and_then(move |i| self.frames[i].get_mut(name))
    }
}
