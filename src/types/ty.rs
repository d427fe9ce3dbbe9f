//! Semantic type representations.
//!
//! Records, enums, sets, and classes are nominal: the type value holds
//! the declared name and the checker's tables hold the definition. That
//! keeps mutually recursive shapes (`RECORD` containing `POINTER TO`
//! itself) finite. Arrays are structural: bounds and element type
//! compare recursively.
//!
//! Type equality is `PartialEq` on this enum. Assignability adds two
//! cases on top of it — `NULL` into any pointer or class slot, and a
//! derived class reference into a base-class slot — and therefore lives
//! on the checker, which knows the class hierarchy.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Integer,
    Real,
    Boolean,
    Char,
    String,
    Date,
    /// Inclusive bounds per dimension, then the element type.
    Array {
        bounds: Vec<(i32, i32)>,
        elem: Box<Type>,
    },
    /// Named record type.
    Record(std::string::String),
    /// Named enumeration type.
    Enum(std::string::String),
    /// Set over the named enumeration.
    Set(std::string::String),
    Pointer(Box<Type>),
    /// Named class type.
    Class(std::string::String),
    TextFile,
    /// Random-access file of the named record type.
    RandomFile(std::string::String),
    /// The type of the `NULL` literal.
    Null,
}

impl Type {
    /// Types `=` and `<>` accept.
    pub fn is_equatable(&self) -> bool {
        matches!(
            self,
            Type::Integer
                | Type::Real
                | Type::Boolean
                | Type::Char
                | Type::String
                | Type::Date
                | Type::Enum(_)
        )
    }

    /// Types the ordering comparisons accept.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Type::Integer | Type::Real | Type::Char | Type::String | Type::Date | Type::Enum(_)
        )
    }

    /// Scalar types `INPUT`/`READFILE` can parse into.
    pub fn is_inputtable(&self) -> bool {
        matches!(
            self,
            Type::Integer
                | Type::Real
                | Type::Boolean
                | Type::Char
                | Type::String
                | Type::Date
                | Type::Enum(_)
        )
    }

    /// Scalar types `OUTPUT`/`STRING` can render.
    pub fn is_outputtable(&self) -> bool {
        self.is_inputtable()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "INTEGER"),
            Type::Real => write!(f, "REAL"),
            Type::Boolean => write!(f, "BOOLEAN"),
            Type::Char => write!(f, "CHAR"),
            Type::String => write!(f, "STRING"),
            Type::Date => write!(f, "DATE"),
            Type::Array { bounds, elem } => {
                write!(f, "ARRAY[")?;
                for (i, (low, high)) in bounds.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{low}:{high}")?;
                }
                write!(f, "] OF {elem}")
            }
            Type::Record(name) => write!(f, "{name}"),
            Type::Enum(name) => write!(f, "{name}"),
            Type::Set(name) => write!(f, "SET OF {name}"),
            Type::Pointer(target) => write!(f, "POINTER TO {target}"),
            Type::Class(name) => write!(f, "{name}"),
            Type::TextFile => write!(f, "TEXTFILE"),
            Type::RandomFile(name) => write!(f, "RANDOMFILE OF {name}"),
            Type::Null => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_equality_is_structural() {
        let a = Type::Array {
            bounds: vec![(1, 10)],
            elem: Box::new(Type::Integer),
        };
        let b = Type::Array {
            bounds: vec![(1, 10)],
            elem: Box::new(Type::Integer),
        };
        let c = Type::Array {
            bounds: vec![(0, 9)],
            elem: Box::new(Type::Integer),
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn named_types_compare_by_name() {
        assert_eq!(Type::Enum("Color".into()), Type::Enum("Color".into()));
        assert_ne!(Type::Enum("Color".into()), Type::Enum("Season".into()));
        assert_ne!(Type::Record("R".into()), Type::Class("R".into()));
    }

    #[test]
    fn comparability_sets() {
        assert!(Type::Boolean.is_equatable());
        assert!(!Type::Boolean.is_ordered());
        assert!(Type::Date.is_ordered());
        assert!(!Type::Pointer(Box::new(Type::Integer)).is_equatable());
        assert!(!Type::Set("S".into()).is_ordered());
    }

    #[test]
    fn display_forms() {
        let ty = Type::Array {
            bounds: vec![(1, 3), (1, 4)],
            elem: Box::new(Type::Real),
        };
        assert_eq!(ty.to_string(), "ARRAY[1:3, 1:4] OF REAL");
        assert_eq!(
            Type::Pointer(Box::new(Type::Integer)).to_string(),
            "POINTER TO INTEGER"
        );
    }
}
