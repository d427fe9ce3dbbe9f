//! Diagnostics shared by every pipeline stage.
//!
//! A failure anywhere in the pipeline produces exactly one [`Diagnostic`]:
//! an [`ErrorKind`], the source line it originated from, and a message.
//! Rendering follows the wire format the host prints on stderr:
//!
//! ```text
//! <ErrorKind> at line <N>: <message>
//! ```

use std::fmt;

/// The seven diagnostic categories a Prescribe program can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lexical or grammar failure, invalid escape, duplicate case label.
    Syntax,
    /// Undeclared identifier, missing field or method.
    Name,
    /// Operand, argument, or assignment type mismatch; non-lvalue where
    /// an lvalue is required.
    Type,
    /// Integer or real overflow, out-of-bounds index, bad numeric
    /// argument to a built-in, invalid Gregorian date.
    Range,
    /// Division by zero, NaN result, null dereference, missing RETURN,
    /// zero FOR step, exhausted input.
    Runtime,
    /// Bad file mode, I/O on a closed or incompatible handle, read past
    /// end, invalid record access.
    File,
    /// Assignment to a constant or loop counter, private member access
    /// outside its owning class.
    Access,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Name => "NameError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::File => "FileError",
            ErrorKind::Access => "AccessError",
        };
        write!(f, "{name}")
    }
}

/// A typed error with the source line it was first detected on.
///
/// Diagnostics propagate upward unconditionally; nothing inside the
/// interpreter recovers from one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}: {message}")]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }

    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, line, message)
    }

    pub fn name(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Name, line, message)
    }

    pub fn type_error(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, line, message)
    }

    pub fn range(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, line, message)
    }

    pub fn runtime(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, line, message)
    }

    pub fn file(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::File, line, message)
    }

    pub fn access(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Access, line, message)
    }
}

/// Result alias used across the pipeline.
pub type Fallible<T> = Result<T, Diagnostic>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_wire_format() {
        let diag = Diagnostic::runtime(3, "Null dereference.");
        assert_eq!(diag.to_string(), "RuntimeError at line 3: Null dereference.");
    }

    #[test]
    fn kind_names() {
        assert_eq!(ErrorKind::Syntax.to_string(), "SyntaxError");
        assert_eq!(ErrorKind::Access.to_string(), "AccessError");
    }
}
