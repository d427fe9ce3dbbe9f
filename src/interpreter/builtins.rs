//! The standard library.
//!
//! Every built-in is total: it returns a value or raises a typed
//! diagnostic. String positions are 1-based and counted in code
//! points. `BOOLEAN` and `DATE` conversions accept exactly what
//! `INPUT` accepts for those types.

use crate::ast::Expression;
use crate::error::{Diagnostic, Fallible};
use crate::num;

use super::value::{EnumValue, Value};
use super::Interpreter;

impl<'a, T> Interpreter<'a, T> {
    pub(crate) fn call_builtin(
        &mut self,
        name: &str,
        args: &'a [Expression<T>],
        line: usize,
    ) -> Fallible<Value> {
        // ENUMVALUE's first argument is a type name, not a value.
        if name == "ENUMVALUE" {
            let enum_name = match &args[0] {
                Expression::Name(n) => n.name.clone(),
                _ => unreachable!("checked program: ENUMVALUE names an enum"),
            };
            let ordinal = self.eval_integer(&args[1])?;
            let count = self
                .enum_members(&enum_name)
                .expect("checked program: enum is registered")
                .len();
            if ordinal < 0 || ordinal as usize >= count {
                return Err(Diagnostic::range(
                    line,
                    format!("Ordinal {ordinal} out of range for '{enum_name}'."),
                ));
            }
            return Ok(Value::Enum(EnumValue {
                enum_name,
                ordinal,
            }));
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expression(arg)?);
        }

        match (name, values.as_slice()) {
            ("LENGTH", [Value::Str(s)]) => Ok(Value::Integer(s.chars().count() as i32)),
            ("RIGHT", [Value::Str(s), Value::Integer(n)]) => right(s, *n, line),
            ("MID", [Value::Str(s), Value::Integer(start), Value::Integer(n)]) => {
                mid(s, *start, *n, line)
            }
            ("LCASE", [Value::Str(s)]) => Ok(Value::Str(s.to_ascii_lowercase())),
            ("UCASE", [Value::Str(s)]) => Ok(Value::Str(s.to_ascii_uppercase())),
            ("INT", [Value::Real(x)]) => Ok(Value::Integer(num::real_to_int(*x, line)?)),
            ("REAL", [Value::Integer(n)]) => Ok(Value::Real(*n as f64)),
            ("STRING", [value]) => Ok(Value::Str(self.value_to_text(value, line)?)),
            ("CHAR", [Value::Integer(n)]) => {
                if !(0..=127).contains(n) {
                    return Err(Diagnostic::range(
                        line,
                        format!("CHAR argument {n} outside 0..127."),
                    ));
                }
                Ok(Value::Char(*n as u8 as char))
            }
            ("BOOLEAN", [Value::Str(s)]) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Ok(Value::Boolean(true))
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Ok(Value::Boolean(false))
                } else {
                    Err(Diagnostic::runtime(
                        line,
                        format!("Invalid BOOLEAN '{s}'."),
                    ))
                }
            }
            ("DATE", [Value::Str(s)]) => {
                crate::date::Date::parse(s, line).map(Value::Date)
            }
            ("ORD", [Value::Enum(e)]) => Ok(Value::Integer(e.ordinal)),
            ("SIZE", [Value::Set(set)]) => Ok(Value::Integer(set.members.len() as i32)),
            ("RAND", []) => Ok(Value::Real(self.next_rand())),
            (name, _) => unreachable!("checked program: builtin '{name}' argument shapes"),
        }
    }
}

/// Last `n` code points of `s`.
fn right(s: &str, n: i32, line: usize) -> Fallible<Value> {
    let len = s.chars().count();
    if n < 0 || n as usize > len {
        return Err(Diagnostic::range(
            line,
            format!("RIGHT count {n} out of range for a string of length {len}."),
        ));
    }
    Ok(Value::Str(s.chars().skip(len - n as usize).collect()))
}

/// 1-based substring of `n` code points starting at `start`.
fn mid(s: &str, start: i32, n: i32, line: usize) -> Fallible<Value> {
    let len = s.chars().count();
    let valid = start >= 1 && n >= 0 && (start as usize - 1) + n as usize <= len;
    if !valid {
        return Err(Diagnostic::range(
            line,
            format!("MID({start}, {n}) out of range for a string of length {len}."),
        ));
    }
    Ok(Value::Str(
        s.chars().skip(start as usize - 1).take(n as usize).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_takes_code_points() {
        assert!(matches!(right("hello", 3, 1).unwrap(), Value::Str(s) if s == "llo"));
        assert!(matches!(right("hello", 0, 1).unwrap(), Value::Str(s) if s.is_empty()));
        assert!(right("hello", 6, 1).is_err());
        assert!(right("hello", -1, 1).is_err());
    }

    #[test]
    fn mid_is_one_based() {
        assert!(matches!(mid("pseudo", 2, 3, 1).unwrap(), Value::Str(s) if s == "seu"));
        assert!(matches!(mid("pseudo", 1, 6, 1).unwrap(), Value::Str(s) if s == "pseudo"));
        // n = 0 yields the empty string
        assert!(matches!(mid("pseudo", 7, 0, 1).unwrap(), Value::Str(s) if s.is_empty()));
        assert!(mid("pseudo", 0, 1, 1).is_err());
        assert!(mid("pseudo", 5, 3, 1).is_err());
    }
}
