//! Compile-time constant folding.
//!
//! `CONSTANT` declarations, enum member references, array bounds, and
//! case labels are evaluated here while the checker runs. The expression
//! language is deliberately small — literals, previously bound
//! constants, unary `+ - NOT`, binary `+ - * / DIV MOD & AND OR`, and
//! comparisons — and uses the same numeric rules as the interpreter, so
//! a folded overflow diagnoses identically to a runtime one. The
//! evaluator never observes mutable state.

use crate::ast::{BinaryOp, Expression, LiteralValue, UnaryOp};
use crate::date::Date;
use crate::error::{Diagnostic, Fallible};
use crate::num;

use super::ty::Type;

/// A folded constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Integer(i32),
    Real(f64),
    Boolean(bool),
    Char(char),
    Str(String),
    Date(Date),
    /// Enum member: owning enum name and ordinal.
    Enum(String, i32),
}

impl ConstValue {
    pub fn ty(&self) -> Type {
        match self {
            ConstValue::Integer(_) => Type::Integer,
            ConstValue::Real(_) => Type::Real,
            ConstValue::Boolean(_) => Type::Boolean,
            ConstValue::Char(_) => Type::Char,
            ConstValue::Str(_) => Type::String,
            ConstValue::Date(_) => Type::Date,
            ConstValue::Enum(name, _) => Type::Enum(name.clone()),
        }
    }

    fn from_literal(value: &LiteralValue) -> ConstValue {
        match value {
            LiteralValue::Integer(v) => ConstValue::Integer(*v),
            LiteralValue::Real(v) => ConstValue::Real(*v),
            LiteralValue::Boolean(v) => ConstValue::Boolean(*v),
            LiteralValue::Char(v) => ConstValue::Char(*v),
            LiteralValue::Str(v) => ConstValue::Str(v.clone()),
            LiteralValue::Date(v) => ConstValue::Date(*v),
        }
    }
}

/// Evaluate a constant expression, resolving names through `lookup`
/// (which yields previously bound constants and enum members).
pub fn eval<T>(
    expr: &Expression<T>,
    lookup: &dyn Fn(&str) -> Option<ConstValue>,
) -> Fallible<ConstValue> {
    let line = expr.line();
    match expr {
        Expression::Literal(lit) => Ok(ConstValue::from_literal(&lit.value)),
        Expression::Name(name) => lookup(&name.name).ok_or_else(|| {
            Diagnostic::syntax(
                line,
                format!("'{}' is not a constant.", name.name),
            )
        }),
        Expression::Unary(unary) => {
            let operand = eval(&unary.operand, lookup)?;
            match (unary.op, operand) {
                (UnaryOp::Plus, v @ (ConstValue::Integer(_) | ConstValue::Real(_))) => Ok(v),
                (UnaryOp::Minus, ConstValue::Integer(v)) => {
                    Ok(ConstValue::Integer(num::int_neg(v, line)?))
                }
                (UnaryOp::Minus, ConstValue::Real(v)) => Ok(ConstValue::Real(-v)),
                (UnaryOp::Not, ConstValue::Boolean(v)) => Ok(ConstValue::Boolean(!v)),
                (_, v) => Err(Diagnostic::type_error(
                    line,
                    format!("Invalid constant operand {} for unary operator.", v.ty()),
                )),
            }
        }
        Expression::Binary(binary) => {
            let lhs = eval(&binary.lhs, lookup)?;
            let rhs = eval(&binary.rhs, lookup)?;
            eval_binary(binary.op, lhs, rhs, line)
        }
        _ => Err(Diagnostic::syntax(
            line,
            "Expression is not a compile-time constant.",
        )),
    }
}

fn eval_binary(op: BinaryOp, lhs: ConstValue, rhs: ConstValue, line: usize) -> Fallible<ConstValue> {
    use ConstValue::*;
    match (op, lhs, rhs) {
        (BinaryOp::Add, Integer(a), Integer(b)) => Ok(Integer(num::int_add(a, b, line)?)),
        (BinaryOp::Sub, Integer(a), Integer(b)) => Ok(Integer(num::int_sub(a, b, line)?)),
        (BinaryOp::Mul, Integer(a), Integer(b)) => Ok(Integer(num::int_mul(a, b, line)?)),
        (BinaryOp::IntDiv, Integer(a), Integer(b)) => Ok(Integer(num::int_div(a, b, line)?)),
        (BinaryOp::Mod, Integer(a), Integer(b)) => Ok(Integer(num::int_mod(a, b, line)?)),
        (BinaryOp::Div, Integer(a), Integer(b)) => {
            Ok(Real(num::real_div(a as f64, b as f64, line)?))
        }
        (BinaryOp::Add, Real(a), Real(b)) => Ok(Real(num::real_add(a, b, line)?)),
        (BinaryOp::Sub, Real(a), Real(b)) => Ok(Real(num::real_sub(a, b, line)?)),
        (BinaryOp::Mul, Real(a), Real(b)) => Ok(Real(num::real_mul(a, b, line)?)),
        (BinaryOp::Div, Real(a), Real(b)) => Ok(Real(num::real_div(a, b, line)?)),
        (BinaryOp::Concat, lhs, rhs) => {
            let mut text = const_text(&lhs, line)?;
            text.push_str(&const_text(&rhs, line)?);
            Ok(Str(text))
        }
        (BinaryOp::And, Boolean(a), Boolean(b)) => Ok(Boolean(a && b)),
        (BinaryOp::Or, Boolean(a), Boolean(b)) => Ok(Boolean(a || b)),
        (BinaryOp::Eq, lhs, rhs) => compare(lhs, rhs, line).map(|o| Boolean(o == Order::Equal)),
        (BinaryOp::Ne, lhs, rhs) => compare(lhs, rhs, line).map(|o| Boolean(o != Order::Equal)),
        (BinaryOp::Lt, lhs, rhs) => compare(lhs, rhs, line).map(|o| Boolean(o == Order::Less)),
        (BinaryOp::Le, lhs, rhs) => compare(lhs, rhs, line).map(|o| Boolean(o != Order::Greater)),
        (BinaryOp::Gt, lhs, rhs) => compare(lhs, rhs, line).map(|o| Boolean(o == Order::Greater)),
        (BinaryOp::Ge, lhs, rhs) => compare(lhs, rhs, line).map(|o| Boolean(o != Order::Less)),
        (op, lhs, rhs) => Err(Diagnostic::type_error(
            line,
            format!(
                "Operator '{}' cannot fold operands {} and {}.",
                op.symbol(),
                lhs.ty(),
                rhs.ty()
            ),
        )),
    }
}

fn const_text(value: &ConstValue, line: usize) -> Fallible<String> {
    match value {
        ConstValue::Str(s) => Ok(s.clone()),
        ConstValue::Char(c) => Ok(c.to_string()),
        other => Err(Diagnostic::type_error(
            line,
            format!("Operator '&' requires STRING or CHAR, found {}.", other.ty()),
        )),
    }
}

#[derive(PartialEq, Clone, Copy)]
enum Order {
    Less,
    Equal,
    Greater,
}

fn compare(lhs: ConstValue, rhs: ConstValue, line: usize) -> Fallible<Order> {
    use ConstValue::*;
    let order = |o: std::cmp::Ordering| match o {
        std::cmp::Ordering::Less => Order::Less,
        std::cmp::Ordering::Equal => Order::Equal,
        std::cmp::Ordering::Greater => Order::Greater,
    };
    match (&lhs, &rhs) {
        (Integer(a), Integer(b)) => Ok(order(a.cmp(b))),
        (Real(a), Real(b)) => Ok(order(a.partial_cmp(b).expect("reals are never NaN at rest"))),
        (Boolean(a), Boolean(b)) => Ok(order(a.cmp(b))),
        (Char(a), Char(b)) => Ok(order(a.cmp(b))),
        (Str(a), Str(b)) => Ok(order(a.cmp(b))),
        (Date(a), Date(b)) => Ok(order(a.cmp(b))),
        (Enum(na, a), Enum(nb, b)) if na == nb => Ok(order(a.cmp(b))),
        _ => Err(Diagnostic::type_error(
            line,
            format!("Cannot compare {} with {}.", lhs.ty(), rhs.ty()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn fold(source: &str) -> Fallible<ConstValue> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let expr = Parser::new(tokens).parse_expression().unwrap();
        eval(&expr, &|name| match name {
            "Three" => Some(ConstValue::Integer(3)),
            "Red" => Some(ConstValue::Enum("Color".into(), 0)),
            _ => None,
        })
    }

    #[test]
    fn folds_arithmetic() {
        assert_eq!(fold("2 + 3 * 4").unwrap(), ConstValue::Integer(14));
        assert_eq!(fold("-7 MOD 3").unwrap(), ConstValue::Integer(2));
        assert_eq!(fold("-7 DIV 3").unwrap(), ConstValue::Integer(-3));
        assert_eq!(fold("1 / 2").unwrap(), ConstValue::Real(0.5));
    }

    #[test]
    fn folds_named_constants() {
        assert_eq!(fold("Three * Three").unwrap(), ConstValue::Integer(9));
        assert_eq!(fold("Red").unwrap(), ConstValue::Enum("Color".into(), 0));
        assert!(fold("Unknown").is_err());
    }

    #[test]
    fn folds_booleans_and_comparisons() {
        assert_eq!(fold("NOT TRUE OR TRUE").unwrap(), ConstValue::Boolean(true));
        assert_eq!(fold("2 < 3").unwrap(), ConstValue::Boolean(true));
        assert_eq!(fold("'a' = 'b'").unwrap(), ConstValue::Boolean(false));
    }

    #[test]
    fn folds_concatenation() {
        assert_eq!(fold("\"ab\" & 'c'").unwrap(), ConstValue::Str("abc".into()));
    }

    #[test]
    fn folding_traps_overflow_and_zero_division() {
        assert!(fold("2147483647 + 1").is_err());
        let err = fold("1 DIV 0").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Runtime);
    }

    #[test]
    fn rejects_non_constant_forms() {
        assert!(fold("LENGTH(\"x\")").is_err());
    }
}
