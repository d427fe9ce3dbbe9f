//! Range-checked numeric primitives.
//!
//! Every arithmetic operator in the language funnels through these
//! helpers so overflow and division behavior is identical in the
//! constant evaluator and the interpreter:
//!
//! - integers are 32-bit and trap on any result outside
//!   `[-2^31, 2^31 - 1]`
//! - `DIV`/`MOD` are Euclidean: for `b ≠ 0` the pair `(q, r)` satisfies
//!   `a = b·q + r` with `0 ≤ r < |b|`
//! - reals are IEEE-754 doubles that are never allowed to rest at NaN
//!   or an infinity

use crate::error::{Diagnostic, Fallible};

pub fn int_add(a: i32, b: i32, line: usize) -> Fallible<i32> {
    a.checked_add(b)
        .ok_or_else(|| Diagnostic::range(line, "Integer overflow."))
}

pub fn int_sub(a: i32, b: i32, line: usize) -> Fallible<i32> {
    a.checked_sub(b)
        .ok_or_else(|| Diagnostic::range(line, "Integer overflow."))
}

pub fn int_mul(a: i32, b: i32, line: usize) -> Fallible<i32> {
    a.checked_mul(b)
        .ok_or_else(|| Diagnostic::range(line, "Integer overflow."))
}

pub fn int_neg(a: i32, line: usize) -> Fallible<i32> {
    a.checked_neg()
        .ok_or_else(|| Diagnostic::range(line, "Integer overflow."))
}

/// Euclidean quotient. `-7 DIV 3 = -3`.
pub fn int_div(a: i32, b: i32, line: usize) -> Fallible<i32> {
    if b == 0 {
        return Err(Diagnostic::runtime(line, "Division by zero."));
    }
    a.checked_div_euclid(b)
        .ok_or_else(|| Diagnostic::range(line, "Integer overflow."))
}

/// Euclidean remainder, always in `[0, |b|)`. `-7 MOD 3 = 2`.
pub fn int_mod(a: i32, b: i32, line: usize) -> Fallible<i32> {
    if b == 0 {
        return Err(Diagnostic::runtime(line, "Division by zero."));
    }
    a.checked_rem_euclid(b)
        .ok_or_else(|| Diagnostic::range(line, "Integer overflow."))
}

/// Reject NaN and infinite results before they can be observed.
pub fn check_real(x: f64, line: usize) -> Fallible<f64> {
    if x.is_nan() {
        Err(Diagnostic::runtime(line, "Real arithmetic produced NaN."))
    } else if x.is_infinite() {
        Err(Diagnostic::range(line, "Real overflow."))
    } else {
        Ok(x)
    }
}

pub fn real_add(a: f64, b: f64, line: usize) -> Fallible<f64> {
    check_real(a + b, line)
}

pub fn real_sub(a: f64, b: f64, line: usize) -> Fallible<f64> {
    check_real(a - b, line)
}

pub fn real_mul(a: f64, b: f64, line: usize) -> Fallible<f64> {
    check_real(a * b, line)
}

pub fn real_div(a: f64, b: f64, line: usize) -> Fallible<f64> {
    if b == 0.0 {
        return Err(Diagnostic::runtime(line, "Division by zero."));
    }
    check_real(a / b, line)
}

/// Truncate toward zero, the semantics of the `INT` built-in.
pub fn real_to_int(x: f64, line: usize) -> Fallible<i32> {
    let t = x.trunc();
    if t < i32::MIN as f64 || t > i32::MAX as f64 {
        Err(Diagnostic::range(line, "Real value out of INTEGER range."))
    } else {
        Ok(t as i32)
    }
}

/// Render a real the way `OUTPUT` and `STRING` do: fixed point with up
/// to six fractional digits, ties rounded away from zero, trailing
/// zeros and an isolated trailing point removed.
pub fn format_real(x: f64) -> String {
    let negative = x < 0.0;
    let magnitude = x.abs();
    let mut whole = magnitude.trunc();
    // The fractional part is exact here, so scaling by 10^6 and adding
    // one half implements half-away-from-zero on the sixth digit.
    let mut scaled = ((magnitude - whole) * 1_000_000.0 + 0.5).floor() as u64;
    if scaled >= 1_000_000 {
        whole += 1.0;
        scaled -= 1_000_000;
    }

    let mut text = format!("{whole:.0}");
    if scaled > 0 {
        let mut frac = format!("{scaled:06}");
        while frac.ends_with('0') {
            frac.pop();
        }
        text.push('.');
        text.push_str(&frac);
    }
    if negative && text != "0" {
        text.insert(0, '-');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_div_mod() {
        assert_eq!(int_div(-7, 3, 1).unwrap(), -3);
        assert_eq!(int_mod(-7, 3, 1).unwrap(), 2);
        assert_eq!(int_div(7, -3, 1).unwrap(), -2);
        assert_eq!(int_mod(7, -3, 1).unwrap(), 1);
        // a = b*q + r holds across sign combinations
        for &(a, b) in &[(7, 3), (-7, 3), (7, -3), (-7, -3)] {
            let q = int_div(a, b, 1).unwrap();
            let r = int_mod(a, b, 1).unwrap();
            assert_eq!(a, b * q + r);
            assert!(r >= 0 && r < b.abs());
        }
    }

    #[test]
    fn overflow_traps() {
        assert!(int_add(i32::MAX, 1, 1).is_err());
        assert!(int_mul(1 << 20, 1 << 20, 1).is_err());
        assert!(int_div(i32::MIN, -1, 1).is_err());
        assert!(int_neg(i32::MIN, 1).is_err());
    }

    #[test]
    fn division_by_zero() {
        let err = int_div(1, 0, 4).unwrap_err();
        assert_eq!(err.to_string(), "RuntimeError at line 4: Division by zero.");
        assert!(real_div(1.0, 0.0, 4).is_err());
    }

    #[test]
    fn real_guards() {
        assert!(real_mul(1e308, 1e10, 1).is_err());
        assert!(check_real(f64::NAN, 1).is_err());
        assert_eq!(real_add(1.5, 2.25, 1).unwrap(), 3.75);
    }

    #[test]
    fn formats_reals() {
        assert_eq!(format_real(20.0), "20");
        assert_eq!(format_real(0.5), "0.5");
        assert_eq!(format_real(-0.5), "-0.5");
        assert_eq!(format_real(1.0 / 3.0), "0.333333");
        assert_eq!(format_real(2.0 / 3.0), "0.666667");
        assert_eq!(format_real(0.0000001), "0");
        assert_eq!(format_real(-0.0000001), "0");
        assert_eq!(format_real(1.9999996), "2");
        // ties on the sixth digit round away from zero
        assert_eq!(format_real(0.0078125), "0.007813");
    }

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(real_to_int(2.9, 1).unwrap(), 2);
        assert_eq!(real_to_int(-2.9, 1).unwrap(), -2);
        assert!(real_to_int(3e9, 1).is_err());
    }
}
