//! Provide shared, pure helpers and canonical vocabulary for the runtest harness and its embedded runtime.
//!
//! This crate is intentionally small and dependency-free. It holds the pieces that both the syntax
//! frontend and the runtime must agree on:
//! - the reserved words, operators and punctuation of the accepted Python subset ([`lang`]),
//! - the discovery and extraction conventions used by the harness ([`conventions`]),
//! - Python-style sequence indexing and slicing ([`sequences`]),
//! - Python-style integer and float semantics (floor division, modulo, float repr).
//!
//! ## Notes
//!
//! - No IO, no global state and no AST types live here.

pub mod conventions;
pub mod lang;
pub mod sequences;

/// Python-style modulo for `i64`: the result takes the sign of the divisor.
///
/// ## Returns
/// - `None` when `b == 0` (callers raise `ZeroDivisionError`).
///
/// ## Examples
/// ```rust
/// use runtest_core::py_mod_i64;
///
/// assert_eq!(py_mod_i64(-7, 3), Some(2));
/// assert_eq!(py_mod_i64(7, -3), Some(-2));
/// ```
pub fn py_mod_i64(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

/// Python-style floor division for `i64`: rounds toward negative infinity.
///
/// ## Returns
/// - `None` when `b == 0` or the quotient overflows (`i64::MIN // -1`).
pub fn py_floor_div_i64(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let q = a.checked_div(b)?;
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

/// Python-style modulo for `f64`.
pub fn py_mod_f64(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 {
        return None;
    }
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

/// Python-style floor division for `f64`.
pub fn py_floor_div_f64(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 {
        return None;
    }
    Some((a / b).floor())
}

/// Render a float the way Python's `repr(float)` does.
///
/// Integral values keep a trailing `.0`, very large or very small magnitudes switch to exponent
/// notation, and the special values print as `inf`, `-inf` and `nan`.
///
/// ## Examples
/// ```rust
/// use runtest_core::py_float_repr;
///
/// assert_eq!(py_float_repr(3.0), "3.0");
/// assert_eq!(py_float_repr(0.1), "0.1");
/// assert_eq!(py_float_repr(1e20), "1e+20");
/// ```
pub fn py_float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        // Rust prints `1e20` / `1.5e-7`; Python wants an explicit sign and two exponent digits.
        let raw = format!("{value:e}");
        let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(rest) => ('-', rest),
            None => ('+', exponent),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    let text = format!("{value}");
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mod_follows_divisor_sign() {
        assert_eq!(py_mod_i64(7, 3), Some(1));
        assert_eq!(py_mod_i64(-7, 3), Some(2));
        assert_eq!(py_mod_i64(7, -3), Some(-2));
        assert_eq!(py_mod_i64(-7, -3), Some(-1));
        assert_eq!(py_mod_i64(1, 0), None);
    }

    #[test]
    fn test_floor_div_rounds_down() {
        assert_eq!(py_floor_div_i64(7, 2), Some(3));
        assert_eq!(py_floor_div_i64(-7, 2), Some(-4));
        assert_eq!(py_floor_div_i64(i64::MIN, -1), None);
        assert_eq!(py_floor_div_f64(-7.0, 2.0), Some(-4.0));
        assert_eq!(py_mod_f64(-1.0, 3.0), Some(2.0));
    }

    #[test]
    fn test_float_repr() {
        assert_eq!(py_float_repr(1.5), "1.5");
        assert_eq!(py_float_repr(-2.0), "-2.0");
        assert_eq!(py_float_repr(0.0), "0.0");
        assert_eq!(py_float_repr(1e-5), "1e-05");
        assert_eq!(py_float_repr(2.5e20), "2.5e+20");
        assert_eq!(py_float_repr(f64::NAN), "nan");
        assert_eq!(py_float_repr(f64::NEG_INFINITY), "-inf");
    }

    proptest! {
        #[test]
        fn prop_floor_div_and_mod_recombine(a in -10_000i64..10_000, b in -100i64..100) {
            prop_assume!(b != 0);
            let q = py_floor_div_i64(a, b).unwrap();
            let r = py_mod_i64(a, b).unwrap();
            prop_assert_eq!(q * b + r, a);
            prop_assert!(r == 0 || (r < 0) == (b < 0));
        }
    }
}
