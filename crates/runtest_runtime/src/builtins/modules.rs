//! Natively implemented standard modules: `math`, `sys`, `doctest`.

use std::f64::consts;
use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;

use super::{bind_args, native_class, no_keywords};
use crate::interp::{Exec, Interpreter};
use crate::value::{Args, ClassKind, Instance, Namespace, Value};

type NativeFunction = fn(&Interpreter, Args) -> Exec<Value>;

const MATH_FUNCTIONS: &[(&str, NativeFunction)] = &[
    ("sqrt", math_sqrt),
    ("exp", math_exp),
    ("log", math_log),
    ("log10", math_log10),
    ("log2", math_log2),
    ("pow", math_pow),
    ("fabs", math_fabs),
    ("floor", math_floor),
    ("ceil", math_ceil),
    ("trunc", math_trunc),
    ("sin", math_sin),
    ("cos", math_cos),
    ("tan", math_tan),
    ("asin", math_asin),
    ("acos", math_acos),
    ("atan", math_atan),
    ("atan2", math_atan2),
    ("hypot", math_hypot),
    ("copysign", math_copysign),
    ("radians", math_radians),
    ("degrees", math_degrees),
    ("isnan", math_isnan),
    ("isinf", math_isinf),
    ("isfinite", math_isfinite),
    ("isclose", math_isclose),
    ("gcd", math_gcd),
    ("factorial", math_factorial),
    ("fsum", math_fsum),
    ("prod", math_prod),
];

/// The `math` module.
pub(super) fn math() -> Namespace {
    let ns = Namespace::new();
    ns.set("pi", Value::Float(consts::PI));
    ns.set("e", Value::Float(consts::E));
    ns.set("tau", Value::Float(consts::TAU));
    ns.set("inf", Value::Float(f64::INFINITY));
    ns.set("nan", Value::Float(f64::NAN));
    for &(name, func) in MATH_FUNCTIONS {
        ns.set(name, Value::builtin(name, func));
    }
    ns
}

fn real(interp: &Interpreter, value: Option<Value>) -> Exec<f64> {
    let value = value.unwrap_or(Value::None);
    value.as_f64().ok_or_else(|| {
        interp.type_error(format!("must be real number, not {}", interp.type_name(&value)))
    })
}

fn domain_error<T>(interp: &Interpreter) -> Exec<T> {
    interp.raise(ExceptionId::ValueError, "math domain error")
}

/// Result of a float computation, raising like CPython when a finite input overflows.
fn checked(interp: &Interpreter, input: f64, result: f64) -> Exec<Value> {
    if result.is_infinite() && input.is_finite() {
        return interp.raise(ExceptionId::OverflowError, "math range error");
    }
    if result.is_nan() && !input.is_nan() {
        return domain_error(interp);
    }
    Ok(Value::Float(result))
}

fn unary(interp: &Interpreter, args: Args, name: &str, op: fn(f64) -> f64) -> Exec<Value> {
    let [x] = bind_args(interp, name, args, ["x"], 1)?;
    let x = real(interp, x)?;
    checked(interp, x, op(x))
}

fn math_sqrt(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "sqrt", f64::sqrt)
}

fn math_exp(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "exp", f64::exp)
}

fn math_fabs(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "fabs", f64::abs)
}

fn math_sin(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "sin", f64::sin)
}

fn math_cos(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "cos", f64::cos)
}

fn math_tan(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "tan", f64::tan)
}

fn math_asin(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "asin", f64::asin)
}

fn math_acos(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "acos", f64::acos)
}

fn math_atan(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "atan", f64::atan)
}

fn math_radians(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "radians", f64::to_radians)
}

fn math_degrees(interp: &Interpreter, args: Args) -> Exec<Value> {
    unary(interp, args, "degrees", f64::to_degrees)
}

fn logarithm(interp: &Interpreter, x: f64, op: fn(f64) -> f64) -> Exec<f64> {
    if x <= 0.0 || x.is_nan() {
        return domain_error(interp);
    }
    Ok(op(x))
}

fn math_log(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [x, base] = bind_args(interp, "log", args, ["x", "base"], 1)?;
    let x = logarithm(interp, real(interp, x)?, f64::ln)?;
    match base {
        None => Ok(Value::Float(x)),
        Some(base) => {
            let base = logarithm(interp, real(interp, Some(base))?, f64::ln)?;
            if base == 0.0 {
                return interp.raise(ExceptionId::ZeroDivisionError, "float division by zero");
            }
            Ok(Value::Float(x / base))
        }
    }
}

fn math_log10(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [x] = bind_args(interp, "log10", args, ["x"], 1)?;
    Ok(Value::Float(logarithm(interp, real(interp, x)?, f64::log10)?))
}

fn math_log2(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [x] = bind_args(interp, "log2", args, ["x"], 1)?;
    Ok(Value::Float(logarithm(interp, real(interp, x)?, f64::log2)?))
}

fn math_pow(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [x, y] = bind_args(interp, "pow", args, ["x", "y"], 2)?;
    let (x, y) = (real(interp, x)?, real(interp, y)?);
    if x == 0.0 && y < 0.0 {
        return domain_error(interp);
    }
    if x < 0.0 && y.is_finite() && y.fract() != 0.0 {
        return domain_error(interp);
    }
    let result = x.powf(y);
    if result.is_infinite() && x.is_finite() && y.is_finite() {
        return interp.raise(ExceptionId::OverflowError, "math range error");
    }
    Ok(Value::Float(result))
}

/// `floor`/`ceil`/`trunc`: ints pass through, floats round to an int.
fn integral(interp: &Interpreter, args: Args, name: &str, op: fn(f64) -> f64) -> Exec<Value> {
    let [x] = bind_args(interp, name, args, ["x"], 1)?;
    let x = x.unwrap_or(Value::None);
    if let Some(n) = x.as_int() {
        return Ok(Value::Int(n));
    }
    let f = real(interp, Some(x))?;
    if f.is_nan() {
        return interp.raise(ExceptionId::ValueError, "cannot convert float NaN to integer");
    }
    if f.is_infinite() {
        return interp.raise(ExceptionId::OverflowError, "cannot convert float infinity to integer");
    }
    let rounded = op(f);
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return interp.raise(ExceptionId::OverflowError, "integer result too large");
    }
    Ok(Value::Int(rounded as i64))
}

fn math_floor(interp: &Interpreter, args: Args) -> Exec<Value> {
    integral(interp, args, "floor", f64::floor)
}

fn math_ceil(interp: &Interpreter, args: Args) -> Exec<Value> {
    integral(interp, args, "ceil", f64::ceil)
}

fn math_trunc(interp: &Interpreter, args: Args) -> Exec<Value> {
    integral(interp, args, "trunc", f64::trunc)
}

fn math_atan2(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [y, x] = bind_args(interp, "atan2", args, ["y", "x"], 2)?;
    Ok(Value::Float(real(interp, y)?.atan2(real(interp, x)?)))
}

fn math_copysign(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [x, y] = bind_args(interp, "copysign", args, ["x", "y"], 2)?;
    Ok(Value::Float(real(interp, x)?.copysign(real(interp, y)?)))
}

fn math_hypot(interp: &Interpreter, args: Args) -> Exec<Value> {
    no_keywords(interp, "hypot", &args)?;
    let mut total = 0.0_f64;
    for coordinate in args.positional {
        let c = real(interp, Some(coordinate))?;
        total = total.hypot(c);
    }
    Ok(Value::Float(total))
}

fn predicate(interp: &Interpreter, args: Args, name: &str, test: fn(f64) -> bool) -> Exec<Value> {
    let [x] = bind_args(interp, name, args, ["x"], 1)?;
    Ok(Value::Bool(test(real(interp, x)?)))
}

fn math_isnan(interp: &Interpreter, args: Args) -> Exec<Value> {
    predicate(interp, args, "isnan", f64::is_nan)
}

fn math_isinf(interp: &Interpreter, args: Args) -> Exec<Value> {
    predicate(interp, args, "isinf", f64::is_infinite)
}

fn math_isfinite(interp: &Interpreter, args: Args) -> Exec<Value> {
    predicate(interp, args, "isfinite", f64::is_finite)
}

fn math_isclose(interp: &Interpreter, mut args: Args) -> Exec<Value> {
    let rel_tol = args.take_keyword("rel_tol");
    let abs_tol = args.take_keyword("abs_tol");
    let [a, b] = bind_args(interp, "isclose", args, ["a", "b"], 2)?;
    let (a, b) = (real(interp, a)?, real(interp, b)?);
    let rel_tol = rel_tol.map_or(Ok(1e-9), |v| real(interp, Some(v)))?;
    let abs_tol = abs_tol.map_or(Ok(0.0), |v| real(interp, Some(v)))?;
    if rel_tol < 0.0 || abs_tol < 0.0 {
        return interp.raise(ExceptionId::ValueError, "tolerances must be non-negative");
    }
    if a == b {
        return Ok(Value::Bool(true));
    }
    if a.is_infinite() || b.is_infinite() {
        return Ok(Value::Bool(false));
    }
    let diff = (a - b).abs();
    let close = diff <= (rel_tol * b).abs() || diff <= (rel_tol * a).abs() || diff <= abs_tol;
    Ok(Value::Bool(close))
}

fn integer(interp: &Interpreter, value: &Value) -> Exec<i64> {
    match value {
        Value::Int(_) | Value::Bool(_) => Ok(value.as_int().unwrap_or_default()),
        other => Err(interp.type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            interp.type_name(other)
        ))),
    }
}

fn math_gcd(interp: &Interpreter, args: Args) -> Exec<Value> {
    no_keywords(interp, "gcd", &args)?;
    let mut result: u64 = 0;
    for value in &args.positional {
        let mut a = integer(interp, value)?.unsigned_abs();
        let mut b = result;
        while b != 0 {
            (a, b) = (b, a % b);
        }
        result = a;
    }
    i64::try_from(result).map(Value::Int).or_else(|_| {
        interp.raise(ExceptionId::OverflowError, "integer result too large")
    })
}

fn math_factorial(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [n] = bind_args(interp, "factorial", args, ["n"], 1)?;
    let n = integer(interp, &n.unwrap_or(Value::None))?;
    if n < 0 {
        return interp.raise(ExceptionId::ValueError, "factorial() not defined for negative values");
    }
    let mut product: i64 = 1;
    for k in 2..=n {
        product = match product.checked_mul(k) {
            Some(p) => p,
            None => return interp.raise(ExceptionId::OverflowError, "integer result too large"),
        };
    }
    Ok(Value::Int(product))
}

/// `math.fsum`: Neumaier-compensated summation.
fn math_fsum(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [iterable] = bind_args(interp, "fsum", args, ["seq"], 1)?;
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for item in interp.collect_iterable(&iterable.unwrap_or(Value::None))? {
        let x = real(interp, Some(item))?;
        let t = sum + x;
        if sum.abs() >= x.abs() {
            compensation += (sum - t) + x;
        } else {
            compensation += (x - t) + sum;
        }
        sum = t;
    }
    Ok(Value::Float(sum + compensation))
}

fn math_prod(interp: &Interpreter, mut args: Args) -> Exec<Value> {
    let start = args.take_keyword("start").unwrap_or(Value::Int(1));
    let [iterable] = bind_args(interp, "prod", args, ["iterable"], 1)?;
    let mut product = start;
    for item in interp.collect_iterable(&iterable.unwrap_or(Value::None))? {
        product = interp.binary_op(runtest_syntax::ast::BinaryOp::Mul, product, item)?;
    }
    Ok(product)
}

/// The `sys` module. `stdout`/`stderr` write into the interpreter's capture stack.
pub(super) fn sys(interp: &Interpreter) -> Namespace {
    let ns = Namespace::new();
    ns.set("argv", Value::list(vec![Value::str("runtest")]));
    ns.set("maxsize", Value::Int(i64::MAX));
    ns.set("byteorder", Value::str(if cfg!(target_endian = "little") { "little" } else { "big" }));
    ns.set("platform", Value::str(platform()));
    ns.set("version", Value::str(concat!("3.12.0 (runtest ", env!("CARGO_PKG_VERSION"), ")")));
    ns.set(
        "version_info",
        Value::tuple(vec![
            Value::Int(3),
            Value::Int(12),
            Value::Int(0),
            Value::str("final"),
            Value::Int(0),
        ]),
    );
    ns.set("path", Value::list(vec![Value::str(interp.root().display().to_string())]));
    ns.set("exit", Value::builtin("exit", sys_exit));
    ns.set("stdout", stream(interp, "stdout", false));
    ns.set("stderr", stream(interp, "stderr", true));
    ns
}

fn platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn sys_exit(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [code] = bind_args(interp, "exit", args, ["status"], 0)?;
    let exception = match code {
        None => interp.exception_with_args(interp.exception_class(ExceptionId::SystemExit), Vec::new()),
        Some(code) => interp.exception_with_args(interp.exception_class(ExceptionId::SystemExit), vec![code]),
    };
    Err(crate::interp::Flow::Raise(Box::new(crate::interp::Raised::new(exception))))
}

/// A text stream object with `write` and `flush`.
fn stream(interp: &Interpreter, name: &str, to_stderr: bool) -> Value {
    let attrs = Namespace::new();
    attrs.set(
        "write",
        Value::builtin("write", move |interp, args| {
            let [_, text] = bind_args(interp, "write", args, ["self", "s"], 2)?;
            let text = match text {
                Some(Value::Str(s)) => s,
                Some(other) => {
                    return Err(interp.type_error(format!(
                        "write() argument must be str, not {}",
                        interp.type_name(&other)
                    )));
                }
                None => Rc::from(""),
            };
            if to_stderr {
                interp.write_stderr(&text);
            } else {
                interp.write_stdout(&text);
            }
            Ok(Value::Int(i64::try_from(text.chars().count()).unwrap_or(i64::MAX)))
        }),
    );
    attrs.set("flush", Value::builtin("flush", |_, _| Ok(Value::None)));
    let class = native_class("TextIOWrapper", "_io", &interp.types().object, ClassKind::User, attrs);
    let instance = Instance {
        class,
        attrs: Namespace::new(),
    };
    instance.attrs.set("name", Value::str(format!("<{name}>")));
    Value::Instance(Rc::new(instance))
}

/// Option flag constants `doctest` exposes, with CPython's bit values.
const DOCTEST_FLAGS: &[(&str, i64)] = &[
    ("DONT_ACCEPT_TRUE_FOR_1", 1),
    ("DONT_ACCEPT_BLANKLINE", 2),
    ("NORMALIZE_WHITESPACE", 4),
    ("ELLIPSIS", 8),
    ("SKIP", 16),
    ("IGNORE_EXCEPTION_DETAIL", 32),
    ("REPORT_UDIFF", 64),
    ("REPORT_CDIFF", 128),
    ("REPORT_NDIFF", 256),
    ("REPORT_ONLY_FIRST_FAILURE", 512),
    ("FAIL_FAST", 1024),
];

/// The `doctest` module, so `if __name__ == "__main__": doctest.testmod()` footers load.
pub(super) fn doctest() -> Namespace {
    let ns = Namespace::new();
    ns.set(
        "testmod",
        Value::builtin("testmod", |_, _| Ok(Value::tuple(vec![Value::Int(0), Value::Int(0)]))),
    );
    for &(name, bit) in DOCTEST_FLAGS {
        ns.set(name, Value::Int(bit));
    }
    ns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(ns: &Namespace, name: &str, positional: Vec<Value>) -> Option<Value> {
        let interp = Interpreter::new(".");
        let func = ns.get(name)?;
        interp.call(&func, Args::new(positional)).ok()
    }

    #[test]
    fn test_math_constants_and_functions() {
        let ns = math();
        assert!(matches!(ns.get("pi"), Some(Value::Float(p)) if (p - consts::PI).abs() < 1e-12));
        assert!(matches!(call(&ns, "sqrt", vec![Value::Int(16)]), Some(Value::Float(f)) if f == 4.0));
        assert!(matches!(call(&ns, "floor", vec![Value::Float(-2.5)]), Some(Value::Int(-3))));
        assert!(matches!(call(&ns, "factorial", vec![Value::Int(5)]), Some(Value::Int(120))));
        assert!(matches!(call(&ns, "gcd", vec![Value::Int(12), Value::Int(18)]), Some(Value::Int(6))));
    }

    #[test]
    fn test_math_domain_errors() {
        let ns = math();
        assert!(call(&ns, "sqrt", vec![Value::Int(-1)]).is_none());
        assert!(call(&ns, "log", vec![Value::Int(0)]).is_none());
        assert!(call(&ns, "factorial", vec![Value::Int(-1)]).is_none());
        assert!(call(&ns, "factorial", vec![Value::Int(30)]).is_none());
    }

    #[test]
    fn test_isclose_tolerances() {
        let ns = math();
        let close = call(&ns, "isclose", vec![Value::Float(1.0), Value::Float(1.0 + 1e-12)]);
        assert!(matches!(close, Some(Value::Bool(true))));
        let far = call(&ns, "isclose", vec![Value::Float(1.0), Value::Float(1.1)]);
        assert!(matches!(far, Some(Value::Bool(false))));
    }

    #[test]
    fn test_fsum_compensates() {
        let ns = math();
        let items = Value::list(vec![Value::Float(0.1); 10]);
        assert!(matches!(call(&ns, "fsum", vec![items]), Some(Value::Float(f)) if f == 1.0));
    }

    #[test]
    fn test_doctest_flags() {
        let ns = doctest();
        assert!(matches!(ns.get("ELLIPSIS"), Some(Value::Int(8))));
        assert!(matches!(call(&ns, "testmod", vec![]), Some(Value::Tuple(_))));
    }
}
