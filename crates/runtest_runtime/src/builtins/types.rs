//! Calling a builtin data type: `int("3")`, `dict(a=1)`, `property(fget)`, ...

use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;
use runtest_syntax::ast::{Docstring, Span};

use super::bind_args;
use crate::interp::{Exec, Interpreter, mapping_items};
use crate::value::{Args, DataType, DictMap, Property, RangeValue, SliceValue, Value};

/// Construct a value of a builtin data type.
pub(crate) fn construct(interp: &Interpreter, data_type: DataType, args: Args) -> Exec<Value> {
    match data_type {
        DataType::NoneType => {
            if args.is_empty() {
                Ok(Value::None)
            } else {
                Err(interp.type_error("NoneType takes no arguments"))
            }
        }
        DataType::Bool => {
            let [value] = bind_args(interp, "bool", args, ["x"], 0)?;
            match value {
                Some(value) => Ok(Value::Bool(interp.truthy(&value)?)),
                None => Ok(Value::Bool(false)),
            }
        }
        DataType::Int => {
            let [value, base] = bind_args(interp, "int", args, ["x", "base"], 0)?;
            match (value, base) {
                (None, None) => Ok(Value::Int(0)),
                (None, Some(_)) => Err(interp.type_error("int() missing string argument")),
                (Some(value), None) => to_int(interp, &value),
                (Some(Value::Str(text)), Some(base)) => {
                    let Some(base) = base.as_int().filter(|b| *b == 0 || (2..=36).contains(b)) else {
                        return interp.raise(ExceptionId::ValueError, "int() base must be >= 2 and <= 36, or 0");
                    };
                    parse_int(interp, &text, u32::try_from(base).unwrap_or(10))
                }
                (Some(_), Some(_)) => Err(interp.type_error("int() can't convert non-string with explicit base")),
            }
        }
        DataType::Float => {
            let [value] = bind_args(interp, "float", args, ["x"], 0)?;
            match value {
                None => Ok(Value::Float(0.0)),
                Some(value) => to_float(interp, &value),
            }
        }
        DataType::Str => {
            let [value] = bind_args(interp, "str", args, ["object"], 0)?;
            match value {
                None => Ok(Value::str("")),
                Some(value) => Ok(Value::str(interp.str_of(&value)?)),
            }
        }
        DataType::Tuple => {
            let [iterable] = bind_args(interp, "tuple", args, ["iterable"], 0)?;
            match iterable {
                None => Ok(Value::tuple(Vec::new())),
                Some(value @ Value::Tuple(_)) => Ok(value),
                Some(iterable) => Ok(Value::tuple(interp.collect_iterable(&iterable)?)),
            }
        }
        DataType::List => {
            let [iterable] = bind_args(interp, "list", args, ["iterable"], 0)?;
            match iterable {
                None => Ok(Value::list(Vec::new())),
                Some(iterable) => Ok(Value::list(interp.collect_iterable(&iterable)?)),
            }
        }
        DataType::Dict => {
            let Args { positional, keywords } = args;
            if positional.len() > 1 {
                return Err(interp.type_error(format!(
                    "dict expected at most 1 argument, got {}",
                    positional.len()
                )));
            }
            let mut map = DictMap::new();
            if let Some(source) = positional.first() {
                dict_update(interp, &mut map, source)?;
            }
            for (key, value) in keywords {
                map.insert(Value::str(key), value);
            }
            Ok(Value::dict(map))
        }
        DataType::Set => {
            let [iterable] = bind_args(interp, "set", args, ["iterable"], 0)?;
            let items = match iterable {
                None => Vec::new(),
                Some(iterable) => interp.collect_iterable(&iterable)?,
            };
            for item in &items {
                interp.check_hashable(item)?;
            }
            Ok(Value::set(items))
        }
        DataType::Range => make_range(interp, args),
        DataType::Slice => {
            let [a, b, c] = bind_args(interp, "slice", args, ["start", "stop", "step"], 1)?;
            let (lower, upper, step) = match (a, b, c) {
                (Some(stop), None, None) => (Value::None, stop, Value::None),
                (a, b, c) => (
                    a.unwrap_or(Value::None),
                    b.unwrap_or(Value::None),
                    c.unwrap_or(Value::None),
                ),
            };
            Ok(Value::Slice(Rc::new(SliceValue { lower, upper, step })))
        }
        DataType::Property => {
            let [fget, fset, _fdel, doc] = bind_args(interp, "property", args, ["fget", "fset", "fdel", "doc"], 0)?;
            let fget = fget.filter(|v| !v.is_none());
            let doc = match (doc, &fget) {
                (Some(Value::Str(text)), _) => Some(Docstring {
                    text: text.to_string(),
                    span: Span::default(),
                }),
                (_, Some(Value::Function(function))) => function.docstring().cloned(),
                _ => None,
            };
            Ok(Value::Property(Rc::new(Property {
                fget,
                fset: fset.filter(|v| !v.is_none()),
                doc,
            })))
        }
        DataType::StaticMethod => {
            let [func] = bind_args(interp, "staticmethod", args, ["function"], 1)?;
            Ok(Value::StaticMethod(Rc::new(func.unwrap_or(Value::None))))
        }
        DataType::ClassMethod => {
            let [func] = bind_args(interp, "classmethod", args, ["function"], 1)?;
            Ok(Value::ClassMethod(Rc::new(func.unwrap_or(Value::None))))
        }
        DataType::Super => interp.make_super(args),
        other => Err(interp.type_error(format!(
            "cannot create '{}' instances",
            interp.types().data(other).name
        ))),
    }
}

/// `dict.update(source)`: a mapping, or an iterable of key/value pairs.
pub(crate) fn dict_update(interp: &Interpreter, map: &mut DictMap, source: &Value) -> Exec<()> {
    let is_mapping = match source {
        Value::Dict(_) => true,
        Value::Instance(_) => interp.lookup_attr(source, "keys")?.is_some(),
        _ => false,
    };
    if is_mapping {
        for (key, value) in mapping_items(interp, source)?.items() {
            map.insert(key, value);
        }
        return Ok(());
    }
    for (index, item) in interp.collect_iterable(source)?.into_iter().enumerate() {
        let pair = match &item {
            Value::Tuple(_) | Value::List(_) | Value::Str(_) | Value::Iterator(_) => interp.collect_iterable(&item)?,
            other => {
                return Err(interp.type_error(format!(
                    "cannot convert dictionary update sequence element #{index} to a sequence: '{}'",
                    interp.type_name(other)
                )));
            }
        };
        let [key, value] = <[Value; 2]>::try_from(pair).map_err(|pair| {
            interp.value_error(format!(
                "dictionary update sequence element #{index} has length {}; 2 is required",
                pair.len()
            ))
        })?;
        interp.check_hashable(&key)?;
        map.insert(key, value);
    }
    Ok(())
}

fn make_range(interp: &Interpreter, args: Args) -> Exec<Value> {
    super::no_keywords(interp, "range", &args)?;
    let mut bounds = Vec::with_capacity(3);
    for value in &args.positional {
        match interp.index_value(value)? {
            Some(n) => bounds.push(n),
            None => {
                return Err(interp.type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    interp.type_name(value)
                )));
            }
        }
    }
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        [] => return Err(interp.type_error("range expected at least 1 argument, got 0")),
        more => {
            return Err(interp.type_error(format!(
                "range expected at most 3 arguments, got {}",
                more.len()
            )));
        }
    };
    if step == 0 {
        return interp.raise(ExceptionId::ValueError, "range() arg 3 must not be zero");
    }
    Ok(Value::Range(RangeValue { start, stop, step }))
}

fn to_int(interp: &Interpreter, value: &Value) -> Exec<Value> {
    match value {
        Value::Int(_) | Value::Bool(_) => Ok(Value::Int(value.as_int().unwrap_or(0))),
        Value::Float(f) => {
            if f.is_nan() {
                return interp.raise(ExceptionId::ValueError, "cannot convert float NaN to integer");
            }
            if f.is_infinite() {
                return interp.raise(ExceptionId::OverflowError, "cannot convert float infinity to integer");
            }
            let truncated = f.trunc();
            if truncated.abs() >= 9.223_372_036_854_776e18 {
                return interp.raise(ExceptionId::OverflowError, "integer result too large");
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Str(text) => parse_int(interp, text, 10),
        Value::Instance(_) => {
            for hook in ["__int__", "__index__"] {
                if let Some(method) = interp.lookup_special(value, hook)? {
                    return interp.call(&method, Args::default());
                }
            }
            Err(int_type_error(interp, value))
        }
        other => Err(int_type_error(interp, other)),
    }
}

fn int_type_error(interp: &Interpreter, value: &Value) -> crate::interp::Flow {
    interp.type_error(format!(
        "int() argument must be a string, a bytes-like object or a real number, not '{}'",
        interp.type_name(value)
    ))
}

/// Parse an integer literal the way `int(text, base)` does.
fn parse_int(interp: &Interpreter, text: &str, base: u32) -> Exec<Value> {
    let invalid = || {
        interp.value_error(format!(
            "invalid literal for int() with base {base}: {}",
            crate::interp::quote_str(text)
        ))
    };
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let lower = digits.to_ascii_lowercase();
    let (base, digits) = match (base, lower.get(..2)) {
        (0 | 16, Some("0x")) => (16, &lower[2..]),
        (0 | 8, Some("0o")) => (8, &lower[2..]),
        (0 | 2, Some("0b")) => (2, &lower[2..]),
        (0, _) => (10, lower.as_str()),
        (base, _) => (base, lower.as_str()),
    };
    let digits = digits.strip_prefix('_').unwrap_or(digits);
    if digits.is_empty() || digits.ends_with('_') || digits.contains("__") {
        return Err(invalid());
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if !cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid());
    }
    let magnitude = i128::from_str_radix(&cleaned, base).map_err(|_| invalid())?;
    let value = if negative { -magnitude } else { magnitude };
    match i64::try_from(value) {
        Ok(n) => Ok(Value::Int(n)),
        Err(_) => interp.raise(ExceptionId::OverflowError, "integer result too large"),
    }
}

fn to_float(interp: &Interpreter, value: &Value) -> Exec<Value> {
    match value {
        Value::Float(_) | Value::Int(_) | Value::Bool(_) => Ok(Value::Float(value.as_f64().unwrap_or(0.0))),
        Value::Str(text) => match parse_float(text) {
            Some(f) => Ok(Value::Float(f)),
            None => Err(interp.value_error(format!(
                "could not convert string to float: {}",
                crate::interp::quote_str(text)
            ))),
        },
        Value::Instance(_) => match interp.lookup_special(value, "__float__")? {
            Some(method) => interp.call(&method, Args::default()),
            None => Err(float_type_error(interp, value)),
        },
        other => Err(float_type_error(interp, other)),
    }
}

fn float_type_error(interp: &Interpreter, value: &Value) -> crate::interp::Flow {
    interp.type_error(format!(
        "float() argument must be a string or a real number, not '{}'",
        interp.type_name(value)
    ))
}

fn parse_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let (sign, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1.0, &trimmed[1..]),
        Some(b'+') => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    let lower = body.to_ascii_lowercase();
    match lower.as_str() {
        "inf" | "infinity" => return Some(sign * f64::INFINITY),
        "nan" => return Some(f64::NAN),
        _ => {}
    }
    if lower.is_empty()
        || lower.starts_with('_')
        || lower.ends_with('_')
        || lower.contains("__")
        || !lower.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | '+' | '-' | '_'))
    {
        return None;
    }
    let cleaned: String = lower.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().ok().map(|f| sign * f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_from(text: &str, base: u32) -> Option<i64> {
        let interp = Interpreter::new(".");
        parse_int(&interp, text, base).ok().and_then(|v| v.as_int())
    }

    #[test]
    fn test_parse_int_literals() {
        assert_eq!(int_from(" 42 ", 10), Some(42));
        assert_eq!(int_from("-1_000", 10), Some(-1000));
        assert_eq!(int_from("0x1f", 0), Some(31));
        assert_eq!(int_from("ff", 16), Some(255));
        assert_eq!(int_from("1__0", 10), None);
        assert_eq!(int_from("12a", 10), None);
        assert_eq!(int_from("", 10), None);
    }

    #[test]
    fn test_parse_float_literals() {
        assert_eq!(parse_float("1.5"), Some(1.5));
        assert_eq!(parse_float(" -2e3 "), Some(-2000.0));
        assert_eq!(parse_float("Infinity"), Some(f64::INFINITY));
        assert!(parse_float("nan").is_some_and(f64::is_nan));
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn test_invalid_int_message_quotes_input() {
        let interp = Interpreter::new(".");
        let Err(crate::interp::Flow::Raise(raised)) = parse_int(&interp, "abc", 10) else {
            panic!("expected a ValueError");
        };
        let report = interp.report(&raised);
        assert_eq!(report.exception_only, "ValueError: invalid literal for int() with base 10: 'abc'");
    }

    #[test]
    fn test_dict_from_pairs() {
        let interp = Interpreter::new(".");
        let pairs = Value::list(vec![
            Value::tuple(vec![Value::str("a"), Value::Int(1)]),
            Value::tuple(vec![Value::str("b"), Value::Int(2)]),
        ]);
        let mut map = DictMap::new();
        assert!(dict_update(&interp, &mut map, &pairs).is_ok());
        assert_eq!(map.len(), 2);
        let bad = Value::list(vec![Value::tuple(vec![Value::Int(1)])]);
        assert!(dict_update(&interp, &mut map, &bad).is_err());
    }
}
