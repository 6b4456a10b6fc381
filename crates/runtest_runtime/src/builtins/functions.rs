//! Builtin functions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use runtest_core::lang::exceptions::ExceptionId;
use runtest_syntax::ast::{BinaryOp, CompareOp};

use super::{bind_args, no_keywords};
use crate::format;
use crate::interp::{Exec, Interpreter};
use crate::value::{Args, DictMap, IterState, Value};

type NativeFunction = fn(&Interpreter, Args) -> Exec<Value>;

/// Registry of builtin functions by name.
pub(super) const FUNCTIONS: &[(&str, NativeFunction)] = &[
    ("print", print),
    ("repr", repr),
    ("ascii", repr),
    ("len", len),
    ("abs", abs),
    ("round", round),
    ("divmod", divmod),
    ("pow", pow),
    ("min", min),
    ("max", max),
    ("sum", sum),
    ("sorted", sorted),
    ("reversed", reversed),
    ("enumerate", enumerate),
    ("zip", zip),
    ("map", map),
    ("filter", filter),
    ("any", any),
    ("all", all),
    ("isinstance", isinstance),
    ("issubclass", issubclass),
    ("hasattr", hasattr),
    ("getattr", getattr),
    ("setattr", setattr),
    ("delattr", delattr),
    ("callable", callable),
    ("iter", iter),
    ("next", next),
    ("id", id),
    ("hash", hash),
    ("chr", chr),
    ("ord", ord),
    ("hex", hex),
    ("oct", oct),
    ("bin", bin),
    ("format", format_builtin),
    ("vars", vars),
    ("dir", dir),
];

fn print(interp: &Interpreter, mut args: Args) -> Exec<Value> {
    let sep = args.take_keyword("sep");
    let end = args.take_keyword("end");
    let file = args.take_keyword("file");
    args.take_keyword("flush");
    no_keywords(interp, "print", &args)?;

    let text_or = |value: Option<Value>, default: &str, what: &str| -> Exec<String> {
        match value {
            None | Some(Value::None) => Ok(default.to_string()),
            Some(Value::Str(s)) => Ok(s.to_string()),
            Some(other) => Err(interp.type_error(format!(
                "{what} must be None or a string, not {}",
                interp.type_name(&other)
            ))),
        }
    };
    let sep = text_or(sep, " ", "sep")?;
    let end = text_or(end, "\n", "end")?;
    let parts: Vec<String> = args.positional.iter().map(|v| interp.str_of(v)).collect::<Exec<_>>()?;
    let text = format!("{}{end}", parts.join(&sep));
    match file {
        None | Some(Value::None) => interp.write_stdout(&text),
        Some(stream) => {
            interp.call_method(&stream, "write", vec![Value::str(text)])?;
        }
    }
    Ok(Value::None)
}

fn repr(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [value] = bind_args(interp, "repr", args, ["obj"], 1)?;
    Ok(Value::str(interp.repr(&value.unwrap_or(Value::None))?))
}

fn len(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [value] = bind_args(interp, "len", args, ["obj"], 1)?;
    let n = interp.len_of(&value.unwrap_or(Value::None))?;
    Ok(Value::Int(i64::try_from(n).unwrap_or(i64::MAX)))
}

fn abs(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [value] = bind_args(interp, "abs", args, ["x"], 1)?;
    match value.unwrap_or(Value::None) {
        Value::Int(i) => match i.checked_abs() {
            Some(n) => Ok(Value::Int(n)),
            None => interp.raise(ExceptionId::OverflowError, "integer result too large"),
        },
        Value::Bool(b) => Ok(Value::Int(i64::from(b))),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => match interp.lookup_special(&other, "__abs__")? {
            Some(method) => interp.call(&method, Args::default()),
            None => Err(interp.type_error(format!(
                "bad operand type for abs(): '{}'",
                interp.type_name(&other)
            ))),
        },
    }
}

fn round(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [number, ndigits] = bind_args(interp, "round", args, ["number", "ndigits"], 1)?;
    let number = number.unwrap_or(Value::None);
    let ndigits = match ndigits {
        None | Some(Value::None) => None,
        Some(n) => match n.as_int() {
            Some(n) => Some(n),
            None => {
                return Err(interp.type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    interp.type_name(&n)
                )));
            }
        },
    };
    match (&number, ndigits) {
        (Value::Int(_) | Value::Bool(_), None) => Ok(Value::Int(number.as_int().unwrap_or(0))),
        (Value::Int(i), Some(n)) if n >= 0 => Ok(Value::Int(*i)),
        (Value::Int(i), Some(n)) => {
            let factor = 10f64.powi(i32::try_from(-n).unwrap_or(i32::MAX));
            Ok(Value::Int(((*i as f64 / factor).round_ties_even() * factor) as i64))
        }
        (Value::Float(f), None) => {
            if !f.is_finite() {
                let message = if f.is_nan() {
                    "cannot convert float NaN to integer"
                } else {
                    "cannot convert float infinity to integer"
                };
                let id = if f.is_nan() { ExceptionId::ValueError } else { ExceptionId::OverflowError };
                return interp.raise(id, message);
            }
            Ok(Value::Int(f.round_ties_even() as i64))
        }
        (Value::Float(f), Some(n)) => {
            let n = i32::try_from(n.clamp(-308, 308)).unwrap_or(0);
            let factor = 10f64.powi(n);
            let rounded = (f * factor).round_ties_even() / factor;
            Ok(Value::Float(if rounded.is_finite() { rounded } else { *f }))
        }
        _ => match interp.lookup_special(&number, "__round__")? {
            Some(method) => {
                let extra = ndigits.map(|n| vec![Value::Int(n)]).unwrap_or_default();
                interp.call(&method, Args::new(extra))
            }
            None => Err(interp.type_error(format!(
                "type {} doesn't define __round__ method",
                interp.type_name(&number)
            ))),
        },
    }
}

fn divmod(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [a, b] = bind_args(interp, "divmod", args, ["a", "b"], 2)?;
    let (a, b) = (a.unwrap_or(Value::None), b.unwrap_or(Value::None));
    let quotient = interp.binary_op(BinaryOp::FloorDiv, a.clone(), b.clone())?;
    let remainder = interp.binary_op(BinaryOp::Mod, a, b)?;
    Ok(Value::tuple(vec![quotient, remainder]))
}

fn pow(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [base, exp, modulo] = bind_args(interp, "pow", args, ["base", "exp", "mod"], 2)?;
    let (base, exp) = (base.unwrap_or(Value::None), exp.unwrap_or(Value::None));
    match modulo {
        None | Some(Value::None) => interp.binary_op(BinaryOp::Pow, base, exp),
        Some(m) => {
            let (Some(mut b), Some(mut e), Some(m)) = (base.as_int(), exp.as_int(), m.as_int()) else {
                return Err(interp.type_error("pow() 3rd argument not allowed unless all arguments are integers"));
            };
            if m == 0 {
                return interp.raise(ExceptionId::ValueError, "pow() 3rd argument cannot be 0");
            }
            if e < 0 {
                return interp.raise(ExceptionId::ValueError, "base is not invertible for the given modulus");
            }
            let m128 = i128::from(m);
            let mut result: i128 = 1;
            let mut b128 = i128::from(b).rem_euclid(m128);
            while e > 0 {
                if e & 1 == 1 {
                    result = (result * b128).rem_euclid(m128);
                }
                b128 = (b128 * b128).rem_euclid(m128);
                e >>= 1;
            }
            b = i64::try_from(result).unwrap_or(0);
            // Python's result takes the sign of the modulus.
            if m < 0 && b > 0 {
                b += m;
            }
            Ok(Value::Int(b))
        }
    }
}

fn extremum(interp: &Interpreter, mut args: Args, name: &str, op: CompareOp) -> Exec<Value> {
    let key = args.take_keyword("key").filter(|k| !k.is_none());
    let default = args.take_keyword("default");
    no_keywords(interp, name, &args)?;
    let items = match args.positional.len() {
        0 => return Err(interp.type_error(format!("{name} expected at least 1 argument, got 0"))),
        1 => interp.collect_iterable(&args.positional[0])?,
        _ if default.is_some() => {
            return Err(interp.type_error(format!(
                "Cannot specify a default for {name}() with multiple positional arguments"
            )));
        }
        _ => args.positional,
    };
    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let score = match &key {
            Some(key) => interp.call(key, Args::new(vec![item.clone()]))?,
            None => item.clone(),
        };
        let replace = match &best {
            None => true,
            Some((best_score, _)) => interp.ordering(op, &score, best_score)?,
        };
        if replace {
            best = Some((score, item));
        }
    }
    match (best, default) {
        (Some((_, item)), _) => Ok(item),
        (None, Some(default)) => Ok(default),
        (None, None) => interp.raise(ExceptionId::ValueError, format!("{name}() iterable argument is empty")),
    }
}

fn min(interp: &Interpreter, args: Args) -> Exec<Value> {
    extremum(interp, args, "min", CompareOp::Lt)
}

fn max(interp: &Interpreter, args: Args) -> Exec<Value> {
    extremum(interp, args, "max", CompareOp::Gt)
}

fn sum(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [iterable, start] = bind_args(interp, "sum", args, ["iterable", "start"], 1)?;
    let mut total = start.unwrap_or(Value::Int(0));
    if matches!(total, Value::Str(_)) {
        return Err(interp.type_error("sum() can't sum strings [use ''.join(seq) instead]"));
    }
    for item in interp.collect_iterable(&iterable.unwrap_or(Value::None))? {
        total = interp.binary_op(BinaryOp::Add, total, item)?;
    }
    Ok(total)
}

fn sorted(interp: &Interpreter, mut args: Args) -> Exec<Value> {
    let key = args.take_keyword("key").filter(|k| !k.is_none());
    let reverse = match args.take_keyword("reverse") {
        Some(flag) => interp.truthy(&flag)?,
        None => false,
    };
    let [iterable] = bind_args(interp, "sorted", args, ["iterable"], 1)?;
    let items = interp.collect_iterable(&iterable.unwrap_or(Value::None))?;
    Ok(Value::list(interp.sort_values(items, key.as_ref(), reverse)?))
}

fn reversed(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [sequence] = bind_args(interp, "reversed", args, ["sequence"], 1)?;
    let sequence = sequence.unwrap_or(Value::None);
    if let Some(method) = interp.lookup_special(&sequence, "__reversed__")? {
        return interp.call(&method, Args::default());
    }
    let kind = match &sequence {
        Value::List(_) => "list_reverseiterator",
        Value::Range(_) => "range_iterator",
        Value::Tuple(_) | Value::Str(_) | Value::Dict(_) => "reversed",
        Value::Instance(_) => "reversed",
        other => {
            return Err(interp.type_error(format!(
                "'{}' object is not reversible",
                interp.type_name(other)
            )));
        }
    };
    let mut items = interp.collect_iterable(&sequence)?;
    items.reverse();
    Ok(IterState::new(items, kind))
}

fn enumerate(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [iterable, start] = bind_args(interp, "enumerate", args, ["iterable", "start"], 1)?;
    let start = match start {
        Some(v) => interp.index_value(&v)?.ok_or_else(|| {
            interp.type_error(format!("'{}' object cannot be interpreted as an integer", interp.type_name(&v)))
        })?,
        None => 0,
    };
    let items = interp.collect_iterable(&iterable.unwrap_or(Value::None))?;
    let pairs = items
        .into_iter()
        .zip(start..)
        .map(|(item, i)| Value::tuple(vec![Value::Int(i), item]))
        .collect();
    Ok(IterState::new(pairs, "enumerate"))
}

fn zip(interp: &Interpreter, args: Args) -> Exec<Value> {
    no_keywords(interp, "zip", &args)?;
    let columns: Vec<Vec<Value>> = args
        .positional
        .iter()
        .map(|it| interp.collect_iterable(it))
        .collect::<Exec<_>>()?;
    let len = columns.iter().map(Vec::len).min().unwrap_or(0);
    let rows = (0..len)
        .map(|i| Value::tuple(columns.iter().map(|c| c[i].clone()).collect()))
        .collect();
    Ok(IterState::new(rows, "zip"))
}

fn map(interp: &Interpreter, args: Args) -> Exec<Value> {
    no_keywords(interp, "map", &args)?;
    let Some((func, iterables)) = args.positional.split_first() else {
        return Err(interp.type_error("map() must have at least two arguments."));
    };
    if iterables.is_empty() {
        return Err(interp.type_error("map() must have at least two arguments."));
    }
    let columns: Vec<Vec<Value>> = iterables
        .iter()
        .map(|it| interp.collect_iterable(it))
        .collect::<Exec<_>>()?;
    let len = columns.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let row = columns.iter().map(|c| c[i].clone()).collect();
        out.push(interp.call(func, Args::new(row))?);
    }
    Ok(IterState::new(out, "map"))
}

fn filter(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [func, iterable] = bind_args(interp, "filter", args, ["function", "iterable"], 2)?;
    let func = func.unwrap_or(Value::None);
    let mut out = Vec::new();
    for item in interp.collect_iterable(&iterable.unwrap_or(Value::None))? {
        let keep = if func.is_none() {
            interp.truthy(&item)?
        } else {
            let verdict = interp.call(&func, Args::new(vec![item.clone()]))?;
            interp.truthy(&verdict)?
        };
        if keep {
            out.push(item);
        }
    }
    Ok(IterState::new(out, "filter"))
}

fn any(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [iterable] = bind_args(interp, "any", args, ["iterable"], 1)?;
    let mut iter = interp.iterate(&iterable.unwrap_or(Value::None))?;
    while let Some(item) = interp.next_item(&mut iter)? {
        if interp.truthy(&item)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn all(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [iterable] = bind_args(interp, "all", args, ["iterable"], 1)?;
    let mut iter = interp.iterate(&iterable.unwrap_or(Value::None))?;
    while let Some(item) = interp.next_item(&mut iter)? {
        if !interp.truthy(&item)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

/// Shared by `isinstance`/`issubclass`: apply `test` to a class or each class of a tuple.
fn class_info(interp: &Interpreter, info: &Value, func: &str, test: &dyn Fn(&Value) -> bool) -> Exec<bool> {
    match info {
        Value::Class(_) => Ok(test(info)),
        Value::Tuple(items) => {
            for item in items.iter() {
                if class_info(interp, item, func, test)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(interp.type_error(format!(
            "{func}() arg 2 must be a type, a tuple of types, or a union"
        ))),
    }
}

fn isinstance(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object, info] = bind_args(interp, "isinstance", args, ["obj", "class_or_tuple"], 2)?;
    let object = object.unwrap_or(Value::None);
    let result = class_info(interp, &info.unwrap_or(Value::None), "isinstance", &|class| match class {
        Value::Class(class) => interp.isinstance(&object, class),
        _ => false,
    })?;
    Ok(Value::Bool(result))
}

fn issubclass(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [class, info] = bind_args(interp, "issubclass", args, ["cls", "class_or_tuple"], 2)?;
    let Some(Value::Class(class)) = class else {
        return Err(interp.type_error("issubclass() arg 1 must be a class"));
    };
    let int = interp.types().data(crate::value::DataType::Int);
    let is_bool = class.data_type() == Some(crate::value::DataType::Bool);
    let result = class_info(interp, &info.unwrap_or(Value::None), "issubclass", &|base| match base {
        Value::Class(base) => class.is_subclass_of(base) || (is_bool && std::rc::Rc::ptr_eq(base, &int)),
        _ => false,
    })?;
    Ok(Value::Bool(result))
}

fn attr_name(interp: &Interpreter, name: Option<Value>, func: &str) -> Exec<String> {
    match name {
        Some(Value::Str(s)) => Ok(s.to_string()),
        Some(other) => Err(interp.type_error(format!(
            "{func}(): attribute name must be string, not '{}'",
            interp.type_name(&other)
        ))),
        None => Err(interp.type_error(format!("{func}() missing attribute name"))),
    }
}

fn hasattr(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object, name] = bind_args(interp, "hasattr", args, ["obj", "name"], 2)?;
    let name = attr_name(interp, name, "hasattr")?;
    match interp.get_attr(&object.unwrap_or(Value::None), &name) {
        Ok(_) => Ok(Value::Bool(true)),
        Err(crate::interp::Flow::Raise(raised))
            if interp.is_exception(&raised.exception, ExceptionId::AttributeError) =>
        {
            Ok(Value::Bool(false))
        }
        Err(other) => Err(other),
    }
}

fn getattr(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object, name, default] = bind_args(interp, "getattr", args, ["obj", "name", "default"], 2)?;
    let name = attr_name(interp, name, "getattr")?;
    match (interp.get_attr(&object.unwrap_or(Value::None), &name), default) {
        (Ok(value), _) => Ok(value),
        (Err(crate::interp::Flow::Raise(raised)), Some(default))
            if interp.is_exception(&raised.exception, ExceptionId::AttributeError) =>
        {
            Ok(default)
        }
        (Err(other), _) => Err(other),
    }
}

fn setattr(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object, name, value] = bind_args(interp, "setattr", args, ["obj", "name", "value"], 3)?;
    let name = attr_name(interp, name, "setattr")?;
    interp.set_attr(&object.unwrap_or(Value::None), &name, value.unwrap_or(Value::None))?;
    Ok(Value::None)
}

fn delattr(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object, name] = bind_args(interp, "delattr", args, ["obj", "name"], 2)?;
    let name = attr_name(interp, name, "delattr")?;
    interp.del_attr(&object.unwrap_or(Value::None), &name)?;
    Ok(Value::None)
}

fn callable(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object] = bind_args(interp, "callable", args, ["obj"], 1)?;
    let object = object.unwrap_or(Value::None);
    let result = match &object {
        Value::Function(_) | Value::Builtin(_) | Value::BoundMethod(_) | Value::Class(_) => true,
        Value::Instance(_) => interp.lookup_special(&object, "__call__")?.is_some(),
        _ => false,
    };
    Ok(Value::Bool(result))
}

fn iter(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object] = bind_args(interp, "iter", args, ["object"], 1)?;
    interp.make_iterator(&object.unwrap_or(Value::None))
}

fn next(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [iterator, default] = bind_args(interp, "next", args, ["iterator", "default"], 1)?;
    let iterator = iterator.unwrap_or(Value::None);
    if !matches!(iterator, Value::Iterator(_) | Value::Instance(_)) {
        return Err(interp.type_error(format!(
            "'{}' object is not an iterator",
            interp.type_name(&iterator)
        )));
    }
    match (interp.advance(&iterator)?, default) {
        (Some(item), _) => Ok(item),
        (None, Some(default)) => Ok(default),
        (None, None) => interp.raise(ExceptionId::StopIteration, ""),
    }
}

fn id(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object] = bind_args(interp, "id", args, ["obj"], 1)?;
    let object = object.unwrap_or(Value::None);
    let address = match object.address() {
        0 => {
            let mut hasher = DefaultHasher::new();
            interp.repr(&object)?.hash(&mut hasher);
            hasher.finish() >> 16
        }
        address => address as u64,
    };
    Ok(Value::Int(i64::try_from(address).unwrap_or(i64::MAX)))
}

fn hash(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object] = bind_args(interp, "hash", args, ["obj"], 1)?;
    let object = object.unwrap_or(Value::None);
    interp.check_hashable(&object)?;
    if let Some(method) = interp.lookup_special(&object, "__hash__")? {
        return interp.call(&method, Args::default());
    }
    Ok(Value::Int(match &object {
        Value::Int(_) | Value::Bool(_) => object.as_int().unwrap_or(0),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => *f as i64,
        _ => {
            let mut hasher = DefaultHasher::new();
            interp.repr(&object)?.hash(&mut hasher);
            (hasher.finish() >> 1) as i64
        }
    }))
}

fn chr(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [code] = bind_args(interp, "chr", args, ["i"], 1)?;
    let code = code.unwrap_or(Value::None);
    let Some(n) = code.as_int() else {
        return Err(interp.type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            interp.type_name(&code)
        )));
    };
    match u32::try_from(n).ok().and_then(char::from_u32) {
        Some(c) => Ok(Value::str(c.to_string())),
        None => interp.raise(ExceptionId::ValueError, "chr() arg not in range(0x110000)"),
    }
}

fn ord(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [text] = bind_args(interp, "ord", args, ["c"], 1)?;
    match text.unwrap_or(Value::None) {
        Value::Str(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Int(i64::from(u32::from(c)))),
                _ => Err(interp.type_error(format!(
                    "ord() expected a character, but string of length {} found",
                    s.chars().count()
                ))),
            }
        }
        other => Err(interp.type_error(format!(
            "ord() expected string of length 1, but {} found",
            interp.type_name(&other)
        ))),
    }
}

fn radix(interp: &Interpreter, args: Args, name: &str, spec: &str) -> Exec<Value> {
    let [value] = bind_args(interp, name, args, ["number"], 1)?;
    let value = value.unwrap_or(Value::None);
    let Some(n) = interp.index_value(&value)? else {
        return Err(interp.type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            interp.type_name(&value)
        )));
    };
    Ok(Value::str(format::format_value(interp, &Value::Int(n), spec)?))
}

fn hex(interp: &Interpreter, args: Args) -> Exec<Value> {
    radix(interp, args, "hex", "#x")
}

fn oct(interp: &Interpreter, args: Args) -> Exec<Value> {
    radix(interp, args, "oct", "#o")
}

fn bin(interp: &Interpreter, args: Args) -> Exec<Value> {
    radix(interp, args, "bin", "#b")
}

fn format_builtin(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [value, spec] = bind_args(interp, "format", args, ["value", "format_spec"], 1)?;
    let spec = match spec {
        Some(Value::Str(s)) => s.to_string(),
        Some(other) => {
            return Err(interp.type_error(format!(
                "format() argument 2 must be str, not {}",
                interp.type_name(&other)
            )));
        }
        None => String::new(),
    };
    Ok(Value::str(format::format_value(interp, &value.unwrap_or(Value::None), &spec)?))
}

fn vars(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object] = bind_args(interp, "vars", args, ["object"], 1)?;
    let entries = match object.unwrap_or(Value::None) {
        Value::Instance(instance) => instance.attrs.entries(),
        Value::Module(module) => module.ns.entries(),
        Value::Class(class) => class.attrs.entries(),
        Value::Function(function) => function.attrs.entries(),
        _ => return Err(interp.type_error("vars() argument must have __dict__ attribute")),
    };
    let map = DictMap::from_pairs(entries.into_iter().map(|(k, v)| (Value::str(k), v)).collect());
    Ok(Value::dict(map))
}

fn dir(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [object] = bind_args(interp, "dir", args, ["object"], 1)?;
    let mut names: Vec<String> = match object.unwrap_or(Value::None) {
        Value::Instance(instance) => {
            let mut names = instance.attrs.keys();
            for class in instance.class.linearization() {
                names.extend(class.attrs.keys());
            }
            names
        }
        Value::Class(class) => class.linearization().iter().flat_map(|c| c.attrs.keys()).collect(),
        Value::Module(module) => module.ns.keys(),
        Value::Function(function) => function.attrs.keys(),
        _ => Vec::new(),
    };
    names.sort();
    names.dedup();
    Ok(Value::list(names.into_iter().map(Value::str).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, positional: Vec<Value>) -> Option<Value> {
        let interp = Interpreter::new(".");
        let (_, func) = FUNCTIONS.iter().find(|(n, _)| *n == name)?;
        func(&interp, Args::new(positional)).ok()
    }

    fn int_of(value: Option<Value>) -> Option<i64> {
        value.and_then(|v| v.as_int())
    }

    #[test]
    fn test_registry_names_are_unique() {
        let mut names: Vec<&str> = FUNCTIONS.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_round_uses_bankers_rounding() {
        assert_eq!(int_of(call("round", vec![Value::Float(2.5)])), Some(2));
        assert_eq!(int_of(call("round", vec![Value::Float(3.5)])), Some(4));
    }

    #[test]
    fn test_three_argument_pow() {
        assert_eq!(int_of(call("pow", vec![Value::Int(3), Value::Int(4), Value::Int(5)])), Some(1));
        assert_eq!(int_of(call("pow", vec![Value::Int(2), Value::Int(10), Value::Int(-3)])), Some(-2));
    }

    #[test]
    fn test_min_max_over_iterable() {
        let items = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert_eq!(int_of(call("min", vec![items.clone()])), Some(1));
        assert_eq!(int_of(call("max", vec![items])), Some(3));
        assert!(call("max", vec![Value::list(Vec::new())]).is_none());
    }

    #[test]
    fn test_radix_formatting() {
        let text = call("hex", vec![Value::Int(255)]);
        assert_eq!(text.as_ref().and_then(Value::as_str), Some("0xff"));
        let text = call("bin", vec![Value::Int(-5)]);
        assert_eq!(text.as_ref().and_then(Value::as_str), Some("-0b101"));
    }
}
