//! Methods of builtin data types (`str.split`, `list.append`, `dict.get`, ...).
//!
//! Methods are looked up by name in per-type registries and wrapped into a builtin on access, so
//! `"a b".split` is a bound method and `str.split` an unbound one taking the receiver first.

use std::cell::RefCell;
use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;

use super::{bind_args, no_keywords, types};
use crate::format;
use crate::interp::{Exec, Flow, Interpreter};
use crate::value::{Args, DataType, DictMap, IterState, Value, values_equal};

type Method = fn(&Interpreter, &Value, Args) -> Exec<Value>;

const STR_METHODS: &[(&str, Method)] = &[
    ("upper", str_upper),
    ("lower", str_lower),
    ("casefold", str_lower),
    ("swapcase", str_swapcase),
    ("title", str_title),
    ("capitalize", str_capitalize),
    ("strip", str_strip),
    ("lstrip", str_lstrip),
    ("rstrip", str_rstrip),
    ("split", str_split),
    ("rsplit", str_rsplit),
    ("splitlines", str_splitlines),
    ("join", str_join),
    ("replace", str_replace),
    ("startswith", str_startswith),
    ("endswith", str_endswith),
    ("find", str_find),
    ("rfind", str_rfind),
    ("index", str_index),
    ("rindex", str_rindex),
    ("count", str_count),
    ("format", str_format),
    ("isdigit", str_isdigit),
    ("isdecimal", str_isdigit),
    ("isnumeric", str_isnumeric),
    ("isalpha", str_isalpha),
    ("isalnum", str_isalnum),
    ("isspace", str_isspace),
    ("isupper", str_isupper),
    ("islower", str_islower),
    ("isidentifier", str_isidentifier),
    ("center", str_center),
    ("ljust", str_ljust),
    ("rjust", str_rjust),
    ("zfill", str_zfill),
    ("partition", str_partition),
    ("rpartition", str_rpartition),
    ("removeprefix", str_removeprefix),
    ("removesuffix", str_removesuffix),
    ("expandtabs", str_expandtabs),
];

const LIST_METHODS: &[(&str, Method)] = &[
    ("append", list_append),
    ("extend", list_extend),
    ("insert", list_insert),
    ("pop", list_pop),
    ("remove", list_remove),
    ("index", seq_index),
    ("count", seq_count),
    ("sort", list_sort),
    ("reverse", list_reverse),
    ("clear", list_clear),
    ("copy", list_copy),
];

const TUPLE_METHODS: &[(&str, Method)] = &[("index", seq_index), ("count", seq_count)];

const DICT_METHODS: &[(&str, Method)] = &[
    ("keys", dict_keys),
    ("values", dict_values),
    ("items", dict_items),
    ("get", dict_get),
    ("setdefault", dict_setdefault),
    ("pop", dict_pop),
    ("popitem", dict_popitem),
    ("update", dict_update),
    ("clear", dict_clear),
    ("copy", dict_copy),
];

const SET_METHODS: &[(&str, Method)] = &[
    ("add", set_add),
    ("remove", set_remove),
    ("discard", set_discard),
    ("pop", set_pop),
    ("clear", set_clear),
    ("copy", set_copy),
    ("update", set_update),
    ("union", set_union),
    ("intersection", set_intersection),
    ("difference", set_difference),
    ("symmetric_difference", set_symmetric_difference),
    ("issubset", set_issubset),
    ("issuperset", set_issuperset),
    ("isdisjoint", set_isdisjoint),
];

const INT_METHODS: &[(&str, Method)] = &[
    ("bit_length", int_bit_length),
    ("conjugate", number_conjugate),
    ("is_integer", int_is_integer),
];

const FLOAT_METHODS: &[(&str, Method)] = &[("is_integer", float_is_integer), ("conjugate", number_conjugate)];

const RANGE_METHODS: &[(&str, Method)] = &[("index", seq_index), ("count", seq_count)];

const ITERATOR_METHODS: &[(&str, Method)] = &[("__next__", iterator_next), ("__iter__", iterator_iter)];

fn registry(data_type: DataType) -> &'static [(&'static str, Method)] {
    match data_type {
        DataType::Str => STR_METHODS,
        DataType::List => LIST_METHODS,
        DataType::Tuple => TUPLE_METHODS,
        DataType::Dict => DICT_METHODS,
        DataType::Set => SET_METHODS,
        DataType::Int | DataType::Bool => INT_METHODS,
        DataType::Float => FLOAT_METHODS,
        DataType::Range => RANGE_METHODS,
        DataType::Iterator => ITERATOR_METHODS,
        _ => &[],
    }
}

fn data_type_of(value: &Value) -> Option<DataType> {
    Some(match value {
        Value::Str(_) => DataType::Str,
        Value::List(_) => DataType::List,
        Value::Tuple(_) => DataType::Tuple,
        Value::Dict(_) => DataType::Dict,
        Value::Set(_) => DataType::Set,
        Value::Int(_) => DataType::Int,
        Value::Bool(_) => DataType::Bool,
        Value::Float(_) => DataType::Float,
        Value::Range(_) => DataType::Range,
        Value::Iterator(_) => DataType::Iterator,
        _ => return None,
    })
}

fn find(data_type: DataType, name: &str) -> Option<(&'static str, Method)> {
    registry(data_type).iter().find(|(n, _)| *n == name).copied()
}

/// Wrap a registry method into a builtin taking the receiver as its first argument.
fn wrap(name: &'static str, method: Method) -> Value {
    Value::builtin(name, move |interp, mut args| {
        if args.positional.is_empty() {
            return Err(interp.type_error(format!("unbound method {name}() needs an argument")));
        }
        let receiver = args.positional.remove(0);
        method(interp, &receiver, args)
    })
}

/// Attribute `name` of a builtin value: a data attribute or a bound method.
pub(crate) fn lookup(object: &Value, name: &str) -> Option<Value> {
    match (object, name) {
        (Value::Range(r), "start") => return Some(Value::Int(r.start)),
        (Value::Range(r), "stop") => return Some(Value::Int(r.stop)),
        (Value::Range(r), "step") => return Some(Value::Int(r.step)),
        (Value::Slice(s), "start") => return Some(s.lower.clone()),
        (Value::Slice(s), "stop") => return Some(s.upper.clone()),
        (Value::Slice(s), "step") => return Some(s.step.clone()),
        (Value::Int(_) | Value::Bool(_), "real" | "numerator") => return object.as_int().map(Value::Int),
        (Value::Int(_) | Value::Bool(_), "imag") => return Some(Value::Int(0)),
        (Value::Int(_) | Value::Bool(_), "denominator") => return Some(Value::Int(1)),
        (Value::Float(f), "real") => return Some(Value::Float(*f)),
        (Value::Float(_), "imag") => return Some(Value::Float(0.0)),
        _ => {}
    }
    let (name, method) = find(data_type_of(object)?, name)?;
    Some(Value::bound(object.clone(), wrap(name, method)))
}

/// `type.name` for a builtin data type: the method expecting its receiver first.
pub(crate) fn unbound(data_type: DataType, name: &str) -> Option<Value> {
    if data_type == DataType::Dict && name == "fromkeys" {
        return Some(Value::builtin("fromkeys", dict_fromkeys));
    }
    let (name, method) = find(data_type, name)?;
    Some(wrap(name, method))
}

fn mismatch(interp: &Interpreter, expected: &str, receiver: &Value) -> Flow {
    interp.type_error(format!(
        "descriptor requires a '{expected}' object but received a '{}'",
        interp.type_name(receiver)
    ))
}

fn text<'a>(interp: &Interpreter, receiver: &'a Value) -> Exec<&'a str> {
    receiver.as_str().ok_or_else(|| mismatch(interp, "str", receiver))
}

fn list_cell<'a>(interp: &Interpreter, receiver: &'a Value) -> Exec<&'a Rc<RefCell<Vec<Value>>>> {
    match receiver {
        Value::List(items) => Ok(items),
        other => Err(mismatch(interp, "list", other)),
    }
}

fn set_cell<'a>(interp: &Interpreter, receiver: &'a Value) -> Exec<&'a Rc<RefCell<Vec<Value>>>> {
    match receiver {
        Value::Set(items) => Ok(items),
        other => Err(mismatch(interp, "set", other)),
    }
}

fn dict_cell<'a>(interp: &Interpreter, receiver: &'a Value) -> Exec<&'a Rc<RefCell<DictMap>>> {
    match receiver {
        Value::Dict(map) => Ok(map),
        other => Err(mismatch(interp, "dict", other)),
    }
}

fn str_arg(interp: &Interpreter, value: Option<Value>, func: &str) -> Exec<Option<String>> {
    match value {
        None | Some(Value::None) => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s.to_string())),
        Some(other) => Err(interp.type_error(format!(
            "{func} arg must be None or str, not {}",
            interp.type_name(&other)
        ))),
    }
}

fn int_arg(interp: &Interpreter, value: Option<Value>, default: i64) -> Exec<i64> {
    match value {
        None | Some(Value::None) => Ok(default),
        Some(value) => interp.index_value(&value)?.ok_or_else(|| {
            interp.type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                interp.type_name(&value)
            ))
        }),
    }
}

fn usize_of(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn strings(items: Vec<String>) -> Value {
    Value::list(items.into_iter().map(Value::str).collect())
}

// ---- str -------------------------------------------------------------------------------------

fn str_upper(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "upper", args, [], 0)?;
    Ok(Value::str(text(interp, receiver)?.to_uppercase()))
}

fn str_lower(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "lower", args, [], 0)?;
    Ok(Value::str(text(interp, receiver)?.to_lowercase()))
}

fn str_swapcase(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "swapcase", args, [], 0)?;
    let swapped: String = text(interp, receiver)?
        .chars()
        .flat_map(|c| {
            if c.is_uppercase() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                c.to_uppercase().collect::<Vec<_>>()
            }
        })
        .collect();
    Ok(Value::str(swapped))
}

fn str_title(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "title", args, [], 0)?;
    let mut out = String::new();
    let mut previous_cased = false;
    for c in text(interp, receiver)?.chars() {
        if previous_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_cased = c.is_alphabetic();
    }
    Ok(Value::str(out))
}

fn str_capitalize(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "capitalize", args, [], 0)?;
    let s = text(interp, receiver)?;
    let mut chars = s.chars();
    let out = match chars.next() {
        Some(first) => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().chain(rest.chars()).collect()
        }
        None => String::new(),
    };
    Ok(Value::str(out))
}

fn strip_with(interp: &Interpreter, receiver: &Value, args: Args, name: &str, left: bool, right: bool) -> Exec<Value> {
    let [chars] = bind_args(interp, name, args, ["chars"], 0)?;
    let s = text(interp, receiver)?;
    let chars = str_arg(interp, chars, name)?;
    let matches = |c: char| match &chars {
        Some(set) => set.contains(c),
        None => c.is_whitespace(),
    };
    let mut out = s;
    if left {
        out = out.trim_start_matches(matches);
    }
    if right {
        out = out.trim_end_matches(matches);
    }
    Ok(Value::str(out))
}

fn str_strip(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    strip_with(interp, receiver, args, "strip", true, true)
}

fn str_lstrip(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    strip_with(interp, receiver, args, "lstrip", true, false)
}

fn str_rstrip(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    strip_with(interp, receiver, args, "rstrip", false, true)
}

fn split_args(interp: &Interpreter, args: Args, name: &str) -> Exec<(Option<String>, i64)> {
    let [sep, maxsplit] = bind_args(interp, name, args, ["sep", "maxsplit"], 0)?;
    let sep = str_arg(interp, sep, name)?;
    if sep.as_deref() == Some("") {
        return Err(interp.value_error("empty separator"));
    }
    Ok((sep, int_arg(interp, maxsplit, -1)?))
}

/// `str.split()` without a separator.
fn split_whitespace(s: &str, maxsplit: i64) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if maxsplit >= 0 && i64::try_from(parts.len()).unwrap_or(i64::MAX) >= maxsplit {
            parts.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(i) => {
                parts.push(rest[..i].to_string());
                rest = rest[i..].trim_start();
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

fn rsplit_whitespace(s: &str, maxsplit: i64) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = s.trim_end();
    while !rest.is_empty() {
        if maxsplit >= 0 && i64::try_from(parts.len()).unwrap_or(i64::MAX) >= maxsplit {
            parts.push(rest.to_string());
            break;
        }
        match rest.rfind(char::is_whitespace) {
            Some(i) => {
                let width = rest[i..].chars().next().map_or(1, char::len_utf8);
                parts.push(rest[i + width..].to_string());
                rest = rest[..i].trim_end();
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts.reverse();
    parts
}

fn str_split(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let s = text(interp, receiver)?;
    let (sep, maxsplit) = split_args(interp, args, "split")?;
    let parts = match sep {
        None => split_whitespace(s, maxsplit),
        Some(sep) if maxsplit < 0 => s.split(sep.as_str()).map(str::to_string).collect(),
        Some(sep) => {
            let n = usize::try_from(maxsplit).unwrap_or(0) + 1;
            s.splitn(n, sep.as_str()).map(str::to_string).collect()
        }
    };
    Ok(strings(parts))
}

fn str_rsplit(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let s = text(interp, receiver)?;
    let (sep, maxsplit) = split_args(interp, args, "rsplit")?;
    let parts = match sep {
        None => rsplit_whitespace(s, maxsplit),
        Some(sep) if maxsplit < 0 => s.split(sep.as_str()).map(str::to_string).collect(),
        Some(sep) => {
            let n = usize::try_from(maxsplit).unwrap_or(0) + 1;
            let mut parts: Vec<String> = s.rsplitn(n, sep.as_str()).map(str::to_string).collect();
            parts.reverse();
            parts
        }
    };
    Ok(strings(parts))
}

fn str_splitlines(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [keepends] = bind_args(interp, "splitlines", args, ["keepends"], 0)?;
    let keepends = match keepends {
        Some(flag) => interp.truthy(&flag)?,
        None => false,
    };
    let s = text(interp, receiver)?;
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}') {
            continue;
        }
        let mut end = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(_, '\n')) = chars.peek() {
                chars.next();
                end += 1;
            }
        }
        lines.push(if keepends { s[start..end].to_string() } else { s[start..i].to_string() });
        start = end;
    }
    if start < s.len() {
        lines.push(s[start..].to_string());
    }
    Ok(strings(lines))
}

fn str_join(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [iterable] = bind_args(interp, "join", args, ["iterable"], 1)?;
    let sep = text(interp, receiver)?;
    let items = interp.collect_iterable(&iterable.unwrap_or(Value::None))?;
    let mut parts = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Str(s) => parts.push(s.to_string()),
            other => {
                return Err(interp.type_error(format!(
                    "sequence item {i}: expected str instance, {} found",
                    interp.type_name(other)
                )));
            }
        }
    }
    Ok(Value::str(parts.join(sep)))
}

fn str_replace(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [old, new, count] = bind_args(interp, "replace", args, ["old", "new", "count"], 2)?;
    let s = text(interp, receiver)?;
    let (Some(Value::Str(old)), Some(Value::Str(new))) = (old, new) else {
        return Err(interp.type_error("replace() arguments must be str"));
    };
    let count = int_arg(interp, count, -1)?;
    Ok(Value::str(if count < 0 {
        s.replace(&*old, &new)
    } else {
        s.replacen(&*old, &new, usize::try_from(count).unwrap_or(0))
    }))
}

/// Byte range of the characters `start..end` (slice semantics) of `s`, plus the char offset.
fn char_window(interp: &Interpreter, s: &str, start: Option<Value>, end: Option<Value>) -> Exec<(usize, usize, usize)> {
    let len = i64::try_from(s.chars().count()).unwrap_or(i64::MAX);
    let clamp = |n: i64| if n < 0 { (n + len).max(0) } else { n.min(len) };
    let start = clamp(int_arg(interp, start, 0)?);
    let end = clamp(int_arg(interp, end, len)?).max(start);
    let byte_at = |index: i64| {
        let index = usize::try_from(index).unwrap_or(0);
        s.char_indices().nth(index).map_or(s.len(), |(b, _)| b)
    };
    Ok((byte_at(start), byte_at(end), usize::try_from(start).unwrap_or(0)))
}

fn affix_check(interp: &Interpreter, receiver: &Value, args: Args, name: &str, suffix: bool) -> Exec<Value> {
    let [affix, start, end] = bind_args(interp, name, args, ["prefix", "start", "end"], 1)?;
    let s = text(interp, receiver)?;
    let (from, to, _) = char_window(interp, s, start, end)?;
    let window = &s[from..to];
    let candidates = match affix.unwrap_or(Value::None) {
        Value::Str(a) => vec![a],
        Value::Tuple(items) => items
            .iter()
            .map(|v| match v {
                Value::Str(a) => Ok(a.clone()),
                other => Err(interp.type_error(format!(
                    "tuple for {name} must only contain str, not {}",
                    interp.type_name(other)
                ))),
            })
            .collect::<Exec<_>>()?,
        other => {
            return Err(interp.type_error(format!(
                "{name} first arg must be str or a tuple of str, not {}",
                interp.type_name(&other)
            )));
        }
    };
    let hit = candidates
        .iter()
        .any(|a| if suffix { window.ends_with(&**a) } else { window.starts_with(&**a) });
    Ok(Value::Bool(hit))
}

fn str_startswith(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    affix_check(interp, receiver, args, "startswith", false)
}

fn str_endswith(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    affix_check(interp, receiver, args, "endswith", true)
}

/// Char index of `sub` within `s[start:end]`, searching from the left or the right.
fn search(interp: &Interpreter, receiver: &Value, args: Args, name: &str, from_right: bool) -> Exec<Option<usize>> {
    let [sub, start, end] = bind_args(interp, name, args, ["sub", "start", "end"], 1)?;
    let s = text(interp, receiver)?;
    let Some(Value::Str(sub)) = sub else {
        return Err(interp.type_error(format!("{name}() argument 1 must be str")));
    };
    let (from, to, offset) = char_window(interp, s, start, end)?;
    let window = &s[from..to];
    let found = if from_right { window.rfind(&*sub) } else { window.find(&*sub) };
    Ok(found.map(|byte| offset + window[..byte].chars().count()))
}

fn position_value(found: Option<usize>) -> Value {
    found.map_or(Value::Int(-1), usize_of)
}

fn str_find(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    Ok(position_value(search(interp, receiver, args, "find", false)?))
}

fn str_rfind(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    Ok(position_value(search(interp, receiver, args, "rfind", true)?))
}

fn str_index(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    match search(interp, receiver, args, "index", false)? {
        Some(i) => Ok(usize_of(i)),
        None => interp.raise(ExceptionId::ValueError, "substring not found"),
    }
}

fn str_rindex(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    match search(interp, receiver, args, "rindex", true)? {
        Some(i) => Ok(usize_of(i)),
        None => interp.raise(ExceptionId::ValueError, "substring not found"),
    }
}

fn str_count(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [sub, start, end] = bind_args(interp, "count", args, ["sub", "start", "end"], 1)?;
    let s = text(interp, receiver)?;
    let Some(Value::Str(sub)) = sub else {
        return Err(interp.type_error("count() argument 1 must be str"));
    };
    let (from, to, _) = char_window(interp, s, start, end)?;
    let window = &s[from..to];
    let n = if sub.is_empty() {
        window.chars().count() + 1
    } else {
        window.matches(&*sub).count()
    };
    Ok(usize_of(n))
}

fn str_format(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let s = text(interp, receiver)?;
    Ok(Value::str(format::str_format(interp, s, &args)?))
}

fn char_test(interp: &Interpreter, receiver: &Value, args: Args, name: &str, test: fn(char) -> bool) -> Exec<Value> {
    bind_args(interp, name, args, [], 0)?;
    let s = text(interp, receiver)?;
    Ok(Value::Bool(!s.is_empty() && s.chars().all(test)))
}

fn str_isdigit(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    char_test(interp, receiver, args, "isdigit", |c| c.is_ascii_digit())
}

fn str_isnumeric(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    char_test(interp, receiver, args, "isnumeric", char::is_numeric)
}

fn str_isalpha(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    char_test(interp, receiver, args, "isalpha", char::is_alphabetic)
}

fn str_isalnum(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    char_test(interp, receiver, args, "isalnum", char::is_alphanumeric)
}

fn str_isspace(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    char_test(interp, receiver, args, "isspace", char::is_whitespace)
}

fn cased_test(interp: &Interpreter, receiver: &Value, args: Args, name: &str, upper: bool) -> Exec<Value> {
    bind_args(interp, name, args, [], 0)?;
    let s = text(interp, receiver)?;
    let mut cased = false;
    for c in s.chars() {
        if c.is_uppercase() || c.is_lowercase() {
            cased = true;
            if c.is_uppercase() != upper {
                return Ok(Value::Bool(false));
            }
        }
    }
    Ok(Value::Bool(cased))
}

fn str_isupper(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    cased_test(interp, receiver, args, "isupper", true)
}

fn str_islower(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    cased_test(interp, receiver, args, "islower", false)
}

fn str_isidentifier(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "isidentifier", args, [], 0)?;
    let s = text(interp, receiver)?;
    let mut chars = s.chars();
    let valid = chars.next().is_some_and(|c| c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric());
    Ok(Value::Bool(valid))
}

fn pad_args(interp: &Interpreter, args: Args, name: &str) -> Exec<(usize, char)> {
    let [width, fill] = bind_args(interp, name, args, ["width", "fillchar"], 1)?;
    let width = usize::try_from(int_arg(interp, width, 0)?).unwrap_or(0);
    let fill = match fill {
        None => ' ',
        Some(Value::Str(s)) if s.chars().count() == 1 => s.chars().next().unwrap_or(' '),
        Some(_) => return Err(interp.type_error("The fill character must be exactly one character long")),
    };
    Ok((width, fill))
}

fn str_center(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let s = text(interp, receiver)?;
    let (width, fill) = pad_args(interp, args, "center")?;
    let len = s.chars().count();
    if width <= len {
        return Ok(Value::str(s));
    }
    let margin = width - len;
    let left = margin / 2 + (margin & width & 1);
    let fill = |n: usize| fill.to_string().repeat(n);
    Ok(Value::str(format!("{}{s}{}", fill(left), fill(margin - left))))
}

fn str_ljust(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let s = text(interp, receiver)?;
    let (width, fill) = pad_args(interp, args, "ljust")?;
    let pad = width.saturating_sub(s.chars().count());
    Ok(Value::str(format!("{s}{}", fill.to_string().repeat(pad))))
}

fn str_rjust(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let s = text(interp, receiver)?;
    let (width, fill) = pad_args(interp, args, "rjust")?;
    let pad = width.saturating_sub(s.chars().count());
    Ok(Value::str(format!("{}{s}", fill.to_string().repeat(pad))))
}

fn str_zfill(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [width] = bind_args(interp, "zfill", args, ["width"], 1)?;
    let s = text(interp, receiver)?;
    let width = usize::try_from(int_arg(interp, width, 0)?).unwrap_or(0);
    let pad = width.saturating_sub(s.chars().count());
    let (sign, digits) = match s.chars().next() {
        Some(c @ ('+' | '-')) => (c.to_string(), &s[1..]),
        _ => (String::new(), s),
    };
    Ok(Value::str(format!("{sign}{}{digits}", "0".repeat(pad))))
}

fn partition_with(interp: &Interpreter, receiver: &Value, args: Args, name: &str, from_right: bool) -> Exec<Value> {
    let [sep] = bind_args(interp, name, args, ["sep"], 1)?;
    let s = text(interp, receiver)?;
    let Some(Value::Str(sep)) = sep else {
        return Err(interp.type_error("must be str"));
    };
    if sep.is_empty() {
        return Err(interp.value_error("empty separator"));
    }
    let found = if from_right { s.rfind(&*sep) } else { s.find(&*sep) };
    let parts = match found {
        Some(i) => [&s[..i], &*sep, &s[i + sep.len()..]],
        None if from_right => ["", "", s],
        None => [s, "", ""],
    };
    Ok(Value::tuple(parts.iter().map(|p| Value::str(*p)).collect()))
}

fn str_partition(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    partition_with(interp, receiver, args, "partition", false)
}

fn str_rpartition(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    partition_with(interp, receiver, args, "rpartition", true)
}

fn str_removeprefix(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [prefix] = bind_args(interp, "removeprefix", args, ["prefix"], 1)?;
    let s = text(interp, receiver)?;
    let prefix = str_arg(interp, prefix, "removeprefix")?.unwrap_or_default();
    Ok(Value::str(s.strip_prefix(prefix.as_str()).unwrap_or(s)))
}

fn str_removesuffix(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [suffix] = bind_args(interp, "removesuffix", args, ["suffix"], 1)?;
    let s = text(interp, receiver)?;
    let suffix = str_arg(interp, suffix, "removesuffix")?.unwrap_or_default();
    Ok(Value::str(s.strip_suffix(suffix.as_str()).unwrap_or(s)))
}

fn str_expandtabs(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [tabsize] = bind_args(interp, "expandtabs", args, ["tabsize"], 0)?;
    let s = text(interp, receiver)?;
    let tabsize = usize::try_from(int_arg(interp, tabsize, 8)?).unwrap_or(0);
    let mut out = String::with_capacity(s.len());
    let mut column = 0;
    for c in s.chars() {
        match c {
            '\t' => {
                if tabsize > 0 {
                    let spaces = tabsize - column % tabsize;
                    out.push_str(&" ".repeat(spaces));
                    column += spaces;
                }
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            c => {
                out.push(c);
                column += 1;
            }
        }
    }
    Ok(Value::str(out))
}

// ---- list and tuple --------------------------------------------------------------------------

fn list_append(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [item] = bind_args(interp, "append", args, ["object"], 1)?;
    list_cell(interp, receiver)?.borrow_mut().push(item.unwrap_or(Value::None));
    Ok(Value::None)
}

fn list_extend(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [iterable] = bind_args(interp, "extend", args, ["iterable"], 1)?;
    let items = interp.collect_iterable(&iterable.unwrap_or(Value::None))?;
    list_cell(interp, receiver)?.borrow_mut().extend(items);
    Ok(Value::None)
}

fn list_insert(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [index, item] = bind_args(interp, "insert", args, ["index", "object"], 2)?;
    let index = int_arg(interp, index, 0)?;
    let cell = list_cell(interp, receiver)?;
    let mut items = cell.borrow_mut();
    let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
    let position = if index < 0 { (index + len).max(0) } else { index.min(len) };
    items.insert(usize::try_from(position).unwrap_or(0), item.unwrap_or(Value::None));
    Ok(Value::None)
}

fn list_pop(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [index] = bind_args(interp, "pop", args, ["index"], 0)?;
    let index = int_arg(interp, index, -1)?;
    let cell = list_cell(interp, receiver)?;
    let mut items = cell.borrow_mut();
    if items.is_empty() {
        return interp.raise(ExceptionId::IndexError, "pop from empty list");
    }
    match runtest_core::sequences::normalize_index(items.len(), index) {
        Some(i) => Ok(items.remove(i)),
        None => interp.raise(ExceptionId::IndexError, "pop index out of range"),
    }
}

/// Position of the first element equal to `item`, comparing with user `__eq__`.
fn position_of(interp: &Interpreter, items: &[Value], item: &Value) -> Exec<Option<usize>> {
    for (i, candidate) in items.iter().enumerate() {
        if candidate.is_same(item) || interp.eq(candidate, item)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

fn list_remove(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [item] = bind_args(interp, "remove", args, ["value"], 1)?;
    let item = item.unwrap_or(Value::None);
    let cell = list_cell(interp, receiver)?;
    let snapshot = cell.borrow().clone();
    match position_of(interp, &snapshot, &item)? {
        Some(i) => {
            let mut items = cell.borrow_mut();
            if i < items.len() {
                items.remove(i);
            }
            Ok(Value::None)
        }
        None => interp.raise(ExceptionId::ValueError, "list.remove(x): x not in list"),
    }
}

fn sequence_items(interp: &Interpreter, receiver: &Value) -> Exec<Vec<Value>> {
    match receiver {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Tuple(items) => Ok(items.to_vec()),
        Value::Range(_) => interp.collect_iterable(receiver),
        other => Err(mismatch(interp, "list", other)),
    }
}

fn seq_index(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [item, start, end] = bind_args(interp, "index", args, ["value", "start", "stop"], 1)?;
    let item = item.unwrap_or(Value::None);
    let items = sequence_items(interp, receiver)?;
    let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
    let clamp = |n: i64| usize::try_from(if n < 0 { (n + len).max(0) } else { n.min(len) }).unwrap_or(0);
    let start = clamp(int_arg(interp, start, 0)?);
    let end = clamp(int_arg(interp, end, len)?).max(start);
    match position_of(interp, &items[start..end], &item)? {
        Some(i) => Ok(usize_of(start + i)),
        None => {
            let kind = interp.type_name(receiver);
            let message = match receiver {
                Value::List(_) => format!("{} is not in list", interp.repr(&item)?),
                Value::Range(_) => format!("{} is not in range", interp.repr(&item)?),
                _ => format!("{kind}.index(x): x not in {kind}"),
            };
            interp.raise(ExceptionId::ValueError, message)
        }
    }
}

fn seq_count(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [item] = bind_args(interp, "count", args, ["value"], 1)?;
    let item = item.unwrap_or(Value::None);
    let mut n = 0;
    for candidate in sequence_items(interp, receiver)? {
        if candidate.is_same(&item) || interp.eq(&candidate, &item)? {
            n += 1;
        }
    }
    Ok(usize_of(n))
}

fn list_sort(interp: &Interpreter, receiver: &Value, mut args: Args) -> Exec<Value> {
    let key = args.take_keyword("key").filter(|k| !k.is_none());
    let reverse = match args.take_keyword("reverse") {
        Some(flag) => interp.truthy(&flag)?,
        None => false,
    };
    if !args.positional.is_empty() {
        return Err(interp.type_error("sort() takes no positional arguments"));
    }
    no_keywords(interp, "sort", &args)?;
    let cell = list_cell(interp, receiver)?;
    let items = std::mem::take(&mut *cell.borrow_mut());
    let sorted = interp.sort_values(items.clone(), key.as_ref(), reverse);
    match sorted {
        Ok(sorted) => {
            *cell.borrow_mut() = sorted;
            Ok(Value::None)
        }
        Err(flow) => {
            *cell.borrow_mut() = items;
            Err(flow)
        }
    }
}

fn list_reverse(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "reverse", args, [], 0)?;
    list_cell(interp, receiver)?.borrow_mut().reverse();
    Ok(Value::None)
}

fn list_clear(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "clear", args, [], 0)?;
    list_cell(interp, receiver)?.borrow_mut().clear();
    Ok(Value::None)
}

fn list_copy(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "copy", args, [], 0)?;
    Ok(Value::list(list_cell(interp, receiver)?.borrow().clone()))
}

// ---- dict ------------------------------------------------------------------------------------

fn dict_keys(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "keys", args, [], 0)?;
    Ok(Value::list(dict_cell(interp, receiver)?.borrow().keys()))
}

fn dict_values(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "values", args, [], 0)?;
    Ok(Value::list(dict_cell(interp, receiver)?.borrow().values()))
}

fn dict_items(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "items", args, [], 0)?;
    let pairs = dict_cell(interp, receiver)?.borrow().items();
    Ok(Value::list(pairs.into_iter().map(|(k, v)| Value::tuple(vec![k, v])).collect()))
}

fn dict_get(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [key, default] = bind_args(interp, "get", args, ["key", "default"], 1)?;
    let key = key.unwrap_or(Value::None);
    interp.check_hashable(&key)?;
    let found = dict_cell(interp, receiver)?.borrow().get(&key);
    Ok(found.or(default).unwrap_or(Value::None))
}

fn dict_setdefault(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [key, default] = bind_args(interp, "setdefault", args, ["key", "default"], 1)?;
    let key = key.unwrap_or(Value::None);
    interp.check_hashable(&key)?;
    let cell = dict_cell(interp, receiver)?;
    if let Some(existing) = cell.borrow().get(&key) {
        return Ok(existing);
    }
    let value = default.unwrap_or(Value::None);
    cell.borrow_mut().insert(key, value.clone());
    Ok(value)
}

fn dict_pop(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [key, default] = bind_args(interp, "pop", args, ["key", "default"], 1)?;
    let key = key.unwrap_or(Value::None);
    interp.check_hashable(&key)?;
    let removed = dict_cell(interp, receiver)?.borrow_mut().remove(&key);
    match (removed, default) {
        (Some(value), _) => Ok(value),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(interp.key_error(key)),
    }
}

fn dict_popitem(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "popitem", args, [], 0)?;
    match dict_cell(interp, receiver)?.borrow_mut().pop_last() {
        Some((k, v)) => Ok(Value::tuple(vec![k, v])),
        None => interp.raise(ExceptionId::KeyError, "popitem(): dictionary is empty"),
    }
}

fn dict_update(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let Args { positional, keywords } = args;
    if positional.len() > 1 {
        return Err(interp.type_error(format!(
            "update expected at most 1 argument, got {}",
            positional.len()
        )));
    }
    let cell = dict_cell(interp, receiver)?;
    let mut map = cell.borrow().clone();
    if let Some(source) = positional.first() {
        types::dict_update(interp, &mut map, source)?;
    }
    for (key, value) in keywords {
        map.insert(Value::str(key), value);
    }
    *cell.borrow_mut() = map;
    Ok(Value::None)
}

fn dict_clear(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "clear", args, [], 0)?;
    dict_cell(interp, receiver)?.borrow_mut().clear();
    Ok(Value::None)
}

fn dict_copy(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "copy", args, [], 0)?;
    Ok(Value::dict(dict_cell(interp, receiver)?.borrow().clone()))
}

/// `dict.fromkeys(iterable, value=None)`
fn dict_fromkeys(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [iterable, value] = bind_args(interp, "fromkeys", args, ["iterable", "value"], 1)?;
    let value = value.unwrap_or(Value::None);
    let mut map = DictMap::new();
    for key in interp.collect_iterable(&iterable.unwrap_or(Value::None))? {
        interp.check_hashable(&key)?;
        map.insert(key, value.clone());
    }
    Ok(Value::dict(map))
}

// ---- set -------------------------------------------------------------------------------------

fn set_add(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [item] = bind_args(interp, "add", args, ["elem"], 1)?;
    let item = item.unwrap_or(Value::None);
    interp.check_hashable(&item)?;
    let cell = set_cell(interp, receiver)?;
    let mut items = cell.borrow_mut();
    if !items.iter().any(|x| values_equal(x, &item)) {
        items.push(item);
    }
    Ok(Value::None)
}

fn set_discard_item(interp: &Interpreter, receiver: &Value, item: &Value) -> Exec<bool> {
    interp.check_hashable(item)?;
    let cell = set_cell(interp, receiver)?;
    let mut items = cell.borrow_mut();
    match items.iter().position(|x| values_equal(x, item)) {
        Some(i) => {
            items.remove(i);
            Ok(true)
        }
        None => Ok(false),
    }
}

fn set_remove(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [item] = bind_args(interp, "remove", args, ["elem"], 1)?;
    let item = item.unwrap_or(Value::None);
    if set_discard_item(interp, receiver, &item)? {
        Ok(Value::None)
    } else {
        Err(interp.key_error(item))
    }
}

fn set_discard(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [item] = bind_args(interp, "discard", args, ["elem"], 1)?;
    set_discard_item(interp, receiver, &item.unwrap_or(Value::None))?;
    Ok(Value::None)
}

fn set_pop(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "pop", args, [], 0)?;
    let cell = set_cell(interp, receiver)?;
    let mut items = cell.borrow_mut();
    if items.is_empty() {
        return interp.raise(ExceptionId::KeyError, "pop from an empty set");
    }
    Ok(items.remove(0))
}

fn set_clear(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "clear", args, [], 0)?;
    set_cell(interp, receiver)?.borrow_mut().clear();
    Ok(Value::None)
}

fn set_copy(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "copy", args, [], 0)?;
    Ok(Value::set(set_cell(interp, receiver)?.borrow().clone()))
}

/// Elements of every positional argument, each collected as its own group.
fn operand_groups(interp: &Interpreter, args: Args, name: &str) -> Exec<Vec<Vec<Value>>> {
    no_keywords(interp, name, &args)?;
    args.positional
        .iter()
        .map(|operand| {
            let items = interp.collect_iterable(operand)?;
            for item in &items {
                interp.check_hashable(item)?;
            }
            Ok(items)
        })
        .collect()
}

fn member(items: &[Value], item: &Value) -> bool {
    items.iter().any(|x| values_equal(x, item))
}

fn set_update(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let groups = operand_groups(interp, args, "update")?;
    let cell = set_cell(interp, receiver)?;
    let mut items = cell.borrow_mut();
    for item in groups.into_iter().flatten() {
        if !member(&items, &item) {
            items.push(item);
        }
    }
    Ok(Value::None)
}

fn set_union(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let groups = operand_groups(interp, args, "union")?;
    let mut items = set_cell(interp, receiver)?.borrow().clone();
    items.extend(groups.into_iter().flatten());
    Ok(Value::set(items))
}

fn set_intersection(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let groups = operand_groups(interp, args, "intersection")?;
    let items: Vec<Value> = set_cell(interp, receiver)?
        .borrow()
        .iter()
        .filter(|x| groups.iter().all(|g| member(g, x)))
        .cloned()
        .collect();
    Ok(Value::set(items))
}

fn set_difference(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let groups = operand_groups(interp, args, "difference")?;
    let items: Vec<Value> = set_cell(interp, receiver)?
        .borrow()
        .iter()
        .filter(|x| !groups.iter().any(|g| member(g, x)))
        .cloned()
        .collect();
    Ok(Value::set(items))
}

fn set_symmetric_difference(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    let [other] = bind_args(interp, "symmetric_difference", args, ["other"], 1)?;
    let other = interp.collect_iterable(&other.unwrap_or(Value::None))?;
    let own = set_cell(interp, receiver)?.borrow().clone();
    let mut items: Vec<Value> = own.iter().filter(|x| !member(&other, x)).cloned().collect();
    items.extend(other.iter().filter(|x| !member(&own, x)).cloned());
    Ok(Value::set(items))
}

fn set_relation(interp: &Interpreter, receiver: &Value, args: Args, name: &str) -> Exec<Value> {
    let [other] = bind_args(interp, name, args, ["other"], 1)?;
    let other = interp.collect_iterable(&other.unwrap_or(Value::None))?;
    let own = set_cell(interp, receiver)?.borrow().clone();
    let result = match name {
        "issubset" => own.iter().all(|x| member(&other, x)),
        "issuperset" => other.iter().all(|x| member(&own, x)),
        _ => !own.iter().any(|x| member(&other, x)),
    };
    Ok(Value::Bool(result))
}

fn set_issubset(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    set_relation(interp, receiver, args, "issubset")
}

fn set_issuperset(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    set_relation(interp, receiver, args, "issuperset")
}

fn set_isdisjoint(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    set_relation(interp, receiver, args, "isdisjoint")
}

// ---- numbers and iterators -------------------------------------------------------------------

fn int_bit_length(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "bit_length", args, [], 0)?;
    let n = receiver.as_int().ok_or_else(|| mismatch(interp, "int", receiver))?;
    Ok(Value::Int(i64::from(64 - n.unsigned_abs().leading_zeros())))
}

fn int_is_integer(interp: &Interpreter, _receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "is_integer", args, [], 0)?;
    Ok(Value::Bool(true))
}

fn float_is_integer(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "is_integer", args, [], 0)?;
    let f = receiver.as_f64().ok_or_else(|| mismatch(interp, "float", receiver))?;
    Ok(Value::Bool(f.is_finite() && f.fract() == 0.0))
}

fn number_conjugate(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "conjugate", args, [], 0)?;
    Ok(match receiver {
        Value::Bool(b) => Value::Int(i64::from(*b)),
        other => other.clone(),
    })
}

fn iterator_next(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "__next__", args, [], 0)?;
    match interp.advance(receiver)? {
        Some(item) => Ok(item),
        None => interp.raise(ExceptionId::StopIteration, ""),
    }
}

fn iterator_iter(interp: &Interpreter, receiver: &Value, args: Args) -> Exec<Value> {
    bind_args(interp, "__iter__", args, [], 0)?;
    match receiver {
        Value::Iterator(_) => Ok(receiver.clone()),
        other => Ok(IterState::new(interp.collect_iterable(other)?, "iterator")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(receiver: Value, name: &str, positional: Vec<Value>) -> Option<Value> {
        let interp = Interpreter::new(".");
        let method = lookup(&receiver, name)?;
        interp.call(&method, Args::new(positional)).ok()
    }

    fn repr_of(value: Option<Value>) -> Option<String> {
        let interp = Interpreter::new(".");
        value.and_then(|v| interp.repr(&v).ok())
    }

    #[test]
    fn test_split_variants() {
        assert_eq!(
            repr_of(call(Value::str("  a b  c  "), "split", vec![])).as_deref(),
            Some("['a', 'b', 'c']")
        );
        assert_eq!(
            repr_of(call(Value::str("a,b,,c"), "split", vec![Value::str(",")])).as_deref(),
            Some("['a', 'b', '', 'c']")
        );
        assert_eq!(
            repr_of(call(Value::str("a b c"), "rsplit", vec![Value::None, Value::Int(1)])).as_deref(),
            Some("['a b', 'c']")
        );
        assert_eq!(split_whitespace("  a b  c  ", 1), vec!["a", "b  c  "]);
    }

    #[test]
    fn test_splitlines_and_partition() {
        assert_eq!(
            repr_of(call(Value::str("a\nb\r\nc"), "splitlines", vec![])).as_deref(),
            Some("['a', 'b', 'c']")
        );
        assert_eq!(
            repr_of(call(Value::str("k=v=w"), "partition", vec![Value::str("=")])).as_deref(),
            Some("('k', '=', 'v=w')")
        );
    }

    #[test]
    fn test_find_counts_characters() {
        let found = call(Value::str("héllo"), "find", vec![Value::str("llo")]);
        assert_eq!(found.and_then(|v| v.as_int()), Some(2));
        let missing = call(Value::str("abc"), "find", vec![Value::str("z")]);
        assert_eq!(missing.and_then(|v| v.as_int()), Some(-1));
    }

    #[test]
    fn test_center_matches_python_padding() {
        let centered = call(Value::str("ab"), "center", vec![Value::Int(5), Value::str("*")]);
        assert_eq!(centered.as_ref().and_then(Value::as_str), Some("**ab*"));
        let centered = call(Value::str("abc"), "center", vec![Value::Int(6)]);
        assert_eq!(centered.as_ref().and_then(Value::as_str), Some(" abc  "));
    }

    #[test]
    fn test_list_mutators() {
        let list = Value::list(vec![Value::Int(3), Value::Int(1)]);
        call(list.clone(), "append", vec![Value::Int(2)]);
        call(list.clone(), "sort", vec![]);
        assert_eq!(repr_of(Some(list.clone())).as_deref(), Some("[1, 2, 3]"));
        let popped = call(list.clone(), "pop", vec![Value::Int(0)]);
        assert_eq!(popped.and_then(|v| v.as_int()), Some(1));
        assert!(call(Value::list(Vec::new()), "pop", vec![]).is_none());
    }

    #[test]
    fn test_dict_get_and_pop() {
        let mut map = DictMap::new();
        map.insert(Value::str("a"), Value::Int(1));
        let dict = Value::dict(map);
        assert_eq!(call(dict.clone(), "get", vec![Value::str("a")]).and_then(|v| v.as_int()), Some(1));
        assert!(call(dict.clone(), "get", vec![Value::str("z")]).is_some_and(|v| v.is_none()));
        assert!(call(dict.clone(), "pop", vec![Value::str("z")]).is_none());
        assert_eq!(call(dict, "pop", vec![Value::str("a")]).and_then(|v| v.as_int()), Some(1));
    }

    #[test]
    fn test_unbound_method_takes_receiver() {
        let interp = Interpreter::new(".");
        let upper = unbound(DataType::Str, "upper");
        let result = upper.and_then(|m| interp.call(&m, Args::new(vec![Value::str("abc")])).ok());
        assert_eq!(result.as_ref().and_then(Value::as_str), Some("ABC"));
    }
}
