//! String formatting: the format-spec mini-language, `str.format` and `%`-interpolation.

use runtest_core::lang::exceptions::ExceptionId;
use runtest_core::py_float_repr;

use crate::interp::{Exec, Interpreter};
use crate::value::{Args, Value};

/// Parsed `[[fill]align][sign][#][0][width][grouping][.precision][type]`.
#[derive(Debug, Clone, PartialEq)]
struct Spec {
    fill: char,
    align: Option<char>,
    sign: char,
    alternate: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: '-',
            alternate: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        }
    }
}

fn parse_spec(spec: &str) -> Result<Spec, String> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Spec::default();
    let mut i = 0;
    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

    if chars.len() >= 2 && is_align(chars[1]) {
        out.fill = chars[0];
        out.align = Some(chars[1]);
        i = 2;
    } else if chars.first().is_some_and(|&c| is_align(c)) {
        out.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&c) = chars.get(i) {
        if matches!(c, '+' | '-' | ' ') {
            out.sign = c;
            i += 1;
        }
    }
    if chars.get(i) == Some(&'#') {
        out.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        if out.align.is_none() {
            out.fill = '0';
            out.align = Some('=');
        }
        i += 1;
    }
    let start = i;
    while chars.get(i).is_some_and(char::is_ascii_digit) {
        i += 1;
    }
    if i > start {
        out.width = chars[start..i].iter().collect::<String>().parse().map_err(|_| "Too many decimal digits in format string".to_string())?;
    }
    if let Some(&c) = chars.get(i) {
        if c == ',' || c == '_' {
            out.grouping = Some(c);
            i += 1;
        }
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return Err("Format specifier missing precision".to_string());
        }
        out.precision = chars[start..i].iter().collect::<String>().parse().ok();
    }
    if let Some(&c) = chars.get(i) {
        out.kind = Some(c);
        i += 1;
    }
    if i != chars.len() {
        return Err("Invalid format specifier".to_string());
    }
    Ok(out)
}

/// `format(value, spec)`
pub fn format_value(interp: &Interpreter, value: &Value, spec: &str) -> Exec<String> {
    if let Some(method) = interp.lookup_special(value, "__format__")? {
        let result = interp.call(&method, Args::new(vec![Value::str(spec)]))?;
        return interp.str_of(&result);
    }
    if spec.is_empty() {
        return interp.str_of(value);
    }
    let parsed = parse_spec(spec).map_err(|message| interp.value_error(message))?;
    match value {
        Value::Bool(_) if parsed.kind.is_none() => Ok(pad(interp.str_of(value)?, "", &parsed, '<')),
        Value::Int(_) | Value::Bool(_) => format_int(interp, value.as_int().unwrap_or(0), &parsed),
        Value::Float(f) => format_float(interp, *f, &parsed),
        Value::Str(s) => match parsed.kind {
            None | Some('s') => {
                let text: String = match parsed.precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s.to_string(),
                };
                Ok(pad(text, "", &parsed, '<'))
            }
            Some(kind) => Err(interp.value_error(format!(
                "Unknown format code '{kind}' for object of type 'str'"
            ))),
        },
        other => match parsed.kind {
            None | Some('s') => Ok(pad(interp.str_of(other)?, "", &parsed, '<')),
            _ => Err(interp.type_error(format!(
                "unsupported format string passed to {}.__format__",
                interp.type_name(other)
            ))),
        },
    }
}

fn format_int(interp: &Interpreter, value: i64, spec: &Spec) -> Exec<String> {
    let magnitude = value.unsigned_abs();
    let (digits, prefix) = match spec.kind {
        None | Some('d') | Some('n') => (magnitude.to_string(), ""),
        Some('b') => (format!("{magnitude:b}"), "0b"),
        Some('o') => (format!("{magnitude:o}"), "0o"),
        Some('x') => (format!("{magnitude:x}"), "0x"),
        Some('X') => (format!("{magnitude:X}"), "0X"),
        Some('c') => {
            let c = u32::try_from(value).ok().and_then(char::from_u32);
            return match c {
                Some(c) => Ok(pad(c.to_string(), "", spec, '<')),
                None => interp.raise(ExceptionId::OverflowError, "%c arg not in range(0x110000)"),
            };
        }
        Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') => return format_float(interp, value as f64, spec),
        Some(kind) => {
            return Err(interp.value_error(format!(
                "Unknown format code '{kind}' for object of type 'int'"
            )));
        }
    };
    let digits = match spec.grouping {
        Some(sep) => group_digits(&digits, sep, if prefix.is_empty() { 3 } else { 4 }),
        None => digits,
    };
    let mut sign = sign_prefix(value < 0, spec.sign).to_string();
    if spec.alternate {
        sign.push_str(prefix);
    }
    Ok(pad(digits, &sign, spec, '>'))
}

fn format_float(interp: &Interpreter, value: f64, spec: &Spec) -> Exec<String> {
    let negative = value.is_sign_negative() && !value.is_nan();
    let magnitude = value.abs();
    let body = if !magnitude.is_finite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        if matches!(spec.kind, Some('E' | 'F' | 'G')) {
            text.to_uppercase()
        } else {
            text.to_string()
        }
    } else {
        match spec.kind {
            Some('f' | 'F') => format!("{:.*}", spec.precision.unwrap_or(6), magnitude),
            Some('e' | 'E') => {
                let text = sci(magnitude, spec.precision.unwrap_or(6));
                if spec.kind == Some('E') { text.to_uppercase() } else { text }
            }
            Some('g' | 'G') => {
                let text = general(magnitude, spec.precision.unwrap_or(6), spec.alternate);
                if spec.kind == Some('G') { text.to_uppercase() } else { text }
            }
            Some('%') => format!("{:.*}%", spec.precision.unwrap_or(6), magnitude * 100.0),
            None => match spec.precision {
                Some(p) => {
                    let text = general(magnitude, p.max(1), spec.alternate);
                    if text.contains(['.', 'e', 'n', 'i']) { text } else { format!("{text}.0") }
                }
                None => py_float_repr(magnitude),
            },
            Some(kind) => {
                return Err(interp.value_error(format!(
                    "Unknown format code '{kind}' for object of type 'float'"
                )));
            }
        }
    };
    let body = match spec.grouping {
        Some(sep) => {
            let split = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
            format!("{}{}", group_digits(&body[..split], sep, 3), &body[split..])
        }
        None => body,
    };
    Ok(pad(body, sign_prefix(negative, spec.sign), spec, '>'))
}

fn sign_prefix(negative: bool, sign: char) -> &'static str {
    match (negative, sign) {
        (true, _) => "-",
        (false, '+') => "+",
        (false, ' ') => " ",
        _ => "",
    }
}

/// Scientific notation with a signed, at-least-two-digit exponent (`1.500000e+02`).
fn sci(value: f64, precision: usize) -> String {
    let raw = format!("{value:.precision$e}");
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

/// The `g` presentation type.
fn general(value: f64, precision: usize, alternate: bool) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return if alternate {
            format!("{:.*}", precision - 1, 0.0)
        } else {
            "0".to_string()
        };
    }
    let raw = format!("{:.*e}", precision - 1, value);
    let exponent: i64 = raw.split_once('e').and_then(|(_, e)| e.parse().ok()).unwrap_or(0);
    let p = i64::try_from(precision).unwrap_or(i64::MAX);
    let text = if (-4..p).contains(&exponent) {
        let decimals = usize::try_from(p - 1 - exponent).unwrap_or(0);
        format!("{value:.decimals$}")
    } else {
        sci(value, precision - 1)
    };
    if alternate {
        return text;
    }
    strip_trailing_zeros(&text)
}

fn strip_trailing_zeros(text: &str) -> String {
    let (mantissa, exponent) = match text.find('e') {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    format!("{mantissa}{exponent}")
}

fn group_digits(digits: &str, sep: char, every: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / every);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % every == 0 {
            out.push(sep);
        }
        out.push(*c);
    }
    out
}

fn pad(body: String, sign: &str, spec: &Spec, default_align: char) -> String {
    let len = sign.chars().count() + body.chars().count();
    if spec.width <= len {
        return format!("{sign}{body}");
    }
    let fill = spec.width - len;
    let repeat = |n: usize| spec.fill.to_string().repeat(n);
    match spec.align.unwrap_or(default_align) {
        '<' => format!("{sign}{body}{}", repeat(fill)),
        '^' => format!("{}{sign}{body}{}", repeat(fill / 2), repeat(fill - fill / 2)),
        '=' => format!("{sign}{}{body}", repeat(fill)),
        _ => format!("{}{sign}{body}", repeat(fill)),
    }
}

// ---- str.format ------------------------------------------------------------------------------

/// `template.format(*args, **kwargs)`
pub fn str_format(interp: &Interpreter, template: &str, args: &Args) -> Exec<String> {
    let mut auto_index = 0usize;
    render_template(interp, template, args, &mut auto_index, 0)
}

fn render_template(
    interp: &Interpreter,
    template: &str,
    args: &Args,
    auto_index: &mut usize,
    depth: usize,
) -> Exec<String> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                out.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                out.push('}');
                i += 2;
            }
            '}' => return Err(interp.value_error("Single '}' encountered in format string")),
            '{' => {
                let mut nesting = 1;
                let mut j = i + 1;
                while j < chars.len() {
                    match chars[j] {
                        '{' => nesting += 1,
                        '}' => {
                            nesting -= 1;
                            if nesting == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(interp.value_error("expected '}' before end of string"));
                }
                let field: String = chars[i + 1..j].iter().collect();
                out.push_str(&render_field(interp, &field, args, auto_index, depth)?);
                i = j + 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

fn render_field(interp: &Interpreter, field: &str, args: &Args, auto_index: &mut usize, depth: usize) -> Exec<String> {
    let (reference, spec) = match field.find(':') {
        Some(i) => (&field[..i], &field[i + 1..]),
        None => (field, ""),
    };
    let (reference, conversion) = match reference.find('!') {
        Some(i) => (&reference[..i], reference[i + 1..].chars().next()),
        None => (reference, None),
    };

    let name_end = reference.find(['.', '[']).unwrap_or(reference.len());
    let (name, mut accessors) = reference.split_at(name_end);
    let mut value = if name.is_empty() {
        let index = *auto_index;
        *auto_index += 1;
        positional(interp, args, index)?
    } else if let Ok(index) = name.parse::<usize>() {
        positional(interp, args, index)?
    } else {
        match args.keywords.iter().find(|(k, _)| k == name) {
            Some((_, v)) => v.clone(),
            None => {
                let exc = interp.exception_with_args(
                    interp.exception_class(ExceptionId::KeyError),
                    vec![Value::str(name)],
                );
                return Err(crate::interp::Flow::Raise(Box::new(crate::interp::Raised::new(exc))));
            }
        }
    };

    while !accessors.is_empty() {
        if let Some(rest) = accessors.strip_prefix('.') {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            value = interp.get_attr(&value, &rest[..end])?;
            accessors = &rest[end..];
        } else if let Some(rest) = accessors.strip_prefix('[') {
            let Some(end) = rest.find(']') else {
                return Err(interp.value_error("Missing ']' in format string"));
            };
            let key = &rest[..end];
            let key = match key.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::str(key),
            };
            value = interp.get_item(&value, &key)?;
            accessors = &rest[end + 1..];
        } else {
            return Err(interp.value_error("Only '.' or '[' may follow ']' in format field specifier"));
        }
    }

    let value = match conversion {
        Some('r') | Some('a') => Value::str(interp.repr(&value)?),
        Some('s') => Value::str(interp.str_of(&value)?),
        Some(other) => {
            return Err(interp.value_error(format!("Unknown conversion specifier {other}")));
        }
        None => value,
    };
    let spec = if spec.contains('{') && depth < 2 {
        render_template(interp, spec, args, auto_index, depth + 1)?
    } else {
        spec.to_string()
    };
    format_value(interp, &value, &spec)
}

fn positional(interp: &Interpreter, args: &Args, index: usize) -> Exec<Value> {
    match args.positional.get(index) {
        Some(value) => Ok(value.clone()),
        None => interp.raise(
            ExceptionId::IndexError,
            format!("Replacement index {index} out of range for positional args tuple"),
        ),
    }
}

// ---- %-interpolation ---------------------------------------------------------------------------

/// `template % args`
pub fn percent_format(interp: &Interpreter, template: &str, args: &Value) -> Exec<String> {
    let values: Vec<Value> = match args {
        Value::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    let mapping = matches!(args, Value::Dict(_)).then_some(args);
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut next = 0usize;
    let mut used_mapping = false;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '%' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;
        let mut key = None;
        if chars.get(i) == Some(&'(') {
            let Some(close) = chars[i..].iter().position(|&c| c == ')') else {
                return Err(interp.value_error("incomplete format key"));
            };
            key = Some(chars[i + 1..i + close].iter().collect::<String>());
            i += close + 1;
        }
        let mut spec = Spec::default();
        while let Some(&c) = chars.get(i) {
            match c {
                '-' => spec.align = Some('<'),
                '+' => spec.sign = '+',
                ' ' if spec.sign != '+' => spec.sign = ' ',
                '#' => spec.alternate = true,
                '0' => {
                    if spec.align.is_none() {
                        spec.fill = '0';
                        spec.align = Some('=');
                    }
                }
                _ => break,
            }
            i += 1;
        }
        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        spec.width = chars[start..i].iter().collect::<String>().parse().unwrap_or(0);
        if chars.get(i) == Some(&'.') {
            i += 1;
            let start = i;
            while chars.get(i).is_some_and(char::is_ascii_digit) {
                i += 1;
            }
            spec.precision = Some(chars[start..i].iter().collect::<String>().parse().unwrap_or(0));
        }
        let Some(&conversion) = chars.get(i) else {
            return Err(interp.value_error("incomplete format"));
        };
        i += 1;
        if conversion == '%' {
            out.push('%');
            continue;
        }

        let value = match (&key, mapping) {
            (Some(key), Some(map)) => {
                used_mapping = true;
                interp.get_item(map, &Value::str(key.as_str()))?
            }
            (Some(_), None) => return Err(interp.type_error("format requires a mapping")),
            (None, _) => {
                let Some(value) = values.get(next) else {
                    return Err(interp.type_error("not enough arguments for format string"));
                };
                next += 1;
                value.clone()
            }
        };
        if spec.align == Some('<') {
            spec.fill = ' ';
        }
        out.push_str(&percent_one(interp, conversion, &value, &mut spec)?);
    }

    if !used_mapping && mapping.is_none() && next < values.len() {
        return Err(interp.type_error("not all arguments converted during string formatting"));
    }
    Ok(out)
}

fn percent_one(interp: &Interpreter, conversion: char, value: &Value, spec: &mut Spec) -> Exec<String> {
    let number = |interp: &Interpreter| -> Exec<f64> {
        value.as_f64().ok_or_else(|| {
            interp.type_error(format!(
                "%{conversion} format: a real number is required, not {}",
                interp.type_name(value)
            ))
        })
    };
    match conversion {
        's' | 'r' | 'a' => {
            let text = if conversion == 's' {
                interp.str_of(value)?
            } else {
                interp.repr(value)?
            };
            let text = match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            };
            Ok(pad(text, "", spec, '>'))
        }
        'd' | 'i' | 'u' => {
            let n = match value {
                Value::Float(f) => f.trunc() as i64,
                other => match other.as_int() {
                    Some(n) => n,
                    None => {
                        return Err(interp.type_error(format!(
                            "%{conversion} format: a real number is required, not {}",
                            interp.type_name(value)
                        )));
                    }
                },
            };
            spec.kind = Some('d');
            format_int(interp, n, spec)
        }
        'x' | 'X' | 'o' => {
            let Some(n) = value.as_int() else {
                return Err(interp.type_error(format!(
                    "%{conversion} format: an integer is required, not {}",
                    interp.type_name(value)
                )));
            };
            spec.kind = Some(conversion);
            format_int(interp, n, spec)
        }
        'c' => match value {
            Value::Str(s) if s.chars().count() == 1 => Ok(pad(s.to_string(), "", spec, '>')),
            other => {
                let Some(n) = other.as_int() else {
                    return Err(interp.type_error("%c requires int or char"));
                };
                spec.kind = Some('c');
                spec.align.get_or_insert('>');
                format_int(interp, n, spec)
            }
        },
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
            let f = number(interp)?;
            spec.kind = Some(conversion);
            format_float(interp, f, spec)
        }
        other => Err(interp.value_error(format!(
            "unsupported format character '{other}' (0x{:x})",
            other as u32
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: Value, spec: &str) -> String {
        let interp = Interpreter::new(".");
        format_value(&interp, &value, spec).ok().unwrap_or_default()
    }

    #[test]
    fn test_parse_spec_fill_and_align() {
        let spec = parse_spec("*^10.3f").unwrap();
        assert_eq!(spec.fill, '*');
        assert_eq!(spec.align, Some('^'));
        assert_eq!(spec.width, 10);
        assert_eq!(spec.precision, Some(3));
        assert_eq!(spec.kind, Some('f'));
    }

    #[test]
    fn test_format_numbers() {
        assert_eq!(fmt(Value::Float(3.14159), ".2f"), "3.14");
        assert_eq!(fmt(Value::Int(42), "05d"), "00042");
        assert_eq!(fmt(Value::Int(-42), "05d"), "-0042");
        assert_eq!(fmt(Value::Int(1234567), ","), "1,234,567");
        assert_eq!(fmt(Value::Int(255), "#x"), "0xff");
        assert_eq!(fmt(Value::Float(1234.5), "e"), "1.234500e+03");
        assert_eq!(fmt(Value::Float(0.5), "%"), "50.000000%");
        assert_eq!(fmt(Value::Float(0.0001234), "g"), "0.0001234");
        assert_eq!(fmt(Value::Float(123456789.0), "g"), "1.23457e+08");
    }

    #[test]
    fn test_format_strings() {
        assert_eq!(fmt(Value::str("ab"), ">4"), "  ab");
        assert_eq!(fmt(Value::str("ab"), "-^6"), "--ab--");
        assert_eq!(fmt(Value::str("abcdef"), ".3"), "abc");
    }

    #[test]
    fn test_str_format() {
        let interp = Interpreter::new(".");
        let args = Args::with_keywords(
            vec![Value::Int(1), Value::str("x")],
            vec![("name".to_string(), Value::str("bob"))],
        );
        let out = str_format(&interp, "{} {1!r} {name:>5} {{}}", &args).ok();
        assert_eq!(out.as_deref(), Some("1 'x'   bob {}"));
    }

    #[test]
    fn test_percent_format() {
        let interp = Interpreter::new(".");
        let args = Value::tuple(vec![Value::str("a"), Value::Int(3), Value::Float(2.5)]);
        let out = percent_format(&interp, "%s-%03d-%.1f %%", &args).ok();
        assert_eq!(out.as_deref(), Some("a-003-2.5 %"));
        assert!(percent_format(&interp, "%s %s", &Value::Int(1)).is_err());
    }
}
