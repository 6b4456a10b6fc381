//! `repr()` and `str()` of runtime values, matching the interactive prompt's output.

use runtest_core::py_float_repr;

use super::{Exec, Interpreter};
use crate::value::{Args, Value};

impl Interpreter {
    /// `repr(value)`
    pub fn repr(&self, value: &Value) -> Exec<String> {
        Ok(match value {
            Value::None => "None".to_string(),
            Value::Ellipsis => "Ellipsis".to_string(),
            Value::NotImplemented => "NotImplemented".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => py_float_repr(*f),
            Value::Str(s) => quote_str(s),
            Value::Tuple(items) => match items.as_ref() {
                [] => "()".to_string(),
                [one] => format!("({},)", self.repr(one)?),
                _ => format!("({})", self.join_reprs(items)?),
            },
            Value::List(items) => {
                let address = value.address();
                if !self.enter_repr(address) {
                    return Ok("[...]".to_string());
                }
                let snapshot = items.borrow().clone();
                let inner = self.join_reprs(&snapshot);
                self.leave_repr(address);
                format!("[{}]", inner?)
            }
            Value::Dict(map) => {
                let address = value.address();
                if !self.enter_repr(address) {
                    return Ok("{...}".to_string());
                }
                let pairs = map.borrow().items();
                let inner: Exec<Vec<String>> = pairs
                    .iter()
                    .map(|(k, v)| Ok(format!("{}: {}", self.repr(k)?, self.repr(v)?)))
                    .collect();
                self.leave_repr(address);
                format!("{{{}}}", inner?.join(", "))
            }
            Value::Set(items) => {
                let snapshot = items.borrow().clone();
                if snapshot.is_empty() {
                    "set()".to_string()
                } else {
                    let address = value.address();
                    if !self.enter_repr(address) {
                        return Ok("set(...)".to_string());
                    }
                    let inner = self.join_reprs(&snapshot);
                    self.leave_repr(address);
                    format!("{{{}}}", inner?)
                }
            }
            Value::Range(range) => {
                if range.step == 1 {
                    format!("range({}, {})", range.start, range.stop)
                } else {
                    format!("range({}, {}, {})", range.start, range.stop, range.step)
                }
            }
            Value::Slice(slice) => format!(
                "slice({}, {}, {})",
                self.repr(&slice.lower)?,
                self.repr(&slice.upper)?,
                self.repr(&slice.step)?
            ),
            Value::Iterator(state) => {
                let kind = state.borrow().kind;
                if kind == "generator" {
                    format!("<generator object <genexpr> at {:#x}>", value.address())
                } else {
                    format!("<{kind} object at {:#x}>", value.address())
                }
            }
            Value::Function(function) => format!("<function {} at {:#x}>", function.qualname, value.address()),
            Value::Builtin(builtin) => format!("<built-in function {}>", builtin.name),
            Value::BoundMethod(method) => match &method.func {
                Value::Builtin(builtin) => format!(
                    "<built-in method {} of {} object at {:#x}>",
                    builtin.name,
                    self.type_name(&method.receiver),
                    method.receiver.address()
                ),
                func => {
                    let name = match func {
                        Value::Function(f) => f.qualname.clone(),
                        other => self.repr(other)?,
                    };
                    format!("<bound method {name} of {}>", self.repr(&method.receiver)?)
                }
            },
            Value::Class(class) if class.module != "builtins" => {
                format!("<class '{}.{}'>", class.module, class.qualname)
            }
            Value::Class(class) => format!("<class '{}'>", class.name),
            Value::Instance(instance) => {
                if let Some(method) = self.lookup_special(value, "__repr__")? {
                    let result = self.call(&method, Args::default())?;
                    return match result {
                        Value::Str(s) => Ok(s.to_string()),
                        other => Err(self.type_error(format!(
                            "__repr__ returned non-string (type {})",
                            self.type_name(&other)
                        ))),
                    };
                }
                if instance.class.exception_base().is_some() {
                    let args = self.exception_args(value)?;
                    let inner = match args.as_slice() {
                        [one] => self.repr(one)?,
                        many => self.join_reprs(many)?,
                    };
                    format!("{}({inner})", instance.class.name)
                } else {
                    format!(
                        "<{}.{} object at {:#x}>",
                        instance.class.module,
                        instance.class.qualname,
                        value.address()
                    )
                }
            }
            Value::Module(module) => match &module.file {
                Some(file) => format!("<module '{}' from '{}'>", module.name, file.name),
                None => format!("<module '{}' (built-in)>", module.name),
            },
            Value::Super(proxy) => format!(
                "<super: <class '{}'>, <{} object>>",
                proxy.after.name, proxy.receiver_class.name
            ),
            Value::StaticMethod(inner) => format!("<staticmethod({})>", self.repr(inner)?),
            Value::ClassMethod(inner) => format!("<classmethod({})>", self.repr(inner)?),
            Value::Property(_) => format!("<property object at {:#x}>", value.address()),
        })
    }

    /// `str(value)`
    pub fn str_of(&self, value: &Value) -> Exec<String> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            Value::Instance(instance) => {
                if let Some(method) = self.lookup_special(value, "__str__")? {
                    let result = self.call(&method, Args::default())?;
                    return match result {
                        Value::Str(s) => Ok(s.to_string()),
                        other => Err(self.type_error(format!(
                            "__str__ returned non-string (type {})",
                            self.type_name(&other)
                        ))),
                    };
                }
                if let Some(id) = instance.class.exception_base() {
                    return self.exception_str(value, id);
                }
                self.repr(value)
            }
            _ => self.repr(value),
        }
    }

    /// `exception.args` as a vector.
    pub(crate) fn exception_args(&self, exception: &Value) -> Exec<Vec<Value>> {
        let args = self.get_attr(exception, "args")?;
        self.collect_iterable(&args)
    }

    fn exception_str(&self, exception: &Value, id: runtest_core::lang::exceptions::ExceptionId) -> Exec<String> {
        use runtest_core::lang::exceptions::ExceptionId;

        if matches!(id, ExceptionId::SyntaxError | ExceptionId::IndentationError) {
            if let Some(text) = self.syntax_error_str(exception)? {
                return Ok(text);
            }
        }
        let args = self.exception_args(exception)?;
        match args.as_slice() {
            [] => Ok(String::new()),
            [one] if id == ExceptionId::KeyError => self.repr(one),
            [one] => self.str_of(one),
            many => self.repr(&Value::tuple(many.to_vec())),
        }
    }

    fn join_reprs(&self, items: &[Value]) -> Exec<String> {
        let parts: Vec<String> = items.iter().map(|v| self.repr(v)).collect::<Exec<_>>()?;
        Ok(parts.join(", "))
    }
}

/// Quote a string the way `repr(str)` does.
pub(crate) fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || (0x7f..=0xa0).contains(&(c as u32)) || c == '\u{ad}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_str_picks_quotes() {
        assert_eq!(quote_str("abc"), "'abc'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("both ' and \""), "'both \\' and \"'");
    }

    #[test]
    fn test_quote_str_escapes_controls() {
        assert_eq!(quote_str("a\nb\tc\\"), "'a\\nb\\tc\\\\'");
        assert_eq!(quote_str("\u{1}"), "'\\x01'");
    }

    #[test]
    fn test_container_reprs() {
        let interp = Interpreter::new(".");
        let list = Value::list(vec![Value::Int(1), Value::str("a"), Value::Float(2.5)]);
        assert_eq!(interp.repr(&list).ok().as_deref(), Some("[1, 'a', 2.5]"));
        let single = Value::tuple(vec![Value::None]);
        assert_eq!(interp.repr(&single).ok().as_deref(), Some("(None,)"));
        assert_eq!(interp.repr(&Value::set(Vec::new())).ok().as_deref(), Some("set()"));
    }

    #[test]
    fn test_recursive_list_repr() {
        let interp = Interpreter::new(".");
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(interp.repr(&list).ok().as_deref(), Some("[1, [...]]"));
    }
}
