//! Calling convention: argument binding, function frames, instantiation.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;
use runtest_syntax::ast::ParamKind;

use super::{CallRecord, Exec, Flow, Frame, FrameKind, Interpreter, MAX_CALL_DEPTH};
use crate::builtins;
use crate::value::{Args, Class, ClassKind, Code, DictMap, Function, Instance, Namespace, Value};

impl Interpreter {
    /// Call any callable value.
    pub fn call(&self, callee: &Value, args: Args) -> Exec<Value> {
        match callee {
            Value::Function(function) => self.call_function(function, args),
            Value::Builtin(builtin) => (builtin.func)(self, args),
            Value::BoundMethod(method) => {
                let mut args = args;
                args.positional.insert(0, method.receiver.clone());
                self.call(&method.func, args)
            }
            Value::Class(class) => self.instantiate(class, args),
            Value::StaticMethod(inner) => self.call(inner, args),
            Value::Instance(_) => match self.lookup_special(callee, "__call__")? {
                Some(method) => self.call(&method, args),
                None => Err(self.not_callable(callee)),
            },
            _ => Err(self.not_callable(callee)),
        }
    }

    /// Call a method on a value by name.
    pub(crate) fn call_method(&self, receiver: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
        let method = self.get_attr(receiver, name)?;
        self.call(&method, Args::new(args))
    }

    fn not_callable(&self, value: &Value) -> Flow {
        self.type_error(format!("'{}' object is not callable", self.type_name(value)))
    }

    fn call_function(&self, function: &Rc<Function>, args: Args) -> Exec<Value> {
        if self.call_depth() >= MAX_CALL_DEPTH {
            return self.raise(ExceptionId::RecursionError, "maximum recursion depth exceeded");
        }
        let locals = Namespace::new();
        self.bind_arguments(function, args, &locals)?;

        let frame = Frame {
            kind: FrameKind::Function,
            locals: locals.clone(),
            globals: function.globals.clone(),
            enclosing: function.closure.clone(),
            file: function.file.clone(),
            name: function.name.clone(),
            qualname: format!("{}.<locals>", function.qualname),
            line: Cell::new(function.line),
            declared_global: RefCell::new(Vec::new()),
            declared_nonlocal: RefCell::new(Vec::new()),
            echo: false,
        };

        self.push_call(CallRecord {
            function: function.clone(),
            locals,
        });
        let result = match &function.code {
            Code::Def(def) => self.exec_block(&frame, &def.body).map(|()| Value::None),
            Code::Lambda(lambda) => {
                frame.line.set(function.file.line_of(lambda.body.span.start));
                self.eval(&frame, &lambda.body)
            }
        };
        self.pop_call();

        match result {
            Ok(value) | Err(Flow::Return(value)) => Ok(value),
            Err(Flow::Raise(mut raised)) => {
                raised.traceback.insert(0, frame.trace_frame());
                Err(Flow::Raise(raised))
            }
            Err(Flow::Break | Flow::Continue) => Ok(Value::None),
        }
    }

    fn bind_arguments(&self, function: &Function, args: Args, locals: &Namespace) -> Exec<()> {
        let params = function.params();
        let name = function.qualname.as_str();
        let mut bound = vec![false; params.len()];

        let normal: Vec<usize> = params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == ParamKind::Normal)
            .map(|(i, _)| i)
            .collect();

        let given = args.positional.len();
        let mut extra = Vec::new();
        for (i, value) in args.positional.into_iter().enumerate() {
            match normal.get(i) {
                Some(&idx) => {
                    locals.set(params[idx].name.as_str(), value);
                    bound[idx] = true;
                }
                None => extra.push(value),
            }
        }
        match params.iter().position(|p| p.kind == ParamKind::VarArgs) {
            Some(idx) => {
                locals.set(params[idx].name.as_str(), Value::tuple(extra));
                bound[idx] = true;
            }
            None if !extra.is_empty() => {
                let required = normal.iter().filter(|&&i| function.defaults[i].is_none()).count();
                let takes = if required == normal.len() {
                    plural(normal.len(), "positional argument")
                } else {
                    format!("from {required} to {} positional arguments", normal.len())
                };
                let verb = if given == 1 { "was" } else { "were" };
                return Err(self.type_error(format!("{name}() takes {takes} but {given} {verb} given")));
            }
            None => {}
        }

        let var_keywords = params.iter().position(|p| p.kind == ParamKind::VarKeywords);
        let mut spill = DictMap::new();
        for (key, value) in args.keywords {
            let target = params
                .iter()
                .position(|p| p.name == key && matches!(p.kind, ParamKind::Normal | ParamKind::KeywordOnly));
            match target {
                Some(idx) if bound[idx] => {
                    return Err(self.type_error(format!("{name}() got multiple values for argument '{key}'")));
                }
                Some(idx) => {
                    locals.set(key, value);
                    bound[idx] = true;
                }
                None if var_keywords.is_some() => spill.insert(Value::str(key), value),
                None => {
                    return Err(self.type_error(format!("{name}() got an unexpected keyword argument '{key}'")));
                }
            }
        }
        if let Some(idx) = var_keywords {
            locals.set(params[idx].name.as_str(), Value::dict(spill));
            bound[idx] = true;
        }

        let mut missing_positional = Vec::new();
        let mut missing_keyword = Vec::new();
        for (idx, param) in params.iter().enumerate() {
            if bound[idx] {
                continue;
            }
            match (&function.defaults[idx], param.kind) {
                (Some(default), _) => locals.set(param.name.as_str(), default.clone()),
                (None, ParamKind::Normal) => missing_positional.push(param.name.as_str()),
                (None, ParamKind::KeywordOnly) => missing_keyword.push(param.name.as_str()),
                (None, _) => {}
            }
        }
        if !missing_positional.is_empty() {
            return Err(self.type_error(format!(
                "{name}() missing {}: {}",
                plural(missing_positional.len(), "required positional argument"),
                quoted_list(&missing_positional)
            )));
        }
        if !missing_keyword.is_empty() {
            return Err(self.type_error(format!(
                "{name}() missing {}: {}",
                plural(missing_keyword.len(), "required keyword-only argument"),
                quoted_list(&missing_keyword)
            )));
        }
        Ok(())
    }

    /// `Class(...)`: builtin conversions, exceptions and user classes.
    pub(crate) fn instantiate(&self, class: &Rc<Class>, args: Args) -> Exec<Value> {
        match class.kind {
            ClassKind::Data(data_type) => return builtins::types::construct(self, data_type, args),
            ClassKind::Type => {
                return match args.positional.as_slice() {
                    [value] if args.keywords.is_empty() => Ok(Value::Class(self.class_of(value))),
                    _ => Err(self.type_error("type() takes 1 argument")),
                };
            }
            ClassKind::Object | ClassKind::Exception(_) | ClassKind::User => {}
        }

        let instance = Rc::new(Instance {
            class: class.clone(),
            attrs: Namespace::new(),
        });
        let value = Value::Instance(instance.clone());
        if class.exception_base().is_some() {
            instance.attrs.set("args", Value::tuple(args.positional.clone()));
        }

        let inherits_object_init = class
            .defining_class("__init__")
            .is_none_or(|owner| owner.kind == ClassKind::Object);
        if inherits_object_init && !args.is_empty() {
            return Err(self.type_error(format!("{}() takes no arguments", class.name)));
        }

        match class.lookup("__init__") {
            Some(init) if !inherits_object_init => {
                let init = self.bind_attribute(init, &value)?;
                let result = self.call(&init, args)?;
                if !result.is_none() {
                    return Err(self.type_error(format!(
                        "__init__() should return None, not '{}'",
                        self.type_name(&result)
                    )));
                }
            }
            _ => {}
        }
        Ok(value)
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// `'a'`, `'a' and 'b'`, `'a', 'b', and 'c'`
fn quoted_list(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
    match quoted.as_slice() {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{a} and {b}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_list() {
        assert_eq!(quoted_list(&["a"]), "'a'");
        assert_eq!(quoted_list(&["a", "b"]), "'a' and 'b'");
        assert_eq!(quoted_list(&["a", "b", "c"]), "'a', 'b', and 'c'");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "positional argument"), "1 positional argument");
        assert_eq!(plural(0, "positional argument"), "0 positional arguments");
    }
}
