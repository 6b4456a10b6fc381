//! Builtin classes, the `builtins` namespace, and natively implemented modules.
//!
//! ## Notes
//! - Builtin classes carry almost no attributes: methods of data types are resolved on demand by
//!   [`methods`], so special-method lookup (`__eq__`, `__repr__`, ...) only ever finds user code.
//! - `object.__init__` and `BaseException.__init__` are the exceptions; `super().__init__(...)`
//!   must resolve to something.

mod functions;
pub(crate) mod methods;
mod modules;
pub(crate) mod types;

use std::rc::Rc;

use runtest_core::lang::exceptions::{EXCEPTIONS, ExceptionId};

use crate::interp::{Exec, Interpreter};
use crate::unittest;
use crate::value::{Args, Class, ClassKind, DataType, Namespace, Value};

/// Builtin data types with their `__name__`, in declaration order of [`DataType`].
const DATA_TYPES: &[(DataType, &str)] = &[
    (DataType::NoneType, "NoneType"),
    (DataType::Bool, "bool"),
    (DataType::Int, "int"),
    (DataType::Float, "float"),
    (DataType::Str, "str"),
    (DataType::Tuple, "tuple"),
    (DataType::List, "list"),
    (DataType::Dict, "dict"),
    (DataType::Set, "set"),
    (DataType::Range, "range"),
    (DataType::Slice, "slice"),
    (DataType::Iterator, "iterator"),
    (DataType::Function, "function"),
    (DataType::BuiltinFunction, "builtin_function_or_method"),
    (DataType::Method, "method"),
    (DataType::Module, "module"),
    (DataType::Property, "property"),
    (DataType::StaticMethod, "staticmethod"),
    (DataType::ClassMethod, "classmethod"),
    (DataType::Super, "super"),
    (DataType::Ellipsis, "ellipsis"),
    (DataType::NotImplemented, "NotImplementedType"),
];

/// Data types reachable by name from the `builtins` namespace.
const NAMED_TYPES: &[DataType] = &[
    DataType::Bool,
    DataType::Int,
    DataType::Float,
    DataType::Str,
    DataType::Tuple,
    DataType::List,
    DataType::Dict,
    DataType::Set,
    DataType::Range,
    DataType::Slice,
    DataType::Property,
    DataType::StaticMethod,
    DataType::ClassMethod,
    DataType::Super,
];

/// The builtin class objects of one interpreter.
pub(crate) struct Types {
    pub object: Rc<Class>,
    pub type_: Rc<Class>,
    data: Vec<Rc<Class>>,
    exceptions: Vec<Rc<Class>>,
}

impl Types {
    pub fn new() -> Self {
        let object_attrs = Namespace::new();
        object_attrs.set("__init__", Value::builtin("__init__", |_, _| Ok(Value::None)));
        let object = Rc::new(Class {
            name: "object".to_string(),
            qualname: "object".to_string(),
            module: "builtins".to_string(),
            bases: Vec::new(),
            mro: Vec::new(),
            attrs: object_attrs,
            kind: ClassKind::Object,
            origin: None,
        });
        let type_ = native_class("type", "builtins", &object, ClassKind::Type, Namespace::new());

        let int = native_class("int", "builtins", &object, ClassKind::Data(DataType::Int), Namespace::new());
        let data = DATA_TYPES
            .iter()
            .map(|&(data_type, name)| match data_type {
                DataType::Int => int.clone(),
                DataType::Bool => native_class(name, "builtins", &int, ClassKind::Data(data_type), Namespace::new()),
                _ => native_class(name, "builtins", &object, ClassKind::Data(data_type), Namespace::new()),
            })
            .collect();

        let mut built: Vec<Rc<Class>> = Vec::with_capacity(EXCEPTIONS.len());
        for info in EXCEPTIONS {
            let base = match info.parent {
                Some(parent) => built[parent as usize].clone(),
                None => object.clone(),
            };
            let attrs = Namespace::new();
            if info.id == ExceptionId::BaseException {
                attrs.set("__init__", Value::builtin("__init__", base_exception_init));
            }
            built.push(native_class(info.canonical, info.module, &base, ClassKind::Exception(info.id), attrs));
        }

        Self {
            object,
            type_,
            data,
            exceptions: built,
        }
    }

    pub fn data(&self, data_type: DataType) -> Rc<Class> {
        self.data[data_type as usize].clone()
    }

    pub fn exception(&self, id: ExceptionId) -> Rc<Class> {
        self.exceptions[id as usize].clone()
    }
}

/// A class defined natively, with a single base.
pub(crate) fn native_class(name: &str, module: &str, base: &Rc<Class>, kind: ClassKind, attrs: Namespace) -> Rc<Class> {
    Rc::new(Class {
        name: name.to_string(),
        qualname: name.to_string(),
        module: module.to_string(),
        bases: vec![base.clone()],
        mro: base.linearization(),
        attrs,
        kind,
        origin: None,
    })
}

/// `BaseException.__init__(self, *args)`
fn base_exception_init(interp: &Interpreter, args: Args) -> Exec<Value> {
    let mut positional = args.positional.into_iter();
    let Some(receiver) = positional.next() else {
        return Err(interp.type_error("descriptor '__init__' of 'BaseException' object needs an argument"));
    };
    if let Value::Instance(instance) = &receiver {
        instance.attrs.set("args", Value::tuple(positional.collect()));
    }
    Ok(Value::None)
}

/// The `builtins` namespace every module falls back to.
pub(crate) fn namespace(types: &Types) -> Namespace {
    let ns = Namespace::new();
    ns.set("__name__", Value::str("builtins"));
    ns.set("object", Value::Class(types.object.clone()));
    ns.set("type", Value::Class(types.type_.clone()));
    for &data_type in NAMED_TYPES {
        let class = types.data(data_type);
        ns.set(class.name.clone(), Value::Class(class));
    }
    for info in EXCEPTIONS {
        if info.module == "builtins" {
            ns.set(info.canonical, Value::Class(types.exception(info.id)));
        }
    }
    ns.set("NotImplemented", Value::NotImplemented);
    ns.set("Ellipsis", Value::Ellipsis);
    for &(name, func) in functions::FUNCTIONS {
        ns.set(name, Value::builtin(name, func));
    }
    ns
}

/// Modules implemented natively; `None` for anything that must come from a file.
pub(crate) fn native_module(interp: &Interpreter, name: &str) -> Option<Rc<crate::value::Module>> {
    let ns = match name {
        "unittest" => unittest::module_namespace(interp),
        "math" => modules::math(),
        "sys" => modules::sys(interp),
        "doctest" => modules::doctest(),
        _ => return None,
    };
    ns.set("__name__", Value::str(name));
    tracing::debug!(module = %name, "native module created");
    Some(Rc::new(crate::value::Module {
        name: name.to_string(),
        ns,
        file: None,
        docstring: None,
    }))
}

/// Bind `args` to `names` (positionally, then by keyword); the first `required` names are mandatory.
pub(crate) fn bind_args<const N: usize>(
    interp: &Interpreter,
    func: &str,
    args: Args,
    names: [&str; N],
    required: usize,
) -> Exec<[Option<Value>; N]> {
    let Args { positional, keywords } = args;
    let given = positional.len();
    if given > N || (given < required && keywords.is_empty()) {
        let message = match (required == N, N) {
            (true, 1) => format!("{func}() takes exactly one argument ({given} given)"),
            (true, _) => format!("{func}() takes exactly {N} arguments ({given} given)"),
            (false, _) if given > N => format!("{func}() takes at most {N} arguments ({given} given)"),
            (false, _) => format!("{func}() takes at least {required} arguments ({given} given)"),
        };
        return Err(interp.type_error(message));
    }
    let mut out: [Option<Value>; N] = std::array::from_fn(|_| None);
    for (slot, value) in out.iter_mut().zip(positional) {
        *slot = Some(value);
    }
    for (key, value) in keywords {
        match names.iter().position(|n| *n == key) {
            Some(i) if out[i].is_some() => {
                return Err(interp.type_error(format!("{func}() got multiple values for argument '{key}'")));
            }
            Some(i) => out[i] = Some(value),
            None => {
                return Err(interp.type_error(format!("{func}() got an unexpected keyword argument '{key}'")));
            }
        }
    }
    if let Some(i) = (0..required).find(|&i| out[i].is_none()) {
        return Err(interp.type_error(format!(
            "{func}() missing required argument '{}' (pos {})",
            names[i],
            i + 1
        )));
    }
    Ok(out)
}

/// Reject keyword arguments for natives that take none.
pub(crate) fn no_keywords(interp: &Interpreter, func: &str, args: &Args) -> Exec<()> {
    if args.keywords.is_empty() {
        Ok(())
    } else {
        Err(interp.type_error(format!("{func}() takes no keyword arguments")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_types_are_indexed_by_discriminant() {
        for (i, (data_type, _)) in DATA_TYPES.iter().enumerate() {
            assert_eq!(*data_type as usize, i);
        }
    }

    #[test]
    fn test_bool_derives_from_int() {
        let types = Types::new();
        let bool_class = types.data(DataType::Bool);
        assert!(bool_class.is_subclass_of(&types.data(DataType::Int)));
        assert!(bool_class.is_subclass_of(&types.object));
    }

    #[test]
    fn test_exception_hierarchy() {
        let types = Types::new();
        let key_error = types.exception(ExceptionId::KeyError);
        assert!(key_error.is_subclass_of(&types.exception(ExceptionId::LookupError)));
        assert!(key_error.is_subclass_of(&types.exception(ExceptionId::BaseException)));
        assert_eq!(key_error.name, "KeyError");
        assert_eq!(types.exception(ExceptionId::SkipTest).module, "unittest.case");
    }

    #[test]
    fn test_namespace_exposes_types_and_functions() {
        let types = Types::new();
        let ns = namespace(&types);
        assert!(matches!(ns.get("int"), Some(Value::Class(_))));
        assert!(matches!(ns.get("ValueError"), Some(Value::Class(_))));
        assert!(matches!(ns.get("print"), Some(Value::Builtin(_))));
        assert!(ns.get("SkipTest").is_none());
    }

    #[test]
    fn test_bind_args_reports_arity() {
        let interp = Interpreter::new(".");
        let args = Args::new(vec![Value::Int(1), Value::Int(2)]);
        assert!(bind_args(&interp, "f", args, ["a"], 1).is_err());
        let args = Args::with_keywords(vec![Value::Int(1)], vec![("b".to_string(), Value::Int(2))]);
        let [a, b] = bind_args(&interp, "f", args, ["a", "b"], 1).ok().unwrap_or_default();
        assert!(a.is_some() && b.is_some());
    }
}
