//! Attribute access, method binding and `super()`.

use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;

use super::{Exec, Flow, Interpreter};
use crate::builtins::methods;
use crate::value::{Args, Class, DataType, Property, SuperProxy, Value};

impl Interpreter {
    /// The class of any value.
    pub(crate) fn class_of(&self, value: &Value) -> Rc<Class> {
        let types = self.types();
        let data = |t: DataType| types.data(t);
        match value {
            Value::Instance(instance) => instance.class.clone(),
            Value::Class(_) => types.type_.clone(),
            Value::None => data(DataType::NoneType),
            Value::Ellipsis => data(DataType::Ellipsis),
            Value::NotImplemented => data(DataType::NotImplemented),
            Value::Bool(_) => data(DataType::Bool),
            Value::Int(_) => data(DataType::Int),
            Value::Float(_) => data(DataType::Float),
            Value::Str(_) => data(DataType::Str),
            Value::Tuple(_) => data(DataType::Tuple),
            Value::List(_) => data(DataType::List),
            Value::Dict(_) => data(DataType::Dict),
            Value::Set(_) => data(DataType::Set),
            Value::Range(_) => data(DataType::Range),
            Value::Slice(_) => data(DataType::Slice),
            Value::Iterator(_) => data(DataType::Iterator),
            Value::Function(_) => data(DataType::Function),
            Value::Builtin(_) => data(DataType::BuiltinFunction),
            Value::BoundMethod(_) => data(DataType::Method),
            Value::Module(_) => data(DataType::Module),
            Value::Super(_) => data(DataType::Super),
            Value::StaticMethod(_) => data(DataType::StaticMethod),
            Value::ClassMethod(_) => data(DataType::ClassMethod),
            Value::Property(_) => data(DataType::Property),
        }
    }

    /// `type(value).__name__`
    pub(crate) fn type_name(&self, value: &Value) -> String {
        match value {
            Value::Iterator(state) => state.borrow().kind.to_string(),
            _ => self.class_of(value).name.clone(),
        }
    }

    pub(crate) fn isinstance(&self, value: &Value, class: &Rc<Class>) -> bool {
        let own = self.class_of(value);
        if own.is_subclass_of(class) {
            return true;
        }
        // bool is a subclass of int.
        matches!(value, Value::Bool(_)) && class.data_type() == Some(DataType::Int)
    }

    /// `getattr(object, name)`; raises `AttributeError` when missing.
    pub fn get_attr(&self, object: &Value, name: &str) -> Exec<Value> {
        match self.lookup_attr(object, name)? {
            Some(value) => Ok(value),
            None => Err(self.attribute_error(object, name)),
        }
    }

    /// Attribute lookup that reports absence as `None` instead of raising.
    pub(crate) fn lookup_attr(&self, object: &Value, name: &str) -> Exec<Option<Value>> {
        if name == "__class__" {
            return Ok(Some(Value::Class(self.class_of(object))));
        }
        match object {
            Value::Instance(instance) => {
                let class_attr = instance.class.lookup(name);
                if let Some(Value::Property(property)) = &class_attr {
                    return self.property_get(property, object).map(Some);
                }
                if let Some(value) = instance.attrs.get(name) {
                    return Ok(Some(value));
                }
                if let Some(attr) = class_attr {
                    return self.bind_attribute(attr, object).map(Some);
                }
                if instance.class.exception_base().is_some() {
                    match name {
                        "args" => return Ok(Some(Value::tuple(Vec::new()))),
                        "__cause__" | "__context__" | "__traceback__" => return Ok(Some(Value::None)),
                        _ => {}
                    }
                }
                if name == "__dict__" {
                    let pairs = instance
                        .attrs
                        .entries()
                        .into_iter()
                        .map(|(k, v)| (Value::str(k), v))
                        .collect();
                    return Ok(Some(Value::dict(crate::value::DictMap::from_pairs(pairs))));
                }
                if let Some(hook) = instance.class.lookup("__getattr__") {
                    let hook = self.bind_attribute(hook, object)?;
                    return match self.call(&hook, Args::new(vec![Value::str(name)])) {
                        Ok(value) => Ok(Some(value)),
                        Err(Flow::Raise(raised)) if self.is_exception(&raised.exception, ExceptionId::AttributeError) => {
                            Ok(None)
                        }
                        Err(other) => Err(other),
                    };
                }
                Ok(None)
            }
            Value::Class(class) => Ok(self.class_attribute(class, name)),
            Value::Module(module) => Ok(module.ns.get(name)),
            Value::Function(function) => Ok(match name {
                "__name__" => Some(Value::str(function.name.as_str())),
                "__qualname__" => Some(Value::str(function.qualname.as_str())),
                "__module__" => Some(Value::str(function.module.as_str())),
                "__doc__" => Some(
                    function
                        .docstring()
                        .map(|d| Value::str(d.text.as_str()))
                        .unwrap_or(Value::None),
                ),
                _ => function.attrs.get(name),
            }),
            Value::BoundMethod(method) => match name {
                "__self__" => Ok(Some(method.receiver.clone())),
                "__func__" => Ok(Some(method.func.clone())),
                _ => self.lookup_attr(&method.func, name),
            },
            Value::Builtin(builtin) => Ok(match name {
                "__name__" | "__qualname__" => Some(Value::str(builtin.name.as_str())),
                "__doc__" => Some(Value::None),
                _ => None,
            }),
            Value::StaticMethod(inner) | Value::ClassMethod(inner) => match name {
                "__func__" => Ok(Some(inner.as_ref().clone())),
                _ => self.lookup_attr(inner, name),
            },
            Value::Property(property) => Ok(self.property_attribute(property, name)),
            Value::Super(proxy) => self.super_attribute(proxy, name),
            _ => Ok(methods::lookup(object, name)),
        }
    }

    /// Attribute of a class object: special names, then the MRO, then native methods.
    fn class_attribute(&self, class: &Rc<Class>, name: &str) -> Option<Value> {
        match name {
            "__name__" => return Some(Value::str(class.name.as_str())),
            "__qualname__" => return Some(Value::str(class.qualname.as_str())),
            "__module__" => return Some(Value::str(class.module.as_str())),
            "__mro__" => {
                return Some(Value::tuple(
                    class.linearization().into_iter().map(Value::Class).collect(),
                ));
            }
            "__bases__" => return Some(Value::tuple(class.bases.iter().cloned().map(Value::Class).collect())),
            _ => {}
        }
        if let Some(attr) = class.lookup(name) {
            return Some(match attr {
                Value::StaticMethod(inner) => inner.as_ref().clone(),
                Value::ClassMethod(inner) => Value::bound(Value::Class(class.clone()), inner.as_ref().clone()),
                other => other,
            });
        }
        if name == "__doc__" {
            return Some(Value::None);
        }
        class.data_type().and_then(|t| methods::unbound(t, name))
    }

    /// Bind a class attribute found for `receiver` (an instance).
    pub(crate) fn bind_attribute(&self, attr: Value, receiver: &Value) -> Exec<Value> {
        Ok(match attr {
            Value::Function(_) | Value::Builtin(_) => Value::bound(receiver.clone(), attr),
            Value::StaticMethod(inner) => inner.as_ref().clone(),
            Value::ClassMethod(inner) => Value::bound(Value::Class(self.class_of(receiver)), inner.as_ref().clone()),
            Value::Property(property) => return self.property_get(&property, receiver),
            other => other,
        })
    }

    /// Look up a special method on the type of `value` (instances only), bound to `value`.
    pub(crate) fn lookup_special(&self, value: &Value, name: &str) -> Exec<Option<Value>> {
        let Value::Instance(instance) = value else {
            return Ok(None);
        };
        match instance.class.lookup(name) {
            Some(attr) => self.bind_attribute(attr, value).map(Some),
            None => Ok(None),
        }
    }

    fn property_get(&self, property: &Property, receiver: &Value) -> Exec<Value> {
        match &property.fget {
            Some(getter) => self.call(getter, Args::new(vec![receiver.clone()])),
            None => self.raise(ExceptionId::AttributeError, "unreadable attribute"),
        }
    }

    fn property_attribute(&self, property: &Rc<Property>, name: &str) -> Option<Value> {
        match name {
            "fget" => Some(property.fget.clone().unwrap_or(Value::None)),
            "fset" => Some(property.fset.clone().unwrap_or(Value::None)),
            "__doc__" => Some(
                property
                    .doc
                    .as_ref()
                    .map(|d| Value::str(d.text.as_str()))
                    .unwrap_or(Value::None),
            ),
            "setter" | "getter" => {
                let base = property.clone();
                let is_setter = name == "setter";
                Some(Value::builtin(name, move |interp, args| {
                    let [func] = args.positional.as_slice() else {
                        return Err(interp.type_error("property decorator takes exactly one argument"));
                    };
                    let (fget, fset) = if is_setter {
                        (base.fget.clone(), Some(func.clone()))
                    } else {
                        (Some(func.clone()), base.fset.clone())
                    };
                    Ok(Value::Property(Rc::new(Property {
                        fget,
                        fset,
                        doc: base.doc.clone(),
                    })))
                }))
            }
            _ => None,
        }
    }

    pub(crate) fn set_attr(&self, object: &Value, name: &str, value: Value) -> Exec<()> {
        match object {
            Value::Instance(instance) => {
                if let Some(Value::Property(property)) = instance.class.lookup(name) {
                    return match &property.fset {
                        Some(setter) => self.call(setter, Args::new(vec![object.clone(), value])).map(|_| ()),
                        None => self.raise(
                            ExceptionId::AttributeError,
                            format!("property '{name}' of '{}' object has no setter", instance.class.name),
                        ),
                    };
                }
                instance.attrs.set(name, value);
                Ok(())
            }
            Value::Class(class) if class.data_type().is_none() => {
                class.attrs.set(name, value);
                Ok(())
            }
            Value::Class(class) => Err(self.type_error(format!(
                "cannot set '{name}' attribute of immutable type '{}'",
                class.name
            ))),
            Value::Module(module) => {
                module.ns.set(name, value);
                Ok(())
            }
            Value::Function(function) => {
                function.attrs.set(name, value);
                Ok(())
            }
            _ => self.raise(
                ExceptionId::AttributeError,
                format!("'{}' object has no attribute '{name}'", self.type_name(object)),
            ),
        }
    }

    pub(crate) fn del_attr(&self, object: &Value, name: &str) -> Exec<()> {
        let removed = match object {
            Value::Instance(instance) => instance.attrs.remove(name),
            Value::Class(class) if class.data_type().is_none() => class.attrs.remove(name),
            Value::Module(module) => module.ns.remove(name),
            Value::Function(function) => function.attrs.remove(name),
            _ => None,
        };
        match removed {
            Some(_) => Ok(()),
            None => Err(self.attribute_error(object, name)),
        }
    }

    pub(crate) fn attribute_error(&self, object: &Value, name: &str) -> Flow {
        let message = match object {
            Value::Class(class) => format!("type object '{}' has no attribute '{name}'", class.name),
            Value::Module(module) => format!("module '{}' has no attribute '{name}'", module.name),
            _ => format!("'{}' object has no attribute '{name}'", self.type_name(object)),
        };
        self.error(ExceptionId::AttributeError, message)
    }

    /// Whether `value` is an instance of the builtin exception `id` (or a subclass).
    pub(crate) fn is_exception(&self, value: &Value, id: ExceptionId) -> bool {
        match value {
            Value::Instance(instance) => instance.class.is_subclass_of(&self.exception_class(id)),
            _ => false,
        }
    }

    // ---- super -----------------------------------------------------------------------------

    /// `super()` or `super(Class, receiver)`.
    pub(crate) fn make_super(&self, args: Args) -> Exec<Value> {
        let (after, receiver) = match args.positional.as_slice() {
            [Value::Class(class), receiver] => (class.clone(), receiver.clone()),
            [] => {
                let Some((function, locals)) = self.current_call() else {
                    return self.raise(ExceptionId::RuntimeError, "super(): no arguments");
                };
                let Some(owner) = function.owner.borrow().upgrade() else {
                    return self.raise(ExceptionId::RuntimeError, "super(): __class__ cell not found");
                };
                let receiver = function
                    .params()
                    .first()
                    .and_then(|p| locals.get(&p.name));
                let Some(receiver) = receiver else {
                    return self.raise(ExceptionId::RuntimeError, "super(): no arguments");
                };
                (owner, receiver)
            }
            _ => return Err(self.type_error("super() takes zero or two arguments")),
        };
        let receiver_class = match &receiver {
            Value::Class(class) => class.clone(),
            other => self.class_of(other),
        };
        if !receiver_class.is_subclass_of(&after) {
            return Err(self.type_error("super(type, obj): obj must be an instance or subtype of type"));
        }
        Ok(Value::Super(Rc::new(SuperProxy {
            after,
            receiver,
            receiver_class,
        })))
    }

    fn super_attribute(&self, proxy: &SuperProxy, name: &str) -> Exec<Option<Value>> {
        let linearization = proxy.receiver_class.linearization();
        let start = linearization
            .iter()
            .position(|c| Rc::ptr_eq(c, &proxy.after))
            .map_or(linearization.len(), |i| i + 1);
        let Some(attr) = linearization[start..].iter().find_map(|c| c.attrs.get(name)) else {
            return Ok(None);
        };
        if let Value::Class(_) = proxy.receiver {
            return Ok(Some(match attr {
                Value::StaticMethod(inner) => inner.as_ref().clone(),
                Value::ClassMethod(inner) => Value::bound(proxy.receiver.clone(), inner.as_ref().clone()),
                other => other,
            }));
        }
        self.bind_attribute(attr, &proxy.receiver).map(Some)
    }
}
