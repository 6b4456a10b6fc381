//! Runtime values and the object model.
//!
//! Scalars are stored inline; everything with identity (lists, dicts, functions, classes, instances)
//! lives behind an `Rc` so assignment aliases the object the way Python does. Identity (`is`) is
//! pointer equality on that `Rc`.
//!
//! ## Notes
//! - Builtin data types (`int`, `str`, `list`, ...) and builtin exceptions are ordinary [`Class`]
//!   values tagged with a [`ClassKind`], so `isinstance` and `except` walk one hierarchy.
//! - Reference cycles (a module's class whose methods reference the module globals) are not
//!   collected; a test run is short-lived.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use runtest_core::lang::exceptions::ExceptionId;
use runtest_core::sequences;
use runtest_syntax::ast;

use crate::interp::{Exec, Interpreter};
use crate::source::SourceFile;

/// Signature shared by every natively implemented callable.
pub type NativeFn = dyn Fn(&Interpreter, Args) -> Exec<Value>;

/// Runtime value
#[derive(Clone)]
pub enum Value {
    None,
    Ellipsis,
    NotImplemented,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Tuple(Rc<[Value]>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<DictMap>>),
    /// Insertion-ordered set; membership uses structural equality.
    Set(Rc<RefCell<Vec<Value>>>),
    Range(RangeValue),
    Slice(Rc<SliceValue>),
    Iterator(Rc<RefCell<IterState>>),
    Function(Rc<Function>),
    Builtin(Rc<Builtin>),
    BoundMethod(Rc<BoundMethod>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Module(Rc<Module>),
    Super(Rc<SuperProxy>),
    StaticMethod(Rc<Value>),
    ClassMethod(Rc<Value>),
    Property(Rc<Property>),
}

impl Value {
    pub fn str(text: impl Into<Rc<str>>) -> Value {
        Value::Str(text.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(items.into())
    }

    pub fn dict(map: DictMap) -> Value {
        Value::Dict(Rc::new(RefCell::new(map)))
    }

    pub fn set(items: Vec<Value>) -> Value {
        let mut unique: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.iter().any(|u| values_equal(u, &item)) {
                unique.push(item);
            }
        }
        Value::Set(Rc::new(RefCell::new(unique)))
    }

    pub fn builtin(name: impl Into<String>, func: impl Fn(&Interpreter, Args) -> Exec<Value> + 'static) -> Value {
        Value::Builtin(Rc::new(Builtin {
            name: name.into(),
            func: Box::new(func),
        }))
    }

    pub fn bound(receiver: Value, func: Value) -> Value {
        Value::BoundMethod(Rc::new(BoundMethod { receiver, func }))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of ints and bools (`True` is `1`).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of any real number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    /// `is` comparison.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None)
            | (Value::Ellipsis, Value::Ellipsis)
            | (Value::NotImplemented, Value::NotImplemented) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            // Small ints and interned strings behave as identical in CPython.
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || (a.len() <= 20 && a == b),
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b) || (a.is_empty() && b.is_empty()),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => Rc::ptr_eq(a, b),
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::BoundMethod(a), Value::BoundMethod(b)) => {
                a.receiver.is_same(&b.receiver) && a.func.is_same(&b.func)
            }
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Super(a), Value::Super(b)) => Rc::ptr_eq(a, b),
            (Value::StaticMethod(a), Value::StaticMethod(b)) | (Value::ClassMethod(a), Value::ClassMethod(b)) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Property(a), Value::Property(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Address used in default reprs such as `<Foo object at 0x...>`.
    pub fn address(&self) -> usize {
        match self {
            Value::List(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Dict(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Set(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Iterator(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Function(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Builtin(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::BoundMethod(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Class(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Instance(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Module(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Super(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Property(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Slice(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::StaticMethod(rc) | Value::ClassMethod(rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Value::Tuple(rc) => rc.as_ptr() as usize,
            Value::Str(rc) => rc.as_ptr() as usize,
            _ => 0,
        }
    }

    /// Whether the value may be used as a dict key or set member.
    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Dict(_) | Value::Set(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Ellipsis => write!(f, "Ellipsis"),
            Value::NotImplemented => write!(f, "NotImplemented"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            Value::List(items) => f.debug_tuple("List").field(&items.borrow()).finish(),
            Value::Dict(map) => write!(f, "Dict(len={})", map.borrow().len()),
            Value::Set(items) => write!(f, "Set(len={})", items.borrow().len()),
            Value::Range(r) => write!(f, "Range({}, {}, {})", r.start, r.stop, r.step),
            Value::Slice(_) => write!(f, "Slice"),
            Value::Iterator(it) => write!(f, "Iterator({})", it.borrow().kind),
            Value::Function(func) => write!(f, "Function({})", func.qualname),
            Value::Builtin(b) => write!(f, "Builtin({})", b.name),
            Value::BoundMethod(m) => write!(f, "BoundMethod({:?})", m.func),
            Value::Class(c) => write!(f, "Class({})", c.name),
            Value::Instance(i) => write!(f, "Instance({})", i.class.name),
            Value::Module(m) => write!(f, "Module({})", m.name),
            Value::Super(_) => write!(f, "Super"),
            Value::StaticMethod(_) => write!(f, "StaticMethod"),
            Value::ClassMethod(_) => write!(f, "ClassMethod"),
            Value::Property(_) => write!(f, "Property"),
        }
    }
}

/// Structural equality without invoking user code.
///
/// Used for dict keys and set membership; instances compare by identity.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => a.as_int() == b.as_int(),
        (Value::Float(_), _) | (_, Value::Float(_)) if a.is_number() && b.is_number() => a.as_f64() == b.as_f64(),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| values_equal(p, q))
        }
        (Value::List(x), Value::List(y)) => {
            Rc::ptr_eq(x, y) || {
                let (x, y) = (x.borrow(), y.borrow());
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| values_equal(p, q))
            }
        }
        (Value::Dict(x), Value::Dict(y)) => Rc::ptr_eq(x, y) || x.borrow().equals(&y.borrow()),
        (Value::Set(x), Value::Set(y)) => {
            Rc::ptr_eq(x, y) || {
                let (x, y) = (x.borrow(), y.borrow());
                x.len() == y.len() && x.iter().all(|p| y.iter().any(|q| values_equal(p, q)))
            }
        }
        (Value::Range(x), Value::Range(y)) => x.items_equal(y),
        _ => a.is_same(b),
    }
}

/// Insertion-ordered mapping with structural key equality.
#[derive(Clone, Default)]
pub struct DictMap {
    entries: Vec<(Value, Value)>,
}

impl DictMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: Vec<(Value, Value)>) -> Self {
        let mut map = Self::new();
        for (k, v) in pairs {
            map.insert(k, v);
        }
        map
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.entries.iter().position(|(k, _)| values_equal(k, key))
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.position(key).map(|i| self.entries[i].1.clone())
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    /// Insert or overwrite; an existing key keeps its position.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.position(&key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let i = self.position(key)?;
        Some(self.entries.remove(i).1)
    }

    pub fn pop_last(&mut self) -> Option<(Value, Value)> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn items(&self) -> Vec<(Value, Value)> {
        self.entries.clone()
    }

    fn equals(&self, other: &DictMap) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| values_equal(v, &ov)))
    }
}

/// `range(start, stop, step)`; `step` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> usize {
        sequences::range_len(self.start, self.stop, self.step)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        let offset = i64::try_from(index).ok()?.checked_mul(self.step)?;
        self.start.checked_add(offset)
    }

    pub fn contains(&self, value: i64) -> bool {
        let in_bounds = if self.step > 0 {
            value >= self.start && value < self.stop
        } else {
            value <= self.start && value > self.stop
        };
        in_bounds && (value as i128 - self.start as i128) % self.step as i128 == 0
    }

    fn items_equal(&self, other: &RangeValue) -> bool {
        let (len, other_len) = (self.len(), other.len());
        len == other_len && (len == 0 || (self.start == other.start && (len == 1 || self.step == other.step)))
    }
}

/// Evaluated `lower:upper:step` bounds.
#[derive(Debug, Clone)]
pub struct SliceValue {
    pub lower: Value,
    pub upper: Value,
    pub step: Value,
}

/// A one-shot iterator over materialized items (`iter()`, `map()`, generator expressions).
pub struct IterState {
    pub items: VecDeque<Value>,
    /// Type name shown in reprs, e.g. `list_iterator` or `generator`.
    pub kind: &'static str,
}

impl IterState {
    pub fn new(items: Vec<Value>, kind: &'static str) -> Value {
        Value::Iterator(Rc::new(RefCell::new(IterState {
            items: items.into(),
            kind,
        })))
    }
}

/// Shared, mutable variable scope (module globals, function locals, class bodies).
#[derive(Clone, Default)]
pub struct Namespace {
    vars: Rc<RefCell<IndexMap<String, Value>>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.borrow().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.vars.borrow_mut().shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    pub fn keys(&self) -> Vec<String> {
        self.vars.borrow().keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.vars.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// A new namespace holding the same bindings (values are shared, not cloned deeply).
    pub fn copy(&self) -> Namespace {
        Namespace {
            vars: Rc::new(RefCell::new(self.vars.borrow().clone())),
        }
    }

    pub fn ptr_eq(&self, other: &Namespace) -> bool {
        Rc::ptr_eq(&self.vars, &other.vars)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.vars.borrow().keys()).finish()
    }
}

/// Positional and keyword arguments of a call.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(positional: Vec<Value>, keywords: Vec<(String, Value)>) -> Self {
        Self { positional, keywords }
    }

    /// Remove and return a keyword argument.
    pub fn take_keyword(&mut self, name: &str) -> Option<Value> {
        let pos = self.keywords.iter().position(|(k, _)| k == name)?;
        Some(self.keywords.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Body of a user-defined callable.
#[derive(Debug, Clone)]
pub enum Code {
    Def(Rc<ast::FunctionDef>),
    Lambda(Rc<ast::Lambda>),
}

/// A user-defined function or lambda.
pub struct Function {
    pub name: String,
    pub qualname: String,
    pub module: String,
    pub code: Code,
    /// Evaluated defaults, aligned with the parameter list.
    pub defaults: Vec<Option<Value>>,
    pub globals: Namespace,
    /// Enclosing function scopes, innermost first.
    pub closure: Vec<Namespace>,
    pub file: Rc<SourceFile>,
    /// 1-based line of the definition (its first decorator, if any).
    pub line: usize,
    pub attrs: Namespace,
    /// Class whose body defined this function; drives zero-argument `super()`.
    pub owner: RefCell<Weak<Class>>,
}

impl Function {
    pub fn params(&self) -> &[ast::Param] {
        match &self.code {
            Code::Def(def) => &def.params,
            Code::Lambda(lambda) => &lambda.params,
        }
    }

    pub fn docstring(&self) -> Option<&ast::Docstring> {
        match &self.code {
            Code::Def(def) => def.doc.as_ref(),
            Code::Lambda(_) => None,
        }
    }
}

/// A natively implemented function.
pub struct Builtin {
    pub name: String,
    pub func: Box<NativeFn>,
}

pub struct BoundMethod {
    pub receiver: Value,
    pub func: Value,
}

/// Builtin data types that user code cannot subclass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    Tuple,
    List,
    Dict,
    Set,
    Range,
    Slice,
    Iterator,
    Function,
    BuiltinFunction,
    Method,
    Module,
    Property,
    StaticMethod,
    ClassMethod,
    Super,
    Ellipsis,
    NotImplemented,
}

/// What a class is, beyond its user-visible attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Object,
    Type,
    Data(DataType),
    Exception(ExceptionId),
    /// Defined by user code or by a native module (`unittest.TestCase`).
    User,
}

/// Where a user-defined class was declared.
#[derive(Clone)]
pub struct Origin {
    pub file: Rc<SourceFile>,
    /// 1-based line of the `class` statement (its first decorator, if any).
    pub line: usize,
    pub doc: Option<ast::Docstring>,
}

pub struct Class {
    pub name: String,
    pub qualname: String,
    pub module: String,
    pub bases: Vec<Rc<Class>>,
    /// Linearized ancestors, excluding the class itself.
    pub mro: Vec<Rc<Class>>,
    pub attrs: Namespace,
    pub kind: ClassKind,
    pub origin: Option<Origin>,
}

impl Class {
    /// `self` followed by its ancestors.
    pub fn linearization(self: &Rc<Self>) -> Vec<Rc<Class>> {
        let mut out = Vec::with_capacity(self.mro.len() + 1);
        out.push(self.clone());
        out.extend(self.mro.iter().cloned());
        out
    }

    /// Look an attribute up along the MRO.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.attrs
            .get(name)
            .or_else(|| self.mro.iter().find_map(|c| c.attrs.get(name)))
    }

    /// The class that defines `name`, searching the MRO.
    pub fn defining_class(self: &Rc<Self>, name: &str) -> Option<Rc<Class>> {
        self.linearization().into_iter().find(|c| c.attrs.contains(name))
    }

    pub fn is_subclass_of(self: &Rc<Self>, other: &Rc<Class>) -> bool {
        Rc::ptr_eq(self, other) || self.mro.iter().any(|c| Rc::ptr_eq(c, other))
    }

    /// The nearest builtin exception this class derives from.
    pub fn exception_base(&self) -> Option<ExceptionId> {
        if let ClassKind::Exception(id) = self.kind {
            return Some(id);
        }
        self.mro.iter().find_map(|c| match c.kind {
            ClassKind::Exception(id) => Some(id),
            _ => None,
        })
    }

    /// The builtin data type this class stands for, if any.
    pub fn data_type(&self) -> Option<DataType> {
        match self.kind {
            ClassKind::Data(t) => Some(t),
            _ => None,
        }
    }

    /// Name used in tracebacks and reprs: qualified with the module unless builtin.
    pub fn display_name(&self) -> String {
        if self.module == "builtins" || self.module == "__main__" {
            self.qualname.clone()
        } else {
            format!("{}.{}", self.module, self.qualname)
        }
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    pub attrs: Namespace,
}

#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub ns: Namespace,
    pub file: Option<Rc<SourceFile>>,
    pub docstring: Option<ast::Docstring>,
}

/// Result of zero- or two-argument `super()`.
pub struct SuperProxy {
    /// Lookup starts after this class in the receiver's MRO.
    pub after: Rc<Class>,
    pub receiver: Value,
    pub receiver_class: Rc<Class>,
}

pub struct Property {
    pub fget: Option<Value>,
    pub fset: Option<Value>,
    pub doc: Option<ast::Docstring>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality_crosses_types() {
        assert!(values_equal(&Value::Int(1), &Value::Bool(true)));
        assert!(values_equal(&Value::Int(2), &Value::Float(2.0)));
        assert!(!values_equal(&Value::Int(2), &Value::str("2")));
    }

    #[test]
    fn test_dict_map_keeps_insertion_order() {
        let mut map = DictMap::new();
        map.insert(Value::str("b"), Value::Int(1));
        map.insert(Value::str("a"), Value::Int(2));
        map.insert(Value::str("b"), Value::Int(3));
        let keys: Vec<String> = map.keys().iter().filter_map(|k| k.as_str().map(String::from)).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(values_equal(&map.get(&Value::str("b")).unwrap(), &Value::Int(3)));
        assert!(map.remove(&Value::str("a")).is_some());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_set_deduplicates() {
        let Value::Set(items) = Value::set(vec![Value::Int(1), Value::Float(1.0), Value::Int(2)]) else {
            panic!("expected a set");
        };
        assert_eq!(items.borrow().len(), 2);
    }

    #[test]
    fn test_range_membership() {
        let r = RangeValue {
            start: 10,
            stop: 0,
            step: -3,
        };
        assert_eq!(r.len(), 4);
        assert!(r.contains(4));
        assert!(!r.contains(5));
        assert_eq!(r.get(3), Some(1));
    }

    #[test]
    fn test_hashability() {
        assert!(Value::tuple(vec![Value::Int(1), Value::str("a")]).is_hashable());
        assert!(!Value::tuple(vec![Value::list(vec![])]).is_hashable());
    }

    #[test]
    fn test_namespace_copy_is_independent() {
        let ns = Namespace::new();
        ns.set("x", Value::Int(1));
        let copy = ns.copy();
        copy.set("y", Value::Int(2));
        assert!(!ns.contains("y"));
        assert!(copy.contains("x"));
        assert!(!ns.ptr_eq(&copy));
    }
}
