//! Operators: arithmetic, comparison, truthiness, containment and subscripting.
//!
//! Builtin values are handled natively; instances of user classes dispatch to their special methods,
//! with `NotImplemented` falling through to the reflected method of the right operand.

use std::cmp::Ordering;
use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;
use runtest_core::sequences::{normalize_index, slice_indices};
use runtest_core::{py_floor_div_f64, py_floor_div_i64, py_mod_f64, py_mod_i64};
use runtest_syntax::ast::{BinaryOp, CompareOp, UnaryOp};

use super::{Exec, Flow, Interpreter};
use crate::format;
use crate::value::{Args, DictMap, RangeValue, SliceValue, Value, values_equal};

/// Special method names of a binary operator: (normal, reflected, in-place).
fn dunder_names(op: BinaryOp) -> (&'static str, &'static str, &'static str) {
    match op {
        BinaryOp::Add => ("__add__", "__radd__", "__iadd__"),
        BinaryOp::Sub => ("__sub__", "__rsub__", "__isub__"),
        BinaryOp::Mul => ("__mul__", "__rmul__", "__imul__"),
        BinaryOp::Div => ("__truediv__", "__rtruediv__", "__itruediv__"),
        BinaryOp::FloorDiv => ("__floordiv__", "__rfloordiv__", "__ifloordiv__"),
        BinaryOp::Mod => ("__mod__", "__rmod__", "__imod__"),
        BinaryOp::Pow => ("__pow__", "__rpow__", "__ipow__"),
        BinaryOp::BitAnd => ("__and__", "__rand__", "__iand__"),
        BinaryOp::BitOr => ("__or__", "__ror__", "__ior__"),
        BinaryOp::BitXor => ("__xor__", "__rxor__", "__ixor__"),
        BinaryOp::LShift => ("__lshift__", "__rlshift__", "__ilshift__"),
        BinaryOp::RShift => ("__rshift__", "__rrshift__", "__irshift__"),
    }
}

/// Special method names of an ordering comparison: (normal, reflected).
fn ordering_names(op: CompareOp) -> (&'static str, &'static str) {
    match op {
        CompareOp::Lt => ("__lt__", "__gt__"),
        CompareOp::LtEq => ("__le__", "__ge__"),
        CompareOp::Gt => ("__gt__", "__lt__"),
        _ => ("__ge__", "__le__"),
    }
}

fn ordering_holds(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    }
}

impl Interpreter {
    // ---- truthiness and length -------------------------------------------------------------

    pub(crate) fn truthy(&self, value: &Value) -> Exec<bool> {
        Ok(match value {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Dict(map) => !map.borrow().is_empty(),
            Value::Set(items) => !items.borrow().is_empty(),
            Value::Range(range) => !range.is_empty(),
            Value::Instance(_) => {
                if let Some(method) = self.lookup_special(value, "__bool__")? {
                    return match self.call(&method, Args::default())? {
                        Value::Bool(b) => Ok(b),
                        other => Err(self.type_error(format!(
                            "__bool__ should return bool, returned {}",
                            self.type_name(&other)
                        ))),
                    };
                }
                if self.lookup_special(value, "__len__")?.is_some() {
                    return Ok(self.len_of(value)? > 0);
                }
                true
            }
            _ => true,
        })
    }

    /// `len(value)`
    pub(crate) fn len_of(&self, value: &Value) -> Exec<usize> {
        Ok(match value {
            Value::Str(s) => s.chars().count(),
            Value::Tuple(items) => items.len(),
            Value::List(items) => items.borrow().len(),
            Value::Dict(map) => map.borrow().len(),
            Value::Set(items) => items.borrow().len(),
            Value::Range(range) => range.len(),
            Value::Instance(_) => match self.lookup_special(value, "__len__")? {
                Some(method) => {
                    let result = self.call(&method, Args::default())?;
                    match result.as_int() {
                        Some(n) if n >= 0 => n as usize,
                        Some(_) => return self.raise(ExceptionId::ValueError, "__len__() should return >= 0"),
                        None => {
                            return Err(self.type_error(format!(
                                "'{}' object cannot be interpreted as an integer",
                                self.type_name(&result)
                            )));
                        }
                    }
                }
                None => return Err(self.no_len(value)),
            },
            _ => return Err(self.no_len(value)),
        })
    }

    fn no_len(&self, value: &Value) -> Flow {
        self.type_error(format!("object of type '{}' has no len()", self.type_name(value)))
    }

    // ---- arithmetic ------------------------------------------------------------------------

    pub(crate) fn binary_op(&self, op: BinaryOp, left: Value, right: Value) -> Exec<Value> {
        if matches!(left, Value::Instance(_)) || matches!(right, Value::Instance(_)) {
            let (name, reflected, _) = dunder_names(op);
            if let Some(method) = self.lookup_special(&left, name)? {
                let result = self.call(&method, Args::new(vec![right.clone()]))?;
                if !matches!(result, Value::NotImplemented) {
                    return Ok(result);
                }
            }
            if let Some(method) = self.lookup_special(&right, reflected)? {
                let result = self.call(&method, Args::new(vec![left.clone()]))?;
                if !matches!(result, Value::NotImplemented) {
                    return Ok(result);
                }
            }
            return Err(self.unsupported_operands(op, &left, &right));
        }
        match self.native_binary(op, &left, &right)? {
            Some(value) => Ok(value),
            None => Err(self.unsupported_operands(op, &left, &right)),
        }
    }

    /// `target op= value`: mutates lists, sets and dicts in place, otherwise falls back to `op`.
    pub(crate) fn inplace_op(&self, op: BinaryOp, left: Value, right: Value) -> Exec<Value> {
        match (&left, op) {
            (Value::List(items), BinaryOp::Add) => {
                let extra = self.collect_iterable(&right)?;
                items.borrow_mut().extend(extra);
                return Ok(left);
            }
            (Value::List(items), BinaryOp::Mul) => {
                if let Some(n) = right.as_int() {
                    let repeated = repeat(&items.borrow(), n);
                    *items.borrow_mut() = repeated;
                    return Ok(left);
                }
            }
            (Value::Set(_), BinaryOp::BitOr | BinaryOp::BitAnd | BinaryOp::Sub | BinaryOp::BitXor) => {
                if let (Value::Set(items), Some(Value::Set(result))) = (&left, self.native_binary(op, &left, &right)?) {
                    let result = result.borrow().clone();
                    *items.borrow_mut() = result;
                    return Ok(left);
                }
            }
            (Value::Dict(map), BinaryOp::BitOr) => {
                if let Value::Dict(other) = &right {
                    let pairs = other.borrow().items();
                    let mut map = map.borrow_mut();
                    for (k, v) in pairs {
                        map.insert(k, v);
                    }
                    drop(map);
                    return Ok(left);
                }
            }
            (Value::Instance(_), _) => {
                let (_, _, name) = dunder_names(op);
                if let Some(method) = self.lookup_special(&left, name)? {
                    let result = self.call(&method, Args::new(vec![right.clone()]))?;
                    if !matches!(result, Value::NotImplemented) {
                        return Ok(result);
                    }
                }
            }
            _ => {}
        }
        self.binary_op(op, left, right)
    }

    fn unsupported_operands(&self, op: BinaryOp, left: &Value, right: &Value) -> Flow {
        let (l, r) = (self.type_name(left), self.type_name(right));
        match (op, left) {
            (BinaryOp::Add, Value::Str(_) | Value::List(_) | Value::Tuple(_)) => {
                self.type_error(format!("can only concatenate {l} (not \"{r}\") to {l}"))
            }
            (BinaryOp::Mul, Value::Str(_) | Value::List(_) | Value::Tuple(_)) => {
                self.type_error(format!("can't multiply sequence by non-int of type '{r}'"))
            }
            (BinaryOp::Pow, _) => self.type_error(format!("unsupported operand type(s) for ** or pow(): '{l}' and '{r}'")),
            _ => self.type_error(format!("unsupported operand type(s) for {op}: '{l}' and '{r}'")),
        }
    }

    /// Binary operation on builtin values; `Ok(None)` when the operand types are not supported.
    fn native_binary(&self, op: BinaryOp, left: &Value, right: &Value) -> Exec<Option<Value>> {
        if let (Some(a), Some(b)) = (int_operand(left), int_operand(right)) {
            if let (Value::Bool(x), Value::Bool(y), BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor) =
                (left, right, op)
            {
                let result = match op {
                    BinaryOp::BitAnd => x & y,
                    BinaryOp::BitOr => x | y,
                    _ => x ^ y,
                };
                return Ok(Some(Value::Bool(result)));
            }
            return self.int_binary(op, a, b).map(Some);
        }
        if left.is_number() && right.is_number() {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Ok(None);
            };
            return self.float_binary(op, a, b);
        }

        Ok(match (op, left, right) {
            (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Some(Value::str(format!("{a}{b}"))),
            (BinaryOp::Add, Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Some(Value::list(items))
            }
            (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
                Some(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
            }
            (BinaryOp::Mul, seq, n) | (BinaryOp::Mul, n, seq) if int_operand(n).is_some() => {
                let n = int_operand(n).unwrap_or(0);
                match seq {
                    Value::Str(s) => Some(Value::str(s.repeat(usize::try_from(n).unwrap_or(0)))),
                    Value::List(items) => Some(Value::list(repeat(&items.borrow(), n))),
                    Value::Tuple(items) => Some(Value::tuple(repeat(items, n))),
                    _ => None,
                }
            }
            (BinaryOp::Mod, Value::Str(template), args) => {
                Some(Value::str(format::percent_format(self, template, args)?))
            }
            (BinaryOp::BitOr | BinaryOp::BitAnd | BinaryOp::Sub | BinaryOp::BitXor, Value::Set(a), Value::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                let in_b = |v: &Value| b.iter().any(|w| values_equal(v, w));
                let in_a = |v: &Value| a.iter().any(|w| values_equal(v, w));
                let items: Vec<Value> = match op {
                    BinaryOp::BitOr => a.iter().chain(b.iter()).cloned().collect(),
                    BinaryOp::BitAnd => a.iter().filter(|v| in_b(v)).cloned().collect(),
                    BinaryOp::Sub => a.iter().filter(|v| !in_b(v)).cloned().collect(),
                    _ => a
                        .iter()
                        .filter(|v| !in_b(v))
                        .chain(b.iter().filter(|v| !in_a(v)))
                        .cloned()
                        .collect(),
                };
                Some(Value::set(items))
            }
            (BinaryOp::BitOr, Value::Dict(a), Value::Dict(b)) => {
                let mut map = a.borrow().clone();
                for (k, v) in b.borrow().items() {
                    map.insert(k, v);
                }
                Some(Value::dict(map))
            }
            _ => None,
        })
    }

    fn int_binary(&self, op: BinaryOp, a: i64, b: i64) -> Exec<Value> {
        let checked = |result: Option<i64>| match result {
            Some(v) => Ok(Value::Int(v)),
            None => self.raise(ExceptionId::OverflowError, "integer result too large"),
        };
        match op {
            BinaryOp::Add => checked(a.checked_add(b)),
            BinaryOp::Sub => checked(a.checked_sub(b)),
            BinaryOp::Mul => checked(a.checked_mul(b)),
            BinaryOp::Div => {
                if b == 0 {
                    return self.raise(ExceptionId::ZeroDivisionError, "division by zero");
                }
                Ok(Value::Float(a as f64 / b as f64))
            }
            BinaryOp::FloorDiv | BinaryOp::Mod => {
                if b == 0 {
                    return self.raise(ExceptionId::ZeroDivisionError, "integer division or modulo by zero");
                }
                checked(if op == BinaryOp::Mod {
                    py_mod_i64(a, b)
                } else {
                    py_floor_div_i64(a, b)
                })
            }
            BinaryOp::Pow => {
                if b < 0 {
                    if a == 0 {
                        return self.raise(
                            ExceptionId::ZeroDivisionError,
                            "0.0 cannot be raised to a negative power",
                        );
                    }
                    return Ok(Value::Float((a as f64).powf(b as f64)));
                }
                checked(u32::try_from(b).ok().and_then(|b| a.checked_pow(b)))
            }
            BinaryOp::BitAnd => Ok(Value::Int(a & b)),
            BinaryOp::BitOr => Ok(Value::Int(a | b)),
            BinaryOp::BitXor => Ok(Value::Int(a ^ b)),
            BinaryOp::LShift => {
                if b < 0 {
                    return self.raise(ExceptionId::ValueError, "negative shift count");
                }
                if a == 0 {
                    return Ok(Value::Int(0));
                }
                let shifted = u32::try_from(b)
                    .ok()
                    .filter(|&s| s < 64)
                    .map(|s| (a << s, s))
                    .filter(|&(v, s)| (v >> s) == a)
                    .map(|(v, _)| v);
                checked(shifted)
            }
            BinaryOp::RShift => {
                if b < 0 {
                    return self.raise(ExceptionId::ValueError, "negative shift count");
                }
                Ok(Value::Int(if b >= 64 {
                    if a < 0 { -1 } else { 0 }
                } else {
                    a >> b
                }))
            }
        }
    }

    fn float_binary(&self, op: BinaryOp, a: f64, b: f64) -> Exec<Option<Value>> {
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => {
                if b == 0.0 {
                    return self.raise(ExceptionId::ZeroDivisionError, "float division by zero");
                }
                a / b
            }
            BinaryOp::FloorDiv => match py_floor_div_f64(a, b) {
                Some(v) => v,
                None => return self.raise(ExceptionId::ZeroDivisionError, "float floor division by zero"),
            },
            BinaryOp::Mod => match py_mod_f64(a, b) {
                Some(v) => v,
                None => return self.raise(ExceptionId::ZeroDivisionError, "float modulo"),
            },
            BinaryOp::Pow => {
                if a == 0.0 && b < 0.0 {
                    return self.raise(
                        ExceptionId::ZeroDivisionError,
                        "0.0 cannot be raised to a negative power",
                    );
                }
                if a < 0.0 && b.fract() != 0.0 {
                    return self.raise(
                        ExceptionId::ValueError,
                        "negative number cannot be raised to a fractional power",
                    );
                }
                a.powf(b)
            }
            _ => return Ok(None),
        };
        Ok(Some(Value::Float(result)))
    }

    pub(crate) fn unary_op(&self, op: UnaryOp, operand: Value) -> Exec<Value> {
        if op == UnaryOp::Not {
            return Ok(Value::Bool(!self.truthy(&operand)?));
        }
        if let Value::Instance(_) = operand {
            let name = match op {
                UnaryOp::Neg => "__neg__",
                UnaryOp::Pos => "__pos__",
                _ => "__invert__",
            };
            if let Some(method) = self.lookup_special(&operand, name)? {
                return self.call(&method, Args::default());
            }
        }
        let result = match (op, &operand) {
            (UnaryOp::Neg, Value::Float(f)) => Some(Value::Float(-f)),
            (UnaryOp::Pos, Value::Float(f)) => Some(Value::Float(*f)),
            (_, Value::Int(_) | Value::Bool(_)) => {
                let i = operand.as_int().unwrap_or(0);
                match op {
                    UnaryOp::Neg => match i.checked_neg() {
                        Some(v) => Some(Value::Int(v)),
                        None => return self.raise(ExceptionId::OverflowError, "integer result too large"),
                    },
                    UnaryOp::Pos => Some(Value::Int(i)),
                    _ => Some(Value::Int(!i)),
                }
            }
            _ => None,
        };
        match result {
            Some(value) => Ok(value),
            None => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Pos => "+",
                    _ => "~",
                };
                Err(self.type_error(format!(
                    "bad operand type for unary {symbol}: '{}'",
                    self.type_name(&operand)
                )))
            }
        }
    }

    // ---- comparison ------------------------------------------------------------------------

    pub(crate) fn compare_op(&self, op: CompareOp, left: &Value, right: &Value) -> Exec<Value> {
        Ok(Value::Bool(match op {
            CompareOp::Eq => return self.rich_eq(left, right, false),
            CompareOp::NotEq => return self.rich_eq(left, right, true),
            CompareOp::Is => left.is_same(right),
            CompareOp::IsNot => !left.is_same(right),
            CompareOp::In => self.contains(right, left)?,
            CompareOp::NotIn => !self.contains(right, left)?,
            _ => self.ordering(op, left, right)?,
        }))
    }

    /// `==` / `!=` keeping whatever a user `__eq__` returned.
    fn rich_eq(&self, left: &Value, right: &Value, negate: bool) -> Exec<Value> {
        if negate {
            for (receiver, other) in [(left, right), (right, left)] {
                if let Some(method) = self.lookup_special(receiver, "__ne__")? {
                    let result = self.call(&method, Args::new(vec![other.clone()]))?;
                    if !matches!(result, Value::NotImplemented) {
                        return Ok(result);
                    }
                }
            }
        }
        for (receiver, other) in [(left, right), (right, left)] {
            if let Some(method) = self.lookup_special(receiver, "__eq__")? {
                let result = self.call(&method, Args::new(vec![other.clone()]))?;
                if !matches!(result, Value::NotImplemented) {
                    return if negate {
                        Ok(Value::Bool(!self.truthy(&result)?))
                    } else {
                        Ok(result)
                    };
                }
            }
        }
        Ok(Value::Bool(self.eq(left, right)? != negate))
    }

    /// `left == right` as a Rust bool, honouring user `__eq__`.
    pub(crate) fn eq(&self, left: &Value, right: &Value) -> Exec<bool> {
        if matches!(left, Value::Instance(_)) || matches!(right, Value::Instance(_)) {
            for (receiver, other) in [(left, right), (right, left)] {
                if let Some(method) = self.lookup_special(receiver, "__eq__")? {
                    let result = self.call(&method, Args::new(vec![other.clone()]))?;
                    if !matches!(result, Value::NotImplemented) {
                        return self.truthy(&result);
                    }
                }
            }
            return Ok(left.is_same(right));
        }
        match (left, right) {
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let (a, b) = (a.borrow().clone(), b.borrow().clone());
                self.sequences_equal(&a, &b)
            }
            (Value::Tuple(a), Value::Tuple(b)) => self.sequences_equal(a, b),
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let (a, b) = (a.borrow().clone(), b.borrow().clone());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (key, value) in a.items() {
                    match b.get(&key) {
                        Some(other) if self.eq(&value, &other)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            _ => Ok(values_equal(left, right)),
        }
    }

    fn sequences_equal(&self, a: &[Value], b: &[Value]) -> Exec<bool> {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (x, y) in a.iter().zip(b.iter()) {
            if !(x.is_same(y) || self.eq(x, y)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `<`, `<=`, `>`, `>=`.
    pub(crate) fn ordering(&self, op: CompareOp, left: &Value, right: &Value) -> Exec<bool> {
        if matches!(left, Value::Instance(_)) || matches!(right, Value::Instance(_)) {
            let (name, reflected) = ordering_names(op);
            if let Some(method) = self.lookup_special(left, name)? {
                let result = self.call(&method, Args::new(vec![right.clone()]))?;
                if !matches!(result, Value::NotImplemented) {
                    return self.truthy(&result);
                }
            }
            if let Some(method) = self.lookup_special(right, reflected)? {
                let result = self.call(&method, Args::new(vec![left.clone()]))?;
                if !matches!(result, Value::NotImplemented) {
                    return self.truthy(&result);
                }
            }
            return Err(self.not_orderable(op, left, right));
        }

        match (left, right) {
            _ if int_operand(left).is_some() && int_operand(right).is_some() => {
                let (a, b) = (int_operand(left).unwrap_or(0), int_operand(right).unwrap_or(0));
                Ok(ordering_holds(op, a.cmp(&b)))
            }
            _ if left.is_number() && right.is_number() => {
                let (a, b) = (left.as_f64().unwrap_or(0.0), right.as_f64().unwrap_or(0.0));
                Ok(a.partial_cmp(&b).is_some_and(|o| ordering_holds(op, o)))
            }
            (Value::Str(a), Value::Str(b)) => Ok(ordering_holds(op, (**a).cmp(&**b))),
            (Value::List(a), Value::List(b)) => {
                let (a, b) = (a.borrow().clone(), b.borrow().clone());
                self.sequence_ordering(op, &a, &b)
            }
            (Value::Tuple(a), Value::Tuple(b)) => self.sequence_ordering(op, a, b),
            (Value::Set(a), Value::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                let a_in_b = a.iter().all(|v| b.iter().any(|w| values_equal(v, w)));
                let b_in_a = b.iter().all(|v| a.iter().any(|w| values_equal(v, w)));
                Ok(match op {
                    CompareOp::Lt => a_in_b && a.len() < b.len(),
                    CompareOp::LtEq => a_in_b,
                    CompareOp::Gt => b_in_a && a.len() > b.len(),
                    _ => b_in_a,
                })
            }
            _ => Err(self.not_orderable(op, left, right)),
        }
    }

    fn sequence_ordering(&self, op: CompareOp, a: &[Value], b: &[Value]) -> Exec<bool> {
        for (x, y) in a.iter().zip(b.iter()) {
            if x.is_same(y) || self.eq(x, y)? {
                continue;
            }
            return self.ordering(op, x, y);
        }
        Ok(ordering_holds(op, a.len().cmp(&b.len())))
    }

    fn not_orderable(&self, op: CompareOp, left: &Value, right: &Value) -> Flow {
        self.type_error(format!(
            "'{op}' not supported between instances of '{}' and '{}'",
            self.type_name(left),
            self.type_name(right)
        ))
    }

    /// Stable sort with Python comparison semantics, optionally through a key function.
    pub(crate) fn sort_values(&self, items: Vec<Value>, key: Option<&Value>, reverse: bool) -> Exec<Vec<Value>> {
        let mut decorated = Vec::with_capacity(items.len());
        for item in items {
            let k = match key {
                Some(f) if !f.is_none() => self.call(f, Args::new(vec![item.clone()]))?,
                _ => item.clone(),
            };
            decorated.push((k, item));
        }
        let sorted = merge_sort(decorated, &mut |a: &(Value, Value), b: &(Value, Value)| {
            if reverse {
                self.ordering(CompareOp::Lt, &b.0, &a.0)
            } else {
                self.ordering(CompareOp::Lt, &a.0, &b.0)
            }
        })?;
        Ok(sorted.into_iter().map(|(_, item)| item).collect())
    }

    // ---- containment -----------------------------------------------------------------------

    /// `item in container`
    pub(crate) fn contains(&self, container: &Value, item: &Value) -> Exec<bool> {
        match container {
            Value::Str(haystack) => match item {
                Value::Str(needle) => Ok(haystack.contains(&**needle)),
                other => Err(self.type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    self.type_name(other)
                ))),
            },
            Value::List(items) => {
                let items = items.borrow().clone();
                self.any_equal(&items, item)
            }
            Value::Tuple(items) => self.any_equal(items, item),
            Value::Dict(map) => {
                self.check_hashable(item)?;
                Ok(map.borrow().contains_key(item))
            }
            Value::Set(items) => {
                self.check_hashable(item)?;
                Ok(items.borrow().iter().any(|v| values_equal(v, item)))
            }
            Value::Range(range) => Ok(match item {
                Value::Float(f) if f.fract() == 0.0 => range.contains(*f as i64),
                other => other.as_int().is_some_and(|i| range.contains(i)),
            }),
            Value::Instance(_) => {
                if let Some(method) = self.lookup_special(container, "__contains__")? {
                    let result = self.call(&method, Args::new(vec![item.clone()]))?;
                    return self.truthy(&result);
                }
                let items = self.collect_iterable(container)?;
                self.any_equal(&items, item)
            }
            Value::Iterator(_) => {
                let mut iter = self.iterate(container)?;
                while let Some(value) = self.next_item(&mut iter)? {
                    if value.is_same(item) || self.eq(&value, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            other => Err(self.type_error(format!(
                "argument of type '{}' is not iterable",
                self.type_name(other)
            ))),
        }
    }

    fn any_equal(&self, items: &[Value], item: &Value) -> Exec<bool> {
        for value in items {
            if value.is_same(item) || self.eq(value, item)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Raise `TypeError` for keys that cannot be hashed.
    pub(crate) fn check_hashable(&self, key: &Value) -> Exec<()> {
        match first_unhashable(key) {
            Some(bad) => Err(self.type_error(format!("unhashable type: '{}'", self.type_name(bad)))),
            None => Ok(()),
        }
    }

    // ---- subscripting ----------------------------------------------------------------------

    /// `object[index]`
    pub(crate) fn get_item(&self, object: &Value, index: &Value) -> Exec<Value> {
        match object {
            Value::List(items) => {
                let items = items.borrow();
                match index {
                    Value::Slice(slice) => {
                        let picked = self.slice_positions(items.len(), slice)?;
                        Ok(Value::list(picked.into_iter().map(|i| items[i].clone()).collect()))
                    }
                    _ => {
                        let i = self.sequence_index(index, "list", items.len())?;
                        Ok(items[i].clone())
                    }
                }
            }
            Value::Tuple(items) => match index {
                Value::Slice(slice) => {
                    let picked = self.slice_positions(items.len(), slice)?;
                    Ok(Value::tuple(picked.into_iter().map(|i| items[i].clone()).collect()))
                }
                _ => {
                    let i = self.sequence_index(index, "tuple", items.len())?;
                    Ok(items[i].clone())
                }
            },
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                match index {
                    Value::Slice(slice) => {
                        let picked = self.slice_positions(chars.len(), slice)?;
                        Ok(Value::str(picked.into_iter().map(|i| chars[i]).collect::<String>()))
                    }
                    _ => {
                        let i = self.sequence_index(index, "string", chars.len())?;
                        Ok(Value::str(chars[i].to_string()))
                    }
                }
            }
            Value::Range(range) => match index {
                Value::Slice(slice) => {
                    let picked = self.slice_positions(range.len(), slice)?;
                    let step = self.slice_bound(&slice.step)?.unwrap_or(1);
                    Ok(Value::Range(slice_range(range, &picked, step)))
                }
                _ => {
                    let i = self.sequence_index(index, "range object", range.len())?;
                    Ok(Value::Int(range.get(i).unwrap_or(0)))
                }
            },
            Value::Dict(map) => {
                self.check_hashable(index)?;
                let found = map.borrow().get(index);
                match found {
                    Some(value) => Ok(value),
                    None => Err(self.key_error(index.clone())),
                }
            }
            Value::Instance(_) => match self.lookup_special(object, "__getitem__")? {
                Some(method) => self.call(&method, Args::new(vec![index.clone()])),
                None => Err(self.not_subscriptable(object)),
            },
            // Generic aliases in annotations (`list[int]`) evaluate to the class itself.
            Value::Class(_) => Ok(object.clone()),
            _ => Err(self.not_subscriptable(object)),
        }
    }

    /// `object[index] = value`
    pub(crate) fn set_item(&self, object: &Value, index: Value, value: Value) -> Exec<()> {
        match object {
            Value::List(items) => match &index {
                Value::Slice(slice) => {
                    let replacement = self.collect_iterable(&value)?;
                    let len = items.borrow().len();
                    let step = self.slice_bound(&slice.step)?.unwrap_or(1);
                    let picked = self.slice_positions(len, slice)?;
                    let mut items = items.borrow_mut();
                    if step == 1 {
                        let start = clamp_index(self.slice_bound(&slice.lower)?.unwrap_or(0), len);
                        let end = match self.slice_bound(&slice.upper)? {
                            Some(upper) => clamp_index(upper, len).max(start),
                            None => len,
                        };
                        items.splice(start..end, replacement);
                        return Ok(());
                    }
                    if picked.len() != replacement.len() {
                        return self.raise(
                            ExceptionId::ValueError,
                            format!(
                                "attempt to assign sequence of size {} to extended slice of size {}",
                                replacement.len(),
                                picked.len()
                            ),
                        );
                    }
                    for (i, v) in picked.into_iter().zip(replacement) {
                        items[i] = v;
                    }
                    Ok(())
                }
                _ => {
                    let len = items.borrow().len();
                    let i = self
                        .sequence_index(&index, "list", len)
                        .map_err(|flow| self.reword_index_error(flow, "list assignment index out of range"))?;
                    items.borrow_mut()[i] = value;
                    Ok(())
                }
            },
            Value::Dict(map) => {
                self.check_hashable(&index)?;
                map.borrow_mut().insert(index, value);
                Ok(())
            }
            Value::Instance(_) => match self.lookup_special(object, "__setitem__")? {
                Some(method) => self.call(&method, Args::new(vec![index, value])).map(|_| ()),
                None => Err(self.type_error(format!(
                    "'{}' object does not support item assignment",
                    self.type_name(object)
                ))),
            },
            _ => Err(self.type_error(format!(
                "'{}' object does not support item assignment",
                self.type_name(object)
            ))),
        }
    }

    /// `del object[index]`
    pub(crate) fn del_item(&self, object: &Value, index: &Value) -> Exec<()> {
        match object {
            Value::List(items) => {
                let len = items.borrow().len();
                match index {
                    Value::Slice(slice) => {
                        let mut picked = self.slice_positions(len, slice)?;
                        picked.sort_unstable();
                        let mut items = items.borrow_mut();
                        for i in picked.into_iter().rev() {
                            items.remove(i);
                        }
                        Ok(())
                    }
                    _ => {
                        let i = self
                            .sequence_index(index, "list", len)
                            .map_err(|flow| self.reword_index_error(flow, "list assignment index out of range"))?;
                        items.borrow_mut().remove(i);
                        Ok(())
                    }
                }
            }
            Value::Dict(map) => {
                self.check_hashable(index)?;
                let removed = map.borrow_mut().remove(index);
                match removed {
                    Some(_) => Ok(()),
                    None => Err(self.key_error(index.clone())),
                }
            }
            Value::Instance(_) => match self.lookup_special(object, "__delitem__")? {
                Some(method) => self.call(&method, Args::new(vec![index.clone()])).map(|_| ()),
                None => Err(self.type_error(format!(
                    "'{}' object doesn't support item deletion",
                    self.type_name(object)
                ))),
            },
            _ => Err(self.type_error(format!(
                "'{}' object doesn't support item deletion",
                self.type_name(object)
            ))),
        }
    }

    pub(crate) fn key_error(&self, key: Value) -> Flow {
        let exc = self.exception_with_args(self.exception_class(ExceptionId::KeyError), vec![key]);
        Flow::Raise(Box::new(super::Raised::new(exc)))
    }

    fn not_subscriptable(&self, object: &Value) -> Flow {
        self.type_error(format!("'{}' object is not subscriptable", self.type_name(object)))
    }

    /// Resolve an integer index into a sequence of `len` elements.
    fn sequence_index(&self, index: &Value, kind: &str, len: usize) -> Exec<usize> {
        let Some(i) = self.index_value(index)? else {
            let message = if kind == "string" {
                format!("string indices must be integers, not '{}'", self.type_name(index))
            } else {
                format!(
                    "{kind} indices must be integers or slices, not {}",
                    self.type_name(index)
                )
            };
            return Err(self.type_error(message));
        };
        match normalize_index(len, i) {
            Some(i) => Ok(i),
            None => self.raise(ExceptionId::IndexError, format!("{kind} index out of range")),
        }
    }

    /// Integer value of an index operand (ints, bools, `__index__`).
    pub(crate) fn index_value(&self, index: &Value) -> Exec<Option<i64>> {
        if let Some(i) = index.as_int() {
            return Ok(Some(i));
        }
        if let Some(method) = self.lookup_special(index, "__index__")? {
            return Ok(self.call(&method, Args::default())?.as_int());
        }
        Ok(None)
    }

    fn reword_index_error(&self, flow: Flow, message: &str) -> Flow {
        match &flow {
            Flow::Raise(raised) if self.is_exception(&raised.exception, ExceptionId::IndexError) => {
                self.error(ExceptionId::IndexError, message)
            }
            _ => flow,
        }
    }

    fn slice_bound(&self, bound: &Value) -> Exec<Option<i64>> {
        if bound.is_none() {
            return Ok(None);
        }
        match self.index_value(bound)? {
            Some(i) => Ok(Some(i)),
            None => Err(self.type_error("slice indices must be integers or None or have an __index__ method")),
        }
    }

    fn slice_positions(&self, len: usize, slice: &SliceValue) -> Exec<Vec<usize>> {
        let lower = self.slice_bound(&slice.lower)?;
        let upper = self.slice_bound(&slice.upper)?;
        let step = self.slice_bound(&slice.step)?;
        slice_indices(len, lower, upper, step).map_err(|e| self.value_error(e.message()))
    }
}

fn int_operand(value: &Value) -> Option<i64> {
    value.as_int()
}

fn clamp_index(index: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if index < 0 { index.saturating_add(len_i) } else { index };
    usize::try_from(resolved.clamp(0, len_i)).unwrap_or(0)
}

fn repeat(items: &[Value], n: i64) -> Vec<Value> {
    let n = usize::try_from(n).unwrap_or(0);
    let mut out = Vec::with_capacity(items.len() * n);
    for _ in 0..n {
        out.extend(items.iter().cloned());
    }
    out
}

fn first_unhashable(value: &Value) -> Option<&Value> {
    match value {
        Value::List(_) | Value::Dict(_) | Value::Set(_) => Some(value),
        Value::Tuple(items) => items.iter().find_map(first_unhashable),
        _ => None,
    }
}

/// The range selected from `range` by slice positions `picked` taken with `step`.
fn slice_range(range: &RangeValue, picked: &[usize], step: i64) -> RangeValue {
    let new_step = range.step.saturating_mul(step);
    match picked.first() {
        Some(&first) => {
            let start = range.get(first).unwrap_or(range.start);
            let count = i64::try_from(picked.len()).unwrap_or(i64::MAX);
            RangeValue {
                start,
                stop: start.saturating_add(count.saturating_mul(new_step)),
                step: new_step,
            }
        }
        None => RangeValue {
            start: range.start,
            stop: range.start,
            step: new_step,
        },
    }
}

/// Stable merge sort with a fallible "a sorts before b" predicate.
fn merge_sort<T: Clone>(items: Vec<T>, before: &mut dyn FnMut(&T, &T) -> Exec<bool>) -> Exec<Vec<T>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut items = items;
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, before)?;
    let right = merge_sort(right, before)?;
    let mut out = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if before(&right[j], &left[i])? {
            out.push(right[j].clone());
            j += 1;
        } else {
            out.push(left[i].clone());
            i += 1;
        }
    }
    out.extend_from_slice(&left[i..]);
    out.extend_from_slice(&right[j..]);
    Ok(out)
}

/// Build a `DictMap` view for `**` unpacking of any mapping-like value.
pub(crate) fn mapping_items(interp: &Interpreter, value: &Value) -> Exec<DictMap> {
    match value {
        Value::Dict(map) => Ok(map.borrow().clone()),
        Value::Instance(_) => {
            let keys = interp.call_method(value, "keys", Vec::new())?;
            let mut map = DictMap::new();
            for key in interp.collect_iterable(&keys)? {
                let item = interp.get_item(value, &key)?;
                map.insert(key, item);
            }
            Ok(map)
        }
        other => Err(interp.type_error(format!(
            "argument after ** must be a mapping, not {}",
            interp.type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sort_is_stable() {
        let items = vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')];
        let sorted = merge_sort(items, &mut |a: &(i32, char), b: &(i32, char)| Ok(a.0 < b.0)).ok();
        assert_eq!(sorted, Some(vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]));
    }

    #[test]
    fn test_slice_range() {
        let r = RangeValue {
            start: 0,
            stop: 10,
            step: 1,
        };
        let sliced = slice_range(&r, &[2, 4, 6], 2);
        assert_eq!(sliced.start, 2);
        assert_eq!(sliced.step, 2);
        assert_eq!(sliced.len(), 3);
    }

    #[test]
    fn test_clamp_index() {
        assert_eq!(clamp_index(-1, 5), 4);
        assert_eq!(clamp_index(-10, 5), 0);
        assert_eq!(clamp_index(10, 5), 5);
    }
}
