//! Iteration protocol.

use std::cell::RefCell;
use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;

use super::{Exec, Flow, Interpreter};
use crate::value::{Args, IterState, Value};

/// Cursor over an iterable value.
pub(crate) enum ValueIter {
    Items(std::vec::IntoIter<Value>),
    Range { next: i64, remaining: usize, step: i64 },
    /// A one-shot iterator object; advancing it consumes the shared state.
    Shared(Rc<RefCell<IterState>>),
    /// An instance implementing `__next__`.
    Protocol(Value),
}

impl Interpreter {
    pub(crate) fn iterate(&self, value: &Value) -> Exec<ValueIter> {
        Ok(match value {
            Value::List(items) => ValueIter::Items(items.borrow().clone().into_iter()),
            Value::Tuple(items) => ValueIter::Items(items.to_vec().into_iter()),
            Value::Str(text) => ValueIter::Items(
                text.chars()
                    .map(|c| Value::str(c.to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
            Value::Dict(map) => ValueIter::Items(map.borrow().keys().into_iter()),
            Value::Set(items) => ValueIter::Items(items.borrow().clone().into_iter()),
            Value::Range(range) => ValueIter::Range {
                next: range.start,
                remaining: range.len(),
                step: range.step,
            },
            Value::Iterator(state) => ValueIter::Shared(state.clone()),
            Value::Instance(_) => {
                if let Some(method) = self.lookup_special(value, "__iter__")? {
                    let iterator = self.call(&method, Args::default())?;
                    return match &iterator {
                        Value::Instance(_) => Ok(ValueIter::Protocol(iterator)),
                        Value::Iterator(state) => Ok(ValueIter::Shared(state.clone())),
                        other => Err(self.type_error(format!(
                            "iter() returned non-iterator of type '{}'",
                            self.type_name(other)
                        ))),
                    };
                }
                if self.lookup_special(value, "__next__")?.is_some() {
                    return Ok(ValueIter::Protocol(value.clone()));
                }
                return Err(self.not_iterable(value));
            }
            other => return Err(self.not_iterable(other)),
        })
    }

    pub(crate) fn next_item(&self, iter: &mut ValueIter) -> Exec<Option<Value>> {
        match iter {
            ValueIter::Items(items) => Ok(items.next()),
            ValueIter::Range { next, remaining, step } => {
                if *remaining == 0 {
                    return Ok(None);
                }
                let value = *next;
                *remaining -= 1;
                *next = next.saturating_add(*step);
                Ok(Some(Value::Int(value)))
            }
            ValueIter::Shared(state) => Ok(state.borrow_mut().items.pop_front()),
            ValueIter::Protocol(receiver) => match self.call_method(receiver, "__next__", Vec::new()) {
                Ok(value) => Ok(Some(value)),
                Err(Flow::Raise(raised)) if self.is_exception(&raised.exception, ExceptionId::StopIteration) => {
                    Ok(None)
                }
                Err(other) => Err(other),
            },
        }
    }

    /// Drain any iterable into a vector.
    pub(crate) fn collect_iterable(&self, value: &Value) -> Exec<Vec<Value>> {
        match value {
            Value::List(items) => return Ok(items.borrow().clone()),
            Value::Tuple(items) => return Ok(items.to_vec()),
            _ => {}
        }
        let mut iter = self.iterate(value)?;
        let mut out = Vec::new();
        while let Some(item) = self.next_item(&mut iter)? {
            out.push(item);
        }
        Ok(out)
    }

    /// `iter(value)`
    pub(crate) fn make_iterator(&self, value: &Value) -> Exec<Value> {
        let kind = match value {
            Value::Iterator(_) => return Ok(value.clone()),
            Value::Instance(_) => {
                if let Some(method) = self.lookup_special(value, "__iter__")? {
                    return self.call(&method, Args::default());
                }
                return Err(self.not_iterable(value));
            }
            Value::List(_) => "list_iterator",
            Value::Tuple(_) => "tuple_iterator",
            Value::Str(_) => "str_ascii_iterator",
            Value::Dict(_) => "dict_keyiterator",
            Value::Set(_) => "set_iterator",
            Value::Range(_) => "range_iterator",
            other => return Err(self.not_iterable(other)),
        };
        Ok(IterState::new(self.collect_iterable(value)?, kind))
    }

    /// `next(iterator)`; `None` when exhausted.
    pub(crate) fn advance(&self, iterator: &Value) -> Exec<Option<Value>> {
        match iterator {
            Value::Iterator(state) => Ok(state.borrow_mut().items.pop_front()),
            Value::Instance(_) => self.next_item(&mut ValueIter::Protocol(iterator.clone())),
            other => Err(self.type_error(format!("'{}' object is not an iterator", self.type_name(other)))),
        }
    }

    fn not_iterable(&self, value: &Value) -> Flow {
        self.type_error(format!("'{}' object is not iterable", self.type_name(value)))
    }
}
