//! Expression evaluation.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;
use runtest_syntax::ast::{
    BoolOp, CallArg, Comprehension, ComprehensionClause, ComprehensionKind, DictEntry, Expr, FStringPart, Lambda,
    Spanned,
};

use super::ops::mapping_items;
use super::{Exec, Flow, Frame, FrameKind, Interpreter};
use crate::format;
use crate::value::{Args, Code, DictMap, Function, IterState, Namespace, SliceValue, Value};

impl Interpreter {
    pub(crate) fn eval(&self, frame: &Frame, expr: &Spanned<Expr>) -> Exec<Value> {
        match &expr.node {
            Expr::Name(name) => self.load_name(frame, name),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Str(s) => Ok(Value::str(s.as_str())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::None => Ok(Value::None),
            Expr::Ellipsis => Ok(Value::Ellipsis),
            Expr::FString(parts) => self.eval_fstring(frame, parts),
            Expr::List(items) => Ok(Value::list(self.eval_elements(frame, items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.eval_elements(frame, items)?)),
            Expr::Set(items) => {
                let items = self.eval_elements(frame, items)?;
                for item in &items {
                    self.check_hashable(item)?;
                }
                Ok(Value::set(items))
            }
            Expr::Dict(entries) => self.eval_dict(frame, entries),
            Expr::Comprehension(comp) => self.eval_comprehension(frame, comp),
            Expr::Attribute(object, name) => {
                let object = self.eval(frame, object)?;
                self.get_attr(&object, name)
            }
            Expr::Subscript(object, index) => {
                let object = self.eval(frame, object)?;
                let index = self.eval(frame, index)?;
                self.get_item(&object, &index)
            }
            Expr::Slice(slice) => {
                let bound = |part: &Option<Spanned<Expr>>| match part {
                    Some(e) => self.eval(frame, e),
                    None => Ok(Value::None),
                };
                Ok(Value::Slice(Rc::new(SliceValue {
                    lower: bound(&slice.lower)?,
                    upper: bound(&slice.upper)?,
                    step: bound(&slice.step)?,
                })))
            }
            Expr::Call(callee, args) => {
                let callee = self.eval(frame, callee)?;
                let args = self.eval_call_args(frame, args)?;
                self.call(&callee, args)
            }
            Expr::Unary(op, operand) => {
                let operand = self.eval(frame, operand)?;
                self.unary_op(*op, operand)
            }
            Expr::Binary(left, op, right) => {
                let left = self.eval(frame, left)?;
                let right = self.eval(frame, right)?;
                self.binary_op(*op, left, right)
            }
            Expr::Compare(first, links) => {
                let mut left = self.eval(frame, first)?;
                let mut result = Value::Bool(true);
                for (op, right) in links {
                    let right = self.eval(frame, right)?;
                    result = self.compare_op(*op, &left, &right)?;
                    if !self.truthy(&result)? {
                        return Ok(result);
                    }
                    left = right;
                }
                Ok(result)
            }
            Expr::BoolOp(op, left, right) => {
                let left = self.eval(frame, left)?;
                let short_circuit = match op {
                    BoolOp::And => !self.truthy(&left)?,
                    BoolOp::Or => self.truthy(&left)?,
                };
                if short_circuit { Ok(left) } else { self.eval(frame, right) }
            }
            Expr::Conditional { test, body, orelse } => {
                if self.truthy(&self.eval(frame, test)?)? {
                    self.eval(frame, body)
                } else {
                    self.eval(frame, orelse)
                }
            }
            Expr::Lambda(lambda) => self.make_lambda(frame, lambda, expr.span.start),
            Expr::Starred(_) => self.raise(ExceptionId::SyntaxError, "can't use starred expression here"),
        }
    }

    /// Elements of a list/tuple/set display, expanding `*iterable`.
    fn eval_elements(&self, frame: &Frame, items: &[Spanned<Expr>]) -> Exec<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match &item.node {
                Expr::Starred(inner) => {
                    let iterable = self.eval(frame, inner)?;
                    out.extend(self.collect_iterable(&iterable)?);
                }
                _ => out.push(self.eval(frame, item)?),
            }
        }
        Ok(out)
    }

    fn eval_dict(&self, frame: &Frame, entries: &[DictEntry]) -> Exec<Value> {
        let mut map = DictMap::new();
        for entry in entries {
            match entry {
                DictEntry::Pair(key, value) => {
                    let key = self.eval(frame, key)?;
                    self.check_hashable(&key)?;
                    let value = self.eval(frame, value)?;
                    map.insert(key, value);
                }
                DictEntry::Spread(other) => {
                    let other = self.eval(frame, other)?;
                    for (k, v) in mapping_items(self, &other)?.items() {
                        map.insert(k, v);
                    }
                }
            }
        }
        Ok(Value::dict(map))
    }

    fn eval_fstring(&self, frame: &Frame, parts: &[FStringPart]) -> Exec<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Expr { expr, conversion, spec } => {
                    let value = self.eval(frame, expr)?;
                    let value = match conversion {
                        Some('r') | Some('a') => Value::str(self.repr(&value)?),
                        Some('s') => Value::str(self.str_of(&value)?),
                        _ => value,
                    };
                    out.push_str(&format::format_value(self, &value, spec.as_deref().unwrap_or(""))?);
                }
            }
        }
        Ok(Value::str(out))
    }

    pub(crate) fn eval_call_args(&self, frame: &Frame, args: &[CallArg]) -> Exec<Args> {
        let mut positional = Vec::with_capacity(args.len());
        let mut keywords: Vec<(String, Value)> = Vec::new();
        for arg in args {
            match arg {
                CallArg::Positional(expr) => positional.push(self.eval(frame, expr)?),
                CallArg::Keyword(name, expr) => {
                    let value = self.eval(frame, expr)?;
                    keywords.push((name.clone(), value));
                }
                CallArg::Star(expr) => {
                    let iterable = self.eval(frame, expr)?;
                    positional.extend(self.collect_iterable(&iterable)?);
                }
                CallArg::DoubleStar(expr) => {
                    let mapping = self.eval(frame, expr)?;
                    for (key, value) in mapping_items(self, &mapping)?.items() {
                        let Value::Str(name) = key else {
                            return Err(self.type_error("keywords must be strings"));
                        };
                        if keywords.iter().any(|(k, _)| k.as_str() == &*name) {
                            return Err(self.type_error(format!("got multiple values for keyword argument '{name}'")));
                        }
                        keywords.push((name.to_string(), value));
                    }
                }
            }
        }
        Ok(Args::with_keywords(positional, keywords))
    }

    fn make_lambda(&self, frame: &Frame, lambda: &Rc<Lambda>, offset: usize) -> Exec<Value> {
        let defaults = self.eval_defaults(frame, &lambda.params)?;
        Ok(Value::Function(Rc::new(Function {
            name: "<lambda>".to_string(),
            qualname: frame.child_qualname("<lambda>"),
            module: frame.module_name(),
            code: Code::Lambda(lambda.clone()),
            defaults,
            globals: frame.globals.clone(),
            closure: frame.closure_scopes(),
            file: frame.file.clone(),
            line: frame.file.line_of(offset),
            attrs: Namespace::new(),
            owner: Default::default(),
        })))
    }

    // ---- comprehensions --------------------------------------------------------------------

    /// Comprehensions run in their own scope; the first iterable is evaluated in the enclosing one.
    fn eval_comprehension(&self, frame: &Frame, comp: &Comprehension) -> Exec<Value> {
        let Some(first) = comp.clauses.first() else {
            return Ok(Value::list(Vec::new()));
        };
        let first_iterable = self.eval(frame, &first.iter)?;
        let name = match comp.kind {
            ComprehensionKind::List => "<listcomp>",
            ComprehensionKind::Set => "<setcomp>",
            ComprehensionKind::Dict(_) => "<dictcomp>",
            ComprehensionKind::Generator => "<genexpr>",
        };
        let scope = Frame {
            kind: FrameKind::Function,
            locals: Namespace::new(),
            globals: frame.globals.clone(),
            enclosing: frame.closure_scopes(),
            file: frame.file.clone(),
            name: name.to_string(),
            qualname: frame.qualname.clone(),
            line: Cell::new(frame.line.get()),
            declared_global: RefCell::new(Vec::new()),
            declared_nonlocal: RefCell::new(Vec::new()),
            echo: false,
        };

        let mut elements = Vec::new();
        let mut pairs = DictMap::new();
        let result = self.run_clauses(&scope, &comp.clauses, Some(first_iterable), &mut |interp: &Interpreter, scope: &Frame| {
            match &comp.kind {
                ComprehensionKind::Dict(value) => {
                    let key = interp.eval(scope, &comp.element)?;
                    interp.check_hashable(&key)?;
                    let value = interp.eval(scope, value)?;
                    pairs.insert(key, value);
                }
                _ => elements.push(interp.eval(scope, &comp.element)?),
            }
            Ok(())
        });
        match result {
            Ok(()) => {}
            Err(Flow::Raise(mut raised)) => {
                raised.traceback.insert(0, scope.trace_frame());
                return Err(Flow::Raise(raised));
            }
            Err(other) => return Err(other),
        }

        Ok(match comp.kind {
            ComprehensionKind::List => Value::list(elements),
            ComprehensionKind::Set => {
                for item in &elements {
                    self.check_hashable(item)?;
                }
                Value::set(elements)
            }
            ComprehensionKind::Dict(_) => Value::dict(pairs),
            ComprehensionKind::Generator => IterState::new(elements, "generator"),
        })
    }

    fn run_clauses(
        &self,
        scope: &Frame,
        clauses: &[ComprehensionClause],
        preevaluated: Option<Value>,
        emit: &mut dyn FnMut(&Interpreter, &Frame) -> Exec<()>,
    ) -> Exec<()> {
        let Some((clause, rest)) = clauses.split_first() else {
            return emit(self, scope);
        };
        let iterable = match preevaluated {
            Some(value) => value,
            None => self.eval(scope, &clause.iter)?,
        };
        let mut iter = self.iterate(&iterable)?;
        'items: while let Some(item) = self.next_item(&mut iter)? {
            self.assign(scope, &clause.target, item)?;
            for condition in &clause.conditions {
                if !self.truthy(&self.eval(scope, condition)?)? {
                    continue 'items;
                }
            }
            self.run_clauses(scope, rest, None, emit)?;
        }
        Ok(())
    }
}
