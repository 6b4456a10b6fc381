//! Statement execution.

use std::cell::Cell;
use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;
use runtest_syntax::ast::{
    AssignStmt, AugAssignStmt, Block, ClassDef, Expr, ForStmt, FunctionDef, IfStmt, RaiseStmt, Spanned, Stmt,
    TryStmt, WhileStmt, WithItem,
};

use super::{Exec, Flow, Frame, FrameKind, Interpreter, Raised};
use crate::value::{Args, Class, ClassKind, Code, Function, Namespace, Origin, Value};

impl Interpreter {
    pub(crate) fn exec_block(&self, frame: &Frame, block: &Block) -> Exec<()> {
        for stmt in block {
            self.exec_stmt(frame, stmt)?;
        }
        Ok(())
    }

    fn exec_stmt(&self, frame: &Frame, stmt: &Spanned<Stmt>) -> Exec<()> {
        let line = frame.file.line_of(stmt.span.start);
        frame.line.set(line);
        self.trace_line(&frame.file, line);

        match &stmt.node {
            Stmt::Expr(expr) => {
                let value = self.eval(frame, expr)?;
                if frame.echo && !value.is_none() {
                    let text = self.repr(&value)?;
                    self.write_stdout(&format!("{text}\n"));
                    self.builtins().set("_", value);
                }
                Ok(())
            }
            Stmt::Assign(assign) => self.exec_assign(frame, assign),
            Stmt::AugAssign(aug) => self.exec_aug_assign(frame, aug),
            Stmt::FunctionDef(def) => {
                let function = self.make_function(frame, def, stmt.span.start)?;
                let decorated = self.apply_decorators(frame, &def.decorators, function)?;
                self.store_name(frame, &def.name, decorated);
                Ok(())
            }
            Stmt::ClassDef(def) => {
                let class = self.make_class(frame, def, stmt.span.start)?;
                let decorated = self.apply_decorators(frame, &def.decorators, class)?;
                self.store_name(frame, &def.name, decorated);
                Ok(())
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(frame, expr)?,
                    None => Value::None,
                };
                Err(Flow::Return(value))
            }
            Stmt::If(if_stmt) => self.exec_if(frame, if_stmt),
            Stmt::While(while_stmt) => self.exec_while(frame, while_stmt),
            Stmt::For(for_stmt) => self.exec_for(frame, for_stmt),
            Stmt::Break => Err(Flow::Break),
            Stmt::Continue => Err(Flow::Continue),
            Stmt::Pass => Ok(()),
            Stmt::Raise(raise) => self.exec_raise(frame, raise),
            Stmt::Assert(assert) => {
                if self.truthy(&self.eval(frame, &assert.test)?)? {
                    return Ok(());
                }
                let args = match &assert.msg {
                    Some(msg) => vec![self.eval(frame, msg)?],
                    None => Vec::new(),
                };
                let exc = self.exception_with_args(self.exception_class(ExceptionId::AssertionError), args);
                Err(Flow::Raise(Box::new(Raised::new(exc))))
            }
            Stmt::Import(aliases) => self.exec_import(frame, aliases),
            Stmt::ImportFrom(from) => self.exec_import_from(frame, from),
            Stmt::Try(try_stmt) => self.exec_try(frame, try_stmt),
            Stmt::With(with) => self.exec_with(frame, &with.items, &with.body),
            Stmt::Global(names) => {
                frame.declared_global.borrow_mut().extend(names.iter().cloned());
                Ok(())
            }
            Stmt::Nonlocal(names) => {
                frame.declared_nonlocal.borrow_mut().extend(names.iter().cloned());
                Ok(())
            }
            Stmt::Delete(targets) => {
                for target in targets {
                    self.delete_target(frame, target)?;
                }
                Ok(())
            }
        }
    }

    // ---- names -----------------------------------------------------------------------------

    pub(crate) fn load_name(&self, frame: &Frame, name: &str) -> Exec<Value> {
        let is_global = frame.declared_global.borrow().iter().any(|n| n == name);
        if !is_global {
            if let Some(value) = frame.locals.get(name) {
                return Ok(value);
            }
            if let Some(value) = frame.enclosing.iter().find_map(|scope| scope.get(name)) {
                return Ok(value);
            }
        }
        if let Some(value) = frame.globals.get(name) {
            return Ok(value);
        }
        if let Some(value) = self.builtins().get(name) {
            return Ok(value);
        }
        self.raise(ExceptionId::NameError, format!("name '{name}' is not defined"))
    }

    pub(crate) fn store_name(&self, frame: &Frame, name: &str, value: Value) {
        if frame.declared_global.borrow().iter().any(|n| n == name) {
            frame.globals.set(name, value);
            return;
        }
        if frame.declared_nonlocal.borrow().iter().any(|n| n == name) {
            if let Some(scope) = frame.enclosing.iter().find(|scope| scope.contains(name)) {
                scope.set(name, value);
                return;
            }
        }
        frame.locals.set(name, value);
    }

    fn delete_name(&self, frame: &Frame, name: &str) -> Exec<()> {
        let scope = if frame.declared_global.borrow().iter().any(|n| n == name) {
            &frame.globals
        } else {
            &frame.locals
        };
        match scope.remove(name) {
            Some(_) => Ok(()),
            None => self.raise(ExceptionId::NameError, format!("name '{name}' is not defined")),
        }
    }

    // ---- assignment ------------------------------------------------------------------------

    fn exec_assign(&self, frame: &Frame, assign: &AssignStmt) -> Exec<()> {
        let value = self.eval(frame, &assign.value)?;
        for target in &assign.targets {
            self.assign(frame, target, value.clone())?;
        }
        Ok(())
    }

    pub(crate) fn assign(&self, frame: &Frame, target: &Spanned<Expr>, value: Value) -> Exec<()> {
        match &target.node {
            Expr::Name(name) => {
                self.store_name(frame, name, value);
                Ok(())
            }
            Expr::Attribute(object, name) => {
                let object = self.eval(frame, object)?;
                self.set_attr(&object, name, value)
            }
            Expr::Subscript(object, index) => {
                let object = self.eval(frame, object)?;
                let index = self.eval(frame, index)?;
                self.set_item(&object, index, value)
            }
            Expr::Tuple(targets) | Expr::List(targets) => self.unpack(frame, targets, value),
            Expr::Starred(_) => self.raise(
                ExceptionId::SyntaxError,
                "starred assignment target must be in a list or tuple",
            ),
            _ => self.raise(ExceptionId::SyntaxError, "cannot assign to expression"),
        }
    }

    fn unpack(&self, frame: &Frame, targets: &[Spanned<Expr>], value: Value) -> Exec<()> {
        let items = self.collect_iterable(&value)?;
        let starred = targets.iter().position(|t| matches!(t.node, Expr::Starred(_)));
        match starred {
            None => {
                if items.len() < targets.len() {
                    return self.raise(
                        ExceptionId::ValueError,
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            targets.len(),
                            items.len()
                        ),
                    );
                }
                if items.len() > targets.len() {
                    return self.raise(
                        ExceptionId::ValueError,
                        format!("too many values to unpack (expected {})", targets.len()),
                    );
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(frame, target, item)?;
                }
                Ok(())
            }
            Some(star) => {
                let after = targets.len() - star - 1;
                if items.len() < targets.len() - 1 {
                    return self.raise(
                        ExceptionId::ValueError,
                        format!(
                            "not enough values to unpack (expected at least {}, got {})",
                            targets.len() - 1,
                            items.len()
                        ),
                    );
                }
                let middle_end = items.len() - after;
                for (target, item) in targets[..star].iter().zip(items[..star].iter()) {
                    self.assign(frame, target, item.clone())?;
                }
                if let Expr::Starred(inner) = &targets[star].node {
                    self.assign(frame, inner, Value::list(items[star..middle_end].to_vec()))?;
                }
                for (target, item) in targets[star + 1..].iter().zip(items[middle_end..].iter()) {
                    self.assign(frame, target, item.clone())?;
                }
                Ok(())
            }
        }
    }

    fn exec_aug_assign(&self, frame: &Frame, aug: &AugAssignStmt) -> Exec<()> {
        match &aug.target.node {
            Expr::Name(name) => {
                let current = self.load_name(frame, name)?;
                let rhs = self.eval(frame, &aug.value)?;
                let result = self.inplace_op(aug.op, current, rhs)?;
                self.store_name(frame, name, result);
                Ok(())
            }
            Expr::Attribute(object, name) => {
                let object = self.eval(frame, object)?;
                let current = self.get_attr(&object, name)?;
                let rhs = self.eval(frame, &aug.value)?;
                let result = self.inplace_op(aug.op, current, rhs)?;
                self.set_attr(&object, name, result)
            }
            Expr::Subscript(object, index) => {
                let object = self.eval(frame, object)?;
                let index = self.eval(frame, index)?;
                let current = self.get_item(&object, &index)?;
                let rhs = self.eval(frame, &aug.value)?;
                let result = self.inplace_op(aug.op, current, rhs)?;
                self.set_item(&object, index, result)
            }
            _ => self.raise(
                ExceptionId::SyntaxError,
                "illegal expression for augmented assignment",
            ),
        }
    }

    fn delete_target(&self, frame: &Frame, target: &Spanned<Expr>) -> Exec<()> {
        match &target.node {
            Expr::Name(name) => self.delete_name(frame, name),
            Expr::Attribute(object, name) => {
                let object = self.eval(frame, object)?;
                self.del_attr(&object, name)
            }
            Expr::Subscript(object, index) => {
                let object = self.eval(frame, object)?;
                let index = self.eval(frame, index)?;
                self.del_item(&object, &index)
            }
            Expr::Tuple(items) | Expr::List(items) => {
                for item in items {
                    self.delete_target(frame, item)?;
                }
                Ok(())
            }
            _ => self.raise(ExceptionId::SyntaxError, "cannot delete expression"),
        }
    }

    // ---- definitions -----------------------------------------------------------------------

    fn make_function(&self, frame: &Frame, def: &Rc<FunctionDef>, offset: usize) -> Exec<Value> {
        let defaults = self.eval_defaults(frame, &def.params)?;
        let function = Function {
            name: def.name.clone(),
            qualname: frame.child_qualname(&def.name),
            module: frame.module_name(),
            code: Code::Def(def.clone()),
            defaults,
            globals: frame.globals.clone(),
            closure: frame.closure_scopes(),
            file: frame.file.clone(),
            line: frame.file.line_of(offset),
            attrs: Namespace::new(),
            owner: Default::default(),
        };
        Ok(Value::Function(Rc::new(function)))
    }

    pub(crate) fn eval_defaults(
        &self,
        frame: &Frame,
        params: &[runtest_syntax::ast::Param],
    ) -> Exec<Vec<Option<Value>>> {
        params
            .iter()
            .map(|p| p.default.as_ref().map(|d| self.eval(frame, d)).transpose())
            .collect()
    }

    fn apply_decorators(&self, frame: &Frame, decorators: &[Spanned<Expr>], target: Value) -> Exec<Value> {
        let decorators: Vec<Value> = decorators
            .iter()
            .map(|d| self.eval(frame, d))
            .collect::<Exec<_>>()?;
        let mut value = target;
        for decorator in decorators.iter().rev() {
            value = self.call(decorator, Args::new(vec![value]))?;
        }
        Ok(value)
    }

    fn make_class(&self, frame: &Frame, def: &Rc<ClassDef>, offset: usize) -> Exec<Value> {
        let mut bases = Vec::with_capacity(def.bases.len());
        for base in &def.bases {
            match self.eval(frame, base)? {
                Value::Class(class) => {
                    if matches!(class.kind, ClassKind::Data(_) | ClassKind::Type) {
                        return Err(self.type_error(format!(
                            "subclassing builtin type '{}' is not supported",
                            class.name
                        )));
                    }
                    bases.push(class);
                }
                other => {
                    return Err(self.type_error(format!(
                        "class base must be a class, not '{}'",
                        self.type_name(&other)
                    )));
                }
            }
        }
        if bases.is_empty() {
            bases.push(self.types().object.clone());
        }
        let mro = match linearize(&bases) {
            Some(mro) => mro,
            None => {
                return Err(self.type_error(
                    "Cannot create a consistent method resolution order (MRO) for bases".to_string(),
                ));
            }
        };

        let qualname = frame.child_qualname(&def.name);
        let namespace = Namespace::new();
        namespace.set("__module__", Value::str(frame.module_name()));
        namespace.set("__qualname__", Value::str(qualname.as_str()));
        namespace.set(
            "__doc__",
            def.doc.as_ref().map(|d| Value::str(d.text.as_str())).unwrap_or(Value::None),
        );

        let body_frame = Frame {
            kind: FrameKind::Class,
            locals: namespace.clone(),
            globals: frame.globals.clone(),
            enclosing: frame.closure_scopes(),
            file: frame.file.clone(),
            name: def.name.clone(),
            qualname: qualname.clone(),
            line: Cell::new(frame.line.get()),
            declared_global: Default::default(),
            declared_nonlocal: Default::default(),
            echo: false,
        };
        match self.exec_block(&body_frame, &def.body) {
            Ok(()) => {}
            Err(Flow::Raise(mut raised)) => {
                raised.traceback.insert(0, body_frame.trace_frame());
                return Err(Flow::Raise(raised));
            }
            Err(other) => return Err(other),
        }

        let class = Rc::new(Class {
            name: def.name.clone(),
            qualname,
            module: frame.module_name(),
            bases,
            mro,
            attrs: namespace,
            kind: ClassKind::User,
            origin: Some(Origin {
                file: frame.file.clone(),
                line: frame.file.line_of(offset),
                doc: def.doc.clone(),
            }),
        });
        claim_methods(&class);
        Ok(Value::Class(class))
    }

    // ---- control flow ----------------------------------------------------------------------

    fn exec_if(&self, frame: &Frame, if_stmt: &IfStmt) -> Exec<()> {
        if self.truthy(&self.eval(frame, &if_stmt.test)?)? {
            self.exec_block(frame, &if_stmt.body)
        } else {
            self.exec_block(frame, &if_stmt.orelse)
        }
    }

    fn exec_while(&self, frame: &Frame, while_stmt: &WhileStmt) -> Exec<()> {
        loop {
            if !self.truthy(&self.eval(frame, &while_stmt.test)?)? {
                break;
            }
            match self.exec_block(frame, &while_stmt.body) {
                Ok(()) | Err(Flow::Continue) => {}
                Err(Flow::Break) => return Ok(()),
                Err(other) => return Err(other),
            }
        }
        self.exec_block(frame, &while_stmt.orelse)
    }

    fn exec_for(&self, frame: &Frame, for_stmt: &ForStmt) -> Exec<()> {
        let iterable = self.eval(frame, &for_stmt.iter)?;
        let mut iter = self.iterate(&iterable)?;
        while let Some(item) = self.next_item(&mut iter)? {
            self.assign(frame, &for_stmt.target, item)?;
            match self.exec_block(frame, &for_stmt.body) {
                Ok(()) | Err(Flow::Continue) => {}
                Err(Flow::Break) => return Ok(()),
                Err(other) => return Err(other),
            }
        }
        self.exec_block(frame, &for_stmt.orelse)
    }

    fn exec_raise(&self, frame: &Frame, raise: &RaiseStmt) -> Exec<()> {
        let Some(exc) = &raise.exc else {
            return match self.current_handling() {
                Some(raised) => Err(Flow::Raise(Box::new(raised))),
                None => self.raise(ExceptionId::RuntimeError, "No active exception to reraise"),
            };
        };
        let exception = self.eval(frame, exc)?;
        let exception = self.make_raisable(exception)?;
        if let Some(cause) = &raise.cause {
            let cause = self.eval(frame, cause)?;
            let cause = if cause.is_none() { cause } else { self.make_raisable(cause)? };
            if let Value::Instance(instance) = &exception {
                instance.attrs.set("__cause__", cause);
            }
        } else if let (Value::Instance(instance), Some(context)) = (&exception, self.current_handling()) {
            instance.attrs.set("__context__", context.exception);
        }
        Err(Flow::Raise(Box::new(Raised::new(exception))))
    }

    /// Turn the operand of `raise` into an exception instance.
    pub(crate) fn make_raisable(&self, value: Value) -> Exec<Value> {
        match &value {
            Value::Class(class) if class.exception_base().is_some() => self.call(&value, Args::default()),
            Value::Instance(instance) if instance.class.exception_base().is_some() => Ok(value),
            _ => Err(self.type_error("exceptions must derive from BaseException")),
        }
    }

    fn exec_try(&self, frame: &Frame, try_stmt: &TryStmt) -> Exec<()> {
        let outcome = match self.exec_block(frame, &try_stmt.body) {
            Ok(()) => self.exec_block(frame, &try_stmt.orelse),
            Err(Flow::Raise(raised)) => self.handle_exception(frame, try_stmt, *raised),
            Err(other) => Err(other),
        };
        if try_stmt.finalbody.is_empty() {
            return outcome;
        }
        self.exec_block(frame, &try_stmt.finalbody)?;
        outcome
    }

    fn handle_exception(&self, frame: &Frame, try_stmt: &TryStmt, raised: Raised) -> Exec<()> {
        for handler in &try_stmt.handlers {
            let matches = match &handler.kind {
                None => true,
                Some(kind) => {
                    let kind = self.eval(frame, kind)?;
                    self.exception_matches(&raised.exception, &kind)?
                }
            };
            if !matches {
                continue;
            }
            if let Some(name) = &handler.name {
                self.store_name(frame, name, raised.exception.clone());
            }
            self.push_handling(raised.clone());
            let result = self.exec_block(frame, &handler.body);
            self.pop_handling();
            if let Some(name) = &handler.name {
                frame.locals.remove(name);
            }
            return result;
        }
        Err(Flow::Raise(Box::new(raised)))
    }

    /// Whether `exception` is an instance of `kind` (a class or tuple of classes).
    pub(crate) fn exception_matches(&self, exception: &Value, kind: &Value) -> Exec<bool> {
        match kind {
            Value::Class(class) => Ok(match exception {
                Value::Instance(instance) => instance.class.is_subclass_of(class),
                _ => false,
            }),
            Value::Tuple(kinds) => {
                for kind in kinds.iter() {
                    if self.exception_matches(exception, kind)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => Err(self.type_error("catching classes that do not inherit from BaseException is not allowed")),
        }
    }

    fn exec_with(&self, frame: &Frame, items: &[WithItem], body: &Block) -> Exec<()> {
        let Some((item, rest)) = items.split_first() else {
            return self.exec_block(frame, body);
        };
        let manager = self.eval(frame, &item.context)?;
        let enter = self.get_attr(&manager, "__enter__")?;
        let exit = self.get_attr(&manager, "__exit__")?;
        let entered = self.call(&enter, Args::default())?;
        if let Some(target) = &item.target {
            self.assign(frame, target, entered)?;
        }

        match self.exec_with(frame, rest, body) {
            Err(Flow::Raise(raised)) => {
                let exc_type = match &raised.exception {
                    Value::Instance(instance) => Value::Class(instance.class.clone()),
                    _ => Value::None,
                };
                let args = Args::new(vec![exc_type, raised.exception.clone(), Value::None]);
                let suppress = self.call(&exit, args)?;
                if self.truthy(&suppress)? {
                    Ok(())
                } else {
                    Err(Flow::Raise(raised))
                }
            }
            other => {
                self.call(&exit, Args::new(vec![Value::None, Value::None, Value::None]))?;
                other
            }
        }
    }
}

/// Point every function defined in a class body back at the class, for `super()`.
fn claim_methods(class: &Rc<Class>) {
    for (_, value) in class.attrs.entries() {
        let function = match &value {
            Value::Function(f) => Some(f.clone()),
            Value::StaticMethod(inner) | Value::ClassMethod(inner) => match inner.as_ref() {
                Value::Function(f) => Some(f.clone()),
                _ => None,
            },
            Value::Property(p) => match &p.fget {
                Some(Value::Function(f)) => Some(f.clone()),
                _ => None,
            },
            _ => None,
        };
        if let Some(function) = function {
            if function.owner.borrow().upgrade().is_none() {
                *function.owner.borrow_mut() = Rc::downgrade(class);
            }
        }
        if let Value::Property(p) = &value {
            if let Some(Value::Function(f)) = &p.fset {
                if f.owner.borrow().upgrade().is_none() {
                    *f.owner.borrow_mut() = Rc::downgrade(class);
                }
            }
        }
    }
}

/// C3 linearization of a class with the given bases (the class itself excluded).
pub(crate) fn linearize(bases: &[Rc<Class>]) -> Option<Vec<Rc<Class>>> {
    let mut sequences: Vec<Vec<Rc<Class>>> = bases.iter().map(|b| b.linearization()).collect();
    sequences.push(bases.to_vec());
    let mut result: Vec<Rc<Class>> = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Some(result);
        }
        let candidate = sequences.iter().map(|s| s[0].clone()).find(|head| {
            !sequences
                .iter()
                .any(|s| s[1..].iter().any(|c| Rc::ptr_eq(c, head)))
        })?;
        for sequence in &mut sequences {
            if Rc::ptr_eq(&sequence[0], &candidate) {
                sequence.remove(0);
            }
        }
        result.push(candidate);
    }
}
