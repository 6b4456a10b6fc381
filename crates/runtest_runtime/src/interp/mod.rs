//! Tree-walking evaluator for the accepted Python subset.
//!
//! [`Interpreter`] is a cheap-to-clone handle over shared state (loaded modules, builtins, the
//! output capture stack), so natively implemented functions receive `&Interpreter` and can call
//! back into user code. Control flow that unwinds (return, break, continue, exceptions) travels as
//! the `Err` side of [`Exec`].
//!
//! ## Notes
//! - A frame adds itself to an exception's traceback when the exception leaves it, so tracebacks
//!   read outermost-first like CPython's.
//! - Output written by `print` goes to the innermost active capture buffer, or to stdout when no
//!   example is running.

mod attr;
mod call;
mod exceptions;
mod expr;
mod import;
mod iter;
mod ops;
mod repr;
mod stmt;

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;
use runtest_core::lang::exceptions::ExceptionId;
use runtest_syntax::ast::Program;
use runtest_syntax::parse_source;

use crate::builtins::{self, Types};
use crate::error::ExceptionReport;
use crate::source::SourceFile;
use crate::trace::LineTracer;
use crate::value::{Class, Function, Module, Namespace, Value};

pub(crate) use exceptions::syntax_error_flow;
pub(crate) use ops::mapping_items;
pub(crate) use repr::quote_str;

/// Deepest call nesting before `RecursionError` is raised.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Non-local exits of statement execution.
#[derive(Clone)]
pub enum Flow {
    Return(Value),
    Break,
    Continue,
    Raise(Box<Raised>),
}

/// An exception in flight, with the frames it has left so far (outermost first).
#[derive(Clone)]
pub struct Raised {
    pub exception: Value,
    pub traceback: Vec<TraceFrame>,
}

impl Raised {
    pub fn new(exception: Value) -> Self {
        Self {
            exception,
            traceback: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct TraceFrame {
    pub file: Rc<SourceFile>,
    pub line: usize,
    pub name: String,
}

pub type Exec<T> = Result<T, Flow>;

/// Output and outcome of one example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleRun {
    /// Everything the example printed, including echoed expression values.
    pub output: String,
    /// Set when the example raised.
    pub exception: Option<ExceptionReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Module,
    Class,
    Function,
}

/// Execution context of one module body, class body, function call, or comprehension.
pub(crate) struct Frame {
    pub kind: FrameKind,
    pub locals: Namespace,
    pub globals: Namespace,
    /// Enclosing function scopes, innermost first.
    pub enclosing: Vec<Namespace>,
    pub file: Rc<SourceFile>,
    /// Name shown in tracebacks (`<module>`, a function name).
    pub name: String,
    /// Prefix for the `__qualname__` of definitions made in this frame.
    pub qualname: String,
    pub line: Cell<usize>,
    pub declared_global: RefCell<Vec<String>>,
    pub declared_nonlocal: RefCell<Vec<String>>,
    /// Echo the repr of expression statements (interactive examples).
    pub echo: bool,
}

impl Frame {
    pub fn module(globals: Namespace, file: Rc<SourceFile>) -> Frame {
        Frame {
            kind: FrameKind::Module,
            locals: globals.clone(),
            globals,
            enclosing: Vec::new(),
            file,
            name: "<module>".to_string(),
            qualname: String::new(),
            line: Cell::new(1),
            declared_global: RefCell::new(Vec::new()),
            declared_nonlocal: RefCell::new(Vec::new()),
            echo: false,
        }
    }

    /// Scopes a function defined in this frame closes over.
    pub fn closure_scopes(&self) -> Vec<Namespace> {
        match self.kind {
            FrameKind::Module => Vec::new(),
            FrameKind::Class => self.enclosing.clone(),
            FrameKind::Function => {
                let mut scopes = Vec::with_capacity(self.enclosing.len() + 1);
                scopes.push(self.locals.clone());
                scopes.extend(self.enclosing.iter().cloned());
                scopes
            }
        }
    }

    /// Qualified name for a definition called `name` made in this frame.
    pub fn child_qualname(&self, name: &str) -> String {
        if self.qualname.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.qualname, name)
        }
    }

    pub fn module_name(&self) -> String {
        match self.globals.get("__name__") {
            Some(Value::Str(s)) => s.to_string(),
            _ => "__main__".to_string(),
        }
    }

    pub fn trace_frame(&self) -> TraceFrame {
        TraceFrame {
            file: self.file.clone(),
            line: self.line.get(),
            name: self.name.clone(),
        }
    }
}

/// A live function call, for `super()` and recursion accounting.
pub(crate) struct CallRecord {
    pub function: Rc<Function>,
    pub locals: Namespace,
}

struct State {
    root: PathBuf,
    builtins: Namespace,
    types: Types,
    modules: RefCell<IndexMap<String, Rc<Module>>>,
    captures: RefCell<Vec<String>>,
    calls: RefCell<Vec<CallRecord>>,
    /// Exceptions currently being handled by `except` blocks, innermost last.
    handling: RefCell<Vec<Raised>>,
    tracer: RefCell<Option<LineTracer>>,
    /// Containers whose repr is in progress (cycle detection).
    repr_guard: RefCell<Vec<usize>>,
}

/// Handle to one interpreter instance.
#[derive(Clone)]
pub struct Interpreter {
    state: Rc<State>,
}

impl Interpreter {
    /// Create an interpreter that resolves imports against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let types = Types::new();
        let builtins = builtins::namespace(&types);
        Self {
            state: Rc::new(State {
                root: root.into(),
                builtins,
                types,
                modules: RefCell::new(IndexMap::new()),
                captures: RefCell::new(Vec::new()),
                calls: RefCell::new(Vec::new()),
                handling: RefCell::new(Vec::new()),
                tracer: RefCell::new(None),
                repr_guard: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.state.root
    }

    pub(crate) fn types(&self) -> &Types {
        &self.state.types
    }

    pub(crate) fn builtins(&self) -> &Namespace {
        &self.state.builtins
    }

    /// Install (or remove) the line tracer used for coverage.
    pub fn set_tracer(&self, tracer: Option<LineTracer>) {
        *self.state.tracer.borrow_mut() = tracer;
    }

    /// A fresh global namespace whose `__name__` is `name`.
    pub fn scratch_namespace(&self, name: &str) -> Namespace {
        let ns = Namespace::new();
        ns.set("__name__", Value::str(name));
        ns
    }

    /// Execute one interactive example in `globals`, capturing its output.
    ///
    /// Expression statements at the example's top level echo their `repr` the way the interactive
    /// prompt does.
    #[tracing::instrument(skip_all, fields(name = %name))]
    pub fn run_example(&self, globals: &Namespace, source: &str, name: &str) -> ExampleRun {
        let file = Rc::new(SourceFile::new(format!("<doctest {name}>"), None, source));
        self.state.captures.borrow_mut().push(String::new());

        let result = match parse_source(source) {
            Ok(program) => {
                let mut frame = Frame::module(globals.clone(), file.clone());
                frame.echo = true;
                self.exec_program(&frame, &program)
            }
            Err(errors) => Err(syntax_error_flow(self, &file, &errors)),
        };

        let output = self.state.captures.borrow_mut().pop().unwrap_or_default();
        let exception = match result {
            Ok(()) => None,
            Err(Flow::Raise(raised)) => Some(self.report(&raised)),
            Err(_) => None,
        };
        ExampleRun { output, exception }
    }

    /// Run a module-level body in `frame`, attaching the frame to escaping exceptions.
    pub(crate) fn exec_program(&self, frame: &Frame, program: &Program) -> Exec<()> {
        match self.exec_block(frame, &program.body) {
            Ok(()) => Ok(()),
            Err(Flow::Raise(mut raised)) => {
                raised.traceback.insert(0, frame.trace_frame());
                Err(Flow::Raise(raised))
            }
            Err(Flow::Return(_)) => self.raise(ExceptionId::SyntaxError, "'return' outside function"),
            Err(Flow::Break) => self.raise(ExceptionId::SyntaxError, "'break' outside loop"),
            Err(Flow::Continue) => self.raise(ExceptionId::SyntaxError, "'continue' not properly in loop"),
        }
    }

    /// Write program output to the active capture buffer or stdout.
    pub(crate) fn write_stdout(&self, text: &str) {
        if let Some(buffer) = self.state.captures.borrow_mut().last_mut() {
            buffer.push_str(text);
            return;
        }
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
            tracing::debug!(error = %err, "failed to write program output");
        }
    }

    pub(crate) fn write_stderr(&self, text: &str) {
        let mut stderr = std::io::stderr().lock();
        if let Err(err) = stderr.write_all(text.as_bytes()) {
            tracing::debug!(error = %err, "failed to write program output");
        }
    }

    /// Record execution of `line` in `file` when tracing is active.
    pub(crate) fn trace_line(&self, file: &SourceFile, line: usize) {
        if let (Some(tracer), Some(path)) = (self.state.tracer.borrow().as_ref(), file.path.as_deref()) {
            tracer.record(path, line);
        }
    }

    pub(crate) fn tracer(&self) -> Option<LineTracer> {
        self.state.tracer.borrow().clone()
    }

    // ---- exceptions ------------------------------------------------------------------------

    /// The builtin class for an exception id.
    pub(crate) fn exception_class(&self, id: ExceptionId) -> Rc<Class> {
        self.state.types.exception(id)
    }

    /// Build an exception instance with the given positional args.
    pub(crate) fn exception_with_args(&self, class: Rc<Class>, args: Vec<Value>) -> Value {
        exceptions::new_exception(class, args)
    }

    /// Build a builtin exception carrying `message` (no args when empty).
    pub(crate) fn exception(&self, id: ExceptionId, message: impl Into<String>) -> Value {
        let message = message.into();
        let args = if message.is_empty() {
            Vec::new()
        } else {
            vec![Value::str(message)]
        };
        self.exception_with_args(self.exception_class(id), args)
    }

    pub(crate) fn error(&self, id: ExceptionId, message: impl Into<String>) -> Flow {
        Flow::Raise(Box::new(Raised::new(self.exception(id, message))))
    }

    pub(crate) fn raise<T>(&self, id: ExceptionId, message: impl Into<String>) -> Exec<T> {
        Err(self.error(id, message))
    }

    pub(crate) fn type_error(&self, message: impl Into<String>) -> Flow {
        self.error(ExceptionId::TypeError, message)
    }

    pub(crate) fn value_error(&self, message: impl Into<String>) -> Flow {
        self.error(ExceptionId::ValueError, message)
    }

    /// Render an escaped exception for a host.
    pub fn report(&self, raised: &Raised) -> ExceptionReport {
        exceptions::report(self, raised)
    }

    // ---- call bookkeeping ------------------------------------------------------------------

    pub(crate) fn call_depth(&self) -> usize {
        self.state.calls.borrow().len()
    }

    pub(crate) fn push_call(&self, record: CallRecord) {
        self.state.calls.borrow_mut().push(record);
    }

    pub(crate) fn pop_call(&self) {
        self.state.calls.borrow_mut().pop();
    }

    /// Function and locals of the innermost active call.
    pub(crate) fn current_call(&self) -> Option<(Rc<Function>, Namespace)> {
        self.state
            .calls
            .borrow()
            .last()
            .map(|r| (r.function.clone(), r.locals.clone()))
    }

    pub(crate) fn push_handling(&self, raised: Raised) {
        self.state.handling.borrow_mut().push(raised);
    }

    pub(crate) fn pop_handling(&self) {
        self.state.handling.borrow_mut().pop();
    }

    pub(crate) fn current_handling(&self) -> Option<Raised> {
        self.state.handling.borrow().last().cloned()
    }

    // ---- modules ---------------------------------------------------------------------------

    pub(crate) fn cached_module(&self, name: &str) -> Option<Rc<Module>> {
        self.state.modules.borrow().get(name).cloned()
    }

    pub(crate) fn cache_module(&self, module: Rc<Module>) {
        self.state.modules.borrow_mut().insert(module.name.clone(), module);
    }

    pub(crate) fn uncache_module(&self, name: &str) {
        self.state.modules.borrow_mut().shift_remove(name);
    }

    // ---- repr cycle guard ------------------------------------------------------------------

    /// Mark a container as being rendered; `false` when it already is (a cycle).
    pub(crate) fn enter_repr(&self, address: usize) -> bool {
        let mut guard = self.state.repr_guard.borrow_mut();
        if guard.contains(&address) {
            return false;
        }
        guard.push(address);
        true
    }

    pub(crate) fn leave_repr(&self, address: usize) {
        let mut guard = self.state.repr_guard.borrow_mut();
        if let Some(pos) = guard.iter().rposition(|a| *a == address) {
            guard.remove(pos);
        }
    }
}
