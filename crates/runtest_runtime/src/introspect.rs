//! What a loaded module offers for testing: documentation blocks and test-case classes.

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use runtest_core::conventions::is_test_method_name;
use runtest_syntax::ast::Docstring;

use crate::interp::Interpreter;
use crate::source::SourceFile;
use crate::unittest;
use crate::value::{Class, Function, Module, Value};

/// One documentation block reachable from a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocBlock {
    /// Dotted name: `pkg.mod`, `pkg.mod.func`, `pkg.mod.Class.method`, `pkg.mod.__test__.key`.
    pub name: String,
    pub text: String,
    /// 0-based line where the docstring starts; `None` for `__test__` strings.
    pub lineno: Option<usize>,
    pub file: Option<PathBuf>,
}

/// A test method of a [`TestClass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMethod {
    pub name: String,
    /// 1-based line of the `def` (or its first decorator).
    pub line: usize,
}

/// A `unittest.TestCase` subclass defined in a module, with its test methods.
#[derive(Clone)]
pub struct TestClass {
    pub class: Rc<Class>,
    pub name: String,
    /// 1-based line of the `class` statement.
    pub line: usize,
    pub file: Option<PathBuf>,
    pub methods: Vec<TestMethod>,
}

impl std::fmt::Debug for TestClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClass")
            .field("name", &self.name)
            .field("line", &self.line)
            .field("methods", &self.methods)
            .finish()
    }
}

fn path_of(file: &SourceFile) -> Option<PathBuf> {
    file.path.clone()
}

fn block(name: String, doc: &Docstring, file: &SourceFile) -> DocBlock {
    DocBlock {
        name,
        text: doc.text.clone(),
        lineno: Some(file.line_of(doc.span.start).saturating_sub(1)),
        file: path_of(file),
    }
}

/// Walks a module's namespace the way doctest's finder does.
struct Finder<'a> {
    module: &'a Module,
    seen: HashSet<usize>,
    blocks: Vec<DocBlock>,
}

impl Finder<'_> {
    fn defined_here(&self, value: &Value) -> bool {
        match value {
            Value::Function(function) => function.globals.ptr_eq(&self.module.ns),
            Value::Class(class) => class.module == self.module.name && class.origin.is_some(),
            _ => false,
        }
    }

    /// Visit a value bound in the module or a class body under `name`.
    fn visit(&mut self, name: String, value: &Value) {
        let value = match value {
            Value::StaticMethod(inner) | Value::ClassMethod(inner) => inner.as_ref(),
            other => other,
        };
        match value {
            Value::Function(function) if self.defined_here(value) => self.visit_function(name, function),
            Value::Class(class) if self.defined_here(value) => self.visit_class(name, class),
            Value::Property(property) => {
                let Some(Value::Function(getter)) = &property.fget else {
                    return;
                };
                if !getter.globals.ptr_eq(&self.module.ns) {
                    return;
                }
                if let Some(doc) = property.doc.as_ref().or(getter.docstring()) {
                    self.blocks.push(block(name, doc, &getter.file));
                }
            }
            _ => {}
        }
    }

    fn visit_function(&mut self, name: String, function: &Rc<Function>) {
        if !self.seen.insert(Rc::as_ptr(function) as usize) {
            return;
        }
        if let Some(doc) = function.docstring() {
            self.blocks.push(block(name, doc, &function.file));
        }
    }

    fn visit_class(&mut self, name: String, class: &Rc<Class>) {
        if !self.seen.insert(Rc::as_ptr(class) as usize) {
            return;
        }
        if let Some(origin) = &class.origin {
            if let Some(doc) = &origin.doc {
                self.blocks.push(block(name.clone(), doc, &origin.file));
            }
        }
        for (attr, value) in class.attrs.entries() {
            self.visit(format!("{name}.{attr}"), &value);
        }
    }

    /// Entries of the module's `__test__` dict: strings, functions and classes.
    fn visit_test_dict(&mut self, interp: &Interpreter) {
        let Some(Value::Dict(map)) = self.module.ns.get("__test__") else {
            return;
        };
        let entries = map.borrow().items();
        for (key, value) in entries {
            let Value::Str(key) = &key else {
                tracing::debug!(module = %self.module.name, "skipping non-string __test__ key");
                continue;
            };
            let name = format!("{}.__test__.{key}", self.module.name);
            match &value {
                Value::Str(text) => self.blocks.push(DocBlock {
                    name,
                    text: text.to_string(),
                    lineno: None,
                    file: self.module.file.as_deref().and_then(path_of),
                }),
                Value::Function(function) => self.visit_function(name, function),
                Value::Class(class) => self.visit_class(name, class),
                other => {
                    tracing::debug!(
                        key = %key,
                        kind = %interp.type_name(other),
                        "skipping __test__ entry that is not a string, function or class"
                    );
                }
            }
        }
    }
}

/// Every documentation block of `module`, sorted by name.
///
/// Covers the module docstring, functions and classes defined in the module (methods, static and
/// class methods, and properties included, recursively), and the `__test__` dict.
#[tracing::instrument(skip_all, fields(module = %module.name))]
pub fn doc_blocks(interp: &Interpreter, module: &Module) -> Vec<DocBlock> {
    let mut finder = Finder {
        module,
        seen: HashSet::new(),
        blocks: Vec::new(),
    };
    if let (Some(doc), Some(file)) = (&module.docstring, &module.file) {
        finder.blocks.push(block(module.name.clone(), doc, file));
    }
    for (name, value) in module.ns.entries() {
        if matches!(value, Value::Function(_) | Value::Class(_)) {
            finder.visit(format!("{}.{name}", module.name), &value);
        }
    }
    finder.visit_test_dict(interp);
    let mut blocks = finder.blocks;
    blocks.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(count = blocks.len(), "documentation blocks found");
    blocks
}

/// `TestCase` subclasses defined in `module`, in definition order, with their test methods.
///
/// Methods come from the class and its user-defined bases, in declaration order; a class without
/// test methods is left out.
#[tracing::instrument(skip_all, fields(module = %module.name))]
pub fn test_case_classes(interp: &Interpreter, module: &Module) -> Vec<TestClass> {
    let Some(test_case) = unittest::test_case_class(interp) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut classes = Vec::new();
    for (_, value) in module.ns.entries() {
        let Value::Class(class) = value else {
            continue;
        };
        let Some(origin) = &class.origin else {
            continue;
        };
        if class.module != module.name
            || !class.is_subclass_of(&test_case)
            || !seen.insert(Rc::as_ptr(&class) as usize)
        {
            continue;
        }
        let methods = test_methods(&class);
        if methods.is_empty() {
            continue;
        }
        classes.push(TestClass {
            name: class.name.clone(),
            line: origin.line,
            file: path_of(&origin.file),
            methods,
            class: class.clone(),
        });
    }
    classes.sort_by_key(|c| c.line);
    classes
}

fn test_methods(class: &Rc<Class>) -> Vec<TestMethod> {
    let mut names = HashSet::new();
    let mut methods = Vec::new();
    for owner in class.linearization() {
        if owner.origin.is_none() {
            continue;
        }
        for (name, value) in owner.attrs.entries() {
            if !is_test_method_name(&name) || !names.insert(name.clone()) {
                continue;
            }
            if let Value::Function(function) = value {
                methods.push(TestMethod {
                    name,
                    line: function.line,
                });
            }
        }
    }
    methods
}
