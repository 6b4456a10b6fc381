//! Module loading and the `import` statements.
//!
//! Dotted names resolve against the interpreter root (`a.b` → `<root>/a/b.py` or
//! `<root>/a/b/__init__.py`), falling back to the importing file's directory for top-level names.
//! Every module is executed once per interpreter and cached under its dotted name; parent packages
//! are imported first and receive each submodule as an attribute.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use runtest_core::conventions::{MODULE_SEPARATOR, PACKAGE_MARKER, SOURCE_EXTENSION};
use runtest_core::lang::exceptions::ExceptionId;
use runtest_syntax::ast::{ImportAlias, ImportFromStmt, ImportNames};
use runtest_syntax::parse_source;

use super::{Exec, Flow, Frame, Interpreter, Raised, syntax_error_flow};
use crate::builtins;
use crate::error::RuntimeError;
use crate::source::SourceFile;
use crate::trace;
use crate::value::{Module, Namespace, Value};

impl Interpreter {
    /// Load (or fetch from the cache) the module `name` defined by the file at `path`.
    #[tracing::instrument(skip_all, fields(module = %name))]
    pub fn load_module(&self, name: &str, path: &Path) -> Result<Rc<Module>, RuntimeError> {
        if let Some(module) = self.cached_module(name) {
            return Ok(module);
        }
        let text = std::fs::read_to_string(path).map_err(|source| RuntimeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let loaded = (|| -> Exec<Rc<Module>> {
            let parent = match name.rsplit_once(MODULE_SEPARATOR) {
                Some((parent, _)) => Some(self.import_module(parent, Some(path))?),
                None => None,
            };
            let module = self.exec_module_source(name, path, text)?;
            if let (Some(parent), Some((_, leaf))) = (parent, name.rsplit_once(MODULE_SEPARATOR)) {
                parent.ns.set(leaf, Value::Module(module.clone()));
            }
            Ok(module)
        })();
        loaded.map_err(|flow| {
            let raised = match flow {
                Flow::Raise(raised) => *raised,
                _ => Raised::new(self.exception(ExceptionId::SyntaxError, "'return' outside function")),
            };
            RuntimeError::Raised(self.report(&raised))
        })
    }

    /// Import `name`, loading its parents first.
    pub(crate) fn import_module(&self, name: &str, importer: Option<&Path>) -> Exec<Rc<Module>> {
        if let Some(module) = self.cached_module(name) {
            return Ok(module);
        }
        if let Some(module) = builtins::native_module(self, name) {
            self.cache_module(module.clone());
            return Ok(module);
        }

        let parent = match name.rsplit_once(MODULE_SEPARATOR) {
            Some((parent, _)) => Some(self.import_module(parent, importer)?),
            None => None,
        };
        let Some(path) = self.find_module(name, importer) else {
            return self.raise(ExceptionId::ModuleNotFoundError, format!("No module named '{name}'"));
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                return self.raise(ExceptionId::ImportError, format!("cannot read {}: {err}", path.display()));
            }
        };
        let module = self.exec_module_source(name, &path, text)?;
        if let (Some(parent), Some((_, leaf))) = (parent, name.rsplit_once(MODULE_SEPARATOR)) {
            parent.ns.set(leaf, Value::Module(module.clone()));
        }
        Ok(module)
    }

    fn find_module(&self, name: &str, importer: Option<&Path>) -> Option<PathBuf> {
        let relative: PathBuf = name.split(MODULE_SEPARATOR).collect();
        let mut bases = vec![self.root().to_path_buf()];
        if !name.contains(MODULE_SEPARATOR) {
            if let Some(dir) = importer.and_then(Path::parent) {
                bases.push(dir.to_path_buf());
            }
        }
        bases.into_iter().find_map(|base| {
            let file = base.join(&relative).with_extension(SOURCE_EXTENSION);
            if file.is_file() {
                return Some(file);
            }
            let package = base.join(&relative).join(PACKAGE_MARKER);
            package.is_file().then_some(package)
        })
    }

    fn exec_module_source(&self, name: &str, path: &Path, text: String) -> Exec<Rc<Module>> {
        let file = Rc::new(SourceFile::new(path.display().to_string(), Some(path), text));
        let program = match parse_source(&file.text) {
            Ok(program) => program,
            Err(errors) => return Err(syntax_error_flow(self, &file, &errors)),
        };
        if let Some(tracer) = self.tracer() {
            tracer.register(path, trace::statement_lines(&program, &file));
        }

        let is_package = path.file_name().is_some_and(|f| f == PACKAGE_MARKER);
        let package = if is_package {
            name.to_string()
        } else {
            name.rsplit_once(MODULE_SEPARATOR)
                .map(|(parent, _)| parent.to_string())
                .unwrap_or_default()
        };
        let ns = Namespace::new();
        ns.set("__name__", Value::str(name));
        ns.set("__file__", Value::str(file.name.as_str()));
        ns.set("__package__", Value::str(package));
        ns.set(
            "__doc__",
            program.doc.as_ref().map(|d| Value::str(d.text.as_str())).unwrap_or(Value::None),
        );
        let module = Rc::new(Module {
            name: name.to_string(),
            ns: ns.clone(),
            file: Some(file.clone()),
            docstring: program.doc.clone(),
        });

        // Cached before the body runs so circular imports see the partial module.
        self.cache_module(module.clone());
        let frame = Frame::module(ns, file);
        if let Err(flow) = self.exec_program(&frame, &program) {
            self.uncache_module(name);
            return Err(flow);
        }
        tracing::debug!(module = %name, "module executed");
        Ok(module)
    }

    pub(crate) fn exec_import(&self, frame: &Frame, aliases: &[ImportAlias]) -> Exec<()> {
        let importer = frame.file.path.clone();
        for alias in aliases {
            let name = alias.path.join(".");
            let leaf = self.import_module(&name, importer.as_deref())?;
            match &alias.alias {
                Some(alias) => self.store_name(frame, alias, Value::Module(leaf)),
                None => {
                    let top = &alias.path[0];
                    let module = self.import_module(top, importer.as_deref())?;
                    self.store_name(frame, top, Value::Module(module));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn exec_import_from(&self, frame: &Frame, from: &ImportFromStmt) -> Exec<()> {
        let importer = frame.file.path.clone();
        let name = self.resolve_from_name(frame, from)?;
        let module = self.import_module(&name, importer.as_deref())?;

        match &from.names {
            ImportNames::Star => {
                let public: Vec<String> = match module.ns.get("__all__") {
                    Some(all) => self
                        .collect_iterable(&all)?
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                    None => module.ns.keys().into_iter().filter(|k| !k.starts_with('_')).collect(),
                };
                for key in public {
                    let value = self.get_attr(&Value::Module(module.clone()), &key)?;
                    self.store_name(frame, &key, value);
                }
            }
            ImportNames::List(names) => {
                for (item, alias) in names {
                    let value = match module.ns.get(item) {
                        Some(value) => value,
                        None => match self.import_module(&format!("{name}.{item}"), importer.as_deref()) {
                            Ok(sub) => Value::Module(sub),
                            Err(Flow::Raise(raised))
                                if self.is_exception(&raised.exception, ExceptionId::ModuleNotFoundError) =>
                            {
                                let location = module
                                    .file
                                    .as_ref()
                                    .map(|f| format!(" ({})", f.name))
                                    .unwrap_or_else(|| " (unknown location)".to_string());
                                return self.raise(
                                    ExceptionId::ImportError,
                                    format!("cannot import name '{item}' from '{name}'{location}"),
                                );
                            }
                            Err(other) => return Err(other),
                        },
                    };
                    self.store_name(frame, alias.as_deref().unwrap_or(item), value);
                }
            }
        }
        Ok(())
    }

    /// Absolute module name of a (possibly relative) `from` import.
    fn resolve_from_name(&self, frame: &Frame, from: &ImportFromStmt) -> Exec<String> {
        let module = from.module.join(".");
        if from.level == 0 {
            return Ok(module);
        }
        let package = match frame.globals.get("__package__") {
            Some(Value::Str(p)) => p.to_string(),
            _ => String::new(),
        };
        if package.is_empty() {
            return self.raise(
                ExceptionId::ImportError,
                "attempted relative import with no known parent package",
            );
        }
        let mut parts: Vec<&str> = package.split(MODULE_SEPARATOR).collect();
        for _ in 1..from.level {
            if parts.pop().is_none() || parts.is_empty() {
                return self.raise(ExceptionId::ImportError, "attempted relative import beyond top-level package");
            }
        }
        let base = parts.join(".");
        Ok(if module.is_empty() { base } else { format!("{base}.{module}") })
    }
}
