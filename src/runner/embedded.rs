//! Default capabilities backed by the embedded interpreter.

use std::path::Path;
use std::rc::Rc;

use runtest_runtime::introspect::{doc_blocks, test_case_classes};
use runtest_runtime::{ExceptionReport, Interpreter, Module, Namespace, TestClass, unittest};

use super::interfaces::{CandidateClass, DocSource, Execution, ExecutionContext, LoadedModule, NamespaceLoader, TestError};
use super::outcome::{Fault, MethodOutcome};
use crate::discovery::ModuleIdentity;

impl From<ExceptionReport> for Fault {
    fn from(report: ExceptionReport) -> Self {
        Self {
            exception_only: report.exception_only,
            traceback: report.traceback,
        }
    }
}

impl From<unittest::MethodOutcome> for MethodOutcome {
    fn from(outcome: unittest::MethodOutcome) -> Self {
        match outcome {
            unittest::MethodOutcome::Passed => Self::Success,
            unittest::MethodOutcome::Failed(report) => Self::Failure(report.into()),
            unittest::MethodOutcome::Errored(report) => Self::Error(report.into()),
            unittest::MethodOutcome::Skipped(reason) => Self::Skip(reason),
            unittest::MethodOutcome::ExpectedFailure(report) => Self::ExpectedFailure(report.into()),
            unittest::MethodOutcome::UnexpectedSuccess => Self::UnexpectedSuccess,
        }
    }
}

/// Loads modules into one interpreter rooted at the scan root.
#[derive(Clone)]
pub struct EmbeddedLoader {
    interp: Interpreter,
}

impl EmbeddedLoader {
    pub fn new(root: &Path) -> Self {
        Self {
            interp: Interpreter::new(root),
        }
    }

    /// The interpreter modules are loaded into, for collaborators such as coverage.
    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }
}

impl NamespaceLoader for EmbeddedLoader {
    #[tracing::instrument(skip_all, fields(module = %identity))]
    fn load(&self, identity: &ModuleIdentity, path: &Path) -> Result<Box<dyn LoadedModule>, TestError> {
        let module = self
            .interp
            .load_module(identity.as_str(), path)
            .map_err(|err| TestError::Load {
                module: identity.to_string(),
                message: err.to_string(),
            })?;
        let classes = test_case_classes(&self.interp, &module);
        Ok(Box::new(EmbeddedModule {
            interp: self.interp.clone(),
            module,
            classes,
        }))
    }

    fn scratch_context(&self, name: &str) -> Box<dyn ExecutionContext> {
        Box::new(EmbeddedContext {
            interp: self.interp.clone(),
            globals: self.interp.scratch_namespace(name),
        })
    }
}

struct EmbeddedContext {
    interp: Interpreter,
    globals: Namespace,
}

impl ExecutionContext for EmbeddedContext {
    fn execute(&mut self, source: &str, name: &str) -> Execution {
        let run = self.interp.run_example(&self.globals, source, name);
        Execution {
            output: run.output,
            exception: run.exception.map(Fault::from),
        }
    }
}

struct EmbeddedModule {
    interp: Interpreter,
    module: Rc<Module>,
    classes: Vec<TestClass>,
}

impl EmbeddedModule {
    fn class(&self, id: usize) -> Option<&TestClass> {
        self.classes.get(id)
    }
}

impl LoadedModule for EmbeddedModule {
    fn identity(&self) -> &str {
        &self.module.name
    }

    fn doc_sources(&self) -> Vec<DocSource> {
        doc_blocks(&self.interp, &self.module)
            .into_iter()
            .map(|block| DocSource {
                name: block.name,
                text: block.text,
                lineno: block.lineno,
            })
            .collect()
    }

    fn block_context(&self) -> Box<dyn ExecutionContext> {
        Box::new(EmbeddedContext {
            interp: self.interp.clone(),
            globals: self.module.ns.copy(),
        })
    }

    fn test_case_classes(&self) -> Vec<CandidateClass> {
        self.classes
            .iter()
            .enumerate()
            .map(|(id, class)| CandidateClass {
                id,
                name: class.name.clone(),
                line: class.line,
                methods: class.methods.iter().map(|m| (m.name.clone(), m.line)).collect(),
            })
            .collect()
    }

    fn class_skip_reason(&self, class: usize) -> Option<String> {
        let class = self.class(class)?;
        unittest::class_skip_reason(&self.interp, &class.class)
    }

    fn set_up_class(&self, class: usize) -> Result<(), Fault> {
        match self.class(class) {
            Some(class) => unittest::set_up_class(&self.interp, &class.class).map_err(Fault::from),
            None => Ok(()),
        }
    }

    fn tear_down_class(&self, class: usize) -> Result<(), Fault> {
        match self.class(class) {
            Some(class) => unittest::tear_down_class(&self.interp, &class.class).map_err(Fault::from),
            None => Ok(()),
        }
    }

    fn run_test_method(&self, class: usize, method: &str) -> MethodOutcome {
        match self.class(class) {
            Some(class) => unittest::run_test_method(&self.interp, &class.class, method).into(),
            None => MethodOutcome::Skip(format!("unknown test class #{class}")),
        }
    }
}
