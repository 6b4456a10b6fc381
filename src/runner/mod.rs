//! Execution of discovered units.
//!
//! The [`ExecutionEngine`] takes one classified file at a time, extracts its documentation examples
//! and test methods, runs them through the injected capabilities of [`interfaces`] and hands every
//! outcome to the [`ReportFormatter`](crate::report::ReportFormatter).
//!
//! ## Order
//!
//! - Documentation blocks of a module run first, ordered by block name; the examples of a block run
//!   in source order in one shared namespace.
//! - Test-case classes follow in declaration order, their methods in declaration order.

pub mod embedded;
pub mod interfaces;
pub mod outcome;

use std::io::Write;

pub use embedded::EmbeddedLoader;
pub use interfaces::{
    CandidateClass, DocSource, Execution, ExecutionContext, LoadedModule, NamespaceLoader, TestError,
};
pub use outcome::{ExampleOutcome, Fault, LastSeen, MethodOutcome, ResultCounters, RunState};

use crate::config::{OptionFlags, RunConfig};
use crate::discovery::{Classification, ModuleIdentity, ScanUnit};
use crate::doctest::{ExampleBlock, ExampleExtractor, ExampleRecord, OutputChecker};
use crate::report::ReportFormatter;
use crate::unittest::{TestGroup, TestMethodCollector};

/// Runs the examples and test methods of one file at a time.
pub struct ExecutionEngine<'a> {
    loader: &'a dyn NamespaceLoader,
    config: &'a RunConfig,
    extractor: ExampleExtractor,
    checker: OutputChecker,
    collector: TestMethodCollector,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(loader: &'a dyn NamespaceLoader, config: &'a RunConfig) -> Self {
        Self {
            loader,
            config,
            extractor: ExampleExtractor,
            checker: OutputChecker,
            collector: TestMethodCollector,
        }
    }

    /// Run everything `classification` finds in `unit`.
    ///
    /// Only report write failures and unreadable plain-text files surface as errors; malformed
    /// examples and load failures are logged and degrade.
    #[tracing::instrument(skip_all, fields(file = %unit.rel_path().display()))]
    pub fn run_file<W: Write>(
        &self,
        unit: &ScanUnit,
        classification: &Classification,
        report: &mut ReportFormatter<W>,
        state: &mut RunState,
    ) -> Result<(), TestError> {
        match classification {
            Classification::Ignored => Ok(()),
            Classification::PlainText { name } => self.run_plain_text(unit, name, report, state),
            Classification::PackageModule(identity) => match self.loader.load(identity, &unit.path()) {
                Ok(module) => self.run_module(unit, identity, module.as_ref(), report, state),
                Err(err) => {
                    tracing::warn!(error = %err, "module failed to load; scanning as plain text");
                    self.run_plain_text(unit, unit.stem(), report, state)
                }
            },
        }
    }

    fn run_plain_text<W: Write>(
        &self,
        unit: &ScanUnit,
        name: &str,
        report: &mut ReportFormatter<W>,
        state: &mut RunState,
    ) -> Result<(), TestError> {
        let path = unit.path();
        let text = std::fs::read_to_string(&path).map_err(|source| TestError::Io { path, source })?;
        let examples = match self.extractor.extract(&text) {
            Ok(examples) => examples,
            Err(failure) => {
                tracing::debug!(%failure, "malformed examples; file skipped");
                return Ok(());
            }
        };
        if examples.is_empty() {
            return Ok(());
        }
        let block = ExampleBlock {
            name: name.to_string(),
            file: unit.rel_path(),
            lineno: Some(0),
            examples,
        };
        let mut context = self.loader.scratch_context(name);
        self.run_block(&block, name, context.as_mut(), report, state)
    }

    fn run_module<W: Write>(
        &self,
        unit: &ScanUnit,
        identity: &ModuleIdentity,
        module: &dyn LoadedModule,
        report: &mut ReportFormatter<W>,
        state: &mut RunState,
    ) -> Result<(), TestError> {
        let file = unit.rel_path();
        for source in module.doc_sources() {
            if state.should_stop() {
                return Ok(());
            }
            let examples = match self.extractor.extract(&source.text) {
                Ok(examples) => examples,
                Err(failure) => {
                    tracing::debug!(block = %source.name, %failure, "malformed examples; block skipped");
                    continue;
                }
            };
            if examples.is_empty() {
                continue;
            }
            let display = display_name(identity, &source.name).to_string();
            let block = ExampleBlock {
                name: source.name,
                file: file.clone(),
                lineno: source.lineno,
                examples,
            };
            let mut context = module.block_context();
            self.run_block(&block, &display, context.as_mut(), report, state)?;
        }

        for group in self.collector.collect(module) {
            if state.should_stop() {
                break;
            }
            self.run_group(module, &group, unit, report, state)?;
        }
        Ok(())
    }

    fn run_block<W: Write>(
        &self,
        block: &ExampleBlock,
        display: &str,
        context: &mut dyn ExecutionContext,
        report: &mut ReportFormatter<W>,
        state: &mut RunState,
    ) -> Result<(), TestError> {
        for (index, example) in block.examples.iter().enumerate() {
            if state.should_stop() {
                break;
            }
            let flags = example.flags(self.config.option_flags);
            if flags.contains(OptionFlags::SKIP) {
                continue;
            }
            report.start_example(state, block, display)?;
            let execution = context.execute(&example.source, &format!("{}[{index}]", block.name));
            let outcome = self.judge(example, execution, flags);
            report.example_result(state, block, example, &outcome)?;
        }
        Ok(())
    }

    /// Compare what an example produced with what it expected.
    pub fn judge(&self, example: &ExampleRecord, execution: Execution, flags: OptionFlags) -> ExampleOutcome {
        let Execution { output, exception } = execution;
        match (exception, &example.exc_msg) {
            (None, _) => {
                if self.checker.check(&example.want, &output, flags) {
                    ExampleOutcome::Success
                } else {
                    ExampleOutcome::Failure { got: output }
                }
            }
            (Some(fault), None) => ExampleOutcome::UnexpectedException(fault),
            (Some(fault), Some(expected)) => {
                let raised = format!("{}\n", fault.exception_only);
                if self.checker.check_exception(expected, &raised, flags) {
                    ExampleOutcome::Success
                } else {
                    ExampleOutcome::Failure {
                        got: format!("{output}{raised}"),
                    }
                }
            }
        }
    }

    fn run_group<W: Write>(
        &self,
        module: &dyn LoadedModule,
        group: &TestGroup,
        unit: &ScanUnit,
        report: &mut ReportFormatter<W>,
        state: &mut RunState,
    ) -> Result<(), TestError> {
        let file = unit.rel_path();

        if let Some(reason) = module.class_skip_reason(group.class_id) {
            for method in &group.methods {
                report.start_test(state, group, &file)?;
                report.test_result(state, method, &MethodOutcome::Skip(reason.clone()))?;
            }
            return Ok(());
        }

        if let Err(fault) = module.set_up_class(group.class_id) {
            report.class_error(state, group, &file, "setUpClass", &fault)?;
            return Ok(());
        }

        for method in &group.methods {
            if state.should_stop() {
                break;
            }
            report.start_test(state, group, &file)?;
            let outcome = module.run_test_method(group.class_id, &method.name);
            report.test_result(state, method, &outcome)?;
        }

        if let Err(fault) = module.tear_down_class(group.class_id) {
            report.class_error(state, group, &file, "tearDownClass", &fault)?;
        }
        Ok(())
    }
}

/// Block name as shown in headers: the package path of the module is dropped.
fn display_name<'n>(identity: &ModuleIdentity, name: &'n str) -> &'n str {
    identity
        .package_prefix()
        .and_then(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Palette;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;
    use std::rc::Rc;

    /// Answers each source with canned output; `raise:` sources raise instead.
    struct ScriptedContext {
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl ExecutionContext for ScriptedContext {
        fn execute(&mut self, source: &str, _name: &str) -> Execution {
            self.seen.borrow_mut().push(source.to_string());
            let source = source.trim_end();
            if let Some(message) = source.strip_prefix("raise:") {
                let exception_only = message.to_string();
                return Execution {
                    output: String::new(),
                    exception: Some(Fault {
                        traceback: format!("Traceback (most recent call last):\n{exception_only}"),
                        exception_only,
                    }),
                };
            }
            Execution {
                output: source.strip_prefix("print:").map(|s| format!("{s}\n")).unwrap_or_default(),
                exception: None,
            }
        }
    }

    struct ScriptedModule {
        docs: Vec<DocSource>,
        classes: Vec<CandidateClass>,
        outcomes: HashMap<String, MethodOutcome>,
        skip_class: Option<String>,
        set_up_fails: bool,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl LoadedModule for ScriptedModule {
        fn identity(&self) -> &str {
            "pkg.mod"
        }
        fn doc_sources(&self) -> Vec<DocSource> {
            self.docs.clone()
        }
        fn block_context(&self) -> Box<dyn ExecutionContext> {
            Box::new(ScriptedContext { seen: self.seen.clone() })
        }
        fn test_case_classes(&self) -> Vec<CandidateClass> {
            self.classes.clone()
        }
        fn class_skip_reason(&self, _class: usize) -> Option<String> {
            self.skip_class.clone()
        }
        fn set_up_class(&self, _class: usize) -> Result<(), Fault> {
            if self.set_up_fails {
                Err(fault("RuntimeError: no database"))
            } else {
                Ok(())
            }
        }
        fn tear_down_class(&self, _class: usize) -> Result<(), Fault> {
            Ok(())
        }
        fn run_test_method(&self, _class: usize, method: &str) -> MethodOutcome {
            self.seen.borrow_mut().push(method.to_string());
            self.outcomes.get(method).cloned().unwrap_or(MethodOutcome::Success)
        }
    }

    struct ScriptedLoader {
        module: RefCell<Option<ScriptedModule>>,
    }

    impl NamespaceLoader for ScriptedLoader {
        fn load(&self, identity: &ModuleIdentity, _path: &Path) -> Result<Box<dyn LoadedModule>, TestError> {
            match self.module.borrow_mut().take() {
                Some(module) => Ok(Box::new(module)),
                None => Err(TestError::Load {
                    module: identity.to_string(),
                    message: "SyntaxError: invalid syntax".to_string(),
                }),
            }
        }
        fn scratch_context(&self, _name: &str) -> Box<dyn ExecutionContext> {
            Box::new(ScriptedContext {
                seen: Rc::new(RefCell::new(Vec::new())),
            })
        }
    }

    fn fault(line: &str) -> Fault {
        Fault {
            exception_only: line.to_string(),
            traceback: format!("Traceback (most recent call last):\n{line}"),
        }
    }

    fn module(docs: &[(&str, &str, usize)], methods: &[&str]) -> ScriptedModule {
        ScriptedModule {
            docs: docs
                .iter()
                .map(|(name, text, line)| DocSource {
                    name: name.to_string(),
                    text: text.to_string(),
                    lineno: Some(*line),
                })
                .collect(),
            classes: vec![CandidateClass {
                id: 0,
                name: "ModTest".to_string(),
                line: 20,
                methods: methods.iter().enumerate().map(|(i, m)| (m.to_string(), 21 + i * 3)).collect(),
            }],
            outcomes: HashMap::new(),
            skip_class: None,
            set_up_fails: false,
            seen: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn unit(root: &Path) -> ScanUnit {
        ScanUnit::new(root, &root.join("pkg").join("mod.py")).unwrap()
    }

    fn run(module: ScriptedModule, config: &RunConfig) -> (String, RunState) {
        let root = Path::new("/work");
        let loader = ScriptedLoader {
            module: RefCell::new(Some(module)),
        };
        let engine = ExecutionEngine::new(&loader, config);
        let mut report = ReportFormatter::new(Vec::new(), Palette::PLAIN, 80);
        let mut state = RunState::new(config.fail_fast);
        let identity = ModuleIdentity::from_segments(["pkg", "mod"]);
        engine
            .run_file(&unit(root), &Classification::PackageModule(identity), &mut report, &mut state)
            .unwrap();
        (String::from_utf8(report.into_inner()).unwrap(), state)
    }

    fn record(want: &str, exc_msg: Option<&str>) -> ExampleRecord {
        ExampleRecord {
            source: "x\n".to_string(),
            want: want.to_string(),
            exc_msg: exc_msg.map(str::to_string),
            lineno: 0,
            indent: 0,
            options: Vec::new(),
        }
    }

    fn execution(output: &str, exception: Option<&str>) -> Execution {
        Execution {
            output: output.to_string(),
            exception: exception.map(fault),
        }
    }

    #[test]
    fn test_judge_output() {
        let config = RunConfig::new();
        let loader = ScriptedLoader { module: RefCell::new(None) };
        let engine = ExecutionEngine::new(&loader, &config);
        let flags = OptionFlags::empty();
        assert_eq!(
            engine.judge(&record("for test\n", None), execution("for test\n", None), flags),
            ExampleOutcome::Success
        );
        assert_eq!(
            engine.judge(&record("7\n", None), execution("8\n", None), flags),
            ExampleOutcome::Failure { got: "8\n".to_string() }
        );
    }

    #[test]
    fn test_judge_exceptions() {
        let config = RunConfig::new();
        let loader = ScriptedLoader { module: RefCell::new(None) };
        let engine = ExecutionEngine::new(&loader, &config);
        let flags = OptionFlags::empty();
        let want = "Traceback (most recent call last):\n  ...\nValueError: bad\n";
        let expected = Some("ValueError: bad\n");

        assert_eq!(
            engine.judge(&record(want, expected), execution("", Some("ValueError: bad")), flags),
            ExampleOutcome::Success
        );
        assert_eq!(
            engine.judge(&record(want, expected), execution("", Some("ValueError: worse")), flags),
            ExampleOutcome::Failure {
                got: "ValueError: worse\n".to_string()
            }
        );
        assert_eq!(
            engine.judge(
                &record(want, expected),
                execution("", Some("ValueError: worse")),
                OptionFlags::IGNORE_EXCEPTION_DETAIL
            ),
            ExampleOutcome::Success
        );
        assert_eq!(
            engine.judge(&record("1\n", None), execution("", Some("KeyError: 'k'")), flags),
            ExampleOutcome::UnexpectedException(fault("KeyError: 'k'"))
        );
    }

    #[test]
    fn test_examples_then_methods() {
        let mut module = module(
            &[
                ("pkg.mod", ">>> print:hello\nhello\n", 0),
                ("pkg.mod.f", ">>> print:8\n7\n", 4),
            ],
            &["test_ok", "test_bad", "helper"],
        );
        module.outcomes.insert("test_bad".to_string(), MethodOutcome::Failure(fault("AssertionError")));
        let seen = module.seen.clone();
        let (text, state) = run(module, &RunConfig::new());

        assert_eq!(state.counters.attempted, 4);
        assert_eq!(state.counters.failed, 2);
        assert!(text.starts_with(">>> mod <pkg/mod.py:1>\n ✓ print:hello <line 1>\n>>> mod.f <pkg/mod.py:5>\n"));
        assert!(text.contains("::: ModTest <pkg/mod.py:20>\n ✓ test_ok <line 21>\n ✗ test_bad <line 24>\n"));
        assert_eq!(
            *seen.borrow(),
            vec!["print:hello\n", "print:8\n", "test_ok", "test_bad"]
        );
    }

    #[test]
    fn test_skip_directive_is_not_counted() {
        let module = module(&[("pkg.mod.f", ">>> print:1  # doctest: +SKIP\n2\n>>> print:3\n3\n", 0)], &[]);
        let (_, state) = run(module, &RunConfig::new());
        assert_eq!(state.counters.attempted, 1);
        assert_eq!(state.counters.failed, 0);
    }

    #[test]
    fn test_skipped_class_reports_every_method() {
        let mut module = module(&[], &["test_a", "test_b"]);
        module.skip_class = Some("no network".to_string());
        let seen = module.seen.clone();
        let (text, state) = run(module, &RunConfig::new());
        assert_eq!(state.counters.skipped, 2);
        assert_eq!(text.matches("REASON: no network").count(), 2);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_set_up_class_failure_is_one_failure() {
        let mut module = module(&[], &["test_a", "test_b"]);
        module.set_up_fails = true;
        let seen = module.seen.clone();
        let (text, state) = run(module, &RunConfig::new());
        assert_eq!(state.counters.attempted, 1);
        assert_eq!(state.counters.failed, 1);
        assert!(text.contains(" ✗ setUpClass <line 20>\n"));
        assert!(text.contains("RuntimeError: no database"));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_fail_fast_stops_after_first_failure() {
        let module = module(&[("pkg.mod.f", ">>> print:8\n7\n>>> print:1\n1\n", 0)], &["test_a"]);
        let seen = module.seen.clone();
        let config = RunConfig::new().with_fail_fast(true);
        let (_, state) = run(module, &config);
        assert_eq!(state.counters.attempted, 1);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_display_name_drops_package_path() {
        let identity = ModuleIdentity::from_segments(["pkg", "sub", "mod"]);
        assert_eq!(display_name(&identity, "pkg.sub.mod.f"), "mod.f");
        let top = ModuleIdentity::from_segments(["mod"]);
        assert_eq!(display_name(&top, "mod.f"), "mod.f");
    }
}
