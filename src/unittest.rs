//! Test-method collection.

use runtest_core::conventions::is_test_method_name;

use crate::runner::interfaces::LoadedModule;

/// One test method of a [`TestGroup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMethodRecord {
    pub name: String,
    /// 1-based line of the method definition.
    pub line: usize,
}

/// The test methods of one test-case class; they share one report header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestGroup {
    /// Handle of the class in its [`LoadedModule`].
    pub class_id: usize,
    pub class_name: String,
    /// 1-based line of the class statement.
    pub line: usize,
    pub methods: Vec<TestMethodRecord>,
}

/// Groups a module's test methods by declaring class.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestMethodCollector;

impl TestMethodCollector {
    /// Test-case classes of `module` in declaration order, each with its test methods in
    /// declaration order. Classes without test methods are left out.
    #[tracing::instrument(skip_all, fields(module = %module.identity()))]
    pub fn collect(&self, module: &dyn LoadedModule) -> Vec<TestGroup> {
        let mut groups: Vec<TestGroup> = module
            .test_case_classes()
            .into_iter()
            .filter_map(|class| {
                let methods: Vec<TestMethodRecord> = class
                    .methods
                    .into_iter()
                    .filter(|(name, _)| is_test_method_name(name))
                    .map(|(name, line)| TestMethodRecord { name, line })
                    .collect();
                (!methods.is_empty()).then(|| TestGroup {
                    class_id: class.id,
                    class_name: class.name,
                    line: class.line,
                    methods,
                })
            })
            .collect();
        groups.sort_by_key(|group| group.line);
        tracing::debug!(groups = groups.len(), "test classes collected");
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::interfaces::{CandidateClass, DocSource, ExecutionContext};
    use crate::runner::outcome::{Fault, MethodOutcome};

    struct FakeModule(Vec<CandidateClass>);

    impl LoadedModule for FakeModule {
        fn identity(&self) -> &str {
            "fake"
        }
        fn doc_sources(&self) -> Vec<DocSource> {
            Vec::new()
        }
        fn block_context(&self) -> Box<dyn ExecutionContext> {
            unimplemented!("not used by the collector")
        }
        fn test_case_classes(&self) -> Vec<CandidateClass> {
            self.0.clone()
        }
        fn class_skip_reason(&self, _class: usize) -> Option<String> {
            None
        }
        fn set_up_class(&self, _class: usize) -> Result<(), Fault> {
            Ok(())
        }
        fn tear_down_class(&self, _class: usize) -> Result<(), Fault> {
            Ok(())
        }
        fn run_test_method(&self, _class: usize, _method: &str) -> MethodOutcome {
            MethodOutcome::Success
        }
    }

    fn class(id: usize, name: &str, line: usize, methods: &[(&str, usize)]) -> CandidateClass {
        CandidateClass {
            id,
            name: name.to_string(),
            line,
            methods: methods.iter().map(|(n, l)| (n.to_string(), *l)).collect(),
        }
    }

    #[test]
    fn test_helper_methods_are_excluded() {
        let module = FakeModule(vec![class(0, "T", 1, &[("test_a", 2), ("test_b", 4), ("helper", 6)])]);
        let groups = TestMethodCollector.collect(&module);
        assert_eq!(groups.len(), 1);
        let names: Vec<&str> = groups[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["test_a", "test_b"]);
    }

    #[test]
    fn test_classes_without_tests_contribute_nothing() {
        let module = FakeModule(vec![
            class(0, "Later", 20, &[("test_x", 21)]),
            class(1, "Empty", 10, &[("helper", 11)]),
            class(2, "Earlier", 1, &[("test_y", 2)]),
        ]);
        let groups = TestMethodCollector.collect(&module);
        let names: Vec<&str> = groups.iter().map(|g| g.class_name.as_str()).collect();
        assert_eq!(names, vec!["Earlier", "Later"]);
        assert_eq!(groups[1].class_id, 0);
    }
}
