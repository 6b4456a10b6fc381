//! Loading modules from disk, finding their tests and running them.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use runtest_runtime::introspect::{doc_blocks, test_case_classes};
use runtest_runtime::unittest::{run_test_method, set_up_class, tear_down_class};
use proptest::prelude::*;
use runtest_core::sequences::slice_indices;
use runtest_runtime::{Interpreter, LineTracer, MethodOutcome, Module};

fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn load(interp: &Interpreter, dir: &Path, name: &str, text: &str) -> Rc<Module> {
    let path = write(dir, &format!("{name}.py"), text);
    interp.load_module(name, &path).unwrap()
}

const SHAPES: &str = r#""""Shapes.

>>> 1 + 1
2
"""

def area(w, h):
    """Area of a rectangle.

    >>> area(2, 3)
    6
    """
    return w * h


class Square:
    """A square.

    >>> Square(2).side
    2
    """

    def __init__(self, side):
        self.side = side

    def perimeter(self):
        """
        >>> Square(3).perimeter()
        12
        """
        return 4 * self.side

    @property
    def diagonal(self):
        """>>> round(Square(1).diagonal, 3)
        1.414
        """
        return self.side * 2 ** 0.5


__test__ = {"extra": ">>> area(1, 1)\n1\n"}
"#;

#[test]
fn test_doc_blocks_are_named_sorted_and_located() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new(dir.path());
    let module = load(&interp, dir.path(), "shapes", SHAPES);

    let blocks = doc_blocks(&interp, &module);
    let names: Vec<&str> = blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "shapes",
            "shapes.Square",
            "shapes.Square.diagonal",
            "shapes.Square.perimeter",
            "shapes.__test__.extra",
            "shapes.area",
        ]
    );

    let area = blocks.iter().find(|b| b.name == "shapes.area").unwrap();
    assert_eq!(area.lineno, Some(7));
    assert!(area.text.contains(">>> area(2, 3)"));
    assert_eq!(blocks[0].lineno, Some(0));
    let extra = blocks.iter().find(|b| b.name == "shapes.__test__.extra").unwrap();
    assert_eq!(extra.lineno, None);
}

#[test]
fn test_doc_blocks_skip_imported_objects() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new(dir.path());
    load(&interp, dir.path(), "helpers", "def helper():\n    \"\"\">>> 1\n    1\n    \"\"\"\n");
    let module = load(&interp, dir.path(), "user", "from helpers import helper\n");
    assert!(doc_blocks(&interp, &module).is_empty());
}

#[test]
fn test_examples_share_a_namespace() {
    let interp = Interpreter::new(".");
    let globals = interp.scratch_namespace("demo");
    let first = interp.run_example(&globals, "x = 40\n", "demo");
    assert_eq!(first.output, "");
    let second = interp.run_example(&globals, "x + 2\n", "demo");
    assert_eq!(second.output, "42\n");
    let third = interp.run_example(&globals, "1 / 0\n", "demo");
    let report = third.exception.unwrap();
    assert_eq!(report.exception_only, "ZeroDivisionError: division by zero");
}

const CALC_TESTS: &str = r#"import unittest

log = []


class Base(unittest.TestCase):
    def test_inherited(self):
        pass


class CalcTest(Base):
    @classmethod
    def setUpClass(cls):
        log.append("setUpClass")

    def setUp(self):
        log.append("setUp")

    def tearDown(self):
        log.append("tearDown")

    def test_pass(self):
        self.assertEqual(1 + 1, 2)

    def test_fail(self):
        self.assertEqual(1, 2)

    def test_error(self):
        {}["missing"]

    @unittest.skip("not today")
    def test_skipped(self):
        self.fail("never runs")

    def test_skip_inside(self):
        self.skipTest("later")

    @unittest.expectedFailure
    def test_known_bug(self):
        self.assertTrue(False)

    @unittest.expectedFailure
    def test_fixed_bug(self):
        pass

    def test_raises(self):
        with self.assertRaises(KeyError) as cm:
            {}["k"]
        self.assertEqual(cm.exception.args, ("k",))
        self.assertRaises(ValueError, int, "x")

    def test_raises_missing(self):
        with self.assertRaises(ValueError):
            pass

    def helper(self):
        pass


class Empty(unittest.TestCase):
    def helper(self):
        pass
"#;

#[test]
fn test_test_case_classes_in_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new(dir.path());
    let module = load(&interp, dir.path(), "calc_tests", CALC_TESTS);

    let classes = test_case_classes(&interp, &module);
    let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Base", "CalcTest"]);

    let calc = &classes[1];
    let methods: Vec<&str> = calc.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        methods,
        vec![
            "test_pass",
            "test_fail",
            "test_error",
            "test_skipped",
            "test_skip_inside",
            "test_known_bug",
            "test_fixed_bug",
            "test_raises",
            "test_raises_missing",
            "test_inherited",
        ]
    );
    assert_eq!(calc.line, 11);
}

#[test]
fn test_method_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new(dir.path());
    let module = load(&interp, dir.path(), "calc_tests", CALC_TESTS);
    let classes = test_case_classes(&interp, &module);
    let calc = classes[1].class.clone();

    set_up_class(&interp, &calc).unwrap();
    assert_eq!(run_test_method(&interp, &calc, "test_pass"), MethodOutcome::Passed);

    match run_test_method(&interp, &calc, "test_fail") {
        MethodOutcome::Failed(report) => assert_eq!(report.exception_only, "AssertionError: 1 != 2"),
        other => panic!("unexpected outcome {other:?}"),
    }
    match run_test_method(&interp, &calc, "test_error") {
        MethodOutcome::Errored(report) => {
            assert_eq!(report.exception_only, "KeyError: 'missing'");
            assert!(report.traceback.contains("in test_error"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(
        run_test_method(&interp, &calc, "test_skipped"),
        MethodOutcome::Skipped("not today".to_string())
    );
    assert_eq!(
        run_test_method(&interp, &calc, "test_skip_inside"),
        MethodOutcome::Skipped("later".to_string())
    );
    assert!(matches!(
        run_test_method(&interp, &calc, "test_known_bug"),
        MethodOutcome::ExpectedFailure(_)
    ));
    assert_eq!(run_test_method(&interp, &calc, "test_fixed_bug"), MethodOutcome::UnexpectedSuccess);
    assert_eq!(run_test_method(&interp, &calc, "test_raises"), MethodOutcome::Passed);
    match run_test_method(&interp, &calc, "test_raises_missing") {
        MethodOutcome::Failed(report) => assert_eq!(report.message, "ValueError not raised"),
        other => panic!("unexpected outcome {other:?}"),
    }
    tear_down_class(&interp, &calc).unwrap();

    let log = interp.run_example(&module.ns.copy(), "log[:4]\n", "check");
    assert_eq!(log.output, "['setUpClass', 'setUp', 'tearDown', 'setUp']\n");
}

#[test]
fn test_set_up_failure_skips_tear_down() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new(dir.path());
    let source = r#"import unittest

calls = []


class Broken(unittest.TestCase):
    def setUp(self):
        raise RuntimeError("no fixture")

    def tearDown(self):
        calls.append("tearDown")

    def test_it(self):
        calls.append("test")
"#;
    let module = load(&interp, dir.path(), "broken", source);
    let classes = test_case_classes(&interp, &module);
    match run_test_method(&interp, &classes[0].class, "test_it") {
        MethodOutcome::Errored(report) => assert_eq!(report.exception_only, "RuntimeError: no fixture"),
        other => panic!("unexpected outcome {other:?}"),
    }
    let calls = interp.run_example(&module.ns.copy(), "calls\n", "check");
    assert_eq!(calls.output, "[]\n");
}

#[test]
fn test_assert_messages_follow_long_message() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new(dir.path());
    let source = r#"import unittest


class Messages(unittest.TestCase):
    def test_custom(self):
        self.assertIn(3, [1, 2], "where is it")

    def test_almost(self):
        self.assertAlmostEqual(1.0, 1.1)
"#;
    let module = load(&interp, dir.path(), "messages", source);
    let class = test_case_classes(&interp, &module)[0].class.clone();
    match run_test_method(&interp, &class, "test_custom") {
        MethodOutcome::Failed(report) => assert_eq!(report.message, "3 not found in [1, 2] : where is it"),
        other => panic!("unexpected outcome {other:?}"),
    }
    match run_test_method(&interp, &class, "test_almost") {
        MethodOutcome::Failed(report) => assert!(report.message.starts_with("1.0 != 1.1 within 7 places")),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_module_without_unittest_has_no_test_classes() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new(dir.path());
    let module = load(&interp, dir.path(), "plain", "class Thing:\n    def test_x(self):\n        pass\n");
    assert!(test_case_classes(&interp, &module).is_empty());
}

#[test]
fn test_tracer_records_executed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new(dir.path());
    let tracer = LineTracer::new();
    interp.set_tracer(Some(tracer.clone()));
    let module = load(
        &interp,
        dir.path(),
        "covered",
        "def used():\n    return 1\n\ndef unused():\n    return 2\n\nused()\n",
    );
    assert_eq!(module.name, "covered");
    let snapshot = tracer.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].statements, 5);
    assert_eq!(snapshot[0].missed, 1);
}

#[test]
fn test_load_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let interp = Interpreter::new(dir.path());
    let path = write(dir.path(), "bad.py", "import does_not_exist\n");
    let err = interp.load_module("bad", &path).unwrap_err();
    assert_eq!(err.to_string(), "ModuleNotFoundError: No module named 'does_not_exist'");
}

proptest! {
    #[test]
    fn prop_list_slices_follow_python_semantics(
        len in 0usize..12,
        start in -15i64..15,
        stop in -15i64..15,
        step in prop_oneof![-4i64..0, 1i64..5],
    ) {
        let interp = Interpreter::new(".");
        let globals = interp.scratch_namespace("slices");
        let source = format!("print(list(range(0, {len} * 10, 10))[{start}:{stop}:{step}])\n");
        let run = interp.run_example(&globals, &source, "slices");

        let expected: Vec<String> = slice_indices(len, Some(start), Some(stop), Some(step))
            .unwrap()
            .into_iter()
            .map(|i| (i * 10).to_string())
            .collect();
        prop_assert!(run.exception.is_none());
        prop_assert_eq!(run.output, format!("[{}]\n", expected.join(", ")));
    }

    #[test]
    fn prop_floor_division_and_modulo_agree(a in -1000i64..1000, b in prop_oneof![-50i64..0, 1i64..50]) {
        let interp = Interpreter::new(".");
        let globals = interp.scratch_namespace("divmod");
        let run = interp.run_example(&globals, &format!("print(({a}) // ({b}) * ({b}) + ({a}) % ({b}) == ({a}))\n"), "divmod");
        prop_assert!(run.exception.is_none());
        prop_assert_eq!(run.output, "True\n");
    }
}
