//! The `unittest` module and the test-method runner built on it.
//!
//! `TestCase` is a native class whose methods are builtins taking the instance first, so user
//! subclasses override and `super()`-call them like ordinary methods. Skip and expected-failure
//! decorators only mark their target with `__unittest_skip__`, `__unittest_skip_why__` and
//! `__unittest_expecting_failure__`; [`run_test_method`] reads the marks.

use std::rc::Rc;

use runtest_core::lang::exceptions::ExceptionId;
use runtest_syntax::ast::{BinaryOp, CompareOp};

use crate::builtins::{bind_args, native_class};
use crate::error::{ExceptionReport, FaultKind};
use crate::interp::{Exec, Flow, Interpreter, Raised};
use crate::value::{Args, Class, ClassKind, DictMap, Namespace, Value};

type NativeFunction = fn(&Interpreter, Args) -> Exec<Value>;

/// Default `maxDiff` of `TestCase`.
const MAX_DIFF: i64 = 80 * 8;

const TEST_CASE_METHODS: &[(&str, NativeFunction)] = &[
    ("__init__", test_case_init),
    ("__repr__", test_case_repr),
    ("__str__", test_case_str),
    ("id", test_case_id),
    ("shortDescription", short_description),
    ("setUp", noop),
    ("tearDown", noop),
    ("addCleanup", add_cleanup),
    ("doCleanups", do_cleanups_method),
    ("fail", fail),
    ("skipTest", skip_test),
    ("assertEqual", assert_equal),
    ("assertListEqual", assert_equal),
    ("assertTupleEqual", assert_equal),
    ("assertDictEqual", assert_equal),
    ("assertSetEqual", assert_equal),
    ("assertSequenceEqual", assert_equal),
    ("assertMultiLineEqual", assert_equal),
    ("assertNotEqual", assert_not_equal),
    ("assertTrue", assert_true),
    ("assertFalse", assert_false),
    ("assertIs", assert_is),
    ("assertIsNot", assert_is_not),
    ("assertIsNone", assert_is_none),
    ("assertIsNotNone", assert_is_not_none),
    ("assertIn", assert_in),
    ("assertNotIn", assert_not_in),
    ("assertIsInstance", assert_is_instance),
    ("assertNotIsInstance", assert_not_is_instance),
    ("assertGreater", assert_greater),
    ("assertGreaterEqual", assert_greater_equal),
    ("assertLess", assert_less),
    ("assertLessEqual", assert_less_equal),
    ("assertAlmostEqual", assert_almost_equal),
    ("assertNotAlmostEqual", assert_not_almost_equal),
];

/// Namespace of the `unittest` module.
pub(crate) fn module_namespace(interp: &Interpreter) -> Namespace {
    let types = interp.types();

    let context_attrs = Namespace::new();
    context_attrs.set("__enter__", Value::builtin("__enter__", raises_enter));
    context_attrs.set("__exit__", Value::builtin("__exit__", raises_exit));
    let context = native_class(
        "_AssertRaisesContext",
        "unittest.case",
        &types.object,
        ClassKind::User,
        context_attrs,
    );

    let attrs = Namespace::new();
    for &(name, func) in TEST_CASE_METHODS {
        attrs.set(name, Value::builtin(name, func));
    }
    attrs.set(
        "assertRaises",
        Value::builtin("assertRaises", move |interp, args| assert_raises(interp, args, &context)),
    );
    for hook in ["setUpClass", "tearDownClass"] {
        attrs.set(hook, Value::ClassMethod(Rc::new(Value::builtin(hook, noop))));
    }
    attrs.set("failureException", Value::Class(types.exception(ExceptionId::AssertionError)));
    attrs.set("longMessage", Value::Bool(true));
    attrs.set("maxDiff", Value::Int(MAX_DIFF));
    let test_case = native_class("TestCase", "unittest.case", &types.object, ClassKind::User, attrs);

    let ns = Namespace::new();
    ns.set("TestCase", Value::Class(test_case));
    ns.set("SkipTest", Value::Class(types.exception(ExceptionId::SkipTest)));
    ns.set("skip", Value::builtin("skip", skip));
    ns.set("skipIf", Value::builtin("skipIf", skip_if));
    ns.set("skipUnless", Value::builtin("skipUnless", skip_unless));
    ns.set("expectedFailure", Value::builtin("expectedFailure", expected_failure));
    ns.set("main", Value::builtin("main", |_, _| Ok(Value::None)));
    ns
}

/// `unittest.TestCase` of this interpreter, once some module has imported `unittest`.
pub(crate) fn test_case_class(interp: &Interpreter) -> Option<Rc<Class>> {
    match interp.cached_module("unittest")?.ns.get("TestCase")? {
        Value::Class(class) => Some(class),
        _ => None,
    }
}

fn noop(_: &Interpreter, _: Args) -> Exec<Value> {
    Ok(Value::None)
}

fn arg(value: Option<Value>) -> Value {
    value.unwrap_or(Value::None)
}

/// Call a function from the `builtins` namespace.
fn call_builtin(interp: &Interpreter, name: &str, args: Vec<Value>) -> Exec<Value> {
    match interp.builtins().get(name) {
        Some(func) => interp.call(&func, Args::new(args)),
        None => interp.raise(ExceptionId::NameError, format!("name '{name}' is not defined")),
    }
}

// ---- TestCase basics -------------------------------------------------------------------------

fn test_method_name(interp: &Interpreter, this: &Value) -> Exec<String> {
    match interp.lookup_attr(this, "_testMethodName")? {
        Some(name) => interp.str_of(&name),
        None => Ok("runTest".to_string()),
    }
}

/// `module.Class`, as `unittest` spells a test's class.
fn class_path(interp: &Interpreter, this: &Value) -> String {
    let class = interp.class_of(this);
    format!("{}.{}", class.module, class.qualname)
}

fn test_case_init(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [this, method_name] = bind_args(interp, "__init__", args, ["self", "methodName"], 1)?;
    let this = arg(this);
    let method_name = match method_name {
        Some(name) => interp.str_of(&name)?,
        None => "runTest".to_string(),
    };
    if method_name != "runTest" {
        let class = Value::Class(interp.class_of(&this));
        if interp.lookup_attr(&class, &method_name)?.is_none() {
            let message = format!("no such test method in {}: {method_name}", interp.repr(&class)?);
            return interp.raise(ExceptionId::ValueError, message);
        }
    }
    interp.set_attr(&this, "_testMethodName", Value::str(method_name))?;
    interp.set_attr(&this, "_cleanups", Value::list(Vec::new()))?;
    Ok(Value::None)
}

fn test_case_id(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [this] = bind_args(interp, "id", args, ["self"], 1)?;
    let this = arg(this);
    let method = test_method_name(interp, &this)?;
    Ok(Value::str(format!("{}.{method}", class_path(interp, &this))))
}

fn test_case_str(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [this] = bind_args(interp, "__str__", args, ["self"], 1)?;
    let this = arg(this);
    let method = test_method_name(interp, &this)?;
    Ok(Value::str(format!("{method} ({}.{method})", class_path(interp, &this))))
}

fn test_case_repr(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [this] = bind_args(interp, "__repr__", args, ["self"], 1)?;
    let this = arg(this);
    let method = test_method_name(interp, &this)?;
    Ok(Value::str(format!("<{} testMethod={method}>", class_path(interp, &this))))
}

/// First line of the test method's docstring.
fn short_description(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [this] = bind_args(interp, "shortDescription", args, ["self"], 1)?;
    let this = arg(this);
    let method = interp.get_attr(&this, &test_method_name(interp, &this)?)?;
    Ok(match interp.lookup_attr(&method, "__doc__")? {
        Some(Value::Str(doc)) => doc
            .trim()
            .lines()
            .next()
            .map(|line| Value::str(line.trim()))
            .unwrap_or(Value::None),
        _ => Value::None,
    })
}

fn add_cleanup(interp: &Interpreter, args: Args) -> Exec<Value> {
    let Args { positional, keywords } = args;
    let mut positional = positional.into_iter();
    let (Some(this), Some(function)) = (positional.next(), positional.next()) else {
        return Err(interp.type_error("addCleanup() missing required argument 'function'"));
    };
    let kwargs = DictMap::from_pairs(keywords.into_iter().map(|(k, v)| (Value::str(k), v)).collect());
    let entry = Value::tuple(vec![function, Value::tuple(positional.collect()), Value::dict(kwargs)]);
    match interp.lookup_attr(&this, "_cleanups")? {
        Some(Value::List(cleanups)) => cleanups.borrow_mut().push(entry),
        _ => interp.set_attr(&this, "_cleanups", Value::list(vec![entry]))?,
    }
    Ok(Value::None)
}

/// Run registered cleanups last-in first-out; the first failure is returned after all have run.
fn do_cleanups(interp: &Interpreter, this: &Value) -> Exec<()> {
    let mut first_error = None;
    loop {
        let entry = match interp.lookup_attr(this, "_cleanups")? {
            Some(Value::List(cleanups)) => cleanups.borrow_mut().pop(),
            _ => None,
        };
        let Some(Value::Tuple(entry)) = entry else {
            break;
        };
        let [function, Value::Tuple(positional), Value::Dict(kwargs)] = &entry[..] else {
            continue;
        };
        let keywords = kwargs
            .borrow()
            .items()
            .into_iter()
            .map(|(k, v)| Ok((interp.str_of(&k)?, v)))
            .collect::<Exec<Vec<_>>>()?;
        let result = interp.call(function, Args::with_keywords(positional.to_vec(), keywords));
        if let Err(flow) = result {
            first_error.get_or_insert(flow);
        }
    }
    match first_error {
        Some(flow) => Err(flow),
        None => Ok(()),
    }
}

fn do_cleanups_method(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [this] = bind_args(interp, "doCleanups", args, ["self"], 1)?;
    do_cleanups(interp, &arg(this))?;
    Ok(Value::None)
}

// ---- failures --------------------------------------------------------------------------------

/// Raise the test case's `failureException` with `message`.
fn raise_failure(interp: &Interpreter, this: &Value, message: Option<Value>) -> Flow {
    let class = match interp.lookup_attr(this, "failureException") {
        Ok(Some(Value::Class(class))) if class.exception_base().is_some() => class,
        _ => interp.exception_class(ExceptionId::AssertionError),
    };
    let args = message.into_iter().collect();
    Flow::Raise(Box::new(Raised::new(interp.exception_with_args(class, args))))
}

/// Combine a standard failure message with the caller's `msg` the way `longMessage` dictates.
fn failure(interp: &Interpreter, this: &Value, msg: Option<Value>, standard: String) -> Flow {
    let message = match msg.filter(|m| !m.is_none()) {
        None => standard,
        Some(msg) => {
            let custom = match interp.str_of(&msg) {
                Ok(custom) => custom,
                Err(flow) => return flow,
            };
            let long = match interp.lookup_attr(this, "longMessage") {
                Ok(Some(flag)) => interp.truthy(&flag).unwrap_or(true),
                _ => true,
            };
            if long { format!("{standard} : {custom}") } else { custom }
        }
    };
    raise_failure(interp, this, Some(Value::str(message)))
}

fn fail(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [this, msg] = bind_args(interp, "fail", args, ["self", "msg"], 1)?;
    Err(raise_failure(interp, &arg(this), msg.filter(|m| !m.is_none())))
}

fn skip_test(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [_, reason] = bind_args(interp, "skipTest", args, ["self", "reason"], 2)?;
    let exception = interp.exception_with_args(interp.exception_class(ExceptionId::SkipTest), vec![arg(reason)]);
    Err(Flow::Raise(Box::new(Raised::new(exception))))
}

// ---- assertions ------------------------------------------------------------------------------

/// Shared shape of two-operand assertions: fail with `standard` unless `holds`.
fn check(interp: &Interpreter, this: &Value, msg: Option<Value>, holds: bool, standard: impl FnOnce() -> Exec<String>) -> Exec<Value> {
    if holds {
        Ok(Value::None)
    } else {
        Err(failure(interp, this, msg, standard()?))
    }
}

fn binary_args(interp: &Interpreter, name: &str, args: Args) -> Exec<(Value, Value, Value, Option<Value>)> {
    let [this, first, second, msg] = bind_args(interp, name, args, ["self", "first", "second", "msg"], 3)?;
    Ok((arg(this), arg(first), arg(second), msg))
}

fn unary_args(interp: &Interpreter, name: &str, args: Args) -> Exec<(Value, Value, Option<Value>)> {
    let [this, expr, msg] = bind_args(interp, name, args, ["self", "expr", "msg"], 2)?;
    Ok((arg(this), arg(expr), msg))
}

fn assert_equal(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, first, second, msg) = binary_args(interp, "assertEqual", args)?;
    let holds = interp.eq(&first, &second)?;
    check(interp, &this, msg, holds, || {
        Ok(format!("{} != {}", interp.repr(&first)?, interp.repr(&second)?))
    })
}

fn assert_not_equal(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, first, second, msg) = binary_args(interp, "assertNotEqual", args)?;
    let holds = !interp.eq(&first, &second)?;
    check(interp, &this, msg, holds, || {
        Ok(format!("{} == {}", interp.repr(&first)?, interp.repr(&second)?))
    })
}

fn assert_true(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, expr, msg) = unary_args(interp, "assertTrue", args)?;
    let holds = interp.truthy(&expr)?;
    check(interp, &this, msg, holds, || Ok(format!("{} is not true", interp.repr(&expr)?)))
}

fn assert_false(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, expr, msg) = unary_args(interp, "assertFalse", args)?;
    let holds = !interp.truthy(&expr)?;
    check(interp, &this, msg, holds, || Ok(format!("{} is not false", interp.repr(&expr)?)))
}

fn assert_is(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, first, second, msg) = binary_args(interp, "assertIs", args)?;
    check(interp, &this, msg, first.is_same(&second), || {
        Ok(format!("{} is not {}", interp.repr(&first)?, interp.repr(&second)?))
    })
}

fn assert_is_not(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, first, second, msg) = binary_args(interp, "assertIsNot", args)?;
    check(interp, &this, msg, !first.is_same(&second), || {
        Ok(format!("unexpectedly identical: {}", interp.repr(&first)?))
    })
}

fn assert_is_none(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, expr, msg) = unary_args(interp, "assertIsNone", args)?;
    check(interp, &this, msg, expr.is_none(), || Ok(format!("{} is not None", interp.repr(&expr)?)))
}

fn assert_is_not_none(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, expr, msg) = unary_args(interp, "assertIsNotNone", args)?;
    check(interp, &this, msg, !expr.is_none(), || Ok("unexpectedly None".to_string()))
}

fn assert_in(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, member, container, msg) = binary_args(interp, "assertIn", args)?;
    let holds = interp.contains(&container, &member)?;
    check(interp, &this, msg, holds, || {
        Ok(format!("{} not found in {}", interp.repr(&member)?, interp.repr(&container)?))
    })
}

fn assert_not_in(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, member, container, msg) = binary_args(interp, "assertNotIn", args)?;
    let holds = !interp.contains(&container, &member)?;
    check(interp, &this, msg, holds, || {
        Ok(format!("{} unexpectedly found in {}", interp.repr(&member)?, interp.repr(&container)?))
    })
}

fn assert_is_instance(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, obj, cls, msg) = binary_args(interp, "assertIsInstance", args)?;
    let holds = interp.truthy(&call_builtin(interp, "isinstance", vec![obj.clone(), cls.clone()])?)?;
    check(interp, &this, msg, holds, || {
        Ok(format!("{} is not an instance of {}", interp.repr(&obj)?, interp.repr(&cls)?))
    })
}

fn assert_not_is_instance(interp: &Interpreter, args: Args) -> Exec<Value> {
    let (this, obj, cls, msg) = binary_args(interp, "assertNotIsInstance", args)?;
    let holds = !interp.truthy(&call_builtin(interp, "isinstance", vec![obj.clone(), cls.clone()])?)?;
    check(interp, &this, msg, holds, || {
        Ok(format!("{} is an instance of {}", interp.repr(&obj)?, interp.repr(&cls)?))
    })
}

fn ordered(interp: &Interpreter, args: Args, name: &str, op: CompareOp, relation: &str) -> Exec<Value> {
    let (this, first, second, msg) = binary_args(interp, name, args)?;
    let holds = interp.ordering(op, &first, &second)?;
    check(interp, &this, msg, holds, || {
        Ok(format!("{} {relation} {}", interp.repr(&first)?, interp.repr(&second)?))
    })
}

fn assert_greater(interp: &Interpreter, args: Args) -> Exec<Value> {
    ordered(interp, args, "assertGreater", CompareOp::Gt, "not greater than")
}

fn assert_greater_equal(interp: &Interpreter, args: Args) -> Exec<Value> {
    ordered(interp, args, "assertGreaterEqual", CompareOp::GtEq, "not greater than or equal to")
}

fn assert_less(interp: &Interpreter, args: Args) -> Exec<Value> {
    ordered(interp, args, "assertLess", CompareOp::Lt, "not less than")
}

fn assert_less_equal(interp: &Interpreter, args: Args) -> Exec<Value> {
    ordered(interp, args, "assertLessEqual", CompareOp::LtEq, "not less than or equal to")
}

/// Arguments of `assertAlmostEqual`/`assertNotAlmostEqual` and `abs(first - second)`.
struct Closeness {
    this: Value,
    first: Value,
    second: Value,
    places: Option<Value>,
    delta: Option<Value>,
    msg: Option<Value>,
}

fn closeness_args(interp: &Interpreter, name: &str, args: Args) -> Exec<Closeness> {
    let [this, first, second, places, msg, delta] = bind_args(
        interp,
        name,
        args,
        ["self", "first", "second", "places", "msg", "delta"],
        3,
    )?;
    let places = places.filter(|p| !p.is_none());
    let delta = delta.filter(|d| !d.is_none());
    if places.is_some() && delta.is_some() {
        return Err(interp.type_error("specify delta or places not both"));
    }
    Ok(Closeness {
        this: arg(this),
        first: arg(first),
        second: arg(second),
        places,
        delta,
        msg,
    })
}

fn difference(interp: &Interpreter, first: &Value, second: &Value) -> Exec<Value> {
    let diff = interp.binary_op(BinaryOp::Sub, first.clone(), second.clone())?;
    call_builtin(interp, "abs", vec![diff])
}

/// Whether `diff` rounds to zero at `places` decimal places.
fn rounds_to_zero(interp: &Interpreter, diff: &Value, places: &Value) -> Exec<bool> {
    let rounded = call_builtin(interp, "round", vec![diff.clone(), places.clone()])?;
    interp.eq(&rounded, &Value::Int(0))
}

fn assert_almost_equal(interp: &Interpreter, args: Args) -> Exec<Value> {
    let c = closeness_args(interp, "assertAlmostEqual", args)?;
    if interp.eq(&c.first, &c.second)? {
        return Ok(Value::None);
    }
    let diff = difference(interp, &c.first, &c.second)?;
    let standard = match &c.delta {
        Some(delta) => {
            if interp.ordering(CompareOp::LtEq, &diff, delta)? {
                return Ok(Value::None);
            }
            format!(
                "{} != {} within {} delta ({} difference)",
                interp.repr(&c.first)?,
                interp.repr(&c.second)?,
                interp.repr(delta)?,
                interp.repr(&diff)?
            )
        }
        None => {
            let places = c.places.clone().unwrap_or(Value::Int(7));
            if rounds_to_zero(interp, &diff, &places)? {
                return Ok(Value::None);
            }
            format!(
                "{} != {} within {} places ({} difference)",
                interp.repr(&c.first)?,
                interp.repr(&c.second)?,
                interp.repr(&places)?,
                interp.repr(&diff)?
            )
        }
    };
    Err(failure(interp, &c.this, c.msg, standard))
}

fn assert_not_almost_equal(interp: &Interpreter, args: Args) -> Exec<Value> {
    let c = closeness_args(interp, "assertNotAlmostEqual", args)?;
    let diff = difference(interp, &c.first, &c.second)?;
    let standard = match &c.delta {
        Some(delta) => {
            if !interp.eq(&c.first, &c.second)? && interp.ordering(CompareOp::Gt, &diff, delta)? {
                return Ok(Value::None);
            }
            format!(
                "{} == {} within {} delta ({} difference)",
                interp.repr(&c.first)?,
                interp.repr(&c.second)?,
                interp.repr(delta)?,
                interp.repr(&diff)?
            )
        }
        None => {
            let places = c.places.clone().unwrap_or(Value::Int(7));
            if !interp.eq(&c.first, &c.second)? && !rounds_to_zero(interp, &diff, &places)? {
                return Ok(Value::None);
            }
            format!(
                "{} == {} within {} places",
                interp.repr(&c.first)?,
                interp.repr(&c.second)?,
                interp.repr(&places)?
            )
        }
    };
    Err(failure(interp, &c.this, c.msg, standard))
}

// ---- assertRaises ----------------------------------------------------------------------------

fn is_exception_spec(value: &Value) -> bool {
    match value {
        Value::Class(class) => class.exception_base().is_some(),
        Value::Tuple(items) => !items.is_empty() && items.iter().all(is_exception_spec),
        _ => false,
    }
}

/// `ValueError` for a class, `str(expected)` for a tuple.
fn expected_name(interp: &Interpreter, expected: &Value) -> Exec<String> {
    match expected {
        Value::Class(class) => Ok(class.name.clone()),
        other => interp.str_of(other),
    }
}

/// `assertRaises(exc, callable, *args, **kwargs)` or `with self.assertRaises(exc) as cm:`.
fn assert_raises(interp: &Interpreter, args: Args, context: &Rc<Class>) -> Exec<Value> {
    let Args { positional, mut keywords } = args;
    let mut positional = positional.into_iter();
    let (Some(this), Some(expected)) = (positional.next(), positional.next()) else {
        return Err(interp.type_error("assertRaises() missing required argument 'expected_exception'"));
    };
    if !is_exception_spec(&expected) {
        return Err(interp.type_error(
            "assertRaises() arg 1 must be an exception type or tuple of exception types",
        ));
    }

    let Some(callable) = positional.next() else {
        let msg = keywords
            .iter()
            .position(|(k, _)| k == "msg")
            .map(|i| keywords.remove(i).1);
        if let Some((key, _)) = keywords.first() {
            return Err(interp.type_error(format!(
                "'{key}' is an invalid keyword argument for this function"
            )));
        }
        let manager = interp.instantiate(context, Args::default())?;
        interp.set_attr(&manager, "expected", expected)?;
        interp.set_attr(&manager, "test_case", this)?;
        interp.set_attr(&manager, "msg", msg.unwrap_or(Value::None))?;
        interp.set_attr(&manager, "exception", Value::None)?;
        return Ok(manager);
    };

    let result = interp.call(&callable, Args::with_keywords(positional.collect(), keywords));
    match result {
        Ok(_) => {
            let name = match interp.lookup_attr(&callable, "__name__")? {
                Some(name) => interp.str_of(&name)?,
                None => interp.str_of(&callable)?,
            };
            let standard = format!("{} not raised by {name}", expected_name(interp, &expected)?);
            Err(failure(interp, &this, None, standard))
        }
        Err(Flow::Raise(raised)) if interp.exception_matches(&raised.exception, &expected)? => Ok(Value::None),
        Err(other) => Err(other),
    }
}

fn raises_enter(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [this] = bind_args(interp, "__enter__", args, ["self"], 1)?;
    Ok(arg(this))
}

fn raises_exit(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [this, exc_type, exc_value, _] =
        bind_args(interp, "__exit__", args, ["self", "exc_type", "exc_value", "traceback"], 4)?;
    let this = arg(this);
    let expected = interp.get_attr(&this, "expected")?;
    if arg(exc_type).is_none() {
        let test_case = interp.get_attr(&this, "test_case")?;
        let msg = interp.lookup_attr(&this, "msg")?;
        let standard = format!("{} not raised", expected_name(interp, &expected)?);
        return Err(failure(interp, &test_case, msg, standard));
    }
    let exc_value = arg(exc_value);
    if !interp.exception_matches(&exc_value, &expected)? {
        return Ok(Value::Bool(false));
    }
    interp.set_attr(&this, "exception", exc_value)?;
    Ok(Value::Bool(true))
}

// ---- decorators ------------------------------------------------------------------------------

fn mark_skipped(interp: &Interpreter, item: Value, reason: Value) -> Exec<Value> {
    interp.set_attr(&item, "__unittest_skip__", Value::Bool(true))?;
    interp.set_attr(&item, "__unittest_skip_why__", reason)?;
    Ok(item)
}

fn skip_decorator(reason: Value) -> Value {
    Value::builtin("decorator", move |interp, args| {
        let [item] = bind_args(interp, "decorator", args, ["test_item"], 1)?;
        mark_skipped(interp, arg(item), reason.clone())
    })
}

fn identity_decorator() -> Value {
    Value::builtin("decorator", |interp, args| {
        let [item] = bind_args(interp, "decorator", args, ["test_item"], 1)?;
        Ok(arg(item))
    })
}

/// `@skip(reason)`, or bare `@skip` with an empty reason.
fn skip(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [reason] = bind_args(interp, "skip", args, ["reason"], 1)?;
    match arg(reason) {
        item @ (Value::Function(_) | Value::Class(_)) => mark_skipped(interp, item, Value::str("")),
        reason => Ok(skip_decorator(reason)),
    }
}

fn skip_if(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [condition, reason] = bind_args(interp, "skipIf", args, ["condition", "reason"], 2)?;
    if interp.truthy(&arg(condition))? {
        Ok(skip_decorator(arg(reason)))
    } else {
        Ok(identity_decorator())
    }
}

fn skip_unless(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [condition, reason] = bind_args(interp, "skipUnless", args, ["condition", "reason"], 2)?;
    if interp.truthy(&arg(condition))? {
        Ok(identity_decorator())
    } else {
        Ok(skip_decorator(arg(reason)))
    }
}

fn expected_failure(interp: &Interpreter, args: Args) -> Exec<Value> {
    let [item] = bind_args(interp, "expectedFailure", args, ["test_item"], 1)?;
    let item = arg(item);
    interp.set_attr(&item, "__unittest_expecting_failure__", Value::Bool(true))?;
    Ok(item)
}

// ---- running ---------------------------------------------------------------------------------

/// Result of running one test method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodOutcome {
    Passed,
    /// An assertion failed.
    Failed(ExceptionReport),
    /// Anything else escaped the test, `setUp` or `tearDown`.
    Errored(ExceptionReport),
    Skipped(String),
    /// Marked `@expectedFailure` and it did fail.
    ExpectedFailure(ExceptionReport),
    /// Marked `@expectedFailure` but passed.
    UnexpectedSuccess,
}

impl MethodOutcome {
    /// Whether the outcome counts against the run.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Errored(_) | Self::UnexpectedSuccess)
    }
}

fn marked(interp: &Interpreter, item: &Value, name: &str) -> bool {
    match interp.lookup_attr(item, name) {
        Ok(Some(flag)) => interp.truthy(&flag).unwrap_or(false),
        _ => false,
    }
}

/// Reason `item` (a class or a function) was marked skipped with.
fn skip_reason(interp: &Interpreter, item: &Value) -> Option<String> {
    if !marked(interp, item, "__unittest_skip__") {
        return None;
    }
    let reason = match interp.lookup_attr(item, "__unittest_skip_why__") {
        Ok(Some(reason)) => interp.str_of(&reason).unwrap_or_default(),
        _ => String::new(),
    };
    Some(reason)
}

/// Skip reason of a whole test class, when it was decorated with a skip.
pub fn class_skip_reason(interp: &Interpreter, class: &Rc<Class>) -> Option<String> {
    skip_reason(interp, &Value::Class(class.clone()))
}

fn report_of(interp: &Interpreter, flow: Flow) -> Option<ExceptionReport> {
    match flow {
        Flow::Raise(raised) => Some(interp.report(&raised)),
        _ => None,
    }
}

fn call_class_hook(interp: &Interpreter, class: &Rc<Class>, name: &str) -> Result<(), ExceptionReport> {
    let class = Value::Class(class.clone());
    let result = interp
        .get_attr(&class, name)
        .and_then(|hook| interp.call(&hook, Args::default()));
    match result {
        Ok(_) => Ok(()),
        Err(flow) => report_of(interp, flow).map_or(Ok(()), Err),
    }
}

/// Call `setUpClass`; an `Err` means none of the class's tests may run.
#[tracing::instrument(skip_all, fields(class = %class.name))]
pub fn set_up_class(interp: &Interpreter, class: &Rc<Class>) -> Result<(), ExceptionReport> {
    call_class_hook(interp, class, "setUpClass")
}

#[tracing::instrument(skip_all, fields(class = %class.name))]
pub fn tear_down_class(interp: &Interpreter, class: &Rc<Class>) -> Result<(), ExceptionReport> {
    call_class_hook(interp, class, "tearDownClass")
}

/// Classify an exception that escaped part of a test.
fn classify(interp: &Interpreter, flow: Flow, expecting_failure: bool) -> Option<MethodOutcome> {
    let report = report_of(interp, flow)?;
    Some(match &report.kind {
        FaultKind::Skip(reason) => MethodOutcome::Skipped(reason.clone()),
        _ if expecting_failure => MethodOutcome::ExpectedFailure(report),
        FaultKind::Assertion => MethodOutcome::Failed(report),
        FaultKind::Other => MethodOutcome::Errored(report),
    })
}

fn call_method(interp: &Interpreter, instance: &Value, name: &str) -> Exec<()> {
    interp.call_method(instance, name, Vec::new()).map(|_| ())
}

/// Run `class(method)` under the `setUp`/`tearDown`/cleanup contract.
///
/// `tearDown` runs whenever `setUp` succeeded; cleanups run in every case. The first problem wins:
/// an error in `tearDown` does not hide the test's own failure.
#[tracing::instrument(skip_all, fields(class = %class.name, method = %method))]
pub fn run_test_method(interp: &Interpreter, class: &Rc<Class>, method: &str) -> MethodOutcome {
    let class_value = Value::Class(class.clone());
    if let Some(reason) = skip_reason(interp, &class_value) {
        return MethodOutcome::Skipped(reason);
    }
    let function = match interp.get_attr(&class_value, method) {
        Ok(function) => function,
        Err(flow) => return classify(interp, flow, false).unwrap_or(MethodOutcome::Passed),
    };
    if let Some(reason) = skip_reason(interp, &function) {
        return MethodOutcome::Skipped(reason);
    }
    let expecting_failure = marked(interp, &function, "__unittest_expecting_failure__")
        || marked(interp, &class_value, "__unittest_expecting_failure__");

    let instance = match interp.call(&class_value, Args::new(vec![Value::str(method)])) {
        Ok(instance) => instance,
        Err(flow) => return classify(interp, flow, false).unwrap_or(MethodOutcome::Passed),
    };

    let mut outcome = match call_method(interp, &instance, "setUp") {
        Err(flow) => classify(interp, flow, false),
        Ok(()) => {
            let mut outcome = call_method(interp, &instance, method)
                .err()
                .and_then(|flow| classify(interp, flow, expecting_failure));
            if let Err(flow) = call_method(interp, &instance, "tearDown") {
                outcome = outcome.or_else(|| classify(interp, flow, false));
            }
            outcome
        }
    };
    if let Err(flow) = do_cleanups(interp, &instance) {
        outcome = outcome.or_else(|| classify(interp, flow, false));
    }

    let outcome = match outcome {
        Some(outcome) => outcome,
        None if expecting_failure => MethodOutcome::UnexpectedSuccess,
        None => MethodOutcome::Passed,
    };
    tracing::debug!(?outcome, "test method finished");
    outcome
}
