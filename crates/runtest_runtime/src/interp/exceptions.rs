//! Exception objects and their rendering into host-facing reports.

use std::fmt::Write as _;
use std::rc::Rc;

use runtest_core::lang::exceptions::{self, ExceptionId};
use runtest_syntax::CompileError;

use super::{Exec, Flow, Interpreter, Raised};
use crate::error::{ExceptionReport, FaultKind};
use crate::source::SourceFile;
use crate::value::{Class, Instance, Namespace, Value};

/// An exception instance of `class` whose `args` are `args`.
pub(crate) fn new_exception(class: Rc<Class>, args: Vec<Value>) -> Value {
    let attrs = Namespace::new();
    attrs.set("args", Value::tuple(args));
    Value::Instance(Rc::new(Instance { class, attrs }))
}

/// Turn the first syntax error of a failed parse into a raised `SyntaxError` (or `IndentationError`).
pub(crate) fn syntax_error_flow(interp: &Interpreter, file: &Rc<SourceFile>, errors: &[CompileError]) -> Flow {
    let Some(error) = errors.first() else {
        return interp.error(ExceptionId::SyntaxError, "invalid syntax");
    };
    let id = exceptions::from_str(error.exception_name()).unwrap_or(ExceptionId::SyntaxError);
    let (line, column) = file.lines.line_col(error.span.start);
    let text = file.line_text(line).unwrap_or_default().to_string();
    let offset = i64::try_from(column).unwrap_or(1);
    let line_number = i64::try_from(line).unwrap_or(0);

    let details = Value::tuple(vec![
        Value::str(file.name.as_str()),
        Value::Int(line_number),
        Value::Int(offset),
        Value::str(text.as_str()),
    ]);
    let exception = new_exception(
        interp.exception_class(id),
        vec![Value::str(error.message.as_str()), details],
    );
    if let Value::Instance(instance) = &exception {
        instance.attrs.set("msg", Value::str(error.message.as_str()));
        instance.attrs.set("filename", Value::str(file.name.as_str()));
        instance.attrs.set("lineno", Value::Int(line_number));
        instance.attrs.set("offset", Value::Int(offset));
        instance.attrs.set("text", Value::str(text));
    }
    Flow::Raise(Box::new(Raised::new(exception)))
}

/// Location details of a syntax error instance.
struct SyntaxDetails {
    msg: String,
    filename: String,
    lineno: i64,
    offset: i64,
    text: String,
}

impl Interpreter {
    fn syntax_details(&self, exception: &Value) -> Option<SyntaxDetails> {
        let Value::Instance(instance) = exception else {
            return None;
        };
        let text_attr = |name: &str| instance.attrs.get(name).and_then(|v| v.as_str().map(str::to_string));
        let int_attr = |name: &str| instance.attrs.get(name).and_then(|v| v.as_int());
        Some(SyntaxDetails {
            msg: text_attr("msg")?,
            filename: text_attr("filename").unwrap_or_else(|| "<string>".to_string()),
            lineno: int_attr("lineno").unwrap_or(1),
            offset: int_attr("offset").unwrap_or(1),
            text: text_attr("text").unwrap_or_default(),
        })
    }

    /// `str()` of a syntax error: `msg (filename, line N)`.
    pub(crate) fn syntax_error_str(&self, exception: &Value) -> Exec<Option<String>> {
        Ok(self
            .syntax_details(exception)
            .map(|d| format!("{} ({}, line {})", d.msg, d.filename, d.lineno)))
    }
}

/// Render an escaped exception the way the interpreter prints an uncaught one.
pub(crate) fn report(interp: &Interpreter, raised: &Raised) -> ExceptionReport {
    let exception = &raised.exception;
    let class = interp.class_of(exception);
    let type_name = class.display_name();
    let message = interp
        .str_of(exception)
        .unwrap_or_else(|_| "<exception str() failed>".to_string());

    let mut traceback = String::from("Traceback (most recent call last):\n");
    for frame in &raised.traceback {
        let _ = writeln!(
            traceback,
            "  File \"{}\", line {}, in {}",
            frame.file.name, frame.line, frame.name
        );
        if let Some(text) = frame.file.line_text(frame.line) {
            let text = text.trim();
            if !text.is_empty() {
                let _ = writeln!(traceback, "    {text}");
            }
        }
    }

    let base = class.exception_base();
    let syntax = match base {
        Some(id) if exceptions::is_subclass(id, ExceptionId::SyntaxError) => interp.syntax_details(exception),
        _ => None,
    };
    let exception_only = match &syntax {
        Some(details) => {
            let _ = writeln!(traceback, "  File \"{}\", line {}", details.filename, details.lineno);
            let trimmed = details.text.trim_start();
            if !trimmed.trim_end().is_empty() {
                let stripped = details.text.len() - trimmed.len();
                let caret = usize::try_from(details.offset)
                    .unwrap_or(1)
                    .saturating_sub(1)
                    .saturating_sub(stripped);
                let _ = writeln!(traceback, "    {}", trimmed.trim_end());
                let _ = writeln!(traceback, "    {}^", " ".repeat(caret));
            }
            format!("{type_name}: {}", details.msg)
        }
        None if message.is_empty() => type_name.clone(),
        None => format!("{type_name}: {message}"),
    };
    traceback.push_str(&exception_only);

    let kind = match base {
        Some(ExceptionId::SkipTest) => FaultKind::Skip(message.clone()),
        Some(id) if exceptions::is_subclass(id, ExceptionId::AssertionError) => FaultKind::Assertion,
        _ => FaultKind::Other,
    };

    ExceptionReport {
        type_name,
        message,
        exception_only,
        traceback,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_of_builtin_exception() {
        let interp = Interpreter::new(".");
        let raised = Raised::new(interp.exception(ExceptionId::ValueError, "bad value"));
        let report = interp.report(&raised);
        assert_eq!(report.type_name, "ValueError");
        assert_eq!(report.exception_only, "ValueError: bad value");
        assert!(report.traceback.starts_with("Traceback (most recent call last):\n"));
        assert_eq!(report.kind, FaultKind::Other);
    }

    #[test]
    fn test_report_without_message() {
        let interp = Interpreter::new(".");
        let raised = Raised::new(interp.exception(ExceptionId::AssertionError, ""));
        let report = interp.report(&raised);
        assert_eq!(report.exception_only, "AssertionError");
        assert!(report.is_assertion());
    }

    #[test]
    fn test_key_error_message_is_repr() {
        let interp = Interpreter::new(".");
        let exc = interp.exception_with_args(interp.exception_class(ExceptionId::KeyError), vec![Value::str("k")]);
        let report = interp.report(&Raised::new(exc));
        assert_eq!(report.exception_only, "KeyError: 'k'");
    }
}
