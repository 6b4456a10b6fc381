//! Builtin exception vocabulary.
//!
//! The runtime builds its exception class hierarchy from this table, so every entry names its
//! direct parent. Entries are ordered so a parent always precedes its children.
//!
//! ## Examples
//! ```rust
//! use runtest_core::lang::exceptions::{self, ExceptionId};
//!
//! assert_eq!(exceptions::from_str("KeyError"), Some(ExceptionId::KeyError));
//! assert_eq!(exceptions::parent(ExceptionId::KeyError), Some(ExceptionId::LookupError));
//! assert!(exceptions::is_subclass(ExceptionId::ZeroDivisionError, ExceptionId::Exception));
//! ```

/// Stable identifier for a builtin exception class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionId {
    BaseException,
    SystemExit,
    KeyboardInterrupt,
    Exception,
    StopIteration,
    ArithmeticError,
    ZeroDivisionError,
    OverflowError,
    AssertionError,
    AttributeError,
    LookupError,
    IndexError,
    KeyError,
    NameError,
    UnboundLocalError,
    ImportError,
    ModuleNotFoundError,
    OSError,
    FileNotFoundError,
    RuntimeError,
    NotImplementedError,
    RecursionError,
    SyntaxError,
    IndentationError,
    TypeError,
    ValueError,
    UnicodeError,
    SkipTest,
}

/// Metadata for a builtin exception class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub id: ExceptionId,
    pub canonical: &'static str,
    pub parent: Option<ExceptionId>,
    /// Module the class reports in `__module__` (and in non-builtin tracebacks).
    pub module: &'static str,
}

const fn info(id: ExceptionId, canonical: &'static str, parent: Option<ExceptionId>) -> ExceptionInfo {
    ExceptionInfo {
        id,
        canonical,
        parent,
        module: "builtins",
    }
}

use ExceptionId as E;

/// Registry of builtin exception classes, indexed by `ExceptionId as usize`.
pub const EXCEPTIONS: &[ExceptionInfo] = &[
    info(E::BaseException, "BaseException", None),
    info(E::SystemExit, "SystemExit", Some(E::BaseException)),
    info(E::KeyboardInterrupt, "KeyboardInterrupt", Some(E::BaseException)),
    info(E::Exception, "Exception", Some(E::BaseException)),
    info(E::StopIteration, "StopIteration", Some(E::Exception)),
    info(E::ArithmeticError, "ArithmeticError", Some(E::Exception)),
    info(E::ZeroDivisionError, "ZeroDivisionError", Some(E::ArithmeticError)),
    info(E::OverflowError, "OverflowError", Some(E::ArithmeticError)),
    info(E::AssertionError, "AssertionError", Some(E::Exception)),
    info(E::AttributeError, "AttributeError", Some(E::Exception)),
    info(E::LookupError, "LookupError", Some(E::Exception)),
    info(E::IndexError, "IndexError", Some(E::LookupError)),
    info(E::KeyError, "KeyError", Some(E::LookupError)),
    info(E::NameError, "NameError", Some(E::Exception)),
    info(E::UnboundLocalError, "UnboundLocalError", Some(E::NameError)),
    info(E::ImportError, "ImportError", Some(E::Exception)),
    info(E::ModuleNotFoundError, "ModuleNotFoundError", Some(E::ImportError)),
    info(E::OSError, "OSError", Some(E::Exception)),
    info(E::FileNotFoundError, "FileNotFoundError", Some(E::OSError)),
    info(E::RuntimeError, "RuntimeError", Some(E::Exception)),
    info(E::NotImplementedError, "NotImplementedError", Some(E::RuntimeError)),
    info(E::RecursionError, "RecursionError", Some(E::RuntimeError)),
    info(E::SyntaxError, "SyntaxError", Some(E::Exception)),
    info(E::IndentationError, "IndentationError", Some(E::SyntaxError)),
    info(E::TypeError, "TypeError", Some(E::Exception)),
    info(E::ValueError, "ValueError", Some(E::Exception)),
    info(E::UnicodeError, "UnicodeError", Some(E::ValueError)),
    ExceptionInfo {
        id: E::SkipTest,
        canonical: "SkipTest",
        parent: Some(E::Exception),
        module: "unittest.case",
    },
];

/// Return the metadata entry for an exception id.
pub fn info_for(id: ExceptionId) -> &'static ExceptionInfo {
    &EXCEPTIONS[id as usize]
}

/// Return the canonical spelling for an exception id (e.g. `"ValueError"`).
pub fn as_str(id: ExceptionId) -> &'static str {
    info_for(id).canonical
}

/// Direct parent of an exception id; `None` only for `BaseException`.
pub fn parent(id: ExceptionId) -> Option<ExceptionId> {
    info_for(id).parent
}

/// Whether `id` is `ancestor` or derives from it.
pub fn is_subclass(id: ExceptionId, ancestor: ExceptionId) -> bool {
    let mut current = Some(id);
    while let Some(c) = current {
        if c == ancestor {
            return true;
        }
        current = parent(c);
    }
    false
}

/// Resolve a class name to an exception id. Lookup is case-sensitive.
pub fn from_str(name: &str) -> Option<ExceptionId> {
    EXCEPTIONS.iter().find(|e| e.canonical == name).map(|e| e.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_indexed_by_id() {
        for (i, entry) in EXCEPTIONS.iter().enumerate() {
            assert_eq!(entry.id as usize, i, "{} is out of order", entry.canonical);
        }
    }

    #[test]
    fn test_parents_precede_children() {
        for entry in EXCEPTIONS {
            if let Some(parent) = entry.parent {
                assert!((parent as usize) < (entry.id as usize), "{}", entry.canonical);
            }
        }
    }

    #[test]
    fn test_hierarchy() {
        assert!(is_subclass(ExceptionId::IndentationError, ExceptionId::SyntaxError));
        assert!(is_subclass(ExceptionId::SkipTest, ExceptionId::Exception));
        assert!(!is_subclass(ExceptionId::SystemExit, ExceptionId::Exception));
        assert_eq!(as_str(ExceptionId::ModuleNotFoundError), "ModuleNotFoundError");
        assert_eq!(info_for(ExceptionId::SkipTest).module, "unittest.case");
        assert_eq!(from_str("valueerror"), None);
    }
}
