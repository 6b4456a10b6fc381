use std::collections::HashSet;

use runtest_core::lang::exceptions;
use runtest_core::lang::keywords;
use runtest_core::lang::operators;
use runtest_core::lang::punctuation;

#[test]
fn keyword_registry_is_indexed_by_id() {
    let mut seen = HashSet::new();
    for (index, info) in keywords::KEYWORDS.iter().enumerate() {
        assert_eq!(info.id as usize, index, "keyword {:?} is out of order", info.id);
        assert_eq!(keywords::from_str(info.canonical), Some(info.id));
        assert!(seen.insert(info.canonical), "duplicate keyword spelling {:?}", info.canonical);
    }
}

#[test]
fn operator_registry_is_indexed_by_id() {
    let mut seen = HashSet::new();
    for (index, info) in operators::OPERATORS.iter().enumerate() {
        assert_eq!(info.id as usize, index, "operator {:?} is out of order", info.id);
        assert_eq!(operators::from_str(info.spelling), Some(info.id));
        assert!(seen.insert(info.spelling), "duplicate operator spelling {:?}", info.spelling);
    }
}

#[test]
fn keyword_operators_are_reserved_words() {
    for info in operators::OPERATORS {
        let reserved = keywords::from_str(info.spelling).is_some();
        assert_eq!(
            info.is_keyword_spelling, reserved,
            "operator {:?} keyword flag disagrees with the keyword registry",
            info.spelling
        );
    }
}

#[test]
fn augmented_operators_map_to_binary_ones() {
    for info in operators::OPERATORS {
        if let Some(base) = operators::augmented_base(info.id) {
            assert_eq!(format!("{}=", operators::as_str(base)), info.spelling);
        }
    }
}

#[test]
fn punctuation_registry_is_indexed_by_id() {
    for (index, info) in punctuation::PUNCTUATION.iter().enumerate() {
        assert_eq!(info.id as usize, index, "punctuation {:?} is out of order", info.id);
        assert_eq!(punctuation::from_str(info.canonical), Some(info.id));
        if let Some(close) = punctuation::closing(info.id) {
            assert_eq!(punctuation::category(close), punctuation::PunctuationCategory::Delimiter);
        }
    }
}

#[test]
fn exception_parents_precede_children() {
    for (index, info) in exceptions::EXCEPTIONS.iter().enumerate() {
        assert_eq!(info.id as usize, index, "exception {:?} is out of order", info.id);
        assert_eq!(exceptions::from_str(info.canonical), Some(info.id));
        if let Some(parent) = info.parent {
            assert!(
                (parent as usize) < index,
                "{} is listed before its parent {}",
                info.canonical,
                exceptions::as_str(parent)
            );
        } else {
            assert_eq!(info.id, exceptions::ExceptionId::BaseException);
        }
    }
}
