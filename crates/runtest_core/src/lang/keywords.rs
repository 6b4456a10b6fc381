//! Reserved words of the accepted Python subset.
//!
//! A stable identifier ([`KeywordId`]) plus a const metadata table ([`KEYWORDS`]). The table is
//! ordered exactly like the enum so lookups by id are plain indexing.
//!
//! ## Notes
//! - Lookup via [`from_str`] is case-sensitive.
//! - Some reserved words are also word operators (`and`, `not`, `in`). For precedence, use
//!   [`crate::lang::operators`].

/// Stable identifier for every reserved word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordId {
    // Control flow / statements
    If,
    Elif,
    Else,
    While,
    For,
    Break,
    Continue,
    Return,
    Pass,
    Raise,
    Try,
    Except,
    Finally,
    With,
    Assert,
    Del,
    Global,
    Nonlocal,

    // Definitions
    Def,
    Class,
    Lambda,

    // Imports
    Import,
    From,
    As,

    // Literals
    True,
    False,
    None,

    // Word operators
    And,
    Or,
    Not,
    In,
    Is,
}

/// High-level grouping, used by diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    ControlFlow,
    Definition,
    Import,
    Literal,
    Operator,
}

/// Metadata for a keyword.
#[derive(Debug, Clone, Copy)]
pub struct KeywordInfo {
    pub id: KeywordId,
    pub canonical: &'static str,
    pub category: KeywordCategory,
    /// Whether the keyword can begin a statement.
    pub starts_statement: bool,
}

/// Registry of all keywords, in [`KeywordId`] order.
pub const KEYWORDS: &[KeywordInfo] = &[
    info(KeywordId::If, "if", KeywordCategory::ControlFlow, true),
    info(KeywordId::Elif, "elif", KeywordCategory::ControlFlow, false),
    info(KeywordId::Else, "else", KeywordCategory::ControlFlow, false),
    info(KeywordId::While, "while", KeywordCategory::ControlFlow, true),
    info(KeywordId::For, "for", KeywordCategory::ControlFlow, true),
    info(KeywordId::Break, "break", KeywordCategory::ControlFlow, true),
    info(KeywordId::Continue, "continue", KeywordCategory::ControlFlow, true),
    info(KeywordId::Return, "return", KeywordCategory::ControlFlow, true),
    info(KeywordId::Pass, "pass", KeywordCategory::ControlFlow, true),
    info(KeywordId::Raise, "raise", KeywordCategory::ControlFlow, true),
    info(KeywordId::Try, "try", KeywordCategory::ControlFlow, true),
    info(KeywordId::Except, "except", KeywordCategory::ControlFlow, false),
    info(KeywordId::Finally, "finally", KeywordCategory::ControlFlow, false),
    info(KeywordId::With, "with", KeywordCategory::ControlFlow, true),
    info(KeywordId::Assert, "assert", KeywordCategory::ControlFlow, true),
    info(KeywordId::Del, "del", KeywordCategory::ControlFlow, true),
    info(KeywordId::Global, "global", KeywordCategory::ControlFlow, true),
    info(KeywordId::Nonlocal, "nonlocal", KeywordCategory::ControlFlow, true),
    info(KeywordId::Def, "def", KeywordCategory::Definition, true),
    info(KeywordId::Class, "class", KeywordCategory::Definition, true),
    info(KeywordId::Lambda, "lambda", KeywordCategory::Definition, false),
    info(KeywordId::Import, "import", KeywordCategory::Import, true),
    info(KeywordId::From, "from", KeywordCategory::Import, true),
    info(KeywordId::As, "as", KeywordCategory::Import, false),
    info(KeywordId::True, "True", KeywordCategory::Literal, false),
    info(KeywordId::False, "False", KeywordCategory::Literal, false),
    info(KeywordId::None, "None", KeywordCategory::Literal, false),
    info(KeywordId::And, "and", KeywordCategory::Operator, false),
    info(KeywordId::Or, "or", KeywordCategory::Operator, false),
    info(KeywordId::Not, "not", KeywordCategory::Operator, false),
    info(KeywordId::In, "in", KeywordCategory::Operator, false),
    info(KeywordId::Is, "is", KeywordCategory::Operator, false),
];

/// Return the canonical spelling for a keyword.
pub fn as_str(id: KeywordId) -> &'static str {
    info_for(id).canonical
}

/// Return the category for a keyword.
pub fn category(id: KeywordId) -> KeywordCategory {
    info_for(id).category
}

/// Return the full metadata entry for a keyword.
pub fn info_for(id: KeywordId) -> &'static KeywordInfo {
    &KEYWORDS[id as usize]
}

/// Lookup by spelling.
///
/// ## Returns
/// - `Some(KeywordId)` if the spelling is reserved, `None` otherwise.
pub fn from_str(s: &str) -> Option<KeywordId> {
    KEYWORDS.iter().find(|k| k.canonical == s).map(|k| k.id)
}

// --- helpers -----------------------------------------------------------------

const fn info(id: KeywordId, canonical: &'static str, category: KeywordCategory, starts_statement: bool) -> KeywordInfo {
    KeywordInfo {
        id,
        canonical,
        category,
        starts_statement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_in_id_order() {
        for (idx, entry) in KEYWORDS.iter().enumerate() {
            assert_eq!(entry.id as usize, idx, "{} is out of order", entry.canonical);
        }
    }

    #[test]
    fn test_lookup_round_trips() {
        for entry in KEYWORDS {
            assert_eq!(from_str(entry.canonical), Some(entry.id));
        }
        assert_eq!(from_str("true"), None);
        assert_eq!(from_str("fn"), None);
    }
}
