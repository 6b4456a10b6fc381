//! Punctuation vocabulary: delimiters, separators and a few structural markers.
//!
//! ## Examples
//! ```rust
//! use runtest_core::lang::punctuation::{self, PunctuationId};
//!
//! assert_eq!(punctuation::from_str("->"), Some(PunctuationId::Arrow));
//! assert_eq!(punctuation::as_str(PunctuationId::LBracket), "[");
//! ```

/// Broad syntactic grouping for punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctuationCategory {
    /// Brackets and braces.
    Delimiter,
    /// Separators like `,` and `:`.
    Separator,
    /// Attribute access.
    Access,
    /// `->` and `@`.
    Marker,
}

/// Stable identifier for punctuation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctuationId {
    Comma,
    Colon,
    Semicolon,
    At,
    Dot,
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

/// Metadata for a punctuation token.
#[derive(Debug, Clone, Copy)]
pub struct PunctuationInfo {
    pub id: PunctuationId,
    pub canonical: &'static str,
    pub category: PunctuationCategory,
}

/// Registry of all punctuation tokens, in [`PunctuationId`] order.
pub const PUNCTUATION: &[PunctuationInfo] = &[
    info(PunctuationId::Comma, ",", PunctuationCategory::Separator),
    info(PunctuationId::Colon, ":", PunctuationCategory::Separator),
    info(PunctuationId::Semicolon, ";", PunctuationCategory::Separator),
    info(PunctuationId::At, "@", PunctuationCategory::Marker),
    info(PunctuationId::Dot, ".", PunctuationCategory::Access),
    info(PunctuationId::Arrow, "->", PunctuationCategory::Marker),
    info(PunctuationId::LParen, "(", PunctuationCategory::Delimiter),
    info(PunctuationId::RParen, ")", PunctuationCategory::Delimiter),
    info(PunctuationId::LBracket, "[", PunctuationCategory::Delimiter),
    info(PunctuationId::RBracket, "]", PunctuationCategory::Delimiter),
    info(PunctuationId::LBrace, "{", PunctuationCategory::Delimiter),
    info(PunctuationId::RBrace, "}", PunctuationCategory::Delimiter),
];

pub fn as_str(id: PunctuationId) -> &'static str {
    info_for(id).canonical
}

pub fn category(id: PunctuationId) -> PunctuationCategory {
    info_for(id).category
}

pub fn info_for(id: PunctuationId) -> &'static PunctuationInfo {
    &PUNCTUATION[id as usize]
}

pub fn from_str(s: &str) -> Option<PunctuationId> {
    PUNCTUATION.iter().find(|p| p.canonical == s).map(|p| p.id)
}

/// Return the closing delimiter for an opening one.
pub fn closing(id: PunctuationId) -> Option<PunctuationId> {
    match id {
        PunctuationId::LParen => Some(PunctuationId::RParen),
        PunctuationId::LBracket => Some(PunctuationId::RBracket),
        PunctuationId::LBrace => Some(PunctuationId::RBrace),
        _ => None,
    }
}

// --- helpers -----------------------------------------------------------------

const fn info(id: PunctuationId, canonical: &'static str, category: PunctuationCategory) -> PunctuationInfo {
    PunctuationInfo { id, canonical, category }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_in_id_order() {
        for (idx, entry) in PUNCTUATION.iter().enumerate() {
            assert_eq!(entry.id as usize, idx, "{} is out of order", entry.canonical);
        }
    }

    #[test]
    fn test_closing_pairs() {
        assert_eq!(closing(PunctuationId::LBrace), Some(PunctuationId::RBrace));
        assert_eq!(closing(PunctuationId::Comma), None);
    }
}
