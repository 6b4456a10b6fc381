//! Operator vocabulary.
//!
//! Symbol operators like `+` and word operators like `and`, with precedence, associativity and
//! fixity metadata. Precedence is a relative scale where higher binds tighter; the parser's
//! precedence-climbing loop reads it from here.
//!
//! ## Examples
//! ```rust
//! use runtest_core::lang::operators::{self, OperatorId};
//!
//! assert_eq!(operators::from_str("//"), Some(OperatorId::SlashSlash));
//! assert!(operators::info_for(OperatorId::Star).precedence > operators::info_for(OperatorId::Plus).precedence);
//! ```

/// Define how operators associate when chained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
    None,
}

/// Define whether an operator is infix (binary) or prefix (unary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    Infix,
    Prefix,
}

/// Stable identifier for every operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorId {
    // Arithmetic
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    LShift,
    RShift,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    StarStarEq,
    SlashEq,
    SlashSlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,

    // Word operators
    And,
    Or,
    Not,
    In,
    Is,
}

/// Metadata for an operator.
#[derive(Debug, Clone, Copy)]
pub struct OperatorInfo {
    pub id: OperatorId,
    pub spelling: &'static str,
    pub precedence: u8,
    pub associativity: Associativity,
    pub fixity: Fixity,
    pub is_keyword_spelling: bool,
}

/// Registry of all operators, in [`OperatorId`] order.
pub const OPERATORS: &[OperatorInfo] = &[
    op(OperatorId::Plus, "+", 70, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Minus, "-", 70, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Star, "*", 80, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::StarStar, "**", 100, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::Slash, "/", 80, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::SlashSlash, "//", 80, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Percent, "%", 80, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Amp, "&", 60, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Pipe, "|", 50, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Caret, "^", 55, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::Tilde, "~", 90, Associativity::Right, Fixity::Prefix, false),
    op(OperatorId::LShift, "<<", 65, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::RShift, ">>", 65, Associativity::Left, Fixity::Infix, false),
    op(OperatorId::EqEq, "==", 40, Associativity::None, Fixity::Infix, false),
    op(OperatorId::NotEq, "!=", 40, Associativity::None, Fixity::Infix, false),
    op(OperatorId::Lt, "<", 40, Associativity::None, Fixity::Infix, false),
    op(OperatorId::LtEq, "<=", 40, Associativity::None, Fixity::Infix, false),
    op(OperatorId::Gt, ">", 40, Associativity::None, Fixity::Infix, false),
    op(OperatorId::GtEq, ">=", 40, Associativity::None, Fixity::Infix, false),
    op(OperatorId::Eq, "=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::PlusEq, "+=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::MinusEq, "-=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::StarEq, "*=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::StarStarEq, "**=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::SlashEq, "/=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::SlashSlashEq, "//=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::PercentEq, "%=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::AmpEq, "&=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::PipeEq, "|=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::CaretEq, "^=", 0, Associativity::Right, Fixity::Infix, false),
    op(OperatorId::And, "and", 20, Associativity::Left, Fixity::Infix, true),
    op(OperatorId::Or, "or", 10, Associativity::Left, Fixity::Infix, true),
    op(OperatorId::Not, "not", 30, Associativity::Right, Fixity::Prefix, true),
    op(OperatorId::In, "in", 40, Associativity::None, Fixity::Infix, true),
    op(OperatorId::Is, "is", 40, Associativity::None, Fixity::Infix, true),
];

/// Return the full metadata entry for an operator.
pub fn info_for(id: OperatorId) -> &'static OperatorInfo {
    &OPERATORS[id as usize]
}

/// Return the spelling of an operator.
pub fn as_str(id: OperatorId) -> &'static str {
    info_for(id).spelling
}

/// Resolve an operator spelling to its identifier.
pub fn from_str(spelling: &str) -> Option<OperatorId> {
    OPERATORS.iter().find(|o| o.spelling == spelling).map(|o| o.id)
}

/// Map an augmented assignment operator to the binary operator it applies.
///
/// ## Returns
/// - `Some(OperatorId::Plus)` for `+=`, and so on; `None` for anything that is not augmented.
pub fn augmented_base(id: OperatorId) -> Option<OperatorId> {
    match id {
        OperatorId::PlusEq => Some(OperatorId::Plus),
        OperatorId::MinusEq => Some(OperatorId::Minus),
        OperatorId::StarEq => Some(OperatorId::Star),
        OperatorId::StarStarEq => Some(OperatorId::StarStar),
        OperatorId::SlashEq => Some(OperatorId::Slash),
        OperatorId::SlashSlashEq => Some(OperatorId::SlashSlash),
        OperatorId::PercentEq => Some(OperatorId::Percent),
        OperatorId::AmpEq => Some(OperatorId::Amp),
        OperatorId::PipeEq => Some(OperatorId::Pipe),
        OperatorId::CaretEq => Some(OperatorId::Caret),
        _ => None,
    }
}

// --- helpers -----------------------------------------------------------------

const fn op(
    id: OperatorId,
    spelling: &'static str,
    precedence: u8,
    associativity: Associativity,
    fixity: Fixity,
    is_keyword_spelling: bool,
) -> OperatorInfo {
    OperatorInfo {
        id,
        spelling,
        precedence,
        associativity,
        fixity,
        is_keyword_spelling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_in_id_order() {
        for (idx, entry) in OPERATORS.iter().enumerate() {
            assert_eq!(entry.id as usize, idx, "{} is out of order", entry.spelling);
        }
    }

    #[test]
    fn test_precedence_ladder() {
        let p = |id| info_for(id).precedence;
        assert!(p(OperatorId::Or) < p(OperatorId::And));
        assert!(p(OperatorId::And) < p(OperatorId::Not));
        assert!(p(OperatorId::Not) < p(OperatorId::Lt));
        assert!(p(OperatorId::Lt) < p(OperatorId::Pipe));
        assert!(p(OperatorId::Plus) < p(OperatorId::Star));
        assert!(p(OperatorId::Star) < p(OperatorId::StarStar));
    }

    #[test]
    fn test_augmented_base() {
        assert_eq!(augmented_base(OperatorId::SlashSlashEq), Some(OperatorId::SlashSlash));
        assert_eq!(augmented_base(OperatorId::Plus), None);
        assert_eq!(from_str("**="), Some(OperatorId::StarStarEq));
    }
}
