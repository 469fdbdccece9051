//! URL filter pre-check
//!
//! A rudimentary look at a URL filter before it is handed to the engine. The
//! engine's own validation is the final authority; this only exists so a pass
//! can skip obviously broken entries and log something more specific.

use crate::types::MATCH_ALL_FILTER;

/// What a URL filter looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Exactly `*://*/*`
    MatchAll,
    /// Contains a scheme separator, or starts with `/` or `*`
    UrlLike,
    /// Contains a `.` and no `/`
    Hostname,
    /// None of the above; passed through to the engine
    Unrecognized,
}

impl PatternKind {
    pub fn classify(filter: &str) -> Self {
        if filter == MATCH_ALL_FILTER {
            Self::MatchAll
        } else if filter.contains("://") || filter.starts_with('/') || filter.starts_with('*') {
            Self::UrlLike
        } else if filter.contains('.') && !filter.contains('/') {
            Self::Hostname
        } else {
            Self::Unrecognized
        }
    }
}

/// Check applied to every translated condition.
pub trait PatternCheck {
    fn is_acceptable(&self, filter: &str) -> bool;
}

/// Default check. Accepts everything; unrecognized shapes are only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientCheck;

impl PatternCheck for LenientCheck {
    fn is_acceptable(&self, filter: &str) -> bool {
        is_acceptable(filter)
    }
}

impl<F> PatternCheck for F
where
    F: Fn(&str) -> bool,
{
    fn is_acceptable(&self, filter: &str) -> bool {
        self(filter)
    }
}

/// Lenient acceptance check for a URL filter.
pub fn is_acceptable(filter: &str) -> bool {
    if PatternKind::classify(filter) == PatternKind::Unrecognized {
        log::debug!("url filter {filter:?} has an unusual shape, leaving it to the engine");
    }
    true
}
