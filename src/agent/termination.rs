//! Approval detection
//!
//! The token must appear as a whole word with exact case. Neighbouring
//! punctuation and whitespace are fine; letters, digits and underscores are
//! not.

use crate::core::Message;

/// Detects the approval token in a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationDetector {
    token: String,
}

impl TerminationDetector {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Whether the message content approves the result
    pub fn check(&self, message: &Message) -> bool {
        self.matches(&message.content)
    }

    /// Whole-word, case-sensitive search for the token
    pub fn matches(&self, text: &str) -> bool {
        contains_word(text, &self.token)
    }
}

/// Whether `word` occurs in `text` with no word character on either side
pub(crate) fn contains_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }

    text.match_indices(word).any(|(start, found)| {
        let before = text[..start].chars().next_back();
        let after = text[start + found.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RoleId;

    fn detector() -> TerminationDetector {
        TerminationDetector::new("APPROVED")
    }

    #[test]
    fn test_exact_token_from_any_role() {
        for role in RoleId::ALL {
            assert!(detector().check(&Message::from_role(role, "APPROVED")));
        }
    }

    #[test]
    fn test_whole_word_matches() {
        let d = detector();
        assert!(d.matches("The totals look right. APPROVED"));
        assert!(d.matches("APPROVED."));
        assert!(d.matches("respond with 'APPROVED'"));
        assert!(d.matches("**APPROVED**\nThanks team"));
    }

    #[test]
    fn test_substring_of_longer_word_rejected() {
        let d = detector();
        assert!(!d.matches("UNAPPROVED"));
        assert!(!d.matches("APPROVEDLY"));
        assert!(!d.matches("NOT_APPROVED"));
        assert!(!d.matches("APPROVED2"));
    }

    #[test]
    fn test_case_sensitive() {
        let d = detector();
        assert!(!d.matches("approved"));
        assert!(!d.matches("Approved, ship it"));
    }

    #[test]
    fn test_later_occurrence_counts() {
        assert!(detector().matches("UNAPPROVED at first, now APPROVED"));
    }

    #[test]
    fn test_empty_token_never_matches() {
        assert!(!TerminationDetector::new("").matches("anything"));
    }
}
