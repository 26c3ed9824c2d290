//! Core types for the digest workspace
//!
//! Field names follow the remote service's snake_case JSON so the same types
//! serve as wire shapes and as workspace state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Digest identifier assigned by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestId(pub i64);

impl fmt::Display for DigestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Opaque access credential (bearer token)
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for the transport layer
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Current user as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: i64,
    /// Login email
    #[serde(default)]
    pub email: Option<String>,
    /// Account active flag
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Email verified flag
    #[serde(default)]
    pub is_verified: bool,
    /// Daily digest delivery switched on
    pub subscription_enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Research interests used to select papers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchProfile {
    /// Discipline tags
    #[serde(default)]
    pub disciplines: Vec<String>,
    /// Keyword tags
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Preferred journals
    #[serde(default)]
    pub journal_preferences: Vec<String>,
}

impl ResearchProfile {
    /// True iff at least one list is non-empty
    #[inline]
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !(self.disciplines.is_empty()
            && self.keywords.is_empty()
            && self.journal_preferences.is_empty())
    }
}

/// One delivered digest in the user's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestItem {
    /// Digest id
    pub id: DigestId,
    /// Send timestamp exactly as serialized by the service
    #[serde(default)]
    pub sent_at: Option<String>,
    /// Number of papers in the digest
    #[serde(default)]
    pub paper_count: u32,
}

impl DigestItem {
    /// Check whether `sent_at` starts with `prefix`
    ///
    /// Textual match only; items without a timestamp never match.
    #[inline]
    #[must_use]
    pub fn sent_on(&self, prefix: &str) -> bool {
        self.sent_at
            .as_deref()
            .is_some_and(|sent_at| sent_at.starts_with(prefix))
    }
}

/// One paper inside a digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestPaper {
    /// Paper id
    pub id: i64,
    /// Title
    pub title: String,
    /// Link to the paper
    #[serde(default)]
    pub url: String,
    /// Authors in published order
    #[serde(default)]
    pub authors: Vec<String>,
    /// Original abstract
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    /// Generated structured abstract
    #[serde(default)]
    pub structured_abstract: String,
    /// Where the paper was crawled from
    #[serde(default)]
    pub source: String,
    /// Publication date, when known
    #[serde(default)]
    pub published_date: Option<String>,
}

/// Result of a test delivery request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDigestOutcome {
    /// Whether the service reports the delivery as triggered
    pub success: bool,
    /// Message to show verbatim
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_is_configured() {
        assert!(!ResearchProfile::default().is_configured());

        let profile = ResearchProfile {
            keywords: vec!["graph".to_string()],
            ..ResearchProfile::default()
        };
        assert!(profile.is_configured());
    }

    #[test]
    fn digest_id_honors_width() {
        assert_eq!(format!("{:>4}", DigestId(7)), "   7");
        assert_eq!(format!("{:<3}|", DigestId(12)), "12 |");
    }

    #[test]
    fn digest_item_prefix_match() {
        let item = DigestItem {
            id: DigestId(1),
            sent_at: Some("2024-01-01T10:00:00Z".to_string()),
            paper_count: 3,
        };
        assert!(item.sent_on("2024-01-01"));
        assert!(!item.sent_on("2024-01-02"));

        let unsent = DigestItem {
            sent_at: None,
            ..item
        };
        assert!(!unsent.sent_on(""));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("secret-token");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.token(), "secret-token");
    }

    #[test]
    fn paper_deserializes_wire_names() {
        let json = r#"{
            "id": 7,
            "title": "Attention",
            "url": "https://example.org/p/7",
            "authors": ["A", "B"],
            "abstract": "raw",
            "structured_abstract": "structured",
            "source": "arxiv",
            "published_date": null
        }"#;
        let paper: DigestPaper = serde_json::from_str(json).unwrap();
        assert_eq!(paper.abstract_text, "raw");
        assert_eq!(paper.authors, vec!["A", "B"]);
        assert!(paper.published_date.is_none());
    }

    #[test]
    fn user_defaults_optional_identity_fields() {
        let user: User = serde_json::from_str(r#"{"id": 1, "subscription_enabled": false}"#).unwrap();
        assert!(user.is_active);
        assert!(!user.is_verified);
        assert!(!user.subscription_enabled);
    }
}
