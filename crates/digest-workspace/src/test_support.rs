//! Fixtures shared by unit tests

use crate::service::{MockDigestService, Remote};
use crate::session::{MemoryCredentialStore, SessionGate};
use crate::types::{DigestId, DigestItem, DigestPaper, User};
use std::sync::Arc;

pub(crate) async fn remote_with(mock: MockDigestService) -> Remote {
    let store = Arc::new(MemoryCredentialStore::with_token("test-token"));
    let session = SessionGate::open(store).await.unwrap();
    Remote::new(Arc::new(mock), Arc::new(session))
}

pub(crate) fn user(subscription_enabled: bool) -> User {
    User {
        id: 1,
        email: Some("reader@example.org".to_string()),
        is_active: true,
        is_verified: true,
        subscription_enabled,
    }
}

pub(crate) fn item(id: i64, sent_at: Option<&str>) -> DigestItem {
    DigestItem {
        id: DigestId(id),
        sent_at: sent_at.map(str::to_string),
        paper_count: 5,
    }
}

pub(crate) fn paper(id: i64, title: &str) -> DigestPaper {
    DigestPaper {
        id,
        title: title.to_string(),
        url: format!("https://papers.example.org/{id}"),
        authors: vec!["Ada Lovelace".to_string()],
        abstract_text: String::new(),
        structured_abstract: String::new(),
        source: "arxiv".to_string(),
        published_date: None,
    }
}
