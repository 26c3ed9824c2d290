//! Testing utilities for the digest workspace
//!
//! An in-memory [`FakeDigestService`] with a call log, injectable failures and
//! gates that hold a call until released, plus fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use digest_workspace::{
    Credential, DigestId, DigestItem, DigestPaper, DigestService, MemoryCredentialStore,
    ResearchProfile, ServiceError, TestDigestOutcome, User, Workspace, WorkspaceConfig,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

/// Service operation, without arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CurrentUser,
    ResearchProfile,
    UpdateResearchProfile,
    ToggleSubscription,
    DigestHistory,
    DigestTime,
    UpdateDigestTime,
    TriggerTestDigest,
    DigestDetail,
}

/// One recorded call, with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CurrentUser,
    ResearchProfile,
    UpdateResearchProfile(ResearchProfile),
    ToggleSubscription,
    DigestHistory,
    DigestTime,
    UpdateDigestTime(Option<String>),
    TriggerTestDigest,
    DigestDetail(DigestId),
}

impl Call {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::CurrentUser => Endpoint::CurrentUser,
            Self::ResearchProfile => Endpoint::ResearchProfile,
            Self::UpdateResearchProfile(_) => Endpoint::UpdateResearchProfile,
            Self::ToggleSubscription => Endpoint::ToggleSubscription,
            Self::DigestHistory => Endpoint::DigestHistory,
            Self::DigestTime => Endpoint::DigestTime,
            Self::UpdateDigestTime(_) => Endpoint::UpdateDigestTime,
            Self::TriggerTestDigest => Endpoint::TriggerTestDigest,
            Self::DigestDetail(_) => Endpoint::DigestDetail,
        }
    }
}

/// Holds one call until released
#[derive(Debug, Clone)]
pub struct Gate(Arc<Notify>);

impl Gate {
    /// Let the held call return
    pub fn release(&self) {
        self.0.notify_one();
    }
}

#[derive(Debug)]
struct FakeState {
    user: User,
    profile: ResearchProfile,
    history: Vec<DigestItem>,
    digest_time: Option<String>,
    papers: HashMap<DigestId, Vec<DigestPaper>>,
    test_outcome: TestDigestOutcome,
    failures: HashMap<Endpoint, ServiceError>,
    holds: HashMap<Endpoint, VecDeque<Arc<Notify>>>,
    calls: Vec<Call>,
}

/// In-memory digest service
#[derive(Debug)]
pub struct FakeDigestService {
    state: Mutex<FakeState>,
}

impl Default for FakeDigestService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDigestService {
    /// Unsubscribed user, empty profile, no history, no delivery time
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                user: user(false),
                profile: ResearchProfile::default(),
                history: Vec::new(),
                digest_time: None,
                papers: HashMap::new(),
                test_outcome: TestDigestOutcome {
                    success: true,
                    message: "Test digest sent".to_string(),
                },
                failures: HashMap::new(),
                holds: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn with_user(self, user: User) -> Self {
        self.state.lock().user = user;
        self
    }

    #[must_use]
    pub fn with_profile(self, profile: ResearchProfile) -> Self {
        self.state.lock().profile = profile;
        self
    }

    #[must_use]
    pub fn with_history(self, history: Vec<DigestItem>) -> Self {
        self.state.lock().history = history;
        self
    }

    #[must_use]
    pub fn with_digest_time(self, time: &str) -> Self {
        self.state.lock().digest_time = Some(time.to_string());
        self
    }

    #[must_use]
    pub fn with_papers(self, digest_id: i64, papers: Vec<DigestPaper>) -> Self {
        self.state.lock().papers.insert(DigestId(digest_id), papers);
        self
    }

    #[must_use]
    pub fn with_test_outcome(self, success: bool, message: &str) -> Self {
        self.state.lock().test_outcome = TestDigestOutcome {
            success,
            message: message.to_string(),
        };
        self
    }

    /// Fail every call to `endpoint` with `error` until [`Self::recover`]
    pub fn fail(&self, endpoint: Endpoint, error: ServiceError) {
        self.state.lock().failures.insert(endpoint, error);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.state.lock().failures.remove(&endpoint);
    }

    /// Hold the next call to `endpoint` until the returned gate is released
    pub fn hold(&self, endpoint: Endpoint) -> Gate {
        let notify = Arc::new(Notify::new());
        self.state
            .lock()
            .holds
            .entry(endpoint)
            .or_default()
            .push_back(notify.clone());
        Gate(notify)
    }

    /// Append a digest, as a delivery would
    pub fn push_digest(&self, item: DigestItem) {
        self.state.lock().history.insert(0, item);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    #[must_use]
    pub fn stored_profile(&self) -> ResearchProfile {
        self.state.lock().profile.clone()
    }

    #[must_use]
    pub fn stored_digest_time(&self) -> Option<String> {
        self.state.lock().digest_time.clone()
    }

    #[must_use]
    pub fn subscription_enabled(&self) -> bool {
        self.state.lock().user.subscription_enabled
    }

    /// Record `call`, wait on any hold, then report an injected failure
    async fn enter(&self, call: Call) -> Result<(), ServiceError> {
        let endpoint = call.endpoint();
        let hold = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.holds.get_mut(&endpoint).and_then(VecDeque::pop_front)
        };
        if let Some(notify) = hold {
            notify.notified().await;
        }
        match self.state.lock().failures.get(&endpoint) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DigestService for FakeDigestService {
    async fn current_user(&self, _credential: &Credential) -> Result<User, ServiceError> {
        self.enter(Call::CurrentUser).await?;
        Ok(self.state.lock().user.clone())
    }

    async fn research_profile(
        &self,
        _credential: &Credential,
    ) -> Result<ResearchProfile, ServiceError> {
        self.enter(Call::ResearchProfile).await?;
        Ok(self.state.lock().profile.clone())
    }

    async fn update_research_profile(
        &self,
        _credential: &Credential,
        profile: &ResearchProfile,
    ) -> Result<ResearchProfile, ServiceError> {
        self.enter(Call::UpdateResearchProfile(profile.clone()))
            .await?;
        let mut state = self.state.lock();
        state.profile = profile.clone();
        Ok(state.profile.clone())
    }

    async fn toggle_subscription(&self, _credential: &Credential) -> Result<User, ServiceError> {
        self.enter(Call::ToggleSubscription).await?;
        let mut state = self.state.lock();
        state.user.subscription_enabled = !state.user.subscription_enabled;
        Ok(state.user.clone())
    }

    async fn digest_history(
        &self,
        _credential: &Credential,
    ) -> Result<Vec<DigestItem>, ServiceError> {
        self.enter(Call::DigestHistory).await?;
        Ok(self.state.lock().history.clone())
    }

    async fn digest_time(&self, _credential: &Credential) -> Result<Option<String>, ServiceError> {
        self.enter(Call::DigestTime).await?;
        Ok(self.state.lock().digest_time.clone())
    }

    async fn update_digest_time(
        &self,
        _credential: &Credential,
        digest_time: Option<String>,
    ) -> Result<Option<String>, ServiceError> {
        self.enter(Call::UpdateDigestTime(digest_time.clone()))
            .await?;
        let mut state = self.state.lock();
        state.digest_time = digest_time;
        Ok(state.digest_time.clone())
    }

    async fn trigger_test_digest(
        &self,
        _credential: &Credential,
    ) -> Result<TestDigestOutcome, ServiceError> {
        self.enter(Call::TriggerTestDigest).await?;
        Ok(self.state.lock().test_outcome.clone())
    }

    async fn digest_detail(
        &self,
        _credential: &Credential,
        digest_id: DigestId,
    ) -> Result<Vec<DigestPaper>, ServiceError> {
        self.enter(Call::DigestDetail(digest_id)).await?;
        self.state
            .lock()
            .papers
            .get(&digest_id)
            .cloned()
            .ok_or_else(|| ServiceError::Status {
                status: 404,
                message: format!("digest {digest_id} not found"),
            })
    }
}

/// A workspace wired to a fake service and an in-memory store
pub struct Harness {
    pub workspace: Workspace,
    pub service: Arc<FakeDigestService>,
    pub store: Arc<MemoryCredentialStore>,
}

/// Signed-in workspace, not yet loaded
pub async fn signed_in_workspace(service: FakeDigestService) -> Harness {
    let service = Arc::new(service);
    let store = Arc::new(MemoryCredentialStore::with_token("test-token"));
    let workspace = Workspace::open(WorkspaceConfig::new(), service.clone(), store.clone())
        .await
        .unwrap();
    Harness {
        workspace,
        service,
        store,
    }
}

/// Signed-in workspace after a successful bootstrap, with the call log cleared
pub async fn ready_workspace(service: FakeDigestService) -> Harness {
    let harness = signed_in_workspace(service).await;
    harness.workspace.load().await.unwrap();
    harness.service.clear_calls();
    harness
}

pub fn user(subscription_enabled: bool) -> User {
    User {
        id: 1,
        email: Some("reader@example.org".to_string()),
        is_active: true,
        is_verified: true,
        subscription_enabled,
    }
}

pub fn item(id: i64, sent_at: &str) -> DigestItem {
    DigestItem {
        id: DigestId(id),
        sent_at: Some(sent_at.to_string()),
        paper_count: 3,
    }
}

/// `count` digests, newest first, one per day of January 2024
pub fn history(count: i64) -> Vec<DigestItem> {
    (1..=count)
        .rev()
        .map(|day| item(day, &format!("2024-01-{day:02}T08:00:00Z")))
        .collect()
}

pub fn paper(id: i64, title: &str) -> DigestPaper {
    DigestPaper {
        id,
        title: title.to_string(),
        url: format!("https://papers.example.org/{id}"),
        authors: vec!["Grace Hopper".to_string()],
        abstract_text: "An abstract.".to_string(),
        structured_abstract: String::new(),
        source: "arxiv".to_string(),
        published_date: Some("2024-01-01".to_string()),
    }
}

pub fn profile(disciplines: &[&str], keywords: &[&str], journals: &[&str]) -> ResearchProfile {
    ResearchProfile {
        disciplines: strings(disciplines),
        keywords: strings(keywords),
        journal_preferences: strings(journals),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}
