//! Workspace controller
//!
//! Owns every component and runs the bootstrap barrier:
//! 1. Request current user, research profile, digest history and digest time
//!    concurrently
//! 2. If all four succeed, seed every component in one synchronous step
//! 3. If any fails (or no credential is held), end the session: clear the
//!    credential, reset the components and publish [`Phase::Unauthenticated`]
//!
//! After bootstrap each component is driven independently; their in-flight
//! flags never block one another.

use crate::busy::BusyFlag;
use crate::config::WorkspaceConfig;
use crate::detail::{DetailLoad, DigestDetailPanel};
use crate::digest_time::DigestTimeConfig;
use crate::error::{Action, CredentialError, ServiceError, SessionFailure, WorkspaceError};
use crate::feed::DigestFeedController;
use crate::profile::{EditBuffer, ProfileEditor};
use crate::service::{DigestService, Remote};
use crate::session::{CredentialStore, Phase, SessionGate};
use crate::subscription::SubscriptionToggle;
use crate::test_digest::TestDigestTrigger;
use crate::types::{Credential, DigestId, DigestItem, DigestPaper, ResearchProfile, User};
use serde::Serialize;
use std::sync::Arc;

/// The four resources joined by the bootstrap barrier
#[derive(Debug)]
struct Bootstrap {
    user: User,
    profile: ResearchProfile,
    history: Vec<DigestItem>,
    digest_time: Option<String>,
}

/// Serializable view of the whole workspace
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSnapshot {
    /// Lifecycle phase
    pub phase: Phase,
    /// Current user
    pub user: Option<User>,
    /// Confirmed subscription flag
    pub subscription_enabled: bool,
    /// Canonical research profile
    pub profile: ResearchProfile,
    /// Whether any profile list is non-empty
    pub has_profile: bool,
    /// Edit buffers while editing
    pub editing: Option<EditBuffer>,
    /// Confirmed delivery time
    pub digest_time: Option<String>,
    /// Delivery time input text
    pub digest_time_text: String,
    /// Last test delivery message
    pub test_digest_message: String,
    /// Active date filter
    pub date_filter: Option<String>,
    /// Whether the history is expanded
    pub expanded: bool,
    /// Digests currently shown
    pub visible_digests: Vec<DigestItem>,
    /// Filtered digests hidden by the collapsed window
    pub hidden_digests: usize,
    /// Open detail panel
    pub detail: Option<DetailSnapshot>,
    /// In-flight actions
    pub in_flight: Vec<String>,
}

/// Serializable view of the detail panel
#[derive(Debug, Clone, Serialize)]
pub struct DetailSnapshot {
    /// Selected digest
    pub digest_id: DigestId,
    /// Its send time
    pub sent_at: Option<String>,
    /// Whether its papers are loading
    pub loading: bool,
    /// Loaded papers
    pub papers: Vec<DigestPaper>,
}

/// Authenticated per-user workspace
#[derive(Debug)]
pub struct Workspace {
    config: WorkspaceConfig,
    remote: Remote,
    loading: BusyFlag,
    subscription: SubscriptionToggle,
    profile: ProfileEditor,
    digest_time: DigestTimeConfig,
    feed: Arc<DigestFeedController>,
    test_digest: TestDigestTrigger,
    detail: DigestDetailPanel,
}

impl Workspace {
    /// Assemble a workspace over an opened session
    #[must_use]
    pub fn new(
        config: WorkspaceConfig,
        service: Arc<dyn DigestService>,
        session: Arc<SessionGate>,
    ) -> Self {
        let remote = Remote::new(service, session);
        let feed = Arc::new(DigestFeedController::new(config.history_window));

        Self {
            subscription: SubscriptionToggle::new(remote.clone()),
            profile: ProfileEditor::new(remote.clone()),
            digest_time: DigestTimeConfig::new(remote.clone()),
            test_digest: TestDigestTrigger::new(
                remote.clone(),
                feed.clone(),
                config.test_digest_fallback_message.clone(),
            ),
            detail: DigestDetailPanel::new(remote.clone()),
            feed,
            loading: BusyFlag::new(),
            remote,
            config,
        }
    }

    /// Open the session from `store` and assemble a workspace
    ///
    /// # Errors
    /// - `WorkspaceError::Credential` if the store cannot be read
    pub async fn open(
        config: WorkspaceConfig,
        service: Arc<dyn DigestService>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, WorkspaceError> {
        let session = SessionGate::open(store).await?;
        Ok(Self::new(config, service, Arc::new(session)))
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Session gate
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionGate {
        self.remote.session()
    }

    /// Subscription toggle
    #[inline]
    #[must_use]
    pub fn subscription(&self) -> &SubscriptionToggle {
        &self.subscription
    }

    /// Research profile editor
    #[inline]
    #[must_use]
    pub fn profile(&self) -> &ProfileEditor {
        &self.profile
    }

    /// Delivery time setting
    #[inline]
    #[must_use]
    pub fn digest_time(&self) -> &DigestTimeConfig {
        &self.digest_time
    }

    /// Digest history feed
    #[inline]
    #[must_use]
    pub fn feed(&self) -> &DigestFeedController {
        &self.feed
    }

    /// Test delivery trigger
    #[inline]
    #[must_use]
    pub fn test_digest(&self) -> &TestDigestTrigger {
        &self.test_digest
    }

    /// Digest detail panel
    #[inline]
    #[must_use]
    pub fn detail(&self) -> &DigestDetailPanel {
        &self.detail
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.session().phase()
    }

    /// Run the bootstrap barrier
    ///
    /// # Errors
    /// - `WorkspaceError::Busy` while a bootstrap is already running
    /// - `WorkspaceError::Session` if any of the four requests failed or no
    ///   credential is held; the session has been terminated
    /// - `WorkspaceError::SessionEnded` if the session was ended (logout)
    ///   while the requests were in flight; nothing is applied
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<(), WorkspaceError> {
        let _guard = self
            .loading
            .try_acquire()
            .ok_or(WorkspaceError::Busy(Action::Bootstrap))?;
        self.session().set_phase(Phase::Loading);

        let fetched = match self.remote.ticket() {
            Ok(ticket) => self
                .fetch_bootstrap(ticket.credential())
                .await
                .map(|bootstrap| (ticket, bootstrap))
                .map_err(SessionFailure::from),
            Err(_) => Err(SessionFailure::MissingCredential),
        };

        match fetched {
            Ok((ticket, bootstrap)) => {
                self.remote.apply(&ticket, Action::Bootstrap, || {
                    tracing::info!(
                        digests = bootstrap.history.len(),
                        subscribed = bootstrap.user.subscription_enabled,
                        "workspace loaded"
                    );
                    self.apply_bootstrap(bootstrap);
                    self.session().set_phase(Phase::Ready);
                })
            }
            Err(failure) => {
                tracing::warn!(error = %failure, "bootstrap failed, ending session");
                // store errors are logged; the session failure is what the caller sees
                self.end_session().await.ok();
                Err(WorkspaceError::Session(failure))
            }
        }
    }

    /// Tear down the session first so late results are dropped, then reset
    async fn end_session(&self) -> Result<(), CredentialError> {
        let cleared = self.session().terminate().await;
        self.reset_components();
        if let Err(e) = &cleared {
            tracing::warn!(error = %e, "failed to clear stored credential");
        }
        cleared
    }

    async fn fetch_bootstrap(&self, credential: &Credential) -> Result<Bootstrap, ServiceError> {
        let service = self.remote.service();
        let (user, profile, history, digest_time) = tokio::try_join!(
            service.current_user(credential),
            service.research_profile(credential),
            service.digest_history(credential),
            service.digest_time(credential),
        )?;

        Ok(Bootstrap {
            user,
            profile,
            history,
            digest_time,
        })
    }

    fn apply_bootstrap(&self, bootstrap: Bootstrap) {
        self.session().replace_user(bootstrap.user);
        self.profile.seed(bootstrap.profile);
        self.digest_time.seed(bootstrap.digest_time);
        self.feed.replace_items(bootstrap.history);
    }

    fn reset_components(&self) {
        self.profile.seed(ResearchProfile::default());
        self.digest_time.seed(None);
        self.feed.reset();
        self.test_digest.reset();
        self.detail.reset();
    }

    /// End the session on user request
    ///
    /// # Errors
    /// - `WorkspaceError::Credential` if the stored credential could not be
    ///   removed; the in-memory session is gone regardless
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), WorkspaceError> {
        self.end_session().await?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Open the detail panel for a digest in the loaded history
    ///
    /// # Errors
    /// - `WorkspaceError::UnknownDigest` if `digest_id` is not in the history
    /// - see [`DigestDetailPanel::open`]
    pub async fn open_digest(&self, digest_id: DigestId) -> Result<DetailLoad, WorkspaceError> {
        let item = self
            .feed
            .items()
            .into_iter()
            .find(|item| item.id == digest_id)
            .ok_or(WorkspaceError::UnknownDigest(digest_id))?;
        self.detail.open(&item).await
    }

    /// Close the detail panel
    #[inline]
    pub fn close_digest(&self) {
        self.detail.close();
    }

    /// Capture the current view model
    #[must_use]
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let detail = self.detail.selected_id().map(|digest_id| DetailSnapshot {
            digest_id,
            sent_at: self.detail.selected_sent_at(),
            loading: self.detail.is_loading(),
            papers: self.detail.papers(),
        });

        let in_flight = [
            (self.loading.is_busy(), Action::Bootstrap),
            (self.subscription.is_busy(), Action::ToggleSubscription),
            (self.profile.is_saving(), Action::SaveProfile),
            (self.digest_time.is_saving(), Action::SaveDigestTime),
            (self.test_digest.is_testing(), Action::TestDigest),
            (self.detail.is_loading(), Action::LoadDigestDetail),
        ]
        .into_iter()
        .filter_map(|(busy, action)| busy.then(|| action.to_string()))
        .collect();

        WorkspaceSnapshot {
            phase: self.phase(),
            user: self.session().user(),
            subscription_enabled: self.subscription.enabled(),
            profile: self.profile.profile(),
            has_profile: self.profile.has_profile(),
            editing: self.profile.buffer(),
            digest_time: self.digest_time.confirmed(),
            digest_time_text: self.digest_time.time_text(),
            test_digest_message: self.test_digest.message(),
            date_filter: self.feed.date_filter(),
            expanded: self.feed.is_expanded(),
            visible_digests: self.feed.visible_items(),
            hidden_digests: self.feed.hidden_count(),
            detail,
            in_flight,
        }
    }
}
