//! Remote service boundary
//!
//! Everything the workspace knows about the digest service goes through
//! [`DigestService`]. Every call carries the session credential explicitly.

use crate::error::{Action, ServiceError, WorkspaceError};
use crate::session::{SessionGate, SessionTicket};
use crate::types::{
    Credential, DigestId, DigestItem, DigestPaper, ResearchProfile, TestDigestOutcome, User,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Calls consumed by the workspace
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DigestService: Send + Sync {
    /// Current user, including the subscription flag
    async fn current_user(&self, credential: &Credential) -> Result<User, ServiceError>;

    /// Research profile; empty lists when never configured
    async fn research_profile(
        &self,
        credential: &Credential,
    ) -> Result<ResearchProfile, ServiceError>;

    /// Replace the research profile, returning the stored value
    async fn update_research_profile(
        &self,
        credential: &Credential,
        profile: &ResearchProfile,
    ) -> Result<ResearchProfile, ServiceError>;

    /// Flip the subscription flag, returning the updated user
    async fn toggle_subscription(&self, credential: &Credential) -> Result<User, ServiceError>;

    /// Full digest history in service order
    async fn digest_history(&self, credential: &Credential)
        -> Result<Vec<DigestItem>, ServiceError>;

    /// Configured daily delivery time, if any
    async fn digest_time(&self, credential: &Credential) -> Result<Option<String>, ServiceError>;

    /// Set (`Some`) or clear (`None`) the delivery time, returning the stored value
    async fn update_digest_time(
        &self,
        credential: &Credential,
        digest_time: Option<String>,
    ) -> Result<Option<String>, ServiceError>;

    /// Ask for an out-of-band test delivery
    async fn trigger_test_digest(
        &self,
        credential: &Credential,
    ) -> Result<TestDigestOutcome, ServiceError>;

    /// Papers of one digest
    async fn digest_detail(
        &self,
        credential: &Credential,
        digest_id: DigestId,
    ) -> Result<Vec<DigestPaper>, ServiceError>;
}

/// Service handle paired with the session whose credential it sends
///
/// Cheap to clone; every component holds one.
#[derive(Clone)]
pub struct Remote {
    service: Arc<dyn DigestService>,
    session: Arc<SessionGate>,
}

impl Remote {
    /// Pair a service with a session
    #[inline]
    #[must_use]
    pub fn new(service: Arc<dyn DigestService>, session: Arc<SessionGate>) -> Self {
        Self { service, session }
    }

    /// Underlying service
    #[inline]
    #[must_use]
    pub fn service(&self) -> &dyn DigestService {
        self.service.as_ref()
    }

    /// Session gate
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionGate {
        &self.session
    }

    /// Credential and session epoch for the next call
    ///
    /// # Errors
    /// - `WorkspaceError::Unauthenticated` after logout or session failure
    #[inline]
    pub fn ticket(&self) -> Result<SessionTicket, WorkspaceError> {
        self.session.ticket()
    }

    /// Apply a result only while `ticket`'s session is still current
    ///
    /// # Errors
    /// - `WorkspaceError::SessionEnded` if the session ended since `ticket`
    ///   was issued; `apply` is not run
    #[inline]
    pub(crate) fn apply<R>(
        &self,
        ticket: &SessionTicket,
        action: Action,
        apply: impl FnOnce() -> R,
    ) -> Result<R, WorkspaceError> {
        self.session
            .if_current(ticket, apply)
            .ok_or(WorkspaceError::SessionEnded(action))
    }
}

impl std::fmt::Debug for Remote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remote")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
