//! Test digest trigger
//!
//! Requests an out-of-band delivery. The service's message is shown as-is,
//! whether it reports success or not. Only a failed call shows the fallback
//! message. A reported success refetches the whole history, since the delivery
//! may have added an entry.

use crate::busy::BusyFlag;
use crate::error::{Action, ServiceError, WorkspaceError};
use crate::feed::DigestFeedController;
use crate::service::Remote;
use crate::types::TestDigestOutcome;
use parking_lot::Mutex;
use std::sync::Arc;

/// One-shot test delivery action
#[derive(Debug)]
pub struct TestDigestTrigger {
    remote: Remote,
    feed: Arc<DigestFeedController>,
    fallback_message: String,
    testing: BusyFlag,
    message: Mutex<String>,
    last_error: Mutex<Option<ServiceError>>,
}

impl TestDigestTrigger {
    /// Trigger that refreshes `feed` after a reported success
    #[must_use]
    pub fn new(
        remote: Remote,
        feed: Arc<DigestFeedController>,
        fallback_message: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            feed,
            fallback_message: fallback_message.into(),
            testing: BusyFlag::new(),
            message: Mutex::new(String::new()),
            last_error: Mutex::new(None),
        }
    }

    /// Message from the last trigger; empty while one is running
    #[must_use]
    pub fn message(&self) -> String {
        self.message.lock().clone()
    }

    /// Whether a trigger is in flight
    #[inline]
    #[must_use]
    pub fn is_testing(&self) -> bool {
        self.testing.is_busy()
    }

    /// Failure of the last trigger or its history refresh
    #[must_use]
    pub fn last_error(&self) -> Option<ServiceError> {
        self.last_error.lock().clone()
    }

    pub(crate) fn reset(&self) {
        self.message.lock().clear();
        self.last_error.lock().take();
    }

    /// Request a test delivery
    ///
    /// # Returns
    /// The service's verdict and message
    ///
    /// # Errors
    /// - `WorkspaceError::Busy` while a trigger is in flight
    /// - `WorkspaceError::Unauthenticated` without a credential
    /// - `WorkspaceError::Request` if the trigger call failed; the fallback
    ///   message is shown
    /// - `WorkspaceError::SessionEnded` if the session ended before a reply
    #[tracing::instrument(skip(self))]
    pub async fn trigger(&self) -> Result<TestDigestOutcome, WorkspaceError> {
        let _guard = self
            .testing
            .try_acquire()
            .ok_or(WorkspaceError::Busy(Action::TestDigest))?;
        self.message.lock().clear();
        self.last_error.lock().take();
        let ticket = self.remote.ticket()?;

        let result = self
            .remote
            .service()
            .trigger_test_digest(ticket.credential())
            .await;

        let outcome = self
            .remote
            .apply(&ticket, Action::TestDigest, || match result {
                Ok(outcome) => {
                    tracing::info!(success = outcome.success, "test digest requested");
                    self.message.lock().clone_from(&outcome.message);
                    Ok(outcome)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "test digest trigger failed");
                    self.message.lock().clone_from(&self.fallback_message);
                    *self.last_error.lock() = Some(e.clone());
                    Err(WorkspaceError::request(Action::TestDigest, e))
                }
            })??;

        if outcome.success {
            let refreshed = self
                .remote
                .service()
                .digest_history(ticket.credential())
                .await;

            self.remote.apply(&ticket, Action::TestDigest, || match refreshed {
                Ok(items) => self.feed.replace_items(items),
                Err(e) => {
                    // the delivery itself went through; keep the service's message
                    tracing::warn!(error = %e, "history refresh after test digest failed");
                    *self.last_error.lock() = Some(e);
                }
            })?;
        }

        Ok(outcome)
    }
}
