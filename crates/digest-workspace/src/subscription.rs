//! Subscription toggle
//!
//! The on/off switch for daily delivery. The local value only ever changes to
//! what the service returns; there is no optimistic flip.

use crate::busy::BusyFlag;
use crate::error::{Action, ServiceError, WorkspaceError};
use crate::service::Remote;
use parking_lot::Mutex;

/// Request-confirmed subscription switch
#[derive(Debug)]
pub struct SubscriptionToggle {
    remote: Remote,
    busy: BusyFlag,
    last_error: Mutex<Option<ServiceError>>,
}

impl SubscriptionToggle {
    /// Create toggle bound to `remote`
    #[must_use]
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            busy: BusyFlag::new(),
            last_error: Mutex::new(None),
        }
    }

    /// Current confirmed value; `false` before bootstrap
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.remote
            .session()
            .user()
            .is_some_and(|user| user.subscription_enabled)
    }

    /// Whether a toggle request is in flight
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Failure of the most recent toggle, cleared by the next success
    #[must_use]
    pub fn last_error(&self) -> Option<ServiceError> {
        self.last_error.lock().clone()
    }

    /// Ask the service to flip the subscription
    ///
    /// # Returns
    /// The value the service now reports
    ///
    /// # Errors
    /// - `WorkspaceError::Busy` while a previous toggle is in flight
    /// - `WorkspaceError::Unauthenticated` without a credential
    /// - `WorkspaceError::Request` if the service call fails; the value is unchanged
    /// - `WorkspaceError::SessionEnded` if the session ended before the reply
    #[tracing::instrument(skip(self))]
    pub async fn toggle(&self) -> Result<bool, WorkspaceError> {
        let _guard = self
            .busy
            .try_acquire()
            .ok_or(WorkspaceError::Busy(Action::ToggleSubscription))?;
        let ticket = self.remote.ticket()?;

        let result = self
            .remote
            .service()
            .toggle_subscription(ticket.credential())
            .await;

        self.remote
            .apply(&ticket, Action::ToggleSubscription, || match result {
                Ok(user) => {
                    let enabled = user.subscription_enabled;
                    self.remote.session().replace_user(user);
                    self.last_error.lock().take();
                    tracing::info!(enabled, "subscription toggled");
                    Ok(enabled)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "subscription toggle failed");
                    *self.last_error.lock() = Some(e.clone());
                    Err(WorkspaceError::request(Action::ToggleSubscription, e))
                }
            })?
    }
}
