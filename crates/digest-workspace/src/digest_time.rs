//! Daily delivery time setting
//!
//! `time_text` is the editable input. An empty (after trimming) input means
//! "clear the schedule". After every successful save the input is overwritten
//! with whatever the service stored, which may differ from what was sent.

use crate::busy::BusyFlag;
use crate::error::{Action, ServiceError, WorkspaceError};
use crate::service::Remote;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct TimeState {
    text: String,
    confirmed: Option<String>,
}

/// Editable delivery-time setting with explicit clear
#[derive(Debug)]
pub struct DigestTimeConfig {
    remote: Remote,
    saving: BusyFlag,
    state: Mutex<TimeState>,
    last_error: Mutex<Option<ServiceError>>,
}

impl DigestTimeConfig {
    /// Unset delivery time
    #[must_use]
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            saving: BusyFlag::new(),
            state: Mutex::new(TimeState::default()),
            last_error: Mutex::new(None),
        }
    }

    pub(crate) fn seed(&self, confirmed: Option<String>) {
        let mut state = self.state.lock();
        state.text = confirmed.clone().unwrap_or_default();
        state.confirmed = confirmed;
        self.last_error.lock().take();
    }

    /// Current input text
    #[must_use]
    pub fn time_text(&self) -> String {
        self.state.lock().text.clone()
    }

    /// Replace the input text
    pub fn set_time_text(&self, text: impl Into<String>) {
        self.state.lock().text = text.into();
    }

    /// Delivery time as last stored by the service; `None` means no schedule
    #[must_use]
    pub fn confirmed(&self) -> Option<String> {
        self.state.lock().confirmed.clone()
    }

    /// Whether a save is in flight
    #[inline]
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving.is_busy()
    }

    /// Failure of the most recent save, cleared by the next success
    #[must_use]
    pub fn last_error(&self) -> Option<ServiceError> {
        self.last_error.lock().clone()
    }

    /// Submit the trimmed input, or a clear when it is blank
    ///
    /// # Returns
    /// The value the service stored
    ///
    /// # Errors
    /// - `WorkspaceError::Busy` while a save is in flight
    /// - `WorkspaceError::Unauthenticated` without a credential
    /// - `WorkspaceError::Request` if the service call fails; input and
    ///   confirmed value are unchanged
    /// - `WorkspaceError::SessionEnded` if the session ended before the reply
    #[tracing::instrument(skip(self))]
    pub async fn save(&self) -> Result<Option<String>, WorkspaceError> {
        let _guard = self
            .saving
            .try_acquire()
            .ok_or(WorkspaceError::Busy(Action::SaveDigestTime))?;

        let requested = {
            let state = self.state.lock();
            let trimmed = state.text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        let ticket = self.remote.ticket()?;
        tracing::info!(requested = ?requested, "saving digest time");

        let result = self
            .remote
            .service()
            .update_digest_time(ticket.credential(), requested)
            .await;

        self.remote
            .apply(&ticket, Action::SaveDigestTime, || match result {
                Ok(stored) => {
                    let mut state = self.state.lock();
                    state.text = stored.clone().unwrap_or_default();
                    state.confirmed.clone_from(&stored);
                    self.last_error.lock().take();
                    Ok(stored)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "digest time save failed");
                    *self.last_error.lock() = Some(e.clone());
                    Err(WorkspaceError::request(Action::SaveDigestTime, e))
                }
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockDigestService;
    use crate::test_support::remote_with;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn blank_input_submits_clear() {
        let mut mock = MockDigestService::new();
        mock.expect_update_digest_time()
            .with(mockall::predicate::always(), eq(None))
            .times(1)
            .returning(|_, _| Ok(None));

        let config = DigestTimeConfig::new(remote_with(mock).await);
        config.seed(Some("08:00".to_string()));
        config.set_time_text("   ");

        assert_eq!(config.save().await.unwrap(), None);
        assert_eq!(config.time_text(), "");
        assert_eq!(config.confirmed(), None);
        assert!(!config.is_saving());
    }

    #[tokio::test]
    async fn input_is_trimmed_and_server_value_wins() {
        let mut mock = MockDigestService::new();
        mock.expect_update_digest_time()
            .with(mockall::predicate::always(), eq(Some("7:5".to_string())))
            .times(1)
            .returning(|_, _| Ok(Some("07:05".to_string())));

        let config = DigestTimeConfig::new(remote_with(mock).await);
        config.set_time_text(" 7:5 ");

        assert_eq!(config.save().await.unwrap().as_deref(), Some("07:05"));
        assert_eq!(config.time_text(), "07:05");
        assert_eq!(config.confirmed().as_deref(), Some("07:05"));
    }

    #[tokio::test]
    async fn failed_save_keeps_input_and_confirmed() {
        let mut mock = MockDigestService::new();
        mock.expect_update_digest_time()
            .times(1)
            .returning(|_, _| {
                Err(ServiceError::Status {
                    status: 422,
                    message: "bad time".to_string(),
                })
            });

        let config = DigestTimeConfig::new(remote_with(mock).await);
        config.seed(Some("09:30".to_string()));
        config.set_time_text("25:00");

        assert!(config.save().await.is_err());
        assert_eq!(config.time_text(), "25:00");
        assert_eq!(config.confirmed().as_deref(), Some("09:30"));
        assert!(config.last_error().is_some());
        assert!(!config.is_saving());
    }
}
