//! Error types for the digest workspace
//!
//! Provides error handling for:
//! - Remote service calls (transport, status, decoding)
//! - Bootstrap failures that end the authenticated session
//! - Actions rejected while in flight, failed remotely, or outlived by their session
//! - Configuration and credential storage

use std::fmt;

/// Failure reported by the remote service boundary
///
/// `Clone` so components can keep the last failure around for inspection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Credential missing, expired or rejected
    #[error("unauthorized")]
    Unauthorized,

    /// Non-success response status
    #[error("service returned status {status}: {message}")]
    Status {
        /// HTTP-like status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Check if the boundary rejected the credential
    #[inline]
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// User-triggered workspace actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Initial four-resource load
    Bootstrap,
    /// Subscription on/off
    ToggleSubscription,
    /// Research profile save
    SaveProfile,
    /// Digest time save
    SaveDigestTime,
    /// Out-of-band test delivery
    TestDigest,
    /// Paper list for one digest
    LoadDigestDetail,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bootstrap => "bootstrap",
            Self::ToggleSubscription => "toggle subscription",
            Self::SaveProfile => "save profile",
            Self::SaveDigestTime => "save digest time",
            Self::TestDigest => "test digest",
            Self::LoadDigestDetail => "load digest detail",
        };
        f.write_str(name)
    }
}

/// Main workspace error type
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Bootstrap barrier failed; the session has been terminated
    #[error("session failure: {0}")]
    Session(#[source] SessionFailure),

    /// No credential is held (never signed in, or already logged out)
    #[error("not authenticated")]
    Unauthenticated,

    /// The action's own control is still in flight
    #[error("{0} already in progress")]
    Busy(Action),

    /// The action's request failed; local state left unchanged
    #[error("{action} failed: {source}")]
    Request {
        /// The action that failed
        action: Action,
        /// Underlying service failure
        #[source]
        source: ServiceError,
    },

    /// The session ended while the action was in flight; its result was dropped
    #[error("session ended during {0}")]
    SessionEnded(Action),

    /// Profile save or buffer edit outside the editing state
    #[error("profile editor is not in editing state")]
    NotEditing,

    /// Digest id not present in the loaded history
    #[error("digest {0} not found in history")]
    UnknownDigest(crate::types::DigestId),

    /// Credential storage failed
    #[error("credential store error: {0}")]
    Credential(#[from] CredentialError),
}

impl WorkspaceError {
    /// Check if this error ended the authenticated session
    #[inline]
    #[must_use]
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            Self::Session(_) | Self::Unauthenticated | Self::SessionEnded(_)
        )
    }

    /// Check if the action was rejected because it was already running
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Wrap a service failure for the given action
    #[inline]
    pub fn request(action: Action, source: ServiceError) -> Self {
        Self::Request { action, source }
    }
}

/// Why the bootstrap barrier failed
///
/// A missing credential, a rejected credential and an unrelated resource
/// error all end the session the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFailure {
    /// No credential was found at startup
    #[error("no stored credential")]
    MissingCredential,

    /// One of the bootstrap requests failed
    #[error("bootstrap request failed: {0}")]
    Remote(#[from] ServiceError),
}

/// Credential storage errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Reading or writing the backing file failed
    #[error("credential io error: {0}")]
    Io(#[from] std::io::Error),

    /// Token was empty after trimming
    #[error("credential token is empty")]
    Empty,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying io error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}
