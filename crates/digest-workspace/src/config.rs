//! Workspace configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! api_base_url = "https://digest.example.org/api/v1"
//! credential_path = ".digest/token"
//! history_window = 10
//! log_filter = "info,digest_workspace=debug"
//! ```

use crate::error::ConfigError;
use crate::feed::DEFAULT_HISTORY_WINDOW;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Message shown when a test delivery request fails outright
pub const DEFAULT_TEST_DIGEST_FALLBACK: &str =
    "Something went wrong while triggering the test digest. Please try again later.";

/// Workspace configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Base URL of the digest service API
    pub api_base_url: String,
    /// File holding the access credential
    pub credential_path: PathBuf,
    /// Digests shown while the history is collapsed
    pub history_window: usize,
    /// Message shown when a test delivery request fails outright
    pub test_digest_fallback_message: String,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl WorkspaceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With API base URL
    #[inline]
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// With credential file
    #[inline]
    #[must_use]
    pub fn with_credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = path.into();
        self
    }

    /// With collapsed history window
    #[inline]
    #[must_use]
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// With test digest fallback message
    #[inline]
    #[must_use]
    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.test_digest_fallback_message = message.into();
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed TOML or unknown keys
    /// - `ConfigError::Invalid` for out-of-range values
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Read` if the file cannot be read
    /// - see [`WorkspaceConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `ConfigError::Invalid` naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_window == 0 {
            return Err(ConfigError::Invalid {
                field: "history_window",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            credential_path: PathBuf::from(".digest/token"),
            history_window: DEFAULT_HISTORY_WINDOW,
            test_digest_fallback_message: DEFAULT_TEST_DIGEST_FALLBACK.to_string(),
            log_filter: "info".to_string(),
        }
    }
}
