//! Digest Workspace - per-user controller for a research digest service
//!
//! Drives the authenticated workspace of a digest subscriber:
//! - Bootstraps user, research profile, history and delivery time as one unit
//! - Ends the session whenever that bootstrap fails
//! - Toggles the subscription and edits the research profile
//! - Configures the daily delivery time and triggers test deliveries
//! - Filters the digest history and loads one digest's papers on demand
//!
//! # Example
//!
//! ```rust,ignore
//! use digest_workspace::{FileCredentialStore, Workspace, WorkspaceConfig};
//! use std::sync::Arc;
//!
//! # async fn example(service: Arc<dyn digest_workspace::DigestService>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = WorkspaceConfig::new();
//! let store = Arc::new(FileCredentialStore::new(&config.credential_path));
//! let workspace = Workspace::open(config, service, store).await?;
//!
//! workspace.load().await?;
//! workspace.subscription().toggle().await?;
//!
//! println!("{} digests shown", workspace.feed().visible_items().len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod busy;
pub mod config;
pub mod detail;
pub mod digest_time;
pub mod error;
pub mod feed;
pub mod profile;
pub mod service;
pub mod session;
pub mod subscription;
pub mod test_digest;
pub mod types;
pub mod workspace;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use busy::{BusyFlag, BusyGuard};
pub use config::{WorkspaceConfig, DEFAULT_TEST_DIGEST_FALLBACK};
pub use detail::{DetailLoad, DigestDetailPanel, SelectionToken};
pub use digest_time::DigestTimeConfig;
pub use error::{Action, ConfigError, CredentialError, ServiceError, SessionFailure, WorkspaceError};
pub use feed::{DigestFeedController, DEFAULT_HISTORY_WINDOW};
pub use profile::{normalize_tag_input, EditBuffer, EditorMode, ProfileEditor, ProfileField};
pub use service::{DigestService, Remote};
pub use session::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, Phase, SessionGate, SessionTicket,
};
pub use subscription::SubscriptionToggle;
pub use test_digest::TestDigestTrigger;
pub use types::{
    Credential, DigestId, DigestItem, DigestPaper, ResearchProfile, TestDigestOutcome, User,
};
pub use workspace::{DetailSnapshot, Workspace, WorkspaceSnapshot};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a workspace
    pub use crate::{
        CredentialStore, DigestId, DigestService, FileCredentialStore, Phase, ProfileField,
        ServiceError, Workspace, WorkspaceConfig, WorkspaceError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
