//! Session gate
//!
//! Holds the single persisted access credential and the current user. The
//! credential is read once when the gate opens and torn down explicitly on
//! logout or when the bootstrap barrier fails; components never read it from
//! anywhere else.
//!
//! The workspace [`Phase`] is published on a `watch` channel. A transition to
//! [`Phase::Unauthenticated`] is the signal to navigate to the login entry point.
//!
//! Every sign-in and termination starts a new session epoch. Requests carry the
//! epoch they were issued under in a [`SessionTicket`], and their results are
//! applied through [`SessionGate::if_current`], so a response that lands after
//! logout never writes into the ended session.

use crate::error::{CredentialError, WorkspaceError};
use crate::types::{Credential, User};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of the authenticated workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Created, bootstrap not started
    Idle,
    /// Bootstrap barrier in flight
    Loading,
    /// All four resources applied
    Ready,
    /// Session ended; navigate to the login entry point
    Unauthenticated,
}

/// Persistence for the one access credential
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stored credential, if any
    async fn load(&self) -> Result<Option<Credential>, CredentialError>;

    /// Persist a credential, replacing any previous one
    async fn save(&self, credential: &Credential) -> Result<(), CredentialError>;

    /// Remove the stored credential
    async fn clear(&self) -> Result<(), CredentialError>;
}

/// Credential kept in a single file
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store backed by `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, CredentialError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let token = raw.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Credential::new(token)))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, credential.token()).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `token`
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(Credential::new(token))),
        }
    }

    /// Whether a credential is currently stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, CredentialError> {
        Ok(self.slot.lock().clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        *self.slot.lock() = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        self.slot.lock().take();
        Ok(())
    }
}

/// Credential for one request, tagged with the session epoch it belongs to
#[derive(Debug, Clone)]
pub struct SessionTicket {
    credential: Credential,
    epoch: u64,
}

impl SessionTicket {
    /// Credential to send
    #[inline]
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Session epoch the request was issued under
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Owner of the credential, the current user and the workspace phase
pub struct SessionGate {
    store: Arc<dyn CredentialStore>,
    epoch: RwLock<u64>,
    credential: RwLock<Option<Credential>>,
    user: RwLock<Option<User>>,
    phase: watch::Sender<Phase>,
}

impl SessionGate {
    /// Open the gate, reading the persisted credential
    ///
    /// # Errors
    /// - `CredentialError` if the store cannot be read
    pub async fn open(store: Arc<dyn CredentialStore>) -> Result<Self, CredentialError> {
        let credential = store.load().await?;
        tracing::debug!(has_credential = credential.is_some(), "session gate opened");

        let (phase, _) = watch::channel(Phase::Idle);
        Ok(Self {
            store,
            epoch: RwLock::new(0),
            credential: RwLock::new(credential),
            user: RwLock::new(None),
            phase,
        })
    }

    /// Credential for an outgoing call
    ///
    /// # Errors
    /// - `WorkspaceError::Unauthenticated` when no credential is held
    pub fn credential(&self) -> Result<Credential, WorkspaceError> {
        self.credential
            .read()
            .clone()
            .ok_or(WorkspaceError::Unauthenticated)
    }

    /// Credential plus the current epoch, read together
    ///
    /// # Errors
    /// - `WorkspaceError::Unauthenticated` when no credential is held
    pub fn ticket(&self) -> Result<SessionTicket, WorkspaceError> {
        let epoch = self.epoch.read();
        let credential = self.credential()?;
        Ok(SessionTicket {
            credential,
            epoch: *epoch,
        })
    }

    /// Current session epoch
    #[must_use]
    pub fn epoch(&self) -> u64 {
        *self.epoch.read()
    }

    /// Run `apply` only if `ticket` belongs to the current session
    ///
    /// The epoch stays read-locked while `apply` runs, so a concurrent
    /// [`SessionGate::terminate`] waits for it and resets afterwards. `apply`
    /// must not call back into the epoch.
    pub(crate) fn if_current<R>(&self, ticket: &SessionTicket, apply: impl FnOnce() -> R) -> Option<R> {
        let epoch = self.epoch.read();
        if *epoch == ticket.epoch {
            Some(apply())
        } else {
            tracing::debug!(
                issued = ticket.epoch,
                current = *epoch,
                "dropping result from ended session"
            );
            None
        }
    }

    /// Whether a credential is held
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential.read().is_some()
    }

    /// Adopt and persist a credential issued elsewhere
    ///
    /// # Errors
    /// - `CredentialError::Empty` for a blank token
    /// - `CredentialError::Io` if persisting fails
    pub async fn sign_in(&self, token: &str) -> Result<(), CredentialError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::Empty);
        }
        let credential = Credential::new(token);
        self.store.save(&credential).await?;
        {
            let mut epoch = self.epoch.write();
            *epoch += 1;
            *self.credential.write() = Some(credential);
        }
        self.phase.send_replace(Phase::Idle);
        tracing::info!("credential stored");
        Ok(())
    }

    /// Current user, once bootstrapped
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    /// Replace the current user wholesale
    pub(crate) fn replace_user(&self, user: User) {
        *self.user.write() = Some(user);
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch phase transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            tracing::debug!(?previous, ?phase, "workspace phase changed");
        }
    }

    /// End the session: forget the credential and user, then signal navigation
    ///
    /// In-memory state is torn down even if the store fails to clear.
    ///
    /// # Errors
    /// - `CredentialError` if the persisted credential could not be removed
    pub async fn terminate(&self) -> Result<(), CredentialError> {
        {
            let mut epoch = self.epoch.write();
            *epoch += 1;
            self.credential.write().take();
            self.user.write().take();
        }
        self.set_phase(Phase::Unauthenticated);
        self.store.clear().await
    }
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("epoch", &self.epoch())
            .field("has_credential", &self.has_credential())
            .field("user", &*self.user.read())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
