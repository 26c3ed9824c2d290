//! Digest detail panel
//!
//! Loads the paper list for the selected digest. Every open or close starts a
//! new selection generation, and each fetch is tagged with the generation it
//! was issued under. A response that arrives after the selection moved on is
//! dropped, so the panel never shows papers of a digest other than the one
//! selected.

use crate::error::{Action, ServiceError, WorkspaceError};
use crate::service::Remote;
use crate::types::{DigestId, DigestItem, DigestPaper};
use parking_lot::Mutex;

/// Tag carried by one detail fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionToken {
    generation: u64,
    digest_id: DigestId,
}

impl SelectionToken {
    /// Digest the fetch was issued for
    #[inline]
    #[must_use]
    pub fn digest_id(&self) -> DigestId {
        self.digest_id
    }
}

/// What became of a detail fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLoad {
    /// Papers applied to the panel
    Loaded(usize),
    /// Selection changed or closed before the response arrived
    Superseded,
}

#[derive(Debug, Default)]
struct PanelState {
    generation: u64,
    selected_id: Option<DigestId>,
    selected_sent_at: Option<String>,
    papers: Vec<DigestPaper>,
    loading: bool,
    last_error: Option<ServiceError>,
}

/// On-demand paper list for one selected digest
#[derive(Debug)]
pub struct DigestDetailPanel {
    remote: Remote,
    state: Mutex<PanelState>,
}

impl DigestDetailPanel {
    /// Closed panel
    #[must_use]
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            state: Mutex::new(PanelState::default()),
        }
    }

    /// Selected digest id
    #[must_use]
    pub fn selected_id(&self) -> Option<DigestId> {
        self.state.lock().selected_id
    }

    /// Send time of the selected digest
    #[must_use]
    pub fn selected_sent_at(&self) -> Option<String> {
        self.state.lock().selected_sent_at.clone()
    }

    /// Papers of the selected digest
    #[must_use]
    pub fn papers(&self) -> Vec<DigestPaper> {
        self.state.lock().papers.clone()
    }

    /// Whether the current selection's fetch is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Whether a digest is selected
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.lock().selected_id.is_some()
    }

    /// Failure of the current selection's fetch
    #[must_use]
    pub fn last_error(&self) -> Option<ServiceError> {
        self.state.lock().last_error.clone()
    }

    /// Select `item` and mark it loading, returning the tag for its fetch
    pub fn begin_open(&self, item: &DigestItem) -> SelectionToken {
        let mut state = self.state.lock();
        state.generation += 1;
        state.selected_id = Some(item.id);
        state.selected_sent_at.clone_from(&item.sent_at);
        state.papers.clear();
        state.loading = true;
        state.last_error = None;

        SelectionToken {
            generation: state.generation,
            digest_id: item.id,
        }
    }

    /// Apply a fetch result if `token` still names the current selection
    pub fn complete(
        &self,
        token: SelectionToken,
        result: Result<Vec<DigestPaper>, ServiceError>,
    ) -> DetailLoad {
        let mut state = self.state.lock();
        if state.generation != token.generation {
            tracing::debug!(digest_id = %token.digest_id, "discarding stale digest detail");
            return DetailLoad::Superseded;
        }

        state.loading = false;
        match result {
            Ok(papers) => {
                let count = papers.len();
                state.papers = papers;
                DetailLoad::Loaded(count)
            }
            Err(e) => {
                state.papers.clear();
                state.last_error = Some(e);
                DetailLoad::Loaded(0)
            }
        }
    }

    /// Clear the selection; any fetch still in flight is dropped on arrival
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.selected_id = None;
        state.selected_sent_at = None;
        state.papers.clear();
        state.loading = false;
        state.last_error = None;
    }

    /// Select `item` and fetch its papers
    ///
    /// # Errors
    /// - `WorkspaceError::Unauthenticated` without a credential (nothing is selected)
    /// - `WorkspaceError::Request` if the fetch failed while still selected;
    ///   the panel shows an empty list
    #[tracing::instrument(skip(self, item), fields(digest_id = %item.id))]
    pub async fn open(&self, item: &DigestItem) -> Result<DetailLoad, WorkspaceError> {
        let ticket = self.remote.ticket()?;
        let token = self.begin_open(item);
        let _loading = LoadingGuard {
            panel: self,
            token,
        };

        let result = self
            .remote
            .service()
            .digest_detail(ticket.credential(), item.id)
            .await;

        if let Err(e) = &result {
            tracing::warn!(error = %e, "digest detail load failed");
        }
        let failure = result.as_ref().err().cloned();
        match (self.complete(token, result), failure) {
            (DetailLoad::Loaded(_), Some(e)) => {
                Err(WorkspaceError::request(Action::LoadDigestDetail, e))
            }
            (outcome, _) => Ok(outcome),
        }
    }

    pub(crate) fn reset(&self) {
        self.close();
    }
}

/// Clears `loading` if the fetch is abandoned while still current
struct LoadingGuard<'a> {
    panel: &'a DigestDetailPanel,
    token: SelectionToken,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.panel.state.lock();
        if state.generation == self.token.generation {
            state.loading = false;
        }
    }
}
