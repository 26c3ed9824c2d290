//! Research profile editor
//!
//! Two-state machine over the canonical [`ResearchProfile`]:
//!
//! ```text
//!   Viewing --start_edit--> Editing
//!   Editing --cancel------> Viewing          (no remote call)
//!   Editing --save ok-----> Viewing          (canonical <- server echo)
//!   Editing --save err----> Editing          (buffers kept)
//! ```
//!
//! While editing, each list is a free-text buffer. Buffers are never canonical;
//! only a confirmed save changes the profile.

use crate::busy::BusyFlag;
use crate::error::{Action, ServiceError, WorkspaceError};
use crate::service::Remote;
use crate::types::ResearchProfile;
use parking_lot::Mutex;
use serde::Serialize;

/// Separator used when seeding buffers from a list
const JOIN_SEPARATOR: &str = ", ";

/// Split free text into tags
///
/// Splits on ASCII `,` and full-width `，`, trims each segment and drops empty
/// ones. Order is preserved and duplicates are kept.
#[must_use]
pub fn normalize_tag_input(raw: &str) -> Vec<String> {
    raw.split([',', '，'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// One buffer per profile list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    /// Discipline tags
    Disciplines,
    /// Keyword tags
    Keywords,
    /// Journal preferences
    JournalPreferences,
}

/// Free-text buffers live only while editing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditBuffer {
    /// Comma separated disciplines
    pub disciplines: String,
    /// Comma separated keywords
    pub keywords: String,
    /// Comma separated journals
    pub journal_preferences: String,
}

impl EditBuffer {
    /// Seed buffers from a profile
    #[must_use]
    pub fn from_profile(profile: &ResearchProfile) -> Self {
        Self {
            disciplines: profile.disciplines.join(JOIN_SEPARATOR),
            keywords: profile.keywords.join(JOIN_SEPARATOR),
            journal_preferences: profile.journal_preferences.join(JOIN_SEPARATOR),
        }
    }

    /// Convert every buffer to a tag list
    #[must_use]
    pub fn normalize(&self) -> ResearchProfile {
        ResearchProfile {
            disciplines: normalize_tag_input(&self.disciplines),
            keywords: normalize_tag_input(&self.keywords),
            journal_preferences: normalize_tag_input(&self.journal_preferences),
        }
    }

    fn field_mut(&mut self, field: ProfileField) -> &mut String {
        match field {
            ProfileField::Disciplines => &mut self.disciplines,
            ProfileField::Keywords => &mut self.keywords,
            ProfileField::JournalPreferences => &mut self.journal_preferences,
        }
    }
}

/// Editor mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    /// Showing the canonical profile
    Viewing,
    /// Editing through buffers
    Editing(EditBuffer),
}

#[derive(Debug)]
struct EditorState {
    canonical: ResearchProfile,
    mode: EditorMode,
}

/// View/edit state machine for the research profile
#[derive(Debug)]
pub struct ProfileEditor {
    remote: Remote,
    saving: BusyFlag,
    state: Mutex<EditorState>,
    last_error: Mutex<Option<ServiceError>>,
}

impl ProfileEditor {
    /// Editor over an empty profile, in viewing mode
    #[must_use]
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            saving: BusyFlag::new(),
            state: Mutex::new(EditorState {
                canonical: ResearchProfile::default(),
                mode: EditorMode::Viewing,
            }),
            last_error: Mutex::new(None),
        }
    }

    /// Replace the canonical profile from a bootstrap and return to viewing
    pub(crate) fn seed(&self, profile: ResearchProfile) {
        let mut state = self.state.lock();
        state.canonical = profile;
        state.mode = EditorMode::Viewing;
        self.last_error.lock().take();
    }

    /// Canonical profile as last confirmed by the service
    #[must_use]
    pub fn profile(&self) -> ResearchProfile {
        self.state.lock().canonical.clone()
    }

    /// True iff any canonical list is non-empty
    #[must_use]
    pub fn has_profile(&self) -> bool {
        self.state.lock().canonical.is_configured()
    }

    /// Current mode
    #[must_use]
    pub fn mode(&self) -> EditorMode {
        self.state.lock().mode.clone()
    }

    /// Whether the editor is in editing mode
    #[must_use]
    pub fn is_editing(&self) -> bool {
        matches!(self.state.lock().mode, EditorMode::Editing(_))
    }

    /// Buffers, when editing
    #[must_use]
    pub fn buffer(&self) -> Option<EditBuffer> {
        match &self.state.lock().mode {
            EditorMode::Editing(buffer) => Some(buffer.clone()),
            EditorMode::Viewing => None,
        }
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

    /// Enter editing mode, seeding buffers from the canonical profile
    ///
    /// Already editing: buffers are left as they are.
    pub fn start_edit(&self) {
        let mut state = self.state.lock();
        if let EditorMode::Viewing = state.mode {
            state.mode = EditorMode::Editing(EditBuffer::from_profile(&state.canonical));
            tracing::debug!("profile editing started");
        }
    }

    /// Leave editing mode, discarding buffers
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        if let EditorMode::Editing(_) = state.mode {
            state.mode = EditorMode::Viewing;
            tracing::debug!("profile editing cancelled");
        }
    }

    /// Replace one buffer's text
    ///
    /// # Errors
    /// - `WorkspaceError::NotEditing` in viewing mode
    pub fn set_field(&self, field: ProfileField, text: impl Into<String>) -> Result<(), WorkspaceError> {
        match &mut self.state.lock().mode {
            EditorMode::Editing(buffer) => {
                *buffer.field_mut(field) = text.into();
                Ok(())
            }
            EditorMode::Viewing => Err(WorkspaceError::NotEditing),
        }
    }

    /// Normalize buffers and submit them
    ///
    /// On success the server's echo becomes canonical and the editor returns to
    /// viewing. On failure the editor stays in editing mode with its buffers.
    ///
    /// # Errors
    /// - `WorkspaceError::Busy` while a save is in flight
    /// - `WorkspaceError::NotEditing` in viewing mode
    /// - `WorkspaceError::Unauthenticated` without a credential
    /// - `WorkspaceError::Request` if the service call fails
    /// - `WorkspaceError::SessionEnded` if the session ended before the reply
    #[tracing::instrument(skip(self))]
    pub async fn save(&self) -> Result<ResearchProfile, WorkspaceError> {
        let _guard = self
            .saving
            .try_acquire()
            .ok_or(WorkspaceError::Busy(Action::SaveProfile))?;
        let submitted = self.buffer().ok_or(WorkspaceError::NotEditing)?.normalize();
        let ticket = self.remote.ticket()?;

        tracing::info!(
            disciplines = submitted.disciplines.len(),
            keywords = submitted.keywords.len(),
            journals = submitted.journal_preferences.len(),
            "saving research profile"
        );

        let result = self
            .remote
            .service()
            .update_research_profile(ticket.credential(), &submitted)
            .await;

        self.remote
            .apply(&ticket, Action::SaveProfile, || match result {
                Ok(confirmed) => {
                    let mut state = self.state.lock();
                    state.canonical = confirmed.clone();
                    state.mode = EditorMode::Viewing;
                    self.last_error.lock().take();
                    Ok(confirmed)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "research profile save failed");
                    *self.last_error.lock() = Some(e.clone());
                    Err(WorkspaceError::request(Action::SaveProfile, e))
                }
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockDigestService;
    use crate::test_support::remote_with;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn normalize_mixed_delimiters() {
        assert_eq!(
            normalize_tag_input("a, b，c,, d "),
            tags(&["a", "b", "c", "d"])
        );
    }

    #[test]
    fn normalize_empty_and_blank() {
        assert!(normalize_tag_input("").is_empty());
        assert!(normalize_tag_input(" ,， , ").is_empty());
    }

    #[test]
    fn normalize_keeps_duplicates_and_inner_spaces() {
        assert_eq!(
            normalize_tag_input("machine learning, ML, machine learning"),
            tags(&["machine learning", "ML", "machine learning"])
        );
    }

    #[test]
    fn buffer_seeds_with_comma_space() {
        let profile = ResearchProfile {
            disciplines: tags(&["physics", "biology"]),
            keywords: vec![],
            journal_preferences: tags(&["Nature"]),
        };
        let buffer = EditBuffer::from_profile(&profile);
        assert_eq!(buffer.disciplines, "physics, biology");
        assert_eq!(buffer.keywords, "");
        assert_eq!(buffer.normalize(), profile);
    }

    proptest! {
        #[test]
        fn prop_normalized_tags_are_trimmed_and_non_empty(raw in ".{0,64}") {
            for tag in normalize_tag_input(&raw) {
                prop_assert!(!tag.is_empty());
                prop_assert_eq!(tag.trim(), tag.as_str());
                prop_assert!(!tag.contains(',') && !tag.contains('，'));
            }
        }

        #[test]
        fn prop_join_then_normalize_is_identity(
            list in proptest::collection::vec("[a-z][a-z ]{0,8}[a-z]", 0..6)
        ) {
            prop_assert_eq!(normalize_tag_input(&list.join(JOIN_SEPARATOR)), list);
        }
    }

    #[tokio::test]
    async fn start_edit_and_cancel_make_no_remote_call() {
        // no expectations: any call would panic
        let editor = ProfileEditor::new(remote_with(MockDigestService::new()).await);
        editor.seed(ResearchProfile {
            keywords: tags(&["graphs"]),
            ..ResearchProfile::default()
        });

        editor.start_edit();
        assert_eq!(editor.buffer().unwrap().keywords, "graphs");
        editor.set_field(ProfileField::Keywords, "changed").unwrap();

        editor.cancel();
        assert_eq!(editor.mode(), EditorMode::Viewing);
        assert_eq!(editor.profile().keywords, tags(&["graphs"]));

        // fresh buffers after cancel
        editor.start_edit();
        assert_eq!(editor.buffer().unwrap().keywords, "graphs");
    }

    #[tokio::test]
    async fn set_field_requires_editing() {
        let editor = ProfileEditor::new(remote_with(MockDigestService::new()).await);
        assert!(matches!(
            editor.set_field(ProfileField::Disciplines, "x"),
            Err(WorkspaceError::NotEditing)
        ));
    }

    #[tokio::test]
    async fn save_applies_server_echo() {
        let mut mock = MockDigestService::new();
        mock.expect_update_research_profile()
            .withf(|_, profile| profile.disciplines == vec!["cs".to_string(), "math".to_string()])
            .times(1)
            .returning(|_, _| {
                Ok(ResearchProfile {
                    disciplines: vec!["Computer Science".to_string(), "Mathematics".to_string()],
                    ..ResearchProfile::default()
                })
            });

        let editor = ProfileEditor::new(remote_with(mock).await);
        editor.start_edit();
        editor.set_field(ProfileField::Disciplines, "cs，math").unwrap();

        let saved = editor.save().await.unwrap();
        assert_eq!(saved.disciplines, tags(&["Computer Science", "Mathematics"]));
        assert_eq!(editor.profile(), saved);
        assert!(!editor.is_editing());
        assert!(editor.has_profile());
        assert!(!editor.is_saving());
    }

    #[tokio::test]
    async fn save_of_empty_buffers_clears_profile() {
        let mut mock = MockDigestService::new();
        mock.expect_update_research_profile()
            .times(1)
            .returning(|_, profile| Ok(ResearchProfile::clone(profile)));

        let editor = ProfileEditor::new(remote_with(mock).await);
        editor.start_edit();

        let saved = editor.save().await.unwrap();
        assert_eq!(saved, ResearchProfile::default());
        assert!(!editor.has_profile());
    }

    #[tokio::test]
    async fn failed_save_stays_editing() {
        let mut mock = MockDigestService::new();
        mock.expect_update_research_profile()
            .times(1)
            .returning(|_, _| Err(ServiceError::Transport("reset".to_string())));

        let editor = ProfileEditor::new(remote_with(mock).await);
        editor.seed(ResearchProfile {
            keywords: tags(&["old"]),
            ..ResearchProfile::default()
        });
        editor.start_edit();
        editor.set_field(ProfileField::Keywords, "new").unwrap();

        assert!(editor.save().await.is_err());
        assert!(editor.is_editing());
        assert_eq!(editor.buffer().unwrap().keywords, "new");
        assert_eq!(editor.profile().keywords, tags(&["old"]));
        assert!(editor.last_error().is_some());
    }

    #[tokio::test]
    async fn save_outside_editing_is_rejected() {
        let editor = ProfileEditor::new(remote_with(MockDigestService::new()).await);
        assert!(matches!(editor.save().await, Err(WorkspaceError::NotEditing)));
        assert!(!editor.is_saving());
    }
}
