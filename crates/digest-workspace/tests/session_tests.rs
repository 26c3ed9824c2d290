use digest_test_utils::{
    history, ready_workspace, signed_in_workspace, user, Endpoint, FakeDigestService,
};
use digest_workspace::{
    Action, Credential, CredentialStore, FileCredentialStore, Phase, ProfileField, Workspace,
    WorkspaceConfig, WorkspaceError,
};
use std::sync::Arc;

#[tokio::test]
async fn test_logout_clears_credential_and_state() {
    let h = ready_workspace(FakeDigestService::new().with_history(history(4))).await;
    let mut phases = h.workspace.session().subscribe();

    h.workspace.logout().await.unwrap();

    phases.changed().await.unwrap();
    assert_eq!(*phases.borrow(), Phase::Unauthenticated);
    assert!(h.store.is_empty());
    assert!(h.workspace.feed().items().is_empty());
    assert!(matches!(
        h.workspace.test_digest().trigger().await,
        Err(WorkspaceError::Unauthenticated)
    ));
    assert!(h.service.calls().is_empty());
}

#[tokio::test]
async fn test_file_store_round_trip_through_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("token");
    let store = Arc::new(FileCredentialStore::new(&path));
    store.save(&Credential::new("stored-token")).await.unwrap();

    let config = WorkspaceConfig::new().with_credential_path(&path);
    let service = Arc::new(FakeDigestService::new().with_history(history(1)));
    let workspace = Workspace::open(config, service, store).await.unwrap();

    workspace.load().await.unwrap();
    assert_eq!(workspace.phase(), Phase::Ready);
    assert_eq!(workspace.session().credential().unwrap().token(), "stored-token");

    workspace.logout().await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_snapshot_reflects_workspace() {
    let h = ready_workspace(FakeDigestService::new().with_history(history(12))).await;

    let snapshot = h.workspace.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.visible_digests.len(), 10);
    assert_eq!(snapshot.hidden_digests, 2);
    assert!(snapshot.detail.is_none());
    assert!(!snapshot.has_profile);
}

#[tokio::test]
async fn test_toggle_reply_after_logout_is_dropped() {
    let h = ready_workspace(FakeDigestService::new().with_user(user(false))).await;
    let gate = h.service.hold(Endpoint::ToggleSubscription);

    let (toggled, ()) = tokio::join!(h.workspace.subscription().toggle(), async {
        while h.service.count(Endpoint::ToggleSubscription) == 0 {
            tokio::task::yield_now().await;
        }
        h.workspace.logout().await.unwrap();
        gate.release();
    });

    assert!(matches!(
        toggled,
        Err(WorkspaceError::SessionEnded(Action::ToggleSubscription))
    ));
    assert_eq!(h.workspace.phase(), Phase::Unauthenticated);
    assert!(h.workspace.session().user().is_none());
    assert!(!h.workspace.subscription().enabled());
    assert!(!h.workspace.subscription().is_busy());
}

#[tokio::test]
async fn test_history_refresh_after_logout_is_dropped() {
    let h = ready_workspace(FakeDigestService::new().with_history(history(4))).await;
    let gate = h.service.hold(Endpoint::DigestHistory);

    let (triggered, ()) = tokio::join!(h.workspace.test_digest().trigger(), async {
        while h.service.count(Endpoint::DigestHistory) == 0 {
            tokio::task::yield_now().await;
        }
        h.workspace.logout().await.unwrap();
        gate.release();
    });

    assert!(matches!(
        triggered,
        Err(WorkspaceError::SessionEnded(Action::TestDigest))
    ));
    assert_eq!(h.workspace.phase(), Phase::Unauthenticated);
    assert!(h.workspace.feed().items().is_empty());
    assert_eq!(h.workspace.test_digest().message(), "");
}

#[tokio::test]
async fn test_profile_save_reply_after_logout_is_dropped() {
    let h = ready_workspace(FakeDigestService::new()).await;
    let gate = h.service.hold(Endpoint::UpdateResearchProfile);
    let editor = h.workspace.profile();
    editor.start_edit();
    editor.set_field(ProfileField::Keywords, "ecology").unwrap();

    let (saved, ()) = tokio::join!(editor.save(), async {
        while h.service.count(Endpoint::UpdateResearchProfile) == 0 {
            tokio::task::yield_now().await;
        }
        h.workspace.logout().await.unwrap();
        gate.release();
    });

    assert!(matches!(
        saved,
        Err(WorkspaceError::SessionEnded(Action::SaveProfile))
    ));
    assert!(!editor.has_profile());
    assert!(!editor.is_editing());
}

#[tokio::test]
async fn test_bootstrap_reply_after_logout_is_dropped() {
    let h = signed_in_workspace(FakeDigestService::new().with_history(history(3))).await;
    let gate = h.service.hold(Endpoint::CurrentUser);

    let (loaded, ()) = tokio::join!(h.workspace.load(), async {
        while h.service.calls().len() < 4 {
            tokio::task::yield_now().await;
        }
        h.workspace.logout().await.unwrap();
        gate.release();
    });

    assert!(matches!(
        loaded,
        Err(WorkspaceError::SessionEnded(Action::Bootstrap))
    ));
    assert_eq!(h.workspace.phase(), Phase::Unauthenticated);
    assert!(h.workspace.session().user().is_none());
    assert!(h.workspace.feed().items().is_empty());
}
