use digest_test_utils::{history, paper, ready_workspace, Call, Endpoint, FakeDigestService};
use digest_workspace::{DetailLoad, DigestId, WorkspaceError};
use pretty_assertions::assert_eq;

fn with_papers() -> FakeDigestService {
    FakeDigestService::new()
        .with_history(history(3))
        .with_papers(1, vec![paper(10, "Paper from digest one")])
        .with_papers(2, vec![paper(20, "Paper from digest two"), paper(21, "Another")])
}

#[tokio::test]
async fn test_open_digest_loads_papers() {
    let h = ready_workspace(with_papers()).await;

    let outcome = h.workspace.open_digest(DigestId(2)).await.unwrap();

    assert_eq!(outcome, DetailLoad::Loaded(2));
    assert_eq!(h.workspace.detail().selected_id(), Some(DigestId(2)));
    assert_eq!(
        h.workspace.detail().selected_sent_at().as_deref(),
        Some("2024-01-02T08:00:00Z")
    );
    assert_eq!(h.service.calls(), vec![Call::DigestDetail(DigestId(2))]);
}

#[tokio::test]
async fn test_late_response_for_previous_selection_is_dropped() {
    let h = ready_workspace(with_papers()).await;
    let gate = h.service.hold(Endpoint::DigestDetail);

    let (first, second) = tokio::join!(h.workspace.open_digest(DigestId(1)), async {
        while h.service.count(Endpoint::DigestDetail) == 0 {
            tokio::task::yield_now().await;
        }
        let second = h.workspace.open_digest(DigestId(2)).await;
        gate.release();
        second
    });

    assert_eq!(first.unwrap(), DetailLoad::Superseded);
    assert_eq!(second.unwrap(), DetailLoad::Loaded(2));

    let titles: Vec<String> = h.workspace.detail().papers().into_iter().map(|p| p.title).collect();
    assert_eq!(titles, vec!["Paper from digest two", "Another"]);
    assert_eq!(h.workspace.detail().selected_id(), Some(DigestId(2)));
    assert!(!h.workspace.detail().is_loading());
}

#[tokio::test]
async fn test_close_while_loading_drops_response() {
    let h = ready_workspace(with_papers()).await;
    let gate = h.service.hold(Endpoint::DigestDetail);

    let (outcome, ()) = tokio::join!(h.workspace.open_digest(DigestId(1)), async {
        while h.service.count(Endpoint::DigestDetail) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(h.workspace.detail().is_loading());
        h.workspace.close_digest();
        gate.release();
    });

    assert_eq!(outcome.unwrap(), DetailLoad::Superseded);
    assert!(!h.workspace.detail().is_open());
    assert!(h.workspace.detail().papers().is_empty());
}

#[tokio::test]
async fn test_failed_detail_shows_empty_list() {
    // digest 3 has no papers registered, so the fake answers 404
    let h = ready_workspace(with_papers()).await;

    let err = h.workspace.open_digest(DigestId(3)).await.unwrap_err();

    assert!(matches!(err, WorkspaceError::Request { .. }));
    assert_eq!(h.workspace.detail().selected_id(), Some(DigestId(3)));
    assert!(h.workspace.detail().papers().is_empty());
    assert!(!h.workspace.detail().is_loading());

    // the rest of the workspace is untouched
    assert_eq!(h.workspace.feed().items().len(), 3);
}

#[tokio::test]
async fn test_open_digest_outside_history_makes_no_call() {
    let h = ready_workspace(with_papers()).await;

    assert!(matches!(
        h.workspace.open_digest(DigestId(42)).await,
        Err(WorkspaceError::UnknownDigest(DigestId(42)))
    ));
    assert!(h.service.calls().is_empty());
}
