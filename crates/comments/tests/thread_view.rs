mod common;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;
use common::{comment, eventually, ids_and_texts, pair, FakeApi};
use devboards_comments::{CommentError, CommentStore, ThreadEvent};
use devboards_core::{Author, JobId};

#[tokio::test]
async fn ensure_loaded_fetches_once() {
    let api = FakeApi::new();
    api.seed("job-42", vec![comment("c1", "Hi")]);
    let store = CommentStore::new(api.clone());
    let view = store.view("job-42");

    let first = view.ensure_loaded().await.unwrap().unwrap();
    let second = view.ensure_loaded().await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);

    view.refresh().await.unwrap();
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
}

/// Two surfaces on the same job read the same state.
#[tokio::test]
async fn views_of_one_job_share_state() {
    let api = FakeApi::new();
    api.seed("job-42", vec![comment("c1", "Hi")]);
    let store = CommentStore::new(api.clone());
    let detail = store.view("job-42");
    let sidebar = store.view("job-42");

    detail.ensure_loaded().await.unwrap();
    detail
        .add(Author::new("Ann"), "Interested!")
        .await
        .unwrap()
        .unwrap();

    let seen = sidebar.comments().await;
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].text, "Interested!");
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
}

/// A result arriving after unmount is dropped, but the request still
/// completes and lands in the store.
#[tokio::test]
async fn unmounted_view_drops_late_results() {
    let api = FakeApi::new();
    api.seed("job-42", vec![comment("c1", "Hi")]);
    let gate = api.hold_lists();
    let store = CommentStore::new(api.clone());
    let view = store.view("job-42");

    let (result, ()) = tokio::join!(view.ensure_loaded(), async {
        eventually(|| {
            let api = api.clone();
            async move { api.list_calls.load(Ordering::SeqCst) == 1 }
        })
        .await;
        view.unmount();
        gate.add_permits(1);
    });

    assert_matches!(result, Ok(None));
    assert!(!view.is_mounted());

    let job = JobId::from("job-42");
    eventually(|| {
        let store = store.clone();
        let job = job.clone();
        async move { store.is_loaded(&job).await }
    })
    .await;
    assert_eq!(
        ids_and_texts(&store.get_comments(&job).await),
        vec![pair("c1", "Hi")]
    );
}

#[tokio::test]
async fn unmounted_view_ignores_new_requests() {
    let api = FakeApi::new();
    let store = CommentStore::new(api.clone());
    let view = store.view("job-42");
    view.unmount();
    view.unmount();

    assert_matches!(view.refresh().await, Ok(None));
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
}

/// Errors still reach a mounted view.
#[tokio::test]
async fn mounted_view_reports_failures() {
    let api = FakeApi::new();
    api.set_offline(true);
    let store = CommentStore::new(api.clone());
    let view = store.view("job-42");

    assert_matches!(
        view.ensure_loaded().await,
        Err(CommentError::FetchFailed { .. })
    );
    assert_matches!(
        view.add(Author::anonymous(), " ").await,
        Err(CommentError::InvalidInput(_))
    );
}

#[tokio::test]
async fn changes_can_be_filtered_to_one_job() {
    let api = FakeApi::new();
    api.seed("job-1", vec![comment("a1", "one")]);
    api.seed("job-2", vec![comment("b1", "two")]);
    let store = CommentStore::new(api.clone());
    let view = store.view("job-2");
    let mut changes = view.changes();

    store.fetch_comments(&JobId::from("job-1")).await.unwrap();
    view.ensure_loaded().await.unwrap();

    let mut relevant = Vec::new();
    while let Ok(event) = changes.try_recv() {
        if event.concerns(view.job_id()) {
            relevant.push(event);
        }
    }
    assert_eq!(
        relevant,
        vec![ThreadEvent::Fetched {
            job_id: JobId::from("job-2")
        }]
    );
}
