//! The comment thread store.
//!
//! [`CommentStore`] is a cheap-to-clone handle around shared state. Build
//! one per application session and inject it into every surface that
//! shows comments; call [`reset`](CommentStore::reset) on logout.
//!
//! # Consistency
//!
//! - Overlapping fetches for one job share a single backend request.
//!   Fetches run as spawned tasks, so an issued request always completes
//!   even if every caller stops waiting.
//! - A fetch result is applied only if nothing newer (another fetch, or a
//!   confirmed mutation) has settled since it started, and the store was
//!   not reset in between.
//! - Mutations become visible immediately as pending intents and are
//!   applied to the backend by the thread's queue worker in submission
//!   order. Each confirmation or rollback is reconciled before the next
//!   intent is sent.
//! - Mutations submitted after [`shutdown`](CommentStore::shutdown) fail
//!   with [`CommentError::Reset`] and never touch the thread.
//!
//! A job's queue worker lives from its first mutation until `reset` or
//! `shutdown`, so there is at most one idle task per job mutated in the
//! session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use devboards_core::comment::validate_comment_text;
use devboards_core::{ApiError, Author, Comment, CommentId, CoreError, JobId, NewComment};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{broadcast, oneshot, RwLock};
use tokio_util::sync::CancellationToken;

use crate::api::CommentApi;
use crate::error::CommentError;
use crate::events::{self, ThreadEvent};
use crate::queue::{Intent, IntentKind, ThreadQueue};
use crate::thread::{ApplyOutcome, CommentThread, IntentToken, PendingChange};
use crate::view::CommentThreadView;

/// How long [`CommentStore::shutdown`] waits for each queue worker.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type FetchResult = Result<Vec<Comment>, CommentError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Point-in-time copy of one thread's observable state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadSnapshot {
    /// What readers see: confirmed comments with pending changes applied.
    pub comments: Vec<Comment>,
    /// At least one fetch has been applied.
    pub loaded: bool,
    /// A fetch is in flight.
    pub fetching: bool,
    /// Number of mutations awaiting backend confirmation.
    pub pending: usize,
}

/// Single source of truth for comment threads, keyed by job.
#[derive(Clone)]
pub struct CommentStore {
    inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    api: Arc<dyn CommentApi>,
    state: RwLock<StoreState>,
    events: broadcast::Sender<ThreadEvent>,
    /// Master token; every queue worker runs on a child of it.
    cancel: CancellationToken,
    next_token: AtomicU64,
}

#[derive(Default)]
struct StoreState {
    threads: HashMap<JobId, CommentThread>,
    inflight: HashMap<JobId, InFlightFetch>,
    queues: HashMap<JobId, ThreadQueue>,
    /// Bumped by `reset`; results from an older generation are dropped.
    generation: u64,
}

struct InFlightFetch {
    started: u64,
    generation: u64,
    result: SharedFetch,
}

/// Where a mutation lands.
enum Target<'a> {
    Job(&'a JobId),
    /// Whichever cached thread currently shows this comment.
    Comment(&'a CommentId),
}

impl CommentStore {
    /// Create an empty store backed by `api`.
    pub fn new(api: Arc<dyn CommentApi>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                api,
                state: RwLock::new(StoreState::default()),
                events: events::channel(),
                cancel: CancellationToken::new(),
                next_token: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribe to change notifications for every thread.
    pub fn subscribe(&self) -> broadcast::Receiver<ThreadEvent> {
        self.inner.events.subscribe()
    }

    /// Accessor for one UI surface showing `job_id`.
    pub fn view(&self, job_id: impl Into<JobId>) -> CommentThreadView {
        CommentThreadView::new(self.clone(), job_id.into())
    }

    // ---- reads ----

    /// Current comments of `job_id`; empty if the thread was never
    /// fetched. Never triggers a fetch.
    pub async fn get_comments(&self, job_id: &JobId) -> Vec<Comment> {
        self.inner
            .state
            .read()
            .await
            .threads
            .get(job_id)
            .map(CommentThread::view)
            .unwrap_or_default()
    }

    /// Observable state of `job_id`'s thread, including whether a fetch
    /// is in flight and how many mutations are unconfirmed.
    pub async fn snapshot(&self, job_id: &JobId) -> ThreadSnapshot {
        let state = self.inner.state.read().await;
        let fetching = state.inflight.contains_key(job_id);
        match state.threads.get(job_id) {
            Some(thread) => ThreadSnapshot {
                comments: thread.view(),
                loaded: thread.is_loaded(),
                fetching,
                pending: thread.pending_count(),
            },
            None => ThreadSnapshot {
                fetching,
                ..Default::default()
            },
        }
    }

    /// Whether a fetch for `job_id` has been applied since the last reset.
    pub async fn is_loaded(&self, job_id: &JobId) -> bool {
        self.inner
            .state
            .read()
            .await
            .threads
            .get(job_id)
            .is_some_and(CommentThread::is_loaded)
    }

    // ---- fetch ----

    /// Load `job_id`'s thread from the backend.
    ///
    /// A call made while a fetch for the same job is in flight joins it
    /// instead of issuing another request. On failure the cached thread is
    /// left as it was.
    pub async fn fetch_comments(&self, job_id: &JobId) -> Result<Vec<Comment>, CommentError> {
        let fetch = {
            let mut state = self.inner.state.write().await;
            match state.inflight.get(job_id) {
                Some(inflight) => {
                    tracing::debug!(job_id = %job_id, "Joining in-flight comment fetch");
                    inflight.result.clone()
                }
                None => {
                    let generation = state.generation;
                    let started = state
                        .threads
                        .entry(job_id.clone())
                        .or_default()
                        .begin_fetch();
                    let result = self.inner.spawn_fetch(job_id.clone(), started, generation);
                    state.inflight.insert(
                        job_id.clone(),
                        InFlightFetch {
                            started,
                            generation,
                            result: result.clone(),
                        },
                    );
                    result
                }
            }
        };
        fetch.await
    }

    // ---- mutations ----

    /// Post a comment on `job_id`.
    ///
    /// The comment is visible immediately under a temporary id. Resolves
    /// with the stored record once the backend confirms, or with
    /// [`CommentError::AddFailed`] after the optimistic entry was removed.
    /// Blank text is rejected locally with [`CommentError::InvalidInput`].
    pub async fn add_comment(
        &self,
        job_id: &JobId,
        author: Author,
        text: &str,
    ) -> Result<Comment, CommentError> {
        let text = validate_comment_text(text).map_err(invalid_input)?;
        let local = Comment::pending(author.clone(), text.clone());
        let (reply, rx) = oneshot::channel();

        self.inner
            .submit(
                Target::Job(job_id),
                PendingChange::Add(local),
                IntentKind::Add {
                    comment: NewComment { author, text },
                    reply,
                },
            )
            .await?;

        rx.await.unwrap_or(Err(CommentError::Reset))
    }

    /// Change a comment's text, wherever it is cached.
    ///
    /// The new text is shown at once and reverted if the backend refuses
    /// it ([`CommentError::EditFailed`]).
    pub async fn edit_comment(&self, id: &CommentId, text: &str) -> Result<Comment, CommentError> {
        let text = validate_comment_text(text).map_err(invalid_input)?;
        let (reply, rx) = oneshot::channel();

        self.inner
            .submit(
                Target::Comment(id),
                PendingChange::Edit {
                    id: id.clone(),
                    text: text.clone(),
                },
                IntentKind::Edit { text, reply },
            )
            .await?;

        rx.await.unwrap_or(Err(CommentError::Reset))
    }

    /// Remove a comment, wherever it is cached.
    ///
    /// The comment disappears at once; if the backend refuses, it is
    /// restored at its original position ([`CommentError::DeleteFailed`]).
    pub async fn delete_comment(&self, id: &CommentId) -> Result<(), CommentError> {
        let (reply, rx) = oneshot::channel();

        self.inner
            .submit(
                Target::Comment(id),
                PendingChange::Delete { id: id.clone() },
                IntentKind::Delete { reply },
            )
            .await?;

        rx.await.unwrap_or(Err(CommentError::Reset))
    }

    // ---- lifecycle ----

    /// Drop every cached thread and stop every queue (e.g. on logout).
    ///
    /// Unsettled mutations resolve with [`CommentError::Reset`]; fetches
    /// still in flight are discarded when they land.
    pub async fn reset(&self) {
        let mut state = self.inner.state.write().await;
        state.generation += 1;
        for (_, queue) in state.queues.drain() {
            drop(queue.stop());
        }
        let threads = state.threads.len();
        state.threads.clear();
        state.inflight.clear();
        let generation = state.generation;
        drop(state);

        tracing::info!(threads, generation, "Comment store reset");
        events::publish(&self.inner.events, ThreadEvent::Reset);
    }

    /// Stop all queue workers, waiting briefly for each to exit.
    ///
    /// Unconfirmed changes are reverted; cached confirmed comments stay
    /// readable.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down comment store");
        self.inner.cancel.cancel();

        let queues: Vec<(JobId, ThreadQueue)> = {
            let mut state = self.inner.state.write().await;
            for thread in state.threads.values_mut() {
                thread.discard_pending();
            }
            state.queues.drain().collect()
        };

        for (job_id, queue) in queues {
            tracing::debug!(job_id = %job_id, "Stopping comment queue");
            let _ = tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, queue.stop()).await;
        }

        tracing::info!("Comment store shut down complete");
    }
}

impl StoreInner {
    fn next_token(&self) -> IntentToken {
        IntentToken(self.next_token.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Run a fetch on its own task and expose its result to any number of
    /// waiters.
    fn spawn_fetch(self: &Arc<Self>, job_id: JobId, started: u64, generation: u64) -> SharedFetch {
        let store = Arc::clone(self);
        let task_job_id = job_id.clone();
        let handle =
            tokio::spawn(async move { store.run_fetch(task_job_id, started, generation).await });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(CommentError::FetchFailed {
                    job_id,
                    source: ApiError::Transport(format!("fetch task failed: {e}")),
                })
            })
        }
        .boxed()
        .shared()
    }

    async fn run_fetch(&self, job_id: JobId, started: u64, generation: u64) -> FetchResult {
        tracing::debug!(job_id = %job_id, started, "Fetching comments");
        let result = self.api.list_comments(&job_id).await;

        let mut state = self.state.write().await;
        let ours = state
            .inflight
            .get(&job_id)
            .is_some_and(|f| f.started == started && f.generation == generation);
        if ours {
            state.inflight.remove(&job_id);
        }

        if state.generation != generation {
            tracing::debug!(job_id = %job_id, "Discarding comment fetch from before reset");
            return Err(CommentError::Reset);
        }

        let comments = match result {
            Ok(comments) => comments,
            Err(source) => {
                drop(state);
                let error = CommentError::FetchFailed {
                    job_id: job_id.clone(),
                    source,
                };
                tracing::warn!(job_id = %job_id, error = %error, "Comment fetch failed");
                events::publish(
                    &self.events,
                    ThreadEvent::FetchFailed {
                        job_id,
                        error: error.clone(),
                    },
                );
                return Err(error);
            }
        };

        let received = comments.len();
        let thread = state.threads.entry(job_id.clone()).or_default();
        let outcome = thread.apply_fetch(started, comments);
        let view = thread.view();
        drop(state);

        match outcome {
            ApplyOutcome::Applied => {
                tracing::debug!(job_id = %job_id, received, "Comment fetch applied");
                events::publish(&self.events, ThreadEvent::Fetched { job_id });
            }
            ApplyOutcome::Stale => {
                tracing::debug!(job_id = %job_id, started, "Discarding stale comment fetch");
            }
        }
        Ok(view)
    }

    /// Apply the optimistic half of a mutation and queue the backend half.
    async fn submit(
        self: &Arc<Self>,
        target: Target<'_>,
        change: PendingChange,
        kind: IntentKind,
    ) -> Result<(), CommentError> {
        let token = self.next_token();

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        // `shutdown` cancels before taking the lock, so a worker spawned
        // now would exit without settling the intent.
        if self.cancel.is_cancelled() {
            tracing::debug!(token = %token, "Rejecting comment mutation after shutdown");
            return Err(CommentError::Reset);
        }

        let job_id = match target {
            Target::Job(job_id) => job_id.clone(),
            Target::Comment(id) => state
                .threads
                .iter()
                .find(|(_, thread)| thread.shows(id))
                .map(|(job_id, _)| job_id.clone())
                .ok_or_else(|| CommentError::NotFound(id.clone()))?,
        };

        let thread = state.threads.entry(job_id.clone()).or_default();
        thread.push_pending(token, change);

        let queue = state.queues.entry(job_id.clone()).or_insert_with(|| {
            ThreadQueue::spawn(Arc::downgrade(self), job_id.clone(), self.cancel.child_token())
        });

        if queue.submit(Intent { token, kind }).is_err() {
            thread.rollback(token);
            return Err(CommentError::Reset);
        }

        tracing::debug!(job_id = %job_id, token = %token, "Queued comment mutation");
        // Published under the lock: the worker cannot settle before this.
        events::publish(&self.events, ThreadEvent::Optimistic { job_id, token });
        drop(guard);
        Ok(())
    }

    /// Send one queued intent to the backend and reconcile the thread.
    pub(crate) async fn process(&self, job_id: &JobId, intent: Intent) {
        let token = intent.token;
        match intent.kind {
            IntentKind::Add { comment, reply } => {
                let outcome = match self.api.create_comment(job_id, &comment).await {
                    Ok(stored) => {
                        self.settle(job_id, token, move |thread| {
                            if thread.confirm_add(token, stored.clone()) {
                                Ok(stored)
                            } else {
                                Err(CommentError::Reset)
                            }
                        })
                        .await
                    }
                    Err(source) => {
                        self.settle::<Comment>(job_id, token, |thread| {
                            Err(rolled_back(thread, token, || CommentError::AddFailed {
                                job_id: job_id.clone(),
                                source,
                            }))
                        })
                        .await
                    }
                };
                let _ = reply.send(outcome);
            }

            IntentKind::Edit { text, reply } => {
                let outcome = match self.target_of(job_id, token).await {
                    None => Err(CommentError::Reset),
                    Some(id) if id.is_temporary() => {
                        // The add this edit depended on was rolled back.
                        self.settle::<Comment>(job_id, token, |thread| {
                            Err(rolled_back(thread, token, || CommentError::EditFailed {
                                id,
                                reason: "comment was never created".to_string(),
                            }))
                        })
                        .await
                    }
                    Some(id) => match self.api.update_comment(&id, &text).await {
                        Ok(stored) => {
                            self.settle(job_id, token, move |thread| {
                                if thread.confirm_edit(token, stored.clone()) {
                                    Ok(stored)
                                } else {
                                    Err(CommentError::Reset)
                                }
                            })
                            .await
                        }
                        Err(source) => {
                            self.settle::<Comment>(job_id, token, |thread| {
                                Err(rolled_back(thread, token, || CommentError::EditFailed {
                                    id,
                                    reason: source.to_string(),
                                }))
                            })
                            .await
                        }
                    },
                };
                let _ = reply.send(outcome);
            }

            IntentKind::Delete { reply } => {
                let outcome = match self.target_of(job_id, token).await {
                    None => Err(CommentError::Reset),
                    Some(id) if id.is_temporary() => {
                        // Never created on the backend, so nothing to delete.
                        self.settle(job_id, token, |thread| {
                            thread.rollback(token);
                            Ok(())
                        })
                        .await
                    }
                    Some(id) => {
                        let result = match self.api.delete_comment(&id).await {
                            Err(e) if e.is_not_found() => {
                                tracing::debug!(comment_id = %id, "Comment already gone on backend");
                                Ok(())
                            }
                            other => other,
                        };
                        match result {
                            Ok(()) => {
                                self.settle(job_id, token, |thread| {
                                    if thread.confirm_delete(token, &id) {
                                        Ok(())
                                    } else {
                                        Err(CommentError::Reset)
                                    }
                                })
                                .await
                            }
                            Err(source) => {
                                self.settle::<()>(job_id, token, |thread| {
                                    Err(rolled_back(thread, token, || CommentError::DeleteFailed {
                                        id: id.clone(),
                                        source,
                                    }))
                                })
                                .await
                            }
                        }
                    }
                };
                let _ = reply.send(outcome);
            }
        }
    }

    /// Current target of an edit/delete intent, if it is still pending.
    async fn target_of(&self, job_id: &JobId, token: IntentToken) -> Option<CommentId> {
        self.state
            .read()
            .await
            .threads
            .get(job_id)
            .and_then(|thread| thread.pending_target(token))
    }

    /// Reconcile a thread after a backend round trip and announce it.
    async fn settle<T>(
        &self,
        job_id: &JobId,
        token: IntentToken,
        apply: impl FnOnce(&mut CommentThread) -> Result<T, CommentError>,
    ) -> Result<T, CommentError> {
        let outcome = {
            let mut state = self.state.write().await;
            match state.threads.get_mut(job_id) {
                Some(thread) => apply(thread),
                None => Err(CommentError::Reset),
            }
        };

        match &outcome {
            Ok(_) => {
                tracing::debug!(job_id = %job_id, token = %token, "Comment mutation confirmed");
                events::publish(
                    &self.events,
                    ThreadEvent::Confirmed {
                        job_id: job_id.clone(),
                        token,
                    },
                );
            }
            Err(CommentError::Reset) => {
                tracing::debug!(job_id = %job_id, token = %token, "Comment mutation dropped by reset");
            }
            Err(error) => {
                tracing::warn!(job_id = %job_id, token = %token, error = %error, "Comment mutation rolled back");
                events::publish(
                    &self.events,
                    ThreadEvent::RolledBack {
                        job_id: job_id.clone(),
                        token,
                        error: error.clone(),
                    },
                );
            }
        }
        outcome
    }
}

/// Roll back `token` and return the failure to report, or
/// [`CommentError::Reset`] if the intent no longer exists.
fn rolled_back(
    thread: &mut CommentThread,
    token: IntentToken,
    error: impl FnOnce() -> CommentError,
) -> CommentError {
    if thread.rollback(token) {
        error()
    } else {
        CommentError::Reset
    }
}

fn invalid_input(err: CoreError) -> CommentError {
    let CoreError::Validation(msg) = err;
    CommentError::InvalidInput(msg)
}
