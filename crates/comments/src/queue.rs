//! Per-thread ordered intent queue.
//!
//! Every mutation for a job's thread is pushed onto that thread's
//! unbounded channel and applied to the backend by one worker task, in
//! submission order. The worker holds only a weak reference to the store
//! so dropping the last store handle ends it.

use std::sync::Weak;

use devboards_core::{Comment, JobId, NewComment};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::CommentError;
use crate::store::StoreInner;
use crate::thread::IntentToken;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, CommentError>>;

/// The backend half of a mutation. The optimistic half is already in the
/// thread by the time an intent is queued.
pub(crate) enum IntentKind {
    Add {
        comment: NewComment,
        reply: Reply<Comment>,
    },
    /// The target id is read from the pending entry when processed, so
    /// edits of a just-added comment follow its server id.
    Edit { text: String, reply: Reply<Comment> },
    Delete { reply: Reply<()> },
}

pub(crate) struct Intent {
    pub(crate) token: IntentToken,
    pub(crate) kind: IntentKind,
}

/// Handle to one thread's worker.
pub(crate) struct ThreadQueue {
    sender: mpsc::UnboundedSender<Intent>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ThreadQueue {
    /// Spawn the worker for `job_id`. Must be called within a tokio runtime.
    pub(crate) fn spawn(store: Weak<StoreInner>, job_id: JobId, cancel: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            tracing::debug!(job_id = %job_id, "Comment queue started");
            run_queue(store, &job_id, receiver, worker_cancel).await;
            tracing::debug!(job_id = %job_id, "Comment queue exited");
        });
        Self {
            sender,
            cancel,
            handle,
        }
    }

    /// Enqueue an intent. Hands it back if the worker is gone.
    pub(crate) fn submit(&self, intent: Intent) -> Result<(), Intent> {
        self.sender.send(intent).map_err(|e| e.0)
    }

    /// Stop the worker. Intents still queued are dropped, which resolves
    /// their callers with [`CommentError::Reset`].
    pub(crate) fn stop(self) -> JoinHandle<()> {
        self.cancel.cancel();
        self.handle
    }
}

async fn run_queue(
    store: Weak<StoreInner>,
    job_id: &JobId,
    mut receiver: mpsc::UnboundedReceiver<Intent>,
    cancel: CancellationToken,
) {
    loop {
        let intent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = receiver.recv() => match next {
                Some(intent) => intent,
                None => return,
            },
        };

        let Some(store) = store.upgrade() else {
            return;
        };
        store.process(job_id, intent).await;
    }
}
