//! Change notifications for UI surfaces showing comment threads.
//!
//! The store publishes a [`ThreadEvent`] on a `tokio::sync::broadcast`
//! channel after every visible change. Consumers re-read the thread with
//! [`CommentStore::get_comments`](crate::CommentStore::get_comments)
//! rather than patching their own copies.

use devboards_core::JobId;
use tokio::sync::broadcast;

use crate::error::CommentError;
use crate::thread::IntentToken;

/// Buffer capacity of the event channel. Slow receivers observe
/// `RecvError::Lagged` and should simply re-read.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    /// A fetch result replaced the thread's confirmed comments.
    Fetched { job_id: JobId },

    /// A fetch failed; cached comments are unchanged.
    FetchFailed { job_id: JobId, error: CommentError },

    /// An optimistic change became visible.
    Optimistic { job_id: JobId, token: IntentToken },

    /// The backend confirmed a change.
    Confirmed { job_id: JobId, token: IntentToken },

    /// The backend rejected a change and it was reverted.
    RolledBack {
        job_id: JobId,
        token: IntentToken,
        error: CommentError,
    },

    /// Every thread was dropped (logout or full reset).
    Reset,
}

impl ThreadEvent {
    /// The job whose thread changed; `None` for store-wide events.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            ThreadEvent::Fetched { job_id }
            | ThreadEvent::FetchFailed { job_id, .. }
            | ThreadEvent::Optimistic { job_id, .. }
            | ThreadEvent::Confirmed { job_id, .. }
            | ThreadEvent::RolledBack { job_id, .. } => Some(job_id),
            ThreadEvent::Reset => None,
        }
    }

    /// Whether a surface showing `job_id` should re-read its thread.
    pub fn concerns(&self, job_id: &JobId) -> bool {
        match self.job_id() {
            Some(id) => id == job_id,
            None => true,
        }
    }
}

/// Create the store's event channel.
pub(crate) fn channel() -> broadcast::Sender<ThreadEvent> {
    let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    sender
}

/// Publish to all current subscribers; a send with no subscribers is not
/// an error.
pub(crate) fn publish(sender: &broadcast::Sender<ThreadEvent>, event: ThreadEvent) {
    let _ = sender.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_concerns_every_job() {
        assert!(ThreadEvent::Reset.concerns(&JobId::from("a")));
    }

    #[test]
    fn job_events_concern_only_their_job() {
        let event = ThreadEvent::Fetched {
            job_id: JobId::from("a"),
        };
        assert!(event.concerns(&JobId::from("a")));
        assert!(!event.concerns(&JobId::from("b")));
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let sender = channel();
        publish(&sender, ThreadEvent::Reset);

        let mut rx = sender.subscribe();
        publish(&sender, ThreadEvent::Reset);
        assert_eq!(rx.recv().await.unwrap(), ThreadEvent::Reset);
    }
}
