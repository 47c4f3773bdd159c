//! Shadow model of one job's comment thread.
//!
//! A thread keeps two things apart:
//!
//! - `confirmed`: the last-known-good sequence, as returned by the backend
//!   and amended by confirmed mutations;
//! - `pending`: optimistic changes in submission order, each tagged with
//!   the [`IntentToken`] that correlates it with its backend round trip.
//!
//! Readers always see `confirmed` with `pending` replayed on top, so a
//! rollback is simply dropping the pending entry, and a failed delete
//! reappears in its original position.
//!
//! Staleness is tracked with a per-thread epoch. Starting a fetch and
//! settling a mutation both advance it; a fetch result is applied only if
//! it started after the last settled point.

use std::collections::HashSet;
use std::fmt;

use devboards_core::{Comment, CommentId};

/// Correlation token of one optimistic mutation. Unique per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntentToken(pub(crate) u64);

impl fmt::Display for IntentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An optimistic change waiting for backend confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingChange {
    /// Carries the local record with its temporary id.
    Add(Comment),
    Edit { id: CommentId, text: String },
    Delete { id: CommentId },
}

#[derive(Debug, Clone)]
struct PendingIntent {
    token: IntentToken,
    change: PendingChange,
}

/// Whether a completed fetch made it into the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApplyOutcome {
    Applied,
    /// Superseded by a later fetch or confirmation; silently dropped.
    Stale,
}

#[derive(Debug, Default)]
pub(crate) struct CommentThread {
    confirmed: Vec<Comment>,
    pending: Vec<PendingIntent>,
    loaded: bool,
    epoch: u64,
    settled_epoch: u64,
}

impl CommentThread {
    /// The ordered sequence readers see.
    pub(crate) fn view(&self) -> Vec<Comment> {
        let mut comments = self.confirmed.clone();
        for intent in &self.pending {
            match &intent.change {
                PendingChange::Add(comment) => {
                    if !comments.iter().any(|c| c.id == comment.id) {
                        comments.push(comment.clone());
                    }
                }
                PendingChange::Edit { id, text } => {
                    if let Some(c) = comments.iter_mut().find(|c| &c.id == id) {
                        c.text = text.clone();
                    }
                }
                PendingChange::Delete { id } => comments.retain(|c| &c.id != id),
            }
        }
        comments
    }

    /// Whether a comment with `id` is currently visible.
    pub(crate) fn shows(&self, id: &CommentId) -> bool {
        self.view().iter().any(|c| &c.id == id)
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ---- fetch ----

    /// Record the start of a fetch and return its epoch.
    pub(crate) fn begin_fetch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Replace the confirmed sequence with a fetch result started at
    /// `started`.
    ///
    /// Rejected when a later fetch or mutation has settled since, or while
    /// an add is unconfirmed (the result may or may not already contain
    /// it, which would show the comment twice).
    pub(crate) fn apply_fetch(&mut self, started: u64, comments: Vec<Comment>) -> ApplyOutcome {
        if started <= self.settled_epoch || self.has_pending_add() {
            return ApplyOutcome::Stale;
        }

        let mut seen = HashSet::new();
        self.confirmed = comments
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();
        self.loaded = true;
        self.settled_epoch = started;
        ApplyOutcome::Applied
    }

    // ---- optimistic intents ----

    pub(crate) fn push_pending(&mut self, token: IntentToken, change: PendingChange) {
        self.pending.push(PendingIntent { token, change });
    }

    /// Comment id an edit or delete intent currently targets.
    ///
    /// Follows the retargeting done when an earlier add was confirmed.
    pub(crate) fn pending_target(&self, token: IntentToken) -> Option<CommentId> {
        self.pending
            .iter()
            .find(|p| p.token == token)
            .and_then(|p| match &p.change {
                PendingChange::Edit { id, .. } | PendingChange::Delete { id } => Some(id.clone()),
                PendingChange::Add(_) => None,
            })
    }

    /// Drop a pending intent, restoring what readers saw before it.
    pub(crate) fn rollback(&mut self, token: IntentToken) -> bool {
        self.take_pending(token).is_some()
    }

    /// Reconcile an optimistic add with the record the backend stored.
    ///
    /// Later intents aimed at the temporary id are retargeted to the
    /// server id. Returns `false` if the intent is unknown.
    pub(crate) fn confirm_add(&mut self, token: IntentToken, stored: Comment) -> bool {
        let Some(PendingChange::Add(local)) = self.take_pending(token) else {
            return false;
        };

        for intent in &mut self.pending {
            match &mut intent.change {
                PendingChange::Edit { id, .. } | PendingChange::Delete { id } if *id == local.id => {
                    *id = stored.id.clone();
                }
                _ => {}
            }
        }

        match self.confirmed.iter_mut().find(|c| c.id == stored.id) {
            Some(existing) => *existing = stored,
            None => self.confirmed.push(stored),
        }
        self.settle();
        true
    }

    /// Make a provisional edit permanent with the backend's record.
    pub(crate) fn confirm_edit(&mut self, token: IntentToken, stored: Comment) -> bool {
        if self.take_pending(token).is_none() {
            return false;
        }
        if let Some(existing) = self.confirmed.iter_mut().find(|c| c.id == stored.id) {
            *existing = stored;
        }
        self.settle();
        true
    }

    /// Make an optimistic delete permanent.
    pub(crate) fn confirm_delete(&mut self, token: IntentToken, id: &CommentId) -> bool {
        if self.take_pending(token).is_none() {
            return false;
        }
        self.confirmed.retain(|c| &c.id != id);
        self.settle();
        true
    }

    /// Drop every pending intent.
    pub(crate) fn discard_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    // ---- private helpers ----

    fn take_pending(&mut self, token: IntentToken) -> Option<PendingChange> {
        let pos = self.pending.iter().position(|p| p.token == token)?;
        Some(self.pending.remove(pos).change)
    }

    fn has_pending_add(&self) -> bool {
        self.pending
            .iter()
            .any(|p| matches!(p.change, PendingChange::Add(_)))
    }

    fn settle(&mut self) {
        self.epoch += 1;
        self.settled_epoch = self.epoch;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
