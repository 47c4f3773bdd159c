//! Seam to the environment's viewport-intersection primitive.
//!
//! In a browser this is `IntersectionObserver`; headless contexts either
//! have nothing ([`Unavailable`]) or drive intersections by hand
//! ([`ManualViewport`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::margin::RootMargin;

/// Handle to the element being watched, e.g. the sentinel below a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Anchor(String);

impl Anchor {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters handed to the observation primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserveOptions {
    /// Fraction of the anchor that must be visible, in `0.0..=1.0`.
    pub threshold: f64,
    pub root_margin: RootMargin,
}

/// One intersection report for an observed anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub is_intersecting: bool,
    /// Visible fraction of the anchor, in `0.0..=1.0`.
    pub intersection_ratio: f64,
}

impl IntersectionEntry {
    pub fn visible(ratio: f64) -> Self {
        Self {
            is_intersecting: true,
            intersection_ratio: ratio,
        }
    }

    pub fn hidden() -> Self {
        Self {
            is_intersecting: false,
            intersection_ratio: 0.0,
        }
    }
}

/// Callback invoked by the primitive for every report on an anchor.
pub type IntersectionCallback = Arc<dyn Fn(IntersectionEntry) + Send + Sync>;

/// A live observation session. Disconnecting stops all further reports.
pub trait Observation: Send {
    fn disconnect(&mut self);
}

/// The environment's viewport-observation primitive.
pub trait ViewportObserver: Send + Sync {
    /// Start observing `anchor`.
    ///
    /// Returns `None` when the primitive does not exist in this execution
    /// context; callers must treat that as "never intersects".
    fn observe(
        &self,
        anchor: &Anchor,
        options: &ObserveOptions,
        callback: IntersectionCallback,
    ) -> Option<Box<dyn Observation>>;
}

// ---------------------------------------------------------------------------
// Unavailable
// ---------------------------------------------------------------------------

/// Observer for contexts without any viewport (servers, tests of
/// non-scrolling code). Every `observe` call declines.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl ViewportObserver for Unavailable {
    fn observe(
        &self,
        _anchor: &Anchor,
        _options: &ObserveOptions,
        _callback: IntersectionCallback,
    ) -> Option<Box<dyn Observation>> {
        None
    }
}

// ---------------------------------------------------------------------------
// ManualViewport
// ---------------------------------------------------------------------------

struct Session {
    anchor: Anchor,
    options: ObserveOptions,
    callback: IntersectionCallback,
}

#[derive(Default)]
struct Registry {
    sessions: Mutex<HashMap<u64, Session>>,
    next_id: AtomicU64,
}

impl Registry {
    fn sessions(&self) -> MutexGuard<'_, HashMap<u64, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scripted viewport: intersections happen when [`report`](Self::report)
/// is called.
///
/// Used by the CLI to page through the feed and by tests to simulate
/// scrolling. Cloning shares the same set of sessions.
#[derive(Clone, Default)]
pub struct ManualViewport {
    registry: Arc<Registry>,
}

impl ManualViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `entry` to every live session on `anchor`.
    ///
    /// Returns the number of sessions notified.
    pub fn report(&self, anchor: &Anchor, entry: IntersectionEntry) -> usize {
        // Collect first so callbacks may attach or detach without deadlocking.
        let callbacks: Vec<IntersectionCallback> = self
            .registry
            .sessions()
            .values()
            .filter(|s| &s.anchor == anchor)
            .map(|s| Arc::clone(&s.callback))
            .collect();

        for callback in &callbacks {
            callback(entry);
        }
        callbacks.len()
    }

    /// Number of live sessions watching `anchor`.
    pub fn session_count(&self, anchor: &Anchor) -> usize {
        self.registry
            .sessions()
            .values()
            .filter(|s| &s.anchor == anchor)
            .count()
    }

    /// Options of the live sessions watching `anchor`.
    pub fn options_for(&self, anchor: &Anchor) -> Vec<ObserveOptions> {
        self.registry
            .sessions()
            .values()
            .filter(|s| &s.anchor == anchor)
            .map(|s| s.options.clone())
            .collect()
    }
}

impl ViewportObserver for ManualViewport {
    fn observe(
        &self,
        anchor: &Anchor,
        options: &ObserveOptions,
        callback: IntersectionCallback,
    ) -> Option<Box<dyn Observation>> {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.sessions().insert(
            id,
            Session {
                anchor: anchor.clone(),
                options: options.clone(),
                callback,
            },
        );
        Some(Box::new(ManualObservation {
            registry: Arc::clone(&self.registry),
            id: Some(id),
        }))
    }
}

struct ManualObservation {
    registry: Arc<Registry>,
    id: Option<u64>,
}

impl Observation for ManualObservation {
    fn disconnect(&mut self) {
        if let Some(id) = self.id.take() {
            self.registry.sessions().remove(&id);
        }
    }
}

impl Drop for ManualObservation {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn options() -> ObserveOptions {
        ObserveOptions {
            threshold: 0.0,
            root_margin: RootMargin::default(),
        }
    }

    #[test]
    fn unavailable_declines_to_observe() {
        let cb: IntersectionCallback = Arc::new(|_| {});
        assert!(Unavailable.observe(&Anchor::new("end"), &options(), cb).is_none());
    }

    #[test]
    fn manual_viewport_dispatches_until_disconnected() {
        let viewport = ManualViewport::new();
        let anchor = Anchor::new("end");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let cb: IntersectionCallback = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut obs = viewport.observe(&anchor, &options(), cb).unwrap();
        assert_eq!(viewport.session_count(&anchor), 1);
        assert_eq!(viewport.report(&anchor, IntersectionEntry::visible(1.0)), 1);
        assert_eq!(viewport.report(&Anchor::new("other"), IntersectionEntry::visible(1.0)), 0);

        obs.disconnect();
        obs.disconnect();
        assert_eq!(viewport.session_count(&anchor), 0);
        assert_eq!(viewport.report(&anchor, IntersectionEntry::visible(1.0)), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_observation_disconnects() {
        let viewport = ManualViewport::new();
        let anchor = Anchor::new("end");
        let cb: IntersectionCallback = Arc::new(|_| {});
        let obs = viewport.observe(&anchor, &options(), cb);
        drop(obs);
        assert_eq!(viewport.session_count(&anchor), 0);
    }
}
