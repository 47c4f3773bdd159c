//! Visibility-edge to callback translation for infinite scroll.
//!
//! [`ScrollTrigger`] watches a single anchor through a
//! [`ViewportObserver`] and calls `on_load_more` once each time the anchor
//! crosses from hidden to visible. It knows nothing about pages, offsets
//! or data.
//!
//! The trigger does not wait for `on_load_more` to finish before allowing
//! the next crossing. Owners whose callback starts an asynchronous fetch
//! must ignore triggers while one is pending (see
//! [`FeedPager::load_next`](crate::pager::FeedPager::load_next)).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::margin::RootMargin;
use crate::observer::{
    Anchor, IntersectionCallback, IntersectionEntry, Observation, ObserveOptions, ViewportObserver,
};

/// Callback fired on each crossing.
type LoadMoreFn = Arc<dyn Fn() + Send + Sync>;

/// Options for [`ScrollTrigger::attach`].
#[derive(Clone)]
pub struct TriggerOptions {
    threshold: f64,
    root_margin: RootMargin,
    on_load_more: LoadMoreFn,
}

impl TriggerOptions {
    /// Options with the default threshold (`0.0`) and root margin (`100px`).
    pub fn new(on_load_more: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            threshold: 0.0,
            root_margin: RootMargin::default(),
            on_load_more: Arc::new(on_load_more),
        }
    }

    /// Set the visible fraction required to count as a crossing.
    ///
    /// Values outside `0.0..=1.0` are clamped; NaN falls back to `0.0`.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = if threshold.is_nan() {
            0.0
        } else {
            threshold.clamp(0.0, 1.0)
        };
        self
    }

    pub fn root_margin(mut self, root_margin: RootMargin) -> Self {
        self.root_margin = root_margin;
        self
    }

    pub fn threshold_value(&self) -> f64 {
        self.threshold
    }

    pub fn root_margin_value(&self) -> RootMargin {
        self.root_margin
    }
}

/// Per-session state shared with the observer callback.
struct EdgeState {
    live: AtomicBool,
    inside: AtomicBool,
    threshold: f64,
    on_load_more: LoadMoreFn,
}

impl EdgeState {
    fn on_entry(&self, entry: IntersectionEntry) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }
        let visible = entry.is_intersecting && entry.intersection_ratio >= self.threshold;
        let was_visible = self.inside.swap(visible, Ordering::SeqCst);
        if visible && !was_visible && self.live.load(Ordering::SeqCst) {
            (self.on_load_more)();
        }
    }
}

struct Binding {
    anchor: Anchor,
    observation: Box<dyn Observation>,
    state: Arc<EdgeState>,
}

/// Watches one anchor at a time and fires `on_load_more` per crossing.
///
/// Dropping the trigger detaches it.
pub struct ScrollTrigger {
    observer: Arc<dyn ViewportObserver>,
    binding: Option<Binding>,
}

impl ScrollTrigger {
    pub fn new(observer: Arc<dyn ViewportObserver>) -> Self {
        Self {
            observer,
            binding: None,
        }
    }

    /// Bind to `anchor`, replacing any previous binding.
    ///
    /// When the observation primitive is unavailable this is a no-op and
    /// `on_load_more` is never called.
    pub fn attach(&mut self, anchor: Anchor, options: TriggerOptions) {
        self.detach();

        let state = Arc::new(EdgeState {
            live: AtomicBool::new(true),
            inside: AtomicBool::new(false),
            threshold: options.threshold,
            on_load_more: options.on_load_more,
        });

        let callback_state = Arc::clone(&state);
        let callback: IntersectionCallback = Arc::new(move |entry| callback_state.on_entry(entry));

        let observe_options = ObserveOptions {
            threshold: options.threshold,
            root_margin: options.root_margin,
        };

        match self.observer.observe(&anchor, &observe_options, callback) {
            Some(observation) => {
                tracing::debug!(anchor = %anchor, threshold = options.threshold, "Scroll trigger attached");
                self.binding = Some(Binding {
                    anchor,
                    observation,
                    state,
                });
            }
            None => {
                tracing::debug!(anchor = %anchor, "Viewport observation unavailable, trigger inert");
            }
        }
    }

    /// Stop watching. Idempotent; no `on_load_more` call starts after this
    /// returns.
    pub fn detach(&mut self) {
        if let Some(mut binding) = self.binding.take() {
            binding.state.live.store(false, Ordering::SeqCst);
            binding.observation.disconnect();
            tracing::debug!(anchor = %binding.anchor, "Scroll trigger detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.binding.is_some()
    }

    /// Anchor of the current binding, if any.
    pub fn anchor(&self) -> Option<&Anchor> {
        self.binding.as_ref().map(|b| &b.anchor)
    }
}

impl Drop for ScrollTrigger {
    fn drop(&mut self) {
        self.detach();
    }
}
