//! Batching of in-flight loads for external synchronization.
//!
//! A [`LoadGroup`] captures the load futures issued during a window of
//! frames, then resolves once the window has elapsed and every captured
//! future settled. Callers (a capture or export feature, say) use it to
//! wait for settled visual quality after a scene change without a
//! hard-coded timeout.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use uuid::Uuid;

use crate::runtime;

/// Minimum capture window. Loads issued by the very next evaluation tick
/// would otherwise slip past a one-frame window.
pub const MIN_WINDOW_FRAMES: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct GroupOptions {
    /// How many frames the capture window spans. Clamped to
    /// [`MIN_WINDOW_FRAMES`].
    pub window_frames: usize,
    /// When true the window is measured from the first captured load
    /// instead of from group creation.
    pub window_from_first_capture: bool,
    /// How many concurrently-tracked loads one source object may
    /// contribute. Bounds growth when an object's level flickers.
    pub per_source_cap: usize,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            window_frames: MIN_WINDOW_FRAMES,
            window_from_first_capture: false,
            per_source_cap: 1,
        }
    }
}

/// The outcome a settled group reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupResult {
    /// True when the group was aborted instead of running to completion.
    pub cancelled: bool,
    /// Loads captured before the group settled.
    pub awaited_count: usize,
    /// Captured loads that completed before the group settled.
    pub resolved_count: usize,
}

struct GroupState {
    frames_seen: usize,
    capture_started: bool,
    captured: usize,
    resolved: usize,
    per_source: FxHashMap<Uuid, usize>,
    finished: bool,
}

struct GroupInner {
    options: GroupOptions,
    state: Mutex<GroupState>,
    done: watch::Sender<Option<GroupResult>>,
}

/// A window of in-flight loads awaitable as one unit.
#[derive(Clone)]
pub struct LoadGroup {
    inner: Arc<GroupInner>,
}

impl LoadGroup {
    #[must_use]
    pub fn new(options: GroupOptions) -> Self {
        let options = GroupOptions {
            window_frames: options.window_frames.max(MIN_WINDOW_FRAMES),
            ..options
        };
        let (done, _) = watch::channel(None);
        Self {
            inner: Arc::new(GroupInner {
                options,
                state: Mutex::new(GroupState {
                    frames_seen: 0,
                    capture_started: false,
                    captured: 0,
                    resolved: 0,
                    per_source: FxHashMap::default(),
                    finished: false,
                }),
                done,
            }),
        }
    }

    /// Submits a load attributed to `source` for tracking. The load runs
    /// either way; it only counts toward the group while the window is
    /// open and the source is under its cap. Returns whether it was
    /// tracked.
    pub fn track<F>(&self, source: Uuid, load: F) -> bool
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.capture(source) {
            let group = self.clone();
            runtime::spawn(async move {
                load.await;
                group.settle(source);
            });
            true
        } else {
            runtime::spawn(load);
            false
        }
    }

    /// Counts an externally-driven load toward the group without running
    /// anything. One load may be captured by any number of groups; each
    /// captor expects a matching [`settle`](Self::settle) call. Returns
    /// false when the window has closed or the source is at its cap.
    pub fn capture(&self, source: Uuid) -> bool {
        let mut state = self.inner.state.lock();
        let in_window = !state.finished && state.frames_seen < self.inner.options.window_frames;
        let under_cap =
            *state.per_source.get(&source).unwrap_or(&0) < self.inner.options.per_source_cap;
        if !(in_window && under_cap) {
            return false;
        }
        if !state.capture_started {
            state.capture_started = true;
            if self.inner.options.window_from_first_capture {
                state.frames_seen = 0;
            }
        }
        state.captured += 1;
        *state.per_source.entry(source).or_insert(0) += 1;
        true
    }

    /// Reports that a load previously accepted by
    /// [`capture`](Self::capture) settled.
    pub fn settle(&self, source: Uuid) {
        let mut state = self.inner.state.lock();
        state.resolved += 1;
        if let Some(count) = state.per_source.get_mut(&source) {
            *count = count.saturating_sub(1);
        }
        self.maybe_finish(&mut state, false);
    }

    /// Advances the capture window by one frame. The frame driver calls
    /// this once per rendered frame.
    pub fn update(&self) {
        let mut state = self.inner.state.lock();
        if self.inner.options.window_from_first_capture && !state.capture_started {
            return;
        }
        state.frames_seen += 1;
        self.maybe_finish(&mut state, false);
    }

    /// Force-resolves the group. In-flight loads keep running but are no
    /// longer awaited.
    pub fn abort(&self) {
        let mut state = self.inner.state.lock();
        self.maybe_finish(&mut state, true);
    }

    fn maybe_finish(&self, state: &mut GroupState, force: bool) {
        if state.finished {
            return;
        }
        let window_elapsed = state.frames_seen >= self.inner.options.window_frames;
        if force || (window_elapsed && state.resolved >= state.captured) {
            state.finished = true;
            let _ = self.inner.done.send(Some(GroupResult {
                cancelled: force,
                awaited_count: state.captured,
                resolved_count: state.resolved,
            }));
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.state.lock().finished
    }

    /// Waits until the group settles. Safe to call from any number of
    /// tasks; all of them observe the same result.
    pub async fn ready(&self) -> GroupResult {
        let mut rx = self.inner.done.subscribe();
        loop {
            if let Some(result) = *rx.borrow_and_update() {
                return result;
            }
            if rx.changed().await.is_err() {
                // Sender gone without a result; report an aborted group.
                return GroupResult {
                    cancelled: true,
                    awaited_count: 0,
                    resolved_count: 0,
                };
            }
        }
    }
}

impl Default for LoadGroup {
    fn default() -> Self {
        Self::new(GroupOptions::default())
    }
}
