//! Global in-flight counter driving a progress indicator.
//!
//! The indicator is "started" only if requests are still pending a short
//! delay after the counter leaves zero, so fast requests never flash it.
//! It is "finished" every time the counter returns to zero.

use std::sync::Arc;
use std::time::Duration;

use easycrud_core::{Property, Signal};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Default delay between the first pending request and `started`.
pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(100);

struct ActivityInner {
    start_delay: Duration,
    in_flight: Mutex<usize>,
    pending_start: Mutex<Option<JoinHandle<()>>>,
    visible: Property<bool>,
    fraction: Property<f32>,
    started: Signal<()>,
    finished: Signal<()>,
    fraction_changed: Signal<f32>,
}

/// Progress indicator shared by every request of one client.
#[derive(Clone)]
pub struct ActivityIndicator {
    inner: Arc<ActivityInner>,
}

impl Default for ActivityIndicator {
    fn default() -> Self {
        Self::new(DEFAULT_START_DELAY)
    }
}

impl ActivityIndicator {
    /// Create an indicator with the given start debounce.
    pub fn new(start_delay: Duration) -> Self {
        Self {
            inner: Arc::new(ActivityInner {
                start_delay,
                in_flight: Mutex::new(0),
                pending_start: Mutex::new(None),
                visible: Property::new(false),
                fraction: Property::new(0.0),
                started: Signal::new(),
                finished: Signal::new(),
                fraction_changed: Signal::new(),
            }),
        }
    }

    /// Emitted once the debounce elapses with requests still pending.
    pub fn started(&self) -> &Signal<()> {
        &self.inner.started
    }

    /// Emitted whenever the in-flight count returns to zero.
    pub fn finished(&self) -> &Signal<()> {
        &self.inner.finished
    }

    /// Emitted with the new fraction (0.0..=1.0) on download progress.
    pub fn fraction_changed(&self) -> &Signal<f32> {
        &self.inner.fraction_changed
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.lock()
    }

    /// Whether the indicator is currently shown.
    pub fn is_visible(&self) -> bool {
        self.inner.visible.get()
    }

    /// Current progress fraction.
    pub fn fraction(&self) -> f32 {
        self.inner.fraction.get()
    }

    /// Count a new request. The returned guard ends it when dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin(&self) -> ActivityGuard {
        let mut in_flight = self.inner.in_flight.lock();
        if *in_flight == 0 {
            let indicator = self.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(indicator.inner.start_delay).await;
                indicator.show();
            });
            if let Some(stale) = self.inner.pending_start.lock().replace(handle) {
                stale.abort();
            }
        }
        *in_flight += 1;

        ActivityGuard {
            indicator: self.clone(),
        }
    }

    /// Set download progress.
    pub fn set_fraction(&self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        if self.inner.fraction.set(fraction) {
            self.inner.fraction_changed.emit(fraction);
        }
    }

    /// Nudge progress forward when the total size is unknown.
    pub fn advance(&self) {
        let current = self.fraction();
        self.set_fraction(current + (1.0 - current) * 0.1);
    }

    fn show(&self) {
        let shown = {
            let in_flight = self.inner.in_flight.lock();
            if *in_flight == 0 {
                return;
            }
            self.inner.fraction.set_silent(0.0);
            self.inner.visible.set(true)
        };
        if shown {
            self.inner.started.emit(());
        }
    }

    fn end(&self) {
        // Lock order matches `begin`: in_flight, then pending_start.
        {
            let mut in_flight = self.inner.in_flight.lock();
            *in_flight = in_flight.saturating_sub(1);
            if *in_flight > 0 {
                return;
            }
            if let Some(handle) = self.inner.pending_start.lock().take() {
                handle.abort();
            }
            self.inner.visible.set(false);
            self.inner.fraction.set_silent(0.0);
        }
        self.inner.finished.emit(());
    }
}

impl std::fmt::Debug for ActivityIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityIndicator")
            .field("in_flight", &self.in_flight())
            .field("visible", &self.is_visible())
            .finish()
    }
}

/// Marks one request as in flight until dropped.
pub struct ActivityGuard {
    indicator: ActivityIndicator,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.indicator.end();
    }
}
