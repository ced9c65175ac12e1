//! Per-route duplicate cancellation.
//!
//! Every request that opts in registers under its `METHOD:url` key. Registering
//! a key that already has a pending request fires that request's cancel
//! channel, so at most one request per key is ever in flight. A finished
//! request only removes the entry if it is still the registered one.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use easycrud_core::logging::targets;

/// Unique identifier for a registered request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct RouteEntry {
    id: RequestId,
    cancel_tx: oneshot::Sender<()>,
}

/// Registry of pending requests keyed by route.
#[derive(Clone, Default)]
pub struct RouteRegistry {
    entries: Arc<Mutex<HashMap<String, RouteEntry>>>,
}

impl RouteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request under `key`, cancelling any pending one.
    pub fn register(&self, key: impl Into<String>) -> RouteTicket {
        let key = key.into();
        let id = RequestId::next();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let previous = self
            .entries
            .lock()
            .insert(key.clone(), RouteEntry { id, cancel_tx });

        if let Some(previous) = previous {
            tracing::debug!(target: targets::HTTP, route = %key, "cancelling superseded request");
            let _ = previous.cancel_tx.send(());
        }

        RouteTicket {
            registry: Some(self.clone()),
            key,
            id,
            cancel_rx: Some(cancel_rx),
        }
    }

    /// Whether a request is pending on `key`.
    pub fn is_pending(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of pending routes.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no routes are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn complete(&self, key: &str, id: RequestId) {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|entry| entry.id == id) {
            entries.remove(key);
        }
    }
}

impl std::fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRegistry")
            .field("pending", &self.len())
            .finish()
    }
}

/// A registration handed to one request for its whole lifetime.
///
/// Dropping the ticket completes the registration.
pub struct RouteTicket {
    registry: Option<RouteRegistry>,
    key: String,
    id: RequestId,
    cancel_rx: Option<oneshot::Receiver<()>>,
}

impl RouteTicket {
    /// A ticket that never gets cancelled, for requests exempt from de-duplication.
    pub fn detached(key: impl Into<String>) -> Self {
        Self {
            registry: None,
            key: key.into(),
            id: RequestId::next(),
            cancel_rx: None,
        }
    }

    /// This request's id.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The route key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolves once a newer request on the same route supersedes this one.
    pub async fn cancelled(&mut self) {
        match self.cancel_rx.as_mut() {
            Some(rx) => {
                let _ = rx.await;
                self.cancel_rx = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

impl Drop for RouteTicket {
    fn drop(&mut self) {
        if let Some(registry) = &self.registry {
            registry.complete(&self.key, self.id);
        }
    }
}
