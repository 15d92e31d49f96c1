//! Stable handles over a swappable provider and block tracker.
//!
//! Other subsystems keep a [`ProviderProxy`] and a [`BlockTrackerProxy`] for
//! the lifetime of the process. A network switch calls `rebind` on both; the
//! handles keep working and keep their subscribers.
//!
//! A request reads the current target once, then runs against that target
//! with the lock released, so requests already in flight at a rebind finish on
//! the old target and later ones go to the new one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use super::block_tracker::{BlockEvent, BlockTracker, ListenerId};
use super::transport::{JsonRpcRequest, Transport};
use super::{lock, read, write};
use crate::error::TransportError;

const BLOCK_EVENT_CAPACITY: usize = 64;

/// Swappable indirection over the active transport.
#[derive(Debug, Clone)]
pub struct ProviderProxy {
    target: Arc<RwLock<Arc<dyn Transport>>>,
}

impl ProviderProxy {
    /// Creates the proxy with its first target.
    #[must_use]
    pub fn bind(target: Arc<dyn Transport>) -> Self {
        Self {
            target: Arc::new(RwLock::new(target)),
        }
    }

    /// Points every clone of this proxy at `target`.
    pub fn rebind(&self, target: Arc<dyn Transport>) {
        *write(&self.target) = target;
    }

    /// The transport requests are currently routed to.
    #[must_use]
    pub fn target(&self) -> Arc<dyn Transport> {
        Arc::clone(&read(&self.target))
    }

    /// Whether `self` and `other` are handles to the same proxy.
    #[must_use]
    pub fn same_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.target, &other.target)
    }
}

#[async_trait]
impl Transport for ProviderProxy {
    async fn request(&self, request: JsonRpcRequest) -> Result<Value, TransportError> {
        let target = self.target();
        target.request(request).await
    }
}

/// Swappable indirection over the active block tracker.
///
/// Subscribers attach to the proxy, not to a tracker. The proxy keeps exactly
/// one listener on the current tracker and republishes its events, dropping
/// housekeeping events so tracker start/stop churn caused by a rebind never
/// reaches subscribers.
#[derive(Clone)]
pub struct BlockTrackerProxy {
    inner: Arc<TrackerProxyInner>,
}

struct TrackerProxyInner {
    events: broadcast::Sender<BlockEvent>,
    generation: AtomicU64,
    current: Mutex<Bound>,
}

struct Bound {
    tracker: Arc<dyn BlockTracker>,
    listener: ListenerId,
}

impl fmt::Debug for BlockTrackerProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockTrackerProxy")
            .field("generation", &self.inner.generation.load(Ordering::Acquire))
            .field("subscribers", &self.inner.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl BlockTrackerProxy {
    /// Creates the proxy with its first target.
    #[must_use]
    pub fn bind(tracker: Arc<dyn BlockTracker>) -> Self {
        let (events, _) = broadcast::channel(BLOCK_EVENT_CAPACITY);
        let inner = Arc::new_cyclic(|weak: &std::sync::Weak<TrackerProxyInner>| {
            let listener = attach(weak.clone(), &tracker, 0);
            TrackerProxyInner {
                events,
                generation: AtomicU64::new(0),
                current: Mutex::new(Bound { tracker, listener }),
            }
        });
        Self { inner }
    }

    /// Moves the proxy onto `tracker` and detaches it from the previous one.
    pub fn rebind(&self, tracker: Arc<dyn BlockTracker>) {
        let mut current = lock(&self.inner.current);
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let listener = attach(Arc::downgrade(&self.inner), &tracker, generation);
        let previous = std::mem::replace(&mut *current, Bound { tracker, listener });
        drop(current);
        previous.tracker.remove_listener(previous.listener);
    }

    /// Receives every non-housekeeping event from whichever tracker is current.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BlockEvent> {
        self.inner.events.subscribe()
    }

    /// Latest block of the current tracker.
    #[must_use]
    pub fn latest_block(&self) -> Option<u64> {
        lock(&self.inner.current).tracker.latest_block()
    }

    /// Whether `self` and `other` are handles to the same proxy.
    #[must_use]
    pub fn same_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Registers the forwarding listener for `generation` on `tracker`.
fn attach(
    proxy: std::sync::Weak<TrackerProxyInner>,
    tracker: &Arc<dyn BlockTracker>,
    generation: u64,
) -> ListenerId {
    tracker.add_listener(Arc::new(move |event: &BlockEvent| {
        if event.is_internal() {
            return;
        }
        let Some(proxy) = proxy.upgrade() else {
            return;
        };
        if proxy.generation.load(Ordering::Acquire) != generation {
            return;
        }
        // No subscribers is not an error.
        let _ = proxy.events.send(event.clone());
    }))
}

impl Drop for TrackerProxyInner {
    fn drop(&mut self) {
        let current = lock(&self.current);
        current.tracker.remove_listener(current.listener);
    }
}
