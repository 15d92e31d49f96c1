//! Block trackers: observer lists notified when the active chain advances.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::lock;
use super::transport::{Transport, block_number};

/// Something observed by a block tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockEvent {
    /// A new latest block number.
    Latest(u64),
    /// The tracker moved from `old` to `new`.
    Sync {
        /// Previously known block, if any.
        old: Option<u64>,
        /// Newly observed block.
        new: u64,
    },
    /// Polling failed.
    Error(String),
    /// Housekeeping: the tracker started polling.
    Started,
    /// Housekeeping: the tracker stopped polling.
    Stopped,
}

impl BlockEvent {
    /// Housekeeping events describe the tracker itself, not the chain.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Started | Self::Stopped)
    }
}

/// Callback attached to a block tracker.
pub type BlockListener = Arc<dyn Fn(&BlockEvent) + Send + Sync>;

/// Handle returned by [`BlockTracker::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Source of block notifications.
pub trait BlockTracker: Send + Sync + fmt::Debug {
    /// Attaches `listener`; it is called for every subsequent event.
    fn add_listener(&self, listener: BlockListener) -> ListenerId;

    /// Detaches a listener. Returns `false` if it was not attached.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Most recent block number seen, if any.
    fn latest_block(&self) -> Option<u64>;
}

/// Ordered set of listeners, shared by tracker implementations.
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, BlockListener)>>,
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.len())
            .finish()
    }
}

impl ListenerSet {
    /// Adds a listener, returning its id and whether the set was empty before.
    pub fn add(&self, listener: BlockListener) -> (ListenerId, bool) {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = lock(&self.listeners);
        let was_empty = listeners.is_empty();
        listeners.push((id, listener));
        (id, was_empty)
    }

    /// Removes a listener, returning whether it was present and whether the set is now empty.
    pub fn remove(&self, id: ListenerId) -> (bool, bool) {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        (listeners.len() != before, listeners.is_empty())
    }

    /// Number of attached listeners.
    pub fn len(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Whether no listener is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every listener with `event`. Listeners run outside the lock.
    pub fn emit(&self, event: &BlockEvent) {
        let snapshot: Vec<BlockListener> = lock(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }
}

/// Polls `eth_blockNumber` while at least one listener is attached.
#[derive(Debug, Clone)]
pub struct PollingBlockTracker {
    inner: Arc<PollerInner>,
}

#[derive(Debug)]
struct PollerInner {
    transport: Arc<dyn Transport>,
    interval: Duration,
    listeners: ListenerSet,
    latest: Mutex<Option<u64>>,
    running: Mutex<Option<CancellationToken>>,
}

impl PollingBlockTracker {
    /// Tracker polling `transport` every `interval`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                transport,
                interval,
                listeners: ListenerSet::default(),
                latest: Mutex::new(None),
                running: Mutex::new(None),
            }),
        }
    }

    /// Whether the polling loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.inner.running).is_some()
    }

    fn start(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("block tracker has no runtime to poll on, staying idle");
            return;
        };
        let token = CancellationToken::new();
        *lock(&self.inner.running) = Some(token.clone());

        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(inner.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => inner.poll_once().await,
                }
            }
        });
        self.inner.listeners.emit(&BlockEvent::Started);
    }

    fn stop(&self) {
        if let Some(token) = lock(&self.inner.running).take() {
            token.cancel();
            self.inner.listeners.emit(&BlockEvent::Stopped);
        }
    }
}

impl PollerInner {
    async fn poll_once(&self) {
        match block_number(self.transport.as_ref()).await {
            Ok(number) => {
                let old = lock(&self.latest).replace(number);
                if old != Some(number) {
                    tracing::trace!(block = number, "new block");
                    self.listeners.emit(&BlockEvent::Sync { old, new: number });
                    self.listeners.emit(&BlockEvent::Latest(number));
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "block poll failed");
                self.listeners.emit(&BlockEvent::Error(err.to_string()));
            }
        }
    }
}

impl BlockTracker for PollingBlockTracker {
    fn add_listener(&self, listener: BlockListener) -> ListenerId {
        let (id, was_empty) = self.inner.listeners.add(listener);
        if was_empty {
            self.start();
        }
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let (removed, now_empty) = self.inner.listeners.remove(id);
        if removed && now_empty {
            self.stop();
        }
        removed
    }

    fn latest_block(&self) -> Option<u64> {
        *lock(&self.inner.latest)
    }
}
