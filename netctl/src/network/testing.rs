//! In-process transports, trackers and factories for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;
use url::Url;

use super::block_tracker::{BlockEvent, BlockListener, BlockTracker, ListenerId, ListenerSet};
use super::client::{ClientFactory, NetworkClient};
use super::lock;
use super::transport::{JsonRpcRequest, Transport};
use super::types::ProviderType;
use crate::error::{Error, TransportError};

/// Lets a test hold a mock response until it decides to release it.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    started: Arc<Notify>,
    released: Arc<Notify>,
}

impl Gate {
    /// Waits until a request has reached the gate.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Lets the waiting request complete.
    pub fn release(&self) {
        self.released.notify_one();
    }
}

/// Transport answering `net_version` from a fixed value or failing.
#[derive(Debug)]
pub struct MockTransport {
    net_version: Option<String>,
    block_number: u64,
    gate: Option<Gate>,
    down: AtomicBool,
    requests: AtomicUsize,
}

impl MockTransport {
    /// Reports `net_version` for identity queries.
    pub fn new(net_version: &str) -> Self {
        Self {
            net_version: Some(net_version.to_owned()),
            block_number: 1,
            gate: None,
            down: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        }
    }

    /// Fails every request.
    pub fn failing() -> Self {
        Self {
            net_version: None,
            ..Self::new("")
        }
    }

    /// Holds every request at a gate.
    pub fn gated(net_version: &str) -> (Self, Gate) {
        let gate = Gate::default();
        let transport = Self {
            gate: Some(gate.clone()),
            ..Self::new(net_version)
        };
        (transport, gate)
    }

    /// Reports `number` for `eth_blockNumber`.
    pub fn with_block_number(mut self, number: u64) -> Self {
        self.block_number = number;
        self
    }

    /// Makes every request fail until called again with `false`.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: JsonRpcRequest) -> Result<Value, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.released.notified().await;
        }
        let version = self.net_version.as_ref().filter(|_| !self.down.load(Ordering::SeqCst));
        let Some(version) = version else {
            return Err(TransportError::InvalidResponse("unreachable node".into()));
        };
        match request.method.as_str() {
            "net_version" => Ok(Value::String(version.clone())),
            "eth_blockNumber" => Ok(Value::String(format!("{:#x}", self.block_number))),
            "eth_chainId" => Ok(Value::String("0x1".into())),
            other => Err(TransportError::Unsupported(other.to_owned())),
        }
    }
}

/// Block tracker driven by hand.
#[derive(Debug, Default)]
pub struct MockBlockTracker {
    listeners: ListenerSet,
    latest: Mutex<Option<u64>>,
}

impl MockBlockTracker {
    /// Delivers `event` to every listener.
    pub fn emit(&self, event: BlockEvent) {
        if let BlockEvent::Latest(n) = event {
            *lock(&self.latest) = Some(n);
        }
        self.listeners.emit(&event);
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl BlockTracker for MockBlockTracker {
    fn add_listener(&self, listener: BlockListener) -> ListenerId {
        self.listeners.add(listener).0
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id).0
    }

    fn latest_block(&self) -> Option<u64> {
        *lock(&self.latest)
    }
}

/// Factory handing out pre-registered transports.
///
/// Clients are keyed by provider type name for named networks and by URL for
/// RPC endpoints. Unregistered keys get a transport reporting `"1337"`.
#[derive(Debug, Default)]
pub struct MockFactory {
    transports: Mutex<HashMap<String, Arc<dyn Transport>>>,
    trackers: Mutex<Vec<Arc<MockBlockTracker>>>,
    built: Mutex<Vec<String>>,
}

impl MockFactory {
    /// Serves `transport` for `key`.
    pub fn register(&self, key: impl Into<String>, transport: Arc<dyn Transport>) {
        lock(&self.transports).insert(key.into(), transport);
    }

    /// Keys clients were built for, in order.
    pub fn built(&self) -> Vec<String> {
        lock(&self.built).clone()
    }

    /// Trackers handed out, in order.
    pub fn trackers(&self) -> Vec<Arc<MockBlockTracker>> {
        lock(&self.trackers).clone()
    }

    fn client(&self, key: &str) -> NetworkClient {
        lock(&self.built).push(key.to_owned());
        let transport = lock(&self.transports)
            .get(key)
            .cloned()
            .unwrap_or_else(|| Arc::new(MockTransport::new("1337")));
        let tracker = Arc::new(MockBlockTracker::default());
        lock(&self.trackers).push(Arc::clone(&tracker));
        NetworkClient {
            transport,
            block_tracker: tracker,
        }
    }
}

impl ClientFactory for MockFactory {
    fn infura_client(&self, network: ProviderType) -> Result<NetworkClient, Error> {
        Ok(self.client(network.as_str()))
    }

    fn localhost_client(&self) -> Result<NetworkClient, Error> {
        Ok(self.client(ProviderType::Localhost.as_str()))
    }

    fn json_rpc_client(&self, rpc_url: &Url) -> Result<NetworkClient, Error> {
        Ok(self.client(rpc_url.as_str()))
    }
}
