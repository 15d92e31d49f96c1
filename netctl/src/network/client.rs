//! Network client factories.
//!
//! A [`NetworkClient`] is the transport/block-tracker pair for one endpoint.
//! [`ClientFactory`] is the seam the controller builds clients through;
//! [`HttpClientFactory`] is the production implementation.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::block_tracker::{BlockTracker, PollingBlockTracker};
use super::registry::LOCALHOST_RPC_URL;
use super::transport::{HttpTransport, Transport};
use super::types::ProviderType;
use crate::error::Error;

/// Default block polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Transport and block tracker for one endpoint.
#[derive(Debug, Clone)]
pub struct NetworkClient {
    /// Dispatches JSON-RPC requests to the endpoint.
    pub transport: Arc<dyn Transport>,
    /// Observes new blocks on the endpoint.
    pub block_tracker: Arc<dyn BlockTracker>,
}

/// Builds network clients. Construction is synchronous and does no I/O.
pub trait ClientFactory: Send + Sync + std::fmt::Debug {
    /// Client for a hosted Infura network.
    ///
    /// # Errors
    ///
    /// Returns an error if `network` is not an Infura network or no project
    /// id is configured.
    fn infura_client(&self, network: ProviderType) -> Result<NetworkClient, Error>;

    /// Client for the local development node.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    fn localhost_client(&self) -> Result<NetworkClient, Error>;

    /// Client for an arbitrary RPC URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    fn json_rpc_client(&self, rpc_url: &Url) -> Result<NetworkClient, Error>;
}

/// Builds HTTP transports with polling block trackers.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
    infura_project_id: Option<String>,
    poll_interval: Duration,
}

impl HttpClientFactory {
    /// Factory sharing one HTTP connection pool across all clients.
    #[must_use]
    pub fn new(infura_project_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            infura_project_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets how often block trackers poll.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn client_for(&self, url: Url) -> NetworkClient {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(self.http.clone(), url));
        let block_tracker = Arc::new(PollingBlockTracker::new(
            Arc::clone(&transport),
            self.poll_interval,
        ));
        NetworkClient {
            transport,
            block_tracker,
        }
    }
}

/// Infura endpoint for `network` and `project_id`.
///
/// # Errors
///
/// Returns an error if `network` is not served by Infura.
pub fn infura_url(network: ProviderType, project_id: &str) -> Result<Url, Error> {
    if !network.is_infura() {
        return Err(Error::client(format!("'{network}' is not an Infura network")));
    }
    Url::parse(&format!("https://{network}.infura.io/v3/{project_id}"))
        .map_err(|e| Error::client(format!("invalid Infura URL for '{network}': {e}")))
}

impl ClientFactory for HttpClientFactory {
    fn infura_client(&self, network: ProviderType) -> Result<NetworkClient, Error> {
        let project_id = self
            .infura_project_id
            .as_deref()
            .ok_or_else(|| Error::client(format!("no Infura project id configured for '{network}'")))?;
        Ok(self.client_for(infura_url(network, project_id)?))
    }

    fn localhost_client(&self) -> Result<NetworkClient, Error> {
        let url = Url::parse(LOCALHOST_RPC_URL)
            .map_err(|e| Error::client(format!("invalid localhost URL: {e}")))?;
        Ok(self.client_for(url))
    }

    fn json_rpc_client(&self, rpc_url: &Url) -> Result<NetworkClient, Error> {
        Ok(self.client_for(rpc_url.clone()))
    }
}
