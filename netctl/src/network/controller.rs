//! The network controller.
//!
//! [`NetworkController`] owns the active [`ProviderConfig`], builds a network
//! client for it through a [`ClientFactory`], points the long-lived provider
//! and block-tracker proxies at the new client, and resolves which network
//! the endpoint is actually on.
//!
//! State is published through three `watch` slices (provider config, network
//! status, settings) and switch notifications through a `broadcast` channel.
//!
//! # Lookups and switches
//!
//! A lookup captures the switch epoch and the network status before it sends
//! `net_version`, and applies its answer only if both are unchanged when the
//! answer arrives. Superseded lookups are not cancelled; their results are
//! dropped.

use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::{broadcast, watch};
use url::Url;

use super::block_tracker::BlockTracker;
use super::client::{ClientFactory, NetworkClient};
use super::lock;
use super::middleware::{ProviderParams, WalletMiddleware};
use super::proxy::{BlockTrackerProxy, ProviderProxy};
use super::registry::{
    ARTEMIS_CODE, ARTEMIS_DISPLAY_NAME, ARTEMIS_RPC_URL, DEFAULT_TICKER, LOCALHOST_RPC_URL,
    NetworkRegistry, RegistryEntry,
};
use super::transport::{Transport, net_version};
use super::types::{
    CustomRpc, NetworkControllerState, NetworkEvent, NetworkSettings, NetworkStatus,
    ProviderConfig, ProviderType,
};
use crate::error::Error;

const EVENT_CAPACITY: usize = 16;

/// Construction options for [`NetworkController`].
#[derive(Debug, Clone)]
pub struct NetworkControllerOptions {
    /// Provider configuration to start from.
    pub provider: ProviderConfig,
    /// Endpoint of the Artemis private network.
    pub artemis_rpc_url: Url,
}

impl Default for NetworkControllerOptions {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            artemis_rpc_url: Url::parse(ARTEMIS_RPC_URL).expect("valid built-in Artemis URL"),
        }
    }
}

/// The stable handles given to the rest of the application.
#[derive(Debug, Clone)]
pub struct ProviderHandles {
    /// Routes requests to the active network.
    pub provider: ProviderProxy,
    /// Delivers block events from the active network.
    pub block_tracker: BlockTrackerProxy,
}

/// Client built for a configuration, not yet installed.
struct Configured {
    client: NetworkClient,
    custom_entry: Option<RegistryEntry>,
    settings: NetworkSettings,
}

/// Mutable controller state guarded by one lock.
#[derive(Default)]
struct Switchboard {
    epoch: u64,
    registry: NetworkRegistry,
    active: Option<Arc<dyn Transport>>,
    handles: Option<ProviderHandles>,
}

struct ControllerInner {
    factory: Arc<dyn ClientFactory>,
    artemis_rpc_url: Url,
    provider_store: watch::Sender<ProviderConfig>,
    network_store: watch::Sender<NetworkStatus>,
    settings_store: watch::Sender<NetworkSettings>,
    events: broadcast::Sender<NetworkEvent>,
    base_params: OnceLock<ProviderParams>,
    board: Mutex<Switchboard>,
}

/// Tracks and switches the network the wallet talks to.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct NetworkController {
    inner: Arc<ControllerInner>,
}

impl std::fmt::Debug for NetworkController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkController")
            .field("provider", &*self.inner.provider_store.borrow())
            .field("network", &*self.inner.network_store.borrow())
            .finish_non_exhaustive()
    }
}

impl NetworkController {
    /// Creates a controller. Nothing is connected until [`Self::initialize_provider`].
    #[must_use]
    pub fn new(options: NetworkControllerOptions, factory: Arc<dyn ClientFactory>) -> Self {
        let (provider_store, _) = watch::channel(options.provider);
        let (network_store, _) = watch::channel(NetworkStatus::Loading);
        let (settings_store, _) = watch::channel(NetworkSettings::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ControllerInner {
                factory,
                artemis_rpc_url: options.artemis_rpc_url,
                provider_store,
                network_store,
                settings_store,
                events,
                base_params: OnceLock::new(),
                board: Mutex::new(Switchboard::default()),
            }),
        }
    }

    /// Connects to the stored provider configuration and looks up its network.
    ///
    /// Only the first call has an effect; later calls are logged and ignored.
    /// A failed lookup leaves the network in [`NetworkStatus::Loading`].
    ///
    /// # Errors
    ///
    /// Returns an error if no client can be built for the stored configuration.
    pub async fn initialize_provider(&self, params: ProviderParams) -> Result<(), Error> {
        if self.inner.base_params.set(params).is_err() {
            tracing::warn!("network controller already initialized");
            return Ok(());
        }
        let config = self.get_provider_config();
        tracing::debug!(?config, "initializing provider");

        let configured = self.configure_provider(&config)?;
        self.install(&mut lock(&self.inner.board), configured);
        self.lookup_network(true).await;
        Ok(())
    }

    /// Whether [`Self::initialize_provider`] has connected a provider.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        lock(&self.inner.board).handles.is_some()
    }

    /// The proxy handles. They stay valid across every later network switch.
    ///
    /// Returns `None` before the first provider has been configured.
    #[must_use]
    pub fn get_provider_and_block_tracker(&self) -> Option<ProviderHandles> {
        lock(&self.inner.board).handles.clone()
    }

    /// Re-runs the network lookup if the network is still loading.
    pub async fn verify_network(&self) {
        if self.is_network_loading() {
            self.lookup_network(false).await;
        }
    }

    /// Current network status.
    #[must_use]
    pub fn get_network_state(&self) -> NetworkStatus {
        self.inner.network_store.borrow().clone()
    }

    /// Current network settings.
    #[must_use]
    pub fn get_network_config(&self) -> NetworkSettings {
        self.inner.settings_store.borrow().clone()
    }

    /// Current provider configuration.
    #[must_use]
    pub fn get_provider_config(&self) -> ProviderConfig {
        self.inner.provider_store.borrow().clone()
    }

    /// Whether the network is unresolved.
    #[must_use]
    pub fn is_network_loading(&self) -> bool {
        self.inner.network_store.borrow().is_loading()
    }

    /// All three state slices at once.
    #[must_use]
    pub fn state(&self) -> NetworkControllerState {
        let _board = lock(&self.inner.board);
        NetworkControllerState {
            provider: self.get_provider_config(),
            network: self.get_network_state(),
            settings: self.get_network_config(),
        }
    }

    /// The custom network currently recorded in the registry.
    #[must_use]
    pub fn custom_network(&self) -> Option<RegistryEntry> {
        lock(&self.inner.board).registry.custom().cloned()
    }

    /// Observes provider configuration changes.
    #[must_use]
    pub fn watch_provider(&self) -> watch::Receiver<ProviderConfig> {
        self.inner.provider_store.subscribe()
    }

    /// Observes network status changes.
    #[must_use]
    pub fn watch_network(&self) -> watch::Receiver<NetworkStatus> {
        self.inner.network_store.subscribe()
    }

    /// Observes network settings changes.
    #[must_use]
    pub fn watch_settings(&self) -> watch::Receiver<NetworkSettings> {
        self.inner.settings_store.subscribe()
    }

    /// Receives a [`NetworkEvent::NetworkDidChange`] for every switch and for
    /// the completed initial lookup.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.inner.events.subscribe()
    }

    /// Asks the active endpoint which network it is on and publishes the answer.
    ///
    /// Does nothing if no provider is configured yet. When `is_initial_call`
    /// is set and the lookup resolves, a [`NetworkEvent::NetworkDidChange`] is
    /// published so dependents can resynchronise.
    pub async fn lookup_network(&self, is_initial_call: bool) {
        let (transport, provider_type, epoch, initial) = {
            let board = lock(&self.inner.board);
            let Some(transport) = board.active.clone() else {
                tracing::warn!("network lookup aborted due to missing provider");
                return;
            };
            (
                transport,
                self.inner.provider_store.borrow().provider_type,
                board.epoch,
                self.get_network_state(),
            )
        };
        tracing::debug!(%provider_type, is_initial_call, "looking up network");

        let result = net_version(transport.as_ref()).await;

        {
            let board = lock(&self.inner.board);
            if board.epoch != epoch || self.get_network_state() != initial {
                tracing::debug!(%provider_type, "discarding stale network lookup");
                return;
            }
            let reported = match result {
                Ok(reported) => reported,
                Err(err) => {
                    tracing::warn!(%provider_type, error = %err, "network lookup failed");
                    self.inner.network_store.send_replace(NetworkStatus::Loading);
                    return;
                }
            };
            let reported = if provider_type == ProviderType::Artemis {
                ARTEMIS_CODE.to_owned()
            } else {
                reported
            };
            tracing::info!(%provider_type, network = %reported, "net_version returned");

            let network = board
                .registry
                .pinned_chain_id(provider_type)
                .map_or(reported, ToOwned::to_owned);
            self.inner
                .network_store
                .send_replace(NetworkStatus::Resolved(network));
        }

        if is_initial_call {
            self.emit(NetworkEvent::NetworkDidChange(provider_type));
        }
    }

    /// Switches to a named, local or private network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DisallowedProviderType`] for [`ProviderType::Rpc`],
    /// which must go through [`Self::set_custom_rpc`], and an error if no
    /// client can be built for `config`. Nothing changes on error.
    pub fn set_provider_config(&self, config: ProviderConfig) -> Result<(), Error> {
        if config.provider_type == ProviderType::Rpc {
            return Err(Error::DisallowedProviderType {
                provider_type: config.provider_type.to_string(),
                hint: "set_custom_rpc",
            });
        }
        self.switch_network(config)
    }

    /// Switches to `provider_type` with default settings.
    ///
    /// # Errors
    ///
    /// See [`Self::set_provider_config`].
    pub fn set_provider_type(&self, provider_type: ProviderType) -> Result<(), Error> {
        self.set_provider_config(ProviderConfig::new(provider_type))
    }

    /// Switches to a user-supplied RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if no client can be built for the endpoint.
    pub fn set_custom_rpc(&self, rpc: CustomRpc) -> Result<(), Error> {
        self.switch_network(rpc.into())
    }

    /// Rebuilds the client for the current configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no client can be built.
    pub fn reset_connection(&self) -> Result<(), Error> {
        self.switch_network(self.get_provider_config())
    }

    fn switch_network(&self, config: ProviderConfig) -> Result<(), Error> {
        let configured = self.configure_provider(&config)?;
        let provider_type = config.provider_type;
        {
            let mut board = lock(&self.inner.board);
            board.epoch += 1;
            self.inner.provider_store.send_replace(config);
            self.inner.network_store.send_replace(NetworkStatus::Loading);
            self.install(&mut board, configured);
        }
        tracing::info!(%provider_type, "network switched");
        self.emit(NetworkEvent::NetworkDidChange(provider_type));
        Ok(())
    }

    fn emit(&self, event: NetworkEvent) {
        tracing::debug!(?event, "emitting network event");
        // No subscribers is not an error.
        let _ = self.inner.events.send(event);
    }

    /// Builds the client for `config`, one factory call per provider type.
    fn configure_provider(&self, config: &ProviderConfig) -> Result<Configured, Error> {
        match config.provider_type {
            network @ (ProviderType::Mainnet
            | ProviderType::Ropsten
            | ProviderType::Rinkeby
            | ProviderType::Kovan
            | ProviderType::Goerli) => self.configure_infura_provider(network),
            ProviderType::Localhost => self.configure_localhost_provider(),
            ProviderType::Rpc => self.configure_standard_provider(config),
            ProviderType::Artemis => self.configure_artemis_provider(),
        }
    }

    fn configure_infura_provider(&self, network: ProviderType) -> Result<Configured, Error> {
        tracing::info!(%network, "configuring Infura provider");
        Ok(Configured {
            client: self.inner.factory.infura_client(network)?,
            custom_entry: None,
            settings: NetworkSettings::default(),
        })
    }

    fn configure_localhost_provider(&self) -> Result<Configured, Error> {
        tracing::info!("configuring localhost provider");
        Ok(Configured {
            client: self.inner.factory.localhost_client()?,
            custom_entry: None,
            settings: NetworkSettings {
                rpc_url: Url::parse(LOCALHOST_RPC_URL).ok(),
                ..NetworkSettings::default()
            },
        })
    }

    fn configure_standard_provider(&self, config: &ProviderConfig) -> Result<Configured, Error> {
        let rpc_url = config
            .rpc_target
            .clone()
            .ok_or_else(|| Error::config("custom RPC configuration has no rpcTarget"))?;
        tracing::info!(%rpc_url, "configuring standard provider");
        let ticker = if config.ticker.is_empty() {
            DEFAULT_TICKER.to_owned()
        } else {
            config.ticker.clone()
        };
        self.custom_configured(RegistryEntry {
            chain_id: config.chain_id.clone(),
            rpc_url,
            ticker,
            nickname: config.nickname.clone(),
        })
    }

    fn configure_artemis_provider(&self) -> Result<Configured, Error> {
        let rpc_url = self.inner.artemis_rpc_url.clone();
        tracing::info!(%rpc_url, "configuring Artemis provider");
        self.custom_configured(RegistryEntry {
            chain_id: Some(ARTEMIS_CODE.to_owned()),
            rpc_url,
            ticker: DEFAULT_TICKER.to_owned(),
            nickname: Some(ARTEMIS_DISPLAY_NAME.to_owned()),
        })
    }

    fn custom_configured(&self, entry: RegistryEntry) -> Result<Configured, Error> {
        let client = self.inner.factory.json_rpc_client(&entry.rpc_url)?;
        let settings = NetworkSettings {
            ticker: entry.ticker.clone(),
            network: entry.chain_id.clone(),
            chain_id: entry.chain_id.clone(),
            rpc_url: Some(entry.rpc_url.clone()),
            nickname: entry.nickname.clone(),
        };
        Ok(Configured {
            client,
            custom_entry: Some(entry),
            settings,
        })
    }

    /// Publishes `configured` and points the proxies at it.
    fn install(&self, board: &mut Switchboard, configured: Configured) {
        if let Some(entry) = configured.custom_entry {
            board.registry.set_custom(entry);
        }
        self.inner.settings_store.send_replace(configured.settings);

        let params = self.inner.base_params.get().cloned().unwrap_or_default();
        let provider: Arc<dyn Transport> = Arc::new(WalletMiddleware::new(
            params,
            configured.client.transport,
        ));
        let block_tracker: Arc<dyn BlockTracker> = configured.client.block_tracker;

        match &board.handles {
            Some(handles) => {
                handles.provider.rebind(Arc::clone(&provider));
                handles.block_tracker.rebind(block_tracker);
            }
            None => {
                board.handles = Some(ProviderHandles {
                    provider: ProviderProxy::bind(Arc::clone(&provider)),
                    block_tracker: BlockTrackerProxy::bind(block_tracker),
                });
            }
        }
        board.active = Some(provider);
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::network::block_tracker::BlockEvent;
    use crate::network::testing::{MockFactory, MockTransport};
    use crate::network::transport::JsonRpcRequest;

    fn controller_with(factory: &Arc<MockFactory>, provider: ProviderConfig) -> NetworkController {
        NetworkController::new(
            NetworkControllerOptions {
                provider,
                ..NetworkControllerOptions::default()
            },
            Arc::clone(factory) as Arc<dyn ClientFactory>,
        )
    }

    fn artemis_key() -> String {
        Url::parse(ARTEMIS_RPC_URL).unwrap().to_string()
    }

    #[tokio::test]
    async fn every_allowed_variant_resolves() {
        let factory = Arc::new(MockFactory::default());
        for (t, code) in [
            (ProviderType::Mainnet, "1"),
            (ProviderType::Ropsten, "3"),
            (ProviderType::Rinkeby, "4"),
            (ProviderType::Kovan, "42"),
            (ProviderType::Goerli, "5"),
        ] {
            factory.register(t.as_str(), Arc::new(MockTransport::new(code)));
        }
        factory.register("localhost", Arc::new(MockTransport::new("local-chain-id")));
        factory.register(artemis_key(), Arc::new(MockTransport::new("999")));

        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Localhost));
        controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap();

        for (t, expected) in [
            (ProviderType::Mainnet, "1"),
            (ProviderType::Ropsten, "3"),
            (ProviderType::Rinkeby, "4"),
            (ProviderType::Kovan, "42"),
            (ProviderType::Goerli, "5"),
            (ProviderType::Localhost, "local-chain-id"),
            (ProviderType::Artemis, "15"),
        ] {
            controller.set_provider_type(t).unwrap();
            assert!(controller.is_network_loading());
            controller.lookup_network(false).await;
            assert_eq!(
                controller.get_network_state(),
                NetworkStatus::Resolved(expected.into()),
                "{t}"
            );
        }
    }

    #[tokio::test]
    async fn failed_lookup_stays_loading_and_verify_recovers() {
        let factory = Arc::new(MockFactory::default());
        factory.register("goerli", Arc::new(MockTransport::failing()));
        let kovan = Arc::new(MockTransport::new("42"));
        factory.register("kovan", Arc::clone(&kovan) as Arc<dyn Transport>);
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Goerli));

        controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap();
        assert_eq!(controller.get_network_state(), NetworkStatus::Loading);

        controller.set_provider_type(ProviderType::Kovan).unwrap();
        controller.verify_network().await;
        assert_eq!(
            controller.get_network_state(),
            NetworkStatus::Resolved("42".into())
        );

        // Resolved networks are not looked up again.
        let lookups = kovan.request_count();
        controller.verify_network().await;
        assert_eq!(kovan.request_count(), lookups);
    }

    #[tokio::test]
    async fn late_response_from_superseded_network_is_discarded() {
        let factory = Arc::new(MockFactory::default());
        let (slow, gate) = MockTransport::gated("1");
        factory.register("mainnet", Arc::new(slow));
        factory.register("goerli", Arc::new(MockTransport::new("5")));
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Localhost));
        controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap();
        controller.set_provider_type(ProviderType::Mainnet).unwrap();

        let pending = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.lookup_network(false).await })
        };
        gate.wait_started().await;

        controller.set_provider_type(ProviderType::Goerli).unwrap();
        controller.lookup_network(false).await;
        assert_eq!(
            controller.get_network_state(),
            NetworkStatus::Resolved("5".into())
        );

        gate.release();
        pending.await.unwrap();
        assert_eq!(
            controller.get_network_state(),
            NetworkStatus::Resolved("5".into())
        );
    }

    #[tokio::test]
    async fn superseded_response_arriving_first_is_discarded() {
        let factory = Arc::new(MockFactory::default());
        let (slow, slow_gate) = MockTransport::gated("1");
        let (next, next_gate) = MockTransport::gated("5");
        factory.register("mainnet", Arc::new(slow));
        factory.register("goerli", Arc::new(next));
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Localhost));
        controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap();

        controller.set_provider_type(ProviderType::Mainnet).unwrap();
        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.lookup_network(false).await })
        };
        slow_gate.wait_started().await;

        controller.set_provider_type(ProviderType::Goerli).unwrap();
        let second = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.lookup_network(false).await })
        };
        next_gate.wait_started().await;

        // Both lookups were issued while loading; the older one answers first.
        slow_gate.release();
        first.await.unwrap();
        assert_eq!(controller.get_network_state(), NetworkStatus::Loading);

        next_gate.release();
        second.await.unwrap();
        assert_eq!(
            controller.get_network_state(),
            NetworkStatus::Resolved("5".into())
        );
    }

    #[tokio::test]
    async fn rpc_type_is_rejected_by_provider_setter() {
        let factory = Arc::new(MockFactory::default());
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Localhost));
        let before = controller.get_provider_config();

        let config = ProviderConfig {
            rpc_target: Some(Url::parse("http://x").unwrap()),
            chain_id: Some("99".into()),
            ..ProviderConfig::new(ProviderType::Rpc)
        };
        let err = controller.set_provider_config(config).unwrap_err();
        assert!(matches!(err, Error::DisallowedProviderType { .. }));
        assert_eq!(controller.get_provider_config(), before);
        assert!(factory.built().is_empty());

        let rpc = CustomRpc::new(Url::parse("http://x").unwrap()).with_chain_id("99");
        controller.set_custom_rpc(rpc).unwrap();
        assert_eq!(controller.get_provider_config().provider_type, ProviderType::Rpc);
    }

    #[tokio::test]
    async fn custom_rpc_without_target_is_a_config_error() {
        let factory = Arc::new(MockFactory::default());
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Rpc));
        let err = controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!controller.is_initialized());
    }

    #[tokio::test]
    async fn artemis_resolves_to_fixed_id_whatever_the_node_says() {
        let factory = Arc::new(MockFactory::default());
        factory.register(artemis_key(), Arc::new(MockTransport::new("4242")));
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Artemis));
        controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap();

        assert_eq!(
            controller.get_network_state(),
            NetworkStatus::Resolved(ARTEMIS_CODE.into())
        );
        let settings = controller.get_network_config();
        assert_eq!(settings.network.as_deref(), Some(ARTEMIS_CODE));
        assert_eq!(settings.nickname.as_deref(), Some(ARTEMIS_DISPLAY_NAME));
    }

    #[tokio::test]
    async fn handles_are_stable_and_follow_switches() {
        let factory = Arc::new(MockFactory::default());
        factory.register("localhost", Arc::new(MockTransport::new("1337")));
        factory.register("kovan", Arc::new(MockTransport::new("42")));
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Localhost));
        assert!(controller.get_provider_and_block_tracker().is_none());
        controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap();

        let handles = controller.get_provider_and_block_tracker().unwrap();
        let mut blocks = handles.block_tracker.subscribe();

        for t in [ProviderType::Kovan, ProviderType::Localhost, ProviderType::Kovan] {
            controller.set_provider_type(t).unwrap();
            let again = controller.get_provider_and_block_tracker().unwrap();
            assert!(again.provider.same_handle(&handles.provider));
            assert!(again.block_tracker.same_handle(&handles.block_tracker));
        }

        let version = handles
            .provider
            .request(JsonRpcRequest::new("net_version"))
            .await
            .unwrap();
        assert_eq!(version, serde_json::json!("42"));

        let trackers = factory.trackers();
        let (current, retired) = trackers.split_last().unwrap();
        assert!(retired.iter().all(|t| t.listener_count() == 0));
        assert_eq!(current.listener_count(), 1);

        retired[0].emit(BlockEvent::Latest(1));
        current.emit(BlockEvent::Latest(2));
        assert_eq!(blocks.try_recv().unwrap(), BlockEvent::Latest(2));
        assert!(matches!(blocks.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn local_then_custom_rpc_scenario() {
        let factory = Arc::new(MockFactory::default());
        factory.register("localhost", Arc::new(MockTransport::new("local-chain-id")));
        factory.register("http://x/", Arc::new(MockTransport::new("1337")));
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Localhost));
        let mut events = controller.subscribe();

        assert!(!controller.is_initialized());
        assert_eq!(controller.get_network_state(), NetworkStatus::Loading);

        controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap();
        assert!(controller.is_initialized());
        assert_eq!(
            controller.get_network_state(),
            NetworkStatus::Resolved("local-chain-id".into())
        );
        assert_eq!(
            events.try_recv().unwrap(),
            NetworkEvent::NetworkDidChange(ProviderType::Localhost)
        );

        let rpc = CustomRpc::new(Url::parse("http://x").unwrap()).with_chain_id("99");
        controller.set_custom_rpc(rpc).unwrap();
        assert_eq!(controller.get_network_state(), NetworkStatus::Loading);
        assert_eq!(
            events.try_recv().unwrap(),
            NetworkEvent::NetworkDidChange(ProviderType::Rpc)
        );

        controller.lookup_network(false).await;
        assert_eq!(
            controller.get_network_state(),
            NetworkStatus::Resolved("99".into())
        );
        assert_eq!(
            controller.custom_network().unwrap().chain_id.as_deref(),
            Some("99")
        );
        assert_eq!(controller.get_network_config().chain_id.as_deref(), Some("99"));
        // Non-initial lookups do not notify.
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn lookup_before_initialize_is_a_no_op() {
        let factory = Arc::new(MockFactory::default());
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Localhost));
        controller.lookup_network(true).await;
        controller.verify_network().await;
        assert_eq!(controller.get_network_state(), NetworkStatus::Loading);
        assert!(factory.built().is_empty());
    }

    #[tokio::test]
    async fn second_initialize_is_ignored_and_reset_rebuilds() {
        let factory = Arc::new(MockFactory::default());
        let controller = controller_with(&factory, ProviderConfig::new(ProviderType::Localhost));
        controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap();
        controller
            .initialize_provider(ProviderParams::default())
            .await
            .unwrap();
        assert_eq!(factory.built(), vec!["localhost"]);

        controller.reset_connection().unwrap();
        assert_eq!(factory.built(), vec!["localhost", "localhost"]);
        assert!(controller.is_network_loading());
    }
}
