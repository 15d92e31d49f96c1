//! Provider configuration, network status and settings types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use super::registry::DEFAULT_TICKER;
use crate::error::Error;

/// Kind of network endpoint the wallet talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Ethereum mainnet through the hosted Infura endpoint.
    Mainnet,
    /// Ropsten testnet through Infura.
    Ropsten,
    /// Rinkeby testnet through Infura.
    Rinkeby,
    /// Kovan testnet through Infura.
    Kovan,
    /// Goerli testnet through Infura.
    Goerli,
    /// Local development node.
    Localhost,
    /// User-supplied RPC URL.
    Rpc,
    /// Fixed Artemis private network.
    Artemis,
}

impl ProviderType {
    /// Every provider type, in display order.
    pub const ALL: [Self; 8] = [
        Self::Mainnet,
        Self::Ropsten,
        Self::Rinkeby,
        Self::Kovan,
        Self::Goerli,
        Self::Localhost,
        Self::Rpc,
        Self::Artemis,
    ];

    /// Stable lowercase identifier, also used as the registry key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Ropsten => "ropsten",
            Self::Rinkeby => "rinkeby",
            Self::Kovan => "kovan",
            Self::Goerli => "goerli",
            Self::Localhost => "localhost",
            Self::Rpc => "rpc",
            Self::Artemis => "artemis",
        }
    }

    /// Whether this network is served by the hosted Infura endpoints.
    #[must_use]
    pub const fn is_infura(self) -> bool {
        matches!(
            self,
            Self::Mainnet | Self::Ropsten | Self::Rinkeby | Self::Kovan | Self::Goerli
        )
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownProviderType(s.to_owned()))
    }
}

/// Opaque per-network preferences carried alongside a custom RPC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcPreferences {
    /// Block explorer to link transactions to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_explorer_url: Option<Url>,
    /// Anything else the caller wants to keep with the network.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The active provider configuration. Replaced wholesale on every switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Which kind of endpoint to connect to.
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// RPC URL, required for [`ProviderType::Rpc`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_target: Option<Url>,
    /// Chain id declared by the user for a custom RPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    /// Native currency symbol.
    #[serde(default = "default_ticker")]
    pub ticker: String,
    /// Display name for a custom RPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Opaque preferences for a custom RPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_prefs: Option<RpcPreferences>,
}

fn default_ticker() -> String {
    DEFAULT_TICKER.to_owned()
}

impl ProviderConfig {
    /// A configuration for `provider_type` with every optional field unset.
    #[must_use]
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            rpc_target: None,
            chain_id: None,
            ticker: default_ticker(),
            nickname: None,
            rpc_prefs: None,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(ProviderType::Artemis)
    }
}

/// Parameters for pointing the wallet at a user-supplied RPC endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRpc {
    /// Endpoint URL.
    pub rpc_target: Url,
    /// Chain id the user declared for the endpoint.
    #[serde(default)]
    pub chain_id: Option<String>,
    /// Native currency symbol, defaults to the wallet ticker.
    #[serde(default)]
    pub ticker: Option<String>,
    /// Display name.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Opaque preferences.
    #[serde(default)]
    pub rpc_prefs: Option<RpcPreferences>,
}

impl CustomRpc {
    /// Custom RPC at `rpc_target` with no other details.
    #[must_use]
    pub const fn new(rpc_target: Url) -> Self {
        Self {
            rpc_target,
            chain_id: None,
            ticker: None,
            nickname: None,
            rpc_prefs: None,
        }
    }

    /// Sets the declared chain id.
    #[must_use]
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    /// Sets the currency ticker.
    #[must_use]
    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }
}

impl From<CustomRpc> for ProviderConfig {
    fn from(rpc: CustomRpc) -> Self {
        Self {
            provider_type: ProviderType::Rpc,
            rpc_target: Some(rpc.rpc_target),
            chain_id: rpc.chain_id,
            ticker: rpc.ticker.unwrap_or_else(default_ticker),
            nickname: Some(rpc.nickname.unwrap_or_default()),
            rpc_prefs: rpc.rpc_prefs,
        }
    }
}

/// Resolution state of the active network.
///
/// Serialised as `"loading"` or as the resolved network id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkStatus {
    /// A switch or lookup is in flight, or the last lookup failed.
    Loading,
    /// The network identified itself with this id.
    Resolved(String),
}

const LOADING: &str = "loading";

impl NetworkStatus {
    /// Whether the status is [`NetworkStatus::Loading`].
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The resolved network id, if any.
    #[must_use]
    pub fn network_id(&self) -> Option<&str> {
        match self {
            Self::Loading => None,
            Self::Resolved(id) => Some(id),
        }
    }
}

impl From<String> for NetworkStatus {
    fn from(value: String) -> Self {
        if value == LOADING {
            Self::Loading
        } else {
            Self::Resolved(value)
        }
    }
}

impl From<NetworkStatus> for String {
    fn from(status: NetworkStatus) -> Self {
        match status {
            NetworkStatus::Loading => LOADING.to_owned(),
            NetworkStatus::Resolved(id) => id,
        }
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.network_id().unwrap_or(LOADING))
    }
}

/// Display and metadata bundle republished whenever a provider is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettings {
    /// Native currency symbol.
    pub ticker: String,
    /// Network id the settings were derived for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Declared chain id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    /// Endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            network: None,
            chain_id: None,
            rpc_url: None,
            nickname: None,
        }
    }
}

/// Composed view of the three observable controller slices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkControllerState {
    /// Active provider configuration.
    pub provider: ProviderConfig,
    /// Resolution status.
    pub network: NetworkStatus,
    /// Derived settings.
    pub settings: NetworkSettings,
}

/// Notification published by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// The active network changed, or the initial lookup completed.
    NetworkDidChange(ProviderType),
}
