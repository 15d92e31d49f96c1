//! Built-in network metadata and the per-controller registry cache.
//!
//! The static tables describe the networks the wallet knows about out of the
//! box. [`NetworkRegistry`] is the mutable part: configuring a custom or
//! private endpoint records it under [`CUSTOM_NETWORK_KEY`], and lookups for
//! that provider type resolve to the recorded chain id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::ProviderType;

/// Native currency symbol used when none is configured.
pub const DEFAULT_TICKER: &str = "ARS";

/// Network id the Artemis private network always resolves to.
pub const ARTEMIS_CODE: &str = "15";
/// Display name of the Artemis private network.
pub const ARTEMIS_DISPLAY_NAME: &str = "Artemis";
/// RPC endpoint of the Artemis private network.
pub const ARTEMIS_RPC_URL: &str = "http://10.0.2.93:8000";
/// Block explorer of the Artemis private network.
pub const ARTEMIS_EXPLORER_URL: &str = "http://10.0.2.93:3000/home";

/// Local development node endpoint.
pub const LOCALHOST_RPC_URL: &str = "http://localhost:8545/";

/// Registry key under which the most recently configured custom network lives.
pub const CUSTOM_NETWORK_KEY: &str = "rpc";

const MAINNET_CODE: &str = "1";
const ROPSTEN_CODE: &str = "3";
const RINKEBY_CODE: &str = "4";
const GOERLI_CODE: &str = "5";
const KOVAN_CODE: &str = "42";

/// Network code reported by `net_version` for each named network.
#[must_use]
pub const fn network_code(provider_type: ProviderType) -> Option<&'static str> {
    match provider_type {
        ProviderType::Mainnet => Some(MAINNET_CODE),
        ProviderType::Ropsten => Some(ROPSTEN_CODE),
        ProviderType::Rinkeby => Some(RINKEBY_CODE),
        ProviderType::Goerli => Some(GOERLI_CODE),
        ProviderType::Kovan => Some(KOVAN_CODE),
        ProviderType::Artemis => Some(ARTEMIS_CODE),
        ProviderType::Localhost | ProviderType::Rpc => None,
    }
}

/// Human readable name of a named network.
#[must_use]
pub const fn display_name(provider_type: ProviderType) -> Option<&'static str> {
    match provider_type {
        ProviderType::Mainnet => Some("Ethereum Mainnet"),
        ProviderType::Ropsten => Some("Ropsten"),
        ProviderType::Rinkeby => Some("Rinkeby"),
        ProviderType::Kovan => Some("Kovan"),
        ProviderType::Goerli => Some("Goerli"),
        ProviderType::Artemis => Some(ARTEMIS_DISPLAY_NAME),
        ProviderType::Localhost | ProviderType::Rpc => None,
    }
}

/// Resolves a display name from either a provider type name or a network code.
#[must_use]
pub fn network_display_name(key: &str) -> Option<&'static str> {
    ProviderType::ALL.into_iter().find_map(|t| {
        let matches = t.as_str() == key || network_code(t) == Some(key);
        if matches { display_name(t) } else { None }
    })
}

/// A built-in network offered to configuration surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDescriptor {
    /// Translation key of the label.
    pub label_key: &'static str,
    /// Provider type selecting this network.
    pub provider_type: ProviderType,
    /// Endpoint URL.
    pub rpc_url: &'static str,
    /// Chain id, when fixed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<&'static str>,
    /// Native currency symbol, when fixed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<&'static str>,
    /// Block explorer.
    pub block_explorer_url: &'static str,
}

/// Networks listed in the settings screen by default.
#[must_use]
pub fn default_networks() -> Vec<NetworkDescriptor> {
    vec![
        NetworkDescriptor {
            label_key: "artemis",
            provider_type: ProviderType::Artemis,
            rpc_url: ARTEMIS_RPC_URL,
            chain_id: Some(ARTEMIS_CODE),
            ticker: Some(DEFAULT_TICKER),
            block_explorer_url: ARTEMIS_EXPLORER_URL,
        },
        NetworkDescriptor {
            label_key: "localhost",
            provider_type: ProviderType::Localhost,
            rpc_url: LOCALHOST_RPC_URL,
            chain_id: None,
            ticker: None,
            block_explorer_url: "https://etherscan.io",
        },
    ]
}

/// Cached description of a configured endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Chain id to report for the endpoint, if declared.
    pub chain_id: Option<String>,
    /// Endpoint URL.
    pub rpc_url: url::Url,
    /// Native currency symbol.
    pub ticker: String,
    /// Display name.
    pub nickname: Option<String>,
}

/// Registry cache owned by one controller.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NetworkRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entry` as the current custom network, replacing any previous one.
    pub fn set_custom(&mut self, entry: RegistryEntry) {
        self.entries.insert(CUSTOM_NETWORK_KEY.to_owned(), entry);
    }

    /// The current custom network entry.
    #[must_use]
    pub fn custom(&self) -> Option<&RegistryEntry> {
        self.entries.get(CUSTOM_NETWORK_KEY)
    }

    /// Entry recorded for `provider_type`.
    #[must_use]
    pub fn get(&self, provider_type: ProviderType) -> Option<&RegistryEntry> {
        self.entries.get(provider_type.as_str())
    }

    /// Chain id pinned for `provider_type`, overriding whatever the node reports.
    #[must_use]
    pub fn pinned_chain_id(&self, provider_type: ProviderType) -> Option<&str> {
        self.get(provider_type)?.chain_id.as_deref()
    }
}
