//! Configuration loading and default template generation.
//!
//! - [`Config`]: server, provider and telemetry settings.
//! - [`load_config`]: reads and parses a TOML configuration file.
//! - [`generate_default_config`]: produces a commented TOML template.
//!
//! # Configuration File Format
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! infura_project_id = "$INFURA_PROJECT_ID"
//!
//! [provider]
//! type = "artemis"
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::network::registry::ARTEMIS_RPC_URL;
use crate::network::{ProviderConfig, ProviderParams, ProviderType};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STATE_FILE: &str = "netctl-state.json";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bind address. Falls back to `HOST`, then `0.0.0.0`.
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// Bind port. Falls back to `PORT`, then 8080.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Infura project id, or a `$VAR` / `${VAR}` reference to one.
    #[serde(default)]
    pub infura_project_id: Option<String>,
    /// Where the active provider configuration is persisted.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Seconds between block polls.
    #[serde(default = "default_poll_interval_secs")]
    pub block_poll_interval_secs: u64,
    /// Endpoint of the Artemis private network.
    #[serde(default = "default_artemis_rpc_url")]
    pub artemis_rpc_url: Url,
    /// Provider configuration used when no state file exists.
    #[serde(default = "default_provider")]
    pub provider: ProviderConfig,
    /// Wallet identity served by the provider middleware.
    #[serde(default)]
    pub wallet: WalletConfig,
    /// Logging settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// `[wallet]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Overrides the reported `web3_clientVersion`.
    #[serde(default)]
    pub client_version: Option<String>,
    /// Accounts returned by `eth_accounts`.
    #[serde(default)]
    pub accounts: Vec<String>,
}

/// `[telemetry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Block polling interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.block_poll_interval_secs)
    }

    /// Parameters every provider is built with.
    #[must_use]
    pub fn provider_params(&self) -> ProviderParams {
        let defaults = ProviderParams::default();
        ProviderParams {
            client_version: self
                .wallet
                .client_version
                .clone()
                .unwrap_or(defaults.client_version),
            accounts: self.wallet.accounts.clone(),
        }
    }
}

fn default_host() -> IpAddr {
    std::env::var("HOST")
        .ok()
        .and_then(|h| h.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_artemis_rpc_url() -> Url {
    Url::parse(ARTEMIS_RPC_URL).expect("valid built-in Artemis URL")
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_provider() -> ProviderConfig {
    let in_test = std::env::var("IN_TEST").is_ok_and(|v| v == "true");
    ProviderConfig::new(default_provider_type(in_test))
}

/// Network used when nothing else is configured.
#[must_use]
pub const fn default_provider_type(in_test: bool) -> ProviderType {
    if in_test {
        ProviderType::Localhost
    } else {
        ProviderType::Artemis
    }
}

/// Resolve an environment-variable reference (`$VAR` or `${VAR}`), returning
/// the literal string unchanged if it does not match either pattern.
pub fn resolve_env(value: &str) -> Result<String, Error> {
    let name = if let Some(name) = value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        name
    } else if let Some(name) = value.strip_prefix('$')
        && !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        name
    } else {
        return Ok(value.to_owned());
    };
    std::env::var(name)
        .map_err(|_| Error::config(format!("env var '{name}' not found (referenced as '{value}')")))
}

/// Load configuration from a TOML file at the given path.
///
/// # Errors
///
/// Returns an error if the file cannot be resolved, read, or parsed.
pub fn load_config(path: &Path) -> Result<Config, Error> {
    let config_path = path.canonicalize().map_err(|e| {
        Error::config_with(format!("failed to resolve config path '{}'", path.display()), e)
    })?;
    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        Error::config_with(format!("failed to read '{}'", config_path.display()), e)
    })?;
    parse_config(&content).map_err(|e| match e {
        Error::Config(msg) => {
            Error::config(format!("invalid config '{}': {msg}", config_path.display()))
        }
        other => other,
    })
}

/// Parses a configuration. An unset `infura_project_id` reference leaves the
/// id empty; only the hosted networks need it.
fn parse_config(content: &str) -> Result<Config, Error> {
    let mut config: Config =
        toml::from_str(content).map_err(|e| Error::config_with("failed to parse TOML", e))?;
    config.infura_project_id = match config.infura_project_id.as_deref().map(resolve_env) {
        Some(Ok(id)) => Some(id),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "infura_project_id unresolved, hosted networks unavailable");
            None
        }
        None => None,
    };
    Ok(config)
}

/// Generate a default TOML configuration template.
#[must_use]
pub fn generate_default_config() -> String {
    format!(
        r#"# netctl configuration

# Server bind address and port.
# Can also be set via HOST / PORT environment variables.
host = "0.0.0.0"
port = {DEFAULT_PORT}

# Required for the hosted networks (mainnet, ropsten, rinkeby, kovan, goerli).
# Supports "$VAR" or "${{VAR}}" environment references.
infura_project_id = "$INFURA_PROJECT_ID"

# The active network is persisted here and restored on start-up.
state_file = "{DEFAULT_STATE_FILE}"

block_poll_interval_secs = {DEFAULT_POLL_INTERVAL_SECS}
artemis_rpc_url = "{ARTEMIS_RPC_URL}"

# Network used when no state file exists.
# type: mainnet | ropsten | rinkeby | kovan | goerli | localhost | rpc | artemis
[provider]
type = "artemis"
ticker = "ARS"

# A custom endpoint looks like:
#
# [provider]
# type = "rpc"
# rpcTarget = "https://rpc.example.org"
# chainId = "99"
# nickname = "Example"

[wallet]
accounts = []

[telemetry]
# Used when RUST_LOG is unset.
log_level = "info"
json = false
"#
    )
}
