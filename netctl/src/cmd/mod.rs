//! CLI definitions and command implementations.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::network::{HttpClientFactory, NetworkController, NetworkControllerOptions};
use crate::store::ProviderConfigStore;

pub mod init;
pub mod lookup;
pub mod networks;
pub mod serve;

/// Wallet network controller: switch, resolve and serve the active network.
#[derive(Debug, Parser)]
#[command(name = "netctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a default TOML configuration file.
    Init {
        /// Output path for the configuration file.
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite the file if it already exists.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Run the controller and its HTTP API.
    Serve {
        /// Path to the TOML configuration file.
        #[arg(short, long, env = "CONFIG", default_value = "config.toml")]
        config: PathBuf,
    },

    /// List the built-in networks.
    Networks {
        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Connect once, resolve the network and print the controller state.
    Lookup {
        /// Path to the TOML configuration file.
        #[arg(short, long, env = "CONFIG", default_value = "config.toml")]
        config: PathBuf,
    },
}

/// Builds the controller for `config`, starting from the persisted provider
/// configuration when one exists.
pub(crate) fn controller_from_config(config: &Config) -> (NetworkController, ProviderConfigStore) {
    let store = ProviderConfigStore::new(&config.state_file);
    let provider = match store.load() {
        Ok(Some(provider)) => {
            tracing::info!(provider_type = %provider.provider_type, "restored provider config");
            provider
        }
        Ok(None) => config.provider.clone(),
        Err(err) => {
            tracing::warn!(error = %err, "ignoring unreadable provider state");
            config.provider.clone()
        }
    };
    let factory = HttpClientFactory::new(config.infura_project_id.clone())
        .with_poll_interval(config.poll_interval());
    let controller = NetworkController::new(
        NetworkControllerOptions {
            provider,
            artemis_rpc_url: config.artemis_rpc_url.clone(),
        },
        Arc::new(factory),
    );
    (controller, store)
}
