//! `netctl networks`: list the built-in networks.

use std::fmt::Write as _;

use crate::error::Error;
use crate::network::registry::{NetworkDescriptor, default_networks, network_display_name};

/// Prints the built-in network descriptors.
///
/// # Errors
///
/// Returns an error if JSON encoding fails.
#[allow(clippy::print_stdout)]
pub fn run(json: bool) -> Result<(), Error> {
    let networks = default_networks();
    if json {
        let out = serde_json::to_string_pretty(&networks)
            .map_err(|e| Error::config_with("failed to encode networks", e))?;
        println!("{out}");
    } else {
        print!("{}", render_table(&networks));
    }
    Ok(())
}

fn render_table(networks: &[NetworkDescriptor]) -> String {
    let mut out = format!("{:<18} {:<10} {:<8} {}\n", "NAME", "TYPE", "CHAIN", "RPC URL");
    for network in networks {
        let name = network_display_name(network.provider_type.as_str()).unwrap_or(network.label_key);
        let _ = writeln!(
            out,
            "{:<18} {:<10} {:<8} {}",
            name,
            network.provider_type,
            network.chain_id.unwrap_or("-"),
            network.rpc_url
        );
    }
    out
}
