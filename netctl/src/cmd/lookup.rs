//! `netctl lookup`: resolve the configured network once.

use std::path::Path;

use dotenvy::dotenv;

use crate::cmd::controller_from_config;
use crate::config::load_config;
use crate::error::Error;
use crate::telemetry::Telemetry;

/// Connects to the configured network, performs one lookup and prints the
/// resulting controller state as JSON.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or no client can be
/// built for the configured provider.
#[allow(clippy::print_stdout)]
pub async fn run(config_path: &Path) -> Result<(), Error> {
    dotenv().ok();
    let config = load_config(config_path)?;
    let _telemetry = Telemetry::new()
        .with_log_level("warn")
        .with_json(config.telemetry.json)
        .register();

    let (controller, _) = controller_from_config(&config);
    controller
        .initialize_provider(config.provider_params())
        .await?;

    let state = serde_json::to_string_pretty(&controller.state())
        .map_err(|e| Error::config_with("failed to encode state", e))?;
    println!("{state}");
    Ok(())
}
