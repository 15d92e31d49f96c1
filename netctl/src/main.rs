//! `netctl` command line.
//!
//! ```sh
//! netctl init            # Generate default config.toml
//! netctl serve           # Run the controller and its API
//! netctl lookup          # Resolve the configured network once
//! netctl networks        # List the built-in networks
//! ```

use clap::Parser;
use netctl::cmd::{self, Cli, Commands};

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { output, force } => cmd::init::run(&output, force),
        Commands::Serve { config } => cmd::serve::run(&config).await,
        Commands::Networks { json } => cmd::networks::run(json),
        Commands::Lookup { config } => cmd::lookup::run(&config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
