//! `netctl init`: write the starter configuration.
//!
//! The template selects Artemis as the start-up network, points the state
//! file at the working directory and leaves the Infura project id as an
//! environment reference that may stay unset.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::config::generate_default_config;
use crate::error::Error;

/// Writes the starter configuration to `output`.
///
/// An existing file is only replaced when `force` is set.
///
/// # Errors
///
/// Returns an error if `output` exists without `force` or cannot be written.
#[allow(clippy::print_stderr)]
pub fn run(output: &Path, force: bool) -> Result<(), Error> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options.open(output).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => Error::config(format!(
            "'{}' already exists, pass --force to replace it",
            output.display()
        )),
        _ => Error::config_with(format!("cannot create '{}'", output.display()), e),
    })?;
    file.write_all(generate_default_config().as_bytes())
        .map_err(|e| Error::config_with(format!("cannot write '{}'", output.display()), e))?;

    eprintln!("Wrote {}; edit [provider] to pick the start-up network", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use crate::network::ProviderType;

    #[test]
    fn written_template_loads_and_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        run(&path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), generate_default_config());
        let config = load_config(&path).unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::Artemis);

        std::fs::write(&path, "port = 1").unwrap();
        assert!(matches!(run(&path, false), Err(Error::Config(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "port = 1");

        run(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), generate_default_config());
    }
}
