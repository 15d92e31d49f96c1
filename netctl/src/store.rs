//! Persistence of the active provider configuration.

use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::network::ProviderConfig;

/// JSON file holding the last active [`ProviderConfig`].
#[derive(Debug, Clone)]
pub struct ProviderConfigStore {
    path: PathBuf,
}

impl ProviderConfigStore {
    /// Store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The persisted configuration, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<ProviderConfig>, Error> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::store_with(
                    format!("failed to read '{}'", self.path.display()),
                    e,
                ));
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::store_with(format!("invalid state in '{}'", self.path.display()), e))
    }

    /// Replaces the persisted configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, config: &ProviderConfig) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| Error::store_with("failed to encode provider config", e))?;
        let tmp = self.path.with_extension("tmp");
        let written = match tokio::fs::write(&tmp, json).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };
        written.map_err(|e| Error::store_with(format!("failed to write '{}'", self.path.display()), e))
    }

    /// Saves every configuration published on `provider` until `shutdown`.
    ///
    /// Write failures are logged and do not stop the loop.
    pub async fn follow(
        self,
        mut provider: watch::Receiver<ProviderConfig>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = provider.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let config = provider.borrow_and_update().clone();
                    match self.save(&config).await {
                        Ok(()) => tracing::debug!(provider_type = %config.provider_type, "provider config saved"),
                        Err(err) => tracing::warn!(error = %err, "failed to persist provider config"),
                    }
                }
            }
        }
    }
}
