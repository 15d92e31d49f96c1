//! Coordinated shutdown.
//!
//! [`Shutdown`] cancels a shared [`CancellationToken`] on SIGTERM/SIGINT
//! (Ctrl+C on Windows) and tracks the background tasks that must drain
//! before the process exits.

use std::future::Future;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Shutdown token plus the tasks waiting on it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    token: CancellationToken,
    tasks: TaskTracker,
}

impl Shutdown {
    /// Registers the OS signal handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if signal registration fails.
    pub fn listen() -> Result<Self, std::io::Error> {
        let shutdown = Self {
            token: CancellationToken::new(),
            tasks: TaskTracker::new(),
        };
        let token = shutdown.token.clone();

        #[cfg(unix)]
        {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                    _ = sigint.recv() => tracing::info!("received SIGINT"),
                    () = token.cancelled() => return,
                }
                token.cancel();
            });
        }

        #[cfg(windows)]
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => token.cancel(),
                () = token.cancelled() => {}
            }
        });

        Ok(shutdown)
    }

    /// Token cancelled when shutdown starts.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Starts shutdown without a signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Spawns a task that [`Self::drain`] waits for.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(task)
    }

    /// Tracks an already spawned task.
    pub fn track(&self, handle: JoinHandle<()>) {
        self.tasks.spawn(async move {
            if let Err(err) = handle.await {
                tracing::error!(%err, "background task failed");
            }
        });
    }

    /// Waits until every tracked task has finished.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn drain_waits_for_tasks_observing_the_token() {
        let shutdown = Shutdown::listen().unwrap();
        let token = shutdown.token();
        let (tx, rx) = tokio::sync::oneshot::channel();
        shutdown.spawn(async move {
            token.cancelled().await;
            tx.send(()).unwrap();
        });

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), shutdown.drain())
            .await
            .unwrap();
        rx.await.unwrap();
    }
}
