//! Background task keeping the network status current.
//!
//! Looks the network up after every switch and re-verifies it on each new
//! block while it is still loading. Block events are picked up as soon as the
//! controller installs its first provider, whether or not that provider's
//! first lookup succeeds.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::block_tracker::BlockEvent;
use super::controller::NetworkController;
use super::types::NetworkEvent;

/// Spawns the watcher. It runs until `shutdown` is cancelled.
///
/// Subscriptions are taken before this returns, so no switch made after the
/// call is missed.
pub fn spawn(controller: NetworkController, shutdown: CancellationToken) -> JoinHandle<()> {
    let mut events = controller.subscribe();
    let mut settings = controller.watch_settings();
    let mut settings_open = true;
    let mut blocks = block_events(&controller);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = settings.changed(), if settings_open => {
                    settings_open = changed.is_ok();
                    if blocks.is_none() {
                        blocks = block_events(&controller);
                    }
                }
                event = events.recv() => match event {
                    Ok(NetworkEvent::NetworkDidChange(provider_type)) => {
                        tracing::debug!(%provider_type, "network changed");
                        if blocks.is_none() {
                            blocks = block_events(&controller);
                        }
                        spawn_lookup(&controller);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed network events");
                        spawn_lookup(&controller);
                    }
                    Err(RecvError::Closed) => break,
                },
                block = next_block(&mut blocks) => match block {
                    Ok(BlockEvent::Latest(number)) => {
                        tracing::trace!(number, "new block");
                        if controller.is_network_loading() {
                            let controller = controller.clone();
                            tokio::spawn(async move { controller.verify_network().await });
                        }
                    }
                    Ok(BlockEvent::Error(error)) => tracing::warn!(%error, "block tracker error"),
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => blocks = None,
                },
            }
        }
        tracing::debug!("network watcher stopped");
    })
}

fn block_events(controller: &NetworkController) -> Option<broadcast::Receiver<BlockEvent>> {
    controller
        .get_provider_and_block_tracker()
        .map(|handles| handles.block_tracker.subscribe())
}

async fn next_block(
    blocks: &mut Option<broadcast::Receiver<BlockEvent>>,
) -> Result<BlockEvent, RecvError> {
    match blocks {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn spawn_lookup(controller: &NetworkController) {
    let controller = controller.clone();
    tokio::spawn(async move { controller.lookup_network(false).await });
}
