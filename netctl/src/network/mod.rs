//! Network selection and provider management.
//!
//! The [`NetworkController`] owns the active network configuration and hands
//! out a [`ProviderProxy`] and a [`BlockTrackerProxy`] that stay valid while
//! the network underneath them is switched.

pub mod block_tracker;
pub mod client;
pub mod controller;
pub mod middleware;
pub mod proxy;
pub mod registry;
pub mod transport;
pub mod types;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use block_tracker::{BlockEvent, BlockTracker, PollingBlockTracker};
pub use client::{ClientFactory, HttpClientFactory, NetworkClient};
pub use controller::{NetworkController, NetworkControllerOptions, ProviderHandles};
pub use middleware::{ProviderParams, WalletMiddleware};
pub use proxy::{BlockTrackerProxy, ProviderProxy};
pub use registry::{NetworkDescriptor, NetworkRegistry, RegistryEntry};
pub use transport::{HttpTransport, JsonRpcRequest, Transport};
pub use types::{
    CustomRpc, NetworkControllerState, NetworkEvent, NetworkSettings, NetworkStatus,
    ProviderConfig, ProviderType, RpcPreferences,
};

// Guarded state is only ever replaced wholesale; poisoning is ignored.

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
