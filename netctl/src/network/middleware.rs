//! Wallet middleware placed in front of every network transport.
//!
//! Account and client identity methods are answered locally from the
//! [`ProviderParams`] given at initialisation; signing methods are refused;
//! everything else goes to the network.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transport::{JsonRpcRequest, Transport};
use crate::error::TransportError;

const SIGNING_METHODS: &[&str] = &[
    "eth_sendTransaction",
    "eth_sign",
    "personal_sign",
    "eth_signTypedData",
    "eth_signTypedData_v3",
    "eth_signTypedData_v4",
];

/// Base parameters every provider is built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderParams {
    /// Value returned for `web3_clientVersion`.
    pub client_version: String,
    /// Accounts exposed to callers, first one is the coinbase.
    #[serde(default)]
    pub accounts: Vec<String>,
}

impl Default for ProviderParams {
    fn default() -> Self {
        Self {
            client_version: concat!(env!("CARGO_PKG_NAME"), "/v", env!("CARGO_PKG_VERSION"))
                .to_owned(),
            accounts: Vec::new(),
        }
    }
}

/// Transport answering wallet methods locally and forwarding the rest.
#[derive(Debug)]
pub struct WalletMiddleware {
    params: ProviderParams,
    next: Arc<dyn Transport>,
}

impl WalletMiddleware {
    /// Wraps `next` with the wallet methods described by `params`.
    #[must_use]
    pub const fn new(params: ProviderParams, next: Arc<dyn Transport>) -> Self {
        Self { params, next }
    }
}

#[async_trait]
impl Transport for WalletMiddleware {
    async fn request(&self, request: JsonRpcRequest) -> Result<Value, TransportError> {
        match request.method.as_str() {
            "web3_clientVersion" => Ok(Value::String(self.params.client_version.clone())),
            "eth_accounts" | "eth_requestAccounts" => Ok(Value::from(self.params.accounts.clone())),
            "eth_coinbase" => Ok(self
                .params
                .accounts
                .first()
                .map_or(Value::Null, |a| Value::String(a.clone()))),
            method if SIGNING_METHODS.contains(&method) => {
                Err(TransportError::Unsupported(method.to_owned()))
            }
            _ => self.next.request(request).await,
        }
    }
}
