//! JSON-RPC transports.
//!
//! [`Transport`] is the seam every provider sits behind: the HTTP transport
//! built by the client factory, the wallet middleware wrapping it, and the
//! swappable proxy handed out to the rest of the application.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::TransportError;

/// A JSON-RPC method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Method name.
    pub method: String,
    /// Positional parameters.
    #[serde(default = "empty_params")]
    pub params: Value,
}

fn empty_params() -> Value {
    Value::Array(Vec::new())
}

impl JsonRpcRequest {
    /// A call to `method` without parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: empty_params(),
        }
    }

    /// A call to `method` with `params`.
    pub fn with_params(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Something able to answer JSON-RPC requests.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and returns the `result` member of the response.
    async fn request(&self, request: JsonRpcRequest) -> Result<Value, TransportError>;
}

/// Asks the transport which network it is connected to.
///
/// # Errors
///
/// Returns an error if the request fails or the result is neither a string
/// nor a number.
pub async fn net_version(transport: &dyn Transport) -> Result<String, TransportError> {
    match transport.request(JsonRpcRequest::new("net_version")).await? {
        Value::String(version) => Ok(version),
        Value::Number(version) => Ok(version.to_string()),
        other => Err(TransportError::InvalidResponse(format!(
            "net_version returned {other}"
        ))),
    }
}

/// Fetches the latest block number.
///
/// # Errors
///
/// Returns an error if the request fails or the result is not a hex quantity.
pub async fn block_number(transport: &dyn Transport) -> Result<u64, TransportError> {
    let value = transport
        .request(JsonRpcRequest::new("eth_blockNumber"))
        .await?;
    let hex = value
        .as_str()
        .and_then(|s| s.strip_prefix("0x"))
        .ok_or_else(|| TransportError::InvalidResponse(format!("eth_blockNumber returned {value}")))?;
    u64::from_str_radix(hex, 16)
        .map_err(|e| TransportError::InvalidResponse(format!("bad block number {value}: {e}")))
}

#[derive(Serialize)]
struct Envelope<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 over HTTP POST.
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Transport posting to `url` with a shared HTTP client.
    #[must_use]
    pub const fn new(http: reqwest::Client, url: Url) -> Self {
        Self {
            http,
            url,
            next_id: AtomicU64::new(1),
        }
    }

    /// Endpoint this transport posts to.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: JsonRpcRequest) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = Envelope {
            jsonrpc: "2.0",
            id,
            method: &request.method,
            params: &request.params,
        };
        tracing::trace!(url = %self.url, id, method = %request.method, "rpc request");

        let response = self.http.post(self.url.clone()).json(&body).send().await?;
        let status_error = response.error_for_status_ref().err();
        let bytes = response.bytes().await?;

        // Nodes may pair an HTTP error status with a JSON-RPC error object.
        let response = match (serde_json::from_slice::<ResponseEnvelope>(&bytes), status_error) {
            (Ok(envelope), None) => envelope,
            (Ok(envelope), Some(_)) if envelope.error.is_some() => envelope,
            (_, Some(err)) => return Err(TransportError::Http(err)),
            (Err(err), None) => return Err(TransportError::InvalidResponse(err.to_string())),
        };

        match response {
            ResponseEnvelope {
                error: Some(err), ..
            } => Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            }),
            ResponseEnvelope {
                result: Some(result),
                ..
            } => Ok(result),
            ResponseEnvelope { .. } => Ok(Value::Null),
        }
    }
}
