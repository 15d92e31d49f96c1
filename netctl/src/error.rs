//! Unified error types for the network controller.

use thiserror::Error;

/// Top-level error type for the network controller and its surfaces.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be resolved, read, or parsed.
    #[error("config: {0}")]
    Config(String),

    /// A provider type string did not name any known network.
    #[error("unknown provider type \"{0}\"")]
    UnknownProviderType(String),

    /// A provider type was passed to a setter that does not accept it.
    #[error("cannot set provider type '{provider_type}' here, use {hint}")]
    DisallowedProviderType {
        /// The rejected provider type.
        provider_type: String,
        /// The setter that should have been used instead.
        hint: &'static str,
    },

    /// A network client could not be constructed for the requested provider.
    #[error("client: {0}")]
    Client(String),

    /// The provider configuration store could not be read or written.
    #[error("store: {0}")]
    Store(String),

    /// Server bind or runtime error.
    #[error("server: {0}")]
    Server(String),

    /// A JSON-RPC request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Builds a [`Error::Config`] from a message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Builds a [`Error::Config`] from a message and an underlying cause.
    pub fn config_with(msg: impl AsRef<str>, err: impl std::fmt::Display) -> Self {
        Self::Config(format!("{}: {err}", msg.as_ref()))
    }

    /// Builds a [`Error::Client`] from a message.
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    /// Builds a [`Error::Store`] from a message and an underlying cause.
    pub fn store_with(msg: impl AsRef<str>, err: impl std::fmt::Display) -> Self {
        Self::Store(format!("{}: {err}", msg.as_ref()))
    }

    /// Whether this error should be reported to API callers as a bad request.
    #[must_use]
    pub const fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::UnknownProviderType(_) | Self::DisallowedProviderType { .. } | Self::Client(_)
        )
    }
}

/// Failure of a single JSON-RPC round trip.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request itself failed.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Human readable message from the node.
        message: String,
    },

    /// The response body was not a valid JSON-RPC response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The method is not served by this provider.
    #[error("method '{0}' is not supported")]
    Unsupported(String),
}

impl TransportError {
    /// JSON-RPC error code to report for this failure.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Rpc { code, .. } => *code,
            Self::Unsupported(_) => -32601,
            Self::Http(_) | Self::InvalidResponse(_) => -32603,
        }
    }
}
