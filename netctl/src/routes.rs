//! HTTP API over the network controller.
//!
//! | Route                  | Operation                                 |
//! |------------------------|-------------------------------------------|
//! | `GET /network`         | current provider, network and settings    |
//! | `PUT /network/provider`| switch to a named, local or private network |
//! | `PUT /network/rpc`     | switch to a custom RPC endpoint           |
//! | `POST /network/verify` | re-run the lookup while loading           |
//! | `POST /network/reset`  | rebuild the current connection            |
//! | `GET /networks`        | built-in network descriptors              |
//! | `POST /rpc`            | JSON-RPC pass-through to the active network |
//!
//! Switch endpoints answer with the state right after the switch, which is
//! normally still loading.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Error;
use crate::network::registry::default_networks;
use crate::network::{
    CustomRpc, JsonRpcRequest, NetworkController, NetworkControllerState, ProviderConfig,
    Transport,
};

/// Creates the router with every network endpoint.
pub fn routes() -> Router<NetworkController> {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
        .route("/network", get(get_network))
        .route("/network/provider", put(put_provider))
        .route("/network/rpc", put(put_custom_rpc))
        .route("/network/verify", post(post_verify))
        .route("/network/reset", post(post_reset))
        .route("/networks", get(get_networks))
        .route("/rpc", post(post_rpc))
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = if self.is_client_fault() {
            StatusCode::BAD_REQUEST
        } else if matches!(self, Self::Transport(_)) {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn bad_body(rejection: &JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": rejection.body_text() })),
    )
        .into_response()
}

async fn get_root() -> impl IntoResponse {
    (
        StatusCode::OK,
        concat!("Hello from ", env!("CARGO_PKG_NAME"), "!"),
    )
}

async fn get_health(State(controller): State<NetworkController>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "initialized": controller.is_initialized(),
    }))
}

async fn get_network(State(controller): State<NetworkController>) -> Json<NetworkControllerState> {
    Json(controller.state())
}

#[instrument(skip_all)]
async fn put_provider(
    State(controller): State<NetworkController>,
    body: Result<Json<ProviderConfig>, JsonRejection>,
) -> Response {
    let config = match body {
        Ok(Json(config)) => config,
        Err(rejection) => return bad_body(&rejection),
    };
    match controller.set_provider_config(config) {
        Ok(()) => Json(controller.state()).into_response(),
        Err(err) => err.into_response(),
    }
}

#[instrument(skip_all)]
async fn put_custom_rpc(
    State(controller): State<NetworkController>,
    body: Result<Json<CustomRpc>, JsonRejection>,
) -> Response {
    let rpc = match body {
        Ok(Json(rpc)) => rpc,
        Err(rejection) => return bad_body(&rejection),
    };
    match controller.set_custom_rpc(rpc) {
        Ok(()) => Json(controller.state()).into_response(),
        Err(err) => err.into_response(),
    }
}

#[instrument(skip_all)]
async fn post_verify(State(controller): State<NetworkController>) -> Json<NetworkControllerState> {
    controller.verify_network().await;
    Json(controller.state())
}

#[instrument(skip_all)]
async fn post_reset(State(controller): State<NetworkController>) -> Result<Response, Error> {
    controller.reset_connection()?;
    Ok(Json(controller.state()).into_response())
}

async fn get_networks() -> impl IntoResponse {
    Json(default_networks())
}

/// JSON-RPC 2.0 envelope accepted by `POST /rpc`.
#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    id: Value,
    #[serde(flatten)]
    call: JsonRpcRequest,
}

#[instrument(skip_all, fields(method))]
async fn post_rpc(
    State(controller): State<NetworkController>,
    body: Result<Json<RpcEnvelope>, JsonRejection>,
) -> Response {
    let envelope = match body {
        Ok(Json(envelope)) => envelope,
        Err(rejection) => return bad_body(&rejection),
    };
    tracing::Span::current().record("method", envelope.call.method.as_str());

    let Some(handles) = controller.get_provider_and_block_tracker() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "provider not initialized" })),
        )
            .into_response();
    };
    let id = envelope.id;
    let reply = match handles.provider.request(envelope.call).await {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(err) => {
            tracing::debug!(error = %err, "rpc pass-through failed");
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": err.code(), "message": err.to_string() },
            })
        }
    };
    Json(reply).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::network::testing::{MockFactory, MockTransport};
    use crate::network::{
        ClientFactory, NetworkControllerOptions, NetworkStatus, ProviderParams, ProviderType,
    };

    async fn app(factory: &Arc<MockFactory>, initialize: bool) -> (Router, NetworkController) {
        let controller = NetworkController::new(
            NetworkControllerOptions {
                provider: ProviderConfig::new(ProviderType::Localhost),
                ..NetworkControllerOptions::default()
            },
            Arc::clone(factory) as Arc<dyn ClientFactory>,
        );
        if initialize {
            controller
                .initialize_provider(ProviderParams {
                    client_version: "netctl/test".into(),
                    accounts: vec!["0xabc".into()],
                })
                .await
                .unwrap();
        }
        (routes().with_state(controller.clone()), controller)
    }

    async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn reports_state_and_health() {
        let factory = Arc::new(MockFactory::default());
        factory.register("localhost", Arc::new(MockTransport::new("1337")));
        let (router, _) = app(&factory, true).await;

        let (status, body) = call(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["initialized"], json!(true));

        let (status, body) = call(&router, Method::GET, "/network", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["network"], json!("1337"));
        assert_eq!(body["provider"]["type"], json!("localhost"));
        assert_eq!(body["settings"]["ticker"], json!("ARS"));
    }

    #[tokio::test]
    async fn switches_provider_and_rejects_rpc_type() {
        let factory = Arc::new(MockFactory::default());
        let (router, controller) = app(&factory, true).await;

        let (status, body) = call(
            &router,
            Method::PUT,
            "/network/provider",
            Some(json!({ "type": "goerli" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["network"], json!("loading"));
        assert_eq!(controller.get_provider_config().provider_type, ProviderType::Goerli);

        let (status, _) = call(
            &router,
            Method::PUT,
            "/network/provider",
            Some(json!({ "type": "rpc", "rpcTarget": "http://x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &router,
            Method::PUT,
            "/network/provider",
            Some(json!({ "type": "sepolia" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(controller.get_provider_config().provider_type, ProviderType::Goerli);
    }

    #[tokio::test]
    async fn custom_rpc_then_verify_resolves_declared_chain() {
        let factory = Arc::new(MockFactory::default());
        let (router, controller) = app(&factory, true).await;

        let (status, body) = call(
            &router,
            Method::PUT,
            "/network/rpc",
            Some(json!({ "rpcTarget": "http://x", "chainId": "99", "nickname": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"]["type"], json!("rpc"));
        assert_eq!(body["settings"]["nickname"], json!("X"));

        let (status, body) = call(&router, Method::POST, "/network/verify", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["network"], json!("99"));
        assert_eq!(controller.get_network_state(), NetworkStatus::Resolved("99".into()));

        let (status, body) = call(&router, Method::POST, "/network/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["network"], json!("loading"));
    }

    #[tokio::test]
    async fn rpc_pass_through() {
        let factory = Arc::new(MockFactory::default());
        factory.register("localhost", Arc::new(MockTransport::new("1337")));
        let (router, _) = app(&factory, true).await;

        let (status, body) = call(
            &router,
            Method::POST,
            "/rpc",
            Some(json!({ "jsonrpc": "2.0", "id": 7, "method": "net_version" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "jsonrpc": "2.0", "id": 7, "result": "1337" }));

        let (_, body) = call(
            &router,
            Method::POST,
            "/rpc",
            Some(json!({ "jsonrpc": "2.0", "id": 8, "method": "eth_accounts" })),
        )
        .await;
        assert_eq!(body["result"], json!(["0xabc"]));

        let (_, body) = call(
            &router,
            Method::POST,
            "/rpc",
            Some(json!({ "jsonrpc": "2.0", "id": 9, "method": "eth_sign", "params": [] })),
        )
        .await;
        assert_eq!(body["error"]["code"], json!(-32601));
    }

    #[tokio::test]
    async fn rpc_before_initialize_is_unavailable() {
        let factory = Arc::new(MockFactory::default());
        let (router, _) = app(&factory, false).await;
        let (status, _) = call(
            &router,
            Method::POST,
            "/rpc",
            Some(json!({ "id": 1, "method": "net_version" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn lists_builtin_networks() {
        let factory = Arc::new(MockFactory::default());
        let (router, _) = app(&factory, false).await;
        let (status, body) = call(&router, Method::GET, "/networks", None).await;
        assert_eq!(status, StatusCode::OK);
        let types: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["providerType"].as_str().unwrap())
            .collect();
        assert_eq!(types, ["artemis", "localhost"]);
    }
}
