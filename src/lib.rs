use std::future::Future;

use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::info;

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod registry;
pub mod stdio;

use http::sse::SseHub;
use mcp::server::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub sse_hub: SseHub,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            sse_hub: SseHub::new(),
        }
    }
}

/// Any origin is accepted. With credentials enabled the origin and requested
/// headers are echoed back rather than answered with `*`.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/sse", get(http::handlers::sse_endpoint))
        .route("/messages", post(http::handlers::messages_endpoint))
        .layer(cors_layer())
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

/// Serves the HTTP transport until `shutdown` resolves, then closes every SSE
/// stream and lets in-flight requests drain.
pub async fn serve_http<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let hub = state.sse_hub.clone();
    let app = build_app(state);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!(clients = hub.client_count(), "closing sse streams");
            hub.close_all();
        })
        .await
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use futures::{FutureExt, StreamExt};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::builtin_registry;

    fn state() -> AppState {
        AppState::new(Dispatcher::new(builtin_registry()))
    }

    fn post_message(body: &str) -> Request<Body> {
        Request::builder()
            .uri("/messages")
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request build")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&body).expect("valid json response")
    }

    #[tokio::test]
    async fn health_reports_status_and_timestamp() {
        let response = build_app(state())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        let timestamp = body["timestamp"].as_str().expect("timestamp string");
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn root_get_is_not_found() {
        let response = build_app(state())
            .oneshot(
                Request::builder()
                    .uri("/")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn messages_initialize_returns_result() {
        let response = build_app(state())
            .oneshot(post_message(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            ))
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(body["result"]["serverInfo"]["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(
            body["result"]["serverInfo"]["version"],
            env!("CARGO_PKG_VERSION")
        );
    }

    #[tokio::test]
    async fn messages_unknown_method_returns_method_not_found() {
        let response = build_app(state())
            .oneshot(post_message(
                r#"{"jsonrpc":"2.0","id":1,"method":"unknown"}"#,
            ))
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert_eq!(
            body,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"error\":{\"code\":-32601,\"message\":\"Method not found\"}}"
        );
    }

    #[tokio::test]
    async fn messages_invalid_json_is_parse_error() {
        let response = build_app(state())
            .oneshot(post_message("{not json"))
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": -32700, "message": "Parse error" }
            })
        );
    }

    #[tokio::test]
    async fn messages_tools_call_echo() {
        let response = build_app(state())
            .oneshot(post_message(
                r#"{"jsonrpc":"2.0","id":"e-1","method":"tools/call","params":{"name":"echo","parameters":{"message":"World"}}}"#,
            ))
            .await
            .expect("request execution");

        let body = body_json(response).await;
        assert_eq!(body["id"], "e-1");
        assert_eq!(
            body["result"]["content"],
            json!([{ "type": "text", "text": "Hello World" }])
        );
    }

    #[tokio::test]
    async fn messages_missing_tool_is_invalid_params() {
        let response = build_app(state())
            .oneshot(post_message(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/invoke","params":{"name":"nonexistent"}}"#,
            ))
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            json!({ "code": -32602, "message": "Tool not found" })
        );
    }

    #[tokio::test]
    async fn messages_preflight_allows_cross_origin_post() {
        let response = build_app(state())
            .oneshot(
                Request::builder()
                    .uri("/messages")
                    .method("OPTIONS")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("http://localhost:5173")
        );
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .and_then(|value| value.to_str().ok()),
            Some("true")
        );
        let methods = headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .and_then(|value| value.to_str().ok())
            .expect("allowed methods");
        assert!(methods.contains("POST"));
    }

    #[tokio::test]
    async fn cross_origin_post_carries_allow_origin() {
        let mut request = post_message(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        request.headers_mut().insert(
            header::ORIGIN,
            header::HeaderValue::from_static("https://client.example"),
        );

        let response = build_app(state())
            .oneshot(request)
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("https://client.example")
        );
    }

    #[tokio::test]
    async fn sse_endpoint_opens_with_connected_event() {
        let state = state();
        let response = build_app(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/sse")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("text/event-stream")
        );
        assert_eq!(state.sse_hub.client_count(), 1);

        let mut body = response.into_body();
        let frame = body
            .frame()
            .await
            .expect("first frame")
            .expect("frame ok")
            .into_data()
            .expect("data frame");
        let text = String::from_utf8(frame.to_vec()).expect("utf8 event");
        assert!(text.starts_with("event: connected\n"));
        assert!(text.contains("MCP Server connected"));

        drop(body);
        assert_eq!(state.sse_hub.client_count(), 0);
    }

    #[tokio::test]
    async fn identified_messages_are_broadcast_to_sse_clients() {
        let state = state();
        let mut listeners: Vec<_> = (0..2).map(|_| state.sse_hub.subscribe()).collect();
        for listener in listeners.iter_mut() {
            listener.next().await;
        }

        let response = build_app(state.clone())
            .oneshot(post_message(
                r#"{"jsonrpc":"2.0","id":11,"method":"ping"}"#,
            ))
            .await
            .expect("request execution");
        assert_eq!(response.status(), StatusCode::OK);

        for listener in listeners.iter_mut() {
            assert!(matches!(listener.next().await, Some(Ok(_))));
        }

        build_app(state.clone())
            .oneshot(post_message(r#"{"jsonrpc":"2.0","method":"ping"}"#))
            .await
            .expect("request execution");

        for listener in listeners.iter_mut() {
            assert!(listener.next().now_or_never().is_none());
        }
    }
}
