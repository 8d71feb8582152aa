//! Axum HTTP handlers for the web server

use std::panic::{catch_unwind, AssertUnwindSafe};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        sse::{KeepAlive, KeepAliveStream, Sse},
        IntoResponse, Response,
    },
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::errors::{AppError, RpcFailure};
use crate::http::sse::{SseSubscription, RESPONSE_EVENT};
use crate::mcp::rpc::extract_request_id;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub async fn sse_endpoint(
    State(state): State<AppState>,
) -> Sse<KeepAliveStream<SseSubscription>> {
    Sse::new(state.sse_hub.subscribe()).keep_alive(KeepAlive::default())
}

pub async fn messages_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let handled = catch_unwind(AssertUnwindSafe(|| state.dispatcher.handle_raw(&body)));

    let response = match handled {
        Ok(response) => response,
        Err(_) => {
            return RpcFailure {
                id: extract_request_id(&body),
                error: AppError::internal("message handling panicked outside the dispatcher"),
            }
            .into_response()
        }
    };

    if !response.id.is_null() {
        state.sse_hub.broadcast(RESPONSE_EVENT, &response);
    }

    (StatusCode::OK, Json(response)).into_response()
}
