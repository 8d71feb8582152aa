use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use thiserror::Error;

use crate::{mcp::rpc::RpcResponse, registry::EntryKind};

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("parse error: {message}")]
    Parse { message: String },
    #[error("method not found: {method}")]
    MethodNotFound { method: String },
    #[error("invalid params: {message}")]
    InvalidParams { message: String },
    #[error("{kind} not found: {key}")]
    NotFound { kind: EntryKind, key: String },
    #[error("internal error")]
    Internal { message: String },
}

impl AppError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    pub fn not_found(kind: EntryKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::Parse { .. } => PARSE_ERROR,
            Self::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Self::InvalidParams { .. } | Self::NotFound { .. } => INVALID_PARAMS,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Message placed on the wire. Never carries internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "Parse error",
            Self::MethodNotFound { .. } => "Method not found",
            Self::InvalidParams { .. } => "Invalid params",
            Self::NotFound { kind, .. } => match kind {
                EntryKind::Resource => "Resource not found",
                EntryKind::Tool => "Tool not found",
                EntryKind::Prompt => "Prompt not found",
            },
            Self::Internal { .. } => "Internal error",
        }
    }
}

/// An `AppError` tied to the request identifier it answers.
#[derive(Debug)]
pub struct RpcFailure {
    pub id: Value,
    pub error: AppError,
}

impl IntoResponse for RpcFailure {
    fn into_response(self) -> Response {
        if let AppError::Internal { message } = &self.error {
            tracing::error!(error = %message, "request failed with internal error");
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RpcResponse::failure(self.id, &self.error)),
        )
            .into_response()
    }
}
