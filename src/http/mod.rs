//! HTTP transport for the Model Context Protocol
//!
//! Unary JSON-RPC over `POST /messages`, an event-stream of responses on `GET /sse`,
//! and a liveness probe on `GET /health`.

pub mod handlers;
pub mod sse;
