//! Model Context Protocol request handling
//!
//! JSON-RPC envelopes and the dispatcher shared by the stdio and HTTP transports.

pub mod rpc;
pub mod server;
