//! The central Model Context Protocol dispatcher
//!
//! Maps one decoded JSON-RPC request to one response: built-in protocol methods
//! (`initialize`, `ping`, `*/list`) and registry lookups with handler invocation.
//! `Dispatcher::handle` is total; every failure, including a panicking handler,
//! becomes an error envelope.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, ProtocolVersion, ServerCapabilities,
    ServerCapabilitiesPrompts, ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::domain::resources::resolve_dynamic_resource;
use crate::errors::AppError;
use crate::mcp::rpc::{RpcRequest, RpcResponse};
use crate::registry::{EntryKind, EntrySummary, Registry};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct ResourceReadParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default, alias = "arguments")]
    parameters: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PromptGetParams {
    name: String,
}

/// Shared request handler for every transport.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Decodes and handles one raw message. Undecodable input answers with a
    /// parse error and a `null` identifier.
    pub fn handle_raw(&self, raw: &[u8]) -> RpcResponse {
        match serde_json::from_slice::<RpcRequest>(raw) {
            Ok(request) => self.handle(request),
            Err(err) => {
                debug!(error = %err, "rejecting undecodable message");
                RpcResponse::failure(Value::Null, &AppError::parse(err.to_string()))
            }
        }
    }

    pub fn handle(&self, request: RpcRequest) -> RpcResponse {
        let id = request.response_id();
        let method = request.method;

        let outcome = catch_unwind(AssertUnwindSafe(|| self.route(&method, request.params)))
            .unwrap_or_else(|panic| {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|message| message.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                Err(AppError::internal(format!("handler panicked: {detail}")))
            });

        let response = match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(err) => {
                if let AppError::Internal { message } = &err {
                    error!(method = %method, error = %message, "request failed with internal error");
                }
                RpcResponse::failure(id, &err)
            }
        };

        debug!(
            method = %method,
            id = %response.id,
            outcome = if response.is_error() { "failure" } else { "success" },
            "mcp request handled"
        );

        response
    }

    fn route(&self, method: &str, params: Option<Value>) -> Result<Value, AppError> {
        match method {
            "initialize" => initialize_result(),
            "ping" => Ok(json!({})),
            "resources/list" => Ok(json!({
                "resources": self
                    .summaries(EntryKind::Resource)
                    .into_iter()
                    .map(|summary| json!({
                        "uri": summary.key,
                        "name": summary.name,
                        "description": summary.description,
                    }))
                    .collect::<Vec<_>>()
            })),
            "resources/get" | "resources/read" => self.read_resource(params),
            "tools/list" => Ok(json!({
                "tools": self
                    .summaries(EntryKind::Tool)
                    .into_iter()
                    .map(|summary| json!({
                        "name": summary.name,
                        "description": summary.description,
                        "inputSchema": summary.input_schema,
                    }))
                    .collect::<Vec<_>>()
            })),
            "tools/invoke" | "tools/call" => self.call_tool(params),
            "prompts/list" => Ok(json!({
                "prompts": self
                    .summaries(EntryKind::Prompt)
                    .into_iter()
                    .map(|summary| json!({
                        "name": summary.name,
                        "description": summary.description,
                    }))
                    .collect::<Vec<_>>()
            })),
            "prompts/get" => self.get_prompt(params),
            _ => Err(AppError::method_not_found(method)),
        }
    }

    fn summaries(&self, kind: EntryKind) -> Vec<EntrySummary> {
        let mut summaries: Vec<_> = self.registry.list(kind).collect();
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        summaries
    }

    fn read_resource(&self, params: Option<Value>) -> Result<Value, AppError> {
        let params: ResourceReadParams = decode_params(params)?;

        if let Some(generated) = resolve_dynamic_resource(&params.uri) {
            return Ok(generated);
        }

        let resource = self.registry.resource(&params.uri)?;
        resource.invoke(&self.registry, Value::Null)
    }

    fn call_tool(&self, params: Option<Value>) -> Result<Value, AppError> {
        let params: ToolCallParams = decode_params(params)?;
        let tool = self.registry.tool(&params.name)?;

        let arguments = match params.parameters {
            None | Some(Value::Null) => json!({}),
            Some(arguments) => arguments,
        };
        tool.invoke(&self.registry, arguments)
    }

    fn get_prompt(&self, params: Option<Value>) -> Result<Value, AppError> {
        let params: PromptGetParams = decode_params(params)?;
        let prompt = self.registry.prompt(&params.name)?;
        prompt.invoke(&self.registry, Value::Null)
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, AppError> {
    let Some(raw) = params else {
        return Err(AppError::invalid_params("params are required"));
    };

    serde_json::from_value(raw).map_err(|err| AppError::invalid_params(err.to_string()))
}

fn initialize_result() -> Result<Value, AppError> {
    let result = InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: Some(ServerCapabilitiesPrompts {
                list_changed: Some(false),
            }),
            ..Default::default()
        },
        protocol_version: ProtocolVersion::V2024_11_05.into(),
        instructions: None,
        meta: None,
    };

    serde_json::to_value(result)
        .map_err(|err| AppError::internal(format!("initialize result serialization: {err}")))
}
