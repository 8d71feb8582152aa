//! Greeting resources
//!
//! `hello://world` is a registered static resource. URIs under `greeting://` are
//! generated on demand and never touch the registry.

use serde_json::{json, Value};

use crate::errors::AppError;
use crate::registry::{Entry, Registry, ResourceEntry};

pub const HELLO_WORLD_URI: &str = "hello://world";
pub const GREETING_URI_PREFIX: &str = "greeting://";

pub struct HelloWorldResource;

impl Entry for HelloWorldResource {
    fn key(&self) -> &str {
        HELLO_WORLD_URI
    }

    fn description(&self) -> &str {
        "A static Hello World resource"
    }

    fn invoke(&self, _registry: &Registry, _params: Value) -> Result<Value, AppError> {
        Ok(json!({ "data": "Hello World!" }))
    }
}

impl ResourceEntry for HelloWorldResource {
    fn name(&self) -> &str {
        "Hello World"
    }
}

/// Resolves a generated resource, or `None` when `uri` has no dynamic prefix.
///
/// The suffix is interpolated verbatim, including when empty.
pub fn resolve_dynamic_resource(uri: &str) -> Option<Value> {
    let name = uri.strip_prefix(GREETING_URI_PREFIX)?;
    Some(json!({ "data": format!("Hello {name}!") }))
}
