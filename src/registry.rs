//! In-memory registry of resources, tools and prompts
//!
//! Each namespace is keyed independently. Entries are trait objects so they can be
//! listed without being invoked. The registry is populated before any dispatch and
//! shared read-only afterwards.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;

/// Namespace of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Resource,
    Tool,
    Prompt,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Resource => "resource",
            Self::Tool => "tool",
            Self::Prompt => "prompt",
        };
        f.write_str(label)
    }
}

/// Behaviour shared by every registry entry.
///
/// `invoke` receives the owning registry so introspective entries can read it
/// without holding a reference of their own.
pub trait Entry: Send + Sync {
    /// Lookup key: the URI for resources, the name for tools and prompts.
    fn key(&self) -> &str;

    fn description(&self) -> &str;

    fn invoke(&self, registry: &Registry, params: Value) -> Result<Value, AppError>;
}

pub trait ResourceEntry: Entry {
    /// Human-readable display name.
    fn name(&self) -> &str;
}

pub trait ToolEntry: Entry {
    /// JSON Schema of the accepted parameters.
    fn input_schema(&self) -> Value;
}

pub trait PromptEntry: Entry {}

/// Handler-free view of an entry, as returned by [`Registry::list`].
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySummary {
    pub key: String,
    pub name: String,
    pub description: String,
    pub input_schema: Option<Value>,
}

#[derive(Default, Clone)]
pub struct Registry {
    resources: HashMap<String, Arc<dyn ResourceEntry>>,
    tools: HashMap<String, Arc<dyn ToolEntry>>,
    prompts: HashMap<String, Arc<dyn PromptEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a resource keyed by its URI.
    pub fn register_resource(&mut self, entry: impl ResourceEntry + 'static) -> &mut Self {
        debug!(uri = entry.key(), "registering resource");
        self.resources
            .insert(entry.key().to_string(), Arc::new(entry));
        self
    }

    /// Inserts or replaces a tool keyed by its name.
    pub fn register_tool(&mut self, entry: impl ToolEntry + 'static) -> &mut Self {
        debug!(name = entry.key(), "registering tool");
        self.tools.insert(entry.key().to_string(), Arc::new(entry));
        self
    }

    /// Inserts or replaces a prompt keyed by its name.
    pub fn register_prompt(&mut self, entry: impl PromptEntry + 'static) -> &mut Self {
        debug!(name = entry.key(), "registering prompt");
        self.prompts.insert(entry.key().to_string(), Arc::new(entry));
        self
    }

    pub fn resource(&self, uri: &str) -> Result<Arc<dyn ResourceEntry>, AppError> {
        self.resources
            .get(uri)
            .cloned()
            .ok_or_else(|| AppError::not_found(EntryKind::Resource, uri))
    }

    pub fn tool(&self, name: &str) -> Result<Arc<dyn ToolEntry>, AppError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found(EntryKind::Tool, name))
    }

    pub fn prompt(&self, name: &str) -> Result<Arc<dyn PromptEntry>, AppError> {
        self.prompts
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found(EntryKind::Prompt, name))
    }

    /// Summaries of one namespace. Order is unspecified.
    pub fn list(&self, kind: EntryKind) -> Box<dyn Iterator<Item = EntrySummary> + '_> {
        match kind {
            EntryKind::Resource => Box::new(self.resources.values().map(|entry| EntrySummary {
                key: entry.key().to_string(),
                name: entry.name().to_string(),
                description: entry.description().to_string(),
                input_schema: None,
            })),
            EntryKind::Tool => Box::new(self.tools.values().map(|entry| EntrySummary {
                key: entry.key().to_string(),
                name: entry.key().to_string(),
                description: entry.description().to_string(),
                input_schema: Some(entry.input_schema()),
            })),
            EntryKind::Prompt => Box::new(self.prompts.values().map(|entry| EntrySummary {
                key: entry.key().to_string(),
                name: entry.key().to_string(),
                description: entry.description().to_string(),
                input_schema: None,
            })),
        }
    }

    pub fn len(&self, kind: EntryKind) -> usize {
        match kind {
            EntryKind::Resource => self.resources.len(),
            EntryKind::Tool => self.tools.len(),
            EntryKind::Prompt => self.prompts.len(),
        }
    }
}
