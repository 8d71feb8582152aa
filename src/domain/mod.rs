//! Built-in registry entries
//!
//! The demonstration payloads served by both transports: a static and a generated
//! greeting resource, the `echo` and `debug` tools, and a scripted prompt.

pub mod prompts;
pub mod resources;
pub mod tools;

use crate::registry::Registry;

/// Registry populated with every built-in entry.
pub fn builtin_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_resource(resources::HelloWorldResource)
        .register_tool(tools::EchoTool::default())
        .register_tool(tools::DebugTool::default())
        .register_prompt(prompts::HelpfulAssistantPrompt);
    registry
}
