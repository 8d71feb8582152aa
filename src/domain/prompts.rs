use serde_json::{json, Value};

use crate::errors::AppError;
use crate::registry::{Entry, PromptEntry, Registry};

pub const HELPFUL_ASSISTANT_PROMPT: &str = "helpful-assistant";

pub struct HelpfulAssistantPrompt;

impl Entry for HelpfulAssistantPrompt {
    fn key(&self) -> &str {
        HELPFUL_ASSISTANT_PROMPT
    }

    fn description(&self) -> &str {
        "A basic assistant prompt definition"
    }

    fn invoke(&self, _registry: &Registry, _params: Value) -> Result<Value, AppError> {
        Ok(json!({
            "messages": [
                {
                    "role": "system",
                    "content": { "type": "text", "text": "You are a helpful assistant." }
                },
                {
                    "role": "user",
                    "content": { "type": "text", "text": "How can I help you today?" }
                }
            ]
        }))
    }
}

impl PromptEntry for HelpfulAssistantPrompt {}
