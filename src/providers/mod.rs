//! # Providers
//!
//! Chat-model clients. Every client turns a list of [`Message`]s into a
//! [`ChatResponse`] whose usage mapping uses the well-known keys
//! `prompt_tokens`, `completion_tokens` and `total_tokens`.

use anyhow::Result;
use std::time::Duration;

use crate::models::{ChatResponse, Message};

pub mod anthropic;
pub mod fake;
pub mod openai;

pub use anthropic::AnthropicChat;
pub use fake::FakeChatModel;
pub use openai::OpenAiChat;

const HTTP_TIMEOUT_SECONDS: u64 = 60;

/// OpenAI chat models, `(alias, model id)`
pub const OPENAI_MODELS: &[(&str, &str)] = &[
    ("gpt4o", "gpt-4o"),
    ("gpt4o_mini", "gpt-4o-mini"),
    ("gpt5", "gpt-5"),
    ("gpt5_mini", "gpt-5-mini"),
    ("gpt5_chat", "gpt-5-chat-latest"),
];

/// Anthropic Claude models, `(alias, model id)`
pub const CLAUDE_MODELS: &[(&str, &str)] = &[
    // Claude 3.x family
    ("haiku3", "claude-3-haiku-20240307"),
    ("haiku35", "claude-3-5-haiku-20241022"),
    ("sonnet35", "claude-3-5-sonnet-20241022"),
    ("sonnet37", "claude-3-7-sonnet-20250219"),
    // Claude 4 family
    ("sonnet4", "claude-sonnet-4-20250514"),
    ("opus4", "claude-opus-4-20250514"),
    ("opus41", "claude-opus-4-1-20250805"),
];

/// Look up a model id by alias in one of the catalogues above
pub fn model_by_alias(catalogue: &[(&str, &'static str)], alias: &str) -> Option<&'static str> {
    catalogue
        .iter()
        .find(|(a, _)| a.eq_ignore_ascii_case(alias))
        .map(|(_, id)| *id)
}

/// Generation parameters shared by all providers
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatSettings {
    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }
}

pub trait ChatModel {
    fn model_name(&self) -> &str;

    fn invoke(&self, messages: &[Message]) -> Result<ChatResponse>;

    /// Stable description of the model configuration, used as part of cache keys
    fn cache_key(&self) -> String {
        self.model_name().to_string()
    }
}

impl<M: ChatModel + ?Sized> ChatModel for Box<M> {
    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn invoke(&self, messages: &[Message]) -> Result<ChatResponse> {
        (**self).invoke(messages)
    }

    fn cache_key(&self) -> String {
        (**self).cache_key()
    }
}

pub(crate) fn http_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECONDS)))
        .http_status_as_error(false)
        .build();
    ureq::Agent::new_with_config(config)
}

/// Pull a human-readable message out of a provider error body
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}
