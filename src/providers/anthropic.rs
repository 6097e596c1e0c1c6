use anyhow::{Context, Result, bail};
use serde_json::{Value, json};

use super::{ChatModel, ChatSettings, error_message, http_agent};
use crate::models::{ChatResponse, Message, Role, UsageMap};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API
pub struct AnthropicChat {
    api_key: String,
    base_url: String,
    settings: ChatSettings,
    agent: ureq::Agent,
}

impl AnthropicChat {
    pub fn new(api_key: impl Into<String>, settings: ChatSettings) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            settings,
            agent: http_agent(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }
}

/// System messages go in the top-level `system` field, the rest in `messages`
pub fn build_request_body(settings: &ChatSettings, messages: &[Message]) -> Value {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let turns: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = if m.role == Role::Ai { "assistant" } else { "user" };
            json!({ "role": role, "content": m.content })
        })
        .collect();

    let mut body = json!({
        "model": settings.model,
        "max_tokens": settings.max_tokens,
        "temperature": settings.temperature,
        "messages": turns,
    });
    if !system.is_empty() {
        body["system"] = json!(system.join("\n\n"));
    }
    body
}

/// Map Anthropic's `input_tokens`/`output_tokens` onto the well-known keys.
///
/// The provider reports no total, so it is the sum of the two counts. Vendor
/// keys (including cache counters) are kept alongside.
pub fn normalize_usage(usage: &UsageMap) -> UsageMap {
    let input = usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0);
    let output = usage
        .get("output_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let mut out = usage.clone();
    out.insert("prompt_tokens".into(), json!(input));
    out.insert("completion_tokens".into(), json!(output));
    out.insert("total_tokens".into(), json!(input + output));
    out
}

pub fn parse_response(payload: &Value) -> Result<ChatResponse> {
    let Some(blocks) = payload.get("content").and_then(Value::as_array) else {
        bail!("response has no content blocks");
    };
    let text: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    let model = payload
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut response = ChatResponse::new(Message::ai(text), model);
    if let Some(usage) = payload.get("usage").and_then(Value::as_object) {
        response = response.with_usage(normalize_usage(usage));
    }
    Ok(response)
}

impl ChatModel for AnthropicChat {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    fn invoke(&self, messages: &[Message]) -> Result<ChatResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = build_request_body(&self.settings, messages);
        tracing::debug!(model = %self.settings.model, messages = messages.len(), "anthropic request");

        let mut response = self
            .agent
            .post(&url)
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .send_json(&body)
            .with_context(|| format!("send request to {url}"))?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .context("read Anthropic response body")?;
        if !status.is_success() {
            bail!(
                "Anthropic API error ({}): {}",
                status.as_u16(),
                error_message(&text)
            );
        }

        let payload: Value =
            serde_json::from_str(&text).context("parse Anthropic response json")?;
        parse_response(&payload)
    }

    fn cache_key(&self) -> String {
        format!(
            "anthropic:{}:t={}:max={}",
            self.settings.model, self.settings.temperature, self.settings.max_tokens
        )
    }
}
