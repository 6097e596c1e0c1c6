use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};

use super::{ChatModel, ChatSettings, error_message, http_agent};
use crate::models::{ChatResponse, Message, Role};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for the OpenAI chat-completions endpoint
pub struct OpenAiChat {
    api_key: String,
    base_url: String,
    settings: ChatSettings,
    agent: ureq::Agent,
}

impl OpenAiChat {
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

// gpt-5 and o-series reasoning models reject `max_tokens` and custom temperatures
fn is_reasoning_model(model: &str) -> bool {
    let m = model.to_ascii_lowercase();
    (m.starts_with("gpt-5") && !m.contains("chat"))
        || m.starts_with("o1")
        || m.starts_with("o3")
        || m.starts_with("o4")
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Human => "user",
        Role::Ai => "assistant",
    }
}

pub fn build_request_body(settings: &ChatSettings, messages: &[Message]) -> Value {
    let messages: Vec<Value> = messages
        .iter()
        .map(|m| json!({ "role": wire_role(m.role), "content": m.content }))
        .collect();

    let mut body = json!({
        "model": settings.model,
        "messages": messages,
    });
    if is_reasoning_model(&settings.model) {
        body["max_completion_tokens"] = json!(settings.max_tokens);
    } else {
        body["max_tokens"] = json!(settings.max_tokens);
        body["temperature"] = json!(settings.temperature);
    }
    body
}

pub fn parse_response(payload: &Value) -> Result<ChatResponse> {
    let choice = payload
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| anyhow!("response has no choices"))?;
    // `content` may be null when the model spent the whole budget on reasoning
    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let model = payload
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut response = ChatResponse::new(Message::ai(content), model);
    if let Some(usage) = payload.get("usage").and_then(Value::as_object) {
        response = response.with_usage(usage.clone());
    }
    Ok(response)
}

impl ChatModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    fn invoke(&self, messages: &[Message]) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = build_request_body(&self.settings, messages);
        tracing::debug!(model = %self.settings.model, messages = messages.len(), "openai request");

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send_json(&body)
            .with_context(|| format!("send request to {url}"))?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .context("read OpenAI response body")?;
        if !status.is_success() {
            bail!("OpenAI API error ({}): {}", status.as_u16(), error_message(&text));
        }

        let payload: Value = serde_json::from_str(&text).context("parse OpenAI response json")?;
        parse_response(&payload)
    }

    fn cache_key(&self) -> String {
        format!(
            "openai:{}:t={}:max={}",
            self.settings.model, self.settings.temperature, self.settings.max_tokens
        )
    }
}
