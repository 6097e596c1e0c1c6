//! # Callbacks
//!
//! Observers attached to a chain run. [`TokenUsageRecorder`] captures the
//! token accounting of one completed model call and renders it as a short
//! fragment suitable for appending to a console line.

use serde_json::Value;

use crate::models::{ChatResponse, UsageMap, UsageSource};

/// Hook invoked by [`crate::chain::Chain`] once the model call has finished
pub trait CallbackHandler {
    fn on_llm_end(&mut self, response: &ChatResponse);
}

/// Token counts read from a usage mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageRecord {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Taken verbatim from the provider; not recomputed from the other two
    pub total_tokens: u64,
    pub raw: UsageMap,
}

impl UsageRecord {
    pub fn from_usage(usage: &UsageMap) -> Self {
        Self {
            input_tokens: read_count(usage, "prompt_tokens"),
            output_tokens: read_count(usage, "completion_tokens"),
            total_tokens: read_count(usage, "total_tokens"),
            raw: usage.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0
            && self.output_tokens == 0
            && self.total_tokens == 0
            && self.raw.is_empty()
    }
}

// Missing, negative, fractional or non-numeric values degrade to zero
fn read_count(usage: &UsageMap, key: &str) -> u64 {
    usage.get(key).and_then(Value::as_u64).unwrap_or(0)
}

/// Records the usage of the most recent completed call (last write wins)
#[derive(Debug, Clone, Default)]
pub struct TokenUsageRecorder {
    record: UsageRecord,
}

impl TokenUsageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored record from `response`, or leave it untouched when
    /// the response carries no usage mapping.
    pub fn record_completion(&mut self, response: &impl UsageSource) {
        if let Some(usage) = response.usage() {
            self.record = UsageRecord::from_usage(usage);
        }
    }

    pub fn reset(&mut self) {
        self.record = UsageRecord::default();
    }

    pub fn record(&self) -> &UsageRecord {
        &self.record
    }

    pub fn format_usage(&self) -> String {
        if self.record.is_empty() {
            return String::new();
        }
        format!(
            " [Tokens: {} in, {} out, {} total]",
            self.record.input_tokens, self.record.output_tokens, self.record.total_tokens
        )
    }
}

impl CallbackHandler for TokenUsageRecorder {
    fn on_llm_end(&mut self, response: &ChatResponse) {
        self.record_completion(response);
        tracing::debug!(
            input = self.record.input_tokens,
            output = self.record.output_tokens,
            total = self.record.total_tokens,
            "recorded token usage"
        );
    }
}
