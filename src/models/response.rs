use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::Message;

/// Provider usage mapping (`prompt_tokens`, `completion_tokens`, `total_tokens`, ...)
pub type UsageMap = Map<String, Value>;

/// Anything that may carry a usage mapping from a completed generation call.
///
/// Provider clients adapt their own field names into the well-known keys
/// before handing a response to a [`crate::callbacks::CallbackHandler`].
pub trait UsageSource {
    fn usage(&self) -> Option<&UsageMap>;
}

impl UsageSource for UsageMap {
    fn usage(&self) -> Option<&UsageMap> {
        Some(self)
    }
}

impl<T: UsageSource> UsageSource for Option<T> {
    fn usage(&self) -> Option<&UsageMap> {
        self.as_ref().and_then(T::usage)
    }
}

/// Result of a single chat-model invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
    /// Model id as reported by the provider
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMap>,
}

impl ChatResponse {
    pub fn new(message: Message, model: impl Into<String>) -> Self {
        Self {
            message,
            model: model.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: UsageMap) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn text(&self) -> &str {
        &self.message.content
    }
}

impl UsageSource for ChatResponse {
    fn usage(&self) -> Option<&UsageMap> {
        self.usage.as_ref()
    }
}
