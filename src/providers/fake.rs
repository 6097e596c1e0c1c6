use anyhow::{Result, bail};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ChatModel;
use crate::models::{ChatResponse, Message, UsageMap};

/// Offline chat model that replays canned replies.
///
/// Replies are served in order; once only one remains it is repeated.
pub struct FakeChatModel {
    name: String,
    replies: Mutex<VecDeque<String>>,
    usage: Option<UsageMap>,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<Message>>,
}

impl FakeChatModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "fake-chat".to_string(),
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            usage: None,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    pub fn with_usage(mut self, usage: UsageMap) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages passed to the most recent `invoke`
    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl ChatModel for FakeChatModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, messages: &[Message]) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }

        let Ok(mut replies) = self.replies.lock() else {
            bail!("fake model state poisoned");
        };
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        let Some(reply) = reply else {
            bail!("fake model has no replies queued");
        };

        let mut response = ChatResponse::new(Message::ai(reply), self.name.clone());
        if let Some(usage) = &self.usage {
            response = response.with_usage(usage.clone());
        }
        Ok(response)
    }
}
