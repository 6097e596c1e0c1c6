//! # Chain
//!
//! A linear pipeline: prompt template → chat model → output parser.
//!
//! Per-run collaborators (callback handlers, an optional response cache) are
//! passed in a [`RunConfig`] rather than registered globally.

use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::cache::LlmCache;
use crate::callbacks::CallbackHandler;
use crate::models::{ChatResponse, Message};
use crate::parser::OutputParser;
use crate::prompt::ChatPromptTemplate;
use crate::providers::ChatModel;

#[derive(Default)]
pub struct RunConfig<'a> {
    pub callbacks: Vec<&'a mut dyn CallbackHandler>,
    pub cache: Option<&'a dyn LlmCache>,
}

impl<'a> RunConfig<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(mut self, handler: &'a mut dyn CallbackHandler) -> Self {
        self.callbacks.push(handler);
        self
    }

    pub fn with_cache(mut self, cache: &'a dyn LlmCache) -> Self {
        self.cache = Some(cache);
        self
    }
}

pub struct Chain<M, P> {
    prompt: ChatPromptTemplate,
    model: M,
    parser: P,
}

impl<M: ChatModel, P: OutputParser> Chain<M, P> {
    pub fn new(prompt: ChatPromptTemplate, model: M, parser: P) -> Self {
        Self {
            prompt,
            model,
            parser,
        }
    }

    pub fn prompt(&self) -> &ChatPromptTemplate {
        &self.prompt
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn invoke<V: AsRef<str>>(
        &self,
        vars: &HashMap<&str, V>,
        config: &mut RunConfig<'_>,
    ) -> Result<P::Output> {
        let messages = self.prompt.format_messages(vars)?;
        let response = self.generate(&messages, config.cache)?;

        for handler in config.callbacks.iter_mut() {
            handler.on_llm_end(&response);
        }
        self.parser.parse(&response.message)
    }

    fn generate(&self, messages: &[Message], cache: Option<&dyn LlmCache>) -> Result<ChatResponse> {
        let Some(cache) = cache else {
            return self.call_model(messages);
        };

        let prompt_key = serde_json::to_string(messages)?;
        let llm_key = self.model.cache_key();
        match cache.lookup(&prompt_key, &llm_key) {
            Ok(Some(text)) => {
                tracing::debug!(model = %self.model.model_name(), "llm cache hit");
                // Cached generations carry no usage accounting
                return Ok(ChatResponse::new(
                    Message::ai(text),
                    self.model.model_name(),
                ));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "llm cache lookup failed"),
        }

        let response = self.call_model(messages)?;
        if let Err(e) = cache.update(&prompt_key, &llm_key, response.text()) {
            tracing::warn!(error = %e, "llm cache update failed");
        }
        Ok(response)
    }

    fn call_model(&self, messages: &[Message]) -> Result<ChatResponse> {
        self.model
            .invoke(messages)
            .with_context(|| format!("invoke model {}", self.model.model_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::callbacks::TokenUsageRecorder;
    use crate::parser::StrOutputParser;
    use crate::providers::FakeChatModel;
    use serde_json::json;

    fn topic(t: &str) -> HashMap<&str, &str> {
        HashMap::from([("topic", t)])
    }

    #[test]
    fn test_simple_chain_with_fake_model() {
        let prompt = ChatPromptTemplate::from_template("Tell me about {topic}").unwrap();
        let chain = Chain::new(prompt, FakeChatModel::new(["Mocked response"]), StrOutputParser);

        let out = chain.invoke(&topic("testing"), &mut RunConfig::new()).unwrap();
        assert_eq!(out, "Mocked response");
        assert_eq!(chain.model().call_count(), 1);
        assert_eq!(
            chain.model().last_messages(),
            vec![Message::human("Tell me about testing")]
        );
    }

    #[test]
    fn test_recorder_receives_usage() {
        let usage = json!({"prompt_tokens": 12, "completion_tokens": 34, "total_tokens": 46});
        let model = FakeChatModel::new(["ok"]).with_usage(usage.as_object().cloned().unwrap());
        let prompt = ChatPromptTemplate::from_template("Tell me about {topic}").unwrap();
        let chain = Chain::new(prompt, model, StrOutputParser);

        let mut recorder = TokenUsageRecorder::new();
        let mut config = RunConfig::new().with_callback(&mut recorder);
        chain.invoke(&topic("tokens"), &mut config).unwrap();
        drop(config);

        assert_eq!(recorder.format_usage(), " [Tokens: 12 in, 34 out, 46 total]");
    }

    #[test]
    fn test_cache_hit_skips_model_and_usage() {
        let usage = json!({"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3});
        let model = FakeChatModel::new(["first", "second"])
            .with_usage(usage.as_object().cloned().unwrap());
        let prompt = ChatPromptTemplate::from_template("Tell me about {topic}").unwrap();
        let chain = Chain::new(prompt, model, StrOutputParser);
        let cache = InMemoryCache::new(60);

        let mut recorder = TokenUsageRecorder::new();
        let first = {
            let mut config = RunConfig::new()
                .with_cache(&cache)
                .with_callback(&mut recorder);
            chain.invoke(&topic("caching"), &mut config).unwrap()
        };
        assert_eq!(first, "first");
        assert_eq!(recorder.format_usage(), " [Tokens: 1 in, 2 out, 3 total]");

        recorder.reset();
        let second = {
            let mut config = RunConfig::new()
                .with_cache(&cache)
                .with_callback(&mut recorder);
            chain.invoke(&topic("caching"), &mut config).unwrap()
        };
        assert_eq!(second, "first");
        assert_eq!(chain.model().call_count(), 1);
        assert_eq!(recorder.format_usage(), "");

        let other = chain
            .invoke(&topic("something else"), &mut RunConfig::new().with_cache(&cache))
            .unwrap();
        assert_eq!(other, "second");
        assert_eq!(chain.model().call_count(), 2);
    }

    #[test]
    fn test_missing_variable_does_not_call_model() {
        let prompt = ChatPromptTemplate::from_template("Explain {concept}").unwrap();
        let chain = Chain::new(prompt, FakeChatModel::new(["x"]), StrOutputParser);
        assert!(chain.invoke(&topic("wrong key"), &mut RunConfig::new()).is_err());
        assert_eq!(chain.model().call_count(), 0);
    }

    #[test]
    fn test_model_error_is_propagated_with_context() {
        let prompt = ChatPromptTemplate::from_template("hi").unwrap();
        let chain = Chain::new(
            prompt,
            FakeChatModel::new(Vec::<String>::new()).with_name("empty"),
            StrOutputParser,
        );
        let err = chain
            .invoke(&HashMap::<&str, &str>::new(), &mut RunConfig::new())
            .unwrap_err();
        assert!(format!("{err:#}").contains("invoke model empty"));
    }
}
