use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::io::Write;

use super::DemoConfig;
use crate::callbacks::TokenUsageRecorder;
use crate::chain::{Chain, RunConfig};
use crate::display::{Printer, preview};
use crate::parser::StrOutputParser;
use crate::prompt::ChatPromptTemplate;
use crate::providers::{
    AnthropicChat, CLAUDE_MODELS, ChatModel, ChatSettings, OPENAI_MODELS, OpenAiChat,
    model_by_alias,
};

/// Builds a chat model for the given settings
pub type ModelFactory<'a> = dyn Fn(ChatSettings) -> Result<Box<dyn ChatModel>> + 'a;

pub const CONCEPTS: [&str; 3] = ["machine learning", "blockchain", "quantum computing"];
const PREVIEW_CHARS: usize = 100;
const ONE_SENTENCE_PROMPT: &str = "In exactly one sentence, what is artificial intelligence?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic Claude",
        }
    }

    pub fn key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn catalogue(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::OpenAi => OPENAI_MODELS,
            Self::Anthropic => CLAUDE_MODELS,
        }
    }

    /// Model used by the basic demo
    pub fn default_model(&self) -> &'static str {
        let (catalogue, alias) = match self {
            Self::OpenAi => (OPENAI_MODELS, "gpt4o_mini"),
            Self::Anthropic => (CLAUDE_MODELS, "haiku35"),
        };
        model_by_alias(catalogue, alias).unwrap_or(catalogue[0].1)
    }
}

/// Build a live client for `provider`; fails when its API key is not configured
pub fn connect(
    provider: Provider,
    config: &DemoConfig,
    settings: ChatSettings,
) -> Result<Box<dyn ChatModel>> {
    let key = config
        .api_key(provider)
        .ok_or_else(|| anyhow!("{} is not set", provider.key_env()))?;
    let base_url = config.base_url(provider);
    Ok(match provider {
        Provider::OpenAi => Box::new(OpenAiChat::new(key, settings).with_base_url(base_url)),
        Provider::Anthropic => Box::new(AnthropicChat::new(key, settings).with_base_url(base_url)),
    })
}

/// Explain a few concepts with the provider's default model.
///
/// Returns `false` when the demo was skipped (no API key, or the client could
/// not be built).
pub fn run_basic<W: Write>(
    provider: Provider,
    config: &DemoConfig,
    out: &mut Printer<W>,
    factory: &ModelFactory<'_>,
) -> Result<bool> {
    if config.api_key(provider).is_none() {
        out.warn(format!("{} not found in environment variables", provider.key_env()))?;
        out.line("Please add your API key to the .env file, or run the `components` demo")?;
        return Ok(false);
    }

    let model = match factory(ChatSettings::new(provider.default_model(), 0.7, 150)) {
        Ok(model) => model,
        Err(e) => {
            out.fail(format!("Setup error: {e:#}"))?;
            out.line("Make sure your API keys are correctly configured.")?;
            return Ok(false);
        }
    };
    let prompt = ChatPromptTemplate::from_messages(&[
        ("system", "You are a helpful assistant that explains concepts clearly."),
        ("human", "Explain {concept} in simple terms."),
    ])?;
    let chain = Chain::new(prompt, model, StrOutputParser);

    out.info("🚀", format!("Testing chain setup with {}...", provider.label()))?;
    out.blank()?;

    for concept in CONCEPTS {
        out.info("📝", format!("Explaining: {concept}"))?;
        let vars = HashMap::from([("concept", concept)]);
        match chain.invoke(&vars, &mut RunConfig::new()) {
            Ok(response) => out.ok(format!("Response: {}", preview(&response, PREVIEW_CHARS)))?,
            Err(e) => out.fail(format!("Error: {e:#}"))?,
        }
        out.divider()?;
    }

    out.ok(format!("{} chain test completed!", provider.label()))?;
    Ok(true)
}

/// Ask every catalogue model the same question and report its token usage
pub fn run_advanced<W: Write>(
    provider: Provider,
    config: &DemoConfig,
    out: &mut Printer<W>,
    factory: &ModelFactory<'_>,
) -> Result<()> {
    if config.api_key(provider).is_none() {
        out.warn(format!("{} not found - skipping advanced demo", provider.key_env()))?;
        return Ok(());
    }

    out.info("🔬", format!("Testing advanced {} features...", provider.label()))?;
    out.blank()?;

    let prompt = ChatPromptTemplate::from_template(ONE_SENTENCE_PROMPT)?;
    let no_vars: HashMap<&str, &str> = HashMap::new();

    for (_, model_id) in provider.catalogue() {
        out.info("🧪", format!("Testing model: {model_id}"))?;
        let model = match factory(ChatSettings::new(*model_id, 0.3, 500)) {
            Ok(model) => model,
            Err(e) => {
                out.fail(format!("{model_id}: {e:#}"))?;
                continue;
            }
        };
        let chain = Chain::new(prompt.clone(), model, StrOutputParser);

        let mut recorder = TokenUsageRecorder::new();
        let result = chain.invoke(&no_vars, &mut RunConfig::new().with_callback(&mut recorder));
        let usage = recorder.format_usage();
        match result {
            Ok(response) if !response.trim().is_empty() => {
                out.ok(format!("{model_id}: {}{usage}", response.trim()))?
            }
            Ok(_) => out.warn(format!("{model_id}: Empty response received{usage}"))?,
            Err(e) => out.fail(format!("{model_id}: {e:#}"))?,
        }
    }

    out.blank()?;
    out.ok(format!("Advanced {} features tested!", provider.label()))?;
    Ok(())
}
