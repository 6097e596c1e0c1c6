//! # Demos
//!
//! Runnable walkthroughs of the pipeline against each provider and store.
//! Every demo writes to a [`Printer`]; failures of individual items are
//! reported inline and the demo carries on.

use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;

use crate::cli::{Args, DemoCommand};
use crate::db::{Store, default_db_path};
use crate::display::Printer;
use crate::providers::{ChatSettings, anthropic, openai};

pub mod cache;
pub mod chat;
pub mod components;
pub mod store;

pub use chat::Provider;

/// Settings the demos need, resolved from CLI arguments and environment
#[derive(Debug, Clone, Default)]
pub struct DemoConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub db_path: Option<PathBuf>,
}

impl From<&Args> for DemoConfig {
    fn from(args: &Args) -> Self {
        Self {
            openai_api_key: non_empty(args.openai_api_key.as_deref()),
            anthropic_api_key: non_empty(args.anthropic_api_key.as_deref()),
            openai_base_url: args.openai_base_url.clone(),
            anthropic_base_url: args.anthropic_base_url.clone(),
            db_path: args.db_path.clone(),
        }
    }
}

fn non_empty(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

impl DemoConfig {
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAi => self.openai_api_key.as_deref(),
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
        }
    }

    pub fn base_url(&self, provider: Provider) -> &str {
        let (configured, fallback) = match provider {
            Provider::OpenAi => (self.openai_base_url.as_str(), openai::DEFAULT_BASE_URL),
            Provider::Anthropic => (self.anthropic_base_url.as_str(), anthropic::DEFAULT_BASE_URL),
        };
        if configured.trim().is_empty() {
            fallback
        } else {
            configured
        }
    }

    pub fn open_store(&self) -> Result<Store> {
        match &self.db_path {
            Some(path) => Store::open(path),
            None => Store::open(&default_db_path()?),
        }
    }
}

/// Run one demo (or all of them) against the given configuration
pub fn run<W: Write>(command: &DemoCommand, config: &DemoConfig, out: &mut Printer<W>) -> Result<()> {
    match command {
        DemoCommand::Components => components::run(out)?,
        DemoCommand::Openai { advanced } => run_provider(Provider::OpenAi, *advanced, config, out)?,
        DemoCommand::Anthropic { advanced } => {
            run_provider(Provider::Anthropic, *advanced, config, out)?
        }
        DemoCommand::Cache => {
            cache::run(config, out)?;
        }
        DemoCommand::Store => {
            store::run(config, out)?;
        }
        DemoCommand::All => {
            components::run(out)?;
            for provider in [Provider::OpenAi, Provider::Anthropic] {
                out.rule()?;
                run_provider(provider, true, config, out)?;
            }
            out.rule()?;
            cache::run(config, out)?;
            out.rule()?;
            store::run(config, out)?;
        }
    }
    Ok(())
}

fn run_provider<W: Write>(
    provider: Provider,
    advanced: bool,
    config: &DemoConfig,
    out: &mut Printer<W>,
) -> Result<()> {
    let factory = |settings: ChatSettings| chat::connect(provider, config, settings);
    if !chat::run_basic(provider, config, out, &factory)? {
        return Ok(());
    }
    if advanced {
        out.rule()?;
        chat::run_advanced(provider, config, out, &factory)?;
    }
    Ok(())
}
