use std::path::PathBuf;

use crate::providers::{anthropic, openai};

#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DemoCommand {
    /// Template, parser and chain checks with an offline model (no API key needed)
    Components,
    /// Chains against the OpenAI chat-completions API
    Openai {
        /// Also run every model in the OpenAI catalogue with token usage
        #[arg(long)]
        advanced: bool,
    },
    /// Chains against the Anthropic Messages API
    Anthropic {
        /// Also run every model in the Claude catalogue with token usage
        #[arg(long)]
        advanced: bool,
    },
    /// Key-value operations and LLM response caching
    Cache,
    /// Documents and conversation history in the relational store
    Store,
    /// Run every demo in sequence
    All,
}

#[derive(clap::Parser, Debug)]
#[command(name = "llm-demos", version, about = "Prompt → model → parser pipeline demos")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<DemoCommand>,

    /// OpenAI API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, global = true, env = "OPENAI_BASE_URL", default_value = openai::DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Anthropic API base URL
    #[arg(long, global = true, env = "ANTHROPIC_BASE_URL", default_value = anthropic::DEFAULT_BASE_URL)]
    pub anthropic_base_url: String,

    /// SQLite database used by the cache and store demos. Defaults to ~/.llm-demos/demos.db
    #[arg(long, global = true, env = "LLM_DEMOS_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Disable colored output (also honors NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Debug mode: verbose logging to stderr
    #[arg(long, global = true, env = "LLM_DEMOS_DEBUG")]
    pub debug: bool,
}

impl Args {
    pub fn parse() -> Self {
        <Args as clap::Parser>::parse()
    }

    pub fn command(&self) -> DemoCommand {
        self.command.clone().unwrap_or(DemoCommand::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_subcommand_parsing() {
        let args = Args::try_parse_from(["llm-demos", "openai", "--advanced", "--no-color"]).unwrap();
        assert_eq!(args.command(), DemoCommand::Openai { advanced: true });
        assert!(args.no_color);

        let args = Args::try_parse_from(["llm-demos", "--db-path", "/tmp/x.db", "store"]).unwrap();
        assert_eq!(args.command(), DemoCommand::Store);
        assert_eq!(args.db_path, Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn test_defaults_to_all() {
        let args = Args::try_parse_from(["llm-demos"]).unwrap();
        assert_eq!(args.command(), DemoCommand::All);
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Args::try_parse_from(["llm-demos", "postgres"]).is_err());
    }
}
