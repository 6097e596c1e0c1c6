//! # LLM Demos
//!
//! Small, runnable demonstrations of a prompt → model → output-parser
//! pipeline wired to two chat-completion vendors and two backing stores.
//!
//! ## Overview
//!
//! - Chat prompt templates with `{name}` placeholders
//! - OpenAI and Anthropic chat clients behind one [`providers::ChatModel`] trait
//! - A linear [`chain::Chain`] with per-run callbacks and an optional response cache
//! - [`callbacks::TokenUsageRecorder`], which captures the token accounting of a
//!   single completed call and formats it for display
//! - A SQLite store serving as key-value cache, document table and conversation history
//!
//! ## Features
//!
//! - `colors` (default): Enables terminal color output via owo-colors

/// LLM response caches
pub mod cache;

/// Linear prompt → model → parser pipeline
pub mod chain;

/// Callback handlers, including token usage recording
pub mod callbacks;

/// Command-line argument parsing and configuration
pub mod cli;

/// SQLite store: metadata, key-value and hash keys
pub mod db;

/// Runnable demo walkthroughs
pub mod demos;

/// Console output helpers
pub mod display;

/// Documents and conversation history
pub mod history;

/// Tracing subscriber setup
pub mod logging;

/// Messages and model responses
pub mod models;

/// Output parsers
pub mod parser;

/// Chat prompt templates
pub mod prompt;

/// Chat model clients
pub mod providers;
