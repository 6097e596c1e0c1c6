use anyhow::Result;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;

use super::DemoConfig;
use crate::cache::{LlmCache, SqliteCache};
use crate::callbacks::TokenUsageRecorder;
use crate::chain::{Chain, RunConfig};
use crate::db::Store;
use crate::display::Printer;
use crate::parser::StrOutputParser;
use crate::prompt::ChatPromptTemplate;
use crate::providers::FakeChatModel;

const TEST_KEY: &str = "test_key";
const HASH_NAME: &str = "llm_demo_hash";
const SELF_TEST_KEY: &str = "llm_cache:self_test";

/// Key-value operations followed by LLM response caching.
///
/// Returns `false` when the store could not be reached.
pub fn run<W: Write>(config: &DemoConfig, out: &mut Printer<W>) -> Result<bool> {
    out.info("🚀", "Testing key-value cache integration...")?;
    out.blank()?;

    let store = match connect(config, out)? {
        Some(store) => store,
        None => return Ok(false),
    };

    if let Err(e) = basic_operations(&store, out) {
        out.fail(format!("Error: {e:#}"))?;
        return Ok(false);
    }

    out.rule()?;
    if let Err(e) = llm_cache(&store, out) {
        out.fail(format!("Error setting up the LLM cache: {e:#}"))?;
    }

    out.blank()?;
    out.info("🎉", "Cache testing complete!")?;
    Ok(true)
}

fn connect<W: Write>(config: &DemoConfig, out: &mut Printer<W>) -> Result<Option<Store>> {
    let target = config
        .db_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "default database".to_string());
    out.info("🔗", format!("Connecting to store: {target}"))?;

    match config.open_store().and_then(|s| s.ping().map(|_| s)) {
        Ok(store) => {
            out.ok("Store connection successful!")?;
            Ok(Some(store))
        }
        Err(e) => {
            out.fail(format!("Store connection failed: {e:#}"))?;
            out.line("Make sure the database path is writable!")?;
            Ok(None)
        }
    }
}

fn basic_operations<W: Write>(store: &Store, out: &mut Printer<W>) -> Result<()> {
    store.set(TEST_KEY, "Hello from the llm demos!")?;
    let value = store.get(TEST_KEY)?.unwrap_or_default();
    out.info("📝", format!("Stored and retrieved: {value}"))?;

    store.hset(HASH_NAME, "prompt_1", "This is a cached response")?;
    let cached = store.hget(HASH_NAME, "prompt_1")?.unwrap_or_default();
    out.info("💾", format!("Hash example: {cached}"))?;

    store.delete(TEST_KEY)?;
    store.delete(HASH_NAME)?;
    out.info("🧹", "Cleaned up test data")?;
    Ok(())
}

fn llm_cache<W: Write>(store: &Store, out: &mut Printer<W>) -> Result<()> {
    let cache = SqliteCache::new(store);
    out.ok("LLM response cache configured!")?;
    out.info("💡", "Chains run with this cache skip the model on repeated prompts")?;

    out.info("🧪", "Testing cache setup...")?;
    store.set(SELF_TEST_KEY, "Cache is working!")?;
    let result = store.get(SELF_TEST_KEY)?.unwrap_or_default();
    out.info("📦", format!("Cache test result: {result}"))?;
    store.delete(SELF_TEST_KEY)?;

    let usage = json!({"prompt_tokens": 9, "completion_tokens": 21, "total_tokens": 30});
    let model = FakeChatModel::new(["A cache stores answers so they can be reused."])
        .with_name("fake-cached")
        .with_usage(usage.as_object().cloned().unwrap_or_default());
    let prompt = ChatPromptTemplate::from_template("In one sentence, what is a {thing}?")?;
    let chain = Chain::new(prompt, model, StrOutputParser);
    let vars = HashMap::from([("thing", "cache")]);

    cached_calls(&chain, &vars, &cache, out)?;

    cache.clear()?;
    out.info("🧹", "Cleared LLM cache entries")?;
    Ok(())
}

/// Invoke the same prompt twice, labelling each answer by where it came from
fn cached_calls<W: Write>(
    chain: &Chain<FakeChatModel, StrOutputParser>,
    vars: &HashMap<&str, &str>,
    cache: &dyn LlmCache,
    out: &mut Printer<W>,
) -> Result<()> {
    for attempt in ["first call", "second call"] {
        let mut recorder = TokenUsageRecorder::new();
        let calls_before = chain.model().call_count();
        let response = chain.invoke(
            vars,
            &mut RunConfig::new()
                .with_cache(cache)
                .with_callback(&mut recorder),
        )?;
        let source = if chain.model().call_count() > calls_before {
            "model"
        } else {
            "cache"
        };
        out.ok(format!(
            "{attempt} ({source}): {response}{}",
            recorder.format_usage()
        ))?;
    }
    out.info(
        "📊",
        format!("Model invoked {} time(s)", chain.model().call_count()),
    )?;
    Ok(())
}
