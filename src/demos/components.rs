use anyhow::Result;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;

use crate::callbacks::TokenUsageRecorder;
use crate::chain::{Chain, RunConfig};
use crate::display::Printer;
use crate::models::Message;
use crate::parser::{OutputParser, StrOutputParser};
use crate::prompt::ChatPromptTemplate;
use crate::providers::FakeChatModel;

/// Exercise templates, parsing and a full chain without any network access
pub fn run<W: Write>(out: &mut Printer<W>) -> Result<()> {
    out.info("🧪", "Testing pipeline components (no API required)...")?;
    out.blank()?;

    let prompt = ChatPromptTemplate::from_messages(&[
        ("system", "You are a helpful assistant."),
        ("human", "Tell me about {topic}"),
    ])?;
    let formatted = prompt.format_messages(&HashMap::from([("topic", "Rust programming")]))?;
    out.ok(format!(
        "Prompt formatting works: {} messages created",
        formatted.len()
    ))?;

    let parser = StrOutputParser;
    let parsed = parser.parse(&Message::ai("This is a test response"))?;
    out.ok(format!("Output parsing works: '{parsed}'"))?;

    let usage = json!({"prompt_tokens": 12, "completion_tokens": 34, "total_tokens": 46});
    let model = FakeChatModel::new(["Rust is a systems programming language."])
        .with_usage(usage.as_object().cloned().unwrap_or_default());
    let chain = Chain::new(prompt, model, StrOutputParser);

    let mut recorder = TokenUsageRecorder::new();
    let response = chain.invoke(
        &HashMap::from([("topic", "Rust")]),
        &mut RunConfig::new().with_callback(&mut recorder),
    )?;
    out.ok(format!(
        "Chain works: {response}{}",
        recorder.format_usage()
    ))?;

    out.blank()?;
    out.info("🎉", "Component tests passed! Your environment is ready.")?;
    Ok(())
}
