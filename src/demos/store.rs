use anyhow::Result;
use serde_json::json;
use std::io::Write;

use super::DemoConfig;
use crate::db::Store;
use crate::display::{Printer, preview};
use crate::history::new_session_id;
use crate::models::Role;

/// Documents and conversation history in the relational store.
///
/// Returns `false` when the store could not be opened.
pub fn run<W: Write>(config: &DemoConfig, out: &mut Printer<W>) -> Result<bool> {
    out.info("🚀", "Testing relational store integration...")?;
    out.blank()?;

    let store = match config.open_store() {
        Ok(store) => store,
        Err(e) => {
            out.fail(format!("Store connection failed: {e:#}"))?;
            out.line("Make sure the database path is writable!")?;
            return Ok(false);
        }
    };

    if let Err(e) = documents(&store, out) {
        out.fail(format!("Document demo failed: {e:#}"))?;
        return Ok(false);
    }

    out.rule()?;
    if let Err(e) = conversation(&store, out) {
        out.fail(format!("Conversation storage demo failed: {e:#}"))?;
    }

    out.blank()?;
    out.info("🎉", "Store testing complete!")?;
    out.info("💡", "Your database is ready for chat applications!")?;
    Ok(true)
}

fn documents<W: Write>(store: &Store, out: &mut Printer<W>) -> Result<()> {
    let location = store
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string());
    out.info("🔗", format!("Connected to store: {location}"))?;
    out.ok("Store connection successful!")?;
    out.info("📊", format!("Version: {}", store.version()?))?;

    let count = store.count_documents()?;
    out.info("📝", format!("Documents table has {count} records"))?;

    let id = store.insert_document("Test from Rust", &json!({"source": "rust_test"}))?;
    out.info("📝", format!("Inserted new record with ID: {id}"))?;

    let docs = store.list_documents(2)?;
    out.info("📚", format!("Found {} records:", docs.len()))?;
    for doc in &docs {
        out.line(format!("   - {}", preview(&doc.content, 30)))?;
    }

    store.delete_document(id)?;
    out.info("🧹", "Cleaned up test data")?;
    Ok(())
}

fn conversation<W: Write>(store: &Store, out: &mut Printer<W>) -> Result<()> {
    let session_id = new_session_id();
    let turns = [
        (Role::Human, "Hello, I want to learn about prompt pipelines"),
        (
            Role::Ai,
            "A pipeline links a prompt template, a chat model and an output parser...",
        ),
        (Role::Human, "Can you give me an example?"),
        (Role::Ai, "Sure! Here's a simple example of a three-step chain..."),
    ];
    for (role, content) in turns {
        store.add_message(&session_id, role, content, &json!({"example": true}))?;
    }

    out.info("💬", "Sample conversation stored and retrieved:")?;
    for msg in store.messages(&session_id)? {
        out.line(format!(
            "   {}: {}",
            msg.role.as_str().to_uppercase(),
            preview(&msg.content, 50)
        ))?;
    }

    store.clear_session(&session_id)?;
    out.info("🧹", "Cleaned up conversation data")?;
    Ok(())
}
