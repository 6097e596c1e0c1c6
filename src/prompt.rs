//! # Prompt Templates
//!
//! Chat prompt templates with `{name}` placeholders. Doubled braces (`{{`, `}}`)
//! render as literal braces.

use anyhow::{Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::models::{Message, Role};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}|\{|\}").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

/// A single message template, pre-split into literal text and placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub role: Role,
    source: String,
    segments: Vec<Segment>,
}

impl MessageTemplate {
    pub fn new(role: Role, template: &str) -> Result<Self> {
        Ok(Self {
            role,
            source: template.to_string(),
            segments: parse_segments(template)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn format<V: AsRef<str>>(&self, vars: &HashMap<&str, V>) -> Result<Message> {
        let mut out = String::with_capacity(self.source.len());
        for seg in &self.segments {
            match seg {
                Segment::Text(t) => out.push_str(t),
                Segment::Var(name) => {
                    let value = vars
                        .get(name.as_str())
                        .ok_or_else(|| anyhow!("missing value for prompt variable '{name}'"))?;
                    out.push_str(value.as_ref());
                }
            }
        }
        Ok(Message::new(self.role, out))
    }
}

fn parse_segments(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut last = 0;

    for caps in TOKEN_RE.captures_iter(template) {
        let Some(m) = caps.get(0) else { continue };
        text.push_str(&template[last..m.start()]);
        last = m.end();
        match m.as_str() {
            "{{" => text.push('{'),
            "}}" => text.push('}'),
            "{" | "}" => bail!(
                "unbalanced brace at byte {} in template {:?}",
                m.start(),
                template
            ),
            _ => {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Var(caps[1].to_string()));
            }
        }
    }
    text.push_str(&template[last..]);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Ordered list of message templates rendered together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPromptTemplate {
    messages: Vec<MessageTemplate>,
}

impl ChatPromptTemplate {
    /// Build from `(role, template)` pairs, e.g. `("system", "...")`, `("human", "...")`
    pub fn from_messages(messages: &[(&str, &str)]) -> Result<Self> {
        let messages = messages
            .iter()
            .map(|(role, template)| MessageTemplate::new(Role::parse(role)?, template))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { messages })
    }

    /// Single human message template
    pub fn from_template(template: &str) -> Result<Self> {
        Ok(Self {
            messages: vec![MessageTemplate::new(Role::Human, template)?],
        })
    }

    pub fn messages(&self) -> &[MessageTemplate] {
        &self.messages
    }

    /// Unique placeholder names in first-seen order
    pub fn input_variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.messages.iter().flat_map(|m| m.variables()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    pub fn format_messages<V: AsRef<str>>(&self, vars: &HashMap<&str, V>) -> Result<Vec<Message>> {
        self.messages.iter().map(|m| m.format(vars)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(pairs: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_chat_prompt_template() {
        let prompt = ChatPromptTemplate::from_messages(&[
            ("system", "You are a helpful assistant."),
            ("human", "Tell me about {topic}"),
        ])
        .unwrap();

        let formatted = prompt
            .format_messages(&vars(&[("topic", "artificial intelligence")]))
            .unwrap();

        assert_eq!(formatted.len(), 2);
        assert_eq!(formatted[0].content, "You are a helpful assistant.");
        assert_eq!(formatted[1].content, "Tell me about artificial intelligence");
        assert_eq!(formatted[1].role, Role::Human);
    }

    #[test]
    fn test_from_template_is_single_human_message() {
        let prompt = ChatPromptTemplate::from_template("Tell me about {topic}").unwrap();
        let formatted = prompt.format_messages(&vars(&[("topic", "testing")])).unwrap();
        assert_eq!(formatted, vec![Message::human("Tell me about testing")]);
    }

    #[test]
    fn test_missing_variable_is_error() {
        let prompt = ChatPromptTemplate::from_template("Explain {concept} simply").unwrap();
        let err = prompt
            .format_messages(&HashMap::<&str, &str>::new())
            .unwrap_err();
        assert!(err.to_string().contains("concept"));
    }

    #[test]
    fn test_escaped_braces() {
        let prompt = ChatPromptTemplate::from_template("JSON: {{\"k\": \"{v}\"}}").unwrap();
        assert_eq!(prompt.input_variables(), vec!["v".to_string()]);
        let formatted = prompt.format_messages(&vars(&[("v", "x")])).unwrap();
        assert_eq!(formatted[0].content, "JSON: {\"k\": \"x\"}");
    }

    #[test]
    fn test_unbalanced_brace_rejected() {
        assert!(ChatPromptTemplate::from_template("oops {topic").is_err());
        assert!(ChatPromptTemplate::from_template("oops }").is_err());
        assert!(ChatPromptTemplate::from_messages(&[("robot", "hi")]).is_err());
    }

    #[test]
    fn test_input_variables_dedup_in_order() {
        let prompt = ChatPromptTemplate::from_messages(&[
            ("system", "Answer as {persona}."),
            ("human", "{question} ({persona})"),
        ])
        .unwrap();
        assert_eq!(
            prompt.input_variables(),
            vec!["persona".to_string(), "question".to_string()]
        );
    }

    #[test]
    fn test_no_variables_template() {
        let prompt =
            ChatPromptTemplate::from_template("In exactly one sentence, what is AI?").unwrap();
        assert!(prompt.input_variables().is_empty());
        let formatted = prompt.format_messages(&HashMap::<&str, String>::new()).unwrap();
        assert_eq!(formatted[0].content, "In exactly one sentence, what is AI?");
    }
}
