//! Output parsers turn a model's reply message into the chain's final value.

use anyhow::Result;

use crate::models::Message;

pub trait OutputParser {
    type Output;

    fn parse(&self, message: &Message) -> Result<Self::Output>;
}

/// Returns the reply text unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct StrOutputParser;

impl OutputParser for StrOutputParser {
    type Output = String;

    fn parse(&self, message: &Message) -> Result<String> {
        Ok(message.content.clone())
    }
}
