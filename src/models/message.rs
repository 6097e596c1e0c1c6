use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    Human,
    Ai,
}

impl Role {
    /// Parse a role name, accepting the vendor aliases `user` and `assistant`
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Self::System),
            "human" | "user" => Ok(Self::Human),
            "ai" | "assistant" => Ok(Self::Ai),
            other => bail!("unknown message role: {other:?}"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Human => "human",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Role::Ai, content)
    }

    /// Message type tag (`system`, `human`, `ai`)
    pub fn kind(&self) -> &'static str {
        self.role.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let human = Message::human("Hello");
        let ai = Message::ai("Hi there!");

        assert_eq!(human.content, "Hello");
        assert_eq!(ai.content, "Hi there!");
        assert_eq!(human.kind(), "human");
        assert_eq!(ai.kind(), "ai");
    }

    #[test]
    fn test_role_aliases() {
        assert_eq!(Role::parse("user").unwrap(), Role::Human);
        assert_eq!(Role::parse("Assistant").unwrap(), Role::Ai);
        assert_eq!(Role::parse("system").unwrap(), Role::System);
        assert!(Role::parse("tool").is_err());
    }
}
