//! Chat message types passed to [`LlmClient`](crate::llm::LlmClient).
//!
//! Stages build a short conversation (system instructions first, then the rendered
//! pipeline context as a user turn) and hand it to the model.

/// A single message in a model conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Message {
    /// Stage instructions; placed first in the list.
    System(String),
    /// Rendered input for the stage.
    User(String),
    /// Model reply (used when a conversation is replayed).
    Assistant(String),
}

impl Message {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(content.into())
    }

    /// Text content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Message::System(s) | Message::User(s) | Message::Assistant(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: system/user/assistant constructors produce the correct variant with content.
    #[test]
    fn message_constructors() {
        assert!(matches!(Message::system("s"), Message::System(c) if c == "s"));
        assert!(matches!(Message::user("u"), Message::User(c) if c == "u"));
        assert!(matches!(Message::assistant("a"), Message::Assistant(c) if c == "a"));
    }

    #[test]
    fn content_reads_any_role() {
        assert_eq!(Message::user("hello").content(), "hello");
        assert_eq!(Message::system("rules").content(), "rules");
    }
}
