//! Per-agent conversation history.

use llm::{Message, Role};

/// Ordered user/assistant transcript for one agent.
///
/// Append-only while in use. Every invocation is paired with the push of its reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append input for the agent.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Message::user(text));
    }

    /// Append the agent's own reply.
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(Message::assistant(text));
    }

    fn push(&mut self, message: Message) {
        debug_assert!(
            self.messages.last().map(|m| m.role) != Some(message.role),
            "conversation must alternate between user and assistant"
        );
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Text of the most recent message, if any.
    pub fn last_text(&self) -> Option<&str> {
        self.messages.last().map(|m| m.text.as_str())
    }

    /// Number of messages with the given role.
    pub fn count(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    /// Owned copy of the transcript for a backend request.
    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_count() {
        let mut history = ConversationHistory::new();
        assert!(history.is_empty());

        history.push_user("The gate creaks open.");
        history.push_assistant("[Action] I step inside.");
        history.push_user("A cold draft greets you.");

        assert_eq!(history.len(), 3);
        assert_eq!(history.count(Role::User), 2);
        assert_eq!(history.count(Role::Assistant), 1);
        assert_eq!(history.last_text(), Some("A cold draft greets you."));
    }

    #[test]
    #[should_panic(expected = "alternate")]
    #[cfg(debug_assertions)]
    fn test_consecutive_user_turns_are_rejected() {
        let mut history = ConversationHistory::new();
        history.push_user("one");
        history.push_user("two");
    }
}
