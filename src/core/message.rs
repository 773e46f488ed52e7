use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Ordered, append-only message log for one conversation.
///
/// Messages are never edited in place. The only removals are `clear` (a new
/// conversation) and the dispatcher's rollback of a failed turn.
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
    }

    /// Seed the system message at index 0. The dispatcher only calls this
    /// when `has_system` is false, so the message stays unique.
    pub fn insert_system(&mut self, content: impl Into<String>) {
        self.messages.insert(
            0,
            Message {
                role: Role::System,
                content: content.into(),
            },
        );
    }

    pub fn has_system(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::System)
    }

    /// A conversation is fresh until its first full turn: an empty log, or a
    /// log holding nothing but the seeded system message. Droid framing is
    /// applied exactly while this holds.
    pub fn is_fresh(&self) -> bool {
        self.messages.len() <= 1
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Remove the most recent message (failed-turn rollback).
    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    /// Remove the seeded system message, if any (failed-turn rollback).
    pub fn remove_system(&mut self) {
        if let Some(pos) = self.messages.iter().position(|m| m.role == Role::System) {
            self.messages.remove(pos);
        }
    }
}
