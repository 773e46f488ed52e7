use crate::core::message::Conversation;

/// Mutable state of one chat session: the message log plus the currently
/// selected droid and model. Passed `&mut` into every engine operation, so
/// two turns can never run against the same session concurrently.
#[derive(Debug, Clone)]
pub struct Session {
    pub conversation: Conversation,
    pub active_droid: String,
    pub active_model: String,
}

impl Session {
    pub fn new(droid: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::new(),
            active_droid: droid.into(),
            active_model: model.into(),
        }
    }

    /// Start a new conversation with the given droid. The active model is
    /// left untouched.
    pub fn reset(&mut self, droid: impl Into<String>) {
        self.conversation.clear();
        self.active_droid = droid.into();
    }
}
