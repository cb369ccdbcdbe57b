use serde::{Deserialize, Serialize};

pub const ERROR_PREFIX: &str = "Error: ";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    /// A frozen turn is never mutated again.
    pub frozen: bool,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            frozen: true,
        }
    }

    /// In-progress assistant turn that streaming events may still rewrite.
    pub fn assistant_open(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            frozen: false,
        }
    }

    /// Frozen assistant turn carrying a transport error.
    pub fn assistant_error(message: &str) -> Self {
        Self {
            role: Role::Assistant,
            text: format!("{ERROR_PREFIX}{message}"),
            frozen: true,
        }
    }

    pub fn is_open_assistant(&self) -> bool {
        self.role == Role::Assistant && !self.frozen
    }
}

/// Ordered, append-only log of turns. Only the last turn may be open.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Appends a turn, freezing the previous one first.
    pub fn push(&mut self, turn: Turn) {
        self.freeze_last();
        self.turns.push(turn);
    }

    /// The last turn, if it is an open assistant turn.
    pub fn open_assistant_mut(&mut self) -> Option<&mut Turn> {
        self.turns.last_mut().filter(|t| t.is_open_assistant())
    }

    pub fn has_open_assistant(&self) -> bool {
        self.turns.last().is_some_and(Turn::is_open_assistant)
    }

    pub fn freeze_last(&mut self) {
        if let Some(last) = self.turns.last_mut() {
            last.frozen = true;
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
