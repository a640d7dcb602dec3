//! Events that can occur in an intake conversation

use crate::state_machine::state::FileReference;

/// Inbound events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Start command: begins (or restarts) the form
    Start,
    /// Plain text reply
    Text { text: String },
    /// Document attachment
    Document { file: FileReference },
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Event::Text { text: text.into() }
    }

    pub fn document(file: FileReference) -> Self {
        Event::Document { file }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::Text { .. } => "text",
            Event::Document { .. } => "document",
        }
    }
}
