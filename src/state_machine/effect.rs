//! Effects produced by state transitions

use crate::state_machine::state::Submission;

/// Reply keyboard to attach to an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Keyboard {
    /// Leave whatever keyboard the client currently shows
    #[default]
    Keep,
    /// Replace it with rows of option buttons
    Options(Vec<Vec<String>>),
    /// Hide the custom keyboard
    Remove,
}

/// A message to deliver to a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub keyboard: Keyboard,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::Keep,
        }
    }

    pub fn with_options<R, S>(text: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = Vec<S>>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            keyboard: Keyboard::Options(
                rows.into_iter()
                    .map(|row| row.into_iter().map(Into::into).collect())
                    .collect(),
            ),
        }
    }

    pub fn removing_keyboard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::Remove,
        }
    }
}

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a message to the applicant
    Reply(OutboundMessage),

    /// Run the finalize pipeline with the collected fields
    Finalize { submission: Submission },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply(OutboundMessage::text(text))
    }

    pub fn reply_with_options<R, S>(text: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = Vec<S>>,
        S: Into<String>,
    {
        Effect::Reply(OutboundMessage::with_options(text, rows))
    }

    pub fn reply_removing_keyboard(text: impl Into<String>) -> Self {
        Effect::Reply(OutboundMessage::removing_keyboard(text))
    }

    #[allow(dead_code)] // Used by tests
    pub fn is_finalize(&self) -> bool {
        matches!(self, Effect::Finalize { .. })
    }
}
