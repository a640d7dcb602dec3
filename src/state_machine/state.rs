//! Intake session state types

use crate::phrases::Phrases;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ============================================================================
// Identities and handles
// ============================================================================

/// Opaque key of one applicant conversation (the chat id on Telegram)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatIdentity(pub i64);

impl fmt::Display for ChatIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a document the applicant uploaded to the chat transport.
///
/// The transport owns the bytes; the form only stores and forwards the handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub file_id: String,
    /// Original file name as reported by the sender, if any
    #[serde(default)]
    pub file_name: Option<String>,
}

impl FileReference {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Extension of the original file name including the leading dot
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
    }
}

// ============================================================================
// Form steps
// ============================================================================

/// Current step of an active intake session.
///
/// Finalized and cleared sessions are not represented: both outcomes remove
/// the session from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    #[default]
    CollectingName,
    CollectingPositions,
    CollectingResume,
    CollectingContacts,
    AwaitingConsent,
    AwaitingPostConsentChoice,
}

impl FormStep {
    /// Position of the step along the form, used to check forward progress
    #[allow(dead_code)] // Used by tests
    pub fn ordinal(self) -> u8 {
        match self {
            FormStep::CollectingName => 0,
            FormStep::CollectingPositions => 1,
            FormStep::CollectingResume => 2,
            FormStep::CollectingContacts => 3,
            FormStep::AwaitingConsent => 4,
            FormStep::AwaitingPostConsentChoice => 5,
        }
    }

    pub fn is_consent_step(self) -> bool {
        matches!(
            self,
            FormStep::AwaitingConsent | FormStep::AwaitingPostConsentChoice
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormStep::CollectingName => "collecting_name",
            FormStep::CollectingPositions => "collecting_positions",
            FormStep::CollectingResume => "collecting_resume",
            FormStep::CollectingContacts => "collecting_contacts",
            FormStep::AwaitingConsent => "awaiting_consent",
            FormStep::AwaitingPostConsentChoice => "awaiting_post_consent_choice",
        }
    }
}

impl fmt::Display for FormStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Session
// ============================================================================

/// Fields collected so far, populated one step at a time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    pub full_name: Option<String>,
    pub positions: Option<String>,
    pub resume_ref: Option<FileReference>,
    pub contacts: Option<String>,
}

/// In-progress intake form of one applicant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: ChatIdentity,
    pub step: FormStep,
    pub fields: FormFields,
}

impl Session {
    pub fn new(identity: ChatIdentity) -> Self {
        Self {
            identity,
            step: FormStep::CollectingName,
            fields: FormFields::default(),
        }
    }

    /// Move to `step`, applying `update` to the collected fields
    pub(crate) fn advance(&self, step: FormStep, update: impl FnOnce(&mut FormFields)) -> Self {
        let mut next = self.clone();
        update(&mut next.fields);
        next.step = step;
        next
    }
}

/// Collected fields handed to the finalize pipeline once consent is given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub full_name: String,
    pub positions: String,
    pub resume_ref: Option<FileReference>,
    pub contacts: String,
}

impl From<FormFields> for Submission {
    fn from(fields: FormFields) -> Self {
        Self {
            full_name: fields.full_name.unwrap_or_default(),
            positions: fields.positions.unwrap_or_default(),
            resume_ref: fields.resume_ref,
            contacts: fields.contacts.unwrap_or_default(),
        }
    }
}

/// Immutable configuration shared by every session
#[derive(Debug, Clone, Copy)]
pub struct FormContext {
    pub phrases: &'static Phrases,
}

impl FormContext {
    pub fn new(phrases: &'static Phrases) -> Self {
        Self { phrases }
    }
}
