//! Pure state transition function
//!
//! Given the current session (if any), an inbound event and the form context,
//! computes the next session value and the effects to run. No I/O happens here.

use super::state::{
    ChatIdentity, FileReference, FormContext, FormFields, FormStep, Session, Submission,
};
use super::{Effect, Event};
use crate::phrases::Phrases;
use thiserror::Error;

/// What happens to the session after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Session continues at the contained step
    Active(Session),
    /// Consent given; fields handed to the finalize pipeline and session removed
    Finalized,
    /// Applicant asked for their data to be discarded; session removed
    Cleared,
}

impl SessionUpdate {
    #[allow(dead_code)] // Used by tests
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionUpdate::Active(session) => Some(session),
            SessionUpdate::Finalized | SessionUpdate::Cleared => None,
        }
    }
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub update: SessionUpdate,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(update: SessionUpdate) -> Self {
        Self {
            update,
            effects: vec![],
        }
    }

    pub fn active(session: Session) -> Self {
        Self::new(SessionUpdate::Active(session))
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Events the state machine refuses to handle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No active intake session (send the start command first)")]
    NoActiveSession,
}

/// Pure transition function
pub fn transition(
    session: Option<&Session>,
    identity: ChatIdentity,
    context: &FormContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let phrases = context.phrases;

    match (session, event) {
        // Start always begins a fresh form, discarding anything collected so far
        (_, Event::Start) => {
            let fresh = TransitionResult::active(Session::new(identity));
            Ok(fresh.with_effect(Effect::reply_removing_keyboard(phrases.greeting)))
        }

        (None, _) => Err(TransitionError::NoActiveSession),

        (Some(session), Event::Text { text }) => Ok(handle_text(session, phrases, text)),

        (Some(session), Event::Document { file }) => Ok(handle_document(session, phrases, file)),
    }
}

fn handle_text(session: &Session, phrases: &Phrases, text: String) -> TransitionResult {
    match session.step {
        FormStep::CollectingName => {
            advance_to(session, FormStep::CollectingPositions, phrases, |f| {
                f.full_name = Some(text);
            })
        }

        FormStep::CollectingPositions => {
            advance_to(session, FormStep::CollectingResume, phrases, |f| {
                f.positions = Some(text);
            })
        }

        // Any text at the résumé step skips the attachment
        FormStep::CollectingResume => {
            advance_to(session, FormStep::CollectingContacts, phrases, |f| {
                f.resume_ref = None;
            })
        }

        FormStep::CollectingContacts => {
            advance_to(session, FormStep::AwaitingConsent, phrases, |f| {
                f.contacts = Some(text);
            })
        }

        FormStep::AwaitingConsent => {
            if Phrases::matches(phrases.consent_yes, &text) {
                finalize(session)
            } else if Phrases::matches(phrases.consent_no, &text) {
                advance_to(session, FormStep::AwaitingPostConsentChoice, phrases, |_| {})
            } else {
                // Unrecognized answer: ask again, keep the step
                reprompt(session, phrases)
            }
        }

        FormStep::AwaitingPostConsentChoice => {
            if Phrases::matches(phrases.grant_consent, &text) {
                finalize(session)
            } else if Phrases::matches(phrases.delete_data, &text) {
                TransitionResult::new(SessionUpdate::Cleared)
                    .with_effect(Effect::reply_removing_keyboard(phrases.data_deleted))
            } else {
                reprompt(session, phrases)
            }
        }
    }
}

fn handle_document(
    session: &Session,
    phrases: &Phrases,
    file: FileReference,
) -> TransitionResult {
    match session.step {
        FormStep::CollectingResume => {
            advance_to(session, FormStep::CollectingContacts, phrases, |f| {
                f.resume_ref = Some(file);
            })
        }
        // Documents are only meaningful at the résumé step; repeat the current question
        _ => reprompt(session, phrases),
    }
}

/// Keep the session where it is and repeat its question
fn reprompt(session: &Session, phrases: &Phrases) -> TransitionResult {
    TransitionResult::active(session.clone()).with_effect(prompt_for(session.step, phrases))
}

fn finalize(session: &Session) -> TransitionResult {
    let submission = Submission::from(session.fields.clone());
    TransitionResult::new(SessionUpdate::Finalized).with_effect(Effect::Finalize { submission })
}

/// Move the session to `step` and ask that step's question
fn advance_to(
    session: &Session,
    step: FormStep,
    phrases: &Phrases,
    update: impl FnOnce(&mut FormFields),
) -> TransitionResult {
    TransitionResult::active(session.advance(step, update)).with_effect(prompt_for(step, phrases))
}

/// The question asked when entering `step`
pub(crate) fn prompt_for(step: FormStep, phrases: &Phrases) -> Effect {
    match step {
        FormStep::CollectingName => Effect::reply(phrases.greeting),
        FormStep::CollectingPositions => Effect::reply(phrases.ask_positions),
        FormStep::CollectingResume => Effect::reply(phrases.ask_resume),
        FormStep::CollectingContacts => Effect::reply(phrases.ask_contacts),
        FormStep::AwaitingConsent => Effect::reply_with_options(
            phrases.ask_consent,
            [vec![phrases.consent_yes, phrases.consent_no]],
        ),
        FormStep::AwaitingPostConsentChoice => Effect::reply_with_options(
            phrases.consent_refused,
            [vec![phrases.grant_consent], vec![phrases.delete_data]],
        ),
    }
}
