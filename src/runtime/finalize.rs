//! Finalize pipeline
//!
//! Runs once per consented submission: résumé upload, the two persistence
//! writes, reviewer notification and the applicant acknowledgment. Every
//! collaborator failure degrades the result instead of aborting; the applicant
//! always receives the acknowledgment.

use super::error::{SinkError, UploadError};
use super::traits::{ChatTransport, ResumeUploader, ReviewerNotifier, SubmissionSink};
use crate::phrases::Phrases;
use crate::state_machine::{ChatIdentity, OutboundMessage, Submission};
use std::sync::Arc;
use teloxide::utils::html;

/// Format of the timestamp shared by the sinks and the notification
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Flattened row written to both persistence sinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub timestamp: String,
    pub full_name: String,
    pub positions: String,
    pub contacts: String,
    pub resume_link: String,
}

impl SubmissionRecord {
    /// Cells in sink column order
    pub fn to_row(&self) -> [String; 5] {
        [
            self.timestamp.clone(),
            self.full_name.clone(),
            self.positions.clone(),
            self.contacts.clone(),
            self.resume_link.clone(),
        ]
    }
}

/// How one pipeline step went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    /// Nothing to do (no résumé attached)
    Skipped,
    /// Collaborator failed; the pipeline continued without it
    Degraded(String),
}

impl StepOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, StepOutcome::Degraded(_))
    }
}

/// Outcome of every step of one finalize run
#[derive(Debug, Clone)]
pub struct FinalizeReport {
    pub record: SubmissionRecord,
    pub upload: StepOutcome,
    pub file_sink: StepOutcome,
    pub sheet_sink: StepOutcome,
    pub notify: StepOutcome,
    pub acknowledgment: StepOutcome,
}

impl FinalizeReport {
    pub fn degraded_steps(&self) -> Vec<&'static str> {
        [
            ("upload", &self.upload),
            ("file_sink", &self.file_sink),
            ("sheet_sink", &self.sheet_sink),
            ("notify", &self.notify),
            ("acknowledgment", &self.acknowledgment),
        ]
        .into_iter()
        .filter(|(_, outcome)| outcome.is_degraded())
        .map(|(name, _)| name)
        .collect()
    }
}

/// External services the pipeline drives
pub struct Collaborators {
    pub uploader: Arc<dyn ResumeUploader>,
    /// Local spreadsheet file, written first
    pub file_sink: Arc<dyn SubmissionSink>,
    /// Spreadsheet service, written second
    pub sheet_sink: Arc<dyn SubmissionSink>,
    pub notifier: Arc<dyn ReviewerNotifier>,
    pub transport: Arc<dyn ChatTransport>,
}

pub struct FinalizePipeline {
    phrases: &'static Phrases,
    reviewer: ChatIdentity,
    collaborators: Collaborators,
}

impl FinalizePipeline {
    pub fn new(
        phrases: &'static Phrases,
        reviewer: ChatIdentity,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            phrases,
            reviewer,
            collaborators,
        }
    }

    pub async fn run(&self, identity: ChatIdentity, submission: Submission) -> FinalizeReport {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();

        tracing::info!(identity = %identity, timestamp = %timestamp, "Finalizing submission");

        let (resume_link, upload) = self.resolve_resume_link(identity, &submission).await;

        let record = SubmissionRecord {
            timestamp,
            full_name: submission.full_name,
            positions: submission.positions,
            contacts: submission.contacts,
            resume_link,
        };

        let file_sink = self.persist(identity, &self.collaborators.file_sink, &record).await;
        let sheet_sink = self.persist(identity, &self.collaborators.sheet_sink, &record).await;

        let summary = format_summary(self.phrases, &record);
        let notify = match self.collaborators.notifier.notify(self.reviewer, &summary).await {
            Ok(()) => StepOutcome::Done,
            Err(e) => {
                tracing::error!(
                    identity = %identity,
                    reviewer = %self.reviewer,
                    error = %e,
                    "Reviewer notification failed"
                );
                StepOutcome::Degraded(e.to_string())
            }
        };

        let ack = OutboundMessage::removing_keyboard(self.phrases.acknowledgment);
        let acknowledgment = match self.collaborators.transport.send(identity, ack).await {
            Ok(()) => StepOutcome::Done,
            Err(e) => {
                tracing::error!(identity = %identity, error = %e, "Acknowledgment delivery failed");
                StepOutcome::Degraded(e.to_string())
            }
        };

        let report = FinalizeReport {
            record,
            upload,
            file_sink,
            sheet_sink,
            notify,
            acknowledgment,
        };

        let degraded = report.degraded_steps();
        if degraded.is_empty() {
            tracing::info!(
                identity = %identity,
                resume = %report.record.resume_link,
                "Submission finalized"
            );
        } else {
            tracing::warn!(
                identity = %identity,
                resume = %report.record.resume_link,
                degraded = ?degraded,
                "Submission finalized with degraded steps"
            );
        }

        report
    }

    /// Upload the résumé if one was attached, falling back to the placeholder
    async fn resolve_resume_link(
        &self,
        identity: ChatIdentity,
        submission: &Submission,
    ) -> (String, StepOutcome) {
        let placeholder = self.phrases.resume_placeholder.to_string();

        let Some(file) = &submission.resume_ref else {
            return (placeholder, StepOutcome::Skipped);
        };

        match self
            .collaborators
            .uploader
            .upload(file, &submission.full_name)
            .await
        {
            Ok(link) => {
                tracing::info!(identity = %identity, file_id = %file.file_id, "Résumé uploaded");
                (link, StepOutcome::Done)
            }
            Err(e) => {
                let kind = match &e {
                    UploadError::Source(_) => "source",
                    UploadError::Auth(_) => "auth",
                    UploadError::RateLimited(_) => "rate_limited",
                    UploadError::Request(_) => "request",
                };
                tracing::error!(
                    identity = %identity,
                    file_id = %file.file_id,
                    kind = kind,
                    error = %e,
                    "Résumé upload failed, using placeholder"
                );
                (placeholder, StepOutcome::Degraded(e.to_string()))
            }
        }
    }

    async fn persist(
        &self,
        identity: ChatIdentity,
        sink: &Arc<dyn SubmissionSink>,
        record: &SubmissionRecord,
    ) -> StepOutcome {
        match sink.append(record).await {
            Ok(()) => {
                tracing::debug!(identity = %identity, sink = sink.name(), "Submission persisted");
                StepOutcome::Done
            }
            Err(SinkError::Local(e)) => {
                tracing::error!(
                    identity = %identity,
                    sink = sink.name(),
                    error = %e,
                    "Local write failed"
                );
                StepOutcome::Degraded(e.to_string())
            }
            Err(SinkError::Remote(e)) => {
                tracing::error!(
                    identity = %identity,
                    sink = sink.name(),
                    error = %e,
                    "Remote write failed"
                );
                StepOutcome::Degraded(e.to_string())
            }
        }
    }
}

/// HTML summary sent to the reviewer
pub fn format_summary(phrases: &Phrases, record: &SubmissionRecord) -> String {
    format!(
        "📥 <b>{title}</b>\n\n\
         👤 <b>{name_label}:</b> {name}\n\
         💼 <b>{positions_label}:</b> {positions}\n\
         📞 <b>{contacts_label}:</b> {contacts}\n\
         📎 <b>{resume_label}:</b> {resume}\n\
         🕒 <b>{time_label}:</b> {time}\n\
         ✅ <b>{consent}</b>",
        title = phrases.summary_title,
        name_label = phrases.summary_full_name,
        name = html::escape(&record.full_name),
        positions_label = phrases.summary_positions,
        positions = html::escape(&record.positions),
        contacts_label = phrases.summary_contacts,
        contacts = html::escape(&record.contacts),
        resume_label = phrases.summary_resume,
        resume = html::escape(&record.resume_link),
        time_label = phrases.summary_time,
        time = record.timestamp,
        consent = phrases.summary_consent,
    )
}
