//! Collaborator error types
//!
//! Every error here is recoverable: the finalize pipeline matches on it, logs
//! it and continues with a degraded result.

use std::path::PathBuf;
use thiserror::Error;

/// Résumé could not be turned into a shareable link
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("document unavailable: {0}")]
    Source(String),
    #[error("storage authorization failed: {0}")]
    Auth(String),
    #[error("storage quota or rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("upload request failed: {0}")]
    Request(String),
}

/// Spreadsheet service rejected or never received the row
#[derive(Debug, Error)]
pub enum RemoteWriteError {
    #[error("spreadsheet authorization failed: {0}")]
    Auth(String),
    #[error("spreadsheet rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("spreadsheet request failed: {0}")]
    Request(String),
}

/// Local submission log could not be written
#[derive(Debug, Error)]
pub enum LocalWriteError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("writer task failed: {0}")]
    Task(String),
}

/// Failure of either persistence sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Local(#[from] LocalWriteError),
    #[error(transparent)]
    Remote(#[from] RemoteWriteError),
}

/// Reviewer could not be notified
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("reviewer notification failed: {0}")]
    Delivery(String),
}

/// Message to the applicant could not be delivered
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("message delivery failed: {0}")]
    Delivery(String),
}
