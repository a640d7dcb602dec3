//! Local spreadsheet-compatible submission log

use crate::runtime::{LocalWriteError, SinkError, SubmissionRecord, SubmissionSink};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Appends one CSV row per submission, writing the header when the file is
/// created or found empty.
pub struct CsvFileSink {
    path: PathBuf,
    header: [&'static str; 5],
    byte_order_mark: bool,
    // Serializes appends from concurrent finalize runs
    lock: Mutex<()>,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>, header: [&'static str; 5]) -> Self {
        Self {
            path: path.into(),
            header,
            byte_order_mark: false,
            lock: Mutex::new(()),
        }
    }

    /// Prefix a newly created log with a UTF-8 byte order mark
    pub fn with_byte_order_mark(mut self, enabled: bool) -> Self {
        self.byte_order_mark = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SubmissionSink for CsvFileSink {
    fn name(&self) -> &'static str {
        "csv_file"
    }

    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        let _guard = self.lock.lock().await;

        let path = self.path.clone();
        let header = self.header;
        let bom = self.byte_order_mark;
        let row = record.to_row();

        tokio::task::spawn_blocking(move || append_row(&path, &header, bom, &row))
            .await
            .map_err(|e| LocalWriteError::Task(e.to_string()))??;

        tracing::debug!(path = %self.path.display(), "Appended submission row");
        Ok(())
    }
}

fn append_row(
    path: &Path,
    header: &[&str],
    bom: bool,
    row: &[String],
) -> Result<(), LocalWriteError> {
    let io_err = |source| LocalWriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    let needs_header = file.metadata().map_err(io_err)?.len() == 0;

    if needs_header && bom {
        file.write_all(UTF8_BOM).map_err(io_err)?;
    }

    let mut writer = csv::Writer::from_writer(file);
    if needs_header {
        writer.write_record(header)?;
    }
    writer.write_record(row)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
