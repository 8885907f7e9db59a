use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::types::RawRow;

/// Streaming reader over one CSV extract.
///
/// The header row is read eagerly on `open`; data rows are pulled lazily and
/// only once. Reopen the file to read it again.
pub struct SourceReader {
    path: PathBuf,
    headers: Vec<String>,
    records: StringRecordsIntoIter<File>,
    skipped: usize,
}

impl SourceReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SyncError::MissingSourceFile { path });
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(SyncError::EmptyOrHeaderlessSource { path });
        }

        debug!(path = %path.display(), columns = headers.len(), "Opened source CSV");

        Ok(Self {
            path,
            headers,
            records: reader.into_records(),
            skipped: 0,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Malformed records dropped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Positional cells of each data row, in header order.
    pub fn into_cells(mut self) -> impl Iterator<Item = Vec<String>> {
        std::iter::from_fn(move || self.next_record())
            .map(|record| record.iter().map(str::to_string).collect())
    }

    fn next_record(&mut self) -> Option<StringRecord> {
        loop {
            match self.records.next()? {
                Ok(record) => {
                    if record.iter().all(str::is_empty) {
                        continue;
                    }
                    return Some(record);
                }
                Err(e) if e.is_io_error() => {
                    warn!(path = %self.path.display(), "Stopped reading source: {}", e);
                    return None;
                }
                Err(e) => {
                    self.skipped += 1;
                    warn!(path = %self.path.display(), "Skipping malformed CSV record: {}", e);
                }
            }
        }
    }
}

impl Iterator for SourceReader {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        let record = self.next_record()?;
        Some(
            self.headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect(),
        )
    }
}
