use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::observability::metrics;
use crate::pipeline::ingestion::source_reader::SourceReader;
use crate::pipeline::processing::normalize::RowNormalizer;
use crate::types::{CanonicalRow, Platform};

/// A cards extract to load, in the order it should appear in the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSource {
    pub platform: Platform,
    pub path: PathBuf,
    /// A required source that is missing aborts the run; an optional one is skipped.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceStatus {
    Loaded,
    Missing,
    Empty,
}

/// Per-source outcome printed before anything is sent remotely.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub platform: Platform,
    pub path: PathBuf,
    pub status: SourceStatus,
    pub rows: usize,
    pub skipped_records: usize,
    pub warnings: Vec<String>,
}

/// All canonical rows for one run, grouped by source in load order.
#[derive(Debug, Clone, Default)]
pub struct CanonicalDataset {
    rows: Vec<CanonicalRow>,
    sources: Vec<SourceSummary>,
}

impl CanonicalDataset {
    /// Reads, normalizes and concatenates every source.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub fn load(sources: &[CardSource]) -> Result<Self> {
        let mut dataset = Self::default();
        for source in sources {
            let summary = dataset.load_source(source)?;
            dataset.sources.push(summary);
        }
        info!(rows = dataset.rows.len(), "Canonical dataset built");
        Ok(dataset)
    }

    fn load_source(&mut self, source: &CardSource) -> Result<SourceSummary> {
        let mut summary = SourceSummary {
            platform: source.platform,
            path: source.path.clone(),
            status: SourceStatus::Loaded,
            rows: 0,
            skipped_records: 0,
            warnings: Vec::new(),
        };

        let reader = match SourceReader::open(&source.path) {
            Ok(reader) => reader,
            Err(e @ SyncError::MissingSourceFile { .. }) => {
                if source.required {
                    return Err(e);
                }
                warn!(platform = %source.platform, "Optional source skipped: {}", e);
                metrics::sources::missing(source.platform);
                summary.status = SourceStatus::Missing;
                summary.warnings.push(e.to_string());
                return Ok(summary);
            }
            Err(e @ SyncError::EmptyOrHeaderlessSource { .. }) => {
                warn!(platform = %source.platform, "Treating source as empty: {}", e);
                metrics::sources::empty(source.platform);
                summary.status = SourceStatus::Empty;
                summary.warnings.push(e.to_string());
                return Ok(summary);
            }
            Err(e) => return Err(e),
        };

        let normalizer = RowNormalizer::for_platform(source.platform);
        if let Err(e) = normalizer.schema().check_headers(reader.headers()) {
            warn!(platform = %source.platform, path = %source.path.display(), "{}", e);
            metrics::sources::incomplete_schema(source.platform);
            summary.warnings.push(e.to_string());
        }
        let defaulted = normalizer.schema().missing_optional(reader.headers());
        if !defaulted.is_empty() {
            debug!(platform = %source.platform, columns = ?defaulted, "Columns absent; using defaults");
        }

        let mut reader = reader;
        let before = self.rows.len();
        self.rows.extend(reader.by_ref().map(|raw| normalizer.normalize(&raw)));
        summary.rows = self.rows.len() - before;
        summary.skipped_records = reader.skipped();
        if summary.rows == 0 {
            summary.status = SourceStatus::Empty;
        }

        metrics::sources::rows_loaded(source.platform, summary.rows);
        info!(platform = %source.platform, rows = summary.rows, "Loaded source");
        Ok(summary)
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn sources(&self) -> &[SourceSummary] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell matrix in publish order.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(CanonicalRow::to_cells).collect()
    }

    /// SHA-256 over the published cells. Equal digests mean equal sheet contents.
    pub fn digest(&self) -> String {
        values_digest(&self.to_values())
    }
}

pub fn values_digest(values: &[Vec<String>]) -> String {
    let mut hasher = Sha256::new();
    for row in values {
        for cell in row {
            hasher.update(cell.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}
