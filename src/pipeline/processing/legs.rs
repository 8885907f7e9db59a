use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::pipeline::ingestion::source_reader::SourceReader;

/// A legs extract and how to prepare it for publishing.
#[derive(Debug, Clone, Deserialize)]
pub struct LegSource {
    pub path: PathBuf,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Numeric column to rank rows by, largest first
    #[serde(default)]
    pub sort_desc_by: Option<String>,
}

fn default_required() -> bool {
    true
}

impl LegSource {
    /// `None` when an optional file is absent.
    pub fn load(&self) -> Result<Option<LegTable>> {
        let mut table = match LegTable::load(&self.path) {
            Ok(table) => table,
            Err(e @ SyncError::MissingSourceFile { .. }) if !self.required => {
                warn!("Optional legs source skipped: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if let Some(column) = &self.sort_desc_by {
            table.sort_desc_by(column);
        }
        Ok(Some(table))
    }
}

/// A legs extract republished as-is: data rows in file order, header dropped.
#[derive(Debug, Clone, Default)]
pub struct LegTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl LegTable {
    /// Missing files propagate; a headerless file is an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = match SourceReader::open(path) {
            Ok(reader) => reader,
            Err(e @ SyncError::EmptyOrHeaderlessSource { .. }) => {
                warn!("{}", e);
                return Ok(Self::default());
            }
            Err(e) => return Err(e),
        };
        let headers = reader.headers().to_vec();
        let rows: Vec<Vec<String>> = reader.into_cells().collect();
        info!(path = %path.display(), rows = rows.len(), "Loaded legs table");
        Ok(Self { headers, rows })
    }

    pub fn from_parts(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Orders rows by a numeric column, largest first. Blank or unparsable
    /// cells rank as 0 and ties keep file order. Unknown columns leave the
    /// table untouched.
    pub fn sort_desc_by(&mut self, column: &str) {
        let Some(idx) = self.headers.iter().position(|h| h == column) else {
            warn!(column, "Sort column not in legs header; keeping file order");
            return;
        };
        let key = |row: &Vec<String>| -> f64 {
            row.get(idx)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
        };
        self.rows
            .sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> LegTable {
        LegTable::from_parts(
            vec!["Sport".into(), "id".into(), "legEv".into()],
            rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect(),
        )
    }

    fn ids(t: &LegTable) -> Vec<&str> {
        t.rows().iter().map(|r| r[1].as_str()).collect()
    }

    #[test]
    fn sorts_by_leg_ev_descending_with_stable_ties() {
        let mut t = table(&[
            &["NBA", "a", "0.01"],
            &["NBA", "b", "0.05"],
            &["NBA", "c", "0.01"],
            &["NBA", "d", "0.03"],
        ]);
        t.sort_desc_by("legEv");
        assert_eq!(ids(&t), ["b", "d", "a", "c"]);
    }

    #[test]
    fn unparsable_values_rank_as_zero() {
        let mut t = table(&[&["NBA", "a", ""], &["NBA", "b", "-0.02"], &["NBA", "c", "n/a"], &["NBA", "d"]]);
        t.sort_desc_by("legEv");
        assert_eq!(ids(&t), ["a", "c", "d", "b"]);
    }

    #[test]
    fn optional_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let source = LegSource {
            path: dir.path().join("underdog-legs.csv"),
            required: false,
            sort_desc_by: Some("legEv".into()),
        };
        assert!(source.load().unwrap().is_none());

        let required = LegSource { required: true, ..source };
        assert!(matches!(required.load(), Err(SyncError::MissingSourceFile { .. })));
    }

    #[test]
    fn load_drops_header_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("underdog-legs.csv");
        std::fs::write(&path, "Sport,id,legEv\nNBA,a,0.01\nNBA,b,0.04\n").unwrap();
        let source = LegSource { path, required: true, sort_desc_by: Some("legEv".into()) };
        let table = source.load().unwrap().unwrap();
        assert_eq!(ids(&table), ["b", "a"]);
        assert_eq!(table.headers(), ["Sport", "id", "legEv"]);
    }

    #[test]
    fn unknown_sort_column_keeps_order() {
        let mut t = table(&[&["NBA", "a", "0.01"], &["NBA", "b", "0.05"]]);
        t.sort_desc_by("edge");
        assert_eq!(ids(&t), ["a", "b"]);
    }
}
