use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::constants::FIRST_DATA_ROW;
use crate::error::{Result, SyncError};

static COLUMN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{1,3}$").expect("static regex"));
static A1_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:'((?:[^']|'')+)'|([^!]+))!([A-Z]{1,3})(\d+)(?::([A-Z]{1,3})(\d+)?)?$")
        .expect("static regex")
});

/// Where a table lands: a sheet tab plus the last column its data spans.
/// Row 1 is never addressed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetTarget {
    pub sheet: String,
    pub last_column: String,
}

impl SheetTarget {
    pub fn new(sheet: impl Into<String>, last_column: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            last_column: last_column.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sheet.trim().is_empty() {
            return Err(SyncError::Config("sheet name must not be empty".into()));
        }
        if !COLUMN_RE.is_match(&self.last_column) {
            return Err(SyncError::Config(format!(
                "invalid last column {:?} for sheet {}",
                self.last_column, self.sheet
            )));
        }
        Ok(())
    }

    fn sheet_ref(&self) -> String {
        if self.sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            self.sheet.clone()
        } else {
            format!("'{}'", self.sheet.replace('\'', "''"))
        }
    }

    /// Every data cell: `Sheet!A2:<last>` with an open-ended row bound.
    pub fn clear_range(&self) -> String {
        format!("{}!A{}:{}", self.sheet_ref(), FIRST_DATA_ROW, self.last_column)
    }

    /// Anchor cell of the first data row.
    pub fn write_range(&self) -> String {
        format!("{}!A{}", self.sheet_ref(), FIRST_DATA_ROW)
    }
}

/// Zero-based index of a column label (`A` → 0, `AF` → 31).
pub fn column_index(label: &str) -> Option<usize> {
    if !COLUMN_RE.is_match(label) {
        return None;
    }
    Some(label.bytes().fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize) - 1)
}

/// Parsed A1 range. Rows are 1-based; `None` bounds are open-ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start_col: usize,
    pub start_row: usize,
    pub end_col: Option<usize>,
    pub end_row: Option<usize>,
}

impl A1Range {
    pub fn parse(range: &str) -> Result<Self> {
        let bad = || SyncError::Config(format!("unsupported A1 range: {range}"));
        let caps = A1_RE.captures(range).ok_or_else(bad)?;
        let sheet = match (caps.get(1), caps.get(2)) {
            (Some(quoted), _) => quoted.as_str().replace("''", "'"),
            (None, Some(plain)) => plain.as_str().to_string(),
            _ => return Err(bad()),
        };
        let start_col = column_index(&caps[3]).ok_or_else(bad)?;
        let start_row: usize = caps[4].parse().map_err(|_| bad())?;
        let end_col = caps.get(5).and_then(|m| column_index(m.as_str()));
        let end_row = match caps.get(6) {
            Some(m) => Some(m.as_str().parse().map_err(|_| bad())?),
            None => None,
        };
        if start_row == 0 {
            return Err(bad());
        }
        Ok(Self { sheet, start_col, start_row, end_col, end_row })
    }
}
