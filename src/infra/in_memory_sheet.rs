use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::app::ports::SheetStorePort;
use crate::app::sheet_target::A1Range;
use crate::error::{Result, SyncError};

/// Which remote call a scripted failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetOp {
    Clear,
    Update,
}

/// Sheet store held in memory, used for `--dry-run` and tests.
///
/// Failures can be queued per operation to exercise the retry path.
#[derive(Default)]
pub struct InMemorySheet {
    tabs: Mutex<HashMap<String, Vec<Vec<String>>>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<VecDeque<(SheetOp, SyncError)>>,
}

impl InMemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a tab's header row, which publishing must leave alone.
    pub fn with_header(self, sheet: &str, header: &[&str]) -> Self {
        {
            let mut tabs = self.tabs.lock().unwrap();
            let grid = tabs.entry(sheet.to_string()).or_default();
            if grid.is_empty() {
                grid.push(Vec::new());
            }
            grid[0] = header.iter().map(|c| c.to_string()).collect();
        }
        self
    }

    /// The next `op` call fails with `error` instead of touching the grid.
    pub fn fail_next(&self, op: SheetOp, error: SyncError) {
        self.failures.lock().unwrap().push_back((op, error));
    }

    /// Calls seen so far, e.g. `clear Cards!A2:AF`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Cell contents of a tab with trailing blanks trimmed.
    pub fn snapshot(&self, sheet: &str) -> Vec<Vec<String>> {
        let tabs = self.tabs.lock().unwrap();
        let mut grid: Vec<Vec<String>> = tabs
            .get(sheet)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|mut row| {
                while row.last().is_some_and(|c| c.is_empty()) {
                    row.pop();
                }
                row
            })
            .collect();
        while grid.last().is_some_and(|r| r.is_empty()) {
            grid.pop();
        }
        grid
    }

    fn take_failure(&self, op: SheetOp) -> Option<SyncError> {
        let mut failures = self.failures.lock().unwrap();
        let pos = failures.iter().position(|(o, _)| *o == op)?;
        failures.remove(pos).map(|(_, e)| e)
    }

    fn record(&self, op: &str, range: &str) {
        self.calls.lock().unwrap().push(format!("{op} {range}"));
    }
}

#[async_trait]
impl SheetStorePort for InMemorySheet {
    async fn clear(&self, range: &str) -> Result<()> {
        self.record("clear", range);
        if let Some(e) = self.take_failure(SheetOp::Clear) {
            return Err(e);
        }
        let r = A1Range::parse(range)?;
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs.entry(r.sheet.clone()).or_default();
        let first = r.start_row - 1;
        let last = r.end_row.unwrap_or(grid.len()).min(grid.len());
        for row in grid.iter_mut().take(last).skip(first) {
            let end = r.end_col.map(|c| c + 1).unwrap_or(row.len()).min(row.len());
            for cell in row.iter_mut().take(end).skip(r.start_col) {
                cell.clear();
            }
        }
        debug!(range, "Cleared in-memory range");
        Ok(())
    }

    async fn update(&self, range: &str, values: &[Vec<String>]) -> Result<usize> {
        self.record("update", range);
        if let Some(e) = self.take_failure(SheetOp::Update) {
            return Err(e);
        }
        let r = A1Range::parse(range)?;
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs.entry(r.sheet.clone()).or_default();
        for (i, values_row) in values.iter().enumerate() {
            let row_idx = r.start_row - 1 + i;
            if grid.len() <= row_idx {
                grid.resize_with(row_idx + 1, Vec::new);
            }
            let row = &mut grid[row_idx];
            let needed = r.start_col + values_row.len();
            if row.len() < needed {
                row.resize(needed, String::new());
            }
            for (j, value) in values_row.iter().enumerate() {
                row[r.start_col + j] = value.clone();
            }
        }
        debug!(range, rows = values.len(), "Wrote in-memory range");
        Ok(values.len())
    }
}
