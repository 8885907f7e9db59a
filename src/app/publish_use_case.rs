use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument};

use crate::app::ports::SheetStorePort;
use crate::app::sheet_target::SheetTarget;
use crate::error::{Result, SyncError};
use crate::observability::metrics;
use crate::pipeline::processing::dataset::{values_digest, CanonicalDataset};
use crate::pipeline::retry::RetryPolicy;

/// Outcome of one clear-then-write
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub range: String,
    pub rows_written: usize,
    pub digest: String,
}

/// Replaces a sheet range with a fresh table.
///
/// Each publish clears `Sheet!A2:<last>` and then writes the rows at `A2` as
/// literal values. Both calls retry transient failures. The pair is not
/// atomic: if the write gives up after the clear succeeded, the range stays
/// empty until the next run.
pub struct PublishClient {
    store: Arc<dyn SheetStorePort>,
    retry: RetryPolicy,
    pacing: Duration,
    called: AtomicBool,
}

impl PublishClient {
    pub fn new(store: Arc<dyn SheetStorePort>, retry: RetryPolicy, pacing: Duration) -> Self {
        Self {
            store,
            retry,
            pacing,
            called: AtomicBool::new(false),
        }
    }

    /// Spaces out consecutive remote calls made through this client.
    async fn pace(&self) {
        if self.called.swap(true, Ordering::SeqCst) && !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }

    #[instrument(skip(self, dataset), fields(rows = dataset.len()))]
    pub async fn publish_dataset(&self, dataset: &CanonicalDataset, target: &SheetTarget) -> Result<PublishReport> {
        self.publish_values(&dataset.to_values(), target).await
    }

    #[instrument(skip(self, values), fields(sheet = %target.sheet, rows = values.len()))]
    pub async fn publish_values(&self, values: &[Vec<String>], target: &SheetTarget) -> Result<PublishReport> {
        let clear_range = target.clear_range();
        let write_range = target.write_range();
        let store = &self.store;

        self.pace().await;
        self.retry
            .run(
                "sheets_clear",
                || store.clear(&clear_range),
                SyncError::is_transient,
            )
            .await?;
        metrics::publish::range_cleared(&target.sheet);
        info!(range = %clear_range, "Cleared range");

        let mut rows_written = 0;
        if !values.is_empty() {
            self.pace().await;
            rows_written = self
                .retry
                .run(
                    "sheets_update",
                    || store.update(&write_range, values),
                    SyncError::is_transient,
                )
                .await?;
            metrics::publish::rows_written(&target.sheet, rows_written);
        }

        let digest = values_digest(values);
        info!(range = %write_range, rows = rows_written, digest = %digest, "Published range");
        Ok(PublishReport {
            range: write_range,
            rows_written,
            digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::in_memory_sheet::{InMemorySheet, SheetOp};
    use tokio::time::Instant;

    fn client(sheet: Arc<InMemorySheet>) -> PublishClient {
        PublishClient::new(
            sheet,
            RetryPolicy { max_attempts: 3, base_delay_ms: 200 },
            Duration::ZERO,
        )
    }

    fn values(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect()
    }

    fn transient() -> SyncError {
        SyncError::TransientRemoteFailure {
            target: "Cards!A2".into(),
            status: Some(429),
            message: "quota".into(),
        }
    }

    #[tokio::test]
    async fn clears_then_writes_below_header() {
        let sheet = Arc::new(InMemorySheet::new().with_header("Cards", &["Sport", "site"]));
        sheet.update("Cards!A2", &values(&[&["old", "old"], &["old", "old"], &["old", "old"]])).await.unwrap();

        let report = client(sheet.clone())
            .publish_values(&values(&[&["NBA", "PP"]]), &SheetTarget::new("Cards", "B"))
            .await
            .unwrap();

        assert_eq!(report.rows_written, 1);
        assert_eq!(sheet.snapshot("Cards"), values(&[&["Sport", "site"], &["NBA", "PP"]]));
        assert_eq!(sheet.calls()[1..], ["clear Cards!A2:B", "update Cards!A2"]);
    }

    #[tokio::test]
    async fn empty_table_only_clears() {
        let sheet = Arc::new(InMemorySheet::new());
        let report = client(sheet.clone())
            .publish_values(&[], &SheetTarget::new("Legs", "P"))
            .await
            .unwrap();
        assert_eq!(report.rows_written, 0);
        assert_eq!(sheet.calls(), ["clear Legs!A2:P"]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_write_failure_is_retried_once() {
        let sheet = Arc::new(InMemorySheet::new());
        sheet.fail_next(SheetOp::Update, transient());
        let start = Instant::now();

        let report = client(sheet.clone())
            .publish_values(&values(&[&["a"]]), &SheetTarget::new("Cards", "AF"))
            .await
            .unwrap();

        assert_eq!(report.rows_written, 1);
        assert_eq!(
            sheet.calls(),
            ["clear Cards!A2:AF", "update Cards!A2", "update Cards!A2"]
        );
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(200) && waited < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn permanent_clear_failure_stops_before_write() {
        let sheet = Arc::new(InMemorySheet::new());
        sheet.fail_next(SheetOp::Clear, SyncError::PermanentRemoteFailure {
            target: "Cards!A2:AF".into(),
            status: Some(403),
            message: "forbidden".into(),
        });
        let err = client(sheet.clone())
            .publish_values(&values(&[&["a"]]), &SheetTarget::new("Cards", "AF"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::PermanentRemoteFailure { .. }));
        assert_eq!(sheet.calls(), ["clear Cards!A2:AF"]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_write_leaves_range_empty() {
        let sheet = Arc::new(InMemorySheet::new());
        sheet.update("Cards!A2", &values(&[&["stale"]])).await.unwrap();
        for _ in 0..3 {
            sheet.fail_next(SheetOp::Update, transient());
        }
        let err = client(sheet.clone())
            .publish_values(&values(&[&["fresh"]]), &SheetTarget::new("Cards", "AF"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(sheet.snapshot("Cards").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn successive_calls_are_paced() {
        let sheet = Arc::new(InMemorySheet::new());
        let client = PublishClient::new(sheet, RetryPolicy::default(), Duration::from_millis(1000));
        let start = Instant::now();
        client
            .publish_values(&values(&[&["a"]]), &SheetTarget::new("Cards", "AF"))
            .await
            .unwrap();
        // clear runs immediately, the write waits one pacing interval
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(1000) && waited < Duration::from_millis(1500));
    }
}
