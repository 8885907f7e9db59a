//! Metrics facade for the sync pipeline
//!
//! Call sites record through the small submodules below so metric names live
//! in one place. A Prometheus recorder is installed at startup; since runs are
//! short-lived batches, the exposition text can be dumped to a file at the end
//! of a run for a textfile collector to pick up.

use std::path::Path;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::{Result, SyncError};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder. Safe to call more than once.
pub fn init() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| SyncError::Config(format!("Failed to install Prometheus recorder: {e}")))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics recorder installed");
    Ok(())
}

/// Current exposition text, if a recorder is installed.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

/// Writes the exposition text to `path`, replacing it atomically.
pub fn write_textfile(path: &Path) -> Result<()> {
    let Some(text) = render() else {
        return Ok(());
    };
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, path)?;
    info!(path = %path.display(), "Wrote metrics textfile");
    Ok(())
}

pub mod sources {
    use crate::types::Platform;

    pub fn rows_loaded(platform: Platform, rows: usize) {
        ::metrics::counter!("card_sync_source_rows_total", "platform" => platform.to_string())
            .increment(rows as u64);
    }

    pub fn missing(platform: Platform) {
        ::metrics::counter!("card_sync_source_missing_total", "platform" => platform.to_string())
            .increment(1);
    }

    pub fn empty(platform: Platform) {
        ::metrics::counter!("card_sync_source_empty_total", "platform" => platform.to_string())
            .increment(1);
    }

    pub fn incomplete_schema(platform: Platform) {
        ::metrics::counter!("card_sync_source_incomplete_schema_total", "platform" => platform.to_string())
            .increment(1);
    }
}

pub mod publish {
    pub fn range_cleared(sheet: &str) {
        ::metrics::counter!("card_sync_ranges_cleared_total", "sheet" => sheet.to_string()).increment(1);
    }

    pub fn rows_written(sheet: &str, rows: usize) {
        ::metrics::counter!("card_sync_rows_written_total", "sheet" => sheet.to_string())
            .increment(rows as u64);
        ::metrics::histogram!("card_sync_rows_per_publish", "sheet" => sheet.to_string()).record(rows as f64);
    }

    pub fn retry(operation: &str) {
        ::metrics::counter!("card_sync_remote_retries_total", "operation" => operation.to_string()).increment(1);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!("card_sync_publish_duration_seconds").record(secs);
    }
}

pub mod alerts {
    pub fn sent() {
        ::metrics::counter!("card_sync_alerts_sent_total").increment(1);
    }

    pub fn failed() {
        ::metrics::counter!("card_sync_alerts_failed_total").increment(1);
    }

    pub fn coercion_failure() {
        ::metrics::counter!("card_sync_alert_stake_unparsable_total").increment(1);
    }
}
