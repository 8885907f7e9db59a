use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::app::alert_use_case::{AlertReport, KellyAlerts};
use crate::app::ports::{NotificationPort, SheetStorePort};
use crate::app::publish_use_case::{PublishClient, PublishReport};
use crate::app::sheet_target::SheetTarget;
use crate::config::Config;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::dataset::{CanonicalDataset, CardSource, SourceStatus};
use crate::pipeline::processing::legs::{LegSource, LegTable};
use crate::types::CanonicalRow;

/// Which tables a publish touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishScope {
    Cards,
    Legs,
    All,
}

impl PublishScope {
    fn cards(self) -> bool {
        matches!(self, Self::Cards | Self::All)
    }

    fn legs(self) -> bool {
        matches!(self, Self::Legs | Self::All)
    }
}

/// Everything read from disk for one publish. Built before any remote call so
/// a missing required file fails the run without touching the sheet.
#[derive(Debug, Default)]
pub struct PreparedPublish {
    pub cards: Option<CanonicalDataset>,
    pub prizepicks_legs: Option<LegTable>,
    pub underdog_legs: Option<LegTable>,
}

#[derive(Debug, Default, Serialize)]
pub struct PublishOutcome {
    pub cards: Option<PublishReport>,
    pub legs: Vec<PublishReport>,
    pub skipped: Vec<String>,
}

#[instrument(skip(config))]
pub fn prepare_publish(config: &Config, scope: PublishScope) -> Result<PreparedPublish> {
    let mut prepared = PreparedPublish::default();
    if scope.cards() {
        prepared.cards = Some(CanonicalDataset::load(&config.sources.cards)?);
    }
    if scope.legs() {
        prepared.prizepicks_legs = config.sources.prizepicks_legs.load()?;
        prepared.underdog_legs = config.sources.underdog_legs.load()?;
    }
    Ok(prepared)
}

pub fn print_load_summary(prepared: &PreparedPublish, config: &Config) {
    if let Some(dataset) = &prepared.cards {
        println!("\n📊 Card sources:");
        for source in dataset.sources() {
            let status = match source.status {
                SourceStatus::Loaded => "loaded",
                SourceStatus::Missing => "missing (optional)",
                SourceStatus::Empty => "empty",
            };
            println!(
                "   {} [{}]: {} rows, {} skipped records, {}",
                source.platform,
                source.path.display(),
                source.rows,
                source.skipped_records,
                status
            );
            for warning in &source.warnings {
                println!("     ⚠️  {}", warning);
            }
        }
        println!("   Rows to publish: {}", dataset.len());
    }
    let legs = [
        (&config.sources.prizepicks_legs, &prepared.prizepicks_legs),
        (&config.sources.underdog_legs, &prepared.underdog_legs),
    ];
    for (source, table) in legs {
        match table {
            Some(table) => println!("   Legs [{}]: {} rows", source.path.display(), table.len()),
            None if !source.required => println!("   Legs [{}]: missing (optional)", source.path.display()),
            None => {}
        }
    }
}

fn publish_client(config: &Config, store: Arc<dyn SheetStorePort>) -> PublishClient {
    PublishClient::new(
        store,
        config.retry.clone(),
        Duration::from_millis(config.sheets.write_pacing_ms),
    )
}

async fn publish_legs(
    client: &PublishClient,
    table: Option<&LegTable>,
    target: &SheetTarget,
    outcome: &mut PublishOutcome,
) -> Result<()> {
    match table {
        Some(table) if !table.is_empty() => {
            outcome.legs.push(client.publish_values(table.rows(), target).await?);
        }
        _ => {
            warn!(sheet = %target.sheet, "No legs rows; leaving range untouched");
            outcome.skipped.push(target.sheet.clone());
        }
    }
    Ok(())
}

/// Publishes already-loaded tables. Empty tables are skipped without
/// clearing, so a run that found nothing does not wipe the previous rows.
pub async fn publish_prepared(
    config: &Config,
    store: Arc<dyn SheetStorePort>,
    prepared: &PreparedPublish,
) -> Result<PublishOutcome> {
    let started = Instant::now();
    let client = publish_client(config, store);
    let mut outcome = PublishOutcome::default();

    if let Some(dataset) = &prepared.cards {
        if dataset.is_empty() {
            warn!("All card sources yielded zero rows; skipping cards publish");
            outcome.skipped.push(config.sheets.cards.sheet.clone());
        } else {
            outcome.cards = Some(client.publish_dataset(dataset, &config.sheets.cards).await?);
        }
    }
    if prepared.prizepicks_legs.is_some() || prepared.underdog_legs.is_some() {
        publish_legs(&client, prepared.prizepicks_legs.as_ref(), &config.sheets.legs, &mut outcome).await?;
        publish_legs(
            &client,
            prepared.underdog_legs.as_ref(),
            &config.sheets.underdog_legs,
            &mut outcome,
        )
        .await?;
    }

    metrics::publish::duration(started.elapsed().as_secs_f64());
    Ok(outcome)
}

#[instrument(skip(config, store))]
pub async fn publish(config: &Config, store: Arc<dyn SheetStorePort>, scope: PublishScope) -> Result<PublishOutcome> {
    let prepared = prepare_publish(config, scope)?;
    print_load_summary(&prepared, config);
    let outcome = publish_prepared(config, store, &prepared).await?;
    print_publish_outcome(&outcome);
    Ok(outcome)
}

pub fn print_publish_outcome(outcome: &PublishOutcome) {
    if let Some(report) = &outcome.cards {
        println!("✅ Cards: {} rows written to {}", report.rows_written, report.range);
    }
    for report in &outcome.legs {
        println!("✅ Legs: {} rows written to {}", report.rows_written, report.range);
    }
    for sheet in &outcome.skipped {
        println!("⏭️  {}: nothing to publish", sheet);
    }
}

/// Alerts read every configured cards source as optional.
fn alert_sources(config: &Config) -> Vec<CardSource> {
    config
        .sources
        .cards
        .iter()
        .cloned()
        .map(|source| CardSource { required: false, ..source })
        .collect()
}

fn kelly_alerts(config: &Config, notifier: Arc<dyn NotificationPort>) -> KellyAlerts {
    KellyAlerts::new(
        notifier,
        config.alerts,
        Duration::from_millis(config.telegram.message_pacing_ms),
    )
}

/// Evaluates already-loaded rows and sends what clears the thresholds.
pub async fn send_alerts(
    config: &Config,
    notifier: Arc<dyn NotificationPort>,
    rows: &[CanonicalRow],
) -> AlertReport {
    let report = kelly_alerts(config, notifier).run(rows).await;
    println!(
        "🔔 Alerts: {} cards above ${:.0}, {} individual, {} sent, {} failed",
        report.candidates, config.alerts.summary, report.individual, report.sent, report.failed
    );
    report
}

#[instrument(skip_all)]
pub async fn alerts(config: &Config, notifier: Arc<dyn NotificationPort>) -> Result<AlertReport> {
    let dataset = CanonicalDataset::load(&alert_sources(config))?;
    Ok(send_alerts(config, notifier, dataset.rows()).await)
}

pub async fn test_alert(config: &Config, notifier: Arc<dyn NotificationPort>) -> Result<()> {
    let watched: Vec<String> = config
        .sources
        .cards
        .iter()
        .map(|source| source.path.display().to_string())
        .collect();
    kelly_alerts(config, notifier).send_test(&watched).await?;
    println!("✅ Test message sent");
    Ok(())
}

/// Publish then alert from the same loaded dataset. Source errors abort
/// before anything remote happens; remote publish failures still let alerts
/// go out, and the publish result decides the exit status.
pub async fn run(
    config: &Config,
    store: Arc<dyn SheetStorePort>,
    notifier: Option<Arc<dyn NotificationPort>>,
) -> Result<PublishOutcome> {
    let prepared = prepare_publish(config, PublishScope::All)?;
    print_load_summary(&prepared, config);

    let published = publish_prepared(config, store, &prepared).await;
    if matches!(&published, Err(e) if !e.is_remote()) {
        return published;
    }
    match &published {
        Ok(outcome) => print_publish_outcome(outcome),
        Err(e) => warn!("Publish failed: {}; running alerts anyway", e),
    }

    match notifier {
        Some(notifier) => {
            let rows = prepared.cards.as_ref().map(|d| d.rows()).unwrap_or_default();
            send_alerts(config, notifier, rows).await;
        }
        None => info!("Telegram not configured; skipping alerts"),
    }
    published
}

/// Paths the run reads, for error messages and logging.
pub fn source_paths(config: &Config) -> Vec<String> {
    let legs: [&LegSource; 2] = [&config.sources.prizepicks_legs, &config.sources.underdog_legs];
    config
        .sources
        .cards
        .iter()
        .map(|s| s.path.display().to_string())
        .chain(legs.iter().map(|s| s.path.display().to_string()))
        .collect()
}
