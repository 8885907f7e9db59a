use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::app::ports::NotificationPort;
use crate::constants::{
    ALERT_LEG_PREVIEW_LEN, KELLY_ALERT_THRESHOLD, KELLY_INDIVIDUAL_ALERT_THRESHOLD, SUMMARY_PREVIEW_LEN,
};
use crate::error::{Result, SyncError};
use crate::observability::metrics;
use crate::types::CanonicalRow;

/// Stake cutoffs, in bankroll currency units. Both comparisons are strict.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Cards above this make the summary
    pub summary: f64,
    /// Cards above this also get a message of their own
    pub individual: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            summary: KELLY_ALERT_THRESHOLD,
            individual: KELLY_INDIVIDUAL_ALERT_THRESHOLD,
        }
    }
}

/// Parses a numeric-as-text column.
pub fn coerce_number(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SyncError::NumericCoercionFailure { value: value.to_string() })
}

#[derive(Debug, Clone, Copy)]
pub struct RankedCard<'a> {
    pub row: &'a CanonicalRow,
    pub stake: f64,
}

pub struct ThresholdAlertFilter {
    thresholds: AlertThresholds,
}

impl ThresholdAlertFilter {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.thresholds
    }

    /// Rows with `kellyStake` strictly above the summary threshold, largest
    /// stake first; equal stakes keep dataset order. Rows whose stake is not
    /// a number are left out.
    pub fn select<'a>(&self, rows: &'a [CanonicalRow]) -> Vec<RankedCard<'a>> {
        let mut ranked: Vec<RankedCard<'a>> = rows
            .iter()
            .filter_map(|row| match coerce_number(&row.kelly.kelly_stake) {
                Ok(stake) => Some(RankedCard { row, stake }),
                Err(e) => {
                    debug!(site = %row.site, "Excluded from alerts: {}", e);
                    metrics::alerts::coercion_failure();
                    None
                }
            })
            .filter(|card| card.stake > self.thresholds.summary)
            .collect();
        ranked.sort_by(|a, b| b.stake.total_cmp(&a.stake));
        ranked
    }

    /// Subset of `ranked` that warrants an individual alert.
    pub fn individual<'a>(&self, ranked: &[RankedCard<'a>]) -> Vec<RankedCard<'a>> {
        ranked
            .iter()
            .copied()
            .filter(|card| card.stake > self.thresholds.individual)
            .collect()
    }
}

fn ev_percent(card_ev: &str) -> String {
    match coerce_number(card_ev) {
        Ok(ev) => format!("{:.1}%", ev * 100.0),
        Err(_) => "n/a".to_string(),
    }
}

fn sport_label(row: &CanonicalRow) -> &str {
    if row.sport.is_empty() {
        "Unknown"
    } else {
        &row.sport
    }
}

/// Aggregate message: count, threshold, and a short preview of the top cards.
pub fn summary_message(ranked: &[RankedCard<'_>], threshold: f64, at: &str) -> String {
    let mut text = format!(
        "KELLY ALERTS SUMMARY\n\nFound {} cards with Kelly > ${:.2}\n\nTop {} opportunities:\n",
        ranked.len(),
        threshold,
        SUMMARY_PREVIEW_LEN
    );
    for (i, card) in ranked.iter().take(SUMMARY_PREVIEW_LEN).enumerate() {
        text.push_str(&format!(
            "{}. {}: ${:.2} ({} EV)\n",
            i + 1,
            sport_label(card.row),
            card.stake,
            ev_percent(&card.row.card_ev)
        ));
    }
    text.push_str(&format!("\n{at}"));
    text
}

/// Message for a single high-stake card.
pub fn alert_message(card: &RankedCard<'_>, at: &str) -> String {
    let legs: Vec<&str> = card.row.legs().take(ALERT_LEG_PREVIEW_LEN).collect();
    let legs = if legs.is_empty() { "N/A".to_string() } else { legs.join("-") };
    format!(
        "HIGH KELLY ALERT\n\nSport: {}\nKelly: ${:.2}\nEV: {}\nSite: {}\nLegs: {}\n\n{}",
        sport_label(card.row),
        card.stake,
        ev_percent(&card.row.card_ev),
        card.row.site,
        legs,
        at
    )
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertReport {
    pub candidates: usize,
    pub individual: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Sends the summary and per-card alerts. Delivery is best-effort: failures
/// are logged and counted, never returned.
pub struct KellyAlerts {
    notifier: Arc<dyn NotificationPort>,
    filter: ThresholdAlertFilter,
    pacing: Duration,
}

impl KellyAlerts {
    pub fn new(notifier: Arc<dyn NotificationPort>, thresholds: AlertThresholds, pacing: Duration) -> Self {
        Self {
            notifier,
            filter: ThresholdAlertFilter::new(thresholds),
            pacing,
        }
    }

    async fn deliver(&self, text: &str, report: &mut AlertReport) {
        match self.notifier.send(text).await {
            Ok(()) => {
                report.sent += 1;
                metrics::alerts::sent();
            }
            Err(e) => {
                report.failed += 1;
                metrics::alerts::failed();
                warn!("Alert not delivered: {}", e);
            }
        }
    }

    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn run(&self, rows: &[CanonicalRow]) -> AlertReport {
        let at = chrono::Local::now().format("%I:%M %p").to_string();
        let thresholds = self.filter.thresholds();
        let ranked = self.filter.select(rows);
        let mut report = AlertReport {
            candidates: ranked.len(),
            ..AlertReport::default()
        };

        if ranked.is_empty() {
            info!(threshold = thresholds.summary, "No high Kelly opportunities");
            return report;
        }
        info!(count = ranked.len(), "High Kelly opportunities found");

        self.deliver(&summary_message(&ranked, thresholds.summary, &at), &mut report)
            .await;

        let individual = self.filter.individual(&ranked);
        report.individual = individual.len();
        for card in &individual {
            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            self.deliver(&alert_message(card, &at), &mut report).await;
        }
        report
    }

    /// Connectivity check message.
    pub async fn send_test(&self, sources: &[String]) -> Result<()> {
        let text = format!(
            "Kelly alert bot test\n\nBot is online.\nHigh Kelly threshold: ${:.2}\nMonitoring: {}\n{}",
            self.filter.thresholds().summary,
            sources.join(", "),
            chrono::Local::now().format("%I:%M %p")
        );
        self.notifier.send(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::outbox::Outbox;
    use crate::types::{KellyFields, PortfolioFields};

    fn card(sport: &str, stake: &str, legs: &[&str]) -> CanonicalRow {
        let mut leg_ids: [String; 6] = Default::default();
        for (slot, id) in leg_ids.iter_mut().zip(legs) {
            *slot = id.to_string();
        }
        CanonicalRow {
            site: "PP".into(),
            sport: sport.into(),
            flex_type: "3P".into(),
            card_ev: "0.125".into(),
            win_prob_cash: String::new(),
            win_prob_any: String::new(),
            avg_prob: String::new(),
            avg_edge_pct: String::new(),
            legs_count: legs.len(),
            leg_ids,
            kelly: KellyFields { kelly_stake: stake.into(), ..KellyFields::default() },
            portfolio: PortfolioFields::default(),
            run_timestamp: String::new(),
        }
    }

    fn filter() -> ThresholdAlertFilter {
        ThresholdAlertFilter::new(AlertThresholds::default())
    }

    #[test]
    fn default_thresholds_scale_with_reference_bankroll() {
        let t = AlertThresholds::default();
        assert_eq!(t.summary, 50.0);
        assert_eq!(t.individual, 100.0);
        assert_eq!(t.summary / crate::constants::REFERENCE_BANKROLL, 0.05);
    }

    #[test]
    fn unparsable_stakes_never_pass() {
        let rows = vec![card("NBA", "abc", &[]), card("NBA", "", &[]), card("NBA", "NaN", &[])];
        let permissive = ThresholdAlertFilter::new(AlertThresholds { summary: f64::MIN, individual: f64::MIN });
        assert!(permissive.select(&rows).is_empty());
        assert!(filter().select(&rows).is_empty());
    }

    #[test]
    fn threshold_is_strict() {
        let rows = vec![card("NBA", "50", &[]), card("NBA", "50.01", &[])];
        let ranked = filter().select(&rows);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].stake, 50.01);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let rows = vec![
            card("A", "60", &[]),
            card("B", "150", &[]),
            card("C", "60", &[]),
            card("D", " 75.5 ", &[]),
        ];
        let sports: Vec<&str> = filter().select(&rows).iter().map(|c| c.row.sport.as_str()).collect();
        assert_eq!(sports, ["B", "D", "A", "C"]);
    }

    #[test]
    fn only_very_high_stakes_get_individual_alerts() {
        let rows = vec![card("NBA", "150", &[]), card("NFL", "60", &[])];
        let f = filter();
        let ranked = f.select(&rows);
        assert_eq!(ranked.len(), 2);
        let individual = f.individual(&ranked);
        assert_eq!(individual.len(), 1);
        assert_eq!(individual[0].row.sport, "NBA");
    }

    #[test]
    fn alert_message_shows_first_three_legs() {
        let row = card("NBA", "150", &["p1", "p2", "p3", "p4"]);
        let text = alert_message(&RankedCard { row: &row, stake: 150.0 }, "07:30 PM");
        assert!(text.contains("Sport: NBA"));
        assert!(text.contains("Kelly: $150.00"));
        assert!(text.contains("EV: 12.5%"));
        assert!(text.contains("Site: PP"));
        assert!(text.contains("Legs: p1-p2-p3\n"));
    }

    #[test]
    fn summary_previews_top_three() {
        let rows: Vec<CanonicalRow> = ["90", "80", "70", "60"].iter().map(|s| card("NBA", s, &[])).collect();
        let ranked = filter().select(&rows);
        let text = summary_message(&ranked, 50.0, "07:30 PM");
        assert!(text.contains("Found 4 cards with Kelly > $50.00"));
        assert!(text.contains("3. NBA: $70.00"));
        assert!(!text.contains("4. NBA"));
    }

    #[tokio::test]
    async fn summary_and_individual_alerts_are_sent() {
        let outbox = Arc::new(Outbox::new());
        let alerts = KellyAlerts::new(outbox.clone(), AlertThresholds::default(), Duration::ZERO);
        let rows = vec![card("NBA", "150", &["x"]), card("NFL", "60", &[]), card("MLB", "10", &[])];

        let report = alerts.run(&rows).await;

        assert_eq!(report.candidates, 2);
        assert_eq!(report.individual, 1);
        assert_eq!(report.sent, 2);
        let messages = outbox.messages();
        assert!(messages[0].starts_with("KELLY ALERTS SUMMARY"));
        assert!(messages[1].contains("Sport: NBA"));
    }

    #[tokio::test]
    async fn delivery_failures_are_counted_not_raised() {
        let outbox = Arc::new(Outbox::failing());
        let alerts = KellyAlerts::new(outbox.clone(), AlertThresholds::default(), Duration::ZERO);
        let report = alerts.run(&[card("NBA", "150", &[])]).await;
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test]
    async fn nothing_is_sent_below_threshold() {
        let outbox = Arc::new(Outbox::new());
        let alerts = KellyAlerts::new(outbox.clone(), AlertThresholds::default(), Duration::ZERO);
        let report = alerts.run(&[card("NBA", "5", &[])]).await;
        assert_eq!(report.candidates, 0);
        assert!(outbox.messages().is_empty());
    }
}
