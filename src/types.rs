use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One CSV record keyed by header name.
pub type RawRow = HashMap<String, String>;

/// Number of leg identifier slots on a card.
pub const LEG_SLOTS: usize = 6;

/// Upstream platform a card extract comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    PrizePicks,
    Underdog,
}

impl Platform {
    /// Value written to `site` when a row does not name its own platform
    pub fn site_label(&self) -> &'static str {
        match self {
            Platform::PrizePicks => "PP",
            Platform::Underdog => "UD",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "prizepicks" | "prize_picks" | "pp" => Some(Platform::PrizePicks),
            "underdog" | "ud" => Some(Platform::Underdog),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::PrizePicks => write!(f, "PrizePicks"),
            Platform::Underdog => write!(f, "Underdog"),
        }
    }
}

/// Kelly sizing columns produced upstream; numeric values stay as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KellyFields {
    pub kelly_mean_return: String,
    pub kelly_variance: String,
    pub kelly_raw_fraction: String,
    pub kelly_capped_fraction: String,
    pub kelly_final_fraction: String,
    pub kelly_stake: String,
    pub kelly_expected_profit: String,
    pub kelly_max_win: String,
    pub kelly_risk_adjustment: String,
    pub kelly_is_capped: String,
    pub kelly_cap_reasons: String,
}

impl Default for KellyFields {
    fn default() -> Self {
        let zero = || "0".to_string();
        Self {
            kelly_mean_return: zero(),
            kelly_variance: zero(),
            kelly_raw_fraction: zero(),
            kelly_capped_fraction: zero(),
            kelly_final_fraction: zero(),
            kelly_stake: zero(),
            kelly_expected_profit: zero(),
            kelly_max_win: zero(),
            kelly_risk_adjustment: zero(),
            kelly_is_capped: "False".to_string(),
            kelly_cap_reasons: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioFields {
    pub selected: String,
    pub portfolio_rank: String,
    pub efficiency_score: String,
}

impl Default for PortfolioFields {
    fn default() -> Self {
        Self {
            selected: "False".to_string(),
            portfolio_rank: String::new(),
            efficiency_score: "0".to_string(),
        }
    }
}

/// A card unified across platforms. Every column is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRow {
    pub site: String,
    pub sport: String,
    pub flex_type: String,
    pub card_ev: String,
    pub win_prob_cash: String,
    pub win_prob_any: String,
    pub avg_prob: String,
    pub avg_edge_pct: String,
    pub leg_ids: [String; LEG_SLOTS],
    /// Number of non-empty `leg_ids`; set by the derivation step.
    pub legs_count: usize,
    #[serde(flatten)]
    pub kelly: KellyFields,
    #[serde(flatten)]
    pub portfolio: PortfolioFields,
    pub run_timestamp: String,
}

/// Sheet column headers, in the order `CanonicalRow::to_cells` emits them.
pub const CANONICAL_COLUMNS: [&str; 30] = [
    "Sport",
    "site",
    "flexType",
    "cardEv",
    "winProbCash",
    "winProbAny",
    "avgProb",
    "avgEdgePct",
    "leg1Id",
    "leg2Id",
    "leg3Id",
    "leg4Id",
    "leg5Id",
    "leg6Id",
    "runTimestamp",
    "legsCount",
    "kellyMeanReturn",
    "kellyVariance",
    "kellyRawFraction",
    "kellyCappedFraction",
    "kellyFinalFraction",
    "kellyStake",
    "kellyExpectedProfit",
    "kellyMaxWin",
    "kellyRiskAdjustment",
    "kellyIsCapped",
    "kellyCapReasons",
    "selected",
    "portfolioRank",
    "efficiencyScore",
];

impl CanonicalRow {
    /// Non-empty leg identifiers in slot order.
    pub fn legs(&self) -> impl Iterator<Item = &str> {
        self.leg_ids.iter().map(String::as_str).filter(|id| !id.is_empty())
    }

    /// Flattens the row into sheet cells, matching `CANONICAL_COLUMNS`.
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(CANONICAL_COLUMNS.len());
        cells.extend([
            self.sport.clone(),
            self.site.clone(),
            self.flex_type.clone(),
            self.card_ev.clone(),
            self.win_prob_cash.clone(),
            self.win_prob_any.clone(),
            self.avg_prob.clone(),
            self.avg_edge_pct.clone(),
        ]);
        cells.extend(self.leg_ids.iter().cloned());
        cells.push(self.run_timestamp.clone());
        cells.push(self.legs_count.to_string());

        let k = &self.kelly;
        cells.extend([
            k.kelly_mean_return.clone(),
            k.kelly_variance.clone(),
            k.kelly_raw_fraction.clone(),
            k.kelly_capped_fraction.clone(),
            k.kelly_final_fraction.clone(),
            k.kelly_stake.clone(),
            k.kelly_expected_profit.clone(),
            k.kelly_max_win.clone(),
            k.kelly_risk_adjustment.clone(),
            k.kelly_is_capped.clone(),
            k.kelly_cap_reasons.clone(),
        ]);

        let p = &self.portfolio;
        cells.extend([
            p.selected.clone(),
            p.portfolio_rank.clone(),
            p.efficiency_score.clone(),
        ]);
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_row() -> CanonicalRow {
        CanonicalRow {
            site: "PP".into(),
            sport: String::new(),
            flex_type: "3P".into(),
            card_ev: String::new(),
            win_prob_cash: String::new(),
            win_prob_any: String::new(),
            avg_prob: String::new(),
            avg_edge_pct: String::new(),
            leg_ids: Default::default(),
            legs_count: 0,
            kelly: KellyFields::default(),
            portfolio: PortfolioFields::default(),
            run_timestamp: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn cells_line_up_with_column_headers() {
        let mut row = blank_row();
        row.leg_ids[1] = "B".into();
        row.legs_count = 1;
        row.kelly.kelly_stake = "75".into();

        let cells = row.to_cells();
        assert_eq!(cells.len(), CANONICAL_COLUMNS.len());

        let at = |name: &str| {
            let idx = CANONICAL_COLUMNS.iter().position(|c| *c == name).unwrap();
            cells[idx].clone()
        };
        assert_eq!(at("site"), "PP");
        assert_eq!(at("leg1Id"), "");
        assert_eq!(at("leg2Id"), "B");
        assert_eq!(at("legsCount"), "1");
        assert_eq!(at("kellyStake"), "75");
        assert_eq!(at("kellyIsCapped"), "False");
        assert_eq!(at("selected"), "False");
        assert_eq!(at("efficiencyScore"), "0");
        assert_eq!(at("runTimestamp"), "2025-01-01T00:00:00Z");
    }

    #[test]
    fn platform_names_parse_loosely() {
        assert_eq!(Platform::from_name("PrizePicks"), Some(Platform::PrizePicks));
        assert_eq!(Platform::from_name(" ud "), Some(Platform::Underdog));
        assert_eq!(Platform::from_name("draftkings"), None);
    }
}
