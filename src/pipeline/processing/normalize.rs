use crate::pipeline::ingestion::schema::SourceSchema;
use crate::pipeline::processing::derive::apply_derived_fields;
use crate::types::{CanonicalRow, KellyFields, Platform, PortfolioFields, RawRow, LEG_SLOTS};

/// Maps one platform's raw card rows onto `CanonicalRow`.
///
/// Normalization is permissive: a present, non-empty value is copied as-is and
/// anything else falls back to the column's default. It never fails.
pub struct RowNormalizer {
    schema: SourceSchema,
}

impl RowNormalizer {
    pub fn new(schema: SourceSchema) -> Self {
        Self { schema }
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self::new(SourceSchema::for_platform(platform))
    }

    pub fn schema(&self) -> &SourceSchema {
        &self.schema
    }

    pub fn platform(&self) -> Platform {
        self.schema.platform
    }

    fn text(&self, raw: &RawRow, field: &str, default: &str) -> String {
        self.schema.lookup(raw, field).unwrap_or(default).to_string()
    }

    pub fn normalize(&self, raw: &RawRow) -> CanonicalRow {
        let leg_ids: [String; LEG_SLOTS] =
            std::array::from_fn(|i| self.text(raw, &format!("leg{}Id", i + 1), ""));

        let kelly_defaults = KellyFields::default();
        let kelly_field = |field: &str, default: &str| self.text(raw, field, default);
        let kelly = KellyFields {
            kelly_mean_return: kelly_field("kellyMeanReturn", &kelly_defaults.kelly_mean_return),
            kelly_variance: kelly_field("kellyVariance", &kelly_defaults.kelly_variance),
            kelly_raw_fraction: kelly_field("kellyRawFraction", &kelly_defaults.kelly_raw_fraction),
            kelly_capped_fraction: kelly_field(
                "kellyCappedFraction",
                &kelly_defaults.kelly_capped_fraction,
            ),
            kelly_final_fraction: kelly_field(
                "kellyFinalFraction",
                &kelly_defaults.kelly_final_fraction,
            ),
            kelly_stake: kelly_field("kellyStake", &kelly_defaults.kelly_stake),
            kelly_expected_profit: kelly_field(
                "kellyExpectedProfit",
                &kelly_defaults.kelly_expected_profit,
            ),
            kelly_max_win: kelly_field("kellyMaxWin", &kelly_defaults.kelly_max_win),
            kelly_risk_adjustment: kelly_field(
                "kellyRiskAdjustment",
                &kelly_defaults.kelly_risk_adjustment,
            ),
            kelly_is_capped: kelly_field("kellyIsCapped", &kelly_defaults.kelly_is_capped),
            kelly_cap_reasons: kelly_field("kellyCapReasons", &kelly_defaults.kelly_cap_reasons),
        };

        let portfolio_defaults = PortfolioFields::default();
        let portfolio = PortfolioFields {
            selected: self.text(raw, "selected", &portfolio_defaults.selected),
            portfolio_rank: self.text(raw, "portfolioRank", &portfolio_defaults.portfolio_rank),
            efficiency_score: self.text(raw, "efficiencyScore", &portfolio_defaults.efficiency_score),
        };

        let mut row = CanonicalRow {
            site: self.text(raw, "site", self.platform().site_label()),
            sport: self.text(raw, "sport", ""),
            flex_type: self.text(raw, "flexType", ""),
            card_ev: self.text(raw, "cardEv", ""),
            win_prob_cash: self.text(raw, "winProbCash", ""),
            win_prob_any: self.text(raw, "winProbAny", ""),
            avg_prob: self.text(raw, "avgProb", ""),
            avg_edge_pct: self.text(raw, "avgEdgePct", ""),
            leg_ids,
            legs_count: 0,
            kelly,
            portfolio,
            run_timestamp: self.text(raw, "runTimestamp", ""),
        };
        apply_derived_fields(&mut row);
        row
    }
}
