use crate::constants::REQUIRED_CARD_FIELDS;
use crate::error::SyncError;
use crate::types::{Platform, RawRow};

/// Card columns a source may carry, by canonical name. `legsCount` is
/// derived and never read from a source.
pub const SOURCE_CARD_FIELDS: [&str; 29] = [
    "site",
    "sport",
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
    "runTimestamp",
];

/// Column layout of one platform's cards extract.
///
/// Fields are looked up by name, so extra or reordered columns upstream are
/// harmless. Aliases cover platforms that spell a canonical column differently.
#[derive(Debug, Clone)]
pub struct SourceSchema {
    pub platform: Platform,
    pub expected: Vec<&'static str>,
    pub required: Vec<&'static str>,
    aliases: Vec<(&'static str, &'static str)>,
}

impl SourceSchema {
    pub fn for_platform(platform: Platform) -> Self {
        let aliases = match platform {
            // The PrizePicks optimizer capitalizes the sport column
            Platform::PrizePicks => vec![("Sport", "sport")],
            // Underdog calls the card structure its "format"
            Platform::Underdog => vec![("Sport", "sport"), ("format", "flexType")],
        };
        Self {
            platform,
            expected: SOURCE_CARD_FIELDS.to_vec(),
            required: REQUIRED_CARD_FIELDS.to_vec(),
            aliases,
        }
    }

    /// Header names that may carry `field`, canonical spelling first.
    fn candidates<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        std::iter::once(field).chain(
            self.aliases
                .iter()
                .filter(move |(_, canonical)| *canonical == field)
                .map(|(alias, _)| *alias),
        )
    }

    fn declares(&self, headers: &[String], field: &str) -> bool {
        self.candidates(field).any(|name| headers.iter().any(|h| h == name))
    }

    /// First non-empty value for `field` in `row`.
    pub fn lookup<'r>(&self, row: &'r RawRow, field: &str) -> Option<&'r str> {
        self.candidates(field)
            .filter_map(|name| row.get(name))
            .map(String::as_str)
            .find(|v| !v.is_empty())
    }

    /// Required columns absent from `headers`.
    pub fn missing_required(&self, headers: &[String]) -> Vec<String> {
        self.required
            .iter()
            .filter(|field| !self.declares(headers, field))
            .map(|field| field.to_string())
            .collect()
    }

    /// Optional columns absent from `headers`; these fall back to defaults.
    pub fn missing_optional(&self, headers: &[String]) -> Vec<&'static str> {
        self.expected
            .iter()
            .copied()
            .filter(|field| !self.required.contains(field) && !self.declares(headers, field))
            .collect()
    }

    /// Validates the header once, before any row is normalized.
    pub fn check_headers(&self, headers: &[String]) -> Result<(), SyncError> {
        let missing = self.missing_required(headers);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::IncompleteSourceSchema {
                platform: self.platform.to_string(),
                missing,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn underdog_format_column_satisfies_flex_type() {
        let schema = SourceSchema::for_platform(Platform::Underdog);
        let h = headers(&["format", "cardEv", "winProbCash", "runTimestamp"]);
        assert!(schema.check_headers(&h).is_ok());
    }

    #[test]
    fn prizepicks_requires_flex_type_by_name() {
        let schema = SourceSchema::for_platform(Platform::PrizePicks);
        let h = headers(&["format", "cardEv"]);
        match schema.check_headers(&h) {
            Err(SyncError::IncompleteSourceSchema { platform, missing }) => {
                assert_eq!(platform, "PrizePicks");
                assert_eq!(missing, vec!["flexType", "runTimestamp"]);
            }
            other => panic!("expected incomplete schema, got {:?}", other),
        }
    }

    #[test]
    fn lookup_skips_empty_canonical_value_for_alias() {
        let schema = SourceSchema::for_platform(Platform::PrizePicks);
        let mut row = RawRow::new();
        row.insert("sport".into(), String::new());
        row.insert("Sport".into(), "NBA".into());
        assert_eq!(schema.lookup(&row, "sport"), Some("NBA"));
        assert_eq!(schema.lookup(&row, "cardEv"), None);
    }

    #[test]
    fn optional_gaps_exclude_required_fields() {
        let schema = SourceSchema::for_platform(Platform::PrizePicks);
        let h = headers(&["Sport", "site", "flexType", "cardEv", "runTimestamp"]);
        let missing = schema.missing_optional(&h);
        assert!(missing.contains(&"kellyStake"));
        assert!(!missing.contains(&"sport"));
        assert!(!missing.contains(&"cardEv"));
    }
}
