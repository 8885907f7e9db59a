/// Default locations and remote ranges shared across the codebase.
/// Everything here can be overridden through `config.toml`.

// Upstream optimizer outputs
pub const PRIZEPICKS_CARDS_CSV: &str = "prizepicks-cards.csv";
pub const UNDERDOG_CARDS_CSV: &str = "underdog-cards.csv";
pub const PRIZEPICKS_LEGS_CSV: &str = "prizepicks-legs.csv";
pub const UNDERDOG_LEGS_CSV: &str = "underdog-legs.csv";

// Sheet tabs and the last column each data block occupies.
// Row 1 of every tab holds operator-owned headers and formulas.
pub const CARDS_SHEET: &str = "Cards";
pub const CARDS_LAST_COLUMN: &str = "AF";
pub const LEGS_SHEET: &str = "Legs";
pub const LEGS_LAST_COLUMN: &str = "P";
pub const UD_LEGS_SHEET: &str = "UD-Legs";
pub const UD_LEGS_LAST_COLUMN: &str = "Q";
pub const FIRST_DATA_ROW: u32 = 2;

/// Column the Underdog legs table is ranked by before publishing
pub const UD_LEGS_SORT_COLUMN: &str = "legEv";

// Columns every cards extract is expected to declare
pub const REQUIRED_CARD_FIELDS: [&str; 3] = ["flexType", "cardEv", "runTimestamp"];

// Kelly alerting: stake cutoffs as fractions of a 1000-unit reference bankroll
pub const REFERENCE_BANKROLL: f64 = 1000.0;
pub const KELLY_ALERT_THRESHOLD: f64 = 0.05 * REFERENCE_BANKROLL;
pub const KELLY_INDIVIDUAL_ALERT_THRESHOLD: f64 = 0.10 * REFERENCE_BANKROLL;
pub const SUMMARY_PREVIEW_LEN: usize = 3;
pub const ALERT_LEG_PREVIEW_LEN: usize = 3;

// Remote call pacing and retry
pub const RETRY_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 1000;
pub const WRITE_PACING_MS: u64 = 1000;
pub const ALERT_PACING_MS: u64 = 1000;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
