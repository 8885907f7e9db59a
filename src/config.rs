use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::app::alert_use_case::AlertThresholds;
use crate::app::sheet_target::SheetTarget;
use crate::constants;
use crate::error::{Result, SyncError};
use crate::pipeline::processing::dataset::CardSource;
use crate::pipeline::processing::legs::LegSource;
use crate::pipeline::retry::RetryPolicy;
use crate::types::Platform;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub sheets: SheetsConfig,
    pub telegram: TelegramConfig,
    pub alerts: AlertThresholds,
    pub retry: RetryPolicy,
    pub log_dir: String,
    /// Prometheus exposition text is written here at the end of a run
    pub metrics_textfile: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Cards extracts, published in this order
    pub cards: Vec<CardSource>,
    pub prizepicks_legs: LegSource,
    pub underdog_legs: LegSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    /// OAuth bearer token; usually supplied via `SHEETS_ACCESS_TOKEN`
    pub access_token: Option<String>,
    pub api_base: String,
    pub timeout_seconds: u64,
    pub write_pacing_ms: u64,
    pub cards: SheetTarget,
    pub legs: SheetTarget,
    pub underdog_legs: SheetTarget,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub timeout_seconds: u64,
    pub message_pacing_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            sheets: SheetsConfig::default(),
            telegram: TelegramConfig::default(),
            alerts: AlertThresholds::default(),
            retry: RetryPolicy::default(),
            log_dir: "logs".to_string(),
            metrics_textfile: None,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            cards: vec![
                CardSource {
                    platform: Platform::PrizePicks,
                    path: PathBuf::from(constants::PRIZEPICKS_CARDS_CSV),
                    required: true,
                },
                CardSource {
                    platform: Platform::Underdog,
                    path: PathBuf::from(constants::UNDERDOG_CARDS_CSV),
                    required: false,
                },
            ],
            prizepicks_legs: LegSource {
                path: PathBuf::from(constants::PRIZEPICKS_LEGS_CSV),
                required: true,
                sort_desc_by: None,
            },
            underdog_legs: LegSource {
                path: PathBuf::from(constants::UNDERDOG_LEGS_CSV),
                required: false,
                sort_desc_by: Some(constants::UD_LEGS_SORT_COLUMN.to_string()),
            },
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            access_token: None,
            api_base: constants::SHEETS_API_BASE.to_string(),
            timeout_seconds: 30,
            write_pacing_ms: constants::WRITE_PACING_MS,
            cards: SheetTarget::new(constants::CARDS_SHEET, constants::CARDS_LAST_COLUMN),
            legs: SheetTarget::new(constants::LEGS_SHEET, constants::LEGS_LAST_COLUMN),
            underdog_legs: SheetTarget::new(constants::UD_LEGS_SHEET, constants::UD_LEGS_LAST_COLUMN),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: constants::TELEGRAM_API_BASE.to_string(),
            timeout_seconds: 15,
            message_pacing_ms: constants::ALERT_PACING_MS,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads `path`, or `config.toml` when present, or built-in defaults;
    /// then applies environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?,
            None => {
                debug!("No config file; using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Secrets and identifiers may come from the environment (or `.env`).
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(id) = non_empty(var("SHEETS_SPREADSHEET_ID")) {
            self.sheets.spreadsheet_id = id;
        }
        if let Some(token) = non_empty(var("SHEETS_ACCESS_TOKEN")) {
            self.sheets.access_token = Some(token);
        }
        if let Some(token) = non_empty(var("TELEGRAM_BOT_TOKEN")) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat) = non_empty(var("TELEGRAM_CHAT_ID")) {
            self.telegram.chat_id = Some(chat);
        }
        if let Some(threshold) = non_empty(var("KELLY_THRESHOLD")).and_then(|v| v.trim().parse::<f64>().ok()) {
            self.alerts.summary = threshold;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.sheets.cards.validate()?;
        self.sheets.legs.validate()?;
        self.sheets.underdog_legs.validate()?;
        if self.sources.cards.is_empty() {
            return Err(SyncError::Config("at least one cards source is required".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::Config("retry.max_attempts must be at least 1".into()));
        }
        if !self.alerts.summary.is_finite() || !self.alerts.individual.is_finite() {
            return Err(SyncError::Config("alert thresholds must be finite numbers".into()));
        }
        Ok(())
    }

    /// Spreadsheet id and access token, or a config error naming what is missing.
    pub fn sheets_credentials(&self) -> Result<(&str, &str)> {
        if self.sheets.spreadsheet_id.trim().is_empty() {
            return Err(SyncError::Config(
                "spreadsheet id not set (sheets.spreadsheet_id or SHEETS_SPREADSHEET_ID)".into(),
            ));
        }
        let token = self
            .sheets
            .access_token
            .as_deref()
            .ok_or_else(|| SyncError::Config("SHEETS_ACCESS_TOKEN not set".into()))?;
        Ok((self.sheets.spreadsheet_id.as_str(), token))
    }

    pub fn telegram_credentials(&self) -> Result<(&str, &str)> {
        match (self.telegram.bot_token.as_deref(), self.telegram.chat_id.as_deref()) {
            (Some(token), Some(chat)) => Ok((token, chat)),
            _ => Err(SyncError::Config(
                "configure TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID".into(),
            )),
        }
    }
}
