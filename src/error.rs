use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("CSV not found: {}", path.display())]
    MissingSourceFile { path: PathBuf },

    #[error("CSV has no header row: {}", path.display())]
    EmptyOrHeaderlessSource { path: PathBuf },

    #[error("{platform} source is missing required columns: {}", missing.join(", "))]
    IncompleteSourceSchema { platform: String, missing: Vec<String> },

    #[error("not a number: {value:?}")]
    NumericCoercionFailure { value: String },

    #[error("transient remote failure on {target} (status {status:?}): {message}")]
    TransientRemoteFailure {
        target: String,
        status: Option<u16>,
        message: String,
    },

    #[error("remote failure on {target} (status {status:?}): {message}")]
    PermanentRemoteFailure {
        target: String,
        status: Option<u16>,
        message: String,
    },

    #[error("notification delivery failed: {message}")]
    NotificationDeliveryFailure { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Rate limits and server-side/availability faults; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::TransientRemoteFailure { .. })
    }

    /// Failures reported by the remote store, as opposed to local input problems.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::TransientRemoteFailure { .. } | SyncError::PermanentRemoteFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
