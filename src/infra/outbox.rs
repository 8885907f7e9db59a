use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::ports::NotificationPort;
use crate::error::{Result, SyncError};

/// Notification sink that keeps messages in memory instead of sending them.
/// Backs `--dry-run` (with `echo`) and tests.
#[derive(Default)]
pub struct Outbox {
    messages: Mutex<Vec<String>>,
    echo: bool,
    fail: bool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints each message to stdout as it is "sent".
    pub fn echoing() -> Self {
        Self { echo: true, ..Self::default() }
    }

    /// Rejects every message.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationPort for Outbox {
    async fn send(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(SyncError::NotificationDeliveryFailure {
                message: "outbox configured to fail".to_string(),
            });
        }
        if self.echo {
            println!("--- message ---\n{text}\n");
        }
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
