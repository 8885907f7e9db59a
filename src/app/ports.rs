use async_trait::async_trait;

use crate::error::Result;

/// Remote tabular store addressed with A1 ranges (`Sheet!A2:AF`).
#[async_trait]
pub trait SheetStorePort: Send + Sync {
    /// Blanks every cell in `range`.
    async fn clear(&self, range: &str) -> Result<()>;

    /// Writes `values` as literal cells starting at the top-left of `range`.
    /// Returns the number of rows the store reports as updated.
    async fn update(&self, range: &str, values: &[Vec<String>]) -> Result<usize>;
}

/// Short text message delivery.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}
