// Adapters behind the app ports: live HTTP clients and in-memory stand-ins

pub mod in_memory_sheet;
pub mod outbox;
pub mod sheets_client;
pub mod telegram_client;
