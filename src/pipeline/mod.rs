// Data pipeline: CSV ingestion, normalization, and retry plumbing for publishing

pub mod ingestion;
pub mod processing;
pub mod retry;
