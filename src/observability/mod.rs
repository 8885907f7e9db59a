// Observability: metrics facade. Logging setup lives in `crate::logging`.

pub mod metrics;
