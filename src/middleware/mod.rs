//! Custom request middleware: structured logging and per-endpoint metrics.

pub mod logging;
pub mod metrics;

pub use logging::RequestLogging;
pub use metrics::MetricsMiddleware;