//! # Actix Middleware Library
//!
//! Middleware shared by the pipeline's HTTP services
//!
//! ## Modules
//! - `metrics`: Prometheus request metrics and the text exposition handler
//! - `correlation_id`: X-Correlation-ID propagation
//! - `logging`: structured request/response logging

pub mod correlation_id;
pub mod logging;
pub mod metrics;

pub use correlation_id::{get_correlation_id, CorrelationIdMiddleware};
pub use logging::Logging;
pub use metrics::{serve_prometheus, MetricsMiddleware};
