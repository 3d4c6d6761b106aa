pub mod config;
pub mod error;
pub mod handlers;

pub use config::Config;
pub use error::{AuthError, Result};
pub use handlers::configure;

use delivery_tracking::{MetricsExporter, ProducerGateway};

#[derive(Clone)]
pub struct AppState {
    pub gateway: ProducerGateway,
    pub exporter: MetricsExporter,
}

impl AppState {
    pub fn new(gateway: ProducerGateway) -> Self {
        let exporter = MetricsExporter::new(gateway.counters().clone());
        Self { gateway, exporter }
    }
}
