use delivery_tracking::{MetricsExporter, ProducerGateway};

/// Shared handles for HTTP handlers
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
