use prometheus::{IntCounterVec, IntGauge, Opts};
use tracing::warn;

/// Prometheus view of the pipeline, complementing the JSON counter snapshot.
#[derive(Clone)]
pub struct PipelineMetrics {
    /// Deliveries by topic and outcome (success, retrying, failed)
    pub processed: IntCounterVec,
    /// Publish attempts by topic and result (accepted, rejected, invalid)
    pub published: IntCounterVec,
    /// Live retry ledger entries, including orphans
    pub retry_ledger_entries: IntGauge,
}

impl PipelineMetrics {
    pub fn new(service: &str) -> Self {
        let registry = prometheus::default_registry();

        let processed = IntCounterVec::new(
            Opts::new(
                "pipeline_messages_processed_total",
                "Consumed messages by processing outcome",
            )
            .const_label("service", service.to_string()),
            &["topic", "outcome"],
        )
        .expect("valid metric opts for pipeline_messages_processed_total");

        let published = IntCounterVec::new(
            Opts::new(
                "pipeline_messages_published_total",
                "Publish attempts by broker result",
            )
            .const_label("service", service.to_string()),
            &["topic", "result"],
        )
        .expect("valid metric opts for pipeline_messages_published_total");

        let retry_ledger_entries = IntGauge::with_opts(
            Opts::new(
                "pipeline_retry_ledger_entries",
                "Messages with at least one failed attempt awaiting resolution",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for pipeline_retry_ledger_entries");

        for metric in [
            Box::new(processed.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(published.clone()),
            Box::new(retry_ledger_entries.clone()),
        ] {
            if let Err(e) = registry.register(metric) {
                warn!("Failed to register pipeline metric: {}", e);
            }
        }

        Self {
            processed,
            published,
            retry_ledger_entries,
        }
    }

    pub fn observe_outcome(&self, topic: &str, outcome: &str, ledger_len: usize) {
        self.processed.with_label_values(&[topic, outcome]).inc();
        self.retry_ledger_entries.set(ledger_len as i64);
    }

    pub fn observe_publish(&self, topic: &str, result: &str) {
        self.published.with_label_values(&[topic, result]).inc();
    }
}
