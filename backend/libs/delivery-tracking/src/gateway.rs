use async_trait::async_trait;
use event_schema::{OtpRequest, Validate, DEFAULT_SERVICE_IDENTIFIER};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::counters::{CounterStore, DeliveryState};
use crate::error::PublishError;
use crate::metrics::PipelineMetrics;

/// Produce side of the message broker.
///
/// Implementations resolve once the broker client has accepted the send
/// request into its local queue, not when the broker acknowledges it. A
/// synchronous refusal is reported as [`PublishError::Rejected`].
#[async_trait]
pub trait BrokerProducer: Send + Sync {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// Validates, serializes and publishes entity payloads, counting every
/// accepted message as `queued` for its topic.
#[derive(Clone)]
pub struct ProducerGateway {
    broker: Arc<dyn BrokerProducer>,
    counters: Arc<CounterStore>,
    service_identifier: String,
    metrics: Option<PipelineMetrics>,
}

impl ProducerGateway {
    pub fn new(broker: Arc<dyn BrokerProducer>, counters: Arc<CounterStore>) -> Self {
        Self {
            broker,
            counters,
            service_identifier: DEFAULT_SERVICE_IDENTIFIER.to_string(),
            metrics: None,
        }
    }

    /// Identifier stamped on OTP requests
    pub fn with_service_identifier(mut self, service_identifier: impl Into<String>) -> Self {
        self.service_identifier = service_identifier.into();
        self
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn counters(&self) -> &Arc<CounterStore> {
        &self.counters
    }

    /// Publish one payload to a registered topic.
    ///
    /// `queued` is incremented only after the broker client accepts the send.
    pub async fn publish<T>(&self, topic: &str, payload: &T) -> Result<(), PublishError>
    where
        T: Serialize + Validate + Sync,
    {
        if !self.counters.contains(topic) {
            return Err(PublishError::UnknownTopic(topic.to_string()));
        }

        if let Err(e) = payload.validate() {
            self.observe(topic, "invalid");
            return Err(e.into());
        }

        let bytes = serde_json::to_vec(payload)?;

        if let Err(e) = self.broker.send(topic, bytes).await {
            warn!(topic = %topic, error = %e, "Broker rejected publish");
            self.observe(topic, "rejected");
            return Err(e);
        }

        let queued = self
            .counters
            .increment(topic, DeliveryState::Queued)
            .map_err(|_| PublishError::UnknownTopic(topic.to_string()))?;
        self.observe(topic, "accepted");

        debug!(topic = %topic, queued, "Message accepted by broker client");
        Ok(())
    }

    /// Publish an OTP request with a freshly generated request identifier.
    pub async fn publish_otp(&self, topic: &str, email: &str) -> Result<Uuid, PublishError> {
        let request = OtpRequest::new(email, self.service_identifier.as_str());
        self.publish(topic, &request).await?;

        debug!(topic = %topic, request_id = %request.request_id, "OTP request published");
        Ok(request.request_id)
    }

    fn observe(&self, topic: &str, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_publish(topic, result);
        }
    }
}
