//! rdkafka implementations of the broker produce and consume interfaces.
//!
//! Producer: `send_result` enqueues into librdkafka and reports acceptance
//! immediately; the delivery report is awaited on a detached task that only
//! logs.
//!
//! Consumer: one `StreamConsumer` per topic, manual commits. Terminal
//! outcomes commit the offset; a `Retrying` outcome seeks the partition back
//! to the failed offset so the broker presents the same record again.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::Offset;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{PublishError, TrackingResult};
use crate::gateway::BrokerProducer;
use crate::pipeline::{ConsumerPipeline, DeliveredRecord, Outcome};
use crate::registry::TopicRegistry;

/// Kafka client settings shared by producer and consumers
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub client_id: String,
    pub group_id: String,
    pub message_timeout_ms: u64,
    pub session_timeout_ms: u64,
    pub auto_offset_reset: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "kafka:9092".to_string(),
            client_id: "message-pipeline".to_string(),
            group_id: "order-group".to_string(),
            message_timeout_ms: 5000,
            session_timeout_ms: 30000,
            auto_offset_reset: "earliest".to_string(),
        }
    }
}

impl KafkaConfig {
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }
}

/// Kafka producer behind [`BrokerProducer`]
#[derive(Clone)]
pub struct KafkaProducerClient {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaProducerClient {
    pub fn new(config: &KafkaConfig) -> KafkaResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("compression.type", "lz4")
            .set("linger.ms", "10")
            .set("queue.buffering.max.messages", "100000")
            .create()?;

        info!(
            brokers = %config.brokers,
            client_id = %config.client_id,
            "Kafka producer created"
        );

        Ok(Self {
            producer,
            timeout: config.timeout(),
        })
    }

    /// Lightweight readiness probe via cluster metadata
    pub fn health_check(&self) -> KafkaResult<()> {
        self.producer
            .client()
            .fetch_metadata(None, self.timeout)
            .map(|_| ())
    }

    /// Wait for queued messages to be delivered
    pub fn flush(&self) -> KafkaResult<()> {
        self.producer.flush(self.timeout)
    }
}

#[async_trait]
impl BrokerProducer for KafkaProducerClient {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let record: FutureRecord<'_, (), [u8]> = FutureRecord::to(topic).payload(payload.as_slice());

        let delivery = self
            .producer
            .send_result(record)
            .map_err(|(e, _)| PublishError::Rejected(e.to_string()))?;

        let topic = topic.to_string();
        tokio::spawn(async move {
            match delivery.await {
                Ok(Ok(_)) => debug!(topic = %topic, "Kafka delivery acknowledged"),
                Ok(Err((e, _))) => warn!(topic = %topic, error = %e, "Kafka delivery failed"),
                Err(_) => warn!(topic = %topic, "Kafka delivery report dropped"),
            }
        });

        Ok(())
    }
}

/// What happens to a record's offset once the pipeline has seen it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerAction {
    /// Commit past the record
    Commit,
    /// Leave it uncommitted and seek back so the broker presents it again
    Rewind,
}

/// Only a retrying outcome rewinds. Terminal outcomes and pipeline errors
/// both commit, so a bad record never stalls its partition.
pub fn action_for(result: &TrackingResult<Outcome>) -> ConsumerAction {
    match result {
        Ok(Outcome::Retrying { .. }) => ConsumerAction::Rewind,
        Ok(Outcome::Success) | Ok(Outcome::Failed { .. }) | Err(_) => ConsumerAction::Commit,
    }
}

/// Single-topic consumer loop feeding the pipeline
pub struct KafkaPipelineConsumer {
    consumer: StreamConsumer,
    topic: String,
    timeout: Duration,
}

impl KafkaPipelineConsumer {
    pub fn new(config: &KafkaConfig, topic: &str) -> KafkaResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("client.id", format!("{}-{}", config.client_id, topic))
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .set("enable.partition.eof", "false")
            .create()?;

        consumer.subscribe(&[topic])?;
        info!(topic = %topic, group_id = %config.group_id, "Subscribed to Kafka topic");

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            timeout: config.timeout(),
        })
    }

    /// Consume until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, pipeline: Arc<ConsumerPipeline>, mut shutdown: watch::Receiver<bool>) {
        info!(
            topic = %self.topic,
            max_retries = pipeline.retry_policy().max_retries,
            "Starting consumer loop"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = self.consumer.recv() => match received {
                    Ok(message) => self.handle_message(&pipeline, &message),
                    Err(e) => {
                        error!(topic = %self.topic, error = %e, "Kafka consumer error");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }

        info!(topic = %self.topic, "Consumer loop stopped");
    }

    fn handle_message(&self, pipeline: &ConsumerPipeline, message: &BorrowedMessage<'_>) {
        let record = DeliveredRecord::new(
            message.topic(),
            message.partition(),
            message.offset(),
            message.payload(),
        );

        let result = pipeline.process(&record);
        if let Err(e) = &result {
            error!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                error = %e,
                "Record rejected by pipeline, skipping"
            );
        }

        match action_for(&result) {
            ConsumerAction::Rewind => self.rewind(&record),
            ConsumerAction::Commit => self.commit(message),
        }
    }

    fn rewind(&self, record: &DeliveredRecord<'_>) {
        if let Err(e) = self.consumer.seek(
            record.topic,
            record.partition,
            Offset::Offset(record.offset),
            self.timeout,
        ) {
            warn!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                error = %e,
                "Failed to rewind partition, relying on broker redelivery"
            );
        }
    }

    fn commit(&self, message: &BorrowedMessage<'_>) {
        if let Err(e) = self.consumer.commit_message(message, CommitMode::Async) {
            warn!(topic = %self.topic, offset = message.offset(), error = %e, "Failed to commit offset");
        }
    }
}

/// Start one consumer task per registered topic.
pub fn spawn_consumers(
    config: &KafkaConfig,
    registry: &TopicRegistry,
    pipeline: Arc<ConsumerPipeline>,
    shutdown: watch::Receiver<bool>,
) -> KafkaResult<Vec<JoinHandle<()>>> {
    let consumers = registry
        .iter()
        .map(|topic| KafkaPipelineConsumer::new(config, topic))
        .collect::<KafkaResult<Vec<_>>>()?;

    Ok(consumers
        .into_iter()
        .map(|consumer| tokio::spawn(consumer.run(pipeline.clone(), shutdown.clone())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackingError;

    #[test]
    fn test_kafka_config_default() {
        let config = KafkaConfig::default();
        assert_eq!(config.brokers, "kafka:9092");
        assert_eq!(config.group_id, "order-group");
        assert_eq!(config.auto_offset_reset, "earliest");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_retrying_rewinds_without_commit() {
        assert_eq!(
            action_for(&Ok(Outcome::Retrying { attempt: 1 })),
            ConsumerAction::Rewind
        );
        assert_eq!(
            action_for(&Ok(Outcome::Retrying { attempt: 3 })),
            ConsumerAction::Rewind
        );
    }

    #[test]
    fn test_terminal_outcomes_commit() {
        assert_eq!(action_for(&Ok(Outcome::Success)), ConsumerAction::Commit);
        assert_eq!(
            action_for(&Ok(Outcome::Failed { attempts: 3 })),
            ConsumerAction::Commit
        );
    }

    #[test]
    fn test_pipeline_error_commits_past_record() {
        let result: TrackingResult<Outcome> =
            Err(TrackingError::UnknownTopic("audit-topic".to_string()));
        assert_eq!(action_for(&result), ConsumerAction::Commit);
    }
}
