//! Consumer-side processing state machine.
//!
//! ```text
//! delivery ──▶ InProcess ──handler ok──▶ Success
//!                  │
//!                  └──handler err──▶ attempts < max ──▶ Retrying (await redelivery)
//!                                    attempts >= max ─▶ Failed
//! ```
//!
//! The pipeline never redelivers by itself. A `Retrying` outcome tells the
//! caller to leave the offset uncommitted so the broker presents the same
//! record again.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::counters::{CounterStore, DeliveryState};
use crate::error::{ProcessingFailure, TrackingError, TrackingResult};
use crate::ledger::RetryLedger;
use crate::metrics::PipelineMetrics;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A record as delivered by the broker client.
#[derive(Debug, Clone, Copy)]
pub struct DeliveredRecord<'a> {
    pub topic: &'a str,
    pub partition: i32,
    pub offset: i64,
    pub payload: Option<&'a [u8]>,
}

impl<'a> DeliveredRecord<'a> {
    pub fn new(topic: &'a str, partition: i32, offset: i64, payload: Option<&'a [u8]>) -> Self {
        Self {
            topic,
            partition,
            offset,
            payload,
        }
    }

    /// Payload as UTF-8, if present and valid
    pub fn payload_str(&self) -> Option<&'a str> {
        self.payload.and_then(|p| std::str::from_utf8(p).ok())
    }
}

/// Business-specific processing step. Runs synchronously on the consumer
/// task; implementations must not block on long I/O.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, record: &DeliveredRecord<'_>) -> Result<(), ProcessingFailure>;
}

impl<F> MessageHandler for F
where
    F: Fn(&DeliveredRecord<'_>) -> Result<(), ProcessingFailure> + Send + Sync,
{
    fn handle(&self, record: &DeliveredRecord<'_>) -> Result<(), ProcessingFailure> {
        self(record)
    }
}

/// Logs the consumed payload and accepts it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl MessageHandler for LoggingHandler {
    fn handle(&self, record: &DeliveredRecord<'_>) -> Result<(), ProcessingFailure> {
        info!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            payload = record.payload_str().unwrap_or("<non-utf8 or empty>"),
            "Consumed message"
        );
        Ok(())
    }
}

/// Result of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Failure recorded; `attempt` failures so far
    Retrying { attempt: u32 },
    /// Gave up after `attempts` recorded failures
    Failed { attempts: u32 },
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Retrying { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Retrying { .. } => "retrying",
            Outcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }
}

/// Drives delivered records through the state machine, updating the shared
/// counter store and retry ledger.
pub struct ConsumerPipeline {
    counters: Arc<CounterStore>,
    ledger: Arc<RetryLedger>,
    handler: Arc<dyn MessageHandler>,
    policy: RetryPolicy,
    metrics: Option<PipelineMetrics>,
}

impl ConsumerPipeline {
    pub fn new(
        counters: Arc<CounterStore>,
        ledger: Arc<RetryLedger>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            counters,
            ledger,
            handler,
            policy: RetryPolicy::default(),
            metrics: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn counters(&self) -> &Arc<CounterStore> {
        &self.counters
    }

    pub fn ledger(&self) -> &Arc<RetryLedger> {
        &self.ledger
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Process one delivery of a record.
    ///
    /// Handler failures become state transitions; the only error is a record
    /// from a topic outside the registry.
    pub fn process(&self, record: &DeliveredRecord<'_>) -> TrackingResult<Outcome> {
        let topic = record.topic;
        if !self.counters.contains(topic) {
            return Err(TrackingError::UnknownTopic(topic.to_string()));
        }

        // Every delivery enters InProcess, redeliveries of a retrying record
        // included, so repeated deliveries of one offset inflate `inProcess`
        self.counters.decrement(topic, DeliveryState::Queued)?;
        self.counters.increment(topic, DeliveryState::InProcess)?;

        let prior_attempts = self.ledger.get_attempts(topic, record.offset);
        if prior_attempts > 0 {
            match self.ledger.partition_of(topic, record.offset) {
                Some(partition) if partition != record.partition => debug!(
                    topic = %topic,
                    offset = record.offset,
                    partition = record.partition,
                    ledger_partition = partition,
                    attempts = prior_attempts,
                    "Retry ledger entry opened by another partition"
                ),
                _ => debug!(
                    topic = %topic,
                    offset = record.offset,
                    attempts = prior_attempts,
                    "Redelivered message"
                ),
            }
        }

        let outcome = match self.handler.handle(record) {
            Ok(()) => self.resolve_success(record)?,
            Err(failure) => self.resolve_failure(record, prior_attempts, &failure)?,
        };

        if let Some(metrics) = &self.metrics {
            metrics.observe_outcome(topic, outcome.as_str(), self.ledger.len());
        }

        let snapshot = self.counters.topic_snapshot(topic)?;
        debug!(
            topic = %topic,
            offset = record.offset,
            outcome = outcome.as_str(),
            outstanding = snapshot.outstanding(),
            "Delivery resolved"
        );

        Ok(outcome)
    }

    fn resolve_success(&self, record: &DeliveredRecord<'_>) -> TrackingResult<Outcome> {
        self.counters.increment(record.topic, DeliveryState::Success)?;
        self.counters.decrement(record.topic, DeliveryState::InProcess)?;

        if let Some(attempts) = self.ledger.clear(record.topic, record.offset) {
            info!(
                topic = %record.topic,
                offset = record.offset,
                attempts,
                "Message succeeded after retries"
            );
        }

        Ok(Outcome::Success)
    }

    fn resolve_failure(
        &self,
        record: &DeliveredRecord<'_>,
        attempts: u32,
        failure: &ProcessingFailure,
    ) -> TrackingResult<Outcome> {
        if self.policy.should_retry(attempts) {
            let attempt = self
                .ledger
                .record_failure_in(record.topic, record.partition, record.offset);
            warn!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                attempt,
                max_retries = self.policy.max_retries,
                error = %failure,
                "Error processing message, awaiting redelivery"
            );
            return Ok(Outcome::Retrying { attempt });
        }

        self.counters.increment(record.topic, DeliveryState::Failed)?;
        self.counters.decrement(record.topic, DeliveryState::InProcess)?;
        self.ledger.clear(record.topic, record.offset);

        error!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            retries = attempts,
            error = %failure,
            "Message failed after max retries"
        );

        Ok(Outcome::Failed { attempts })
    }
}
