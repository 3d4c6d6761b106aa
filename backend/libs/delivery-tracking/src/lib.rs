//! # Delivery Tracking Library
//!
//! Tracks Kafka messages from publish to terminal outcome and keeps the
//! per-topic counters behind the `/metrics` endpoint.
//!
//! ## Architecture
//!
//! ```text
//! HTTP ─▶ ProducerGateway ─▶ Kafka ─▶ KafkaPipelineConsumer ─▶ ConsumerPipeline
//!              │                                                 │        │
//!              └──────────── queued++ ──▶ CounterStore ◀─────────┘   RetryLedger
//!                                              │
//!                                       MetricsExporter ─▶ GET /metrics
//! ```
//!
//! - [`CounterStore`]: topic → {queued, inProcess, failed, success}, atomic
//! - [`RetryLedger`]: (topic, offset) → failed attempts
//! - [`ConsumerPipeline`]: queued → in-process → success | retrying | failed
//! - [`ProducerGateway`]: validate, serialize, send, count
//! - [`MetricsExporter`]: read-only snapshot
//!
//! ## Usage Example
//!
//! ```ignore
//! use delivery_tracking::*;
//! use std::sync::Arc;
//!
//! let registry = TopicRegistry::new(["user-topic"])?;
//! let counters = Arc::new(CounterStore::new(&registry));
//! let ledger = Arc::new(RetryLedger::new());
//!
//! let pipeline = ConsumerPipeline::new(counters.clone(), ledger, Arc::new(LoggingHandler));
//! let outcome = pipeline.process(&DeliveredRecord::new("user-topic", 0, 0, Some(b"{}".as_slice())))?;
//! assert_eq!(outcome, Outcome::Success);
//! ```
//!
//! ## Retries
//!
//! Retries are driven by redelivery. The pipeline records the failure and
//! returns [`Outcome::Retrying`]; the Kafka consumer then seeks back to the
//! failed offset instead of committing it. After `max_retries` recorded
//! failures the next failing delivery is terminal.

pub mod counters;
pub mod error;
pub mod exporter;
pub mod gateway;
pub mod kafka;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod registry;

pub use counters::{CounterSnapshot, CounterStore, DeliveryState, StoreSnapshot};
pub use error::{ProcessingFailure, PublishError, TrackingError, TrackingResult};
pub use exporter::MetricsExporter;
pub use gateway::{BrokerProducer, ProducerGateway};
pub use kafka::{
    action_for, spawn_consumers, ConsumerAction, KafkaConfig, KafkaPipelineConsumer,
    KafkaProducerClient,
};
pub use ledger::{MessageKey, RetryLedger};
pub use metrics::PipelineMetrics;
pub use pipeline::{
    ConsumerPipeline, DeliveredRecord, LoggingHandler, MessageHandler, Outcome, RetryPolicy,
    DEFAULT_MAX_RETRIES,
};
pub use registry::TopicRegistry;
