//! Per-topic delivery state counters.
//!
//! Every registered topic owns four counters. Each counter is an independent
//! atomic, so increments and decrements never lose an update and snapshot
//! readers never block writers. A snapshot is not a consistent cut across
//! counters: `queued + inProcess` may transiently disagree with reality while
//! a transition is half applied.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{TrackingError, TrackingResult};
use crate::registry::TopicRegistry;

/// The four tracked states. Serialized names match the `/metrics` JSON keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryState {
    Queued,
    InProcess,
    Failed,
    Success,
}

impl DeliveryState {
    pub const ALL: [DeliveryState; 4] = [
        DeliveryState::Queued,
        DeliveryState::InProcess,
        DeliveryState::Failed,
        DeliveryState::Success,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Queued => "queued",
            DeliveryState::InProcess => "inProcess",
            DeliveryState::Failed => "failed",
            DeliveryState::Success => "success",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryState {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| TrackingError::UnknownCounter(s.to_string()))
    }
}

/// Point-in-time copy of one topic's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub queued: u64,
    pub in_process: u64,
    pub failed: u64,
    pub success: u64,
}

impl CounterSnapshot {
    pub fn get(&self, state: DeliveryState) -> u64 {
        match state {
            DeliveryState::Queued => self.queued,
            DeliveryState::InProcess => self.in_process,
            DeliveryState::Failed => self.failed,
            DeliveryState::Success => self.success,
        }
    }

    /// Approximate outstanding work
    pub fn outstanding(&self) -> u64 {
        self.queued + self.in_process
    }
}

/// Topic name → counters, ordered by topic for stable JSON output.
pub type StoreSnapshot = BTreeMap<String, CounterSnapshot>;

#[derive(Debug, Default)]
struct TopicCounters {
    queued: AtomicU64,
    in_process: AtomicU64,
    failed: AtomicU64,
    success: AtomicU64,
}

impl TopicCounters {
    fn cell(&self, state: DeliveryState) -> &AtomicU64 {
        match state {
            DeliveryState::Queued => &self.queued,
            DeliveryState::InProcess => &self.in_process,
            DeliveryState::Failed => &self.failed,
            DeliveryState::Success => &self.success,
        }
    }

    fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            queued: self.queued.load(Ordering::Acquire),
            in_process: self.in_process.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            success: self.success.load(Ordering::Acquire),
        }
    }
}

/// Shared counter store, handed to every component through an `Arc`.
#[derive(Debug)]
pub struct CounterStore {
    topics: HashMap<String, TopicCounters>,
}

impl CounterStore {
    /// Create zeroed counters for every registered topic.
    pub fn new(registry: &TopicRegistry) -> Self {
        let topics = registry
            .iter()
            .map(|topic| (topic.to_string(), TopicCounters::default()))
            .collect();
        Self { topics }
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    fn counters(&self, topic: &str) -> TrackingResult<&TopicCounters> {
        self.topics
            .get(topic)
            .ok_or_else(|| TrackingError::UnknownTopic(topic.to_string()))
    }

    /// Add one to a counter. Returns the new value.
    pub fn increment(&self, topic: &str, state: DeliveryState) -> TrackingResult<u64> {
        let cell = self.counters(topic)?.cell(state);
        Ok(cell.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Subtract one from a counter, saturating at zero. Returns the new value.
    pub fn decrement(&self, topic: &str, state: DeliveryState) -> TrackingResult<u64> {
        let cell = self.counters(topic)?.cell(state);
        let previous = match cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
            Some(v.saturating_sub(1))
        }) {
            Ok(v) | Err(v) => v,
        };

        if previous == 0 {
            debug!(topic = %topic, counter = %state, "Counter already at zero, decrement ignored");
        }

        Ok(previous.saturating_sub(1))
    }

    /// String-keyed variant of [`CounterStore::increment`].
    pub fn increment_named(&self, topic: &str, counter: &str) -> TrackingResult<u64> {
        self.counters(topic)?;
        self.increment(topic, counter.parse()?)
    }

    /// String-keyed variant of [`CounterStore::decrement`].
    pub fn decrement_named(&self, topic: &str, counter: &str) -> TrackingResult<u64> {
        self.counters(topic)?;
        self.decrement(topic, counter.parse()?)
    }

    pub fn get(&self, topic: &str, state: DeliveryState) -> TrackingResult<u64> {
        Ok(self.counters(topic)?.cell(state).load(Ordering::Acquire))
    }

    pub fn topic_snapshot(&self, topic: &str) -> TrackingResult<CounterSnapshot> {
        Ok(self.counters(topic)?.snapshot())
    }

    /// Copy of every topic's counters.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.topics
            .iter()
            .map(|(topic, counters)| (topic.clone(), counters.snapshot()))
            .collect()
    }
}
