use dashmap::DashMap;
use std::fmt;

/// Identity of a broker record for retry tracking.
///
/// Keyed by offset rather than content, so that a redelivery of the same
/// record counts against the same attempt budget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub topic: String,
    pub offset: i64,
}

impl MessageKey {
    pub fn new(topic: impl Into<String>, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            offset,
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.topic, self.offset)
    }
}

#[derive(Debug, Clone, Copy)]
struct LedgerEntry {
    attempts: u32,
    /// Partition of the delivery that created the entry, when known
    partition: Option<i32>,
}

/// Failed-attempt counts per message identity.
///
/// Entries are created on the first failure and removed on terminal
/// resolution. A message that fails and is never presented again leaves its
/// entry behind; `len()` makes that leak observable.
///
/// The key carries no partition, so equal offsets on different partitions of
/// one topic share an entry. [`RetryLedger::partition_of`] exposes the
/// partition that opened the entry so callers can detect such collisions.
#[derive(Debug, Default)]
pub struct RetryLedger {
    entries: DashMap<MessageKey, LedgerEntry>,
}

impl RetryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failed attempts recorded so far, 0 for an unseen message.
    pub fn get_attempts(&self, topic: &str, offset: i64) -> u32 {
        self.entries
            .get(&MessageKey::new(topic, offset))
            .map(|entry| entry.attempts)
            .unwrap_or(0)
    }

    /// Count one more failure and return the new attempt count.
    pub fn record_failure(&self, topic: &str, offset: i64) -> u32 {
        self.bump(topic, offset, None)
    }

    /// Like [`RetryLedger::record_failure`], remembering `partition` when
    /// this failure opens the entry.
    pub fn record_failure_in(&self, topic: &str, partition: i32, offset: i64) -> u32 {
        self.bump(topic, offset, Some(partition))
    }

    /// Partition that opened the entry, if there is one and it was recorded.
    pub fn partition_of(&self, topic: &str, offset: i64) -> Option<i32> {
        self.entries
            .get(&MessageKey::new(topic, offset))
            .and_then(|entry| entry.partition)
    }

    fn bump(&self, topic: &str, offset: i64, partition: Option<i32>) -> u32 {
        let mut entry = self
            .entries
            .entry(MessageKey::new(topic, offset))
            .or_insert(LedgerEntry {
                attempts: 0,
                partition,
            });
        entry.attempts += 1;
        entry.attempts
    }

    /// Drop the entry. Returns the attempts it held, if any.
    pub fn clear(&self, topic: &str, offset: i64) -> Option<u32> {
        self.entries
            .remove(&MessageKey::new(topic, offset))
            .map(|(_, entry)| entry.attempts)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
