use std::collections::HashSet;

use crate::error::{TrackingError, TrackingResult};

/// Kafka rejects topic names longer than this.
const MAX_TOPIC_LEN: usize = 249;

/// Closed set of topics a process publishes to or consumes from.
///
/// Counters are pre-initialized from this registry; nothing is created
/// implicitly on first access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRegistry {
    topics: Vec<String>,
}

impl TopicRegistry {
    /// Build and validate a registry. Order of `topics` is preserved.
    pub fn new<I, S>(topics: I) -> TrackingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
        Self::validate(&topics)?;
        Ok(Self { topics })
    }

    fn validate(topics: &[String]) -> TrackingResult<()> {
        if topics.is_empty() {
            return Err(TrackingError::EmptyRegistry);
        }

        let mut seen = HashSet::with_capacity(topics.len());
        for topic in topics {
            let legal = !topic.is_empty()
                && topic.len() <= MAX_TOPIC_LEN
                && topic != "."
                && topic != ".."
                && topic
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
            if !legal {
                return Err(TrackingError::InvalidTopic(topic.clone()));
            }
            if !seen.insert(topic.as_str()) {
                return Err(TrackingError::DuplicateTopic(topic.clone()));
            }
        }

        Ok(())
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
