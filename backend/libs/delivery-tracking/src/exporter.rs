use std::sync::Arc;

use crate::counters::{CounterStore, StoreSnapshot};

/// Read-only handle on the counter store for external polling.
#[derive(Debug, Clone)]
pub struct MetricsExporter {
    store: Arc<CounterStore>,
}

impl MetricsExporter {
    pub fn new(store: Arc<CounterStore>) -> Self {
        Self { store }
    }

    pub fn get_snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }
}
