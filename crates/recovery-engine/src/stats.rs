//! Error counters keyed by kind, component, and operation

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use steadyweb_core_types::ErrorKind;

/// One counter bucket.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StatKey {
    pub kind: ErrorKind,
    pub component: &'static str,
    pub operation: String,
}

/// Monotonic error counters; reset only on explicit [`ErrorStats::clear`].
#[derive(Default)]
pub struct ErrorStats {
    counters: Mutex<HashMap<StatKey, u64>>,
}

impl ErrorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: ErrorKind, operation: &str) {
        let key = StatKey {
            kind,
            component: kind.component(),
            operation: operation.to_string(),
        };
        *self.counters.lock().unwrap().entry(key).or_insert(0) += 1;
    }

    pub fn count(&self, kind: ErrorKind, operation: &str) -> u64 {
        let key = StatKey {
            kind,
            component: kind.component(),
            operation: operation.to_string(),
        };
        self.counters
            .lock()
            .unwrap()
            .get(&key)
            .copied()
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<StatKey, u64> {
        self.counters.lock().unwrap().clone()
    }

    pub fn total(&self) -> u64 {
        self.counters.lock().unwrap().values().sum()
    }

    pub fn clear(&self) {
        self.counters.lock().unwrap().clear();
    }
}
