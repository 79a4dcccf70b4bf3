//! Aggregate - bounded, keyed batch buffer
//!
//! The [`Aggregate`] maps arbitrary string keys (empty string = one global
//! batch) to batches bounded by item count, byte size, and window age. It is
//! the buffering engine behind every aggregation transform and batching
//! sink.
//!
//! # Admission
//!
//! `add` admits an item only if the resulting count, resulting size, and
//! elapsed window age all stay within bounds; otherwise it returns `false`
//! without any partial mutation. Callers follow a uniform retry-on-reject
//! protocol: flush the existing batch downstream, `reset` the key, retry the
//! `add` once. A second rejection on a fresh batch means the single item
//! alone exceeds a bound, which is a fatal configuration error.
//!
//! # Concurrency
//!
//! The aggregate has no internal locking and is not safe for unsynchronized
//! concurrent access. Owning transformers hold their own `tokio::sync::Mutex`
//! for the full duration of a `transform` call.

mod from_array;
mod to_array;
mod to_string;

pub use from_array::{AggregateFromArray, FromArrayFactory};
pub use to_array::{AggregateToArray, ToArrayFactory};
pub use to_string::{AggregateToString, ToStringFactory};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::BatchConfig;

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;

const DEFAULT_COUNT: usize = 1000;
const DEFAULT_SIZE: usize = 1024 * 1024;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// One open batch window
#[derive(Debug)]
struct Batch {
    items: Vec<Vec<u8>>,
    size: usize,
    opened_at: Instant,
}

impl Batch {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            size: 0,
            opened_at: Instant::now(),
        }
    }

    fn reset(&mut self) {
        self.items.clear();
        self.size = 0;
        self.opened_at = Instant::now();
    }
}

/// Bounded, keyed batch buffer
#[derive(Debug)]
pub struct Aggregate {
    max_count: usize,
    max_size: usize,
    max_interval: Duration,

    batches: HashMap<String, Batch>,
}

impl Aggregate {
    /// Create an empty aggregate from batch bounds.
    ///
    /// Bounds configured ≤ 1 take their defaults: 1000 items, 1 MiB,
    /// 300 seconds.
    pub fn new(config: &BatchConfig) -> Self {
        let max_interval = if config.duration <= 1 {
            DEFAULT_INTERVAL
        } else {
            Duration::from_secs(config.duration)
        };

        Self {
            max_count: if config.count <= 1 {
                DEFAULT_COUNT
            } else {
                config.count
            },
            max_size: if config.size <= 1 {
                DEFAULT_SIZE
            } else {
                config.size
            },
            max_interval,
            batches: HashMap::new(),
        }
    }

    /// Override the window interval. Test hook for sub-second windows.
    #[cfg(test)]
    pub(crate) fn set_max_interval(&mut self, interval: Duration) {
        self.max_interval = interval;
    }

    /// Try to append an item to the batch for `key`.
    ///
    /// Returns `false` without mutating the batch if any bound would be
    /// violated. A batch's window opens when the key is first seen or reset;
    /// admission never extends it.
    pub fn add(&mut self, key: &str, item: &[u8]) -> bool {
        let batch = self
            .batches
            .entry(key.to_string())
            .or_insert_with(Batch::new);

        if batch.items.len() + 1 > self.max_count {
            return false;
        }
        if batch.size + item.len() > self.max_size {
            return false;
        }
        if batch.opened_at.elapsed() > self.max_interval {
            return false;
        }

        batch.size += item.len();
        batch.items.push(item.to_vec());
        true
    }

    /// Buffered items for `key`, in insertion order
    pub fn get(&self, key: &str) -> &[Vec<u8>] {
        self.batches
            .get(key)
            .map(|batch| batch.items.as_slice())
            .unwrap_or(&[])
    }

    /// All keys currently tracked, including those with empty batches.
    ///
    /// Iteration order is unspecified; callers needing stable flush order
    /// must sort.
    pub fn keys(&self) -> Vec<String> {
        self.batches.keys().cloned().collect()
    }

    /// Current item count for `key`
    pub fn count(&self, key: &str) -> usize {
        self.batches
            .get(key)
            .map(|batch| batch.items.len())
            .unwrap_or(0)
    }

    /// Current byte size for `key`
    pub fn size(&self, key: &str) -> usize {
        self.batches.get(key).map(|batch| batch.size).unwrap_or(0)
    }

    /// Clear the batch for `key` and restart its window clock
    pub fn reset(&mut self, key: &str) {
        if let Some(batch) = self.batches.get_mut(key) {
            batch.reset();
        }
    }

    /// Clear every batch and restart every window clock
    pub fn reset_all(&mut self) {
        for batch in self.batches.values_mut() {
            batch.reset();
        }
    }
}
