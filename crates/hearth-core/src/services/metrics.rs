use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Named monotonic counters shared across plugins.
///
/// Each operation is atomic on its own; callers must not assume anything
/// about interleaving between two calls.
pub trait Metrics: Send + Sync {
    /// Adds `by` to the counter and returns the new value.
    fn incr(&self, name: &str, by: u64) -> u64;

    /// Current value of the counter (zero if never touched).
    fn get(&self, name: &str) -> u64;

    /// Point-in-time copy of every counter.
    fn snapshot(&self) -> BTreeMap<String, u64>;
}

/// Default [`Metrics`] implementation backed by atomics.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl CounterMetrics {
    /// Creates an empty counter set.
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, name: &str) -> Arc<AtomicU64> {
        if let Some(counter) = self.counters.read().get(name) {
            return Arc::clone(counter);
        }
        Arc::clone(
            self.counters
                .write()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AtomicU64::new(0))),
        )
    }
}

impl Metrics for CounterMetrics {
    fn incr(&self, name: &str, by: u64) -> u64 {
        self.counter(name).fetch_add(by, Ordering::SeqCst) + by
    }

    fn get(&self, name: &str) -> u64 {
        self.counters
            .read()
            .get(name)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }

    fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::SeqCst)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incr_and_snapshot() {
        let metrics = CounterMetrics::new();
        assert_eq!(metrics.incr("dispatch.ready", 1), 1);
        assert_eq!(metrics.incr("dispatch.ready", 2), 3);
        assert_eq!(metrics.get("dispatch.ready"), 3);
        assert_eq!(metrics.get("missing"), 0);

        let snap = metrics.snapshot();
        assert_eq!(snap.get("dispatch.ready"), Some(&3));
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let metrics = Arc::new(CounterMetrics::new());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        m.incr("hits", 1);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(metrics.get("hits"), 4000);
    }
}
