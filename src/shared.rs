//! Thread-safe handle to a [`DedupTracker`].
//!
//! Use this when classification for one frame runs on several threads. Every
//! call holds the lock for its whole duration, so the counted-set check and
//! the counter increment in `observe` happen as one step.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::classification::Classification;
use crate::counter::{Counters, DedupTracker, Observation, Status};
use crate::identity::Identity;
use crate::report::CountReport;
use crate::Result;

/// Cloneable, lock-serialized dedup tracker.
#[derive(Debug, Clone)]
pub struct SharedDedupTracker {
    inner: Arc<Mutex<DedupTracker>>,
}

impl SharedDedupTracker {
    pub fn new(tracker: DedupTracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    /// See [`DedupTracker::observe`].
    pub fn observe(
        &self,
        identity: &Identity,
        classification: Option<&Classification>,
        frame: u64,
    ) -> Result<Observation> {
        self.inner.lock().observe(identity, classification, frame)
    }

    /// See [`DedupTracker::reconcile_active`].
    pub fn reconcile_active(&self, current: &HashSet<Identity>) -> usize {
        self.inner.lock().reconcile_active(current)
    }

    pub fn is_counted(&self, identity: &Identity) -> bool {
        self.inner.lock().is_counted(identity)
    }

    pub fn status(&self, identity: &Identity) -> Status {
        self.inner.lock().status(identity)
    }

    /// Copy of the current counters.
    pub fn counters(&self) -> Counters {
        self.inner.lock().counters().clone()
    }

    pub fn snapshot(&self, frame: u64) -> CountReport {
        self.inner.lock().snapshot(frame)
    }

    /// Run `f` with exclusive access to the tracker.
    pub fn with<R>(&self, f: impl FnOnce(&mut DedupTracker) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Take the tracker back if this is the last handle.
    pub fn try_unwrap(self) -> std::result::Result<DedupTracker, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<DedupTracker> for SharedDedupTracker {
    fn from(tracker: DedupTracker) -> Self {
        Self::new(tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::CategorySet;
    use std::thread;

    #[test]
    fn test_concurrent_first_observations_count_once() {
        let shared = SharedDedupTracker::new(DedupTracker::new(CategorySet::new(["X"]).unwrap()));
        let identity = Identity::new("P1").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                let identity = identity.clone();
                thread::spawn(move || {
                    shared
                        .observe(&identity, Some(&Classification::new("X", 0.9)), 1)
                        .unwrap()
                })
            })
            .collect();

        let outcomes: Vec<Observation> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| **o == Observation::Counted).count(), 1);
        assert_eq!(shared.counters().get("X"), Some(1));
        assert!(shared.is_counted(&identity));
    }

    #[test]
    fn test_concurrent_distinct_identities() {
        let shared = SharedDedupTracker::new(DedupTracker::default());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..25u64 {
                        let identity = Identity::from_track_id(t * 100 + i);
                        let label = if i % 2 == 0 { "female" } else { "male" };
                        shared
                            .observe(&identity, Some(&Classification::new(label, 0.7)), 1)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let counters = shared.counters();
        assert_eq!(counters.total(), 100);
        assert_eq!(counters.get("female"), Some(52));
        assert_eq!(counters.get("male"), Some(48));
    }

    #[test]
    fn test_try_unwrap_returns_tracker() {
        let shared = SharedDedupTracker::from(DedupTracker::default());
        let other = shared.clone();
        let shared = shared.try_unwrap().unwrap_err();
        drop(other);

        let tracker = shared.try_unwrap().unwrap();
        assert_eq!(tracker.counted_len(), 0);
    }
}
