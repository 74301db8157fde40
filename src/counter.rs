//! At-most-once identity counting.
//!
//! [`DedupTracker`] owns three pieces of state for one session:
//!
//! - the counted set: every identity ever credited to a counter. Insert-only,
//!   it lives as long as the tracker.
//! - the active records: display metadata for identities visible right now.
//!   Retired by [`DedupTracker::reconcile_active`] when an identity leaves.
//! - the per-category [`Counters`].
//!
//! Forgetting an active record never forgets that the identity was counted.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::classification::{CategorySet, Classification};
use crate::identity::Identity;
use crate::report::CountReport;
use crate::{Error, Result};

/// Presentation status of an identity, derived from counted-set membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Uncounted,
    Counted,
}

impl Status {
    pub fn is_counted(self) -> bool {
        matches!(self, Status::Counted)
    }
}

/// What a [`DedupTracker::observe`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First credit for this identity; one counter was incremented.
    Counted,
    /// Already counted; only the active record changed.
    Updated,
    /// No classification was supplied; nothing changed.
    Ignored,
}

/// Transient metadata for a currently visible identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRecord {
    /// Latest category label.
    pub label: String,

    /// Latest confidence.
    pub confidence: f64,

    /// True once the identity has been credited. Never reset.
    pub counted: bool,

    /// Earliest frame recorded for this identity.
    pub first_seen_frame: u64,

    /// Frame of the latest update.
    pub last_seen_frame: u64,
}

/// Permanent counted-set entry.
#[derive(Debug, Clone, Copy)]
struct CountedEntry {
    frame: u64,
    category: usize,
}

/// Per-category tallies. The total is always the sum of the tallies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counters {
    categories: CategorySet,
    tallies: Vec<u64>,
}

impl Counters {
    /// Zeroed counters for a category set.
    pub fn new(categories: CategorySet) -> Self {
        let tallies = vec![0; categories.len()];
        Self { categories, tallies }
    }

    /// Tally for a label, or None if the label is not a category.
    pub fn get(&self, label: &str) -> Option<u64> {
        self.categories.index_of(label).map(|i| self.tallies[i])
    }

    /// Tally for a category index.
    pub fn get_index(&self, index: usize) -> Option<u64> {
        self.tallies.get(index).copied()
    }

    pub fn total(&self) -> u64 {
        self.tallies.iter().sum()
    }

    /// `(label, tally)` pairs in category order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.categories
            .labels()
            .iter()
            .map(String::as_str)
            .zip(self.tallies.iter().copied())
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    fn increment(&mut self, index: usize) {
        self.tallies[index] += 1;
    }
}

/// Identity dedup tracker for one session.
///
/// Construct one per session and drop it when the session ends.
#[derive(Debug, Clone)]
pub struct DedupTracker {
    counters: Counters,
    counted: HashMap<Identity, CountedEntry>,
    active: HashMap<Identity, ActiveRecord>,
    last_frame: Option<u64>,
}

impl DedupTracker {
    /// Start a session counting over `categories`.
    pub fn new(categories: CategorySet) -> Self {
        Self {
            counters: Counters::new(categories),
            counted: HashMap::new(),
            active: HashMap::new(),
            last_frame: None,
        }
    }

    /// Record one identity's classification result for a frame.
    ///
    /// `frame` must not go backwards across calls; several identities may be
    /// observed in the same frame. A rejected call leaves all state untouched.
    pub fn observe(
        &mut self,
        identity: &Identity,
        classification: Option<&Classification>,
        frame: u64,
    ) -> Result<Observation> {
        if let Some(last) = self.last_frame {
            if frame < last {
                return Err(Error::FrameOutOfOrder { last, got: frame });
            }
        }

        let classification = match classification {
            Some(c) => c,
            None => {
                self.last_frame = Some(frame);
                return Ok(Observation::Ignored);
            }
        };

        let category = classification.validate(self.counters.categories())?;
        self.last_frame = Some(frame);

        if let Some(entry) = self.counted.get(identity) {
            let first_seen = entry.frame;
            match self.active.get_mut(identity) {
                Some(record) => {
                    record.label = classification.category.clone();
                    record.confidence = classification.confidence;
                    record.first_seen_frame = record.first_seen_frame.min(first_seen);
                    record.last_seen_frame = frame;
                }
                None => {
                    trace!("Identity {} returned at frame {}", identity, frame);
                    self.active.insert(
                        identity.clone(),
                        ActiveRecord {
                            label: classification.category.clone(),
                            confidence: classification.confidence,
                            counted: true,
                            first_seen_frame: first_seen,
                            last_seen_frame: frame,
                        },
                    );
                }
            }
            return Ok(Observation::Updated);
        }

        self.counters.increment(category);
        self.counted.insert(identity.clone(), CountedEntry { frame, category });

        let first_seen = self
            .active
            .get(identity)
            .map_or(frame, |r| r.first_seen_frame.min(frame));
        self.active.insert(
            identity.clone(),
            ActiveRecord {
                label: classification.category.clone(),
                confidence: classification.confidence,
                counted: true,
                first_seen_frame: first_seen,
                last_seen_frame: frame,
            },
        );

        debug!(
            "Frame {}: counted {} as {} (confidence {:.2}), total {}",
            frame,
            identity,
            classification.category,
            classification.confidence,
            self.counters.total()
        );

        Ok(Observation::Counted)
    }

    /// Whether `identity` has been credited this session.
    pub fn is_counted(&self, identity: &Identity) -> bool {
        self.counted.contains_key(identity)
    }

    /// Presentation status, from counted-set membership only.
    pub fn status(&self, identity: &Identity) -> Status {
        if self.is_counted(identity) {
            Status::Counted
        } else {
            Status::Uncounted
        }
    }

    /// Retire active records for identities absent from `current`.
    ///
    /// The counted set is never touched. Returns the number of records retired.
    pub fn reconcile_active(&mut self, current: &HashSet<Identity>) -> usize {
        let before = self.active.len();
        self.active.retain(|identity, _| {
            let keep = current.contains(identity);
            if !keep {
                trace!("Retiring active record for {}", identity);
            }
            keep
        });
        before - self.active.len()
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn categories(&self) -> &CategorySet {
        self.counters.categories()
    }

    /// Latest record for an active identity.
    pub fn active_record(&self, identity: &Identity) -> Option<&ActiveRecord> {
        self.active.get(identity)
    }

    pub fn active_records(&self) -> impl Iterator<Item = (&Identity, &ActiveRecord)> + '_ {
        self.active.iter()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of identities ever counted.
    pub fn counted_len(&self) -> usize {
        self.counted.len()
    }

    /// Frame at which `identity` was credited.
    pub fn counted_frame(&self, identity: &Identity) -> Option<u64> {
        self.counted.get(identity).map(|e| e.frame)
    }

    /// Category label `identity` was credited under.
    pub fn counted_category(&self, identity: &Identity) -> Option<&str> {
        self.counted
            .get(identity)
            .and_then(|e| self.counters.categories().label(e.category))
    }

    /// Latest frame accepted by `observe`.
    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Count snapshot tagged with `frame`.
    pub fn snapshot(&self, frame: u64) -> CountReport {
        CountReport::from_counters(&self.counters, frame)
    }
}

impl Default for DedupTracker {
    fn default() -> Self {
        Self::new(CategorySet::default())
    }
}
