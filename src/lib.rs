//! # headcount - At-most-once identity counting
//!
//! Counts subjects in a video stream by category, crediting each tracked
//! identity exactly once per session no matter how many frames it stays in
//! view or how often it leaves and comes back under the same identity.
//!
//! ## Features
//!
//! - [`DedupTracker`]: permanent counted set, per-category counters and
//!   transient per-identity display records
//! - [`SharedDedupTracker`]: lock-serialized handle for parallel classifiers
//! - [`PositionTracker`]: centroid tracker assigning identities to detections
//! - [`CountingSession`]: per-frame pipeline with periodic count reports
//!
//! ## Example
//!
//! ```rust
//! use headcount_rs::{CategorySet, Classification, DedupTracker, Identity};
//! use std::collections::HashSet;
//!
//! let mut tracker = DedupTracker::new(CategorySet::default());
//! let p1 = Identity::new("P1").unwrap();
//!
//! tracker.observe(&p1, Some(&Classification::new("male", 0.9)), 100).unwrap();
//! tracker.observe(&p1, Some(&Classification::new("male", 0.95)), 101).unwrap();
//! assert_eq!(tracker.counters().get("male"), Some(1));
//!
//! // P1 leaves the frame: display metadata goes, the count stays
//! tracker.reconcile_active(&HashSet::new());
//! assert!(tracker.is_counted(&p1));
//! ```

pub mod classification;
pub mod counter;
pub mod detection;
pub mod identity;
pub mod matching;
pub mod report;
pub mod session;
pub mod shared;
pub mod tracker;

// Re-exports for convenience
pub use classification::{CategorySet, Classification};
pub use counter::{ActiveRecord, Counters, DedupTracker, Observation, Status};
pub use detection::{BoundingBox, Detection};
pub use identity::Identity;
pub use report::{CountReport, JsonLinesReport, MemoryReport, NullReport, ReportSink};
pub use session::{Classifier, CountingSession, FrameSummary, Overlay, ScoreClassifier, SessionConfig};
pub use shared::SharedDedupTracker;
pub use tracker::{PositionTracker, Track, TrackedPosition, TrackerConfig};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while tracking and counting
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid identity: {0}")]
        InvalidIdentity(String),

        #[error("Invalid classification: {0}")]
        InvalidClassification(String),

        #[error("Unknown category: {0}")]
        UnknownCategory(String),

        #[error("Invalid detection: {0}")]
        InvalidDetection(String),

        #[error("Frame {got} does not follow the last processed frame {last}")]
        FrameOutOfOrder { last: u64, got: u64 },

        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Serialization error: {0}")]
        Serialization(#[from] serde_json::Error),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),
    }

    /// Result type for headcount operations
    pub type Result<T> = std::result::Result<T, Error>;
}
