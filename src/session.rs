//! Frame-by-frame counting session.
//!
//! A [`CountingSession`] drives one video run: it assigns identities with a
//! [`PositionTracker`], asks a [`Classifier`] about each tracked detection,
//! feeds the results to a [`DedupTracker`], retires records for identities
//! that left the frame and publishes periodic [`CountReport`]s.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{info, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::classification::{CategorySet, Classification};
use crate::counter::{Counters, DedupTracker, Observation, Status};
use crate::detection::BoundingBox;
use crate::report::{CountReport, NullReport, ReportSink};
use crate::tracker::{PositionTracker, TrackerConfig};
use crate::{Detection, Identity, Result};

/// Produces an optional classification for a detection.
///
/// `None` means no usable classification this frame.
pub trait Classifier {
    fn classify(&mut self, detection: &Detection) -> Option<Classification>;
}

impl<F> Classifier for F
where
    F: FnMut(&Detection) -> Option<Classification>,
{
    fn classify(&mut self, detection: &Detection) -> Option<Classification> {
        self(detection)
    }
}

/// Classifier reading the raw scores attached to each detection.
///
/// Picks the highest-scoring category; detections without scores, with
/// malformed scores or below `min_confidence` yield no classification.
#[derive(Debug, Clone)]
pub struct ScoreClassifier {
    categories: CategorySet,
    min_confidence: f64,
}

impl ScoreClassifier {
    pub fn new(categories: CategorySet, min_confidence: f64) -> Self {
        Self {
            categories,
            min_confidence,
        }
    }
}

impl Classifier for ScoreClassifier {
    fn classify(&mut self, detection: &Detection) -> Option<Classification> {
        let scores = detection.scores.as_ref()?;
        match Classification::from_scores(scores, &self.categories) {
            Ok(c) if c.confidence >= self.min_confidence => Some(c),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring detection scores: {}", e);
                None
            }
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Position tracker parameters.
    pub tracker: TrackerConfig,

    /// Category labels in classifier output order.
    pub categories: CategorySet,

    /// Publish a report every this many frames. Zero disables periodic reports.
    pub report_interval: u64,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            categories: CategorySet::default(),
            report_interval: 10,
        }
    }
}

/// Display data for one visible identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub identity: Identity,
    pub position: Point2<f64>,
    pub bbox: Option<BoundingBox>,
    pub status: Status,

    /// Latest label, if the identity has an active record.
    pub label: Option<String>,

    /// Latest confidence, if the identity has an active record.
    pub confidence: Option<f64>,
}

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    /// Frame number, starting at 1.
    pub frame: u64,

    /// Identities visible in this frame.
    pub visible: usize,

    /// Identities credited for the first time in this frame.
    pub newly_counted: Vec<Identity>,

    /// One overlay per visible identity, in detection order.
    pub overlays: Vec<Overlay>,
}

/// One counting session over a stream of frames.
pub struct CountingSession<C, S = NullReport> {
    config: SessionConfig,
    tracker: PositionTracker,
    dedup: DedupTracker,
    classifier: C,
    sink: S,
    frame: u64,
    last_reported: Option<u64>,
}

impl<C: Classifier, S: ReportSink> CountingSession<C, S> {
    /// Start a session.
    pub fn new(config: SessionConfig, classifier: C, sink: S) -> Result<Self> {
        config.validate()?;
        let tracker = PositionTracker::new(config.tracker.clone())?;
        let dedup = DedupTracker::new(config.categories.clone());

        Ok(Self {
            config,
            tracker,
            dedup,
            classifier,
            sink,
            frame: 0,
            last_reported: None,
        })
    }

    /// Process the detections of the next frame.
    ///
    /// Invalid classifications are logged and skipped; the rest of the frame
    /// is still processed.
    pub fn process_frame(&mut self, detections: &[Detection]) -> Result<FrameSummary> {
        let frame = self.frame + 1;
        let tracked = self.tracker.update(frame, detections)?;
        self.frame = frame;

        let mut newly_counted = Vec::new();
        for position in &tracked {
            let detection = &detections[position.detection_index];
            let classification = self.classifier.classify(detection);

            match self.dedup.observe(&position.identity, classification.as_ref(), frame) {
                Ok(Observation::Counted) => {
                    if let Some(record) = self.dedup.active_record(&position.identity) {
                        info!(
                            "Frame {}: new {} detected (confidence {:.2})",
                            frame, record.label, record.confidence
                        );
                    }
                    newly_counted.push(position.identity.clone());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Frame {}: skipping {}: {}", frame, position.identity, e);
                }
            }
        }

        let present: HashSet<Identity> = tracked.iter().map(|p| p.identity.clone()).collect();
        self.dedup.reconcile_active(&present);

        let overlays = tracked
            .into_iter()
            .map(|p| {
                let record = self.dedup.active_record(&p.identity);
                Overlay {
                    status: self.dedup.status(&p.identity),
                    label: record.map(|r| r.label.clone()),
                    confidence: record.map(|r| r.confidence),
                    identity: p.identity,
                    position: p.position,
                    bbox: p.bbox,
                }
            })
            .collect::<Vec<_>>();

        let interval = self.config.report_interval;
        if interval > 0 && frame % interval == 0 {
            self.publish(frame)?;
        }

        Ok(FrameSummary {
            frame,
            visible: overlays.len(),
            newly_counted,
            overlays,
        })
    }

    /// End the session: publish the final counts and flush the sink.
    pub fn finish(mut self) -> Result<(CountReport, S)> {
        let report = self.dedup.snapshot(self.frame);
        if self.last_reported != Some(self.frame) {
            self.sink.publish(&report)?;
        }
        self.sink.flush()?;

        let summary = report
            .counts
            .iter()
            .map(|(label, n)| format!("{}: {}", label, n))
            .collect::<Vec<_>>()
            .join(", ");
        info!("Session stopped after {} frames. Final counts - {}, total: {}", self.frame, summary, report.total);

        Ok((report, self.sink))
    }

    fn publish(&mut self, frame: u64) -> Result<()> {
        let report = self.dedup.snapshot(frame);
        info!("Frame {}: reporting total {}", frame, report.total);
        self.sink.publish(&report)?;
        self.last_reported = Some(frame);
        Ok(())
    }

    pub fn counters(&self) -> &Counters {
        self.dedup.counters()
    }

    pub fn dedup(&self) -> &DedupTracker {
        &self.dedup
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of frames processed.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
