//! Centroid position tracker.
//!
//! Assigns an [`Identity`] to each detection by matching detection centres to
//! the last known positions of recent tracks. A detection within
//! `distance_threshold` of a track seen no more than `max_frame_gap` frames
//! ago continues that track; anything else starts a new one. Tracks unseen
//! for more than `patience` frames are dropped, and identities are never
//! reused, so a subject that returns after its track expired gets a new
//! identity.

use log::trace;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::detection::BoundingBox;
use crate::matching::{centroid_distances, get_unmatched, match_detections_and_tracks};
use crate::{Detection, Error, Identity, Result};

/// Configuration for the position tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum centre distance (pixels) for a detection to continue a track.
    pub distance_threshold: f64,

    /// Maximum frames since a track was last seen for it to still match.
    pub max_frame_gap: u64,

    /// Frames a track may go unseen before it is dropped.
    pub patience: u64,
}

impl TrackerConfig {
    /// Create a configuration with the given distance threshold and default gaps.
    pub fn new(distance_threshold: f64) -> Self {
        Self {
            distance_threshold,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.distance_threshold.is_finite() || self.distance_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "distance_threshold must be positive and finite, got {}",
                self.distance_threshold
            )));
        }

        if self.patience < self.max_frame_gap {
            return Err(Error::InvalidConfig(format!(
                "patience ({}) must be at least max_frame_gap ({})",
                self.patience, self.max_frame_gap
            )));
        }

        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 50.0,
            max_frame_gap: 5,
            patience: 30,
        }
    }
}

/// A track maintained by the position tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub identity: Identity,

    /// Last matched centre.
    pub position: Point2<f64>,

    /// Last matched box, if detections carry boxes.
    pub bbox: Option<BoundingBox>,

    /// Frame the track was created.
    pub first_seen: u64,

    /// Frame the track was last matched.
    pub last_seen: u64,

    /// Number of frames the track was matched, including creation.
    pub hits: u32,
}

/// Tracker output for one detection in the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPosition {
    pub identity: Identity,
    pub position: Point2<f64>,
    pub bbox: Option<BoundingBox>,

    /// Index of the detection in the `update` input.
    pub detection_index: usize,
}

/// Centroid tracker issuing identities `ID0`, `ID1`, ...
#[derive(Debug, Clone)]
pub struct PositionTracker {
    /// Tracker configuration.
    pub config: TrackerConfig,

    tracks: Vec<Track>,
    next_track_id: u64,
    last_frame: Option<u64>,
}

impl PositionTracker {
    /// Create a new tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracks: Vec::new(),
            next_track_id: 0,
            last_frame: None,
        })
    }

    /// Assign identities to this frame's detections.
    ///
    /// Frames must be strictly increasing. Returns one entry per detection,
    /// in input order.
    pub fn update(&mut self, frame: u64, detections: &[Detection]) -> Result<Vec<TrackedPosition>> {
        if let Some(last) = self.last_frame {
            if frame <= last {
                return Err(Error::FrameOutOfOrder { last, got: frame });
            }
        }
        self.last_frame = Some(frame);

        let patience = self.config.patience;
        self.tracks.retain(|track| {
            let alive = frame - track.last_seen <= patience;
            if !alive {
                trace!("Track {} expired at frame {}", track.identity, frame);
            }
            alive
        });

        let candidates: Vec<usize> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| frame - t.last_seen <= self.config.max_frame_gap)
            .map(|(i, _)| i)
            .collect();
        let positions: Vec<Point2<f64>> = candidates.iter().map(|&i| self.tracks[i].position).collect();

        let distances = centroid_distances(detections, &positions);
        let (matched_dets, matched_tracks) =
            match_detections_and_tracks(&distances, self.config.distance_threshold);

        let mut assigned: Vec<Option<TrackedPosition>> = vec![None; detections.len()];

        for (&det_idx, &local_idx) in matched_dets.iter().zip(matched_tracks.iter()) {
            let detection = &detections[det_idx];
            let track = &mut self.tracks[candidates[local_idx]];

            trace!(
                "Frame {}: detection {} matched {} at distance {:.1}",
                frame,
                det_idx,
                track.identity,
                distances[(det_idx, local_idx)]
            );

            track.position = detection.center;
            track.bbox = detection.bbox;
            track.last_seen = frame;
            track.hits += 1;

            assigned[det_idx] = Some(TrackedPosition {
                identity: track.identity.clone(),
                position: detection.center,
                bbox: detection.bbox,
                detection_index: det_idx,
            });
        }

        for det_idx in get_unmatched(detections.len(), &matched_dets) {
            let detection = &detections[det_idx];
            let identity = Identity::from_track_id(self.next_track_id);
            self.next_track_id += 1;

            trace!("Frame {}: new track {}", frame, identity);

            self.tracks.push(Track {
                identity: identity.clone(),
                position: detection.center,
                bbox: detection.bbox,
                first_seen: frame,
                last_seen: frame,
                hits: 1,
            });

            assigned[det_idx] = Some(TrackedPosition {
                identity,
                position: detection.center,
                bbox: detection.bbox,
                detection_index: det_idx,
            });
        }

        Ok(assigned.into_iter().flatten().collect())
    }

    /// Tracks that have not expired.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Look up a live track.
    pub fn track(&self, identity: &Identity) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.identity == identity)
    }

    /// Number of identities issued so far.
    pub fn total_track_count(&self) -> u64 {
        self.next_track_id
    }

    /// Number of tracks matched in the latest frame.
    pub fn current_track_count(&self) -> usize {
        match self.last_frame {
            Some(frame) => self.tracks.iter().filter(|t| t.last_seen == frame).count(),
            None => 0,
        }
    }
}
