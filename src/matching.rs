//! Detection-to-track matching.

use nalgebra::{DMatrix, Point2};

use crate::Detection;

/// Euclidean distances between detection centres and track positions.
///
/// Returns a matrix of shape (n_detections, n_positions); entry (i, j) is the
/// distance between detection i and position j.
pub fn centroid_distances(detections: &[Detection], positions: &[Point2<f64>]) -> DMatrix<f64> {
    DMatrix::from_fn(detections.len(), positions.len(), |i, j| {
        detections[i].distance_to(&positions[j])
    })
}

/// Match detections to tracks using greedy minimum-distance matching.
///
/// Pairs are taken in ascending distance order; each detection and each
/// track is used at most once. Distances above `threshold` (or non-finite)
/// never match.
///
/// # Returns
/// Tuple of (matched_det_indices, matched_track_indices) where entry i is one
/// matched pair, in the order the pairs were chosen.
pub fn match_detections_and_tracks(
    distance_matrix: &DMatrix<f64>,
    threshold: f64,
) -> (Vec<usize>, Vec<usize>) {
    let n_detections = distance_matrix.nrows();
    let n_tracks = distance_matrix.ncols();

    if n_detections == 0 || n_tracks == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for i in 0..n_detections {
        for j in 0..n_tracks {
            let dist = distance_matrix[(i, j)];
            if dist.is_finite() && dist <= threshold {
                pairs.push((dist, i, j));
            }
        }
    }

    // Stable sort keeps row-major order among equal distances
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut used_dets = vec![false; n_detections];
    let mut used_tracks = vec![false; n_tracks];

    let mut matched_dets = Vec::new();
    let mut matched_tracks = Vec::new();

    for (_dist, det_idx, track_idx) in pairs {
        if used_dets[det_idx] || used_tracks[track_idx] {
            continue;
        }

        matched_dets.push(det_idx);
        matched_tracks.push(track_idx);
        used_dets[det_idx] = true;
        used_tracks[track_idx] = true;
    }

    (matched_dets, matched_tracks)
}

/// Indices in `0..total` not present in `matched`.
pub fn get_unmatched(total: usize, matched: &[usize]) -> Vec<usize> {
    let mut is_matched = vec![false; total];
    for &idx in matched {
        is_matched[idx] = true;
    }
    (0..total).filter(|&i| !is_matched[i]).collect()
}
