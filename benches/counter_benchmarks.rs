//! Counting benchmarks using Criterion.
//!
//! Run with: cargo bench

use std::collections::HashSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use headcount_rs::{
    CategorySet, Classification, CountingSession, DedupTracker, Detection, Identity, NullReport,
    ScoreClassifier, SessionConfig,
};

/// Detections laid out on a grid far enough apart to never cross-match.
fn create_test_detections(n: usize, frame: usize) -> Vec<Detection> {
    (0..n)
        .map(|i| {
            let x = (i % 10) as f64 * 200.0 + frame as f64;
            let y = (i / 10) as f64 * 200.0;
            let score = if i % 2 == 0 { 0.9 } else { 0.1 };
            Detection::from_bbox(x, y, 40.0, 40.0)
                .expect("valid detection")
                .with_scores(vec![score, 1.0 - score])
        })
        .collect()
}

fn benchmark_observe_counted_identities(c: &mut Criterion) {
    let mut tracker = DedupTracker::new(CategorySet::default());
    let identities: Vec<Identity> = (0..100).map(Identity::from_track_id).collect();
    let classification = Classification::new("male", 0.9);
    for identity in &identities {
        tracker.observe(identity, Some(&classification), 0).expect("valid observation");
    }

    c.bench_function("observe_100_counted_identities", |b| {
        b.iter(|| {
            for identity in &identities {
                tracker
                    .observe(black_box(identity), Some(&classification), 1)
                    .expect("valid observation");
            }
        })
    });
}

fn benchmark_reconcile_active(c: &mut Criterion) {
    let identities: Vec<Identity> = (0..100).map(Identity::from_track_id).collect();
    let present: HashSet<Identity> = identities.iter().step_by(2).cloned().collect();
    let classification = Classification::new("female", 0.8);

    c.bench_function("reconcile_100_active_half_present", |b| {
        b.iter(|| {
            let mut tracker = DedupTracker::new(CategorySet::default());
            for identity in &identities {
                tracker.observe(identity, Some(&classification), 0).expect("valid observation");
            }
            tracker.reconcile_active(black_box(&present))
        })
    });
}

fn benchmark_session_frame_50_people(c: &mut Criterion) {
    let config = SessionConfig::default();
    let classifier = ScoreClassifier::new(config.categories.clone(), 0.6);
    let mut session = CountingSession::new(config, classifier, NullReport).expect("valid session");
    let mut frame = 0;

    c.bench_function("session_frame_50_people", |b| {
        b.iter(|| {
            frame += 1;
            let detections = create_test_detections(50, frame % 20);
            session.process_frame(black_box(&detections)).expect("frame processed");
        })
    });
}

criterion_group!(
    benches,
    benchmark_observe_counted_identities,
    benchmark_reconcile_active,
    benchmark_session_frame_50_people,
);
criterion_main!(benches);
