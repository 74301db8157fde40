//! Property tests for the dedup tracker invariants.
//!
//! Random interleavings of observe and reconcile calls must never count an
//! identity twice, never forget a counted identity and never keep an active
//! record for an identity absent from the last reconcile.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use headcount_rs::{CategorySet, Classification, DedupTracker, Identity, Observation};

const LABELS: [&str; 3] = ["A", "B", "C"];

#[derive(Debug, Clone)]
enum Op {
    Observe {
        identity: u8,
        category: Option<usize>,
        confidence: f64,
    },
    Reconcile(Vec<u8>),
    NextFrame,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..12, proptest::option::of(0usize..LABELS.len()), 0.0f64..=1.0).prop_map(
            |(identity, category, confidence)| Op::Observe {
                identity,
                category,
                confidence,
            }
        ),
        1 => proptest::collection::vec(0u8..12, 0..6).prop_map(Op::Reconcile),
        1 => Just(Op::NextFrame),
    ]
}

fn ident(n: u8) -> Identity {
    Identity::from_track_id(n as u64)
}

proptest! {
    #[test]
    fn prop_dedup_invariants_hold(ops in proptest::collection::vec(op_strategy(), 1..200)) {
        let mut tracker = DedupTracker::new(CategorySet::new(LABELS).unwrap());
        let mut credits: HashMap<Identity, u32> = HashMap::new();
        let mut ever_counted: HashSet<Identity> = HashSet::new();
        let mut frame = 0u64;

        for op in ops {
            match op {
                Op::Observe { identity, category, confidence } => {
                    let identity = ident(identity);
                    let classification = category.map(|c| Classification::new(LABELS[c], confidence));
                    let total_before = tracker.counters().total();

                    let obs = tracker.observe(&identity, classification.as_ref(), frame).unwrap();

                    if obs == Observation::Counted {
                        *credits.entry(identity.clone()).or_insert(0) += 1;
                        prop_assert_eq!(tracker.counters().total(), total_before + 1);
                    } else {
                        prop_assert_eq!(tracker.counters().total(), total_before);
                    }
                    if tracker.is_counted(&identity) {
                        ever_counted.insert(identity);
                    }
                }
                Op::Reconcile(present) => {
                    let present: HashSet<Identity> = present.into_iter().map(ident).collect();
                    let counted_before = tracker.counted_len();

                    tracker.reconcile_active(&present);

                    prop_assert_eq!(tracker.counted_len(), counted_before);
                    for (identity, _) in tracker.active_records() {
                        prop_assert!(present.contains(identity));
                    }
                }
                Op::NextFrame => frame += 1,
            }

            let sum: u64 = tracker.counters().iter().map(|(_, n)| n).sum();
            prop_assert_eq!(tracker.counters().total(), sum);
            for identity in &ever_counted {
                prop_assert!(tracker.is_counted(identity));
            }
        }

        for (_, n) in credits {
            prop_assert_eq!(n, 1);
        }
        prop_assert_eq!(tracker.counted_len() as u64, tracker.counters().total());
    }

    #[test]
    fn prop_invalid_confidence_never_mutates(confidence in prop_oneof![1.0001f64..10.0, -10.0f64..-0.0001]) {
        let mut tracker = DedupTracker::new(CategorySet::new(LABELS).unwrap());
        let identity = ident(1);

        let result = tracker.observe(&identity, Some(&Classification::new("A", confidence)), 1);

        prop_assert!(result.is_err());
        prop_assert!(!tracker.is_counted(&identity));
        prop_assert_eq!(tracker.counters().total(), 0);
        prop_assert_eq!(tracker.active_len(), 0);
    }
}
