//! Property tests for the estimator, state machine, and codec

use adbeacon_core::{
    codec::{quantize_uncertainty, StatusPacket},
    estimator::normalized_entropy,
    ActivityState, StateMachine, Thresholds, UncertaintyEstimator,
};
use proptest::prelude::*;

/// Probability vectors of 2..=8 classes summing to one
fn distribution() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(0.0f32..1.0, 2..=8).prop_filter_map("all-zero weights", |weights| {
        let total: f32 = weights.iter().sum();
        if total <= 1e-3 {
            return None;
        }
        Some(weights.iter().map(|w| w / total).collect())
    })
}

fn any_state() -> impl Strategy<Value = ActivityState> {
    prop::sample::select(ActivityState::ALL.to_vec())
}

proptest! {
    #[test]
    fn uncertainty_is_bounded(probs in distribution()) {
        let u = normalized_entropy(&probs);
        prop_assert!((0.0..=1.0).contains(&u), "u = {}", u);
    }

    #[test]
    fn one_hot_is_zero(n in 2usize..=8, hot in 0usize..8) {
        let mut probs = vec![0.0f32; n];
        probs[hot % n] = 1.0;
        prop_assert_eq!(normalized_entropy(&probs), 0.0);
    }

    #[test]
    fn uniform_is_one(n in 2usize..=8) {
        let probs = vec![1.0 / n as f32; n];
        prop_assert!((normalized_entropy(&probs) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn constant_stream_settles_to_zero_spread(probs in distribution(), w in 2usize..=16) {
        let mut est = UncertaintyEstimator::new(0.7, 0.3, w);
        for _ in 0..w {
            est.update(&probs);
        }
        prop_assert_eq!(est.raw_volatility(), 0.0);
    }

    #[test]
    fn score_stays_in_unit_interval(
        stream in prop::collection::vec(distribution(), 1..40),
        alpha in 0.0f32..=1.0,
        beta in 0.0f32..=1.0,
    ) {
        let mut est = UncertaintyEstimator::new(alpha, beta, 10);
        for probs in &stream {
            let m = est.update(probs);
            prop_assert!((0.0..=1.0).contains(&m.context_score));
            prop_assert!(m.volatility >= 0.0);
        }
    }

    #[test]
    fn stable_score_never_transitions_twice(score in 0.0f32..=1.0, repeats in 2usize..50) {
        let mut machine = StateMachine::new(Thresholds::default(), 1);
        machine.evaluate(score, 100, 0);
        machine.evaluate(score, 100, 100);
        let count = machine.transition_count();

        // Quiet → Uncertain → Active takes at most two evaluations
        for i in 0..repeats {
            prop_assert!(machine.evaluate(score, 100, 200 + i as u64 * 100).is_none());
        }
        prop_assert_eq!(machine.transition_count(), count);
    }

    #[test]
    fn inner_band_never_returns_to_quiet(
        scores in prop::collection::vec(0.2501f32..0.2999, 1..60),
    ) {
        let mut machine = StateMachine::new(Thresholds::default(), 1);
        machine.evaluate(0.45, 100, 0);
        prop_assert_eq!(machine.current(), ActivityState::Uncertain);

        for (i, score) in scores.iter().enumerate() {
            machine.evaluate(*score, 100, (i as u64 + 1) * 100);
            prop_assert_eq!(machine.current(), ActivityState::Uncertain);
        }
    }

    #[test]
    fn codec_round_trip(
        seq in any::<u8>(),
        state in any_state(),
        uncertainty in 0.0f32..=1.0,
        battery in 0u8..=100,
        ts in any::<u32>(),
        interval in 20u32..=10_240,
        accel in any::<[i16; 3]>(),
    ) {
        let packet = StatusPacket::new(seq, state, uncertainty, battery, ts as u64, interval).with_accel(accel);
        let decoded = StatusPacket::decode(&packet.encode()).unwrap();

        prop_assert_eq!(decoded.sequence, seq);
        prop_assert_eq!(decoded.state, state);
        prop_assert_eq!(decoded.battery_pct, battery);
        prop_assert_eq!(decoded.timestamp_ms, ts);
        prop_assert_eq!(decoded.interval_ms as u32, interval);
        prop_assert_eq!(decoded.accel_milli_g, accel);
        prop_assert!((decoded.uncertainty() - uncertainty).abs() <= 1.0 / 255.0);
        prop_assert_eq!(decoded.uncertainty_q8, quantize_uncertainty(uncertainty));
    }

    #[test]
    fn decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = StatusPacket::decode(&bytes);
    }
}
