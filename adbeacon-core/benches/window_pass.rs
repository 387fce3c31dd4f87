//! Cost of one full window pass against the loop budget
//!
//! Run on any host:
//!   cargo bench -p adbeacon-core
//!
//! The node's deadline is 100 ms per pass; host numbers should sit orders of
//! magnitude below that for the pipeline itself (classifier excluded).

use adbeacon_core::{
    buffer::CircularBuffer, classifier::ClassProbabilities, codec::StatusPacket,
    constants::MAX_WINDOW_SIZE, FeatureVector, MotionSample, StateMachine,
    Thresholds, UncertaintyEstimator, WindowExtractor,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn samples(n: usize) -> Vec<MotionSample> {
    (0..n)
        .map(|i| {
            let t = i as f32 * 0.02;
            MotionSample::new([t.sin() * 0.1, t.cos() * 0.1, 1.0], [t.sin(), 0.0, t.cos()])
        })
        .collect()
}

fn bench_feature_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_extraction");

    for &n in &[25usize, 50, 100, MAX_WINDOW_SIZE] {
        let mut window: CircularBuffer<MotionSample, MAX_WINDOW_SIZE> = CircularBuffer::with_capacity(n);
        for sample in samples(n) {
            window.push(sample);
        }
        group.bench_with_input(BenchmarkId::new("samples", n), &window, |b, window| {
            b.iter(|| FeatureVector::from_samples(black_box(window)))
        });
    }

    group.finish();
}

fn bench_estimator(c: &mut Criterion) {
    let probs = [0.6f32, 0.3, 0.1];
    let mut estimator = UncertaintyEstimator::new(0.7, 0.3, 10);

    c.bench_function("estimator_update", |b| {
        b.iter(|| estimator.update(black_box(&probs)))
    });
}

fn bench_full_pass(c: &mut Criterion) {
    let input = samples(50);
    let mut extractor = WindowExtractor::new(50, 50, 50.0, 5.0);
    let mut estimator = UncertaintyEstimator::new(0.7, 0.3, 10);
    let mut machine = StateMachine::new(Thresholds::default(), 2);
    let mut seq = 0u8;
    let mut now = 0u64;

    c.bench_function("window_pass_50", |b| {
        b.iter(|| {
            let mut features = None;
            for sample in &input {
                now += 20;
                if let Ok(Some(f)) = extractor.push(*sample, now) {
                    features = Some(f);
                }
            }
            let Some(features) = features else {
                return None;
            };

            let mut probs = ClassProbabilities::new();
            let energy = features.magnitude_range().min(1.0);
            let _ = probs.push(1.0 - energy);
            let _ = probs.push(energy * 0.5);
            let _ = probs.push(energy * 0.5);

            let metrics = estimator.update(&probs);
            machine.evaluate(metrics.context_score, 1000, now);
            seq = seq.wrapping_add(1);
            let packet = StatusPacket::new(seq, machine.current(), metrics.uncertainty, 90, now, 2000);
            Some(black_box(packet.encode()))
        })
    });
}

criterion_group!(benches, bench_feature_extraction, bench_estimator, bench_full_pass);
criterion_main!(benches);
