//! Uncertainty and Volatility Estimation
//!
//! ## Overview
//!
//! The estimator turns each window's class probabilities into the single
//! context score that drives the state machine. It combines two signals:
//!
//! 1. **Uncertainty**: how ambiguous this window's classification is
//! 2. **Volatility**: how much that ambiguity has been swinging recently
//!
//! A classifier that is *stably* unsure produces high uncertainty but low
//! volatility; one flipping between confident and unconfident produces high
//! volatility. Both deserve a faster broadcast cadence, for different reasons.
//!
//! ## Uncertainty
//!
//! Normalized Shannon entropy of the probability vector:
//! ```text
//! H = -Σ p_i · log2(p_i) / log2(n_classes)
//! ```
//! Entries at or below a floor of 1e-4 contribute zero, avoiding `log(0)`.
//! `H = 0` for a one-hot vector, `H = 1` for the uniform vector.
//!
//! ## Volatility
//!
//! The last `W` uncertainty values live in a ring. After each push:
//! ```text
//! std        = sample standard deviation of the ring
//! volatility = β · std + (1 - β) · volatility_prev
//! ```
//!
//! ## Context Score
//!
//! ```text
//! score = α · uncertainty + (1 - α) · volatility
//! ```
//! With α and β in `[0, 1]` and every ring value in `[0, 1]`, the score stays
//! in `[0, 1]`; it is clamped regardless so a bad configuration cannot push
//! it outside.
//!
//! The estimator knows nothing about state thresholds; it is a pure function
//! of its running state and the newest probability vector.

use crate::buffer::CircularBuffer;
use crate::constants::{MAX_VOLATILITY_WINDOW, PROBABILITY_FLOOR};

/// Derived confidence signal for one window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UncertaintyMetrics {
    /// Normalized entropy in `[0, 1]`
    pub uncertainty: f32,
    /// EWMA-smoothed standard deviation of recent uncertainty
    pub volatility: f32,
    /// Blended score in `[0, 1]`
    pub context_score: f32,
}

/// Normalized Shannon entropy of a probability vector
///
/// Returns `0.0` for fewer than two classes.
pub fn normalized_entropy(probs: &[f32]) -> f32 {
    if probs.len() < 2 {
        return 0.0;
    }

    let mut entropy = 0.0f32;
    for &p in probs {
        if p > PROBABILITY_FLOOR {
            entropy -= p * libm::log2f(p);
        }
    }

    (entropy / libm::log2f(probs.len() as f32)).clamp(0.0, 1.0)
}

/// Blend uncertainty and volatility into the context score
pub fn context_score(uncertainty: f32, volatility: f32, alpha: f32) -> f32 {
    (alpha * uncertainty + (1.0 - alpha) * volatility).clamp(0.0, 1.0)
}

/// Running uncertainty/volatility tracker
///
/// Owned exclusively by the main loop; never touched from interrupt context.
#[derive(Debug, Clone)]
pub struct UncertaintyEstimator {
    history: CircularBuffer<f32, MAX_VOLATILITY_WINDOW>,
    volatility_ewma: f32,
    alpha: f32,
    beta: f32,
    last: UncertaintyMetrics,
}

impl UncertaintyEstimator {
    /// Create an estimator
    ///
    /// `alpha` weights uncertainty in the context score, `beta` smooths
    /// volatility, `window` is the history length W (clamped to
    /// `1..=MAX_VOLATILITY_WINDOW`).
    pub fn new(alpha: f32, beta: f32, window: usize) -> Self {
        Self {
            history: CircularBuffer::with_capacity(window),
            volatility_ewma: 0.0,
            alpha: alpha.clamp(0.0, 1.0),
            beta: beta.clamp(0.0, 1.0),
            last: UncertaintyMetrics::default(),
        }
    }

    /// Fold in a new probability vector
    ///
    /// Callers validate the vector first (see
    /// [`validate_probabilities`](crate::classifier::validate_probabilities)).
    pub fn update(&mut self, probs: &[f32]) -> UncertaintyMetrics {
        self.update_uncertainty(normalized_entropy(probs))
    }

    /// Fold in an already computed uncertainty value
    pub fn update_uncertainty(&mut self, uncertainty: f32) -> UncertaintyMetrics {
        let uncertainty = uncertainty.clamp(0.0, 1.0);

        self.history.push(uncertainty);
        let spread = self.history.sample_std_dev();
        self.volatility_ewma = self.beta * spread + (1.0 - self.beta) * self.volatility_ewma;

        self.last = UncertaintyMetrics {
            uncertainty,
            volatility: self.volatility_ewma,
            context_score: context_score(uncertainty, self.volatility_ewma, self.alpha),
        };
        self.last
    }

    /// Metrics from the most recent update
    pub fn last(&self) -> UncertaintyMetrics {
        self.last
    }

    /// Unsmoothed standard deviation of the current history
    pub fn raw_volatility(&self) -> f32 {
        self.history.sample_std_dev()
    }

    /// Values currently in the history ring
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Context-score weight on uncertainty
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Volatility smoothing constant
    pub fn beta(&self) -> f32 {
        self.beta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_is_certain() {
        assert_eq!(normalized_entropy(&[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(normalized_entropy(&[0.0, 1.0]), 0.0);
    }

    #[test]
    fn two_class_coin_flip_is_exactly_one() {
        assert_eq!(normalized_entropy(&[0.5, 0.5]), 1.0);
    }

    #[test]
    fn uniform_is_maximal() {
        let u = normalized_entropy(&[0.25, 0.25, 0.25, 0.25]);
        assert!((u - 1.0).abs() < 1e-6);

        let third = 1.0 / 3.0;
        let u = normalized_entropy(&[third, third, third]);
        assert!((u - 1.0).abs() < 1e-5);
    }

    #[test]
    fn floor_ignores_tiny_probabilities() {
        assert_eq!(normalized_entropy(&[1.0, 0.00005]), 0.0);
        assert_eq!(normalized_entropy(&[1.0, PROBABILITY_FLOOR, 0.0]), 0.0);
    }

    #[test]
    fn degenerate_class_count() {
        assert_eq!(normalized_entropy(&[1.0]), 0.0);
        assert_eq!(normalized_entropy(&[]), 0.0);
    }

    #[test]
    fn constant_stream_has_zero_volatility() {
        let mut est = UncertaintyEstimator::new(0.7, 0.3, 5);
        for _ in 0..20 {
            let m = est.update(&[0.6, 0.3, 0.1]);
            assert_eq!(m.volatility, 0.0);
        }
    }

    #[test]
    fn flipping_confidence_raises_volatility() {
        let mut est = UncertaintyEstimator::new(0.7, 0.3, 6);
        let mut last = UncertaintyMetrics::default();
        for i in 0..12 {
            let probs: &[f32] = if i % 2 == 0 { &[1.0, 0.0, 0.0] } else { &[0.34, 0.33, 0.33] };
            last = est.update(probs);
        }
        assert!(last.volatility > 0.2, "volatility {}", last.volatility);
    }

    #[test]
    fn ewma_follows_recurrence() {
        let mut est = UncertaintyEstimator::new(0.5, 0.3, 4);
        est.update_uncertainty(0.0);
        let m = est.update_uncertainty(1.0);

        // Ring [0, 1]: sample std = sqrt(0.5)
        let expected = 0.3 * 0.5f32.sqrt();
        assert!((m.volatility - expected).abs() < 1e-6);
        assert!((m.context_score - (0.5 * 1.0 + 0.5 * expected)).abs() < 1e-6);
    }

    #[test]
    fn volatility_decays_once_history_settles() {
        let w = 4;
        let mut est = UncertaintyEstimator::new(0.7, 0.3, w);
        for u in [0.0, 1.0, 0.0, 1.0] {
            est.update_uncertainty(u);
        }
        let peak = est.last().volatility;

        for _ in 0..w {
            est.update_uncertainty(0.5);
        }
        // History is now constant: raw spread is gone
        assert_eq!(est.raw_volatility(), 0.0);

        let mut prev = est.last().volatility;
        assert!(prev < peak);
        for _ in 0..40 {
            let v = est.update_uncertainty(0.5).volatility;
            assert!(v <= prev);
            prev = v;
        }
        assert!(prev < 1e-4);
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(context_score(2.0, 2.0, 0.5), 1.0);
        assert_eq!(context_score(-1.0, 0.0, 1.0), 0.0);
    }
}
