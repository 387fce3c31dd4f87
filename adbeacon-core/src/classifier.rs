//! Classifier adapter
//!
//! The activity model itself lives outside this crate (a quantized network,
//! a decision tree, a lookup table). The node only needs a pure, synchronous
//! function from a [`FeatureVector`] to class probabilities, and a check that
//! the output honours its contract before it reaches the estimator.

use heapless::Vec;

use crate::constants::{MAX_CLASSES, PROBABILITY_SUM_TOLERANCE};
use crate::errors::{CoreError, CoreResult};
use crate::features::FeatureVector;

/// Classifier output: one probability per class, summing to 1.0
pub type ClassProbabilities = Vec<f32, MAX_CLASSES>;

/// Activity classifier
///
/// Implementations must be side-effect free and bounded in run time; the
/// node times every call against its loop budget.
pub trait Classifier {
    /// Number of classes this model reports
    fn num_classes(&self) -> usize;

    /// Class probabilities for one window
    fn classify(&self, features: &FeatureVector) -> ClassProbabilities;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn num_classes(&self) -> usize {
        (**self).num_classes()
    }

    fn classify(&self, features: &FeatureVector) -> ClassProbabilities {
        (**self).classify(features)
    }
}

/// Check a probability vector against the classifier contract
///
/// Rejects a wrong class count, any entry that is not a finite number in
/// `[0, 1]`, and sums further than ±0.01 from one.
pub fn validate_probabilities(probs: &[f32], expected_classes: usize) -> CoreResult<()> {
    if probs.len() != expected_classes {
        return Err(CoreError::ClassCountMismatch {
            expected: expected_classes,
            actual: probs.len(),
        });
    }

    if probs.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
        return Err(CoreError::ProbabilityOutOfRange);
    }

    let sum: f32 = probs.iter().sum();
    if libm::fabsf(sum - 1.0) > PROBABILITY_SUM_TOLERANCE {
        return Err(CoreError::ProbabilitySum { sum });
    }

    Ok(())
}
