//! Duplicate-invoice probability model.

use sieve_core::model::FeatureVector;

/// Fixed feature weights for the fallback logistic regression, in
/// [`sieve_core::model::FEATURE_ORDER`] order.
const WEIGHTS: [f64; 13] = [
    -1.2, -0.03, 0.8, 0.3, 0.2, -0.4, -0.1, -1.5, 1.6, -1.8, -0.4, -0.05, 2.2,
];
const BIAS: f64 = -0.3;

/// Predicts the probability that `features` describes a true duplicate
/// pair. No trained artifact is wired up in this deployment, so every
/// call uses the fallback logistic regression.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateModel;

impl DuplicateModel {
    pub fn new() -> Self {
        Self
    }

    /// `predict(features) -> p`, `p` in `[0, 1]`.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let x = features.as_array();
        let z: f64 = WEIGHTS.iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f64>() + BIAS;
        sigmoid(z)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
