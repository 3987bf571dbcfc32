// ========================================================================================
//                            Bootstrap Uncertainty Estimation
// ========================================================================================
//
// Quantifies how trustworthy a single prediction is by combining two signals:
//
// 1. **Bootstrap spread**: the scaled input is re-evaluated under small
//    Gaussian perturbations (N(0, 0.05) per feature, independently drawn each
//    iteration); the standard deviation of the per-iteration base-model
//    averages measures sensitivity to measurement noise.
// 2. **Model disagreement**: the variance of the four base models' unperturbed
//    probabilities measures how much the ensemble argues with itself.
//
// The two are combined in quadrature and scaled to a percentage. The bootstrap
// loop is bounded (default 50 iterations) and materializes the full sample
// sequence before computing statistics.
//
// The routine is deliberately generic over the random source: the serving path
// seeds from entropy, tests inject a seeded `StdRng` for exact reproducibility.

use crate::bundle::EnsembleBundle;
use crate::forest::ModelInferenceError;
use crate::types::round1;
use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Default number of bootstrap iterations.
pub const DEFAULT_BOOTSTRAP_SAMPLES: usize = 50;

/// Standard deviation of the per-feature perturbation noise, in scaled units.
pub const NOISE_STD: f64 = 0.05;

/// Default factor mapping combined uncertainty to a percentage. Chosen so
/// typical combined values land in 0–100; the result is clamped at 100.
pub const DEFAULT_PERCENT_SCALE: f64 = 400.0;

/// The uncertainty verdict for one prediction. Percentages carry one decimal
/// and sum to exactly 100.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyEstimate {
    pub uncertainty_percent: f64,
    pub reliability_percent: f64,
}

impl UncertaintyEstimate {
    /// Qualitative reading of the uncertainty percentage.
    pub fn assessment(&self) -> String {
        let verdict = if self.uncertainty_percent < 20.0 {
            "highly reliable"
        } else if self.uncertainty_percent < 50.0 {
            "moderately reliable"
        } else {
            "uncertain - consider additional tests"
        };
        format!("Prediction is {verdict}")
    }

    /// Uncertainty as a fraction in [0, 1], as consumed by the insight rules.
    #[inline]
    pub fn fraction(&self) -> f64 {
        self.uncertainty_percent / 100.0
    }
}

/// Estimates prediction uncertainty for one scaled patient vector.
///
/// `percent_scale` is configurable but defaults to [`DEFAULT_PERCENT_SCALE`];
/// the empirical constant is part of the served behavior.
pub fn estimate_uncertainty<R: Rng + ?Sized>(
    scaled: ArrayView1<'_, f64>,
    bundle: &EnsembleBundle,
    bootstrap_samples: usize,
    percent_scale: f64,
    rng: &mut R,
) -> Result<UncertaintyEstimate, ModelInferenceError> {
    let noise = Normal::new(0.0, NOISE_STD).expect("noise std is a positive constant");

    // Monte-Carlo loop: the whole sample sequence is materialized because the
    // spread statistic needs it complete.
    let mut samples = Vec::with_capacity(bootstrap_samples);
    let mut perturbed = Array1::zeros(scaled.len());
    for _ in 0..bootstrap_samples {
        for (out, value) in perturbed.iter_mut().zip(scaled.iter()) {
            *out = value + noise.sample(rng);
        }
        let base = bundle.base_probabilities(perturbed.view())?;
        samples.push(base.iter().sum::<f64>() / base.len() as f64);
    }
    let bootstrap_variance = population_variance(&samples);

    let single_pass = bundle.base_probabilities(scaled)?;
    let model_variance = population_variance(&single_pass);

    let combined = (bootstrap_variance + model_variance).sqrt();
    let uncertainty_percent = round1((combined * percent_scale).min(100.0));

    Ok(UncertaintyEstimate {
        uncertainty_percent,
        // Derived after rounding so the two percentages always sum to 100.
        reliability_percent: 100.0 - uncertainty_percent,
    })
}

/// Population (ddof = 0) variance; 0 for an empty sequence.
fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
