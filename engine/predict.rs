// ========================================================================================
//                           The Prediction Orchestrator
// ========================================================================================
//
// Composes scaling, classification, uncertainty estimation, abnormality
// detection, contribution ranking, insight generation and (optionally) chart
// rendering into one `PredictionResult`. The orchestrator holds no state of
// its own: the bundle is an immutable shared handle passed in by the caller,
// and every intermediate vector is request-local.
//
// Three thresholds coexist on purpose and must never be unified:
//
// - 0.22: the binary decision cutoff, biased toward sensitivity;
// - 0.5:  the "High Risk" category boundary;
// - the five risk-level buckets (0.05 / 0.2 / 0.4 / 0.6).

use crate::analysis::{self, DEFAULT_Z_THRESHOLD};
use crate::bundle::EnsembleBundle;
use crate::chart;
use crate::forest::ModelInferenceError;
use crate::insights::generate_insights;
use crate::types::{
    MissingFeatureError, PatientFeatureVector, Prediction, PredictionResult, RiskCategory,
    RiskLevel, UncertaintyReport, round3,
};
use crate::uncertainty::{
    DEFAULT_BOOTSTRAP_SAMPLES, DEFAULT_PERCENT_SCALE, estimate_uncertainty,
};
use chrono::Local;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use thiserror::Error;

/// Probability at or above which the binary prediction is positive.
/// Deliberately far below 0.5: missing disease is costlier than a false alarm.
pub const DECISION_THRESHOLD: f64 = 0.22;

/// Probability at or above which the binary risk category is "High Risk".
pub const HIGH_RISK_THRESHOLD: f64 = 0.5;

/// A prediction request failed.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error(transparent)]
    MissingFeature(#[from] MissingFeatureError),
    #[error("Model inference failed: {0}")]
    Inference(#[from] ModelInferenceError),
}

/// Tunable knobs of one prediction request. `Default` matches the served
/// configuration.
#[derive(Debug, Clone)]
pub struct PredictOptions {
    /// Bootstrap iterations for the uncertainty estimate.
    pub bootstrap_samples: usize,
    /// |z| threshold for flagging abnormal features.
    pub z_threshold: f64,
    /// Factor mapping combined uncertainty to a percentage.
    pub uncertainty_scale: f64,
    /// Render the z-score chart into the result.
    pub with_chart: bool,
    /// Fixed RNG seed for the bootstrap. `None` seeds from entropy; set it to
    /// make the uncertainty estimate reproducible.
    pub rng_seed: Option<u64>,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            bootstrap_samples: DEFAULT_BOOTSTRAP_SAMPLES,
            z_threshold: DEFAULT_Z_THRESHOLD,
            uncertainty_scale: DEFAULT_PERCENT_SCALE,
            with_chart: false,
            rng_seed: None,
        }
    }
}

/// Runs the full prediction pipeline for one patient.
pub fn predict(
    patient: &PatientFeatureVector,
    bundle: &EnsembleBundle,
    options: &PredictOptions,
) -> Result<PredictionResult, PredictionError> {
    let scaled = bundle.scale(patient);
    let probability = bundle.combined_probability(scaled.view())?;
    let binary_prediction = u8::from(probability >= DECISION_THRESHOLD);

    // The three analyses are independent reads of immutable inputs. The two
    // z-score read-outs share a rayon fork; the bootstrap runs alongside on
    // this thread since it dominates the request's compute anyway.
    let scaled_view = scaled.view();
    let (uncertainty, (abnormal_features, key_contributors)) = rayon::join(
        || {
            let mut rng: StdRng = match options.rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            estimate_uncertainty(
                scaled_view,
                bundle,
                options.bootstrap_samples,
                options.uncertainty_scale,
                &mut rng,
            )
        },
        || {
            rayon::join(
                || analysis::detect_abnormal(patient, &bundle.population, options.z_threshold),
                || {
                    analysis::rank_contributions(
                        patient,
                        &bundle.population,
                        bundle.primary_importances(),
                    )
                },
            )
        },
    );
    let uncertainty = uncertainty?;

    let clinical_insights = generate_insights(
        probability,
        uncertainty.fraction(),
        &abnormal_features,
        &key_contributors,
    );

    let risk_level = RiskLevel::from_probability(probability);
    let prediction = Prediction {
        heart_disease_probability: round3(probability),
        binary_prediction,
        risk_level,
        risk_category: if probability >= HIGH_RISK_THRESHOLD {
            RiskCategory::HighRisk
        } else {
            RiskCategory::LowRisk
        },
    };

    log::debug!(
        "prediction: p={:.3} level={} uncertainty={:.1}% abnormal={}",
        probability,
        risk_level,
        uncertainty.uncertainty_percent,
        abnormal_features.len()
    );

    let visualization = options.with_chart.then(|| {
        chart::render_z_score_chart(
            patient,
            &bundle.population,
            probability,
            uncertainty.reliability_percent,
            risk_level,
        )
    });

    Ok(PredictionResult {
        prediction,
        uncertainty: UncertaintyReport {
            uncertainty_percent: uncertainty.uncertainty_percent,
            reliability_percent: uncertainty.reliability_percent,
            assessment: uncertainty.assessment(),
        },
        abnormal_features,
        key_contributors,
        report_date: Local::now().format("%B %d, %Y").to_string(),
        clinical_insights,
        visualization,
    })
}

/// Convenience entry point for callers holding a name→value map: builds the
/// patient vector (failing on the first missing feature) and predicts.
pub fn predict_from_values(
    fields: &HashMap<String, f64>,
    bundle: &EnsembleBundle,
    options: &PredictOptions,
) -> Result<PredictionResult, PredictionError> {
    let patient = PatientFeatureVector::from_map(fields)?;
    predict(&patient, bundle, options)
}
