// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================
//
// Types shared between engine modules: the patient input vector and the structures
// that make up a finished prediction. Everything here is request-local and built
// fresh per prediction; nothing borrows from the model bundle.

use crate::catalog::{FeatureCode, NUM_FEATURES};
use ndarray::Array1;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// A required clinical feature was absent from the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing required feature: {feature}")]
pub struct MissingFeatureError {
    pub feature: FeatureCode,
}

/// The 13 raw (unscaled) clinical measurements for one patient, stored in
/// canonical catalog order.
///
/// Construction through [`PatientFeatureVector::from_map`] guarantees every
/// feature is present; a value can never be missing once a vector exists.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientFeatureVector {
    values: [f64; NUM_FEATURES],
}

impl PatientFeatureVector {
    /// Builds a vector from a name→value map, checking completeness in
    /// catalog order. The first absent feature is reported by name.
    /// Unknown keys are ignored; the request boundary rejects them earlier.
    pub fn from_map(fields: &HashMap<String, f64>) -> Result<Self, MissingFeatureError> {
        let mut values = [0.0; NUM_FEATURES];
        for code in FeatureCode::ALL {
            match fields.get(code.as_str()) {
                Some(&value) => values[code.index()] = value,
                None => return Err(MissingFeatureError { feature: code }),
            }
        }
        Ok(Self { values })
    }

    /// Builds a vector directly from catalog-ordered values.
    pub fn from_ordered(values: [f64; NUM_FEATURES]) -> Self {
        Self { values }
    }

    /// The raw value of one feature.
    #[inline(always)]
    pub fn get(&self, code: FeatureCode) -> f64 {
        self.values[code.index()]
    }

    /// Catalog-ordered view of the raw values.
    #[inline(always)]
    pub fn as_slice(&self) -> &[f64; NUM_FEATURES] {
        &self.values
    }

    /// Copies the raw values into an owned `ndarray` vector.
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_iter(self.values.iter().copied())
    }
}

/// Which side of the population mean an abnormal value sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    High,
    Low,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::High => f.write_str("high"),
            Direction::Low => f.write_str("low"),
        }
    }
}

/// How far outside the population norm a flagged value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Moderate,
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Moderate => f.write_str("moderate"),
            Severity::Severe => f.write_str("severe"),
        }
    }
}

/// One feature flagged by the abnormality detector.
#[derive(Debug, Clone, Serialize)]
pub struct AbnormalFeature {
    pub feature: FeatureCode,
    pub feature_name: &'static str,
    /// Raw (unscaled) patient value.
    pub value: f64,
    /// Label for the raw value when the feature is integer-coded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readable_value: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    pub z_score: f64,
    pub direction: Direction,
    pub severity: Severity,
    pub clinical_context: &'static str,
}

/// One entry in the personalized feature-contribution ranking.
#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub feature: FeatureCode,
    pub feature_name: &'static str,
    /// Global model importance, rounded to 3 decimals.
    pub importance: f64,
    /// Importance amplified by the patient's anomaly, rounded to 3 decimals.
    pub contribution: f64,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readable_value: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
}

/// Five-bucket qualitative risk label derived from the predicted probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl RiskLevel {
    /// Maps a probability to its risk bucket:
    /// Very Low < 0.05 ≤ Low < 0.2 ≤ Moderate < 0.4 ≤ High < 0.6 ≤ Very High.
    pub fn from_probability(probability: f64) -> RiskLevel {
        if probability < 0.05 {
            RiskLevel::VeryLow
        } else if probability < 0.2 {
            RiskLevel::Low
        } else if probability < 0.4 {
            RiskLevel::Moderate
        } else if probability < 0.6 {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "Very Low",
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary risk category. The 0.5 cutoff is deliberately distinct from both the
/// 0.22 decision threshold and the [`RiskLevel`] buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskCategory {
    #[serde(rename = "High Risk")]
    HighRisk,
    #[serde(rename = "Low Risk")]
    LowRisk,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskCategory::HighRisk => f.write_str("High Risk"),
            RiskCategory::LowRisk => f.write_str("Low Risk"),
        }
    }
}

/// The classification block of a finished prediction.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Positive-class probability from the combining model, rounded to 3 decimals.
    pub heart_disease_probability: f64,
    /// 1 iff the probability cleared the 0.22 decision threshold.
    pub binary_prediction: u8,
    pub risk_level: RiskLevel,
    pub risk_category: RiskCategory,
}

/// Uncertainty block: percentages carry one decimal and always sum to 100.
#[derive(Debug, Clone, Serialize)]
pub struct UncertaintyReport {
    pub uncertainty_percent: f64,
    pub reliability_percent: f64,
    pub assessment: String,
}

/// Insight and recommendation strings, each capped at five entries.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicalInsights {
    pub key_insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// The complete output of one prediction request.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub prediction: Prediction,
    pub uncertainty: UncertaintyReport,
    /// Flagged features, most severe (largest |z|) first.
    pub abnormal_features: Vec<AbnormalFeature>,
    /// Contributions above the importance cutoff, highest contribution first.
    pub key_contributors: Vec<Contribution>,
    pub report_date: String,
    pub clinical_insights: ClinicalInsights,
    /// Rendered chart payload, opaque to the engine. Present only on request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<String>,
}

/// Rounds to one decimal place, matching the report's percentage formatting.
#[inline]
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Rounds to three decimal places, used for probabilities and importances.
#[inline]
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
