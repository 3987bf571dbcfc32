// ========================================================================================
//                          The Pre-Trained Ensemble Bundle
// ========================================================================================
//
// The bundle is the single trained artifact the engine serves: four base
// classifiers, the soft-voting combiner over them, the fitted feature scaler,
// and the population statistics used for z-score analysis. It is deserialized
// from a TOML file once at process start and shared immutably (behind an `Arc`)
// for the lifetime of the process. The engine never reloads or mutates it.

use crate::catalog::NUM_FEATURES;
use crate::forest::{BaggedForest, BoostedForest, ModelInferenceError, TreeValidationError};
use crate::types::PatientFeatureVector;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Number of base classifiers in the ensemble: two bagged, two boosted.
pub const NUM_BASE_MODELS: usize = 4;

/// Loading or validating the bundle artifact failed.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Model file not found at {path}. Train and export the ensemble first.")]
    NotFound { path: String },
    #[error("Failed to read or write model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Bundle has {found} {group} models, but exactly {expected} are required.")]
    WrongModelCount {
        group: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("Bundle vector '{vector}' has {found} entries, but the schema defines {expected} features.")]
    WrongVectorLength {
        vector: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("Model '{model}' has no trees.")]
    EmptyForest { model: String },
    #[error("Tree {tree} of model '{model}' is malformed: {source}")]
    InvalidTree {
        model: String,
        tree: usize,
        source: TreeValidationError,
    },
    #[error("Combiner has {found} weights, but the ensemble has {expected} base models.")]
    WrongWeightCount { found: usize, expected: usize },
    #[error("Combiner weights must be finite and sum to a positive value, got sum {sum}.")]
    DegenerateWeights { sum: f64 },
}

/// The affine transform fitted on the training population: `(x - center) / scale`.
///
/// A zero scale entry is normalized to 1 at load time (a constant training
/// column), so scaling never divides by zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub center: Array1<f64>,
    pub scale: Array1<f64>,
}

impl FeatureScaler {
    /// Applies the transform, producing the scaled vector the models consume.
    pub fn transform(&self, raw: &PatientFeatureVector) -> Array1<f64> {
        let mut scaled = raw.to_array();
        scaled -= &self.center;
        scaled /= &self.scale;
        scaled
    }

    fn normalize(&mut self) {
        self.scale.mapv_inplace(|s| if s == 0.0 { 1.0 } else { s });
    }
}

/// Per-feature population statistics from the training cohort, used for
/// z-score analysis on raw values. Never used for classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationStats {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

/// Soft-voting combiner: the meta-model probability is the weighted mean of
/// the base model probabilities. Absent weights mean a plain average.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftVotingCombiner {
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

impl SoftVotingCombiner {
    pub fn combine(&self, probabilities: &[f64; NUM_BASE_MODELS]) -> f64 {
        match &self.weights {
            Some(weights) => {
                let total: f64 = weights.iter().sum();
                probabilities
                    .iter()
                    .zip(weights)
                    .map(|(p, w)| p * w)
                    .sum::<f64>()
                    / total
            }
            None => probabilities.iter().sum::<f64>() / NUM_BASE_MODELS as f64,
        }
    }
}

/// The complete, immutable model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleBundle {
    /// The two bagging-style base classifiers, primary first. The primary
    /// model's stored importances drive the contribution ranking.
    pub bagged: Vec<BaggedForest>,
    /// The two boosting-style base classifiers.
    pub boosted: Vec<BoostedForest>,
    pub combiner: SoftVotingCombiner,
    pub scaler: FeatureScaler,
    pub population: PopulationStats,
}

impl EnsembleBundle {
    /// Loads and validates a bundle from a TOML artifact.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        if !path.exists() {
            return Err(BundleError::NotFound {
                path: path.display().to_string(),
            });
        }
        let contents = fs::read_to_string(path)?;
        let mut bundle: EnsembleBundle = toml::from_str(&contents)?;
        bundle.validate()?;
        bundle.scaler.normalize();
        log::info!(
            "Loaded ensemble bundle from {} ({} base models)",
            path.display(),
            NUM_BASE_MODELS
        );
        Ok(bundle)
    }

    /// Serializes the bundle to a TOML artifact. Used by export tooling and
    /// test fixtures; the serving path only ever loads.
    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        let serialized = toml::to_string_pretty(self)?;
        let file = fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(serialized.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Checks every shape invariant the engine relies on afterwards.
    pub fn validate(&self) -> Result<(), BundleError> {
        if self.bagged.len() != 2 {
            return Err(BundleError::WrongModelCount {
                group: "bagged",
                found: self.bagged.len(),
                expected: 2,
            });
        }
        if self.boosted.len() != 2 {
            return Err(BundleError::WrongModelCount {
                group: "boosted",
                found: self.boosted.len(),
                expected: 2,
            });
        }
        check_vector("scaler.center", self.scaler.center.len())?;
        check_vector("scaler.scale", self.scaler.scale.len())?;
        check_vector("population.mean", self.population.mean.len())?;
        check_vector("population.std", self.population.std.len())?;
        if let Some(weights) = &self.combiner.weights {
            if weights.len() != NUM_BASE_MODELS {
                return Err(BundleError::WrongWeightCount {
                    found: weights.len(),
                    expected: NUM_BASE_MODELS,
                });
            }
            // `combine` divides by the weight sum; a non-positive or
            // non-finite sum would turn every probability into NaN.
            let sum: f64 = weights.iter().sum();
            if !weights.iter().all(|w| w.is_finite()) || !(sum > 0.0) {
                return Err(BundleError::DegenerateWeights { sum });
            }
        }
        for (i, model) in self.bagged.iter().enumerate() {
            check_vector("feature_importances", model.feature_importances.len())?;
            validate_forest(&format!("bagged[{i}]"), &model.trees)?;
        }
        for (i, model) in self.boosted.iter().enumerate() {
            validate_forest(&format!("boosted[{i}]"), &model.trees)?;
        }
        Ok(())
    }

    /// Scales a raw patient vector with the fitted scaler.
    pub fn scale(&self, raw: &PatientFeatureVector) -> Array1<f64> {
        self.scaler.transform(raw)
    }

    /// Single-pass positive-class probabilities of the four base models, in
    /// bundle order: bagged primary, bagged secondary, boosted pair.
    pub fn base_probabilities(
        &self,
        scaled: ArrayView1<'_, f64>,
    ) -> Result<[f64; NUM_BASE_MODELS], ModelInferenceError> {
        Ok([
            self.bagged[0].positive_probability(scaled)?,
            self.bagged[1].positive_probability(scaled)?,
            self.boosted[0].positive_probability(scaled)?,
            self.boosted[1].positive_probability(scaled)?,
        ])
    }

    /// The combining meta-model's positive-class probability.
    pub fn combined_probability(
        &self,
        scaled: ArrayView1<'_, f64>,
    ) -> Result<f64, ModelInferenceError> {
        let base = self.base_probabilities(scaled)?;
        Ok(self.combiner.combine(&base))
    }

    /// Global importances of the primary bagged model, catalog-ordered.
    /// This is the importance source for the contribution ranking.
    #[inline]
    pub fn primary_importances(&self) -> &[f64] {
        &self.bagged[0].feature_importances
    }
}

fn check_vector(vector: &'static str, found: usize) -> Result<(), BundleError> {
    if found != NUM_FEATURES {
        return Err(BundleError::WrongVectorLength {
            vector,
            found,
            expected: NUM_FEATURES,
        });
    }
    Ok(())
}

fn validate_forest(model: &str, trees: &[crate::forest::Tree]) -> Result<(), BundleError> {
    if trees.is_empty() {
        return Err(BundleError::EmptyForest {
            model: model.to_string(),
        });
    }
    for (tree, t) in trees.iter().enumerate() {
        t.validate(NUM_FEATURES)
            .map_err(|source| BundleError::InvalidTree {
                model: model.to_string(),
                tree,
                source,
            })?;
    }
    Ok(())
}
