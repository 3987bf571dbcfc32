// ========================================================================================
//                        Per-Patient Statistical Feature Analysis
// ========================================================================================
//
// Everything here works on raw (unscaled) patient values against the training
// population statistics. Z-scores drive two independent read-outs:
//
// - the abnormality detector flags features far from the population norm, and
// - the contribution ranker personalizes the model's global importances by
//   amplifying features that are anomalous for this particular patient.
//
// Neither read-out ever feeds back into classification.

use crate::bundle::PopulationStats;
use crate::catalog::{CATALOG, NUM_FEATURES};
use crate::types::{AbnormalFeature, Contribution, Direction, PatientFeatureVector, Severity, round3};
use ndarray::Array1;

/// Default |z| threshold above which a feature is flagged.
pub const DEFAULT_Z_THRESHOLD: f64 = 1.5;

/// |z| above which a flagged feature is graded severe rather than moderate.
pub const SEVERE_Z: f64 = 2.5;

/// Importance cutoff below which a feature is excluded from the contribution
/// ranking.
pub const IMPORTANCE_CUTOFF: f64 = 0.02;

/// Standardized deviations of the raw patient values from the population, in
/// catalog order. A feature with zero population spread gets z = 0 rather
/// than a division by zero; a constant column can never be abnormal.
pub fn z_scores(patient: &PatientFeatureVector, population: &PopulationStats) -> Array1<f64> {
    let mut z = Array1::zeros(NUM_FEATURES);
    for i in 0..NUM_FEATURES {
        let std = population.std[i];
        if std != 0.0 {
            z[i] = (patient.as_slice()[i] - population.mean[i]) / std;
        }
    }
    z
}

/// Flags features whose |z| meets `threshold`, most severe first.
///
/// The sort is stable and descending on |z|, so ties keep catalog order.
pub fn detect_abnormal(
    patient: &PatientFeatureVector,
    population: &PopulationStats,
    threshold: f64,
) -> Vec<AbnormalFeature> {
    let z = z_scores(patient, population);
    let mut flagged: Vec<AbnormalFeature> = CATALOG
        .iter()
        .filter_map(|info| {
            let z_score = z[info.code.index()];
            if z_score.abs() < threshold {
                return None;
            }
            let value = patient.get(info.code);
            Some(AbnormalFeature {
                feature: info.code,
                feature_name: info.name,
                value,
                readable_value: info.label_for(value),
                unit: info.unit,
                z_score,
                direction: if z_score > 0.0 {
                    Direction::High
                } else {
                    Direction::Low
                },
                severity: if z_score.abs() > SEVERE_Z {
                    Severity::Severe
                } else {
                    Severity::Moderate
                },
                clinical_context: info.clinical_context,
            })
        })
        .collect();
    flagged.sort_by(|a, b| b.z_score.abs().total_cmp(&a.z_score.abs()));
    flagged
}

/// Ranks features by personalized contribution, highest first.
///
/// contribution = importance × (1 + 0.5·|z|): the model's global weight,
/// amplified by how anomalous the feature is for this patient. Features at
/// the population mean contribute their importance unscaled. Only features
/// with importance above [`IMPORTANCE_CUTOFF`] appear.
pub fn rank_contributions(
    patient: &PatientFeatureVector,
    population: &PopulationStats,
    importances: &[f64],
) -> Vec<Contribution> {
    let z = z_scores(patient, population);
    let mut ranked: Vec<Contribution> = CATALOG
        .iter()
        .filter_map(|info| {
            let importance = importances[info.code.index()];
            if importance <= IMPORTANCE_CUTOFF {
                return None;
            }
            let contribution = importance * (1.0 + 0.5 * z[info.code.index()].abs());
            let value = patient.get(info.code);
            let readable_value = info.label_for(value);
            Some(Contribution {
                feature: info.code,
                feature_name: info.name,
                importance: round3(importance),
                contribution: round3(contribution),
                value,
                readable_value,
                // Units only annotate continuous values; a labeled code speaks
                // for itself.
                unit: if readable_value.is_none() { info.unit } else { None },
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FeatureCode;
    use approx::assert_relative_eq;

    fn population(mean: f64, std: f64) -> PopulationStats {
        PopulationStats {
            mean: Array1::from_elem(NUM_FEATURES, mean),
            std: Array1::from_elem(NUM_FEATURES, std),
        }
    }

    fn patient_at(mut baseline: [f64; NUM_FEATURES], overrides: &[(FeatureCode, f64)]) -> PatientFeatureVector {
        for (code, value) in overrides {
            baseline[code.index()] = *value;
        }
        PatientFeatureVector::from_ordered(baseline)
    }

    #[test]
    fn cholesterol_four_sigma_is_flagged_severe_high() {
        let mut pop = population(200.0, 50.0);
        pop.mean[FeatureCode::Chol.index()] = 200.0;
        pop.std[FeatureCode::Chol.index()] = 50.0;
        let patient = patient_at([200.0; NUM_FEATURES], &[(FeatureCode::Chol, 400.0)]);

        let flagged = detect_abnormal(&patient, &pop, DEFAULT_Z_THRESHOLD);
        assert_eq!(flagged.len(), 1);
        let chol = &flagged[0];
        assert_eq!(chol.feature, FeatureCode::Chol);
        assert_relative_eq!(chol.z_score, 4.0);
        assert_eq!(chol.direction, Direction::High);
        assert_eq!(chol.severity, Severity::Severe);
        assert_eq!(chol.unit, Some("mg/dl"));
    }

    #[test]
    fn patient_at_population_mean_has_no_abnormal_features() {
        let pop = population(120.0, 10.0);
        let patient = patient_at([120.0; NUM_FEATURES], &[]);
        assert!(detect_abnormal(&patient, &pop, DEFAULT_Z_THRESHOLD).is_empty());
    }

    #[test]
    fn raising_the_threshold_never_flags_more() {
        let pop = population(100.0, 10.0);
        let patient = patient_at(
            [100.0; NUM_FEATURES],
            &[
                (FeatureCode::Age, 118.0),
                (FeatureCode::Chol, 131.0),
                (FeatureCode::Thalach, 60.0),
            ],
        );
        let mut previous = usize::MAX;
        for threshold in [0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.5] {
            let count = detect_abnormal(&patient, &pop, threshold).len();
            assert!(count <= previous);
            previous = count;
        }
    }

    #[test]
    fn flags_are_ordered_by_absolute_z_descending() {
        let pop = population(0.0, 1.0);
        let patient = patient_at(
            [0.0; NUM_FEATURES],
            &[
                (FeatureCode::Age, 2.0),
                (FeatureCode::Thalach, -3.5),
                (FeatureCode::Oldpeak, 2.6),
            ],
        );
        let flagged = detect_abnormal(&patient, &pop, DEFAULT_Z_THRESHOLD);
        let codes: Vec<FeatureCode> = flagged.iter().map(|f| f.feature).collect();
        assert_eq!(
            codes,
            vec![FeatureCode::Thalach, FeatureCode::Oldpeak, FeatureCode::Age]
        );
        assert_eq!(flagged[0].direction, Direction::Low);
    }

    #[test]
    fn zero_population_std_never_divides() {
        let pop = population(50.0, 0.0);
        let patient = patient_at([999.0; NUM_FEATURES], &[]);
        let z = z_scores(&patient, &pop);
        assert!(z.iter().all(|v| *v == 0.0));
        assert!(detect_abnormal(&patient, &pop, DEFAULT_Z_THRESHOLD).is_empty());
    }

    #[test]
    fn contributions_keep_only_significant_importances() {
        let pop = population(0.0, 1.0);
        let patient = patient_at([0.0; NUM_FEATURES], &[]);
        let mut importances = vec![0.01; NUM_FEATURES];
        importances[FeatureCode::Cp.index()] = 0.3;
        importances[FeatureCode::Thalach.index()] = 0.2;
        importances[FeatureCode::Ca.index()] = 0.02; // at the cutoff: excluded

        let ranked = rank_contributions(&patient, &pop, &importances);
        let codes: Vec<FeatureCode> = ranked.iter().map(|c| c.feature).collect();
        assert_eq!(codes, vec![FeatureCode::Cp, FeatureCode::Thalach]);
    }

    #[test]
    fn anomaly_amplifies_contribution_without_touching_importance() {
        let mut pop = population(0.0, 1.0);
        pop.mean[FeatureCode::Chol.index()] = 200.0;
        pop.std[FeatureCode::Chol.index()] = 50.0;
        let patient = patient_at([0.0; NUM_FEATURES], &[(FeatureCode::Chol, 300.0)]);
        let mut importances = vec![0.0; NUM_FEATURES];
        importances[FeatureCode::Chol.index()] = 0.1;

        let ranked = rank_contributions(&patient, &pop, &importances);
        assert_eq!(ranked.len(), 1);
        // z = 2 → contribution = 0.1 * (1 + 0.5*2) = 0.2
        assert_relative_eq!(ranked[0].importance, 0.1);
        assert_relative_eq!(ranked[0].contribution, 0.2);
        assert_eq!(ranked[0].unit, Some("mg/dl"));
    }

    #[test]
    fn at_population_mean_contributions_equal_importances() {
        let pop = population(10.0, 2.0);
        let patient = patient_at([10.0; NUM_FEATURES], &[]);
        let importances = vec![0.5; NUM_FEATURES];
        let ranked = rank_contributions(&patient, &pop, &importances);
        assert_eq!(ranked.len(), NUM_FEATURES);
        for entry in &ranked {
            assert_relative_eq!(entry.contribution, entry.importance);
        }
    }

    #[test]
    fn categorical_contributions_carry_labels_not_units() {
        let pop = population(0.0, 1.0);
        let patient = patient_at([0.0; NUM_FEATURES], &[(FeatureCode::Sex, 1.0)]);
        let mut importances = vec![0.0; NUM_FEATURES];
        importances[FeatureCode::Sex.index()] = 0.25;

        let ranked = rank_contributions(&patient, &pop, &importances);
        assert_eq!(ranked[0].readable_value, Some("Male"));
        assert_eq!(ranked[0].unit, None);
    }
}
