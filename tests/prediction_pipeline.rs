//! End-to-end pipeline tests: a hand-built ensemble artifact round-trips
//! through TOML, and predictions over it honor every externally observable
//! contract (thresholds, ordering, percentage identities, determinism).

use precordia::bundle::{EnsembleBundle, FeatureScaler, PopulationStats, SoftVotingCombiner};
use precordia::catalog::{FeatureCode, NUM_FEATURES};
use precordia::forest::{BaggedForest, BoostedForest, NO_CHILD, Tree};
use precordia::predict::{PredictOptions, predict, predict_from_values};
use precordia::report::generate_report;
use precordia::types::{PatientFeatureVector, RiskCategory, RiskLevel};

use ndarray::Array1;
use std::collections::HashMap;

/// Approximate population statistics of the training cohort.
fn population() -> (Array1<f64>, Array1<f64>) {
    let mean = Array1::from_vec(vec![
        54.4, 0.68, 0.97, 131.6, 246.3, 0.15, 0.53, 149.6, 0.33, 1.04, 1.4, 0.73, 2.31,
    ]);
    let std = Array1::from_vec(vec![
        9.1, 0.47, 1.03, 17.5, 51.8, 0.36, 0.53, 22.9, 0.47, 1.16, 0.62, 1.02, 0.61,
    ]);
    (mean, std)
}

/// A depth-1 stump on a scaled feature: below the threshold one value, at or
/// above it the other.
fn stump(feature: FeatureCode, threshold: f64, low: f64, high: f64) -> Tree {
    Tree {
        feature: vec![feature.index() as u32, 0, 0],
        threshold: vec![threshold, 0.0, 0.0],
        left: vec![1, NO_CHILD, NO_CHILD],
        right: vec![2, NO_CHILD, NO_CHILD],
        value: vec![0.0, low, high],
    }
}

/// A small but non-trivial ensemble: real splits on scaled cholesterol,
/// ST depression, and max heart rate, so different patients land in
/// different leaves.
fn fixture_bundle() -> EnsembleBundle {
    let (mean, std) = population();
    let mut importances = vec![0.01; NUM_FEATURES];
    importances[FeatureCode::Cp.index()] = 0.14;
    importances[FeatureCode::Thalach.index()] = 0.13;
    importances[FeatureCode::Oldpeak.index()] = 0.12;
    importances[FeatureCode::Ca.index()] = 0.11;
    importances[FeatureCode::Chol.index()] = 0.08;
    importances[FeatureCode::Trestbps.index()] = 0.07;
    importances[FeatureCode::Age.index()] = 0.06;

    EnsembleBundle {
        bagged: vec![
            BaggedForest {
                trees: vec![
                    stump(FeatureCode::Chol, 0.5, 0.2, 0.7),
                    stump(FeatureCode::Oldpeak, 0.0, 0.1, 0.8),
                ],
                feature_importances: importances.clone(),
            },
            BaggedForest {
                trees: vec![stump(FeatureCode::Thalach, -0.5, 0.75, 0.25)],
                feature_importances: importances,
            },
        ],
        boosted: vec![
            BoostedForest {
                trees: vec![
                    stump(FeatureCode::Oldpeak, 0.5, -0.6, 0.9),
                    stump(FeatureCode::Ca, 0.3, -0.3, 0.8),
                ],
                learning_rate: 0.3,
                base_score: -0.4,
                feature_importances: vec![0.0; NUM_FEATURES],
            },
            BoostedForest {
                trees: vec![stump(FeatureCode::Cp, 1.0, -0.5, 0.7)],
                learning_rate: 0.5,
                base_score: -0.2,
                feature_importances: vec![0.0; NUM_FEATURES],
            },
        ],
        combiner: SoftVotingCombiner { weights: None },
        scaler: FeatureScaler {
            center: mean.clone(),
            scale: std.clone(),
        },
        population: PopulationStats { mean, std },
    }
}

fn patient_fields(overrides: &[(&str, f64)]) -> HashMap<String, f64> {
    let mut fields: HashMap<String, f64> = [
        ("age", 63.0),
        ("sex", 1.0),
        ("cp", 3.0),
        ("trestbps", 145.0),
        ("chol", 233.0),
        ("fbs", 1.0),
        ("restecg", 0.0),
        ("thalach", 150.0),
        ("exang", 0.0),
        ("oldpeak", 2.3),
        ("slope", 0.0),
        ("ca", 0.0),
        ("thal", 1.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    for (key, value) in overrides {
        fields.insert(key.to_string(), *value);
    }
    fields
}

fn seeded_options(seed: u64) -> PredictOptions {
    PredictOptions {
        rng_seed: Some(seed),
        ..PredictOptions::default()
    }
}

#[test]
fn artifact_round_trip_preserves_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("heart_model_ensemble.toml");
    let bundle = fixture_bundle();
    bundle.save(&path).unwrap();
    let loaded = EnsembleBundle::load(&path).unwrap();

    let fields = patient_fields(&[]);
    let a = predict_from_values(&fields, &bundle, &seeded_options(11)).unwrap();
    let b = predict_from_values(&fields, &loaded, &seeded_options(11)).unwrap();
    assert_eq!(
        a.prediction.heart_disease_probability,
        b.prediction.heart_disease_probability
    );
    assert_eq!(a.uncertainty.uncertainty_percent, b.uncertainty.uncertainty_percent);
}

#[test]
fn seeded_predictions_are_fully_reproducible() {
    let bundle = fixture_bundle();
    let fields = patient_fields(&[]);
    let a = predict_from_values(&fields, &bundle, &seeded_options(42)).unwrap();
    let b = predict_from_values(&fields, &bundle, &seeded_options(42)).unwrap();
    assert_eq!(a.uncertainty.uncertainty_percent, b.uncertainty.uncertainty_percent);
    assert_eq!(a.uncertainty.reliability_percent, b.uncertainty.reliability_percent);
    assert_eq!(a.clinical_insights.key_insights, b.clinical_insights.key_insights);
}

#[test]
fn percentages_and_classification_contracts_hold() {
    let bundle = fixture_bundle();
    for seed in [1, 2, 3] {
        let result =
            predict_from_values(&patient_fields(&[]), &bundle, &seeded_options(seed)).unwrap();
        let p = result.prediction.heart_disease_probability;
        assert!((0.0..=1.0).contains(&p));
        assert_eq!(result.prediction.binary_prediction, u8::from(p >= 0.22));
        assert_eq!(
            result.prediction.risk_category,
            if p >= 0.5 { RiskCategory::HighRisk } else { RiskCategory::LowRisk }
        );
        assert_eq!(result.prediction.risk_level, RiskLevel::from_probability(p));
        assert_eq!(
            result.uncertainty.uncertainty_percent + result.uncertainty.reliability_percent,
            100.0
        );
    }
}

#[test]
fn abnormal_features_and_contributions_are_ordered() {
    let bundle = fixture_bundle();
    // Exaggerated patient: very high cholesterol and ST depression, very low
    // max heart rate.
    let fields = patient_fields(&[("chol", 450.0), ("oldpeak", 5.0), ("thalach", 90.0)]);
    let result = predict_from_values(&fields, &bundle, &seeded_options(5)).unwrap();

    assert!(!result.abnormal_features.is_empty());
    for pair in result.abnormal_features.windows(2) {
        assert!(pair[0].z_score.abs() >= pair[1].z_score.abs());
    }

    assert!(!result.key_contributors.is_empty());
    for pair in result.key_contributors.windows(2) {
        assert!(pair[0].contribution >= pair[1].contribution);
    }
    for entry in &result.key_contributors {
        assert!(entry.importance > 0.02);
    }
}

#[test]
fn severe_cholesterol_is_flagged_and_narrated() {
    let bundle = fixture_bundle();
    // chol 450 is ~3.9 population standard deviations above the mean.
    let fields = patient_fields(&[("chol", 450.0)]);
    let result = predict_from_values(&fields, &bundle, &seeded_options(5)).unwrap();

    let chol = result
        .abnormal_features
        .iter()
        .find(|f| f.feature == FeatureCode::Chol)
        .expect("cholesterol must be flagged");
    assert!(chol.z_score > 2.5);
    assert_eq!(chol.severity.to_string(), "severe");
    assert_eq!(chol.direction.to_string(), "high");

    assert!(
        result
            .clinical_insights
            .key_insights
            .iter()
            .any(|i| i.contains("cholesterol"))
    );
    assert!(
        result
            .clinical_insights
            .recommendations
            .iter()
            .any(|r| r.contains("Lipid management"))
    );
}

#[test]
fn insight_lists_never_exceed_five() {
    let bundle = fixture_bundle();
    let fields = patient_fields(&[
        ("cp", 0.0),
        ("trestbps", 200.0),
        ("chol", 450.0),
        ("thalach", 80.0),
        ("exang", 1.0),
        ("oldpeak", 5.5),
        ("ca", 3.0),
        ("thal", 2.0),
    ]);
    let result = predict_from_values(&fields, &bundle, &seeded_options(5)).unwrap();
    assert!(result.clinical_insights.key_insights.len() <= 5);
    assert!(result.clinical_insights.recommendations.len() <= 5);
}

#[test]
fn report_renders_the_full_clinical_layout() {
    let bundle = fixture_bundle();
    let result =
        predict_from_values(&patient_fields(&[("chol", 450.0)]), &bundle, &seeded_options(9))
            .unwrap();
    let report = generate_report(&result);

    assert!(report.contains("CARDIAC RISK ASSESSMENT REPORT"));
    assert!(report.contains("Report Date: "));
    assert!(report.contains("Heart Disease Risk: "));
    assert!(report.contains("Serum Cholesterol"));
    assert!(report.contains("CLINICAL RECOMMENDATIONS"));
}

#[test]
fn json_serialization_exposes_the_documented_shape() {
    let bundle = fixture_bundle();
    let mut options = seeded_options(3);
    options.with_chart = true;
    let result = predict_from_values(&patient_fields(&[]), &bundle, &options).unwrap();

    let value: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert!(value["prediction"]["heart_disease_probability"].is_number());
    assert!(value["prediction"]["risk_level"].is_string());
    assert!(value["uncertainty"]["assessment"].is_string());
    assert!(value["abnormal_features"].is_array());
    assert!(value["key_contributors"].is_array());
    assert!(value["clinical_insights"]["key_insights"].is_array());
    assert!(
        value["visualization"]
            .as_str()
            .is_some_and(|svg| svg.starts_with("<svg"))
    );
}

#[test]
fn typed_and_map_entry_points_agree() {
    let bundle = fixture_bundle();
    let fields = patient_fields(&[]);
    let via_map = predict_from_values(&fields, &bundle, &seeded_options(6)).unwrap();

    let mut ordered = [0.0; NUM_FEATURES];
    for code in FeatureCode::ALL {
        ordered[code.index()] = fields[code.as_str()];
    }
    let patient = PatientFeatureVector::from_ordered(ordered);
    let via_vector = predict(&patient, &bundle, &seeded_options(6)).unwrap();

    assert_eq!(
        via_map.prediction.heart_disease_probability,
        via_vector.prediction.heart_disease_probability
    );
    assert_eq!(
        via_map.uncertainty.uncertainty_percent,
        via_vector.uncertainty.uncertainty_percent
    );
}
