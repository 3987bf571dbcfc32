// ========================================================================================
//                              The Clinical Feature Catalog
// ========================================================================================
//
// Static metadata for the 13 clinical measurements the engine consumes. The catalog
// defines the canonical feature order used everywhere: patient vectors, scaler and
// population-statistic vectors, and model feature indices are all aligned to it.
// Pure data, no behavior beyond lookups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of clinical features in the schema. Every per-feature vector in the
/// engine (scaler, population statistics, importances) has exactly this length.
pub const NUM_FEATURES: usize = 13;

/// Identifies one of the 13 clinical features. The discriminant doubles as the
/// feature's column index in every aligned vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(usize)]
pub enum FeatureCode {
    Age,
    Sex,
    Cp,
    Trestbps,
    Chol,
    Fbs,
    Restecg,
    Thalach,
    Exang,
    Oldpeak,
    Slope,
    Ca,
    Thal,
}

impl FeatureCode {
    /// All features in canonical catalog order.
    pub const ALL: [FeatureCode; NUM_FEATURES] = [
        FeatureCode::Age,
        FeatureCode::Sex,
        FeatureCode::Cp,
        FeatureCode::Trestbps,
        FeatureCode::Chol,
        FeatureCode::Fbs,
        FeatureCode::Restecg,
        FeatureCode::Thalach,
        FeatureCode::Exang,
        FeatureCode::Oldpeak,
        FeatureCode::Slope,
        FeatureCode::Ca,
        FeatureCode::Thal,
    ];

    /// The feature's column index in catalog-aligned vectors.
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The short field name used in patient input files.
    pub fn as_str(self) -> &'static str {
        self.info().key
    }

    /// Parses a short field name, case-sensitively.
    pub fn parse(key: &str) -> Option<FeatureCode> {
        FeatureCode::ALL
            .iter()
            .copied()
            .find(|code| code.info().key == key)
    }

    /// Catalog metadata for this feature.
    #[inline]
    pub fn info(self) -> &'static FeatureInfo {
        &CATALOG[self.index()]
    }
}

impl fmt::Display for FeatureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one clinical feature.
#[derive(Debug)]
pub struct FeatureInfo {
    pub code: FeatureCode,
    /// Short field name as it appears in patient input files.
    pub key: &'static str,
    /// Human-readable display name used in reports.
    pub name: &'static str,
    /// Measurement unit, if the feature has one.
    pub unit: Option<&'static str>,
    /// Labels for integer-coded categorical values, keyed by the raw code.
    pub labels: &'static [(i64, &'static str)],
    /// Clinically normal range of raw values, where one is defined.
    pub normal_range: Option<(f64, f64)>,
    /// Valid raw-value domain for integer-coded features, as an inclusive
    /// bound pair. `None` for continuous features.
    pub domain: Option<(i64, i64)>,
    /// One-line clinical interpretation shown alongside abnormal findings.
    pub clinical_context: &'static str,
}

impl FeatureInfo {
    /// Looks up the categorical label for a raw value, if the feature is
    /// integer-coded and the value is a known code.
    pub fn label_for(&self, raw: f64) -> Option<&'static str> {
        if self.labels.is_empty() {
            return None;
        }
        let code = raw as i64;
        self.labels
            .iter()
            .find(|(value, _)| *value == code)
            .map(|(_, label)| *label)
    }

    /// Whether a raw value lies inside the documented integer domain.
    /// Continuous features always pass.
    pub fn in_domain(&self, raw: f64) -> bool {
        match self.domain {
            Some((lo, hi)) => {
                let code = raw as i64;
                raw.fract() == 0.0 && code >= lo && code <= hi
            }
            None => true,
        }
    }
}

/// The full catalog, in canonical order. Index with [`FeatureCode::index`].
pub static CATALOG: [FeatureInfo; NUM_FEATURES] = [
    FeatureInfo {
        code: FeatureCode::Age,
        key: "age",
        name: "Age",
        unit: Some("years"),
        labels: &[],
        normal_range: Some((30.0, 70.0)),
        domain: None,
        clinical_context: "Age is a risk factor for heart disease, increasing with age",
    },
    FeatureInfo {
        code: FeatureCode::Sex,
        key: "sex",
        name: "Sex",
        unit: None,
        labels: &[(0, "Female"), (1, "Male")],
        normal_range: None,
        domain: Some((0, 1)),
        clinical_context: "Males have higher risk of heart disease than females",
    },
    FeatureInfo {
        code: FeatureCode::Cp,
        key: "cp",
        name: "Chest Pain Type",
        unit: None,
        labels: &[
            (0, "Typical angina"),
            (1, "Atypical angina"),
            (2, "Non-anginal pain"),
            (3, "Asymptomatic"),
        ],
        normal_range: None,
        domain: Some((0, 3)),
        clinical_context:
            "Type of chest pain experienced; atypical symptoms may still indicate heart issues",
    },
    FeatureInfo {
        code: FeatureCode::Trestbps,
        key: "trestbps",
        name: "Resting Blood Pressure",
        unit: Some("mm Hg"),
        labels: &[],
        normal_range: Some((90.0, 120.0)),
        domain: None,
        clinical_context: "Elevated blood pressure increases cardiac workload and risk",
    },
    FeatureInfo {
        code: FeatureCode::Chol,
        key: "chol",
        name: "Serum Cholesterol",
        unit: Some("mg/dl"),
        labels: &[],
        normal_range: Some((125.0, 200.0)),
        domain: None,
        clinical_context: "High cholesterol contributes to plaque formation in arteries",
    },
    FeatureInfo {
        code: FeatureCode::Fbs,
        key: "fbs",
        name: "Fasting Blood Sugar",
        unit: None,
        labels: &[(0, "FBS < 120 mg/dl"), (1, "FBS > 120 mg/dl")],
        normal_range: None,
        domain: Some((0, 1)),
        clinical_context:
            "Elevated blood sugar may indicate diabetes, a heart disease risk factor",
    },
    FeatureInfo {
        code: FeatureCode::Restecg,
        key: "restecg",
        name: "Resting ECG Results",
        unit: None,
        labels: &[
            (0, "Normal"),
            (1, "ST-T wave abnormality"),
            (2, "Left ventricular hypertrophy"),
        ],
        normal_range: None,
        domain: Some((0, 2)),
        clinical_context: "ECG abnormalities may indicate existing heart conditions",
    },
    FeatureInfo {
        code: FeatureCode::Thalach,
        key: "thalach",
        name: "Maximum Heart Rate",
        unit: Some("bpm"),
        labels: &[],
        normal_range: Some((120.0, 180.0)),
        domain: None,
        clinical_context: "Lower max heart rate may indicate reduced cardiac capacity",
    },
    FeatureInfo {
        code: FeatureCode::Exang,
        key: "exang",
        name: "Exercise Induced Angina",
        unit: None,
        labels: &[(0, "No"), (1, "Yes")],
        normal_range: None,
        domain: Some((0, 1)),
        clinical_context:
            "Angina during exercise strongly associated with coronary artery disease",
    },
    FeatureInfo {
        code: FeatureCode::Oldpeak,
        key: "oldpeak",
        name: "ST Depression",
        unit: Some("mm"),
        labels: &[],
        normal_range: Some((0.0, 0.5)),
        domain: None,
        clinical_context:
            "Depression induced by exercise relative to rest; indicates ischemia",
    },
    FeatureInfo {
        code: FeatureCode::Slope,
        key: "slope",
        name: "Peak Exercise ST Segment",
        unit: None,
        labels: &[(0, "Upsloping"), (1, "Flat"), (2, "Downsloping")],
        normal_range: None,
        domain: Some((0, 2)),
        clinical_context:
            "Slope of peak exercise ST segment; downsloping indicates abnormality",
    },
    FeatureInfo {
        code: FeatureCode::Ca,
        key: "ca",
        name: "Major Vessels Colored by Fluoroscopy",
        unit: None,
        labels: &[],
        normal_range: Some((0.0, 0.0)),
        domain: Some((0, 4)),
        clinical_context:
            "Number of major vessels with calcium deposits; more vessels indicate advanced disease",
    },
    FeatureInfo {
        code: FeatureCode::Thal,
        key: "thal",
        name: "Thalassemia",
        unit: None,
        labels: &[
            (0, "Normal"),
            (1, "Fixed defect"),
            (2, "Reversible defect"),
            (3, "Unknown"),
        ],
        normal_range: None,
        domain: Some((0, 3)),
        clinical_context:
            "Blood disorder affecting oxygen carrying capacity; defects may indicate abnormal blood supply",
    },
];
