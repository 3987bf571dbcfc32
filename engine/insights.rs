// ========================================================================================
//                          Clinical Insight Rule Table
// ========================================================================================
//
// Turns the numeric prediction into canned clinical language. Three rule
// groups fire in a fixed order:
//
// 1. one probability-bucket message pair,
// 2. an uncertainty warning when the uncertainty fraction exceeds 0.5,
// 3. per-feature rules, one per recognized abnormal finding, evaluated in
//    feature-catalog order regardless of finding severity.
//
// Both output lists are truncated to five entries only after full assembly.
// The catalog-order walk plus late truncation is observable API behavior and
// must not be "fixed" into severity order.
//
// The feature rules are a static table of records, not a conditional chain:
// each entry names its feature code, a firing predicate, and the message
// builders. Adding a rule is adding a row.

use crate::catalog::FeatureCode;
use crate::types::{AbnormalFeature, ClinicalInsights, Contribution, Direction};

/// Cap applied to each output list after assembly.
const MAX_ENTRIES: usize = 5;

/// Uncertainty fraction above which the low-confidence warning fires.
const UNCERTAINTY_WARNING: f64 = 0.5;

/// Probability buckets, checked in order against `probability < bound`.
/// The last bound is inclusive of 1.0 by construction.
const RISK_MESSAGES: [(f64, &str, &str); 5] = [
    (
        0.2,
        "Patient shows minimal indicators of heart disease.",
        "Standard preventive care and lifestyle counseling advised.",
    ),
    (
        0.4,
        "Patient shows some risk factors for heart disease.",
        "Consider lifestyle modifications and monitoring of risk factors.",
    ),
    (
        0.6,
        "Patient shows moderate risk factors for heart disease.",
        "Further cardiac assessment recommended. Consider non-invasive testing.",
    ),
    (
        0.8,
        "Patient shows significant risk factors for heart disease.",
        "Comprehensive cardiac evaluation indicated. Consider stress test and echocardiogram.",
    ),
    (
        f64::INFINITY,
        "Patient shows strong indicators of heart disease.",
        "Urgent cardiology referral advised. Consider cardiac catheterization if symptomatic.",
    ),
];

/// One row of the feature rule table.
struct FeatureRule {
    code: FeatureCode,
    /// Whether the rule fires for this finding.
    applies: fn(&AbnormalFeature) -> bool,
    insight: fn(&AbnormalFeature) -> String,
    /// `None` when the rule contributes an insight without a recommendation.
    recommendation: fn(&AbnormalFeature) -> Option<String>,
}

/// Rows are ordered by catalog position; the generator walks the table top to
/// bottom, so assembled insight order follows the catalog.
static FEATURE_RULES: [FeatureRule; 8] = [
    FeatureRule {
        code: FeatureCode::Cp,
        applies: |f| matches!(f.value as i64, 0 | 1 | 2),
        insight: |f| {
            let described = f.readable_value.map_or_else(|| f.value.to_string(), str::to_string);
            format!("Patient reports {described}, which may indicate angina.")
        },
        recommendation: |f| {
            (f.value as i64 == 0)
                .then(|| "Evaluate for stable coronary artery disease.".to_string())
        },
    },
    FeatureRule {
        code: FeatureCode::Trestbps,
        applies: |f| f.direction == Direction::High,
        insight: |_| {
            "Elevated resting blood pressure increases cardiac workload and stroke risk."
                .to_string()
        },
        recommendation: |_| {
            Some("Blood pressure management recommended. Target <130/80 mmHg.".to_string())
        },
    },
    FeatureRule {
        code: FeatureCode::Chol,
        applies: |f| f.direction == Direction::High,
        insight: |_| {
            "Elevated cholesterol levels may contribute to atherosclerotic disease.".to_string()
        },
        recommendation: |_| {
            Some("Lipid management indicated. Consider statin therapy if appropriate.".to_string())
        },
    },
    FeatureRule {
        code: FeatureCode::Thalach,
        applies: |f| f.direction == Direction::Low,
        insight: |_| {
            "Maximum heart rate during exercise is abnormally low, suggesting reduced cardiac capacity."
                .to_string()
        },
        recommendation: |_| {
            Some(
                "Consider evaluation for chronotropic incompetence or ischemic heart disease."
                    .to_string(),
            )
        },
    },
    FeatureRule {
        code: FeatureCode::Exang,
        applies: |f| f.value as i64 == 1,
        insight: |_| {
            "Patient experiences angina during exercise, strongly associated with CAD.".to_string()
        },
        recommendation: |_| Some("Anti-anginal medication may be indicated.".to_string()),
    },
    FeatureRule {
        code: FeatureCode::Oldpeak,
        applies: |f| f.direction == Direction::High,
        insight: |_| {
            "Significant ST depression observed during exercise, suggesting myocardial ischemia."
                .to_string()
        },
        recommendation: |_| {
            Some(
                "ECG monitoring during exercise recommended to assess for ischemic changes."
                    .to_string(),
            )
        },
    },
    FeatureRule {
        code: FeatureCode::Ca,
        applies: |f| f.value as i64 > 0,
        insight: |f| {
            format!(
                "Fluoroscopy shows {} major vessel(s) with calcium deposits.",
                f.value as i64
            )
        },
        recommendation: |_| {
            Some("Presence of calcified vessels indicates atherosclerotic disease.".to_string())
        },
    },
    FeatureRule {
        code: FeatureCode::Thal,
        applies: |f| matches!(f.value as i64, 1 | 2),
        insight: |f| {
            let described = f.readable_value.map_or_else(|| f.value.to_string(), str::to_string);
            format!("Thallium scan shows {described}, indicating abnormal blood flow.")
        },
        recommendation: |_| {
            Some(
                "Consider myocardial perfusion imaging to assess for reversible ischemia."
                    .to_string(),
            )
        },
    },
];

/// Generates insight and recommendation lists for one prediction.
///
/// `contributions` is part of the generator's contract for future rules but
/// no current rule consumes it.
pub fn generate_insights(
    probability: f64,
    uncertainty_fraction: f64,
    abnormal_features: &[AbnormalFeature],
    _contributions: &[Contribution],
) -> ClinicalInsights {
    let mut key_insights = Vec::new();
    let mut recommendations = Vec::new();

    let (_, insight, recommendation) = RISK_MESSAGES
        .iter()
        .find(|(bound, _, _)| probability < *bound)
        .copied()
        .unwrap_or(RISK_MESSAGES[4]);
    key_insights.push(insight.to_string());
    recommendations.push(recommendation.to_string());

    if uncertainty_fraction > UNCERTAINTY_WARNING {
        key_insights.push("Model shows significant uncertainty in this prediction.".to_string());
        recommendations.push(
            "Consider additional diagnostic tests to confirm cardiovascular status.".to_string(),
        );
    }

    for rule in &FEATURE_RULES {
        let finding = abnormal_features
            .iter()
            .find(|f| f.feature == rule.code)
            .filter(|f| (rule.applies)(f));
        if let Some(finding) = finding {
            key_insights.push((rule.insight)(finding));
            if let Some(recommendation) = (rule.recommendation)(finding) {
                recommendations.push(recommendation);
            }
        }
    }

    key_insights.truncate(MAX_ENTRIES);
    recommendations.truncate(MAX_ENTRIES);
    ClinicalInsights {
        key_insights,
        recommendations,
    }
}
