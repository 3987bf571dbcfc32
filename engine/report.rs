//! ASCII clinical report rendering.
//!
//! Pure formatting over a finished [`PredictionResult`]; the section banners
//! are fixed and part of the consumed output format.

use crate::types::{Direction, PredictionResult};
use std::fmt::Write;

const BANNER_WIDTH: usize = 60;
const RULE_WIDTH: usize = 30;

/// Renders the fixed-banner clinical report.
pub fn generate_report(result: &PredictionResult) -> String {
    let mut out = String::new();
    let banner = "=".repeat(BANNER_WIDTH);
    let rule = "-".repeat(RULE_WIDTH);

    // Writing into a String cannot fail; the unwraps below are infallible.
    writeln!(out, "{banner}").unwrap();
    writeln!(out, "CARDIAC RISK ASSESSMENT REPORT").unwrap();
    writeln!(out, "{banner}").unwrap();
    writeln!(out, "Report Date: {}", result.report_date).unwrap();
    writeln!(out).unwrap();

    writeln!(out, "RISK ASSESSMENT").unwrap();
    writeln!(out, "{rule}").unwrap();
    writeln!(
        out,
        "Heart Disease Risk: {} ({:.1}%)",
        result.prediction.risk_level,
        result.prediction.heart_disease_probability * 100.0
    )
    .unwrap();
    writeln!(out, "Risk Category: {}", result.prediction.risk_category).unwrap();
    writeln!(
        out,
        "Prediction Reliability: {:.1}%",
        result.uncertainty.reliability_percent
    )
    .unwrap();
    writeln!(
        out,
        "Uncertainty Level: {:.1}%",
        result.uncertainty.uncertainty_percent
    )
    .unwrap();
    writeln!(out, "Assessment: {}", result.uncertainty.assessment).unwrap();
    writeln!(out).unwrap();

    writeln!(out, "CLINICAL INSIGHTS").unwrap();
    writeln!(out, "{rule}").unwrap();
    for (i, insight) in result.clinical_insights.key_insights.iter().enumerate() {
        writeln!(out, "{}. {insight}", i + 1).unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "ABNORMAL CLINICAL FINDINGS").unwrap();
    writeln!(out, "{rule}").unwrap();
    if result.abnormal_features.is_empty() {
        writeln!(out, "- No significantly abnormal features detected").unwrap();
        writeln!(out).unwrap();
    } else {
        for finding in &result.abnormal_features {
            let arrow = match finding.direction {
                Direction::High => "↑",
                Direction::Low => "↓",
            };
            let value_text = if let Some(label) = finding.readable_value {
                label.to_string()
            } else if let Some(unit) = finding.unit {
                format!("{} {unit}", finding.value)
            } else {
                finding.value.to_string()
            };
            writeln!(out, "- {}: {value_text} {arrow}", finding.feature_name).unwrap();
            writeln!(
                out,
                "  Severity: {} (z-score: {:.2})",
                title_case(&finding.severity.to_string()),
                finding.z_score
            )
            .unwrap();
            writeln!(out, "  Note: {}", finding.clinical_context).unwrap();
            writeln!(out).unwrap();
        }
    }

    writeln!(out, "CLINICAL RECOMMENDATIONS").unwrap();
    writeln!(out, "{rule}").unwrap();
    for (i, recommendation) in result.clinical_insights.recommendations.iter().enumerate() {
        writeln!(out, "{}. {recommendation}", i + 1).unwrap();
    }

    out
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
