//! Z-score chart rendering.
//!
//! Draws the patient's continuous features as standardized deviations from
//! the population mean, as a self-contained SVG document. The engine treats
//! the payload as opaque; the request boundary embeds it directly.
//!
//! Layout mirrors the served chart: one bar per continuous feature (the
//! integer-coded features are excluded), bars past ±1.5 highlighted, dashed
//! reference lines at ±1.5, and the risk probability and reliability
//! annotated in the top-left corner.

use crate::analysis::z_scores;
use crate::bundle::PopulationStats;
use crate::catalog::FeatureCode;
use crate::types::{PatientFeatureVector, RiskLevel};
use std::fmt::Write;

/// The continuous features shown on the chart, in catalog order.
const CHART_FEATURES: [FeatureCode; 5] = [
    FeatureCode::Age,
    FeatureCode::Trestbps,
    FeatureCode::Chol,
    FeatureCode::Thalach,
    FeatureCode::Oldpeak,
];

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 90.0;

/// |z| beyond which a bar is drawn in its abnormal color.
const HIGHLIGHT_Z: f64 = 1.5;

/// Renders the z-score bar chart as an SVG string.
pub fn render_z_score_chart(
    patient: &PatientFeatureVector,
    population: &PopulationStats,
    probability: f64,
    reliability_percent: f64,
    risk_level: RiskLevel,
) -> String {
    let z = z_scores(patient, population);
    let bars: Vec<(&'static str, f64)> = CHART_FEATURES
        .iter()
        .map(|code| (code.info().name, z[code.index()]))
        .collect();

    // Symmetric y-range wide enough for every bar and both reference lines.
    let max_abs = bars
        .iter()
        .map(|(_, v)| v.abs())
        .fold(2.0_f64, f64::max)
        .ceil();

    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let y_of = |z_value: f64| MARGIN_TOP + (max_abs - z_value) / (2.0 * max_abs) * plot_height;
    let slot = plot_width / bars.len() as f64;
    let bar_width = slot * 0.6;

    let mut svg = String::new();
    write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    )
    .unwrap();
    write!(
        svg,
        r#"<rect width="{WIDTH}" height="{HEIGHT}" fill="white"/>"#
    )
    .unwrap();
    write!(
        svg,
        r#"<text x="{x}" y="20" font-family="sans-serif" font-size="16" text-anchor="middle">Patient Feature Profile (Risk Level: {risk_level})</text>"#,
        x = WIDTH / 2.0
    )
    .unwrap();

    // Reference lines: baseline at 0, dashed thresholds at ±1.5.
    for (z_line, color, dash) in [
        (0.0, "black", ""),
        (HIGHLIGHT_Z, "red", r#" stroke-dasharray="6 4""#),
        (-HIGHLIGHT_Z, "red", r#" stroke-dasharray="6 4""#),
    ] {
        write!(
            svg,
            r#"<line x1="{x1}" y1="{y}" x2="{x2}" y2="{y}" stroke="{color}" stroke-opacity="0.5"{dash}/>"#,
            x1 = MARGIN_LEFT,
            x2 = WIDTH - MARGIN_RIGHT,
            y = y_of(z_line),
        )
        .unwrap();
    }

    for (i, (name, z_value)) in bars.iter().enumerate() {
        let fill = if *z_value > HIGHLIGHT_Z {
            "salmon"
        } else if *z_value < -HIGHLIGHT_Z {
            "lightgreen"
        } else {
            "skyblue"
        };
        let x = MARGIN_LEFT + i as f64 * slot + (slot - bar_width) / 2.0;
        let (top, height) = if *z_value >= 0.0 {
            (y_of(*z_value), y_of(0.0) - y_of(*z_value))
        } else {
            (y_of(0.0), y_of(*z_value) - y_of(0.0))
        };
        write!(
            svg,
            r#"<rect x="{x:.1}" y="{top:.1}" width="{bar_width:.1}" height="{height:.1}" fill="{fill}"/>"#
        )
        .unwrap();

        let label_x = x + bar_width / 2.0;
        let label_y = HEIGHT - MARGIN_BOTTOM + 16.0;
        write!(
            svg,
            r#"<text x="{label_x:.1}" y="{label_y:.1}" font-family="sans-serif" font-size="11" text-anchor="end" transform="rotate(-45 {label_x:.1} {label_y:.1})">{name}</text>"#
        )
        .unwrap();
    }

    write!(
        svg,
        r#"<text x="14" y="{y:.1}" font-family="sans-serif" font-size="12" transform="rotate(-90 14 {y:.1})" text-anchor="middle">Standard Deviations from Mean</text>"#,
        y = MARGIN_TOP + plot_height / 2.0
    )
    .unwrap();
    write!(
        svg,
        r#"<text x="{x}" y="{y}" font-family="sans-serif" font-size="12">Heart Disease Risk: {risk:.1}%</text>"#,
        x = MARGIN_LEFT + 8.0,
        y = MARGIN_TOP + 16.0,
        risk = probability * 100.0
    )
    .unwrap();
    write!(
        svg,
        r#"<text x="{x}" y="{y}" font-family="sans-serif" font-size="12">Prediction Reliability: {reliability_percent:.1}%</text>"#,
        x = MARGIN_LEFT + 8.0,
        y = MARGIN_TOP + 34.0
    )
    .unwrap();
    svg.push_str("</svg>");
    svg
}
