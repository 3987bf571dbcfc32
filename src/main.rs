// ========================================================================================
//                        THE SERVING ORCHESTRATOR: PRECORDIA
// ========================================================================================
//
// The binary is the request boundary the engine itself stays agnostic of: it
// loads the ensemble bundle once, validates a patient input file against the
// documented feature domains, runs the prediction orchestrator, and renders
// the result as a clinical report (or structured JSON) plus an optional chart
// file. All prediction semantics live in the library.

use clap::Parser;
use precordia::bundle::EnsembleBundle;
use precordia::catalog::FeatureCode;
use precordia::predict::{PredictOptions, predict_from_values};
use precordia::report::generate_report;
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[clap(
    name = "precordia",
    version,
    about = "An inference engine for cardiovascular risk prediction with uncertainty quantification."
)]
struct Args {
    /// Path to the patient input file (JSON or TOML map of the 13 features).
    patient_path: PathBuf,

    /// Path to the trained ensemble bundle.
    #[clap(long, default_value = "heart_model_ensemble.toml")]
    model: PathBuf,

    /// Emit the full result as JSON instead of the clinical report.
    #[clap(long)]
    json: bool,

    /// Write the z-score chart SVG to this path.
    #[clap(long)]
    chart: Option<PathBuf>,

    /// Number of bootstrap iterations for the uncertainty estimate.
    #[clap(long, default_value_t = 50)]
    samples: usize,

    /// |z| threshold for flagging abnormal features.
    #[clap(long, default_value_t = 1.5)]
    z_threshold: f64,

    /// Fixed RNG seed for reproducible uncertainty estimates.
    #[clap(long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let bundle = EnsembleBundle::load(&args.model)?;
    let fields = read_patient_file(&args.patient_path)?;
    validate_fields(&fields)?;

    let options = PredictOptions {
        bootstrap_samples: args.samples,
        z_threshold: args.z_threshold,
        with_chart: args.chart.is_some(),
        rng_seed: args.seed,
        ..PredictOptions::default()
    };
    let mut result = predict_from_values(&fields, &bundle, &options)?;

    if let Some(chart_path) = &args.chart {
        // The payload is opaque to the engine; here it is an SVG document.
        let svg = result
            .visualization
            .take()
            .ok_or("chart rendering produced no payload")?;
        fs::write(chart_path, svg)?;
        log::info!("Wrote chart to {}", chart_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", generate_report(&result));
    }
    Ok(())
}

fn read_patient_file(path: &PathBuf) -> Result<HashMap<String, f64>, Box<dyn Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("cannot read patient file {}: {err}", path.display()))?;
    let fields: HashMap<String, f64> =
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml")) {
            toml::from_str(&contents)?
        } else {
            serde_json::from_str(&contents)?
        };
    Ok(fields)
}

/// Boundary validation: unknown keys and out-of-domain categorical codes are
/// rejected before the orchestrator runs. Missing features are left to the
/// engine, which names the first absent one.
fn validate_fields(fields: &HashMap<String, f64>) -> Result<(), String> {
    for (key, value) in fields {
        let Some(code) = FeatureCode::parse(key) else {
            return Err(format!("unknown feature '{key}' in patient input"));
        };
        let info = code.info();
        if !info.in_domain(*value) {
            let (lo, hi) = info.domain.unwrap_or((0, 0));
            return Err(format!(
                "{key} must be an integer between {lo} and {hi}, got {value}"
            ));
        }
    }
    Ok(())
}
