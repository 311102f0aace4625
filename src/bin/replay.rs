use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use env_logger::Env;

use magcal_rs::replay::{compare, load_readings, replay, ReplaySummary};
use magcal_rs::CalibrationConfig;

#[derive(Parser, Debug)]
#[command(about = "Replay recorded magnetometer logs through the calibrator")]
struct Args {
    /// Path to an x,y,z log (.csv or .csv.gz)
    #[arg(long, conflicts_with_all = ["log_dir", "compare"])]
    log: Option<PathBuf>,

    /// Directory of logs to batch replay (*.csv, *.csv.gz)
    #[arg(long, conflicts_with = "compare")]
    log_dir: Option<PathBuf>,

    /// Replay two logs and compare the candidate against the baseline
    #[arg(long, num_args = 2, value_names = ["BASELINE", "CANDIDATE"])]
    compare: Option<Vec<PathBuf>>,

    /// JSON file with calibration thresholds; missing fields keep defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Include a per-reading trace in the output
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn load_config(path: &Path) -> anyhow::Result<CalibrationConfig> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let config: CalibrationConfig = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn is_log(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    path.is_file() && (name.ends_with(".csv") || name.ends_with(".csv.gz"))
}

fn run_once(path: &Path, config: &CalibrationConfig, trace: bool) -> anyhow::Result<ReplaySummary> {
    let readings = load_readings(path)?;
    let summary = replay(&path.display().to_string(), &readings, config, trace)?;
    log::info!(
        "{}: {} readings, coverage {:.1}%, {}",
        path.display(),
        summary.readings,
        summary.coverage_percent,
        summary.method
    );
    Ok(summary)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match args.config.as_ref() {
        Some(path) => load_config(path)?,
        None => CalibrationConfig::default(),
    };

    if let Some(paths) = args.compare.as_ref() {
        let baseline = run_once(&paths[0], &config, args.trace)?;
        let candidate = run_once(&paths[1], &config, args.trace)?;
        let comparison = compare(&baseline, &candidate);
        for finding in &comparison.findings {
            log::warn!("{finding}");
        }
        let report = serde_json::json!({
            "comparison": comparison,
            "baseline": baseline,
            "candidate": candidate,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut results = Vec::new();
    if let Some(dir) = args.log_dir.as_ref() {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("listing {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_log(p))
            .collect();
        paths.sort();

        for path in paths {
            match run_once(&path, &config, args.trace) {
                Ok(summary) => results.push(summary),
                Err(e) => log::error!("Failed {}: {:#}", path.display(), e),
            }
        }
    } else if let Some(log) = args.log.as_ref() {
        results.push(run_once(log, &config, args.trace)?);
    } else {
        anyhow::bail!("Provide --log, --log-dir or --compare");
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
