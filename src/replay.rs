//! Offline replay of recorded magnetometer logs
//!
//! Logs are plain text, one `x,y,z` reading in µT per line, optionally
//! gzip-compressed. Blank lines and `#` comments are ignored. Each log is fed
//! through a fresh [`MagCalibrator`] and summarized; [`compare`] sets two
//! summaries side by side, for example a prototype log against production
//! hardware.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use flate2::read::GzDecoder;
use serde::Serialize;

use crate::binning::locate;
use crate::calibrator::MagCalibrator;
use crate::config::CalibrationConfig;
use crate::fit::FitMethod;
use crate::hard_iron::Phase;
use crate::types::{CalibrationResult, Vector3};

/// One parsed reading and the log line it came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub line: usize,
    pub raw: Vector3,
}

fn parse_xyz(line: &str) -> Option<Vector3> {
    let mut fields = line.split(',').map(|f| f.trim().parse::<f64>());
    let x = fields.next()?.ok()?;
    let y = fields.next()?.ok()?;
    let z = fields.next()?.ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(Vector3::new(x, y, z))
}

/// Parse `x,y,z` lines, skipping blanks, comments and malformed lines.
pub fn parse_readings<R: BufRead>(reader: R) -> anyhow::Result<Vec<Reading>> {
    let mut readings = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("reading line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match parse_xyz(trimmed) {
            Some(raw) => readings.push(Reading { line: line_no, raw }),
            None => log::warn!("Skipping malformed line {line_no}: {trimmed}"),
        }
    }
    Ok(readings)
}

/// Load a log file, decompressing `.gz` files on the fly.
pub fn load_readings(path: &Path) -> anyhow::Result<Vec<Reading>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let readings = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        parse_readings(BufReader::new(GzDecoder::new(file)))
    } else {
        parse_readings(BufReader::new(file))
    };
    readings.with_context(|| format!("parsing {}", path.display()))
}

/// Min / max / mean of one quantity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

#[derive(Default)]
struct RunningStats {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl RunningStats {
    fn push(&mut self, v: f64) {
        if self.count == 0 {
            self.min = v;
            self.max = v;
        } else {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self.sum += v;
        self.count += 1;
    }

    fn finish(&self) -> Option<Stats> {
        (self.count > 0).then(|| Stats {
            min: self.min,
            max: self.max,
            mean: self.sum / self.count as f64,
            count: self.count,
        })
    }
}

/// Per-reading diagnostics, in the frame the calibrator binned it.
#[derive(Clone, Debug, Serialize)]
pub struct TraceEntry {
    pub line: usize,
    pub raw: [f64; 3],
    pub magnitude: f64,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub azimuth_bin: usize,
    pub elevation_bin: usize,
    pub phase: Phase,
    pub accepted: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReplaySummary {
    pub source: String,
    pub generated_at: String,
    pub readings: usize,
    pub invalid: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Raw-frame statistics over valid readings
    pub magnitude: Option<Stats>,
    pub elevation_deg: Option<Stats>,
    pub azimuth_deg: Option<Stats>,
    pub phase: Phase,
    pub status: String,
    pub sample_count: usize,
    pub active_bins: usize,
    /// Flat grid indices filled in the final phase, ascending
    pub filled_bins: Vec<u16>,
    pub coverage_percent: f32,
    pub elevation_distribution: Vec<u16>,
    pub azimuth_distribution: Vec<u16>,
    pub provisional_offset: [f64; 3],
    pub hard_iron_range: [f64; 3],
    pub calibration: CalibrationResult,
    pub method: &'static str,
    pub fallback_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
}

/// Feed `readings` through a new calibration session and summarize it.
pub fn replay(
    source: &str,
    readings: &[Reading],
    config: &CalibrationConfig,
    trace: bool,
) -> anyhow::Result<ReplaySummary> {
    let mut cal = MagCalibrator::with_config(config.clone())?;
    cal.begin_calibration();

    let mut magnitude = RunningStats::default();
    let mut elevation = RunningStats::default();
    let mut azimuth = RunningStats::default();
    let mut entries = Vec::new();
    let (mut invalid, mut accepted) = (0usize, 0usize);

    for reading in readings {
        let raw = reading.raw;
        let r = raw.norm();
        let ok = cal.add_sample(raw.x, raw.y, raw.z);
        if ok {
            accepted += 1;
        }
        if !r.is_finite() || r == 0.0 {
            invalid += 1;
            continue;
        }

        let dir = locate(&raw);
        magnitude.push(r);
        elevation.push(dir.elevation_deg());
        azimuth.push(dir.azimuth_deg());

        if trace {
            let working = raw - cal.provisional_offset();
            if working.norm() == 0.0 {
                continue;
            }
            let binned = locate(&working);
            entries.push(TraceEntry {
                line: reading.line,
                raw: [raw.x, raw.y, raw.z],
                magnitude: working.norm(),
                azimuth_deg: binned.azimuth_deg(),
                elevation_deg: binned.elevation_deg(),
                azimuth_bin: binned.bin.azimuth,
                elevation_bin: binned.bin.elevation,
                phase: cal.phase(),
                accepted: ok,
            });
        }
    }

    let outcome = cal.compute_calibration_detailed();
    let fallback_reason = match outcome.method {
        FitMethod::DiagonalFallback { reason } => Some(reason.to_string()),
        FitMethod::Ellipsoid => None,
    };
    let offsets = cal.hard_iron_offsets();

    log::debug!(
        "{source}: {accepted} of {} readings stored, coverage {:.1}%",
        readings.len(),
        cal.coverage_percent()
    );

    Ok(ReplaySummary {
        source: source.to_string(),
        generated_at: Utc::now().to_rfc3339(),
        readings: readings.len(),
        invalid,
        accepted,
        rejected: readings.len() - accepted,
        magnitude: magnitude.finish(),
        elevation_deg: elevation.finish(),
        azimuth_deg: azimuth.finish(),
        phase: cal.phase(),
        status: cal.status().to_string(),
        sample_count: cal.sample_count(),
        active_bins: cal.active_bin_count(),
        filled_bins: cal.filled_bins().map(|idx| idx as u16).collect(),
        coverage_percent: cal.coverage_percent(),
        elevation_distribution: cal.elevation_bin_distribution().to_vec(),
        azimuth_distribution: cal.azimuth_bin_distribution().to_vec(),
        provisional_offset: [offsets.offset.x, offsets.offset.y, offsets.offset.z],
        hard_iron_range: [offsets.range.x, offsets.range.y, offsets.range.z],
        calibration: outcome.result,
        method: outcome.method.label(),
        fallback_reason,
        trace: trace.then_some(entries),
    })
}

/// Candidate/baseline ratio above which the field strength differs materially.
pub const MAGNITUDE_RATIO_LIMIT: f64 = 1.5;
/// Candidate/baseline coverage ratio below which coverage collapsed.
pub const COVERAGE_RATIO_LIMIT: f64 = 0.3;
/// Mean elevation shift (degrees) that indicates a tilted sensor frame.
pub const ELEVATION_SHIFT_LIMIT: f64 = 10.0;
/// Shared-bin percentage below which the two logs disagree on orientation.
pub const OVERLAP_PERCENT_LIMIT: f64 = 50.0;

/// Side-by-side comparison of two replayed logs.
///
/// Ratios are candidate over baseline and are `None` when the baseline value
/// is zero or missing.
#[derive(Clone, Debug, Serialize)]
pub struct Comparison {
    pub baseline: String,
    pub candidate: String,
    pub valid_samples_ratio: Option<f64>,
    pub unique_bins_ratio: Option<f64>,
    pub coverage_ratio: Option<f64>,
    pub magnitude_ratio: Option<f64>,
    pub elevation_ratio: Option<f64>,
    pub azimuth_ratio: Option<f64>,
    /// Candidate mean elevation minus baseline mean elevation
    pub elevation_shift_deg: Option<f64>,
    pub shared_bins: usize,
    /// Shared bins as a percentage of the union of filled bins
    pub overlap_percent: f64,
    pub findings: Vec<String>,
}

fn ratio(candidate: f64, baseline: f64) -> Option<f64> {
    (baseline != 0.0).then(|| candidate / baseline)
}

fn mean_ratio(candidate: Option<Stats>, baseline: Option<Stats>) -> Option<f64> {
    ratio(candidate?.mean, baseline?.mean)
}

/// Compare a candidate log against a baseline.
pub fn compare(baseline: &ReplaySummary, candidate: &ReplaySummary) -> Comparison {
    let valid = |s: &ReplaySummary| (s.readings - s.invalid) as f64;
    let shared_bins = candidate
        .filled_bins
        .iter()
        .filter(|&idx| baseline.filled_bins.binary_search(idx).is_ok())
        .count();
    let union = baseline.filled_bins.len() + candidate.filled_bins.len() - shared_bins;
    let overlap_percent = if union > 0 {
        shared_bins as f64 / union as f64 * 100.0
    } else {
        0.0
    };

    let magnitude_ratio = mean_ratio(candidate.magnitude, baseline.magnitude);
    let coverage_ratio = ratio(
        f64::from(candidate.coverage_percent),
        f64::from(baseline.coverage_percent),
    );
    let elevation_shift_deg = candidate
        .elevation_deg
        .zip(baseline.elevation_deg)
        .map(|(c, b)| c.mean - b.mean);

    let mut findings = Vec::new();
    if let Some(r) = magnitude_ratio.filter(|&r| r > MAGNITUDE_RATIO_LIMIT) {
        findings.push(format!("Candidate field is {r:.1}x stronger than baseline"));
    }
    if let Some(r) = coverage_ratio.filter(|&r| r < COVERAGE_RATIO_LIMIT) {
        findings.push(format!("Candidate reaches only {r:.2}x the baseline coverage"));
    }
    if let Some(d) = elevation_shift_deg.filter(|d| d.abs() > ELEVATION_SHIFT_LIMIT) {
        findings.push(format!("Mean elevation shifted by {d:.1} degrees"));
    }
    if overlap_percent < OVERLAP_PERCENT_LIMIT {
        findings.push(format!("Only {overlap_percent:.1}% of filled bins are shared"));
    }

    Comparison {
        baseline: baseline.source.clone(),
        candidate: candidate.source.clone(),
        valid_samples_ratio: ratio(valid(candidate), valid(baseline)),
        unique_bins_ratio: ratio(candidate.active_bins as f64, baseline.active_bins as f64),
        coverage_ratio,
        magnitude_ratio,
        elevation_ratio: mean_ratio(candidate.elevation_deg, baseline.elevation_deg),
        azimuth_ratio: mean_ratio(candidate.azimuth_deg, baseline.azimuth_deg),
        elevation_shift_deg,
        shared_bins,
        overlap_percent,
        findings,
    }
}
