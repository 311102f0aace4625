//! Two-phase magnetometer calibration session
//!
//! Phase 1 collects raw samples until a min/max estimate of the hard-iron
//! offset has enough spread on every axis. The offset is then frozen, the
//! grid restarts empty, and phase 2 collects offset-corrected samples for the
//! final ellipsoid fit. All state lives in fixed arrays owned by one
//! [`MagCalibrator`]; nothing allocates after construction.

use crate::binning::{OrientationGrid, TOTAL_BINS};
use crate::config::CalibrationConfig;
use crate::error::{ConfigError, FitError};
use crate::fit::{self, CalibrationOutcome};
use crate::hard_iron::{self, Phase};
use crate::status::CalibrationStatus;
use crate::store::SampleStore;
use crate::types::{CalibrationResult, HardIronOffsets, Vector3};

#[derive(Clone, Debug)]
pub struct MagCalibrator {
    config: CalibrationConfig,
    grid: OrientationGrid,
    store: SampleStore,
    hard_iron: HardIronOffsets,
    last_sample: Vector3,
    status: CalibrationStatus,
}

impl Default for MagCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MagCalibrator {
    pub fn new() -> Self {
        Self {
            config: CalibrationConfig::default(),
            grid: OrientationGrid::new(),
            store: SampleStore::new(),
            hard_iron: HardIronOffsets::default(),
            last_sample: Vector3::zeros(),
            status: CalibrationStatus::Idle,
        }
    }

    pub fn with_config(config: CalibrationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Start a new session, discarding all samples, coverage and phase-1 state.
    pub fn begin_calibration(&mut self) {
        self.grid.reset();
        self.store.clear();
        self.hard_iron = HardIronOffsets::default();
        self.last_sample = Vector3::zeros();
        self.status = CalibrationStatus::Idle;
    }

    /// Offer one raw reading (µT). Returns true when it was stored.
    pub fn add_sample(&mut self, x: f64, y: f64, z: f64) -> bool {
        let raw = Vector3::new(x, y, z);
        self.last_sample = raw;

        // Rejected before any phase logic so bad readings never touch state
        let r = raw.norm();
        if !r.is_finite() || r == 0.0 {
            log::trace!("invalid reading ({x}, {y}, {z})");
            self.status = CalibrationStatus::InvalidReading;
            return false;
        }

        match self.phase() {
            Phase::Collecting => self.update_hard_iron(),
            Phase::OffsetApplied => {
                self.status = CalibrationStatus::CollectingSoftIron {
                    covered: 0,
                    total: TOTAL_BINS as u16,
                }
            }
        }

        let accepted = self.admit(raw - self.provisional_offset());

        if let CalibrationStatus::CollectingSoftIron { covered, .. } = &mut self.status {
            *covered = self.grid.filled_count() as u16;
        }
        accepted
    }

    fn update_hard_iron(&mut self) {
        let required = self.config.hard_iron_sample_threshold;
        let collected = self.store.len();
        if collected < required as usize {
            self.status = CalibrationStatus::CollectingHardIron {
                collected: collected as u16,
                required,
            };
            return;
        }

        self.hard_iron = hard_iron::estimate(
            self.store.samples(),
            required as usize,
            self.config.hard_iron_spread_threshold,
        );

        if self.hard_iron.sufficient_spread {
            self.hard_iron.offsets_applied = true;
            self.store.clear();
            self.grid.reset();
            self.status = CalibrationStatus::HardIronApplied;
            log::info!(
                "Hard-iron offset applied after {} samples: offset {:?}, range {:?}",
                collected,
                self.hard_iron.offset.as_slice(),
                self.hard_iron.range.as_slice()
            );
        } else {
            self.status = CalibrationStatus::InsufficientSpread;
            log::debug!(
                "Hard-iron spread insufficient: range {:?}",
                self.hard_iron.range.as_slice()
            );
        }
    }

    fn admit(&mut self, sample: Vector3) -> bool {
        if self.store.is_full() {
            self.status = CalibrationStatus::MaximumReached;
            return false;
        }

        let r = sample.norm();
        let in_window = match self.phase() {
            Phase::OffsetApplied => {
                r >= self.config.min_field_magnitude && r <= self.config.max_field_magnitude
            }
            Phase::Collecting => true,
        };
        if !r.is_finite() || r == 0.0 || !in_window {
            log::trace!("magnitude {r:.2} outside accepted window");
            return false;
        }

        let (bin, is_new) = self.grid.classify(&sample);
        if !is_new {
            return false;
        }
        self.store.push(sample, bin)
    }

    pub fn phase(&self) -> Phase {
        if self.hard_iron.offsets_applied {
            Phase::OffsetApplied
        } else {
            Phase::Collecting
        }
    }

    /// Offset subtracted from incoming samples, zero until phase 1 completes.
    pub fn provisional_offset(&self) -> Vector3 {
        if self.hard_iron.offsets_applied {
            self.hard_iron.offset
        } else {
            Vector3::zeros()
        }
    }

    pub fn coverage_percent(&self) -> f32 {
        self.grid.coverage_percent()
    }

    /// Most recent raw reading, stored or not.
    pub fn last_sample(&self) -> Vector3 {
        self.last_sample
    }

    pub fn elevation_bin_distribution(&self) -> &[u16] {
        self.store.elevation_counts()
    }

    pub fn azimuth_bin_distribution(&self) -> &[u16] {
        self.store.azimuth_counts()
    }

    pub fn active_bin_count(&self) -> usize {
        self.grid.filled_count()
    }

    /// Flat grid indices visited in the current phase, ascending.
    pub fn filled_bins(&self) -> impl Iterator<Item = usize> + '_ {
        self.grid.filled_bins()
    }

    pub fn sample_count(&self) -> usize {
        self.store.len()
    }

    /// Stored samples, offset-corrected once phase 2 is active.
    pub fn samples(&self) -> &[Vector3] {
        self.store.samples()
    }

    /// Latest phase-1 estimate; frozen once applied.
    pub fn hard_iron_offsets(&self) -> &HardIronOffsets {
        &self.hard_iron
    }

    pub fn status(&self) -> CalibrationStatus {
        self.status
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Final calibration from the current sample set. Never fails; numerical
    /// trouble selects the diagonal fallback.
    pub fn compute_calibration(&self) -> CalibrationResult {
        self.compute_calibration_detailed().result
    }

    pub fn compute_calibration_detailed(&self) -> CalibrationOutcome {
        fit::calibrate(
            self.store.samples(),
            &self.provisional_offset(),
            self.config.min_fit_samples,
        )
    }

    /// The ellipsoid path alone, without falling back.
    pub fn try_fit_ellipsoid(&self) -> Result<CalibrationResult, FitError> {
        fit::fit_ellipsoid(
            self.store.samples(),
            &self.provisional_offset(),
            self.config.min_fit_samples,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::FitMethod;
    use crate::test_support::{direction_sweep, ellipsoid_points, phase1_primers, soft_iron_shape};
    use crate::types::Matrix3;
    use approx::assert_abs_diff_eq;

    fn center() -> Vector3 {
        Vector3::new(20.0, -15.0, 10.0)
    }

    fn feed(cal: &mut MagCalibrator, points: &[Vector3]) -> usize {
        let mut accepted = 0;
        for p in points {
            if cal.add_sample(p.x, p.y, p.z) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Phase-1 primers followed by a dense sweep of the same ellipsoid.
    fn run_session(cal: &mut MagCalibrator, shape: &Matrix3) -> Vec<Vector3> {
        feed(cal, &phase1_primers(&center(), shape, 45.0));
        assert_eq!(cal.phase(), Phase::OffsetApplied);
        let sweep = ellipsoid_points(&direction_sweep(3.0), &center(), shape, 45.0);
        feed(cal, &sweep);
        sweep
    }

    #[test]
    fn test_invalid_readings_leave_state_untouched() {
        let mut cal = MagCalibrator::new();
        cal.add_sample(30.0, 20.0, 10.0);
        let (count, bins, coverage) = (cal.sample_count(), cal.active_bin_count(), cal.coverage_percent());

        for (x, y, z) in [
            (0.0, 0.0, 0.0),
            (f64::NAN, 1.0, 1.0),
            (1.0, f64::INFINITY, 1.0),
            (1.0, 1.0, f64::NEG_INFINITY),
        ] {
            assert!(!cal.add_sample(x, y, z));
            assert_eq!(cal.status(), CalibrationStatus::InvalidReading);
            assert_eq!(cal.sample_count(), count);
            assert_eq!(cal.active_bin_count(), bins);
            assert_eq!(cal.coverage_percent(), coverage);
        }
    }

    #[test]
    fn test_begin_calibration_resets_everything() {
        let mut cal = MagCalibrator::new();
        run_session(&mut cal, &Matrix3::identity());
        assert!(cal.coverage_percent() > 0.0);

        cal.begin_calibration();
        assert_eq!(cal.coverage_percent(), 0.0);
        assert_eq!(cal.sample_count(), 0);
        assert_eq!(cal.phase(), Phase::Collecting);
        assert_eq!(*cal.hard_iron_offsets(), HardIronOffsets::default());
        assert_eq!(cal.status(), CalibrationStatus::Idle);
        assert!(cal.elevation_bin_distribution().iter().all(|&c| c == 0));
        assert!(cal.azimuth_bin_distribution().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_coverage_never_decreases_within_a_phase() {
        let mut cal = MagCalibrator::new();
        let mut points = phase1_primers(&center(), &Matrix3::identity(), 45.0);
        points.extend(ellipsoid_points(
            &direction_sweep(9.0),
            &center(),
            &Matrix3::identity(),
            45.0,
        ));

        let mut previous = cal.coverage_percent();
        assert_eq!(previous, 0.0);
        let mut transitions = 0;
        for p in &points {
            cal.add_sample(p.x, p.y, p.z);
            let coverage = cal.coverage_percent();
            if cal.status() == CalibrationStatus::HardIronApplied {
                transitions += 1;
            } else {
                assert!(coverage >= previous);
            }
            previous = coverage;
        }
        assert_eq!(transitions, 1);
    }

    #[test]
    fn test_same_direction_accepted_once() {
        let mut cal = MagCalibrator::new();
        let dir = Vector3::new(30.0, 40.0, 12.0);
        let accepted = (1..=6)
            .filter(|&k| {
                let s = dir * (0.5 + 0.25 * k as f64);
                cal.add_sample(s.x, s.y, s.z)
            })
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(cal.sample_count(), 1);
        assert_eq!(cal.active_bin_count(), 1);
    }

    #[test]
    fn test_phase1_transition_restarts_grid() {
        let mut cal = MagCalibrator::new();
        let primers = phase1_primers(&center(), &Matrix3::identity(), 45.0);

        let mut transition_at = None;
        for (i, p) in primers.iter().enumerate() {
            let stored_before = cal.sample_count();
            cal.add_sample(p.x, p.y, p.z);
            if cal.phase() == Phase::OffsetApplied {
                assert!(stored_before >= 30);
                transition_at = Some(i);
                break;
            }
        }
        assert!(transition_at.is_some());
        assert_eq!(cal.status(), CalibrationStatus::HardIronApplied);

        // Grid restarted; only the transition sample itself is stored
        assert_eq!(cal.sample_count(), 1);
        assert_eq!(cal.active_bin_count(), 1);

        let est = cal.hard_iron_offsets();
        assert!(est.sufficient_spread && est.offsets_applied);
        assert_abs_diff_eq!(est.offset, center(), epsilon = 1e-9);
        assert_abs_diff_eq!(cal.samples()[0].norm(), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_single_axis_motion_never_transitions() {
        let mut cal = MagCalibrator::new();
        for i in 0..60 {
            let x = -60.0 + 2.0 * i as f64;
            cal.add_sample(x, 20.0, 10.0);
        }
        assert_eq!(cal.phase(), Phase::Collecting);
        assert!(!cal.hard_iron_offsets().sufficient_spread);
        assert_ne!(cal.status(), CalibrationStatus::HardIronApplied);
    }

    #[test]
    fn test_status_counts_phase1_samples() {
        let mut cal = MagCalibrator::new();
        cal.add_sample(30.0, 0.0, 0.0);
        assert_eq!(
            cal.status(),
            CalibrationStatus::CollectingHardIron {
                collected: 0,
                required: 30
            }
        );
        cal.add_sample(0.0, 30.0, 0.0);
        assert_eq!(
            cal.status(),
            CalibrationStatus::CollectingHardIron {
                collected: 1,
                required: 30
            }
        );
    }

    #[test]
    fn test_clustered_samples() {
        // Centered in the cell at azimuth 40.5°, elevation 22.5°
        let (az, el) = (40.5f64.to_radians(), 22.5f64.to_radians());
        let base = Vector3::new(el.cos() * az.cos(), el.cos() * az.sin(), el.sin()) * 50.0;

        let mut cal = MagCalibrator::new();
        for i in 0..50 {
            let jitter = Vector3::new(
                (i % 5) as f64 * 0.6 - 1.2,
                (i / 5 % 5) as f64 * 0.6 - 1.2,
                (i % 3) as f64 * 0.6 - 0.6,
            );
            let s = base + jitter;
            cal.add_sample(s.x, s.y, s.z);
        }

        assert_eq!(cal.phase(), Phase::Collecting);
        assert!((1..=2).contains(&cal.active_bin_count()));
        assert!(cal.coverage_percent() < 1.0);
    }

    #[test]
    fn test_phase2_magnitude_window() {
        let mut cal = MagCalibrator::new();
        feed(&mut cal, &phase1_primers(&center(), &Matrix3::identity(), 45.0));
        let before = cal.sample_count();

        let too_weak = center() + Vector3::new(0.0, 5.0, 0.0);
        let too_strong = center() + Vector3::new(0.0, 0.0, -150.0);
        assert!(!cal.add_sample(too_weak.x, too_weak.y, too_weak.z));
        assert!(!cal.add_sample(too_strong.x, too_strong.y, too_strong.z));
        assert_eq!(cal.sample_count(), before);
        assert!(matches!(
            cal.status(),
            CalibrationStatus::CollectingSoftIron { total: 800, .. }
        ));
        assert_eq!(cal.last_sample(), too_strong);
    }

    #[test]
    fn test_sparse_session_uses_diagonal_fallback() {
        let mut cal = MagCalibrator::new();
        feed(&mut cal, &phase1_primers(&center(), &Matrix3::identity(), 45.0));
        assert!(cal.sample_count() < 400);

        let outcome = cal.compute_calibration_detailed();
        assert!(matches!(
            outcome.method,
            FitMethod::DiagonalFallback {
                reason: FitError::InsufficientSamples { need: 400, .. }
            }
        ));
        assert!(outcome.result.is_diagonal());
        assert!(cal.try_fit_ellipsoid().is_err());
        assert_eq!(cal.compute_calibration(), outcome.result);
    }

    #[test]
    fn test_near_flat_axis_result_is_finite() {
        let mut cal = MagCalibrator::new();
        assert!(cal.add_sample(1.0, 0.0, 0.0));
        assert!(cal.add_sample(0.0, 1.0, 1e-39));
        assert_eq!(cal.filled_bins().count(), 2);

        let result = cal.compute_calibration();
        assert!(result.is_finite());
        assert_eq!(result.soft_iron[8], 1.0);
    }

    #[test]
    fn test_sphere_session() {
        let mut cal = MagCalibrator::new();
        run_session(&mut cal, &Matrix3::identity());
        assert!(cal.active_bin_count() >= 500);

        let outcome = cal.compute_calibration_detailed();
        assert_eq!(outcome.method, FitMethod::Ellipsoid);
        assert_abs_diff_eq!(outcome.result.hard_iron_offset(), center(), epsilon = 1e-2);
        assert_abs_diff_eq!(
            outcome.result.soft_iron_matrix(),
            Matrix3::identity(),
            epsilon = 2e-3
        );
        assert_abs_diff_eq!(outcome.result.field_magnitude, 45.0, epsilon = 1e-2);
    }

    #[test]
    fn test_soft_iron_round_trip() {
        let mut cal = MagCalibrator::new();
        let shape = soft_iron_shape();
        let sweep = run_session(&mut cal, &shape);
        assert!(cal.coverage_percent() >= 80.0);

        let outcome = cal.compute_calibration_detailed();
        assert_eq!(outcome.method, FitMethod::Ellipsoid);
        let cal_result = outcome.result;
        assert_abs_diff_eq!(cal_result.hard_iron_offset(), center(), epsilon = 0.1);

        let field = f64::from(cal_result.field_magnitude);
        for raw in &sweep {
            let normalized = cal_result.apply(raw).norm() / field;
            assert!((normalized - 1.0).abs() < 0.05, "normalized magnitude {normalized}");
        }
    }

    #[test]
    fn test_full_store_reports_maximum() {
        let mut cal = MagCalibrator::new();
        run_session(&mut cal, &Matrix3::identity());
        assert_eq!(cal.sample_count(), TOTAL_BINS);
        assert_eq!(cal.coverage_percent(), 100.0);

        let p = center() + Vector3::new(45.0, 0.0, 0.0);
        assert!(!cal.add_sample(p.x, p.y, p.z));
        assert_eq!(cal.status(), CalibrationStatus::MaximumReached);
    }

    #[test]
    fn test_distributions_sum_to_sample_count() {
        let mut cal = MagCalibrator::new();
        run_session(&mut cal, &soft_iron_shape());
        let n = cal.sample_count();
        let el: usize = cal.elevation_bin_distribution().iter().map(|&c| c as usize).sum();
        let az: usize = cal.azimuth_bin_distribution().iter().map(|&c| c as usize).sum();
        assert_eq!(el, n);
        assert_eq!(az, n);
        assert_eq!(cal.active_bin_count(), n);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CalibrationConfig {
            min_field_magnitude: 100.0,
            max_field_magnitude: 10.0,
            ..CalibrationConfig::default()
        };
        assert!(MagCalibrator::with_config(config).is_err());

        let config = CalibrationConfig {
            hard_iron_sample_threshold: 10,
            ..CalibrationConfig::default()
        };
        let cal = MagCalibrator::with_config(config).unwrap();
        assert_eq!(cal.config().hard_iron_sample_threshold, 10);
    }
}
