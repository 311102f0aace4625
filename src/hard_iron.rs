//! Phase-1 hard-iron estimation from min/max spread
//!
//! A cheap center-of-box estimate that runs before coverage is complete. Its
//! only job is to remove the gross sensor bias so that phase-2 binning sees
//! directions relative to the true field center.

use serde::Serialize;

use crate::store::axis_bounds;
use crate::types::{HardIronOffsets, Vector3};

/// Two-state session phase; the transition is one-way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Raw samples are binned while the provisional offset is estimated
    Collecting,
    /// Provisional offset frozen and subtracted from every sample
    OffsetApplied,
}

/// Estimate offset and spread from `samples`.
///
/// Returns defaults (zero offset, insufficient spread) when fewer than
/// `min_samples` are available. Spread is sufficient only when every axis
/// independently exceeds `spread_threshold`; rotation about a single axis
/// leaves the other offsets unobservable.
pub fn estimate(samples: &[Vector3], min_samples: usize, spread_threshold: f64) -> HardIronOffsets {
    let mut estimate = HardIronOffsets::default();

    if samples.len() < min_samples {
        return estimate;
    }
    let Some((lo, hi)) = axis_bounds(samples) else {
        return estimate;
    };

    estimate.offset = (hi + lo) / 2.0;
    estimate.range = hi - lo;
    estimate.sufficient_spread = estimate.range.iter().all(|&r| r > spread_threshold);
    estimate
}
