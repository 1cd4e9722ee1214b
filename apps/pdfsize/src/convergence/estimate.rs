//! Size estimation: the pure arithmetic behind the convergence loop.
//!
//! Nothing in here touches a renderer. The controller feeds measured
//! `RenderResult`s in and gets unit counts back, which keeps both correction
//! strategies testable on their own.
//!
//! # Correction strategies
//! - Undershoot (`bytes < target`): additive. Start from the realized unit count
//!   and add `ceil((target - bytes) / bytes_per_unit)` units.
//! - Overshoot (`bytes >= target`): multiplicative. Recompute from scratch as
//!   `floor(target / bytes_per_unit)`, floored at 1.

use serde::{Deserialize, Serialize};

use crate::errors::ConvergeError;
use crate::render::RenderResult;

// ────────────────────────────────────────────────────────────────────────────
// State
// ────────────────────────────────────────────────────────────────────────────

/// Mutable bookkeeping for one convergence run.
///
/// Owned by the controller for the duration of a run and discarded afterwards.
/// Only the controller mutates it, and only between iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceState {
    pub target_bytes: f64,
    pub tolerance: f64,
    /// Unit count the next render will request. Never below 1.
    pub estimated_units: u32,
    pub last_result: Option<RenderResult>,
    /// Full-scale renders completed so far (calibration is not counted).
    pub iteration_count: u32,
    pub max_iterations: u32,
}

impl ConvergenceState {
    pub fn new(target_bytes: f64, tolerance: f64, max_iterations: u32, estimated_units: u32) -> Self {
        Self {
            target_bytes,
            tolerance,
            estimated_units: estimated_units.max(1),
            last_result: None,
            iteration_count: 0,
            max_iterations,
        }
    }

    /// Records a completed full-scale render.
    pub fn record(&mut self, result: RenderResult) {
        self.last_result = Some(result);
        self.iteration_count += 1;
    }

    pub fn is_exhausted(&self) -> bool {
        self.iteration_count >= self.max_iterations
    }

    /// True when the measured size is within the tolerance band of the target.
    pub fn accepts(&self, result: &RenderResult) -> bool {
        size_difference(result.byte_size, self.target_bytes) <= self.tolerance
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Rejects run parameters before any render is attempted.
pub fn validate_target(
    target_bytes: f64,
    tolerance: f64,
    max_iterations: u32,
) -> Result<(), ConvergeError> {
    if !target_bytes.is_finite() || target_bytes <= 0.0 {
        return Err(ConvergeError::InvalidTarget(format!(
            "target size must be a positive number of bytes, got {target_bytes}"
        )));
    }
    if !(tolerance > 0.0 && tolerance < 1.0) {
        return Err(ConvergeError::InvalidTarget(format!(
            "tolerance must be strictly between 0 and 1, got {tolerance}"
        )));
    }
    if max_iterations < 1 {
        return Err(ConvergeError::InvalidTarget(
            "max_iterations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Relative distance of a measured size from the target: `|bytes - target| / target`.
pub fn size_difference(byte_size: u64, target_bytes: f64) -> f64 {
    (byte_size as f64 - target_bytes).abs() / target_bytes
}

/// First full-scale projection from the calibration render: `ceil(target / cost)`.
///
/// Fails when the calibration measured zero bytes, since no cost can be derived.
pub fn initial_estimate(target_bytes: f64, calibration: &RenderResult) -> Result<u32, ConvergeError> {
    if calibration.byte_size == 0 {
        return Err(ConvergeError::DegenerateCost {
            units: calibration.realized_units,
        });
    }
    Ok(to_units((target_bytes / calibration.bytes_per_unit()).ceil()))
}

/// Projects the next unit count from the render that just completed.
///
/// The per-unit cost is re-derived from `last_result` alone; earlier
/// measurements (including calibration) are discarded. The result can equal
/// the previous request, so callers must not rely on it making progress.
///
/// `last_result.byte_size` must be non-zero.
pub fn next_estimate(state: &ConvergenceState, last_result: &RenderResult) -> u32 {
    let target = state.target_bytes;
    let bytes = last_result.byte_size as f64;
    let per_unit = last_result.bytes_per_unit();

    if bytes < target {
        let additional = to_units(((target - bytes) / per_unit).ceil());
        last_result.realized_units.saturating_add(additional)
    } else {
        to_units((target / per_unit).floor())
    }
}

/// Converts a projected unit count to `u32`, floored at 1.
///
/// `as` saturates: infinities clamp to `u32::MAX` and NaN becomes 0 before the floor.
fn to_units(projected: f64) -> u32 {
    (projected as u32).max(1)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
