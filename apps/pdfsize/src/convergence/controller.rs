//! Convergence loop. Drives a `Renderer` towards a target output size.
//!
//! # Architecture
//! - `converge_to_size` is the public async entry point.
//! - One calibration render at `calibration_units` seeds the per-unit cost.
//! - Up to `max_iterations` full-scale renders follow, each corrected by
//!   `next_estimate` from the render before it.
//! - Renders are strictly sequential: every estimate depends on the previous
//!   measurement, so nothing is issued concurrently.
//!
//! Running out of iterations is not an error. The last render is kept and the
//! outcome reports `within_tolerance = false`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::convergence::estimate::{
    initial_estimate, next_estimate, size_difference, validate_target, ConvergenceState,
};
use crate::errors::{ConvergeError, RenderFailure};
use crate::render::{validate_result, RenderRequest, RenderResult, Renderer};

/// Pages rendered during calibration.
///
/// Five pages spread fixed per-document overhead (header, catalog, the title
/// block on page one) thinly enough that the derived per-page cost is close to
/// the marginal cost, while keeping the sample render cheap.
pub const CALIBRATION_UNITS: u32 = 5;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Knobs that do not change the meaning of the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceOptions {
    pub calibration_units: u32,
    /// End the run early when the next estimate repeats the previous request.
    /// Off by default: the iteration cap is the safety net.
    pub stop_on_stall: bool,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            calibration_units: CALIBRATION_UNITS,
            stop_on_stall: false,
        }
    }
}

/// Emitted after every render; full-scale renders are also kept in the outcome history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub iteration: u32,
    pub estimated_units: u32,
    pub realized_units: u32,
    pub measured_bytes: u64,
    pub percent_of_target: f64,
}

/// Result of a completed run, whether or not the tolerance was met.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceOutcome {
    pub final_bytes: u64,
    pub final_units: u32,
    pub iterations_used: u32,
    pub within_tolerance: bool,
    pub target_bytes: f64,
    pub calibration: RenderResult,
    pub calibration_bytes_per_unit: f64,
    /// One entry per full-scale render, in order.
    pub history: Vec<ProgressEvent>,
}

impl ConvergenceOutcome {
    /// Relative distance of the accepted render from the target.
    pub fn difference(&self) -> f64 {
        size_difference(self.final_bytes, self.target_bytes)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry point
// ────────────────────────────────────────────────────────────────────────────

/// Renders until the output size is within `tolerance` of `target_bytes`, or
/// `max_iterations` full-scale renders have been made.
///
/// Parameters are validated before any render. Any `RenderFailure` aborts the
/// run immediately and is returned unchanged inside `ConvergeError::Render`.
pub async fn converge_to_size<R>(
    renderer: &R,
    target_bytes: f64,
    tolerance: f64,
    max_iterations: u32,
    options: &ConvergenceOptions,
) -> Result<ConvergenceOutcome, ConvergeError>
where
    R: Renderer + ?Sized,
{
    validate_target(target_bytes, tolerance, max_iterations)?;

    let run_id = Uuid::new_v4();
    let span = info_span!("converge", %run_id, target_bytes, tolerance, max_iterations);

    run_loop(renderer, target_bytes, tolerance, max_iterations, options)
        .instrument(span)
        .await
}

async fn run_loop<R>(
    renderer: &R,
    target_bytes: f64,
    tolerance: f64,
    max_iterations: u32,
    options: &ConvergenceOptions,
) -> Result<ConvergenceOutcome, ConvergeError>
where
    R: Renderer + ?Sized,
{
    // Calibration phase.
    let calibration_units = options.calibration_units.max(1);
    let calibration = render_units(renderer, calibration_units).await?;
    emit_progress(&progress_event(0, calibration_units, &calibration, target_bytes));
    let calibration_bytes_per_unit = calibration.bytes_per_unit();
    let first_estimate = initial_estimate(target_bytes, &calibration)?;

    info!(
        pages = calibration.realized_units,
        bytes = calibration.byte_size,
        kb_per_page = %format!("{:.2}", calibration_bytes_per_unit / 1024.0),
        "Calibration complete"
    );
    info!(estimated_units = first_estimate, "Initial estimate");

    let mut state = ConvergenceState::new(target_bytes, tolerance, max_iterations, first_estimate);
    let mut history = Vec::with_capacity(max_iterations.min(64) as usize);

    let accepted = loop {
        let requested = state.estimated_units;
        let result = render_units(renderer, requested).await?;
        state.record(result);

        let event = progress_event(state.iteration_count, requested, &result, target_bytes);
        emit_progress(&event);
        history.push(event);

        if state.accepts(&result) {
            info!(
                iteration = state.iteration_count,
                difference_percent = %format!("{:.1}", size_difference(result.byte_size, target_bytes) * 100.0),
                "Size within tolerance"
            );
            break result;
        }

        if state.is_exhausted() {
            warn!(
                iterations = state.iteration_count,
                final_bytes = result.byte_size,
                "Iteration limit reached before tolerance; keeping last render"
            );
            break result;
        }

        if result.byte_size == 0 {
            return Err(ConvergeError::DegenerateCost {
                units: result.realized_units,
            });
        }

        let next = next_estimate(&state, &result);
        if next == requested {
            warn!(
                estimated_units = next,
                iteration = state.iteration_count,
                "Estimate did not change; correction is not making progress"
            );
            if options.stop_on_stall {
                break result;
            }
        }

        debug!(
            from = requested,
            to = next,
            iteration = state.iteration_count + 1,
            "Adjusting estimate"
        );
        state.estimated_units = next;
    };

    Ok(ConvergenceOutcome {
        final_bytes: accepted.byte_size,
        final_units: accepted.realized_units,
        iterations_used: state.iteration_count,
        within_tolerance: state.accepts(&accepted),
        target_bytes,
        calibration,
        calibration_bytes_per_unit,
        history,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// Issues one render and checks the adapter kept its side of the contract.
async fn render_units<R>(renderer: &R, units: u32) -> Result<RenderResult, RenderFailure>
where
    R: Renderer + ?Sized,
{
    let request = RenderRequest {
        requested_units: units,
    };
    let result = renderer.render(request).await?;
    validate_result(request, result)
}

/// Iteration 0 is the calibration render.
fn progress_event(
    iteration: u32,
    requested: u32,
    result: &RenderResult,
    target_bytes: f64,
) -> ProgressEvent {
    ProgressEvent {
        iteration,
        estimated_units: requested,
        realized_units: result.realized_units,
        measured_bytes: result.byte_size,
        percent_of_target: result.byte_size as f64 / target_bytes * 100.0,
    }
}

fn emit_progress(event: &ProgressEvent) {
    info!(
        iteration = event.iteration,
        estimated_units = event.estimated_units,
        realized_units = event.realized_units,
        measured_bytes = event.measured_bytes,
        percent_of_target = %format!("{:.1}", event.percent_of_target),
        "Render measured"
    );
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Deterministic renderer: `overhead + realized * per_unit` bytes.
    /// Realized units are capped at `max_units` to model early termination.
    struct LinearRenderer {
        per_unit: u64,
        overhead: u64,
        max_units: u32,
        calls: Mutex<Vec<u32>>,
    }

    impl LinearRenderer {
        fn new(per_unit: u64) -> Self {
            Self {
                per_unit,
                overhead: 0,
                max_units: u32::MAX,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_overhead(mut self, overhead: u64) -> Self {
            self.overhead = overhead;
            self
        }

        fn capped_at(mut self, max_units: u32) -> Self {
            self.max_units = max_units;
            self
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Renderer for LinearRenderer {
        async fn render(&self, request: RenderRequest) -> Result<RenderResult, RenderFailure> {
            self.calls.lock().unwrap().push(request.requested_units);
            let realized = request.requested_units.max(1).min(self.max_units);
            Ok(RenderResult {
                realized_units: realized,
                byte_size: self.overhead + realized as u64 * self.per_unit,
            })
        }
    }

    /// Fails on call number `fail_on` (1-based); otherwise behaves linearly.
    struct FailingRenderer {
        fail_on: usize,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Renderer for FailingRenderer {
        async fn render(&self, request: RenderRequest) -> Result<RenderResult, RenderFailure> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == self.fail_on {
                return Err(RenderFailure::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            Ok(RenderResult {
                realized_units: request.requested_units,
                byte_size: request.requested_units as u64 * 100,
            })
        }
    }

    /// Reports a fixed result regardless of the request.
    struct FixedRenderer(RenderResult);

    #[async_trait]
    impl Renderer for FixedRenderer {
        async fn render(&self, _request: RenderRequest) -> Result<RenderResult, RenderFailure> {
            Ok(self.0)
        }
    }

    fn defaults() -> ConvergenceOptions {
        ConvergenceOptions::default()
    }

    // ── worked examples ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_undershoot_example_converges_first_iteration() {
        let renderer = LinearRenderer::new(100);
        let outcome = converge_to_size(&renderer, 1000.0, 0.05, 5, &defaults())
            .await
            .unwrap();

        assert!(outcome.within_tolerance);
        assert_eq!(outcome.iterations_used, 1);
        assert_eq!(outcome.final_bytes, 1000);
        assert_eq!(outcome.final_units, 10);
        assert_eq!(renderer.calls(), vec![5, 10], "calibration then one full render");
    }

    #[tokio::test]
    async fn test_overshoot_example_ends_by_exhaustion() {
        let renderer = LinearRenderer::new(1000);
        let outcome = converge_to_size(&renderer, 500.0, 0.05, 5, &defaults())
            .await
            .unwrap();

        assert!(!outcome.within_tolerance);
        assert_eq!(outcome.final_units, 1);
        assert_eq!(outcome.final_bytes, 1000);
        assert_eq!(outcome.iterations_used, 5);
        assert_eq!(renderer.calls(), vec![5, 1, 1, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_stop_on_stall_ends_overshoot_early() {
        let renderer = LinearRenderer::new(1000);
        let options = ConvergenceOptions {
            stop_on_stall: true,
            ..ConvergenceOptions::default()
        };
        let outcome = converge_to_size(&renderer, 500.0, 0.05, 5, &options)
            .await
            .unwrap();

        assert!(!outcome.within_tolerance);
        assert_eq!(outcome.iterations_used, 1);
        assert_eq!(outcome.final_units, 1);
    }

    #[tokio::test]
    async fn test_exact_calibration_prediction_uses_one_iteration() {
        let renderer = LinearRenderer::new(2048);
        let outcome = converge_to_size(&renderer, 2048.0 * 37.0, 0.01, 5, &defaults())
            .await
            .unwrap();

        assert!(outcome.within_tolerance);
        assert_eq!(outcome.iterations_used, 1);
        assert_eq!(outcome.final_units, 37);
        assert!((outcome.calibration_bytes_per_unit - 2048.0).abs() < 1e-9);
    }

    // ── correction strategies through the loop ──────────────────────────────

    #[tokio::test]
    async fn test_fixed_overhead_corrects_additively() {
        // bytes = 1000 + 100/unit. Calibration: 1500/5 = 300/unit → 34 units.
        // 34 → 4400 bytes → +44 → 78 → 8800 bytes → +11 → 89 → 9900 bytes (1%).
        let renderer = LinearRenderer::new(100).with_overhead(1000);
        let outcome = converge_to_size(&renderer, 10_000.0, 0.05, 5, &defaults())
            .await
            .unwrap();

        assert!(outcome.within_tolerance);
        assert_eq!(renderer.calls(), vec![5, 34, 78, 89]);
        assert_eq!(outcome.iterations_used, 3);
        assert_eq!(outcome.final_bytes, 9900);
    }

    #[tokio::test]
    async fn test_early_termination_anchors_on_realized_units() {
        // Renderer never produces more than 8 units, so the run cannot reach 2000 bytes.
        let renderer = LinearRenderer::new(100).capped_at(8);
        let outcome = converge_to_size(&renderer, 2000.0, 0.05, 3, &defaults())
            .await
            .unwrap();

        assert!(!outcome.within_tolerance);
        assert_eq!(outcome.final_units, 8);
        assert_eq!(outcome.iterations_used, 3);
        assert_eq!(renderer.calls(), vec![5, 20, 20, 20]);
    }

    #[tokio::test]
    async fn test_target_smaller_than_one_unit_requests_one_unit() {
        let renderer = LinearRenderer::new(5000);
        let outcome = converge_to_size(&renderer, 10.0, 0.5, 2, &defaults())
            .await
            .unwrap();

        assert!(renderer.calls().iter().all(|&u| u >= 1));
        assert_eq!(outcome.final_units, 1);
    }

    // ── properties ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_constant_cost_converges_with_two_iterations() {
        // Every target needs ≥ 10 units at 1000 bytes/unit, so a 10% band absorbs rounding.
        for target in (10_000..=50_000u64).step_by(777) {
            let renderer = LinearRenderer::new(1000);
            let outcome = converge_to_size(&renderer, target as f64, 0.1, 2, &defaults())
                .await
                .unwrap();
            assert!(
                outcome.within_tolerance,
                "target {target} ended at {} bytes",
                outcome.final_bytes
            );
        }
    }

    #[tokio::test]
    async fn test_iterations_never_exceed_limit() {
        for max_iterations in 1..=6u32 {
            let renderer = LinearRenderer::new(1000).with_overhead(777);
            let outcome = converge_to_size(&renderer, 12_345.0, 0.001, max_iterations, &defaults())
                .await
                .unwrap();
            assert!(outcome.iterations_used <= max_iterations);
            assert!(outcome.iterations_used >= 1);
            assert_eq!(outcome.history.len(), outcome.iterations_used as usize);
        }
    }

    #[tokio::test]
    async fn test_history_records_percent_of_target() {
        let renderer = LinearRenderer::new(100);
        let outcome = converge_to_size(&renderer, 1000.0, 0.05, 5, &defaults())
            .await
            .unwrap();

        let event = &outcome.history[0];
        assert_eq!(event.iteration, 1);
        assert_eq!(event.estimated_units, 10);
        assert_eq!(event.measured_bytes, 1000);
        assert!((event.percent_of_target - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_custom_calibration_size_is_used() {
        let renderer = LinearRenderer::new(100);
        let options = ConvergenceOptions {
            calibration_units: 2,
            ..ConvergenceOptions::default()
        };
        converge_to_size(&renderer, 1000.0, 0.05, 5, &options)
            .await
            .unwrap();
        assert_eq!(renderer.calls()[0], 2);
    }

    // ── failures ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_calibration_failure_propagates_before_estimating() {
        let renderer = FailingRenderer {
            fail_on: 1,
            calls: Mutex::new(0),
        };
        let err = converge_to_size(&renderer, 1000.0, 0.05, 5, &defaults())
            .await
            .unwrap_err();

        assert!(matches!(err, ConvergeError::Render(RenderFailure::Io(_))));
        assert_eq!(*renderer.calls.lock().unwrap(), 1, "no render after a failed calibration");
    }

    #[tokio::test]
    async fn test_failure_mid_run_aborts() {
        let renderer = FailingRenderer {
            fail_on: 2,
            calls: Mutex::new(0),
        };
        let err = converge_to_size(&renderer, 1000.0, 0.05, 5, &defaults())
            .await
            .unwrap_err();

        assert!(matches!(err, ConvergeError::Render(_)));
        assert_eq!(*renderer.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_target_rejected_without_rendering() {
        let renderer = LinearRenderer::new(100);
        for (target, tol, iters) in [(0.0, 0.05, 5), (-5.0, 0.05, 5), (1000.0, 0.0, 5), (1000.0, 1.0, 5), (1000.0, 0.05, 0)] {
            let err = converge_to_size(&renderer, target, tol, iters, &defaults())
                .await
                .unwrap_err();
            assert!(matches!(err, ConvergeError::InvalidTarget(_)));
        }
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_byte_calibration_is_degenerate() {
        let renderer = FixedRenderer(RenderResult {
            realized_units: 1,
            byte_size: 0,
        });
        let err = converge_to_size(&renderer, 1000.0, 0.05, 5, &defaults())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergeError::DegenerateCost { .. }));
    }

    #[tokio::test]
    async fn test_contract_violation_surfaces_as_render_failure() {
        // Claims 50 units for a 5-unit calibration request.
        let renderer = FixedRenderer(RenderResult {
            realized_units: 50,
            byte_size: 5000,
        });
        let err = converge_to_size(&renderer, 1000.0, 0.05, 5, &defaults())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergeError::Render(RenderFailure::Contract(_))));
    }
}
