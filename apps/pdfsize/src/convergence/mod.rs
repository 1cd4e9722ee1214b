// Size convergence: calibrate a per-page cost, project a page count, then correct
// the projection across a bounded number of full-scale renders.

pub mod controller;
pub mod estimate;

pub use controller::{converge_to_size, ConvergenceOptions, ConvergenceOutcome, CALIBRATION_UNITS};
