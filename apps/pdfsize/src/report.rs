//! Terminal run report printed once a convergence run completes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::convergence::ConvergenceOutcome;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub output_path: PathBuf,
    pub target_bytes: u64,
    pub final_bytes: u64,
    pub pages: u32,
    pub iterations_used: u32,
    pub max_iterations: u32,
    pub tolerance: f64,
    pub within_tolerance: bool,
    /// Relative distance from the target, e.g. 0.012 for 1.2%.
    pub difference: f64,
    pub calibration_kb_per_page: f64,
}

impl RunReport {
    pub fn new(config: &Config, outcome: &ConvergenceOutcome, output_path: PathBuf) -> Self {
        Self {
            generated_at: Utc::now(),
            output_path,
            target_bytes: outcome.target_bytes.round() as u64,
            final_bytes: outcome.final_bytes,
            pages: outcome.final_units,
            iterations_used: outcome.iterations_used,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            within_tolerance: outcome.within_tolerance,
            difference: outcome.difference(),
            calibration_kb_per_page: outcome.calibration_bytes_per_unit / 1024.0,
        }
    }

    /// Human-readable multi-line summary.
    pub fn render_text(&self) -> String {
        let verdict = if self.within_tolerance {
            format!(
                "yes ({:.1}% off, limit {:.1}%)",
                self.difference * 100.0,
                self.tolerance * 100.0
            )
        } else {
            format!(
                "no ({:.1}% off, limit {:.1}%); keeping the closest render",
                self.difference * 100.0,
                self.tolerance * 100.0
            )
        };

        format!(
            "PDF generated.\n\
             File:       {}\n\
             Final size: {:.2} MB ({} bytes)\n\
             Target:     {:.2} MB ({} bytes)\n\
             Pages:      {}\n\
             Iterations: {} of {}\n\
             Tolerance:  {}",
            self.output_path.display(),
            self.final_bytes as f64 / BYTES_PER_MB,
            self.final_bytes,
            self.target_bytes as f64 / BYTES_PER_MB,
            self.target_bytes,
            self.pages,
            self.iterations_used,
            self.max_iterations,
            verdict,
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
