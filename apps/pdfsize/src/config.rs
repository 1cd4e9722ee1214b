use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::Parser;

use crate::convergence::CALIBRATION_UNITS;
use crate::layout::FontFamily;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Command-line arguments. Every option also reads from the environment
/// (after `.env` is loaded), so the CLI can be driven entirely by env vars.
#[derive(Debug, Clone, Parser)]
#[command(name = "pdfsize", version, about = "Generate a PDF whose file size converges on a target")]
pub struct Cli {
    /// Target size in megabytes (1 MB = 1,048,576 bytes).
    #[arg(env = "PDFSIZE_SIZE_MB", default_value_t = 1.0)]
    pub size_mb: f64,

    /// Output file. Defaults to `output-<size>mb.pdf`.
    #[arg(env = "PDFSIZE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Accepted distance from the target, as a fraction of it.
    #[arg(long, env = "PDFSIZE_TOLERANCE", default_value_t = 0.05)]
    pub tolerance: f64,

    /// Full-scale renders allowed after calibration.
    #[arg(long, env = "PDFSIZE_MAX_ITERATIONS", default_value_t = 5)]
    pub max_iterations: u32,

    /// Pages rendered to measure the per-page cost.
    #[arg(long, env = "PDFSIZE_CALIBRATION_PAGES", default_value_t = CALIBRATION_UNITS)]
    pub calibration_pages: u32,

    #[arg(long, env = "PDFSIZE_FONT", value_enum, default_value_t = FontFamily::Helvetica)]
    pub font: FontFamily,

    /// Write page content streams uncompressed.
    #[arg(long)]
    pub no_compress: bool,

    /// Stop as soon as a correction repeats the previous page count.
    #[arg(long)]
    pub stop_on_stall: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Log level for this crate when RUST_LOG is not set.
    #[arg(long, env = "PDFSIZE_LOG", default_value = "info")]
    pub log_level: String,
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub size_mb: f64,
    pub target_bytes: f64,
    pub output_path: PathBuf,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub calibration_pages: u32,
    pub font: FontFamily,
    pub compress: bool,
    pub stop_on_stall: bool,
    pub json: bool,
    pub log_level: String,
}

impl Config {
    /// Loads `.env` (if present), parses the process arguments and resolves defaults.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self> {
        ensure!(
            cli.size_mb.is_finite() && cli.size_mb > 0.0,
            "Size must be a positive number of megabytes, got {}",
            cli.size_mb
        );
        ensure!(
            cli.calibration_pages >= 1,
            "--calibration-pages must be at least 1"
        );

        let output_path = cli
            .output
            .unwrap_or_else(|| PathBuf::from(format!("output-{}mb.pdf", cli.size_mb)));

        Ok(Config {
            size_mb: cli.size_mb,
            target_bytes: cli.size_mb * BYTES_PER_MB,
            output_path,
            tolerance: cli.tolerance,
            max_iterations: cli.max_iterations,
            calibration_pages: cli.calibration_pages,
            font: cli.font,
            compress: !cli.no_compress,
            stop_on_stall: cli.stop_on_stall,
            json: cli.json,
            log_level: cli.log_level,
        })
    }

    /// Heading printed on the first page.
    pub fn title(&self) -> String {
        format!("PDF of {} MB", self.size_mb)
    }
}
