mod config;
mod convergence;
mod errors;
mod layout;
mod render;
mod report;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::convergence::{converge_to_size, ConvergenceOptions};
use crate::layout::default_page_config;
use crate::render::{PdfRenderer, PdfRendererConfig};
use crate::report::RunReport;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (exits with usage on bad arguments)
    let config = Config::load()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.log_level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting pdfsize v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "Generating a PDF of {} MB ({} bytes)...",
        config.size_mb, config.target_bytes
    );

    let page_config = default_page_config(config.font);
    info!(
        "Page config: {:?} {}pt on {}x{}pt",
        page_config.font,
        page_config.body_font_size_pt,
        page_config.page_width_pt,
        page_config.page_height_pt
    );

    let renderer = PdfRenderer::new(PdfRendererConfig {
        output_path: config.output_path.clone(),
        title: config.title(),
        page: page_config,
        compress: config.compress,
    });

    let options = ConvergenceOptions {
        calibration_units: config.calibration_pages,
        stop_on_stall: config.stop_on_stall,
    };

    let outcome = converge_to_size(
        &renderer,
        config.target_bytes,
        config.tolerance,
        config.max_iterations,
        &options,
    )
    .await
    .with_context(|| format!("Failed to generate {}", config.output_path.display()))?;

    let output_path = tokio::fs::canonicalize(&config.output_path)
        .await
        .unwrap_or_else(|_| config.output_path.clone());
    let report = RunReport::new(&config, &outcome, output_path);

    if config.json {
        println!("{}", report.to_json()?);
    } else {
        println!("\n{}", report.render_text());
    }

    Ok(())
}
