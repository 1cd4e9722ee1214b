//! PDF page filler: the concrete `Renderer` behind the CLI.
//!
//! # Architecture
//! - `PdfRenderer::render` is the async entry point required by `Renderer`.
//! - `build_document` is the CPU-bound assembly, run via `tokio::task::spawn_blocking`.
//! - The finished bytes are written with `tokio::fs` and the byte size is read
//!   back from the file's metadata, so the reported size is what is on disk.
//!
//! Every render overwrites the same output path; the artifact left behind is
//! the last document rendered.
//!
//! A request for 0 pages is clamped to 1. The adapter never stops early, so
//! `realized_units` always equals the (clamped) request.

use std::path::PathBuf;

use async_trait::async_trait;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};
use serde::{Deserialize, Serialize};
use tracing::{debug, Span};

use crate::errors::RenderFailure;
use crate::layout::{get_metrics, PageConfig, PageFiller, PlacedLine};
use crate::render::{RenderRequest, RenderResult, Renderer};

const FONT_RESOURCE: Name<'static> = Name(b"F1");

/// zlib level used for content streams.
const COMPRESSION_LEVEL: u8 = 6;

/// Object ids: catalog, page tree, font, then one (page, content) pair per page.
const FIXED_OBJECTS: i32 = 3;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfRendererConfig {
    pub output_path: PathBuf,
    /// Centered heading on page one.
    pub title: String,
    pub page: PageConfig,
    /// Flate-compress page content streams.
    pub compress: bool,
}

pub struct PdfRenderer {
    config: PdfRendererConfig,
}

impl PdfRenderer {
    pub fn new(config: PdfRendererConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Renderer for PdfRenderer {
    async fn render(&self, request: RenderRequest) -> Result<RenderResult, RenderFailure> {
        let pages = request.requested_units.max(1);

        // CPU-bound; run on the blocking pool.
        let cfg = self.config.clone();
        let span = Span::current();
        let bytes = tokio::task::spawn_blocking(move || span.in_scope(|| build_document(&cfg, pages)))
            .await
            .map_err(|e| {
                RenderFailure::Internal(anyhow::anyhow!("spawn_blocking failed building PDF: {e}"))
            })??;

        tokio::fs::write(&self.config.output_path, &bytes).await?;
        let byte_size = tokio::fs::metadata(&self.config.output_path).await?.len();

        debug!(
            pages,
            byte_size,
            path = %self.config.output_path.display(),
            "PDF written"
        );

        Ok(RenderResult {
            realized_units: pages,
            byte_size,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Synchronous document assembly (runs inside spawn_blocking)
// ────────────────────────────────────────────────────────────────────────────

/// Builds a complete PDF of exactly `pages` filler pages.
pub(crate) fn build_document(config: &PdfRendererConfig, pages: u32) -> Result<Vec<u8>, RenderFailure> {
    let max_pages = ((i32::MAX - FIXED_OBJECTS) / 2) as u32;
    if pages > max_pages {
        return Err(RenderFailure::Engine(format!(
            "{pages} pages exceeds the {max_pages}-page object limit"
        )));
    }

    let page_cfg = &config.page;
    let metrics = get_metrics(&page_cfg.font);
    let mut filler = PageFiller::new(page_cfg, metrics, config.title.clone());

    let catalog_id = Ref::new(1);
    let pages_id = Ref::new(2);
    let font_id = Ref::new(3);
    let page_ids: Vec<Ref> = (0..pages).map(page_ref).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(pages as i32);
    pdf.type1_font(font_id).base_font(Name(metrics.base_font.as_bytes()));

    let progress_interval = if pages > 1000 { 500 } else { 50 };

    for (index, page_id) in (0..pages).zip(page_ids.iter().copied()) {
        let content_id = content_ref(index);
        let raw = page_content(&filler.fill_page(index));

        if config.compress {
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, COMPRESSION_LEVEL);
            pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);
        } else {
            pdf.stream(content_id, &raw);
        }

        {
            let mut page = pdf.page(page_id);
            page.media_box(Rect::new(0.0, 0.0, page_cfg.page_width_pt, page_cfg.page_height_pt))
                .parent(pages_id)
                .contents(content_id);
            page.resources().fonts().pair(FONT_RESOURCE, font_id);
        }

        let done = index + 1;
        if done % progress_interval == 0 {
            debug!(
                pages_done = done,
                pages_total = pages,
                progress = %format!("{:.1}%", done as f64 / pages as f64 * 100.0),
                "Generating pages"
            );
        }
    }

    Ok(pdf.finish())
}

/// Encodes one page's lines as a content stream, one text object per line.
fn page_content(lines: &[PlacedLine]) -> Vec<u8> {
    let mut content = Content::new();
    for line in lines {
        content
            .begin_text()
            .set_font(FONT_RESOURCE, line.font_size_pt)
            .next_line(line.x_pt, line.baseline_pt)
            .show(Str(line.text.as_bytes()))
            .end_text();
    }
    content.finish()
}

fn page_ref(index: u32) -> Ref {
    Ref::new(FIXED_OBJECTS + 1 + 2 * index as i32)
}

fn content_ref(index: u32) -> Ref {
    Ref::new(FIXED_OBJECTS + 2 + 2 * index as i32)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
