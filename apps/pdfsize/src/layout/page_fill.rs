//! Page Fill: lays the filler text out page by page.
//!
//! The body is one continuous stream of wrapped filler blocks separated by a
//! blank line. Each page takes as many lines from the stream as its height
//! allows and the next page resumes where the previous one stopped, so text
//! flows across pages but never forces an extra page. One page in is one page
//! out, which is what keeps the per-page byte cost stable.
//!
//! Page one additionally carries a centered title block.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::{FontMetricTable, PageConfig};
use crate::layout::wrap::wrap_text;

/// Base paragraph of the filler text. Embedded newlines are hard breaks.
pub const FILLER_PARAGRAPH: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. \n\
Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. \n\
Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris \n\
nisi ut aliquip ex ea commodo consequat. Duis aute irure dolor in \n\
reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla \n\
pariatur. Excepteur sint occaecat cupidatat non proident, sunt in \n\
culpa qui officia deserunt mollit anim id est laborum. ";

/// Times the paragraph is repeated to form one filler block.
pub const FILLER_REPEAT: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// One line of text at an absolute position. `baseline_pt` is measured from
/// the bottom edge of the page, as PDF coordinates are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedLine {
    pub text: String,
    pub x_pt: f32,
    pub baseline_pt: f32,
    pub font_size_pt: f32,
    pub is_title: bool,
}

/// Produces the lines of successive pages from the filler stream.
pub struct PageFiller<'a> {
    config: &'a PageConfig,
    metrics: &'a FontMetricTable,
    title: String,
    /// One filler block; `None` marks the blank separator line.
    body: Vec<Option<String>>,
    cursor: usize,
}

impl<'a> PageFiller<'a> {
    pub fn new(config: &'a PageConfig, metrics: &'a FontMetricTable, title: impl Into<String>) -> Self {
        let block = FILLER_PARAGRAPH.repeat(FILLER_REPEAT);
        let mut body: Vec<Option<String>> = wrap_text(&block, metrics, config.body_width_em())
            .into_iter()
            .map(Some)
            .collect();
        body.push(None);

        Self {
            config,
            metrics,
            title: title.into(),
            body,
            cursor: 0,
        }
    }

    /// Lays out page `page_index` (0-based), consuming body lines from the stream.
    ///
    /// Pages must be requested in order; the stream position carries over.
    pub fn fill_page(&mut self, page_index: u32) -> Vec<PlacedLine> {
        let cfg = self.config;
        let top = cfg.page_height_pt - cfg.margin_pt;
        let mut lines = Vec::new();
        let mut used_height = 0.0_f32;

        if page_index == 0 {
            lines.push(self.title_line(top));
            used_height += cfg.title_block_height_pt();
        }

        let line_height = cfg.body_line_height_pt();
        let available = ((cfg.usable_height_pt() - used_height) / line_height).floor().max(0.0) as usize;

        for slot in 0..available {
            let entry = &self.body[self.cursor];
            self.cursor = (self.cursor + 1) % self.body.len();

            if let Some(text) = entry {
                let line_top = top - used_height - slot as f32 * line_height;
                lines.push(PlacedLine {
                    text: text.clone(),
                    x_pt: cfg.margin_pt,
                    baseline_pt: line_top - cfg.body_font_size_pt,
                    font_size_pt: cfg.body_font_size_pt,
                    is_title: false,
                });
            }
        }

        lines
    }

    fn title_line(&self, top: f32) -> PlacedLine {
        let cfg = self.config;
        let size = cfg.title_font_size_pt;
        let width = self.metrics.width_pt(&self.title, size);
        let x = cfg.margin_pt + ((cfg.text_width_pt() - width) / 2.0).max(0.0);

        PlacedLine {
            text: self.title.clone(),
            x_pt: x,
            baseline_pt: top - size,
            font_size_pt: size,
            is_title: true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::{default_page_config, get_metrics, FontFamily};

    fn make_config() -> PageConfig {
        default_page_config(FontFamily::Helvetica)
    }

    #[test]
    fn test_first_page_starts_with_centered_title() {
        let config = make_config();
        let metrics = get_metrics(&config.font);
        let mut filler = PageFiller::new(&config, metrics, "PDF of 1 MB");
        let page = filler.fill_page(0);

        let title = &page[0];
        assert!(title.is_title);
        assert_eq!(title.text, "PDF of 1 MB");
        let width = metrics.width_pt(&title.text, title.font_size_pt);
        let left_gap = title.x_pt - config.margin_pt;
        let right_gap = config.page_width_pt - config.margin_pt - (title.x_pt + width);
        assert!((left_gap - right_gap).abs() < 1e-2, "title should be centered");
    }

    #[test]
    fn test_later_pages_have_no_title() {
        let config = make_config();
        let mut filler = PageFiller::new(&config, get_metrics(&config.font), "T");
        filler.fill_page(0);
        let page = filler.fill_page(1);
        assert!(page.iter().all(|l| !l.is_title));
    }

    #[test]
    fn test_lines_stay_inside_margins() {
        let config = make_config();
        let metrics = get_metrics(&config.font);
        let mut filler = PageFiller::new(&config, metrics, "PDF of 2 MB");

        for page_index in 0..4 {
            for line in filler.fill_page(page_index) {
                assert!(line.baseline_pt >= config.margin_pt, "line below bottom margin");
                assert!(line.baseline_pt <= config.page_height_pt - config.margin_pt);
                let right = line.x_pt + metrics.width_pt(&line.text, line.font_size_pt);
                assert!(
                    right <= config.page_width_pt - config.margin_pt + 1e-2,
                    "line overflows right margin: {}",
                    line.text
                );
            }
        }
    }

    #[test]
    fn test_body_flows_across_pages() {
        let config = make_config();
        let mut filler = PageFiller::new(&config, get_metrics(&config.font), "T");
        let first = filler.fill_page(0);
        let second = filler.fill_page(1);

        // Page one has fewer body slots than page two because of the title block.
        let first_body = first.iter().filter(|l| !l.is_title).count();
        assert!(first_body < second.len());
        // The stream resumed rather than restarting at the first filler line.
        assert_ne!(first[1].text, second[0].text);
    }

    #[test]
    fn test_full_page_uses_every_slot() {
        let config = make_config();
        let mut filler = PageFiller::new(&config, get_metrics(&config.font), "T");
        filler.fill_page(0);
        let page = filler.fill_page(1);
        // Blank separators take a slot but emit no line; a block is longer than
        // half a page, so at most two fall on one page.
        assert!(page.len() >= config.body_lines_per_page() - 2);
        assert!(page.len() <= config.body_lines_per_page());
    }
}
