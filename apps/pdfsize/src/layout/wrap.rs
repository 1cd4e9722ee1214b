//! Greedy word wrap against a static metric table.
//!
//! Explicit `\n` characters are hard breaks. Within a paragraph, words are
//! placed left to right and a new line starts when the next word (plus its
//! leading space) would exceed the width. A single word wider than the line
//! gets a line of its own rather than being split.

use crate::layout::font_metrics::FontMetricTable;

/// Wraps `text` into lines no wider than `max_width_em`.
///
/// Empty paragraphs (consecutive newlines, or a trailing newline) produce no
/// line, so the output never contains empty strings.
pub fn wrap_text(text: &str, metrics: &FontMetricTable, max_width_em: f32) -> Vec<String> {
    text.split('\n')
        .flat_map(|paragraph| wrap_paragraph(paragraph, metrics, max_width_em))
        .collect()
}

fn wrap_paragraph(paragraph: &str, metrics: &FontMetricTable, max_width_em: f32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in paragraph.split_whitespace() {
        let word_w = metrics.measure_str(word);
        if current.is_empty() {
            current.push_str(word);
            current_width = word_w;
        } else if current_width + metrics.space_width + word_w > max_width_em {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_w;
        } else {
            current.push(' ');
            current.push_str(word);
            current_width += metrics.space_width + word_w;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
