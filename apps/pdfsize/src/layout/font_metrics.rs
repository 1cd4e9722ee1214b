//! Static font-metric tables for the PDF standard fonts the filler uses.
//!
//! Character widths are in em units (relative to font size), taken from the
//! Adobe AFM files for the base-14 fonts. The fonts are referenced, never
//! embedded, so these tables are the only metrics the layout has.
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Font family enum
// ────────────────────────────────────────────────────────────────────────────

/// Standard Type 1 fonts available to the filler document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum FontFamily {
    /// Proportional sans-serif.
    Helvetica,
    /// Fixed-pitch; every glyph is 0.6em.
    Courier,
}

// ────────────────────────────────────────────────────────────────────────────
// Page configuration
// ────────────────────────────────────────────────────────────────────────────

/// Geometry and type sizes for one filler page. All lengths in points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    pub font: FontFamily,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub margin_pt: f32,
    pub body_font_size_pt: f32,
    pub title_font_size_pt: f32,
    /// Line height as a multiple of font size.
    pub line_spacing: f32,
    /// Blank title-sized lines between the title and the body on page one.
    pub title_gap_lines: u8,
}

impl PageConfig {
    pub fn text_width_pt(&self) -> f32 {
        self.page_width_pt - 2.0 * self.margin_pt
    }

    pub fn usable_height_pt(&self) -> f32 {
        self.page_height_pt - 2.0 * self.margin_pt
    }

    pub fn body_line_height_pt(&self) -> f32 {
        self.body_font_size_pt * self.line_spacing
    }

    pub fn title_line_height_pt(&self) -> f32 {
        self.title_font_size_pt * self.line_spacing
    }

    /// Text width expressed in body-size em units, the unit the wrapper works in.
    pub fn body_width_em(&self) -> f32 {
        self.text_width_pt() / self.body_font_size_pt
    }

    /// Body lines that fit on a page with no title block.
    pub fn body_lines_per_page(&self) -> usize {
        (self.usable_height_pt() / self.body_line_height_pt()).floor() as usize
    }

    /// Vertical space the title block takes on page one, gap included.
    pub fn title_block_height_pt(&self) -> f32 {
        self.title_line_height_pt() * (1 + self.title_gap_lines as usize) as f32
    }
}

/// Returns the default page config for the given font family.
///
/// A4 (595.28 × 841.89 pt), 50 pt margins, 12 pt body on 1.2 leading,
/// 20 pt title followed by two blank title lines.
pub fn default_page_config(font: FontFamily) -> PageConfig {
    PageConfig {
        font,
        page_width_pt: 595.28,
        page_height_pt: 841.89,
        margin_pt: 50.0,
        body_font_size_pt: 12.0,
        title_font_size_pt: 20.0,
        line_spacing: 1.2,
        title_gap_lines: 2,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for a font family.
///
/// `widths[i]` = width of ASCII character `(i + 32)` at 1em.
pub struct FontMetricTable {
    pub font: FontFamily,
    /// PostScript name written into the PDF font dictionary.
    pub base_font: &'static str,
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters (codepoints > 0x7E).
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Measures the rendered width of a string in em units.
    ///
    /// Non-ASCII characters fall back to `average_char_width`.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Width of a string in points at the given font size.
    pub fn width_pt(&self, s: &str, font_size_pt: f32) -> f32 {
        self.measure_str(s) * font_size_pt
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Helvetica,
    base_font: "Helvetica",
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.222, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.222,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.52,
    space_width: 0.278,
};

static COURIER_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Courier,
    base_font: "Courier",
    widths: [0.6; 95],
    average_char_width: 0.6,
    space_width: 0.6,
};

/// Returns the static metric table for a given font family.
pub fn get_metrics(font: &FontFamily) -> &'static FontMetricTable {
    match font {
        FontFamily::Helvetica => &HELVETICA_TABLE,
        FontFamily::Courier => &COURIER_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
