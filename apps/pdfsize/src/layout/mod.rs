// Filler document layout: static font metrics, greedy word wrap, and page filling.
// Pure CPU work; the PDF renderer calls into it from inside tokio::task::spawn_blocking.

pub mod font_metrics;
pub mod page_fill;
pub mod wrap;

// Re-export the public API consumed by the renderer and the CLI.
pub use font_metrics::{default_page_config, get_metrics, FontFamily, PageConfig};
pub use page_fill::{PageFiller, PlacedLine};
