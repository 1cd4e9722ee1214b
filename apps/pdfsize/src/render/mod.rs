// Renderer adapter contract plus the concrete PDF page-filler adapter.
// The convergence controller only sees `Renderer`; it never reads rendered bytes.

pub mod pdf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RenderFailure;

pub use pdf::{PdfRenderer, PdfRendererConfig};

/// A single render call: how many units (pages) the document should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub requested_units: u32,
}

/// What a render produced. Immutable once returned by the adapter.
///
/// Adapters guarantee `1 <= realized_units <= requested_units`; a render may
/// stop early but never produces an empty document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    pub realized_units: u32,
    pub byte_size: u64,
}

impl RenderResult {
    /// Observed bytes per realized unit.
    pub fn bytes_per_unit(&self) -> f64 {
        self.byte_size as f64 / self.realized_units.max(1) as f64
    }
}

/// Black-box document engine wrapped behind a unit-count contract.
///
/// `render` must complete (and the artifact's length be measurable) before it
/// returns. Implementations document how they treat `requested_units == 0`.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: RenderRequest) -> Result<RenderResult, RenderFailure>;
}

/// Checks an adapter's result against the request that produced it.
pub(crate) fn validate_result(
    request: RenderRequest,
    result: RenderResult,
) -> Result<RenderResult, RenderFailure> {
    if result.realized_units == 0 {
        return Err(RenderFailure::Contract(
            "renderer reported 0 realized units".to_string(),
        ));
    }
    if result.realized_units > request.requested_units.max(1) {
        return Err(RenderFailure::Contract(format!(
            "renderer realized {} units for a request of {}",
            result.realized_units, request.requested_units
        )));
    }
    Ok(result)
}
