use thiserror::Error;

/// Failure reported by a renderer adapter.
///
/// A failed render has no measurable size, so the controller never retries it
/// locally: every variant aborts the convergence run.
#[derive(Debug, Error)]
pub enum RenderFailure {
    #[error("I/O error writing rendered output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render engine error: {0}")]
    Engine(String),

    /// The adapter returned a result that breaks its own contract
    /// (zero realized units, or more units than requested).
    #[error("Renderer contract violated: {0}")]
    Contract(String),

    #[error("Internal render error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Errors returned by `converge_to_size`.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Rejected before any render was attempted.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Render(#[from] RenderFailure),

    /// A render measured zero bytes, so no per-unit cost can be derived.
    #[error("Render of {units} unit(s) produced 0 bytes; cannot project a unit count")]
    DegenerateCost { units: u32 },
}
