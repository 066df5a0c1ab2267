//! Error types for the DLS filter.

/// Error reported by the downstream query engine.
///
/// Opaque to the filter: it is forwarded to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryEngineError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("query engine unavailable: {0}")]
    Unavailable(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("query engine error: {0}")]
    Internal(String),
}

/// Errors surfaced to the caller of an intercepted request.
#[derive(Debug, thiserror::Error)]
pub enum DlsFilterError {
    /// The request shape cannot be expressed under filter-level DLS.
    #[error("operation not supported under filter-level DLS: {0}")]
    Unsupported(String),

    /// The request asks for something DLS cannot honour (profiling, ...).
    #[error("request denied: {0}")]
    Denied(String),

    /// Restriction rules could not be turned into a filter; nothing was applied.
    #[error("unable to compile filter-level DLS query: {0}")]
    Compile(String),

    /// An internal invariant was violated. Details are logged, not exposed.
    #[error("internal error when performing DLS")]
    Internal,

    /// The index resolver failed.
    #[error("index resolution failed: {0}")]
    Resolution(String),

    /// The restriction store failed.
    #[error("restriction lookup failed: {0}")]
    Restrictions(String),

    /// The downstream query engine failed.
    #[error(transparent)]
    Downstream(#[from] QueryEngineError),
}
