use thiserror::Error;

/// Failure of a single `analyze` request.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The submitted image was rejected before any upstream call.
    #[error("invalid image: {0}")]
    Validation(String),

    /// A model call failed to complete: transport error, timeout, or a
    /// non-success HTTP status.
    #[error("upstream model unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A model call completed but its output did not match the insight schema.
    #[error("upstream model returned malformed output: {0}")]
    UpstreamFormat(String),

    /// The historical store could not be queried or written.
    #[error("historical store error: {0}")]
    Store(String),
}

impl AnalyzeError {
    /// Stable machine-readable code for this error class.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::UpstreamFormat(_) => "upstream_format_error",
            Self::Store(_) => "store_error",
        }
    }

    /// Message that is safe to hand back to a caller.
    ///
    /// Only validation errors carry their detail; the rest collapse to a
    /// fixed sentence so upstream and database internals are never echoed.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(detail) => detail.clone(),
            Self::UpstreamUnavailable(_) => "the analysis model is unavailable".to_string(),
            Self::UpstreamFormat(_) => {
                "the analysis model returned an unexpected response".to_string()
            }
            Self::Store(_) => "historical data store failure".to_string(),
        }
    }
}

impl From<graphlens_db::DbError> for AnalyzeError {
    fn from(err: graphlens_db::DbError) -> Self {
        Self::Store(err.to_string())
    }
}
