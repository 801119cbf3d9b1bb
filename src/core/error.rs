use std::time::Duration;
use thiserror::Error;

/// Error taxonomy for the audit pipeline.
///
/// Extractor-local failures (`FetchTimeout`, `FetchHttp`, `FetchNetwork`,
/// `CleaningLoss`) are caught by the strategy runner and advance to the next
/// strategy. Reasoner-local failures are converted into a structured shell
/// report at the pipeline boundary. Only input/auth errors reach the caller
/// as HTTP errors.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("missing user id")]
    Unauthenticated,

    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("text exceeds {limit} characters")]
    TextTooLong { limit: usize },

    #[error("unsupported input: {0}")]
    Unsupported(String),

    #[error("fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    #[error("fetch failed with HTTP {status}")]
    FetchHttp { status: u16 },

    #[error("network error: {0}")]
    FetchNetwork(String),

    #[error("all extraction strategies failed: {last}")]
    ExtractionExhausted { last: String },

    #[error("cleaning discarded {lost_pct:.0}% of raw content")]
    CleaningLoss { lost_pct: f64 },

    #[error("extracted text too short ({len} chars)")]
    ContentTooShort { len: usize },

    #[error("reasoner call timed out")]
    ReasonerTimeout,

    #[error("reasoner returned invalid JSON: {0}")]
    ReasonerInvalidJson(String),

    #[error("reasoner upstream failure: {0}")]
    ReasonerUpstream(String),

    #[error("reasoner unrecoverable: {0}")]
    ReasonerUnrecoverable(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("request cancelled")]
    Cancelled,
}

impl AuditError {
    /// HTTP status the transport layer should surface for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            AuditError::InputInvalid(_) | AuditError::Unsupported(_) => 400,
            AuditError::Unauthenticated => 401,
            AuditError::PayloadTooLarge { .. } | AuditError::TextTooLong { .. } => 413,
            AuditError::ExtractionExhausted { .. } => 502,
            AuditError::Cancelled => 499,
            _ => 500,
        }
    }

    /// Failures the strategy runner recovers from by moving to the next
    /// strategy in the catalog.
    pub fn is_strategy_local(&self) -> bool {
        matches!(
            self,
            AuditError::FetchTimeout(_)
                | AuditError::FetchHttp { .. }
                | AuditError::FetchNetwork(_)
                | AuditError::CleaningLoss { .. }
                | AuditError::ContentTooShort { .. }
        )
    }

    /// Reasoner-local failures the pipeline converts into a shell report
    /// instead of an HTTP error.
    pub fn is_reasoner_local(&self) -> bool {
        matches!(
            self,
            AuditError::ReasonerTimeout
                | AuditError::ReasonerInvalidJson(_)
                | AuditError::ReasonerUpstream(_)
                | AuditError::ReasonerUnrecoverable(_)
        )
    }
}
