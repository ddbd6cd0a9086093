//! Error taxonomy.
//!
//! Each fallible boundary gets its own closed `thiserror` enum rather than
//! one flat error type. The Orchestrator is the only place these are
//! converted into user-facing text; no variant's `Display` output is ever
//! echoed verbatim to an HTTP client.

use thiserror::Error;

/// Failures from the Parameter Extractor / LLM port.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("llm call failed: {0}")]
    LlmUnavailable(String),
    #[error("llm output failed json validation: {0}")]
    InvalidContract(String),
    #[error("llm output violated normalization for attribute `{attribute}`: `{value}`")]
    NormalizationViolation { attribute: String, value: String },
    #[error("extraction deadline exceeded")]
    DeadlineExceeded,
}

/// Failures from the Product Repository / graph port.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("graph transport error: {0}")]
    Transport(String),
    #[error("repository query deadline exceeded")]
    DeadlineExceeded,
}

/// Failures from the Session Store.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session `{0}` expired or not found")]
    Expired(String),
    #[error("cache transport error: {0}")]
    CacheTransport(String),
    #[error("archive transport error: {0}")]
    ArchiveTransport(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top-level errors surfaced by the Orchestrator. Every variant
/// maps to a specific Composer prompt; `IntegrityViolation` is the only one
/// that aborts the turn without persisting anything.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("repository failed: {0}")]
    Repository(#[from] RepositoryError),
    #[error("session store failed: {0}")]
    SessionStore(#[from] SessionStoreError),
    #[error("skip not allowed at this state")]
    SkipNotAllowed,
    #[error("finalization threshold not met: have {current}, need {required}")]
    ThresholdNotMet { current: usize, required: usize },
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
    #[error("turn deadline exceeded")]
    DeadlineExceeded,
}

impl OrchestratorError {
    /// Whether this error leaves `SessionState` untouched.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OrchestratorError::IntegrityViolation(_))
    }
}
