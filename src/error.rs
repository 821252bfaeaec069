//! Unified Error Type System
//!
//! Centralized error types for the whole pipeline with category-based
//! classification for retry decisions.
//!
//! ## Error Categories
//!
//! - **RateLimit**: API rate limiting (wait and retry)
//! - **Network**: Connectivity issues / timeouts (retry with backoff)
//! - **Transient**: Temporary server issues (retry)
//! - **ContentPolicy**: Request refused on content grounds (never retry)
//! - **BadRequest**: Malformed request (never retry)
//!
//! ## Design Principles
//!
//! - Single error type (`DocError`) for the whole crate
//! - Per-file and per-unit failures stay non-fatal; only discovery and
//!   graph-emptiness stop the run. Checkpoint store failures degrade to
//!   running without resume
//! - No panic/unwrap outside tests

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocError>;

// =============================================================================
// Error Categories
// =============================================================================

/// Generation error categories for retry routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Network/connectivity issues or timeout - retry with backoff
    Network,
    /// Temporary server issues - retry
    Transient,
    /// Content policy refusal - do not retry
    ContentPolicy,
    /// Invalid request - do not retry
    BadRequest,
    /// Authentication failed - do not retry
    Auth,
    /// Unknown error - conservative retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Network => write!(f, "NETWORK"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::ContentPolicy => write!(f, "CONTENT_POLICY"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Auth => write!(f, "AUTH"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether a failure in this category may succeed on retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::Unknown
        )
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Generation failure with category, provider context, and retry hints
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Category for retry routing
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Suggested wait time before retry (from rate-limit headers)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Classifies raw provider failures into categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
            || lower.contains("throttl")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30));
        }

        if lower.contains("content policy")
            || lower.contains("content_filter")
            || lower.contains("refused")
            || lower.contains("safety")
        {
            return LlmError::with_provider(ErrorCategory::ContentPolicy, message, provider);
        }

        if lower.contains("auth")
            || lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
        {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("unreachable")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider)
                .retry_after(Duration::from_secs(5));
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("malformed") {
            return LlmError::with_provider(ErrorCategory::BadRequest, message, provider);
        }

        if lower.contains("503")
            || lower.contains("502")
            || lower.contains("500")
            || lower.contains("overloaded")
            || lower.contains("service unavailable")
            || lower.contains("temporary")
        {
            return LlmError::with_provider(ErrorCategory::Transient, message, provider)
                .retry_after(Duration::from_secs(2));
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify an HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
                    .retry_after(Duration::from_secs(5))
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum DocError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// Root path missing or unreadable. Fatal: nothing to document.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Per-file parse failure. Non-fatal: the file is excluded from the
    /// graph with a recorded warning.
    #[error("Parse error in {path}: {message}")]
    Parse { message: String, path: String },

    /// Empty node set after extraction. Reported, stops the pipeline.
    #[error("Graph error: {0}")]
    Graph(String),

    /// Per-unit generation failure with retry classification.
    #[error("Generation error: {0}")]
    Generation(LlmError),

    /// Checkpoint store failure. Never fatal: reads degrade to
    /// regeneration, and a failed write disables further checkpoint
    /// updates for the rest of the run.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// SKF encoding/decoding failure. Fatal for SKF output only.
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Config error: {0}")]
    Config(String),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },
}

impl From<LlmError> for DocError {
    fn from(err: LlmError) -> Self {
        DocError::Generation(err)
    }
}

impl DocError {
    /// Retry classification for generation-path errors. Timeouts count as
    /// retryable network failures per the concurrency model.
    pub fn is_retryable(&self) -> bool {
        match self {
            DocError::Generation(llm) => llm.is_retryable(),
            DocError::Timeout { .. } => true,
            _ => false,
        }
    }
}
