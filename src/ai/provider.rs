//! LLM Provider Abstraction
//!
//! Defines the `LlmProvider` trait for documentation text generation.
//! Providers return `LlmResponse` with token usage metrics so the run
//! summary can report consumption.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// Shared LLM provider type for concurrent access across pipeline stages.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Request Options
// =============================================================================

/// Per-call generation options
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 4_000,
        }
    }
}

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Complete LLM response including text and usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated documentation text
    pub text: String,
    /// Token usage metrics
    pub usage: TokenUsage,
}

/// Token usage metrics for consumption tracking
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

// =============================================================================
// Usage Tracker
// =============================================================================

/// Cumulative usage accounting across all generation calls in a run.
///
/// Lock-free: updated from concurrent synthesis tasks.
#[derive(Debug, Default)]
pub struct UsageTracker {
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    requests: AtomicU64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed generation call
    pub fn record(&self, usage: TokenUsage) {
        self.input_tokens
            .fetch_add(u64::from(usage.input_tokens), Ordering::Relaxed);
        self.output_tokens
            .fetch_add(u64::from(usage.output_tokens), Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of cumulative usage
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageSnapshot {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub requests: u64,
}

impl UsageSnapshot {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// LLM provider trait for documentation generation.
///
/// Failures must be returned as `DocError::Generation` with a classified
/// `LlmError` so the synthesis driver can distinguish retryable
/// transport/rate-limit failures from fatal content-policy failures.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate documentation text from a prompt
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_tracker_accumulates() {
        let tracker = UsageTracker::new();
        tracker.record(TokenUsage::new(100, 50));
        tracker.record(TokenUsage::new(200, 25));

        let snap = tracker.snapshot();
        assert_eq!(snap.input_tokens, 300);
        assert_eq!(snap.output_tokens, 75);
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.total_tokens(), 375);
    }
}
