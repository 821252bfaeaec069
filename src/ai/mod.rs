//! LLM Integration
//!
//! Provider abstraction, token estimation, and usage accounting.

pub mod openai;
pub mod provider;
pub mod tokenizer;

pub use openai::OpenAiProvider;
pub use provider::{
    GenerateOptions, LlmProvider, LlmResponse, SharedProvider, TokenUsage, UsageSnapshot,
    UsageTracker,
};
pub use tokenizer::TokenCounter;

use crate::config::ProviderSettings;
use crate::error::{DocError, Result};
use std::sync::Arc;

/// Create a shared provider from configuration
pub fn create_provider(settings: &ProviderSettings) -> Result<SharedProvider> {
    match settings.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(settings)?)),
        other => Err(DocError::Config(format!(
            "Unknown provider: {}. Supported: openai",
            other
        ))),
    }
}
