//! OpenAI API Provider
//!
//! LLM provider using an OpenAI-compatible Chat Completions endpoint.
//! Returns `LlmResponse` with token usage metrics from the API response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::provider::{GenerateOptions, LlmProvider, LlmResponse, TokenUsage};
use crate::config::ProviderSettings;
use crate::error::{DocError, ErrorCategory, ErrorClassifier, LlmError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are a code documentation expert. Produce clear, \
accurate Markdown documentation for the source files you are given. Respond with \
the documentation only, no preamble.";

/// OpenAI-compatible chat provider
pub struct OpenAiProvider {
    api_key: String,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider from settings. The key comes from `OPENAI_API_KEY`.
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            DocError::Config("OpenAI API key not found. Set OPENAI_API_KEY".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                DocError::Generation(LlmError::new(
                    ErrorCategory::Unknown,
                    format!("Failed to create HTTP client: {}", e),
                ))
            })?;

        Ok(Self {
            api_key,
            api_base: settings
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client,
        })
    }

    fn build_request(&self, prompt: &str, options: &GenerateOptions) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: options.temperature,
            max_tokens: Some(options.max_tokens),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<LlmResponse> {
        info!(model = %self.model, "Generating with OpenAI-compatible endpoint");

        let request = self.build_request(prompt, options);
        let url = format!("{}/chat/completions", self.api_base);

        debug!(url = %url, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // Transport failures carry no status code; classify from
                // the error text instead
                DocError::Generation(ErrorClassifier::classify(
                    &format!("Request failed: {}", e),
                    "openai",
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DocError::Generation(ErrorClassifier::classify_http_status(
                status, &body, "openai",
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            DocError::Generation(LlmError::with_provider(
                ErrorCategory::Transient,
                format!("Malformed completion response: {}", e),
                "openai",
            ))
        })?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                DocError::Generation(LlmError::with_provider(
                    ErrorCategory::Transient,
                    "Completion response had no choices",
                    "openai",
                ))
            })?;

        let usage = completion
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse { text, usage })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
