//! OpenAI-compatible chat completion generator
//!
//! Implements GenerationBackend by calling any OpenAI-compatible
//! `/chat/completions` endpoint (OpenAI, Ollama, vLLM, LM Studio, etc.).
//! The persona becomes the system message and the input the user message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::{GenerationBackend, GenerationRequest};

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI-compatible generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    pub api_key: String,

    /// Model used when a worker does not name one
    pub default_model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient errors
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            default_model: "gpt-4o-mini".to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Generator
// ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible API generator
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiGenerator {
    /// Create a new generator with the given configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            model = %config.default_model,
            "OpenAI-compatible generator created"
        );

        Ok(Self { config, client })
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.config.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.config.api_key))
        }
    }

    fn build_body(&self, request: GenerationRequest) -> ChatCompletionRequest {
        let model = request
            .params
            .model
            .unwrap_or_else(|| self.config.default_model.clone());

        let mut messages = Vec::with_capacity(2);
        if !request.persona.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: request.persona,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.input,
        });

        ChatCompletionRequest {
            model,
            messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
        }
    }
}

/// Pull the first choice's text out of a completion response
fn first_choice_text(parsed: ChatCompletionResponse) -> Result<String> {
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| Error::generation("No choices in API response"))
}

#[async_trait]
impl GenerationBackend for OpenAiGenerator {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let body = self.build_body(request);
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let mut last_error: Option<Error> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                debug!(attempt, ?backoff, "Retrying after error");
                tokio::time::sleep(backoff).await;
            }

            let mut req = self.client.post(&url).json(&body);
            if let Some(ref auth) = self.auth_header() {
                req = req.header("Authorization", auth);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        match response.json::<ChatCompletionResponse>().await {
                            Ok(parsed) => return first_choice_text(parsed),
                            Err(e) => {
                                last_error = Some(Error::generation(format!(
                                    "Failed to parse API response: {}",
                                    e
                                )));
                            }
                        }
                    } else if status.as_u16() == 429 || status.is_server_error() {
                        let text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, "Retryable API error: {}", text);
                        last_error = Some(Error::generation(format!("API error {}: {}", status, text)));
                    } else {
                        let text = response.text().await.unwrap_or_default();
                        return Err(Error::generation(format!("API error {}: {}", status, text)));
                    }
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!(attempt, error = %e, "Retryable connection error");
                    last_error = Some(Error::generation(format!("Connection error: {}", e)));
                }
                Err(e) => {
                    return Err(Error::generation(format!("Request error: {}", e)));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::generation("All retry attempts exhausted")))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
