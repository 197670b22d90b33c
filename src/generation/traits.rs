//! Generation trait definitions
//!
//! Defines the GenerationBackend trait every text generator implements.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Generation Parameters
// ─────────────────────────────────────────────────────────────────

/// Per-worker sampling parameters, opaque to the routing core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Model override (None = backend default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature (None = backend default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate (None = backend default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One call into the generation capability
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Persona text steering the generator (system prompt)
    pub persona: String,

    /// Task description or forwarded idea
    pub input: String,

    /// Sampling parameters
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(persona: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            input: input.into(),
            params: GenerationParams::default(),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

// ─────────────────────────────────────────────────────────────────
// GenerationBackend Trait
// ─────────────────────────────────────────────────────────────────

/// Core trait for text generators
///
/// Failures surface as `Error::GenerationFailure`. Any retry policy lives
/// inside the implementation; callers never retry.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name (e.g. "openai", "mock")
    fn name(&self) -> &'static str;

    /// Turn a persona and an input into text
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

/// Type alias for a shared generator reference
pub type SharedGenerator = Arc<dyn GenerationBackend>;
