//! Core types for worker personas.
//!
//! A worker's persona, consultation probability, framing phrase and
//! generation parameters are fixed when the worker is built.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::generation::GenerationParams;

/// Placeholder marking where the draft goes inside a framing phrase.
pub const DRAFT_PLACEHOLDER: &str = "{draft}";

/// Framing used when a worker does not configure its own.
pub const DEFAULT_FRAMING: &str =
    "Here is my idea. It may not be your speciality, but please refine it and make it better. {draft}";

// ─────────────────────────────────────────────────────────────────
// Worker Config
// ─────────────────────────────────────────────────────────────────

/// Immutable per-worker behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    persona: String,
    consultation_probability: f64,
    framing: String,
    params: GenerationParams,
}

impl WorkerConfig {
    /// Build a config, rejecting probabilities outside [0, 1].
    pub fn new(persona: impl Into<String>, consultation_probability: f64) -> Result<Self> {
        validate_probability(consultation_probability)?;
        Ok(Self {
            persona: persona.into(),
            consultation_probability,
            framing: DEFAULT_FRAMING.to_string(),
            params: GenerationParams::default(),
        })
    }

    pub fn with_framing(mut self, framing: impl Into<String>) -> Self {
        self.framing = framing.into();
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn consultation_probability(&self) -> f64 {
        self.consultation_probability
    }

    pub fn framing(&self) -> &str {
        &self.framing
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Wrap a draft in this worker's framing phrase.
    ///
    /// Without a `{draft}` placeholder the draft is appended after a space.
    pub fn frame(&self, draft: &str) -> String {
        if self.framing.contains(DRAFT_PLACEHOLDER) {
            self.framing.replace(DRAFT_PLACEHOLDER, draft)
        } else {
            format!("{} {}", self.framing, draft)
        }
    }
}

fn validate_probability(p: f64) -> Result<()> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(Error::config_field_invalid(
            "consultation_probability",
            format!("must be between 0 and 1, got {}", p),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────
// Worker Spec (loaded from TOML)
// ─────────────────────────────────────────────────────────────────

/// One `[[workers]]` entry as written in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Identity the worker is registered and addressed under.
    pub id: String,

    /// System prompt for the generation capability.
    pub persona: String,

    /// Chance of forwarding the draft to a peer on each request.
    #[serde(default = "default_probability")]
    pub consultation_probability: f64,

    /// Framing phrase for consultation requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framing: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_probability() -> f64 {
    0.5
}

impl WorkerSpec {
    /// Convert into a validated WorkerConfig.
    pub fn worker_config(&self) -> Result<WorkerConfig> {
        let mut config = WorkerConfig::new(self.persona.clone(), self.consultation_probability)
            .map_err(|_| {
                Error::config_field_invalid(
                    format!("workers.{}.consultation_probability", self.id),
                    format!(
                        "must be between 0 and 1, got {}",
                        self.consultation_probability
                    ),
                )
            })?
            .with_params(GenerationParams {
                model: self.model.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            });

        if let Some(ref framing) = self.framing {
            config = config.with_framing(framing.clone());
        }

        Ok(config)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
