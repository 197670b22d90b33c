//! Backend selection
//!
//! Maps the `[generation] backend` setting onto a concrete generator.

use std::sync::Arc;

use tracing::info;

use crate::config::GenerationSettings;
use crate::error::{Error, Result};

use super::{MockGenerator, OpenAiGenerator, SharedGenerator};

/// Suffix the offline mock appends to every input
pub const MOCK_SUFFIX: &str = " (refined)";

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Any OpenAI-compatible chat completions server
    OpenAi,
    /// Deterministic offline generator
    Mock,
}

impl BackendKind {
    pub fn all() -> &'static [BackendKind] {
        &[BackendKind::OpenAi, BackendKind::Mock]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Mock => "mock",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "openai-compatible" => Some(BackendKind::OpenAi),
            "mock" => Some(BackendKind::Mock),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the generator named by the settings
pub fn create_generator(settings: &GenerationSettings) -> Result<SharedGenerator> {
    let kind = BackendKind::parse(&settings.backend).ok_or_else(|| {
        Error::config_field_invalid(
            "generation.backend",
            format!("Unknown backend '{}'", settings.backend),
        )
    })?;

    let generator: SharedGenerator = match kind {
        BackendKind::OpenAi => Arc::new(OpenAiGenerator::new(settings.openai_config())?),
        BackendKind::Mock => Arc::new(MockGenerator::suffix(MOCK_SUFFIX)),
    };

    info!(backend = %kind, "Generation backend ready");
    Ok(generator)
}
