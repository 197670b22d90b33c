//! Mock generator for testing
//!
//! Deterministic, scriptable implementation of GenerationBackend. Also backs
//! offline demo runs when the config selects `backend = "mock"`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::{GenerationBackend, GenerationRequest};

/// Inputs kept by `MockGenerator::inputs`; later calls are counted but not recorded
pub const MAX_RECORDED_INPUTS: usize = 256;

// ─────────────────────────────────────────────────────────────────
// Mock Configuration
// ─────────────────────────────────────────────────────────────────

/// How the mock turns a request into text
#[derive(Clone)]
pub enum MockResponse {
    /// Return the input unchanged
    Echo,
    /// Return the input followed by a suffix
    Suffix(String),
    /// Always return the same text
    Fixed(String),
    /// Compute the text from the request
    Custom(Arc<dyn Fn(&GenerationRequest) -> String + Send + Sync>),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockResponse::Echo => write!(f, "Echo"),
            MockResponse::Suffix(s) => f.debug_tuple("Suffix").field(s).finish(),
            MockResponse::Fixed(s) => f.debug_tuple("Fixed").field(s).finish(),
            MockResponse::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Configuration for mock generator behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Simulated latency per call
    pub latency: Duration,

    /// Fail every call with a GenerationFailure
    pub fail: bool,

    /// Response strategy
    pub response: MockResponse,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            fail: false,
            response: MockResponse::Echo,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Mock Generator
// ─────────────────────────────────────────────────────────────────

/// Mock implementation of GenerationBackend for testing
pub struct MockGenerator {
    config: MockConfig,
    calls: AtomicU64,
    completed: AtomicU64,
    inputs: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Create a mock that echoes its input
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a mock with custom configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            calls: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Mock that appends `suffix` to every input
    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self::with_config(MockConfig {
            response: MockResponse::Suffix(suffix.into()),
            ..Default::default()
        })
    }

    /// Mock that always returns `text`
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_config(MockConfig {
            response: MockResponse::Fixed(text.into()),
            ..Default::default()
        })
    }

    /// Mock whose every call fails
    pub fn failing() -> Self {
        Self::with_config(MockConfig {
            fail: true,
            ..Default::default()
        })
    }

    /// Set simulated latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.config.latency = latency;
        self
    }

    /// Number of generate calls started
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of generate calls that ran to completion
    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// The first `MAX_RECORDED_INPUTS` inputs received, in call order
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }

    fn render(&self, request: &GenerationRequest) -> String {
        match &self.config.response {
            MockResponse::Echo => request.input.clone(),
            MockResponse::Suffix(suffix) => format!("{}{}", request.input, suffix),
            MockResponse::Fixed(text) => text.clone(),
            MockResponse::Custom(f) => f(request),
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut inputs = self.inputs.lock();
            if inputs.len() < MAX_RECORDED_INPUTS {
                inputs.push(request.input.clone());
            }
        }

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        if self.config.fail {
            return Err(Error::generation("Mock generation failure"));
        }

        let text = self.render(&request);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(text)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_echo() {
        let mock = MockGenerator::new();
        let out = mock.generate(GenerationRequest::new("p", "hello")).await.unwrap();
        assert_eq!(out, "hello");
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.completed_count(), 1);
    }

    #[tokio::test]
    async fn test_suffix() {
        let mock = MockGenerator::suffix("!");
        let out = mock.generate(GenerationRequest::new("p", "x")).await.unwrap();
        assert_eq!(out, "x!");
    }

    #[tokio::test]
    async fn test_empty_input_passes_through() {
        let mock = MockGenerator::suffix("?");
        let out = mock.generate(GenerationRequest::new("p", "")).await.unwrap();
        assert_eq!(out, "?");
        assert_eq!(mock.inputs(), vec![String::new()]);
    }

    #[tokio::test]
    async fn test_input_history_is_capped() {
        let mock = MockGenerator::new();
        for i in 0..MAX_RECORDED_INPUTS + 10 {
            mock.generate(GenerationRequest::new("p", i.to_string())).await.unwrap();
        }
        let inputs = mock.inputs();
        assert_eq!(inputs.len(), MAX_RECORDED_INPUTS);
        assert_eq!(inputs[0], "0");
        assert_eq!(mock.call_count(), (MAX_RECORDED_INPUTS + 10) as u64);
    }

    #[tokio::test]
    async fn test_custom_sees_persona() {
        let mock = MockGenerator::with_config(MockConfig {
            response: MockResponse::Custom(Arc::new(|req: &GenerationRequest| {
                format!("[{}] {}", req.persona, req.input)
            })),
            ..Default::default()
        });
        let out = mock.generate(GenerationRequest::new("chef", "soup")).await.unwrap();
        assert_eq!(out, "[chef] soup");
    }

    #[tokio::test]
    async fn test_failure() {
        let mock = MockGenerator::failing();
        let err = mock.generate(GenerationRequest::new("p", "x")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::GenerationFailed);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.completed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency() {
        let mock = MockGenerator::fixed("done").with_latency(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        let out = mock.generate(GenerationRequest::new("p", "x")).await.unwrap();
        assert_eq!(out, "done");
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
