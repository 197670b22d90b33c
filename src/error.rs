//! Error types for the consultation mesh
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Retry classification for whole top-level requests
//! - Exit codes for CLI

use std::fmt;

use thiserror::Error;

/// Result type alias for mesh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoNotFound = 203,

    // Registry errors (3xx)
    DuplicateIdentity = 300,
    UnknownIdentity = 301,
    NoPeerAvailable = 302,

    // Delivery errors (4xx)
    DeliveryFailed = 400,

    // Generation errors (5xx)
    GenerationFailed = 500,

    // Chain control errors (6xx)
    ChainCancelled = 600,
    ChainTimeout = 601,
    ChainDepthExceeded = 602,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E301")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            600..=699 => 60,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the mesh
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse error
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Registry Errors
    // ─────────────────────────────────────────────────────────────

    /// A worker with this identity is already registered
    #[error("Worker identity already registered: {id}")]
    DuplicateIdentity { id: String },

    /// No worker is registered under this identity
    #[error("Unknown worker identity: {id}")]
    UnknownIdentity { id: String },

    /// The registry holds no worker other than the requester
    #[error("No peer available for worker {id}")]
    NoPeerAvailable { id: String },

    // ─────────────────────────────────────────────────────────────
    // Delivery & Generation Errors
    // ─────────────────────────────────────────────────────────────

    /// A message could not be delivered to its recipient
    #[error("Delivery failed: {reason}")]
    DeliveryFailure { reason: String },

    /// The generation backend failed to produce text
    #[error("Generation failed: {reason}")]
    GenerationFailure { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Chain Control Errors
    // ─────────────────────────────────────────────────────────────

    /// The consultation chain was cancelled
    #[error("Consultation chain cancelled")]
    Cancelled,

    /// The consultation chain exceeded its end-to-end timeout
    #[error("Consultation chain timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The consultation chain went deeper than the configured limit
    #[error("Consultation chain depth {depth} exceeds limit {limit}")]
    ChainDepthExceeded { depth: u32, limit: u32 },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse(_) => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::IoWrite,

            Error::DuplicateIdentity { .. } => ErrorCode::DuplicateIdentity,
            Error::UnknownIdentity { .. } => ErrorCode::UnknownIdentity,
            Error::NoPeerAvailable { .. } => ErrorCode::NoPeerAvailable,

            Error::DeliveryFailure { .. } => ErrorCode::DeliveryFailed,
            Error::GenerationFailure { .. } => ErrorCode::GenerationFailed,

            Error::Cancelled => ErrorCode::ChainCancelled,
            Error::Timeout { .. } => ErrorCode::ChainTimeout,
            Error::ChainDepthExceeded { .. } => ErrorCode::ChainDepthExceeded,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether resubmitting the whole top-level request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::GenerationFailure { .. } | Error::DeliveryFailure { .. } | Error::Timeout { .. }
        )
    }

    /// Whether the chain ended because the caller cancelled it or its time ran out
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Timeout { .. })
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'consult-mesh config init' to create a default configuration file."
            ),
            Error::ConfigParse(_) => Some(
                "Check your configuration file syntax. Run 'consult-mesh config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::DuplicateIdentity { .. } => Some(
                "Every [[workers]] entry needs a distinct id."
            ),
            Error::UnknownIdentity { .. } => Some(
                "Run 'consult-mesh workers' to list the registered worker ids."
            ),
            Error::NoPeerAvailable { .. } => Some(
                "Register at least two workers so consultations have a peer to reach."
            ),
            Error::GenerationFailure { .. } => Some(
                "Check the [generation] base_url, api_key and model, then resubmit the task."
            ),
            Error::Timeout { .. } => Some(
                "Raise mesh.chain_timeout_ms or set mesh.max_chain_depth to bound long chains."
            ),
            Error::ChainDepthExceeded { .. } => Some(
                "Raise mesh.max_chain_depth or lower the workers' consultation_probability."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self
        );

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a generation failure
    pub fn generation(reason: impl Into<String>) -> Self {
        Error::GenerationFailure {
            reason: reason.into(),
        }
    }

    /// Create a delivery failure
    pub fn delivery(reason: impl Into<String>) -> Self {
        Error::DeliveryFailure {
            reason: reason.into(),
        }
    }

    /// Create an unknown identity error
    pub fn unknown_identity(id: impl fmt::Display) -> Self {
        Error::UnknownIdentity { id: id.to_string() }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::UnknownIdentity.as_str(), "E301");
        assert_eq!(ErrorCode::ChainCancelled.as_str(), "E600");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigValidation.exit_code(), 10);
        assert_eq!(ErrorCode::NoPeerAvailable.exit_code(), 30);
        assert_eq!(ErrorCode::DeliveryFailed.exit_code(), 40);
        assert_eq!(ErrorCode::GenerationFailed.exit_code(), 50);
        assert_eq!(ErrorCode::ChainTimeout.exit_code(), 60);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::unknown_identity("w9").code(), ErrorCode::UnknownIdentity);
        assert_eq!(Error::generation("boom").code(), ErrorCode::GenerationFailed);
        assert_eq!(Error::Cancelled.code(), ErrorCode::ChainCancelled);
        assert_eq!(
            Error::ChainDepthExceeded { depth: 4, limit: 3 }.code(),
            ErrorCode::ChainDepthExceeded
        );
    }

    #[test]
    fn test_distinguishes_failure_kinds() {
        // Callers decide whether to retry by kind, so these must stay distinct
        let unknown = Error::unknown_identity("ghost");
        let backend = Error::generation("503");
        let cancelled = Error::Cancelled;

        assert!(!unknown.is_retryable());
        assert!(backend.is_retryable());
        assert!(!cancelled.is_retryable());
        assert!(cancelled.is_interrupted());
        assert!(Error::Timeout { timeout_ms: 10 }.is_interrupted());
        assert!(!backend.is_interrupted());
    }

    #[test]
    fn test_error_display() {
        let err = Error::NoPeerAvailable { id: "solo".into() };
        assert!(err.to_string().contains("solo"));

        let err = Error::Timeout { timeout_ms: 1500 };
        assert!(err.to_string().contains("1500ms"));
    }

    #[test]
    fn test_format_for_terminal() {
        let formatted = Error::unknown_identity("ghost").format_for_terminal();
        assert!(formatted.contains("E301"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let formatted = Error::delivery("peer gone").format_for_log();
        assert!(formatted.contains("[E400]"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert_eq!(err.code(), ErrorCode::IoNotFound);
    }
}
