//! Error types for the execution gateway.

use thiserror::Error;

/// Failure talking to the execution engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Connect error, reset connection, or other IO failure.
    #[error("engine transport error: {0}")]
    Transport(String),

    /// A single request exceeded its timeout.
    #[error("engine request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Non-success HTTP status; `message` is the engine's `{"message": ...}` when present.
    #[error("engine returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// A success response whose body could not be decoded.
    #[error("invalid engine response: {0}")]
    Decode(String),
}

impl EngineError {
    /// Category name used by `RetryPolicy::non_retryable_error_types`.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::Transport(_) => "transport",
            EngineError::Timeout { .. } => "timeout",
            EngineError::Status { status: 429, .. } => "rate_limited",
            EngineError::Status { status, .. } if *status >= 500 => "upstream_5xx",
            EngineError::Status { .. } => "upstream_4xx",
            EngineError::Decode(_) => "deserialize",
        }
    }

    /// Transport failures, timeouts, 5xx and 429 are transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category(),
            "transport" | "timeout" | "rate_limited" | "upstream_5xx"
        )
    }
}

/// Failure refreshing or waiting for the runtime catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("runtime listing failed: {0}")]
    Fetch(#[from] EngineError),

    #[error("runtime catalog not available after {timeout_ms}ms")]
    StartupTimeout { timeout_ms: u64 },
}

/// Failure mapping a language and version constraint to a runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("language '{language}' is not supported by the execution engine")]
    UnsupportedLanguage { language: String },

    #[error(
        "version '{requested}' of {language} is not available (available: {})",
        .available.join(", ")
    )]
    VersionNotFound {
        language: String,
        requested: String,
        available: Vec<String>,
    },
}

/// Failure of a dispatched execution request.
///
/// A program that fails to compile or exits non-zero is not an error; it is reported through
/// a normal `ExecutionResult`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("runtime catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    #[error("execution engine unavailable after {attempts} attempt(s): {message}")]
    UpstreamUnavailable { attempts: u32, message: String },

    #[error("execution engine rejected the request (HTTP {status}): {message}")]
    UpstreamRejected { status: u16, message: String },

    #[error("malformed execution engine response: {message}")]
    MalformedResponse { message: String },
}

impl From<CatalogError> for ExecutionError {
    fn from(e: CatalogError) -> Self {
        ExecutionError::CatalogUnavailable {
            message: e.to_string(),
        }
    }
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::{EngineError, ResolutionError};

    #[test]
    fn transient_classification() {
        let transient = [
            EngineError::Transport("connection reset".into()),
            EngineError::Timeout { timeout_ms: 10 },
            EngineError::Status {
                status: 503,
                message: String::new(),
            },
            EngineError::Status {
                status: 429,
                message: String::new(),
            },
        ];
        for e in &transient {
            assert!(e.is_transient(), "{e}");
        }

        let permanent = [
            EngineError::Status {
                status: 400,
                message: "bad".into(),
            },
            EngineError::Decode("eof".into()),
        ];
        for e in &permanent {
            assert!(!e.is_transient(), "{e}");
        }
    }

    #[test]
    fn version_not_found_lists_available_versions() {
        let e = ResolutionError::VersionNotFound {
            language: "python".into(),
            requested: "4".into(),
            available: vec!["3.11.2".into(), "3.10.9".into()],
        };
        assert_eq!(
            e.to_string(),
            "version '4' of python is not available (available: 3.11.2, 3.10.9)"
        );
    }
}
