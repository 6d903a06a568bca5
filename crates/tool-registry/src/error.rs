//! Error types for `toolhub-tool-registry`.

use thiserror::Error;

/// Errors raised while building a registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate tool name '{0}'")]
    DuplicateTool(String),

    #[error("Duplicate param '{param}' in tool '{tool}'")]
    DuplicateParam { tool: String, param: String },

    #[error("Required param '{param}' in tool '{tool}' must not declare a default")]
    RequiredWithDefault { tool: String, param: String },
}

/// Typed failure reported by a tool handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// A handler-level argument check failed (after registry coercion).
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Deterministic refusal; retrying with the same input gives the same answer.
    #[error("{message}")]
    Rejected { code: String, message: String },

    /// The backing service could not be reached.
    #[error("upstream unavailable: {message}")]
    Unavailable { message: String },

    #[error("{message}")]
    Failed { message: String },
}

impl ToolError {
    #[must_use]
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Errors returned by [`crate::ToolRegistry::invoke`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("unknown tool '{name}'")]
    UnknownTool {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl InvocationError {
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for failures caused by the supplied arguments, which the user can fix by re-entering
    /// them.
    #[must_use]
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::Tool(ToolError::InvalidParameter { .. })
        )
    }
}
