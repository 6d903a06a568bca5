//! JSON bodies of the tool server HTTP surface.
//!
//! - `GET /tools` → [`ToolListResponse`]
//! - `POST /tools/{name}` with [`CallToolRequest`] → [`CallToolResponse`] or [`ErrorResponse`]

use crate::descriptor::{ToolArgs, ToolDescriptor};
use crate::error::{InvocationError, ToolError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallToolRequest {
    #[serde(default)]
    pub arguments: ToolArgs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResponse {
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    InvalidParameter,
    Rejected,
    Unavailable,
    Failed,
}

impl ErrorKind {
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::UnknownTool => 404,
            ErrorKind::InvalidParameter | ErrorKind::Rejected => 422,
            ErrorKind::Unavailable => 503,
            ErrorKind::Failed => 500,
        }
    }
}

/// Serialized [`InvocationError`].
///
/// `name` holds the tool name for `unknown_tool` and the parameter name for
/// `invalid_parameter`; `message` holds the reason for `invalid_parameter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorBody {
    fn new(kind: ErrorKind, message: String) -> Self {
        Self {
            kind,
            message,
            name: None,
            code: None,
            suggestions: Vec::new(),
        }
    }
}

impl From<&InvocationError> for ErrorBody {
    fn from(e: &InvocationError) -> Self {
        match e {
            InvocationError::UnknownTool { name, suggestions } => Self {
                name: Some(name.clone()),
                suggestions: suggestions.clone(),
                ..Self::new(ErrorKind::UnknownTool, e.to_string())
            },
            InvocationError::InvalidParameter { name, reason }
            | InvocationError::Tool(ToolError::InvalidParameter { name, reason }) => Self {
                name: Some(name.clone()),
                ..Self::new(ErrorKind::InvalidParameter, reason.clone())
            },
            InvocationError::Tool(ToolError::Rejected { code, message }) => Self {
                code: Some(code.clone()),
                ..Self::new(ErrorKind::Rejected, message.clone())
            },
            InvocationError::Tool(ToolError::Unavailable { message }) => {
                Self::new(ErrorKind::Unavailable, message.clone())
            }
            InvocationError::Tool(ToolError::Failed { message }) => {
                Self::new(ErrorKind::Failed, message.clone())
            }
        }
    }
}

impl From<ErrorBody> for InvocationError {
    fn from(body: ErrorBody) -> Self {
        match body.kind {
            ErrorKind::UnknownTool => InvocationError::UnknownTool {
                name: body.name.unwrap_or_default(),
                suggestions: body.suggestions,
            },
            ErrorKind::InvalidParameter => InvocationError::InvalidParameter {
                name: body.name.unwrap_or_default(),
                reason: body.message,
            },
            ErrorKind::Rejected => InvocationError::Tool(ToolError::Rejected {
                code: body.code.unwrap_or_default(),
                message: body.message,
            }),
            ErrorKind::Unavailable => InvocationError::Tool(ToolError::Unavailable {
                message: body.message,
            }),
            ErrorKind::Failed => InvocationError::Tool(ToolError::Failed {
                message: body.message,
            }),
        }
    }
}
