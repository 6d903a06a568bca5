//! HTTP client for a tool server, and the local mirror registry built on it.

use anyhow::Context as _;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use toolhub_tool_registry::wire::{
    CallToolRequest, CallToolResponse, ErrorResponse, ToolListResponse,
};
use toolhub_tool_registry::{
    InvocationError, ToolArgs, ToolDescriptor, ToolError, ToolHandler, ToolRegistry,
};
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("invalid server URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

fn transport(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "transport error"
    };
    let Some(url) = e.url() else {
        return kind.to_string();
    };
    format!(
        "{kind} ({}://{}{})",
        url.scheme(),
        url.host_str().unwrap_or("?"),
        url.port().map(|p| format!(":{p}")).unwrap_or_default()
    )
}

/// One tool server reached over `GET /tools` and `POST /tools/{name}`.
#[derive(Clone)]
pub struct RemoteToolServer {
    http: reqwest::Client,
    base_url: Url,
}

impl RemoteToolServer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let invalid = |message: String| RemoteError::InvalidUrl {
            url: base_url.to_string(),
            message,
        };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base_url.scheme())));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(transport(&e)))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidUrl {
                url: self.base_url.to_string(),
                message: "cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, RemoteError> {
        let url = self.endpoint(&["tools"])?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(transport(&e)))?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: message.chars().take(512).collect(),
            });
        }
        let body: ToolListResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(body.tools)
    }

    /// Call `name` on the server, mapping error bodies back onto [`InvocationError`].
    pub async fn call_tool(&self, name: &str, args: &ToolArgs) -> Result<Value, InvocationError> {
        let url = self
            .endpoint(&["tools", name])
            .map_err(|e| ToolError::failed(e.to_string()))?;
        let request = CallToolRequest {
            arguments: args.clone(),
        };
        let resp = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ToolError::Unavailable {
                message: transport(&e),
            })?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| ToolError::Unavailable {
            message: transport(&e),
        })?;
        if status.is_success() {
            let body: CallToolResponse = serde_json::from_slice(&bytes)
                .map_err(|e| ToolError::failed(format!("malformed response: {e}")))?;
            return Ok(body.result);
        }

        if let Ok(body) = serde_json::from_slice::<ErrorResponse>(&bytes) {
            return Err(body.error.into());
        }
        let message: String = String::from_utf8_lossy(&bytes).chars().take(512).collect();
        let message = format!("HTTP {}: {message}", status.as_u16());
        Err(match status.as_u16() {
            502..=504 => ToolError::Unavailable { message },
            _ => ToolError::Failed { message },
        }
        .into())
    }

    /// Local registry holding the server's descriptors; each handler forwards the call.
    ///
    /// Arguments are validated locally first, so parameter errors never cost a round trip.
    pub async fn mirror_registry(&self) -> anyhow::Result<ToolRegistry> {
        let tools = self
            .list_tools()
            .await
            .with_context(|| format!("list tools of {}", self.base_url))?;
        let mut registry = ToolRegistry::new();
        for descriptor in tools {
            let handler = Arc::new(ForwardingTool {
                server: self.clone(),
                name: descriptor.name.clone(),
            });
            registry
                .register(descriptor, handler)
                .context("server advertised an invalid tool")?;
        }
        tracing::debug!(server = %self.base_url, tools = registry.len(), "mirrored tools");
        Ok(registry)
    }
}

struct ForwardingTool {
    server: RemoteToolServer,
    name: String,
}

#[async_trait]
impl ToolHandler for ForwardingTool {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        match self.server.call_tool(&self.name, &args).await {
            Ok(v) => Ok(v),
            Err(InvocationError::Tool(e)) => Err(e),
            Err(InvocationError::InvalidParameter { name, reason }) => {
                Err(ToolError::InvalidParameter { name, reason })
            }
            Err(InvocationError::UnknownTool { name, .. }) => Err(ToolError::failed(format!(
                "tool '{name}' is no longer served"
            ))),
        }
    }
}
