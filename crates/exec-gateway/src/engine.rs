//! HTTP client for a Piston-compatible execution engine.
//!
//! - `GET {base}/runtimes` → `[{language, version, aliases, runtime?}]`
//! - `POST {base}/execute` → `{language, version, run, compile?}`; errors as `{message}`

use crate::catalog::{RuntimeSource, RuntimeVersion};
use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Cap on how much of a non-JSON error body is surfaced.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineRuntime {
    pub language: String,
    pub version: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

impl From<EngineRuntime> for RuntimeVersion {
    fn from(r: EngineRuntime) -> Self {
        RuntimeVersion {
            language: r.language,
            version: r.version,
            aliases: r.aliases.into_iter().collect(),
            runtime: r.runtime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFile {
    pub content: String,
}

/// `POST /execute` body. Field names follow the engine's snake_case API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutePayload {
    pub language: String,
    pub version: String,
    pub files: Vec<EngineFile>,
    #[serde(default)]
    pub stdin: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_timeout: Option<u64>,
}

/// Output of one engine stage (`compile` or `run`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub signal: Option<String>,
    #[serde(default)]
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub version: String,
    /// Absent when the compile stage failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<StageOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile: Option<StageOutput>,
}

#[derive(Debug, Deserialize)]
struct EngineMessage {
    message: String,
}

#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    // Best-effort: drop credentials + query + fragment.
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}

fn classify(e: &reqwest::Error, timeout: Duration) -> EngineError {
    if e.is_timeout() {
        EngineError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else if e.is_decode() {
        EngineError::Decode(sanitize_reqwest_error(e))
    } else {
        EngineError::Transport(sanitize_reqwest_error(e))
    }
}

#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: Url,
    listing_timeout: Duration,
}

impl EngineClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: Url, listing_timeout: Duration) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| EngineError::Transport(sanitize_reqwest_error(&e)))?;
        Ok(Self {
            http,
            base_url,
            listing_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// List the engine's installed runtimes.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] on transport failure, timeout, non-success status or an
    /// undecodable body.
    pub async fn list_runtimes(&self) -> Result<Vec<EngineRuntime>, EngineError> {
        let timeout = self.listing_timeout;
        let resp = self
            .http
            .get(self.endpoint("runtimes"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;
        decode(resp, timeout).await
    }

    /// Submit one execution request with a per-request timeout. No retries happen here.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] on transport failure, timeout, non-success status or an
    /// undecodable body.
    pub async fn execute(
        &self,
        payload: &ExecutePayload,
        timeout: Duration,
    ) -> Result<ExecuteResponse, EngineError> {
        let resp = self
            .http
            .post(self.endpoint("execute"))
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;
        decode(resp, timeout).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    timeout: Duration,
) -> Result<T, EngineError> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(|e| classify(&e, timeout))?;

    if !status.is_success() {
        let message = match serde_json::from_slice::<EngineMessage>(&body) {
            Ok(m) => m.message,
            Err(_) => String::from_utf8_lossy(&body)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect(),
        };
        return Err(EngineError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice(&body).map_err(|e| EngineError::Decode(e.to_string()))
}

#[async_trait]
impl RuntimeSource for EngineClient {
    async fn fetch_runtimes(&self) -> Result<Vec<RuntimeVersion>, EngineError> {
        let runtimes = self.list_runtimes().await?;
        Ok(runtimes.into_iter().map(RuntimeVersion::from).collect())
    }
}
