//! Execution dispatch: resolve, bound concurrency, send with retry, normalize.

use crate::catalog::{RuntimeCatalog, RuntimeVersion};
use crate::engine::{EngineClient, EngineFile, ExecutePayload, ExecuteResponse, StageOutput};
use crate::error::{EngineError, ExecutionError, Result};
use crate::resolver::resolve;
use crate::retry::{RetryPolicy, retry_delay};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// In-flight executions per process.
    pub max_concurrency: usize,
    /// Timeout of a single engine request.
    pub request_timeout: Duration,
    /// Overall budget for one call, across all attempts and backoffs.
    pub call_budget: Duration,
    /// How long the first request may wait for the initial catalog fetch.
    pub startup_timeout: Duration,
    /// Forwarded to the engine as `compile_timeout` / `run_timeout` when set.
    pub compile_timeout_ms: Option<u64>,
    pub run_timeout_ms: Option<u64>,
    pub retry: RetryPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            request_timeout: Duration::from_secs(15),
            call_budget: Duration::from_secs(60),
            startup_timeout: Duration::from_secs(30),
            compile_timeout_ms: None,
            run_timeout_ms: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub language: String,
    #[serde(default)]
    pub version_constraint: Option<String>,
    pub source: String,
    #[serde(default)]
    pub stdin: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Normalized outcome of one execution. A failed compile or a non-zero exit is still a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub language: String,
    pub resolved_version: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    pub duration_ms: u64,
    pub auto_selected: bool,
}

pub struct ExecutionDispatcher {
    catalog: RuntimeCatalog,
    engine: EngineClient,
    config: DispatchConfig,
    permits: Arc<Semaphore>,
}

impl ExecutionDispatcher {
    #[must_use]
    pub fn new(catalog: RuntimeCatalog, engine: EngineClient, config: DispatchConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            catalog,
            engine,
            config,
            permits,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &RuntimeCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Resolve the runtime for a `(language, constraint)` pair against a ready catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::CatalogUnavailable`] if the catalog cannot be loaded, or
    /// [`ExecutionError::Resolution`] if nothing matches.
    pub async fn resolve_runtime(
        &self,
        language: &str,
        constraint: Option<&str>,
    ) -> Result<RuntimeVersion> {
        let snapshot = self.catalog.ensure_ready(self.config.startup_timeout).await?;
        Ok(resolve(language, constraint, &snapshot)?.clone())
    }

    /// Run one program on the engine.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::CatalogUnavailable`] / [`ExecutionError::Resolution`] before anything
    ///   is sent; these are never retried
    /// - [`ExecutionError::UpstreamUnavailable`] once transient failures exhaust the retry
    ///   policy or the call budget
    /// - [`ExecutionError::UpstreamRejected`] for a non-transient HTTP error
    /// - [`ExecutionError::MalformedResponse`] for an undecodable success body
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let started = Instant::now();
        let constraint = request
            .version_constraint
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let auto_selected = constraint.is_none();
        let runtime = self.resolve_runtime(&request.language, constraint).await?;

        let payload = ExecutePayload {
            language: runtime.language.clone(),
            version: runtime.version.clone(),
            files: vec![EngineFile {
                content: request.source,
            }],
            stdin: request.stdin.unwrap_or_default(),
            args: request.args,
            compile_timeout: self.config.compile_timeout_ms,
            run_timeout: self.config.run_timeout_ms,
        };

        let _permit =
            self.permits
                .acquire()
                .await
                .map_err(|_| ExecutionError::UpstreamUnavailable {
                    attempts: 0,
                    message: "dispatcher is shutting down".to_string(),
                })?;

        let deadline = Instant::now() + self.config.call_budget;
        let response = self.send_with_retry(&payload, deadline).await?;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = normalize(&runtime, response, auto_selected, duration_ms)?;

        tracing::debug!(
            language = %result.language,
            version = %result.resolved_version,
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            auto_selected,
            "execution finished"
        );
        Ok(result)
    }

    async fn send_with_retry(
        &self,
        payload: &ExecutePayload,
        deadline: Instant,
    ) -> Result<ExecuteResponse> {
        let policy = &self.config.retry;
        let max_attempts = policy.attempts();
        let mut attempt: u32 = 1;
        let mut last_error: Option<EngineError> = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.budget_exhausted(attempt - 1, last_error.as_ref()));
            }

            let per_attempt = self.config.request_timeout.min(remaining);
            let err = match self.engine.execute(payload, per_attempt).await {
                Ok(r) => return Ok(r),
                Err(e) => e,
            };

            let retryable = err.is_transient() && !policy.disallows(err.category());
            tracing::warn!(
                attempt,
                max_attempts,
                retryable,
                category = err.category(),
                language = %payload.language,
                version = %payload.version,
                error = %err,
                "engine execute attempt failed"
            );

            if !retryable {
                return Err(terminal_error(err, attempt));
            }
            if attempt >= max_attempts {
                return Err(ExecutionError::UpstreamUnavailable {
                    attempts: attempt,
                    message: err.to_string(),
                });
            }

            let delay = retry_delay(policy, attempt);
            let remaining = deadline.saturating_duration_since(Instant::now());
            if delay >= remaining {
                return Err(self.budget_exhausted(attempt, Some(&err)));
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            last_error = Some(err);
            attempt = attempt.saturating_add(1);
        }
    }

    fn budget_exhausted(&self, attempts: u32, last: Option<&EngineError>) -> ExecutionError {
        let budget_ms = self.config.call_budget.as_millis();
        let message = match last {
            Some(e) => format!("call budget of {budget_ms}ms exhausted; last error: {e}"),
            None => format!("call budget of {budget_ms}ms exhausted"),
        };
        ExecutionError::UpstreamUnavailable { attempts, message }
    }
}

fn terminal_error(err: EngineError, attempts: u32) -> ExecutionError {
    if err.is_transient() {
        return ExecutionError::UpstreamUnavailable {
            attempts,
            message: err.to_string(),
        };
    }
    match err {
        EngineError::Status { status, message } => {
            ExecutionError::UpstreamRejected { status, message }
        }
        EngineError::Decode(message) => ExecutionError::MalformedResponse { message },
        other => ExecutionError::UpstreamUnavailable {
            attempts,
            message: other.to_string(),
        },
    }
}

fn stage_failed(stage: &StageOutput) -> bool {
    match stage.code {
        Some(code) => code != 0,
        None => stage.signal.is_some(),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn normalize(
    runtime: &RuntimeVersion,
    response: ExecuteResponse,
    auto_selected: bool,
    duration_ms: u64,
) -> Result<ExecutionResult> {
    let base = |stdout: String, stderr: String, exit_code: i64| ExecutionResult {
        language: runtime.language.clone(),
        resolved_version: runtime.version.clone(),
        stdout,
        stderr,
        exit_code,
        compile_output: None,
        signal: None,
        duration_ms,
        auto_selected,
    };

    match (response.compile, response.run) {
        (Some(compile), run) if stage_failed(&compile) || run.is_none() => {
            let output = if compile.output.is_empty() {
                compile.stderr.clone()
            } else {
                compile.output
            };
            Ok(ExecutionResult {
                compile_output: Some(output),
                signal: compile.signal,
                ..base(String::new(), compile.stderr, compile.code.unwrap_or(-1))
            })
        }
        (compile, Some(run)) => Ok(ExecutionResult {
            compile_output: compile.and_then(|c| non_empty(c.output)),
            signal: run.signal,
            ..base(run.stdout, run.stderr, run.code.unwrap_or(-1))
        }),
        (_, None) => Err(ExecutionError::MalformedResponse {
            message: "engine response has neither a run nor a compile stage".to_string(),
        }),
    }
}
