use crate::dispatcher::DispatchConfig;
use crate::retry::RetryPolicy;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Upper bound for every `*-secs` flag (one week).
const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "toolhub-exec-gateway",
    version,
    about = "Code-execution tool server backed by a Piston-compatible engine"
)]
pub struct GatewayArgs {
    /// Address the tool server listens on.
    #[arg(long, env = "TOOLHUB_EXEC_BIND", default_value = "0.0.0.0:6700")]
    pub bind: SocketAddr,

    /// Base URL of the execution engine API (the part before `/runtimes` and `/execute`).
    #[arg(
        long,
        env = "PISTON_URL",
        default_value = "http://localhost:2000/api/v2"
    )]
    pub engine_url: Url,

    /// Timeout of a single engine request.
    #[arg(long, env = "TOOLHUB_EXEC_REQUEST_TIMEOUT_SECS", default_value_t = 15)]
    pub request_timeout_secs: u64,

    /// Overall budget of one execution across retries.
    #[arg(long, env = "TOOLHUB_EXEC_CALL_BUDGET_SECS", default_value_t = 60)]
    pub call_budget_secs: u64,

    /// How long the first request waits for the initial runtime listing.
    #[arg(long, env = "TOOLHUB_EXEC_STARTUP_TIMEOUT_SECS", default_value_t = 30)]
    pub startup_timeout_secs: u64,

    #[arg(long, env = "TOOLHUB_EXEC_REFRESH_INTERVAL_SECS", default_value_t = 300)]
    pub refresh_interval_secs: u64,

    /// In-flight executions allowed at once.
    #[arg(long, env = "TOOLHUB_EXEC_MAX_CONCURRENCY", default_value_t = 16)]
    pub max_concurrency: usize,

    /// Attempts per execution, including the first.
    #[arg(long, env = "TOOLHUB_EXEC_RETRY_MAX_ATTEMPTS", default_value_t = 3)]
    pub retry_max_attempts: u32,

    #[arg(long, env = "TOOLHUB_EXEC_RETRY_INITIAL_INTERVAL_MS", default_value_t = 250)]
    pub retry_initial_interval_ms: u64,

    #[arg(long, env = "TOOLHUB_EXEC_RETRY_BACKOFF_COEFFICIENT", default_value_t = 2.0)]
    pub retry_backoff_coefficient: f64,

    #[arg(long, env = "TOOLHUB_EXEC_RETRY_MAX_INTERVAL_MS", default_value_t = 2000)]
    pub retry_max_interval_ms: u64,

    /// Error categories never retried: transport, timeout, rate_limited, upstream_5xx.
    #[arg(long, env = "TOOLHUB_EXEC_NON_RETRYABLE", value_delimiter = ',')]
    pub non_retryable: Vec<String>,

    /// Forwarded to the engine as `compile_timeout` (ms).
    #[arg(long, env = "TOOLHUB_EXEC_COMPILE_TIMEOUT_MS")]
    pub compile_timeout_ms: Option<u64>,

    /// Forwarded to the engine as `run_timeout` (ms).
    #[arg(long, env = "TOOLHUB_EXEC_RUN_TIMEOUT_MS")]
    pub run_timeout_ms: Option<u64>,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, env = "TOOLHUB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "TOOLHUB_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub refresh_interval: Duration,
    /// Timeout of a `GET /runtimes` call.
    pub listing_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    pub engine_url: Url,
    pub catalog: CatalogConfig,
    pub dispatch: DispatchConfig,
}

impl GatewayArgs {
    /// Validate flags into a [`GatewayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error for zero or over-long durations, concurrency outside
    /// `1..=Semaphore::MAX_PERMITS`, a non-http(s) engine URL, or an unusable backoff
    /// coefficient.
    pub fn into_config(self) -> anyhow::Result<GatewayConfig> {
        if !matches!(self.engine_url.scheme(), "http" | "https") {
            anyhow::bail!(
                "engine URL must be http(s), got scheme '{}'",
                self.engine_url.scheme()
            );
        }
        for (name, value) in [
            ("request-timeout-secs", self.request_timeout_secs),
            ("call-budget-secs", self.call_budget_secs),
            ("startup-timeout-secs", self.startup_timeout_secs),
            ("refresh-interval-secs", self.refresh_interval_secs),
        ] {
            if value == 0 {
                anyhow::bail!("--{name} must be greater than 0");
            }
            if value > MAX_DURATION_SECS {
                anyhow::bail!("--{name} must be at most {MAX_DURATION_SECS}");
            }
        }
        if self.max_concurrency == 0 {
            anyhow::bail!("--max-concurrency must be greater than 0");
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            anyhow::bail!(
                "--max-concurrency must be at most {}",
                Semaphore::MAX_PERMITS
            );
        }
        if self.retry_max_attempts == 0 {
            anyhow::bail!("--retry-max-attempts must be at least 1");
        }
        if !self.retry_backoff_coefficient.is_finite() || self.retry_backoff_coefficient < 1.0 {
            anyhow::bail!("--retry-backoff-coefficient must be a finite number >= 1.0");
        }

        let request_timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(GatewayConfig {
            bind: self.bind,
            engine_url: self.engine_url,
            catalog: CatalogConfig {
                refresh_interval: Duration::from_secs(self.refresh_interval_secs),
                listing_timeout: request_timeout,
            },
            dispatch: DispatchConfig {
                max_concurrency: self.max_concurrency,
                request_timeout,
                call_budget: Duration::from_secs(self.call_budget_secs),
                startup_timeout: Duration::from_secs(self.startup_timeout_secs),
                compile_timeout_ms: self.compile_timeout_ms,
                run_timeout_ms: self.run_timeout_ms,
                retry: RetryPolicy {
                    maximum_attempts: self.retry_max_attempts,
                    initial_interval_ms: self.retry_initial_interval_ms,
                    backoff_coefficient: self.retry_backoff_coefficient,
                    maximum_interval_ms: Some(self.retry_max_interval_ms),
                    non_retryable_error_types: self
                        .non_retryable
                        .into_iter()
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                },
            },
        })
    }
}
