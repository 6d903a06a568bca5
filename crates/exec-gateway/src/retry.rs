use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for engine calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the initial attempt (1 => no retries).
    pub maximum_attempts: u32,
    /// Initial backoff interval in milliseconds (before the first retry).
    pub initial_interval_ms: u64,
    /// Backoff multiplier (typically >= 1.0).
    pub backoff_coefficient: f64,
    /// Optional maximum interval between retries in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_interval_ms: Option<u64>,
    /// Error categories (see `EngineError::category`) that must not be retried even when
    /// transient, e.g. `"rate_limited"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_retryable_error_types: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            maximum_attempts: 3,
            initial_interval_ms: 250,
            backoff_coefficient: 2.0,
            maximum_interval_ms: Some(2000),
            non_retryable_error_types: Vec::new(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.maximum_attempts.max(1)
    }

    #[must_use]
    pub fn disallows(&self, category: &str) -> bool {
        self.non_retryable_error_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(category))
    }
}

/// Backoff to wait after attempt number `attempt` (1-based) failed.
#[must_use]
pub fn retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    // attempt starts at 1 for the initial try; delay after attempt 1 is `initial_interval`.
    if attempt == 0 {
        return Duration::from_millis(0);
    }
    let exp = attempt.saturating_sub(1).min(30);
    let coeff = policy.backoff_coefficient;
    if !coeff.is_finite() || coeff <= 0.0 {
        return Duration::from_millis(0);
    }
    let mult = coeff.powi(i32::try_from(exp).unwrap_or(30));
    if !mult.is_finite() || mult <= 0.0 {
        return Duration::from_millis(0);
    }

    let mut d = Duration::from_millis(policy.initial_interval_ms).mul_f64(mult);
    if let Some(max_ms) = policy.maximum_interval_ms {
        d = d.min(Duration::from_millis(max_ms));
    }
    d
}
