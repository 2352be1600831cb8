use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::invalid_config;
use crate::Result;

/// Basic retry policy template
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts, the first one included
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Overall deadline for all attempts (unit: milliseconds)
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_op_timeout_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl BackoffPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay before attempt `attempt + 1`, doubling from `base_delay_ms` and
    /// capped at `max_delay_ms`.
    pub fn delay_for(
        &self,
        attempt: usize,
    ) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    fn validate(
        &self,
        name: &str,
    ) -> Result<()> {
        // retries must stay bounded so contention surfaces as Conflict
        if self.max_retries == 0 {
            return Err(invalid_config(format!("retry.{name}.max_retries must be at least 1")));
        }
        if self.timeout_ms == 0 {
            return Err(invalid_config(format!("retry.{name}.timeout_ms must be positive")));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(invalid_config(format!(
                "retry.{name}.base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// Divide strategies by operation type
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RetryPolicies {
    /// Read-modify-write transactions on a session document
    #[serde(default)]
    pub transaction: BackoffPolicy,
}

impl RetryPolicies {
    pub fn validate(&self) -> Result<()> {
        self.transaction.validate("transaction")
    }
}

fn default_max_retries() -> usize {
    5
}
fn default_op_timeout_ms() -> u64 {
    2000
}
fn default_base_delay_ms() -> u64 {
    5
}
fn default_max_delay_ms() -> u64 {
    200
}
