//! Configuration types for the query executor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExecutorError, ExecutorResult};

/// Configuration for the query executor.
///
/// # Example
///
/// ```rust
/// use jitql_executor::{CompileFailurePolicy, ExecutorConfig};
///
/// let config = ExecutorConfig::builder()
///     .with_jit_threshold(3)
///     .with_compile_failure_policy(CompileFailurePolicy::Remember)
///     .build();
///
/// assert_eq!(config.jit_threshold, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutorConfig {
    /// Number of valid occurrences after which a query is compiled.
    /// `0` and `1` both compile on first sight.
    pub jit_threshold: u64,
    /// What to do when the compiler reports a query as not compilable.
    pub compile_failure: CompileFailurePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            jit_threshold: 1,
            compile_failure: CompileFailurePolicy::Retry,
        }
    }
}

impl ExecutorConfig {
    /// Creates a new builder for ExecutorConfig.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }
}

/// Builder for ExecutorConfig.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    /// Sets the compilation threshold.
    pub fn with_jit_threshold(mut self, jit_threshold: u64) -> Self {
        self.config.jit_threshold = jit_threshold;
        self
    }

    /// Sets the compile failure policy.
    pub fn with_compile_failure_policy(mut self, policy: CompileFailurePolicy) -> Self {
        self.config.compile_failure = policy;
        self
    }

    /// Builds the ExecutorConfig.
    pub fn build(self) -> ExecutorConfig {
        self.config
    }
}

/// Behaviour after the compiler reports a query as not compilable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompileFailurePolicy {
    /// Store nothing and interpret; the next occurrence tries to compile again.
    #[default]
    Retry,
    /// Record the failure in the cache entry and keep interpreting that query
    /// without further compile attempts until the entry is evicted.
    Remember,
}

/// Configuration for the compilation cache.
///
/// # Example
///
/// ```rust
/// use jitql_executor::CacheConfig;
/// use std::time::Duration;
///
/// let config: CacheConfig = serde_json::from_str(r#"{"maxSize": 100, "ttlInMs": 60000}"#).unwrap();
/// assert_eq!(config.max_size, 100);
/// assert_eq!(config.ttl(), Some(Duration::from_secs(60)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Maximum number of entries held before LRU eviction.
    pub max_size: usize,
    /// Optional per-entry time-to-live in milliseconds.
    #[serde(default, rename = "ttlInMs", skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl_ms: None,
        }
    }
}

impl CacheConfig {
    /// Creates a config with the given size and no expiry.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ttl_ms: None,
        }
    }

    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }

    /// Checks that the size and TTL are positive.
    pub fn validate(&self) -> ExecutorResult<()> {
        if self.max_size == 0 {
            return Err(ExecutorError::InvalidConfig(
                "cache maxSize must be a positive integer".to_string(),
            ));
        }
        if self.ttl_ms == Some(0) {
            return Err(ExecutorError::InvalidConfig(
                "cache ttlInMs must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}
