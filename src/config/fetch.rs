//! HTTP client and download budget configuration

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;

/// Bytes in one mebibyte
pub const MIB: u64 = 1024 * 1024;

/// Settings for every HTTP request the sampler makes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,
    /// Whole-request timeout (seconds), including body streaming
    pub request_timeout_secs: u64,
    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Download budget per segment (MiB)
    pub max_segment_mb: u64,
    /// Retry policy for establishing responses
    pub retry: RetryConfig,
}

impl FetchConfig {
    /// Per-segment download budget in bytes
    pub fn max_segment_bytes(&self) -> u64 {
        self.max_segment_mb.saturating_mul(MIB)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 600,
            connect_timeout_secs: 10,
            max_segment_mb: 50,
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt (milliseconds)
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}
