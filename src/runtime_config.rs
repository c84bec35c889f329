//! # Runtime Configuration Module
//!
//! Environment variable-based tuning for the stub server's runtime behavior.
//!
//! ## Environment Variables
//!
//! ### `HTTPSTUB_WORKERS`
//!
//! Number of worker threads pulling connections off the listening socket.
//! Each worker handles one connection at a time, so this bounds how many
//! concurrent requests the stub can serve; enough for test-process
//! concurrency, not for load.
//!
//! Default: `4`. Zero or unparseable values fall back to the default.

/// Runtime tuning loaded from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of worker threads serving connections
    pub workers: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            workers: parse_workers(std::env::var("HTTPSTUB_WORKERS").ok()),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

fn parse_workers(raw: Option<String>) -> usize {
    raw.and_then(|s| s.parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(4)
}
