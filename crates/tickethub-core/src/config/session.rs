//! Session lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum live sessions per account. Logging in past the limit
    /// evicts the least recently used session.
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_account: usize,
    /// How many times a conditional write to the session collection is
    /// retried against fresh state before giving up.
    #[serde(default = "default_write_retries")]
    pub write_retry_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_account: default_max_sessions(),
            write_retry_limit: default_write_retries(),
        }
    }
}

fn default_max_sessions() -> usize {
    5
}

fn default_write_retries() -> u32 {
    8
}
