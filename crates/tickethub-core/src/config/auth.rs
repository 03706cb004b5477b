//! Authentication and token configuration.

use serde::{Deserialize, Serialize};

/// Authentication and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Refresh token TTL in days for a standard login.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_days: u64,
    /// Refresh token TTL in days when the client asked to be remembered.
    #[serde(default = "default_remembered_ttl")]
    pub refresh_remembered_ttl_days: u64,
}

impl AuthConfig {
    /// Lifetime of an access token.
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_ttl_minutes as i64)
    }

    /// Lifetime of a refresh token (and of the session it belongs to),
    /// selected by the client's remember-me choice.
    pub fn refresh_ttl(&self, remember_me: bool) -> chrono::Duration {
        let days = if remember_me {
            self.refresh_remembered_ttl_days
        } else {
            self.refresh_ttl_days
        };
        chrono::Duration::days(days as i64)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_ttl_minutes: default_access_ttl(),
            refresh_ttl_days: default_refresh_ttl(),
            refresh_remembered_ttl_days: default_remembered_ttl(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    1
}

fn default_remembered_ttl() -> u64 {
    30
}
