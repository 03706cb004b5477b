//! Account entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::AccountStatus;

/// A registered account in the TicketHub system.
///
/// An account owns zero or more sessions; sessions never outlive their
/// account. The session collection itself is modeled separately as
/// [`crate::session::SessionSet`] so that it can be replaced under a
/// revision check.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    /// Unique account identifier.
    pub id: Uuid,
    /// Unique login email.
    pub email: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Human-readable display name.
    pub display_name: Option<String>,
    /// Account status.
    pub status: AccountStatus,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
    /// Last successful login time.
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Build a fresh active account. Intended for seeding and tests; real
    /// registration flows live in the excluded CRUD layer.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            display_name: None,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Same as [`Account::new`] but with an explicit status.
    pub fn with_status(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        status: AccountStatus,
    ) -> Self {
        Self {
            status,
            ..Self::new(email, password_hash)
        }
    }

    /// Check if the account can log in right now.
    pub fn can_login(&self) -> bool {
        self.status.can_login()
    }
}
