//! Account status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a helpdesk account.
///
/// New registrations start as `Unverified`, become `Unapproved` once the
/// confirmation email is clicked, and reach `Active` after an agent or
/// administrator approves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account is active and can log in.
    Active,
    /// Email address has not been confirmed yet.
    Unverified,
    /// Email confirmed but the account awaits approval.
    Unapproved,
    /// The registration was rejected.
    Rejected,
}

impl AccountStatus {
    /// Check if the account can log in with this status.
    pub fn can_login(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Machine-readable reason code attached to account-state failures.
    ///
    /// `None` for `Active` since an active account is never rejected on
    /// state grounds.
    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Active => None,
            Self::Unverified => Some("EMAIL_UNVERIFIED"),
            Self::Unapproved => Some("PENDING_APPROVAL"),
            Self::Rejected => Some("REJECTED"),
        }
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Unverified => "unverified",
            Self::Unapproved => "unapproved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = tickethub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "unverified" => Ok(Self::Unverified),
            "unapproved" => Ok(Self::Unapproved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(tickethub_core::AppError::validation(format!(
                "Invalid account status: '{s}'. Expected one of: active, unverified, unapproved, rejected"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_can_login() {
        assert!(AccountStatus::Active.can_login());
        assert!(!AccountStatus::Unverified.can_login());
        assert!(!AccountStatus::Unapproved.can_login());
        assert!(!AccountStatus::Rejected.can_login());
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(AccountStatus::Active.reason_code(), None);
        assert_eq!(
            AccountStatus::Unverified.reason_code(),
            Some("EMAIL_UNVERIFIED")
        );
        assert_eq!(
            AccountStatus::Unapproved.reason_code(),
            Some("PENDING_APPROVAL")
        );
        assert_eq!(AccountStatus::Rejected.reason_code(), Some("REJECTED"));
    }
}
