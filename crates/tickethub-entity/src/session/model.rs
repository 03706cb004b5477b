//! Session entity model and sanitized views.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Device details captured at login, parsed once from the raw client
/// signal. Browser/OS/device labels are heuristic and display-only; they
/// must never feed an authorization decision.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeviceInfo {
    /// Raw User-Agent header value.
    pub user_agent: String,
    /// Browser family, when recognizable.
    pub browser: Option<String>,
    /// Operating system family, when recognizable.
    pub os: Option<String>,
    /// Device class (desktop, mobile, tablet), when recognizable.
    pub device: Option<String>,
    /// IP address the session was created from.
    pub ip_address: String,
}

impl DeviceInfo {
    /// IP address with the host-identifying tail replaced, safe for
    /// display in the session listing.
    pub fn masked_ip(&self) -> String {
        mask_ip(&self.ip_address)
    }
}

/// One authenticated device/browser for an account.
///
/// Created on login, its token and `last_used_at` are replaced on every
/// successful rotation, and it is removed on logout or lazily once
/// `expires_at` has passed. The raw refresh secret is never stored; only
/// its SHA-256 fingerprint is.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRecord {
    /// Unique session identifier.
    pub id: Uuid,
    /// The account this session belongs to.
    pub account_id: Uuid,
    /// SHA-256 fingerprint of the current refresh token.
    pub refresh_token_hash: String,
    /// Device details captured at login.
    #[sqlx(flatten)]
    pub device: DeviceInfo,
    /// Whether the client asked for the long session lifetime.
    pub remember_me: bool,
    /// When the session was created (login time).
    pub created_at: DateTime<Utc>,
    /// When the session's token was last successfully rotated.
    pub last_used_at: DateTime<Utc>,
    /// When the session expires. Fixed at creation; rotation does not
    /// extend it.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Build a new session expiring `ttl` after `now`.
    pub fn new(
        id: Uuid,
        account_id: Uuid,
        refresh_token_hash: impl Into<String>,
        device: DeviceInfo,
        remember_me: bool,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id,
            account_id,
            refresh_token_hash: refresh_token_hash.into(),
            device,
            remember_me,
            created_at: now,
            last_used_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check whether the session has passed its absolute expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Sanitized copy for the session-listing UI. No secret fields, IP
    /// partially masked.
    pub fn to_view(&self, current: bool) -> SessionView {
        SessionView {
            session_id: self.id,
            user_agent: self.device.user_agent.clone(),
            browser: self.device.browser.clone(),
            os: self.device.os.clone(),
            device: self.device.device.clone(),
            ip_address: self.device.masked_ip(),
            remember_me: self.remember_me,
            current,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
            expires_at: self.expires_at,
        }
    }
}

/// Sanitized session representation returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    /// Session identifier (needed for per-device logout).
    pub session_id: Uuid,
    /// Raw User-Agent header value.
    pub user_agent: String,
    /// Browser family label.
    pub browser: Option<String>,
    /// Operating system label.
    pub os: Option<String>,
    /// Device class label.
    pub device: Option<String>,
    /// Partially masked IP address.
    pub ip_address: String,
    /// Whether the long session lifetime was chosen.
    pub remember_me: bool,
    /// Whether this is the caller's own session.
    pub current: bool,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last used.
    pub last_used_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

/// An account's full session state as loaded from the store.
///
/// `revision` is the expected-prior-value for conditional replacement of
/// the collection; `legacy_token` is the single-slot field kept for
/// clients that predate per-device sessions. The session list is the
/// source of truth; the legacy slot is re-derived from it on every write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSet {
    /// Monotonic counter bumped by every structural write.
    pub revision: i64,
    /// Live and not-yet-pruned sessions, oldest first.
    pub sessions: Vec<SessionRecord>,
    /// SHA-256 fingerprint held in the legacy single-slot field.
    pub legacy_token: Option<String>,
}

impl SessionSet {
    /// Fingerprint of the newest session's token (by creation time), the
    /// value the legacy slot mirrors.
    pub fn newest_token_hash(&self) -> Option<String> {
        self.sessions
            .iter()
            .max_by_key(|s| s.created_at)
            .map(|s| s.refresh_token_hash.clone())
    }
}

/// Mask the host-identifying tail of an IP address for display.
///
/// IPv4 keeps the first two octets (`203.0.*.*`); IPv6 keeps the first two
/// groups. Unparseable input is fully masked.
pub fn mask_ip(ip: &str) -> String {
    if ip.contains('.') {
        let octets: Vec<&str> = ip.split('.').collect();
        if octets.len() == 4 {
            return format!("{}.{}.*.*", octets[0], octets[1]);
        }
    } else if ip.contains(':') {
        let groups: Vec<&str> = ip.split(':').filter(|g| !g.is_empty()).collect();
        if groups.len() >= 2 {
            return format!("{}:{}::*", groups[0], groups[1]);
        }
    }
    "*".repeat(ip.len().max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceInfo {
        DeviceInfo {
            user_agent: "Mozilla/5.0".to_string(),
            browser: Some("Firefox".to_string()),
            os: Some("Linux".to_string()),
            device: Some("Desktop".to_string()),
            ip_address: "203.0.113.7".to_string(),
        }
    }

    #[test]
    fn test_mask_ip() {
        assert_eq!(mask_ip("203.0.113.7"), "203.0.*.*");
        assert_eq!(mask_ip("10.1.2.3"), "10.1.*.*");
        assert_eq!(mask_ip("2001:db8::1"), "2001:db8::*");
        assert_eq!(mask_ip("garbage"), "*******");
    }

    #[test]
    fn test_expiry_window() {
        let now = Utc::now();
        let short = SessionRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "hash",
            device(),
            false,
            now,
            Duration::days(1),
        );
        assert_eq!(short.expires_at - short.created_at, Duration::days(1));
        assert!(!short.is_expired_at(now));
        assert!(short.is_expired_at(now + Duration::days(1)));
    }

    #[test]
    fn test_view_has_no_secret_and_masks_ip() {
        let now = Utc::now();
        let session = SessionRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "super-secret-hash",
            device(),
            true,
            now,
            Duration::days(30),
        );
        let view = session.to_view(true);
        assert_eq!(view.ip_address, "203.0.*.*");
        assert!(view.current);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("super-secret-hash"));
    }

    #[test]
    fn test_newest_token_hash() {
        let now = Utc::now();
        let account_id = Uuid::new_v4();
        let older = SessionRecord::new(
            Uuid::new_v4(),
            account_id,
            "older",
            device(),
            false,
            now - Duration::hours(2),
            Duration::days(1),
        );
        let newer = SessionRecord::new(
            Uuid::new_v4(),
            account_id,
            "newer",
            device(),
            false,
            now,
            Duration::days(1),
        );
        let set = SessionSet {
            revision: 0,
            sessions: vec![older, newer],
            legacy_token: None,
        };
        assert_eq!(set.newest_token_hash().as_deref(), Some("newer"));
        assert_eq!(SessionSet::default().newest_token_hash(), None);
    }
}
