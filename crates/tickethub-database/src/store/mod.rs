//! The persistent-store capability consumed by the session core.
//!
//! Every mutation of an account's session state goes through one of the
//! conditional primitives below; there is deliberately no blind "write
//! sessions" operation, so two concurrent writers on the same account can
//! never silently clobber each other.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use tickethub_core::result::AppResult;
use tickethub_entity::account::Account;
use tickethub_entity::session::{SessionRecord, SessionSet};

pub use memory::MemoryPrincipalStore;
pub use postgres::PgPrincipalStore;

/// Account lookup plus atomic conditional writes on the session state.
///
/// Implementations must be safe under truly parallel callers. Each
/// conditional method performs its check and its write as one atomic
/// operation against the backing store and reports whether the expected
/// prior value still held (`true`) or the caller lost a race (`false`).
#[async_trait]
pub trait PrincipalStore: Send + Sync + std::fmt::Debug {
    /// Load an account by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Load an account by login email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Load an account's session collection, legacy slot, and revision.
    ///
    /// `None` when the account itself does not exist.
    async fn load_sessions(&self, account_id: Uuid) -> AppResult<Option<SessionSet>>;

    /// Replace the whole session collection, but only if its revision
    /// still equals `expected_revision`. The legacy slot is set to
    /// `legacy_token` in the same atomic operation.
    async fn replace_sessions(
        &self,
        account_id: Uuid,
        expected_revision: i64,
        sessions: &[SessionRecord],
        legacy_token: Option<&str>,
    ) -> AppResult<bool>;

    /// Rotate one session's stored token from `current_hash` to
    /// `replacement_hash` and bump its `last_used_at`, but only if the
    /// stored value still equals `current_hash` at the moment of the
    /// write. A legacy slot holding the same value is updated alongside.
    async fn swap_session_token(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        current_hash: &str,
        replacement_hash: &str,
        used_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Rotate the legacy single-slot token under the same stored-value
    /// condition. Serves clients that never adopted sessions.
    async fn swap_legacy_token(
        &self,
        account_id: Uuid,
        current_hash: &str,
        replacement_hash: &str,
    ) -> AppResult<bool>;

    /// Clear the legacy single-slot token, leaving sessions untouched.
    async fn clear_legacy_token(&self, account_id: Uuid) -> AppResult<()>;

    /// Record a successful login time.
    async fn update_last_login(&self, account_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}
