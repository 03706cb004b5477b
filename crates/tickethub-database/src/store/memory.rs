//! In-memory principal store for single-node development and tests.
//!
//! A single Tokio mutex guards the whole map, so every trait method is one
//! critical section and the conditional-write semantics match the
//! PostgreSQL implementation exactly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use tickethub_core::result::AppResult;
use tickethub_entity::account::Account;
use tickethub_entity::session::{SessionRecord, SessionSet};

use super::PrincipalStore;

/// Per-account state held by the memory store.
#[derive(Debug, Clone)]
struct PrincipalState {
    /// The account row.
    account: Account,
    /// Revision counter for the session collection.
    revision: i64,
    /// Session records, oldest first.
    sessions: Vec<SessionRecord>,
    /// Legacy single-slot token fingerprint.
    legacy_token: Option<String>,
}

/// Principal store backed by a mutex-guarded map.
#[derive(Debug, Clone, Default)]
pub struct MemoryPrincipalStore {
    state: Arc<Mutex<HashMap<Uuid, PrincipalState>>>,
}

impl MemoryPrincipalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account with no sessions. Returns the account id.
    pub async fn insert_account(&self, account: Account) -> Uuid {
        let id = account.id;
        let mut state = self.state.lock().await;
        state.insert(
            id,
            PrincipalState {
                account,
                revision: 0,
                sessions: Vec::new(),
                legacy_token: None,
            },
        );
        id
    }

    /// Insert a session record directly, bypassing the manager. Useful for
    /// seeding expired or historical sessions.
    pub async fn insert_session(&self, session: SessionRecord) {
        let mut state = self.state.lock().await;
        if let Some(principal) = state.get_mut(&session.account_id) {
            principal.sessions.push(session);
            principal.revision += 1;
        }
    }

    /// Set the legacy single-slot token directly, as the pre-session
    /// schema would have left it.
    pub async fn set_legacy_token(&self, account_id: Uuid, token_hash: impl Into<String>) {
        let mut state = self.state.lock().await;
        if let Some(principal) = state.get_mut(&account_id) {
            principal.legacy_token = Some(token_hash.into());
        }
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state.get(&id).map(|p| p.account.clone()))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .values()
            .find(|p| p.account.email.eq_ignore_ascii_case(email))
            .map(|p| p.account.clone()))
    }

    async fn load_sessions(&self, account_id: Uuid) -> AppResult<Option<SessionSet>> {
        let state = self.state.lock().await;
        Ok(state.get(&account_id).map(|p| SessionSet {
            revision: p.revision,
            sessions: p.sessions.clone(),
            legacy_token: p.legacy_token.clone(),
        }))
    }

    async fn replace_sessions(
        &self,
        account_id: Uuid,
        expected_revision: i64,
        sessions: &[SessionRecord],
        legacy_token: Option<&str>,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let Some(principal) = state.get_mut(&account_id) else {
            return Ok(false);
        };

        if principal.revision != expected_revision {
            return Ok(false);
        }

        principal.revision += 1;
        principal.sessions = sessions.to_vec();
        principal.legacy_token = legacy_token.map(String::from);
        Ok(true)
    }

    async fn swap_session_token(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        current_hash: &str,
        replacement_hash: &str,
        used_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let Some(principal) = state.get_mut(&account_id) else {
            return Ok(false);
        };

        let Some(session) = principal
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.refresh_token_hash == current_hash)
        else {
            return Ok(false);
        };

        session.refresh_token_hash = replacement_hash.to_string();
        session.last_used_at = used_at;

        // Keep the legacy slot consistent when it mirrored the old value.
        if principal.legacy_token.as_deref() == Some(current_hash) {
            principal.legacy_token = Some(replacement_hash.to_string());
        }

        Ok(true)
    }

    async fn swap_legacy_token(
        &self,
        account_id: Uuid,
        current_hash: &str,
        replacement_hash: &str,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let Some(principal) = state.get_mut(&account_id) else {
            return Ok(false);
        };

        if principal.legacy_token.as_deref() != Some(current_hash) {
            return Ok(false);
        }

        principal.legacy_token = Some(replacement_hash.to_string());
        Ok(true)
    }

    async fn clear_legacy_token(&self, account_id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(principal) = state.get_mut(&account_id) {
            principal.legacy_token = None;
        }
        Ok(())
    }

    async fn update_last_login(&self, account_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(principal) = state.get_mut(&account_id) {
            principal.account.last_login_at = Some(at);
            principal.account.updated_at = at;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tickethub_entity::session::DeviceInfo;

    fn session(account_id: Uuid, hash: &str) -> SessionRecord {
        SessionRecord::new(
            Uuid::new_v4(),
            account_id,
            hash,
            DeviceInfo {
                user_agent: "Mozilla/5.0".to_string(),
                browser: None,
                os: None,
                device: None,
                ip_address: "10.0.0.1".to_string(),
            },
            false,
            Utc::now(),
            Duration::days(1),
        )
    }

    #[tokio::test]
    async fn test_replace_requires_current_revision() {
        let store = MemoryPrincipalStore::new();
        let account_id = store.insert_account(Account::new("a@b.c", "hash")).await;

        let first = session(account_id, "one");
        assert!(
            store
                .replace_sessions(account_id, 0, std::slice::from_ref(&first), Some("one"))
                .await
                .unwrap()
        );

        // A writer still holding revision 0 must lose.
        let second = session(account_id, "two");
        assert!(
            !store
                .replace_sessions(account_id, 0, &[second], Some("two"))
                .await
                .unwrap()
        );

        let set = store.load_sessions(account_id).await.unwrap().unwrap();
        assert_eq!(set.revision, 1);
        assert_eq!(set.sessions.len(), 1);
        assert_eq!(set.sessions[0].refresh_token_hash, "one");
    }

    #[tokio::test]
    async fn test_swap_session_token_is_exactly_once() {
        let store = MemoryPrincipalStore::new();
        let account_id = store.insert_account(Account::new("a@b.c", "hash")).await;
        let record = session(account_id, "old");
        let session_id = record.id;
        store.insert_session(record).await;

        let now = Utc::now();
        assert!(
            store
                .swap_session_token(account_id, session_id, "old", "new", now)
                .await
                .unwrap()
        );
        // The same prior value can never win twice.
        assert!(
            !store
                .swap_session_token(account_id, session_id, "old", "newer", now)
                .await
                .unwrap()
        );

        let set = store.load_sessions(account_id).await.unwrap().unwrap();
        assert_eq!(set.sessions[0].refresh_token_hash, "new");
    }

    #[tokio::test]
    async fn test_swap_session_token_updates_mirroring_legacy_slot() {
        let store = MemoryPrincipalStore::new();
        let account_id = store.insert_account(Account::new("a@b.c", "hash")).await;
        let record = session(account_id, "old");
        let session_id = record.id;
        store.insert_session(record).await;
        store.set_legacy_token(account_id, "old").await;

        store
            .swap_session_token(account_id, session_id, "old", "new", Utc::now())
            .await
            .unwrap();

        let set = store.load_sessions(account_id).await.unwrap().unwrap();
        assert_eq!(set.legacy_token.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_swap_and_clear_legacy_token() {
        let store = MemoryPrincipalStore::new();
        let account_id = store.insert_account(Account::new("a@b.c", "hash")).await;
        store.set_legacy_token(account_id, "old").await;

        assert!(
            store
                .swap_legacy_token(account_id, "old", "new")
                .await
                .unwrap()
        );
        assert!(
            !store
                .swap_legacy_token(account_id, "old", "other")
                .await
                .unwrap()
        );

        store.clear_legacy_token(account_id).await.unwrap();
        let set = store.load_sessions(account_id).await.unwrap().unwrap();
        assert_eq!(set.legacy_token, None);
    }
}
