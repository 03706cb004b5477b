//! Per-account session collection management.
//!
//! Every structural change (attach, evict, remove, prune) is performed as
//! a conditional replacement of the whole collection against the revision
//! the caller read. A lost race re-reads fresh state and reapplies; no
//! in-process lock is ever held across a store round-trip.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use tickethub_core::config::auth::AuthConfig;
use tickethub_core::config::session::SessionConfig;
use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_database::store::PrincipalStore;
use tickethub_entity::session::{SessionRecord, SessionSet, SessionView};

use crate::token::fingerprint;

use super::device::parse_device;

/// Result of one application of a collection edit.
enum Edit<T> {
    /// Persist the modified collection, then return the value.
    Write(T),
    /// Nothing changed; return the value without writing.
    Skip(T),
}

/// Owns the per-account collection of session records.
#[derive(Clone)]
pub struct SessionManager {
    /// Session persistence.
    store: Arc<dyn PrincipalStore>,
    /// Token/session lifetime configuration.
    auth_config: AuthConfig,
    /// Collection limits and retry configuration.
    session_config: SessionConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session_config", &self.session_config)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        store: Arc<dyn PrincipalStore>,
        auth_config: AuthConfig,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            store,
            auth_config,
            session_config,
        }
    }

    /// Builds a session record for a fresh login. Parses the device signal
    /// once and derives the expiry from the remember-me choice. The raw
    /// refresh token is fingerprinted here and never retained.
    pub fn create(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        refresh_token: &str,
        remember_me: bool,
        user_agent: Option<&str>,
        ip_address: &str,
    ) -> SessionRecord {
        let device = parse_device(user_agent, ip_address);
        SessionRecord::new(
            session_id,
            account_id,
            fingerprint(refresh_token),
            device,
            remember_me,
            Utc::now(),
            self.auth_config.refresh_ttl(remember_me),
        )
    }

    /// Appends a session to its account's collection.
    ///
    /// Expired sessions are pruned first; if the account is still at the
    /// concurrency cap the session with the smallest `last_used_at` is
    /// evicted (oldest-used, not oldest-created).
    pub async fn attach(&self, session: SessionRecord) -> AppResult<()> {
        let account_id = session.account_id;
        let max = self.session_config.max_sessions_per_account;

        self.rewrite(account_id, |sessions| {
            let now = Utc::now();
            sessions.retain(|s| !s.is_expired_at(now));

            while sessions.len() >= max {
                let lru = sessions
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, s)| s.last_used_at)
                    .map(|(i, _)| i);
                match lru {
                    Some(i) => {
                        let evicted = sessions.remove(i);
                        warn!(
                            account_id = %account_id,
                            evicted_session = %evicted.id,
                            last_used_at = %evicted.last_used_at,
                            "Evicting least recently used session at concurrency cap"
                        );
                    }
                    None => break,
                }
            }

            sessions.push(session.clone());
            Edit::Write(())
        })
        .await?;

        info!(account_id = %account_id, session_id = %session.id, "Session attached");
        Ok(())
    }

    /// Finds the live session holding the given refresh token, if any.
    pub async fn find_by_token(
        &self,
        account_id: Uuid,
        refresh_token: &str,
    ) -> AppResult<Option<SessionRecord>> {
        let hash = fingerprint(refresh_token);
        let set = self.session_set(account_id).await?;
        let now = Utc::now();
        Ok(set
            .sessions
            .into_iter()
            .find(|s| s.refresh_token_hash == hash && !s.is_expired_at(now)))
    }

    /// Finds a live session by its ID.
    pub async fn find_by_id(
        &self,
        account_id: Uuid,
        session_id: Uuid,
    ) -> AppResult<Option<SessionRecord>> {
        let set = self.session_set(account_id).await?;
        let now = Utc::now();
        Ok(set
            .sessions
            .into_iter()
            .find(|s| s.id == session_id && !s.is_expired_at(now)))
    }

    /// Replaces a session's token and bumps its `last_used_at`.
    ///
    /// Returns `false` when no live session has that ID. Unconditional on
    /// the stored token value; rotation uses [`Self::swap_refresh_token`]
    /// instead.
    pub async fn touch(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        new_token: &str,
    ) -> AppResult<bool> {
        let hash = fingerprint(new_token);
        self.rewrite(account_id, |sessions| {
            let now = Utc::now();
            match sessions
                .iter_mut()
                .find(|s| s.id == session_id && !s.is_expired_at(now))
            {
                Some(session) => {
                    session.refresh_token_hash = hash.clone();
                    session.last_used_at = now;
                    Edit::Write(true)
                }
                None => Edit::Skip(false),
            }
        })
        .await
    }

    /// Rotates a session's stored token, but only if the stored value
    /// still equals `current_hash` at the moment of the write. Returns
    /// `false` when a concurrent caller won the race.
    pub async fn swap_refresh_token(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        current_hash: &str,
        replacement_hash: &str,
    ) -> AppResult<bool> {
        self.store
            .swap_session_token(
                account_id,
                session_id,
                current_hash,
                replacement_hash,
                Utc::now(),
            )
            .await
    }

    /// Rotates the legacy single-slot token under the same stored-value
    /// condition.
    pub async fn swap_legacy_token(
        &self,
        account_id: Uuid,
        current_hash: &str,
        replacement_hash: &str,
    ) -> AppResult<bool> {
        self.store
            .swap_legacy_token(account_id, current_hash, replacement_hash)
            .await
    }

    /// Removes one session. Returns `false` when absent.
    pub async fn remove(&self, account_id: Uuid, session_id: Uuid) -> AppResult<bool> {
        let removed = self
            .rewrite(account_id, |sessions| {
                match sessions.iter().position(|s| s.id == session_id) {
                    Some(i) => {
                        sessions.remove(i);
                        Edit::Write(true)
                    }
                    None => Edit::Skip(false),
                }
            })
            .await?;

        if removed {
            info!(account_id = %account_id, session_id = %session_id, "Session removed");
        }
        Ok(removed)
    }

    /// Removes every session except `keep`. Returns the removed count.
    pub async fn remove_others(&self, account_id: Uuid, keep: Uuid) -> AppResult<u32> {
        let removed = self
            .rewrite(account_id, |sessions| {
                let before = sessions.len();
                sessions.retain(|s| s.id == keep);
                let removed = (before - sessions.len()) as u32;
                if removed == 0 {
                    Edit::Skip(0)
                } else {
                    Edit::Write(removed)
                }
            })
            .await?;

        if removed > 0 {
            info!(account_id = %account_id, removed = removed, "Other sessions removed");
        }
        Ok(removed)
    }

    /// Removes every session and clears the legacy slot. Returns the
    /// removed count.
    pub async fn remove_all(&self, account_id: Uuid) -> AppResult<u32> {
        let removed = self
            .rewrite(account_id, |sessions| {
                let removed = sessions.len() as u32;
                sessions.clear();
                // Write even when already empty so the legacy slot clears.
                Edit::Write(removed)
            })
            .await?;

        info!(account_id = %account_id, removed = removed, "All sessions removed");
        Ok(removed)
    }

    /// Removes sessions past their expiry. Idempotent; safe to call
    /// repeatedly or concurrently. Returns the pruned count.
    pub async fn prune_expired(&self, account_id: Uuid) -> AppResult<u32> {
        self.rewrite(account_id, |sessions| {
            let now = Utc::now();
            let before = sessions.len();
            sessions.retain(|s| !s.is_expired_at(now));
            let pruned = (before - sessions.len()) as u32;
            if pruned == 0 {
                Edit::Skip(0)
            } else {
                Edit::Write(pruned)
            }
        })
        .await
    }

    /// Lists sanitized views of the account's live sessions, most recently
    /// used first, flagging the caller's own session when its ID is given.
    /// Listing is a pruning trigger.
    pub async fn list_active(
        &self,
        account_id: Uuid,
        current_session_id: Option<Uuid>,
    ) -> AppResult<Vec<SessionView>> {
        self.prune_expired(account_id).await?;

        let set = self.session_set(account_id).await?;
        let now = Utc::now();
        let mut views: Vec<SessionView> = set
            .sessions
            .iter()
            .filter(|s| !s.is_expired_at(now))
            .map(|s| s.to_view(current_session_id == Some(s.id)))
            .collect();
        views.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        Ok(views)
    }

    /// Clears the legacy single-slot token without touching sessions.
    pub async fn clear_legacy(&self, account_id: Uuid) -> AppResult<()> {
        self.store.clear_legacy_token(account_id).await
    }

    /// Loads the account's session state; an unknown account reads as
    /// empty.
    pub async fn session_set(&self, account_id: Uuid) -> AppResult<SessionSet> {
        Ok(self
            .store
            .load_sessions(account_id)
            .await?
            .unwrap_or_default())
    }

    /// Load-edit-replace loop for structural changes.
    ///
    /// Applies `apply` to a fresh copy of the collection and writes it
    /// back under the revision check, re-deriving the legacy slot from the
    /// newest remaining session. Retries against fresh state when another
    /// writer got there first.
    async fn rewrite<T>(
        &self,
        account_id: Uuid,
        mut apply: impl FnMut(&mut Vec<SessionRecord>) -> Edit<T>,
    ) -> AppResult<T> {
        for _ in 0..self.session_config.write_retry_limit {
            let set = self
                .store
                .load_sessions(account_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))?;

            let mut sessions = set.sessions;
            match apply(&mut sessions) {
                Edit::Skip(value) => return Ok(value),
                Edit::Write(value) => {
                    let legacy = sessions
                        .iter()
                        .max_by_key(|s| s.created_at)
                        .map(|s| s.refresh_token_hash.clone());

                    if self
                        .store
                        .replace_sessions(account_id, set.revision, &sessions, legacy.as_deref())
                        .await?
                    {
                        return Ok(value);
                    }
                    // Lost the race; loop re-reads fresh state.
                }
            }
        }

        Err(AppError::internal(format!(
            "Session collection for account {account_id} stayed contended after {} attempts",
            self.session_config.write_retry_limit
        )))
    }
}
