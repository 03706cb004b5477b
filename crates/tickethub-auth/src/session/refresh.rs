//! Refresh-token rotation under concurrent duplicate presentation.
//!
//! Rotating a presented token must succeed exactly once. The decisive step
//! is the conditional replace of the stored token from its old value to
//! the new one: of any number of concurrent callers presenting the same
//! token, only the one whose write still observes the old value wins;
//! every other caller gets a conflict, never a second "valid" pair.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_database::store::PrincipalStore;

use crate::token::{TokenService, fingerprint};

use super::manager::SessionManager;

/// Result of a successful rotation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RefreshGrant {
    /// The account the credentials belong to.
    pub account_id: Uuid,
    /// The rotated session, or `None` for the legacy single-slot flow.
    pub session_id: Option<Uuid>,
    /// New short-lived access token.
    pub access_token: String,
    /// New long-lived refresh token.
    pub refresh_token: String,
    /// Access token expiry.
    pub access_expires_at: chrono::DateTime<Utc>,
    /// Refresh token expiry.
    pub refresh_expires_at: chrono::DateTime<Utc>,
}

/// Rotates presented refresh tokens into new credential pairs.
#[derive(Clone)]
pub struct RefreshCoordinator {
    /// Token issuing and verification.
    tokens: Arc<TokenService>,
    /// Session collection access.
    sessions: Arc<SessionManager>,
    /// Account lookup.
    store: Arc<dyn PrincipalStore>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator").finish()
    }
}

impl RefreshCoordinator {
    /// Creates a new refresh coordinator.
    pub fn new(
        tokens: Arc<TokenService>,
        sessions: Arc<SessionManager>,
        store: Arc<dyn PrincipalStore>,
    ) -> Self {
        Self {
            tokens,
            sessions,
            store,
        }
    }

    /// Exchanges a presented refresh token for a new credential pair,
    /// exactly once per token value.
    ///
    /// Failure modes are deliberately distinct: a bad signature or a token
    /// matching nothing is `TOKEN_INVALID`, a well-signed but stale token
    /// is `TOKEN_EXPIRED`, and losing a rotation race — concurrently, or
    /// by presenting a value a newer rotation already superseded while its
    /// session lives on — is `TOKEN_CONFLICT` (the only retryable one).
    pub async fn rotate(&self, presented: &str) -> AppResult<RefreshGrant> {
        let claims = self.tokens.verify_refresh(presented)?;

        let account = self
            .store
            .find_by_id(claims.account_id())
            .await?
            .ok_or_else(|| AppError::token_invalid("Refresh token does not match an account"))?;

        if let Some(reason) = account.status.reason_code() {
            return Err(AppError::account_state(format!(
                "Account is not active: {reason}"
            )));
        }

        let set = self.sessions.session_set(account.id).await?;
        let presented_hash = fingerprint(presented);
        let now = Utc::now();

        // Session-bound flow: match the stored token value, never the sid
        // claim alone — a superseded token must not resolve to a session.
        if let Some(session) = set
            .sessions
            .iter()
            .find(|s| s.refresh_token_hash == presented_hash && !s.is_expired_at(now))
        {
            let pair = self
                .tokens
                .issue(account.id, Some(session.id), session.remember_me)?;
            let replacement_hash = fingerprint(&pair.refresh_token);

            if self
                .sessions
                .swap_refresh_token(account.id, session.id, &presented_hash, &replacement_hash)
                .await?
            {
                info!(
                    account_id = %account.id,
                    session_id = %session.id,
                    "Refresh token rotated"
                );
                return Ok(RefreshGrant {
                    account_id: account.id,
                    session_id: Some(session.id),
                    access_token: pair.access_token,
                    refresh_token: pair.refresh_token,
                    access_expires_at: pair.access_expires_at,
                    refresh_expires_at: pair.refresh_expires_at,
                });
            }

            warn!(
                account_id = %account.id,
                session_id = %session.id,
                "Lost refresh rotation race"
            );
            return Err(AppError::token_conflict(
                "Refresh token was already rotated by a concurrent request",
            ));
        }

        // The presented value matches no stored token, but its session is
        // still alive: a newer rotation already superseded it. That is a
        // lost race, not a dead token, and the caller may retry with its
        // last-known-good token.
        if let Some(sid) = claims.session_id() {
            if set
                .sessions
                .iter()
                .any(|s| s.id == sid && !s.is_expired_at(now))
            {
                warn!(
                    account_id = %account.id,
                    session_id = %sid,
                    "Presented refresh token was superseded by a newer rotation"
                );
                return Err(AppError::token_conflict(
                    "Refresh token was superseded by a newer rotation",
                ));
            }
        }

        // Back-compat flow for clients that never adopted sessions. Only
        // tokens issued without a session claim may use the legacy slot.
        if claims.session_id().is_none()
            && set.legacy_token.as_deref() == Some(presented_hash.as_str())
        {
            let pair = self.tokens.issue(account.id, None, claims.remember_me)?;
            let replacement_hash = fingerprint(&pair.refresh_token);

            if self
                .sessions
                .swap_legacy_token(account.id, &presented_hash, &replacement_hash)
                .await?
            {
                info!(account_id = %account.id, "Legacy refresh token rotated");
                return Ok(RefreshGrant {
                    account_id: account.id,
                    session_id: None,
                    access_token: pair.access_token,
                    refresh_token: pair.refresh_token,
                    access_expires_at: pair.access_expires_at,
                    refresh_expires_at: pair.refresh_expires_at,
                });
            }

            warn!(account_id = %account.id, "Lost legacy refresh rotation race");
            return Err(AppError::token_conflict(
                "Refresh token was already rotated by a concurrent request",
            ));
        }

        Err(AppError::token_invalid(
            "Refresh token was superseded or revoked",
        ))
    }
}
