//! PostgreSQL implementation of the principal store.
//!
//! Conditional writes are expressed as `UPDATE ... WHERE <expected prior
//! value>` statements; a zero `rows_affected` means the caller lost the
//! race. Multi-statement operations run inside a transaction so the
//! revision check and the dependent writes commit as one unit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tickethub_core::error::{AppError, ErrorKind};
use tickethub_core::result::AppResult;
use tickethub_entity::account::Account;
use tickethub_entity::session::{SessionRecord, SessionSet};

use super::PrincipalStore;

/// Principal store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    /// Create a new store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find account by id", e)
            })
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find account by email", e)
            })
    }

    async fn load_sessions(&self, account_id: Uuid) -> AppResult<Option<SessionSet>> {
        let head: Option<(i64, Option<String>)> = sqlx::query_as(
            "SELECT session_revision, current_refresh_token FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load session revision", e)
        })?;

        let Some((revision, legacy_token)) = head else {
            return Ok(None);
        };

        let sessions = sqlx::query_as::<_, SessionRecord>(
            "SELECT * FROM sessions WHERE account_id = $1 ORDER BY created_at ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load sessions", e))?;

        Ok(Some(SessionSet {
            revision,
            sessions,
            legacy_token,
        }))
    }

    async fn replace_sessions(
        &self,
        account_id: Uuid,
        expected_revision: i64,
        sessions: &[SessionRecord],
        legacy_token: Option<&str>,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let claimed = sqlx::query(
            "UPDATE accounts SET session_revision = session_revision + 1, \
                                 current_refresh_token = $3, \
                                 updated_at = NOW() \
             WHERE id = $1 AND session_revision = $2",
        )
        .bind(account_id)
        .bind(expected_revision)
        .bind(legacy_token)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to advance session revision", e)
        })?;

        if claimed.rows_affected() == 0 {
            // Stale revision; the transaction rolls back on drop.
            return Ok(false);
        }

        sqlx::query("DELETE FROM sessions WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to clear sessions", e)
            })?;

        for session in sessions {
            sqlx::query(
                "INSERT INTO sessions (id, account_id, refresh_token_hash, user_agent, browser, \
                                       os, device, ip_address, remember_me, created_at, \
                                       last_used_at, expires_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(session.id)
            .bind(session.account_id)
            .bind(&session.refresh_token_hash)
            .bind(&session.device.user_agent)
            .bind(&session.device.browser)
            .bind(&session.device.os)
            .bind(&session.device.device)
            .bind(&session.device.ip_address)
            .bind(session.remember_me)
            .bind(session.created_at)
            .bind(session.last_used_at)
            .bind(session.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert session", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit session replacement", e)
        })?;

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
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let swapped = sqlx::query(
            "UPDATE sessions SET refresh_token_hash = $4, last_used_at = $5 \
             WHERE account_id = $1 AND id = $2 AND refresh_token_hash = $3",
        )
        .bind(account_id)
        .bind(session_id)
        .bind(current_hash)
        .bind(replacement_hash)
        .bind(used_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to rotate session token", e)
        })?;

        if swapped.rows_affected() == 0 {
            return Ok(false);
        }

        // Keep the legacy slot consistent when it mirrored the old value.
        sqlx::query(
            "UPDATE accounts SET current_refresh_token = $3 \
             WHERE id = $1 AND current_refresh_token = $2",
        )
        .bind(account_id)
        .bind(current_hash)
        .bind(replacement_hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update legacy slot", e)
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit token rotation", e)
        })?;

        Ok(true)
    }

    async fn swap_legacy_token(
        &self,
        account_id: Uuid,
        current_hash: &str,
        replacement_hash: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET current_refresh_token = $3, updated_at = NOW() \
             WHERE id = $1 AND current_refresh_token = $2",
        )
        .bind(account_id)
        .bind(current_hash)
        .bind(replacement_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to rotate legacy token", e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_legacy_token(&self, account_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE accounts SET current_refresh_token = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to clear legacy token", e)
        })?;
        Ok(())
    }

    async fn update_last_login(&self, account_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE accounts SET last_login_at = $2, updated_at = NOW() WHERE id = $1")
            .bind(account_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update last login", e)
            })?;
        Ok(())
    }
}
