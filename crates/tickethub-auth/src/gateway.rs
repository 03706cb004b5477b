//! Login, logout, refresh, and self-service session listing.
//!
//! The surface consumed by the HTTP/controller layer. Takes and returns
//! plain data; no transport concerns live here.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use tickethub_core::config::auth::AuthConfig;
use tickethub_core::config::session::SessionConfig;
use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_database::store::PrincipalStore;
use tickethub_entity::session::SessionView;

use crate::password::PasswordHasher;
use crate::session::manager::SessionManager;
use crate::session::refresh::{RefreshCoordinator, RefreshGrant};
use crate::token::TokenService;

/// Login request payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginInput {
    /// Login email.
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    /// Plaintext password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Whether to keep the session for the long lifetime.
    #[serde(default)]
    pub remember_me: bool,
    /// Raw User-Agent header, when the client sent one.
    pub user_agent: Option<String>,
    /// Caller IP address as seen by the transport layer.
    #[validate(length(min = 1, message = "Client IP address is required"))]
    pub ip_address: String,
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginGrant {
    /// The authenticated account.
    pub account_id: Uuid,
    /// The session created for this device.
    pub session_id: Uuid,
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Access token expiry.
    pub access_expires_at: chrono::DateTime<Utc>,
    /// Refresh token expiry.
    pub refresh_expires_at: chrono::DateTime<Utc>,
}

/// Logout request payload.
///
/// `all_devices` removes every session and clears the legacy slot; a
/// `session_id` removes that one session; neither clears only the legacy
/// single-slot field, the pre-session logout behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// The session to remove.
    pub session_id: Option<Uuid>,
    /// Remove every session for the account.
    #[serde(default)]
    pub all_devices: bool,
}

/// Orchestrates the authentication surface over the session core.
#[derive(Clone)]
pub struct AuthenticationGateway {
    /// Account lookup and persistence.
    store: Arc<dyn PrincipalStore>,
    /// Token issuing and verification.
    tokens: Arc<TokenService>,
    /// Session collection management.
    sessions: Arc<SessionManager>,
    /// Rotation coordination.
    coordinator: RefreshCoordinator,
    /// Password verification.
    hasher: Arc<PasswordHasher>,
}

impl std::fmt::Debug for AuthenticationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationGateway").finish()
    }
}

impl AuthenticationGateway {
    /// Wires the gateway and its collaborators over the given store.
    pub fn new(
        store: Arc<dyn PrincipalStore>,
        auth_config: AuthConfig,
        session_config: SessionConfig,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(&auth_config));
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            auth_config,
            session_config,
        ));
        let coordinator =
            RefreshCoordinator::new(tokens.clone(), sessions.clone(), store.clone());

        Self {
            store,
            tokens,
            sessions,
            coordinator,
            hasher: Arc::new(PasswordHasher::new()),
        }
    }

    /// Authenticates a client and opens a new device session.
    ///
    /// The failure message never reveals whether the email exists; an
    /// account that is not yet verified and approved fails with a reason
    /// code instead of credentials.
    pub async fn login(&self, input: LoginInput) -> AppResult<LoginGrant> {
        input
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let account = self
            .store
            .find_by_email(&input.email)
            .await?
            .ok_or_else(AppError::credential_invalid)?;

        if !self
            .hasher
            .verify_password(&input.password, &account.password_hash)?
        {
            return Err(AppError::credential_invalid());
        }

        if let Some(reason) = account.status.reason_code() {
            return Err(AppError::account_state(format!(
                "Account is not active: {reason}"
            )));
        }

        // Login is a pruning trigger.
        self.sessions.prune_expired(account.id).await?;

        let session_id = Uuid::new_v4();
        let pair = self
            .tokens
            .issue(account.id, Some(session_id), input.remember_me)?;

        let record = self.sessions.create(
            account.id,
            session_id,
            &pair.refresh_token,
            input.remember_me,
            input.user_agent.as_deref(),
            &input.ip_address,
        );
        self.sessions.attach(record).await?;

        self.store.update_last_login(account.id, Utc::now()).await?;

        info!(
            account_id = %account.id,
            session_id = %session_id,
            remember_me = input.remember_me,
            "Login successful"
        );

        Ok(LoginGrant {
            account_id: account.id,
            session_id,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            access_expires_at: pair.access_expires_at,
            refresh_expires_at: pair.refresh_expires_at,
        })
    }

    /// Ends one session, every session, or only the legacy single slot.
    /// Returns the number of sessions removed.
    pub async fn logout(&self, account_id: Uuid, request: LogoutRequest) -> AppResult<u32> {
        if request.all_devices {
            let removed = self.sessions.remove_all(account_id).await?;
            info!(account_id = %account_id, removed = removed, "Logged out of all devices");
            return Ok(removed);
        }

        if let Some(session_id) = request.session_id {
            let removed = self.sessions.remove(account_id, session_id).await?;
            return Ok(removed as u32);
        }

        // Back-compat single-session logout: only the legacy slot clears,
        // per-device sessions stay untouched.
        self.sessions.clear_legacy(account_id).await?;
        info!(account_id = %account_id, "Legacy single-slot logout");
        Ok(0)
    }

    /// Exchanges a refresh token for a new credential pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<RefreshGrant> {
        self.coordinator.rotate(refresh_token).await
    }

    /// Lists the account's live sessions as sanitized views, flagging the
    /// caller's own session when its ID is supplied.
    pub async fn list_sessions(
        &self,
        account_id: Uuid,
        current_session_id: Option<Uuid>,
    ) -> AppResult<Vec<SessionView>> {
        self.sessions.list_active(account_id, current_session_id).await
    }

    /// Revokes one session on behalf of its owner.
    pub async fn revoke_session(&self, account_id: Uuid, session_id: Uuid) -> AppResult<()> {
        if !self.sessions.remove(account_id, session_id).await? {
            return Err(AppError::not_found(format!(
                "Session {session_id} not found"
            )));
        }
        Ok(())
    }

    /// The session manager, for collaborators that operate below the
    /// gateway surface.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// The token service, for the excluded HTTP layer's request
    /// authentication middleware.
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// The password hasher, for seeding and account-creation flows.
    pub fn hasher(&self) -> &Arc<PasswordHasher> {
        &self.hasher
    }
}
