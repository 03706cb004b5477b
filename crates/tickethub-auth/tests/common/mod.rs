//! Shared harness for gateway integration tests, running the full stack
//! over the in-memory store.

use std::sync::Arc;

use tickethub_auth::gateway::{AuthenticationGateway, LoginGrant, LoginInput};
use tickethub_auth::password::PasswordHasher;
use tickethub_core::config::auth::AuthConfig;
use tickethub_core::config::session::SessionConfig;
use tickethub_database::store::{MemoryPrincipalStore, PrincipalStore};
use tickethub_entity::account::{Account, AccountStatus};
use uuid::Uuid;

/// Password every seeded account uses.
pub const PASSWORD: &str = "correct horse battery staple";

/// Email of the default seeded account.
pub const EMAIL: &str = "agent@tickethub.test";

pub struct TestHarness {
    pub gateway: AuthenticationGateway,
    pub store: Arc<MemoryPrincipalStore>,
    pub account_id: Uuid,
}

/// Auth configuration used by every test.
pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        ..AuthConfig::default()
    }
}

/// Builds a gateway over a fresh memory store with one active account.
pub async fn harness() -> TestHarness {
    harness_with_status(AccountStatus::Active).await
}

/// Same as [`harness`] but with a chosen status for the seeded account.
pub async fn harness_with_status(status: AccountStatus) -> TestHarness {
    let store = Arc::new(MemoryPrincipalStore::new());
    let hash = PasswordHasher::new().hash_password(PASSWORD).unwrap();
    let account_id = store
        .insert_account(Account::with_status(EMAIL, hash, status))
        .await;

    let dyn_store: Arc<dyn PrincipalStore> = store.clone();
    let gateway = AuthenticationGateway::new(dyn_store, auth_config(), SessionConfig::default());

    TestHarness {
        gateway,
        store,
        account_id,
    }
}

/// A login input from the given device, using the seeded credentials.
pub fn login_from(user_agent: &str, ip_address: &str, remember_me: bool) -> LoginInput {
    LoginInput {
        email: EMAIL.to_string(),
        password: PASSWORD.to_string(),
        remember_me,
        user_agent: Some(user_agent.to_string()),
        ip_address: ip_address.to_string(),
    }
}

impl TestHarness {
    /// Log in from a synthetic device and return the grant.
    pub async fn login_device(&self, label: &str) -> LoginGrant {
        let ua = format!("Mozilla/5.0 (X11; Linux x86_64) TestDevice/{label}");
        self.gateway
            .login(login_from(&ua, "203.0.113.7", false))
            .await
            .unwrap()
    }
}
