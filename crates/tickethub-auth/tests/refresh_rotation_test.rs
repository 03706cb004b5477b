//! Integration tests for exactly-once refresh-token rotation.

mod common;

use chrono::{Duration, Utc};
use common::{auth_config, harness, login_from};
use tickethub_auth::token::{TokenService, fingerprint};
use tickethub_core::error::ErrorKind;
use tickethub_entity::session::{DeviceInfo, SessionRecord};
use uuid::Uuid;

#[tokio::test]
async fn test_sequential_rotation_chains() {
    let h = harness().await;
    let grant = h.login_device("tab").await;

    let first = h.gateway.refresh(&grant.refresh_token).await.unwrap();
    assert_eq!(first.session_id, Some(grant.session_id));
    assert_ne!(first.refresh_token, grant.refresh_token);

    // The first rotation's output is the new valid token.
    let second = h.gateway.refresh(&first.refresh_token).await.unwrap();
    assert_eq!(second.session_id, Some(grant.session_id));
}

#[tokio::test]
async fn test_superseded_token_reuse_is_a_conflict() {
    let h = harness().await;
    let grant = h.login_device("tab").await;

    h.gateway.refresh(&grant.refresh_token).await.unwrap();

    // The original token was rotated away while its session lives on:
    // a conflict, distinct from expiry and from a token that never
    // existed.
    let err = h.gateway.refresh(&grant.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenConflict);
    assert!(err.kind.is_retryable());
}

#[tokio::test]
async fn test_concurrent_duplicate_rotation_succeeds_exactly_once() {
    let h = harness().await;
    let grant = h.login_device("twin-tabs").await;

    let (left, right) = tokio::join!(
        h.gateway.refresh(&grant.refresh_token),
        h.gateway.refresh(&grant.refresh_token),
    );

    let outcomes = [left, right];
    let winners: Vec<_> = outcomes.iter().filter(|r| r.is_ok()).collect();
    let losers: Vec<_> = outcomes.iter().filter(|r| r.is_err()).collect();

    assert_eq!(winners.len(), 1, "exactly one rotation may succeed");
    assert_eq!(losers.len(), 1);
    assert_eq!(
        losers[0].as_ref().unwrap_err().kind,
        ErrorKind::TokenConflict
    );

    // The winner's token is the only one that rotates further.
    let winner_token = winners[0].as_ref().unwrap().refresh_token.clone();
    h.gateway.refresh(&winner_token).await.unwrap();
}

#[tokio::test]
async fn test_find_by_token_tracks_the_current_value() {
    let h = harness().await;
    let grant = h.login_device("tab").await;
    let sessions = h.gateway.sessions();

    let found = sessions
        .find_by_token(h.account_id, &grant.refresh_token)
        .await
        .unwrap()
        .expect("fresh token must resolve its session");
    assert_eq!(found.id, grant.session_id);

    let rotated = h.gateway.refresh(&grant.refresh_token).await.unwrap();

    // The superseded value no longer matches; the rotated one does.
    assert!(
        sessions
            .find_by_token(h.account_id, &grant.refresh_token)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        sessions
            .find_by_token(h.account_id, &rotated.refresh_token)
            .await
            .unwrap()
            .is_some()
    );

    let by_id = sessions
        .find_by_id(h.account_id, grant.session_id)
        .await
        .unwrap()
        .expect("session is still live");
    assert_eq!(by_id.id, grant.session_id);
}

#[tokio::test]
async fn test_garbage_token_is_invalid() {
    let h = harness().await;

    let err = h.gateway.refresh("not-a-jwt").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenInvalid);
}

#[tokio::test]
async fn test_lifetime_follows_remember_me() {
    let h = harness().await;

    let remembered = h
        .gateway
        .login(login_from("Mozilla/5.0", "203.0.113.7", true))
        .await
        .unwrap();
    let standard = h
        .gateway
        .login(login_from("Mozilla/5.0", "203.0.113.7", false))
        .await
        .unwrap();

    let now = Utc::now();
    let long = remembered.refresh_expires_at - now;
    let short = standard.refresh_expires_at - now;

    assert!(long > Duration::days(29) && long <= Duration::days(30));
    assert!(short > Duration::hours(23) && short <= Duration::days(1));
}

#[tokio::test]
async fn test_rotation_preserves_remember_me_window() {
    let h = harness().await;
    let grant = h
        .gateway
        .login(login_from("Mozilla/5.0", "203.0.113.7", true))
        .await
        .unwrap();

    let rotated = h.gateway.refresh(&grant.refresh_token).await.unwrap();
    let window = rotated.refresh_expires_at - Utc::now();
    assert!(window > Duration::days(29), "remember-me window must carry over");
}

#[tokio::test]
async fn test_refresh_after_full_logout_never_succeeds() {
    let h = harness().await;
    let grant = h.login_device("doomed").await;
    let rotated = h.gateway.refresh(&grant.refresh_token).await.unwrap();

    h.gateway
        .sessions()
        .remove_all(h.account_id)
        .await
        .unwrap();

    for token in [&grant.refresh_token, &rotated.refresh_token] {
        let err = h.gateway.refresh(token).await.unwrap_err();
        assert!(
            err.kind == ErrorKind::TokenInvalid || err.kind == ErrorKind::TokenExpired,
            "expected invalid/expired after full logout, got {}",
            err.kind
        );
    }
}

#[tokio::test]
async fn test_expired_session_is_invisible_and_unrefreshable() {
    let h = harness().await;

    // A session whose window closed an hour ago, holding a token that is
    // itself still well-signed and unexpired.
    let tokens = TokenService::new(&auth_config());
    let session_id = Uuid::new_v4();
    let pair = tokens.issue(h.account_id, Some(session_id), false).unwrap();
    let record = SessionRecord::new(
        session_id,
        h.account_id,
        fingerprint(&pair.refresh_token),
        DeviceInfo {
            user_agent: "Mozilla/5.0".to_string(),
            browser: None,
            os: None,
            device: None,
            ip_address: "203.0.113.7".to_string(),
        },
        false,
        Utc::now() - Duration::days(1) - Duration::hours(1),
        Duration::days(1),
    );
    h.store.insert_session(record).await;

    let views = h.gateway.list_sessions(h.account_id, None).await.unwrap();
    assert!(views.is_empty());

    let err = h.gateway.refresh(&pair.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenInvalid);
}

#[tokio::test]
async fn test_legacy_single_slot_flow() {
    let h = harness().await;

    // A pre-session client still holds a bare refresh token in the
    // account's single slot.
    let tokens = TokenService::new(&auth_config());
    let pair = tokens.issue(h.account_id, None, false).unwrap();
    h.store
        .set_legacy_token(h.account_id, fingerprint(&pair.refresh_token))
        .await;

    let rotated = h.gateway.refresh(&pair.refresh_token).await.unwrap();
    assert_eq!(rotated.session_id, None);

    // The slot now holds the rotated value; the old token matches nothing.
    let err = h.gateway.refresh(&pair.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenInvalid);

    // And the rotated legacy token keeps working.
    let again = h.gateway.refresh(&rotated.refresh_token).await.unwrap();
    assert_eq!(again.session_id, None);
}
