use super::*;
use crate::domain::ports::UserRepository;
use crate::domain::tokens::AccessClaims;
use crate::domain::{ErrorCode, LoginCredentials};
use crate::test_support::{Harness, TEST_PASSWORD};
use chrono::Duration;
use mockable::Clock;
use rstest::{fixture, rstest};

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

async fn login(harness: &Harness, email: &str) -> String {
    let creds = LoginCredentials::try_from_parts(email, TEST_PASSWORD).expect("shape");
    let outcome = harness.sessions.login(&creds).await.expect("login");
    format!("Bearer {}", outcome.tokens.access_token)
}

#[rstest]
#[case::missing(None)]
#[case::wrong_scheme(Some("Basic abc"))]
#[case::empty(Some("Bearer "))]
#[tokio::test]
async fn require_needs_a_bearer_header(harness: Harness, #[case] header: Option<&str>) {
    let err = harness.guard.require(header).await.expect_err("no bearer");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert_eq!(err.message(), AuthError::MissingBearer.to_string());
}

#[rstest]
#[tokio::test]
async fn garbage_token_is_unauthorized(harness: Harness) {
    let err = harness
        .guard
        .require(Some("Bearer not.a.jwt"))
        .await
        .expect_err("garbage");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn expired_access_token_is_unauthorized(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    let header = login(&harness, "ada@example.com").await;

    harness.clock.advance_seconds(15 * 60);

    let err = harness.guard.require(Some(&header)).await.expect_err("expired");
    assert_eq!(err.message(), AuthError::AccessTokenInvalid.to_string());
}

#[rstest]
#[tokio::test]
async fn admin_tokens_live_longer(harness: Harness) {
    harness.seed_user("root@example.com", Role::Admin, true).await;
    let header = login(&harness, "root@example.com").await;

    harness.clock.advance_seconds(20 * 60);

    let identity = harness.guard.require(Some(&header)).await.expect("still valid");
    assert!(identity.is_admin());
}

#[rstest]
#[tokio::test]
async fn role_comes_from_the_token(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;
    let header = login(&harness, "ada@example.com").await;
    harness
        .store
        .set_role(user.id, Role::Admin, harness.clock.utc())
        .await
        .expect("promote");

    let identity = harness.guard.require(Some(&header)).await.expect("valid");
    assert_eq!(identity.role, Role::User);
}

#[rstest]
#[tokio::test]
async fn roleless_token_resolves_role_from_store(harness: Harness) {
    let user = harness.seed_user("root@example.com", Role::Admin, true).await;
    let token = harness
        .codec
        .issue(
            AccessClaims {
                id: user.id,
                email: user.email.to_string(),
                role: None,
                jti: None,
            },
            Duration::minutes(5),
        )
        .expect("sign");

    let identity = harness
        .guard
        .require(Some(&format!("Bearer {token}")))
        .await
        .expect("resolved");
    assert_eq!(identity.role, Role::Admin);
    assert_eq!(identity.jti, None);
}

#[rstest]
#[tokio::test]
async fn roleless_token_for_deleted_user_is_unauthorized(harness: Harness) {
    let token = harness
        .codec
        .issue(
            AccessClaims {
                id: UserId::random(),
                email: "ghost@example.com".to_owned(),
                role: None,
                jti: None,
            },
            Duration::minutes(5),
        )
        .expect("sign");

    let err = harness
        .guard
        .require(Some(&format!("Bearer {token}")))
        .await
        .expect_err("unknown user");
    assert_eq!(err.message(), AuthError::UnknownIdentity.to_string());
}

#[rstest]
#[tokio::test]
async fn optional_swallows_failures(harness: Harness) {
    assert!(harness.guard.optional(None).await.is_none());
    assert!(harness.guard.optional(Some("Bearer junk")).await.is_none());

    harness.seed_user("ada@example.com", Role::User, true).await;
    let header = login(&harness, "ada@example.com").await;
    assert!(harness.guard.optional(Some(&header)).await.is_some());
}

#[rstest]
#[tokio::test]
async fn require_admin_refuses_users(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    let header = login(&harness, "ada@example.com").await;

    let err = harness
        .guard
        .require_admin(Some(&header))
        .await
        .expect_err("not admin");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn deleted_account_tokens_are_revoked(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;
    let header = login(&harness, "ada@example.com").await;

    UserRepository::delete(&harness.store, user.id)
        .await
        .expect("delete");

    let err = harness.guard.require(Some(&header)).await.expect_err("gone");
    assert_eq!(err.message(), AuthError::TokenRevoked.to_string());
}
