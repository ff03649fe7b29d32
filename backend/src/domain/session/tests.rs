//! Session lifecycle tests against the in-memory credential store.

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::RefreshTokenRepository;
use crate::domain::Role;
use crate::test_support::{Harness, TEST_PASSWORD};
use rstest::{fixture, rstest};

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

fn credentials(email: &str, password: &str) -> LoginCredentials {
    LoginCredentials::try_from_parts(email, password).expect("credential shape")
}

fn bearer(tokens: &TokenPair) -> String {
    format!("Bearer {}", tokens.access_token)
}

#[rstest]
#[tokio::test]
async fn login_issues_a_usable_pair(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;

    let outcome = harness
        .sessions
        .login(&credentials("ADA@example.com ", TEST_PASSWORD))
        .await
        .expect("login");

    assert_eq!(outcome.user.id, user.id);
    let identity = harness
        .guard
        .require(Some(&bearer(&outcome.tokens)))
        .await
        .expect("access token accepted");
    assert_eq!(identity.user_id, user.id);
    let row = harness
        .store
        .find_by_token(&outcome.tokens.refresh_token)
        .await
        .expect("lookup")
        .expect("refresh row stored");
    assert_eq!(Some(row.jti), identity.jti);
}

#[rstest]
#[case::unknown_email("nobody@example.com", TEST_PASSWORD, true, ErrorCode::InvalidRequest)]
#[case::wrong_password("ada@example.com", "Wr0ng$pass", true, ErrorCode::InvalidRequest)]
#[case::unverified("ada@example.com", TEST_PASSWORD, false, ErrorCode::InvalidRequest)]
#[tokio::test]
async fn login_failures_are_bad_requests(
    harness: Harness,
    #[case] email: &str,
    #[case] password: &str,
    #[case] verified: bool,
    #[case] expected: ErrorCode,
) {
    harness.seed_user("ada@example.com", Role::User, verified).await;

    let err = harness
        .sessions
        .login(&credentials(email, password))
        .await
        .expect_err("login refused");
    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn unverified_login_names_the_reason(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, false).await;

    let err = harness
        .sessions
        .login(&credentials("ada@example.com", TEST_PASSWORD))
        .await
        .expect_err("unverified");
    assert_eq!(err.message(), AuthError::EmailNotVerified.to_string());
}

#[rstest]
#[tokio::test]
async fn refresh_token_is_single_use(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    let first = harness
        .sessions
        .login(&credentials("ada@example.com", TEST_PASSWORD))
        .await
        .expect("login")
        .tokens;

    let second = harness
        .sessions
        .refresh(&first.refresh_token)
        .await
        .expect("first refresh");
    assert_ne!(second.refresh_token, first.refresh_token);

    let err = harness
        .sessions
        .refresh(&first.refresh_token)
        .await
        .expect_err("reuse refused");
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    harness
        .sessions
        .refresh(&second.refresh_token)
        .await
        .expect("replacement still valid");
}

#[rstest]
#[tokio::test]
async fn concurrent_refreshes_have_one_winner(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    let tokens = harness
        .sessions
        .login(&credentials("ada@example.com", TEST_PASSWORD))
        .await
        .expect("login")
        .tokens;

    let (a, b) = tokio::join!(
        harness.sessions.refresh(&tokens.refresh_token),
        harness.sessions.refresh(&tokens.refresh_token),
    );

    assert_eq!(
        [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
        1,
        "exactly one refresh succeeds"
    );
}

#[rstest]
#[tokio::test]
async fn refresh_rejects_expired_rows(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    let tokens = harness
        .sessions
        .login(&credentials("ada@example.com", TEST_PASSWORD))
        .await
        .expect("login")
        .tokens;

    harness.clock.advance_seconds(7 * 24 * 3600);

    let err = harness
        .sessions
        .refresh(&tokens.refresh_token)
        .await
        .expect_err("expired");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn refresh_rejects_access_tokens(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    let tokens = harness
        .sessions
        .login(&credentials("ada@example.com", TEST_PASSWORD))
        .await
        .expect("login")
        .tokens;

    let err = harness
        .sessions
        .refresh(&tokens.access_token)
        .await
        .expect_err("wrong token kind");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn logout_cuts_off_the_paired_access_token(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    let tokens = harness
        .sessions
        .login(&credentials("ada@example.com", TEST_PASSWORD))
        .await
        .expect("login")
        .tokens;

    harness
        .sessions
        .logout(Some(&tokens.refresh_token))
        .await
        .expect("logout");

    let err = harness
        .guard
        .require(Some(&bearer(&tokens)))
        .await
        .expect_err("revoked");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert!(harness.sessions.refresh(&tokens.refresh_token).await.is_err());
}

#[rstest]
#[case(None)]
#[case(Some("not-a-token"))]
#[tokio::test]
async fn logout_without_a_known_token_succeeds(harness: Harness, #[case] token: Option<&str>) {
    harness.sessions.logout(token).await.expect("no-op logout");
}

#[rstest]
#[tokio::test]
async fn password_change_ends_every_session(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;
    let creds = credentials("ada@example.com", TEST_PASSWORD);
    let phone = harness.sessions.login(&creds).await.expect("login").tokens;
    let laptop = harness.sessions.login(&creds).await.expect("login").tokens;
    let new_password = NewPassword::parse("N3w$ecret").expect("strong");

    let laptop = harness
        .sessions
        .refresh(&laptop.refresh_token)
        .await
        .expect("refresh works before the change");
    harness
        .guard
        .require(Some(&bearer(&phone)))
        .await
        .expect("access works before the change");

    harness
        .sessions
        .change_password(user.id, TEST_PASSWORD, &new_password)
        .await
        .expect("change");

    for tokens in [&phone, &laptop] {
        let refused = harness
            .sessions
            .refresh(&tokens.refresh_token)
            .await
            .expect_err("refresh token cleared");
        assert_eq!(refused.code(), ErrorCode::Unauthorized);
        assert_eq!(refused.message(), AuthError::InvalidRefreshToken.to_string());

        let revoked = harness
            .guard
            .require(Some(&bearer(tokens)))
            .await
            .expect_err("access token cut off");
        assert_eq!(revoked.code(), ErrorCode::Unauthorized);
    }
    harness
        .sessions
        .login(&credentials("ada@example.com", "N3w$ecret"))
        .await
        .expect("new password works");
}

#[rstest]
#[tokio::test]
async fn password_change_checks_current_password(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;
    let new_password = NewPassword::parse("N3w$ecret").expect("strong");

    let err = harness
        .sessions
        .change_password(user.id, "Wr0ng$pass", &new_password)
        .await
        .expect_err("wrong current password");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn reset_token_works_once(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    let session = harness
        .sessions
        .login(&credentials("ada@example.com", TEST_PASSWORD))
        .await
        .expect("login")
        .tokens;

    harness
        .sessions
        .forgot_password("Ada@Example.com")
        .await
        .expect("reset mail");
    let token = harness
        .mailer
        .last_token_for("ada@example.com")
        .expect("mailed token");
    let new_password = NewPassword::parse("R3set$word").expect("strong");

    harness
        .sessions
        .reset_password(&token, &new_password)
        .await
        .expect("first reset");
    let err = harness
        .sessions
        .reset_password(&token, &new_password)
        .await
        .expect_err("token consumed");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert!(harness.sessions.refresh(&session.refresh_token).await.is_err());
}

#[rstest]
#[tokio::test]
async fn reset_token_expires_after_an_hour(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    harness
        .sessions
        .forgot_password("ada@example.com")
        .await
        .expect("reset mail");
    let token = harness
        .mailer
        .last_token_for("ada@example.com")
        .expect("mailed token");

    harness.clock.advance_seconds(3600);

    let err = harness
        .sessions
        .reset_password(&token, &NewPassword::parse("R3set$word").expect("strong"))
        .await
        .expect_err("expired");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn forgot_password_for_unknown_email_is_not_found(harness: Harness) {
    let err = harness
        .sessions
        .forgot_password("ghost@example.com")
        .await
        .expect_err("unknown");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn forgot_password_mail_failure_is_transient(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    harness.mailer.set_failing(true);

    let err = harness
        .sessions
        .forgot_password("ada@example.com")
        .await
        .expect_err("mail down");
    assert_eq!(err.code(), ErrorCode::TransientFailure);
}

#[rstest]
#[tokio::test]
async fn stored_refresh_row_is_revoked_by_logout(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    let tokens = harness
        .sessions
        .login(&credentials("ada@example.com", TEST_PASSWORD))
        .await
        .expect("login")
        .tokens;

    harness
        .sessions
        .logout(Some(&tokens.refresh_token))
        .await
        .expect("logout");

    let row = harness
        .store
        .find_by_token(&tokens.refresh_token)
        .await
        .expect("lookup")
        .expect("row kept");
    assert!(row.revoked);
}
