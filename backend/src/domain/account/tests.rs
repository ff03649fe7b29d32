use super::*;
use crate::domain::ports::UserRepository;
use crate::domain::{ErrorCode, LoginCredentials};
use crate::test_support::{Harness, TEST_PASSWORD};
use rstest::{fixture, rstest};

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

fn registration(email: &str) -> Registration {
    Registration::try_new(email, TEST_PASSWORD, "ada", "LOVELACE").expect("valid registration")
}

fn google(subject: &str, email: &str, verified: bool) -> GoogleProfile {
    GoogleProfile {
        subject: subject.to_owned(),
        email: email.to_owned(),
        email_verified: verified,
        given_name: Some("grace".to_owned()),
        family_name: Some("HOPPER".to_owned()),
    }
}

#[rstest]
#[tokio::test]
async fn registration_creates_an_unverified_account_and_mails_a_link(harness: Harness) {
    let user = harness
        .accounts
        .register(registration("Ada@Example.com"))
        .await
        .expect("register");

    assert_eq!(user.email, "ada@example.com");
    assert!(user.email_verified_at.is_none());
    assert_eq!(user.profile.first_name, "Ada");
    let sent = harness.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html.contains("http://api.test/auth/verify-email?token="));
}

#[rstest]
#[tokio::test]
async fn duplicate_registration_is_rejected(harness: Harness) {
    harness
        .accounts
        .register(registration("ada@example.com"))
        .await
        .expect("first");

    let err = harness
        .accounts
        .register(registration("ADA@example.com"))
        .await
        .expect_err("duplicate");
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
}

#[rstest]
#[tokio::test]
async fn registration_survives_mail_failure(harness: Harness) {
    harness.mailer.set_failing(true);

    harness
        .accounts
        .register(registration("ada@example.com"))
        .await
        .expect("account created anyway");
}

#[rstest]
#[tokio::test]
async fn verification_enables_login_and_only_works_once(harness: Harness) {
    harness
        .accounts
        .register(registration("ada@example.com"))
        .await
        .expect("register");
    let token = harness
        .mailer
        .last_token_for("ada@example.com")
        .expect("verification token");

    harness.accounts.verify_email(&token).await.expect("verify");
    let err = harness
        .accounts
        .verify_email(&token)
        .await
        .expect_err("already verified");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);

    let creds = LoginCredentials::try_from_parts("ada@example.com", TEST_PASSWORD).expect("shape");
    harness.sessions.login(&creds).await.expect("login after verify");
}

#[rstest]
#[tokio::test]
async fn verification_rejects_other_token_kinds(harness: Harness) {
    harness.seed_user("ada@example.com", Role::User, true).await;
    harness
        .sessions
        .forgot_password("ada@example.com")
        .await
        .expect("reset mail");
    let reset = harness
        .mailer
        .last_token_for("ada@example.com")
        .expect("reset token");

    let err = harness
        .accounts
        .verify_email(&reset)
        .await
        .expect_err("wrong purpose");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn profile_update_is_partial(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;

    let updated = harness
        .accounts
        .update_profile(
            user.id,
            &ProfileUpdate {
                last_name: Some("byron".to_owned()),
                contact_phone: Some(" +41 79 000 00 00 ".to_owned()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.profile.first_name, "Test");
    assert_eq!(updated.profile.last_name, "Byron");
    assert_eq!(updated.profile.contact_phone.as_deref(), Some("+41 79 000 00 00"));
}

#[rstest]
#[tokio::test]
async fn profile_update_validates_names(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;

    let err = harness
        .accounts
        .update_profile(
            user.id,
            &ProfileUpdate {
                first_name: Some("A".to_owned()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .expect_err("too short");
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
}

#[rstest]
#[tokio::test]
async fn email_change_round_trip(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;
    let new_email = Email::parse("ada@new.example").expect("email");

    harness
        .accounts
        .request_email_change(user.id, &new_email)
        .await
        .expect("request");
    let token = harness
        .mailer
        .last_token_for("ada@new.example")
        .expect("confirmation mailed to the new address");

    harness
        .accounts
        .confirm_email_change(&token)
        .await
        .expect("confirm");
    let me = harness.accounts.me(user.id).await.expect("me");
    assert_eq!(me.email, "ada@new.example");

    let err = harness
        .accounts
        .confirm_email_change(&token)
        .await
        .expect_err("single use");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn email_change_to_a_taken_address_is_refused(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;
    harness.seed_user("grace@example.com", Role::User, true).await;
    let taken = Email::parse("grace@example.com").expect("email");

    let err = harness
        .accounts
        .request_email_change(user.id, &taken)
        .await
        .expect_err("taken");
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
}

#[rstest]
#[tokio::test]
async fn email_change_to_own_address_is_a_bad_request(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;

    let err = harness
        .accounts
        .request_email_change(user.id, &user.email)
        .await
        .expect_err("same address");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn google_sign_in_creates_then_reuses_the_account(harness: Harness) {
    harness
        .oauth
        .accept("id-token", google("g-123", "Grace@Example.com", true));

    let first = harness
        .accounts
        .google_sign_in("id-token")
        .await
        .expect("first sign-in");
    assert_eq!(first.user.profile.first_name, "Grace");
    assert_eq!(first.user.profile.last_name, "Hopper");
    assert_eq!(first.user.oauth_provider.as_deref(), Some(GOOGLE_PROVIDER));
    assert!(first.user.email_verified_at.is_some());

    let second = harness
        .accounts
        .google_sign_in("id-token")
        .await
        .expect("second sign-in");
    assert_eq!(second.user.id, first.user.id);
    harness
        .guard
        .require(Some(&format!("Bearer {}", second.tokens.access_token)))
        .await
        .expect("usable access token");
}

#[rstest]
#[tokio::test]
async fn google_sign_in_never_merges_password_accounts(harness: Harness) {
    harness.seed_user("grace@example.com", Role::User, true).await;
    harness
        .oauth
        .accept("id-token", google("g-123", "grace@example.com", true));

    let err = harness
        .accounts
        .google_sign_in("id-token")
        .await
        .expect_err("collision");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn rejected_google_token_is_unauthorized(harness: Harness) {
    let err = harness
        .accounts
        .google_sign_in("forged")
        .await
        .expect_err("rejected");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn google_accounts_cannot_reset_passwords(harness: Harness) {
    harness
        .oauth
        .accept("id-token", google("g-123", "grace@example.com", true));
    harness
        .accounts
        .google_sign_in("id-token")
        .await
        .expect("sign-in");

    let err = harness
        .sessions
        .forgot_password("grace@example.com")
        .await
        .expect_err("no password");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn deleting_the_account_removes_it(harness: Harness) {
    let user = harness.seed_user("ada@example.com", Role::User, true).await;

    harness
        .accounts
        .delete_account(user.id)
        .await
        .expect("delete");

    assert!(
        UserRepository::find_by_id(&harness.store, user.id)
            .await
            .expect("lookup")
            .is_none()
    );
    let err = harness.accounts.me(user.id).await.expect_err("gone");
    assert_eq!(err.code(), ErrorCode::NotFound);
}
