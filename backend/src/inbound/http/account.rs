//! Self-service account endpoints.
//!
//! ```text
//! GET    /auth/me
//! PUT    /auth/me                  {"firstName","lastName","contactEmail","contactPhone"}
//! DELETE /auth/me
//! POST   /auth/change-email        {"email"}
//! GET    /auth/confirm-email-change?token=
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};

use crate::domain::{Email, ProfileUpdate};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{EmailRequest, TokenQuery};
use crate::inbound::http::identity::Authenticated;
use crate::inbound::http::responses::{MessageResponse, UserResponse};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, required};

/// Partial profile update; omitted fields stay as they are and blank contact
/// fields clear the stored value.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl From<ProfileRequest> for ProfileUpdate {
    fn from(value: ProfileRequest) -> Self {
        Self {
            first_name: value.first_name,
            last_name: value.last_name,
            contact_email: value.contact_email,
            contact_phone: value.contact_phone,
        }
    }
}

#[get("/auth/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    caller: Authenticated,
) -> ApiResult<web::Json<UserResponse>> {
    let user = state.accounts.me(caller.0.user_id).await?;
    Ok(web::Json(UserResponse { user }))
}

#[put("/auth/me")]
pub async fn update_profile(
    state: web::Data<HttpState>,
    caller: Authenticated,
    payload: web::Json<ProfileRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let update = ProfileUpdate::from(payload.into_inner());
    let user = state
        .accounts
        .update_profile(caller.0.user_id, &update)
        .await?;
    Ok(web::Json(UserResponse { user }))
}

/// Deletes the account with its placemarks and reviews and drops the
/// refresh cookie.
#[delete("/auth/me")]
pub async fn delete_account(
    state: web::Data<HttpState>,
    caller: Authenticated,
) -> ApiResult<HttpResponse> {
    state.accounts.delete_account(caller.0.user_id).await?;
    Ok(HttpResponse::Ok()
        .cookie(state.refresh_cookie.clear())
        .json(MessageResponse::new("Account deleted successfully")))
}

#[post("/auth/change-email")]
pub async fn request_email_change(
    state: web::Data<HttpState>,
    caller: Authenticated,
    payload: web::Json<EmailRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    let email = Email::parse(&payload.email)?;
    state
        .accounts
        .request_email_change(caller.0.user_id, &email)
        .await?;
    Ok(web::Json(MessageResponse::new(
        "Verification email sent to the new address.",
    )))
}

#[get("/auth/confirm-email-change")]
pub async fn confirm_email_change(
    state: web::Data<HttpState>,
    query: web::Query<TokenQuery>,
) -> ApiResult<web::Json<MessageResponse>> {
    let token = required(query.into_inner().token, FieldName::new("token"))?;
    state.accounts.confirm_email_change(&token).await?;
    Ok(web::Json(MessageResponse::new("Email updated successfully.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::test;
    use serde_json::{Value, json};

    use crate::domain::Role;
    use crate::inbound::http::test_utils::test_app;
    use crate::test_support::Harness;

    const EMAIL: &str = "ada@example.com";

    #[actix_web::test]
    async fn me_requires_a_bearer() {
        let harness = Harness::new();
        let app = test::init_service(test_app(harness.http_state())).await;
        let res =
            test::call_service(&app, test::TestRequest::get().uri("/auth/me").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn profile_updates_are_partial() {
        let harness = Harness::new();
        harness.seed_user(EMAIL, Role::User, true).await;
        let bearer = harness.bearer_for(EMAIL).await;
        let app = test::init_service(test_app(harness.http_state())).await;

        let res = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/auth/me")
                .insert_header((AUTHORIZATION, bearer.clone()))
                .set_json(json!({ "lastName": "lovelace", "contactPhone": "+41 79 000 00 00" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["user"]["profile"]["firstName"], "Test");
        assert_eq!(body["user"]["profile"]["lastName"], "Lovelace");
        assert_eq!(body["user"]["profile"]["contactPhone"], "+41 79 000 00 00");

        let invalid = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/auth/me")
                .insert_header((AUTHORIZATION, bearer))
                .set_json(json!({ "firstName": "A" }))
                .to_request(),
        )
        .await;
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn deleting_the_account_ends_access() {
        let harness = Harness::new();
        harness.seed_user(EMAIL, Role::User, true).await;
        let bearer = harness.bearer_for(EMAIL).await;
        let app = test::init_service(test_app(harness.http_state())).await;

        let res = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri("/auth/me")
                .insert_header((AUTHORIZATION, bearer.clone()))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let me = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/auth/me")
                .insert_header((AUTHORIZATION, bearer))
                .to_request(),
        )
        .await;
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn email_change_is_confirmed_through_the_mailed_link() {
        let harness = Harness::new();
        harness.seed_user(EMAIL, Role::User, true).await;
        harness
            .seed_user("taken@example.com", Role::User, true)
            .await;
        let bearer = harness.bearer_for(EMAIL).await;
        let app = test::init_service(test_app(harness.http_state())).await;

        let taken = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/change-email")
                .insert_header((AUTHORIZATION, bearer.clone()))
                .set_json(json!({ "email": "taken@example.com" }))
                .to_request(),
        )
        .await;
        assert_eq!(taken.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let requested = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/change-email")
                .insert_header((AUTHORIZATION, bearer.clone()))
                .set_json(json!({ "email": "ada.l@example.com" }))
                .to_request(),
        )
        .await;
        assert_eq!(requested.status(), StatusCode::OK);
        let token = harness
            .mailer
            .last_token_for("ada.l@example.com")
            .expect("change token");

        let uri = format!("/auth/confirm-email-change?token={token}");
        let confirmed =
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(confirmed.status(), StatusCode::OK);
        let replayed =
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(replayed.status(), StatusCode::BAD_REQUEST);

        let me = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/auth/me")
                .insert_header((AUTHORIZATION, bearer))
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(me).await;
        assert_eq!(body["user"]["email"], "ada.l@example.com");
    }
}
