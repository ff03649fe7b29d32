//! Session and credential endpoints.
//!
//! ```text
//! POST /auth/register         {"email","password","firstName","lastName"}
//! POST /auth/login            {"email","password"}
//! POST /auth/refresh          refresh_token cookie
//! POST /auth/logout           Bearer + refresh_token cookie
//! POST /auth/change-password  {"oldPassword","newPassword"}
//! POST /auth/forgot-password  {"email"}
//! POST /auth/reset-password   {"token","password"}
//! GET  /auth/verify-email?token=
//! POST /auth/google           {"token"}
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuthError, Email, LoginCredentials, LoginOutcome, LoginValidationError, NewPassword,
    Registration,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cookies::presented_refresh_token;
use crate::inbound::http::identity::Authenticated;
use crate::inbound::http::responses::{MessageResponse, SessionResponse, UserResponse};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, required};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.email, &value.password)
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// `?token=` on the links sent by mail.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GoogleSignInRequest {
    pub token: Option<String>,
}

/// Body plus rotated cookie for a freshly started session.
fn session_started(state: &HttpState, outcome: LoginOutcome) -> HttpResponse {
    let LoginOutcome { user, tokens } = outcome;
    HttpResponse::Ok()
        .cookie(state.refresh_cookie.issue(&tokens.refresh_token))
        .json(SessionResponse {
            user,
            access_token: tokens.access_token,
        })
}

#[post("/auth/register")]
pub async fn register(
    req: HttpRequest,
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    state.limits.auth.check_request(&req)?;
    let RegisterRequest {
        email,
        password,
        first_name,
        last_name,
    } = payload.into_inner();
    let registration = Registration::try_new(&email, &password, &first_name, &last_name)?;
    let user = state.accounts.register(registration).await?;
    Ok(HttpResponse::Created().json(UserResponse { user }))
}

#[post("/auth/login")]
pub async fn login(
    req: HttpRequest,
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    state.limits.auth.check_request(&req)?;
    let credentials = LoginCredentials::try_from(payload.into_inner())?;
    let outcome = state.sessions.login(&credentials).await?;
    Ok(session_started(&state, outcome))
}

#[post("/auth/refresh")]
pub async fn refresh(req: HttpRequest, state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let presented = presented_refresh_token(&req).ok_or(AuthError::InvalidRefreshToken)?;
    let tokens = state.sessions.refresh(&presented).await?;
    Ok(HttpResponse::Ok()
        .cookie(state.refresh_cookie.issue(&tokens.refresh_token))
        .json(tokens))
}

/// Always succeeds for an authenticated caller, with or without a cookie.
#[post("/auth/logout")]
pub async fn logout(
    req: HttpRequest,
    state: web::Data<HttpState>,
    _caller: Authenticated,
) -> ApiResult<HttpResponse> {
    let presented = presented_refresh_token(&req);
    state.sessions.logout(presented.as_deref()).await?;
    Ok(HttpResponse::Ok()
        .cookie(state.refresh_cookie.clear())
        .json(MessageResponse::new("Logged out")))
}

#[post("/auth/change-password")]
pub async fn change_password(
    state: web::Data<HttpState>,
    caller: Authenticated,
    payload: web::Json<ChangePasswordRequest>,
) -> ApiResult<HttpResponse> {
    let new_password = NewPassword::parse(&payload.new_password)?;
    state
        .sessions
        .change_password(caller.0.user_id, &payload.old_password, &new_password)
        .await?;
    Ok(HttpResponse::Ok()
        .cookie(state.refresh_cookie.clear())
        .json(MessageResponse::new(
            "Password changed successfully. Please log in again.",
        )))
}

#[post("/auth/forgot-password")]
pub async fn forgot_password(
    req: HttpRequest,
    state: web::Data<HttpState>,
    payload: web::Json<EmailRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    state.limits.forgot_password.check_request(&req)?;
    let email = Email::parse(&payload.email)?;
    state.sessions.forgot_password(email.as_ref()).await?;
    Ok(web::Json(MessageResponse::new(
        "Check your email for a reset link.",
    )))
}

#[post("/auth/reset-password")]
pub async fn reset_password(
    req: HttpRequest,
    state: web::Data<HttpState>,
    payload: web::Json<ResetPasswordRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    state.limits.auth.check_request(&req)?;
    let new_password = NewPassword::parse(&payload.password)?;
    state
        .sessions
        .reset_password(&payload.token, &new_password)
        .await?;
    Ok(web::Json(MessageResponse::new(
        "Password has been reset successfully.",
    )))
}

#[get("/auth/verify-email")]
pub async fn verify_email(
    state: web::Data<HttpState>,
    query: web::Query<TokenQuery>,
) -> ApiResult<web::Json<MessageResponse>> {
    let token = required(query.into_inner().token, FieldName::new("token"))?;
    state.accounts.verify_email(&token).await?;
    Ok(web::Json(MessageResponse::new("Email successfully verified.")))
}

#[post("/auth/google")]
pub async fn google_sign_in(
    state: web::Data<HttpState>,
    payload: web::Json<GoogleSignInRequest>,
) -> ApiResult<HttpResponse> {
    let token = required(payload.into_inner().token, FieldName::new("token"))?;
    let outcome = state.accounts.google_sign_in(&token).await?;
    Ok(session_started(&state, outcome))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
