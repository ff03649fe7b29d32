//! Request-scoped caller identity extractors.
//!
//! Handlers name the identity they need in their signature instead of
//! reading headers: [`Authenticated`] rejects anonymous callers with 401,
//! [`AdminIdentity`] additionally requires the admin role, and
//! [`MaybeIdentity`] treats any unusable token as anonymous.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, Identity};

use super::state::HttpState;

fn resolve(req: &HttpRequest) -> Result<(web::Data<HttpState>, Option<String>), Error> {
    let state = req
        .app_data::<web::Data<HttpState>>()
        .cloned()
        .ok_or_else(|| Error::internal("HTTP state is not registered"))?;
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    Ok((state, authorization))
}

/// Caller with a valid, unrevoked access token.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl FromRequest for Authenticated {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let resolved = resolve(req);
        Box::pin(async move {
            let (state, authorization) = resolved?;
            state.guard.require(authorization.as_deref()).await.map(Self)
        })
    }
}

/// Caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub Identity);

impl FromRequest for AdminIdentity {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let resolved = resolve(req);
        Box::pin(async move {
            let (state, authorization) = resolved?;
            state
                .guard
                .require_admin(authorization.as_deref())
                .await
                .map(Self)
        })
    }
}

/// Caller if one can be resolved, otherwise anonymous.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl MaybeIdentity {
    pub fn as_ref(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl FromRequest for MaybeIdentity {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let resolved = resolve(req);
        Box::pin(async move {
            let (state, authorization) = resolved?;
            Ok(Self(state.guard.optional(authorization.as_deref()).await))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test};
    use rstest::rstest;

    use crate::domain::Role;
    use crate::test_support::Harness;

    async fn whoami(caller: Authenticated) -> HttpResponse {
        HttpResponse::Ok().body(caller.0.user_id.to_string())
    }

    async fn admin_only(_: AdminIdentity) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn maybe(caller: MaybeIdentity) -> HttpResponse {
        let body = caller
            .as_ref()
            .map_or_else(|| "anonymous".to_owned(), |id| id.role.as_str().to_owned());
        HttpResponse::Ok().body(body)
    }

    async fn call(
        harness: &Harness,
        path: &str,
        authorization: Option<&str>,
    ) -> (StatusCode, String) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(harness.http_state()))
                .route("/whoami", web::get().to(whoami))
                .route("/admin", web::get().to(admin_only))
                .route("/maybe", web::get().to(maybe)),
        )
        .await;
        let mut req = test::TestRequest::get().uri(path);
        if let Some(value) = authorization {
            req = req.insert_header((AUTHORIZATION, value));
        }
        let res = test::call_service(&app, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[actix_web::test]
    async fn authenticated_resolves_the_bearer() {
        let harness = Harness::new();
        let user = harness.seed_user("ada@example.com", Role::User, true).await;
        let bearer = harness.bearer_for("ada@example.com").await;

        let (status, body) = call(&harness, "/whoami", Some(&bearer)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user.id.to_string());
    }

    #[rstest]
    #[case(None)]
    #[case(Some("Bearer not-a-token"))]
    #[case(Some("Basic YWRhOnB3"))]
    #[actix_web::test]
    async fn authenticated_rejects_missing_or_bad_tokens(#[case] authorization: Option<&str>) {
        let harness = Harness::new();
        let (status, _) = call(&harness, "/whoami", authorization).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn admin_identity_refuses_plain_users() {
        let harness = Harness::new();
        harness.seed_user("ada@example.com", Role::User, true).await;
        harness.seed_user("root@example.com", Role::Admin, true).await;
        let user = harness.bearer_for("ada@example.com").await;
        let admin = harness.bearer_for("root@example.com").await;

        assert_eq!(call(&harness, "/admin", Some(&user)).await.0, StatusCode::FORBIDDEN);
        assert_eq!(call(&harness, "/admin", Some(&admin)).await.0, StatusCode::OK);
    }

    #[actix_web::test]
    async fn maybe_identity_falls_back_to_anonymous() {
        let harness = Harness::new();
        harness.seed_user("root@example.com", Role::Admin, true).await;
        let admin = harness.bearer_for("root@example.com").await;

        assert_eq!(call(&harness, "/maybe", None).await.1, "anonymous");
        assert_eq!(
            call(&harness, "/maybe", Some("Bearer garbage")).await.1,
            "anonymous"
        );
        assert_eq!(call(&harness, "/maybe", Some(&admin)).await.1, "ADMIN");
    }

    #[actix_web::test]
    async fn logged_out_access_token_is_refused() {
        let harness = Harness::new();
        harness.seed_user("ada@example.com", Role::User, true).await;
        let tokens = harness.tokens_for("ada@example.com").await;
        harness
            .sessions
            .logout(Some(&tokens.refresh_token))
            .await
            .expect("logout");

        let bearer = format!("Bearer {}", tokens.access_token);
        let (status, _) = call(&harness, "/whoami", Some(&bearer)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
