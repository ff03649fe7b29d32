//! Admin user management.
//!
//! ```text
//! GET    /admin/users
//! DELETE /admin/users/{id}
//! PUT    /admin/users/{id}/role   {"role": "USER" | "ADMIN"}
//! ```

use actix_web::{delete, get, put, web};
use serde::{Deserialize, Serialize};

use crate::domain::{PublicUser, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::AdminIdentity;
use crate::inbound::http::responses::{MessageResponse, UserResponse};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, required};

#[derive(Debug, Deserialize, Serialize)]
pub struct RoleRequest {
    pub role: Option<String>,
}

fn user_id(raw: &str) -> ApiResult<UserId> {
    parse_id(raw, FieldName::new("id"))
}

#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    admin: AdminIdentity,
) -> ApiResult<web::Json<Vec<PublicUser>>> {
    Ok(web::Json(state.admin.list_users(&admin.0).await?))
}

#[delete("/admin/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    admin: AdminIdentity,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let target = user_id(&path)?;
    state.admin.delete_user(&admin.0, target).await?;
    Ok(web::Json(MessageResponse::new("User deleted")))
}

#[put("/admin/users/{id}/role")]
pub async fn set_role(
    state: web::Data<HttpState>,
    admin: AdminIdentity,
    path: web::Path<String>,
    payload: web::Json<RoleRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let target = user_id(&path)?;
    let role = required(payload.into_inner().role, FieldName::new("role"))?;
    let user = state.admin.set_role(&admin.0, target, &role).await?;
    Ok(web::Json(UserResponse { user }))
}
