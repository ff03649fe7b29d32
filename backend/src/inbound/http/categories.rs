//! Category endpoints. Reads are public, mutations need an admin bearer.
//!
//! ```text
//! GET    /categories
//! POST   /categories        {"name","description"}
//! DELETE /categories/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{Category, CategoryId, NewCategory};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::AdminIdentity;
use crate::inbound::http::responses::MessageResponse;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, required};

#[derive(Debug, Deserialize, Serialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[get("/categories")]
pub async fn list_categories(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<Category>>> {
    Ok(web::Json(state.categories.list().await?))
}

#[post("/categories")]
pub async fn create_category(
    state: web::Data<HttpState>,
    admin: AdminIdentity,
    payload: web::Json<CategoryRequest>,
) -> ApiResult<HttpResponse> {
    let CategoryRequest { name, description } = payload.into_inner();
    let name = required(name, FieldName::new("name"))?;
    let input = NewCategory::try_new(&name, description.as_deref())?;
    let category = state.categories.create(&admin.0, input).await?;
    Ok(HttpResponse::Created().json(category))
}

#[delete("/categories/{id}")]
pub async fn delete_category(
    state: web::Data<HttpState>,
    admin: AdminIdentity,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id: CategoryId = parse_id(&path, FieldName::new("id"))?;
    state.categories.delete(&admin.0, id).await?;
    Ok(web::Json(MessageResponse::new("Category deleted")))
}
