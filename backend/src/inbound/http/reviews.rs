//! Review endpoints.
//!
//! ```text
//! GET    /placemarks/{id}/reviews
//! POST   /reviews            {"placemarkId","parentId","rating","comment"}
//! DELETE /reviews/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::auth::field_error;
use crate::domain::{Error, PlacemarkId, ReviewDraft, ReviewId, ReviewThread};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::Authenticated;
use crate::inbound::http::responses::MessageResponse;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, required};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub placemark_id: Option<String>,
    pub parent_id: Option<String>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

impl TryFrom<ReviewRequest> for ReviewDraft {
    type Error = Error;

    fn try_from(value: ReviewRequest) -> Result<Self, Self::Error> {
        let placemark_id = required(value.placemark_id, FieldName::new("placemarkId"))?;
        let placemark_id: PlacemarkId = parse_id(&placemark_id, FieldName::new("placemarkId"))?;
        let parent_id = value
            .parent_id
            .as_deref()
            .map(|raw| parse_id::<ReviewId>(raw, FieldName::new("parentId")))
            .transpose()?;
        let rating = value
            .rating
            .map(|raw| {
                u8::try_from(raw).map_err(|_| field_error("rating", "rating must be between 1 and 5"))
            })
            .transpose()?;
        let comment = required(value.comment, FieldName::new("comment"))?;
        ReviewDraft::try_new(placemark_id, parent_id, rating, &comment)
    }
}

#[get("/placemarks/{id}/reviews")]
pub async fn list_reviews(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<ReviewThread>>> {
    let id: PlacemarkId = parse_id(&path, FieldName::new("id"))?;
    Ok(web::Json(state.reviews.list(id).await?))
}

#[post("/reviews")]
pub async fn create_review(
    state: web::Data<HttpState>,
    caller: Authenticated,
    payload: web::Json<ReviewRequest>,
) -> ApiResult<HttpResponse> {
    let draft = ReviewDraft::try_from(payload.into_inner())?;
    let review = state.reviews.create(&caller.0, draft).await?;
    Ok(HttpResponse::Created().json(review))
}

#[delete("/reviews/{id}")]
pub async fn delete_review(
    state: web::Data<HttpState>,
    caller: Authenticated,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id: ReviewId = parse_id(&path, FieldName::new("id"))?;
    state.reviews.delete(&caller.0, id).await?;
    Ok(web::Json(MessageResponse::new("Review deleted")))
}
