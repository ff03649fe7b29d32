//! Placemark endpoints.
//!
//! ```text
//! GET    /placemarks               optional bearer
//! POST   /placemarks               PlacemarkRequest
//! GET    /placemarks/{id}          optional bearer, counts the view
//! PUT    /placemarks/{id}          PlacemarkRequest (partial)
//! DELETE /placemarks/{id}
//! POST   /placemarks/{id}/image    raw image bytes
//! ```
//!
//! Address fields travel flat next to the name. When coordinates are omitted
//! the address is geocoded.

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};

use crate::domain::auth::field_error;
use crate::domain::placemark::placemark_name;
use crate::domain::{
    Address, CategoryId, Coordinates, Error, Placemark, PlacemarkChanges, PlacemarkDraft,
    PlacemarkId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::{Authenticated, MaybeIdentity};
use crate::inbound::http::responses::MessageResponse;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, required};

/// Create or update body. Every field is optional at the wire level; creation
/// enforces the required ones.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacemarkRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_public: Option<bool>,
}

impl PlacemarkRequest {
    fn has_address(&self) -> bool {
        [
            &self.street,
            &self.house_number,
            &self.zip,
            &self.city,
            &self.country,
        ]
        .iter()
        .any(|field| field.is_some())
    }

    /// Street, zip, city and country are required together.
    fn address(&mut self) -> Result<Address, Error> {
        let street = required(self.street.take(), FieldName::new("street"))?;
        let zip = required(self.zip.take(), FieldName::new("zip"))?;
        let city = required(self.city.take(), FieldName::new("city"))?;
        let country = required(self.country.take(), FieldName::new("country"))?;
        let house_number = self.house_number.take().unwrap_or_default();
        Address::try_new(&street, &house_number, &zip, &city, &country)
    }

    fn coordinates(&self) -> Result<Option<Coordinates>, Error> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Coordinates::try_new(latitude, longitude).map(Some),
            (None, None) => Ok(None),
            (Some(_), None) => Err(field_error(
                "longitude",
                "longitude is required with latitude",
            )),
            (None, Some(_)) => Err(field_error(
                "latitude",
                "latitude is required with longitude",
            )),
        }
    }

    fn category_id(&self) -> Result<Option<CategoryId>, Error> {
        self.category_id
            .as_deref()
            .map(|raw| parse_id(raw, FieldName::new("categoryId")))
            .transpose()
    }

    fn into_draft(mut self) -> Result<PlacemarkDraft, Error> {
        let name = placemark_name(&required(self.name.take(), FieldName::new("name"))?)?;
        let category_id = self
            .category_id()?
            .ok_or_else(|| field_error("categoryId", "categoryId is required"))?;
        let coordinates = self.coordinates()?;
        let address = self.address()?;
        Ok(PlacemarkDraft {
            name,
            description: self.description.and_then(non_blank),
            category_id,
            address,
            coordinates,
            is_public: self.is_public.unwrap_or(true),
        })
    }

    fn into_changes(mut self) -> Result<PlacemarkChanges, Error> {
        let name = self.name.take().map(|raw| placemark_name(&raw)).transpose()?;
        let category_id = self.category_id()?;
        let coordinates = self.coordinates()?;
        let address = if self.has_address() {
            Some(self.address()?)
        } else {
            None
        };
        Ok(PlacemarkChanges {
            name,
            description: self.description.and_then(non_blank),
            category_id,
            address,
            coordinates,
            is_public: self.is_public,
        })
    }
}

fn non_blank(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn placemark_id(raw: &str) -> Result<PlacemarkId, Error> {
    parse_id(raw, FieldName::new("id"))
}

#[get("/placemarks")]
pub async fn list_placemarks(
    state: web::Data<HttpState>,
    viewer: MaybeIdentity,
) -> ApiResult<web::Json<Vec<Placemark>>> {
    Ok(web::Json(state.placemarks.list(viewer.as_ref()).await?))
}

#[post("/placemarks")]
pub async fn create_placemark(
    state: web::Data<HttpState>,
    caller: Authenticated,
    payload: web::Json<PlacemarkRequest>,
) -> ApiResult<HttpResponse> {
    let draft = payload.into_inner().into_draft()?;
    let placemark = state.placemarks.create(&caller.0, draft).await?;
    Ok(HttpResponse::Created().json(placemark))
}

#[get("/placemarks/{id}")]
pub async fn get_placemark(
    state: web::Data<HttpState>,
    viewer: MaybeIdentity,
    path: web::Path<String>,
) -> ApiResult<web::Json<Placemark>> {
    let id = placemark_id(&path)?;
    Ok(web::Json(state.placemarks.get(viewer.as_ref(), id).await?))
}

#[put("/placemarks/{id}")]
pub async fn update_placemark(
    state: web::Data<HttpState>,
    caller: Authenticated,
    path: web::Path<String>,
    payload: web::Json<PlacemarkRequest>,
) -> ApiResult<web::Json<Placemark>> {
    let id = placemark_id(&path)?;
    let changes = payload.into_inner().into_changes()?;
    Ok(web::Json(
        state.placemarks.update(&caller.0, id, changes).await?,
    ))
}

#[delete("/placemarks/{id}")]
pub async fn delete_placemark(
    state: web::Data<HttpState>,
    caller: Authenticated,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = placemark_id(&path)?;
    state.placemarks.delete(&caller.0, id).await?;
    Ok(web::Json(MessageResponse::new("Placemark deleted")))
}

/// The body is the raw image; its size is bounded by the payload config.
#[post("/placemarks/{id}/image")]
pub async fn upload_image(
    state: web::Data<HttpState>,
    caller: Authenticated,
    path: web::Path<String>,
    body: web::Bytes,
) -> ApiResult<web::Json<Placemark>> {
    let id = placemark_id(&path)?;
    Ok(web::Json(
        state
            .placemarks
            .attach_image(&caller.0, id, body.to_vec())
            .await?,
    ))
}

#[cfg(test)]
#[path = "placemarks_tests.rs"]
mod tests;
