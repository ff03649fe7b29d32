//! Placemarks: geotagged camping spots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::CategoryId;
pub use super::ids::PlacemarkId;
use super::user::UserId;
use super::{Error, auth::field_error};

/// Postal address of a placemark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub house_number: String,
    pub zip: String,
    pub city: String,
    pub country: String,
}

impl Address {
    pub fn try_new(
        street: &str,
        house_number: &str,
        zip: &str,
        city: &str,
        country: &str,
    ) -> Result<Self, Error> {
        Ok(Self {
            street: required("street", street)?,
            house_number: house_number.trim().to_owned(),
            zip: required("zip", zip)?,
            city: required("city", city)?,
            country: required("country", country)?,
        })
    }

    /// Single-line form handed to the geocoder.
    pub fn one_line(&self) -> String {
        let street = if self.house_number.is_empty() {
            self.street.clone()
        } else {
            format!("{} {}", self.street, self.house_number)
        };
        format!("{street}, {} {}, {}", self.zip, self.city, self.country)
    }
}

fn required(field: &str, raw: &str) -> Result<String, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(field_error(field, format!("{field} must not be empty")));
    }
    Ok(trimmed.to_owned())
}

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, Error> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(field_error("latitude", "latitude must be within -90..=90"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(field_error(
                "longitude",
                "longitude must be within -180..=180",
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Stored placemark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placemark {
    pub id: PlacemarkId,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub address: Address,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    pub image_url: Option<String>,
    pub is_public: bool,
    pub view_count: i64,
    pub owner_id: UserId,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for placemark creation.
///
/// Coordinates are optional; the service geocodes the address when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacemarkDraft {
    pub name: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub address: Address,
    pub coordinates: Option<Coordinates>,
    pub is_public: bool,
}

/// Validate a placemark name.
pub fn placemark_name(raw: &str) -> Result<String, Error> {
    required("name", raw)
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacemarkChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub address: Option<Address>,
    pub coordinates: Option<Coordinates>,
    pub is_public: Option<bool>,
}

impl PlacemarkChanges {
    /// Apply the changes onto `placemark`.
    pub fn apply_to(&self, placemark: &mut Placemark) {
        if let Some(name) = &self.name {
            placemark.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            placemark.description = Some(description.clone());
        }
        if let Some(category_id) = self.category_id {
            placemark.category_id = category_id;
        }
        if let Some(address) = &self.address {
            placemark.address = address.clone();
        }
        if let Some(coordinates) = self.coordinates {
            placemark.coordinates = coordinates;
        }
        if let Some(is_public) = self.is_public {
            placemark.is_public = is_public;
        }
    }
}
