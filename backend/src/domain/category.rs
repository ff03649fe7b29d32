//! Placemark categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use super::ids::CategoryId;
use super::user::UserId;
use super::{Error, auth::field_error};

/// Minimum length of a category name.
pub const CATEGORY_NAME_MIN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    /// Cleared when the creating account is deleted.
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for category creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    name: String,
    description: Option<String>,
}

impl NewCategory {
    pub fn try_new(name: &str, description: Option<&str>) -> Result<Self, Error> {
        let name = name.trim();
        if name.chars().count() < CATEGORY_NAME_MIN {
            return Err(field_error(
                "name",
                format!("name must be at least {CATEGORY_NAME_MIN} characters"),
            ));
        }
        Ok(Self {
            name: name.to_owned(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_owned),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
