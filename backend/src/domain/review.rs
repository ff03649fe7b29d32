//! Threaded placemark reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use super::ids::ReviewId;
use super::placemark::PlacemarkId;
use super::user::UserId;
use super::{Error, auth::field_error};

/// Stored review or reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub rating: Option<u8>,
    pub comment: String,
    pub author_id: UserId,
    pub placemark_id: PlacemarkId,
    /// `None` for a top-level review.
    pub parent_id: Option<ReviewId>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Top-level review with its replies, as listed for a placemark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewThread {
    #[serde(flatten)]
    pub review: Review,
    pub replies: Vec<Review>,
}

/// Validated input for a new review or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub placemark_id: PlacemarkId,
    pub parent_id: Option<ReviewId>,
    pub rating: Option<u8>,
    pub comment: String,
}

impl ReviewDraft {
    pub fn try_new(
        placemark_id: PlacemarkId,
        parent_id: Option<ReviewId>,
        rating: Option<u8>,
        comment: &str,
    ) -> Result<Self, Error> {
        if let Some(rating) = rating {
            if !(1..=5).contains(&rating) {
                return Err(field_error("rating", "rating must be between 1 and 5"));
            }
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(field_error("comment", "comment must not be empty"));
        }
        Ok(Self {
            placemark_id,
            parent_id,
            rating,
            comment: comment.to_owned(),
        })
    }
}

/// Group reviews into threads, newest first at both levels.
pub fn into_threads(mut reviews: Vec<Review>) -> Vec<ReviewThread> {
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let (top, replies): (Vec<_>, Vec<_>) = reviews.into_iter().partition(Review::is_top_level);
    top.into_iter()
        .map(|review| {
            let replies = replies
                .iter()
                .filter(|reply| reply.parent_id == Some(review.id))
                .cloned()
                .collect();
            ReviewThread { review, replies }
        })
        .collect()
}
