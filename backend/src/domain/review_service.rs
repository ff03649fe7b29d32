//! Review use-cases.

use std::sync::Arc;

use tracing::info;

use super::ports::{PlacemarkRepository, ReviewRepository};
use super::policy::{ensure, is_privileged_viewer, may_delete_review};
use super::review::into_threads;
use super::{Error, Identity, PlacemarkId, Review, ReviewDraft, ReviewId, ReviewThread};

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    placemarks: Arc<dyn PlacemarkRepository>,
    clock: Arc<dyn mockable::Clock>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        placemarks: Arc<dyn PlacemarkRepository>,
        clock: Arc<dyn mockable::Clock>,
    ) -> Self {
        Self {
            reviews,
            placemarks,
            clock,
        }
    }

    /// Top-level reviews with their replies, newest first.
    pub async fn list(&self, placemark_id: PlacemarkId) -> Result<Vec<ReviewThread>, Error> {
        if self.placemarks.find(placemark_id).await?.is_none() {
            return Err(Error::not_found("Placemark not found"));
        }
        let reviews = self.reviews.list_for_placemark(placemark_id).await?;
        Ok(into_threads(reviews))
    }

    /// Post a review or a reply.
    ///
    /// A top-level review by the placemark's owner is refused; a reply needs a
    /// parent on the same placemark and may come from anyone.
    pub async fn create(&self, identity: &Identity, draft: ReviewDraft) -> Result<Review, Error> {
        let placemark = self
            .placemarks
            .find(draft.placemark_id)
            .await?
            .filter(|p| p.is_public || is_privileged_viewer(Some(identity), p.owner_id))
            .ok_or_else(|| Error::not_found("Placemark not found"))?;

        match draft.parent_id {
            Some(parent_id) => {
                let parent = self.reviews.find(parent_id).await?;
                if !parent.is_some_and(|p| p.placemark_id == placemark.id) {
                    return Err(Error::invalid_request("Invalid parent review"));
                }
            }
            None => ensure(
                placemark.owner_id != identity.user_id,
                "You cannot review your own placemark",
            )?,
        }

        let review = Review {
            id: ReviewId::random(),
            rating: draft.rating,
            comment: draft.comment,
            author_id: identity.user_id,
            placemark_id: placemark.id,
            parent_id: draft.parent_id,
            created_at: self.clock.utc(),
        };
        self.reviews.insert(&review).await?;
        info!(user_id = %identity.user_id, review_id = %review.id, "review posted");
        Ok(review)
    }

    pub async fn delete(&self, identity: &Identity, id: ReviewId) -> Result<(), Error> {
        let review = self
            .reviews
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found("Review not found"))?;
        let placemark = self.placemarks.find(review.placemark_id).await?;
        ensure(
            may_delete_review(identity, &review, placemark.as_ref()),
            "Only the author, the host or an admin may delete this review",
        )?;
        self.reviews.delete(id).await?;
        info!(user_id = %identity.user_id, review_id = %id, "review deleted");
        Ok(())
    }
}
