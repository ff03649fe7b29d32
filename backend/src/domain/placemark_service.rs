//! Placemark use-cases: listing, reading with view counting, CRUD and image
//! upload.

use std::sync::Arc;

use tracing::{info, warn};

use super::ports::{
    CategoryRepository, Geocoder, ImageHost, ImageHostError, PlacemarkRepository,
};
use super::policy::{ensure, is_privileged_viewer, may_delete_placemark, may_update_placemark};
use super::privacy::scrub;
use super::{
    Address, CategoryId, Coordinates, Error, Identity, Placemark, PlacemarkChanges,
    PlacemarkDraft, PlacemarkId, auth::field_error,
};

#[derive(Clone)]
pub struct PlacemarkService {
    placemarks: Arc<dyn PlacemarkRepository>,
    categories: Arc<dyn CategoryRepository>,
    geocoder: Arc<dyn Geocoder>,
    images: Arc<dyn ImageHost>,
    clock: Arc<dyn mockable::Clock>,
}

fn not_found() -> Error {
    Error::not_found("Placemark not found")
}

impl PlacemarkService {
    pub fn new(
        placemarks: Arc<dyn PlacemarkRepository>,
        categories: Arc<dyn CategoryRepository>,
        geocoder: Arc<dyn Geocoder>,
        images: Arc<dyn ImageHost>,
        clock: Arc<dyn mockable::Clock>,
    ) -> Self {
        Self {
            placemarks,
            categories,
            geocoder,
            images,
            clock,
        }
    }

    /// Placemarks visible to `viewer`, each redacted as for a single read.
    ///
    /// Public placemarks are listed for everyone; private ones only for their
    /// owner and admins. Listing does not count views.
    pub async fn list(&self, viewer: Option<&Identity>) -> Result<Vec<Placemark>, Error> {
        let all = self.placemarks.list().await?;
        Ok(all
            .into_iter()
            .filter(|p| p.is_public || is_privileged_viewer(viewer, p.owner_id))
            .map(|p| scrub(viewer, p))
            .collect())
    }

    /// Read one placemark, counting the view unless the viewer owns it.
    pub async fn get(
        &self,
        viewer: Option<&Identity>,
        id: PlacemarkId,
    ) -> Result<Placemark, Error> {
        let placemark = self.placemarks.find(id).await?.ok_or_else(not_found)?;
        if !placemark.is_public && !is_privileged_viewer(viewer, placemark.owner_id) {
            return Err(not_found());
        }

        let is_owner = viewer.is_some_and(|v| v.user_id == placemark.owner_id);
        let current = if is_owner {
            placemark
        } else {
            self.placemarks
                .increment_views(id)
                .await?
                .ok_or_else(not_found)?
        };
        Ok(scrub(viewer, current))
    }

    pub async fn create(
        &self,
        identity: &Identity,
        draft: PlacemarkDraft,
    ) -> Result<Placemark, Error> {
        self.ensure_category(draft.category_id).await?;
        let coordinates = match draft.coordinates {
            Some(coordinates) => coordinates,
            None => self.locate(&draft.address).await?,
        };
        let now = self.clock.utc();
        let placemark = Placemark {
            id: PlacemarkId::random(),
            name: draft.name,
            description: draft.description,
            address: draft.address,
            coordinates,
            image_url: None,
            is_public: draft.is_public,
            view_count: 0,
            owner_id: identity.user_id,
            category_id: draft.category_id,
            created_at: now,
            updated_at: now,
        };
        self.placemarks.insert(&placemark).await?;
        info!(user_id = %identity.user_id, placemark_id = %placemark.id, "placemark created");
        Ok(placemark)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: PlacemarkId,
        mut changes: PlacemarkChanges,
    ) -> Result<Placemark, Error> {
        let mut placemark = self.placemarks.find(id).await?.ok_or_else(not_found)?;
        ensure(
            may_update_placemark(identity, &placemark),
            "Only the owner may edit this placemark",
        )?;
        if let Some(category_id) = changes.category_id {
            self.ensure_category(category_id).await?;
        }
        if changes.coordinates.is_none() {
            if let Some(address) = changes.address.as_ref() {
                if *address != placemark.address {
                    changes.coordinates = Some(self.locate(address).await?);
                }
            }
        }

        changes.apply_to(&mut placemark);
        placemark.updated_at = self.clock.utc();
        self.placemarks.update(&placemark).await?;
        Ok(placemark)
    }

    pub async fn delete(&self, identity: &Identity, id: PlacemarkId) -> Result<(), Error> {
        let placemark = self.placemarks.find(id).await?.ok_or_else(not_found)?;
        ensure(
            may_delete_placemark(identity, &placemark),
            "Only the owner or an admin may delete this placemark",
        )?;
        self.placemarks.delete(id).await?;
        info!(user_id = %identity.user_id, placemark_id = %id, "placemark deleted");
        Ok(())
    }

    /// Upload an image and attach its URL to the placemark.
    pub async fn attach_image(
        &self,
        identity: &Identity,
        id: PlacemarkId,
        bytes: Vec<u8>,
    ) -> Result<Placemark, Error> {
        let mut placemark = self.placemarks.find(id).await?.ok_or_else(not_found)?;
        ensure(
            may_update_placemark(identity, &placemark),
            "Only the owner may change the image",
        )?;
        if bytes.is_empty() {
            return Err(field_error("image", "image must not be empty"));
        }
        let url = self.images.upload(bytes).await.map_err(|err| match err {
            ImageHostError::Disabled => Error::service_unavailable(err.to_string()),
            other => {
                warn!(placemark_id = %id, error = %other, "image upload failed");
                Error::transient_failure(other.to_string())
            }
        })?;
        placemark.image_url = Some(url);
        placemark.updated_at = self.clock.utc();
        self.placemarks.update(&placemark).await?;
        Ok(placemark)
    }

    async fn ensure_category(&self, id: CategoryId) -> Result<(), Error> {
        if self.categories.find(id).await?.is_none() {
            return Err(field_error("categoryId", "category does not exist"));
        }
        Ok(())
    }

    async fn locate(&self, address: &Address) -> Result<Coordinates, Error> {
        let found = self
            .geocoder
            .coordinates(&address.one_line())
            .await
            .map_err(|err| {
                warn!(error = %err, "geocoding failed");
                Error::transient_failure(err.to_string())
            })?;
        found.ok_or_else(|| field_error("address", "address could not be located"))
    }
}
