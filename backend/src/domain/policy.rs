//! Ownership rules for mutating operations.
//!
//! Callers check existence first and report a missing resource as 404; these
//! rules then decide entitlement and report refusal as 403.

use super::{Error, Identity, Placemark, Review, UserId};

fn is_self(identity: &Identity, owner: UserId) -> bool {
    identity.user_id == owner
}

/// Only the owner may edit a placemark.
pub fn may_update_placemark(identity: &Identity, placemark: &Placemark) -> bool {
    is_self(identity, placemark.owner_id)
}

/// The owner or an admin may delete a placemark.
pub fn may_delete_placemark(identity: &Identity, placemark: &Placemark) -> bool {
    is_self(identity, placemark.owner_id) || identity.is_admin()
}

/// The author, the host of the reviewed placemark, or an admin may delete a
/// review. `placemark` is `None` if the placemark has already gone.
pub fn may_delete_review(
    identity: &Identity,
    review: &Review,
    placemark: Option<&Placemark>,
) -> bool {
    is_self(identity, review.author_id)
        || placemark.is_some_and(|p| is_self(identity, p.owner_id))
        || identity.is_admin()
}

/// Whether the viewer sees unredacted, private data of `owner`'s resource.
pub fn is_privileged_viewer(viewer: Option<&Identity>, owner: UserId) -> bool {
    viewer.is_some_and(|v| is_self(v, owner) || v.is_admin())
}

/// Turn a rule outcome into a 403.
pub fn ensure(allowed: bool, message: &str) -> Result<(), Error> {
    if allowed {
        Ok(())
    } else {
        Err(Error::forbidden(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, CategoryId, Coordinates, PlacemarkId, ReviewId, Role};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    fn identity(user_id: UserId, role: Role) -> Identity {
        Identity {
            user_id,
            email: "x@example.com".to_owned(),
            role,
            jti: None,
        }
    }

    #[fixture]
    fn host() -> UserId {
        UserId::random()
    }

    fn placemark(owner: UserId) -> Placemark {
        Placemark {
            id: PlacemarkId::random(),
            name: "Spot".to_owned(),
            description: None,
            address: Address {
                street: "Hidden St".to_owned(),
                house_number: "1".to_owned(),
                zip: "1000".to_owned(),
                city: "Town".to_owned(),
                country: "Land".to_owned(),
            },
            coordinates: Coordinates {
                latitude: 1.0,
                longitude: 2.0,
            },
            image_url: None,
            is_public: true,
            view_count: 0,
            owner_id: owner,
            category_id: CategoryId::random(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn review(author: UserId, placemark: &Placemark) -> Review {
        Review {
            id: ReviewId::random(),
            rating: Some(4),
            comment: "ok".to_owned(),
            author_id: author,
            placemark_id: placemark.id,
            parent_id: None,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn only_owner_updates_placemark(host: UserId) {
        let spot = placemark(host);
        assert!(may_update_placemark(&identity(host, Role::User), &spot));
        assert!(!may_update_placemark(
            &identity(UserId::random(), Role::Admin),
            &spot
        ));
    }

    #[rstest]
    #[case(Role::User, false)]
    #[case(Role::Admin, true)]
    fn stranger_deletes_placemark_only_as_admin(
        host: UserId,
        #[case] role: Role,
        #[case] expected: bool,
    ) {
        let spot = placemark(host);
        assert_eq!(
            may_delete_placemark(&identity(UserId::random(), role), &spot),
            expected
        );
    }

    #[rstest]
    fn review_delete_allows_author_host_and_admin(host: UserId) {
        let spot = placemark(host);
        let author = UserId::random();
        let text = review(author, &spot);

        assert!(may_delete_review(&identity(author, Role::User), &text, Some(&spot)));
        assert!(may_delete_review(&identity(host, Role::User), &text, Some(&spot)));
        assert!(may_delete_review(
            &identity(UserId::random(), Role::Admin),
            &text,
            Some(&spot)
        ));
        assert!(!may_delete_review(
            &identity(UserId::random(), Role::User),
            &text,
            Some(&spot)
        ));
    }

    #[rstest]
    fn privileged_viewer_is_owner_or_admin(host: UserId) {
        assert!(is_privileged_viewer(Some(&identity(host, Role::User)), host));
        assert!(is_privileged_viewer(
            Some(&identity(UserId::random(), Role::Admin)),
            host
        ));
        assert!(!is_privileged_viewer(
            Some(&identity(UserId::random(), Role::User)),
            host
        ));
        assert!(!is_privileged_viewer(None, host));
    }
}
