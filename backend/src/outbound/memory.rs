//! In-process store implementing every persistence port.
//!
//! All state sits behind one mutex, so each port call (and each unit of work)
//! is atomic with respect to every other. Used when no database URL is
//! configured and by the test suites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    CategoryRepository, CredentialUnitOfWork, OneTimeTokenRepository, PlacemarkRepository,
    RefreshTokenRepository, ReviewRepository, StoreError, UserRepository,
};
use crate::domain::{
    Category, CategoryId, ConsumeOutcome, Email, OneTimePurpose, OneTimeToken, PasswordHash,
    Placemark, PlacemarkId, Profile, RefreshTokenRecord, Review, ReviewId, Role,
    RotationOutcome, User, UserId,
};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    one_time_tokens: HashMap<String, OneTimeToken>,
    categories: HashMap<CategoryId, Category>,
    placemarks: HashMap<PlacemarkId, Placemark>,
    reviews: HashMap<ReviewId, Review>,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email.as_ref() == email && Some(u.id) != except)
    }

    /// Drop reviews whose parent no longer exists until none remain.
    fn prune_orphan_replies(&mut self) {
        loop {
            let orphans: Vec<ReviewId> = self
                .reviews
                .values()
                .filter(|r| r.parent_id.is_some_and(|p| !self.reviews.contains_key(&p)))
                .map(|r| r.id)
                .collect();
            if orphans.is_empty() {
                break;
            }
            for id in orphans {
                self.reviews.remove(&id);
            }
        }
    }

    fn delete_placemark(&mut self, id: PlacemarkId) -> bool {
        self.reviews.retain(|_, r| r.placemark_id != id);
        self.placemarks.remove(&id).is_some()
    }

    fn clear_refresh_tokens(&mut self, user_id: UserId) {
        self.refresh_tokens.retain(|_, r| r.user_id != user_id);
    }

    fn consume_one_time(
        &mut self,
        token: &str,
        user_id: UserId,
        purpose: OneTimePurpose,
    ) -> bool {
        let matches = self
            .one_time_tokens
            .get(token)
            .is_some_and(|row| row.user_id == user_id && row.purpose == purpose);
        if matches {
            self.one_time_tokens.remove(token);
        }
        matches
    }
}

/// Shared in-memory store. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::query("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.email_taken(user.email.as_ref(), None) {
            return Err(StoreError::conflict("users_email_key"));
        }
        if let Some(link) = &user.oauth {
            let linked = state.users.values().any(|u| {
                u.oauth
                    .as_ref()
                    .is_some_and(|l| l.provider == link.provider && l.subject == link.subject)
            });
            if linked {
                return Err(StoreError::conflict("oauth_accounts_provider_subject_key"));
            }
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email.as_ref() == email)
            .cloned())
    }

    async fn find_by_oauth(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| {
                u.oauth
                    .as_ref()
                    .is_some_and(|l| l.provider == provider && l.subject == subject)
            })
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.lock()?.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn update_profile(
        &self,
        id: UserId,
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.lock()?;
        Ok(state.users.get_mut(&id).map(|user| {
            user.profile = profile.clone();
            user.updated_at = now;
            user.clone()
        }))
    }

    async fn mark_verified(&self, id: UserId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        Ok(state
            .users
            .get_mut(&id)
            .map(|user| {
                user.email_verified_at = Some(at);
                user.updated_at = at;
            })
            .is_some())
    }

    async fn set_role(
        &self,
        id: UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.lock()?;
        Ok(state.users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = now;
            user.clone()
        }))
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.clear_refresh_tokens(id);
        state.one_time_tokens.retain(|_, t| t.user_id != id);
        let owned: Vec<PlacemarkId> = state
            .placemarks
            .values()
            .filter(|p| p.owner_id == id)
            .map(|p| p.id)
            .collect();
        for placemark_id in owned {
            state.delete_placemark(placemark_id);
        }
        state.reviews.retain(|_, r| r.author_id != id);
        state.prune_orphan_replies();
        for category in state.categories.values_mut() {
            if category.created_by == Some(id) {
                category.created_by = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.refresh_tokens.contains_key(&record.token)
            || state.refresh_tokens.values().any(|r| r.jti == record.jti)
        {
            return Err(StoreError::conflict("refresh_tokens unique key"));
        }
        state
            .refresh_tokens
            .insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.lock()?.refresh_tokens.get(token).cloned())
    }

    async fn find_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self
            .lock()?
            .refresh_tokens
            .values()
            .find(|r| r.jti == jti)
            .cloned())
    }

    async fn revoke(&self, token: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        Ok(state
            .refresh_tokens
            .get_mut(token)
            .map(|r| r.revoked = true)
            .is_some())
    }
}

#[async_trait]
impl OneTimeTokenRepository for InMemoryStore {
    async fn insert(&self, token: &OneTimeToken) -> Result<(), StoreError> {
        self.lock()?
            .one_time_tokens
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find(
        &self,
        token: &str,
        purpose: OneTimePurpose,
    ) -> Result<Option<OneTimeToken>, StoreError> {
        Ok(self
            .lock()?
            .one_time_tokens
            .get(token)
            .filter(|row| row.purpose == purpose)
            .cloned())
    }
}

#[async_trait]
impl CredentialUnitOfWork for InMemoryStore {
    async fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: &RefreshTokenRecord,
    ) -> Result<RotationOutcome, StoreError> {
        let mut state = self.lock()?;
        let Some(row) = state
            .refresh_tokens
            .get_mut(presented)
            .filter(|row| !row.revoked)
        else {
            return Ok(RotationOutcome::Stale);
        };
        row.revoked = true;
        state
            .refresh_tokens
            .insert(replacement.token.clone(), replacement.clone());
        Ok(RotationOutcome::Rotated)
    }

    async fn replace_password(
        &self,
        user_id: UserId,
        hash: &PasswordHash,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::query("user vanished during password change"))?;
        user.password_hash = Some(hash.clone());
        state.clear_refresh_tokens(user_id);
        Ok(())
    }

    async fn reset_password(
        &self,
        reset_token: &str,
        user_id: UserId,
        hash: &PasswordHash,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut state = self.lock()?;
        if !state.users.contains_key(&user_id)
            || !state.consume_one_time(reset_token, user_id, OneTimePurpose::PasswordReset)
        {
            return Ok(ConsumeOutcome::AlreadyConsumed);
        }
        if let Some(user) = state.users.get_mut(&user_id) {
            user.password_hash = Some(hash.clone());
        }
        state.clear_refresh_tokens(user_id);
        Ok(ConsumeOutcome::Applied)
    }

    async fn change_email(
        &self,
        change_token: &str,
        user_id: UserId,
        new_email: &Email,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut state = self.lock()?;
        if state.email_taken(new_email.as_ref(), Some(user_id)) {
            return Err(StoreError::conflict("users_email_key"));
        }
        if !state.users.contains_key(&user_id)
            || !state.consume_one_time(change_token, user_id, OneTimePurpose::EmailChange)
        {
            return Ok(ConsumeOutcome::AlreadyConsumed);
        }
        if let Some(user) = state.users.get_mut(&user_id) {
            user.email = new_email.clone();
        }
        Ok(ConsumeOutcome::Applied)
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.lock()?.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.lock()?.categories.get(&id).cloned())
    }

    async fn insert(&self, category: &Category) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.categories.values().any(|c| c.name == category.name) {
            return Err(StoreError::conflict("categories_name_key"));
        }
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn usage_count(&self, id: CategoryId) -> Result<u64, StoreError> {
        let state = self.lock()?;
        let count = state
            .placemarks
            .values()
            .filter(|p| p.category_id == id)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn delete(&self, id: CategoryId) -> Result<bool, StoreError> {
        Ok(self.lock()?.categories.remove(&id).is_some())
    }
}

#[async_trait]
impl PlacemarkRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Placemark>, StoreError> {
        let mut placemarks: Vec<Placemark> = self.lock()?.placemarks.values().cloned().collect();
        placemarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(placemarks)
    }

    async fn find(&self, id: PlacemarkId) -> Result<Option<Placemark>, StoreError> {
        Ok(self.lock()?.placemarks.get(&id).cloned())
    }

    async fn insert(&self, placemark: &Placemark) -> Result<(), StoreError> {
        self.lock()?
            .placemarks
            .insert(placemark.id, placemark.clone());
        Ok(())
    }

    async fn update(&self, placemark: &Placemark) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        match state.placemarks.get_mut(&placemark.id) {
            Some(stored) => {
                let views = stored.view_count;
                *stored = placemark.clone();
                stored.view_count = views;
                Ok(())
            }
            None => Err(StoreError::query("placemark vanished during update")),
        }
    }

    async fn increment_views(&self, id: PlacemarkId) -> Result<Option<Placemark>, StoreError> {
        let mut state = self.lock()?;
        Ok(state.placemarks.get_mut(&id).map(|p| {
            p.view_count += 1;
            p.clone()
        }))
    }

    async fn delete(&self, id: PlacemarkId) -> Result<bool, StoreError> {
        Ok(self.lock()?.delete_placemark(id))
    }
}

#[async_trait]
impl ReviewRepository for InMemoryStore {
    async fn find(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        Ok(self.lock()?.reviews.get(&id).cloned())
    }

    async fn list_for_placemark(
        &self,
        placemark_id: PlacemarkId,
    ) -> Result<Vec<Review>, StoreError> {
        Ok(self
            .lock()?
            .reviews
            .values()
            .filter(|r| r.placemark_id == placemark_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, review: &Review) -> Result<(), StoreError> {
        self.lock()?.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn delete(&self, id: ReviewId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let removed = state.reviews.remove(&id).is_some();
        state.prune_orphan_replies();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, Coordinates};
    use chrono::Duration;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> InMemoryStore {
        InMemoryStore::new()
    }

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::random(),
            email: Email::parse(email).expect("valid email"),
            password_hash: Some(PasswordHash::new("hash")),
            role: Role::User,
            email_verified_at: Some(now),
            profile: Profile::from_names("Ada", "Lovelace").expect("valid names"),
            oauth: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn refresh(user_id: UserId, token: &str) -> RefreshTokenRecord {
        RefreshTokenRecord {
            token: token.to_owned(),
            user_id,
            jti: format!("jti-{token}"),
            revoked: false,
            expires_at: Utc::now() + Duration::days(7),
            created_at: Utc::now(),
        }
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
                latitude: 0.0,
                longitude: 0.0,
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

    fn review(author: UserId, placemark_id: PlacemarkId, parent: Option<ReviewId>) -> Review {
        Review {
            id: ReviewId::random(),
            rating: None,
            comment: "c".to_owned(),
            author_id: author,
            placemark_id,
            parent_id: parent,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_email_is_a_conflict(store: InMemoryStore) {
        UserRepository::insert(&store, &user("a@example.com"))
            .await
            .expect("first insert");
        let err = UserRepository::insert(&store, &user("a@example.com"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn rotation_succeeds_once(store: InMemoryStore) {
        let owner = user("a@example.com");
        RefreshTokenRepository::insert(&store, &refresh(owner.id, "old"))
            .await
            .expect("seed");

        let first = store
            .rotate_refresh_token("old", &refresh(owner.id, "new-1"))
            .await
            .expect("rotate");
        let second = store
            .rotate_refresh_token("old", &refresh(owner.id, "new-2"))
            .await
            .expect("rotate again");

        assert_eq!(first, RotationOutcome::Rotated);
        assert_eq!(second, RotationOutcome::Stale);
        assert!(store.find_by_token("new-2").await.expect("lookup").is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn reset_consumes_token_once(store: InMemoryStore) {
        let owner = user("a@example.com");
        UserRepository::insert(&store, &owner).await.expect("seed user");
        RefreshTokenRepository::insert(&store, &refresh(owner.id, "session"))
            .await
            .expect("seed refresh");
        OneTimeTokenRepository::insert(
            &store,
            &OneTimeToken {
                token: "reset".to_owned(),
                user_id: owner.id,
                purpose: OneTimePurpose::PasswordReset,
                new_email: None,
                created_at: Utc::now(),
            },
        )
        .await
        .expect("seed reset");

        let hash = PasswordHash::new("new-hash");
        let first = store.reset_password("reset", owner.id, &hash).await.expect("reset");
        let second = store
            .reset_password("reset", owner.id, &PasswordHash::new("other"))
            .await
            .expect("reuse");

        assert_eq!(first, ConsumeOutcome::Applied);
        assert_eq!(second, ConsumeOutcome::AlreadyConsumed);
        let stored = UserRepository::find_by_id(&store, owner.id)
            .await
            .expect("lookup")
            .expect("user exists");
        assert_eq!(stored.password_hash, Some(hash));
        assert!(store.find_by_token("session").await.expect("lookup").is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn user_delete_cascades(store: InMemoryStore) {
        let owner = user("owner@example.com");
        let guest = user("guest@example.com");
        UserRepository::insert(&store, &owner).await.expect("owner");
        UserRepository::insert(&store, &guest).await.expect("guest");
        let spot = placemark(owner.id);
        PlacemarkRepository::insert(&store, &spot).await.expect("spot");
        let guest_spot = placemark(guest.id);
        PlacemarkRepository::insert(&store, &guest_spot).await.expect("guest spot");
        let on_owner_spot = review(guest.id, spot.id, None);
        let by_owner = review(owner.id, guest_spot.id, None);
        let reply_to_owner = review(guest.id, guest_spot.id, Some(by_owner.id));
        for r in [&on_owner_spot, &by_owner, &reply_to_owner] {
            ReviewRepository::insert(&store, r).await.expect("review");
        }

        assert!(UserRepository::delete(&store, owner.id).await.expect("delete"));

        assert!(PlacemarkRepository::find(&store, spot.id).await.expect("find").is_none());
        for r in [&on_owner_spot, &by_owner, &reply_to_owner] {
            assert!(ReviewRepository::find(&store, r.id).await.expect("find").is_none());
        }
        assert!(PlacemarkRepository::find(&store, guest_spot.id)
            .await
            .expect("find")
            .is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn increment_returns_post_increment_row(store: InMemoryStore) {
        let spot = placemark(UserId::random());
        PlacemarkRepository::insert(&store, &spot).await.expect("insert");

        let viewed = store
            .increment_views(spot.id)
            .await
            .expect("increment")
            .expect("exists");
        assert_eq!(viewed.view_count, 1);
    }
}
