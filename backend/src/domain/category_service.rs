//! Category use-cases. Mutations are admin only.

use std::sync::Arc;

use tracing::info;

use super::guard::ensure_admin;
use super::ports::CategoryRepository;
use super::{Category, CategoryId, Error, Identity, NewCategory, ports::StoreError};

#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
    clock: Arc<dyn mockable::Clock>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>, clock: Arc<dyn mockable::Clock>) -> Self {
        Self { categories, clock }
    }

    pub async fn list(&self) -> Result<Vec<Category>, Error> {
        Ok(self.categories.list().await?)
    }

    pub async fn create(&self, identity: &Identity, input: NewCategory) -> Result<Category, Error> {
        ensure_admin(identity)?;
        let category = Category {
            id: CategoryId::random(),
            name: input.name().to_owned(),
            description: input.description().map(str::to_owned),
            created_by: Some(identity.user_id),
            created_at: self.clock.utc(),
        };
        self.categories
            .insert(&category)
            .await
            .map_err(|err| match err {
                StoreError::Conflict { .. } => {
                    Error::conflict(format!("Category '{}' already exists", category.name))
                }
                other => other.into(),
            })?;
        info!(user_id = %identity.user_id, category_id = %category.id, "category created");
        Ok(category)
    }

    /// Delete an unused category.
    pub async fn delete(&self, identity: &Identity, id: CategoryId) -> Result<(), Error> {
        ensure_admin(identity)?;
        if self.categories.find(id).await?.is_none() {
            return Err(Error::not_found("Category not found"));
        }
        if self.categories.usage_count(id).await? > 0 {
            return Err(Error::conflict("Category is still used by placemarks"));
        }
        self.categories.delete(id).await?;
        info!(user_id = %identity.user_id, category_id = %id, "category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockCategoryRepository;
    use crate::domain::{Role, UserId};
    use mockable::DefaultClock;
    use rstest::rstest;

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: UserId::random(),
            email: "a@example.com".to_owned(),
            role,
            jti: None,
        }
    }

    fn service(repo: MockCategoryRepository) -> CategoryService {
        CategoryService::new(Arc::new(repo), Arc::new(DefaultClock))
    }

    #[rstest]
    #[tokio::test]
    async fn create_requires_admin() {
        let mut repo = MockCategoryRepository::new();
        repo.expect_insert().never();
        let input = NewCategory::try_new("Forest", None).expect("valid");

        let err = service(repo)
            .create(&identity(Role::User), input)
            .await
            .expect_err("non-admin refused");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let mut repo = MockCategoryRepository::new();
        repo.expect_insert()
            .times(1)
            .returning(|_| Err(StoreError::conflict("categories_name_key")));
        let input = NewCategory::try_new("Forest", None).expect("valid");

        let err = service(repo)
            .create(&identity(Role::Admin), input)
            .await
            .expect_err("duplicate");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[case(None, 0, ErrorCode::NotFound)]
    #[case(Some(()), 2, ErrorCode::Conflict)]
    #[tokio::test]
    async fn delete_checks_existence_then_usage(
        #[case] existing: Option<()>,
        #[case] usage: u64,
        #[case] expected: ErrorCode,
    ) {
        let admin = identity(Role::Admin);
        let mut repo = MockCategoryRepository::new();
        let created_by = admin.user_id;
        repo.expect_find().returning(move |id| {
            Ok(existing.map(|()| Category {
                id,
                name: "Forest".to_owned(),
                description: None,
                created_by: Some(created_by),
                created_at: chrono::Utc::now(),
            }))
        });
        repo.expect_usage_count().returning(move |_| Ok(usage));
        repo.expect_delete().never();

        let err = service(repo)
            .delete(&admin, CategoryId::random())
            .await
            .expect_err("refused");
        assert_eq!(err.code(), expected);
    }
}
