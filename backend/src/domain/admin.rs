//! Admin user management.

use std::sync::Arc;

use tracing::info;

use super::guard::ensure_admin;
use super::ports::UserRepository;
use super::{Error, Identity, PublicUser, Role, UserId};

#[derive(Clone)]
pub struct AdminService {
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn mockable::Clock>,
}

impl AdminService {
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn mockable::Clock>) -> Self {
        Self { users, clock }
    }

    pub async fn list_users(&self, admin: &Identity) -> Result<Vec<PublicUser>, Error> {
        ensure_admin(admin)?;
        let users = self.users.list().await?;
        Ok(users.iter().map(|u| u.to_public()).collect())
    }

    /// Delete another account. Admins cannot delete themselves here.
    pub async fn delete_user(&self, admin: &Identity, target: UserId) -> Result<(), Error> {
        ensure_admin(admin)?;
        if target == admin.user_id {
            return Err(Error::invalid_request(
                "You cannot delete your own admin account",
            ));
        }
        if !self.users.delete(target).await? {
            return Err(Error::not_found("User not found"));
        }
        info!(admin_id = %admin.user_id, user_id = %target, "admin deleted user");
        Ok(())
    }

    /// Change an account's role. Admins cannot demote themselves.
    pub async fn set_role(
        &self,
        admin: &Identity,
        target: UserId,
        role: &str,
    ) -> Result<PublicUser, Error> {
        ensure_admin(admin)?;
        let role: Role = role
            .parse()
            .map_err(|_| Error::invalid_request("Role must be USER or ADMIN"))?;
        if target == admin.user_id && role == Role::User {
            return Err(Error::invalid_request("You cannot demote yourself"));
        }
        let updated = self
            .users
            .set_role(target, role, self.clock.utc())
            .await?
            .ok_or_else(|| Error::not_found("User not found"))?;
        info!(admin_id = %admin.user_id, user_id = %target, %role, "admin changed role");
        Ok(updated.to_public())
    }
}
