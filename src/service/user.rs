//! User account operations on top of any [`UserDatabase`].
//!
//! Same add/update split as the invoice service, plus the email invariant:
//! no two accounts may share an address, and lookups work by email as well
//! as by id. Passwords are opaque strings here; hashing happens before the
//! account reaches this layer.

use std::sync::Arc;

use tracing::{error, info};

use crate::core::database::UserDatabase;
use crate::core::error::ServiceError;
use crate::core::user::User;
use crate::service::ServiceResult;

#[derive(Clone)]
pub struct UserService<D: UserDatabase> {
    database: Arc<D>,
}

impl<D: UserDatabase> UserService<D> {
    pub fn new(database: Arc<D>) -> Self {
        Self { database }
    }

    /// Register a new account. Rejects an id already stored and an email
    /// already taken by another account.
    pub async fn add(&self, user: &User) -> ServiceResult<User> {
        if let Some(id) = user.id {
            if self.database.exists_by_id(id).await? {
                error!(id, "attempt to add a user that already exists");
                return Err(ServiceError::AlreadyExists(format!(
                    "user with id {id} already exists"
                )));
            }
        }
        if self.database.exists_by_email(&user.email).await? {
            error!(email = %user.email, "attempt to reuse a registered email");
            return Err(ServiceError::AlreadyExists(format!(
                "email already registered: {}",
                user.email
            )));
        }
        let saved = self.database.save(user).await?;
        info!(id = saved.id, email = %saved.email, "user added");
        Ok(saved)
    }

    /// Replace a stored account. The user must carry the id of an existing
    /// one, and may only take an email that is free or its own.
    pub async fn update(&self, user: &User) -> ServiceResult<User> {
        let id = user.id.ok_or_else(|| {
            error!("attempt to update a user without an id");
            ServiceError::InvalidArgument("user id is required for update".to_string())
        })?;
        if !self.database.exists_by_id(id).await? {
            error!(id, "attempt to update a non-existing user");
            return Err(ServiceError::NotFound(format!("no user with id: {id}")));
        }
        if let Some(holder) = self.database.get_by_email(&user.email).await? {
            if holder.id != Some(id) {
                error!(email = %user.email, "attempt to take an email held by another user");
                return Err(ServiceError::AlreadyExists(format!(
                    "email already registered: {}",
                    user.email
                )));
            }
        }
        let saved = self.database.save(user).await?;
        info!(id, "user updated");
        Ok(saved)
    }

    pub async fn delete_by_id(&self, id: i64) -> ServiceResult<()> {
        if !self.database.exists_by_id(id).await? {
            error!(id, "attempt to delete a non-existing user");
            return Err(ServiceError::NotFound(format!("no user with id: {id}")));
        }
        self.database.delete(id).await?;
        info!(id, "user deleted");
        Ok(())
    }

    pub async fn delete_by_email(&self, email: &str) -> ServiceResult<()> {
        if !self.database.exists_by_email(email).await? {
            error!(email, "attempt to delete a non-existing user");
            return Err(ServiceError::NotFound(format!(
                "no user with email: {email}"
            )));
        }
        self.database.delete_by_email(email).await?;
        info!(email, "user deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Option<User>> {
        Ok(self.database.get_by_id(id).await?)
    }

    pub async fn get_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self.database.get_by_email(email).await?)
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<User>> {
        Ok(self.database.get_all().await?)
    }

    pub async fn delete_all(&self) -> ServiceResult<()> {
        self.database.delete_all().await?;
        info!("all users deleted");
        Ok(())
    }

    pub async fn exists_by_id(&self, id: i64) -> ServiceResult<bool> {
        Ok(self.database.exists_by_id(id).await?)
    }

    pub async fn exists_by_email(&self, email: &str) -> ServiceResult<bool> {
        Ok(self.database.exists_by_email(email).await?)
    }

    pub async fn count(&self) -> ServiceResult<u64> {
        Ok(self.database.count().await?)
    }
}
