//! In-memory storage backend for testing and development.
//!
//! A single identity map behind a coarse `RwLock`: reads share the lock,
//! every mutating operation takes the write lock for its whole critical
//! section. `save` in particular performs its existence check and its
//! insert/update under one write guard, so two concurrent saves cannot both
//! decide "insert" for the same id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::core::database::{DatabaseResult, InvoiceDatabase, UserDatabase};
use crate::core::error::DatabaseError;
use crate::core::invoice::Invoice;
use crate::core::user::User;

fn lock_poisoned(what: &str) -> DatabaseError {
    DatabaseError::Operation {
        context: format!("failed to acquire {what} lock"),
        source: "lock poisoned".into(),
    }
}

// ---------------------------------------------------------------------------
// InMemoryDatabase
// ---------------------------------------------------------------------------

/// In-memory invoice store.
///
/// Ids are allocated by an atomic counter; an invoice arriving with an id
/// the store does not contain is still inserted under a fresh id.
#[derive(Clone)]
pub struct InMemoryDatabase {
    invoices: Arc<RwLock<HashMap<i64, Invoice>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryDatabase {
    /// Create an empty in-memory invoice store.
    pub fn new() -> Self {
        Self {
            invoices: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(0)),
        }
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InvoiceDatabase for InMemoryDatabase {
    async fn save(&self, invoice: &Invoice) -> DatabaseResult<Invoice> {
        let mut invoices = self
            .invoices
            .write()
            .map_err(|_| lock_poisoned("write"))?;

        match invoice.id.filter(|id| invoices.contains_key(id)) {
            Some(id) => {
                debug!(id, "updating invoice in memory");
                let updated = invoice.with_id(id);
                invoices.insert(id, updated.clone());
                Ok(updated)
            }
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(id, "inserting invoice into memory");
                let inserted = invoice.with_id(id);
                invoices.insert(id, inserted.clone());
                Ok(inserted)
            }
        }
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let mut invoices = self
            .invoices
            .write()
            .map_err(|_| lock_poisoned("write"))?;

        if invoices.remove(&id).is_none() {
            error!(id, "attempt to delete a non-existing invoice");
            return Err(DatabaseError::not_found_invoice(id));
        }
        debug!(id, "invoice deleted");
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<Invoice>> {
        let invoices = self.invoices.read().map_err(|_| lock_poisoned("read"))?;
        Ok(invoices.get(&id).cloned())
    }

    async fn get_by_number(&self, number: &str) -> DatabaseResult<Option<Invoice>> {
        let invoices = self.invoices.read().map_err(|_| lock_poisoned("read"))?;
        Ok(invoices.values().find(|i| i.number == number).cloned())
    }

    async fn get_all(&self) -> DatabaseResult<Vec<Invoice>> {
        let invoices = self.invoices.read().map_err(|_| lock_poisoned("read"))?;
        Ok(invoices.values().cloned().collect())
    }

    async fn delete_all(&self) -> DatabaseResult<()> {
        let mut invoices = self
            .invoices
            .write()
            .map_err(|_| lock_poisoned("write"))?;
        invoices.clear();
        debug!("all invoices deleted");
        Ok(())
    }

    async fn exists(&self, id: i64) -> DatabaseResult<bool> {
        let invoices = self.invoices.read().map_err(|_| lock_poisoned("read"))?;
        Ok(invoices.contains_key(&id))
    }

    async fn count(&self) -> DatabaseResult<u64> {
        let invoices = self.invoices.read().map_err(|_| lock_poisoned("read"))?;
        Ok(invoices.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// InMemoryUserDatabase
// ---------------------------------------------------------------------------

/// In-memory user store with the same locking discipline.
#[derive(Clone)]
pub struct InMemoryUserDatabase {
    users: Arc<RwLock<HashMap<i64, User>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryUserDatabase {
    /// Create an empty in-memory user store.
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(0)),
        }
    }
}

impl Default for InMemoryUserDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDatabase for InMemoryUserDatabase {
    async fn save(&self, user: &User) -> DatabaseResult<User> {
        if user.email.is_empty() {
            return Err(DatabaseError::InvalidArgument(
                "user email cannot be empty".to_string(),
            ));
        }
        let mut users = self.users.write().map_err(|_| lock_poisoned("write"))?;

        match user.id.filter(|id| users.contains_key(id)) {
            Some(id) => {
                debug!(id, "updating user in memory");
                let updated = user.with_id(id);
                users.insert(id, updated.clone());
                Ok(updated)
            }
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(id, "inserting user into memory");
                let inserted = user.with_id(id);
                users.insert(id, inserted.clone());
                Ok(inserted)
            }
        }
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let mut users = self.users.write().map_err(|_| lock_poisoned("write"))?;
        if users.remove(&id).is_none() {
            return Err(DatabaseError::not_found_user(id));
        }
        Ok(())
    }

    async fn delete_by_email(&self, email: &str) -> DatabaseResult<()> {
        let mut users = self.users.write().map_err(|_| lock_poisoned("write"))?;
        let id = users
            .values()
            .find(|u| u.email == email)
            .and_then(|u| u.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("no user with email: {email}")))?;
        users.remove(&id);
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let users = self.users.read().map_err(|_| lock_poisoned("read"))?;
        Ok(users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let users = self.users.read().map_err(|_| lock_poisoned("read"))?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_all(&self) -> DatabaseResult<Vec<User>> {
        let users = self.users.read().map_err(|_| lock_poisoned("read"))?;
        Ok(users.values().cloned().collect())
    }

    async fn delete_all(&self) -> DatabaseResult<()> {
        let mut users = self.users.write().map_err(|_| lock_poisoned("write"))?;
        users.clear();
        Ok(())
    }

    async fn exists_by_id(&self, id: i64) -> DatabaseResult<bool> {
        let users = self.users.read().map_err(|_| lock_poisoned("read"))?;
        Ok(users.contains_key(&id))
    }

    async fn exists_by_email(&self, email: &str) -> DatabaseResult<bool> {
        let users = self.users.read().map_err(|_| lock_poisoned("read"))?;
        Ok(users.values().any(|u| u.email == email))
    }

    async fn count(&self) -> DatabaseResult<u64> {
        let users = self.users.read().map_err(|_| lock_poisoned("read"))?;
        Ok(users.len() as u64)
    }
}
