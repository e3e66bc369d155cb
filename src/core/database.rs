//! Backend-agnostic persistence contracts.
//!
//! Every storage backend (in-memory, append-file, relational, document)
//! implements the same trait, so the service layer never knows which medium
//! it is talking to. All operations may block on I/O (disk, socket, driver);
//! callers tolerate this by awaiting.
//!
//! `save` is an upsert decided by presence: an entity with `id: None`, or an
//! id the store does not contain, is inserted under a freshly allocated id;
//! an entity whose id exists is replaced in full. The persisted copy
//! (carrying any generated ids) is always returned.

use async_trait::async_trait;

use crate::core::error::DatabaseError;
use crate::core::invoice::Invoice;
use crate::core::user::User;

/// Result alias for backend operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// The invoice persistence contract.
///
/// Implementations allocate ids, never callers: a `save` of an invoice with
/// an id absent from the store is an insert under a new id regardless of the
/// value supplied.
#[async_trait]
pub trait InvoiceDatabase: Send + Sync {
    /// Insert or update the aggregate; returns the persisted copy with all
    /// generated ids filled in.
    async fn save(&self, invoice: &Invoice) -> DatabaseResult<Invoice>;

    /// Remove the invoice. Fails with [`DatabaseError::NotFound`] when no
    /// invoice has this id.
    async fn delete(&self, id: i64) -> DatabaseResult<()>;

    /// Point lookup; absence is `Ok(None)`, never an error.
    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<Invoice>>;

    /// First invoice whose business number matches.
    async fn get_by_number(&self, number: &str) -> DatabaseResult<Option<Invoice>>;

    /// Full, unordered snapshot.
    async fn get_all(&self) -> DatabaseResult<Vec<Invoice>>;

    /// Empty the store.
    async fn delete_all(&self) -> DatabaseResult<()>;

    /// Presence check, independent of retrieval.
    async fn exists(&self, id: i64) -> DatabaseResult<bool>;

    /// Current cardinality.
    async fn count(&self) -> DatabaseResult<u64>;
}

/// The companion user persistence contract: the same upsert/lookup shape
/// applied to `User`/`Role` aggregates, with email as a secondary key.
#[async_trait]
pub trait UserDatabase: Send + Sync {
    async fn save(&self, user: &User) -> DatabaseResult<User>;

    async fn delete(&self, id: i64) -> DatabaseResult<()>;

    async fn delete_by_email(&self, email: &str) -> DatabaseResult<()>;

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    async fn get_all(&self) -> DatabaseResult<Vec<User>>;

    async fn delete_all(&self) -> DatabaseResult<()>;

    async fn exists_by_id(&self, id: i64) -> DatabaseResult<bool>;

    async fn exists_by_email(&self, email: &str) -> DatabaseResult<bool>;

    async fn count(&self) -> DatabaseResult<u64>;
}
