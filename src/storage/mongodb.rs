//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Invoices and users live in their own collections. Documents keep the
//! driver-generated `ObjectId` under `_id` as a storage detail; the domain
//! id is a separate indexed numeric `id` field, allocated by an in-process
//! counter that is seeded on connect from the highest id already stored.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag:
//! ```toml
//! [dependencies]
//! faktura = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Serialization strategy
//!
//! Entities travel through `serde_json::Value` on their way to BSON, so
//! dates and decimal amounts are stored as their serde string forms and
//! round-trip without driver-specific types. `_id` is stripped when reading
//! a document back and never written by this module.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::FindOneOptions;
use mongodb::{Database, IndexModel};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::core::database::{DatabaseResult, InvoiceDatabase, UserDatabase};
use crate::core::error::DatabaseError;
use crate::core::invoice::Invoice;
use crate::core::user::User;

const INVOICES_COLLECTION: &str = "invoices";
const USERS_COLLECTION: &str = "users";

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Serialize a domain entity into a BSON document. The document carries the
/// numeric `id` field only; `_id` is left to the driver.
fn entity_to_document<T: Serialize>(entity: &T) -> DatabaseResult<Document> {
    let json = serde_json::to_value(entity)
        .map_err(|e| DatabaseError::Serialization(format!("failed to serialize entity: {e}")))?;
    let bson_val = mongodb::bson::to_bson(&json)
        .map_err(|e| DatabaseError::Serialization(format!("failed to convert to BSON: {e}")))?;

    match bson_val {
        Bson::Document(doc) => Ok(doc),
        _ => Err(DatabaseError::Serialization(
            "expected BSON document, got non-object".to_string(),
        )),
    }
}

/// Deserialize a stored document back into a domain entity, dropping the
/// storage-level `_id` first.
fn document_to_entity<T: DeserializeOwned>(mut doc: Document) -> DatabaseResult<T> {
    doc.remove("_id");
    let json = Bson::Document(doc).into_relaxed_extjson();
    serde_json::from_value(json)
        .map_err(|e| DatabaseError::Serialization(format!("failed to deserialize entity: {e}")))
}

/// Numeric id of a stored document, whatever integer width BSON chose.
fn stored_id(doc: &Document) -> Option<i64> {
    match doc.get("id") {
        Some(Bson::Int64(id)) => Some(*id),
        Some(Bson::Int32(id)) => Some(i64::from(*id)),
        _ => None,
    }
}

/// Highest stored numeric id in a collection, for seeding the allocator.
async fn max_stored_id(
    collection: &mongodb::Collection<Document>,
) -> DatabaseResult<i64> {
    let options = FindOneOptions::builder().sort(doc! { "id": -1 }).build();
    let doc = collection
        .find_one(doc! {})
        .with_options(options)
        .await
        .map_err(|e| DatabaseError::operation("failed to seed id counter", e))?;

    Ok(doc.as_ref().and_then(stored_id).unwrap_or(0))
}

// ---------------------------------------------------------------------------
// MongoDatabase
// ---------------------------------------------------------------------------

/// Invoice store backed by MongoDB.
///
/// # Example
///
/// ```rust,ignore
/// use mongodb::Client;
/// use faktura::storage::MongoDatabase;
///
/// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
/// let db = MongoDatabase::connect(client.database("faktura")).await?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoDatabase {
    database: Database,
    next_id: Arc<AtomicI64>,
}

impl MongoDatabase {
    /// Connect to the invoice collection, creating its index and seeding
    /// the id counter from the documents already present.
    pub async fn connect(database: Database) -> DatabaseResult<Self> {
        let db = Self {
            database,
            next_id: Arc::new(AtomicI64::new(0)),
        };

        db.collection()
            .create_index(IndexModel::builder().keys(doc! { "id": 1 }).build())
            .await
            .map_err(|e| DatabaseError::operation("failed to create invoice index", e))?;

        let max_id = max_stored_id(&db.collection()).await?;
        db.next_id.store(max_id, Ordering::SeqCst);
        debug!(max_id, "connected to invoice collection");
        Ok(db)
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(INVOICES_COLLECTION)
    }
}

#[async_trait]
impl InvoiceDatabase for MongoDatabase {
    async fn save(&self, invoice: &Invoice) -> DatabaseResult<Invoice> {
        if let Some(id) = invoice.id {
            if self.exists(id).await? {
                let updated = invoice.with_id(id);
                let doc = entity_to_document(&updated)?;
                self.collection()
                    .replace_one(doc! { "id": id }, doc)
                    .await
                    .map_err(|e| DatabaseError::operation("failed to update invoice", e))?;
                debug!(id, "invoice updated");
                return Ok(updated);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let inserted = invoice.with_id(id);
        let doc = entity_to_document(&inserted)?;
        self.collection()
            .insert_one(doc)
            .await
            .map_err(|e| DatabaseError::operation("failed to insert invoice", e))?;
        debug!(id, "invoice inserted");
        Ok(inserted)
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = self
            .collection()
            .delete_one(doc! { "id": id })
            .await
            .map_err(|e| DatabaseError::operation("failed to delete invoice", e))?;

        if result.deleted_count == 0 {
            error!(id, "attempt to delete a non-existing invoice");
            return Err(DatabaseError::not_found_invoice(id));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<Invoice>> {
        let doc = self
            .collection()
            .find_one(doc! { "id": id })
            .await
            .map_err(|e| DatabaseError::operation("failed to fetch invoice by id", e))?;

        doc.map(document_to_entity).transpose()
    }

    async fn get_by_number(&self, number: &str) -> DatabaseResult<Option<Invoice>> {
        let doc = self
            .collection()
            .find_one(doc! { "number": number })
            .await
            .map_err(|e| DatabaseError::operation("failed to fetch invoice by number", e))?;

        doc.map(document_to_entity).transpose()
    }

    async fn get_all(&self) -> DatabaseResult<Vec<Invoice>> {
        let docs: Vec<Document> = self
            .collection()
            .find(doc! {})
            .await
            .map_err(|e| DatabaseError::operation("failed to fetch invoices", e))?
            .try_collect()
            .await
            .map_err(|e| DatabaseError::operation("failed to read invoice cursor", e))?;

        docs.into_iter().map(document_to_entity).collect()
    }

    async fn delete_all(&self) -> DatabaseResult<()> {
        self.collection()
            .delete_many(doc! {})
            .await
            .map_err(|e| DatabaseError::operation("failed to delete all invoices", e))?;
        debug!("all invoices deleted");
        Ok(())
    }

    async fn exists(&self, id: i64) -> DatabaseResult<bool> {
        let doc = self
            .collection()
            .find_one(doc! { "id": id })
            .await
            .map_err(|e| DatabaseError::operation("failed to check invoice existence", e))?;
        Ok(doc.is_some())
    }

    async fn count(&self) -> DatabaseResult<u64> {
        self.collection()
            .count_documents(doc! {})
            .await
            .map_err(|e| DatabaseError::operation("failed to count invoices", e))
    }
}

// ---------------------------------------------------------------------------
// MongoUserDatabase
// ---------------------------------------------------------------------------

/// User store backed by MongoDB, with a unique index on `email`.
#[derive(Clone, Debug)]
pub struct MongoUserDatabase {
    database: Database,
    next_id: Arc<AtomicI64>,
}

impl MongoUserDatabase {
    /// Connect to the user collection, creating its indexes and seeding the
    /// id counter from the documents already present.
    pub async fn connect(database: Database) -> DatabaseResult<Self> {
        let db = Self {
            database,
            next_id: Arc::new(AtomicI64::new(0)),
        };

        let indexes = vec![
            IndexModel::builder().keys(doc! { "id": 1 }).build(),
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(
                    mongodb::options::IndexOptions::builder()
                        .unique(true)
                        .build(),
                )
                .build(),
        ];
        db.collection()
            .create_indexes(indexes)
            .await
            .map_err(|e| DatabaseError::operation("failed to create user indexes", e))?;

        let max_id = max_stored_id(&db.collection()).await?;
        db.next_id.store(max_id, Ordering::SeqCst);
        Ok(db)
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(USERS_COLLECTION)
    }
}

#[async_trait]
impl UserDatabase for MongoUserDatabase {
    async fn save(&self, user: &User) -> DatabaseResult<User> {
        if user.email.is_empty() {
            return Err(DatabaseError::InvalidArgument(
                "user email cannot be empty".to_string(),
            ));
        }

        if let Some(id) = user.id {
            if self.exists_by_id(id).await? {
                let updated = user.with_id(id);
                let doc = entity_to_document(&updated)?;
                self.collection()
                    .replace_one(doc! { "id": id }, doc)
                    .await
                    .map_err(|e| DatabaseError::operation("failed to update user", e))?;
                return Ok(updated);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let inserted = user.with_id(id);
        let doc = entity_to_document(&inserted)?;
        self.collection()
            .insert_one(doc)
            .await
            .map_err(|e| DatabaseError::operation("failed to insert user", e))?;
        Ok(inserted)
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = self
            .collection()
            .delete_one(doc! { "id": id })
            .await
            .map_err(|e| DatabaseError::operation("failed to delete user", e))?;

        if result.deleted_count == 0 {
            return Err(DatabaseError::not_found_user(id));
        }
        Ok(())
    }

    async fn delete_by_email(&self, email: &str) -> DatabaseResult<()> {
        let result = self
            .collection()
            .delete_one(doc! { "email": email })
            .await
            .map_err(|e| DatabaseError::operation("failed to delete user by email", e))?;

        if result.deleted_count == 0 {
            return Err(DatabaseError::NotFound(format!(
                "no user with email: {email}"
            )));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let doc = self
            .collection()
            .find_one(doc! { "id": id })
            .await
            .map_err(|e| DatabaseError::operation("failed to fetch user by id", e))?;

        doc.map(document_to_entity).transpose()
    }

    async fn get_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let doc = self
            .collection()
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| DatabaseError::operation("failed to fetch user by email", e))?;

        doc.map(document_to_entity).transpose()
    }

    async fn get_all(&self) -> DatabaseResult<Vec<User>> {
        let docs: Vec<Document> = self
            .collection()
            .find(doc! {})
            .await
            .map_err(|e| DatabaseError::operation("failed to fetch users", e))?
            .try_collect()
            .await
            .map_err(|e| DatabaseError::operation("failed to read user cursor", e))?;

        docs.into_iter().map(document_to_entity).collect()
    }

    async fn delete_all(&self) -> DatabaseResult<()> {
        self.collection()
            .delete_many(doc! {})
            .await
            .map_err(|e| DatabaseError::operation("failed to delete all users", e))?;
        Ok(())
    }

    async fn exists_by_id(&self, id: i64) -> DatabaseResult<bool> {
        let doc = self
            .collection()
            .find_one(doc! { "id": id })
            .await
            .map_err(|e| DatabaseError::operation("failed to check user existence", e))?;
        Ok(doc.is_some())
    }

    async fn exists_by_email(&self, email: &str) -> DatabaseResult<bool> {
        let doc = self
            .collection()
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| DatabaseError::operation("failed to check user existence", e))?;
        Ok(doc.is_some())
    }

    async fn count(&self) -> DatabaseResult<u64> {
        self.collection()
            .count_documents(doc! {})
            .await
            .map_err(|e| DatabaseError::operation("failed to count users", e))
    }
}
