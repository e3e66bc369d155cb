//! # Faktura
//!
//! An invoicing persistence engine with pluggable storage backends.
//!
//! ## Features
//!
//! - **One contract, many media**: every backend implements the same
//!   [`InvoiceDatabase`](core::InvoiceDatabase) trait, so services never
//!   know whether they talk to memory, a file, SQL or a document store
//! - **Store-owned identifiers**: backends allocate numeric ids; a save
//!   with an unknown id is an insert, never a write to a caller-chosen slot
//! - **Whole-aggregate saves**: an update replaces the invoice together
//!   with its entries and counterparties
//! - **Companion user store**: accounts with roles and an email secondary
//!   key, behind the matching [`UserDatabase`](core::UserDatabase) trait
//! - **Feature-gated backends**: the in-memory and append-file stores are
//!   always available; `postgres`, `orm` and `mongodb_backend` pull in
//!   their drivers only when asked for
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use faktura::prelude::*;
//!
//! let database = Arc::new(InMemoryDatabase::new());
//! let service = InvoiceService::new(database);
//!
//! let saved = service.add(&invoice).await?;
//! let fetched = service.get_by_number(&saved.number).await?;
//! ```

pub mod core;
pub mod service;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Domain model ===
    pub use crate::core::{Company, Invoice, InvoiceEntry, Role, User, Vat};

    // === Contracts and errors ===
    pub use crate::core::{
        DatabaseError, DatabaseResult, InvoiceDatabase, ServiceError, UserDatabase,
    };

    // === Services ===
    pub use crate::service::{InvoiceService, ServiceResult, UserService};

    // === Storage ===
    pub use crate::storage::{InFileDatabase, InMemoryDatabase, InMemoryUserDatabase};
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::{MongoDatabase, MongoUserDatabase};
    #[cfg(feature = "orm")]
    pub use crate::storage::{OrmDatabase, OrmUserDatabase};
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresDatabase;

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::NaiveDate;
    pub use rust_decimal::Decimal;
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
}
