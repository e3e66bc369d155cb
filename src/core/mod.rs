//! Core module containing the domain model, errors, and persistence contracts.

pub mod database;
pub mod error;
pub mod invoice;
pub mod user;

pub use database::{DatabaseResult, InvoiceDatabase, UserDatabase};
pub use error::{BoxedError, DatabaseError, ServiceError};
pub use invoice::{Company, Invoice, InvoiceEntry, Vat};
pub use user::{Role, User};
