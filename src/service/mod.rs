//! Business services layered over the storage contracts.

pub mod invoice;
pub mod user;

pub use invoice::InvoiceService;
pub use user::UserService;

use crate::core::error::ServiceError;

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
