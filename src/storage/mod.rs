//! Storage implementations for different backends

pub mod in_file;
pub mod in_memory;
pub mod line_file;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;
#[cfg(feature = "orm")]
pub mod orm;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_file::InFileDatabase;
pub use in_memory::{InMemoryDatabase, InMemoryUserDatabase};
pub use line_file::LineFile;
#[cfg(feature = "mongodb_backend")]
pub use mongodb::{MongoDatabase, MongoUserDatabase};
#[cfg(feature = "orm")]
pub use orm::{OrmDatabase, OrmUserDatabase};
#[cfg(feature = "postgres")]
pub use postgres::PostgresDatabase;
