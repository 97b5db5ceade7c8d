//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `sqlite`: SQLite for durable storage
//! - `memory`: process-local tables for development and tests
//! - `sanitize`: PII and credential filtering for logs

mod error;
pub mod memory;
pub mod sanitize;
pub mod sqlite;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
