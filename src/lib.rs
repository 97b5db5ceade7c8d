//! # carelink
//!
//! Patient/clinician health-records portal.
//!
//! This crate provides:
//! - Patient and clinician accounts with Argon2id credentials
//! - Medical history, vaccine and family-member records owned by one account
//! - Time-limited, patient-initiated doctor access grants with notifications
//! - A JSON HTTP API over an injectable record store (SQLite or in-memory)
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (Account, records, AccessGrant, Notification)
//! - `ports`: Trait definitions for persistence
//! - `adapters`: Concrete implementations (SQLite, in-memory, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `http`: axum routes, sessions and error mapping
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod http;
pub mod ports;

pub use adapters::StorageError;
pub use config::PortalConfig;

/// Main error type for carelink
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidTarget(String),

    #[error("Password hashing failed: {0}")]
    Password(#[from] domain::PasswordError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),
}

impl PortalError {
    /// Lift a backend error, keeping uniqueness violations visible as `Conflict`.
    pub fn storage<E: Into<adapters::StorageError>>(err: E) -> Self {
        match err.into() {
            adapters::StorageError::Conflict(message) => Self::Conflict(message),
            other => Self::Storage(other),
        }
    }

    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation(errors)
    }
}
