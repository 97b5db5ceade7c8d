//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with the record-store port to
//! implement accounts, owned records, the access workflow and notifications.

mod access;
mod accounts;
mod guard;
mod notifications;
mod records;

pub use access::{AccessWorkflow, PendingRequest};
pub use accounts::AccountService;
pub use guard::{can_access, AuthorizationGuard};
pub use notifications::NotificationEmitter;
pub use records::RecordService;
