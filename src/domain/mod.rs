//! Domain layer: Core business types and logic.
//!
//! This module contains plain Rust types with no I/O. All inputs are
//! validated explicitly per operation.

mod access;
mod account;
mod notification;
pub mod password;
mod records;

pub use access::{AccessGrant, GrantId, GrantStatus, NewGrant};
pub use account::{
    Account, AccountDetails, AccountId, AccountView, ClinicianProfile, ClinicianRegistration,
    NewAccount, PatientSummary, Registration, Role,
};
pub use notification::{NewNotification, Notification, NotificationId, NotificationKind};
pub use password::{Password, PasswordError};
pub use records::{
    FamilyMember, HistoryStatus, MedicalHistoryEntry, NewFamilyMember, NewMedicalHistory,
    NewVaccine, VaccineEntry,
};

use chrono::NaiveDate;

fn require_text(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{field} is required"));
    }
}

/// Calendar dates arrive without a zone. A date is rejected only once it is
/// past tomorrow in UTC, so clients ahead of UTC can enter their own today.
fn require_not_future(errors: &mut Vec<String>, field: &str, value: NaiveDate) {
    let latest = (chrono::Utc::now() + chrono::Duration::days(1)).date_naive();
    if value > latest {
        errors.push(format!("{field} {value} is in the future"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_not_future_allows_clients_ahead_of_utc() {
        let mut errors = Vec::new();
        let today = Utc::now().date_naive();
        require_not_future(&mut errors, "dateAdministered", today);
        require_not_future(&mut errors, "dateAdministered", today + Duration::days(1));
        assert!(errors.is_empty());

        require_not_future(&mut errors, "dateAdministered", today + Duration::days(3));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("is in the future"));
    }
}
