//! Storage port: Trait for record persistence.
//!
//! This trait abstracts the storage backend (in-memory maps or SQLite) from
//! the access workflow and authorization logic.

use crate::adapters::StorageError;
use crate::domain::{
    AccessGrant, Account, AccountId, FamilyMember, GrantId, MedicalHistoryEntry, NewAccount,
    NewFamilyMember, NewGrant, NewMedicalHistory, NewNotification, NewVaccine, Notification,
    NotificationId, VaccineEntry,
};

/// Trait for the record store.
///
/// Reads are scoped by owner id; writes take the owner id explicitly and
/// never trust an owner supplied by a client. Ids are assigned by the store
/// and are sequential per collection.
///
/// Each method is a single logical read or write. Implementations decide
/// their own locking; callers never hold anything across calls.
pub trait RecordStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Into<StorageError> + Send + Sync + 'static;

    /// Insert a new account.
    ///
    /// # Errors
    /// Returns a conflict error if the username, or a clinician's license
    /// number, is already taken.
    fn create_account(&self, account: NewAccount) -> Result<Account, Self::Error>;

    /// Point lookup by id.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn get_account(&self, id: AccountId) -> Result<Option<Account>, Self::Error>;

    /// Point lookup by unique username.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, Self::Error>;

    /// Clinician directory lookup by unique license number.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_clinician_by_license(&self, license_number: &str)
        -> Result<Option<Account>, Self::Error>;

    /// All clinician accounts, by id.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn list_clinicians(&self) -> Result<Vec<Account>, Self::Error>;

    /// # Errors
    /// Returns error if storage operation fails.
    fn add_medical_history(
        &self,
        owner: AccountId,
        entry: NewMedicalHistory,
    ) -> Result<MedicalHistoryEntry, Self::Error>;

    /// # Errors
    /// Returns error if storage operation fails.
    fn list_medical_history(&self, owner: AccountId)
        -> Result<Vec<MedicalHistoryEntry>, Self::Error>;

    /// # Errors
    /// Returns error if storage operation fails.
    fn add_vaccine(&self, owner: AccountId, vaccine: NewVaccine)
        -> Result<VaccineEntry, Self::Error>;

    /// # Errors
    /// Returns error if storage operation fails.
    fn list_vaccines(&self, owner: AccountId) -> Result<Vec<VaccineEntry>, Self::Error>;

    /// # Errors
    /// Returns error if storage operation fails.
    fn add_family_member(
        &self,
        owner: AccountId,
        member: NewFamilyMember,
    ) -> Result<FamilyMember, Self::Error>;

    /// # Errors
    /// Returns error if storage operation fails.
    fn list_family_members(&self, owner: AccountId) -> Result<Vec<FamilyMember>, Self::Error>;

    /// Insert a pending, inactive grant.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn create_grant(&self, grant: NewGrant) -> Result<AccessGrant, Self::Error>;

    /// # Errors
    /// Returns error if storage operation fails.
    fn get_grant(&self, id: GrantId) -> Result<Option<AccessGrant>, Self::Error>;

    /// Answer a grant that is still pending and addressed to `clinician`.
    ///
    /// The check and the write are one atomic step: of two concurrent
    /// answers, only one sees the grant pending. Returns the updated grant,
    /// or `None` if it is missing, addressed elsewhere or already answered.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn resolve_grant(
        &self,
        id: GrantId,
        clinician: AccountId,
        accepted: bool,
    ) -> Result<Option<AccessGrant>, Self::Error>;

    /// Clear the active flag of an accepted, active grant. Returns `false`
    /// if the grant was not in that state.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn deactivate_grant(&self, id: GrantId) -> Result<bool, Self::Error>;

    /// Every grant a patient has issued, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn grants_for_patient(&self, patient: AccountId) -> Result<Vec<AccessGrant>, Self::Error>;

    /// Every grant addressed to a clinician, oldest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn grants_for_clinician(&self, clinician: AccountId) -> Result<Vec<AccessGrant>, Self::Error>;

    /// # Errors
    /// Returns error if storage operation fails.
    fn add_notification(&self, notification: NewNotification)
        -> Result<Notification, Self::Error>;

    /// # Errors
    /// Returns error if storage operation fails.
    fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>, Self::Error>;

    /// A recipient's notifications, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn list_notifications(&self, recipient: AccountId) -> Result<Vec<Notification>, Self::Error>;

    /// Flip the read flag. Returns `false` if no such notification exists.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn mark_notification_read(&self, id: NotificationId) -> Result<bool, Self::Error>;
}
