//! In-memory adapter: Implementation of RecordStore.
//!
//! Process-local tables behind a single `RwLock`. Used for development runs
//! (`CARELINK_STORAGE=memory`) and as the fake in service tests.
//!
//! Data does not survive a restart.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::StorageError;
use crate::domain::{
    AccessGrant, Account, AccountId, FamilyMember, GrantId, MedicalHistoryEntry, NewAccount,
    NewFamilyMember, NewGrant, NewMedicalHistory, NewNotification, NewVaccine, Notification,
    NotificationId, VaccineEntry,
};
use crate::ports::RecordStore;

#[derive(Default)]
struct Sequences {
    account: i64,
    history: i64,
    vaccine: i64,
    family: i64,
    grant: i64,
    notification: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    medical_history: Vec<MedicalHistoryEntry>,
    vaccines: Vec<VaccineEntry>,
    family_members: Vec<FamilyMember>,
    grants: BTreeMap<GrantId, AccessGrant>,
    notifications: BTreeMap<NotificationId, Notification>,
    sequences: Sequences,
}

/// In-memory storage adapter.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.tables.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        self.tables.write().map_err(|_| StorageError::LockPoisoned)
    }
}

impl RecordStore for MemoryStore {
    type Error = StorageError;

    fn create_account(&self, account: NewAccount) -> Result<Account, Self::Error> {
        let mut tables = self.write()?;

        if tables
            .accounts
            .values()
            .any(|existing| existing.username == account.username)
        {
            return Err(StorageError::Conflict("username already exists".to_string()));
        }
        if let Some(profile) = account.role.clinician_profile() {
            let taken = tables.accounts.values().any(|existing| {
                existing
                    .role
                    .clinician_profile()
                    .is_some_and(|p| p.license_number == profile.license_number)
            });
            if taken {
                return Err(StorageError::Conflict(
                    "license number already registered".to_string(),
                ));
            }
        }

        let id = AccountId(next(&mut tables.sequences.account));
        let account = account.into_account(id);
        tables.accounts.insert(id, account.clone());
        Ok(account)
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, Self::Error> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, Self::Error> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|account| account.username == username)
            .cloned())
    }

    fn find_clinician_by_license(
        &self,
        license_number: &str,
    ) -> Result<Option<Account>, Self::Error> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|account| {
                account
                    .role
                    .clinician_profile()
                    .is_some_and(|p| p.license_number == license_number)
            })
            .cloned())
    }

    fn list_clinicians(&self) -> Result<Vec<Account>, Self::Error> {
        Ok(self
            .read()?
            .accounts
            .values()
            .filter(|account| account.is_clinician())
            .cloned()
            .collect())
    }

    fn add_medical_history(
        &self,
        owner: AccountId,
        entry: NewMedicalHistory,
    ) -> Result<MedicalHistoryEntry, Self::Error> {
        let mut tables = self.write()?;
        let entry = entry.into_entry(next(&mut tables.sequences.history), owner);
        tables.medical_history.push(entry.clone());
        Ok(entry)
    }

    fn list_medical_history(
        &self,
        owner: AccountId,
    ) -> Result<Vec<MedicalHistoryEntry>, Self::Error> {
        Ok(self
            .read()?
            .medical_history
            .iter()
            .filter(|entry| entry.user_id == owner)
            .cloned()
            .collect())
    }

    fn add_vaccine(
        &self,
        owner: AccountId,
        vaccine: NewVaccine,
    ) -> Result<VaccineEntry, Self::Error> {
        let mut tables = self.write()?;
        let entry = vaccine.into_entry(next(&mut tables.sequences.vaccine), owner);
        tables.vaccines.push(entry.clone());
        Ok(entry)
    }

    fn list_vaccines(&self, owner: AccountId) -> Result<Vec<VaccineEntry>, Self::Error> {
        Ok(self
            .read()?
            .vaccines
            .iter()
            .filter(|entry| entry.user_id == owner)
            .cloned()
            .collect())
    }

    fn add_family_member(
        &self,
        owner: AccountId,
        member: NewFamilyMember,
    ) -> Result<FamilyMember, Self::Error> {
        let mut tables = self.write()?;
        let member = member.into_entry(next(&mut tables.sequences.family), owner);
        tables.family_members.push(member.clone());
        Ok(member)
    }

    fn list_family_members(&self, owner: AccountId) -> Result<Vec<FamilyMember>, Self::Error> {
        Ok(self
            .read()?
            .family_members
            .iter()
            .filter(|member| member.user_id == owner)
            .cloned()
            .collect())
    }

    fn create_grant(&self, grant: NewGrant) -> Result<AccessGrant, Self::Error> {
        let mut tables = self.write()?;
        let id = GrantId(next(&mut tables.sequences.grant));
        let grant = grant.into_grant(id);
        tables.grants.insert(id, grant.clone());
        Ok(grant)
    }

    fn get_grant(&self, id: GrantId) -> Result<Option<AccessGrant>, Self::Error> {
        Ok(self.read()?.grants.get(&id).cloned())
    }

    fn resolve_grant(
        &self,
        id: GrantId,
        clinician: AccountId,
        accepted: bool,
    ) -> Result<Option<AccessGrant>, Self::Error> {
        let mut tables = self.write()?;
        match tables.grants.get_mut(&id) {
            Some(grant) if grant.clinician_id == clinician => {
                if grant.resolve(accepted).is_ok() {
                    Ok(Some(grant.clone()))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }

    fn deactivate_grant(&self, id: GrantId) -> Result<bool, Self::Error> {
        let mut tables = self.write()?;
        Ok(tables
            .grants
            .get_mut(&id)
            .is_some_and(AccessGrant::deactivate))
    }

    fn grants_for_patient(&self, patient: AccountId) -> Result<Vec<AccessGrant>, Self::Error> {
        Ok(self
            .read()?
            .grants
            .values()
            .rev()
            .filter(|grant| grant.patient_id == patient)
            .cloned()
            .collect())
    }

    fn grants_for_clinician(&self, clinician: AccountId) -> Result<Vec<AccessGrant>, Self::Error> {
        Ok(self
            .read()?
            .grants
            .values()
            .filter(|grant| grant.clinician_id == clinician)
            .cloned()
            .collect())
    }

    fn add_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, Self::Error> {
        let mut tables = self.write()?;
        let id = NotificationId(next(&mut tables.sequences.notification));
        let notification = notification.into_notification(id);
        tables.notifications.insert(id, notification.clone());
        Ok(notification)
    }

    fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>, Self::Error> {
        Ok(self.read()?.notifications.get(&id).cloned())
    }

    fn list_notifications(&self, recipient: AccountId) -> Result<Vec<Notification>, Self::Error> {
        // Ids grow with creation time, so reverse id order is newest first.
        Ok(self
            .read()?
            .notifications
            .values()
            .rev()
            .filter(|notification| notification.user_id == recipient)
            .cloned()
            .collect())
    }

    fn mark_notification_read(&self, id: NotificationId) -> Result<bool, Self::Error> {
        let mut tables = self.write()?;
        match tables.notifications.get_mut(&id) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClinicianProfile, HistoryStatus, Role};
    use chrono::NaiveDate;

    fn new_account(username: &str, license: Option<&str>) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            full_name: format!("{username} test"),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 1).expect("valid date"),
            gender: "other".to_string(),
            blood_type: None,
            role: match license {
                Some(license) => Role::Clinician(ClinicianProfile {
                    license_number: license.to_string(),
                    specialization: "General".to_string(),
                    hospital: "General Hospital".to_string(),
                }),
                None => Role::Patient,
            },
        }
    }

    #[test]
    fn test_sequential_ids_and_unique_username() {
        let store = MemoryStore::new();

        let first = store.create_account(new_account("alice", None)).expect("Should create");
        let second = store.create_account(new_account("bob", None)).expect("Should create");
        assert_eq!(first.id, AccountId(1));
        assert_eq!(second.id, AccountId(2));

        let duplicate = store.create_account(new_account("alice", None));
        assert!(matches!(duplicate, Err(StorageError::Conflict(_))));
    }

    #[test]
    fn test_license_lookup_is_unique() {
        let store = MemoryStore::new();
        store
            .create_account(new_account("house", Some("MD-100")))
            .expect("Should create");

        let duplicate = store.create_account(new_account("wilson", Some("MD-100")));
        assert!(matches!(duplicate, Err(StorageError::Conflict(_))));

        let found = store
            .find_clinician_by_license("MD-100")
            .expect("Should query")
            .expect("Should exist");
        assert_eq!(found.username, "house");
        assert!(store.find_clinician_by_license("MD-999").expect("Should query").is_none());
        assert_eq!(store.list_clinicians().expect("Should list").len(), 1);
    }

    #[test]
    fn test_history_scoped_by_owner() {
        let store = MemoryStore::new();
        let entry = NewMedicalHistory {
            condition: "Asthma".to_string(),
            diagnosis_date: NaiveDate::from_ymd_opt(2010, 4, 2).expect("valid date"),
            notes: None,
            status: HistoryStatus::Chronic,
        };

        store.add_medical_history(AccountId(1), entry.clone()).expect("Should add");
        store.add_medical_history(AccountId(2), entry).expect("Should add");

        let mine = store.list_medical_history(AccountId(1)).expect("Should list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, AccountId(1));
    }

    #[test]
    fn test_grant_answered_once() {
        let store = MemoryStore::new();
        let grant = store
            .create_grant(NewGrant {
                patient_id: AccountId(1),
                clinician_id: AccountId(2),
                created_at: chrono::Utc::now(),
                expires_at: None,
            })
            .expect("Should create grant");

        assert!(store
            .resolve_grant(grant.id, AccountId(3), true)
            .expect("Should run")
            .is_none());

        let accepted = store
            .resolve_grant(grant.id, AccountId(2), true)
            .expect("Should run")
            .expect("Should resolve pending grant");
        assert!(accepted.is_active);

        // A second answer against the same id sees it already answered.
        assert!(store
            .resolve_grant(grant.id, AccountId(2), false)
            .expect("Should run")
            .is_none());
        let stored = store
            .get_grant(grant.id)
            .expect("Should load")
            .expect("Should exist");
        assert_eq!(stored.status, crate::domain::GrantStatus::Accepted);

        assert!(store.deactivate_grant(grant.id).expect("Should run"));
        assert!(!store.deactivate_grant(grant.id).expect("Should run"));
        assert!(!store.deactivate_grant(GrantId(99)).expect("Should run"));
    }

    #[test]
    fn test_mark_read_missing_notification() {
        let store = MemoryStore::new();
        assert!(!store.mark_notification_read(NotificationId(42)).expect("Should run"));
    }
}
