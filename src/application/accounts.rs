//! Account service: registration, credential checks and the clinician
//! directory.

use std::sync::Arc;

use crate::domain::password::{hash_password, verify_password};
use crate::domain::{
    Account, AccountId, ClinicianRegistration, NewAccount, Password, Registration,
};
use crate::ports::RecordStore;
use crate::PortalError;

pub struct AccountService<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RecordStore> AccountService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a patient or clinician account.
    ///
    /// # Errors
    /// `Validation` for a malformed payload, `Conflict` if the username or
    /// license number is taken.
    pub fn register(&self, registration: Registration) -> Result<Account, PortalError> {
        registration.validate().map_err(PortalError::validation)?;

        let details = registration.details();
        let username = details.username.trim();

        if self
            .store
            .find_account_by_username(username)
            .map_err(PortalError::storage)?
            .is_some()
        {
            return Err(PortalError::Conflict("Username already exists".to_string()));
        }

        let role = registration.role();
        if let Some(profile) = role.clinician_profile() {
            if self
                .store
                .find_clinician_by_license(&profile.license_number)
                .map_err(PortalError::storage)?
                .is_some()
            {
                return Err(PortalError::Conflict(
                    "License number already registered".to_string(),
                ));
            }
        }

        let password_hash = hash_password(&details.password)?;
        let account = self
            .store
            .create_account(NewAccount {
                username: username.to_string(),
                password_hash,
                full_name: details.full_name.trim().to_string(),
                date_of_birth: details.date_of_birth,
                gender: details.gender.trim().to_string(),
                blood_type: details
                    .blood_type
                    .as_deref()
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .map(str::to_string),
                role,
            })
            .map_err(PortalError::storage)?;

        tracing::info!(
            "Registered account {} (clinician: {})",
            account.id,
            account.is_clinician()
        );
        Ok(account)
    }

    /// Clinician-only registration form.
    ///
    /// # Errors
    /// Same as [`AccountService::register`].
    pub fn register_clinician(
        &self,
        registration: ClinicianRegistration,
    ) -> Result<Account, PortalError> {
        self.register(Registration::Clinician(registration))
    }

    /// Check a username/password pair.
    ///
    /// # Errors
    /// `Unauthorized` for an unknown user or wrong password.
    pub fn authenticate(&self, username: &str, password: &Password) -> Result<Account, PortalError> {
        let Some(account) = self
            .store
            .find_account_by_username(username.trim())
            .map_err(PortalError::storage)?
        else {
            tracing::info!("Login rejected: unknown username");
            return Err(PortalError::Unauthorized);
        };

        if verify_password(password, &account.password_hash)? {
            tracing::info!("Account {} logged in", account.id);
            Ok(account)
        } else {
            tracing::info!("Login rejected for account {}", account.id);
            Err(PortalError::Unauthorized)
        }
    }

    /// # Errors
    /// `NotFound` if no such account exists.
    pub fn get(&self, id: AccountId) -> Result<Account, PortalError> {
        self.store
            .get_account(id)
            .map_err(PortalError::storage)?
            .ok_or_else(|| PortalError::NotFound("User not found".to_string()))
    }

    /// # Errors
    /// Returns error if storage operation fails.
    pub fn list_clinicians(&self) -> Result<Vec<Account>, PortalError> {
        self.store.list_clinicians().map_err(PortalError::storage)
    }

    /// Directory lookup by license number.
    ///
    /// # Errors
    /// `NotFound` if no clinician holds that license.
    pub fn find_clinician_by_license(&self, license_number: &str) -> Result<Account, PortalError> {
        self.store
            .find_clinician_by_license(license_number.trim())
            .map_err(PortalError::storage)?
            .ok_or_else(|| PortalError::NotFound("Doctor not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::domain::AccountDetails;
    use chrono::NaiveDate;

    fn details(username: &str, password: &str) -> AccountDetails {
        AccountDetails {
            username: username.to_string(),
            password: Password::new(password),
            full_name: format!("{username} Smith"),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 3, 14).expect("valid date"),
            gender: "female".to_string(),
            blood_type: Some(" O+ ".to_string()),
        }
    }

    fn clinician(username: &str, license: &str) -> ClinicianRegistration {
        ClinicianRegistration {
            details: details(username, "stethoscope"),
            license_number: license.to_string(),
            specialization: "Cardiology".to_string(),
            hospital: "General".to_string(),
        }
    }

    fn service() -> AccountService<MemoryStore> {
        AccountService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_register_and_authenticate() {
        let service = service();
        let account = service
            .register(Registration::Patient(details("alice", "correct horse")))
            .expect("Should register");
        assert!(!account.is_clinician());
        assert_eq!(account.blood_type.as_deref(), Some("O+"));
        assert!(account.password_hash.starts_with("$argon2id$"));

        let logged_in = service
            .authenticate("alice", &Password::new("correct horse"))
            .expect("Should authenticate");
        assert_eq!(logged_in.id, account.id);

        let wrong = service.authenticate("alice", &Password::new("battery staple"));
        assert!(matches!(wrong, Err(PortalError::Unauthorized)));

        let unknown = service.authenticate("mallory", &Password::new("correct horse"));
        assert!(matches!(unknown, Err(PortalError::Unauthorized)));
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let service = service();
        service
            .register(Registration::Patient(details("alice", "pw")))
            .expect("Should register");

        let err = service
            .register(Registration::Patient(details("alice", "other")))
            .expect_err("Should reject duplicate");
        assert!(matches!(err, PortalError::Conflict(ref m) if m == "Username already exists"));
    }

    #[test]
    fn test_clinician_directory() {
        let service = service();
        let house = service
            .register_clinician(clinician("house", "MD-100"))
            .expect("Should register");
        assert!(house.is_clinician());

        let found = service
            .find_clinician_by_license("MD-100")
            .expect("Should find");
        assert_eq!(found.id, house.id);
        assert!(matches!(
            service.find_clinician_by_license("MD-404"),
            Err(PortalError::NotFound(_))
        ));

        let duplicate = service.register_clinician(clinician("wilson", "MD-100"));
        assert!(matches!(duplicate, Err(PortalError::Conflict(_))));

        assert_eq!(service.list_clinicians().expect("Should list").len(), 1);
    }

    #[test]
    fn test_invalid_registration_rejected() {
        let service = service();
        let mut registration = clinician("house", "  ");
        registration.hospital = String::new();

        let err = service
            .register_clinician(registration)
            .expect_err("Should reject");
        match err {
            PortalError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_get_missing_account() {
        let service = service();
        assert!(matches!(service.get(AccountId(7)), Err(PortalError::NotFound(_))));
    }
}
