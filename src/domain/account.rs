//! Account types: patients and clinicians.
//!
//! An account's role is fixed at registration. Clinicians carry a
//! professional profile (license number, specialization, hospital) that
//! patients never have.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::password::Password;
use super::{require_not_future, require_text};

/// Synthetic sequential account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Professional details only clinicians have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicianProfile {
    pub license_number: String,
    pub specialization: String,
    pub hospital: String,
}

/// Account role, immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Patient,
    Clinician(ClinicianProfile),
}

impl Role {
    #[must_use]
    pub fn is_clinician(&self) -> bool {
        matches!(self, Self::Clinician(_))
    }

    #[must_use]
    pub fn clinician_profile(&self) -> Option<&ClinicianProfile> {
        match self {
            Self::Clinician(profile) => Some(profile),
            Self::Patient => None,
        }
    }
}

/// A stored account.
///
/// Deliberately not `Serialize`: use [`AccountView`] for anything that leaves
/// the process so the password hash can never be emitted.
#[derive(Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub blood_type: Option<String>,
    pub role: Role,
}

impl Account {
    #[must_use]
    pub fn is_clinician(&self) -> bool {
        self.role.is_clinician()
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Account fields as handed to the record store (id not yet assigned).
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub blood_type: Option<String>,
    pub role: Role,
}

impl NewAccount {
    /// Attach the id assigned by the store.
    #[must_use]
    pub fn into_account(self, id: AccountId) -> Account {
        Account {
            id,
            username: self.username,
            password_hash: self.password_hash,
            full_name: self.full_name,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            blood_type: self.blood_type,
            role: self.role,
        }
    }
}

/// Fields shared by every registration payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    pub username: String,
    pub password: Password,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    #[serde(default)]
    pub blood_type: Option<String>,
}

impl AccountDetails {
    fn collect_errors(&self, errors: &mut Vec<String>) {
        require_text(errors, "username", &self.username);
        if self.password.is_empty() {
            errors.push("password is required".to_string());
        }
        require_text(errors, "fullName", &self.full_name);
        require_text(errors, "gender", &self.gender);
        require_not_future(errors, "dateOfBirth", self.date_of_birth);
    }
}

/// Clinician registration payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicianRegistration {
    #[serde(flatten)]
    pub details: AccountDetails,
    pub license_number: String,
    pub specialization: String,
    pub hospital: String,
}

impl ClinicianRegistration {
    #[must_use]
    pub fn profile(&self) -> ClinicianProfile {
        ClinicianProfile {
            license_number: self.license_number.trim().to_string(),
            specialization: self.specialization.trim().to_string(),
            hospital: self.hospital.trim().to_string(),
        }
    }
}

/// Registration payload, tagged by role.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Registration {
    Patient(AccountDetails),
    Clinician(ClinicianRegistration),
}

impl Registration {
    #[must_use]
    pub fn details(&self) -> &AccountDetails {
        match self {
            Self::Patient(details) => details,
            Self::Clinician(registration) => &registration.details,
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::Patient(_) => Role::Patient,
            Self::Clinician(registration) => Role::Clinician(registration.profile()),
        }
    }

    /// Validate all fields.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        self.details().collect_errors(&mut errors);

        if let Self::Clinician(registration) = self {
            require_text(&mut errors, "licenseNumber", &registration.license_number);
            require_text(&mut errors, "specialization", &registration.specialization);
            require_text(&mut errors, "hospital", &registration.hospital);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Public projection of an account (no password hash).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub username: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub blood_type: Option<String>,
    pub is_doctor: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        let profile = account.role.clinician_profile();
        Self {
            id: account.id,
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            date_of_birth: account.date_of_birth,
            gender: account.gender.clone(),
            blood_type: account.blood_type.clone(),
            is_doctor: account.is_clinician(),
            license_number: profile.map(|p| p.license_number.clone()),
            specialization: profile.map(|p| p.specialization.clone()),
            hospital: profile.map(|p| p.hospital.clone()),
        }
    }
}

/// The slice of a patient a clinician sees next to a pending request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: AccountId,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub blood_type: Option<String>,
}

impl From<&Account> for PatientSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            full_name: account.full_name.clone(),
            date_of_birth: account.date_of_birth,
            gender: account.gender.clone(),
            blood_type: account.blood_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clinician_json() -> serde_json::Value {
        serde_json::json!({
            "role": "clinician",
            "username": "drhouse",
            "password": "vicodin",
            "fullName": "Gregory House",
            "dateOfBirth": "1959-06-11",
            "gender": "male",
            "licenseNumber": "MD-100",
            "specialization": "Diagnostics",
            "hospital": "Princeton-Plainsboro"
        })
    }

    #[test]
    fn test_tagged_registration_parses_clinician() {
        let registration: Registration =
            serde_json::from_value(clinician_json()).expect("Should parse");

        assert!(registration.validate().is_ok());
        match registration.role() {
            Role::Clinician(profile) => assert_eq!(profile.license_number, "MD-100"),
            Role::Patient => panic!("expected clinician"),
        }
    }

    #[test]
    fn test_clinician_requires_license() {
        let mut value = clinician_json();
        value["licenseNumber"] = serde_json::json!("  ");
        let registration: Registration = serde_json::from_value(value).expect("Should parse");

        let errors = registration.validate().expect_err("Should reject blank license");
        assert!(errors.iter().any(|e| e.contains("licenseNumber")));
    }

    #[test]
    fn test_clinician_missing_fields_fail_to_parse() {
        let mut value = clinician_json();
        value
            .as_object_mut()
            .expect("object")
            .remove("hospital");
        assert!(serde_json::from_value::<Registration>(value).is_err());
    }

    #[test]
    fn test_patient_registration_ignores_role_profile() {
        let registration: Registration = serde_json::from_value(serde_json::json!({
            "role": "patient",
            "username": "alice",
            "password": "wonderland",
            "fullName": "Alice Liddell",
            "dateOfBirth": "1990-05-04",
            "gender": "female",
            "bloodType": "O+"
        }))
        .expect("Should parse");

        assert!(registration.validate().is_ok());
        assert_eq!(registration.role(), Role::Patient);
        assert_eq!(registration.details().blood_type.as_deref(), Some("O+"));
    }

    #[test]
    fn test_view_strips_password_hash() {
        let account = NewAccount {
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            full_name: "Alice Liddell".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 4).expect("valid date"),
            gender: "female".to_string(),
            blood_type: None,
            role: Role::Patient,
        }
        .into_account(AccountId(7));

        let json = serde_json::to_string(&AccountView::from(&account)).expect("Should serialize");
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"isDoctor\":false"));
        assert!(!json.contains("licenseNumber"));
        assert!(!format!("{account:?}").contains("argon2"));
    }
}
