//! Owned health records: medical history, vaccines, family members.
//!
//! Every entry belongs to exactly one account and is append-only. Input
//! structs carry no owner field; the owner is always the authenticated caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::{require_not_future, require_text};

/// Clinical status of a medical-history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Active,
    Resolved,
    Chronic,
}

impl HistoryStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Chronic => "chronic",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "resolved" => Some(Self::Resolved),
            "chronic" => Some(Self::Chronic),
            _ => None,
        }
    }
}

impl std::fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistoryEntry {
    pub id: i64,
    pub user_id: AccountId,
    pub condition: String,
    pub diagnosis_date: NaiveDate,
    pub notes: Option<String>,
    pub status: HistoryStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicalHistory {
    pub condition: String,
    pub diagnosis_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: HistoryStatus,
}

impl NewMedicalHistory {
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        require_text(&mut errors, "condition", &self.condition);
        require_not_future(&mut errors, "diagnosisDate", self.diagnosis_date);
        finish(errors)
    }

    #[must_use]
    pub fn into_entry(self, id: i64, owner: AccountId) -> MedicalHistoryEntry {
        MedicalHistoryEntry {
            id,
            user_id: owner,
            condition: self.condition,
            diagnosis_date: self.diagnosis_date,
            notes: self.notes,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineEntry {
    pub id: i64,
    pub user_id: AccountId,
    pub name: String,
    pub date_administered: NaiveDate,
    pub provider: Option<String>,
    pub batch_number: Option<String>,
    pub next_due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVaccine {
    pub name: String,
    pub date_administered: NaiveDate,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
}

impl NewVaccine {
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        require_text(&mut errors, "name", &self.name);
        require_not_future(&mut errors, "dateAdministered", self.date_administered);
        if let Some(due) = self.next_due_date {
            if due < self.date_administered {
                errors.push(format!(
                    "nextDueDate {due} is before dateAdministered {}",
                    self.date_administered
                ));
            }
        }
        finish(errors)
    }

    #[must_use]
    pub fn into_entry(self, id: i64, owner: AccountId) -> VaccineEntry {
        VaccineEntry {
            id,
            user_id: owner,
            name: self.name,
            date_administered: self.date_administered,
            provider: self.provider,
            batch_number: self.batch_number,
            next_due_date: self.next_due_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub id: i64,
    pub user_id: AccountId,
    pub name: String,
    pub relationship: String,
    pub date_of_birth: NaiveDate,
    pub has_access: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFamilyMember {
    pub name: String,
    pub relationship: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub has_access: bool,
}

impl NewFamilyMember {
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        require_text(&mut errors, "name", &self.name);
        require_text(&mut errors, "relationship", &self.relationship);
        require_not_future(&mut errors, "dateOfBirth", self.date_of_birth);
        finish(errors)
    }

    #[must_use]
    pub fn into_entry(self, id: i64, owner: AccountId) -> FamilyMember {
        FamilyMember {
            id,
            user_id: owner,
            name: self.name,
            relationship: self.relationship,
            date_of_birth: self.date_of_birth,
            has_access: self.has_access,
        }
    }
}

fn finish(errors: Vec<String>) -> Result<(), Vec<String>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(HistoryStatus::parse("chronic"), Some(HistoryStatus::Chronic));
        assert_eq!(HistoryStatus::parse("cured"), None);
        assert_eq!(HistoryStatus::Resolved.to_string(), "resolved");
    }

    #[test]
    fn test_history_ignores_client_owner() {
        let input: NewMedicalHistory = serde_json::from_value(serde_json::json!({
            "userId": 999,
            "condition": "Asthma",
            "diagnosisDate": "2015-03-01",
            "status": "chronic"
        }))
        .expect("Should parse");

        let entry = input.into_entry(1, AccountId(3));
        assert_eq!(entry.user_id, AccountId(3));
        assert!(entry.notes.is_none());
    }

    #[test]
    fn test_unknown_status_rejected() {
        let parsed = serde_json::from_value::<NewMedicalHistory>(serde_json::json!({
            "condition": "Asthma",
            "diagnosisDate": "2015-03-01",
            "status": "cured"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_vaccine_validation() {
        let valid = NewVaccine {
            name: "Tetanus".to_string(),
            date_administered: date(2020, 1, 10),
            provider: Some("City Clinic".to_string()),
            batch_number: None,
            next_due_date: Some(date(2030, 1, 10)),
        };
        assert!(valid.validate().is_ok());

        let invalid = NewVaccine {
            name: " ".to_string(),
            next_due_date: Some(date(2019, 1, 1)),
            ..valid
        };
        let errors = invalid.validate().expect_err("Should reject");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_family_member_defaults_access_flag() {
        let input: NewFamilyMember = serde_json::from_value(serde_json::json!({
            "name": "Bob",
            "relationship": "brother",
            "dateOfBirth": "1992-08-20"
        }))
        .expect("Should parse");

        assert!(!input.has_access);
        assert!(input.validate().is_ok());
    }
}
