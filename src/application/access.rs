//! Access workflow: patient-initiated, clinician-answered access grants.
//!
//! This service coordinates:
//! - Request creation (pending, inactive) and the clinician's notification
//! - The one-time accept/reject transition and the patient's notification
//! - Patient revocation of accepted grants
//! - The `check_access` query the authorization guard relies on
//!
//! Notification failures are logged and never undo a grant change.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::NotificationEmitter;
use crate::domain::{
    AccessGrant, Account, AccountId, GrantId, NewGrant, NotificationKind, PatientSummary,
};
use crate::ports::RecordStore;
use crate::PortalError;

/// A pending request joined with the requesting patient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingRequest {
    #[serde(flatten)]
    pub grant: AccessGrant,
    pub patient: PatientSummary,
}

pub struct AccessWorkflow<S: RecordStore> {
    store: Arc<S>,
    notifier: NotificationEmitter<S>,
}

impl<S: RecordStore> Clone for AccessWorkflow<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S: RecordStore> AccessWorkflow<S> {
    pub fn new(store: Arc<S>, notifier: NotificationEmitter<S>) -> Self {
        Self { store, notifier }
    }

    /// Ask a clinician (by account id) for access to the patient's records.
    ///
    /// # Errors
    /// `Forbidden` if the caller is a clinician, `InvalidTarget` if the id
    /// does not belong to a clinician.
    pub fn request_access(
        &self,
        patient: &Account,
        clinician_id: AccountId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessGrant, PortalError> {
        if patient.is_clinician() {
            return Err(PortalError::Forbidden("Doctors cannot grant access".to_string()));
        }

        let clinician = self
            .store
            .get_account(clinician_id)
            .map_err(PortalError::storage)?
            .filter(Account::is_clinician)
            .ok_or_else(|| PortalError::InvalidTarget("Invalid doctor ID".to_string()))?;

        self.open_request(patient, &clinician, expires_at)
    }

    /// Ask a clinician, looked up by license number, for access.
    ///
    /// # Errors
    /// `Forbidden` if the caller is a clinician, `InvalidTarget` if no
    /// clinician holds the license.
    pub fn request_access_by_license(
        &self,
        patient: &Account,
        license_number: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessGrant, PortalError> {
        if patient.is_clinician() {
            return Err(PortalError::Forbidden("Doctors cannot grant access".to_string()));
        }

        let clinician = self
            .store
            .find_clinician_by_license(license_number.trim())
            .map_err(PortalError::storage)?
            .ok_or_else(|| {
                PortalError::InvalidTarget("No doctor found with that license number".to_string())
            })?;

        self.open_request(patient, &clinician, expires_at)
    }

    fn open_request(
        &self,
        patient: &Account,
        clinician: &Account,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessGrant, PortalError> {
        let grant = self
            .store
            .create_grant(NewGrant {
                patient_id: patient.id,
                clinician_id: clinician.id,
                created_at: Utc::now(),
                expires_at,
            })
            .map_err(PortalError::storage)?;

        tracing::info!(
            "Access request {} opened: patient {} -> clinician {}",
            grant.id,
            patient.id,
            clinician.id
        );

        if let Err(e) = self.notifier.notify(
            clinician.id,
            "New access request",
            format!(
                "{} has requested that you access their medical records",
                patient.full_name
            ),
            NotificationKind::AccessRequest,
            Some(grant.id),
        ) {
            tracing::warn!("Failed to notify clinician about request {}: {}", grant.id, e);
        }

        Ok(grant)
    }

    /// Accept or reject a pending request addressed to the caller.
    ///
    /// # Errors
    /// `Forbidden` if the caller is not a clinician, `NotFound` if the grant
    /// is missing or addressed to someone else, `Conflict` if it was already
    /// answered.
    pub fn respond(
        &self,
        clinician: &Account,
        grant_id: GrantId,
        accepted: bool,
    ) -> Result<AccessGrant, PortalError> {
        if !clinician.is_clinician() {
            return Err(PortalError::Forbidden(
                "Only doctors can respond to access requests".to_string(),
            ));
        }

        let current = self
            .store
            .get_grant(grant_id)
            .map_err(PortalError::storage)?
            .filter(|grant| grant.clinician_id == clinician.id)
            .ok_or_else(|| PortalError::NotFound("Access request not found".to_string()))?;
        if !current.is_pending() {
            return Err(PortalError::Conflict(format!(
                "Access request already {}",
                current.status
            )));
        }

        // The store re-checks `pending`; a concurrent answer that got there
        // first leaves nothing to resolve.
        let grant = self
            .store
            .resolve_grant(grant_id, clinician.id, accepted)
            .map_err(PortalError::storage)?
            .ok_or_else(|| PortalError::Conflict("Access request already answered".to_string()))?;

        let verdict = grant.status.as_str();
        tracing::info!(
            "Access request {} {} by clinician {}",
            grant.id,
            verdict,
            clinician.id
        );

        if let Err(e) = self.notifier.notify(
            grant.patient_id,
            format!("Access request {verdict}"),
            format!("Dr. {} has {verdict} your access request", clinician.full_name),
            NotificationKind::AccessResponse,
            Some(grant.id),
        ) {
            tracing::warn!("Failed to notify patient about request {}: {}", grant.id, e);
        }

        Ok(grant)
    }

    /// Deactivate every accepted grant between the patient and a clinician.
    /// Returns how many grants changed; zero is not an error.
    ///
    /// # Errors
    /// `Forbidden` if the caller is a clinician.
    pub fn revoke(&self, patient: &Account, clinician_id: AccountId) -> Result<usize, PortalError> {
        if patient.is_clinician() {
            return Err(PortalError::Forbidden("Doctors cannot revoke access".to_string()));
        }

        let mut revoked = 0;
        for grant in self
            .store
            .grants_for_patient(patient.id)
            .map_err(PortalError::storage)?
            .into_iter()
            .filter(|grant| grant.clinician_id == clinician_id)
        {
            if self
                .store
                .deactivate_grant(grant.id)
                .map_err(PortalError::storage)?
            {
                revoked += 1;
            }
        }

        tracing::info!(
            "Patient {} revoked {} grant(s) for clinician {}",
            patient.id,
            revoked,
            clinician_id
        );
        Ok(revoked)
    }

    /// Whether any grant currently authorizes the clinician.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn check_access(&self, patient: AccountId, clinician: AccountId) -> Result<bool, PortalError> {
        self.check_access_at(patient, clinician, Utc::now())
    }

    /// [`AccessWorkflow::check_access`] against an explicit clock.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn check_access_at(
        &self,
        patient: AccountId,
        clinician: AccountId,
        now: DateTime<Utc>,
    ) -> Result<bool, PortalError> {
        Ok(self
            .store
            .grants_for_patient(patient)
            .map_err(PortalError::storage)?
            .iter()
            .any(|grant| grant.clinician_id == clinician && grant.authorizes_at(now)))
    }

    /// Pending requests addressed to the clinician, oldest first.
    ///
    /// # Errors
    /// `Forbidden` if the caller is not a clinician.
    pub fn pending_requests(&self, clinician: &Account) -> Result<Vec<PendingRequest>, PortalError> {
        if !clinician.is_clinician() {
            return Err(PortalError::Forbidden(
                "Only doctors can view access requests".to_string(),
            ));
        }

        let mut pending = Vec::new();
        for grant in self
            .store
            .grants_for_clinician(clinician.id)
            .map_err(PortalError::storage)?
            .into_iter()
            .filter(AccessGrant::is_pending)
        {
            match self
                .store
                .get_account(grant.patient_id)
                .map_err(PortalError::storage)?
            {
                Some(patient) => pending.push(PendingRequest {
                    patient: PatientSummary::from(&patient),
                    grant,
                }),
                None => tracing::warn!(
                    "Request {} references missing patient {}",
                    grant.id,
                    grant.patient_id
                ),
            }
        }
        Ok(pending)
    }

    /// Patients who currently authorize the clinician, each listed once.
    ///
    /// # Errors
    /// `Forbidden` if the caller is not a clinician.
    pub fn patients(&self, clinician: &Account) -> Result<Vec<Account>, PortalError> {
        if !clinician.is_clinician() {
            return Err(PortalError::Forbidden("Only doctors can view patients".to_string()));
        }

        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut patients = Vec::new();
        for grant in self
            .store
            .grants_for_clinician(clinician.id)
            .map_err(PortalError::storage)?
        {
            if !grant.authorizes_at(now) || !seen.insert(grant.patient_id) {
                continue;
            }
            if let Some(patient) = self
                .store
                .get_account(grant.patient_id)
                .map_err(PortalError::storage)?
            {
                patients.push(patient);
            }
        }

        tracing::debug!("Clinician {} has {} patient(s)", clinician.id, patients.len());
        Ok(patients)
    }

    /// Every grant the patient has issued, newest first.
    ///
    /// # Errors
    /// `Forbidden` if the caller is a clinician.
    pub fn grants_for(&self, patient: &Account) -> Result<Vec<AccessGrant>, PortalError> {
        if patient.is_clinician() {
            return Err(PortalError::Forbidden(
                "Only patients can list their grants".to_string(),
            ));
        }
        self.store
            .grants_for_patient(patient.id)
            .map_err(PortalError::storage)
    }
}
