//! Record service: owned medical history, vaccines and family members.
//!
//! Writes always land on the caller's own account. Reads of another
//! account's history or vaccines go through the authorization guard.

use std::sync::Arc;

use super::AuthorizationGuard;
use crate::domain::{
    Account, AccountId, FamilyMember, MedicalHistoryEntry, NewFamilyMember, NewMedicalHistory,
    NewVaccine, VaccineEntry,
};
use crate::ports::RecordStore;
use crate::PortalError;

pub struct RecordService<S: RecordStore> {
    store: Arc<S>,
    guard: AuthorizationGuard<S>,
}

impl<S: RecordStore> Clone for RecordService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            guard: self.guard.clone(),
        }
    }
}

impl<S: RecordStore> RecordService<S> {
    pub fn new(store: Arc<S>, guard: AuthorizationGuard<S>) -> Self {
        Self { store, guard }
    }

    /// # Errors
    /// `Validation` for a malformed entry.
    pub fn add_medical_history(
        &self,
        caller: &Account,
        entry: NewMedicalHistory,
    ) -> Result<MedicalHistoryEntry, PortalError> {
        entry.validate().map_err(PortalError::validation)?;
        let created = self
            .store
            .add_medical_history(caller.id, entry)
            .map_err(PortalError::storage)?;
        tracing::info!("Account {} added medical history entry {}", caller.id, created.id);
        Ok(created)
    }

    /// History of `owner`, or of the caller when `owner` is `None`.
    ///
    /// # Errors
    /// `Forbidden` if the guard denies access to `owner`.
    pub fn medical_history(
        &self,
        caller: &Account,
        owner: Option<AccountId>,
    ) -> Result<Vec<MedicalHistoryEntry>, PortalError> {
        let owner = owner.unwrap_or(caller.id);
        self.guard.authorize(caller, owner)?;
        tracing::debug!("Account {} reading medical history of {}", caller.id, owner);
        self.store
            .list_medical_history(owner)
            .map_err(PortalError::storage)
    }

    /// # Errors
    /// `Validation` for a malformed entry.
    pub fn add_vaccine(
        &self,
        caller: &Account,
        vaccine: NewVaccine,
    ) -> Result<VaccineEntry, PortalError> {
        vaccine.validate().map_err(PortalError::validation)?;
        let created = self
            .store
            .add_vaccine(caller.id, vaccine)
            .map_err(PortalError::storage)?;
        tracing::info!("Account {} added vaccine {}", caller.id, created.id);
        Ok(created)
    }

    /// Vaccines of `owner`, or of the caller when `owner` is `None`.
    ///
    /// # Errors
    /// `Forbidden` if the guard denies access to `owner`.
    pub fn vaccines(
        &self,
        caller: &Account,
        owner: Option<AccountId>,
    ) -> Result<Vec<VaccineEntry>, PortalError> {
        let owner = owner.unwrap_or(caller.id);
        self.guard.authorize(caller, owner)?;
        tracing::debug!("Account {} reading vaccines of {}", caller.id, owner);
        self.store.list_vaccines(owner).map_err(PortalError::storage)
    }

    /// # Errors
    /// `Validation` for a malformed entry.
    pub fn add_family_member(
        &self,
        caller: &Account,
        member: NewFamilyMember,
    ) -> Result<FamilyMember, PortalError> {
        member.validate().map_err(PortalError::validation)?;
        let created = self
            .store
            .add_family_member(caller.id, member)
            .map_err(PortalError::storage)?;
        tracing::info!("Account {} added family member {}", caller.id, created.id);
        Ok(created)
    }

    /// # Errors
    /// Returns error if storage operation fails.
    pub fn family_members(&self, caller: &Account) -> Result<Vec<FamilyMember>, PortalError> {
        self.store
            .list_family_members(caller.id)
            .map_err(PortalError::storage)
    }
}
