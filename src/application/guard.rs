//! Authorization guard for cross-account record access.

use super::AccessWorkflow;
use crate::domain::{Account, AccountId};
use crate::ports::RecordStore;
use crate::PortalError;

/// Decide whether an actor may see the records owned by `target_owner`.
///
/// Owners always may. Anyone else must be a clinician for whom
/// `check_access(target_owner, actor)` holds; the check only runs when
/// it can change the answer.
///
/// # Errors
/// Propagates errors from `check_access`.
pub fn can_access<F>(
    actor_id: AccountId,
    actor_is_clinician: bool,
    target_owner: AccountId,
    check_access: F,
) -> Result<bool, PortalError>
where
    F: FnOnce(AccountId, AccountId) -> Result<bool, PortalError>,
{
    if actor_id == target_owner {
        return Ok(true);
    }
    if !actor_is_clinician {
        return Ok(false);
    }
    check_access(target_owner, actor_id)
}

/// [`can_access`] wired to the access workflow.
pub struct AuthorizationGuard<S: RecordStore> {
    workflow: AccessWorkflow<S>,
}

impl<S: RecordStore> Clone for AuthorizationGuard<S> {
    fn clone(&self) -> Self {
        Self {
            workflow: self.workflow.clone(),
        }
    }
}

impl<S: RecordStore> AuthorizationGuard<S> {
    pub fn new(workflow: AccessWorkflow<S>) -> Self {
        Self { workflow }
    }

    /// # Errors
    /// Returns error if storage operation fails.
    pub fn can_access(&self, actor: &Account, target_owner: AccountId) -> Result<bool, PortalError> {
        can_access(actor.id, actor.is_clinician(), target_owner, |patient, clinician| {
            self.workflow.check_access(patient, clinician)
        })
    }

    /// Like [`AuthorizationGuard::can_access`] but denial is an error.
    ///
    /// # Errors
    /// `Forbidden` when access is denied.
    pub fn authorize(&self, actor: &Account, target_owner: AccountId) -> Result<(), PortalError> {
        if self.can_access(actor, target_owner)? {
            Ok(())
        } else {
            tracing::info!("Account {} denied access to records of {}", actor.id, target_owner);
            Err(PortalError::Forbidden("Access denied".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never_called(_: AccountId, _: AccountId) -> Result<bool, PortalError> {
        panic!("check_access should not run");
    }

    #[test]
    fn test_owner_always_allowed() {
        assert!(can_access(AccountId(1), false, AccountId(1), never_called).expect("Should decide"));
        assert!(can_access(AccountId(2), true, AccountId(2), never_called).expect("Should decide"));
    }

    #[test]
    fn test_patient_never_reads_other_patient() {
        assert!(!can_access(AccountId(1), false, AccountId(2), never_called).expect("Should decide"));
    }

    #[test]
    fn test_clinician_follows_grant() {
        let granted = can_access(AccountId(5), true, AccountId(1), |patient, clinician| {
            assert_eq!(patient, AccountId(1));
            assert_eq!(clinician, AccountId(5));
            Ok(true)
        });
        assert!(granted.expect("Should decide"));

        let denied = can_access(AccountId(5), true, AccountId(1), |_, _| Ok(false));
        assert!(!denied.expect("Should decide"));
    }

    #[test]
    fn test_check_errors_propagate() {
        let result = can_access(AccountId(5), true, AccountId(1), |_, _| {
            Err(PortalError::Storage(crate::adapters::StorageError::LockPoisoned))
        });
        assert!(matches!(result, Err(PortalError::Storage(_))));
    }
}
