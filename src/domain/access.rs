//! Doctor access grants.
//!
//! A grant moves `pending -> accepted | rejected` exactly once. Accepted grants
//! can later be deactivated by the patient (revocation); the status stays
//! `accepted` and the row is kept as history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(pub i64);

impl std::fmt::Display for GrantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Pending,
    Accepted,
    Rejected,
}

impl GrantStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission for one clinician to read one patient's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub id: GrantId,
    pub patient_id: AccountId,
    #[serde(rename = "doctorId")]
    pub clinician_id: AccountId,
    pub status: GrantStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessGrant {
    /// Whether this grant authorizes record access at `now`.
    ///
    /// Expiry is evaluated lazily here; nothing sweeps expired grants.
    #[must_use]
    pub fn authorizes_at(&self, now: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Accepted
            && self.is_active
            && self.expires_at.map_or(true, |expires| expires > now)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == GrantStatus::Pending
    }

    /// Apply the clinician's answer.
    ///
    /// # Errors
    /// Returns the current status if the grant was already answered.
    pub fn resolve(&mut self, accepted: bool) -> Result<(), GrantStatus> {
        if !self.is_pending() {
            return Err(self.status);
        }
        self.status = if accepted {
            GrantStatus::Accepted
        } else {
            GrantStatus::Rejected
        };
        self.is_active = accepted;
        Ok(())
    }

    /// Deactivate an accepted grant. Returns `false` if there was nothing to do.
    pub fn deactivate(&mut self) -> bool {
        if self.status == GrantStatus::Accepted && self.is_active {
            self.is_active = false;
            true
        } else {
            false
        }
    }
}

/// A fresh request, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGrant {
    pub patient_id: AccountId,
    pub clinician_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewGrant {
    /// New grants start `pending` and inactive.
    #[must_use]
    pub fn into_grant(self, id: GrantId) -> AccessGrant {
        AccessGrant {
            id,
            patient_id: self.patient_id,
            clinician_id: self.clinician_id,
            status: GrantStatus::Pending,
            is_active: false,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending(expires_at: Option<DateTime<Utc>>) -> AccessGrant {
        NewGrant {
            patient_id: AccountId(1),
            clinician_id: AccountId(2),
            created_at: Utc::now(),
            expires_at,
        }
        .into_grant(GrantId(1))
    }

    #[test]
    fn test_pending_grant_does_not_authorize() {
        let grant = pending(None);
        assert!(!grant.is_active);
        assert!(!grant.authorizes_at(Utc::now()));
    }

    #[test]
    fn test_accepted_grant_authorizes_until_expiry() {
        let now = Utc::now();
        let mut grant = pending(Some(now + Duration::hours(1)));
        grant.resolve(true).expect("Should resolve");

        assert!(grant.authorizes_at(now));
        assert!(!grant.authorizes_at(now + Duration::hours(1)));
        assert!(!grant.authorizes_at(now + Duration::hours(2)));
    }

    #[test]
    fn test_rejected_grant_never_authorizes() {
        let mut grant = pending(None);
        grant.resolve(false).expect("Should resolve");

        assert_eq!(grant.status, GrantStatus::Rejected);
        assert!(!grant.is_active);
        assert!(!grant.authorizes_at(Utc::now()));
    }

    #[test]
    fn test_resolve_happens_once() {
        let mut grant = pending(None);
        grant.resolve(false).expect("Should resolve");

        assert_eq!(grant.resolve(true), Err(GrantStatus::Rejected));
        assert_eq!(grant.status, GrantStatus::Rejected);
    }

    #[test]
    fn test_deactivate_keeps_status() {
        let mut grant = pending(None);
        assert!(!grant.deactivate());

        grant.resolve(true).expect("Should resolve");
        assert!(grant.deactivate());
        assert_eq!(grant.status, GrantStatus::Accepted);
        assert!(!grant.authorizes_at(Utc::now()));
        assert!(!grant.deactivate());
    }
}
