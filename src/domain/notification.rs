//! In-app notifications emitted by the access workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::access::GrantId;
use super::account::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Sent to a clinician when a patient asks them to accept access.
    AccessRequest,
    /// Sent to a patient when the clinician answers.
    AccessResponse,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessRequest => "access_request",
            Self::AccessResponse => "access_response",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "access_request" => Some(Self::AccessRequest),
            "access_response" => Some(Self::AccessResponse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: AccountId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub related_id: Option<GrantId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient: AccountId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_id: Option<GrantId>,
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    /// Notifications always start unread.
    #[must_use]
    pub fn into_notification(self, id: NotificationId) -> Notification {
        Notification {
            id,
            user_id: self.recipient,
            title: self.title,
            message: self.message,
            kind: self.kind,
            related_id: self.related_id,
            is_read: false,
            created_at: self.created_at,
        }
    }
}
