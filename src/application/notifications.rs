//! Notification emitter: append-only inbox per account.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{AccountId, GrantId, NewNotification, Notification, NotificationId, NotificationKind};
use crate::ports::RecordStore;
use crate::PortalError;

pub struct NotificationEmitter<S: RecordStore> {
    store: Arc<S>,
    strict_ownership: bool,
}

impl<S: RecordStore> Clone for NotificationEmitter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            strict_ownership: self.strict_ownership,
        }
    }
}

impl<S: RecordStore> NotificationEmitter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            strict_ownership: false,
        }
    }

    /// Only let recipients mark their own notifications as read.
    #[must_use]
    pub fn with_strict_ownership(mut self, strict: bool) -> Self {
        self.strict_ownership = strict;
        self
    }

    /// Append an unread notification stamped with the server clock.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn notify(
        &self,
        recipient: AccountId,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
        related_id: Option<GrantId>,
    ) -> Result<Notification, PortalError> {
        let notification = self
            .store
            .add_notification(NewNotification {
                recipient,
                title: title.into(),
                message: message.into(),
                kind,
                related_id,
                created_at: Utc::now(),
            })
            .map_err(PortalError::storage)?;

        tracing::debug!(
            "Queued {} notification {} for account {}",
            kind.as_str(),
            notification.id,
            recipient
        );
        Ok(notification)
    }

    /// # Errors
    /// Returns error if storage operation fails.
    pub fn list(&self, recipient: AccountId) -> Result<Vec<Notification>, PortalError> {
        self.store
            .list_notifications(recipient)
            .map_err(PortalError::storage)
    }

    /// Mark a notification read.
    ///
    /// Idempotent, and a missing id is not an error. Whether the caller must
    /// be the recipient depends on `strict_ownership`; either way a mismatch
    /// is logged.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn mark_read(&self, caller: AccountId, id: NotificationId) -> Result<(), PortalError> {
        let Some(notification) = self
            .store
            .get_notification(id)
            .map_err(PortalError::storage)?
        else {
            tracing::debug!("Notification {} not found; nothing to mark", id);
            return Ok(());
        };

        if notification.user_id != caller {
            tracing::warn!(
                "Account {} marked notification {} owned by account {}",
                caller,
                id,
                notification.user_id
            );
            if self.strict_ownership {
                return Ok(());
            }
        }

        if !notification.is_read {
            self.store
                .mark_notification_read(id)
                .map_err(PortalError::storage)?;
        }
        Ok(())
    }
}
