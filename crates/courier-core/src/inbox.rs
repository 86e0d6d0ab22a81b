// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Notification inbox
//
// Persistent, backend-stored notifications addressed to a driver.
// Not to be confused with toasts: these have read state and outlive the session.

use crate::auth::User;
use crate::types::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// A notification stored for a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxNotification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Load this notification refers to, if any
    #[serde(default)]
    pub load_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Remote inbox API
#[async_trait]
pub trait InboxApi: Send + Sync {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InboxNotification>, AppError>;
    async fn mark_as_read(&self, id: &str) -> Result<(), AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

/// Session-scoped copy of the signed-in driver's inbox
pub struct Inbox {
    api: Arc<dyn InboxApi>,
    notifications: RwLock<Vec<InboxNotification>>,
}

impl Inbox {
    pub fn new(api: Arc<dyn InboxApi>) -> Self {
        Self {
            api,
            notifications: RwLock::new(Vec::new()),
        }
    }

    pub fn notifications(&self) -> Vec<InboxNotification> {
        self.read().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.read().iter().filter(|n| !n.read).count()
    }

    /// Reload from the backend; signed out means an empty inbox
    ///
    /// A failed fetch keeps whatever was loaded before.
    pub async fn refresh(&self, user: Option<&User>) -> Result<(), AppError> {
        let Some(user) = user else {
            self.write().clear();
            return Ok(());
        };

        match self.api.list_for_user(&user.uid).await {
            Ok(notifications) => {
                tracing::info!(
                    "Loaded {} notifications for {}",
                    notifications.len(),
                    user.uid
                );
                *self.write() = notifications;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to fetch notifications: {}", e);
                Err(e)
            }
        }
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<(), AppError> {
        if let Err(e) = self.api.mark_as_read(id).await {
            tracing::error!("Failed to mark notification {} as read: {}", id, e);
            return Err(e);
        }

        for notification in self.write().iter_mut().filter(|n| n.id == id) {
            notification.read = true;
        }
        Ok(())
    }

    /// Mark every unread notification as read, one API call each
    ///
    /// Local state only changes once all calls succeeded.
    pub async fn mark_all_as_read(&self, user: Option<&User>) -> Result<(), AppError> {
        if user.is_none() {
            return Ok(());
        }

        let unread: Vec<String> = self
            .read()
            .iter()
            .filter(|n| !n.read)
            .map(|n| n.id.clone())
            .collect();

        for id in &unread {
            if let Err(e) = self.api.mark_as_read(id).await {
                tracing::error!("Failed to mark all notifications as read: {}", e);
                return Err(e);
            }
        }

        for notification in self.write().iter_mut() {
            notification.read = true;
        }
        tracing::info!("Marked {} notifications as read", unread.len());
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if let Err(e) = self.api.delete(id).await {
            tracing::error!("Failed to delete notification {}: {}", id, e);
            return Err(e);
        }

        self.write().retain(|n| n.id != id);
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<InboxNotification>> {
        self.notifications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<InboxNotification>> {
        self.notifications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn driver() -> User {
        User {
            id: "u1".into(),
            uid: "u1".into(),
            name: "Ana".into(),
            ..Default::default()
        }
    }

    fn note(id: &str, user_id: &str, read: bool) -> InboxNotification {
        InboxNotification {
            id: id.into(),
            user_id: user_id.into(),
            title: "New load".into(),
            body: "A load is waiting for pickup".into(),
            kind: "load".into(),
            load_id: Some("L-1".into()),
            timestamp: Utc::now(),
            read,
        }
    }

    fn seeded() -> (Inbox, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_notifications(vec![
            note("n1", "u1", false),
            note("n2", "u1", true),
            note("n3", "u1", false),
            note("n4", "someone-else", false),
        ]);
        (Inbox::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn refresh_loads_only_own_notifications() {
        let (inbox, _) = seeded();
        inbox.refresh(Some(&driver())).await.unwrap();

        assert_eq!(inbox.notifications().len(), 3);
        assert_eq!(inbox.unread_count(), 2);
    }

    #[tokio::test]
    async fn refresh_without_user_clears() {
        let (inbox, _) = seeded();
        inbox.refresh(Some(&driver())).await.unwrap();
        inbox.refresh(None).await.unwrap();

        assert!(inbox.notifications().is_empty());
        assert_eq!(inbox.unread_count(), 0);
    }

    #[tokio::test]
    async fn mark_as_read_updates_count() {
        let (inbox, backend) = seeded();
        inbox.refresh(Some(&driver())).await.unwrap();

        inbox.mark_as_read("n1").await.unwrap();
        assert_eq!(inbox.unread_count(), 1);
        assert!(backend.notification("n1").unwrap().read);
    }

    #[tokio::test]
    async fn mark_all_as_read() {
        let (inbox, backend) = seeded();
        inbox.refresh(Some(&driver())).await.unwrap();

        inbox.mark_all_as_read(Some(&driver())).await.unwrap();
        assert_eq!(inbox.unread_count(), 0);
        assert!(backend.notification("n3").unwrap().read);
        assert!(!backend.notification("n4").unwrap().read);
    }

    #[tokio::test]
    async fn delete_removes_locally_and_remotely() {
        let (inbox, backend) = seeded();
        inbox.refresh(Some(&driver())).await.unwrap();

        inbox.delete("n1").await.unwrap();
        assert_eq!(inbox.notifications().len(), 2);
        assert!(backend.notification("n1").is_none());
    }

    #[tokio::test]
    async fn failed_call_leaves_state_untouched() {
        let (inbox, _) = seeded();
        inbox.refresh(Some(&driver())).await.unwrap();

        let err = inbox.mark_as_read("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(inbox.unread_count(), 2);

        assert!(inbox.delete("missing").await.is_err());
        assert_eq!(inbox.notifications().len(), 3);
    }
}
