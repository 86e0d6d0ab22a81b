// SPDX-License-Identifier: AGPL-3.0
// Courier Core - In-memory backend
//
// Stand-in for the hosted backend, used by the terminal shell and tests.
// Validation mirrors what the hosted identity service rejects.

use crate::auth::{AuthProvider, IdentityUpdate, ProfileRecord, User};
use crate::delivery::{Delivery, DeliveryPatch, DeliverySnapshot, DeliveryStore, NewDeliveryRecord};
use crate::inbox::{InboxApi, InboxNotification};
use crate::types::AppError;
use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Shortest password the identity service accepts
const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct Tables {
    /// Keyed by lowercase email
    accounts: HashMap<String, Account>,
    profiles: HashMap<String, ProfileRecord>,
    signed_in: Option<String>,
    deliveries: Vec<Delivery>,
    notifications: Vec<InboxNotification>,
    listeners: Vec<Sender<DeliverySnapshot>>,
    auth_listeners: Vec<Sender<Option<User>>>,
}

impl Tables {
    fn broadcast(&mut self, snapshot: DeliverySnapshot) {
        self.listeners.retain(|tx| {
            // Unbounded senders only fail once the receiver is gone
            tx.try_send(snapshot.clone()).is_ok()
        });
    }

    fn publish_deliveries(&mut self) {
        let snapshot = Ok(self.deliveries.clone());
        self.broadcast(snapshot);
    }

    fn account_by_uid(&mut self, uid: &str) -> Option<&mut Account> {
        self.accounts.values_mut().find(|a| a.user.uid == uid)
    }

    fn signed_in_user(&self) -> Option<User> {
        let uid = self.signed_in.as_ref()?;
        self.accounts
            .values()
            .find(|a| &a.user.uid == uid)
            .map(|a| a.user.clone())
    }

    fn publish_auth_state(&mut self) {
        let user = self.signed_in_user();
        self.auth_listeners
            .retain(|tx| tx.try_send(user.clone()).is_ok());
    }
}

/// Process-local implementation of every backend trait
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the delivery collection and notify listeners
    pub fn seed_deliveries(&self, deliveries: Vec<Delivery>) {
        let mut tables = self.lock();
        tables.deliveries = deliveries;
        tables.publish_deliveries();
    }

    pub fn seed_notifications(&self, notifications: Vec<InboxNotification>) {
        self.lock().notifications = notifications;
    }

    /// Push a listener error, as a revoked permission would
    pub fn fail_snapshot(&self, error: AppError) {
        self.lock().broadcast(Err(error));
    }

    pub fn profile(&self, id: &str) -> Option<ProfileRecord> {
        self.lock().profiles.get(id).cloned()
    }

    pub fn notification(&self, id: &str) -> Option<InboxNotification> {
        self.lock().notifications.iter().find(|n| n.id == id).cloned()
    }

    /// Currently signed-in uid
    pub fn signed_in(&self) -> Option<String> {
        self.lock().signed_in.clone()
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AppError> {
        let key = email.trim().to_lowercase();
        if !key.contains('@') {
            return Err(AppError::Auth("invalid email address".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Auth(format!(
                "password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let mut tables = self.lock();
        if tables.accounts.contains_key(&key) {
            return Err(AppError::Auth("email already in use".to_string()));
        }

        let uid = uuid::Uuid::new_v4().simple().to_string();
        let user = User {
            id: uid.clone(),
            uid: uid.clone(),
            name: name.trim().to_string(),
            email: Some(key.clone()),
            ..Default::default()
        };

        tables.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        tables.signed_in = Some(uid);
        tables.publish_auth_state();
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AppError> {
        let key = email.trim().to_lowercase();
        let mut tables = self.lock();

        let user = match tables.accounts.get(&key) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(AppError::Auth("invalid credentials".to_string())),
        };

        tables.signed_in = Some(user.uid.clone());
        tables.publish_auth_state();
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let mut tables = self.lock();
        tables.signed_in = None;
        tables.publish_auth_state();
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AppError> {
        let key = email.trim().to_lowercase();
        if self.lock().accounts.contains_key(&key) {
            tracing::info!("Password reset link issued for {}", key);
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Account {}", key)))
        }
    }

    async fn update_identity(&self, uid: &str, update: IdentityUpdate) -> Result<(), AppError> {
        let mut tables = self.lock();

        if let Some(email) = &update.email {
            let key = email.trim().to_lowercase();
            let taken = tables
                .accounts
                .get(&key)
                .is_some_and(|account| account.user.uid != uid);
            if taken {
                return Err(AppError::Auth("email already in use".to_string()));
            }
        }

        let mut account = {
            let old_key = tables
                .accounts
                .iter()
                .find(|(_, a)| a.user.uid == uid)
                .map(|(k, _)| k.clone())
                .ok_or_else(|| AppError::NotFound(format!("Account {}", uid)))?;
            tables
                .accounts
                .remove(&old_key)
                .ok_or_else(|| AppError::NotFound(format!("Account {}", uid)))?
        };

        if let Some(name) = update.display_name {
            account.user.name = name;
        }
        if let Some(photo) = update.photo_url {
            account.user.photo_url = Some(photo.clone());
            account.user.profile_image = Some(photo);
        }
        if let Some(email) = update.email {
            account.user.email = Some(email.trim().to_lowercase());
        }

        let key = account.user.email.clone().unwrap_or_default();
        tables.accounts.insert(key, account);
        Ok(())
    }

    async fn write_profile(&self, uid: &str, record: ProfileRecord) -> Result<(), AppError> {
        let mut tables = self.lock();
        if tables.account_by_uid(uid).is_none() {
            return Err(AppError::NotFound(format!("Account {}", uid)));
        }
        tables.profiles.insert(uid.to_string(), record);
        Ok(())
    }

    fn watch_user(&self) -> Receiver<Option<User>> {
        let (tx, rx) = async_channel::unbounded();
        let mut tables = self.lock();
        // Like a restored session, the current user is reported straight away
        let _ = tx.try_send(tables.signed_in_user());
        tables.auth_listeners.push(tx);
        rx
    }
}

#[async_trait]
impl DeliveryStore for MemoryBackend {
    async fn insert(&self, record: NewDeliveryRecord) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let NewDeliveryRecord {
            delivery,
            status,
            created_at,
        } = record;

        let mut tables = self.lock();
        tables.deliveries.push(Delivery {
            id: id.clone(),
            recipient_name: delivery.recipient_name,
            recipient_phone: delivery.recipient_phone,
            delivery_address: delivery.delivery_address,
            delivery_complement: delivery.delivery_complement,
            delivery_city: delivery.delivery_city,
            delivery_zip_code: delivery.delivery_zip_code,
            package_description: delivery.package_description,
            delivery_instructions: delivery.delivery_instructions,
            status,
            created_at,
            total_distance: delivery.total_distance,
        });
        tables.publish_deliveries();
        Ok(id)
    }

    async fn update(&self, id: &str, patch: DeliveryPatch) -> Result<(), AppError> {
        let mut tables = self.lock();
        let delivery = tables
            .deliveries
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Delivery {}", id)))?;

        patch.apply_to(delivery);
        tables.publish_deliveries();
        Ok(())
    }

    fn subscribe(&self) -> Receiver<DeliverySnapshot> {
        let (tx, rx) = async_channel::unbounded();
        let mut tables = self.lock();
        // New listeners get the current contents straight away
        let _ = tx.try_send(Ok(tables.deliveries.clone()));
        tables.listeners.push(tx);
        rx
    }
}

#[async_trait]
impl InboxApi for MemoryBackend {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InboxNotification>, AppError> {
        let mut notifications: Vec<InboxNotification> = self
            .lock()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(notifications)
    }

    async fn mark_as_read(&self, id: &str) -> Result<(), AppError> {
        let mut tables = self.lock();
        let notification = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Notification {}", id)))?;
        notification.read = true;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tables = self.lock();
        let before = tables.notifications.len();
        tables.notifications.retain(|n| n.id != id);

        if tables.notifications.len() == before {
            return Err(AppError::NotFound(format!("Notification {}", id)));
        }
        Ok(())
    }
}
