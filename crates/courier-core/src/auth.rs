// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Authentication
//
// The identity provider is a hosted service behind `AuthProvider`.
// `AuthService` tracks the signed-in user for the session, following the
// provider's own auth-state stream, and turns provider failures into error
// toasts.

use crate::toast::ToastController;
use crate::types::AppError;
use async_channel::Receiver;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Signed-in driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub uid: String,
    pub name: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub phone: Option<String>,
    pub license: Option<String>,
    pub license_expiry: Option<String>,
    pub vehicle: Option<String>,
    pub plate: Option<String>,
    pub profile_image: Option<String>,
}

/// Partial profile edit; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license: Option<String>,
    pub license_expiry: Option<String>,
    pub vehicle: Option<String>,
    pub plate: Option<String>,
    pub profile_image: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fields owned by the identity provider itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl IdentityUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.email.is_none() && self.photo_url.is_none()
    }
}

/// Profile document written to the user store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(flatten)]
    pub fields: ProfileUpdate,
    pub updated_at: DateTime<Utc>,
}

/// Hosted identity service
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AppError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AppError>;
    async fn sign_out(&self) -> Result<(), AppError>;
    async fn send_password_reset(&self, email: &str) -> Result<(), AppError>;
    async fn update_identity(&self, uid: &str, update: IdentityUpdate) -> Result<(), AppError>;
    async fn write_profile(&self, uid: &str, record: ProfileRecord) -> Result<(), AppError>;

    /// Signed-in user changes, starting with the current (possibly restored) one
    fn watch_user(&self) -> Receiver<Option<User>>;
}

/// Session-scoped authentication state
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    toast: ToastController,
    user_tx: Arc<watch::Sender<Option<User>>>,
    loading_tx: Arc<watch::Sender<bool>>,
    listener: JoinHandle<()>,
}

impl AuthService {
    /// Start following the provider's auth state on `runtime`
    ///
    /// `is_loading` stays true until the provider reports whether a session
    /// was restored.
    pub fn new(provider: Arc<dyn AuthProvider>, toast: ToastController, runtime: &Handle) -> Self {
        let (user_tx, _) = watch::channel(None);
        let (loading_tx, _) = watch::channel(true);
        let user_tx = Arc::new(user_tx);
        let loading_tx = Arc::new(loading_tx);

        let changes = provider.watch_user();
        let listener = runtime.spawn(Self::listen(changes, user_tx.clone(), loading_tx.clone()));

        Self {
            provider,
            toast,
            user_tx,
            loading_tx,
            listener,
        }
    }

    async fn listen(
        changes: Receiver<Option<User>>,
        user_tx: Arc<watch::Sender<Option<User>>>,
        loading_tx: Arc<watch::Sender<bool>>,
    ) {
        tracing::info!("Listening for auth state changes");

        while let Ok(mut user) = changes.recv().await {
            // Only the provider's newest state matters
            while let Ok(next) = changes.try_recv() {
                user = next;
            }

            let uid = user.as_ref().map(|u| u.uid.clone());
            // Same account: keep the local copy, it may hold merged profile fields
            let changed = user_tx.send_if_modified(|current| {
                if same_account(current.as_ref(), user.as_ref()) {
                    false
                } else {
                    *current = user;
                    true
                }
            });

            if changed {
                match uid {
                    Some(uid) => tracing::info!("Auth state: signed in as {}", uid),
                    None => tracing::info!("Auth state: signed out"),
                }
            }
            loading_tx.send_if_modified(|loading| std::mem::replace(loading, false));
        }

        tracing::info!("Auth state stream closed");
    }

    pub fn current_user(&self) -> Option<User> {
        self.user_tx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading_tx.borrow()
    }

    /// Observe sign-in and sign-out
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user_tx.subscribe()
    }

    /// Create an account and sign it in
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, AppError> {
        tracing::info!("Starting signup for {}", email);
        let result = self
            .with_loading(self.provider.register(name, email, password))
            .await;

        let user = self.report(result, "Signup failed")?;
        tracing::info!("Signup succeeded for {}", user.uid);
        self.set_user(Some(user.clone()));
        self.toast.success(format!("Welcome, {}!", display_name(&user)));
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        tracing::info!("Starting login for {}", email);
        let result = self.with_loading(self.provider.sign_in(email, password)).await;

        let user = self.report(result, "Login failed")?;
        tracing::info!("Login succeeded for {}", user.uid);
        self.set_user(Some(user.clone()));
        self.toast.success(format!("Welcome back, {}!", display_name(&user)));
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        tracing::info!("Starting logout");
        let result = self.with_loading(self.provider.sign_out()).await;

        self.report(result, "Logout failed")?;
        tracing::info!("Logout succeeded");
        self.set_user(None);
        self.toast.success("Signed out");
        Ok(())
    }

    /// Ask the provider to email a password reset link
    pub async fn reset_password(&self, email: &str) -> Result<(), AppError> {
        let email = email.trim();
        if email.is_empty() {
            let err = AppError::InvalidInput("Enter your email address".to_string());
            return self.report(Err(err), "Password reset rejected");
        }

        tracing::info!("Requesting password reset for {}", email);
        let result = self
            .with_loading(self.provider.send_password_reset(email))
            .await;

        self.report(result, "Password reset failed")?;
        self.toast
            .success(format!("Password reset email sent to {}", email));
        Ok(())
    }

    /// Update the signed-in user's profile
    ///
    /// Only identity fields that actually changed are sent to the provider;
    /// every supplied field goes to the profile document.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, AppError> {
        let Some(current) = self.current_user() else {
            return self.report(Err(AppError::NotAuthenticated), "Profile update rejected");
        };

        let identity = identity_changes(&current, &update);
        let record = ProfileRecord {
            fields: update.clone(),
            updated_at: Utc::now(),
        };

        let result = self
            .with_loading(async {
                if !identity.is_empty() {
                    self.provider.update_identity(&current.uid, identity).await?;
                }
                self.provider.write_profile(&current.id, record).await
            })
            .await;

        self.report(result, "Profile update failed")?;

        let merged = merge_profile(current, update);
        tracing::info!("Profile updated for {}", merged.uid);
        self.set_user(Some(merged.clone()));
        self.toast.success("Profile updated");
        Ok(merged)
    }

    async fn with_loading<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
        self.loading_tx.send_replace(true);
        let out = fut.await;
        self.loading_tx.send_replace(false);
        out
    }

    /// Log a failure and surface it as an error toast
    fn report<T>(&self, result: Result<T, AppError>, context: &str) -> Result<T, AppError> {
        result.map_err(|e| {
            tracing::error!("{}: {}", context, e);
            self.toast.error(e.user_message());
            e
        })
    }

    fn set_user(&self, user: Option<User>) {
        self.user_tx.send_replace(user);
    }
}

impl Drop for AuthService {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn same_account(a: Option<&User>, b: Option<&User>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.uid == b.uid,
        _ => false,
    }
}

fn display_name(user: &User) -> &str {
    if user.name.is_empty() {
        user.email.as_deref().unwrap_or("driver")
    } else {
        &user.name
    }
}

fn identity_changes(current: &User, update: &ProfileUpdate) -> IdentityUpdate {
    IdentityUpdate {
        display_name: update
            .name
            .clone()
            .filter(|name| !name.is_empty() && *name != current.name),
        email: update
            .email
            .clone()
            .filter(|email| !email.is_empty() && current.email.as_ref() != Some(email)),
        photo_url: update
            .profile_image
            .clone()
            .filter(|image| !image.is_empty() && current.profile_image.as_ref() != Some(image)),
    }
}

fn merge_profile(mut user: User, update: ProfileUpdate) -> User {
    if let Some(name) = update.name {
        user.name = name;
    }
    if update.email.is_some() {
        user.email = update.email;
    }
    if let Some(image) = update.profile_image {
        user.photo_url = Some(image.clone());
        user.profile_image = Some(image);
    }
    if update.phone.is_some() {
        user.phone = update.phone;
    }
    if update.license.is_some() {
        user.license = update.license;
    }
    if update.license_expiry.is_some() {
        user.license_expiry = update.license_expiry;
    }
    if update.vehicle.is_some() {
        user.vehicle = update.vehicle;
    }
    if update.plate.is_some() {
        user.plate = update.plate;
    }
    user
}
